use md5::{Digest, Md5};

/// Narrator voices, in assignment order. Reordering this list reassigns
/// every existing episode.
pub const VOICE_POOL: &[&str] = &[
    "zh-CN-XiaoxiaoNeural", // female, lively
    "zh-CN-XiaoyiNeural",   // female, gentle
    "zh-CN-YunjianNeural",  // male, mature
    "zh-CN-YunxiNeural",    // male, young
    "zh-CN-YunxiaNeural",   // male, boyish
    "zh-CN-XiaohanNeural",  // female, measured
];

const ID_LEN: usize = 8;

/// Episode id: first 8 hex chars of MD5 over the source file name.
pub fn episode_id(file_name: &str) -> String {
    let digest = Md5::digest(file_name.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(ID_LEN);
    id
}

/// Pick a voice for an episode id. The digest is reduced as one big-endian
/// integer so every byte contributes to the choice.
pub fn voice_for_id(id: &str) -> &'static str {
    let digest = Md5::digest(id.as_bytes());
    let n = VOICE_POOL.len() as u32;
    let idx = digest
        .iter()
        .fold(0u32, |acc, &b| (acc * 256 + b as u32) % n);
    VOICE_POOL[idx as usize]
}
