//! Voice clip checks before transcription

use anyhow::{anyhow, Result};

/// Largest clip the transcription endpoint accepts
pub const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// File extensions accepted as audio
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "flac", "m4a", "mp3", "mp4", "mpeg", "mpga", "oga", "ogg", "wav", "webm",
];

/// Reject clips the transcription endpoint would refuse
pub fn check_clip(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(anyhow!("audio file is empty"));
    }
    if bytes.len() > MAX_AUDIO_BYTES {
        return Err(anyhow!(
            "audio file too large: {} bytes (limit: {} bytes)",
            bytes.len(),
            MAX_AUDIO_BYTES
        ));
    }
    Ok(())
}
