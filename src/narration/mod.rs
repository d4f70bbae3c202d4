//! Narration: speech synthesis plus cancellable playback.
//!
//! Components:
//! - `tts`: text → audio clip over the ElevenLabs HTTP API
//! - `player`: execution units that play a clip (rodio thread or player process)
//! - `playback`: one cancellable synthesis + playback session

pub mod playback;
pub mod player;
pub mod tts;

/// Encoded audio as returned by the speech service. Opaque to everything
/// except the player that decodes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}
