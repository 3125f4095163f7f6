//! Audio — narration playback, remote TTS and the local fallback voice

pub mod sound_engine;
pub mod tts;
pub mod voice;

pub use sound_engine::SoundEngine;
pub use tts::TtsClient;
pub use voice::SystemVoice;
