//! Utility modules

pub mod audio_decoder;
