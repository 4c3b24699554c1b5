pub mod crc32;
pub mod dynamics;
pub mod silence;
pub mod validator;
pub mod wav_format;
pub mod waveform;
