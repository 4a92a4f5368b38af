//! Mode S / ADS-B frame decoder.
//!
//! Turns a buffer of raw I/Q magnitude samples into [`message::DecodedMessage`]
//! values: preamble detection, PPM bit demodulation, CRC-24 validation and
//! repair, ICAO address recency tracking, and per-downlink-format field
//! parsing. Sample acquisition (SDR/file), a concurrency harness, CLI
//! parsing, human-readable printing and network output are all left to
//! whatever embeds this crate.

pub mod bitslice;
pub mod config;
pub mod crc;
pub mod decoder;
pub mod error;
pub mod icao_cache;
pub mod magnitude;
pub mod message;
pub mod preamble;

pub use config::Config;
pub use decoder::Decoder;
pub use error::DecoderError;
pub use icao_cache::IcaoCache;
pub use magnitude::{compute_magnitude, MagnitudeLut};
pub use message::{AltitudeUnit, DecodedMessage};
