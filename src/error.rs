//! Construction-time error types.

use thiserror::Error;

/// Errors raised when building decoder components, as opposed to conditions
/// observed while decoding a stream (those live on `DecodedMessage` instead).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecoderError {
    /// `IcaoCache` (and therefore `Decoder`) requires a power-of-two capacity
    /// because the hash hot path reduces with `& (capacity - 1)`.
    #[error("ICAO cache capacity {0} is not a power of two")]
    CapacityNotPowerOfTwo(usize),
}
