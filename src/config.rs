//! Decoder configuration.
//!
//! Deliberately narrow: sample acquisition, CLI parsing and network output
//! belong to whatever embeds this crate, not to it.

/// Tunables for [`crate::decoder::Decoder::detect`].
///
/// All three default to `false`: a caller gets a conservative, CRC-verified
/// stream unless it opts into error correction and the extra aggressive-mode
/// candidates explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Attempt single-bit (and, with `aggressive`, two-bit) CRC repair on
    /// DF11/DF17 frames that fail validation.
    pub fix_errors: bool,
    /// Emit the ambiguous-bit-flipped candidate from the bit slicer and
    /// retry phase-shifted preambles; also enables two-bit repair.
    pub aggressive: bool,
    /// Suppress every frame whose CRC doesn't validate (directly, or via the
    /// ICAO cache for formats that XOR the address into the CRC).
    pub check_crc: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fix_errors: false,
            aggressive: false,
            check_crc: false,
        }
    }
}

impl Config {
    pub fn with_fix_errors(mut self, fix_errors: bool) -> Self {
        self.fix_errors = fix_errors;
        self
    }

    pub fn with_aggressive(mut self, aggressive: bool) -> Self {
        self.aggressive = aggressive;
        self
    }

    pub fn with_check_crc(mut self, check_crc: bool) -> Self {
        self.check_crc = check_crc;
        self
    }
}
