//! PPM bit demodulation.
//!
//! Each bit after a preamble occupies two magnitude samples: a `(high, low)`
//! pair is a 1, `(low, high)` is a 0. A tied pair is ambiguous; see
//! [`slice_frame`] for the policy around that and around aggressive-mode
//! second candidates.

use tracing::trace;

/// A demodulated frame candidate. `aggressive` slicing can produce two of
/// these from a single preamble when exactly one bit was ambiguous.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub bytes: [u8; 14],
    pub bits: usize,
    /// Set when this candidate is the ambiguous-bit-flipped alternative
    /// produced in aggressive mode, or when the façade's phase-shift retry
    /// (re-slicing at `bit_start` +/- 1) later validates it.
    pub phase_corrected: bool,
}

fn decode_bit(first: u16, second: u16) -> (u8, bool) {
    let bit = if first > second { 1 } else { 0 };
    let ambiguous = first == second;
    (bit, ambiguous)
}

fn pack_bits(bits: &[u8; 112]) -> [u8; 14] {
    let mut bytes = [0u8; 14];
    for (byte_idx, chunk) in bits.chunks(8).enumerate() {
        let mut b = 0u8;
        for (j, &bit) in chunk.iter().enumerate() {
            b |= bit << (7 - j);
        }
        bytes[byte_idx] = b;
    }
    bytes
}

/// Decode `num_bits` PPM bits starting at `mag[bit_start]`. Returns the
/// 0/1 bit array and the bit positions that were ambiguous, or `None` if
/// `mag` doesn't hold enough samples.
fn decode_bits(mag: &[u16], bit_start: usize, num_bits: usize) -> Option<([u8; 112], Vec<usize>)> {
    if mag.len() < bit_start + num_bits * 2 {
        return None;
    }
    let mut bits = [0u8; 112];
    let mut ambiguous = Vec::new();
    for i in 0..num_bits {
        let idx = bit_start + i * 2;
        let (bit, is_ambiguous) = decode_bit(mag[idx], mag[idx + 1]);
        bits[i] = bit;
        if is_ambiguous {
            ambiguous.push(i);
        }
    }
    Some((bits, ambiguous))
}

fn df_from_first_five_bits(bits: &[u8; 112]) -> u8 {
    (bits[0] << 4) | (bits[1] << 3) | (bits[2] << 2) | (bits[3] << 1) | bits[4]
}

fn bits_needed_for_df(df: u8) -> usize {
    if df >= 16 { 112 } else { 56 }
}

/// Demodulate the frame starting at `mag[bit_start]`, applying the
/// ambiguous-bit policy from the bit-slicer design:
///
/// - Zero ambiguous bits: one ordinary candidate.
/// - Exactly one ambiguous bit: one ordinary candidate; in `aggressive` mode
///   a second candidate with that bit flipped, for the validator to try.
/// - More than one ambiguous bit: the frame is discarded unless `aggressive`
///   is set, in which case the ordinary candidate is still produced (CRC
///   brute-force repair downstream gets the final say).
///
/// Returns `None` if there aren't enough magnitude samples to read even the
/// 5-bit DF field, or to read the full frame once its length is known.
pub fn slice_frame(mag: &[u16], bit_start: usize, aggressive: bool) -> Option<Vec<Candidate>> {
    let (header_bits, _) = decode_bits(mag, bit_start, 5)?;
    let df = df_from_first_five_bits(&header_bits);
    let needed = bits_needed_for_df(df);

    let (bits, ambiguous) = decode_bits(mag, bit_start, needed)?;
    let bytes = pack_bits(&bits);

    match ambiguous.len() {
        0 => Some(vec![Candidate {
            bytes,
            bits: needed,
            phase_corrected: false,
        }]),
        1 => {
            let primary = Candidate {
                bytes,
                bits: needed,
                phase_corrected: false,
            };
            if aggressive {
                let mut flipped_bits = bits;
                let pos = ambiguous[0];
                flipped_bits[pos] ^= 1;
                let flipped = Candidate {
                    bytes: pack_bits(&flipped_bits),
                    bits: needed,
                    phase_corrected: true,
                };
                Some(vec![primary, flipped])
            } else {
                Some(vec![primary])
            }
        }
        _ => {
            if aggressive {
                Some(vec![Candidate {
                    bytes,
                    bits: needed,
                    phase_corrected: false,
                }])
            } else {
                trace!(bit_start, ambiguous = ambiguous.len(), "ambiguous-bit frame discarded");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_frame(frame: &[u8], bits: usize) -> Vec<u16> {
        let mut mag = Vec::with_capacity(bits * 2);
        for i in 0..bits {
            let byte = frame[i / 8];
            let bit = (byte >> (7 - (i % 8))) & 1;
            if bit == 1 {
                mag.push(4000);
                mag.push(100);
            } else {
                mag.push(100);
                mag.push(4000);
            }
        }
        mag
    }

    #[test]
    fn slices_a_short_df11_frame() {
        // DF=11 (0b01011 = 11) in top 5 bits -> 0x58 as first byte works: 11<<3 = 0x58
        let frame = [0x58u8, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0, 0, 0, 0, 0, 0, 0];
        let mag = encode_frame(&frame, 56);
        let candidates = slice_frame(&mag, 0, false).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].bits, 56);
        assert_eq!(&candidates[0].bytes[..7], &frame[..7]);
    }

    #[test]
    fn slices_a_long_df17_frame() {
        // DF=17 -> 17<<3 = 0x88
        let mut frame = [0u8; 14];
        frame[0] = 0x88;
        let mag = encode_frame(&frame, 112);
        let candidates = slice_frame(&mag, 0, false).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].bits, 112);
    }

    #[test]
    fn single_ambiguous_bit_in_standard_mode_is_not_discarded() {
        let frame = [0x58u8, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0, 0, 0, 0, 0, 0, 0];
        let mut mag = encode_frame(&frame, 56);
        // Tie the samples for bit 10.
        mag[20] = 2000;
        mag[21] = 2000;
        let candidates = slice_frame(&mag, 0, false).unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn single_ambiguous_bit_in_aggressive_mode_emits_flipped_candidate() {
        let frame = [0x58u8, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0, 0, 0, 0, 0, 0, 0];
        let mut mag = encode_frame(&frame, 56);
        mag[20] = 2000;
        mag[21] = 2000;
        let candidates = slice_frame(&mag, 0, true).unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(candidates[1].phase_corrected);
        assert_ne!(candidates[0].bytes, candidates[1].bytes);
    }

    #[test]
    fn multiple_ambiguous_bits_discarded_in_standard_mode() {
        let frame = [0x58u8, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0, 0, 0, 0, 0, 0, 0];
        let mut mag = encode_frame(&frame, 56);
        mag[20] = 2000;
        mag[21] = 2000;
        mag[30] = 1500;
        mag[31] = 1500;
        assert!(slice_frame(&mag, 0, false).is_none());
    }

    #[test]
    fn multiple_ambiguous_bits_survive_in_aggressive_mode() {
        let frame = [0x58u8, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0, 0, 0, 0, 0, 0, 0];
        let mut mag = encode_frame(&frame, 56);
        mag[20] = 2000;
        mag[21] = 2000;
        mag[30] = 1500;
        mag[31] = 1500;
        let candidates = slice_frame(&mag, 0, true).unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn insufficient_samples_returns_none() {
        let mag = vec![100u16; 4];
        assert!(slice_frame(&mag, 0, false).is_none());
    }
}
