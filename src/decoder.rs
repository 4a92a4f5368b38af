//! Top-level façade tying preamble detection, bit slicing, CRC validation
//! and message parsing into a single `detect` call.

use tracing::{debug, trace};

use crate::bitslice::{self, Candidate};
use crate::config::Config;
use crate::crc;
use crate::error::DecoderError;
use crate::icao_cache::IcaoCache;
use crate::message::{self, icao_is_explicit, DecodedMessage};
use crate::preamble::{PreambleScanner, PREAMBLE_SAMPLES};

/// Owns the ICAO recency cache and processing configuration, and drives a
/// magnitude buffer through the full decode pipeline.
pub struct Decoder {
    config: Config,
    icao_cache: IcaoCache,
}

impl Decoder {
    pub fn new(config: Config) -> Result<Self, DecoderError> {
        Ok(Self {
            config,
            icao_cache: IcaoCache::default(),
        })
    }

    pub fn with_cache_capacity(config: Config, capacity: usize) -> Result<Self, DecoderError> {
        Ok(Self {
            config,
            icao_cache: IcaoCache::new(capacity)?,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn icao_cache(&self) -> &IcaoCache {
        &self.icao_cache
    }

    /// Scan `mag` for preambles and emit every structurally valid frame,
    /// passing each to `sink`. A frame whose CRC never validates (not even
    /// after repair or, in `aggressive` mode, a phase-shifted retry) is
    /// suppressed only when `config.check_crc` is set; otherwise it is
    /// still emitted with `crc_ok = false`. `now_secs` stamps and checks
    /// ICAO cache entries.
    ///
    /// Returns the number of frames emitted.
    pub fn detect(
        &mut self,
        mag: &[u16],
        now_secs: u32,
        mut sink: impl FnMut(DecodedMessage),
    ) -> usize {
        let mut scanner = PreambleScanner::new(mag);
        let mut emitted = 0;

        while let Some(preamble) = scanner.next() {
            let bit_start = preamble.offset + PREAMBLE_SAMPLES;
            let Some(candidates) = bitslice::slice_frame(mag, bit_start, self.config.aggressive)
            else {
                continue;
            };

            let Some(mut mm) = self.best_candidate(&candidates, now_secs) else {
                trace!(offset = preamble.offset, "no structurally valid candidate");
                continue;
            };

            // Phase-correction retry: a CRC that never validated on the
            // unshifted window may still validate one sample early or late,
            // per the aggressive-mode timing-jitter tolerance.
            if !mm.crc_ok && self.config.aggressive {
                if let Some(shifted) = self.retry_shifted(mag, bit_start, now_secs) {
                    debug!(offset = preamble.offset, "phase correction succeeded");
                    mm = shifted;
                } else {
                    trace!(offset = preamble.offset, "phase correction failed");
                }
            }

            if self.config.check_crc && !mm.crc_ok {
                trace!(offset = preamble.offset, df = mm.df, "frame suppressed: crc mismatch");
                scanner.seek(bit_start + mm.bits * 2);
                continue;
            }

            emitted += 1;
            scanner.seek(bit_start + mm.bits * 2);
            sink(mm);
        }

        emitted
    }

    /// Re-slice the frame one sample early and one sample late and try
    /// each; the first shift whose CRC validates wins.
    fn retry_shifted(&mut self, mag: &[u16], bit_start: usize, now_secs: u32) -> Option<DecodedMessage> {
        for shift in [1isize, -1] {
            let Some(shifted_start) = bit_start.checked_add_signed(shift) else {
                continue;
            };
            let Some(candidates) = bitslice::slice_frame(mag, shifted_start, self.config.aggressive)
            else {
                continue;
            };
            if let Some(mut mm) = self.best_candidate(&candidates, now_secs) {
                if mm.crc_ok {
                    mm.phase_corrected = true;
                    return Some(mm);
                }
            }
        }
        None
    }

    /// Parse every candidate and return the first one whose CRC validates;
    /// if none validates, fall back to the first structurally valid
    /// candidate (with `crc_ok = false`) so the caller still has something
    /// to retry or surface.
    fn best_candidate(&mut self, candidates: &[Candidate], now_secs: u32) -> Option<DecodedMessage> {
        let mut fallback = None;
        for candidate in candidates {
            let mm = self.validate_and_parse(candidate, now_secs);
            if mm.crc_ok {
                return Some(mm);
            }
            if fallback.is_none() {
                fallback = Some(mm);
            }
        }
        fallback
    }

    /// Parse `candidate` and run CRC validation/repair on it. Always
    /// returns a message (never suppresses on `crc_ok`); the caller decides
    /// whether to retry, suppress or emit based on `crc_ok`.
    fn validate_and_parse(&mut self, candidate: &Candidate, now_secs: u32) -> DecodedMessage {
        let len = candidate.bits / 8;
        let mut bytes = candidate.bytes;
        let df = bytes[0] >> 3;

        let mut crc_ok;
        let mut error_bit = None;

        if icao_is_explicit(df) {
            crc_ok = crc::verify_crc(&bytes, candidate.bits);
            if !crc_ok {
                trace!(df, "crc mismatch");
            }
            if !crc_ok && self.config.fix_errors && matches!(df, 11 | 17) {
                if let Some(bit) = crc::fix_single_bit_error(&mut bytes, candidate.bits) {
                    debug!(df, bit, "single-bit repair succeeded");
                    error_bit = Some(bit);
                    crc_ok = true;
                } else if self.config.aggressive && df == 17 {
                    if let Some((bit1, bit2)) = crc::fix_two_bit_errors(&mut bytes, candidate.bits) {
                        debug!(df, bit1, bit2, "two-bit repair succeeded");
                        crc_ok = true;
                    }
                }
            }
        } else {
            let syndrome = crc::crc_syndrome(&bytes, candidate.bits);
            crc_ok = self.icao_cache.contains_recent(syndrome, now_secs);
        }

        let mut mm = message::parse_fields(&bytes[..len], candidate.bits);
        mm.crc = crc::extract_crc(&bytes, candidate.bits);
        mm.crc_ok = crc_ok;
        mm.error_bit = error_bit;
        mm.phase_corrected = candidate.phase_corrected;

        if icao_is_explicit(df) {
            mm.icao = [bytes[1], bytes[2], bytes[3]];
            if crc_ok && matches!(df, 11 | 17 | 18) {
                self.icao_cache.add(mm.icao_address(), now_secs);
            }
        } else {
            let syndrome = crc::crc_syndrome(&bytes, candidate.bits);
            mm.icao = [
                ((syndrome >> 16) & 0xFF) as u8,
                ((syndrome >> 8) & 0xFF) as u8,
                (syndrome & 0xFF) as u8,
            ];
        }

        debug!(
            df,
            crc_ok,
            icao = format!("{:06X}", mm.icao_address()),
            phase_corrected = mm.phase_corrected,
            "frame decoded"
        );
        mm
    }
}
