//! I/Q to magnitude conversion.
//!
//! Converts raw 8-bit I/Q samples to magnitude values using a lookup table.

/// Lookup table for I/Q to magnitude conversion.
/// Index: `(i << 8) | q` where `i, q` are the raw 0..=255 sample bytes.
/// Value: `round(sqrt((i-127)^2 + (q-127)^2) * 360)`, saturating to u16.
pub struct MagnitudeLut {
    table: Box<[u16; 65536]>,
}

impl MagnitudeLut {
    /// Build the 65,536-entry table (128 KiB). Computed once per process;
    /// callers construct one `MagnitudeLut` and reuse it across buffers.
    pub fn new() -> Self {
        let mut table = vec![0u16; 65536].into_boxed_slice();

        for i in 0..=255u32 {
            for q in 0..=255u32 {
                let di = i as f64 - 127.0;
                let dq = q as f64 - 127.0;
                let mag = (di * di + dq * dq).sqrt() * 360.0;
                table[((i << 8) | q) as usize] = mag.round().clamp(0.0, u16::MAX as f64) as u16;
            }
        }

        let table: Box<[u16; 65536]> = table.try_into().unwrap();
        Self { table }
    }

    /// Look up the magnitude for a raw (I, Q) sample pair.
    #[inline]
    pub fn lookup(&self, i: u8, q: u8) -> u16 {
        self.table[((i as usize) << 8) | q as usize]
    }
}

impl Default for MagnitudeLut {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert raw I/Q samples to a magnitude vector, one entry per (I, Q) pair.
///
/// `data` is interleaved as `I0, Q0, I1, Q1, ...`; an odd-length buffer is a
/// caller bug and the trailing unpaired byte is silently dropped by
/// `chunks_exact`.
pub fn compute_magnitude(samples: &[u8], lut: &MagnitudeLut) -> Vec<u16> {
    let mut magnitude = Vec::with_capacity(samples.len() / 2);
    for chunk in samples.chunks_exact(2) {
        magnitude.push(lut.lookup(chunk[0], chunk[1]));
    }
    magnitude
}
