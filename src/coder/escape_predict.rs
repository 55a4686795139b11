//! Dedicated escape-probability predictor for the deterministic matcher
//! (C5a). Bins calls by `(key, escape_count, total_count, followset_size)`
//! three different ways -- one coarse, two finer -- and blends the three
//! bins' running escape/total ratios by inverse entropy, the same trick
//! `see.rs` uses for its own blend but over a completely separate set of
//! tables tuned to this module's much narrower input domain.

use super::arith::{Decoder, Encoder};
use crate::log2::log2_coarse;
use crate::params::{ZESC_ESCTOT_INC, ZESC_ESC_INC, ZESC_INIT_ESC, ZESC_INIT_SCALE, ZESC_INIT_TOT, ZESC_TOT_INC};

const PARTITION_BITS: [u32; 3] = [7, 15, 16];

struct Bins {
    indices: [u32; 3],
    found: bool,
}

pub struct EscapePredictor {
    esc: [Vec<u32>; 3],
    tot: [Vec<u32>; 3],
}

impl EscapePredictor {
    pub fn new() -> Self {
        let mut esc: [Vec<u32>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        let mut tot: [Vec<u32>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        for i in 0..3 {
            let bins = 1usize << PARTITION_BITS[i];
            let mut e = vec![0u32; bins];
            let mut t = vec![0u32; bins];
            for (j, (ej, tj)) in e.iter_mut().zip(t.iter_mut()).enumerate() {
                let esc_bucket = (j as u32) & 0x3;
                let tot_bucket = ((j as u32) >> 2) & 0x7;
                *ej = 1 + (ZESC_INIT_SCALE * esc_bucket) + ZESC_INIT_ESC;
                *tj = 2 + (ZESC_INIT_SCALE * tot_bucket) + ZESC_INIT_TOT + ZESC_INIT_ESC;
            }
            esc[i] = e;
            tot[i] = t;
        }
        EscapePredictor { esc, tot }
    }

    fn pick_bins(key: u32, escape_count: u32, total_symbols_count: u32, followset_size: u32) -> Bins {
        const TOTAL_CODE: [u32; 13] = [0, 1, 2, 3, 3, 4, 4, 5, 5, 5, 6, 6, 6];

        let total_count = escape_count + total_symbols_count;
        debug_assert!(escape_count >= 1);
        debug_assert!(total_count >= 2);

        let followset_size = followset_size.min(3);
        if escape_count >= 4 {
            return Bins { indices: [0; 3], found: false };
        }

        let total_code = if total_count >= 15 { 7 } else { TOTAL_CODE[(total_count - 2) as usize] };
        let counts = (escape_count - 1) | (total_code << 2);

        let bin2 = counts | ((((key & 0x7F) + (((key >> 13) & 0x3) << 7)) + (followset_size << 9)) << 5);
        let bin1 = counts
            | (((((key >> 5) & 0x3)
                + (((key >> 13) & 0x3) << 2)
                + (((key >> 21) & 0x3) << 4)
                + (((key >> 29) & 0x3) << 6))
                + (followset_size << 8))
                << 5);
        let bin0 = counts | (followset_size << 5);

        Bins { indices: [bin0, bin1, bin2], found: true }
    }

    fn estimate(&self, key: u32, escape_count: u32, total_symbol_count: u32, followset_size: u32) -> (u32, u32, Bins) {
        let picked = Self::pick_bins(key, escape_count, total_symbol_count, followset_size);
        if !picked.found {
            return (escape_count, escape_count + total_symbol_count, picked);
        }

        let e0 = self.esc[0][picked.indices[0] as usize];
        let t0 = self.tot[0][picked.indices[0] as usize];
        let e1 = self.esc[1][picked.indices[1] as usize];
        let t1 = self.tot[1][picked.indices[1] as usize];
        let e2 = self.esc[2][picked.indices[2] as usize];
        let t2 = self.tot[2][picked.indices[2] as usize];

        let weight = |t: u32, e: u32| -> u32 {
            (1u32 << 16) / (t * log2_coarse(t) - e * log2_coarse(e) - (t - e) * log2_coarse(t - e) + 1)
        };
        let w0 = weight(t0, e0);
        let w1 = weight(t1, e1);
        let w2 = weight(t2, e2);

        let mut total = w0 * t0 + w1 * t1 + w2 * t2;
        let mut escapes = w0 * e0 + w1 * e1 + w2 * e2;

        if total >= 1 << 21 {
            total >>= 8;
            escapes >>= 8;
        }
        if total >= 1 << 17 {
            total >>= 4;
            escapes >>= 4;
        }
        if total >= 1 << 15 {
            total >>= 2;
            escapes >>= 2;
        }
        if total >= 1 << 14 {
            total >>= 1;
            escapes >>= 1;
        }
        if escapes < 1 {
            escapes = 1;
        }
        if total <= escapes {
            total = escapes + 1;
        }
        (escapes, total, picked)
    }

    fn update(&mut self, bins: &Bins, escape: bool) {
        if !bins.found {
            return;
        }
        for i in 0..3 {
            let h = bins.indices[i] as usize;
            if escape {
                self.tot[i][h] += ZESC_ESC_INC + ZESC_ESCTOT_INC;
                self.esc[i][h] += ZESC_ESC_INC;
            } else {
                self.tot[i][h] += ZESC_TOT_INC;
            }
            if self.tot[i][h] > 16000 {
                self.tot[i][h] >>= 1;
                self.esc[i][h] >>= 1;
                if self.esc[i][h] < 1 {
                    self.esc[i][h] = 1;
                }
            }
        }
    }

    pub fn encode(&mut self, enc: &mut Encoder, key: u32, escape_count: u32, total_symbol_count: u32, followset_size: u32, escape: bool) {
        let (escapes, total, bins) = self.estimate(key, escape_count, total_symbol_count, followset_size);
        self.update(&bins, escape);
        enc.encode_bit((total - escapes) as u64, total as u64, escape);
    }

    pub fn decode(&mut self, dec: &mut Decoder, key: u32, escape_count: u32, total_symbol_count: u32, followset_size: u32) -> bool {
        let (escapes, total, bins) = self.estimate(key, escape_count, total_symbol_count, followset_size);
        let escape = dec.decode_bit((total - escapes) as u64, total as u64);
        self.update(&bins, escape);
        escape
    }
}

impl Default for EscapePredictor {
    fn default() -> Self {
        Self::new()
    }
}
