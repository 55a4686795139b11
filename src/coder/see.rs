//! Secondary Escape Estimation (C6): refines the raw escape/total counts
//! a context hands the arithmetic coder by blending them with three
//! hashed, shared tables of escape statistics (one per "order" of
//! hashing, not to be confused with trie order) plus the context's own
//! counts, weighted by each source's inverse entropy.
//!
//! The two `tottab` tables below look alike but are not interchangeable:
//! the 8-entry one seeds a state the first time it is reached (indexed
//! by an exact escape/total pair), while the 14-entry one buckets a
//! *continuous* total-count into one of seven codes as part of building
//! the 15-bit hash. Collapsing them into one table would silently change
//! which states alias each other.

use super::arith::{Decoder, Encoder};
use crate::log2::log2_fine;
use crate::params::{SEE_ESC_SCALE_DOWN, SEE_ESC_TOT_EXTRA_INC, SEE_INC, SEE_INIT_ESC, SEE_INIT_SCALE, SEE_INIT_TOT, SEE_SCALE_DOWN};

const ORDER0_BITS: u32 = 9;
const ORDER1_BITS: u32 = 16;
const ORDER2_BITS: u32 = 23;
const ORDER0_SIZE: usize = 1 << ORDER0_BITS;
const ORDER1_SIZE: usize = 1 << ORDER1_BITS;
const ORDER2_SIZE: usize = 1 << ORDER2_BITS;

const MAX_SEE_ESCC: u32 = 3;
const MAX_SEE_TOTC: u32 = 64;

/// Seeds an (escape_count, total_count) pair the first time a state is reached.
const SEED_TOTTAB: [u32; 8] = [0, 1, 2, 3, 5, 8, 11, 20];

/// Buckets a continuous total count into a 3-bit code while building the hash.
const HASH_TOTTAB: [u32; 14] = [0, 1, 2, 3, 3, 4, 4, 5, 5, 5, 6, 6, 6, 6];

#[derive(Clone, Copy)]
pub struct SeeStateId(u32);

#[derive(Clone, Copy, Default)]
struct SeeState {
    parent: Option<u32>,
    seen: u32,
    escapes: u32,
    total: u32,
}

pub struct See {
    order0: Vec<SeeState>,
    order1: Vec<SeeState>,
    order2: Vec<SeeState>,
}

struct Blend {
    escapes: u32,
    total: u32,
}

impl See {
    pub fn new() -> Self {
        let mut see = See {
            order0: vec![SeeState::default(); ORDER0_SIZE],
            order1: vec![SeeState::default(); ORDER1_SIZE],
            order2: vec![SeeState::default(); ORDER2_SIZE],
        };
        see.seed();
        see
    }

    fn seed(&mut self) {
        for e in 0..=3u32 {
            let escape_count = e + 1;
            for t in 0..=7u32 {
                let total_count = SEED_TOTTAB[t as usize];
                let total_symbol_count = total_count + escape_count;

                let h_hi = (e << 3) + t;
                let seed_escape = escape_count * SEE_INIT_SCALE + SEE_INIT_ESC;
                let seed_total = (escape_count + total_symbol_count) * SEE_INIT_SCALE + SEE_INIT_TOT;
                let shift = ORDER1_BITS - 5;

                for h_lo in 0..(1u32 << shift) {
                    let hash = ((h_hi << shift) | h_lo) as usize;
                    let order0_idx = hash >> (ORDER1_BITS - ORDER0_BITS);
                    self.order1[hash] = SeeState {
                        parent: Some(order0_idx as u32),
                        seen: 0,
                        escapes: seed_escape,
                        total: seed_total,
                    };
                    self.order0[order0_idx] = SeeState {
                        parent: None,
                        seen: 0,
                        escapes: seed_escape,
                        total: seed_total,
                    };
                }
            }
        }
    }

    fn stats_from_hash(order1_idx: u32, five_bits: u32) -> SeeState {
        let e = five_bits >> 3;
        let t = five_bits & 7;
        let total = SEED_TOTTAB[t as usize];
        let escape_count = e + 1;
        let total_symbol_count = total + escape_count;
        let seed_escape = escape_count * SEE_INIT_SCALE + SEE_INIT_ESC;
        let seed_total = (escape_count + total_symbol_count) * SEE_INIT_SCALE + SEE_INIT_TOT;
        SeeState { parent: Some(order1_idx), seen: 0, escapes: seed_escape, total: seed_total }
    }

    /// Returns a handle to the hashed state for this context, or `None`
    /// if the (escape_count, total) pair falls outside every bin we
    /// bother to hash (the caller then codes with the raw counts).
    pub fn get_state(
        &mut self,
        escape_count: u32,
        total_symbol_count: u32,
        key: u32,
        order: u8,
        followset_size: u32,
        parent_followset_size: u32,
    ) -> Option<SeeStateId> {
        if total_symbol_count == 0 {
            return None;
        }
        debug_assert!(followset_size >= 1);
        debug_assert!(escape_count >= 1);
        debug_assert!(total_symbol_count >= escape_count);

        let total = total_symbol_count - escape_count;
        let escapes = escape_count - 1;

        if escapes > MAX_SEE_ESCC || total >= MAX_SEE_TOTC {
            return None;
        }

        let mut hash: u32 = escapes << 3;
        hash |= if total <= 13 { HASH_TOTTAB[total as usize] } else { 7 };

        hash <<= 2;
        hash |= if escapes >= 1 {
            (order >= 3) as u32
        } else {
            ((order as u32) >> 1).min(3)
        };

        hash <<= 2;
        hash |= parent_followset_size.min(3);

        hash <<= 1;
        hash |= (followset_size == 1) as u32;

        if order > 0 {
            hash <<= 2;
            hash |= (key >> 5) & 0x3;
        }
        if order > 1 {
            hash <<= 2;
            hash |= (key >> 13) & 0x3;
        }
        if escapes <= 1 {
            if order > 2 {
                hash <<= 2;
                hash |= (key >> 21) & 0x3;
            }
            if order > 3 {
                hash <<= 2;
                hash |= (key >> 29) & 0x3;
            }
        }

        hash <<= 5;
        hash |= key & 31;
        debug_assert!((hash as usize) < ORDER2_SIZE);

        let hash1 = hash >> (ORDER2_BITS - ORDER1_BITS);
        if self.order2[hash as usize].parent.is_none() {
            self.order2[hash as usize] = Self::stats_from_hash(hash1, hash >> (ORDER2_BITS - 5));
        }
        Some(SeeStateId(hash))
    }

    fn get_stats(&self, ss2_idx: u32, in_esc: u32, in_tot: u32) -> Blend {
        let ss2 = &self.order2[ss2_idx as usize];
        let ss1 = &self.order1[ss2.parent.unwrap() as usize];
        let ss0 = &self.order0[ss1.parent.unwrap() as usize];

        let (e0, t0, s0) = (ss0.escapes, ss0.total, ss0.seen);
        let (e1, t1, s1) = (ss1.escapes, ss1.total, ss1.seen);
        let (e2, t2, s2) = (ss2.escapes, ss2.total, ss2.seen);

        let entropy_weight = |t: u32, e: u32| -> u32 {
            (1u32 << 16) / (t * log2_fine(t) - e * log2_fine(e) - (t - e) * log2_fine(t - e) + 1)
        };

        let mut w0 = entropy_weight(t0, e0);
        let mut w1 = entropy_weight(t1, e1);
        let mut w2 = entropy_weight(t2, e2);
        if s0 != 0 {
            w0 <<= 2;
        }
        if s1 != 0 {
            w1 <<= 2;
        }
        if s2 != 0 {
            w2 <<= 2;
        }

        let wi = entropy_weight(in_tot, in_esc);

        let mut total = w0 * t0 + w1 * t1 + w2 * t2 + wi * in_tot;
        let mut escapes = w0 * e0 + w1 * e1 + w2 * e2 + wi * in_esc;

        while total >= 16000 {
            total >>= 1;
            escapes >>= 1;
        }
        if escapes < 1 {
            escapes = 1;
        }
        if total <= escapes {
            total = escapes + 1;
        }
        Blend { escapes, total }
    }

    pub fn encode_escape(
        &mut self,
        enc: &mut Encoder,
        ss: Option<SeeStateId>,
        escape_count: u32,
        total_symbol_count: u32,
        escape: bool,
    ) {
        match ss {
            None => enc.encode_bit(total_symbol_count as u64, (escape_count + total_symbol_count) as u64, escape),
            Some(ss) => {
                let x = self.get_stats(ss.0, escape_count, escape_count + total_symbol_count);
                enc.encode_bit(x.escapes as u64, x.total as u64, !escape);
                self.adjust_state(Some(ss), escape);
            }
        }
    }

    pub fn decode_escape(
        &mut self,
        dec: &mut Decoder,
        ss: Option<SeeStateId>,
        escape_count: u32,
        total_symbol_count: u32,
    ) -> bool {
        match ss {
            None => dec.decode_bit(total_symbol_count as u64, (escape_count + total_symbol_count) as u64),
            Some(ss) => {
                let x = self.get_stats(ss.0, escape_count, escape_count + total_symbol_count);
                let not_escape = dec.decode_bit(x.escapes as u64, x.total as u64);
                let escape = !not_escape;
                self.adjust_state(Some(ss), escape);
                escape
            }
        }
    }

    pub fn estimate_escape_probability(&self, ss: Option<SeeStateId>, escape_count: u32, total_symbol_count: u32) -> u32 {
        use crate::params::PZIP_INTPROB_SHIFT;
        match ss {
            Some(ss) => {
                let x = self.get_stats(ss.0, escape_count, escape_count + total_symbol_count);
                (x.escapes << PZIP_INTPROB_SHIFT) / x.total
            }
            None => (escape_count << PZIP_INTPROB_SHIFT) / (escape_count + total_symbol_count),
        }
    }

    fn bump(state: &mut SeeState, escape: bool) {
        state.seen += 1;
        if escape {
            state.escapes += SEE_INC;
            state.total += SEE_INC + SEE_ESC_TOT_EXTRA_INC;
        } else {
            if state.escapes >= SEE_ESC_SCALE_DOWN {
                state.escapes = (state.escapes >> 1) + 1;
                state.total = (state.total >> 1) + 2;
            }
            state.total += SEE_INC;
        }
        if state.total >= SEE_SCALE_DOWN {
            state.escapes = (state.escapes >> 1) + 1;
            state.total = (state.total >> 1) + 2;
        }
    }

    /// Walks a state and its whole parent chain (order2 -> order1 ->
    /// order0), applying the same update to each. The chain is always
    /// exactly three tables deep, so this is unrolled rather than a
    /// generic loop over a single index space.
    pub fn adjust_state(&mut self, ss: Option<SeeStateId>, escape: bool) {
        let Some(ss2) = ss else { return };
        let ss1_idx = self.order2[ss2.0 as usize].parent.unwrap();
        let ss0_idx = self.order1[ss1_idx as usize].parent.unwrap();

        Self::bump(&mut self.order2[ss2.0 as usize], escape);
        Self::bump(&mut self.order1[ss1_idx as usize], escape);
        Self::bump(&mut self.order0[ss0_idx as usize], escape);
    }
}

impl Default for See {
    fn default() -> Self {
        Self::new()
    }
}
