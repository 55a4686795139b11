//! Two distinct integer log2 approximations, each feeding a different
//! entropy-weighted blend. They are not interchangeable: the SEE module
//! (`see.rs`) needs the finer `ilog2round` table to keep its four-way
//! blend stable, while the escape predictor (`deterministic.rs`) was
//! tuned against the coarser `intlog2r` table. Keeping both, rather than
//! picking one, matches what each blend was calibrated against.

use std::sync::OnceLock;

/// Rounded log2 of `val`, computed bit-length-first then corrected
/// against a sqrt(2) threshold so halves round to the nearer power of two.
fn ilog2round(val: u32) -> u32 {
    if val == 0 {
        return 0;
    }
    let mut u = 1u32;
    while (1u32 << u) <= val {
        u += 1;
    }
    u -= 1;
    let shifted = val << (16 - u);
    if shifted >= 92682 {
        u += 1;
    }
    u
}

const ILOG2ROUND_TAB_LEN: usize = 8192;

fn ilog2round_tab() -> &'static [u32; ILOG2ROUND_TAB_LEN] {
    static TAB: OnceLock<[u32; ILOG2ROUND_TAB_LEN]> = OnceLock::new();
    TAB.get_or_init(|| {
        let mut t = [0u32; ILOG2ROUND_TAB_LEN];
        for (i, slot) in t.iter_mut().enumerate().skip(1) {
            *slot = ilog2round(i as u32);
        }
        t
    })
}

/// Rounded log2 via the fine-grained (8192-entry) table, used by SEE.
pub fn log2_fine(val: u32) -> u32 {
    let v = val as usize;
    if v < ILOG2ROUND_TAB_LEN {
        ilog2round_tab()[v]
    } else {
        ilog2round(val)
    }
}

const RBITS: [u8; 256] = [
    0, 0, 1, 2, 2, 2, 3, 3, 3, 3, 3, 3, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5,
    6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6,
    6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6,
    7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7,
    7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7,
    7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7,
    7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7,
    8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8,
    8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8,
    8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8,
    8, 8, 8, 8, 8,
];

/// Rounded log2 via the coarse 256-entry byte table, used by the
/// deterministic escape predictor.
pub fn log2_coarse(n: u32) -> u32 {
    if n >> 16 != 0 {
        if n >> 24 != 0 {
            24 + RBITS[(n >> 24) as usize] as u32
        } else {
            16 + RBITS[(n >> 16) as usize] as u32
        }
    } else if n >> 8 != 0 {
        8 + RBITS[(n >> 8) as usize] as u32
    } else {
        RBITS[n as usize] as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coarse_matches_reference_points() {
        assert_eq!(log2_coarse(0), 0);
        assert_eq!(log2_coarse(1), 0);
        assert_eq!(log2_coarse(2), 1);
        assert_eq!(log2_coarse(255), 8);
        assert_eq!(log2_coarse(256), 8);
    }

    #[test]
    fn fine_is_monotonic_nondecreasing() {
        let mut prev = 0;
        for v in 1..4096u32 {
            let cur = log2_fine(v);
            assert!(cur >= prev);
            prev = cur;
        }
    }
}
