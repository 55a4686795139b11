//! Compile-time coding parameters. Any change here breaks decoder
//! compatibility with data encoded by a previous build.

/// Maximum explicit context order modeled by the trie.
pub const PZIP_ORDER: usize = 8;

/// History prefill window consulted when building active-context suffixes.
pub const PZIP_MAX_CONTEXT_LEN: usize = 32;

/// Bytes copied verbatim at the front of the compressed payload.
pub const PZIP_SEED_BYTES: usize = 8;

/// Fill byte for the synthetic history preceding position 0.
pub const PZIP_SEED_BYTE: u8 = 214;

/// Default trie budget in megabytes, translated to `max_lru_contexts`.
pub const PZIP_TRIE_MEGS_DEFAULT: u64 = 72;

// Follow-set / context update increments.
pub const CONTEXT_SYMBOL_INC_NOVEL: u32 = 1;
pub const CONTEXT_SYMBOL_INC: u32 = 1;
pub const CONTEXT_ESCP_INC: u32 = 1;
pub const CONTEXT_ESCAPE_MAX: u32 = 20;
pub const CONTEXT_COUNT_HALVE_THRESHOLD: u32 = 4096;

// Followset-stats-with-exclusions heuristic.
pub const CONTEXT_EXCLUDED_ESCAPE_SHIFT: u32 = 2;
pub const CONTEXT_EXCLUDED_ESCAPE_INIT: u32 = 6;
pub const CONTEXT_EXCLUDED_ESCAPE_INC: u32 = 4;
pub const CONTEXT_EXCLUDED_ESCAPE_EXCLUDEDINC: u32 = 3;

// Deterministic extender.
pub const DETERMINISTIC_MIN_LEN_INC: u32 = 2;
pub const DETERMINISTIC_MIN_ORDER: u32 = 24;
pub const DETERMINISTIC_MAX_MATCH_LEN: u32 = 1024;
pub const DETERMINISTIC_MAX_NODES_TO_VISIT: u32 = 100;
pub const NODE_ARRAY_SIZE: usize = 1 << 18;
pub const DETERMINISTIC_FORCE_ACCEPT_LEN: u32 = 64;

// Escape predictor (C5a) seeds and increments.
pub const ZESC_INIT_ESC: u32 = 8;
pub const ZESC_INIT_TOT: u32 = 12;
pub const ZESC_INIT_SCALE: u32 = 7;
pub const ZESC_ESC_INC: u32 = 17;
pub const ZESC_ESCTOT_INC: u32 = 1;
pub const ZESC_TOT_INC: u32 = 17;

// SEE (C6).
pub const SEE_INIT_SCALE: u32 = 7;
pub const SEE_INIT_ESC: u32 = 8;
pub const SEE_INIT_TOT: u32 = 18;
pub const SEE_INC: u32 = 17;
pub const SEE_ESC_TOT_EXTRA_INC: u32 = 1;
pub const SEE_SCALE_DOWN: u32 = 8000;
pub const SEE_ESC_SCALE_DOWN: u32 = 500;

/// Fixed-point scale used when the driver compares model ratings.
pub const PZIP_INTPROB_SHIFT: u32 = 16;
pub const PZIP_INTPROB_ONE: u32 = 1 << PZIP_INTPROB_SHIFT;

/// Translate a "trie megabytes" budget into a context-count ceiling.
/// The reference implementation sizes this off its own `Context` struct
/// layout; we use a generous fixed per-context cost that keeps the ratio
/// of contexts to megabytes roughly aligned with the original's 72 MiB
/// default producing ~1.35M live contexts.
pub fn max_lru_contexts(trie_megs: u64) -> usize {
    const BYTES_PER_CONTEXT: u64 = 56;
    ((trie_megs * 1024 * 1024) / BYTES_PER_CONTEXT) as usize
}

/// If the trie fails to find an evictable leaf within `EVICT_SCAN_BOUND`
/// candidates this many calls in a row, every recently touched context
/// still has live children and the budget genuinely cannot be honored --
/// further coding is refused instead of letting the arena grow without
/// limit.
pub const TRIE_EXHAUSTION_STRIKES: u32 = 4096;
