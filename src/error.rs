use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong decoding a container or running the
/// statistical core. Never surfaces a panic to a caller on malformed
/// input; the only panics left in this crate are `debug_assert!`s that
/// indicate a coder/decoder desynchronization bug, not bad input.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("context trie exceeded its memory budget: {got} live contexts cannot be bounded back down to {needed} by eviction")]
    ResourceExhausted { needed: usize, got: usize },

    #[error("container is truncated: expected a 12-byte header, got {got} bytes")]
    InputTruncated { got: usize },

    #[error("not a prizip container: bad magic number {0:#010x}")]
    BadMagic(u32),

    #[error("decoded output failed its checksum: expected {expected:#010x}, got {actual:#010x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Command-line configuration errors, reported before any coding work starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no input file specified")]
    NoInput,

    #[error("{0} is not a valid input file")]
    InvalidInput(PathBuf),

    #[error("{0} is outside the valid range of memory options (0..9)")]
    OutOfRangeMemory(u64),

    #[error("could not parse memory option")]
    InvalidMemory,
}
