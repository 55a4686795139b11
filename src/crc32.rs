//! CRC32 (IEEE 802.3 polynomial), computed with a byte-indexed table.
//! Not sourced from any third-party crate: the container format only
//! ever needs this one checksum, so pulling in an external dependency
//! for it would add a crate this workspace has no other use for.

const POLY: u32 = 0xEDB8_8320;

fn table() -> &'static [u32; 256] {
    use std::sync::OnceLock;
    static TABLE: OnceLock<[u32; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u32; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            let mut c = i as u32;
            for _ in 0..8 {
                c = if c & 1 != 0 { POLY ^ (c >> 1) } else { c >> 1 };
            }
            *slot = c;
        }
        table
    })
}

/// A type that can compute its own CRC32 checksum.
pub trait Crc32 {
    fn crc32(&self) -> u32;
}
impl Crc32 for [u8] {
    fn crc32(&self) -> u32 {
        let table = table();
        let mut crc = 0xFFFF_FFFFu32;
        for &byte in self {
            let idx = ((crc ^ byte as u32) & 0xFF) as usize;
            crc = table[idx] ^ (crc >> 8);
        }
        crc ^ 0xFFFF_FFFF
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        // "123456789" -> 0xCBF43926 is the standard CRC-32/ISO-HDLC check value.
        assert_eq!(b"123456789".crc32(), 0xCBF4_3926);
    }

    #[test]
    fn empty_input() {
        assert_eq!([].crc32(), 0);
    }
}
