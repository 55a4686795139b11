//! Order-(-1): a flat distribution over whatever bytes survived every
//! higher order's exclusions. The coder of last resort.

use super::arith::{Decoder, Encoder};
use super::excluded::ExcludedSymbols;

pub fn encode(enc: &mut Encoder, excl: &ExcludedSymbols, symbol: u8) {
    debug_assert!(!excl.contains(symbol));

    let mut low = 0u64;
    for i in 0..symbol {
        if !excl.contains(i) {
            low += 1;
        }
    }
    let mut total = low + 1;
    for i in (symbol as u32 + 1)..256 {
        if !excl.contains(i as u8) {
            total += 1;
        }
    }
    enc.encode_1_of_n(low, low + 1, total);
}

pub fn decode(dec: &mut Decoder, excl: &ExcludedSymbols) -> u8 {
    let mut total = 0u64;
    for i in 0..=255u8 {
        if !excl.contains(i) {
            total += 1;
        }
    }

    let mut target = dec.get_1_of_n(total);
    dec.decode_1_of_n(target, target + 1, total);

    let mut symbol = 0u32;
    loop {
        while excl.contains(symbol as u8) {
            symbol += 1;
        }
        if target == 0 {
            return symbol as u8;
        }
        symbol += 1;
        target -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_with_exclusions() {
        let mut excl = ExcludedSymbols::new();
        excl.add(5);
        excl.add(200);

        let mut enc = Encoder::new();
        let symbols = [0u8, 1, 6, 199, 201, 255];
        for &s in &symbols {
            encode(&mut enc, &excl, s);
        }
        let bytes = enc.finish();
        let mut dec = Decoder::new(&bytes);
        for &s in &symbols {
            assert_eq!(decode(&mut dec, &excl), s);
        }
    }

    #[test]
    fn round_trip_no_exclusions() {
        let excl = ExcludedSymbols::new();
        let mut enc = Encoder::new();
        for s in 0..=255u8 {
            encode(&mut enc, &excl, s);
        }
        let bytes = enc.finish();
        let mut dec = Decoder::new(&bytes);
        for s in 0..=255u8 {
            assert_eq!(decode(&mut dec, &excl), s);
        }
    }
}
