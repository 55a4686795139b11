//! Per-symbol coding loop (C7): for each byte, first gives the
//! deterministic matcher a shot, then walks context orders from highest
//! to lowest -- picking which order to try next by a "local order
//! estimation" rating rather than always starting at the top -- falling
//! through to the flat order-(-1) coder as a last resort. Also threads
//! the one piece of bookkeeping shared by every one of those coders: the
//! 4-byte key built from the three bytes before `pos` plus `pos - 1`
//! itself, used everywhere as a cheap recent-history hash.

use super::arith::{Decoder, Encoder};
use super::excluded::ExcludedSymbols;
use super::order_neg1;
use super::see::See;
use super::trie::{ContextId, Trie};
use super::deterministic::Det;
use crate::error::CodecError;
use crate::params::{
    PZIP_INTPROB_ONE, PZIP_MAX_CONTEXT_LEN, PZIP_ORDER, PZIP_SEED_BYTE, PZIP_SEED_BYTES,
};

/// Packs `buf[pos-4..pos]` big-endian, most recent byte in the low byte --
/// the shared "last four characters" hash fed to every statistical model.
pub fn packed_key4(buf: &[u8], pos: usize) -> u32 {
    ((buf[pos - 4] as u32) << 24)
        | ((buf[pos - 3] as u32) << 16)
        | ((buf[pos - 2] as u32) << 8)
        | (buf[pos - 1] as u32)
}

/// Running counts surfaced to the caller after a full encode/decode pass,
/// for logging only -- nothing here feeds back into the coding itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stats {
    pub symbols_total: u64,
    pub symbols_det_coded: u64,
    pub symbols_by_order: [u64; PZIP_ORDER + 2],
    pub symbols_order_neg1: u64,
}

pub struct Driver {
    pub trie: Trie,
    see: See,
    det: Det,
    excl: ExcludedSymbols,
    stats: Stats,
}

impl Driver {
    pub fn new(max_lru_contexts: usize) -> Self {
        Driver {
            trie: Trie::new(max_lru_contexts),
            see: See::new(),
            det: Det::new(),
            excl: ExcludedSymbols::new(),
            stats: Stats::default(),
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Rates every candidate context in `contexts[0..count]` and returns
    /// the index of the one judged most likely to code this symbol
    /// without escaping. Mutates `see` only by lazily seeding hashed
    /// states it looks up along the way.
    fn choose_context(&mut self, contexts: &[ContextId; PZIP_ORDER + 1], count: usize, key: u32) -> usize {
        let mut best_i = 0usize;
        let mut best_rating: u32 = 0;

        let mut i = count;
        while i > 0 {
            i -= 1;
            if i == 0 && best_rating == 0 {
                return 0;
            }

            let id = contexts[i];
            if self.trie.context(id).total_symbol_count == 0 {
                continue;
            }

            let mut stats = self.trie.followset_stats_excluding(id, &self.excl);
            if stats.total_count == 0 {
                continue;
            }

            if self.trie.context(id).followset_size() > 1 {
                stats.total_count += stats.escape_count;
            }

            let ss = if stats.total_count >= stats.escape_count {
                let order = self.trie.context(id).order;
                let followset_size = self.trie.context(id).followset_size() as u32;
                let parent_followset_size = self.trie.context(id).parent.map(|p| self.trie.context(p).followset_size() as u32).unwrap_or(0);
                self.see.get_state(stats.escape_count, stats.total_count, key, order, followset_size, parent_followset_size)
            } else {
                None
            };

            let escape_prob = self.see.estimate_escape_probability(ss, stats.escape_count, stats.total_count);
            let rating = ((PZIP_INTPROB_ONE - escape_prob) * stats.max_count) / stats.total_count;
            if rating > best_rating {
                best_rating = rating;
                best_i = i;
            }
        }
        best_i
    }

    fn see_state_for_coding(&mut self, id: ContextId, key: u32, escape_count: u32, total_count: u32) -> Option<super::see::SeeStateId> {
        if escape_count > total_count {
            return None;
        }
        let order = self.trie.context(id).order;
        let followset_size = self.trie.context(id).followset_size() as u32;
        let parent_followset_size = self.trie.context(id).parent.map(|p| self.trie.context(p).followset_size() as u32).unwrap_or(0);
        self.see.get_state(escape_count, total_count, key, order, followset_size, parent_followset_size)
    }

    /// Tries to code `symbol` from context `id`. Returns `true` if it
    /// did; on a miss it has still added every unexcluded followset
    /// symbol of `id` to `excl` before returning `false`.
    fn try_encode_context(&mut self, enc: &mut Encoder, id: ContextId, key: u32, symbol: u8) -> bool {
        if self.trie.context(id).total_symbol_count == 0 {
            return false;
        }
        let stats = self.trie.followset_stats_excluding(id, &self.excl);
        if stats.total_count == 0 {
            return false;
        }

        let mut low = 0u64;
        let mut high = 0u64;
        for entry_idx in 0..self.trie.context(id).followset.len() {
            let (entry_symbol, entry_count) = {
                let e = &self.trie.context(id).followset[entry_idx];
                (e.symbol, e.count)
            };
            if self.excl.contains(entry_symbol) {
                continue;
            }
            if entry_symbol == symbol {
                high = low + entry_count as u64;
            } else if high == 0 {
                low += entry_count as u64;
            }
            self.excl.add(entry_symbol);
        }

        let ss = self.see_state_for_coding(id, key, stats.escape_count, stats.total_count);
        if high != 0 {
            self.see.encode_escape(enc, ss, stats.escape_count, stats.total_count, false);
            enc.encode_1_of_n(low, high, stats.total_count as u64);
            true
        } else {
            self.see.encode_escape(enc, ss, stats.escape_count, stats.total_count, true);
            false
        }
    }

    fn try_decode_context(&mut self, dec: &mut Decoder, id: ContextId, key: u32) -> Option<u8> {
        if self.trie.context(id).total_symbol_count == 0 {
            return None;
        }
        let stats = self.trie.followset_stats_excluding(id, &self.excl);
        if stats.total_count == 0 {
            return None;
        }

        let ss = self.see_state_for_coding(id, key, stats.escape_count, stats.total_count);
        let escaped = self.see.decode_escape(dec, ss, stats.escape_count, stats.total_count);
        if escaped {
            for entry_idx in 0..self.trie.context(id).followset.len() {
                let s = self.trie.context(id).followset[entry_idx].symbol;
                self.excl.add(s);
            }
            return None;
        }

        let total = stats.total_count as u64;
        let got = dec.get_1_of_n(total);
        let mut low = 0u64;
        for entry_idx in 0..self.trie.context(id).followset.len() {
            let (entry_symbol, entry_count) = {
                let e = &self.trie.context(id).followset[entry_idx];
                (e.symbol, e.count)
            };
            if self.excl.contains(entry_symbol) {
                continue;
            }
            let high = low + entry_count as u64;
            if got < high {
                dec.decode_1_of_n(low, high, total);
                return Some(entry_symbol);
            }
            low = high;
        }
        unreachable!("followset stats accounted for every unexcluded symbol")
    }

    pub fn encode_symbol(&mut self, enc: &mut Encoder, buf: &[u8], pos: usize) -> Result<(), CodecError> {
        let symbol = buf[pos];
        let key = packed_key4(buf, pos);
        let contexts = self.trie.fill_active_contexts(buf, pos);
        if self.trie.is_exhausted() {
            return Err(CodecError::ResourceExhausted {
                needed: self.trie.max_lru_contexts(),
                got: self.trie.live_context_count(),
            });
        }

        self.excl.clear();

        let top = contexts[PZIP_ORDER];
        let mut det_slot = self.trie.context(top).det;
        let top_followset_size = self.trie.context(top).followset_size() as u32;
        let det_coded = self.det.encode(enc, &mut self.excl, key, buf, pos, symbol, det_slot, top_followset_size);
        self.trie.context_mut(top).det = det_slot;

        self.stats.symbols_total += 1;
        if det_coded {
            self.stats.symbols_det_coded += 1;
        } else {
            let mut order = PZIP_ORDER + 1;
            order = self.choose_context(&contexts, order, key);
            loop {
                if self.try_encode_context(enc, contexts[order], key, symbol) {
                    break;
                }
                if order == 0 {
                    order_neg1::encode(enc, &self.excl, symbol);
                    self.stats.symbols_order_neg1 += 1;
                    break;
                }
                order = self.choose_context(&contexts, order, key);
            }

            let coded_order = order as u8;
            self.stats.symbols_by_order[coded_order as usize] += 1;
            for o in 0..=PZIP_ORDER {
                self.trie.context_update(contexts[o], symbol, coded_order, &mut self.see, key);
            }
        }

        det_slot = self.trie.context(top).det;
        self.det.update(&mut det_slot, buf, pos, symbol);
        self.trie.context_mut(top).det = det_slot;
        Ok(())
    }

    pub fn decode_symbol(&mut self, dec: &mut Decoder, buf: &mut [u8], pos: usize) -> Result<u8, CodecError> {
        let key = packed_key4(buf, pos);
        let contexts = self.trie.fill_active_contexts(buf, pos);
        if self.trie.is_exhausted() {
            return Err(CodecError::ResourceExhausted {
                needed: self.trie.max_lru_contexts(),
                got: self.trie.live_context_count(),
            });
        }

        self.excl.clear();

        let top = contexts[PZIP_ORDER];
        let mut det_slot = self.trie.context(top).det;
        let top_followset_size = self.trie.context(top).followset_size() as u32;
        let det_symbol = self.det.decode(dec, &mut self.excl, key, buf, pos, det_slot, top_followset_size);
        self.trie.context_mut(top).det = det_slot;

        self.stats.symbols_total += 1;
        let symbol = if let Some(symbol) = det_symbol {
            self.stats.symbols_det_coded += 1;
            symbol
        } else {
            let mut order = PZIP_ORDER + 1;
            order = self.choose_context(&contexts, order, key);
            let mut used_order_neg1 = false;
            let symbol = loop {
                if let Some(symbol) = self.try_decode_context(dec, contexts[order], key) {
                    break symbol;
                }
                if order == 0 {
                    used_order_neg1 = true;
                    break order_neg1::decode(dec, &self.excl);
                }
                order = self.choose_context(&contexts, order, key);
            };

            let coded_order = order as u8;
            if used_order_neg1 {
                self.stats.symbols_order_neg1 += 1;
            }
            self.stats.symbols_by_order[coded_order as usize] += 1;
            for o in 0..=PZIP_ORDER {
                self.trie.context_update(contexts[o], symbol, coded_order, &mut self.see, key);
            }
            symbol
        };

        buf[pos] = symbol;
        det_slot = self.trie.context(top).det;
        self.det.update(&mut det_slot, buf, pos, symbol);
        self.trie.context_mut(top).det = det_slot;

        Ok(symbol)
    }
}

/// Lays out a working buffer the way the reference coder's `input_buf`
/// does: `PZIP_MAX_CONTEXT_LEN` bytes of the synthetic fill byte so the
/// very first real symbols still have a full history window to hash,
/// followed by the real bytes.
fn seeded_buf(real: &[u8]) -> Vec<u8> {
    let mut buf = vec![PZIP_SEED_BYTE; PZIP_MAX_CONTEXT_LEN + real.len()];
    buf[PZIP_MAX_CONTEXT_LEN..].copy_from_slice(real);
    buf
}

/// Compresses `input` into a self-delimiting payload: `min(input.len(),
/// PZIP_SEED_BYTES)` bytes copied verbatim, followed by the arithmetic
/// coder's output for whatever real bytes remain. Input shorter than
/// `PZIP_SEED_BYTES` is carried entirely by the verbatim prefix, same as
/// the reference coder's exactly-`PZIP_SEED_BYTES`-long-input case, just
/// generalized so it never reads before the start of `input`.
pub fn encode(input: &[u8], max_lru_contexts: usize) -> Result<(Vec<u8>, Stats), CodecError> {
    if input.is_empty() {
        return Ok((Vec::new(), Stats::default()));
    }

    let seed_len = input.len().min(PZIP_SEED_BYTES);
    let mut driver = Driver::new(max_lru_contexts);
    let buf = seeded_buf(input);

    let mut enc = Encoder::new();
    for real_pos in seed_len..input.len() {
        driver.encode_symbol(&mut enc, &buf, PZIP_MAX_CONTEXT_LEN + real_pos)?;
    }
    let coded = enc.finish();

    let mut payload = Vec::with_capacity(seed_len + coded.len());
    payload.extend_from_slice(&input[..seed_len]);
    payload.extend_from_slice(&coded);
    Ok((payload, driver.stats()))
}

/// Mirror of [`encode`]: `output_len` is the original input length (the
/// payload alone does not self-describe it), taken from the container
/// header.
pub fn decode(payload: &[u8], output_len: usize, max_lru_contexts: usize) -> Result<(Vec<u8>, Stats), CodecError> {
    if output_len == 0 {
        return Ok((Vec::new(), Stats::default()));
    }

    let seed_len = output_len.min(PZIP_SEED_BYTES);
    let mut driver = Driver::new(max_lru_contexts);
    let mut buf = vec![PZIP_SEED_BYTE; PZIP_MAX_CONTEXT_LEN + output_len];
    buf[PZIP_MAX_CONTEXT_LEN..PZIP_MAX_CONTEXT_LEN + seed_len].copy_from_slice(&payload[..seed_len]);

    let mut dec = Decoder::new(&payload[seed_len..]);
    for real_pos in seed_len..output_len {
        driver.decode_symbol(&mut dec, &mut buf, PZIP_MAX_CONTEXT_LEN + real_pos)?;
    }

    Ok((buf[PZIP_MAX_CONTEXT_LEN..].to_vec(), driver.stats()))
}
