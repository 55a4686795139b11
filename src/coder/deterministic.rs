//! Deterministic long-context matcher (C5): watches for suffixes of the
//! input seen before with one consistent successor, and when found,
//! predicts that successor directly instead of falling through the
//! order-by-order trie. Gets "right of first refusal" on every symbol.
//!
//! Match candidates live in a fixed-size ring of nodes (`NODE_ARRAY_SIZE`
//! slots) rather than being individually freed; the ring simply
//! overwrites its oldest entry once full, unlinking it from whichever
//! deterministic context it belonged to. Each deterministic context
//! threads its live nodes through an intrusive circular doubly-linked
//! list (`prev`/`next` on `DetNode`) so eviction and the match search
//! are both O(1) / O(visited), matching the reference's node-pool
//! design without needing the reference's raw pointer arithmetic.

use super::arith::{Decoder, Encoder};
use super::escape_predict::EscapePredictor;
use super::excluded::ExcludedSymbols;
use crate::params::{
    DETERMINISTIC_FORCE_ACCEPT_LEN, DETERMINISTIC_MAX_MATCH_LEN, DETERMINISTIC_MAX_NODES_TO_VISIT,
    DETERMINISTIC_MIN_LEN_INC, DETERMINISTIC_MIN_ORDER, NODE_ARRAY_SIZE, PZIP_MAX_CONTEXT_LEN,
};

const NODE_NONE: u32 = u32::MAX;

struct DetNode {
    min_len: u32,
    pos: u32,
    owner: Option<u32>,
    prev: u32,
    next: u32,
}

struct DetContext {
    matches_seen: u32,
    escapes_seen: u32,
    head: u32,
}

pub struct Det {
    nodes: Vec<DetNode>,
    cursor: u32,
    contexts: Vec<DetContext>,
    escape: EscapePredictor,

    cached_context: Option<u32>,
    cached_node: Option<u32>,
    cached_match_len: u32,
    longest_match_len: u32,
    next_node: Option<u32>,
}

fn longest_common_suffix(buf: &[u8], p: usize, q: usize) -> u32 {
    let mut p = p - 13;
    let mut q = q - 13;
    let max_len = p.min(q).min(DETERMINISTIC_MAX_MATCH_LEN as usize);
    let mut len = 0u32;
    loop {
        if buf[p] != buf[q] {
            break;
        }
        len += 1;
        if (len as usize) >= max_len || p == 0 || q == 0 {
            break;
        }
        p -= 1;
        q -= 1;
    }
    len + 12
}

impl Det {
    pub fn new() -> Self {
        let nodes = (0..NODE_ARRAY_SIZE)
            .map(|_| DetNode { min_len: 0, pos: 0, owner: None, prev: NODE_NONE, next: NODE_NONE })
            .collect();
        Det {
            nodes,
            cursor: 0,
            contexts: Vec::new(),
            escape: EscapePredictor::new(),
            cached_context: None,
            cached_node: None,
            cached_match_len: 0,
            longest_match_len: 0,
            next_node: None,
        }
    }

    fn unlink_node(&mut self, idx: u32) {
        let (owner, prev, next) = {
            let n = &self.nodes[idx as usize];
            (n.owner, n.prev, n.next)
        };
        let Some(owner) = owner else { return };
        if prev == idx {
            self.contexts[owner as usize].head = NODE_NONE;
        } else {
            self.nodes[prev as usize].next = next;
            self.nodes[next as usize].prev = prev;
            if self.contexts[owner as usize].head == idx {
                self.contexts[owner as usize].head = next;
            }
        }
        self.nodes[idx as usize].owner = None;
    }

    fn link_node(&mut self, owner: u32, idx: u32) {
        let head = self.contexts[owner as usize].head;
        if head == NODE_NONE {
            self.nodes[idx as usize].prev = idx;
            self.nodes[idx as usize].next = idx;
        } else {
            let tail = self.nodes[head as usize].prev;
            self.nodes[idx as usize].prev = tail;
            self.nodes[idx as usize].next = head;
            self.nodes[tail as usize].next = idx;
            self.nodes[head as usize].prev = idx;
        }
        self.contexts[owner as usize].head = idx;
        self.nodes[idx as usize].owner = Some(owner);
    }

    fn alloc_node(&mut self) -> u32 {
        let idx = self.cursor;
        self.cursor = (self.cursor + 1) % NODE_ARRAY_SIZE as u32;
        self.unlink_node(idx);
        idx
    }

    fn physically_next(&self, idx: u32) -> u32 {
        if idx + 1 == NODE_ARRAY_SIZE as u32 {
            0
        } else {
            idx + 1
        }
    }

    fn fetch_or_make_context(&mut self, det_slot: &mut Option<u32>) -> u32 {
        if let Some(idx) = *det_slot {
            return idx;
        }
        let idx = self.contexts.len() as u32;
        self.contexts.push(DetContext { matches_seen: 1, escapes_seen: 1, head: NODE_NONE });
        *det_slot = Some(idx);
        idx
    }

    fn add_node(&mut self, owner: u32, pos: u32, min_len: u32) {
        let idx = self.alloc_node();
        self.link_node(owner, idx);
        self.nodes[idx as usize].min_len = min_len.max(DETERMINISTIC_MIN_ORDER);
        self.nodes[idx as usize].pos = pos;
    }

    pub fn update(&mut self, det_slot: &mut Option<u32>, buf: &[u8], pos: usize, symbol: u8) {
        self.next_node = None;

        if let Some(node_idx) = self.cached_node {
            let owner = self.cached_context.expect("cached_node implies cached_context");
            let predicted = buf[self.nodes[node_idx as usize].pos as usize];
            if predicted == symbol {
                self.contexts[owner as usize].matches_seen += 1;
                self.next_node = Some(self.physically_next(node_idx));
            } else {
                self.contexts[owner as usize].escapes_seen += 1;
                self.nodes[node_idx as usize].min_len = self.cached_match_len + DETERMINISTIC_MIN_LEN_INC;
            }
        }

        let owner = self.fetch_or_make_context(det_slot);
        let longest_plus_one = self.longest_match_len + 1;
        self.add_node(owner, pos as u32, longest_plus_one);
    }

    fn find_best_node(&mut self, owner: Option<u32>, buf: &[u8], pos: usize) {
        let Some(owner) = owner else {
            self.cached_context = None;
            self.cached_node = None;
            self.longest_match_len = 0;
            self.cached_match_len = 0;
            return;
        };

        if pos < PZIP_MAX_CONTEXT_LEN + DETERMINISTIC_MIN_ORDER as usize {
            // Not enough real history yet; leave cached_* as they were,
            // matching the reference (which also skips the reset here).
            return;
        }

        let mut best_node = None;
        let mut best_len = 0u32;
        let mut longest_len = 0u32;
        let head = self.contexts[owner as usize].head;
        if head != NODE_NONE {
            let mut node = head;
            let mut visited = 0u32;
            loop {
                let node_pos = self.nodes[node as usize].pos as usize;
                let len = longest_common_suffix(buf, pos, node_pos);
                longest_len = longest_len.max(len);
                if len >= self.nodes[node as usize].min_len && len > best_len {
                    best_len = len;
                    best_node = Some(node);
                }
                visited += 1;
                if visited == DETERMINISTIC_MAX_NODES_TO_VISIT {
                    break;
                }
                node = self.nodes[node as usize].next;
                if node == head {
                    break;
                }
            }
        }

        self.cached_context = Some(owner);
        self.cached_node = best_node;
        self.longest_match_len = longest_len;
        self.cached_match_len = best_len;
    }

    fn find_match(&mut self, det_slot: Option<u32>, buf: &[u8], pos: usize) {
        match self.next_node {
            None => {
                self.cached_context = None;
                self.cached_node = None;
                self.find_best_node(det_slot, buf, pos);
            }
            Some(next) => {
                self.cached_context = det_slot;
                match det_slot {
                    None => self.find_best_node(det_slot, buf, pos),
                    Some(owner) => {
                        self.cached_node = Some(next);
                        self.cached_match_len += 1;
                        self.longest_match_len = self.longest_match_len.max(self.cached_match_len);

                        if self.cached_match_len >= DETERMINISTIC_FORCE_ACCEPT_LEN {
                            let n = &mut self.nodes[next as usize];
                            n.min_len = n.min_len.min(self.cached_match_len);
                        } else if self.cached_match_len < self.nodes[next as usize].min_len {
                            self.find_best_node(Some(owner), buf, pos);
                        }
                    }
                }
            }
        }
    }

    /// Attempts to code `symbol` from the deterministic match at `pos`.
    /// Returns `true` and leaves the predicted byte excluded from any
    /// fallback coding if the match held; `false` (with the predicted
    /// byte still excluded) if it escaped.
    pub fn encode(
        &mut self,
        enc: &mut Encoder,
        excl: &mut ExcludedSymbols,
        key: u32,
        buf: &[u8],
        pos: usize,
        symbol: u8,
        det_slot: Option<u32>,
        context_followset_size: u32,
    ) -> bool {
        self.find_match(det_slot, buf, pos);
        let Some(node) = self.cached_node else { return false };
        let owner = self.cached_context.unwrap();

        let mut count = self.contexts[owner as usize].matches_seen;
        let prediction = buf[self.nodes[node as usize].pos as usize];
        if self.cached_match_len >= DETERMINISTIC_FORCE_ACCEPT_LEN {
            count = 99_999;
        }
        debug_assert!(excl.is_empty());

        let matched = symbol == prediction;
        self.escape.encode(enc, key, 1, count, context_followset_size, !matched);
        excl.add(prediction);
        matched
    }

    /// Mirror of `encode`: returns the decoded symbol if the deterministic
    /// match held, or `None` if it escaped (caller falls back to the trie).
    pub fn decode(
        &mut self,
        dec: &mut Decoder,
        excl: &mut ExcludedSymbols,
        key: u32,
        buf: &[u8],
        pos: usize,
        det_slot: Option<u32>,
        context_followset_size: u32,
    ) -> Option<u8> {
        self.find_match(det_slot, buf, pos);
        let node = self.cached_node?;
        let owner = self.cached_context.unwrap();

        let mut count = self.contexts[owner as usize].matches_seen;
        let symbol = buf[self.nodes[node as usize].pos as usize];
        if self.cached_match_len >= DETERMINISTIC_FORCE_ACCEPT_LEN {
            count = 99_999;
        }
        debug_assert!(excl.is_empty());

        let escaped = self.escape.decode(dec, key, 1, count, context_followset_size);
        excl.add(symbol);
        if escaped {
            None
        } else {
            Some(symbol)
        }
    }
}

impl Default for Det {
    fn default() -> Self {
        Self::new()
    }
}
