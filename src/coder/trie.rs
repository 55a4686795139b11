//! Context trie (C4): one node per distinct order-N suffix seen so far,
//! arranged so order-(N-1) is always an ancestor of order-N.
//!
//! The reference implementation threads this as a literal tree of
//! malloc'd nodes navigated via `parent`/`child`/sibling pointers, with
//! a per-parent circular linked list searched linearly (and
//! move-almost-to-front'd) to find a child matching a given key. We
//! instead keep every `Context` in one arena `Vec` addressed by
//! `ContextId`, and give each order from 2..=PZIP_ORDER its own
//! `HashMap` from a packed suffix key straight to a `ContextId` --
//! trading the sibling-list scan for an O(1) hash lookup.
//!
//! The packed key needs care: the reference order-6/7/8 "key" fields
//! don't each cover one more byte of history than their parent. From
//! order 6 on it reuses bytes further back (`key[6]` packs offsets
//! -6,-7,-8; `key[7]` is `getulong(input_ptr-12)`; `key[8]` is
//! `getulong(input_ptr-16)`) to extend the effective horizon without
//! growing the branching factor at every level. Because each of those
//! per-level keys is an injective function of its own byte range, and
//! the ranges for orders 2..=8 are exactly {-1,-2}, {-1..-3}, {-1..-4},
//! {-1..-5}, {-1..-8}, {-1..-12}, {-1..-16}, the *cumulative* identity
//! of an order-N context is recoverable bit-for-bit from that window
//! of raw bytes alone -- no parent-chain walk required. `real_width`
//! below is that byte count per order, and 16 bytes fits in a `u128`
//! with no truncation at any order, so keys here are exact, not hashed.

use std::collections::HashMap;

use super::see::SeeStateId;
use crate::params::{PZIP_ORDER, TRIE_EXHAUSTION_STRIKES};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ContextId(pub u32);

const EVICT_SCAN_BOUND: u32 = 64;

pub struct FollowEntry {
    pub symbol: u8,
    pub count: u32,
}

pub struct FollowsetStats {
    pub max_count: u32,
    pub total_count: u32,
    pub escape_count: u32,
}

pub struct Context {
    pub order: u8,
    pub parent: Option<ContextId>,
    pub key: u128,
    pub followset: Vec<FollowEntry>,
    pub total_symbol_count: u32,
    pub max_count: u32,
    pub escape_count: u32,
    pub see_state: Option<SeeStateId>,
    pub kid_count: u32,
    pub det: Option<u32>,
    lru_prev: Option<ContextId>,
    lru_next: Option<ContextId>,
}

impl Context {
    fn new(order: u8, parent: Option<ContextId>, key: u128) -> Self {
        Context {
            order,
            parent,
            key,
            followset: Vec::new(),
            total_symbol_count: 0,
            max_count: 0,
            escape_count: 0,
            see_state: None,
            kid_count: 0,
            det: None,
            lru_prev: None,
            lru_next: None,
        }
    }

    pub fn followset_size(&self) -> usize {
        self.followset.len()
    }
}

fn real_width(order: usize) -> usize {
    match order {
        2..=5 => order,
        6 => 8,
        7 => 12,
        8 => 16,
        _ => unreachable!("order {order} has no packed suffix key"),
    }
}

/// Packs `buf[pos-1], buf[pos-2], ..` (as many bytes as `real_width(order)`
/// calls for) with the most recent byte in the low-order position.
fn suffix_key(buf: &[u8], pos: usize, order: usize) -> u128 {
    let width = real_width(order);
    let mut key = 0u128;
    for i in 0..width {
        key |= (buf[pos - 1 - i] as u128) << (8 * i);
    }
    key
}

pub struct Trie {
    arena: Vec<Context>,
    free_list: Vec<u32>,
    order0: ContextId,
    order1: [ContextId; 256],
    tables: Vec<HashMap<u128, ContextId>>,
    lru_head: Option<ContextId>,
    lru_tail: Option<ContextId>,
    lru_count: u32,
    max_lru_contexts: u32,
    stalled_evictions: u32,
}

impl Trie {
    pub fn new(max_lru_contexts: usize) -> Self {
        let mut arena = Vec::with_capacity(257);
        arena.push(Context::new(0, None, 0));
        let order0 = ContextId(0);

        let mut order1 = [ContextId(0); 256];
        for byte in 0..256u32 {
            let id = ContextId(arena.len() as u32);
            arena.push(Context::new(1, Some(order0), byte as u128));
            order1[byte as usize] = id;
        }

        Trie {
            arena,
            free_list: Vec::new(),
            order0,
            order1,
            tables: (2..=PZIP_ORDER).map(|_| HashMap::new()).collect(),
            lru_head: None,
            lru_tail: None,
            lru_count: 0,
            max_lru_contexts: max_lru_contexts as u32,
            stalled_evictions: 0,
        }
    }

    pub fn context(&self, id: ContextId) -> &Context {
        &self.arena[id.0 as usize]
    }

    pub fn live_context_count(&self) -> usize {
        self.lru_count as usize
    }

    pub fn max_lru_contexts(&self) -> usize {
        self.max_lru_contexts as usize
    }

    /// True once eviction has repeatedly failed to bring the live
    /// context count back under budget -- every context within
    /// `EVICT_SCAN_BOUND` of the LRU tail still has live children, so
    /// there is nothing left to reclaim and the budget cannot be honored.
    pub fn is_exhausted(&self) -> bool {
        self.stalled_evictions > TRIE_EXHAUSTION_STRIKES
    }

    pub fn context_mut(&mut self, id: ContextId) -> &mut Context {
        &mut self.arena[id.0 as usize]
    }

    fn link_mru(&mut self, id: ContextId) {
        self.context_mut(id).lru_prev = None;
        self.context_mut(id).lru_next = self.lru_head;
        if let Some(head) = self.lru_head {
            self.context_mut(head).lru_prev = Some(id);
        }
        self.lru_head = Some(id);
        if self.lru_tail.is_none() {
            self.lru_tail = Some(id);
        }
    }

    fn unlink_lru(&mut self, id: ContextId) {
        let (prev, next) = {
            let c = self.context(id);
            (c.lru_prev, c.lru_next)
        };
        match prev {
            Some(p) => self.context_mut(p).lru_next = next,
            None => self.lru_head = next,
        }
        match next {
            Some(n) => self.context_mut(n).lru_prev = prev,
            None => self.lru_tail = prev,
        }
    }

    fn touch_mru(&mut self, id: ContextId) {
        self.unlink_lru(id);
        self.link_mru(id);
    }

    /// Evicts one currently-childless context to make room, if the
    /// budget has been exceeded. Contexts with live children are never
    /// evicted on their own (that would leave their children pointing
    /// at a freed/reused arena slot); we scan a bounded number of
    /// candidates from the LRU tail looking for a leaf, and simply
    /// decline to evict this round if none turns up in that window --
    /// `stalled_evictions` counts how many calls in a row that's
    /// happened, so a caller can notice via `is_exhausted` when the
    /// budget has become impossible to honor rather than growing the
    /// arena forever.
    /// This trades the reference's exact recursive-subtree eviction
    /// for a cheap approximation that can never dangle a parent index.
    fn maybe_evict(&mut self) {
        if self.lru_count <= self.max_lru_contexts {
            self.stalled_evictions = 0;
            return;
        }
        let mut candidate = self.lru_tail;
        let mut scanned = 0;
        while let Some(id) = candidate {
            if self.context(id).kid_count == 0 {
                self.unlink_lru(id);
                self.delete_leaf(id);
                self.stalled_evictions = 0;
                return;
            }
            candidate = self.context(id).lru_prev;
            scanned += 1;
            if scanned >= EVICT_SCAN_BOUND {
                break;
            }
        }
        self.stalled_evictions += 1;
    }

    fn delete_leaf(&mut self, id: ContextId) {
        let (order, parent, key) = {
            let c = self.context(id);
            (c.order, c.parent, c.key)
        };
        debug_assert!(order >= 2);
        self.tables[order as usize - 2].remove(&key);
        if let Some(p) = parent {
            self.context_mut(p).kid_count -= 1;
        }
        let c = self.context_mut(id);
        c.followset.clear();
        c.total_symbol_count = 0;
        c.max_count = 0;
        c.escape_count = 0;
        c.see_state = None;
        c.kid_count = 0;
        c.det = None;
        self.lru_count -= 1;
        self.free_list.push(id.0);
    }

    fn create_context(&mut self, order: u8, parent: ContextId, key: u128) -> ContextId {
        let ctx = Context::new(order, Some(parent), key);
        let id = if let Some(slot) = self.free_list.pop() {
            self.arena[slot as usize] = ctx;
            ContextId(slot)
        } else {
            let id = ContextId(self.arena.len() as u32);
            self.arena.push(ctx);
            id
        };
        self.context_mut(parent).kid_count += 1;
        self.link_mru(id);
        self.lru_count += 1;
        self.maybe_evict();
        id
    }

    /// Locates (creating as needed) the full chain of active contexts
    /// -- order 0 through `PZIP_ORDER` -- for the position `buf[pos]`
    /// is about to predict. `buf` must hold at least 16 bytes of valid
    /// history before `pos` (the caller's seed prefix guarantees this).
    pub fn fill_active_contexts(&mut self, buf: &[u8], pos: usize) -> [ContextId; PZIP_ORDER + 1] {
        let mut contexts = [self.order0; PZIP_ORDER + 1];
        contexts[1] = self.order1[buf[pos - 1] as usize];

        for order in 2..=PZIP_ORDER {
            let key = suffix_key(buf, pos, order);
            let parent = contexts[order - 1];
            let id = match self.tables[order - 2].get(&key) {
                Some(&id) => {
                    self.touch_mru(id);
                    id
                }
                None => {
                    let id = self.create_context(order as u8, parent, key);
                    self.tables[order - 2].insert(key, id);
                    id
                }
            };
            contexts[order] = id;
        }
        contexts
    }

    fn maybe_halve_counts(&mut self, id: ContextId) {
        use crate::params::{CONTEXT_COUNT_HALVE_THRESHOLD, CONTEXT_SYMBOL_INC_NOVEL};
        let ctx = self.context_mut(id);
        if ctx.total_symbol_count < CONTEXT_COUNT_HALVE_THRESHOLD {
            return;
        }
        let mut total = 0u32;
        let mut max_count = 0u32;
        ctx.followset.retain_mut(|entry| {
            entry.count >>= 1;
            if entry.count == 0 {
                false
            } else {
                if entry.count <= CONTEXT_SYMBOL_INC_NOVEL {
                    entry.count = CONTEXT_SYMBOL_INC_NOVEL + 1;
                }
                total += entry.count;
                max_count = max_count.max(entry.count);
                true
            }
        });
        ctx.total_symbol_count = total;
        ctx.max_count = max_count;
        ctx.escape_count = (ctx.escape_count >> 1) + 1;
    }

    /// `symbol` has just appeared following context `id`; update its
    /// followset statistics, but only if `id`'s order is at or above
    /// `coded_order` -- the reference deliberately skips refreshing
    /// orders below the one that actually coded (or escaped past every
    /// context down to) this symbol.
    pub fn context_update(
        &mut self,
        id: ContextId,
        symbol: u8,
        coded_order: u8,
        see: &mut super::see::See,
        key: u32,
    ) {
        use crate::params::{CONTEXT_ESCAPE_MAX, CONTEXT_ESCP_INC, CONTEXT_SYMBOL_INC, CONTEXT_SYMBOL_INC_NOVEL};

        if self.context(id).order < coded_order {
            return;
        }

        self.maybe_halve_counts(id);

        let ctx = self.context_mut(id);
        let mut escaped = true;
        if let Some(pos) = ctx.followset.iter().position(|e| e.symbol == symbol) {
            let mut entry = ctx.followset.remove(pos);

            if entry.count <= CONTEXT_SYMBOL_INC_NOVEL {
                ctx.escape_count = ctx.escape_count.saturating_sub(CONTEXT_ESCP_INC);
                entry.count += CONTEXT_SYMBOL_INC - CONTEXT_SYMBOL_INC_NOVEL;
                ctx.total_symbol_count += CONTEXT_SYMBOL_INC - CONTEXT_SYMBOL_INC_NOVEL;
                if ctx.escape_count < 1 {
                    ctx.escape_count = 1;
                }
            }
            entry.count += CONTEXT_SYMBOL_INC;
            ctx.total_symbol_count += CONTEXT_SYMBOL_INC;
            ctx.max_count = ctx.max_count.max(entry.count);
            ctx.followset.insert(0, entry);
            escaped = false;
        } else {
            ctx.followset.insert(0, FollowEntry { symbol, count: CONTEXT_SYMBOL_INC_NOVEL });
            ctx.total_symbol_count += CONTEXT_SYMBOL_INC_NOVEL;
            if ctx.escape_count < CONTEXT_ESCAPE_MAX {
                ctx.escape_count += CONTEXT_ESCP_INC;
            }
            ctx.max_count = ctx.max_count.max(CONTEXT_SYMBOL_INC_NOVEL);
        }

        let order = ctx.order;
        let followset_size = ctx.followset_size() as u32;
        let escape_count = ctx.escape_count;
        let total_symbol_count = ctx.total_symbol_count;
        let parent_followset_size = ctx
            .parent
            .map(|p| self.context(p).followset_size() as u32)
            .unwrap_or(0);
        let prior_state = self.context(id).see_state;
        see.adjust_state(prior_state, escaped);
        let new_state = see.get_state(
            escape_count,
            total_symbol_count,
            key,
            order,
            followset_size,
            parent_followset_size,
        );
        self.context_mut(id).see_state = new_state;
    }

    pub fn followset_stats_excluding(
        &self,
        id: ContextId,
        excl: &super::excluded::ExcludedSymbols,
    ) -> FollowsetStats {
        use crate::params::{
            CONTEXT_EXCLUDED_ESCAPE_EXCLUDEDINC, CONTEXT_EXCLUDED_ESCAPE_INC, CONTEXT_EXCLUDED_ESCAPE_INIT,
            CONTEXT_EXCLUDED_ESCAPE_SHIFT, CONTEXT_SYMBOL_INC_NOVEL,
        };
        let ctx = self.context(id);
        if excl.is_empty() {
            return FollowsetStats {
                max_count: ctx.max_count,
                total_count: ctx.total_symbol_count,
                escape_count: ctx.escape_count,
            };
        }

        let mut max_count = 0u32;
        let mut total_count = 0u32;
        let mut escape_count = CONTEXT_EXCLUDED_ESCAPE_INIT;
        for entry in &ctx.followset {
            if excl.contains(entry.symbol) {
                if entry.count <= CONTEXT_SYMBOL_INC_NOVEL {
                    escape_count += CONTEXT_EXCLUDED_ESCAPE_EXCLUDEDINC;
                }
            } else {
                total_count += entry.count;
                max_count = max_count.max(entry.count);
                if entry.count <= CONTEXT_SYMBOL_INC_NOVEL {
                    escape_count += CONTEXT_EXCLUDED_ESCAPE_INC;
                }
            }
        }
        escape_count >>= CONTEXT_EXCLUDED_ESCAPE_SHIFT;
        FollowsetStats { max_count, total_count, escape_count }
    }
}
