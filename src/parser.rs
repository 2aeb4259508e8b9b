// Copyright 2016 Martin Grabmueller. See the LICENSE file at the
// top-level directory of this distribution for license information.

//! Cost-optimal LZSS parsing shared by every format: a forward
//! dynamic-programming pass over a DAG where node `i` is "having
//! emitted the first `i` bytes of output" and an edge from `i` to `j`
//! is "emit a literal or match covering `data[i..j]`" weighted by that
//! edge's bit cost. The cheapest path from node 0 to node `data.len()`
//! is the cheapest valid encoding.
//!
//! Matches are found through a bucketed sliding window: one doubly
//! linked list per possible leading byte, so that at each position only
//! candidate sources starting with the same byte as the lookahead are
//! ever walked.

use std::collections::VecDeque;

/// One edge of the chosen path: either a literal (`source == destination
/// + 1`) or a match copying `length` bytes ending up at `destination`
/// from `source` bytes earlier in the (possibly virtual, filler-padded)
/// output stream. `source` is signed because a match may reach before
/// the start of real output into a filler-value-only virtual prefix —
/// callers that use `filler_value` must be prepared to see `source < 0`
/// and to treat the missing bytes as `filler_value`. A `source` at or
/// beyond `i64::MAX / 2` is a sentinel carrying a synthetic edge's
/// payload (e.g. Rage's RLE-run byte) rather than a real backreference;
/// only formats that register `extra_edges` will ever see one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub source: i64,
    pub destination: usize,
    pub length: usize,
}

/// Base for sentinel `source` values used by synthetic, non-backreference
/// edges (see `ExtraEdges`). Chosen far above any realistic file size.
pub const SENTINEL_BASE: i64 = 1 << 40;

impl Match {
    pub fn is_literal(&self) -> bool {
        self.source == self.destination as i64 + 1
    }

    /// True for edges produced by an `extra_edges` callback rather than
    /// the sliding-window match finder.
    pub fn is_sentinel(&self) -> bool {
        self.source >= SENTINEL_BASE
    }

    pub fn sentinel_payload(&self) -> i64 {
        self.source - SENTINEL_BASE
    }
}

/// A synthetic edge a format can inject at every position in addition to
/// the regular literal/dictionary-match edges: `sentinel_payload` is
/// folded into the emitted `Match`'s `source` (offset by `SENTINEL_BASE`)
/// so the format's own encoder can recover it, `length` is how many
/// bytes of output the edge covers, and `cost` is its bit cost.
pub struct ExtraEdge {
    pub sentinel_payload: i64,
    pub length: usize,
    pub cost: usize,
}

struct Window {
    max_distance: usize,
    heads: [Option<usize>; 256],
    prev: Vec<Option<usize>>,
    next: Vec<Option<usize>>,
    /// Byte bucket each ring slot currently belongs to, so a slot can be
    /// unlinked without scanning all 256 bucket heads.
    slot_owner: Vec<Option<u8>>,
}

impl Window {
    fn new(max_distance: usize) -> Self {
        Window {
            max_distance,
            heads: [None; 256],
            prev: vec![None; max_distance],
            next: vec![None; max_distance],
            slot_owner: vec![None; max_distance],
        }
    }

    fn slot(&self, virtual_pos: usize) -> usize {
        virtual_pos % self.max_distance
    }

    /// Inserts `virtual_pos` (whose leading byte is `byte`) at the head
    /// of its bucket, first unlinking whatever previously occupied the
    /// same ring slot.
    fn insert(&mut self, virtual_pos: usize, byte: u8) {
        let slot = self.slot(virtual_pos);
        self.unlink_slot(slot);

        let head = self.heads[byte as usize];
        self.prev[slot] = None;
        self.next[slot] = head;
        if let Some(old_head) = head {
            self.prev[self.slot(old_head)] = Some(virtual_pos);
        }
        self.heads[byte as usize] = Some(virtual_pos);
        self.slot_owner[slot] = Some(byte);
    }

    fn unlink_slot(&mut self, slot: usize) {
        let p = self.prev[slot];
        let n = self.next[slot];
        match p {
            Some(pp) => self.next[self.slot(pp)] = n,
            None => {
                if let Some(byte) = self.slot_owner[slot] {
                    self.heads[byte as usize] = n;
                }
            }
        }
        if let Some(nn) = n {
            self.prev[self.slot(nn)] = p;
        }
        self.slot_owner[slot] = None;
    }

    fn candidates(&self, byte: u8) -> WindowIter<'_> {
        WindowIter { window: self, current: self.heads[byte as usize] }
    }
}

struct WindowIter<'a> {
    window: &'a Window,
    current: Option<usize>,
}

impl<'a> Iterator for WindowIter<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let pos = self.current?;
        self.current = self.window.next[self.window.slot(pos)];
        Some(pos)
    }
}

/// Returns the byte at virtual position `v`, where positions
/// `0..base` are the filler-value prefix (only present when
/// `filler_value` is `Some`) and `base..` map onto `data`.
fn virtual_byte(data: &[u8], base: usize, filler_value: u8, v: usize) -> u8 {
    if v < base {
        filler_value
    } else {
        data[v - base]
    }
}

/// Runs the cost-optimal LZSS parse described in the module docs.
///
/// `unit_size` is how many bytes make up one matchable "value" — 1 for
/// every format except Comper and Kosinski+, which operate on whole
/// 16-bit words (so a match can never straddle a word boundary, and
/// distances/lengths below are counted in words, not bytes). `data.len()`
/// must be a multiple of `unit_size`.
///
/// * `max_match_length` / `max_match_distance` bound candidate matches,
///   in units.
/// * `filler_value`, if set, pre-seeds the window with `max_match_distance`
///   virtual bytes of that value preceding `data`, so matches can reach
///   into a synthetic, all-filler dictionary before any real output
///   exists (used by Rocket's mandatory pre-fill; GBA, Faxman, Saxman and
///   Rage instead express their own zero-run dictionary conventions
///   through `extra_edges`). Only meaningful when `unit_size == 1`.
/// * `literal_cost(unit)` is the bit cost of emitting one literal unit.
/// * `match_cost(distance, length)` is the bit cost of a dictionary
///   match, or `None` if that (distance, length) pair is unrepresentable.
/// * `extra_edges(data, position)` returns any synthetic edges a format
///   wants considered at unit `position` in addition to the regular ones
///   (used by Rage's RLE and uncompressed-run opcodes).
pub fn find_optimal_matches<LC, MC, EE>(
    data: &[u8],
    unit_size: usize,
    max_match_length: usize,
    max_match_distance: usize,
    filler_value: Option<u8>,
    literal_cost: LC,
    match_cost: MC,
    extra_edges: EE,
) -> Vec<Match>
where
    LC: Fn(&[u8]) -> usize,
    MC: Fn(usize, usize) -> Option<usize>,
    EE: Fn(&[u8], usize) -> Vec<ExtraEdge>,
{
    assert!(unit_size >= 1);
    assert_eq!(data.len() % unit_size, 0, "data length must be a multiple of unit_size");
    debug_assert!(unit_size == 1 || filler_value.is_none(), "filler_value requires unit_size == 1");

    let n = data.len() / unit_size;
    if n == 0 {
        return Vec::new();
    }
    let unit = |index: usize| -> &[u8] { &data[index * unit_size..(index + 1) * unit_size] };

    let base = if filler_value.is_some() { max_match_distance } else { 0 };
    let filler = filler_value.unwrap_or(0);
    let mut window = Window::new(max_match_distance.max(1));

    if base > 0 {
        for v in 0..base {
            window.insert(v, filler);
        }
    }

    // node_cost[i] = cheapest cost (in bits) of having emitted the first
    // i units of output.
    let mut node_cost = vec![usize::MAX; n + 1];
    let mut prev_position = vec![0usize; n + 1];
    let mut arriving_edge = vec![
        Match { source: 0, destination: 0, length: 0 };
        n + 1
    ];
    node_cost[0] = 0;

    for i in 0..n {
        if node_cost[i] == usize::MAX {
            continue;
        }
        let virtual_i = base + i;
        let first_byte = if base > 0 { virtual_byte(data, base, filler, virtual_i) } else { unit(i)[0] };

        // Dictionary matches: walk candidates sharing data[i]'s leading byte.
        let max_len = max_match_length.min(n - i);
        if max_len >= 1 {
            for src_virtual in window.candidates(first_byte) {
                if virtual_i - src_virtual > max_match_distance {
                    break;
                }
                let mut length = 0;
                while length < max_len {
                    let matches_here = if base > 0 {
                        (0..unit_size).all(|l| {
                            virtual_byte(data, base, filler, src_virtual + length + l)
                                == unit(i + length)[l]
                        })
                    } else {
                        unit(src_virtual + length) == unit(i + length)
                    };
                    if !matches_here {
                        break;
                    }
                    length += 1;
                }
                if length == 0 {
                    continue;
                }
                for len in 1..=length {
                    if let Some(cost) = match_cost(virtual_i - src_virtual, len) {
                        let total = node_cost[i] + cost;
                        if total < node_cost[i + len] {
                            node_cost[i + len] = total;
                            prev_position[i + len] = i;
                            let real_source = src_virtual as i64 - base as i64;
                            arriving_edge[i + len] = Match {
                                source: real_source,
                                destination: i,
                                length: len,
                            };
                        }
                    }
                }
            }
        }

        // Synthetic edges (Rage RLE / uncompressed runs, etc).
        for edge in extra_edges(data, i) {
            let len = edge.length.min(n - i);
            if len == 0 {
                continue;
            }
            let total = node_cost[i] + edge.cost;
            if total <= node_cost[i + len] {
                node_cost[i + len] = total;
                prev_position[i + len] = i;
                arriving_edge[i + len] = Match {
                    source: SENTINEL_BASE + edge.sentinel_payload,
                    destination: i,
                    length: len,
                };
            }
        }

        // Literal edge, relaxed last with <= so that a literal wins a cost
        // tie against a match ending at the same node.
        let lit_cost = node_cost[i] + literal_cost(unit(i));
        if lit_cost <= node_cost[i + 1] {
            node_cost[i + 1] = lit_cost;
            prev_position[i + 1] = i;
            arriving_edge[i + 1] = Match { source: i as i64 + 1, destination: i, length: 1 };
        }

        window.insert(virtual_i, first_byte);
    }

    debug_assert!(node_cost[n] != usize::MAX, "no path reached the end of input");

    // Walk backward from n to 0 along prev_position, then reverse.
    let mut matches = VecDeque::new();
    let mut pos = n;
    while pos > 0 {
        matches.push_front(arriving_edge[pos]);
        pos = prev_position[pos];
    }
    matches.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal_cost(_: &[u8]) -> usize {
        9
    }

    fn match_cost(distance: usize, length: usize) -> Option<usize> {
        if distance <= 0x2000 && length >= 2 && length <= 0x100 {
            Some(17)
        } else {
            None
        }
    }

    fn no_extra_edges(_: &[u8], _: usize) -> Vec<ExtraEdge> {
        Vec::new()
    }

    #[test]
    fn single_literal() {
        let data = [b'a'];
        let matches = find_optimal_matches(&data, 1, 0x100, 0x2000, None, literal_cost, match_cost, no_extra_edges);
        assert_eq!(matches.len(), 1);
        assert!(matches[0].is_literal());
    }

    #[test]
    fn repeated_run_becomes_one_match() {
        let data = [b'a'; 5];
        let matches = find_optimal_matches(&data, 1, 0x100, 0x2000, None, literal_cost, match_cost, no_extra_edges);
        // one literal for the first 'a', then a single match covering the rest.
        assert_eq!(matches.len(), 2);
        assert!(matches[0].is_literal());
        assert!(!matches[1].is_literal());
        assert_eq!(matches[1].length, 4);
    }

    #[test]
    fn filler_value_allows_match_at_start() {
        let data = [0x20, 0x20, 0x20];
        let matches = find_optimal_matches(&data, 1, 0x100, 0x2000, Some(0x20), literal_cost, match_cost, no_extra_edges);
        assert!(!matches.is_empty());
        // the very first byte can now be part of a match against the virtual filler prefix.
        assert!(matches.iter().any(|m| !m.is_literal() && m.source < 0));
    }

    #[test]
    fn sentinel_edges_are_preferred_when_cheaper() {
        let data = [5u8; 10];
        let extra = |_: &[u8], pos: usize| -> Vec<ExtraEdge> {
            if pos == 0 {
                vec![ExtraEdge { sentinel_payload: 5, length: 10, cost: 1 }]
            } else {
                Vec::new()
            }
        };
        let matches = find_optimal_matches(&data, 1, 0x100, 0x2000, None, literal_cost, match_cost, extra);
        assert_eq!(matches.len(), 1);
        assert!(matches[0].is_sentinel());
        assert_eq!(matches[0].sentinel_payload(), 5);
    }
}
