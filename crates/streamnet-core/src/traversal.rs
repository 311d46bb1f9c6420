//! The upstream traversal engine: walks every root to its headwaters,
//! deciding at each step whether the branch continues, opens a new
//! tributary, or unwinds to a shallower hierarchy level.
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use crate::compactor::compact_label;
use crate::digits::DigitBase;
use crate::error::StreamNetError;
use crate::flowline::{Flowline, FlowlineStore, LabeledFlowline, WatershedLabeling, WatershedStats};
use crate::minter::LabelMinter;
use crate::outlet::find_roots;

struct Frame<Id> {
    id: Id,
    order: u32,
    label: String,
}

/// Decide how to descend from `current` into upstream neighbor `upstream`,
/// given the branch's current hierarchy `order` and `label`.
///
/// Returns `Ok(None)` when the neighbor must not be descended into (Case A1
/// suppression); otherwise the `(order, label)` pair the descent continues
/// with.
fn decide<Id: Copy>(
    current: &Flowline<Id>,
    upstream: &Flowline<Id>,
    order: u32,
    label: &str,
    minter: &mut LabelMinter,
) -> Result<Option<(u32, String)>, StreamNetError> {
    if upstream.strahler_order == current.strahler_order {
        // Case A: continuation.
        if current.divergence > 1 {
            // A1: currently on a minor divergence branch.
            if upstream.divergence != current.divergence {
                return Ok(None);
            }
            if upstream.stream_level < current.stream_level {
                return Ok(None);
            }
            return Ok(Some((order, label.to_string())));
        }
        // A2: not on a minor divergence.
        if upstream.divergence > 1 {
            let new_label = minter.next_for_current_level(order, label)?;
            return Ok(Some((order, new_label)));
        }
        return Ok(Some((order, label.to_string())));
    }

    if upstream.strahler_order > current.strahler_order {
        // Case B: shallower.
        if order == 0 {
            return Ok(Some((0, label.to_string())));
        }
        let new_order = order - 1;
        let new_label = minter.next_for_previous_level(new_order, label)?;
        return Ok(Some((new_order, new_label)));
    }

    // Case C: deeper (tributary).
    let new_order = order + 1;
    let new_label = minter.next_for_next_level(new_order, label)?;
    Ok(Some((new_order, new_label)))
}

fn sort_key<Id>(f: &Flowline<Id>) -> (u32, u32, std::cmp::Reverse<u32>, std::cmp::Reverse<String>) {
    (
        f.divergence,
        f.stream_level,
        std::cmp::Reverse(f.strahler_order),
        std::cmp::Reverse(f.reachcode.clone()),
    )
}

/// Label every reach of one watershed: find its roots, mint a main-stem
/// label for each, and walk upstream minting deeper labels per the
/// continuation/shallower/deeper decision rules.
///
/// Uses an explicit LIFO work stack rather than recursion so traversal depth
/// is bounded only by available memory, not the call stack. Neighbors are
/// decided in the order the store returns them and pushed in reverse, so the
/// first neighbor returned is the first one processed, matching a recursive
/// pre-order descent.
pub fn label_watershed<S>(
    store: &S,
    huc8: &str,
    base: DigitBase,
) -> Result<WatershedLabeling<S::Id>, StreamNetError>
where
    S: FlowlineStore,
    S::Id: Eq + Hash + Copy + Debug,
{
    let mut roots: Vec<Flowline<S::Id>> = find_roots(store, huc8)
        .into_iter()
        .filter_map(|id| store.get(id))
        .collect();
    roots.sort_by_key(sort_key);

    let mut minter = LabelMinter::new(base);
    let mut visited: HashSet<S::Id> = HashSet::new();
    let mut reaches: Vec<LabeledFlowline<S::Id>> = Vec::new();
    let mut max_hack_order: u32 = 0;
    let mut max_compact_len: usize = 0;
    let mut reaches_per_order: Vec<u32> = Vec::new();

    for root in &roots {
        let mainstem_label = minter.next_mainstem()?;
        let mut stack = vec![Frame {
            id: root.id,
            order: 0,
            label: mainstem_label,
        }];

        while let Some(frame) = stack.pop() {
            if visited.contains(&frame.id) {
                continue;
            }
            visited.insert(frame.id);

            let Some(current) = store.get(frame.id) else {
                continue;
            };

            let compact = compact_label(&frame.label, base)?;
            max_hack_order = max_hack_order.max(frame.order);
            max_compact_len = max_compact_len.max(compact.len());
            let order_idx = frame.order as usize;
            if reaches_per_order.len() <= order_idx {
                reaches_per_order.resize(order_idx + 1, 0);
            }
            reaches_per_order[order_idx] += 1;

            reaches.push(LabeledFlowline {
                flowline: current.clone(),
                raw_label: frame.label.clone(),
                hack_order: frame.order,
                compact_label: compact,
            });

            let mut children = Vec::new();
            for upstream in store.upstream(frame.id) {
                if !upstream.reachcode.starts_with(huc8) {
                    continue;
                }
                if visited.contains(&upstream.id) {
                    continue;
                }
                if let Some((new_order, new_label)) =
                    decide(&current, &upstream, frame.order, &frame.label, &mut minter)?
                {
                    children.push(Frame {
                        id: upstream.id,
                        order: new_order,
                        label: new_label,
                    });
                }
            }
            for child in children.into_iter().rev() {
                stack.push(child);
            }
        }
    }

    reaches.sort_by(|a, b| a.raw_label.cmp(&b.raw_label));

    let stats = WatershedStats {
        num_roots: roots.len(),
        max_hack_order,
        max_compact_label_len: max_compact_len,
        reaches_per_order,
    };

    Ok(WatershedLabeling { reaches, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MemoryStore {
        flowlines: HashMap<u32, Flowline<u32>>,
        upstream: HashMap<u32, Vec<u32>>,
        downstream: HashMap<u32, Vec<u32>>,
        headwaters: Vec<u32>,
    }

    impl FlowlineStore for MemoryStore {
        type Id = u32;

        fn get(&self, id: u32) -> Option<Flowline<u32>> {
            self.flowlines.get(&id).cloned()
        }

        fn headwaters(&self, huc8: &str) -> Vec<u32> {
            self.headwaters
                .iter()
                .copied()
                .filter(|id| self.flowlines[id].reachcode.starts_with(huc8))
                .collect()
        }

        fn upstream(&self, id: u32) -> Vec<Flowline<u32>> {
            self.upstream
                .get(&id)
                .into_iter()
                .flatten()
                .map(|n| self.flowlines[n].clone())
                .collect()
        }

        fn downstream(&self, id: u32) -> Vec<Flowline<u32>> {
            self.downstream
                .get(&id)
                .into_iter()
                .flatten()
                .map(|n| self.flowlines[n].clone())
                .collect()
        }
    }

    struct StoreBuilder {
        flowlines: HashMap<u32, Flowline<u32>>,
        upstream: HashMap<u32, Vec<u32>>,
        downstream: HashMap<u32, Vec<u32>>,
        headwaters: Vec<u32>,
    }

    impl StoreBuilder {
        fn new() -> Self {
            Self {
                flowlines: HashMap::new(),
                upstream: HashMap::new(),
                downstream: HashMap::new(),
                headwaters: Vec::new(),
            }
        }

        fn flowline(mut self, id: u32, reachcode: &str, stream_level: u32, strahler_order: u32, divergence: u32) -> Self {
            self.flowlines.insert(
                id,
                Flowline {
                    id,
                    reachcode: reachcode.to_string(),
                    stream_level,
                    strahler_order,
                    divergence,
                },
            );
            self
        }

        fn edge(mut self, from: u32, to: u32) -> Self {
            self.upstream.entry(to).or_default().push(from);
            self.downstream.entry(from).or_default().push(to);
            self
        }

        fn headwater(mut self, id: u32) -> Self {
            self.headwaters.push(id);
            self
        }

        fn build(self) -> MemoryStore {
            MemoryStore {
                flowlines: self.flowlines,
                upstream: self.upstream,
                downstream: self.downstream,
                headwaters: self.headwaters,
            }
        }
    }

    const HUC8: &str = "99999999";

    fn rc(suffix: &str) -> String {
        format!("{HUC8}{suffix}")
    }

    #[test]
    fn single_straight_stem() {
        // X -> Y -> Z, all strahler order 1, divergence 0. Root = Z.
        let store = StoreBuilder::new()
            .flowline(1, &rc("001"), 2, 1, 0) // X
            .flowline(2, &rc("002"), 2, 1, 0) // Y
            .flowline(3, &rc("003"), 1, 1, 0) // Z, coastal terminus
            .edge(1, 2)
            .edge(2, 3)
            .headwater(1)
            .build();

        let result = label_watershed(&store, HUC8, DigitBase::Hex).unwrap();
        assert_eq!(result.stats.num_roots, 1);
        for labeled in &result.reaches {
            assert_eq!(labeled.raw_label, "01");
            assert_eq!(labeled.hack_order, 0);
            assert_eq!(labeled.compact_label, "01000000000000");
        }
        assert_eq!(result.reaches.len(), 3);
    }

    #[test]
    fn simple_tributary() {
        // X -> Y -> Z main stem (order 1 except Y which is order 2 at the
        // confluence); W -> Y tributary, order 1.
        let store = StoreBuilder::new()
            .flowline(1, &rc("001"), 2, 2, 0) // X, continues the main stem above the confluence
            .flowline(2, &rc("002"), 2, 2, 0) // Y, the confluence
            .flowline(3, &rc("003"), 1, 2, 0) // Z, coastal terminus
            .flowline(4, &rc("004"), 2, 1, 0) // W, tributary joining at Y
            .edge(1, 2)
            .edge(2, 3)
            .edge(4, 2)
            .headwater(1)
            .headwater(4)
            .build();

        let result = label_watershed(&store, HUC8, DigitBase::Hex).unwrap();
        let by_id = |id: u32| result.reaches.iter().find(|l| l.flowline.id == id).unwrap();

        assert_eq!(by_id(3).raw_label, "01");
        assert_eq!(by_id(2).raw_label, "01");
        assert_eq!(by_id(1).raw_label, "01");
        assert_eq!(by_id(4).raw_label, "0101");
        assert_eq!(by_id(4).hack_order, 1);
        assert_eq!(by_id(4).compact_label, "01010000000000");
    }

    #[test]
    fn two_main_stems() {
        let store = StoreBuilder::new()
            .flowline(1, &rc("001"), 1, 1, 0)
            .flowline(2, &rc("002"), 2, 1, 0)
            .headwater(1)
            .headwater(2)
            .build();

        let result = label_watershed(&store, HUC8, DigitBase::Hex).unwrap();
        let by_id = |id: u32| result.reaches.iter().find(|l| l.flowline.id == id).unwrap();
        // stream_level ascending puts flowline 1 (level 1) first.
        assert_eq!(by_id(1).raw_label, "01");
        assert_eq!(by_id(2).raw_label, "02");
    }

    #[test]
    fn divergence_minor_branch_mints_new_label_at_same_level() {
        // Y (divergence 0) <- U (divergence 2), same strahler order: Case A2
        // with U.divergence > 1 mints a new sibling label at the same level.
        let store = StoreBuilder::new()
            .flowline(1, &rc("001"), 1, 1, 0) // Y, coastal terminus (root)
            .flowline(2, &rc("002"), 2, 1, 2) // U
            .edge(2, 1)
            .headwater(2)
            .build();

        let result = label_watershed(&store, HUC8, DigitBase::Hex).unwrap();
        let by_id = |id: u32| result.reaches.iter().find(|l| l.flowline.id == id).unwrap();
        assert_eq!(by_id(1).raw_label, "01");
        assert_ne!(by_id(2).raw_label, by_id(1).raw_label);
        assert_eq!(by_id(2).hack_order, 0);
    }

    #[test]
    fn minor_branch_self_suppression() {
        // F is a coastal terminus and a minor branch (divergence 2); upstream
        // U has divergence 0 (mismatch) and is not descended into.
        let store = StoreBuilder::new()
            .flowline(1, &rc("001"), 1, 1, 2) // F, coastal terminus, minor branch
            .flowline(2, &rc("002"), 1, 1, 0) // U
            .edge(2, 1)
            .headwater(1)
            .build();

        let result = label_watershed(&store, HUC8, DigitBase::Hex).unwrap();
        assert_eq!(result.reaches.len(), 1);
        assert_eq!(result.reaches[0].flowline.id, 1);
    }

    #[test]
    fn counter_overflow_is_fatal() {
        // Root 1000 is a coastal terminus (stream_level 1), found directly
        // by the outlet finder without descent. It has 256 first-order
        // tributaries, one more than the hex ceiling allows.
        let mut flowlines = HashMap::new();
        flowlines.insert(
            1000,
            Flowline {
                id: 1000,
                reachcode: rc("999"),
                stream_level: 1,
                strahler_order: 2,
                divergence: 0,
            },
        );
        let mut upstream: HashMap<u32, Vec<u32>> = HashMap::new();
        let mut ups = Vec::new();
        for i in 1..=256u32 {
            flowlines.insert(
                i,
                Flowline {
                    id: i,
                    reachcode: rc(&format!("{i:03}")),
                    stream_level: 1,
                    strahler_order: 1,
                    divergence: 0,
                },
            );
            ups.push(i);
        }
        upstream.insert(1000, ups);

        let store = MemoryStore {
            flowlines,
            upstream,
            downstream: HashMap::new(),
            headwaters: vec![1000],
        };

        let result = label_watershed(&store, HUC8, DigitBase::Hex);
        assert!(result.is_err());
    }
}
