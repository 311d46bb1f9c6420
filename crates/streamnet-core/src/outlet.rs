//! Outlet (root) discovery: walks downstream from each headwater to find the
//! reaches through which a watershed actually drains.
use std::collections::HashSet;
use std::hash::Hash;

use crate::flowline::FlowlineStore;

/// Find the set of root (outlet) flowline ids for `huc8`.
///
/// Descends downstream from every headwater using an explicit stack rather
/// than recursion, since a watershed's downstream chain can run to
/// thousands of reaches. The visited set is shared across headwaters so a
/// chain reachable from more than one headwater is only walked once.
pub fn find_roots<S>(store: &S, huc8: &str) -> Vec<S::Id>
where
    S: FlowlineStore,
    S::Id: Eq + Hash + Copy,
{
    let headwaters = store.headwaters(huc8);
    let mut visited: HashSet<S::Id> = HashSet::new();
    let mut seen_roots: HashSet<S::Id> = HashSet::new();
    let mut roots = Vec::new();

    for headwater in headwaters {
        if visited.contains(&headwater) {
            continue;
        }
        let mut stack = vec![headwater];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(flowline) = store.get(id) else {
                continue;
            };

            if flowline.stream_level == 1 {
                if seen_roots.insert(id) {
                    roots.push(id);
                }
                continue;
            }

            // A flowline with no downstream neighbor at all (not a coastal
            // terminus either) simply ends the walk without naming a root,
            // matching the upstream data's own terminal/dangle semantics.
            let downstream = store.downstream(id);
            let mut exited_watershed = false;
            let mut to_descend = Vec::new();
            for neighbor in downstream {
                if neighbor.reachcode.starts_with(huc8) {
                    if !visited.contains(&neighbor.id) {
                        to_descend.push(neighbor.id);
                    }
                } else {
                    exited_watershed = true;
                }
            }

            if exited_watershed && seen_roots.insert(id) {
                roots.push(id);
            }

            for id in to_descend.into_iter().rev() {
                stack.push(id);
            }
        }
    }

    roots
}
