//! Ahead/behind divergence counting
//!
//! Computes how far two histories have diverged: `ahead` is the number of
//! commits reachable from `local` but not from `upstream`, `behind` the
//! reverse. Only the counts are exposed, never the commit lists.
//!
//! The implementation paints both histories in one bidirectional traversal:
//! every reachable commit accumulates a bitflag visit state recording which
//! side(s) reached it, re-propagating whenever a state strengthens, until a
//! fixpoint. Commits painted from exactly one side are then counted.

use crate::areas::object_store::ObjectStore;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{Error, Result};
use bitflags::bitflags;
use std::collections::{BinaryHeap, HashMap};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct PaintState: u8 {
        const FROM_LOCAL = 0b01;
        const FROM_UPSTREAM = 0b10;
        const FROM_BOTH = Self::FROM_LOCAL.bits() | Self::FROM_UPSTREAM.bits();
    }
}

/// Count `(ahead, behind)` between a local and an upstream commit
///
/// `ahead` counts commits reachable from `local` and not from `upstream`;
/// `behind` counts the converse. The seeds themselves participate: a commit
/// contained in the other side's history contributes to neither count.
pub fn ahead_behind(
    store: &ObjectStore,
    local: &ObjectId,
    upstream: &ObjectId,
) -> Result<(usize, usize)> {
    if local == upstream {
        // Identical tips cannot diverge, skip the traversal
        store.parse_commit(local)?;
        return Ok((0, 0));
    }

    let mut states = HashMap::<ObjectId, PaintState>::new();
    let mut queue = BinaryHeap::new();

    for (oid, paint) in [
        (local, PaintState::FROM_LOCAL),
        (upstream, PaintState::FROM_UPSTREAM),
    ] {
        let commit = store.parse_commit(oid)?;
        states.insert(oid.clone(), paint);
        queue.push((commit.timestamp(), oid.clone()));
    }

    // Process newest first, re-enqueueing whenever a parent's paint
    // strengthens; states only ever grow, so the fixpoint terminates.
    while let Some((_, oid)) = queue.pop() {
        let current_state = states.get(&oid).copied().unwrap_or_default();
        let commit = store.parse_commit(&oid)?;

        for parent_id in commit.parents() {
            if parent_id == &oid {
                return Err(Error::corrupt("commit is its own parent").for_object(&oid));
            }

            let parent_state = states.get(parent_id).copied().unwrap_or_default();
            if parent_state.contains(current_state) {
                continue;
            }

            let parent_commit = store.parse_commit(parent_id)?;
            states.insert(parent_id.clone(), parent_state | current_state);
            queue.push((parent_commit.timestamp(), parent_id.clone()));
        }
    }

    let mut ahead = 0;
    let mut behind = 0;
    for state in states.values() {
        if *state == PaintState::FROM_LOCAL {
            ahead += 1;
        } else if *state == PaintState::FROM_UPSTREAM {
            behind += 1;
        }
    }

    tracing::debug!(%local, %upstream, ahead, behind, "computed divergence");
    Ok((ahead, behind))
}
