//! Cross-cell grouping protocol
//!
//! When one interaction mutates two entities that may be owned by
//! different cells, the affected set is submitted here as one atomic
//! group before the tick's results commit. A neighboring cell therefore
//! never observes a partial view of a boundary-spanning interaction.
//!
//! The protocol is a small two-phase commit: groups whose members are all
//! internal commit immediately under local authority; groups containing
//! an external member are proposed to the registered neighbor link and
//! block on its acknowledgment. There is no timeout inside a tick - a
//! stale neighbor is the staleness layer's problem, not this core's. An
//! absent link means this cell assumes local authority.

use crossbeam_channel::{Receiver, Sender};
use smallvec::SmallVec;
use thiserror::Error;

use crate::game::state::EntityHandle;

/// Monotone per-coordinator group sequence number
pub type GroupId = u64;

/// Inline capacity for group member sets; collisions group two entities
const MEMBERS_INLINE: usize = 4;

/// One entity in a submitted group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupMember {
    pub handle: EntityHandle,
    /// True when the member's authoritative owner is a neighboring cell
    pub external: bool,
}

impl GroupMember {
    pub fn internal(handle: EntityHandle) -> Self {
        Self {
            handle,
            external: false,
        }
    }

    pub fn external(handle: EntityHandle) -> Self {
        Self {
            handle,
            external: true,
        }
    }
}

/// Phase-one message sent to the neighbor that co-owns a group member
#[derive(Debug, Clone)]
pub struct Proposal {
    pub group: GroupId,
    pub members: SmallVec<[EntityHandle; MEMBERS_INLINE]>,
}

/// Phase-two message from the neighbor
#[derive(Debug, Clone, Copy)]
pub struct Ack {
    pub group: GroupId,
    pub accepted: bool,
}

/// How a submitted group was committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOutcome {
    /// Neighbor acknowledged the proposal
    Committed,
    /// All members internal, or no neighbor link registered
    LocalAuthority,
}

#[derive(Debug, Error)]
pub enum GroupingError {
    #[error("group has {0} members; need at least 2")]
    TooSmall(usize),
    #[error("neighbor link disconnected during group {0} handshake")]
    LinkClosed(GroupId),
    #[error("neighbor rejected group {0}")]
    Rejected(GroupId),
}

/// Channel pair to the single neighbor that co-owns this cell's boundary
/// entities. The outer layer wires these up at cell assignment time.
pub struct NeighborLink {
    pub proposals: Sender<Proposal>,
    pub acks: Receiver<Ack>,
}

impl NeighborLink {
    pub fn new(proposals: Sender<Proposal>, acks: Receiver<Ack>) -> Self {
        Self { proposals, acks }
    }
}

/// The cell-side coordinator. Invoked synchronously for every
/// cross-boundary mutation before the tick returns; this is the sole
/// inter-cell serialization point.
pub struct GroupingCoordinator {
    neighbor: Option<NeighborLink>,
    next_group: GroupId,
    /// Groups committed with a neighbor ack
    pub committed: u64,
    /// Groups committed under local authority
    pub local_authority: u64,
}

impl GroupingCoordinator {
    pub fn new() -> Self {
        Self {
            neighbor: None,
            next_group: 0,
            committed: 0,
            local_authority: 0,
        }
    }

    pub fn with_neighbor(link: NeighborLink) -> Self {
        Self {
            neighbor: Some(link),
            next_group: 0,
            committed: 0,
            local_authority: 0,
        }
    }

    pub fn set_neighbor(&mut self, link: NeighborLink) {
        self.neighbor = Some(link);
    }

    /// Submit a set of 2+ entities whose mutations must commit atomically
    /// relative to neighbor cells.
    pub fn submit(&mut self, members: &[GroupMember]) -> Result<GroupOutcome, GroupingError> {
        if members.len() < 2 {
            return Err(GroupingError::TooSmall(members.len()));
        }

        if members.iter().all(|m| !m.external) {
            self.local_authority += 1;
            return Ok(GroupOutcome::LocalAuthority);
        }

        let Some(link) = &self.neighbor else {
            tracing::info!(
                members = members.len(),
                "no neighbor link; assuming local authority for external group"
            );
            self.local_authority += 1;
            return Ok(GroupOutcome::LocalAuthority);
        };

        let group = self.next_group;
        self.next_group += 1;

        let mut handles: SmallVec<[EntityHandle; MEMBERS_INLINE]> =
            members.iter().map(|m| m.handle).collect();
        handles.sort_unstable();

        link.proposals
            .send(Proposal {
                group,
                members: handles,
            })
            .map_err(|_| GroupingError::LinkClosed(group))?;

        // One proposal is in flight at a time, so the next ack is ours
        let ack = link.acks.recv().map_err(|_| GroupingError::LinkClosed(group))?;
        if ack.group != group {
            tracing::warn!(
                expected = group,
                got = ack.group,
                "out-of-sequence ack on neighbor link"
            );
            return Err(GroupingError::LinkClosed(group));
        }
        if !ack.accepted {
            return Err(GroupingError::Rejected(group));
        }

        self.committed += 1;
        Ok(GroupOutcome::Committed)
    }
}

impl Default for GroupingCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
