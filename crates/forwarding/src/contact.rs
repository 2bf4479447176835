//! Per-contact scheduling state.

use ferry_messages::PeerSnapshot;
use ferry_types::{ContactId, MessageId, NodeId};
use std::collections::{BTreeSet, VecDeque};

/// Where a contact is in its forwarding cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactPhase {
    /// Nothing queued and nothing on the wire.
    Idle,
    /// Link just came up; predictability and receipts are being exchanged.
    Exchanging,
    /// Candidates are queued and waiting for the connection.
    Ranking,
    /// A transfer was requested or is on the wire.
    Transferring,
}

/// A (message, contact) pair worth trying.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub message: MessageId,
    pub contact: ContactId,
    /// Peer's predictability for the destination (1.0 for direct delivery).
    pub peer_predictability: f64,
    /// Our own predictability for the destination.
    pub local_predictability: f64,
    /// The peer is the message's destination.
    pub direct: bool,
}

/// Scheduling state for one open contact.
#[derive(Debug, Clone)]
pub struct ContactState {
    pub(crate) contact: ContactId,
    pub(crate) peer: PeerSnapshot,
    pub(crate) phase: ContactPhase,

    /// Outgoing transfer awaiting an outcome or completion.
    pub(crate) outgoing: Option<MessageId>,

    /// Peer is over the overload threshold; nothing more this round.
    pub(crate) cut_off: bool,

    /// Peer came back overloaded after a replica hand-off; no replicated
    /// messages for the rest of the contact.
    pub(crate) refused: bool,

    /// Messages the peer received over this contact.
    pub(crate) sent: BTreeSet<MessageId>,

    /// Messages the peer turned down over this contact.
    pub(crate) declined: BTreeSet<MessageId>,

    /// Ranked candidates not yet tried.
    pub(crate) pending: VecDeque<Candidate>,
}

impl ContactState {
    pub(crate) fn new(contact: ContactId, peer: PeerSnapshot) -> Self {
        Self {
            contact,
            peer,
            phase: ContactPhase::Exchanging,
            outgoing: None,
            cut_off: false,
            refused: false,
            sent: BTreeSet::new(),
            declined: BTreeSet::new(),
            pending: VecDeque::new(),
        }
    }

    /// Contact id.
    pub fn contact(&self) -> ContactId {
        self.contact
    }

    /// The peer on the other end.
    pub fn peer(&self) -> NodeId {
        self.peer.node
    }

    /// Latest snapshot of the peer.
    pub fn snapshot(&self) -> &PeerSnapshot {
        &self.peer
    }

    /// Current phase.
    pub fn phase(&self) -> ContactPhase {
        self.phase
    }

    /// Outgoing transfer, if any.
    pub fn outgoing(&self) -> Option<MessageId> {
        self.outgoing
    }

    /// Check if the peer has been refused replicas for this contact.
    pub fn is_refused(&self) -> bool {
        self.refused
    }

    /// Candidates still queued.
    pub fn pending(&self) -> impl Iterator<Item = &Candidate> {
        self.pending.iter()
    }

    /// Check if the peer already has, or has turned down, `id`.
    pub fn peer_lacks(&self, id: &MessageId) -> bool {
        !(self.peer.holds(id)
            || self.peer.receipts.contains(id)
            || self.sent.contains(id)
            || self.declined.contains(id))
    }

    /// Check if the contact can start a transfer now.
    pub fn is_ready(&self) -> bool {
        self.outgoing.is_none()
            && !self.peer.transferring
            && self.phase != ContactPhase::Exchanging
    }

    pub(crate) fn settle(&mut self) {
        self.phase = if self.outgoing.is_some() {
            ContactPhase::Transferring
        } else if self.pending.is_empty() {
            ContactPhase::Idle
        } else {
            ContactPhase::Ranking
        };
    }
}
