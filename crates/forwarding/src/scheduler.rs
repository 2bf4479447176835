//! The forwarding scheduler.

use crate::{Candidate, ContactPhase, ContactState, ForwardingConfig, QueueDiscipline};
use ferry_buffer::MessageBuffer;
use ferry_core::TransferOutcome;
use ferry_messages::PeerSnapshot;
use ferry_predictability::PredictabilityTable;
use ferry_receipts::ReceiptLedger;
use ferry_replication::ReplicationController;
use ferry_types::{ContactId, Message, MessageId, NodeId};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, trace};

/// Read-only view of the node state ranking needs.
pub struct RoutingView<'a> {
    pub local: NodeId,
    pub buffer: &'a MessageBuffer,
    pub predictability: &'a PredictabilityTable,
    pub receipts: &'a ReceiptLedger,
    pub replication: &'a ReplicationController,
    pub now: Duration,
}

/// Chooses what to send on each open contact.
///
/// Holds one [`ContactState`] per open contact and never touches the buffer
/// itself: the node applies the consequences of every decision.
#[derive(Debug)]
pub struct ForwardingScheduler {
    config: ForwardingConfig,
    discipline: Box<dyn QueueDiscipline>,
    contacts: BTreeMap<ContactId, ContactState>,
}

impl ForwardingScheduler {
    /// Create a scheduler.
    pub fn new(config: ForwardingConfig) -> Self {
        let discipline = config.queue_mode.discipline();
        Self {
            config,
            discipline,
            contacts: BTreeMap::new(),
        }
    }

    /// Settings in use.
    pub fn config(&self) -> &ForwardingConfig {
        &self.config
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Contact lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// A link came up. The contact starts in [`ContactPhase::Exchanging`]
    /// until [`Self::exchange_complete`] is called.
    pub fn on_link_up(&mut self, contact: ContactId, peer: PeerSnapshot) {
        debug!(contact = %contact, peer = %peer.node, "Contact opened");
        self.contacts.insert(contact, ContactState::new(contact, peer));
    }

    /// The link-up exchange has been applied; the contact may be ranked.
    pub fn exchange_complete(&mut self, contact: ContactId) {
        if let Some(state) = self.contacts.get_mut(&contact) {
            if state.phase == ContactPhase::Exchanging {
                state.phase = ContactPhase::Idle;
            }
        }
    }

    /// Replace the view of a peer on an open contact.
    ///
    /// Returns false if the contact is unknown.
    pub fn refresh(&mut self, contact: ContactId, peer: PeerSnapshot) -> bool {
        match self.contacts.get_mut(&contact) {
            Some(state) => {
                state.peer = peer;
                true
            }
            None => false,
        }
    }

    /// A link went down. Returns the contact's final state so the caller can
    /// release the bookkeeping of any outgoing transfer.
    pub fn on_link_down(&mut self, contact: ContactId) -> Option<ContactState> {
        let state = self.contacts.remove(&contact)?;
        debug!(
            contact = %contact,
            peer = %state.peer.node,
            sent = state.sent.len(),
            aborted = ?state.outgoing,
            "Contact closed"
        );
        Some(state)
    }

    /// Get an open contact.
    pub fn contact(&self, contact: ContactId) -> Option<&ContactState> {
        self.contacts.get(&contact)
    }

    /// All open contacts, in contact id order.
    pub fn contacts(&self) -> impl Iterator<Item = &ContactState> {
        self.contacts.values()
    }

    /// Number of open contacts.
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Check if there are no open contacts.
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Ranking
    // ═══════════════════════════════════════════════════════════════════════

    /// Rebuild the candidate queue of every ready contact.
    ///
    /// Contacts with a transfer outstanding, a busy peer, or an exchange in
    /// progress are left alone. Returns the number of candidates queued.
    pub fn rank(&mut self, view: &RoutingView<'_>) -> usize {
        let mut queued = 0;
        for state in self.contacts.values_mut() {
            if !state.is_ready() {
                continue;
            }
            state.cut_off = false;

            let mut candidates: Vec<(Candidate, &Message)> = view
                .buffer
                .iter()
                .filter_map(|message| {
                    candidate_for(state, message, view).map(|candidate| (candidate, message))
                })
                .collect();

            let deliverable_first = self.config.deliverable_first;
            let discipline = self.discipline.as_ref();
            candidates.sort_by(|(a, ma), (b, mb)| {
                compare_candidates(a, ma, b, mb, deliverable_first, discipline, view.now)
            });

            state.pending = candidates.into_iter().map(|(c, _)| c).collect();
            queued += state.pending.len();
            trace!(
                contact = %state.contact,
                peer = %state.peer.node,
                candidates = state.pending.len(),
                "Ranked candidates"
            );
            state.settle();
        }
        queued
    }

    /// Pop the next candidate that may be sent on `contact` now.
    ///
    /// Candidates whose message has left the buffer, is already on the wire,
    /// or that the peer no longer lacks are skipped. Replicated messages are
    /// skipped while the peer is refused. A non-replicated message meeting an
    /// overloaded peer ends the round for this contact. On success the
    /// contact moves to [`ContactPhase::Transferring`].
    pub fn next_attempt(
        &mut self,
        contact: ContactId,
        buffer: &MessageBuffer,
        replication: &ReplicationController,
    ) -> Option<Candidate> {
        let state = self.contacts.get_mut(&contact)?;
        if state.outgoing.is_some() || state.cut_off || state.peer.transferring {
            return None;
        }

        while let Some(candidate) = state.pending.pop_front() {
            let Some(message) = buffer.get(&candidate.message) else {
                continue;
            };
            if buffer.is_transferring(&candidate.message) || !state.peer_lacks(&candidate.message)
            {
                continue;
            }

            if !candidate.direct {
                if message.replicas().is_some() {
                    if state.refused || !replication.eligible_for_forwarding(message) {
                        trace!(
                            contact = %contact,
                            message = %candidate.message,
                            refused = state.refused,
                            "Skipping replicated candidate"
                        );
                        continue;
                    }
                } else if replication.refuses_peer(state.peer.congestion.value) {
                    debug!(
                        contact = %contact,
                        peer = %state.peer.node,
                        congestion = state.peer.congestion.value,
                        "Peer overloaded, ending round"
                    );
                    state.cut_off = true;
                    state.pending.clear();
                    state.settle();
                    return None;
                }
            }

            state.outgoing = Some(candidate.message);
            state.settle();
            return Some(candidate);
        }

        state.settle();
        None
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Transfer results
    // ═══════════════════════════════════════════════════════════════════════

    /// Apply the host's answer to a transfer request.
    ///
    /// `Busy` clears the queue so the contact is re-ranked on a later tick.
    /// Rejections leave the queue in place for the next candidate. Returns
    /// false if the outcome does not match the outstanding request.
    pub fn on_outcome(
        &mut self,
        contact: ContactId,
        message: MessageId,
        outcome: TransferOutcome,
    ) -> bool {
        let Some(state) = self.contacts.get_mut(&contact) else {
            return false;
        };
        if state.outgoing != Some(message) {
            return false;
        }

        match outcome {
            TransferOutcome::Started => {}
            TransferOutcome::Busy => {
                state.outgoing = None;
                state.pending.clear();
            }
            TransferOutcome::RejectedStale | TransferOutcome::RejectedOther => {
                state.outgoing = None;
                state.declined.insert(message);
            }
        }
        trace!(contact = %contact, message = %message, ?outcome, "Transfer outcome");
        state.settle();
        true
    }

    /// An outgoing transfer finished.
    ///
    /// Returns the peer and its latest congestion value for replica control,
    /// or `None` if the transfer was not outstanding.
    pub fn on_transfer_completed(
        &mut self,
        contact: ContactId,
        message: MessageId,
    ) -> Option<(NodeId, f64)> {
        let state = self.contacts.get_mut(&contact)?;
        if state.outgoing != Some(message) {
            return None;
        }
        state.outgoing = None;
        state.sent.insert(message);
        state.settle();
        Some((state.peer.node, state.peer.congestion.value))
    }

    /// An outgoing transfer was cut short. Returns whether it was outstanding.
    pub fn on_transfer_aborted(&mut self, contact: ContactId, message: MessageId) -> bool {
        let Some(state) = self.contacts.get_mut(&contact) else {
            return false;
        };
        if state.outgoing != Some(message) {
            return false;
        }
        state.outgoing = None;
        state.pending.clear();
        state.settle();
        true
    }

    /// Stop offering replicated messages to the peer on `contact` until the
    /// link goes down.
    pub fn refuse_peer(&mut self, contact: ContactId) {
        if let Some(state) = self.contacts.get_mut(&contact) {
            debug!(contact = %contact, peer = %state.peer.node, "Peer refused for contact");
            state.refused = true;
        }
    }

    /// Drop every outstanding transfer of `message`, returning the contacts
    /// it was on. Used before deleting a message from the buffer.
    pub fn abort_outgoing(&mut self, message: MessageId) -> Vec<ContactId> {
        let mut aborted = Vec::new();
        for state in self.contacts.values_mut() {
            if state.outgoing == Some(message) {
                state.outgoing = None;
                state.pending.clear();
                state.settle();
                aborted.push(state.contact);
            }
        }
        aborted
    }
}

/// Decide whether `message` is a candidate for the peer on `state`.
fn candidate_for(
    state: &ContactState,
    message: &Message,
    view: &RoutingView<'_>,
) -> Option<Candidate> {
    let id = message.id;
    if message.is_expired(view.now)
        || message.is_destined_for(view.local)
        || view.receipts.is_confirmed(&id)
        || view.buffer.is_transferring(&id)
        || !state.peer_lacks(&id)
    {
        return None;
    }

    let local_predictability = view.predictability.peek(message.destination);
    if message.is_destined_for(state.peer.node) {
        return Some(Candidate {
            message: id,
            contact: state.contact,
            peer_predictability: 1.0,
            local_predictability,
            direct: true,
        });
    }

    if !view.replication.eligible_for_forwarding(message) {
        return None;
    }

    let peer_predictability = state.peer.predictability.get(message.destination);
    // Ties favour keeping the message.
    if peer_predictability <= local_predictability {
        return None;
    }
    Some(Candidate {
        message: id,
        contact: state.contact,
        peer_predictability,
        local_predictability,
        direct: false,
    })
}

fn compare_candidates(
    a: &Candidate,
    ma: &Message,
    b: &Candidate,
    mb: &Message,
    deliverable_first: bool,
    discipline: &dyn QueueDiscipline,
    now: Duration,
) -> Ordering {
    let direct = if deliverable_first {
        b.direct.cmp(&a.direct)
    } else {
        Ordering::Equal
    };
    direct
        .then_with(|| b.peer_predictability.total_cmp(&a.peer_predictability))
        .then_with(|| discipline.compare(ma, mb, now))
        .then_with(|| a.message.cmp(&b.message))
}
