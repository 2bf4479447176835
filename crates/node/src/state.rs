//! Node state machine.

use crate::{NodeConfig, NodeStats};
use ferry_buffer::{make_room_for, EvictionPolicy, MessageBuffer, OldestFirst};
use ferry_congestion::CongestionEstimator;
use ferry_core::{Action, DiscardReason, Event, StateMachine, TransferOutcome};
use ferry_forwarding::{ForwardingScheduler, RoutingView};
use ferry_messages::{ExchangeMessage, PeerSnapshot, PROTOCOL_VERSION};
use ferry_predictability::PredictabilityTable;
use ferry_receipts::ReceiptLedger;
use ferry_replication::{ReplicationController, ReplicationDecision};
use ferry_types::{
    CongestionSample, ConfigError, ContactId, Message, MessageId, NodeId, TrafficCounters,
};
use std::time::Duration;
use tracing::{debug, instrument, trace, warn};

/// Combined routing node.
///
/// Owns one of each component and is the only thing that mutates them. Other
/// nodes are seen exclusively through the [`PeerSnapshot`]s the host hands
/// over at contact time.
pub struct NodeStateMachine {
    /// This node's id.
    local: NodeId,

    config: NodeConfig,

    /// Delivery predictabilities to every known node.
    predictability: PredictabilityTable,

    /// Local congestion estimate.
    congestion: CongestionEstimator,

    /// Known delivery receipts.
    receipts: ReceiptLedger,

    /// Carried messages.
    buffer: MessageBuffer,

    /// Eviction order when the buffer is full.
    eviction: Box<dyn EvictionPolicy>,

    /// Replica count control.
    replication: ReplicationController,

    /// Per-contact forwarding state.
    scheduler: ForwardingScheduler,

    stats: NodeStats,

    /// Current time.
    now: Duration,
}

impl std::fmt::Debug for NodeStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeStateMachine")
            .field("local", &self.local)
            .field("buffered", &self.buffer.len())
            .field("contacts", &self.scheduler.len())
            .field("congestion", &self.congestion.current_value())
            .field("now", &self.now)
            .finish()
    }
}

impl NodeStateMachine {
    /// Create a node. Fails if `config` does not validate.
    pub fn new(local: NodeId, config: NodeConfig) -> Result<Self, ConfigError> {
        Self::with_eviction_policy(local, config, Box::new(OldestFirst))
    }

    /// Create a node with a custom eviction policy.
    pub fn with_eviction_policy(
        local: NodeId,
        config: NodeConfig,
        eviction: Box<dyn EvictionPolicy>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            local,
            predictability: PredictabilityTable::new(local, config.predictability.clone()),
            congestion: CongestionEstimator::new(config.congestion.clone()),
            receipts: ReceiptLedger::new(),
            buffer: MessageBuffer::new(config.buffer_capacity),
            eviction,
            replication: ReplicationController::new(config.replication.clone()),
            scheduler: ForwardingScheduler::new(config.forwarding.clone()),
            stats: NodeStats::default(),
            now: Duration::ZERO,
            config,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Inspection
    // ═══════════════════════════════════════════════════════════════════════

    /// This node's id.
    pub fn local(&self) -> NodeId {
        self.local
    }

    /// Configuration in use.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Latest congestion value.
    pub fn congestion_value(&self) -> f64 {
        self.congestion.current_value()
    }

    /// Every retained congestion sample, oldest first.
    pub fn congestion_history(&self) -> Vec<CongestionSample> {
        self.congestion.history().copied().collect()
    }

    /// Predictability table.
    pub fn predictability(&self) -> &PredictabilityTable {
        &self.predictability
    }

    /// Receipt ledger.
    pub fn receipts(&self) -> &ReceiptLedger {
        &self.receipts
    }

    /// Message buffer.
    pub fn buffer(&self) -> &MessageBuffer {
        &self.buffer
    }

    /// Forwarding scheduler.
    pub fn scheduler(&self) -> &ForwardingScheduler {
        &self.scheduler
    }

    /// Traffic counters since the last congestion recompute.
    pub fn traffic_counters(&self) -> TrafficCounters {
        self.congestion.counters()
    }

    /// Cumulative statistics.
    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    /// Check if any outgoing transfer is outstanding.
    pub fn is_sending(&self) -> bool {
        self.scheduler.contacts().any(|c| c.outgoing().is_some())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Contact-time requests
    // ═══════════════════════════════════════════════════════════════════════

    /// This node as a peer sees it, aged to the current time.
    pub fn snapshot(&mut self) -> PeerSnapshot {
        PeerSnapshot {
            node: self.local,
            protocol: PROTOCOL_VERSION,
            predictability: self.predictability.snapshot(self.now),
            receipts: self.receipts.digest(),
            congestion: self.congestion.report(),
            holdings: self.buffer.ids().copied().collect(),
            transferring: self.is_sending(),
        }
    }

    /// Decide whether this node would accept `message` from a peer.
    ///
    /// Never answers `Busy`; connection readiness is the host's concern.
    pub fn assess_incoming(&self, message: &Message) -> TransferOutcome {
        if self.receipts.is_confirmed(&message.id) {
            return TransferOutcome::RejectedStale;
        }
        if self.buffer.contains(&message.id) || message.is_expired(self.now) {
            return TransferOutcome::RejectedOther;
        }
        if message.is_destined_for(self.local) {
            return TransferOutcome::Started;
        }
        let reclaimable = self.buffer.free_space() + self.buffer.evictable_space();
        if message.size > self.buffer.capacity() || message.size > reclaimable {
            return TransferOutcome::RejectedOther;
        }
        TransferOutcome::Started
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Event handlers
    // ═══════════════════════════════════════════════════════════════════════

    #[instrument(level = "debug", skip(self), fields(node = %self.local))]
    fn on_tick(&mut self) -> Vec<Action> {
        let now = self.now;
        self.predictability.age(now);
        self.congestion.recompute(now);

        let mut actions = Vec::new();
        for id in self.buffer.expired_ids(now) {
            self.discard(id, DiscardReason::Expired, &mut actions);
        }
        self.receipts.prune_expired(now);

        actions.extend(self.schedule_transfers());
        actions
    }

    fn on_link_up(&mut self, contact: ContactId, peer: PeerSnapshot) -> Vec<Action> {
        assert_eq!(
            peer.protocol, PROTOCOL_VERSION,
            "peer {} speaks protocol {}, expected {}",
            peer.node, peer.protocol, PROTOCOL_VERSION
        );

        let now = self.now;
        self.predictability.note_contact(peer.node, now);
        self.predictability.apply_transitive(peer.node, &peer.predictability, now);
        let learned = self.receipts.merge(&peer.receipts);
        debug!(
            node = %self.local,
            contact = %contact,
            peer = %peer.node,
            payload = PeerSnapshot::message_type_id(),
            learned_receipts = learned,
            "Link up"
        );

        self.scheduler.on_link_up(contact, peer);

        let mut actions = Vec::new();
        for id in self.receipts.purge_confirmed(self.buffer.ids()) {
            self.discard(id, DiscardReason::Confirmed, &mut actions);
        }

        self.scheduler.exchange_complete(contact);
        actions
    }

    fn on_peer_refreshed(&mut self, contact: ContactId, peer: PeerSnapshot) -> Vec<Action> {
        if !self.scheduler.refresh(contact, peer) {
            trace!(node = %self.local, contact = %contact, "Refresh for unknown contact");
        }
        vec![]
    }

    fn on_link_down(&mut self, contact: ContactId, peer_counters: TrafficCounters) -> Vec<Action> {
        if let Some(state) = self.scheduler.on_link_down(contact) {
            if let Some(id) = state.outgoing() {
                self.buffer.end_transfer(&id);
                self.stats.aborted += 1;
            }
        }
        self.congestion.absorb_peer_counters(peer_counters);
        vec![]
    }

    fn on_message_created(&mut self, mut message: Message) -> Vec<Action> {
        self.stats.created += 1;
        self.congestion.record_generated();
        self.replication.stamp_new(&mut message);
        debug!(node = %self.local, message = %message, "Message created");

        if message.is_expired(self.now) {
            self.stats.note_discard(DiscardReason::Expired);
            debug!(node = %self.local, message = %message.id, "Created already expired");
            return vec![Action::MessageDiscarded {
                message: message.id,
                reason: DiscardReason::Expired,
            }];
        }

        if message.is_destined_for(self.local) {
            self.receipts.record_if_destination(self.local, &message, self.now);
            self.stats.delivered += 1;
            return vec![Action::MessageDelivered {
                message: message.id,
                hops: 0,
                latency: Duration::ZERO,
            }];
        }
        self.admit(message)
    }

    fn on_message_arrived(&mut self, contact: ContactId, message: Message) -> Vec<Action> {
        let now = self.now;
        let copy = message.forwarded(now);
        self.stats.received += 1;
        self.congestion.record_received();

        if copy.is_destined_for(self.local) {
            if !self.receipts.record_if_destination(self.local, &copy, now) {
                trace!(node = %self.local, message = %copy.id, "Duplicate delivery");
                return vec![];
            }
            self.stats.delivered += 1;
            let latency = now.saturating_sub(copy.created_at);
            debug!(
                node = %self.local,
                contact = %contact,
                message = %copy.id,
                hops = copy.hop_count,
                ?latency,
                "Message delivered"
            );
            return vec![Action::MessageDelivered {
                message: copy.id,
                hops: copy.hop_count,
                latency,
            }];
        }

        if self.receipts.is_confirmed(&copy.id)
            || self.buffer.contains(&copy.id)
            || copy.is_expired(now)
        {
            trace!(node = %self.local, message = %copy.id, "Ignoring unneeded copy");
            return vec![];
        }
        self.admit(copy)
    }

    fn on_transfer_outcome(
        &mut self,
        contact: ContactId,
        message: MessageId,
        outcome: TransferOutcome,
    ) -> Vec<Action> {
        if !self.scheduler.on_outcome(contact, message, outcome) {
            return vec![];
        }
        if outcome == TransferOutcome::Started {
            return vec![];
        }

        self.buffer.end_transfer(&message);
        let mut actions = Vec::new();
        match outcome {
            // Retried when the contact is re-ranked on a later tick.
            TransferOutcome::Busy => return actions,
            TransferOutcome::RejectedStale => {
                self.stats.refused += 1;
                if self.config.forwarding.delete_delivered {
                    self.discard(message, DiscardReason::Stale, &mut actions);
                }
            }
            TransferOutcome::RejectedOther => self.stats.refused += 1,
            TransferOutcome::Started => {}
        }
        actions.extend(self.try_contact(contact));
        actions
    }

    fn on_transfer_completed(&mut self, contact: ContactId, message: MessageId) -> Vec<Action> {
        let Some((peer, peer_congestion)) = self.scheduler.on_transfer_completed(contact, message)
        else {
            return vec![];
        };
        self.buffer.end_transfer(&message);
        self.stats.relayed += 1;

        let mut actions = Vec::new();
        let delivered = self
            .buffer
            .get(&message)
            .is_some_and(|m| m.is_destined_for(peer));

        if delivered {
            if self.config.forwarding.delete_delivered {
                self.discard(message, DiscardReason::Delivered, &mut actions);
            }
        } else if let Some(copy) = self.buffer.get_mut(&message) {
            if self.replication.on_transfer_completed(copy, peer_congestion)
                == ReplicationDecision::PeerOverloaded
            {
                self.scheduler.refuse_peer(contact);
            }
        }

        actions.extend(self.try_contact(contact));
        actions
    }

    fn on_transfer_aborted(&mut self, contact: ContactId, message: MessageId) -> Vec<Action> {
        if self.scheduler.on_transfer_aborted(contact, message) {
            self.buffer.end_transfer(&message);
            self.stats.aborted += 1;
        }
        vec![]
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Helpers
    // ═══════════════════════════════════════════════════════════════════════

    /// Store a message, evicting for room if needed.
    fn admit(&mut self, message: Message) -> Vec<Action> {
        if self.buffer.contains(&message.id) {
            warn!(node = %self.local, message = %message.id, "Already buffered");
            return vec![];
        }
        let mut actions = Vec::new();
        match make_room_for(message.size, &mut self.buffer, self.eviction.as_ref()) {
            Ok(evicted) => {
                for victim in evicted {
                    self.congestion.record_drop();
                    self.stats.note_discard(DiscardReason::Evicted);
                    debug!(node = %self.local, message = %victim.id, "Evicted");
                    actions.push(Action::MessageDiscarded {
                        message: victim.id,
                        reason: DiscardReason::Evicted,
                    });
                }
            }
            Err(error) => {
                warn!(node = %self.local, message = %message.id, %error, "Admission failed");
                self.reject(message.id, &mut actions);
                return actions;
            }
        }

        let id = message.id;
        if let Err(error) = self.buffer.insert(message) {
            warn!(node = %self.local, message = %id, %error, "Admission failed");
            self.reject(id, &mut actions);
        }
        actions
    }

    fn reject(&mut self, id: MessageId, actions: &mut Vec<Action>) {
        self.congestion.record_drop();
        self.stats.note_discard(DiscardReason::Rejected);
        actions.push(Action::MessageDiscarded {
            message: id,
            reason: DiscardReason::Rejected,
        });
    }

    /// Remove a buffered message, aborting its transfers first.
    fn discard(&mut self, id: MessageId, reason: DiscardReason, actions: &mut Vec<Action>) {
        for contact in self.scheduler.abort_outgoing(id) {
            self.buffer.end_transfer(&id);
            self.stats.aborted += 1;
            actions.push(Action::AbortTransfer {
                contact,
                message: id,
            });
        }
        if self.buffer.remove(&id).is_some() {
            self.stats.note_discard(reason);
            trace!(node = %self.local, message = %id, %reason, "Discarded");
            actions.push(Action::MessageDiscarded {
                message: id,
                reason,
            });
        }
    }

    /// Re-rank every ready contact and start what can be started.
    fn schedule_transfers(&mut self) -> Vec<Action> {
        let view = RoutingView {
            local: self.local,
            buffer: &self.buffer,
            predictability: &self.predictability,
            receipts: &self.receipts,
            replication: &self.replication,
            now: self.now,
        };
        if self.scheduler.rank(&view) == 0 {
            return vec![];
        }

        let contacts: Vec<ContactId> = self.scheduler.contacts().map(|c| c.contact()).collect();
        contacts
            .into_iter()
            .flat_map(|contact| self.try_contact(contact))
            .collect()
    }

    /// Start the next queued transfer on `contact`, if any.
    fn try_contact(&mut self, contact: ContactId) -> Vec<Action> {
        let Some(candidate) = self
            .scheduler
            .next_attempt(contact, &self.buffer, &self.replication)
        else {
            return vec![];
        };
        let Some(message) = self.buffer.get(&candidate.message).cloned() else {
            return vec![];
        };
        self.buffer.begin_transfer(&candidate.message);
        trace!(
            node = %self.local,
            contact = %contact,
            message = %candidate.message,
            peer_p = candidate.peer_predictability,
            local_p = candidate.local_predictability,
            direct = candidate.direct,
            "Starting transfer"
        );
        vec![Action::StartTransfer { contact, message }]
    }
}

impl StateMachine for NodeStateMachine {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::Tick => self.on_tick(),
            Event::LinkUp { contact, peer } => self.on_link_up(contact, *peer),
            Event::PeerRefreshed { contact, peer } => self.on_peer_refreshed(contact, *peer),
            Event::LinkDown {
                contact,
                peer_counters,
            } => self.on_link_down(contact, peer_counters),
            Event::MessageCreated { message } => self.on_message_created(message),
            Event::MessageArrived { contact, message } => self.on_message_arrived(contact, message),
            Event::TransferOutcome {
                contact,
                message,
                outcome,
            } => self.on_transfer_outcome(contact, message, outcome),
            Event::TransferCompleted { contact, message } => {
                self.on_transfer_completed(contact, message)
            }
            Event::TransferAborted { contact, message } => {
                self.on_transfer_aborted(contact, message)
            }
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    fn now(&self) -> Duration {
        self.now
    }
}
