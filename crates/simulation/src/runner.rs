//! Deterministic simulation runner.
//!
//! The runner is the host every node talks to: it owns the links, answers
//! transfer requests on behalf of the receiving node, and turns finished or
//! interrupted transfers back into node events.

use crate::event_queue::{EventKey, HostEvent};
use crate::{ContactPlan, NetworkConfig, NodeIndex, SimulationError};
use ferry_core::{Action, DiscardReason, Event, StateMachine, TransferOutcome};
use ferry_messages::PeerSnapshot;
use ferry_node::NodeStateMachine;
use ferry_types::{ContactId, Message, MessageId, NodeId};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, trace};

/// A transfer on the wire.
#[derive(Debug)]
struct InFlight {
    message: Message,
    /// Queue key of the matching [`HostEvent::TransferDone`].
    done: EventKey,
}

/// An open link. Each direction carries at most one transfer at a time.
#[derive(Debug)]
struct Link {
    ends: [NodeIndex; 2],
    /// `in_flight[0]` goes `ends[0] -> ends[1]`, `in_flight[1]` the other way.
    in_flight: [Option<InFlight>; 2],
}

impl Link {
    fn new(a: NodeIndex, b: NodeIndex) -> Self {
        Self {
            ends: [a, b],
            in_flight: [None, None],
        }
    }

    /// Direction index for transfers sent by `node`.
    fn direction(&self, node: NodeIndex) -> Option<usize> {
        self.ends.iter().position(|&end| end == node)
    }

    fn touches(&self, node: NodeIndex) -> bool {
        self.direction(node).is_some()
    }
}

/// Statistics collected during simulation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SimulationStats {
    /// Total events processed.
    pub events_processed: u64,
    /// Events processed by priority.
    pub events_by_priority: [u64; 4],
    /// Total actions generated.
    pub actions_generated: u64,
    /// Links opened.
    pub contacts: u64,
    /// Messages injected by the workload.
    pub created: u64,
    /// Messages that reached their destination.
    pub delivered: u64,
    /// Transfers that completed.
    pub relayed: u64,
    /// Transfers started.
    pub transfers_started: u64,
    /// Transfers cut short by a node or by link loss.
    pub aborted: u64,
    /// Messages evicted or refused for lack of space.
    pub dropped: u64,
    /// Messages whose TTL ran out in some buffer.
    pub expired: u64,
    /// Delivery latency of every delivered message, in delivery order.
    pub latencies: Vec<Duration>,
    /// Sum of hop counts over delivered messages.
    pub total_hops: u64,
}

impl SimulationStats {
    /// Fraction of created messages that were delivered.
    pub fn delivery_ratio(&self) -> f64 {
        if self.created == 0 {
            0.0
        } else {
            self.delivered as f64 / self.created as f64
        }
    }

    /// Extra transfers per delivered message: `(relayed - delivered) / delivered`.
    pub fn overhead_ratio(&self) -> Option<f64> {
        if self.delivered == 0 {
            return None;
        }
        Some((self.relayed as f64 - self.delivered as f64) / self.delivered as f64)
    }

    /// Mean delivery latency.
    pub fn mean_latency(&self) -> Option<Duration> {
        let count = u32::try_from(self.latencies.len()).ok().filter(|&n| n > 0)?;
        Some(self.latencies.iter().sum::<Duration>() / count)
    }

    /// Mean hop count of delivered messages.
    pub fn mean_hops(&self) -> Option<f64> {
        if self.delivered == 0 {
            return None;
        }
        Some(self.total_hops as f64 / self.delivered as f64)
    }
}

/// Deterministic simulation runner.
///
/// Processes events in deterministic order and executes actions.
/// Given the same plan and workload, produces identical results every run.
pub struct SimulationRunner {
    config: NetworkConfig,

    /// All nodes in the simulation, indexed by NodeIndex.
    nodes: Vec<NodeStateMachine>,

    /// Global event queue, ordered deterministically.
    event_queue: BTreeMap<EventKey, HostEvent>,

    /// Sequence counter for deterministic ordering.
    sequence: u64,

    /// Current simulation time.
    now: Duration,

    /// Open links.
    links: BTreeMap<ContactId, Link>,

    stats: SimulationStats,
}

impl std::fmt::Debug for SimulationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationRunner")
            .field("nodes", &self.nodes.len())
            .field("pending_events", &self.event_queue.len())
            .field("open_links", &self.links.len())
            .field("now", &self.now)
            .finish()
    }
}

impl SimulationRunner {
    /// Build the nodes and schedule every contact window and the first tick
    /// of every node.
    pub fn new(config: NetworkConfig, plan: &ContactPlan) -> Result<Self, SimulationError> {
        config.validate()?;
        plan.validate(config.num_nodes)?;

        let nodes = (0..config.num_nodes)
            .map(|i| NodeStateMachine::new(NodeId(i), config.node.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut runner = Self {
            config,
            nodes,
            event_queue: BTreeMap::new(),
            sequence: 0,
            now: Duration::ZERO,
            links: BTreeMap::new(),
            stats: SimulationStats::default(),
        };

        for node in 0..runner.config.num_nodes {
            runner.schedule_event(node, Duration::ZERO, HostEvent::Node(Event::Tick));
        }

        let mut contact = ContactId(1);
        for window in plan.windows() {
            runner.schedule_event(
                window.a,
                window.start,
                HostEvent::LinkUp {
                    contact,
                    a: window.a,
                    b: window.b,
                },
            );
            runner.schedule_event(window.a, window.end, HostEvent::LinkDown { contact });
            contact = contact.next();
        }

        debug!(
            nodes = runner.nodes.len(),
            contacts = plan.len(),
            "Simulation initialized"
        );
        Ok(runner)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Inspection
    // ═══════════════════════════════════════════════════════════════════════

    /// Network settings.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Statistics so far.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Current simulated time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Get a node.
    pub fn node(&self, index: NodeIndex) -> Option<&NodeStateMachine> {
        self.nodes.get(index as usize)
    }

    /// All nodes, by index.
    pub fn nodes(&self) -> &[NodeStateMachine] {
        &self.nodes
    }

    /// Number of links currently up.
    pub fn open_links(&self) -> usize {
        self.links.len()
    }

    /// Number of events still queued.
    pub fn pending_events(&self) -> usize {
        self.event_queue.len()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Driving
    // ═══════════════════════════════════════════════════════════════════════

    /// Inject a message at its source node at its creation time.
    pub fn schedule_message(&mut self, message: Message) -> Result<(), SimulationError> {
        let node = message.source.index();
        if node >= self.config.num_nodes {
            return Err(SimulationError::UnknownNode {
                node,
                num_nodes: self.config.num_nodes,
            });
        }
        if message.created_at < self.now {
            return Err(SimulationError::InThePast {
                at: message.created_at,
                now: self.now,
            });
        }
        let at = message.created_at;
        self.schedule_event(node, at, HostEvent::Node(Event::MessageCreated { message }));
        Ok(())
    }

    /// Run simulation until no more events or time limit reached.
    pub fn run_until(&mut self, end_time: Duration) {
        trace!(
            end_time_secs = end_time.as_secs_f64(),
            "Running simulation step"
        );

        while let Some(entry) = self.event_queue.first_entry() {
            if entry.key().time > end_time {
                debug!(
                    remaining_events = self.event_queue.len(),
                    "Time limit reached"
                );
                break;
            }

            let (key, event) = entry.remove_entry();
            self.now = key.time;
            self.stats.events_processed += 1;
            self.stats.events_by_priority[key.priority as usize] += 1;
            self.dispatch(key.node_index, event);
        }

        // Always advance to end_time so polling loops make progress.
        if self.now < end_time {
            self.now = end_time;
        }

        trace!(
            events_processed = self.stats.events_processed,
            actions_generated = self.stats.actions_generated,
            final_time = ?self.now,
            "Simulation step complete"
        );
    }

    fn dispatch(&mut self, node: NodeIndex, event: HostEvent) {
        match event {
            HostEvent::Node(Event::Tick) => {
                self.refresh_peers(node);
                self.deliver(node, Event::Tick);
                let next = self.now + self.config.tick_interval();
                self.schedule_event(node, next, HostEvent::Node(Event::Tick));
            }
            HostEvent::Node(event) => {
                if matches!(event, Event::MessageCreated { .. }) {
                    self.stats.created += 1;
                }
                self.deliver(node, event);
            }
            HostEvent::LinkUp { contact, a, b } => self.open_link(contact, a, b),
            HostEvent::LinkDown { contact } => self.close_link(contact),
            HostEvent::TransferDone { contact, message } => {
                self.finish_transfer(node, contact, message)
            }
        }
    }

    /// Hand an event to a node and carry out what it asks for.
    fn deliver(&mut self, node: NodeIndex, event: Event) {
        let machine = &mut self.nodes[node as usize];
        machine.set_time(self.now);
        trace!(time = ?self.now, node, event = event.type_name(), "Processing event");
        let actions = machine.handle(event);

        self.stats.actions_generated += actions.len() as u64;
        for action in actions {
            self.process_action(node, action);
        }
    }

    /// Take a fresh snapshot of a node at the current time.
    fn snapshot_of(&mut self, node: NodeIndex) -> PeerSnapshot {
        let machine = &mut self.nodes[node as usize];
        machine.set_time(self.now);
        machine.snapshot()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Links
    // ═══════════════════════════════════════════════════════════════════════

    fn open_link(&mut self, contact: ContactId, a: NodeIndex, b: NodeIndex) {
        // Both snapshots are taken before either side applies the other's.
        let snap_a = self.snapshot_of(a);
        let snap_b = self.snapshot_of(b);
        self.links.insert(contact, Link::new(a, b));
        self.stats.contacts += 1;
        debug!(time = ?self.now, contact = %contact, a, b, "Link up");

        self.deliver(
            a,
            Event::LinkUp {
                contact,
                peer: Box::new(snap_b),
            },
        );
        self.deliver(
            b,
            Event::LinkUp {
                contact,
                peer: Box::new(snap_a),
            },
        );
    }

    fn close_link(&mut self, contact: ContactId) {
        let Some(link) = self.links.remove(&contact) else {
            return;
        };
        for in_flight in link.in_flight.iter().flatten() {
            self.event_queue.remove(&in_flight.done);
            self.stats.aborted += 1;
            debug!(
                contact = %contact,
                message = %in_flight.message.id,
                "Transfer lost with link"
            );
        }

        let [a, b] = link.ends;
        let counters_a = self.nodes[a as usize].traffic_counters();
        let counters_b = self.nodes[b as usize].traffic_counters();
        debug!(time = ?self.now, contact = %contact, a, b, "Link down");

        self.deliver(
            a,
            Event::LinkDown {
                contact,
                peer_counters: counters_b,
            },
        );
        self.deliver(
            b,
            Event::LinkDown {
                contact,
                peer_counters: counters_a,
            },
        );
    }

    /// Give `node` a fresh view of every peer it is linked to.
    fn refresh_peers(&mut self, node: NodeIndex) {
        let peers: Vec<(ContactId, NodeIndex)> = self
            .links
            .iter()
            .filter(|(_, link)| link.touches(node))
            .filter_map(|(&contact, link)| {
                link.ends
                    .iter()
                    .find(|&&end| end != node)
                    .map(|&peer| (contact, peer))
            })
            .collect();

        for (contact, peer) in peers {
            let snapshot = self.snapshot_of(peer);
            self.deliver(
                node,
                Event::PeerRefreshed {
                    contact,
                    peer: Box::new(snapshot),
                },
            );
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Actions
    // ═══════════════════════════════════════════════════════════════════════

    fn process_action(&mut self, from: NodeIndex, action: Action) {
        match action {
            Action::StartTransfer { contact, message } => {
                self.start_transfer(from, contact, message)
            }

            Action::AbortTransfer { contact, message } => {
                let Some(link) = self.links.get_mut(&contact) else {
                    return;
                };
                let Some(dir) = link.direction(from) else {
                    return;
                };
                if link.in_flight[dir]
                    .as_ref()
                    .is_some_and(|f| f.message.id == message)
                {
                    if let Some(in_flight) = link.in_flight[dir].take() {
                        self.event_queue.remove(&in_flight.done);
                        self.stats.aborted += 1;
                        trace!(from, contact = %contact, message = %message, "Transfer aborted");
                    }
                }
            }

            Action::MessageDiscarded { message, reason } => {
                if reason.is_drop() {
                    self.stats.dropped += 1;
                } else if reason == DiscardReason::Expired {
                    self.stats.expired += 1;
                }
                trace!(node = from, message = %message, %reason, "Message discarded");
            }

            Action::MessageDelivered {
                message,
                hops,
                latency,
            } => {
                self.stats.delivered += 1;
                self.stats.latencies.push(latency);
                self.stats.total_hops += u64::from(hops);
                debug!(
                    time = ?self.now,
                    node = from,
                    message = %message,
                    hops,
                    ?latency,
                    "Message delivered"
                );
            }
        }
    }

    /// Answer a transfer request on behalf of the receiving node.
    fn start_transfer(&mut self, from: NodeIndex, contact: ContactId, message: Message) {
        let Some(link) = self.links.get(&contact) else {
            trace!(from, contact = %contact, "Transfer requested on closed link");
            return;
        };
        let Some(dir) = link.direction(from) else {
            return;
        };
        let to = link.ends[1 - dir];

        let outcome = if link.in_flight[dir].is_some() {
            TransferOutcome::Busy
        } else {
            let receiver = &mut self.nodes[to as usize];
            receiver.set_time(self.now);
            receiver.assess_incoming(&message)
        };

        let id = message.id;
        self.schedule_event(
            from,
            self.now,
            HostEvent::Node(Event::TransferOutcome {
                contact,
                message: id,
                outcome,
            }),
        );
        trace!(from, to, contact = %contact, message = %id, ?outcome, "Transfer requested");

        if outcome == TransferOutcome::Started {
            let done_at = self.now + self.config.transfer_time(message.size);
            let done = self.schedule_event(
                from,
                done_at,
                HostEvent::TransferDone {
                    contact,
                    message: id,
                },
            );
            if let Some(link) = self.links.get_mut(&contact) {
                link.in_flight[dir] = Some(InFlight { message, done });
            }
            self.stats.transfers_started += 1;
        }
    }

    fn finish_transfer(&mut self, from: NodeIndex, contact: ContactId, message: MessageId) {
        let Some(link) = self.links.get_mut(&contact) else {
            return;
        };
        let Some(dir) = link.direction(from) else {
            return;
        };
        if !link.in_flight[dir]
            .as_ref()
            .is_some_and(|f| f.message.id == message)
        {
            return;
        }
        let Some(in_flight) = link.in_flight[dir].take() else {
            return;
        };
        let to = link.ends[1 - dir];
        self.stats.relayed += 1;

        self.deliver(
            to,
            Event::MessageArrived {
                contact,
                message: in_flight.message,
            },
        );
        self.deliver(from, Event::TransferCompleted { contact, message });
    }

    /// Schedule an event.
    fn schedule_event(&mut self, node: NodeIndex, time: Duration, event: HostEvent) -> EventKey {
        self.sequence += 1;
        let key = EventKey::new(time, &event, node, self.sequence);
        self.event_queue.insert(key, event);
        key
    }
}
