//! FIFO lock queues per domain.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::ticket::DomainTicket;
use super::{DomainId, LockMode, LockScope};

#[derive(Debug)]
struct TicketState {
    scope: LockScope,
    granted: bool,
    notify: Option<oneshot::Sender<()>>,
}

/// Shared between the manager and its outstanding tickets.
#[derive(Debug, Default)]
pub(super) struct ManagerState {
    queues: HashMap<DomainId, VecDeque<(u64, LockMode)>>,
    tickets: BTreeMap<u64, TicketState>,
    next_seq: u64,
    total_granted: u64,
}

impl ManagerState {
    /// A ticket is ready when, in every domain it needs, nothing ahead of it
    /// conflicts with its mode.
    fn is_ready(&self, seq: u64) -> bool {
        let Some(ticket) = self.tickets.get(&seq) else {
            return false;
        };
        ticket.scope.entries().iter().all(|(domain, mode)| {
            self.queues.get(domain).is_some_and(|queue| {
                queue
                    .iter()
                    .take_while(|(other, _)| *other != seq)
                    .all(|(_, other_mode)| !mode.conflicts_with(*other_mode))
            })
        })
    }

    fn grant(&mut self, seq: u64) {
        if let Some(ticket) = self.tickets.get_mut(&seq) {
            ticket.granted = true;
            if let Some(notify) = ticket.notify.take() {
                // The receiver may already be gone if the ticket's owner gave
                // up waiting; the ticket is still released on drop.
                let _ = notify.send(());
            }
            self.total_granted += 1;
        }
    }

    fn grant_ready(&mut self, candidates: impl IntoIterator<Item = u64>) {
        for seq in candidates {
            let waiting = self.tickets.get(&seq).is_some_and(|t| !t.granted);
            if waiting && self.is_ready(seq) {
                self.grant(seq);
            }
        }
    }

    fn enqueue(&mut self, scope: &LockScope) -> (u64, oneshot::Receiver<()>) {
        let seq = self.next_seq;
        self.next_seq += 1;

        for (domain, mode) in scope.entries() {
            self.queues
                .entry(*domain)
                .or_default()
                .push_back((seq, *mode));
        }

        let (tx, rx) = oneshot::channel();
        self.tickets.insert(
            seq,
            TicketState {
                scope: scope.clone(),
                granted: false,
                notify: Some(tx),
            },
        );
        self.grant_ready([seq]);
        (seq, rx)
    }

    pub(super) fn release(&mut self, seq: u64) {
        let Some(ticket) = self.tickets.remove(&seq) else {
            return;
        };

        let mut candidates = BTreeSet::new();
        for (domain, _) in ticket.scope.entries() {
            let Some(queue) = self.queues.get_mut(domain) else {
                continue;
            };
            queue.retain(|(other, _)| *other != seq);
            if queue.is_empty() {
                self.queues.remove(domain);
            } else {
                candidates.extend(queue.iter().map(|(other, _)| *other));
            }
        }

        // Oldest first so grants follow submission order.
        self.grant_ready(candidates);
    }

    pub(super) fn is_granted(&self, seq: u64) -> bool {
        self.tickets.get(&seq).is_some_and(|t| t.granted)
    }
}

/// Queue depths reported by [`LockDomainManager::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DomainStats {
    /// Tickets holding their domains.
    pub granted: usize,
    /// Tickets waiting for a conflicting ticket ahead of them.
    pub waiting: usize,
    /// Domains with at least one ticket queued.
    pub active_domains: usize,
    /// Tickets granted since creation.
    pub total_granted: u64,
}

/// Hands out [`DomainTicket`]s.
#[derive(Debug, Default)]
pub struct LockDomainManager {
    state: Arc<Mutex<ManagerState>>,
}

impl LockDomainManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a ticket for every domain in `scope`.
    ///
    /// Never blocks. The ticket may already be granted on return; otherwise
    /// wait on it with [`DomainTicket::wait`] or
    /// [`DomainTicket::wait_blocking`]. Dropping the ticket releases its
    /// domains, whether or not it was ever granted.
    pub fn acquire(&self, scope: &LockScope) -> DomainTicket {
        let (seq, ready) = self.state.lock().enqueue(scope);
        tracing::trace!(ticket = seq, domains = scope.entries().len(), "Lock ticket enqueued");
        DomainTicket::new(seq, Arc::clone(&self.state), ready)
    }

    pub fn stats(&self) -> DomainStats {
        let state = self.state.lock();
        let granted = state.tickets.values().filter(|t| t.granted).count();
        DomainStats {
            granted,
            waiting: state.tickets.len() - granted,
            active_domains: state.queues.len(),
            total_granted: state.total_granted,
        }
    }
}
