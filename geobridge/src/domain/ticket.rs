use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::manager::ManagerState;

/// A place in the lock queues of one operation's domains.
///
/// Holding a granted ticket is holding the domains. The ticket releases them
/// when dropped.
pub struct DomainTicket {
    seq: u64,
    state: Arc<Mutex<ManagerState>>,
    ready: Option<oneshot::Receiver<()>>,
}

impl DomainTicket {
    pub(super) fn new(
        seq: u64,
        state: Arc<Mutex<ManagerState>>,
        ready: oneshot::Receiver<()>,
    ) -> Self {
        Self {
            seq,
            state,
            ready: Some(ready),
        }
    }

    /// Submission sequence number. Lower numbers were enqueued earlier.
    pub fn sequence(&self) -> u64 {
        self.seq
    }

    pub fn is_granted(&self) -> bool {
        self.state.lock().is_granted(self.seq)
    }

    /// Suspends until the ticket is granted.
    pub async fn wait(&mut self) {
        if let Some(ready) = self.ready.take() {
            // The sender lives in the manager state until this ticket is
            // released, so the only outcome is a grant.
            let _ = ready.await;
        }
    }

    /// Blocks the calling thread until the ticket is granted.
    pub fn wait_blocking(&mut self) {
        futures::executor::block_on(self.wait());
    }
}

impl Drop for DomainTicket {
    fn drop(&mut self) {
        self.state.lock().release(self.seq);
    }
}

impl fmt::Debug for DomainTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainTicket")
            .field("seq", &self.seq)
            .finish()
    }
}
