use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;
use tracing::trace;

/// A unique identifier for a broadcast that cannot be forged or extracted.
/// Can only be created by a Broadcast and used for deduplication/comparison.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct BroadcastId(usize);

impl From<BroadcastId> for usize {
    fn from(id: BroadcastId) -> Self { id.0 }
}
impl std::fmt::Display for BroadcastId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{:#x}", self.0) }
}

/// A broadcast that carries no payload and only keeps track of how many listeners are attached to it.
///
/// Attach and detach are applied to the count synchronously and in a single order, regardless of
/// which thread performs them. Observers of the count see that order through [`SubscriberCount`].
#[derive(Clone)]
pub struct Broadcast(Arc<Inner>);

struct Inner {
    count: watch::Sender<usize>,
    next_id: AtomicUsize,
}

impl std::fmt::Debug for Broadcast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcast").field("id", &self.id()).field("listeners", &*self.0.count.borrow()).finish()
    }
}

/// A handle that keeps one listener attached. Dropping it detaches the listener.
///
/// The guard holds its broadcast alive, so a detach is never lost even if every other handle is gone.
#[must_use = "the listener is detached as soon as the guard is dropped"]
pub struct ListenerGuard {
    broadcast: Broadcast,
    id: usize,
}

impl ListenerGuard {
    /// Get the broadcast ID that this guard is attached to
    pub fn broadcast_id(&self) -> BroadcastId { self.broadcast.id() }
}

impl std::fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerGuard").field("broadcast", &self.broadcast_id()).field("id", &self.id).finish()
    }
}

impl Default for Broadcast {
    fn default() -> Self { Self::new() }
}

impl Broadcast {
    /// Creates a new Broadcast with no listeners
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self(Arc::new(Inner { count, next_id: AtomicUsize::new(0) }))
    }

    /// Get the unique identifier for this broadcast
    pub fn id(&self) -> BroadcastId { BroadcastId(Arc::as_ptr(&self.0) as usize) }

    /// Number of listeners attached right now
    pub fn listener_count(&self) -> usize { *self.0.count.borrow() }

    /// Observe the listener count as it changes
    pub fn subscriber_count(&self) -> SubscriberCount { SubscriberCount(self.0.count.subscribe()) }

    /// Attach a listener. The count is incremented before this returns.
    pub fn listen(&self) -> ListenerGuard {
        let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);
        self.0.count.send_modify(|count| {
            *count += 1;
            trace!("broadcast {} listener {} attached, count {}", self.id(), id, count);
        });
        ListenerGuard { broadcast: self.clone(), id }
    }
}

impl Drop for ListenerGuard {
    /// Automatically detaches when the guard is dropped.
    fn drop(&mut self) {
        let id = self.broadcast.id();
        self.broadcast.0.count.send_modify(|count| {
            *count -= 1;
            trace!("broadcast {} listener {} detached, count {}", id, self.id, count);
        });
    }
}

/// Observes the number of listeners attached to a [`Broadcast`].
///
/// Values that are superseded before they are observed are skipped; the latest value is always seen.
#[derive(Clone)]
pub struct SubscriberCount(watch::Receiver<usize>);

impl SubscriberCount {
    /// The latest count, without marking it as observed
    pub fn current(&self) -> usize { *self.0.borrow() }

    /// The latest count, marking it as observed so that [`Self::changed`] only resolves for later updates
    pub fn observe(&mut self) -> usize { *self.0.borrow_and_update() }

    /// Wait for the count to be updated and return the new value.
    /// Returns `None` once the broadcast and every guard attached to it are gone.
    pub async fn changed(&mut self) -> Option<usize> {
        self.0.changed().await.ok()?;
        Some(*self.0.borrow_and_update())
    }
}

impl std::fmt::Debug for SubscriberCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_tuple("SubscriberCount").field(&self.current()).finish() }
}
