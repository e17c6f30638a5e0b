use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};

use crate::broadcast::{Broadcast, BroadcastId, ListenerGuard};

/// The output signal of a [`PresenceGate`](crate::PresenceGate).
///
/// The pulse carries no data. It exists so that each subscriber can derive whatever it
/// actually needs exactly once, while the subscription keeps the gate active.
#[derive(Clone, Debug)]
pub struct Presence {
    broadcast: Broadcast,
}

impl Presence {
    pub(crate) fn new(broadcast: Broadcast) -> Self { Self { broadcast } }

    /// Attach a consumer. The returned stream yields one `()` and then stays pending;
    /// the consumer stays attached until the stream is dropped.
    pub fn subscribe(&self) -> PresenceStream { PresenceStream { _guard: self.broadcast.listen(), pulse: Some(()) } }

    /// Subscribe and replace the pulse with the stream produced by `derive`.
    ///
    /// `derive` runs once, on the first poll, with the consumer already attached. The consumer
    /// stays attached for as long as the returned stream is alive, and the returned stream
    /// never ends, even after the derived stream does.
    pub fn switch_map<F, S>(&self, mut derive: F) -> impl Stream<Item = S::Item>
    where
        F: FnMut() -> S,
        S: Stream,
    {
        self.subscribe().flat_map(move |()| derive())
    }

    pub fn broadcast_id(&self) -> BroadcastId { self.broadcast.id() }
}

/// A single subscription to a [`Presence`] signal
#[derive(Debug)]
#[must_use = "streams do nothing unless polled, and the consumer detaches when dropped"]
pub struct PresenceStream {
    _guard: ListenerGuard,
    pulse: Option<()>,
}

impl Stream for PresenceStream {
    type Item = ();

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<()>> {
        // Never completes. The consumer stays attached until the stream is dropped
        match self.pulse.take() {
            Some(pulse) => Poll::Ready(Some(pulse)),
            None => Poll::Pending,
        }
    }
}
