use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::select;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::{
    broadcast::{Broadcast, BroadcastId, SubscriberCount},
    callback::{Callback, IntoCallback},
    error::GateError,
    presence::Presence,
    scope::{Cancellation, Scope},
    transition::{Activation, Transitions},
};

/// What a gate does when its scope is cancelled while consumers are still attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelPolicy {
    /// Call `on_inactive` once before the monitoring task stops.
    /// Best effort: it only runs if the runtime is still driving the task.
    #[default]
    Deactivate,
    /// Stop without calling `on_inactive`
    Abandon,
}

/// Runs `on_active` when the first consumer attaches and `on_inactive` when the last one detaches.
///
/// Consumers attach through the [`Presence`] signal returned by [`PresenceGate::observe`].
/// Callbacks run one at a time on a single monitoring task in the gate's scope, in the order
/// the transitions happened, and always alternate starting with `on_active`.
pub struct PresenceGate {
    broadcast: Broadcast,
    active: Arc<AtomicBool>,
}

/// Configures a [`PresenceGate`] before it starts monitoring
#[must_use]
pub struct GateBuilder {
    scope: Scope,
    on_active: Callback,
    on_inactive: Callback,
    label: Cow<'static, str>,
    cancel_policy: CancelPolicy,
}

impl GateBuilder {
    pub fn on_active(mut self, callback: impl IntoCallback) -> Self {
        self.on_active = callback.into_callback();
        self
    }

    pub fn on_inactive(mut self, callback: impl IntoCallback) -> Self {
        self.on_inactive = callback.into_callback();
        self
    }

    /// Name used for the monitoring task and its tracing span
    pub fn label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = label.into();
        self
    }

    pub fn cancel_policy(mut self, policy: CancelPolicy) -> Self {
        self.cancel_policy = policy;
        self
    }

    /// Create the gate and start monitoring in the configured scope
    ///
    /// # Panics
    /// Panics if called outside of a Tokio runtime.
    pub fn build(self) -> PresenceGate {
        let broadcast = Broadcast::new();
        let active = Arc::new(AtomicBool::new(false));

        // The baseline is taken here rather than on the task, so consumers that attach
        // before the task first runs are treated as a transition.
        let mut count = broadcast.subscriber_count();
        let mut transitions = Transitions::new();
        transitions.observe(Activation::from_count(count.observe()));

        let monitor = Monitor {
            count,
            transitions,
            cancellation: self.scope.cancellation(),
            on_active: self.on_active,
            on_inactive: self.on_inactive,
            cancel_policy: self.cancel_policy,
            active: active.clone(),
        };
        let span = info_span!("presence_gate", label = %self.label, broadcast = %broadcast.id());
        self.scope.launch(self.label, monitor.run().instrument(span));

        PresenceGate { broadcast, active }
    }
}

impl PresenceGate {
    /// Create a gate with the default configuration and start monitoring in `scope`
    ///
    /// # Panics
    /// Panics if called outside of a Tokio runtime.
    pub fn new(scope: &Scope, on_active: impl IntoCallback, on_inactive: impl IntoCallback) -> Self {
        Self::builder(scope).on_active(on_active).on_inactive(on_inactive).build()
    }

    pub fn builder(scope: &Scope) -> GateBuilder {
        GateBuilder {
            scope: scope.clone(),
            on_active: Callback::noop(),
            on_inactive: Callback::noop(),
            label: Cow::Borrowed("presence-gate"),
            cancel_policy: CancelPolicy::default(),
        }
    }

    /// The signal consumers subscribe to. Every subscription attaches a consumer and
    /// emits exactly one pulse.
    pub fn observe(&self) -> Presence { Presence::new(self.broadcast.clone()) }

    /// Observe how many consumers are attached
    pub fn subscriber_count(&self) -> SubscriberCount { self.broadcast.subscriber_count() }

    /// Whether `on_active` was the last callback to complete.
    ///
    /// Only the monitoring task updates this. Once monitoring stops (a callback failed, or the
    /// scope was cancelled with [`CancelPolicy::Abandon`]) the value no longer follows the
    /// subscriber count.
    pub fn is_active(&self) -> bool { self.active.load(Ordering::Acquire) }

    pub fn broadcast_id(&self) -> BroadcastId { self.broadcast.id() }
}

impl std::fmt::Debug for PresenceGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceGate").field("broadcast", &self.broadcast).field("active", &self.is_active()).finish()
    }
}

struct Monitor {
    count: SubscriberCount,
    transitions: Transitions,
    cancellation: Cancellation,
    on_active: Callback,
    on_inactive: Callback,
    cancel_policy: CancelPolicy,
    active: Arc<AtomicBool>,
}

impl Monitor {
    async fn run(mut self) -> Result<(), GateError> {
        debug!("Monitoring started");
        loop {
            select! {
                biased;
                _ = self.cancellation.cancelled() => {
                    return self.cancelled().await;
                }
                count = self.count.changed() => {
                    let Some(count) = count else {
                        debug!("Broadcast closed, monitoring stopped");
                        return Ok(());
                    };
                    debug!("Subscriber count {}", count);
                    if let Some(activation) = self.transitions.observe(Activation::from_count(count)) {
                        self.transition(activation).await?;
                    }
                }
            }
        }
    }

    async fn transition(&self, activation: Activation) -> Result<(), GateError> {
        info!("Gate is now {}", activation);
        let callback = match activation {
            Activation::Active => &self.on_active,
            Activation::Inactive => &self.on_inactive,
        };
        callback.call().await.map_err(|source| GateError::Callback { activation, source })?;
        self.active.store(activation.is_active(), Ordering::Release);
        Ok(())
    }

    async fn cancelled(&mut self) -> Result<(), GateError> {
        if self.transitions.current() != Some(Activation::Active) {
            info!("Scope cancelled, monitoring stopped");
            return Ok(());
        }
        match self.cancel_policy {
            CancelPolicy::Deactivate => {
                info!("Scope cancelled while active, deactivating");
                self.transitions.observe(Activation::Inactive);
                self.transition(Activation::Inactive).await
            }
            CancelPolicy::Abandon => {
                warn!("Scope cancelled while active, on_inactive will not be called");
                Ok(())
            }
        }
    }
}
