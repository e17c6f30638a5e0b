use presence_gate::{Activation, IntoCallback};
use std::sync::{Arc, Mutex};
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() { tracing_subscriber::fmt().with_max_level(Level::DEBUG).with_test_writer().init(); }

/// Returns callbacks that record each activation they are called for, and a function that
/// drains the recorded activations.
#[allow(unused)]
pub fn activation_watcher() -> (impl IntoCallback, impl IntoCallback, Box<dyn Fn() -> Vec<Activation> + Send + Sync>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorder = |activation: Activation| {
        let calls = calls.clone();
        move || {
            calls.lock().unwrap().push(activation);
            async { Ok::<_, std::io::Error>(()) }
        }
    };
    let on_active = recorder(Activation::Active);
    let on_inactive = recorder(Activation::Inactive);

    let check = Box::new(move || calls.lock().unwrap().drain(..).collect());
    (on_active, on_inactive, check)
}

/// Let the monitoring task catch up with everything that has happened so far
#[allow(unused)]
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
