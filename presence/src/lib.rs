/*!
Reference-counted activation for shared resources.

A [`PresenceGate`] watches how many consumers are attached to it. It calls `on_active` when
the count goes from zero to positive and `on_inactive` when it drops back to zero, so an
expensive resource (a connection, a listener, a polling loop) only runs while someone needs it.

Consumers attach by subscribing to the gate's [`Presence`] signal. Each subscription yields a
single pulse and then stays silent; its only job is to keep the gate active and to give the
consumer a point at which to derive what it actually needs.

# Usage

```rust
use presence_gate::*;
use futures::StreamExt;

# #[tokio::main(flavor = "current_thread")]
# async fn main() {
let scope = Scope::new();
let gate = PresenceGate::new(
    &scope,
    || async {
        println!("connecting");
        Ok::<_, std::io::Error>(())
    },
    || async {
        println!("disconnecting");
        Ok::<_, std::io::Error>(())
    },
);

// Each subscriber re-derives its own stream once the gate is active
let mut readings = Box::pin(gate.observe().switch_map(|| futures::stream::iter([1, 2, 3])));
assert_eq!(readings.next().await, Some(1));

// Dropping the last subscriber deactivates the gate
drop(readings);
scope.cancel();
scope.join().await.unwrap();
# }
```

# Guarantees
- Callbacks run on one monitoring task, one at a time, in the order the transitions happened.
- `on_active` and `on_inactive` strictly alternate, and `on_inactive` never runs first.
- Changes that do not cross zero (1 to 2, 2 to 1) call nothing, and attach/detach pairs that
  happen before the monitoring task looks at the count collapse into nothing.
- A failing callback ends monitoring and is reported by [`Scope::join`].
- Cancelling the scope while active calls `on_inactive` once, unless the gate was built with
  [`CancelPolicy::Abandon`].
*/

mod broadcast;
mod callback;
mod error;
mod gate;
mod presence;
mod scope;
mod transition;

pub use broadcast::*;
pub use callback::*;
pub use error::*;
pub use gate::*;
pub use presence::*;
pub use scope::*;
pub use transition::*;
