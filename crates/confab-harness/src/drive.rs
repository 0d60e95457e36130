//! Flow-channel pumping for tests.

use confab_flows::{AppCoordinator, FlowMessage};
use tokio::sync::mpsc::UnboundedReceiver;

/// Drain the flow channel until the app is quiescent.
///
/// Alternates between yielding (so spawned SDK calls get scheduled) and
/// dispatching whatever they sent back. A paused [`ScriptedClient`]
/// operation stays parked across a `settle`; resolve it first if the test
/// needs its completion delivered.
///
/// [`ScriptedClient`]: crate::ScriptedClient
pub async fn settle(app: &mut AppCoordinator, messages: &mut UnboundedReceiver<FlowMessage>) {
    for _ in 0..32 {
        tokio::task::yield_now().await;
        while let Ok(message) = messages.try_recv() {
            app.dispatch(message);
        }
    }
}
