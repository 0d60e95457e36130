//! The coordinator lifecycle contract.

/// A unit of flow ownership: starts once, owns its children exclusively,
/// stops totally.
///
/// `start` performs setup only — wiring child-completion callbacks and
/// mounting the screen implied by the machine's initial state. It must be
/// called exactly once per instance, by the parent that created it.
///
/// `stop` is synchronous and total: after it returns, no transition handler
/// runs, no completion callback fires, and every subscription the
/// coordinator registered is released. Async work still in flight checks
/// back in through the flow channel, where messages for a stopped
/// coordinator are dropped.
pub trait Coordinator {
    /// Mount the initial child and wire callbacks.
    fn start(&mut self);

    /// Tear down children, subscriptions, and the completion callback.
    fn stop(&mut self);
}
