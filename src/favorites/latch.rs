use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};

/// One-shot signal shared by any number of waiters.
///
/// Resolving is idempotent; only the first call has an effect. Waiting never
/// fails: a latch dropped before resolving releases its waiters as well.
pub struct ReadinessLatch {
    sender: Mutex<Option<oneshot::Sender<()>>>,
    resolved: AtomicBool,
    signal: Shared<oneshot::Receiver<()>>,
}

impl std::fmt::Debug for ReadinessLatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessLatch")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl Default for ReadinessLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessLatch {
    pub fn new() -> Self {
        let (sender, receiver) = oneshot::channel();
        Self {
            sender: Mutex::new(Some(sender)),
            resolved: AtomicBool::new(false),
            signal: receiver.shared(),
        }
    }

    /// Returns `true` if this call resolved the latch.
    pub fn resolve(&self) -> bool {
        let Some(sender) = self.sender.lock().unwrap().take() else {
            return false;
        };
        self.resolved.store(true, Ordering::SeqCst);
        let _ = sender.send(());
        true
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::SeqCst)
    }

    /// Future completing once the latch resolves. It does not borrow the latch.
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let signal = self.signal.clone();
        async move {
            let _ = signal.await;
        }
    }
}
