//! Shutdown signalling for long-running tasks.

use tokio::sync::watch;

/// Sending half: fires the shutdown signal.
#[derive(Debug)]
pub struct ShutdownTrigger {
    sender: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Signal every [`Shutdown`] handle.
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }
}

/// Receiving half, cloned into everything that must stop on shutdown.
#[derive(Debug, Clone)]
pub struct Shutdown {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    /// A handle that never fires.
    pub fn never() -> Self {
        let (_, shutdown) = channel();
        shutdown
    }

    /// Wait until shutdown is signalled.
    ///
    /// If the trigger is dropped without firing, this never completes.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        let fired = receiver.wait_for(|fired| *fired).await.is_ok();
        if !fired {
            std::future::pending::<()>().await;
        }
    }
}

/// Create a connected trigger and handle.
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownTrigger { sender }, Shutdown { receiver })
}
