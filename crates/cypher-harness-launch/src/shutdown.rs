use tokio::sync::watch;

/// Fires a [`ShutdownSignal`].
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

/// Cancellation token handed to the spawn/wait call.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

pub fn channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownSignal { rx })
}

impl ShutdownSignal {
    /// A signal that fires on the first Ctrl+C. Must be called inside a
    /// tokio runtime.
    pub fn on_ctrl_c() -> Self {
        let (trigger, signal) = channel();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Received interrupt signal");
                    trigger.trigger();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Cannot listen for Ctrl+C");
                    // Keep the sender alive so the signal simply never fires.
                    std::future::pending::<()>().await;
                }
            }
        });
        signal
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the signal fires. Never resolves if the trigger is
    /// dropped without firing.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|&stop| stop).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
