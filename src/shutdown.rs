use std::future::Future;
use std::io;

use tokio::sync::watch;
use tracing::{error, warn};

/// Why interrupt forwarding ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptOutcome {
    /// A second interrupt arrived after the stop was already requested.
    ForceQuit,
    ListenerFailed,
}

/// Turns interrupts into a stop request. The first one sets `stop` so the
/// run ends after the current day; the next one returns `ForceQuit`.
pub async fn forward_interrupts<F, Fut>(
    mut next_interrupt: F,
    stop: watch::Sender<bool>,
) -> InterruptOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    loop {
        if let Err(e) = next_interrupt().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return InterruptOutcome::ListenerFailed;
        }

        if *stop.borrow() {
            warn!("Received second Ctrl+C, exiting without finishing the current day");
            return InterruptOutcome::ForceQuit;
        }

        warn!("Received Ctrl+C, stopping after the current day (press again to quit now)");
        stop.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_second_interrupt_forces_quit() {
        let (stop_tx, stop_rx) = watch::channel(false);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let outcome = forward_interrupts(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            },
            stop_tx,
        )
        .await;

        assert_eq!(outcome, InterruptOutcome::ForceQuit);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(*stop_rx.borrow());
    }

    #[tokio::test]
    async fn test_first_interrupt_only_requests_stop() {
        let (stop_tx, stop_rx) = watch::channel(false);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        // The listener breaks after the first interrupt, so no force quit
        let outcome = forward_interrupts(
            move || {
                let call = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        Ok(())
                    } else {
                        Err(io::Error::new(io::ErrorKind::Other, "listener closed"))
                    }
                }
            },
            stop_tx,
        )
        .await;

        assert_eq!(outcome, InterruptOutcome::ListenerFailed);
        assert!(*stop_rx.borrow());
    }

}
