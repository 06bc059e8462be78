use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use crossbeam::channel::{bounded, RecvTimeoutError, Sender};
use crate::core::error::Result;
use crate::storage::registry::SessionStore;

/// Background sweep reclaiming sessions older than the retention window
pub struct Reaper {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Reaper {
    pub fn spawn(store: Arc<SessionStore>, interval: Duration, retention: Duration) -> Result<Self> {
        let (stop, stopped) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("session-reaper".to_string())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let removed = store.reap_expired(retention);
                        if removed > 0 {
                            tracing::info!(removed, "expired sessions reclaimed");
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        tracing::debug!(interval_ms = interval.as_millis() as u64, "session reaper started");
        Ok(Reaper {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    /// Signal the sweep thread and wait for it
    pub fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("session reaper panicked");
            }
        }
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.shutdown();
    }
}
