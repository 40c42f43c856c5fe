use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Default)]
struct Slot {
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

/// Single cancellable timer. Scheduling replaces whatever has not fired yet;
/// work whose timer already fired is left to finish.
#[derive(Clone, Default)]
pub struct Debouncer {
    slot: Arc<Mutex<Slot>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule<F>(&self, delay: Duration, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.lock();
        if let Some(previous) = slot.pending.take() {
            previous.abort();
            debug!("replaced pending debounce timer");
        }
        slot.generation = slot.generation.wrapping_add(1);
        let generation = slot.generation;

        let shared = self.slot.clone();
        slot.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut slot = shared.lock().unwrap_or_else(|p| p.into_inner());
                if slot.generation != generation {
                    return;
                }
                // fired: a later schedule must not abort this run
                slot.pending = None;
            }
            work.await;
        }));
    }

    pub fn cancel_pending(&self) -> bool {
        let mut slot = self.lock();
        slot.generation = slot.generation.wrapping_add(1);
        match slot.pending.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|p| p.into_inner())
    }
}
