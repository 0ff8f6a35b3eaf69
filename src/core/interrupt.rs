// src/core/interrupt.rs

//! Single-shot interrupt channel shared between the supervisor and its host.
//!
//! The host holds an `Arc<InterruptSlot>` and calls [`InterruptSlot::trigger`]
//! when the operator asks to abort (e.g. on Ctrl+C). The execution scope arms a
//! fresh [`InterruptHandle`] for every command and races the command against
//! [`InterruptHandle::wait`]. At most one handle is live at any time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

#[derive(Debug)]
struct Armed {
    generation: u64,
    trigger: oneshot::Sender<()>,
}

/// The process-wide slot holding the trigger side of the live handle.
#[derive(Debug, Default)]
pub struct InterruptSlot {
    live: Mutex<Option<Armed>>,
    generations: AtomicU64,
}

impl InterruptSlot {
    /// An empty slot, ready to be shared with the host side.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Allocates a new handle and publishes its trigger, replacing any stale one.
    pub fn arm(self: &Arc<Self>) -> InterruptHandle {
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let (trigger, receiver) = oneshot::channel();
        let previous = self.lock().replace(Armed {
            generation,
            trigger,
        });
        if let Some(stale) = previous {
            log::debug!(
                "Interrupt handle #{} replaced stale handle #{}.",
                generation,
                stale.generation
            );
        } else {
            log::debug!("Interrupt handle #{} armed.", generation);
        }
        InterruptHandle {
            generation,
            receiver,
            slot: Arc::clone(self),
        }
    }

    /// Fires the live handle. Returns `false` when nothing was armed or the
    /// handle had already been resolved.
    pub fn trigger(&self) -> bool {
        match self.lock().take() {
            Some(armed) => {
                let fired = armed.trigger.send(()).is_ok();
                log::debug!("Interrupt handle #{} triggered (delivered: {}).", armed.generation, fired);
                fired
            }
            None => {
                log::debug!("Interrupt requested with no command in flight.");
                false
            }
        }
    }

    /// Whether a handle is published and can still be fired.
    pub fn is_armed(&self) -> bool {
        self.lock().as_ref().is_some_and(|armed| !armed.trigger.is_closed())
    }

    fn disarm_generation(&self, generation: u64) {
        let mut live = self.lock();
        if live.as_ref().is_some_and(|armed| armed.generation == generation) {
            *live = None;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Armed>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The consumer side of one armed interrupt.
#[derive(Debug)]
pub struct InterruptHandle {
    generation: u64,
    receiver: oneshot::Receiver<()>,
    slot: Arc<InterruptSlot>,
}

impl InterruptHandle {
    /// Sequence number of this handle within its slot, starting at 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `true` if the host has already triggered this handle.
    ///
    /// The trigger is consumed; a later [`InterruptHandle::wait`] will not see it.
    pub fn take_fired(&mut self) -> bool {
        self.receiver.try_recv().is_ok()
    }

    /// Completes when the host triggers this handle. If the trigger is dropped
    /// without firing, this never completes.
    pub async fn wait(&mut self) {
        if (&mut self.receiver).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Called once the command finished on its own. Closes the channel so a
    /// late trigger cannot land, and unpublishes the handle.
    ///
    /// Returns `true` if the handle was still unresolved.
    pub fn cancel_if_unresolved(&mut self) -> bool {
        self.receiver.close();
        let fired = self.receiver.try_recv().is_ok();
        self.slot.disarm_generation(self.generation);
        !fired
    }

    /// Unpublishes the handle without inspecting it. Used on every scope exit.
    pub fn release(mut self) {
        self.receiver.close();
        self.slot.disarm_generation(self.generation);
        log::debug!("Interrupt handle #{} released.", self.generation);
    }
}
