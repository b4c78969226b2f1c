// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Single-value hand-off between a blocking task and the future awaiting it.
//!
//! The awaiting future may be dropped (a deadline fires) while the blocking
//! task keeps running. Whatever the task produces afterwards must still be
//! released, so the value goes through a slot that both sides share:
//!
//! - the task [`HandoffSender::deliver`]s into the slot, or releases the
//!   value itself when the receiver is already gone
//! - the receiver [`HandoffReceiver::take`]s it; dropping the receiver while
//!   a value sits in the slot releases that value on a detached thread

use std::sync::Arc;

use parking_lot::Mutex;

/// Cleanup run on a value nobody will take.
pub(crate) type Release<T> = fn(T);

struct Slot<T> {
    abandoned: bool,
    value: Option<T>,
}

/// Creates a connected sender/receiver pair.
pub(crate) fn handoff<T: Send + 'static>(
    release: Release<T>,
) -> (HandoffSender<T>, HandoffReceiver<T>) {
    let slot = Arc::new(Mutex::new(Slot {
        abandoned: false,
        value: None,
    }));
    (
        HandoffSender {
            slot: Arc::clone(&slot),
            release,
        },
        HandoffReceiver {
            slot,
            release,
            taken: false,
        },
    )
}

/// Producer side, moved into the blocking task.
pub(crate) struct HandoffSender<T> {
    slot: Arc<Mutex<Slot<T>>>,
    release: Release<T>,
}

impl<T> HandoffSender<T> {
    /// Stores `value` for the receiver. Returns `false` after releasing the
    /// value when the receiver was dropped first.
    pub(crate) fn deliver(self, value: T) -> bool {
        let mut slot = self.slot.lock();
        if slot.abandoned {
            drop(slot);
            (self.release)(value);
            return false;
        }
        slot.value = Some(value);
        true
    }
}

/// Consumer side, held by the awaiting future.
pub(crate) struct HandoffReceiver<T: Send + 'static> {
    slot: Arc<Mutex<Slot<T>>>,
    release: Release<T>,
    taken: bool,
}

impl<T: Send + 'static> HandoffReceiver<T> {
    /// Takes the delivered value, if any.
    pub(crate) fn take(mut self) -> Option<T> {
        self.taken = true;
        self.slot.lock().value.take()
    }
}

impl<T: Send + 'static> Drop for HandoffReceiver<T> {
    fn drop(&mut self) {
        if self.taken {
            return;
        }
        let orphan = {
            let mut slot = self.slot.lock();
            slot.abandoned = true;
            slot.value.take()
        };
        if let Some(value) = orphan {
            let release = self.release;
            std::thread::spawn(move || release(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    static LATE_RELEASED: AtomicUsize = AtomicUsize::new(0);
    static ORPHAN_RELEASED: AtomicUsize = AtomicUsize::new(0);
    static TAKEN_RELEASED: AtomicUsize = AtomicUsize::new(0);

    fn wait_for(counter: &AtomicUsize, expected: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while counter.load(Ordering::SeqCst) < expected && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_delivery_after_receiver_dropped_is_released() {
        let (tx, rx) = handoff::<u32>(|_| {
            LATE_RELEASED.fetch_add(1, Ordering::SeqCst);
        });
        drop(rx);

        assert!(!tx.deliver(7));
        assert_eq!(LATE_RELEASED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_undelivered_value_released_when_receiver_dropped() {
        let (tx, rx) = handoff::<u32>(|_| {
            ORPHAN_RELEASED.fetch_add(1, Ordering::SeqCst);
        });
        assert!(tx.deliver(7));
        drop(rx);

        wait_for(&ORPHAN_RELEASED, 1);
        assert_eq!(ORPHAN_RELEASED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_taken_value_not_released() {
        let (tx, rx) = handoff::<u32>(|_| {
            TAKEN_RELEASED.fetch_add(1, Ordering::SeqCst);
        });
        assert!(tx.deliver(7));

        assert_eq!(rx.take(), Some(7));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(TAKEN_RELEASED.load(Ordering::SeqCst), 0);
    }
}
