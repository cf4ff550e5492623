// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! A single-entry holder for the function an interrupt handler runs.

use core::mem;
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

/// Holds at most one callback, shared between the code that registers it and
/// the interrupt handler that runs it.
///
/// An empty slot behaves like a callback that does nothing. Registering a
/// callback replaces the previous one; nothing is queued.
///
/// The slot is a single pointer-sized atomic that is only ever loaded and
/// stored, so it works on cores without compare-and-swap (ARMv6-M) and needs
/// no lock. It does not serialize a replacement against a dispatch that is
/// already running: the handler may finish with the callback it loaded
/// before the replacement.
///
/// ```rust
/// use kernel::utilities::callback_slot::CallbackSlot;
///
/// static TICK: CallbackSlot = CallbackSlot::new();
///
/// fn on_tick() {}
///
/// TICK.replace(on_tick);
/// TICK.invoke();
/// TICK.reset();
/// ```
pub struct CallbackSlot {
    // Null while empty, otherwise a `fn()` cast to a data pointer.
    callback: AtomicPtr<()>,
}

impl CallbackSlot {
    /// Creates an empty slot.
    pub const fn new() -> CallbackSlot {
        CallbackSlot {
            callback: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Makes `callback` the function run by [`CallbackSlot::invoke`],
    /// dropping whatever was registered before.
    pub fn replace(&self, callback: fn()) {
        self.callback.store(callback as *mut (), Ordering::Release);
    }

    /// Empties the slot, so `invoke` does nothing.
    pub fn reset(&self) {
        self.callback.store(ptr::null_mut(), Ordering::Release);
    }

    /// Whether a callback is registered.
    pub fn is_set(&self) -> bool {
        !self.callback.load(Ordering::Acquire).is_null()
    }

    /// Runs the registered callback, if any.
    pub fn invoke(&self) {
        let callback = self.callback.load(Ordering::Acquire);
        if callback.is_null() {
            return;
        }
        // Safety: the only non-null values ever stored come from
        // `replace`, which stores a `fn()`.
        let callback = unsafe { mem::transmute::<*mut (), fn()>(callback) };
        callback();
    }
}

#[cfg(test)]
mod tests {
    use super::CallbackSlot;
    use core::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn empty_slot_does_nothing() {
        let slot = CallbackSlot::new();
        assert!(!slot.is_set());
        slot.invoke();
    }

    #[test]
    fn invoke_runs_registered_callback() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        fn count() {
            CALLS.fetch_add(1, Ordering::Relaxed);
        }

        let slot = CallbackSlot::new();
        slot.replace(count);
        assert!(slot.is_set());
        slot.invoke();
        slot.invoke();
        assert_eq!(CALLS.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn replace_overwrites_instead_of_queueing() {
        static FIRST: AtomicUsize = AtomicUsize::new(0);
        static SECOND: AtomicUsize = AtomicUsize::new(0);
        fn first() {
            FIRST.fetch_add(1, Ordering::Relaxed);
        }
        fn second() {
            SECOND.fetch_add(1, Ordering::Relaxed);
        }

        let slot = CallbackSlot::new();
        slot.replace(first);
        slot.replace(second);
        slot.invoke();
        assert_eq!(FIRST.load(Ordering::Relaxed), 0);
        assert_eq!(SECOND.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn reset_returns_to_no_op() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        fn count() {
            CALLS.fetch_add(1, Ordering::Relaxed);
        }

        let slot = CallbackSlot::new();
        slot.replace(count);
        slot.reset();
        assert!(!slot.is_set());
        slot.invoke();
        assert_eq!(CALLS.load(Ordering::Relaxed), 0);
    }
}
