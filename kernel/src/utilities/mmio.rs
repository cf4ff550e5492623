// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Memory Mapped I/O Interfaces
//!
//! Peripherals are memory mapped: a register block is a fixed range of
//! physical addresses, and talking to the peripheral means reading and
//! writing 32-bit words in that range, in program order, without the
//! compiler caching or eliding any access.
//!
//! Drivers are written against the [`Mmio`] trait, which addresses a register
//! by its byte offset from the start of the block. Two implementations are
//! provided:
//!
//! - [`RegisterBlock`] performs volatile accesses relative to a
//!   [`StaticRef`] to the block's layout struct. This is what runs on
//!   hardware.
//! - [`EmulatedMmio`] forwards every access to an [`MmioDevice`] model. Many
//!   registers have side effects that plain memory cannot reproduce (a
//!   write-1-to-clear register updates the state read back through a
//!   different address, a status flag clears when read), so host tests model
//!   the peripheral instead of backing it with an array.
//!
//! ```rust
//! use kernel::utilities::mmio::{EmulatedMmio, Mmio, MmioDevice};
//!
//! /// A device that counts how many times its only register was written.
//! struct Counter(u32);
//!
//! impl MmioDevice for Counter {
//!     fn mmio_read(&mut self, _offset: usize) -> u32 {
//!         self.0
//!     }
//!
//!     fn mmio_write(&mut self, _offset: usize, _value: u32) {
//!         self.0 += 1;
//!     }
//! }
//!
//! let bus = EmulatedMmio::new(Counter(0));
//! bus.write(0x0, 0xff);
//! bus.write(0x0, 0xff);
//! assert_eq!(bus.read(0x0), 2);
//! ```

use core::cell::{Ref, RefCell, RefMut};
use core::mem::size_of;
use core::ptr;

use log::trace;

use crate::config::CONFIG;
use crate::utilities::StaticRef;

/// Ordered, word-wide access to one register block.
///
/// Offsets are in bytes from the start of the block and must be 4-byte
/// aligned. Accesses happen in exactly the order they are issued.
pub trait Mmio {
    /// Reads the 32-bit register at `offset`.
    fn read(&self, offset: usize) -> u32;

    /// Writes `value` to the 32-bit register at `offset`.
    fn write(&self, offset: usize, value: u32);
}

/// Volatile access to the register block `T` at a fixed address.
///
/// `T` is the `#[repr(C)]` layout of the block (usually generated with
/// `register_structs!`); it bounds the offsets that may be accessed.
pub struct RegisterBlock<T> {
    base: StaticRef<T>,
}

impl<T> RegisterBlock<T> {
    /// Creates a view over the register block at `base`.
    ///
    /// ## Safety
    ///
    /// `base` must point at a mapped register block (or memory standing in
    /// for one) of at least `size_of::<T>()` bytes that stays valid for the
    /// rest of the program.
    pub const unsafe fn new(base: StaticRef<T>) -> RegisterBlock<T> {
        RegisterBlock { base }
    }

    fn register(&self, offset: usize) -> *mut u32 {
        debug_assert!(
            offset & 0b11 == 0 && offset + 4 <= size_of::<T>(),
            "register offset {:#x} outside block of {:#x} bytes",
            offset,
            size_of::<T>()
        );
        self.base
            .as_ptr()
            .cast::<u8>()
            .wrapping_add(offset)
            .cast::<u32>()
            .cast_mut()
    }
}

impl<T> Mmio for RegisterBlock<T> {
    fn read(&self, offset: usize) -> u32 {
        let register = self.register(offset);
        // Safety: `new` requires the whole block to be mapped, and
        // `register` keeps the access aligned and inside it.
        let value = unsafe { ptr::read_volatile(register) };
        if CONFIG.trace_mmio {
            trace!("mmio read  {:#010x} -> {:#010x}", register as usize, value);
        }
        value
    }

    fn write(&self, offset: usize, value: u32) {
        let register = self.register(offset);
        if CONFIG.trace_mmio {
            trace!("mmio write {:#010x} <- {:#010x}", register as usize, value);
        }
        // Safety: see `read`.
        unsafe { ptr::write_volatile(register, value) }
    }
}

/// A model of a peripheral that answers register reads and writes.
///
/// Implementations should handle every offset of the block they model.
pub trait MmioDevice {
    /// Returns the value of the register at `offset`, applying any
    /// read side effects.
    fn mmio_read(&mut self, offset: usize) -> u32;

    /// Applies a write of `value` to the register at `offset`.
    fn mmio_write(&mut self, offset: usize, value: u32);
}

/// An [`Mmio`] implementation backed by a device model instead of hardware.
pub struct EmulatedMmio<D> {
    device: RefCell<D>,
}

impl<D: MmioDevice> EmulatedMmio<D> {
    pub const fn new(device: D) -> EmulatedMmio<D> {
        EmulatedMmio {
            device: RefCell::new(device),
        }
    }

    /// Inspect the model's state without going through its registers (and
    /// so without triggering read side effects).
    pub fn device(&self) -> Ref<'_, D> {
        self.device.borrow()
    }

    /// Change the model's state behind the driver's back, e.g. to raise a
    /// hardware event.
    pub fn device_mut(&self) -> RefMut<'_, D> {
        self.device.borrow_mut()
    }
}

impl<D: MmioDevice> Mmio for EmulatedMmio<D> {
    fn read(&self, offset: usize) -> u32 {
        self.device.borrow_mut().mmio_read(offset)
    }

    fn write(&self, offset: usize, value: u32) {
        self.device.borrow_mut().mmio_write(offset, value)
    }
}
