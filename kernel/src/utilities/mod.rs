// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Utility types provided by the kernel crate.

pub mod callback_slot;
pub mod mmio;

mod static_ref;
pub use self::static_ref::StaticRef;

/// The Tock Register Interface.
///
/// This is a re-export of the `tock-registers` crate provided for
/// convenience, so driver crates describe register layouts and bitfields
/// against the same version the kernel uses.
pub mod registers {
    pub use tock_registers::fields::{Field, FieldValue};
    pub use tock_registers::registers::{ReadOnly, ReadWrite};
    pub use tock_registers::LocalRegisterCopy;
    pub use tock_registers::{register_bitfields, register_structs};
}
