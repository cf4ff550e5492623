// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Shared support code for the Cortex-M0 peripheral drivers.
//!
//! The drivers in the `cortexm0` crate reach hardware only through the types
//! in this crate:
//!
//! - [`utilities::StaticRef`] names a register block at a fixed address.
//! - [`utilities::mmio::Mmio`] is the ordered, word-wide read/write interface
//!   every driver is written against. [`utilities::mmio::RegisterBlock`]
//!   implements it with volatile accesses on real hardware, and
//!   [`utilities::mmio::EmulatedMmio`] implements it with a device model for
//!   host tests.
//! - [`utilities::callback_slot::CallbackSlot`] holds the function an
//!   interrupt handler dispatches to.
//!
//! Most `unsafe` code is in this crate.

#![cfg_attr(not(test), no_std)]

mod config;
mod errorcode;
pub mod utilities;

pub use crate::errorcode::ErrorCode;
