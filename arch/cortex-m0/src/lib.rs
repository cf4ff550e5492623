// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Drivers for the core peripherals of ARM Cortex-M0 processors.
//!
//! - [`nvic`]: the Nested Vectored Interrupt Controller.
//! - [`systick`]: the SysTick timer and its exception entry point.

#![cfg_attr(not(test), no_std)]

pub mod nvic;
pub mod systick;

pub use crate::systick::SysTick_Handler;
