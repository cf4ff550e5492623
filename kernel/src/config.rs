// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Data structure for storing compile-time configuration options.
//!
//! Configuration lives in a typed `const` object rather than in `#[cfg]`
//! attributes scattered through the code. Every code path is then type-checked
//! regardless of which options are enabled, and the compiler folds the
//! constant so disabled paths cost nothing in the final binary.

/// Data structure holding compile-time configuration options.
///
/// To change the configuration, enable the matching Cargo feature on the
/// `kernel` dependency of the board crate.
pub(crate) struct Config {
    /// Whether every volatile register access should be traced to the log.
    ///
    /// If enabled, [`RegisterBlock`](crate::utilities::mmio::RegisterBlock)
    /// emits a `trace!` record with the absolute address and value of each
    /// read and write. This is very noisy and also fires from interrupt
    /// context, so it is only meant for bringing up a new board.
    pub(crate) trace_mmio: bool,
}

/// A unique instance of `Config` where compile-time configuration options are
/// defined. This is the only location in the crate where Cargo features are
/// consulted.
pub(crate) const CONFIG: Config = Config {
    trace_mmio: cfg!(feature = "trace_mmio"),
};
