// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! ARM Cortex-M0 SysTick peripheral.
//!
//! A 24-bit down counter that restarts from the reload value every time it
//! reaches zero, optionally raising the SysTick exception when it does. The
//! exception is routed by the vector table to [`SysTick_Handler`], which runs
//! the callback registered with [`SysTick::enable_irq`].

use core::mem::{offset_of, size_of};

use kernel::utilities::callback_slot::CallbackSlot;
use kernel::utilities::mmio::{Mmio, RegisterBlock};
use kernel::utilities::registers::{
    register_bitfields, register_structs, FieldValue, LocalRegisterCopy, ReadOnly, ReadWrite,
};
use kernel::utilities::StaticRef;
use kernel::ErrorCode;
use log::debug;

register_structs! {
    /// SysTick Registers.
    ///
    /// Only used for its layout: the driver addresses registers by the
    /// offsets checked below.
    #[allow(dead_code)]
    pub SystickRegisters {
        /// Control and Status Register
        (0x0 => syst_csr: ReadWrite<u32, ControlAndStatus::Register>),

        /// Reload Value Register
        (0x4 => syst_rvr: ReadWrite<u32, ReloadValue::Register>),

        /// Current Value Register
        (0x8 => syst_cvr: ReadWrite<u32, CurrentValue::Register>),

        /// Calibration Value Register
        (0xc => syst_calib: ReadOnly<u32, CalibrationValue::Register>),

        (0x10 => @END),
    }
}

register_bitfields![u32,
    ControlAndStatus [
        /// Returns 1 if timer counted to 0 since last time this was read.
        COUNTFLAG OFFSET(16) NUMBITS(1) [],

        /// Clock source is (0) the reference clock or (1) the processor clock.
        CLKSOURCE OFFSET(2) NUMBITS(1) [
            Reference = 0,
            Processor = 1
        ],

        /// Set to 1 to enable SysTick exception request.
        TICKINT OFFSET(1) NUMBITS(1) [],

        /// Enable the counter (1 == Enabled).
        ENABLE OFFSET(0) NUMBITS(1) []
    ],

    ReloadValue [
        /// Value loaded to `syst_cvr` when counter is enabled and reaches 0.
        RELOAD          OFFSET(0)  NUMBITS(24)
    ],

    CurrentValue [
        /// Reads current value. Write of any value sets to 0.
        CURRENT         OFFSET(0)  NUMBITS(24)
    ],

    CalibrationValue [
        /// 0 if device provides reference clock to processor.
        NOREF           OFFSET(31) NUMBITS(1),

        /// 0 if TENMS value is exact, 1 if inexact or not given.
        SKEW            OFFSET(30) NUMBITS(1),

        /// Reload value for 10ms ticks, or 0 if no calibration.
        TENMS           OFFSET(0)  NUMBITS(24)
    ]
];

const SYSTICK_BASE: StaticRef<SystickRegisters> =
    unsafe { StaticRef::new(0xe000e010 as *const SystickRegisters) };

const CSR: usize = offset_of!(SystickRegisters, syst_csr);
const RVR: usize = offset_of!(SystickRegisters, syst_rvr);
const CVR: usize = offset_of!(SystickRegisters, syst_cvr);
const CALIB: usize = offset_of!(SystickRegisters, syst_calib);

const _: () = assert!(CSR == 0x0);
const _: () = assert!(RVR == 0x4);
const _: () = assert!(CVR == 0x8);
const _: () = assert!(CALIB == 0xc);
const _: () = assert!(size_of::<SystickRegisters>() == 0x10);

/// Largest value the 24-bit reload register holds.
pub const MAX_RELOAD_VALUE: u32 = 0x00ff_ffff;

/// Returns `reload_value` if it fits the reload register unchanged.
///
/// The driver itself silently drops bits above the field; this is for
/// callers that would rather reject such a value.
pub fn checked_reload_value(reload_value: u32) -> Result<u32, ErrorCode> {
    if reload_value <= MAX_RELOAD_VALUE {
        Ok(reload_value)
    } else {
        Err(ErrorCode::SIZE)
    }
}

type ControlStatus = LocalRegisterCopy<u32, ControlAndStatus::Register>;

/// Callback run by [`SysTick_Handler`].
static SYSTICK_CALLBACK: CallbackSlot = CallbackSlot::new();

/// Clock the counter decrements on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockSource {
    /// The implementation-defined external reference clock.
    ReferenceClock,
    /// The processor clock.
    ProcessorClock,
}

/// What the timer is doing, as decoded from its control register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    /// The counter is stopped.
    Disabled,
    /// The counter runs and sets the count flag at every wrap.
    Counting,
    /// The counter runs and also requests the SysTick exception at every
    /// wrap.
    CountingWithInterrupt,
}

/// Contents of the read-only calibration register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Calibration {
    /// Reload value for a 10ms period on the reference clock, or 0 if
    /// unknown.
    pub ten_ms: u32,
    /// Whether the device provides a reference clock.
    pub has_reference_clock: bool,
    /// Whether `ten_ms` is exact.
    pub is_exact: bool,
}

/// The ARM Cortex-M SysTick peripheral
///
/// Documented in the Cortex-M0 Devices Generic User Guide, Chapter 4.4
///
/// Only one SysTick callback exists per program: it is shared by every
/// `SysTick` value, so all of them drive the same slot.
pub struct SysTick<B: Mmio = RegisterBlock<SystickRegisters>> {
    registers: B,
}

impl SysTick {
    /// Configures the core's SysTick with `clock_source` and `reload_value`.
    ///
    /// Marked unsafe because only chip/platform configuration code should be
    /// able to create it, and only once.
    pub unsafe fn new(clock_source: ClockSource, reload_value: u32) -> SysTick {
        SysTick::with_registers(
            unsafe { RegisterBlock::new(SYSTICK_BASE) },
            clock_source,
            reload_value,
        )
    }
}

impl<B: Mmio> SysTick<B> {
    /// Configures the timer reached through `registers`.
    ///
    /// Selects the clock source and writes the reload value, masked to its 24
    /// bits. `ENABLE` and `TICKINT` are left unchanged: after reset the timer
    /// is `Disabled`, but one that is already counting stays `Counting`
    /// (with the new reload taking effect at its next wrap).
    pub fn with_registers(
        registers: B,
        clock_source: ClockSource,
        reload_value: u32,
    ) -> SysTick<B> {
        let systick = SysTick { registers };

        systick.modify_csr(match clock_source {
            ClockSource::ReferenceClock => ControlAndStatus::CLKSOURCE::Reference,
            ClockSource::ProcessorClock => ControlAndStatus::CLKSOURCE::Processor,
        });
        systick.update_reload_value(reload_value);

        debug!(
            "systick: {:?}, reload {:#08x}",
            clock_source,
            reload_value & MAX_RELOAD_VALUE
        );
        systick
    }

    fn csr(&self) -> ControlStatus {
        ControlStatus::new(self.registers.read(CSR))
    }

    fn modify_csr(&self, field: FieldValue<u32, ControlAndStatus::Register>) {
        let mut csr = self.csr();
        csr.modify(field);
        self.registers.write(CSR, csr.get());
    }

    /// Replaces the reload value. Bits above the 24-bit field are dropped.
    ///
    /// The hardware picks up the new value the next time the counter wraps,
    /// not immediately.
    pub fn update_reload_value(&self, reload_value: u32) {
        self.registers
            .write(RVR, ReloadValue::RELOAD.val(reload_value).value);
    }

    /// Start counting.
    pub fn enable(&self) {
        self.modify_csr(ControlAndStatus::ENABLE::SET);
    }

    /// Stop counting.
    pub fn disable(&self) {
        self.modify_csr(ControlAndStatus::ENABLE::CLEAR);
    }

    /// Whether the counter reached zero since the control register was last
    /// read.
    ///
    /// The read clears the flag in hardware, so each wrap is reported once:
    /// two calls in a row after a single wrap return `true` then `false`.
    /// Every other method that reads the control register consumes the flag
    /// too.
    pub fn has_elapsed(&self) -> bool {
        self.csr().is_set(ControlAndStatus::COUNTFLAG)
    }

    /// Registers `callback` to run on every SysTick exception, then enables
    /// the exception.
    ///
    /// A callback registered earlier is replaced. The callback runs in
    /// interrupt context, asynchronously to the code that registered it.
    pub fn enable_irq(&self, callback: fn()) {
        SYSTICK_CALLBACK.replace(callback);
        self.modify_csr(ControlAndStatus::TICKINT::SET);
        debug!("systick: interrupt enabled");
    }

    /// Disables the SysTick exception, then drops the registered callback.
    ///
    /// An exception already being delivered may still run the old callback;
    /// mask interrupts around this call to rule that out.
    pub fn disable_irq(&self) {
        self.modify_csr(ControlAndStatus::TICKINT::CLEAR);
        SYSTICK_CALLBACK.reset();
        debug!("systick: interrupt disabled");
    }

    /// Decodes the control register. Consumes the count flag like any other
    /// read of it.
    pub fn state(&self) -> TimerState {
        let csr = self.csr();
        if !csr.is_set(ControlAndStatus::ENABLE) {
            TimerState::Disabled
        } else if csr.is_set(ControlAndStatus::TICKINT) {
            TimerState::CountingWithInterrupt
        } else {
            TimerState::Counting
        }
    }

    /// Value the counter currently holds.
    pub fn current_value(&self) -> u32 {
        LocalRegisterCopy::<u32, CurrentValue::Register>::new(self.registers.read(CVR))
            .read(CurrentValue::CURRENT)
    }

    /// Zeroes the counter (and the count flag), so it restarts from the
    /// reload value on the next tick.
    pub fn clear_current_value(&self) {
        self.registers.write(CVR, 0);
    }

    /// Reads the calibration register.
    pub fn calibration(&self) -> Calibration {
        let calib =
            LocalRegisterCopy::<u32, CalibrationValue::Register>::new(self.registers.read(CALIB));
        Calibration {
            ten_ms: calib.read(CalibrationValue::TENMS),
            has_reference_clock: !calib.is_set(CalibrationValue::NOREF),
            is_exact: !calib.is_set(CalibrationValue::SKEW),
        }
    }
}

/// SysTick exception entry point.
///
/// The vector table calls this by name. It can also be called directly, which
/// runs the registered callback exactly as an exception would; if none is
/// registered it does nothing.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn SysTick_Handler() {
    SYSTICK_CALLBACK.invoke();
}
