// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Cortex-M0 NVIC
//!
//! ARMv6-M supports at most 32 external interrupt lines, so each of the
//! set-enable, clear-enable, set-pending and clear-pending banks is a single
//! word, and eight priority registers hold the priorities of all lines, four
//! 8-bit lanes per register. Only the top two bits of each lane are
//! implemented, which gives the four levels of [`Priority`].
//!
//! <https://developer.arm.com/documentation/dui0497/a/cortex-m0-peripherals/nested-vectored-interrupt-controller>
//!
//! Line numbers are not validated. Passing a line above 31 is a caller bug:
//! the set/clear bit wraps around modulo 32 and the priority accessors
//! address a register past the end of the block. Callers that get line
//! numbers from untrusted input should run them through [`checked_line`]
//! first.

use core::mem::{offset_of, size_of};

use kernel::utilities::mmio::{Mmio, RegisterBlock};
use kernel::utilities::registers::{
    register_bitfields, register_structs, Field, LocalRegisterCopy, ReadWrite,
};
use kernel::utilities::StaticRef;
use kernel::ErrorCode;
use log::debug;

register_structs! {
    /// NVIC Registers.
    ///
    /// Offsets are relative to the start of the set-enable register; the
    /// interrupt controller type register and the SysTick block that precede
    /// it in the System Control Space are not part of this block.
    ///
    /// Only used for its layout: the driver addresses registers by the
    /// offsets checked below.
    #[allow(dead_code)]
    pub NvicRegisters {
        /// Interrupt Set-Enable Register
        (0x000 => iser: ReadWrite<u32, NvicSetClear::Register>),

        (0x004 => _reserved0),

        /// Interrupt Clear-Enable Register
        (0x080 => icer: ReadWrite<u32, NvicSetClear::Register>),

        (0x084 => _reserved1),

        /// Interrupt Set-Pending Register
        (0x100 => ispr: ReadWrite<u32, NvicSetClear::Register>),

        (0x104 => _reserved2),

        /// Interrupt Clear-Pending Register
        (0x180 => icpr: ReadWrite<u32, NvicSetClear::Register>),

        (0x184 => _reserved3),

        /// Interrupt Priority Registers
        (0x300 => ipr: [ReadWrite<u32, NvicInterruptPriority::Register>; 8]),

        (0x320 => @END),
    }
}

register_bitfields![u32,
    NvicSetClear [
        /// Bit n accesses interrupt line n. Writing 0 has no effect.
        BITS            OFFSET(0)   NUMBITS(32)
    ],

    NvicInterruptPriority [
        /// For register NVIC_IPRn, priority of interrupt number 4n+3.
        PRI_N3          OFFSET(24)  NUMBITS(8),

        /// For register NVIC_IPRn, priority of interrupt number 4n+2.
        PRI_N2          OFFSET(16)  NUMBITS(8),

        /// For register NVIC_IPRn, priority of interrupt number 4n+1.
        PRI_N1          OFFSET(8)   NUMBITS(8),

        /// For register NVIC_IPRn, priority of interrupt number 4n.
        PRI_N0          OFFSET(0)   NUMBITS(8)
    ]
];

/// The NVIC peripheral in MMIO space.
const NVIC_BASE: StaticRef<NvicRegisters> =
    unsafe { StaticRef::new(0xe000e100 as *const NvicRegisters) };

const ISER: usize = offset_of!(NvicRegisters, iser);
const ICER: usize = offset_of!(NvicRegisters, icer);
const ISPR: usize = offset_of!(NvicRegisters, ispr);
const ICPR: usize = offset_of!(NvicRegisters, icpr);
const IPR: usize = offset_of!(NvicRegisters, ipr);

const _: () = assert!(ISER == 0x000);
const _: () = assert!(ICER == 0x080);
const _: () = assert!(ISPR == 0x100);
const _: () = assert!(ICPR == 0x180);
const _: () = assert!(IPR == 0x300);
const _: () = assert!(size_of::<NvicRegisters>() == 0x320);

/// Number of external interrupt lines the controller supports.
pub const NUM_LINES: u32 = 32;

type PriorityRegister = LocalRegisterCopy<u32, NvicInterruptPriority::Register>;

/// Lane of an `IPR` register holding the priority of line `4n + k`, indexed
/// by `k`.
const PRIORITY_LANES: [Field<u32, NvicInterruptPriority::Register>; 4] = [
    NvicInterruptPriority::PRI_N0,
    NvicInterruptPriority::PRI_N1,
    NvicInterruptPriority::PRI_N2,
    NvicInterruptPriority::PRI_N3,
];

/// Hardware priority code of each level, indexed by `Priority as usize`.
/// Lower codes are more urgent.
const PRIORITY_CODES: [u8; 4] = [192, 128, 64, 0];

/// Interrupt priority level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    Low = 0,
    LowMedium = 1,
    HighMedium = 2,
    High = 3,
}

impl Priority {
    const LEVELS: [Priority; 4] = [
        Priority::Low,
        Priority::LowMedium,
        Priority::HighMedium,
        Priority::High,
    ];

    /// The 8-bit code written to the priority register for this level.
    pub const fn code(self) -> u8 {
        PRIORITY_CODES[self as usize]
    }

    /// The level whose code is exactly `code`, if any.
    pub fn from_code(code: u8) -> Option<Priority> {
        Priority::LEVELS
            .into_iter()
            .find(|level| level.code() == code)
    }
}

/// Returns `line` if the controller has such a line.
pub fn checked_line(line: u32) -> Result<u32, ErrorCode> {
    if line < NUM_LINES {
        Ok(line)
    } else {
        Err(ErrorCode::INVAL)
    }
}

/// The set/clear register value addressing `line` alone.
fn line_mask(line: u32) -> u32 {
    1 << (line % NUM_LINES)
}

/// Offset of the priority register holding `line`, and the lane within it.
fn priority_register(line: u32) -> (usize, Field<u32, NvicInterruptPriority::Register>) {
    let index = (line / 4) as usize;
    (
        IPR + index * size_of::<u32>(),
        PRIORITY_LANES[(line % 4) as usize],
    )
}

/// Driver for the interrupt controller.
///
/// Every operation is a short, fixed sequence of register accesses and never
/// blocks. Enable, disable and pending updates are single writes to a
/// write-1 register and are safe to issue from interrupt context.
/// [`Nvic::set_priority`] is a read-modify-write of a register shared by
/// four lines and is not protected against concurrent updates; priorities
/// should be configured before the corresponding lines are enabled.
pub struct Nvic<B: Mmio = RegisterBlock<NvicRegisters>> {
    registers: B,
}

impl Nvic {
    /// Creates the driver for the core's NVIC.
    ///
    /// Marked unsafe because only chip/platform configuration code should be
    /// able to create it.
    pub const unsafe fn new() -> Nvic {
        Nvic {
            registers: unsafe { RegisterBlock::new(NVIC_BASE) },
        }
    }
}

impl<B: Mmio> Nvic<B> {
    /// Creates a driver that reaches the controller through `registers`.
    pub const fn with_registers(registers: B) -> Nvic<B> {
        Nvic { registers }
    }

    /// Enable the interrupt line
    pub fn enable(&self, line: u32) {
        self.registers.write(ISER, line_mask(line));
    }

    /// Disable the interrupt line
    pub fn disable(&self, line: u32) {
        self.registers.write(ICER, line_mask(line));
    }

    /// Whether the interrupt line is enabled.
    pub fn is_enabled(&self, line: u32) -> bool {
        self.registers.read(ISER) & line_mask(line) != 0
    }

    /// Disable all interrupt lines.
    pub fn disable_all(&self) {
        debug!("nvic: disabling all lines");
        self.registers.write(ICER, !0);
    }

    /// Set pending state
    pub fn set_pending(&self, line: u32) {
        self.registers.write(ISPR, line_mask(line));
    }

    /// Clear pending state
    pub fn clear_pending(&self, line: u32) {
        self.registers.write(ICPR, line_mask(line));
    }

    /// Whether the interrupt line is pending.
    pub fn is_pending(&self, line: u32) -> bool {
        self.registers.read(ISPR) & line_mask(line) != 0
    }

    /// Clear all pending interrupts
    pub fn clear_all_pending(&self) {
        self.registers.write(ICPR, !0);
    }

    /// Get the lowest numbered pending line, or `None` if none are pending.
    pub fn next_pending(&self) -> Option<u32> {
        let ispr = self.registers.read(ISPR);
        // trailing_zeros == index of first high bit
        (ispr != 0).then_some(ispr.trailing_zeros())
    }

    /// Sets the priority of `line`, leaving the other three lines that share
    /// its priority register untouched.
    pub fn set_priority(&self, line: u32, priority: Priority) {
        let (offset, lane) = priority_register(line);
        let mut ipr = PriorityRegister::new(self.registers.read(offset));
        ipr.modify(lane.val(priority.code() as u32));
        self.registers.write(offset, ipr.get());
        debug!("nvic: line {} priority {:?}", line, priority);
    }

    /// Returns the priority of `line`.
    ///
    /// A lane holding a code that is not one of the four level codes (it
    /// was written by something other than this driver) reads as
    /// [`Priority::Low`].
    pub fn get_priority(&self, line: u32) -> Priority {
        Priority::from_code(self.raw_priority(line)).unwrap_or(Priority::Low)
    }

    /// The raw 8-bit priority code of `line`.
    pub fn raw_priority(&self, line: u32) -> u8 {
        let (offset, lane) = priority_register(line);
        PriorityRegister::new(self.registers.read(offset)).read(lane) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::utilities::mmio::{EmulatedMmio, MmioDevice};

    const IPR_LAST: usize = IPR + 7 * 4;

    /// Bits of each priority lane an ARMv6-M core implements.
    const IMPLEMENTED_PRIORITY_BITS: u32 = 0xc0c0_c0c0;

    /// Model of the ARMv6-M NVIC: each set/clear pair shares one state word.
    #[derive(Default)]
    struct NvicModel {
        enabled: u32,
        pending: u32,
        priority: [u32; 8],
        writes: Vec<(usize, u32)>,
    }

    impl MmioDevice for NvicModel {
        fn mmio_read(&mut self, offset: usize) -> u32 {
            match offset {
                ISER | ICER => self.enabled,
                ISPR | ICPR => self.pending,
                IPR..=IPR_LAST => self.priority[(offset - IPR) / 4],
                _ => panic!("NvicModel: illegal read offset {:#x}", offset),
            }
        }

        fn mmio_write(&mut self, offset: usize, value: u32) {
            self.writes.push((offset, value));
            match offset {
                ISER => self.enabled |= value,
                ICER => self.enabled &= !value,
                ISPR => self.pending |= value,
                ICPR => self.pending &= !value,
                IPR..=IPR_LAST => {
                    self.priority[(offset - IPR) / 4] = value & IMPLEMENTED_PRIORITY_BITS
                }
                _ => panic!("NvicModel: illegal write offset {:#x}", offset),
            }
        }
    }

    fn emulated_nvic() -> Nvic<EmulatedMmio<NvicModel>> {
        Nvic::with_registers(EmulatedMmio::new(NvicModel::default()))
    }

    #[test]
    fn enable_writes_single_bit_and_keeps_other_lines() {
        let nvic = emulated_nvic();

        let mut expected = 0;
        for line in [3, 0, 31, 17, 8] {
            nvic.enable(line);
            expected |= 1 << line;

            let model = nvic.registers.device();
            assert_eq!(model.writes.last(), Some(&(ISER, 1 << line)));
            assert_eq!(model.enabled, expected);
            drop(model);

            assert!(nvic.is_enabled(line));
        }
        assert!(!nvic.is_enabled(1));
    }

    #[test]
    fn disable_clears_only_requested_line() {
        let nvic = emulated_nvic();
        for line in 0..NUM_LINES {
            nvic.enable(line);
        }

        nvic.disable(5);
        assert_eq!(nvic.registers.device().writes.last(), Some(&(ICER, 1 << 5)));
        assert_eq!(nvic.registers.device().enabled, !(1 << 5));

        nvic.disable_all();
        assert_eq!(nvic.registers.device().enabled, 0);
    }

    #[test]
    fn pending_round_trip() {
        let nvic = emulated_nvic();
        for line in 0..NUM_LINES {
            nvic.set_pending(line);
            assert!(nvic.is_pending(line));
            nvic.clear_pending(line);
            assert!(!nvic.is_pending(line));
        }
    }

    #[test]
    fn next_pending_reports_lowest_line() {
        let nvic = emulated_nvic();
        assert_eq!(nvic.next_pending(), None);

        nvic.set_pending(20);
        nvic.set_pending(9);
        assert_eq!(nvic.next_pending(), Some(9));

        nvic.clear_pending(9);
        assert_eq!(nvic.next_pending(), Some(20));

        nvic.clear_all_pending();
        assert_eq!(nvic.next_pending(), None);
    }

    #[test]
    fn priority_codes_are_fixed() {
        assert_eq!(Priority::Low.code(), 192);
        assert_eq!(Priority::LowMedium.code(), 128);
        assert_eq!(Priority::HighMedium.code(), 64);
        assert_eq!(Priority::High.code(), 0);
        assert_eq!(Priority::from_code(64), Some(Priority::HighMedium));
        assert_eq!(Priority::from_code(0x20), None);
    }

    #[test]
    fn priority_round_trip_on_every_line() {
        let nvic = emulated_nvic();
        for line in 0..NUM_LINES {
            for priority in Priority::LEVELS {
                nvic.set_priority(line, priority);
                assert_eq!(nvic.get_priority(line), priority);
            }
        }
    }

    #[test]
    fn priority_lanes_are_independent() {
        let nvic = emulated_nvic();

        // Lines 4..8 share IPR1.
        nvic.set_priority(4, Priority::High);
        nvic.set_priority(5, Priority::LowMedium);
        nvic.set_priority(7, Priority::HighMedium);
        nvic.set_priority(6, Priority::Low);

        assert_eq!(nvic.get_priority(4), Priority::High);
        assert_eq!(nvic.get_priority(5), Priority::LowMedium);
        assert_eq!(nvic.get_priority(6), Priority::Low);
        assert_eq!(nvic.get_priority(7), Priority::HighMedium);
        assert_eq!(nvic.registers.device().priority[1], 0x40c0_8000);

        // Neighbouring registers are untouched.
        assert_eq!(nvic.registers.device().priority[0], 0);
        assert_eq!(nvic.registers.device().priority[2], 0);

        nvic.set_priority(5, Priority::High);
        assert_eq!(nvic.get_priority(4), Priority::High);
        assert_eq!(nvic.get_priority(6), Priority::Low);
        assert_eq!(nvic.registers.device().priority[1], 0x40c0_0000);
    }

    #[test]
    fn last_line_uses_last_priority_register() {
        let nvic = emulated_nvic();
        nvic.set_priority(31, Priority::LowMedium);
        assert_eq!(nvic.registers.device().writes.last(), Some(&(IPR + 0x1c, 0x8000_0000)));
    }

    #[test]
    fn unknown_priority_code_reads_as_low() {
        let nvic = emulated_nvic();
        nvic.set_priority(9, Priority::High);
        nvic.set_priority(10, Priority::HighMedium);

        // Line 9 is lane 1 of IPR2; poke a code no level maps to.
        nvic.registers.device_mut().priority[2] = 0x0040_2000;

        assert_eq!(nvic.raw_priority(9), 0x20);
        assert_eq!(nvic.get_priority(9), Priority::Low);
        assert_eq!(nvic.get_priority(10), Priority::HighMedium);
    }

    #[test]
    fn checked_line_rejects_missing_lines() {
        assert_eq!(checked_line(0), Ok(0));
        assert_eq!(checked_line(31), Ok(31));
        assert_eq!(checked_line(32), Err(ErrorCode::INVAL));
        assert_eq!(checked_line(u32::MAX), Err(ErrorCode::INVAL));
    }
}
