//! CPU register file: the sixteen visible GPRs, the banked shadows the
//! ARMv4T mode-switching scheme defines, and the CPSR/SPSR pair.
//!
//! Mode switching is implemented as two fixed-size slice copies (save the
//! overlapping window out of the old mode's bank, load the new mode's bank
//! into the same window) rather than a linked or templated structure — see
//! `change_mode`.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::CpuFault;

/// Bits `[31:28]`, `[7:5]` and `[4:0]` of CPSR/SPSR are architecturally
/// defined; everything else (`[27:8]`) is reserved and not writable through
/// `MSR`.
const PSR_WRITABLE_MASK: u32 = 0xF000_00FF;
/// `MSR` in flags-only form touches N/Z/C/V alone.
const PSR_FLAGS_MASK: u32 = 0xF000_0000;

/// Operating modes of the ARM7TDMI, tagged with their CPSR mode-field
/// encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    User = 0b10000,
    FIQ = 0b10001,
    IRQ = 0b10010,
    Supervisor = 0b10011,
    Abort = 0b10111,
    Undefined = 0b11011,
    System = 0b11111,
}

impl Mode {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits & 0x1F {
            0b10000 => Some(Mode::User),
            0b10001 => Some(Mode::FIQ),
            0b10010 => Some(Mode::IRQ),
            0b10011 => Some(Mode::Supervisor),
            0b10111 => Some(Mode::Abort),
            0b11011 => Some(Mode::Undefined),
            0b11111 => Some(Mode::System),
            _ => None,
        }
    }

    /// User and System share the same (unbanked) visible window and have no
    /// SPSR.
    pub fn has_spsr(self) -> bool {
        !matches!(self, Mode::User | Mode::System)
    }
}

/// Execution state selected by CPSR bit 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    ARM,
    THUMB,
}

bitflags! {
    /// Bit layout of CPSR/SPSR.
    #[derive(Debug, Clone, Copy, Serialize, Deserialize)]
    pub struct StatusFlags: u32 {
        const NEGATIVE    = 1 << 31;
        const ZERO        = 1 << 30;
        const CARRY       = 1 << 29;
        const OVERFLOW    = 1 << 28;
        const IRQ_DISABLE = 1 << 7;
        const FIQ_DISABLE = 1 << 6;
        const THUMB_STATE = 1 << 5;
    }
}

/// The ARM7TDMI register file: 16 visible GPRs, the banked shadow slots for
/// every privileged mode, and CPSR/SPSR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registers {
    pub r: [u32; 16],

    r8_fiq: u32,
    r9_fiq: u32,
    r10_fiq: u32,
    r11_fiq: u32,
    r12_fiq: u32,
    r13_fiq: u32,
    r14_fiq: u32,

    r13_svc: u32,
    r14_svc: u32,

    r13_abt: u32,
    r14_abt: u32,

    r13_irq: u32,
    r14_irq: u32,

    r13_und: u32,
    r14_und: u32,

    pub cpsr: u32,

    spsr_fiq: u32,
    spsr_svc: u32,
    spsr_abt: u32,
    spsr_irq: u32,
    spsr_und: u32,

    pub mode: Mode,
}

impl Registers {
    /// All GPRs zero, CPSR = Supervisor/ARM/IRQ+FIQ disabled, as spec'd for
    /// reset (the `PC` pre-fetch offset is applied by `ARM7TDMI::new`, not
    /// here, since it depends on the initial execution state).
    pub fn new() -> Self {
        Self {
            r: [0; 16],
            r8_fiq: 0,
            r9_fiq: 0,
            r10_fiq: 0,
            r11_fiq: 0,
            r12_fiq: 0,
            r13_fiq: 0,
            r14_fiq: 0,
            r13_svc: 0,
            r14_svc: 0,
            r13_abt: 0,
            r14_abt: 0,
            r13_irq: 0,
            r14_irq: 0,
            r13_und: 0,
            r14_und: 0,
            cpsr: Mode::Supervisor as u32 | StatusFlags::IRQ_DISABLE.bits() | StatusFlags::FIQ_DISABLE.bits(),
            spsr_fiq: 0,
            spsr_svc: 0,
            spsr_abt: 0,
            spsr_irq: 0,
            spsr_und: 0,
            mode: Mode::Supervisor,
        }
    }

    #[inline(always)]
    pub fn pc(&self) -> u32 {
        self.r[15]
    }

    #[inline(always)]
    pub fn set_pc(&mut self, value: u32) {
        self.r[15] = value;
    }

    #[inline(always)]
    pub fn sp(&self) -> u32 {
        self.r[13]
    }

    #[inline(always)]
    pub fn lr(&self) -> u32 {
        self.r[14]
    }

    #[inline(always)]
    pub fn set_lr(&mut self, value: u32) {
        self.r[14] = value;
    }

    #[inline(always)]
    pub fn is_thumb(&self) -> bool {
        self.cpsr & StatusFlags::THUMB_STATE.bits() != 0
    }

    #[inline(always)]
    pub fn set_thumb(&mut self, thumb: bool) {
        if thumb {
            self.cpsr |= StatusFlags::THUMB_STATE.bits();
        } else {
            self.cpsr &= !StatusFlags::THUMB_STATE.bits();
        }
    }

    #[inline(always)]
    pub fn cpu_state(&self) -> CpuState {
        if self.is_thumb() {
            CpuState::THUMB
        } else {
            CpuState::ARM
        }
    }

    #[inline(always)]
    pub fn irq_disabled(&self) -> bool {
        self.cpsr & StatusFlags::IRQ_DISABLE.bits() != 0
    }

    #[inline(always)]
    pub fn set_irq_disabled(&mut self, disabled: bool) {
        if disabled {
            self.cpsr |= StatusFlags::IRQ_DISABLE.bits();
        } else {
            self.cpsr &= !StatusFlags::IRQ_DISABLE.bits();
        }
    }

    #[inline(always)]
    pub fn flag_n(&self) -> bool {
        self.cpsr & StatusFlags::NEGATIVE.bits() != 0
    }

    #[inline(always)]
    pub fn set_flag_n(&mut self, value: bool) {
        self.set_flag(StatusFlags::NEGATIVE, value);
    }

    #[inline(always)]
    pub fn flag_z(&self) -> bool {
        self.cpsr & StatusFlags::ZERO.bits() != 0
    }

    #[inline(always)]
    pub fn set_flag_z(&mut self, value: bool) {
        self.set_flag(StatusFlags::ZERO, value);
    }

    #[inline(always)]
    pub fn flag_c(&self) -> bool {
        self.cpsr & StatusFlags::CARRY.bits() != 0
    }

    #[inline(always)]
    pub fn set_flag_c(&mut self, value: bool) {
        self.set_flag(StatusFlags::CARRY, value);
    }

    #[inline(always)]
    pub fn flag_v(&self) -> bool {
        self.cpsr & StatusFlags::OVERFLOW.bits() != 0
    }

    #[inline(always)]
    pub fn set_flag_v(&mut self, value: bool) {
        self.set_flag(StatusFlags::OVERFLOW, value);
    }

    #[inline(always)]
    fn set_flag(&mut self, flag: StatusFlags, value: bool) {
        if value {
            self.cpsr |= flag.bits();
        } else {
            self.cpsr &= !flag.bits();
        }
    }

    /// Sets N, Z, C, V directly; used by every instruction that writes all
    /// four flags from a computed result.
    pub fn set_flags(&mut self, n: bool, z: bool, c: bool, v: bool) {
        let mut flags = self.cpsr
            & !StatusFlags::NEGATIVE.bits()
            & !StatusFlags::ZERO.bits()
            & !StatusFlags::CARRY.bits()
            & !StatusFlags::OVERFLOW.bits();
        if n {
            flags |= StatusFlags::NEGATIVE.bits();
        }
        if z {
            flags |= StatusFlags::ZERO.bits();
        }
        if c {
            flags |= StatusFlags::CARRY.bits();
        }
        if v {
            flags |= StatusFlags::OVERFLOW.bits();
        }
        self.cpsr = flags;
    }

    /// Switches the visible register window to `new_mode`, banking the
    /// overlapping registers of the outgoing mode and restoring the
    /// incoming mode's shadow. A same-mode switch is a no-op. Does **not**
    /// touch the CPSR mode bits; callers update those separately (see
    /// `write_cpsr_control` and exception entry).
    pub fn change_mode(&mut self, new_mode: Mode) {
        if self.mode == new_mode {
            return;
        }

        match self.mode {
            Mode::FIQ => {
                self.r8_fiq = self.r[8];
                self.r9_fiq = self.r[9];
                self.r10_fiq = self.r[10];
                self.r11_fiq = self.r[11];
                self.r12_fiq = self.r[12];
                self.r13_fiq = self.r[13];
                self.r14_fiq = self.r[14];
            }
            Mode::Supervisor => {
                self.r13_svc = self.r[13];
                self.r14_svc = self.r[14];
            }
            Mode::Abort => {
                self.r13_abt = self.r[13];
                self.r14_abt = self.r[14];
            }
            Mode::IRQ => {
                self.r13_irq = self.r[13];
                self.r14_irq = self.r[14];
            }
            Mode::Undefined => {
                self.r13_und = self.r[13];
                self.r14_und = self.r[14];
            }
            Mode::User | Mode::System => {}
        }

        match new_mode {
            Mode::FIQ => {
                self.r[8] = self.r8_fiq;
                self.r[9] = self.r9_fiq;
                self.r[10] = self.r10_fiq;
                self.r[11] = self.r11_fiq;
                self.r[12] = self.r12_fiq;
                self.r[13] = self.r13_fiq;
                self.r[14] = self.r14_fiq;
            }
            Mode::Supervisor => {
                self.r[13] = self.r13_svc;
                self.r[14] = self.r14_svc;
            }
            Mode::Abort => {
                self.r[13] = self.r13_abt;
                self.r[14] = self.r14_abt;
            }
            Mode::IRQ => {
                self.r[13] = self.r13_irq;
                self.r[14] = self.r14_irq;
            }
            Mode::Undefined => {
                self.r[13] = self.r13_und;
                self.r[14] = self.r14_und;
            }
            Mode::User | Mode::System => {}
        }

        self.mode = new_mode;
        self.cpsr = (self.cpsr & !0x1F) | (new_mode as u32);
    }

    /// Current mode's SPSR. Errors in User/System, where no SPSR bank
    /// exists.
    pub fn spsr(&self) -> Result<u32, CpuFault> {
        match self.mode {
            Mode::FIQ => Ok(self.spsr_fiq),
            Mode::Supervisor => Ok(self.spsr_svc),
            Mode::Abort => Ok(self.spsr_abt),
            Mode::IRQ => Ok(self.spsr_irq),
            Mode::Undefined => Ok(self.spsr_und),
            Mode::User | Mode::System => Err(CpuFault::SpsrUnavailable),
        }
    }

    pub fn set_spsr(&mut self, value: u32) -> Result<(), CpuFault> {
        match self.mode {
            Mode::FIQ => self.spsr_fiq = value,
            Mode::Supervisor => self.spsr_svc = value,
            Mode::Abort => self.spsr_abt = value,
            Mode::IRQ => self.spsr_irq = value,
            Mode::Undefined => self.spsr_und = value,
            Mode::User | Mode::System => return Err(CpuFault::SpsrUnavailable),
        }
        Ok(())
    }

    /// Applies a full `MSR` (all fields): the mode field, if it names a
    /// different mode, triggers `change_mode`; the rest of the
    /// architecturally writable bits (`T`/`I`/`F`, NZCV) are then copied in.
    /// Reserved bits `[27:8]` are preserved from the current CPSR rather
    /// than taken from `value`. Outside User mode only — a full `MSR` in
    /// User mode (mode switch included) is a no-op, since User mode has no
    /// privilege to change the mode field or the control bits.
    pub fn write_cpsr_control(&mut self, value: u32) {
        if self.mode == Mode::User {
            return;
        }
        if let Some(new_mode) = Mode::from_bits(value) {
            self.change_mode(new_mode);
        }
        self.cpsr = (self.cpsr & !PSR_WRITABLE_MASK) | (value & PSR_WRITABLE_MASK);
    }

    /// Applies a flags-only `MSR` (N/Z/C/V from bits 31..28 of `value`).
    pub fn write_cpsr_flags(&mut self, value: u32) {
        self.cpsr = (self.cpsr & !PSR_FLAGS_MASK) | (value & PSR_FLAGS_MASK);
    }

    /// As `write_cpsr_control`/`write_cpsr_flags`, but against the banked
    /// SPSR of the current mode instead of CPSR.
    pub fn write_spsr_control(&mut self, value: u32) -> Result<(), CpuFault> {
        let current = self.spsr()?;
        self.set_spsr((current & !PSR_WRITABLE_MASK) | (value & PSR_WRITABLE_MASK))
    }

    pub fn write_spsr_flags(&mut self, value: u32) -> Result<(), CpuFault> {
        let current = self.spsr()?;
        self.set_spsr((current & !PSR_FLAGS_MASK) | (value & PSR_FLAGS_MASK))
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_state_matches_spec() {
        let regs = Registers::new();
        assert_eq!(regs.mode, Mode::Supervisor);
        assert!(matches!(regs.cpu_state(), CpuState::ARM));
        assert!(regs.irq_disabled());
        assert_eq!(
            regs.cpsr & StatusFlags::FIQ_DISABLE.bits(),
            StatusFlags::FIQ_DISABLE.bits()
        );
        assert_eq!(regs.r, [0; 16]);
    }

    #[test]
    fn mode_round_trip_preserves_visible_window_and_spsr() {
        let mut regs = Registers::new();
        regs.change_mode(Mode::Supervisor);
        regs.r[13] = 0x1111_1111;
        regs.r[14] = 0x2222_2222;
        regs.set_spsr(0xDEAD_BEEF).unwrap();

        let snapshot = regs.r;

        regs.change_mode(Mode::IRQ);
        regs.r[13] = 0x3333_3333;
        regs.r[14] = 0x4444_4444;
        regs.set_spsr(0xCAFE_BABE).unwrap();

        regs.change_mode(Mode::Supervisor);

        assert_eq!(regs.r[13], snapshot[13]);
        assert_eq!(regs.r[14], snapshot[14]);
        assert_eq!(regs.spsr().unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn same_mode_switch_is_noop() {
        let mut regs = Registers::new();
        regs.r[13] = 0x1234;
        regs.change_mode(Mode::Supervisor);
        assert_eq!(regs.r[13], 0x1234);
    }

    #[test]
    fn fiq_banks_r8_through_r14() {
        let mut regs = Registers::new();
        for i in 8..15 {
            regs.r[i] = i as u32;
        }
        regs.change_mode(Mode::FIQ);
        for i in 8..15 {
            assert_eq!(regs.r[i], 0);
        }
        regs.change_mode(Mode::User);
        for i in 8..15 {
            assert_eq!(regs.r[i], i as u32);
        }
    }

    #[test]
    fn spsr_unavailable_in_user_and_system() {
        let mut regs = Registers::new();
        regs.change_mode(Mode::User);
        assert_eq!(regs.spsr(), Err(CpuFault::SpsrUnavailable));
        assert_eq!(regs.set_spsr(0), Err(CpuFault::SpsrUnavailable));
        regs.change_mode(Mode::System);
        assert_eq!(regs.spsr(), Err(CpuFault::SpsrUnavailable));
    }

    #[test]
    fn msr_control_preserves_reserved_bits_and_switches_mode() {
        let mut regs = Registers::new();
        regs.cpsr |= 0x0000_1200;
        let reserved_before = regs.cpsr & 0x0FFF_FF00;

        regs.write_cpsr_control(0xF000_0010);
        assert_eq!(regs.mode, Mode::User);
        assert_eq!(regs.cpsr & 0xF000_0000, 0xF000_0000);
        assert_eq!(regs.cpsr & 0x0FFF_FF00, reserved_before);
    }

    #[test]
    fn msr_flags_only_touches_nzcv() {
        let mut regs = Registers::new();
        let mode_bits_before = regs.cpsr & 0xFF;
        regs.write_cpsr_flags(0x8000_0000);
        assert!(regs.flag_n());
        assert_eq!(regs.cpsr & 0xFF, mode_bits_before);
    }
}
