//! `DataProcessing` execution: operand resolution through the barrel
//! shifter, the twelve ALU operations, and the flag/destination write-back
//! rules (including the `Rd == R15 && S` mode-restore special case).

use crate::arm::{Operand2, ShiftAmount, data_processing};
use crate::cpu::ARM7TDMI;
use crate::registers::Registers;
use crate::shifter;

/// Resolves operand2 to `(value, shifter_carry_out, used_register_shift)`.
/// The third field is true only when the shift amount came from a register
/// (`Rs`), which costs the execute stage one extra internal cycle.
pub fn resolve_operand2(regs: &Registers, operand2: &Operand2) -> (u32, bool, bool) {
    match *operand2 {
        Operand2::Immediate { value, rotate } => {
            if rotate == 0 {
                (value, regs.flag_c(), false)
            } else {
                let result = value.rotate_right(rotate);
                (result, result & 0x8000_0000 != 0, false)
            }
        }
        Operand2::Register(shift) => {
            let rm_value = if shift.rm == 15 {
                regs.pc().wrapping_add(4)
            } else {
                regs.r[shift.rm as usize]
            };
            match shift.amount {
                ShiftAmount::Immediate(imm) => {
                    let (shift_type, amount, rrx) = shifter::resolve_immediate_shift(shift.shift_type, imm);
                    let (result, carry) = if rrx {
                        shifter::rrx(rm_value, regs.flag_c())
                    } else {
                        shifter::shift(shift_type, rm_value, amount, regs.flag_c())
                    };
                    (result, carry, false)
                }
                ShiftAmount::Register(rs) => {
                    let amount = regs.r[rs as usize] & 0xFF;
                    let (result, carry) = shifter::shift(shift.shift_type, rm_value, amount, regs.flag_c());
                    (result, carry, true)
                }
            }
        }
    }
}

fn is_logic_operation(opcode: u8) -> bool {
    matches!(
        opcode,
        data_processing::AND
            | data_processing::EOR
            | data_processing::TST
            | data_processing::TEQ
            | data_processing::ORR
            | data_processing::MOV
            | data_processing::BIC
            | data_processing::MVN
    )
}

fn writes_destination(opcode: u8) -> bool {
    !matches!(
        opcode,
        data_processing::TST | data_processing::TEQ | data_processing::CMP | data_processing::CMN
    )
}

/// Executes a decoded `DataProcessing` instruction. Returns the internal
/// cycle count (0 or 1, for a register-specified shift amount).
pub fn execute_data_processing<M: crate::cpu::MemoryBus>(
    cpu: &mut ARM7TDMI,
    bus: &mut M,
    opcode: u8,
    set_flags: bool,
    rn: u8,
    rd: u8,
    operand2: &Operand2,
) -> u32 {
    let (op2, shifter_carry, used_register_shift) = resolve_operand2(&cpu.regs, operand2);

    let rn_value = if rn == 15 {
        // +L is already folded into the PC-ahead invariant; a register-
        // specified shift on operand2 additionally delays the fetch by one
        // cycle, so Rn reads one instruction further ahead in that case.
        if used_register_shift {
            cpu.regs.pc().wrapping_add(4)
        } else {
            cpu.regs.pc()
        }
    } else {
        cpu.regs.r[rn as usize]
    };

    let (result, carry_out, overflow) = match opcode {
        data_processing::AND | data_processing::TST => (rn_value & op2, shifter_carry, cpu.regs.flag_v()),
        data_processing::EOR | data_processing::TEQ => (rn_value ^ op2, shifter_carry, cpu.regs.flag_v()),
        data_processing::SUB | data_processing::CMP => {
            let (r, c, v) = shifter::sub(rn_value, op2);
            (r, c, v)
        }
        data_processing::RSB => {
            let (r, c, v) = shifter::sub(op2, rn_value);
            (r, c, v)
        }
        data_processing::ADD | data_processing::CMN => {
            let (r, c, v) = shifter::add(rn_value, op2);
            (r, c, v)
        }
        data_processing::ADC => {
            let (r, c, v) = shifter::add_with_carry(rn_value, op2, cpu.regs.flag_c());
            (r, c, v)
        }
        data_processing::SBC => {
            let (r, c, v) = shifter::sbc(rn_value, op2, cpu.regs.flag_c());
            (r, c, v)
        }
        data_processing::RSC => {
            let (r, c, v) = shifter::sbc(op2, rn_value, cpu.regs.flag_c());
            (r, c, v)
        }
        data_processing::ORR => (rn_value | op2, shifter_carry, cpu.regs.flag_v()),
        data_processing::MOV => (op2, shifter_carry, cpu.regs.flag_v()),
        data_processing::BIC => (rn_value & !op2, shifter_carry, cpu.regs.flag_v()),
        data_processing::MVN => (!op2, shifter_carry, cpu.regs.flag_v()),
        _ => unreachable!("4-bit data-processing opcode"),
    };

    if writes_destination(opcode) {
        if rd == 15 {
            if set_flags {
                // Rd == R15 with S set restores CPSR from the current
                // mode's SPSR instead of touching NZCV directly.
                match cpu.regs.spsr() {
                    Ok(spsr) => cpu.regs.write_cpsr_control(spsr),
                    Err(err) => log::error!("MOV/ALU PC,S in User/System mode: {err}"),
                }
            }
            cpu.regs.set_pc(result);
            cpu.flush_pipeline();
        } else {
            cpu.regs.r[rd as usize] = result;
            if set_flags {
                if is_logic_operation(opcode) {
                    cpu.regs.set_flags(result & 0x8000_0000 != 0, result == 0, carry_out, cpu.regs.flag_v());
                } else {
                    cpu.regs.set_flags(result & 0x8000_0000 != 0, result == 0, carry_out, overflow);
                }
            }
        }
    } else if set_flags {
        if is_logic_operation(opcode) {
            cpu.regs.set_flags(result & 0x8000_0000 != 0, result == 0, carry_out, cpu.regs.flag_v());
        } else {
            cpu.regs.set_flags(result & 0x8000_0000 != 0, result == 0, carry_out, overflow);
        }
    }

    if rn == 15 && matches!(operand2, Operand2::Register(s) if s.rm == 15) {
        log::warn!("R15 used as both Rn and Rm in a shifted data-processing instruction (unpredictable)");
    }

    if used_register_shift {
        bus.internal_cycle();
    }

    used_register_shift as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::{Operand2, Shift};
    use crate::cpu::ARM7TDMI;
    use crate::shifter::ShiftType;

    struct NullBus;
    impl crate::cpu::MemoryBus for NullBus {
        fn read_byte(&mut self, _addr: u32, _seq: bool) -> u8 {
            0
        }
        fn read_halfword(&mut self, _addr: u32, _seq: bool) -> u16 {
            0
        }
        fn read_word(&mut self, _addr: u32, _seq: bool) -> u32 {
            0
        }
        fn write_byte(&mut self, _addr: u32, _value: u8, _seq: bool) {}
        fn write_halfword(&mut self, _addr: u32, _value: u16, _seq: bool) {}
        fn write_word(&mut self, _addr: u32, _value: u32, _seq: bool) {}
        fn internal_cycle(&mut self) {}
    }

    #[test]
    fn mov_writes_destination_and_flags() {
        let mut cpu = ARM7TDMI::new();
        let mut bus = NullBus;
        execute_data_processing(
            &mut cpu,
            &mut bus,
            data_processing::MOV,
            true,
            0,
            0,
            &Operand2::Immediate { value: 0, rotate: 0 },
        );
        assert_eq!(cpu.regs.r[0], 0);
        assert!(cpu.regs.flag_z());
    }

    #[test]
    fn cmp_never_writes_destination() {
        let mut cpu = ARM7TDMI::new();
        cpu.regs.r[0] = 5;
        let mut bus = NullBus;
        execute_data_processing(
            &mut cpu,
            &mut bus,
            data_processing::CMP,
            true,
            0,
            0,
            &Operand2::Immediate { value: 5, rotate: 0 },
        );
        assert_eq!(cpu.regs.r[0], 5);
        assert!(cpu.regs.flag_z());
        assert!(cpu.regs.flag_c());
    }

    #[test]
    fn ror_shifted_register_operand_matches_scenario_d() {
        let mut cpu = ARM7TDMI::new();
        cpu.regs.r[14] = 0x1390_9E61;
        cpu.regs.r[1] = 0x1390_9E61;
        let operand2 = Operand2::Register(Shift {
            rm: 1,
            shift_type: ShiftType::Ror,
            amount: ShiftAmount::Immediate(22),
        });
        let mut bus = NullBus;
        execute_data_processing(&mut cpu, &mut bus, data_processing::AND, true, 14, 7, &operand2);
        let expected_rotated = 0x1390_9E61u32.rotate_right(22);
        assert_eq!(cpu.regs.r[7], 0x1390_9E61 & expected_rotated);
    }
}
