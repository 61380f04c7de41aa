//! `Mrs`/`Msr`/`Msr_flg` execution. SPSR accesses in User/System route
//! through `Registers`'s `Result`-returning accessors; a `CpuFault` there is
//! logged and the transfer becomes a no-op, per the core's error taxonomy.

use crate::arm::{Operand2, PsrTransfer};
use crate::cpu::ARM7TDMI;
use crate::instructions::alu::resolve_operand2;

pub fn execute_psr_transfer(cpu: &mut ARM7TDMI, transfer: &PsrTransfer) {
    match *transfer {
        PsrTransfer::Mrs { spsr, rd } => {
            let value = if spsr {
                match cpu.regs.spsr() {
                    Ok(v) => v,
                    Err(err) => {
                        log::error!("MRS from SPSR: {err}");
                        return;
                    }
                }
            } else {
                cpu.regs.cpsr
            };
            if rd == 15 {
                log::warn!("MRS into R15 is unpredictable");
            }
            cpu.regs.r[rd as usize] = value;
        }
        PsrTransfer::Msr { spsr, flags_only, ref operand } => {
            let (value, _carry, _extra_cycle) = resolve_operand2(&cpu.regs, operand);
            if spsr {
                let result = if flags_only {
                    cpu.regs.write_spsr_flags(value)
                } else {
                    cpu.regs.write_spsr_control(value)
                };
                if let Err(err) = result {
                    log::error!("MSR to SPSR: {err}");
                }
            } else if flags_only {
                cpu.regs.write_cpsr_flags(value);
            } else {
                cpu.regs.write_cpsr_control(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::Mode;

    #[test]
    fn mrs_reads_cpsr() {
        let mut cpu = ARM7TDMI::new();
        execute_psr_transfer(&mut cpu, &PsrTransfer::Mrs { spsr: false, rd: 0 });
        assert_eq!(cpu.regs.r[0], cpu.regs.cpsr);
    }

    #[test]
    fn msr_flags_only_sets_nzcv_and_preserves_mode() {
        let mut cpu = ARM7TDMI::new();
        let before_mode = cpu.regs.mode;
        execute_psr_transfer(
            &mut cpu,
            &PsrTransfer::Msr {
                spsr: false,
                flags_only: true,
                operand: Operand2::Immediate { value: 0x8, rotate: 4 },
            },
        );
        assert!(cpu.regs.flag_n());
        assert_eq!(cpu.regs.mode, before_mode);
    }

    #[test]
    fn msr_full_cpsr_in_user_mode_is_noop() {
        let mut cpu = ARM7TDMI::new();
        cpu.regs.change_mode(Mode::User);
        let cpsr_before = cpu.regs.cpsr;
        execute_psr_transfer(
            &mut cpu,
            &PsrTransfer::Msr {
                spsr: false,
                flags_only: false,
                operand: Operand2::Immediate { value: 0xD3, rotate: 0 },
            },
        );
        assert_eq!(cpu.regs.mode, Mode::User);
        assert_eq!(cpu.regs.cpsr, cpsr_before);
    }

    #[test]
    fn msr_to_spsr_in_user_mode_is_logged_noop() {
        let mut cpu = ARM7TDMI::new();
        cpu.regs.change_mode(Mode::User);
        execute_psr_transfer(
            &mut cpu,
            &PsrTransfer::Msr {
                spsr: true,
                flags_only: false,
                operand: Operand2::Immediate { value: 0, rotate: 0 },
            },
        );
        assert_eq!(cpu.regs.mode, Mode::User);
    }
}
