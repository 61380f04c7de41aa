//! `SingleDataTransfer`, `HalfwordTransfer` and `BlockDataTransfer`
//! (`LDR`/`STR`/`LDRH`/`STRH`/`LDRSB`/`LDRSH`/`LDM`/`STM`) execution.

use crate::arm::{HalfwordKind, Operand2SingleTransfer};
use crate::cpu::{ARM7TDMI, MemoryBus};
use crate::shifter;

fn resolve_single_transfer_offset(cpu: &ARM7TDMI, offset: &Operand2SingleTransfer) -> u32 {
    match *offset {
        Operand2SingleTransfer::Immediate(value) => value,
        Operand2SingleTransfer::Register { rm, shift_type, amount } => {
            let rm_value = cpu.regs.r[rm as usize];
            let (shift_type, amount, rrx) = shifter::resolve_immediate_shift(shift_type, amount);
            let (result, _carry) = if rrx {
                shifter::rrx(rm_value, cpu.regs.flag_c())
            } else {
                shifter::shift(shift_type, rm_value, amount, cpu.regs.flag_c())
            };
            result
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn execute_single_data_transfer<M: MemoryBus>(
    cpu: &mut ARM7TDMI,
    bus: &mut M,
    load: bool,
    byte: bool,
    pre_index: bool,
    add: bool,
    writeback: bool,
    rn: u8,
    rd: u8,
    offset: &Operand2SingleTransfer,
) {
    let offset_value = resolve_single_transfer_offset(cpu, offset);
    let base = cpu.regs.r[rn as usize];
    let indexed = if add { base.wrapping_add(offset_value) } else { base.wrapping_sub(offset_value) };
    let address = if pre_index { indexed } else { base };

    if load {
        let value = if byte {
            bus.read_byte(address, false) as u32
        } else {
            let word = bus.read_word(address & !3, false);
            word.rotate_right((address & 3) * 8)
        };
        if rd == 15 {
            cpu.regs.set_pc(value & !3);
            cpu.flush_pipeline();
        } else {
            cpu.regs.r[rd as usize] = value;
        }
    } else {
        let value = if rd == 15 { cpu.regs.pc().wrapping_add(4) } else { cpu.regs.r[rd as usize] };
        if byte {
            bus.write_byte(address, value as u8, false);
        } else {
            bus.write_word(address & !3, value, false);
        }
    }

    if writeback || !pre_index {
        if writeback && pre_index && !add && offset_value == 0 {
            log::warn!("write-back with zero offset is a no-op address-wise");
        }
        if rn != 15 {
            cpu.regs.r[rn as usize] = indexed;
        }
    }
    if writeback && !pre_index {
        log::warn!("write-back combined with post-index is redundant (post-index always writes back)");
    }

    cpu.sequential = false;
}

#[allow(clippy::too_many_arguments)]
pub fn execute_halfword_transfer<M: MemoryBus>(
    cpu: &mut ARM7TDMI,
    bus: &mut M,
    load: bool,
    pre_index: bool,
    add: bool,
    writeback: bool,
    immediate_offset: bool,
    rn: u8,
    rd: u8,
    kind: HalfwordKind,
    offset_register: u8,
    offset_immediate: u8,
) {
    let offset_value = if immediate_offset { offset_immediate as u32 } else { cpu.regs.r[offset_register as usize] };
    let base = cpu.regs.r[rn as usize];
    let indexed = if add { base.wrapping_add(offset_value) } else { base.wrapping_sub(offset_value) };
    let address = if pre_index { indexed } else { base };

    if load {
        let value = match kind {
            HalfwordKind::UnsignedHalfword => {
                let h = bus.read_halfword(address & !1, false);
                if address & 1 != 0 {
                    (h as u32).rotate_right(8)
                } else {
                    h as u32
                }
            }
            HalfwordKind::SignedByte => (bus.read_byte(address, false) as i8) as i32 as u32,
            HalfwordKind::SignedHalfword => {
                if address & 1 != 0 {
                    (bus.read_byte(address, false) as i8) as i32 as u32
                } else {
                    (bus.read_halfword(address, false) as i16) as i32 as u32
                }
            }
        };
        if rd == 15 {
            cpu.regs.set_pc(value & !3);
            cpu.flush_pipeline();
        } else {
            cpu.regs.r[rd as usize] = value;
        }
    } else {
        let value = if rd == 15 { cpu.regs.pc().wrapping_add(4) } else { cpu.regs.r[rd as usize] };
        bus.write_halfword(address & !1, value as u16, false);
    }

    if (writeback || !pre_index) && rn != 15 {
        cpu.regs.r[rn as usize] = indexed;
    }
    cpu.sequential = false;
}

pub fn execute_block_data_transfer<M: MemoryBus>(
    cpu: &mut ARM7TDMI,
    bus: &mut M,
    load: bool,
    pre_index: bool,
    add: bool,
    user_bank_transfer: bool,
    writeback: bool,
    rn: u8,
    register_list: u16,
) {
    let count = register_list.count_ones().max(1);
    let base = cpu.regs.r[rn as usize];
    let final_address = if add { base.wrapping_add(count * 4) } else { base.wrapping_sub(count * 4) };
    // Registers are always transferred in ascending register-number order onto
    // ascending addresses; `pre_index`/`add` only pick which contiguous block
    // of `count` words that is — the lowest address in the block, from which
    // the loop below always steps upward.
    let low_address = match (add, pre_index) {
        (true, false) => base,                                  // IA
        (true, true) => base.wrapping_add(4),                   // IB
        (false, false) => base.wrapping_sub(count * 4).wrapping_add(4), // DA
        (false, true) => base.wrapping_sub(count * 4),          // DB
    };

    let mode_switch_on_completion = load && register_list & (1 << 15) != 0 && user_bank_transfer;
    let user_bank_only = user_bank_transfer && !(load && register_list & (1 << 15) != 0);
    if user_bank_only {
        log::warn!("LDM/STM with S set and R15 outside the list uses the user-mode register bank");
    }

    let mut address = low_address;
    let mut first_written = true;
    for i in 0..16usize {
        if register_list & (1 << i) == 0 {
            continue;
        }

        if load {
            let value = bus.read_word(address, false);
            if i == 15 {
                cpu.regs.set_pc(value & !3);
                cpu.flush_pipeline();
            } else {
                cpu.regs.r[i] = value;
            }
        } else {
            let value = if i == rn as usize {
                if first_written { base } else { final_address }
            } else if i == 15 {
                cpu.regs.pc().wrapping_add(4)
            } else {
                cpu.regs.r[i]
            };
            bus.write_word(address, value, false);
        }
        first_written = false;
        address = address.wrapping_add(4);
    }

    if mode_switch_on_completion {
        match cpu.regs.spsr() {
            Ok(spsr) => cpu.regs.write_cpsr_control(spsr),
            Err(err) => log::error!("LDM with R15 and S set outside a privileged mode: {err}"),
        }
    }

    if writeback {
        if user_bank_only {
            log::warn!("write-back is not permitted when S selects the user-mode bank without R15");
        } else if rn != 15 {
            cpu.regs.r[rn as usize] = final_address;
        }
    }

    cpu.sequential = false;
}
