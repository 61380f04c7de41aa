//! Execution of the Thumb formats that don't reduce directly to an ARM
//! primitive reused as-is (`BranchAndExchange`, `Branch`-family — see
//! `instructions::branch`). Block-transfer-shaped formats (push/pop,
//! multiple load/store) are implemented by calling back into
//! `instructions::load_store::execute_block_data_transfer`, since the
//! Thumb "ascending register -> ascending address" rule is identical to
//! the ARM one.

use crate::cpu::{ARM7TDMI, MemoryBus};
use crate::instructions::load_store::execute_block_data_transfer;
use crate::shifter::{self, ShiftType};
use crate::thumb::thumb_alu;

/// Format 1: `LSL`/`LSR`/`ASR Rd, Rs, #Offset5`. Sets N, Z, C; V unchanged.
pub fn execute_move_shifted_register(cpu: &mut ARM7TDMI, op: u8, offset: u8, rs: u8, rd: u8) {
    let shift_type = match op {
        0 => ShiftType::Lsl,
        1 => ShiftType::Lsr,
        _ => ShiftType::Asr,
    };
    let (shift_type, amount, _rrx) = shifter::resolve_immediate_shift(shift_type, offset as u32);
    let value = cpu.regs.r[rs as usize];
    let (result, carry) = shifter::shift(shift_type, value, amount, cpu.regs.flag_c());
    cpu.regs.r[rd as usize] = result;
    cpu.regs.set_flags(result & 0x8000_0000 != 0, result == 0, carry, cpu.regs.flag_v());
}

/// Format 2: `ADD`/`SUB Rd, Rs, Rn|#Offset3`.
pub fn execute_add_subtract(cpu: &mut ARM7TDMI, sub: bool, immediate: bool, rn_offset: u8, rs: u8, rd: u8) {
    let a = cpu.regs.r[rs as usize];
    let b = if immediate { rn_offset as u32 } else { cpu.regs.r[rn_offset as usize] };
    let (result, carry, overflow) = if sub { shifter::sub(a, b) } else { shifter::add(a, b) };
    cpu.regs.r[rd as usize] = result;
    cpu.regs.set_flags(result & 0x8000_0000 != 0, result == 0, carry, overflow);
}

/// Format 3: `MOV`/`CMP`/`ADD`/`SUB Rd, #Offset8`.
pub fn execute_mov_cmp_add_sub_immediate(cpu: &mut ARM7TDMI, op: u8, rd: u8, offset: u8) {
    let imm = offset as u32;
    match op {
        0 => {
            // MOV
            cpu.regs.r[rd as usize] = imm;
            cpu.regs.set_flags(false, imm == 0, cpu.regs.flag_c(), cpu.regs.flag_v());
        }
        1 => {
            // CMP
            let (result, carry, overflow) = shifter::sub(cpu.regs.r[rd as usize], imm);
            cpu.regs.set_flags(result & 0x8000_0000 != 0, result == 0, carry, overflow);
        }
        2 => {
            // ADD
            let (result, carry, overflow) = shifter::add(cpu.regs.r[rd as usize], imm);
            cpu.regs.r[rd as usize] = result;
            cpu.regs.set_flags(result & 0x8000_0000 != 0, result == 0, carry, overflow);
        }
        _ => {
            // SUB
            let (result, carry, overflow) = shifter::sub(cpu.regs.r[rd as usize], imm);
            cpu.regs.r[rd as usize] = result;
            cpu.regs.set_flags(result & 0x8000_0000 != 0, result == 0, carry, overflow);
        }
    }
}

/// Format 4: the sixteen two-operand ALU operations, `Rd, Rs`.
pub fn execute_alu_operations(cpu: &mut ARM7TDMI, op: u8, rs: u8, rd: u8) {
    let rd_value = cpu.regs.r[rd as usize];
    let rs_value = cpu.regs.r[rs as usize];

    let (result, carry, overflow, writes) = match op {
        thumb_alu::AND | thumb_alu::TST => (rd_value & rs_value, cpu.regs.flag_c(), cpu.regs.flag_v(), op != thumb_alu::TST),
        thumb_alu::EOR => (rd_value ^ rs_value, cpu.regs.flag_c(), cpu.regs.flag_v(), true),
        thumb_alu::LSL => {
            let (r, c) = shifter::shift(ShiftType::Lsl, rd_value, rs_value & 0xFF, cpu.regs.flag_c());
            (r, c, cpu.regs.flag_v(), true)
        }
        thumb_alu::LSR => {
            let (r, c) = shifter::shift(ShiftType::Lsr, rd_value, rs_value & 0xFF, cpu.regs.flag_c());
            (r, c, cpu.regs.flag_v(), true)
        }
        thumb_alu::ASR => {
            let (r, c) = shifter::shift(ShiftType::Asr, rd_value, rs_value & 0xFF, cpu.regs.flag_c());
            (r, c, cpu.regs.flag_v(), true)
        }
        thumb_alu::ADC => {
            let (r, c, v) = shifter::add_with_carry(rd_value, rs_value, cpu.regs.flag_c());
            (r, c, v, true)
        }
        thumb_alu::SBC => {
            let (r, c, v) = shifter::sbc(rd_value, rs_value, cpu.regs.flag_c());
            (r, c, v, true)
        }
        thumb_alu::ROR => {
            let (r, c) = shifter::shift(ShiftType::Ror, rd_value, rs_value & 0xFF, cpu.regs.flag_c());
            (r, c, cpu.regs.flag_v(), true)
        }
        thumb_alu::NEG => {
            let (r, c, v) = shifter::sub(0, rs_value);
            (r, c, v, true)
        }
        thumb_alu::CMP => {
            let (r, c, v) = shifter::sub(rd_value, rs_value);
            (r, c, v, false)
        }
        thumb_alu::CMN => {
            let (r, c, v) = shifter::add(rd_value, rs_value);
            (r, c, v, false)
        }
        thumb_alu::ORR => (rd_value | rs_value, cpu.regs.flag_c(), cpu.regs.flag_v(), true),
        thumb_alu::MUL => (rd_value.wrapping_mul(rs_value), cpu.regs.flag_c(), cpu.regs.flag_v(), true),
        thumb_alu::BIC => (rd_value & !rs_value, cpu.regs.flag_c(), cpu.regs.flag_v(), true),
        thumb_alu::MVN => (!rs_value, cpu.regs.flag_c(), cpu.regs.flag_v(), true),
        _ => unreachable!("4-bit Thumb ALU opcode"),
    };

    if writes {
        cpu.regs.r[rd as usize] = result;
    }
    cpu.regs.set_flags(result & 0x8000_0000 != 0, result == 0, carry, overflow);
}

/// Format 5: `ADD`/`CMP`/`MOV`/`BX` with access to R8-R15. `BX` is handled
/// by the Thumb execute dispatch calling `branch::execute_branch_exchange`
/// directly; this covers the remaining three.
pub fn execute_hi_register_operations(cpu: &mut ARM7TDMI, op: u8, h1: bool, h2: bool, rs: u8, rd: u8) {
    let rd_full = rd + if h1 { 8 } else { 0 };
    let rs_full = rs + if h2 { 8 } else { 0 };
    let rs_value = cpu.regs.r[rs_full as usize];

    match op {
        0 => {
            // ADD, no flags
            let result = cpu.regs.r[rd_full as usize].wrapping_add(rs_value);
            if rd_full == 15 {
                cpu.regs.set_pc(result & !1);
                cpu.flush_pipeline();
            } else {
                cpu.regs.r[rd_full as usize] = result;
            }
        }
        1 => {
            // CMP, sets flags
            let (result, carry, overflow) = shifter::sub(cpu.regs.r[rd_full as usize], rs_value);
            cpu.regs.set_flags(result & 0x8000_0000 != 0, result == 0, carry, overflow);
        }
        _ => {
            // MOV, no flags
            if rd_full == 15 {
                cpu.regs.set_pc(rs_value & !1);
                cpu.flush_pipeline();
            } else {
                cpu.regs.r[rd_full as usize] = rs_value;
            }
        }
    }
}

/// Format 6: `LDR Rd, [PC, #Imm8*4]`. Bit 1 of PC is masked off first.
pub fn execute_pc_relative_load<M: MemoryBus>(cpu: &mut ARM7TDMI, bus: &mut M, rd: u8, offset: u8) {
    let base = cpu.regs.pc() & !3;
    let address = base.wrapping_add((offset as u32) * 4);
    cpu.regs.r[rd as usize] = bus.read_word(address, false);
}

/// Format 7: `LDR`/`STR`/`LDRB`/`STRB Rd, [Rb, Ro]`.
pub fn execute_load_store_register_offset<M: MemoryBus>(
    cpu: &mut ARM7TDMI,
    bus: &mut M,
    load: bool,
    byte: bool,
    ro: u8,
    rb: u8,
    rd: u8,
) {
    let address = cpu.regs.r[rb as usize].wrapping_add(cpu.regs.r[ro as usize]);
    if load {
        let value = if byte {
            bus.read_byte(address, false) as u32
        } else {
            bus.read_word(address & !3, false).rotate_right((address & 3) * 8)
        };
        cpu.regs.r[rd as usize] = value;
    } else if byte {
        bus.write_byte(address, cpu.regs.r[rd as usize] as u8, false);
    } else {
        bus.write_word(address & !3, cpu.regs.r[rd as usize], false);
    }
}

/// Format 8: `LDRH`/`STRH`/`LDSB`/`LDSH Rd, [Rb, Ro]`.
pub fn execute_load_store_sign_extended_halfword<M: MemoryBus>(
    cpu: &mut ARM7TDMI,
    bus: &mut M,
    h: bool,
    sign: bool,
    ro: u8,
    rb: u8,
    rd: u8,
) {
    let address = cpu.regs.r[rb as usize].wrapping_add(cpu.regs.r[ro as usize]);
    let value = match (sign, h) {
        (false, false) => {
            bus.write_halfword(address & !1, cpu.regs.r[rd as usize] as u16, false);
            return;
        }
        (false, true) => bus.read_halfword(address & !1, false) as u32,
        (true, false) => (bus.read_byte(address, false) as i8) as i32 as u32,
        (true, true) => {
            if address & 1 != 0 {
                (bus.read_byte(address, false) as i8) as i32 as u32
            } else {
                (bus.read_halfword(address, false) as i16) as i32 as u32
            }
        }
    };
    cpu.regs.r[rd as usize] = value;
}

/// Format 9: `LDR`/`STR`/`LDRB`/`STRB Rd, [Rb, #Imm]` — `offset` is already
/// scaled at decode time.
pub fn execute_load_store_immediate_offset<M: MemoryBus>(
    cpu: &mut ARM7TDMI,
    bus: &mut M,
    load: bool,
    byte: bool,
    offset: u32,
    rb: u8,
    rd: u8,
) {
    let address = cpu.regs.r[rb as usize].wrapping_add(offset);
    if load {
        let value = if byte {
            bus.read_byte(address, false) as u32
        } else {
            bus.read_word(address & !3, false).rotate_right((address & 3) * 8)
        };
        cpu.regs.r[rd as usize] = value;
    } else if byte {
        bus.write_byte(address, cpu.regs.r[rd as usize] as u8, false);
    } else {
        bus.write_word(address & !3, cpu.regs.r[rd as usize], false);
    }
}

/// Format 10: `LDRH`/`STRH Rd, [Rb, #Imm5*2]`.
pub fn execute_load_store_halfword<M: MemoryBus>(cpu: &mut ARM7TDMI, bus: &mut M, load: bool, offset: u32, rb: u8, rd: u8) {
    let address = cpu.regs.r[rb as usize].wrapping_add(offset);
    if load {
        cpu.regs.r[rd as usize] = bus.read_halfword(address & !1, false) as u32;
    } else {
        bus.write_halfword(address & !1, cpu.regs.r[rd as usize] as u16, false);
    }
}

/// Format 11: `LDR`/`STR Rd, [SP, #Imm8*4]`.
pub fn execute_sp_relative_load<M: MemoryBus>(cpu: &mut ARM7TDMI, bus: &mut M, load: bool, rd: u8, offset: u8) {
    let address = cpu.regs.sp().wrapping_add((offset as u32) * 4);
    if load {
        cpu.regs.r[rd as usize] = bus.read_word(address & !3, false);
    } else {
        bus.write_word(address & !3, cpu.regs.r[rd as usize], false);
    }
}

/// Format 12: `ADD Rd, PC|SP, #Imm8*4`.
pub fn execute_load_address(cpu: &mut ARM7TDMI, sp: bool, rd: u8, offset: u8) {
    let base = if sp { cpu.regs.sp() } else { cpu.regs.pc() & !3 };
    cpu.regs.r[rd as usize] = base.wrapping_add((offset as u32) * 4);
}

/// Format 13: `ADD`/`SUB SP, #Imm7*4`.
pub fn execute_add_offset_stack_pointer(cpu: &mut ARM7TDMI, sub: bool, offset: u8) {
    let delta = (offset as u32) * 4;
    let sp = cpu.regs.sp();
    cpu.regs.r[13] = if sub { sp.wrapping_sub(delta) } else { sp.wrapping_add(delta) };
}

/// Format 14: `PUSH`/`POP`, implemented as `STMDB`/`LDMIA` against SP — the
/// Thumb "R7 down to R0, then LR/PC" push/pop order is the same
/// ascending-register-to-ascending-address rule ARM's block transfer uses.
pub fn execute_push_pop_register<M: MemoryBus>(cpu: &mut ARM7TDMI, bus: &mut M, load: bool, store_lr_load_pc: bool, rlist: u8) {
    let mut register_list = rlist as u16;
    if store_lr_load_pc {
        register_list |= 1 << if load { 15 } else { 14 };
    }
    if load {
        execute_block_data_transfer(cpu, bus, true, false, true, false, true, 13, register_list);
    } else {
        execute_block_data_transfer(cpu, bus, false, true, false, false, true, 13, register_list);
    }
}

/// Format 15: `LDMIA`/`STMIA Rb!, {Rlist}`.
pub fn execute_multiple_load<M: MemoryBus>(cpu: &mut ARM7TDMI, bus: &mut M, load: bool, rb: u8, rlist: u8) {
    execute_block_data_transfer(cpu, bus, load, false, true, false, true, rb, rlist as u16);
}
