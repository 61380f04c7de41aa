//! The GBA has no coprocessor. These three ARM variants decode for
//! completeness (a real ARM7TDMI would drive an external coprocessor bus)
//! but execute as logged no-ops here, per spec.

pub fn execute_coprocessor_no_op(mnemonic: &str) {
    log::warn!("{mnemonic}: no coprocessor is present on this target; executed as a no-op");
}

pub fn execute_undefined(opcode: u32) {
    log::error!("undefined instruction encoding 0x{opcode:08X}; not entering Undefined mode");
}
