//! Error taxonomy for conditions that make a requested CPU operation
//! meaningless to perform, as opposed to merely unusual (see `log` call
//! sites throughout `instructions/` for the latter).

use thiserror::Error;

/// Raised by the register file when an operation cannot be carried out as
/// requested. The execution engine catches these at the call site, logs
/// them, and continues with the closest reasonable interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CpuFault {
    /// `MRS`/`MSR` addressed `SPSR` while `CPSR.mode` is User or System,
    /// where no SPSR bank exists.
    #[error("SPSR is not banked in User/System mode")]
    SpsrUnavailable,
}
