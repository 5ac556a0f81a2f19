//! Stack-based bytecode representation.
//!
//! Key components:
//!
//! - [`Opcode`] - the closed instruction alphabet and operand counts
//! - [`Memory`] - one region's code, constants and line streams
//! - [`Program`] - the three emission regions
//! - [`MemorySegment`] - selector for the active region

mod memory;
mod opcode;
mod program;

pub use memory::Memory;
pub use opcode::Opcode;
pub use program::{MemorySegment, Program};
