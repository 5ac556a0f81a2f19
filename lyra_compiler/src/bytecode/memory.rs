//! A single emission region.
//!
//! A [`Memory`] owns one code stream, one constants pool and one
//! line-number stream. The code stream mixes opcode values and
//! constant-pool indices positionally; `lines` stays parallel to
//! `code` so every slot maps back to a source line. The region is
//! plain data — interning and patching bookkeeping live in the
//! compiler, so a finalized region can be compared, cloned or handed
//! to the VM as-is.

use super::opcode::Opcode;
use lyra_core::Value;
use std::fmt::Write;

/// One region of emitted bytecode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Memory {
    /// Interleaved opcodes and constant-pool indices.
    pub code: Vec<u64>,
    /// Constants referenced by the code stream.
    pub constants: Vec<Value>,
    /// Source line per code slot; always `lines.len() == code.len()`.
    pub lines: Vec<u32>,
}

impl Memory {
    /// Create an empty region.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current code-stream length in slots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> u64 {
        self.code.len() as u64
    }

    /// Check whether nothing has been emitted.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Append one code slot with its source line.
    #[inline]
    pub fn push_slot(&mut self, slot: u64, line: u32) {
        self.code.push(slot);
        self.lines.push(line);
    }

    /// Render a positional disassembly of this region.
    ///
    /// Walks the code stream opcode by opcode, resolving operand slots
    /// through the constants pool. Slots that do not decode (an
    /// out-of-range opcode, a truncated operand) are rendered inline
    /// rather than aborting the dump.
    #[must_use]
    pub fn disassemble(&self, name: &str) -> String {
        let mut output = String::new();
        writeln!(output, "== {} ==", name).unwrap();

        let mut offset = 0usize;
        while offset < self.code.len() {
            let line = self.lines.get(offset).copied().unwrap_or(0);
            let slot = self.code[offset];
            match Opcode::from_u64(slot) {
                Some(op) => {
                    write!(output, "{:4} {:4}: {}", line, offset, op).unwrap();
                    for i in 0..op.operand_count() {
                        match self.code.get(offset + 1 + i) {
                            Some(&index) => match self.constants.get(index as usize) {
                                Some(value) => write!(output, " {} ({})", index, value).unwrap(),
                                None => write!(output, " {} (<bad index>)", index).unwrap(),
                            },
                            None => write!(output, " <truncated>").unwrap(),
                        }
                    }
                    writeln!(output).unwrap();
                    offset += 1 + op.operand_count();
                }
                None => {
                    writeln!(output, "{:4} {:4}: <unknown {}>", line, offset, slot).unwrap();
                    offset += 1;
                }
            }
        }

        if !self.constants.is_empty() {
            writeln!(output, "constants:").unwrap();
            for (i, value) in self.constants.iter().enumerate() {
                writeln!(output, "  {:4}: {}", i, value).unwrap();
            }
        }

        output
    }
}
