//! The VM instruction alphabet.
//!
//! Every opcode fits in a byte but travels through the code stream as
//! a full `u64` slot, interleaved with constant-pool indices. Operands
//! always follow their opcode as pool indices; [`Opcode::operand_count`]
//! drives positional decoding.

use std::fmt;

/// A bytecode operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Push the constant at the next code slot.
    Push = 0,
    /// Discard the top of the stack.
    Pop,
    /// Add the top two values.
    Add,
    /// Subtract the top two values.
    Sub,
    /// Multiply the top two values.
    Mul,
    /// Divide the top two values.
    Div,
    /// Negate the top value.
    Minus,
    /// Logical not of the top value.
    Not,
    /// Equality comparison.
    Eq,
    /// Inequality comparison.
    Neq,
    /// Lower-than comparison.
    Lt,
    /// Lower-or-equal comparison.
    Lte,
    /// Higher-than comparison.
    Ht,
    /// Higher-or-equal comparison.
    Hte,
    /// Declare a variable: operands are name and type constants.
    Declare,
    /// Assign a named variable from the top; leaves the value on the stack.
    Store,
    /// Assign a named variable from the top and pop it.
    OnlyStore,
    /// Push the value of a named variable.
    Load,
    /// Index/field access by name; consumes the index from the stack.
    Access,
    /// Indexed/field assignment by name.
    StoreAccess,
    /// Build a list of N elements; N is the next constant.
    List,
    /// Build a dictionary of N pairs; N is the next constant.
    Dictionary,
    /// Print the top value and pop it.
    Print,
    /// If the top is falsy, advance the PC by the next constant; pops.
    BranchFalse,
    /// Relative jump by the next constant (signed).
    Rjump,
    /// Invoke: operands are the callee name constant and the arg count.
    Call,
    /// Return the top value from the current frame.
    Return,
    /// Materialize a function reference: operands are the address in
    /// the functions region and the declared return type.
    Function,
    /// Halt.
    Exit,
}

/// All opcodes in discriminant order.
const OPCODES: [Opcode; 29] = [
    Opcode::Push,
    Opcode::Pop,
    Opcode::Add,
    Opcode::Sub,
    Opcode::Mul,
    Opcode::Div,
    Opcode::Minus,
    Opcode::Not,
    Opcode::Eq,
    Opcode::Neq,
    Opcode::Lt,
    Opcode::Lte,
    Opcode::Ht,
    Opcode::Hte,
    Opcode::Declare,
    Opcode::Store,
    Opcode::OnlyStore,
    Opcode::Load,
    Opcode::Access,
    Opcode::StoreAccess,
    Opcode::List,
    Opcode::Dictionary,
    Opcode::Print,
    Opcode::BranchFalse,
    Opcode::Rjump,
    Opcode::Call,
    Opcode::Return,
    Opcode::Function,
    Opcode::Exit,
];

impl Opcode {
    /// Recover an opcode from a code slot.
    #[must_use]
    pub fn from_u64(slot: u64) -> Option<Self> {
        OPCODES.get(usize::try_from(slot).ok()?).copied()
    }

    /// Number of operand slots following this opcode in the code stream.
    #[must_use]
    pub const fn operand_count(self) -> usize {
        match self {
            Self::Push
            | Self::Store
            | Self::OnlyStore
            | Self::Load
            | Self::Access
            | Self::StoreAccess
            | Self::List
            | Self::Dictionary
            | Self::BranchFalse
            | Self::Rjump => 1,
            Self::Declare | Self::Call | Self::Function => 2,
            Self::Pop
            | Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div
            | Self::Minus
            | Self::Not
            | Self::Eq
            | Self::Neq
            | Self::Lt
            | Self::Lte
            | Self::Ht
            | Self::Hte
            | Self::Print
            | Self::Return
            | Self::Exit => 0,
        }
    }

    /// The mnemonic for this opcode.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Push => "PUSH",
            Self::Pop => "POP",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Minus => "MINUS",
            Self::Not => "NOT",
            Self::Eq => "EQ",
            Self::Neq => "NEQ",
            Self::Lt => "LT",
            Self::Lte => "LTE",
            Self::Ht => "HT",
            Self::Hte => "HTE",
            Self::Declare => "DECLARE",
            Self::Store => "STORE",
            Self::OnlyStore => "ONLY_STORE",
            Self::Load => "LOAD",
            Self::Access => "ACCESS",
            Self::StoreAccess => "STORE_ACCESS",
            Self::List => "LIST",
            Self::Dictionary => "DICTIONARY",
            Self::Print => "PRINT",
            Self::BranchFalse => "BRANCH_FALSE",
            Self::Rjump => "RJUMP",
            Self::Call => "CALL",
            Self::Return => "RETURN",
            Self::Function => "FUNCTION",
            Self::Exit => "EXIT",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Opcode> for u64 {
    #[inline]
    fn from(op: Opcode) -> Self {
        op as u64
    }
}
