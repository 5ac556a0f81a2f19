//! AST to bytecode emitter.
//!
//! The compiler is a single recursive walk over the statement list:
//! statements and expressions lower through two exhaustive dispatch
//! surfaces, operator tokens through a third. Emission targets the
//! region named by the active segment selector; a function literal is
//! the only construct that switches it, saving the previous selector
//! on a stack so nested literals restore correctly on every exit path.
//!
//! Back-patching goes through two primitives only: `add_placeholder`
//! reserves a pool slot and returns its index, `patch_constant`
//! overwrites it once the forward distance is known. Placeholders are
//! never interned, so patching one can never alias another constant.

use crate::bytecode::{MemorySegment, Opcode, Program};

use lyra_core::{SyntaxError, Value};
use lyra_parser::ast::{Expr, ExprKind, Param, Stmt, StmtKind};
use lyra_parser::token::{Token, TokenKind};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info};

/// Stack-allocated selector save-stack. Function literals rarely nest
/// more than a few levels, so the common case avoids heap allocation.
type SegmentStack = SmallVec<[MemorySegment; 4]>;

/// Compilation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    /// Error message.
    pub message: String,
    /// Line number (1-indexed).
    pub line: u32,
}

impl CompileError {
    /// Create a compile error at the given line.
    pub fn new(message: impl Into<String>, line: u32) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for CompileError {}

impl From<SyntaxError> for CompileError {
    fn from(err: SyntaxError) -> Self {
        Self {
            message: err.message,
            line: err.line,
        }
    }
}

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

// =============================================================================
// Compiler
// =============================================================================

/// Bytecode compiler.
pub struct Compiler {
    /// The program under construction.
    program: Program,
    /// Active emission region.
    current_segment: MemorySegment,
    /// Saved selectors for nested function literals.
    segment_stack: SegmentStack,
    /// Source line of the AST node being emitted.
    current_line: u32,
    /// Per-region string intern tables, indexed by segment.
    interned: [FxHashMap<Arc<str>, u64>; 3],
}

/// Index of a segment's intern table.
const fn segment_slot(segment: MemorySegment) -> usize {
    match segment {
        MemorySegment::Program => 0,
        MemorySegment::Functions => 1,
        MemorySegment::Classes => 2,
    }
}

impl Compiler {
    /// Create a new compiler with empty regions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: Program::new(),
            current_segment: MemorySegment::Program,
            segment_stack: SegmentStack::new(),
            current_line: 1,
            interned: Default::default(),
        }
    }

    /// Compile source text to a program.
    ///
    /// Invokes the parser, emits every top-level statement into the
    /// `program` region, appends `EXIT` and returns the program.
    pub fn compile(source: &str) -> CompileResult<Program> {
        let statements = lyra_parser::parse(source)?;
        info!(statements = statements.len(), "starting code generation");
        let program = Self::compile_statements(&statements)?;
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!("\n{}", program.dump());
        }
        info!("code generation finished");
        Ok(program)
    }

    /// Compile a pre-parsed statement list to a program.
    pub fn compile_statements(statements: &[Stmt]) -> CompileResult<Program> {
        let mut compiler = Compiler::new();
        for stmt in statements {
            compiler.compile_stmt(stmt)?;
        }
        compiler.add_opcode(Opcode::Exit);
        debug!(
            program_slots = compiler.program.program.code.len(),
            function_slots = compiler.program.functions.code.len(),
            "emission complete"
        );
        Ok(compiler.program)
    }

    // =========================================================================
    // Emission Primitives
    // =========================================================================

    /// Current code-stream length of the active region.
    #[inline]
    fn current_offset(&self) -> u64 {
        self.program.segment(self.current_segment).len()
    }

    /// Append an opcode to the active region.
    fn add_opcode(&mut self, opcode: Opcode) {
        let line = self.current_line;
        self.program
            .segment_mut(self.current_segment)
            .push_slot(opcode.into(), line);
    }

    /// Append `PUSH` followed by a constant.
    fn add_constant(&mut self, value: Value) {
        self.add_opcode(Opcode::Push);
        self.add_constant_only(value);
    }

    /// Append a constant to the active region's pool and write its
    /// index into the code stream, returning the index. String
    /// constants are interned per region; everything else appends.
    fn add_constant_only(&mut self, value: Value) -> u64 {
        let line = self.current_line;
        let slot = segment_slot(self.current_segment);

        if let Value::Str(s) = &value {
            if let Some(&index) = self.interned[slot].get(s) {
                self.program
                    .segment_mut(self.current_segment)
                    .push_slot(index, line);
                return index;
            }
        }

        let key = match &value {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        };

        let memory = self.program.segment_mut(self.current_segment);
        let index = memory.constants.len() as u64;
        memory.constants.push(value);
        memory.push_slot(index, line);

        if let Some(s) = key {
            self.interned[slot].insert(s, index);
        }

        index
    }

    /// Reserve a pool slot for back-patching and return its index.
    /// The sentinel is an integer and is never interned, so the slot
    /// is exclusively owned by the patch site.
    fn add_placeholder(&mut self) -> u64 {
        self.add_constant_only(Value::Int(0))
    }

    /// Overwrite a pool entry in place. An out-of-range index is a bug
    /// in the emitter and panics.
    fn patch_constant(&mut self, index: u64, value: Value) {
        let memory = self.program.segment_mut(self.current_segment);
        let index = usize::try_from(index).expect("patch index overflows usize");
        assert!(
            index < memory.constants.len(),
            "patch index {} out of range for pool of {}",
            index,
            memory.constants.len(),
        );
        memory.constants[index] = value;
    }

    // =========================================================================
    // Statement Emission
    // =========================================================================

    fn compile_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        self.current_line = stmt.line;

        match &stmt.kind {
            StmtKind::Print(expr) => {
                self.compile_expr(expr)?;
                self.add_opcode(Opcode::Print);
            }

            StmtKind::Expression(expr) => {
                self.compile_expr(expr)?;
                // The residual value is unused; clear it off the stack.
                self.add_opcode(Opcode::Pop);
            }

            StmtKind::Declaration { name, ty, init } => {
                self.add_opcode(Opcode::Declare);
                self.add_constant_only(Value::Str(name.clone()));
                self.add_constant_only(Value::Type(*ty));

                if let Some(init) = init {
                    self.compile_expr(init)?;
                    self.add_opcode(Opcode::Store);
                    self.add_constant_only(Value::Str(name.clone()));
                    // STORE leaves the value on the stack; a declaration
                    // is a statement, so discard it.
                    self.add_opcode(Opcode::Pop);
                }
            }

            StmtKind::Return(expr) => {
                self.compile_expr(expr)?;
                self.add_opcode(Opcode::Return);
            }

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if else_branch.is_empty() {
                    self.compile_expr(condition)?;

                    self.add_opcode(Opcode::BranchFalse);
                    let patch = self.add_placeholder();
                    let start = self.current_offset();

                    for stmt in then_branch {
                        self.compile_stmt(stmt)?;
                    }

                    let distance = (self.current_offset() - start) as i64;
                    self.patch_constant(patch, Value::Int(distance));
                } else {
                    // An if with an else branch has no lowering; the
                    // whole statement emits nothing.
                    debug!(
                        line = stmt.line,
                        "skipping if statement: else branch lowering is unimplemented"
                    );
                }
            }

            StmtKind::While { condition, body } => {
                let loop_head = self.current_offset();
                self.compile_expr(condition)?;

                self.add_opcode(Opcode::BranchFalse);
                let patch = self.add_placeholder();
                let body_start = self.current_offset();

                for stmt in body {
                    self.compile_stmt(stmt)?;
                }

                self.add_opcode(Opcode::Rjump);
                // The back-jump distance includes the RJUMP operand slot.
                let back = -((self.current_offset() - loop_head) as i64);
                self.add_constant_only(Value::Int(back));

                let exit = (self.current_offset() - body_start + 1) as i64;
                self.patch_constant(patch, Value::Int(exit));
            }
        }

        Ok(())
    }

    // =========================================================================
    // Expression Emission
    // =========================================================================

    fn compile_expr(&mut self, expr: &Expr) -> CompileResult<()> {
        self.current_line = expr.line;

        match &expr.kind {
            ExprKind::Int(n) => {
                self.add_constant(Value::Int(*n));
            }

            ExprKind::Float(n) => {
                self.add_constant(Value::Float(*n));
            }

            ExprKind::Str(s) => {
                self.add_constant(Value::Str(s.clone()));
            }

            ExprKind::Bool(b) => {
                self.add_constant(Value::Bool(*b));
            }

            ExprKind::None => {
                self.add_constant(Value::None);
            }

            ExprKind::List(elements) => {
                // Elements are emitted last-first so the VM pops them
                // back into declaration order.
                for element in elements.iter().rev() {
                    self.compile_expr(element)?;
                }
                self.add_opcode(Opcode::List);
                self.add_constant_only(Value::Int(elements.len() as i64));
            }

            ExprKind::Dictionary(pairs) => {
                for (key, value) in pairs.iter().rev() {
                    self.add_constant(Value::Str(key.clone()));
                    self.compile_expr(value)?;
                }
                self.add_opcode(Opcode::Dictionary);
                self.add_constant_only(Value::Int(pairs.len() as i64));
            }

            ExprKind::Group(inner) => {
                self.compile_expr(inner)?;
            }

            ExprKind::Unary { op, right } => {
                self.compile_expr(right)?;
                self.compile_op(op, true)?;
            }

            ExprKind::Binary { left, op, right } | ExprKind::Logical { left, op, right } => {
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                self.compile_op(op, false)?;
            }

            ExprKind::Variable(name) => {
                self.add_opcode(Opcode::Load);
                self.add_constant_only(Value::Str(name.clone()));
            }

            ExprKind::Assign { name, value } => {
                self.compile_expr(value)?;
                // Assignment is an expression: STORE keeps the value
                // on the stack.
                self.add_opcode(Opcode::Store);
                self.add_constant_only(Value::Str(name.clone()));
            }

            ExprKind::AssignIndex { name, index, value } => {
                self.compile_expr(value)?;
                self.compile_expr(index)?;
                self.add_opcode(Opcode::StoreAccess);
                self.add_constant_only(Value::Str(name.clone()));
            }

            ExprKind::Access { name, index } => {
                self.compile_expr(index)?;
                self.add_opcode(Opcode::Access);
                self.add_constant_only(Value::Str(name.clone()));
            }

            ExprKind::Function {
                params,
                return_type,
                body,
            } => {
                self.segment_stack.push(self.current_segment);
                self.current_segment = MemorySegment::Functions;

                let address = self.current_offset() as i64;
                let body_result = self.compile_function_body(params, body);

                self.current_segment = self
                    .segment_stack
                    .pop()
                    .expect("unbalanced segment stack");
                body_result?;

                self.add_opcode(Opcode::Function);
                self.add_constant_only(Value::Int(address));
                self.add_constant_only(Value::Type(*return_type));
            }

            ExprKind::Call { callee, args } => {
                for arg in args {
                    self.compile_expr(arg)?;
                }
                self.add_opcode(Opcode::Call);
                self.add_constant_only(Value::Str(callee.clone()));
                self.add_constant_only(Value::Int(args.len() as i64));
            }
        }

        Ok(())
    }

    /// Emit a function body into the functions region: parameter
    /// declarations, reverse-order parameter binding, the body, and a
    /// `PUSH none; RETURN` trailer so a function that falls off its
    /// end returns none.
    fn compile_function_body(&mut self, params: &[Param], body: &[Stmt]) -> CompileResult<()> {
        for param in params {
            self.current_line = param.line;
            self.add_opcode(Opcode::Declare);
            self.add_constant_only(Value::Str(param.name.clone()));
            self.add_constant_only(Value::Type(param.ty));
        }

        // Arguments arrive on the stack; bind them to parameters in
        // reverse so pops restore declaration order.
        for param in params.iter().rev() {
            self.current_line = param.line;
            self.add_opcode(Opcode::OnlyStore);
            self.add_constant_only(Value::Str(param.name.clone()));
        }

        for stmt in body {
            self.compile_stmt(stmt)?;
        }

        // If an earlier explicit return ran, this trailer is never
        // reached.
        self.add_constant(Value::None);
        self.add_opcode(Opcode::Return);

        Ok(())
    }

    // =========================================================================
    // Operator Emission
    // =========================================================================

    /// Map a lexical operator token to an opcode. `unary`
    /// disambiguates `-` between negation and subtraction.
    fn compile_op(&mut self, op: &Token, unary: bool) -> CompileResult<()> {
        self.current_line = op.line;

        let opcode = match &op.kind {
            TokenKind::Plus => Opcode::Add,
            TokenKind::Minus => {
                if unary {
                    Opcode::Minus
                } else {
                    Opcode::Sub
                }
            }
            TokenKind::Star => Opcode::Mul,
            TokenKind::Slash => Opcode::Div,
            TokenKind::Bang => Opcode::Not,
            TokenKind::Equal => Opcode::Store,
            TokenKind::EqualEqual => Opcode::Eq,
            TokenKind::BangEqual => Opcode::Neq,
            TokenKind::Less => Opcode::Lt,
            TokenKind::LessEqual => Opcode::Lte,
            TokenKind::Greater => Opcode::Ht,
            TokenKind::GreaterEqual => Opcode::Hte,
            other => {
                return Err(CompileError::new(
                    format!("unknown operator '{}' in an instruction", other),
                    op.line,
                ));
            }
        };

        self.add_opcode(opcode);
        Ok(())
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use lyra_core::TypeTag;

    fn compile(source: &str) -> Program {
        Compiler::compile(source).expect("compile error")
    }

    fn op(opcode: Opcode) -> u64 {
        opcode.into()
    }

    // =========================================================================
    // Literal Scenario Tests
    // =========================================================================

    #[test]
    fn test_print_addition() {
        let program = compile("print 1 + 2");
        assert_eq!(
            program.program.code,
            vec![
                op(Opcode::Push),
                0,
                op(Opcode::Push),
                1,
                op(Opcode::Add),
                op(Opcode::Print),
                op(Opcode::Exit),
            ]
        );
        assert_eq!(
            program.program.constants,
            vec![Value::Int(1), Value::Int(2)]
        );
    }

    #[test]
    fn test_declaration_with_initializer() {
        let program = compile("x: int = 5");
        assert_eq!(
            program.program.code,
            vec![
                op(Opcode::Declare),
                0,
                1,
                op(Opcode::Push),
                2,
                op(Opcode::Store),
                0,
                op(Opcode::Pop),
                op(Opcode::Exit),
            ]
        );
        assert_eq!(
            program.program.constants,
            vec![
                Value::string("x"),
                Value::Type(TypeTag::Int),
                Value::Int(5),
            ]
        );
    }

    #[test]
    fn test_declaration_without_initializer() {
        let program = compile("x: float");
        assert_eq!(
            program.program.code,
            vec![op(Opcode::Declare), 0, 1, op(Opcode::Exit)]
        );
        assert_eq!(
            program.program.constants,
            vec![Value::string("x"), Value::Type(TypeTag::Float)]
        );
    }

    #[test]
    fn test_if_without_else_backpatch() {
        let program = compile("if a == 1: print a");
        assert_eq!(
            program.program.code,
            vec![
                op(Opcode::Load),
                0,
                op(Opcode::Push),
                1,
                op(Opcode::Eq),
                op(Opcode::BranchFalse),
                2,
                op(Opcode::Load),
                0,
                op(Opcode::Print),
                op(Opcode::Exit),
            ]
        );
        // The placeholder patches to the then-branch length: LOAD, idx,
        // PRINT = 3 slots.
        assert_eq!(program.program.constants[2], Value::Int(3));
    }

    #[test]
    fn test_while_loop_offsets() {
        let program = compile("while a < 10: a = a + 1");
        assert_eq!(
            program.program.code,
            vec![
                op(Opcode::Load),
                0,
                op(Opcode::Push),
                1,
                op(Opcode::Lt),
                op(Opcode::BranchFalse),
                2,
                op(Opcode::Load),
                0,
                op(Opcode::Push),
                3,
                op(Opcode::Add),
                op(Opcode::Store),
                0,
                op(Opcode::Pop),
                op(Opcode::Rjump),
                4,
                op(Opcode::Exit),
            ]
        );
        // Back-jump returns to the loop head at slot 0 from the operand
        // slot at 16.
        assert_eq!(program.program.constants[4], Value::Int(-16));
        // Exit offset: body slots (8) plus RJUMP and operand, plus one.
        assert_eq!(program.program.constants[2], Value::Int(11));
    }

    #[test]
    fn test_function_literal_and_call() {
        let program = compile("f = fn(x: int) -> int { return x + 1 }\nf(2)");

        assert_eq!(
            program.functions.code,
            vec![
                op(Opcode::Declare),
                0,
                1,
                op(Opcode::OnlyStore),
                0,
                op(Opcode::Load),
                0,
                op(Opcode::Push),
                2,
                op(Opcode::Add),
                op(Opcode::Return),
                op(Opcode::Push),
                3,
                op(Opcode::Return),
            ]
        );
        assert_eq!(
            program.functions.constants,
            vec![
                Value::string("x"),
                Value::Type(TypeTag::Int),
                Value::Int(1),
                Value::None,
            ]
        );

        assert_eq!(
            program.program.code,
            vec![
                op(Opcode::Function),
                0,
                1,
                op(Opcode::Store),
                2,
                op(Opcode::Pop),
                op(Opcode::Push),
                3,
                op(Opcode::Call),
                2,
                4,
                op(Opcode::Pop),
                op(Opcode::Exit),
            ]
        );
        assert_eq!(
            program.program.constants,
            vec![
                Value::Int(0),
                Value::Type(TypeTag::Int),
                Value::string("f"),
                Value::Int(2),
                Value::Int(1),
            ]
        );
    }

    #[test]
    fn test_list_literal_reverse_order() {
        let program = compile("[1, 2, 3]");
        assert_eq!(
            program.program.code,
            vec![
                op(Opcode::Push),
                0,
                op(Opcode::Push),
                1,
                op(Opcode::Push),
                2,
                op(Opcode::List),
                3,
                op(Opcode::Pop),
                op(Opcode::Exit),
            ]
        );
        assert_eq!(
            program.program.constants,
            vec![Value::Int(3), Value::Int(2), Value::Int(1), Value::Int(3)]
        );
    }

    // =========================================================================
    // Dispatch Coverage
    // =========================================================================

    #[test]
    fn test_dictionary_reverse_key_order() {
        let program = compile("{\"a\": 1, \"b\": 2}");
        assert_eq!(
            program.program.code,
            vec![
                op(Opcode::Push),
                0, // "b"
                op(Opcode::Push),
                1, // 2
                op(Opcode::Push),
                2, // "a"
                op(Opcode::Push),
                3, // 1
                op(Opcode::Dictionary),
                4, // pair count
                op(Opcode::Pop),
                op(Opcode::Exit),
            ]
        );
        assert_eq!(
            program.program.constants,
            vec![
                Value::string("b"),
                Value::Int(2),
                Value::string("a"),
                Value::Int(1),
                Value::Int(2),
            ]
        );
    }

    #[test]
    fn test_group_is_transparent() {
        let grouped = compile("print (1 + 2)");
        let plain = compile("print 1 + 2");
        assert_eq!(grouped, plain);
    }

    #[test]
    fn test_unary_operators() {
        let program = compile("-a");
        assert_eq!(
            program.program.code,
            vec![
                op(Opcode::Load),
                0,
                op(Opcode::Minus),
                op(Opcode::Pop),
                op(Opcode::Exit),
            ]
        );

        let program = compile("!a");
        assert_eq!(program.program.code[2], op(Opcode::Not));
    }

    #[test]
    fn test_binary_minus_is_sub() {
        let program = compile("a - b");
        assert_eq!(program.program.code[4], op(Opcode::Sub));
    }

    #[test]
    fn test_comparison_operators() {
        for (source, opcode) in [
            ("a == b", Opcode::Eq),
            ("a != b", Opcode::Neq),
            ("a < b", Opcode::Lt),
            ("a <= b", Opcode::Lte),
            ("a > b", Opcode::Ht),
            ("a >= b", Opcode::Hte),
            ("a * b", Opcode::Mul),
            ("a / b", Opcode::Div),
        ] {
            let program = compile(source);
            assert_eq!(program.program.code[4], op(opcode), "for {}", source);
        }
    }

    #[test]
    fn test_indexed_assignment() {
        let program = compile("a[0] = 1");
        assert_eq!(
            program.program.code,
            vec![
                op(Opcode::Push),
                0, // value 1
                op(Opcode::Push),
                1, // index 0
                op(Opcode::StoreAccess),
                2, // "a"
                op(Opcode::Pop),
                op(Opcode::Exit),
            ]
        );
    }

    #[test]
    fn test_access_expression() {
        let program = compile("print a[0]");
        assert_eq!(
            program.program.code,
            vec![
                op(Opcode::Push),
                0,
                op(Opcode::Access),
                1,
                op(Opcode::Print),
                op(Opcode::Exit),
            ]
        );
    }

    #[test]
    fn test_return_statement_in_function() {
        let program = compile("f = fn() -> none { return none }");
        // The explicit `none` and the trailer's `none` both append:
        // only strings intern.
        assert_eq!(
            program.functions.code,
            vec![
                op(Opcode::Push),
                0,
                op(Opcode::Return),
                op(Opcode::Push),
                1,
                op(Opcode::Return),
            ]
        );
        assert_eq!(program.functions.constants, vec![Value::None, Value::None]);
    }

    // =========================================================================
    // Interning
    // =========================================================================

    #[test]
    fn test_string_constants_are_interned() {
        let program = compile("a = a + a");
        // Both LOADs and the STORE reuse the same pool entry for "a".
        let name_indices: Vec<u64> = vec![
            program.program.code[1],
            program.program.code[3],
            program.program.code[6],
        ];
        assert_eq!(name_indices, vec![0, 0, 0]);
        assert_eq!(
            program
                .program
                .constants
                .iter()
                .filter(|v| v.as_str() == Some("a"))
                .count(),
            1
        );
    }

    #[test]
    fn test_string_literal_and_name_share_pool_entry() {
        let program = compile("a = \"a\"");
        assert_eq!(
            program
                .program
                .constants
                .iter()
                .filter(|v| v.as_str() == Some("a"))
                .count(),
            1
        );
    }

    #[test]
    fn test_numbers_are_not_interned() {
        let program = compile("print 1 + 1");
        assert_eq!(
            program.program.constants,
            vec![Value::Int(1), Value::Int(1)]
        );
    }

    #[test]
    fn test_interning_is_region_local() {
        let program = compile("x: int = 1\nf = fn(x: int) -> int { return x }");
        let program_x = program
            .program
            .constants
            .iter()
            .filter(|v| v.as_str() == Some("x"))
            .count();
        let function_x = program
            .functions
            .constants
            .iter()
            .filter(|v| v.as_str() == Some("x"))
            .count();
        assert_eq!(program_x, 1);
        assert_eq!(function_x, 1);
    }

    // =========================================================================
    // Region Discipline
    // =========================================================================

    #[test]
    fn test_nested_function_literals_restore_segment() {
        let program = compile("f = fn() -> int { g = fn() -> int { return 1 }\nreturn g() }");
        // Outer FUNCTION opcode lands in the program region.
        assert_eq!(program.program.code[0], op(Opcode::Function));
        // The inner literal's FUNCTION opcode lands in the functions
        // region (the region active at its textual position).
        assert!(program
            .functions
            .code
            .iter()
            .any(|&slot| slot == op(Opcode::Function)));
        // The inner body is emitted first, so the functions region
        // opens with its PUSH 1.
        assert_eq!(program.functions.code[0], op(Opcode::Push));
        assert_eq!(program.functions.constants[0], Value::Int(1));
    }

    #[test]
    fn test_classes_region_stays_empty() {
        let program = compile("x: int = 1\nf = fn() -> int { return 1 }\nf()");
        assert!(program.classes.is_empty());
        assert!(program.classes.constants.is_empty());
    }

    #[test]
    fn test_program_ends_with_exit() {
        for source in ["", "print 1", "x: int = 1\nprint x"] {
            let program = compile(source);
            assert_eq!(
                program.program.code.last().copied(),
                Some(op(Opcode::Exit)),
                "for source {:?}",
                source
            );
        }
    }

    // =========================================================================
    // If/Else Preservation
    // =========================================================================

    #[test]
    fn test_if_with_else_emits_nothing() {
        let program = compile("if a: print a\nelse: print b");
        assert_eq!(program.program.code, vec![op(Opcode::Exit)]);
        assert!(program.program.constants.is_empty());
    }

    #[test]
    fn test_if_with_else_does_not_affect_neighbors() {
        let with_else = compile("print 1\nif a: print a\nelse: print b\nprint 2");
        let without_if = compile("print 1\nprint 2");
        // Line streams differ (the surviving statements sit on
        // different lines), but code and constants do not.
        assert_eq!(with_else.program.code, without_if.program.code);
        assert_eq!(with_else.program.constants, without_if.program.constants);
    }

    // =========================================================================
    // Failure Model
    // =========================================================================

    #[test]
    fn test_logical_operator_is_fatal() {
        let err = Compiler::compile("a or b").unwrap_err();
        assert!(err.message.contains("unknown operator"));
        assert!(err.message.contains("or"));
    }

    #[test]
    fn test_and_operator_is_fatal() {
        let err = Compiler::compile("a and b").unwrap_err();
        assert!(err.message.contains("unknown operator"));
    }

    #[test]
    fn test_percent_operator_is_fatal() {
        let err = Compiler::compile("a % b").unwrap_err();
        assert!(err.message.contains("unknown operator"));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_parse_errors_propagate() {
        let err = Compiler::compile("print *").unwrap_err();
        assert!(err.message.contains("expected expression"));
    }

    #[test]
    fn test_operator_error_reports_line() {
        let err = Compiler::compile("print 1\nprint a % b").unwrap_err();
        assert_eq!(err.line, 2);
    }

    // =========================================================================
    // Line Streams
    // =========================================================================

    #[test]
    fn test_lines_parallel_to_code_everywhere() {
        let program = compile("x: int = 1\nwhile x < 3 {\n  x = x + 1\n}\nf = fn() -> int { return x }");
        for memory in [&program.program, &program.functions, &program.classes] {
            assert_eq!(memory.code.len(), memory.lines.len());
        }
    }

    #[test]
    fn test_line_numbers_follow_statements() {
        let program = compile("print 1\nprint 2");
        // Slots: PUSH, idx, PRINT on line 1, then PUSH, idx, PRINT on
        // line 2, then EXIT.
        assert_eq!(program.program.lines[0], 1);
        assert_eq!(program.program.lines[2], 1);
        assert_eq!(program.program.lines[3], 2);
        assert_eq!(program.program.lines[5], 2);
    }
}
