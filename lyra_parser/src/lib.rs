//! # Lyra Parser
//!
//! Lexer and recursive-descent parser producing the statement list the
//! bytecode compiler consumes.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{Expr, ExprKind, Param, Stmt, StmtKind};
pub use lexer::{tokenize, Lexer};
pub use parser::{parse, Parser};
pub use token::{Token, TokenKind};
