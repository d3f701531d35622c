//! Parses raw SQL-like statements into a structured Abstract Syntax Tree.

pub mod ast;
mod lexer;
mod parser;

pub use ast::{Ast, Condition, Operator, StatementType};
pub use lexer::{has_open_quote, Keyword, Lexer, Token};
pub use parser::{BatchError, Parser};
