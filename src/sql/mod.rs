//! The trippySQL query language. Statements are parsed into an AST by the
//! parser; executing them is left to the consumer of the AST.

pub mod parser;
