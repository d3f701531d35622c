#![warn(clippy::all)]

pub mod error;
pub mod sql;

pub use error::{Error, Result};
pub use sql::parser::{Ast, BatchError, Parser};
