//! Shared types for the phpsa analyser.
//!
//! This crate defines the AST node types the analysis core consumes, source
//! spans, the canonical expression printer, and diagnostic values.

mod error;
mod span;
pub mod ast;
pub mod printer;

pub use error::{Diagnostic, Diagnostics};
pub use printer::print_expr;
pub use span::Span;
