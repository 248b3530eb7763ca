//! Type inference and reflection core of the phpsa analyser.
//!
//! Pipeline position: the external driver walks the AST holding one
//! [`Scope`] per position; rules ask the scope for expression types and
//! the [`Broker`] for class and function facts.
//!
//! # Modules
//!
//! - [`ty`]: the nominal type lattice
//! - [`reflection`]: class, member and function facts
//! - [`universe`]: the host symbol universe facts are built from
//! - [`extension`]: broker extension points
//! - [`broker`]: lazy, cached fact builder
//! - [`scope`]: immutable type state and `resolve_type`
//! - [`error`]: analysis errors

pub mod broker;
pub mod error;
pub mod extension;
pub mod reflection;
pub mod scope;
pub mod ty;
pub mod universe;

pub use broker::Broker;
pub use error::{AnalysisError, AnalysisResult};
pub use scope::Scope;
pub use ty::{Type, TypeKind};
pub use universe::{SymbolSource, Universe};
