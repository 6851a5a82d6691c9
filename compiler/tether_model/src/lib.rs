//! Compilation-context surface for tether handles.
//!
//! Everything here is run-scoped: ids index into arenas owned by one
//! [`CompilationContext`] and mean nothing outside it. Handles in
//! `tether_handle` persist only kinds, strings and integers, and re-resolve
//! against whichever context they are given.
//!
//! [`memory`] is a complete in-memory context used by tests and tools.

pub mod context;
pub mod ids;
pub mod kind;
pub mod memory;
mod stack;
pub mod ty;

pub use context::{
    CompilationContext, DocTrees, IndexStatus, Namespace, Pseudo, Registration, Symbols, Trees,
    TypeOps,
};
pub use ids::{DeclId, DocId, NodeId, Span, TypeId};
pub use stack::ensure_sufficient_stack;
pub use kind::{DeclKind, DocKind, NodeKind, PrimitiveKind, TypeKind};
pub use ty::TypeData;
