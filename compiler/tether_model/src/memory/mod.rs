//! In-memory reference compilation context.
//!
//! A small front end for a Java-like language: a logos lexer, a
//! recursive-descent parser into a flat arena, a doc-comment parser, and an
//! attribution pass over workspace files plus a built-in library slice.
//! [`Workspace`] holds the editable state; [`Workspace::open`] produces a
//! fresh [`MemoryContext`] implementing every trait in [`crate::context`].

mod attrib;
mod context;
mod doc;
mod lexer;
mod library;
mod parser;
mod symbols;
mod syntax;
mod types;
mod workspace;

pub use context::MemoryContext;
pub use parser::ParseError;
pub use workspace::{BinaryStub, ContextError, IndexMonitor, Workspace};
