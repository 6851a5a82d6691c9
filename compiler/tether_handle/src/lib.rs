//! Durable handles over run-scoped compiler objects.
//!
//! A compilation context hands out ids that die with the pass that produced
//! them. The handles in this crate capture a declaration, a syntax-tree
//! location or a type using only strings, integers and kind tags, and can be
//! resolved again against any later context.
//!
//! # Handle families
//!
//! - [`ElementHandle`]: a declaration, encoded as a [`Signature`].
//! - [`TreePathHandle`]: a syntax-tree location, anchored on the enclosing
//!   declaration and disambiguated by a [`KindPath`].
//! - [`DocTreePathHandle`]: a location inside a documentation comment.
//! - [`TypeHandle`]: a type, stored as an index graph so self-referential
//!   generics stay finite.
//!
//! Absence is never an error: `resolve` returns `None` when the target is
//! gone. Construction rejects unsupported input with a [`HandleError`].
//!
//! Handles created through one [`InternPool`] share storage, so equal
//! handles are usually the same allocation.

mod descriptor;
mod doc_path;
mod element;
mod error;
mod intern;
mod kind_path;
mod signature;
mod tree_path;
mod type_handle;

pub use descriptor::{method_descriptor, type_descriptor};
pub use doc_path::DocTreePathHandle;
pub use element::{kinds_equivalent, ElementHandle};
pub use error::HandleError;
pub use intern::{InternPool, WeakInterner};
pub use kind_path::{KindPath, PathKind};
pub use signature::Signature;
pub use tree_path::{TreeLocation, TreePathHandle};
pub use type_handle::{TypeGraph, TypeHandle, TypeNode, TypeRef};
