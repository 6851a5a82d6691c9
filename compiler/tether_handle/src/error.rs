//! Construction errors.
//!
//! Only malformed input lands here. A handle whose target disappeared is not
//! an error; its `resolve` simply returns `None`.

use tether_model::{DeclKind, TypeKind};
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum HandleError {
    #[error("cannot create a handle for a {kind}")]
    UnsupportedDeclaration { kind: DeclKind },

    #[error("type parameter owned by a {owner} has no stable signature")]
    UnsupportedTypeParameterOwner { owner: DeclKind },

    #[error("a {kind} signature takes {expected} parts, got {found}")]
    SignatureArity {
        kind: DeclKind,
        expected: usize,
        found: usize,
    },

    #[error("declaration has no binary name")]
    MissingBinaryName,

    #[error("{kind} is not listed among its owner's members")]
    DetachedInitializer { kind: DeclKind },

    #[error("cannot create a handle for a {kind} type")]
    UnsupportedType { kind: TypeKind },

    #[error("node is not inside a compilation unit")]
    NoEnclosingUnit,

    #[error("type graph has unfilled nodes")]
    IncompleteTypeGraph,
}
