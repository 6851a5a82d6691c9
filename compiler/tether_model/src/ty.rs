//! Live type shape exchanged with a compilation context.
//!
//! `TypeData` children are `TypeId`s into the context's type arena, so a
//! self-referential generic (`E extends Enum<E>`) is an ordinary cycle of ids.

use std::sync::Arc;

use crate::ids::{DeclId, TypeId};
use crate::kind::{PrimitiveKind, TypeKind};

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeData {
    Primitive(PrimitiveKind),
    Void,
    /// Absence of a type, e.g. the superclass of `Object`.
    NoType,
    Null,
    /// A class or interface type with its type arguments.
    ///
    /// `enclosing` is set only when the outer type is itself generic and the
    /// nested type is an inner (non-static) class.
    Declared {
        decl: DeclId,
        args: Vec<TypeId>,
        enclosing: Option<TypeId>,
    },
    Array(TypeId),
    TypeVar {
        decl: DeclId,
        lower: Option<TypeId>,
        upper: Option<TypeId>,
    },
    Wildcard {
        extends: Option<TypeId>,
        super_bound: Option<TypeId>,
    },
    /// Type that failed to resolve. `decl` is the approximate symbol, if any.
    Error {
        name: Arc<str>,
        decl: Option<DeclId>,
    },
    Union(Vec<TypeId>),
    Intersection(Vec<TypeId>),
    /// Synthesised common-supertype intersection with no declared element.
    Compound {
        supertype: TypeId,
        interfaces: Vec<TypeId>,
    },
    Executable {
        type_params: Vec<DeclId>,
        params: Vec<TypeId>,
        ret: TypeId,
        thrown: Vec<TypeId>,
    },
    Package(DeclId),
    Module(DeclId),
}

impl TypeData {
    pub fn kind(&self) -> TypeKind {
        match self {
            TypeData::Primitive(p) => TypeKind::Primitive(*p),
            TypeData::Void => TypeKind::Void,
            TypeData::NoType => TypeKind::None,
            TypeData::Null => TypeKind::Null,
            TypeData::Declared { .. } | TypeData::Compound { .. } => TypeKind::Declared,
            TypeData::Array(_) => TypeKind::Array,
            TypeData::TypeVar { .. } => TypeKind::TypeVar,
            TypeData::Wildcard { .. } => TypeKind::Wildcard,
            TypeData::Error { .. } => TypeKind::Error,
            TypeData::Union(_) => TypeKind::Union,
            TypeData::Intersection(_) => TypeKind::Intersection,
            TypeData::Executable { .. } => TypeKind::Executable,
            TypeData::Package(_) => TypeKind::Package,
            TypeData::Module(_) => TypeKind::Module,
        }
    }

    /// Declaration a nominal type points at.
    pub fn decl(&self) -> Option<DeclId> {
        match self {
            TypeData::Declared { decl, .. }
            | TypeData::TypeVar { decl, .. }
            | TypeData::Package(decl)
            | TypeData::Module(decl) => Some(*decl),
            TypeData::Error { decl, .. } => *decl,
            _ => None,
        }
    }
}
