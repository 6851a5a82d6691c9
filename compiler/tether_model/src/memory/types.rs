//! Type arena of the reference context.
//!
//! Slots are reserved before they are defined so attribution can build
//! cyclic types (`E extends Enum<E>`). Reading a reserved but undefined slot
//! yields an error type.

use std::cell::RefCell;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::ids::TypeId;
use crate::kind::PrimitiveKind;
use crate::stack::ensure_sufficient_stack;
use crate::ty::TypeData;

#[derive(Debug)]
pub(crate) struct TypeArena {
    slots: RefCell<Vec<Option<TypeData>>>,
    primitives: [TypeId; 8],
    void: TypeId,
    none: TypeId,
    null: TypeId,
}

impl TypeArena {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(64);
        let mut push = |data: TypeData| {
            let id = TypeId::from_len(slots.len());
            slots.push(Some(data));
            id
        };
        let primitives = PrimitiveKind::ALL.map(|p| push(TypeData::Primitive(p)));
        let void = push(TypeData::Void);
        let none = push(TypeData::NoType);
        let null = push(TypeData::Null);
        TypeArena {
            slots: RefCell::new(slots),
            primitives,
            void,
            none,
            null,
        }
    }

    pub fn primitive(&self, kind: PrimitiveKind) -> TypeId {
        let index = PrimitiveKind::ALL
            .iter()
            .position(|&p| p == kind)
            .unwrap_or(0);
        self.primitives[index]
    }

    pub fn void(&self) -> TypeId {
        self.void
    }

    pub fn none(&self) -> TypeId {
        self.none
    }

    pub fn null(&self) -> TypeId {
        self.null
    }

    pub fn reserve(&self) -> TypeId {
        let mut slots = self.slots.borrow_mut();
        let id = TypeId::from_len(slots.len());
        slots.push(None);
        id
    }

    pub fn define(&self, ty: TypeId, data: TypeData) {
        if let Some(slot) = self.slots.borrow_mut().get_mut(ty.index()) {
            *slot = Some(data);
        }
    }

    pub fn intern(&self, data: TypeData) -> TypeId {
        let ty = self.reserve();
        self.define(ty, data);
        ty
    }

    pub fn get(&self, ty: TypeId) -> TypeData {
        self.slots
            .borrow()
            .get(ty.index())
            .and_then(Clone::clone)
            .unwrap_or_else(|| TypeData::Error {
                name: Arc::from(""),
                decl: None,
            })
    }

    /// Structural identity. Pairs already under comparison are assumed equal,
    /// which makes the check terminate on cyclic types.
    pub fn is_same(&self, a: TypeId, b: TypeId) -> bool {
        let mut assumed = FxHashSet::default();
        self.same(a, b, &mut assumed)
    }

    fn same(&self, a: TypeId, b: TypeId, assumed: &mut FxHashSet<(TypeId, TypeId)>) -> bool {
        ensure_sufficient_stack(|| self.same_inner(a, b, assumed))
    }

    fn same_inner(&self, a: TypeId, b: TypeId, assumed: &mut FxHashSet<(TypeId, TypeId)>) -> bool {
        if a == b || !assumed.insert((a, b)) {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (
                TypeData::Declared {
                    decl: da,
                    args: aa,
                    enclosing: ea,
                },
                TypeData::Declared {
                    decl: db,
                    args: ab,
                    enclosing: eb,
                },
            ) => {
                da == db
                    && self.all_same(&aa, &ab, assumed)
                    && match (ea, eb) {
                        (Some(x), Some(y)) => self.same(x, y, assumed),
                        (None, None) => true,
                        _ => false,
                    }
            }
            (TypeData::Array(x), TypeData::Array(y)) => self.same(x, y, assumed),
            (TypeData::TypeVar { decl: x, .. }, TypeData::TypeVar { decl: y, .. }) => x == y,
            (
                TypeData::Wildcard {
                    extends: ea,
                    super_bound: sa,
                },
                TypeData::Wildcard {
                    extends: eb,
                    super_bound: sb,
                },
            ) => self.same_opt(ea, eb, assumed) && self.same_opt(sa, sb, assumed),
            (TypeData::Union(x), TypeData::Union(y))
            | (TypeData::Intersection(x), TypeData::Intersection(y)) => {
                self.all_same(&x, &y, assumed)
            }
            (
                TypeData::Compound {
                    supertype: sa,
                    interfaces: ia,
                },
                TypeData::Compound {
                    supertype: sb,
                    interfaces: ib,
                },
            ) => self.same(sa, sb, assumed) && self.all_same(&ia, &ib, assumed),
            // Error types are never the same as anything but themselves.
            (TypeData::Error { .. }, _) | (_, TypeData::Error { .. }) => false,
            (x, y) => x == y,
        }
    }

    fn same_opt(
        &self,
        a: Option<TypeId>,
        b: Option<TypeId>,
        assumed: &mut FxHashSet<(TypeId, TypeId)>,
    ) -> bool {
        match (a, b) {
            (Some(x), Some(y)) => self.same(x, y, assumed),
            (None, None) => true,
            _ => false,
        }
    }

    fn all_same(
        &self,
        a: &[TypeId],
        b: &[TypeId],
        assumed: &mut FxHashSet<(TypeId, TypeId)>,
    ) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| self.same(x, y, assumed))
    }
}
