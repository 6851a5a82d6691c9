//! `TypeHandle`: a type that outlives its compilation pass.
//!
//! A type is stored as a small graph of [`TypeNode`]s addressed by
//! [`TypeRef`] indices, root first. A self-referential generic such as
//! `E extends Enum<E>` is a back-reference to an earlier index, so both
//! capture and resolution terminate.
//!
//! Capture keeps a memo from context type ids to graph indices and records
//! a type's index before visiting its children; a second visit of the same
//! id reuses the index. Resolution reserves a context type for every node
//! first and defines them all afterwards, so back-references can be filled
//! in without patching.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tether_model::{
    ensure_sufficient_stack, CompilationContext, DeclId, DeclKind, PrimitiveKind, TypeData, TypeId,
    TypeKind,
};

use crate::element::ElementHandle;
use crate::error::HandleError;
use crate::intern::InternPool;

/// Index of a node in a [`TypeGraph`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct TypeRef(u32);

impl TypeRef {
    /// The type the handle was created for.
    pub const ROOT: TypeRef = TypeRef(0);

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    fn from_len(len: usize) -> Self {
        TypeRef(u32::try_from(len).unwrap_or(u32::MAX))
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One type in a [`TypeGraph`].
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeNode {
    Primitive(PrimitiveKind),
    Void,
    None,
    Null,
    /// Declared type with no type arguments and no generic enclosing type.
    Nominal(ElementHandle),
    Declared {
        element: ElementHandle,
        args: Vec<TypeRef>,
        /// The generic outer type of an inner class.
        enclosing: Option<TypeRef>,
    },
    Array(TypeRef),
    TypeVar {
        element: ElementHandle,
        lower: Option<TypeRef>,
        upper: Option<TypeRef>,
    },
    Wildcard {
        extends: Option<TypeRef>,
        super_bound: Option<TypeRef>,
    },
    /// Type that failed to resolve when the handle was made.
    Error {
        element: Option<ElementHandle>,
        name: Arc<str>,
    },
    Union(Vec<TypeRef>),
    Intersection(Vec<TypeRef>),
    /// Synthesised common supertype: the supertype, then the interfaces.
    Compound(Vec<TypeRef>),
}

impl TypeNode {
    fn element(&self) -> Option<&ElementHandle> {
        match self {
            TypeNode::Nominal(element)
            | TypeNode::Declared { element, .. }
            | TypeNode::TypeVar { element, .. } => Some(element),
            TypeNode::Error { element, .. } => element.as_ref(),
            _ => None,
        }
    }
}

/// Nodes of a captured type; [`TypeRef::ROOT`] is the type itself.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypeGraph {
    nodes: Box<[TypeNode]>,
}

impl TypeGraph {
    #[inline]
    pub fn root(&self) -> &TypeNode {
        &self.nodes[TypeRef::ROOT.index()]
    }

    #[inline]
    pub fn node(&self, at: TypeRef) -> Option<&TypeNode> {
        self.nodes.get(at.index())
    }

    #[inline]
    pub fn nodes(&self) -> &[TypeNode] {
        &self.nodes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Durable, structural reference to a type.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct TypeHandle {
    graph: Arc<TypeGraph>,
}

impl TypeHandle {
    /// Capture `ty`.
    ///
    /// Executable, package and module types have no handle.
    #[tracing::instrument(level = "debug", skip(pool, ctx))]
    pub fn create<C>(pool: &InternPool, ctx: &C, ty: TypeId) -> Result<Self, HandleError>
    where
        C: CompilationContext + ?Sized,
    {
        let mut builder = Builder {
            pool,
            ctx,
            memo: FxHashMap::default(),
            nodes: Vec::new(),
        };
        builder.visit(ty)?;
        let nodes = builder
            .nodes
            .into_iter()
            .collect::<Option<Box<[TypeNode]>>>()
            .ok_or(HandleError::IncompleteTypeGraph)?;
        Ok(TypeHandle {
            graph: pool.type_graph(TypeGraph { nodes }),
        })
    }

    /// Rebuild the type in `ctx`, or `None` if a declaration it names is
    /// gone.
    pub fn resolve<C>(&self, ctx: &C) -> Option<TypeId>
    where
        C: CompilationContext + ?Sized,
    {
        let nodes = self.graph.nodes();

        // Every declaration first, so nothing is reserved for a type that
        // cannot be finished.
        let mut decls: Vec<Option<DeclId>> = Vec::with_capacity(nodes.len());
        for node in nodes {
            let decl = match node {
                TypeNode::Error { element, .. } => element.as_ref().and_then(|e| e.resolve(ctx)),
                _ => match node.element() {
                    Some(element) => {
                        let Some(decl) = element.resolve(ctx) else {
                            tracing::debug!(%element, "type names a missing declaration");
                            return None;
                        };
                        Some(decl)
                    }
                    None => None,
                },
            };
            decls.push(decl);
        }

        let ids: Vec<TypeId> = nodes
            .iter()
            .map(|node| match node {
                TypeNode::Primitive(p) => ctx.primitive(*p),
                TypeNode::Void => ctx.void_type(),
                TypeNode::None => ctx.no_type(),
                TypeNode::Null => ctx.null_type(),
                _ => ctx.reserve(),
            })
            .collect();
        let id = |at: TypeRef| ids[at.index()];
        let ids_of = |refs: &[TypeRef]| refs.iter().map(|&r| id(r)).collect::<Vec<_>>();

        for (index, node) in nodes.iter().enumerate() {
            let decl = decls[index];
            let data = match node {
                TypeNode::Primitive(_) | TypeNode::Void | TypeNode::None | TypeNode::Null => continue,
                TypeNode::Nominal(_) => TypeData::Declared {
                    decl: decl?,
                    args: Vec::new(),
                    enclosing: None,
                },
                TypeNode::Declared { args, enclosing, .. } => TypeData::Declared {
                    decl: decl?,
                    args: ids_of(args),
                    enclosing: enclosing.map(id),
                },
                TypeNode::Array(component) => TypeData::Array(id(*component)),
                TypeNode::TypeVar { lower, upper, .. } => TypeData::TypeVar {
                    decl: decl?,
                    lower: lower.map(id),
                    upper: upper.map(id),
                },
                TypeNode::Wildcard {
                    extends,
                    super_bound,
                } => TypeData::Wildcard {
                    extends: extends.map(id),
                    super_bound: super_bound.map(id),
                },
                TypeNode::Error { name, .. } => TypeData::Error {
                    name: Arc::clone(name),
                    decl,
                },
                TypeNode::Union(alternatives) => TypeData::Union(ids_of(alternatives)),
                TypeNode::Intersection(bounds) => TypeData::Intersection(ids_of(bounds)),
                TypeNode::Compound(bounds) => {
                    let is_class = |&&bound: &&TypeRef| {
                        decls[bound.index()].is_some_and(|d| ctx.decl_kind(d) == DeclKind::Class)
                    };
                    let supertype = bounds.iter().find(is_class).or(bounds.first()).copied()?;
                    TypeData::Compound {
                        supertype: id(supertype),
                        interfaces: bounds
                            .iter()
                            .filter(|&&b| b != supertype)
                            .map(|&b| id(b))
                            .collect(),
                    }
                }
            };
            ctx.define(ids[index], data);
        }
        ids.first().copied()
    }

    /// Kind of the captured type.
    pub fn kind(&self) -> TypeKind {
        match self.graph.root() {
            TypeNode::Primitive(p) => TypeKind::Primitive(*p),
            TypeNode::Void => TypeKind::Void,
            TypeNode::None => TypeKind::None,
            TypeNode::Null => TypeKind::Null,
            TypeNode::Nominal(_) | TypeNode::Declared { .. } | TypeNode::Compound(_) => TypeKind::Declared,
            TypeNode::Array(_) => TypeKind::Array,
            TypeNode::TypeVar { .. } => TypeKind::TypeVar,
            TypeNode::Wildcard { .. } => TypeKind::Wildcard,
            TypeNode::Error { .. } => TypeKind::Error,
            TypeNode::Union(_) => TypeKind::Union,
            TypeNode::Intersection(_) => TypeKind::Intersection,
        }
    }

    /// Declaration the captured type names, for nominal types and type
    /// variables.
    pub fn element_handle(&self) -> Option<&ElementHandle> {
        self.graph.root().element()
    }

    #[inline]
    pub fn descriptor(&self) -> &TypeGraph {
        &self.graph
    }

    /// Whether both handles share one interned graph.
    #[inline]
    pub fn ptr_eq(a: &TypeHandle, b: &TypeHandle) -> bool {
        Arc::ptr_eq(&a.graph, &b.graph)
    }
}

struct Builder<'a, C: ?Sized> {
    pool: &'a InternPool,
    ctx: &'a C,
    memo: FxHashMap<TypeId, TypeRef>,
    nodes: Vec<Option<TypeNode>>,
}

impl<C> Builder<'_, C>
where
    C: CompilationContext + ?Sized,
{
    fn visit(&mut self, ty: TypeId) -> Result<TypeRef, HandleError> {
        if let Some(&seen) = self.memo.get(&ty) {
            tracing::trace!(?ty, ?seen, "type already captured");
            return Ok(seen);
        }
        let data = self.ctx.type_data(ty);
        if let kind @ (TypeKind::Executable | TypeKind::Package | TypeKind::Module) = data.kind() {
            return Err(HandleError::UnsupportedType { kind });
        }

        let slot = TypeRef::from_len(self.nodes.len());
        self.nodes.push(None);
        self.memo.insert(ty, slot);
        let node = ensure_sufficient_stack(|| self.node(data))?;
        self.nodes[slot.index()] = Some(node);
        Ok(slot)
    }

    fn visit_all(&mut self, types: &[TypeId]) -> Result<Vec<TypeRef>, HandleError> {
        types.iter().map(|&ty| self.visit(ty)).collect()
    }

    fn visit_opt(&mut self, ty: Option<TypeId>) -> Result<Option<TypeRef>, HandleError> {
        ty.map(|ty| self.visit(ty)).transpose()
    }

    fn element(&self, decl: DeclId) -> Result<ElementHandle, HandleError> {
        ElementHandle::create(self.pool, self.ctx, decl)
    }

    fn node(&mut self, data: TypeData) -> Result<TypeNode, HandleError> {
        let kind = data.kind();
        Ok(match data {
            TypeData::Primitive(p) => TypeNode::Primitive(p),
            TypeData::Void => TypeNode::Void,
            TypeData::NoType => TypeNode::None,
            TypeData::Null => TypeNode::Null,
            TypeData::Declared {
                decl,
                args,
                enclosing,
            } => {
                let element = self.element(decl)?;
                if args.is_empty() && enclosing.is_none() {
                    TypeNode::Nominal(element)
                } else {
                    TypeNode::Declared {
                        element,
                        enclosing: self.visit_opt(enclosing)?,
                        args: self.visit_all(&args)?,
                    }
                }
            }
            TypeData::Array(component) => TypeNode::Array(self.visit(component)?),
            TypeData::TypeVar { decl, lower, upper } => TypeNode::TypeVar {
                element: self.element(decl)?,
                lower: self.visit_opt(lower)?,
                upper: self.visit_opt(upper)?,
            },
            TypeData::Wildcard {
                extends,
                super_bound,
            } => TypeNode::Wildcard {
                extends: self.visit_opt(extends)?,
                super_bound: self.visit_opt(super_bound)?,
            },
            TypeData::Error { name, decl } => TypeNode::Error {
                element: decl.and_then(|d| self.element(d).ok()),
                name,
            },
            TypeData::Union(alternatives) => TypeNode::Union(self.visit_all(&alternatives)?),
            TypeData::Intersection(bounds) => TypeNode::Intersection(self.visit_all(&bounds)?),
            TypeData::Compound {
                supertype,
                interfaces,
            } => {
                let mut bounds = vec![self.visit(supertype)?];
                bounds.extend(self.visit_all(&interfaces)?);
                TypeNode::Compound(bounds)
            }
            TypeData::Executable { .. } | TypeData::Package(_) | TypeData::Module(_) => {
                return Err(HandleError::UnsupportedType { kind });
            }
        })
    }
}

/// Nesting past which `Display` elides the rest.
const MAX_DISPLAY_DEPTH: usize = 64;

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type(&self.graph, TypeRef::ROOT, f, 0)
    }
}

fn write_type(graph: &TypeGraph, at: TypeRef, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    if depth > MAX_DISPLAY_DEPTH {
        return f.write_str("...");
    }
    let Some(node) = graph.node(at) else {
        return f.write_str("?");
    };
    match node {
        TypeNode::Primitive(p) => f.write_str(p.keyword()),
        TypeNode::Void => f.write_str("void"),
        TypeNode::None => f.write_str("none"),
        TypeNode::Null => f.write_str("null"),
        TypeNode::Nominal(element) => f.write_str(&element.qualified_name()),
        TypeNode::Declared {
            element,
            args,
            enclosing,
        } => {
            match enclosing {
                Some(outer) => {
                    write_type(graph, *outer, f, depth + 1)?;
                    let binary = element.binary_name().unwrap_or_default();
                    let simple = binary.rsplit('$').next().unwrap_or(binary);
                    write!(f, ".{simple}")?;
                }
                None => f.write_str(&element.qualified_name())?,
            }
            if !args.is_empty() {
                f.write_str("<")?;
                write_list(graph, args, ", ", f, depth)?;
                f.write_str(">")?;
            }
            Ok(())
        }
        TypeNode::Array(component) => {
            write_type(graph, *component, f, depth + 1)?;
            f.write_str("[]")
        }
        TypeNode::TypeVar { element, .. } => {
            let name = element.signature().parts().last().map_or("", |part| &**part);
            f.write_str(name)
        }
        TypeNode::Wildcard {
            extends,
            super_bound,
        } => {
            f.write_str("?")?;
            if let Some(bound) = extends {
                f.write_str(" extends ")?;
                write_type(graph, *bound, f, depth + 1)?;
            }
            if let Some(bound) = super_bound {
                f.write_str(" super ")?;
                write_type(graph, *bound, f, depth + 1)?;
            }
            Ok(())
        }
        TypeNode::Error { name, .. } => f.write_str(name),
        TypeNode::Union(alternatives) => write_list(graph, alternatives, " | ", f, depth),
        TypeNode::Intersection(bounds) | TypeNode::Compound(bounds) => write_list(graph, bounds, " & ", f, depth),
    }
}

fn write_list(
    graph: &TypeGraph,
    refs: &[TypeRef],
    sep: &str,
    f: &mut fmt::Formatter<'_>,
    depth: usize,
) -> fmt::Result {
    for (i, &r) in refs.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write_type(graph, r, f, depth + 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests;
