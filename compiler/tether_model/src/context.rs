//! The compilation-context surface consumed by handles.
//!
//! A context is one analysis pass: it owns live declarations, syntax trees
//! and types, and hands out run-scoped ids for them. The traits are split
//! along the services a front end naturally exposes; `CompilationContext`
//! is the umbrella every handle operation is written against.
//!
//! Contexts are confined to one logical task. Implementations are expected
//! to be `!Sync` (the reference context in [`crate::memory`] is neither
//! `Send` nor `Sync`), so a `&Context` cannot leak to another thread.

use std::sync::Arc;

use crate::ids::{DeclId, DocId, NodeId, Span, TypeId};
use crate::kind::{DeclKind, DocKind, NodeKind, PrimitiveKind, TypeKind};
use crate::ty::TypeData;

/// Name space searched by [`Symbols::lookup`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Namespace {
    Package,
    Module,
    /// Types by binary name (`pkg.Outer$Inner`).
    Type,
}

/// Declarations that exist in every context without a source.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Pseudo {
    /// Owner of the members every array type has (`length`, `clone()`).
    ArrayClass,
    /// The "no symbol" sentinel.
    NoSymbol,
}

/// Symbol table of a context.
pub trait Symbols {
    /// Resolve a declaration by its encoded name.
    fn lookup(&self, namespace: Namespace, encoded: &str) -> Option<DeclId>;

    fn pseudo_declaration(&self, pseudo: Pseudo) -> DeclId;

    fn decl_kind(&self, decl: DeclId) -> DeclKind;

    fn simple_name(&self, decl: DeclId) -> Arc<str>;

    /// Enclosing element: the package of a top-level type, the type of a
    /// member, the method or type owning a type parameter.
    fn enclosing(&self, decl: DeclId) -> Option<DeclId>;

    /// Binary name of a type declaration; `None` for everything else.
    fn binary_name(&self, decl: DeclId) -> Option<Arc<str>>;

    /// Fully qualified name of a package, module or type (`pkg.Outer.Inner`),
    /// the simple name of anything else.
    fn qualified_name(&self, decl: DeclId) -> Arc<str>;

    /// Members in declaration order.
    ///
    /// `None` when the type is only known as a binary stub with no
    /// attributed member list.
    fn members(&self, decl: DeclId) -> Option<Vec<DeclId>>;

    fn type_parameters(&self, decl: DeclId) -> Vec<DeclId>;

    /// The type a declaration introduces: the class type of a type, the
    /// variable type of a field, the executable type of a method, the type
    /// variable of a type parameter.
    fn type_of(&self, decl: DeclId) -> TypeId;

    /// Create (or reuse) a placeholder member of a binary stub.
    fn synthesize_member(
        &self,
        owner: DeclId,
        kind: DeclKind,
        name: &str,
        descriptor: &str,
    ) -> DeclId;

    /// Descriptor recorded on a synthesised placeholder member.
    fn recorded_descriptor(&self, decl: DeclId) -> Option<Arc<str>>;
}

/// Syntax trees of a context.
pub trait Trees {
    /// Root of the compilation unit for a source file.
    fn compilation_unit(&self, file: &str) -> Option<NodeId>;

    /// Source file a node belongs to.
    fn file_of(&self, node: NodeId) -> Arc<str>;

    fn node_kind(&self, node: NodeId) -> NodeKind;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Source range, `None` for synthetic nodes.
    fn span(&self, node: NodeId) -> Option<Span>;

    /// Innermost positioned node under `unit` covering `offset`.
    fn node_at(&self, unit: NodeId, offset: u32) -> Option<NodeId>;

    /// Declaration introduced by a declaration node.
    fn declared_by(&self, node: NodeId) -> Option<DeclId>;

    /// Declaration introduced or referenced by a node.
    fn element_of(&self, node: NodeId) -> Option<DeclId>;

    /// Declaration node of a declaration, when it has source in this context.
    fn tree_of(&self, decl: DeclId) -> Option<NodeId>;
}

/// Parsed documentation comments.
pub trait DocTrees {
    /// Comment attached to a declaration node.
    fn doc_comment(&self, node: NodeId) -> Option<DocId>;

    /// Declaration node the comment containing `doc` is attached to.
    fn doc_owner(&self, doc: DocId) -> NodeId;

    fn doc_kind(&self, doc: DocId) -> DocKind;

    fn doc_parent(&self, doc: DocId) -> Option<DocId>;

    fn doc_children(&self, doc: DocId) -> Vec<DocId>;

    fn doc_span(&self, doc: DocId) -> Span;

    /// Innermost doc node under `root` covering `offset`.
    fn doc_node_at(&self, root: DocId, offset: u32) -> Option<DocId>;
}

/// Type factory and type queries.
///
/// Types are built in two steps so cyclic structures can be expressed:
/// [`TypeOps::reserve`] hands out an id, [`TypeOps::define`] fills it in.
pub trait TypeOps {
    fn type_data(&self, ty: TypeId) -> TypeData;

    fn type_kind(&self, ty: TypeId) -> TypeKind {
        self.type_data(ty).kind()
    }

    fn primitive(&self, kind: PrimitiveKind) -> TypeId;

    fn void_type(&self) -> TypeId;

    fn no_type(&self) -> TypeId;

    fn null_type(&self) -> TypeId;

    fn reserve(&self) -> TypeId;

    fn define(&self, ty: TypeId, data: TypeData);

    fn intern(&self, data: TypeData) -> TypeId {
        let ty = self.reserve();
        self.define(ty, data);
        ty
    }

    /// Structural type identity, tolerant of cycles.
    fn is_same_type(&self, a: TypeId, b: TypeId) -> bool;
}

/// Whether a registered callback ran right away or was deferred.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Registration {
    Deferred,
    RanImmediately,
}

/// Coupling point with the background indexer.
pub trait IndexStatus {
    fn is_background_index_in_progress(&self) -> bool;

    /// Run `task` once the background index has finished.
    ///
    /// The callback runs exactly once, on whatever thread delivers the
    /// completion notification. When no indexing is in progress it runs
    /// immediately on the calling thread.
    fn run_when_index_finished(&self, task: Box<dyn FnOnce() + Send>) -> Registration;
}

/// Everything a handle needs from one analysis pass.
pub trait CompilationContext: Symbols + Trees + DocTrees + TypeOps + IndexStatus {}

impl<T> CompilationContext for T where T: Symbols + Trees + DocTrees + TypeOps + IndexStatus + ?Sized {}
