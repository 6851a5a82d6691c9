//! `MemoryContext`: one attributed snapshot of a workspace.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::attrib::{attribute, SourceUnit};
use super::lexer::lex;
use super::library::LIBRARY;
use super::parser::{ParseError, Parser};
use super::symbols::{DeclData, SymbolTable};
use super::syntax::{DocArena, SyntaxArena};
use super::types::TypeArena;
use super::workspace::{BinaryStub, IndexMonitor};
use crate::context::{
    DocTrees, IndexStatus, Namespace, Pseudo, Registration, Symbols, Trees, TypeOps,
};
use crate::ids::{DeclId, DocId, NodeId, Span, TypeId};
use crate::kind::{DeclKind, DocKind, NodeKind, PrimitiveKind};
use crate::ty::TypeData;

/// In-memory compilation context.
///
/// Not `Send` and not `Sync`: a context belongs to the task that opened it.
pub struct MemoryContext {
    syntax: SyntaxArena,
    docs: DocArena,
    types: TypeArena,
    symbols: RefCell<SymbolTable>,
    declared: FxHashMap<NodeId, DeclId>,
    referenced: FxHashMap<NodeId, DeclId>,
    units: FxHashMap<Arc<str>, NodeId>,
    sources: FxHashMap<Arc<str>, Arc<str>>,
    array_class: DeclId,
    no_symbol: DeclId,
    diagnostics: Vec<ParseError>,
    monitor: Arc<IndexMonitor>,
    generation: u64,
    _confined: PhantomData<Rc<()>>,
}

impl MemoryContext {
    pub(crate) fn build(
        files: &[(Arc<str>, Arc<str>)],
        stubs: &[BinaryStub],
        modules: &[Arc<str>],
        monitor: Arc<IndexMonitor>,
        generation: u64,
    ) -> Self {
        let mut syntax = SyntaxArena::default();
        let mut docs = DocArena::default();
        let types = TypeArena::new();
        let mut sources = Vec::with_capacity(LIBRARY.len() + files.len());
        let mut units = FxHashMap::default();
        let mut texts = FxHashMap::default();
        let mut diagnostics = Vec::new();

        for &(path, text) in LIBRARY {
            let (root, errors) = parse(&mut syntax, &mut docs, Arc::from(path), text);
            debug_assert!(errors.is_empty(), "library source {path} failed to parse");
            sources.push(SourceUnit {
                root,
                library: true,
            });
        }
        for (path, text) in files {
            let (root, errors) = parse(&mut syntax, &mut docs, Arc::clone(path), text);
            diagnostics.extend(errors);
            units.insert(Arc::clone(path), root);
            texts.insert(Arc::clone(path), Arc::clone(text));
            sources.push(SourceUnit {
                root,
                library: false,
            });
        }

        let attributed = attribute(&mut syntax, &types, &sources, stubs, modules);
        tracing::debug!(
            files = files.len(),
            diagnostics = diagnostics.len(),
            generation,
            "context built"
        );

        MemoryContext {
            syntax,
            docs,
            types,
            symbols: RefCell::new(attributed.symbols),
            declared: attributed.declared,
            referenced: attributed.referenced,
            units,
            sources: texts,
            array_class: attributed.array_class,
            no_symbol: attributed.no_symbol,
            diagnostics,
            monitor,
            generation,
            _confined: PhantomData,
        }
    }

    /// Context over `files` with its own idle index monitor.
    pub fn from_sources(files: &[(&str, &str)]) -> Self {
        let files: Vec<(Arc<str>, Arc<str>)> = files
            .iter()
            .map(|&(path, text)| (Arc::from(path), Arc::from(text)))
            .collect();
        MemoryContext::build(&files, &[], &[], Arc::new(IndexMonitor::new()), 0)
    }

    /// Workspace generation the context was built from.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn diagnostics(&self) -> &[ParseError] {
        &self.diagnostics
    }

    pub fn source(&self, file: &str) -> Option<&str> {
        self.sources.get(file).map(|text| &**text)
    }

    pub fn find_type(&self, binary_name: &str) -> Option<DeclId> {
        self.symbols.borrow().type_by_binary_name(binary_name)
    }

    /// First member of `owner` named `name`.
    pub fn find_member(&self, owner: DeclId, name: &str) -> Option<DeclId> {
        self.symbols.borrow().member_named(owner, name, |_| true)
    }

    /// Innermost node of `kind` around the first occurrence of `needle` in
    /// `file`.
    pub fn find_node(&self, file: &str, needle: &str, kind: NodeKind) -> Option<NodeId> {
        let offset = self.source(file)?.find(needle)?;
        let unit = self.compilation_unit(file)?;
        let mut node = self.syntax.node_at(unit, u32::try_from(offset).ok()?);
        while let Some(current) = node {
            if self.syntax.get(current).kind == kind {
                return Some(current);
            }
            node = self.syntax.get(current).parent;
        }
        None
    }

    /// Text of a name or literal node.
    pub fn node_text(&self, node: NodeId) -> Option<Arc<str>> {
        self.syntax.text(node).cloned()
    }

    fn with_decl<R>(&self, decl: DeclId, f: impl FnOnce(&DeclData) -> R) -> R {
        f(self.symbols.borrow().get(decl))
    }

    fn nominal_type(&self, binary: &str) -> TypeId {
        match self.find_type(binary) {
            Some(decl) => self.with_decl(decl, |data| {
                if data.type_params.is_empty() {
                    data.ty
                } else {
                    self.types.intern(TypeData::Declared {
                        decl,
                        args: Vec::new(),
                        enclosing: None,
                    })
                }
            }),
            None => self.types.intern(TypeData::Error {
                name: Arc::from(binary),
                decl: None,
            }),
        }
    }

    /// Type a placeholder member of `kind` with `descriptor` would have.
    fn type_from_descriptor(&self, kind: DeclKind, descriptor: &str) -> TypeId {
        let mut reader = DescriptorReader {
            bytes: descriptor.as_bytes(),
            pos: 0,
            context: self,
        };
        let parsed = if kind.is_executable() {
            reader.executable()
        } else if kind.is_field() {
            reader.field()
        } else {
            None
        };
        parsed.unwrap_or_else(|| self.types.none())
    }
}

fn parse(
    syntax: &mut SyntaxArena,
    docs: &mut DocArena,
    path: Arc<str>,
    text: &str,
) -> (NodeId, Vec<ParseError>) {
    let tokens = lex(text);
    Parser::new(text, path, &tokens, syntax, docs).parse_unit()
}

/// Reader for JVM-style descriptors (`(ILjava/lang/String;)V`).
struct DescriptorReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    context: &'a MemoryContext,
}

impl DescriptorReader<'_> {
    fn executable(&mut self) -> Option<TypeId> {
        if self.bytes.get(self.pos) != Some(&b'(') {
            return None;
        }
        self.pos += 1;
        let mut params = Vec::new();
        while self.bytes.get(self.pos) != Some(&b')') {
            params.push(self.field()?);
        }
        self.pos += 1;
        let ret = if self.bytes.get(self.pos) == Some(&b'V') {
            self.pos += 1;
            self.context.types.void()
        } else {
            self.field()?
        };
        Some(self.context.types.intern(TypeData::Executable {
            type_params: Vec::new(),
            params,
            ret,
            thrown: Vec::new(),
        }))
    }

    fn field(&mut self) -> Option<TypeId> {
        let b = *self.bytes.get(self.pos)?;
        self.pos += 1;
        if let Some(primitive) = PrimitiveKind::ALL
            .into_iter()
            .find(|p| p.descriptor() as u32 == u32::from(b))
        {
            return Some(self.context.types.primitive(primitive));
        }
        match b {
            b'[' => {
                let component = self.field()?;
                Some(self.context.types.intern(TypeData::Array(component)))
            }
            b'L' => {
                let rest = &self.bytes[self.pos..];
                let end = rest.iter().position(|&c| c == b';')?;
                let internal = std::str::from_utf8(&rest[..end]).ok()?;
                self.pos += end + 1;
                Some(self.context.nominal_type(&internal.replace('/', ".")))
            }
            _ => None,
        }
    }
}

impl Symbols for MemoryContext {
    fn lookup(&self, namespace: Namespace, encoded: &str) -> Option<DeclId> {
        let symbols = self.symbols.borrow();
        match namespace {
            Namespace::Package => symbols.package(encoded),
            Namespace::Module => symbols.module(encoded),
            Namespace::Type => symbols.type_by_binary_name(encoded),
        }
    }

    fn pseudo_declaration(&self, pseudo: Pseudo) -> DeclId {
        match pseudo {
            Pseudo::ArrayClass => self.array_class,
            Pseudo::NoSymbol => self.no_symbol,
        }
    }

    fn decl_kind(&self, decl: DeclId) -> DeclKind {
        self.with_decl(decl, |data| data.kind)
    }

    fn simple_name(&self, decl: DeclId) -> Arc<str> {
        self.with_decl(decl, |data| Arc::clone(&data.name))
    }

    fn enclosing(&self, decl: DeclId) -> Option<DeclId> {
        self.with_decl(decl, |data| data.owner)
    }

    fn binary_name(&self, decl: DeclId) -> Option<Arc<str>> {
        self.with_decl(decl, |data| data.binary_name.clone())
    }

    fn qualified_name(&self, decl: DeclId) -> Arc<str> {
        self.with_decl(decl, |data| Arc::clone(&data.qualified))
    }

    fn members(&self, decl: DeclId) -> Option<Vec<DeclId>> {
        self.with_decl(decl, |data| data.members.clone())
    }

    fn type_parameters(&self, decl: DeclId) -> Vec<DeclId> {
        self.with_decl(decl, |data| data.type_params.clone())
    }

    fn type_of(&self, decl: DeclId) -> TypeId {
        self.with_decl(decl, |data| data.ty)
    }

    fn synthesize_member(
        &self,
        owner: DeclId,
        kind: DeclKind,
        name: &str,
        descriptor: &str,
    ) -> DeclId {
        let key = (owner, kind, Arc::from(name), Arc::from(descriptor));
        if let Some(existing) = self.symbols.borrow().synthesized(&key) {
            tracing::trace!(?existing, name, descriptor, "reusing placeholder member");
            return existing;
        }

        let ty = self.type_from_descriptor(kind, descriptor);
        let mut data = DeclData::new(kind, Arc::clone(&key.2), Some(owner), ty);
        data.descriptor = Some(Arc::clone(&key.3));
        data.library = true;
        let mut symbols = self.symbols.borrow_mut();
        let decl = symbols.alloc(data);
        symbols.remember_synthesized(key, decl);
        tracing::debug!(?decl, %kind, name, descriptor, "synthesised placeholder member");
        decl
    }

    fn recorded_descriptor(&self, decl: DeclId) -> Option<Arc<str>> {
        self.with_decl(decl, |data| data.descriptor.clone())
    }
}

impl Trees for MemoryContext {
    fn compilation_unit(&self, file: &str) -> Option<NodeId> {
        self.units.get(file).copied()
    }

    fn file_of(&self, node: NodeId) -> Arc<str> {
        let mut current = node;
        while let Some(parent) = self.syntax.get(current).parent {
            current = parent;
        }
        self.syntax
            .text(current)
            .cloned()
            .unwrap_or_else(|| Arc::from(""))
    }

    fn node_kind(&self, node: NodeId) -> NodeKind {
        self.syntax.get(node).kind
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.syntax.get(node).parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.syntax.get(node).children.to_vec()
    }

    fn span(&self, node: NodeId) -> Option<Span> {
        self.syntax.get(node).span
    }

    fn node_at(&self, unit: NodeId, offset: u32) -> Option<NodeId> {
        self.syntax.node_at(unit, offset)
    }

    fn declared_by(&self, node: NodeId) -> Option<DeclId> {
        self.declared.get(&node).copied()
    }

    fn element_of(&self, node: NodeId) -> Option<DeclId> {
        self.declared
            .get(&node)
            .or_else(|| self.referenced.get(&node))
            .copied()
    }

    fn tree_of(&self, decl: DeclId) -> Option<NodeId> {
        self.with_decl(decl, |data| if data.library { None } else { data.node })
    }
}

impl DocTrees for MemoryContext {
    fn doc_comment(&self, node: NodeId) -> Option<DocId> {
        self.syntax.get(node).doc
    }

    fn doc_owner(&self, doc: DocId) -> NodeId {
        self.docs.get(doc).owner
    }

    fn doc_kind(&self, doc: DocId) -> DocKind {
        self.docs.get(doc).kind
    }

    fn doc_parent(&self, doc: DocId) -> Option<DocId> {
        self.docs.get(doc).parent
    }

    fn doc_children(&self, doc: DocId) -> Vec<DocId> {
        self.docs.get(doc).children.to_vec()
    }

    fn doc_span(&self, doc: DocId) -> Span {
        self.docs.get(doc).span
    }

    fn doc_node_at(&self, root: DocId, offset: u32) -> Option<DocId> {
        self.docs.node_at(root, offset)
    }
}

impl TypeOps for MemoryContext {
    fn type_data(&self, ty: TypeId) -> TypeData {
        self.types.get(ty)
    }

    fn primitive(&self, kind: PrimitiveKind) -> TypeId {
        self.types.primitive(kind)
    }

    fn void_type(&self) -> TypeId {
        self.types.void()
    }

    fn no_type(&self) -> TypeId {
        self.types.none()
    }

    fn null_type(&self) -> TypeId {
        self.types.null()
    }

    fn reserve(&self) -> TypeId {
        self.types.reserve()
    }

    fn define(&self, ty: TypeId, data: TypeData) {
        self.types.define(ty, data);
    }

    fn is_same_type(&self, a: TypeId, b: TypeId) -> bool {
        self.types.is_same(a, b)
    }
}

impl IndexStatus for MemoryContext {
    fn is_background_index_in_progress(&self) -> bool {
        self.monitor.is_indexing()
    }

    fn run_when_index_finished(&self, task: Box<dyn FnOnce() + Send>) -> Registration {
        self.monitor.run_when_finished(task)
    }
}

impl std::fmt::Debug for MemoryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryContext")
            .field("generation", &self.generation)
            .field("files", &self.units.len())
            .field("declarations", &self.symbols.borrow().len())
            .finish_non_exhaustive()
    }
}
