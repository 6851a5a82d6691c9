//! Attribution: enters declarations and resolves names.
//!
//! Runs in phases over every unit so forward references work:
//!
//! 1. **Enter**: packages, types (with binary names), type parameters.
//!    Type ids are reserved here and defined later.
//! 2. **Imports**: single-type imports are resolved once every type exists.
//! 3. **Header**: type-parameter bounds, supertypes, the class type itself.
//! 4. **Members**: fields, methods, initializers, the implicit constructor.
//! 5. **Bodies**: locals, local and anonymous classes, name references.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use super::symbols::{DeclData, SymbolTable};
use super::syntax::{NodeFlags, SyntaxArena};
use super::types::TypeArena;
use super::workspace::BinaryStub;
use crate::ids::{DeclId, NodeId, TypeId};
use crate::kind::{DeclKind, NodeKind, PrimitiveKind};
use crate::stack::ensure_sufficient_stack;
use crate::ty::TypeData;

const ACCESS: NodeFlags = NodeFlags::PUBLIC
    .union(NodeFlags::PROTECTED)
    .union(NodeFlags::PRIVATE);

pub(crate) struct SourceUnit {
    pub root: NodeId,
    pub library: bool,
}

/// Output of attribution.
pub(crate) struct Attributed {
    pub symbols: SymbolTable,
    /// Declaration node -> declaration.
    pub declared: FxHashMap<NodeId, DeclId>,
    /// Reference node -> referenced declaration.
    pub referenced: FxHashMap<NodeId, DeclId>,
    pub array_class: DeclId,
    pub no_symbol: DeclId,
}

pub(crate) fn attribute(
    syntax: &mut SyntaxArena,
    types: &TypeArena,
    sources: &[SourceUnit],
    stubs: &[BinaryStub],
    modules: &[Arc<str>],
) -> Attributed {
    let mut attrib = Attrib::new(syntax, types);
    let mut classes = Vec::new();
    let mut imports = Vec::new();

    for (unit, source) in sources.iter().enumerate() {
        attrib.enter_unit(unit, source, &mut classes, &mut imports);
    }
    for stub in stubs {
        attrib.enter_stub(stub);
    }
    for module in modules {
        attrib.enter_module(module);
    }
    attrib.enter_array_members();

    for (unit, import) in imports {
        attrib.resolve_import(unit, import);
    }
    for &(decl, unit) in &classes {
        attrib.header(decl, unit);
    }
    for &(decl, unit) in &classes {
        attrib.members(decl, unit);
    }
    while let Some(body) = attrib.bodies.pop_front() {
        attrib.body(body);
    }

    tracing::debug!(
        declarations = attrib.symbols.len(),
        classes = classes.len(),
        "attribution finished"
    );
    attrib.finish()
}

#[derive(Debug)]
struct UnitScope {
    prefix: Arc<str>,
    library: bool,
    single: FxHashMap<Arc<str>, DeclId>,
    on_demand: Vec<Arc<str>>,
}

#[derive(Clone, Debug)]
struct Scope {
    unit: usize,
    /// Enclosing classes, innermost first.
    classes: SmallVec<[DeclId; 4]>,
    /// Type variables in scope, innermost first.
    type_vars: Vec<DeclId>,
}

/// What a name in expression position denotes.
#[derive(Clone, Debug)]
enum Target {
    Value(TypeId),
    Type(DeclId),
    Package(Arc<str>),
}

/// Deferred attribution of code owned by `owner`.
struct Body {
    owner: DeclId,
    nodes: SmallVec<[NodeId; 4]>,
    scope: Scope,
    params: Vec<DeclId>,
}

type Locals = Vec<(Arc<str>, DeclId)>;

struct Attrib<'a> {
    syntax: &'a mut SyntaxArena,
    types: &'a TypeArena,
    symbols: SymbolTable,
    declared: FxHashMap<NodeId, DeclId>,
    referenced: FxHashMap<NodeId, DeclId>,
    units: Vec<UnitScope>,
    supertypes: FxHashMap<DeclId, Vec<DeclId>>,
    bodies: VecDeque<Body>,
    /// Per top-level class counter for local and anonymous class names.
    local_counters: FxHashMap<DeclId, u32>,
    array_class: DeclId,
    no_symbol: DeclId,
}

impl<'a> Attrib<'a> {
    fn new(syntax: &'a mut SyntaxArena, types: &'a TypeArena) -> Self {
        let mut symbols = SymbolTable::default();

        let array_ty = types.reserve();
        let mut array = DeclData::new(DeclKind::Class, Arc::from("Array"), None, array_ty);
        array.library = true;
        array.flags = NodeFlags::PUBLIC | NodeFlags::FINAL;
        let array_class = symbols.alloc(array);
        types.define(
            array_ty,
            TypeData::Declared {
                decl: array_class,
                args: Vec::new(),
                enclosing: None,
            },
        );

        let mut none = DeclData::new(DeclKind::Other, Arc::from(""), None, types.none());
        none.library = true;
        none.members = None;
        let no_symbol = symbols.alloc(none);

        Attrib {
            syntax,
            types,
            symbols,
            declared: FxHashMap::default(),
            referenced: FxHashMap::default(),
            units: Vec::new(),
            supertypes: FxHashMap::default(),
            bodies: VecDeque::new(),
            local_counters: FxHashMap::default(),
            array_class,
            no_symbol,
        }
    }

    fn finish(self) -> Attributed {
        Attributed {
            symbols: self.symbols,
            declared: self.declared,
            referenced: self.referenced,
            array_class: self.array_class,
            no_symbol: self.no_symbol,
        }
    }

    // ===== Helpers =====

    fn text(&self, node: NodeId) -> Arc<str> {
        self.syntax
            .text(node)
            .cloned()
            .unwrap_or_else(|| Arc::from(""))
    }

    fn children(&self, node: NodeId) -> SmallVec<[NodeId; 4]> {
        self.syntax.get(node).children.clone()
    }

    /// `a.b.c` for an identifier or select chain.
    fn qualified_text(&self, node: NodeId) -> String {
        ensure_sufficient_stack(|| self.qualified_text_inner(node))
    }

    fn qualified_text_inner(&self, node: NodeId) -> String {
        let n = self.syntax.get(node);
        let name = n.text.as_deref().unwrap_or("");
        match (n.kind, n.children.first()) {
            (NodeKind::MemberSelect, Some(&qualifier)) => {
                format!("{}.{}", self.qualified_text(qualifier), name)
            }
            _ => name.to_string(),
        }
    }

    fn error_type(&self, name: &str) -> TypeId {
        self.types.intern(TypeData::Error {
            name: Arc::from(name),
            decl: None,
        })
    }

    fn java_lang(&self, name: &str) -> Option<DeclId> {
        self.symbols
            .type_by_binary_name(&format!("java.lang.{name}"))
    }

    fn object_type(&self) -> TypeId {
        self.java_lang("Object")
            .map_or_else(|| self.types.none(), |d| self.symbols.get(d).ty)
    }

    fn string_type(&self) -> Option<TypeId> {
        self.java_lang("String").map(|d| self.symbols.get(d).ty)
    }

    /// Type denoted by a bare reference to `decl`: the type variable of a
    /// type parameter, the raw type of a generic class.
    fn nominal(&self, decl: DeclId) -> TypeId {
        let data = self.symbols.get(decl);
        if data.kind == DeclKind::TypeParameter || data.type_params.is_empty() {
            data.ty
        } else {
            self.types.intern(TypeData::Declared {
                decl,
                args: Vec::new(),
                enclosing: None,
            })
        }
    }

    /// Declaration whose members a value of type `ty` exposes.
    fn decl_of_value(&self, ty: TypeId, depth: u8) -> Option<DeclId> {
        if depth > 8 {
            return None;
        }
        match self.types.get(ty) {
            TypeData::Declared { decl, .. } => Some(decl),
            TypeData::Array(_) => Some(self.array_class),
            TypeData::TypeVar { upper, .. } => self.decl_of_value(upper?, depth + 1),
            TypeData::Intersection(parts) => self.decl_of_value(*parts.first()?, depth + 1),
            _ => None,
        }
    }

    /// `owner` followed by all its supertypes, without repeats.
    fn hierarchy(&self, owner: DeclId) -> Vec<DeclId> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut stack = vec![owner];
        while let Some(decl) = stack.pop() {
            if !seen.insert(decl) {
                continue;
            }
            order.push(decl);
            if let Some(supers) = self.supertypes.get(&decl) {
                stack.extend(supers.iter().rev().copied());
            }
        }
        order
    }

    fn find_member_type(&self, owner: DeclId, name: &str) -> Option<DeclId> {
        self.hierarchy(owner)
            .into_iter()
            .find_map(|class| self.symbols.member_type(class, name))
    }

    fn find_field(&self, owner: DeclId, name: &str) -> Option<DeclId> {
        self.hierarchy(owner)
            .into_iter()
            .find_map(|class| self.symbols.member_named(class, name, DeclKind::is_field))
    }

    /// Method by name, preferring one with a matching parameter count.
    fn find_method(&self, owner: DeclId, name: &str, arity: usize) -> Option<DeclId> {
        let classes = if name == "<init>" {
            vec![owner]
        } else {
            self.hierarchy(owner)
        };
        let candidates: Vec<DeclId> = classes
            .iter()
            .filter_map(|&class| self.symbols.get(class).members.as_ref())
            .flatten()
            .copied()
            .filter(|&m| {
                let data = self.symbols.get(m);
                data.kind.is_executable() && &*data.name == name
            })
            .collect();
        candidates
            .iter()
            .copied()
            .find(|&m| self.arity(m) == Some(arity))
            .or_else(|| candidates.first().copied())
    }

    fn arity(&self, method: DeclId) -> Option<usize> {
        match self.types.get(self.symbols.get(method).ty) {
            TypeData::Executable { params, .. } => Some(params.len()),
            _ => None,
        }
    }

    fn return_type(&self, method: DeclId) -> Option<TypeId> {
        match self.types.get(self.symbols.get(method).ty) {
            TypeData::Executable { ret, .. } => Some(ret),
            _ => None,
        }
    }

    /// Type by dotted name, trying the longest package prefix first.
    fn type_by_qualified(&self, text: &str) -> Option<DeclId> {
        let parts: Vec<&str> = text.split('.').collect();
        (0..parts.len()).rev().find_map(|split| {
            let package = parts[..split].join(".");
            let nested = parts[split..].join("$");
            let binary = if package.is_empty() {
                nested
            } else {
                format!("{package}.{nested}")
            };
            self.symbols.type_by_binary_name(&binary)
        })
    }

    fn scope_for(&self, decl: DeclId, unit: usize) -> Scope {
        let mut scope = Scope {
            unit,
            classes: SmallVec::new(),
            type_vars: Vec::new(),
        };
        let mut current = Some(decl);
        while let Some(d) = current {
            let data = self.symbols.get(d);
            if data.kind.is_type() {
                scope.classes.push(d);
            } else if !(data.kind.is_executable()
                || data.kind.is_initializer()
                || data.kind.is_field())
            {
                break;
            }
            scope.type_vars.extend(data.type_params.iter().copied());
            current = data.owner;
        }
        scope
    }

    // ===== Enter =====

    fn package(&mut self, name: &str) -> DeclId {
        if let Some(package) = self.symbols.package(name) {
            return package;
        }
        let simple = name.rsplit('.').next().unwrap_or(name);
        let ty = self.types.reserve();
        let mut data = DeclData::new(DeclKind::Package, Arc::from(simple), None, ty);
        data.qualified = Arc::from(name);
        let decl = self.symbols.alloc(data);
        self.types.define(ty, TypeData::Package(decl));
        self.symbols.register_package(Arc::from(name), decl);
        decl
    }

    fn enter_unit(
        &mut self,
        unit: usize,
        source: &SourceUnit,
        classes: &mut Vec<(DeclId, usize)>,
        imports: &mut Vec<(usize, NodeId)>,
    ) {
        let children = self.children(source.root);
        let package_name = children
            .iter()
            .find(|&&c| self.syntax.get(c).kind == NodeKind::Package)
            .and_then(|&c| self.syntax.get(c).children.first().copied());
        let prefix: Arc<str> = match package_name {
            Some(name) => Arc::from(self.qualified_text(name)),
            None => Arc::from(""),
        };
        let package = self.package(&prefix);
        if let Some(name) = package_name {
            self.referenced.insert(name, package);
        }
        debug_assert_eq!(self.units.len(), unit);
        self.units.push(UnitScope {
            prefix: Arc::clone(&prefix),
            library: source.library,
            single: FxHashMap::default(),
            on_demand: Vec::new(),
        });

        for &child in &children {
            let kind = self.syntax.get(child).kind;
            if kind == NodeKind::Import {
                imports.push((unit, child));
            } else if kind.is_type_declaration() {
                let name = self.text(child);
                let binary: Arc<str> = if prefix.is_empty() {
                    name
                } else {
                    Arc::from(format!("{prefix}.{name}"))
                };
                self.enter_type(child, package, binary, unit, classes);
            }
        }
    }

    fn enter_type(
        &mut self,
        node: NodeId,
        owner: DeclId,
        binary: Arc<str>,
        unit: usize,
        classes: &mut Vec<(DeclId, usize)>,
    ) -> DeclId {
        ensure_sufficient_stack(|| self.enter_type_inner(node, owner, binary, unit, classes))
    }

    fn enter_type_inner(
        &mut self,
        node: NodeId,
        owner: DeclId,
        binary: Arc<str>,
        unit: usize,
        classes: &mut Vec<(DeclId, usize)>,
    ) -> DeclId {
        let (kind, flags) = {
            let n = self.syntax.get(node);
            (decl_kind_of(n.kind), n.flags & NodeFlags::MODIFIERS)
        };
        let name = self.text(node);
        let owner_data = self.symbols.get(owner);
        let qualified: Arc<str> = match owner_data.kind {
            DeclKind::Package if owner_data.qualified.is_empty() => Arc::clone(&name),
            DeclKind::Package => Arc::from(format!("{}.{name}", owner_data.qualified)),
            k if k.is_type() && !owner_data.qualified.is_empty() && !name.is_empty() => {
                Arc::from(format!("{}.{name}", owner_data.qualified))
            }
            _ => Arc::clone(&name),
        };
        let owner_lists_members = owner_data.kind == DeclKind::Package || owner_data.kind.is_type();

        let ty = self.types.reserve();
        let mut data = DeclData::new(kind, Arc::clone(&name), Some(owner), ty);
        data.binary_name = Some(Arc::clone(&binary));
        data.qualified = qualified;
        data.node = Some(node);
        data.library = self.units[unit].library;
        data.flags = flags;
        let decl = self.symbols.alloc(data);
        if !self.symbols.register_type(Arc::clone(&binary), decl) {
            tracing::debug!(%binary, "duplicate type declaration ignored for lookup");
        }
        self.declared.insert(node, decl);
        if owner_lists_members {
            if let Some(members) = self.symbols.get_mut(owner).members.as_mut() {
                members.push(decl);
            }
        }
        classes.push((decl, unit));

        let children = self.children(node);
        let type_params: Vec<DeclId> = children
            .iter()
            .filter(|&&c| self.syntax.get(c).kind == NodeKind::TypeParameter)
            .copied()
            .collect::<Vec<_>>()
            .into_iter()
            .map(|c| self.enter_type_parameter(c, decl))
            .collect();
        self.symbols.get_mut(decl).type_params = type_params;

        for &child in &children {
            if self.syntax.get(child).kind.is_type_declaration() {
                let nested = format!("{binary}${}", self.text(child));
                self.enter_type(child, decl, Arc::from(nested), unit, classes);
            }
        }
        decl
    }

    fn enter_type_parameter(&mut self, node: NodeId, owner: DeclId) -> DeclId {
        let ty = self.types.reserve();
        let mut data = DeclData::new(DeclKind::TypeParameter, self.text(node), Some(owner), ty);
        data.node = Some(node);
        data.library = self.symbols.get(owner).library;
        let decl = self.symbols.alloc(data);
        self.declared.insert(node, decl);
        decl
    }

    fn enter_stub(&mut self, stub: &BinaryStub) {
        let binary = &stub.binary_name;
        if self.symbols.type_by_binary_name(binary).is_some() {
            return;
        }
        let (prefix, simple) = match binary.rfind('.') {
            Some(dot) => (&binary[..dot], &binary[dot + 1..]),
            None => ("", &binary[..]),
        };
        let outer = simple.rfind('$').and_then(|dollar| {
            let outer_binary = &binary[..binary.len() - simple.len() + dollar];
            self.symbols
                .type_by_binary_name(outer_binary)
                .map(|o| (o, &simple[dollar + 1..]))
        });
        let (owner, name) = match outer {
            Some((owner, name)) => (owner, name),
            None => (self.package(prefix), simple),
        };
        let owner_qualified = &self.symbols.get(owner).qualified;
        let qualified: Arc<str> = if owner_qualified.is_empty() {
            Arc::from(name)
        } else {
            Arc::from(format!("{owner_qualified}.{name}"))
        };

        let ty = self.types.reserve();
        let mut data = DeclData::new(stub.kind, Arc::from(name), Some(owner), ty);
        data.binary_name = Some(Arc::clone(binary));
        data.qualified = qualified;
        data.members = None;
        data.library = true;
        data.flags = NodeFlags::PUBLIC;
        let decl = self.symbols.alloc(data);
        self.types.define(
            ty,
            TypeData::Declared {
                decl,
                args: Vec::new(),
                enclosing: None,
            },
        );
        self.symbols.register_type(Arc::clone(binary), decl);
        if let Some(members) = self.symbols.get_mut(owner).members.as_mut() {
            members.push(decl);
        }
    }

    fn enter_module(&mut self, name: &Arc<str>) {
        if self.symbols.module(name).is_some() {
            return;
        }
        let ty = self.types.reserve();
        let mut data = DeclData::new(DeclKind::Module, Arc::clone(name), None, ty);
        data.library = true;
        let decl = self.symbols.alloc(data);
        self.types.define(ty, TypeData::Module(decl));
        self.symbols.register_module(Arc::clone(name), decl);
    }

    /// `length` and `clone()` of the array pseudo-class.
    fn enter_array_members(&mut self) {
        let owner = self.array_class;
        let int = self.types.primitive(PrimitiveKind::Int);
        let mut length = DeclData::new(DeclKind::Field, Arc::from("length"), Some(owner), int);
        length.library = true;
        length.flags = NodeFlags::PUBLIC | NodeFlags::FINAL;
        let length = self.symbols.alloc(length);

        let clone_ty = self.types.intern(TypeData::Executable {
            type_params: Vec::new(),
            params: Vec::new(),
            ret: self.object_type(),
            thrown: Vec::new(),
        });
        let mut clone = DeclData::new(DeclKind::Method, Arc::from("clone"), Some(owner), clone_ty);
        clone.library = true;
        clone.flags = NodeFlags::PUBLIC;
        let clone = self.symbols.alloc(clone);

        self.symbols.get_mut(owner).members = Some(vec![length, clone]);
    }

    fn resolve_import(&mut self, unit: usize, import: NodeId) {
        let n = self.syntax.get(import);
        let Some(&name) = n.children.first() else {
            return;
        };
        let flags = n.flags;
        let text = self.qualified_text(name);

        if flags.contains(NodeFlags::ON_DEMAND) {
            if let Some(package) = self.symbols.package(&text) {
                self.referenced.insert(name, package);
            } else if let Some(ty) = self.type_by_qualified(&text) {
                self.referenced.insert(name, ty);
            }
            self.units[unit].on_demand.push(Arc::from(text));
            return;
        }
        if flags.contains(NodeFlags::STATIC) {
            // Static member import: only the owning type is recorded.
            if let (Some(&owner), Some((owner_text, _))) =
                (self.syntax.get(name).children.first(), text.rsplit_once('.'))
            {
                if let Some(ty) = self.type_by_qualified(owner_text) {
                    self.referenced.insert(owner, ty);
                }
            }
            return;
        }
        match self.type_by_qualified(&text) {
            Some(ty) => {
                self.referenced.insert(name, ty);
                let simple = self.symbols.get(ty).name.clone();
                self.units[unit].single.insert(simple, ty);
            }
            None => tracing::debug!(import = %text, "unresolved import"),
        }
    }

    // ===== Header =====

    fn header(&mut self, decl: DeclId, unit: usize) {
        let Some(node) = self.symbols.get(decl).node else {
            return;
        };
        let scope = self.scope_for(decl, unit);
        let type_params = self.symbols.get(decl).type_params.clone();
        self.define_type_parameters(&type_params, &scope);

        let mut supers = Vec::new();
        let mut has_extends = false;
        for child in self.children(node) {
            let n = self.syntax.get(child);
            if n.kind == NodeKind::Modifiers {
                self.annotations(child, &scope);
            } else if n.flags.intersects(NodeFlags::EXTENDS_CLAUSE | NodeFlags::IMPLEMENTS_CLAUSE) {
                has_extends |= n.flags.contains(NodeFlags::EXTENDS_CLAUSE);
                let ty = self.resolve_type(child, &scope);
                if let Some(super_decl) = self.decl_of_value(ty, 0) {
                    supers.push(super_decl);
                }
            }
        }
        let kind = self.symbols.get(decl).kind;
        let implicit_super = match kind {
            DeclKind::Enum => self.java_lang("Enum"),
            DeclKind::Class | DeclKind::Record if !has_extends => self.java_lang("Object"),
            _ => None,
        };
        if let Some(implicit) = implicit_super.filter(|&s| s != decl) {
            supers.insert(0, implicit);
        }
        self.supertypes.entry(decl).or_default().extend(supers);

        let args = type_params
            .iter()
            .map(|&tp| self.symbols.get(tp).ty)
            .collect();
        let enclosing = self.enclosing_type(decl);
        let ty = self.symbols.get(decl).ty;
        self.types.define(
            ty,
            TypeData::Declared {
                decl,
                args,
                enclosing,
            },
        );
    }

    /// Outer type of an inner class whose outer type is generic.
    fn enclosing_type(&self, decl: DeclId) -> Option<TypeId> {
        let data = self.symbols.get(decl);
        if data.kind != DeclKind::Class || data.flags.contains(NodeFlags::STATIC) {
            return None;
        }
        let outer = self.symbols.get(data.owner?);
        if !matches!(outer.kind, DeclKind::Class | DeclKind::Enum | DeclKind::Record) {
            return None;
        }
        let generic = !outer.type_params.is_empty() || self.enclosing_type(data.owner?).is_some();
        generic.then_some(outer.ty)
    }

    fn define_type_parameters(&mut self, params: &[DeclId], scope: &Scope) {
        for &param in params {
            let Some(node) = self.symbols.get(param).node else {
                continue;
            };
            let bounds: Vec<TypeId> = self
                .children(node)
                .into_iter()
                .map(|bound| self.resolve_type(bound, scope))
                .collect();
            let upper = match bounds.len() {
                0 => self.object_type(),
                1 => bounds[0],
                _ => self.types.intern(TypeData::Intersection(bounds)),
            };
            let ty = self.symbols.get(param).ty;
            self.types.define(
                ty,
                TypeData::TypeVar {
                    decl: param,
                    lower: None,
                    upper: Some(upper),
                },
            );
        }
    }

    fn annotations(&mut self, modifiers: NodeId, scope: &Scope) {
        for annotation in self.children(modifiers) {
            if let Some(&name) = self.syntax.get(annotation).children.first() {
                self.resolve_type(name, scope);
            }
        }
    }

    // ===== Members =====

    fn members(&mut self, decl: DeclId, unit: usize) {
        let Some(node) = self.symbols.get(decl).node else {
            return;
        };
        let class_kind = self.symbols.get(decl).kind;
        let scope = self.scope_for(decl, unit);
        let children = self.children(node);

        let mut members = Vec::new();
        let mut has_constructor = false;
        let mut first_member = None;
        for (index, &child) in children.iter().enumerate() {
            let (kind, flags) = {
                let n = self.syntax.get(child);
                (n.kind, n.flags)
            };
            if matches!(kind, NodeKind::Modifiers | NodeKind::TypeParameter)
                || flags.intersects(NodeFlags::EXTENDS_CLAUSE | NodeFlags::IMPLEMENTS_CLAUSE)
            {
                continue;
            }
            let member = match kind {
                NodeKind::Variable => Some(self.enter_variable(child, decl, &scope)),
                NodeKind::Method => {
                    let method = self.enter_method(child, decl, &scope);
                    has_constructor |= self.symbols.get(method).kind == DeclKind::Constructor;
                    Some(method)
                }
                NodeKind::Block if flags.contains(NodeFlags::INITIALIZER) => {
                    Some(self.enter_initializer(child, decl, &scope))
                }
                k if k.is_type_declaration() => self.declared.get(&child).copied(),
                _ => None,
            };
            if let Some(member) = member {
                first_member.get_or_insert(index);
                members.push(member);
            }
        }

        if class_kind == DeclKind::Class && !has_constructor {
            let position = first_member.unwrap_or(children.len());
            members.insert(0, self.implicit_constructor(node, decl, position));
        }
        self.symbols.get_mut(decl).members = Some(members);
    }

    fn member_data(&self, node: NodeId, kind: DeclKind, owner: DeclId, ty: TypeId) -> DeclData {
        let mut data = DeclData::new(kind, self.text(node), Some(owner), ty);
        data.node = Some(node);
        data.library = self.symbols.get(owner).library;
        data.flags = self.syntax.get(node).flags & NodeFlags::MODIFIERS;
        data
    }

    fn enter_variable(&mut self, node: NodeId, owner: DeclId, scope: &Scope) -> DeclId {
        let flags = self.syntax.get(node).flags;
        let children = self.children(node);
        if let Some(&modifiers) = children.first() {
            self.annotations(modifiers, scope);
        }

        let (kind, ty, rest) = if flags.contains(NodeFlags::ENUM_CONSTANT) {
            let ty = self.symbols.get(owner).ty;
            (DeclKind::EnumConstant, ty, children.get(1..))
        } else {
            let kind = if flags.contains(NodeFlags::RECORD_COMPONENT) {
                DeclKind::RecordComponent
            } else {
                DeclKind::Field
            };
            let ty = match children.get(1) {
                Some(&ty) => self.resolve_type(ty, scope),
                None => self.error_type(""),
            };
            (kind, ty, children.get(2..))
        };

        let data = self.member_data(node, kind, owner, ty);
        let decl = self.symbols.alloc(data);
        self.declared.insert(node, decl);

        let rest: SmallVec<[NodeId; 4]> = rest.unwrap_or_default().iter().copied().collect();
        if !rest.is_empty() {
            self.bodies.push_back(Body {
                owner: decl,
                nodes: rest,
                scope: scope.clone(),
                params: Vec::new(),
            });
        }
        decl
    }

    fn enter_method(&mut self, node: NodeId, owner: DeclId, scope: &Scope) -> DeclId {
        let kind = if self.syntax.text(node).is_some_and(|t| &**t == "<init>") {
            DeclKind::Constructor
        } else {
            DeclKind::Method
        };
        let slot = self.types.reserve();
        let data = self.member_data(node, kind, owner, slot);
        let decl = self.symbols.alloc(data);
        self.declared.insert(node, decl);

        let children = self.children(node);
        let type_params: Vec<DeclId> = children
            .iter()
            .copied()
            .filter(|&c| self.syntax.get(c).kind == NodeKind::TypeParameter)
            .collect::<Vec<_>>()
            .into_iter()
            .map(|c| self.enter_type_parameter(c, decl))
            .collect();
        self.symbols.get_mut(decl).type_params = type_params.clone();

        let mut scope = scope.clone();
        let outer_vars = std::mem::take(&mut scope.type_vars);
        scope.type_vars = type_params.iter().copied().chain(outer_vars).collect();
        self.define_type_parameters(&type_params, &scope);

        let mut ret = None;
        let mut params = Vec::new();
        let mut thrown = Vec::new();
        let mut body = None;
        for &child in &children {
            let (child_kind, flags) = {
                let n = self.syntax.get(child);
                (n.kind, n.flags)
            };
            match child_kind {
                NodeKind::Modifiers => self.annotations(child, &scope),
                NodeKind::TypeParameter => {}
                NodeKind::Variable if flags.contains(NodeFlags::PARAMETER) => {
                    params.push(self.enter_parameter(child, decl, &scope));
                }
                NodeKind::Block => body = Some(child),
                _ if flags.contains(NodeFlags::THROWS_CLAUSE) => {
                    thrown.push(self.resolve_type(child, &scope));
                }
                _ if ret.is_none() => ret = Some(self.resolve_type(child, &scope)),
                _ => {}
            }
        }

        let ret = match (kind, ret) {
            (DeclKind::Method, Some(ret)) => ret,
            _ => self.types.void(),
        };
        let param_types = params.iter().map(|&p| self.symbols.get(p).ty).collect();
        self.types.define(
            slot,
            TypeData::Executable {
                type_params,
                params: param_types,
                ret,
                thrown,
            },
        );

        if let Some(body) = body {
            self.bodies.push_back(Body {
                owner: decl,
                nodes: SmallVec::from_elem(body, 1),
                scope,
                params,
            });
        }
        decl
    }

    fn enter_parameter(&mut self, node: NodeId, owner: DeclId, scope: &Scope) -> DeclId {
        let children = self.children(node);
        if let Some(&modifiers) = children.first() {
            self.annotations(modifiers, scope);
        }
        let ty = match children.get(1) {
            Some(&ty) => self.resolve_type(ty, scope),
            None => self.error_type(""),
        };
        let data = self.member_data(node, DeclKind::Parameter, owner, ty);
        let decl = self.symbols.alloc(data);
        self.declared.insert(node, decl);
        decl
    }

    fn enter_initializer(&mut self, node: NodeId, owner: DeclId, scope: &Scope) -> DeclId {
        let kind = if self.syntax.get(node).flags.contains(NodeFlags::STATIC) {
            DeclKind::StaticInit
        } else {
            DeclKind::InstanceInit
        };
        let data = self.member_data(node, kind, owner, self.types.none());
        let decl = self.symbols.alloc(data);
        self.declared.insert(node, decl);
        self.bodies.push_back(Body {
            owner: decl,
            nodes: SmallVec::from_elem(node, 1),
            scope: scope.clone(),
            params: Vec::new(),
        });
        decl
    }

    /// Default constructor: a positionless `Method` node with a positionless
    /// `Modifiers` child, placed before the first member.
    fn implicit_constructor(&mut self, class_node: NodeId, class: DeclId, position: usize) -> DeclId {
        let access = self.symbols.get(class).flags & ACCESS;
        let modifiers = self
            .syntax
            .alloc(NodeKind::Modifiers, None, SmallVec::new());
        self.syntax.get_mut(modifiers).flags = access;
        let ctor = self
            .syntax
            .alloc(NodeKind::Method, None, SmallVec::from_elem(modifiers, 1));
        {
            let n = self.syntax.get_mut(ctor);
            n.text = Some(Arc::from("<init>"));
            n.flags = access | NodeFlags::IMPLICIT;
        }
        self.syntax.insert_child(class_node, position, ctor);

        let ty = self.types.intern(TypeData::Executable {
            type_params: Vec::new(),
            params: Vec::new(),
            ret: self.types.void(),
            thrown: Vec::new(),
        });
        let data = self.member_data(ctor, DeclKind::Constructor, class, ty);
        let decl = self.symbols.alloc(data);
        self.declared.insert(ctor, decl);
        decl
    }

    // ===== Bodies =====

    fn body(&mut self, body: Body) {
        let mut locals: Locals = body
            .params
            .iter()
            .map(|&p| (self.symbols.get(p).name.clone(), p))
            .collect();
        for &node in &body.nodes {
            self.statement(node, body.owner, &body.scope, &mut locals);
        }
    }

    fn statement(&mut self, node: NodeId, owner: DeclId, scope: &Scope, locals: &mut Locals) {
        ensure_sufficient_stack(|| self.statement_inner(node, owner, scope, locals))
    }

    fn statement_inner(&mut self, node: NodeId, owner: DeclId, scope: &Scope, locals: &mut Locals) {
        let kind = self.syntax.get(node).kind;
        match kind {
            NodeKind::Block => {
                let mark = locals.len();
                for child in self.children(node) {
                    self.statement(child, owner, scope, locals);
                }
                locals.truncate(mark);
            }
            NodeKind::Variable => self.local_variable(node, owner, scope, locals),
            NodeKind::Return
            | NodeKind::If
            | NodeKind::ExpressionStatement
            | NodeKind::EmptyStatement => {
                for child in self.children(node) {
                    self.statement(child, owner, scope, locals);
                }
            }
            k if k.is_type_declaration() => {
                self.local_type(node, owner, scope);
            }
            _ => {
                self.expr(node, owner, scope, locals);
            }
        }
    }

    fn local_variable(&mut self, node: NodeId, owner: DeclId, scope: &Scope, locals: &mut Locals) {
        let children = self.children(node);
        if let Some(&modifiers) = children.first() {
            self.annotations(modifiers, scope);
        }
        let ty = match children.get(1) {
            Some(&ty) if self.syntax.get(ty).kind == NodeKind::InferredType => {
                let init = children
                    .get(2)
                    .and_then(|&init| self.expr(init, owner, scope, locals));
                match init {
                    Some(Target::Value(ty)) => ty,
                    _ => self.error_type("var"),
                }
            }
            Some(&ty) => {
                let ty = self.resolve_type(ty, scope);
                if let Some(&init) = children.get(2) {
                    self.expr(init, owner, scope, locals);
                }
                ty
            }
            None => self.error_type(""),
        };
        let data = self.member_data(node, DeclKind::LocalVariable, owner, ty);
        let decl = self.symbols.alloc(data);
        self.declared.insert(node, decl);
        locals.push((self.symbols.get(decl).name.clone(), decl));
    }

    /// Enter a local or anonymous class found in a body: `Top$1Local`, `Top$2`.
    fn local_type(&mut self, node: NodeId, owner: DeclId, scope: &Scope) -> Option<DeclId> {
        let top = *scope.classes.last()?;
        let counter = self.local_counters.entry(top).or_insert(0);
        *counter += 1;
        let index = *counter;
        let top_binary = self.symbols.get(top).binary_name.clone()?;
        let binary = format!("{top_binary}${index}{}", self.text(node));

        let mut classes = Vec::new();
        let decl = self.enter_type(node, owner, Arc::from(binary), scope.unit, &mut classes);
        for &(class, unit) in &classes {
            self.header(class, unit);
        }
        for &(class, unit) in &classes {
            self.members(class, unit);
        }
        Some(decl)
    }

    fn expr(&mut self, node: NodeId, owner: DeclId, scope: &Scope, locals: &mut Locals) -> Option<Target> {
        ensure_sufficient_stack(|| self.expr_inner(node, owner, scope, locals))
    }

    fn expr_inner(&mut self, node: NodeId, owner: DeclId, scope: &Scope, locals: &mut Locals) -> Option<Target> {
        let kind = self.syntax.get(node).kind;
        let text = self.text(node);
        let children = self.children(node);
        let boolean = self.types.primitive(PrimitiveKind::Boolean);
        match kind {
            NodeKind::IntLiteral => {
                let kind = if text.ends_with(['l', 'L']) {
                    PrimitiveKind::Long
                } else {
                    PrimitiveKind::Int
                };
                Some(Target::Value(self.types.primitive(kind)))
            }
            NodeKind::StringLiteral => self.string_type().map(Target::Value),
            NodeKind::CharLiteral => Some(Target::Value(self.types.primitive(PrimitiveKind::Char))),
            NodeKind::BooleanLiteral => Some(Target::Value(boolean)),
            NodeKind::NullLiteral => Some(Target::Value(self.types.null())),
            NodeKind::Identifier => self.identifier(node, &text, scope, locals),
            NodeKind::MemberSelect => {
                let qualifier = self.expr(*children.first()?, owner, scope, locals);
                self.select(node, qualifier?, &text)
            }
            NodeKind::MethodInvocation => {
                let (&callee, args) = children.split_first()?;
                for &arg in args {
                    self.expr(arg, owner, scope, locals);
                }
                let method = match self.syntax.get(callee).kind {
                    NodeKind::Identifier => {
                        let name = self.text(callee);
                        scope
                            .classes
                            .iter()
                            .find_map(|&class| self.find_method(class, &name, args.len()))
                    }
                    NodeKind::MemberSelect => {
                        let name = self.text(callee);
                        let qualifier = *self.syntax.get(callee).children.first()?;
                        let target = self.expr(qualifier, owner, scope, locals)?;
                        let class = self.target_decl(&target)?;
                        self.find_method(class, &name, args.len())
                    }
                    _ => {
                        self.expr(callee, owner, scope, locals);
                        None
                    }
                }?;
                self.referenced.insert(callee, method);
                self.return_type(method).map(Target::Value)
            }
            NodeKind::NewClass => {
                let (&class_ty, rest) = children.split_first()?;
                let ty = self.resolve_type(class_ty, scope);
                let mut arity = 0;
                for &child in rest {
                    if self.syntax.get(child).kind == NodeKind::Class {
                        if let (Some(anonymous), Some(base)) =
                            (self.local_type(child, owner, scope), self.decl_of_value(ty, 0))
                        {
                            self.supertypes.entry(anonymous).or_default().insert(0, base);
                        }
                    } else {
                        arity += 1;
                        self.expr(child, owner, scope, locals);
                    }
                }
                if let Some(ctor) = self
                    .decl_of_value(ty, 0)
                    .and_then(|class| self.find_method(class, "<init>", arity))
                {
                    self.referenced.insert(node, ctor);
                }
                Some(Target::Value(ty))
            }
            NodeKind::Parenthesized => self.expr(*children.first()?, owner, scope, locals),
            NodeKind::Assignment => {
                let lhs = self.expr(*children.first()?, owner, scope, locals);
                if let Some(&rhs) = children.get(1) {
                    self.expr(rhs, owner, scope, locals);
                }
                lhs
            }
            NodeKind::Unary => {
                let operand = self.expr(*children.first()?, owner, scope, locals);
                if &*text == "!" {
                    Some(Target::Value(boolean))
                } else {
                    operand
                }
            }
            NodeKind::Binary => {
                let lhs = self.expr(*children.first()?, owner, scope, locals);
                let rhs = match children.get(1) {
                    Some(&rhs) => self.expr(rhs, owner, scope, locals),
                    None => None,
                };
                match &*text {
                    "==" | "!=" | "<" | ">" | "&&" | "||" => Some(Target::Value(boolean)),
                    "+" => {
                        let string = self.string_type();
                        let is_string = |t: &Option<Target>| {
                            matches!((t, string), (Some(Target::Value(v)), Some(s)) if *v == s)
                        };
                        if is_string(&lhs) || is_string(&rhs) {
                            string.map(Target::Value)
                        } else {
                            lhs
                        }
                    }
                    _ => lhs,
                }
            }
            _ => {
                for child in children {
                    self.expr(child, owner, scope, locals);
                }
                None
            }
        }
    }

    fn identifier(&mut self, node: NodeId, name: &str, scope: &Scope, locals: &Locals) -> Option<Target> {
        match name {
            "this" => {
                let class = *scope.classes.first()?;
                return Some(Target::Value(self.symbols.get(class).ty));
            }
            "super" => return None,
            _ => {}
        }
        if let Some(&(_, local)) = locals.iter().rev().find(|(n, _)| &**n == name) {
            self.referenced.insert(node, local);
            return Some(Target::Value(self.symbols.get(local).ty));
        }
        if let Some(field) = scope
            .classes
            .iter()
            .find_map(|&class| self.find_field(class, name))
        {
            self.referenced.insert(node, field);
            return Some(Target::Value(self.symbols.get(field).ty));
        }
        self.type_name(node, scope)
    }

    fn select(&mut self, node: NodeId, qualifier: Target, name: &str) -> Option<Target> {
        match qualifier {
            Target::Package(prefix) => self.package_member(node, &prefix, name),
            Target::Type(class) => {
                if let Some(field) = self.find_field(class, name) {
                    self.referenced.insert(node, field);
                    Some(Target::Value(self.symbols.get(field).ty))
                } else {
                    let member = self.find_member_type(class, name)?;
                    self.referenced.insert(node, member);
                    Some(Target::Type(member))
                }
            }
            Target::Value(ty) => {
                let class = self.decl_of_value(ty, 0)?;
                let field = self.find_field(class, name)?;
                self.referenced.insert(node, field);
                Some(Target::Value(self.symbols.get(field).ty))
            }
        }
    }

    fn target_decl(&self, target: &Target) -> Option<DeclId> {
        match target {
            Target::Value(ty) => self.decl_of_value(*ty, 0),
            Target::Type(decl) => Some(*decl),
            Target::Package(_) => None,
        }
    }

    fn package_member(&mut self, node: NodeId, prefix: &str, name: &str) -> Option<Target> {
        let full = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };
        if let Some(ty) = self.symbols.type_by_binary_name(&full) {
            self.referenced.insert(node, ty);
            return Some(Target::Type(ty));
        }
        if let Some(package) = self.symbols.package(&full) {
            self.referenced.insert(node, package);
        }
        Some(Target::Package(Arc::from(full)))
    }

    // ===== Types =====

    fn lookup_type_name(&self, name: &str, scope: &Scope) -> Option<DeclId> {
        if let Some(&var) = scope
            .type_vars
            .iter()
            .find(|&&tv| &*self.symbols.get(tv).name == name)
        {
            return Some(var);
        }
        for &class in &scope.classes {
            if let Some(member) = self.find_member_type(class, name) {
                return Some(member);
            }
            if &*self.symbols.get(class).name == name {
                return Some(class);
            }
        }
        let unit = &self.units[scope.unit];
        if let Some(&imported) = unit.single.get(name) {
            return Some(imported);
        }
        let same_package = if unit.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", unit.prefix)
        };
        if let Some(found) = self.symbols.type_by_binary_name(&same_package) {
            return Some(found);
        }
        for prefix in &unit.on_demand {
            if let Some(found) = self.symbols.type_by_binary_name(&format!("{prefix}.{name}")) {
                return Some(found);
            }
            if let Some(owner) = self.type_by_qualified(prefix) {
                if let Some(found) = self.symbols.member_type(owner, name) {
                    return Some(found);
                }
            }
        }
        self.java_lang(name)
    }

    /// Resolve an identifier or select chain in type position.
    fn type_name(&mut self, node: NodeId, scope: &Scope) -> Option<Target> {
        ensure_sufficient_stack(|| self.type_name_inner(node, scope))
    }

    fn type_name_inner(&mut self, node: NodeId, scope: &Scope) -> Option<Target> {
        let (kind, qualifier) = {
            let n = self.syntax.get(node);
            (n.kind, n.children.first().copied())
        };
        let name = self.text(node);
        match (kind, qualifier) {
            (NodeKind::Identifier, _) => {
                if let Some(decl) = self.lookup_type_name(&name, scope) {
                    self.referenced.insert(node, decl);
                    return Some(Target::Type(decl));
                }
                if let Some(package) = self.symbols.package(&name) {
                    self.referenced.insert(node, package);
                }
                Some(Target::Package(name))
            }
            (NodeKind::MemberSelect, Some(qualifier)) => match self.type_name(qualifier, scope)? {
                Target::Type(class) => {
                    let member = self.find_member_type(class, &name)?;
                    self.referenced.insert(node, member);
                    Some(Target::Type(member))
                }
                Target::Package(prefix) => self.package_member(node, &prefix, &name),
                Target::Value(_) => None,
            },
            _ => None,
        }
    }

    fn resolve_type(&mut self, node: NodeId, scope: &Scope) -> TypeId {
        ensure_sufficient_stack(|| self.resolve_type_inner(node, scope))
    }

    fn resolve_type_inner(&mut self, node: NodeId, scope: &Scope) -> TypeId {
        let kind = self.syntax.get(node).kind;
        let children = self.children(node);
        match kind {
            NodeKind::PrimitiveType => {
                let text = self.text(node);
                if &*text == "void" {
                    self.types.void()
                } else {
                    match PrimitiveKind::from_keyword(&text) {
                        Some(p) => self.types.primitive(p),
                        None => self.error_type(&text),
                    }
                }
            }
            NodeKind::Identifier | NodeKind::MemberSelect => match self.type_name(node, scope) {
                Some(Target::Type(decl)) => self.nominal(decl),
                _ => {
                    let name = self.qualified_text(node);
                    tracing::trace!(%name, "unresolved type reference");
                    self.error_type(&name)
                }
            },
            NodeKind::ParameterizedType => {
                let Some((&base, args)) = children.split_first() else {
                    return self.error_type("");
                };
                let base = self.resolve_type(base, scope);
                let args: Vec<TypeId> = args.iter().map(|&a| self.resolve_type(a, scope)).collect();
                match self.types.get(base) {
                    TypeData::Declared { decl, enclosing, .. } => {
                        self.types.intern(TypeData::Declared {
                            decl,
                            args,
                            enclosing,
                        })
                    }
                    _ => base,
                }
            }
            NodeKind::ArrayType => {
                let component = match children.first() {
                    Some(&c) => self.resolve_type(c, scope),
                    None => self.error_type(""),
                };
                self.types.intern(TypeData::Array(component))
            }
            NodeKind::UnboundedWildcard => self.types.intern(TypeData::Wildcard {
                extends: None,
                super_bound: None,
            }),
            NodeKind::ExtendsWildcard | NodeKind::SuperWildcard => {
                let bound = children.first().map(|&b| self.resolve_type(b, scope));
                let (extends, super_bound) = if kind == NodeKind::ExtendsWildcard {
                    (bound, None)
                } else {
                    (None, bound)
                };
                self.types.intern(TypeData::Wildcard {
                    extends,
                    super_bound,
                })
            }
            _ => self.error_type(""),
        }
    }
}

fn decl_kind_of(kind: NodeKind) -> DeclKind {
    match kind {
        NodeKind::Interface => DeclKind::Interface,
        NodeKind::Enum => DeclKind::Enum,
        NodeKind::AnnotationType => DeclKind::AnnotationType,
        NodeKind::Record => DeclKind::Record,
        _ => DeclKind::Class,
    }
}
