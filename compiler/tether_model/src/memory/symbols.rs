//! Declaration table of the reference context.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::syntax::NodeFlags;
use crate::ids::{DeclId, NodeId, TypeId};
use crate::kind::DeclKind;

#[derive(Clone, Debug)]
pub(crate) struct DeclData {
    pub kind: DeclKind,
    pub name: Arc<str>,
    pub owner: Option<DeclId>,
    /// `pkg.Outer$Inner` for types.
    pub binary_name: Option<Arc<str>>,
    pub qualified: Arc<str>,
    /// `None` for a binary stub.
    pub members: Option<Vec<DeclId>>,
    pub type_params: Vec<DeclId>,
    pub ty: TypeId,
    pub node: Option<NodeId>,
    /// Declared in the built-in library rather than a workspace file.
    pub library: bool,
    pub flags: NodeFlags,
    /// Descriptor of a synthesised stub member.
    pub descriptor: Option<Arc<str>>,
}

impl DeclData {
    pub fn new(kind: DeclKind, name: Arc<str>, owner: Option<DeclId>, ty: TypeId) -> Self {
        DeclData {
            kind,
            qualified: Arc::clone(&name),
            name,
            owner,
            binary_name: None,
            members: Some(Vec::new()),
            type_params: Vec::new(),
            ty,
            node: None,
            library: false,
            flags: NodeFlags::empty(),
            descriptor: None,
        }
    }
}

type SynthesisKey = (DeclId, DeclKind, Arc<str>, Arc<str>);

#[derive(Default, Debug)]
pub(crate) struct SymbolTable {
    decls: Vec<DeclData>,
    packages: FxHashMap<Arc<str>, DeclId>,
    modules: FxHashMap<Arc<str>, DeclId>,
    types: FxHashMap<Arc<str>, DeclId>,
    synthesized: FxHashMap<SynthesisKey, DeclId>,
}

impl SymbolTable {
    pub fn alloc(&mut self, data: DeclData) -> DeclId {
        let id = DeclId::from_len(self.decls.len());
        self.decls.push(data);
        id
    }

    #[inline]
    pub fn get(&self, id: DeclId) -> &DeclData {
        &self.decls[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: DeclId) -> &mut DeclData {
        &mut self.decls[id.index()]
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn package(&self, name: &str) -> Option<DeclId> {
        self.packages.get(name).copied()
    }

    pub fn module(&self, name: &str) -> Option<DeclId> {
        self.modules.get(name).copied()
    }

    pub fn type_by_binary_name(&self, binary: &str) -> Option<DeclId> {
        self.types.get(binary).copied()
    }

    pub fn register_package(&mut self, name: Arc<str>, decl: DeclId) {
        self.packages.insert(name, decl);
    }

    pub fn register_module(&mut self, name: Arc<str>, decl: DeclId) {
        self.modules.insert(name, decl);
    }

    /// Register a type under its binary name. The first declaration wins.
    pub fn register_type(&mut self, binary: Arc<str>, decl: DeclId) -> bool {
        if self.types.contains_key(&binary) {
            return false;
        }
        self.types.insert(binary, decl);
        true
    }

    /// Member types of `owner` named `name`.
    pub fn member_type(&self, owner: DeclId, name: &str) -> Option<DeclId> {
        self.get(owner)
            .members
            .as_ref()?
            .iter()
            .copied()
            .find(|&m| self.get(m).kind.is_type() && &*self.get(m).name == name)
    }

    /// First member of `owner` with the given name accepted by `filter`.
    pub fn member_named(
        &self,
        owner: DeclId,
        name: &str,
        filter: impl Fn(DeclKind) -> bool,
    ) -> Option<DeclId> {
        self.get(owner)
            .members
            .as_ref()?
            .iter()
            .copied()
            .find(|&m| filter(self.get(m).kind) && &*self.get(m).name == name)
    }

    pub fn synthesized(&self, key: &SynthesisKey) -> Option<DeclId> {
        self.synthesized.get(key).copied()
    }

    pub fn remember_synthesized(&mut self, key: SynthesisKey, decl: DeclId) {
        self.synthesized.insert(key, decl);
    }
}
