//! Flat syntax and doc-comment arenas.
//!
//! Nodes refer to each other by `NodeId`/`DocId`. Synthetic nodes carry no
//! span; everything else records the byte range it was parsed from.

use std::sync::Arc;

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::ids::{DocId, NodeId, Span};
use crate::kind::{DocKind, NodeKind};
use crate::stack::ensure_sufficient_stack;

bitflags! {
    /// Extra facts the parser records for the attribution pass.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub(crate) struct NodeFlags: u16 {
        const STATIC = 1 << 0;
        const FINAL = 1 << 1;
        const PUBLIC = 1 << 2;
        const PRIVATE = 1 << 3;
        const PROTECTED = 1 << 4;
        const ABSTRACT = 1 << 5;
        const DEFAULT = 1 << 6;
        /// Type in an `extends` clause.
        const EXTENDS_CLAUSE = 1 << 7;
        /// Type in an `implements` clause.
        const IMPLEMENTS_CLAUSE = 1 << 8;
        /// Type in a `throws` clause.
        const THROWS_CLAUSE = 1 << 9;
        const ENUM_CONSTANT = 1 << 10;
        const RECORD_COMPONENT = 1 << 11;
        const PARAMETER = 1 << 12;
        /// Block that is a static or instance initializer.
        const INITIALIZER = 1 << 13;
        /// `import a.b.*`.
        const ON_DEMAND = 1 << 14;
        /// Node made up by the front end.
        const IMPLICIT = 1 << 15;
    }
}

impl NodeFlags {
    /// Flags that describe declaration modifiers.
    pub(crate) const MODIFIERS: NodeFlags = NodeFlags::STATIC
        .union(NodeFlags::FINAL)
        .union(NodeFlags::PUBLIC)
        .union(NodeFlags::PRIVATE)
        .union(NodeFlags::PROTECTED)
        .union(NodeFlags::ABSTRACT)
        .union(NodeFlags::DEFAULT);
}

#[derive(Clone, Debug)]
pub(crate) struct SyntaxNode {
    pub kind: NodeKind,
    pub span: Option<Span>,
    pub parent: Option<NodeId>,
    pub children: SmallVec<[NodeId; 4]>,
    /// Identifier, declared name, literal text, or file path of a unit.
    pub text: Option<Arc<str>>,
    pub flags: NodeFlags,
    pub doc: Option<DocId>,
}

#[derive(Default, Debug)]
pub(crate) struct SyntaxArena {
    nodes: Vec<SyntaxNode>,
}

impl SyntaxArena {
    pub fn alloc(
        &mut self,
        kind: NodeKind,
        span: Option<Span>,
        children: SmallVec<[NodeId; 4]>,
    ) -> NodeId {
        let id = NodeId::from_len(self.nodes.len());
        for &child in &children {
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes.push(SyntaxNode {
            kind,
            span,
            parent: None,
            children,
            text: None,
            flags: NodeFlags::empty(),
            doc: None,
        });
        id
    }

    pub fn alloc_leaf(&mut self, kind: NodeKind, span: Option<Span>, text: Option<Arc<str>>) -> NodeId {
        let id = self.alloc(kind, span, SmallVec::new());
        self.nodes[id.index()].text = text;
        id
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut SyntaxNode {
        &mut self.nodes[id.index()]
    }

    /// Insert `child` into `parent` at `position`.
    pub fn insert_child(&mut self, parent: NodeId, position: usize, child: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
        let children = &mut self.nodes[parent.index()].children;
        let at = position.min(children.len());
        children.insert(at, child);
    }

    pub fn text(&self, id: NodeId) -> Option<&Arc<str>> {
        self.nodes[id.index()].text.as_ref()
    }

    /// Innermost positioned node at or below `root` that covers `offset`.
    ///
    /// Synthetic nodes are transparent: the search looks through them into
    /// their positioned descendants.
    pub fn node_at(&self, root: NodeId, offset: u32) -> Option<NodeId> {
        let node = self.get(root);
        match node.span {
            Some(span) if span.contains(offset) => {
                Some(self.descend(root, offset).unwrap_or(root))
            }
            Some(_) => None,
            None => self.descend(root, offset),
        }
    }

    fn descend(&self, node: NodeId, offset: u32) -> Option<NodeId> {
        ensure_sufficient_stack(|| {
            self.get(node)
                .children
                .iter()
                .find_map(|&child| self.node_at(child, offset))
        })
    }
}

#[derive(Clone, Debug)]
pub(crate) struct DocNode {
    pub kind: DocKind,
    pub span: Span,
    pub parent: Option<DocId>,
    pub children: SmallVec<[DocId; 4]>,
    pub owner: NodeId,
}

#[derive(Default, Debug)]
pub(crate) struct DocArena {
    nodes: Vec<DocNode>,
}

impl DocArena {
    pub fn alloc(&mut self, kind: DocKind, span: Span, owner: NodeId, children: SmallVec<[DocId; 4]>) -> DocId {
        let id = DocId::from_len(self.nodes.len());
        for &child in &children {
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes.push(DocNode {
            kind,
            span,
            parent: None,
            children,
            owner,
        });
        id
    }

    #[inline]
    pub fn get(&self, id: DocId) -> &DocNode {
        &self.nodes[id.index()]
    }

    pub fn node_at(&self, root: DocId, offset: u32) -> Option<DocId> {
        let node = self.get(root);
        if !node.span.contains(offset) {
            return None;
        }
        let inner = node
            .children
            .iter()
            .find_map(|&child| self.node_at(child, offset));
        Some(inner.unwrap_or(root))
    }
}
