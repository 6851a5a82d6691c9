//! Kind chains from a node up to its root.
//!
//! Several nodes can start at the same offset: a modifier list, its first
//! annotation and the declaration they belong to. The chain of kinds from a
//! node to the root tells them apart after an offset lookup.

use std::fmt;
use std::hash::{Hash, Hasher};

use smallvec::SmallVec;
use tether_model::{DocId, DocKind, DocTrees, NodeId, NodeKind, Trees};

/// Kind tag that can appear in a [`KindPath`].
pub trait PathKind: Copy + Eq + Hash + fmt::Debug {
    /// Placeholder kinds produced by error recovery. They are skipped when
    /// paths are compared so a transient parse error does not block a match.
    fn is_erroneous(self) -> bool;
}

impl PathKind for NodeKind {
    #[inline]
    fn is_erroneous(self) -> bool {
        self == NodeKind::Erroneous
    }
}

impl PathKind for DocKind {
    #[inline]
    fn is_erroneous(self) -> bool {
        self == DocKind::Erroneous
    }
}

/// Leaf-first list of kinds.
#[derive(Clone)]
pub struct KindPath<K: PathKind = NodeKind> {
    kinds: SmallVec<[K; 8]>,
}

impl<K: PathKind> KindPath<K> {
    pub fn from_kinds(kinds: impl IntoIterator<Item = K>) -> Self {
        KindPath {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Kind of the node the path was taken from.
    #[inline]
    pub fn leaf(&self) -> Option<K> {
        self.kinds.first().copied()
    }

    #[inline]
    pub fn kinds(&self) -> &[K] {
        &self.kinds
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    fn significant(&self) -> impl Iterator<Item = K> + '_ {
        self.kinds.iter().copied().filter(|k| !k.is_erroneous())
    }
}

impl KindPath<NodeKind> {
    /// Path from `node` up to its compilation unit.
    pub fn of<C: Trees + ?Sized>(ctx: &C, node: NodeId) -> Self {
        let mut kinds = SmallVec::new();
        let mut current = Some(node);
        while let Some(n) = current {
            kinds.push(ctx.node_kind(n));
            current = ctx.parent(n);
        }
        KindPath { kinds }
    }
}

impl KindPath<DocKind> {
    /// Path from `doc` up to its comment root.
    pub fn of_doc<C: DocTrees + ?Sized>(ctx: &C, doc: DocId) -> Self {
        let mut kinds = SmallVec::new();
        let mut current = Some(doc);
        while let Some(d) = current {
            kinds.push(ctx.doc_kind(d));
            current = ctx.doc_parent(d);
        }
        KindPath { kinds }
    }
}

impl<K: PathKind> PartialEq for KindPath<K> {
    fn eq(&self, other: &Self) -> bool {
        self.significant().eq(other.significant())
    }
}

impl<K: PathKind> Eq for KindPath<K> {}

impl<K: PathKind> Hash for KindPath<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for kind in self.significant() {
            kind.hash(state);
        }
    }
}

impl<K: PathKind> fmt::Debug for KindPath<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds.iter()).finish()
    }
}
