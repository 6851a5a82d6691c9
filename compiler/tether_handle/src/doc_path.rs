//! `DocTreePathHandle`: a location inside a documentation comment.
//!
//! The comment moves with its declaration, so the handle keeps the tree
//! handle of the documented declaration and an offset relative to the start
//! of the comment.

use tether_model::{CompilationContext, DocId, DocKind};

use crate::error::HandleError;
use crate::intern::InternPool;
use crate::kind_path::KindPath;
use crate::tree_path::TreePathHandle;

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct DocTreePathHandle {
    owner: TreePathHandle,
    /// Start of the node, relative to the start of the comment.
    offset: u32,
    path: KindPath<DocKind>,
}

impl DocTreePathHandle {
    pub fn create<C>(pool: &InternPool, ctx: &C, doc: DocId) -> Result<Self, HandleError>
    where
        C: CompilationContext + ?Sized,
    {
        let root = comment_root(ctx, doc);
        let owner = TreePathHandle::create(pool, ctx, ctx.doc_owner(doc))?;
        let comment_start = ctx.doc_span(root).start;
        Ok(DocTreePathHandle {
            owner,
            offset: ctx.doc_span(doc).start.saturating_sub(comment_start),
            path: KindPath::of_doc(ctx, doc),
        })
    }

    /// Find the doc node in `ctx`, or `None` if the declaration, its comment
    /// or the node's shape is gone.
    pub fn resolve<C>(&self, ctx: &C) -> Option<DocId>
    where
        C: CompilationContext + ?Sized,
    {
        let owner = self.owner.resolve(ctx)?;
        let Some(root) = ctx.doc_comment(owner) else {
            tracing::debug!("declaration lost its comment");
            return None;
        };
        let base = ctx.doc_span(root).start.checked_add(self.offset)?;
        for candidate in [Some(base), base.checked_add(1)].into_iter().flatten() {
            let mut current = ctx.doc_node_at(root, candidate);
            while let Some(doc) = current {
                if KindPath::of_doc(ctx, doc) == self.path {
                    return Some(doc);
                }
                current = ctx.doc_parent(doc);
            }
        }
        tracing::debug!(offset = self.offset, "no doc node with a matching kind path");
        None
    }

    /// Kind of the doc node the handle points at.
    pub fn kind(&self) -> Option<DocKind> {
        self.path.leaf()
    }

    /// Handle of the documented declaration's tree.
    pub fn tree_path_handle(&self) -> &TreePathHandle {
        &self.owner
    }
}

fn comment_root<C>(ctx: &C, doc: DocId) -> DocId
where
    C: CompilationContext + ?Sized,
{
    let mut current = doc;
    while let Some(parent) = ctx.doc_parent(current) {
        current = parent;
    }
    current
}

#[cfg(test)]
mod tests;
