//! `TreePathHandle`: a syntax-tree location that outlives its pass.
//!
//! A positioned node is stored as its offset plus the [`KindPath`] from it
//! to the root, anchored on the nearest enclosing declaration so edits
//! elsewhere in the file only shift the offset. A node the front end
//! synthesised without a position is stored as its child index under a
//! located parent.

use std::sync::Arc;

use smallvec::SmallVec;
use tether_model::{CompilationContext, DeclId, DeclKind, NodeId, NodeKind, Trees};

use crate::element::ElementHandle;
use crate::error::HandleError;
use crate::intern::InternPool;
use crate::kind_path::KindPath;

/// How a [`TreePathHandle`] finds its node again.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum TreeLocation {
    /// Node with a source offset.
    Positional {
        /// Nearest enclosing declaration with a handle; `None` for nodes
        /// outside every declaration, such as imports.
        anchor: Option<ElementHandle>,
        file: Arc<str>,
        /// Start of the anchor node when the handle was created.
        anchor_start: u32,
        offset: u32,
        path: KindPath,
    },
    /// Positionless node, found as the `index`-th child of `parent`.
    Indexed {
        parent: TreePathHandle,
        index: u32,
        kind: NodeKind,
    },
    /// A declaration with no source tree, such as a library type.
    ElementOnly { element: ElementHandle },
}

/// Durable reference to a syntax-tree node.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct TreePathHandle {
    location: Arc<TreeLocation>,
}

impl TreePathHandle {
    /// Capture the location of `node`.
    pub fn create<C>(pool: &InternPool, ctx: &C, node: NodeId) -> Result<Self, HandleError>
    where
        C: CompilationContext + ?Sized,
    {
        let Some(span) = ctx.span(node) else {
            return TreePathHandle::indexed(pool, ctx, node);
        };
        let (anchor, anchor_start) = match anchor_of(pool, ctx, node) {
            Some((anchor, start)) => (Some(anchor), start),
            None => (None, 0),
        };
        Ok(TreePathHandle::from_location(TreeLocation::Positional {
            anchor,
            file: ctx.file_of(node),
            anchor_start,
            offset: span.start,
            path: KindPath::of(ctx, node),
        }))
    }

    fn indexed<C>(pool: &InternPool, ctx: &C, node: NodeId) -> Result<Self, HandleError>
    where
        C: CompilationContext + ?Sized,
    {
        let parent = ctx.parent(node).ok_or(HandleError::NoEnclosingUnit)?;
        let index = ctx
            .children(parent)
            .iter()
            .position(|&child| child == node)
            .and_then(|index| u32::try_from(index).ok())
            .ok_or(HandleError::NoEnclosingUnit)?;
        let parent = TreePathHandle::create(pool, ctx, parent)?;
        Ok(TreePathHandle::from_location(TreeLocation::Indexed {
            parent,
            index,
            kind: ctx.node_kind(node),
        }))
    }

    /// Location of the declaration `element` names: its tree when it has
    /// source in `ctx`, the bare element otherwise.
    pub fn from_element<C>(pool: &InternPool, ctx: &C, element: &ElementHandle) -> Result<Self, HandleError>
    where
        C: CompilationContext + ?Sized,
    {
        match element.resolve(ctx).and_then(|decl| ctx.tree_of(decl)) {
            Some(node) => TreePathHandle::create(pool, ctx, node),
            None => Ok(TreePathHandle::from_location(TreeLocation::ElementOnly {
                element: element.clone(),
            })),
        }
    }

    pub fn from_location(location: TreeLocation) -> Self {
        TreePathHandle {
            location: Arc::new(location),
        }
    }

    /// Find the node in `ctx`.
    ///
    /// Returns `None` when the anchor is gone or the node found at the
    /// recorded position has a different shape.
    pub fn resolve<C>(&self, ctx: &C) -> Option<NodeId>
    where
        C: CompilationContext + ?Sized,
    {
        match &*self.location {
            TreeLocation::Positional {
                anchor,
                file,
                anchor_start,
                offset,
                path,
            } => resolve_positional(ctx, anchor.as_ref(), file, *anchor_start, *offset, path),
            TreeLocation::Indexed {
                parent,
                index,
                kind,
            } => {
                let parent = parent.resolve(ctx)?;
                let child = *ctx.children(parent).get(*index as usize)?;
                let found = ctx.node_kind(child);
                if found == *kind {
                    Some(child)
                } else {
                    tracing::debug!(?found, expected = ?kind, index, "child kind changed");
                    None
                }
            }
            TreeLocation::ElementOnly { element } => element
                .resolve(ctx)
                .and_then(|decl| ctx.tree_of(decl)),
        }
    }

    /// Declaration introduced or referenced at the location.
    pub fn resolve_element<C>(&self, ctx: &C) -> Option<DeclId>
    where
        C: CompilationContext + ?Sized,
    {
        if let TreeLocation::ElementOnly { element } = &*self.location {
            return element.resolve(ctx);
        }
        ctx.element_of(self.resolve(ctx)?)
    }

    #[inline]
    pub fn location(&self) -> &TreeLocation {
        &self.location
    }

    /// Kind of the node the handle points at.
    pub fn kind(&self) -> Option<NodeKind> {
        match &*self.location {
            TreeLocation::Positional { path, .. } => path.leaf(),
            TreeLocation::Indexed { kind, .. } => Some(*kind),
            TreeLocation::ElementOnly { element } => declaration_node_kind(element.kind()),
        }
    }

    /// Source file, when the handle was created from a tree.
    pub fn file(&self) -> Option<&str> {
        match &*self.location {
            TreeLocation::Positional { file, .. } => Some(file),
            TreeLocation::Indexed { parent, .. } => parent.file(),
            TreeLocation::ElementOnly { .. } => None,
        }
    }

    /// Handle of the enclosing declaration.
    pub fn element_handle(&self) -> Option<&ElementHandle> {
        match &*self.location {
            TreeLocation::Positional { anchor, .. } => anchor.as_ref(),
            TreeLocation::Indexed { parent, .. } => parent.element_handle(),
            TreeLocation::ElementOnly { element } => Some(element),
        }
    }
}

/// Nearest declaration at or above `node` that is positioned and has a
/// handle, with the start of its node.
fn anchor_of<C>(pool: &InternPool, ctx: &C, node: NodeId) -> Option<(ElementHandle, u32)>
where
    C: CompilationContext + ?Sized,
{
    let mut current = Some(node);
    while let Some(n) = current {
        current = ctx.parent(n);
        if !ctx.node_kind(n).is_declaration() {
            continue;
        }
        let (Some(span), Some(decl)) = (ctx.span(n), ctx.declared_by(n)) else {
            continue;
        };
        // Locals and parameters have no handle; keep walking.
        if let Ok(handle) = ElementHandle::create(pool, ctx, decl) {
            return Some((handle, span.start));
        }
    }
    None
}

fn resolve_positional<C>(
    ctx: &C,
    anchor: Option<&ElementHandle>,
    file: &str,
    anchor_start: u32,
    offset: u32,
    path: &KindPath,
) -> Option<NodeId>
where
    C: CompilationContext + ?Sized,
{
    let (root, delta) = match anchor {
        Some(anchor) => {
            let node = ctx.tree_of(anchor.resolve(ctx)?)?;
            let start = ctx.span(node)?.start;
            (node, i64::from(start) - i64::from(anchor_start))
        }
        None => (ctx.compilation_unit(file)?, 0),
    };
    let unit = unit_of(ctx, root);

    let rebased = u32::try_from(i64::from(offset) + delta).ok();
    let mut candidates: SmallVec<[u32; 4]> = SmallVec::new();
    for base in rebased.into_iter().chain([offset]) {
        for candidate in [Some(base), base.checked_add(1)].into_iter().flatten() {
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }

    for candidate in candidates {
        tracing::trace!(candidate, "trying offset");
        if let Some(found) = match_at(ctx, unit, root, candidate, path) {
            return Some(found);
        }
    }
    tracing::debug!(offset, delta, "no node with a matching kind path");
    None
}

/// Ancestor of the innermost node at `offset` whose kind path is `path`,
/// provided it lies inside `root`.
fn match_at<C>(ctx: &C, unit: NodeId, root: NodeId, offset: u32, path: &KindPath) -> Option<NodeId>
where
    C: Trees + ?Sized,
{
    let mut matched = None;
    let mut current = ctx.node_at(unit, offset);
    while let Some(node) = current {
        if matched.is_none() && KindPath::of(ctx, node) == *path {
            matched = Some(node);
        }
        if node == root {
            return matched;
        }
        current = ctx.parent(node);
    }
    None
}

fn unit_of<C: Trees + ?Sized>(ctx: &C, node: NodeId) -> NodeId {
    let mut current = node;
    while let Some(parent) = ctx.parent(current) {
        current = parent;
    }
    current
}

fn declaration_node_kind(kind: DeclKind) -> Option<NodeKind> {
    match kind {
        DeclKind::Package => Some(NodeKind::Package),
        DeclKind::Class => Some(NodeKind::Class),
        DeclKind::Interface => Some(NodeKind::Interface),
        DeclKind::Enum => Some(NodeKind::Enum),
        DeclKind::AnnotationType => Some(NodeKind::AnnotationType),
        DeclKind::Record => Some(NodeKind::Record),
        DeclKind::Method | DeclKind::Constructor => Some(NodeKind::Method),
        DeclKind::Field | DeclKind::EnumConstant | DeclKind::RecordComponent => Some(NodeKind::Variable),
        DeclKind::StaticInit | DeclKind::InstanceInit => Some(NodeKind::Block),
        DeclKind::TypeParameter => Some(NodeKind::TypeParameter),
        DeclKind::Module
        | DeclKind::Parameter
        | DeclKind::LocalVariable
        | DeclKind::ExceptionParameter
        | DeclKind::ResourceVariable
        | DeclKind::BindingVariable
        | DeclKind::Other => None,
    }
}

#[cfg(test)]
mod tests;
