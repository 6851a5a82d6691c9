//! `ElementHandle`: a declaration that outlives its compilation pass.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tether_model::{CompilationContext, DeclId, DeclKind, Namespace, Pseudo, Symbols, TypeOps};

use crate::error::HandleError;
use crate::intern::InternPool;
use crate::signature::{member_descriptor, Signature, ARRAY_CLASS, NO_SYMBOL};

/// Durable reference to a declaration.
///
/// Cheap to clone and safe to send between threads. Holds nothing but the
/// interned [`Signature`].
#[derive(Clone)]
pub struct ElementHandle {
    signature: Arc<Signature>,
}

impl ElementHandle {
    /// Capture a live declaration.
    ///
    /// Fails for declarations without a stable signature, such as locals
    /// and parameters.
    pub fn create<C>(pool: &InternPool, ctx: &C, decl: DeclId) -> Result<Self, HandleError>
    where
        C: CompilationContext + ?Sized,
    {
        let signature = Signature::encode(ctx, decl)?;
        Ok(ElementHandle::from_signature(pool, signature))
    }

    /// Handle for a type known only by binary name.
    pub fn for_type(pool: &InternPool, kind: DeclKind, binary_name: &str) -> Result<Self, HandleError> {
        if !kind.is_type() && kind != DeclKind::Other {
            return Err(HandleError::UnsupportedDeclaration { kind });
        }
        Ok(ElementHandle::from_signature(pool, Signature::new(kind, [binary_name])?))
    }

    pub fn for_package(pool: &InternPool, name: &str) -> Result<Self, HandleError> {
        Ok(ElementHandle::from_signature(pool, Signature::new(DeclKind::Package, [name])?))
    }

    pub fn for_module(pool: &InternPool, name: &str) -> Result<Self, HandleError> {
        Ok(ElementHandle::from_signature(pool, Signature::new(DeclKind::Module, [name])?))
    }

    pub fn from_signature(pool: &InternPool, signature: Signature) -> Self {
        ElementHandle {
            signature: pool.signature(signature),
        }
    }

    /// Find the declaration in `ctx`, or `None` if it no longer exists.
    #[tracing::instrument(level = "debug", skip_all, fields(handle = %self))]
    pub fn resolve<C>(&self, ctx: &C) -> Option<DeclId>
    where
        C: CompilationContext + ?Sized,
    {
        let resolved = resolve_signature(ctx, &self.signature);
        if resolved.is_none() {
            tracing::debug!("declaration not found");
        }
        resolved
    }

    #[inline]
    pub fn kind(&self) -> DeclKind {
        self.signature.kind()
    }

    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Binary name of the type, or of the owner type of a member.
    pub fn binary_name(&self) -> Option<&str> {
        match self.kind() {
            DeclKind::Package | DeclKind::Module | DeclKind::Other => None,
            _ => Some(self.signature.part(0)),
        }
    }

    /// Source spelling of [`Self::binary_name`]; the name itself for
    /// packages and modules.
    pub fn qualified_name(&self) -> String {
        match self.binary_name() {
            Some(binary) => binary.replace('$', "."),
            None => self.signature.part(0).to_string(),
        }
    }

    /// Same logical entity: equal parts and equal or equivalent kinds.
    pub fn signature_equals(&self, other: &ElementHandle) -> bool {
        Arc::ptr_eq(&self.signature, &other.signature)
            || (kinds_equivalent(self.kind(), other.kind())
                && self.signature.parts() == other.signature.parts())
    }

    /// [`Self::signature_equals`] against a live declaration, without
    /// creating a handle for it.
    pub fn signature_equals_decl<C>(&self, ctx: &C, decl: DeclId) -> bool
    where
        C: CompilationContext + ?Sized,
    {
        Signature::encode(ctx, decl).is_ok_and(|encoded| {
            kinds_equivalent(self.kind(), encoded.kind()) && self.signature.parts() == encoded.parts()
        })
    }

    /// Both handles resolve to the same declaration of `ctx`.
    pub fn is_same_entity<C>(ctx: &C, a: &ElementHandle, b: &ElementHandle) -> bool
    where
        C: CompilationContext + ?Sized,
    {
        match (a.resolve(ctx), b.resolve(ctx)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /// Whether both handles share one interned signature.
    #[inline]
    pub fn ptr_eq(a: &ElementHandle, b: &ElementHandle) -> bool {
        Arc::ptr_eq(&a.signature, &b.signature)
    }
}

/// Kinds a signature may match across. A declaration that could only be
/// resolved approximately (`Other`) stands in for a package or a type.
pub fn kinds_equivalent(a: DeclKind, b: DeclKind) -> bool {
    let approximates = |k: DeclKind| k == DeclKind::Package || k.is_type();
    a == b
        || (a == DeclKind::Other && approximates(b))
        || (b == DeclKind::Other && approximates(a))
}

impl PartialEq for ElementHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.signature, &other.signature) || self.signature == other.signature
    }
}

impl Eq for ElementHandle {}

impl Hash for ElementHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.signature.hash(state);
    }
}

impl fmt::Debug for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementHandle({:?})", self.signature)
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sig = &self.signature;
        let kind = sig.kind();
        write!(f, "{kind} ")?;
        match kind {
            k if k.is_executable() => write!(f, "{}.{}{}", sig.part(0), sig.part(1), sig.part(2)),
            k if k.is_field() => write!(f, "{}.{}:{}", sig.part(0), sig.part(1), sig.part(2)),
            k if k.is_initializer() => write!(f, "{}#{}", sig.part(0), sig.part(1)),
            DeclKind::TypeParameter if sig.parts().len() == 4 => write!(
                f,
                "{}.{}{}<{}>",
                sig.part(0),
                sig.part(1),
                sig.part(2),
                sig.part(3)
            ),
            DeclKind::TypeParameter => write!(f, "{}<{}>", sig.part(0), sig.part(1)),
            _ => f.write_str(sig.part(0)),
        }
    }
}

// ===== Resolution =====

pub(crate) fn resolve_signature<C>(ctx: &C, signature: &Signature) -> Option<DeclId>
where
    C: CompilationContext + ?Sized,
{
    let kind = signature.kind();
    match kind {
        DeclKind::Package => ctx.lookup(Namespace::Package, signature.part(0)),
        DeclKind::Module => ctx.lookup(Namespace::Module, signature.part(0)),
        DeclKind::Other => resolve_type_name(ctx, signature.part(0)),
        k if k.is_type() => {
            let decl = resolve_type_name(ctx, signature.part(0))?;
            let found = ctx.decl_kind(decl);
            if kinds_equivalent(kind, found) {
                Some(decl)
            } else {
                tracing::debug!(%found, "type changed kind");
                None
            }
        }
        k if k.is_executable() || k.is_field() => {
            let owner = resolve_type_name(ctx, signature.part(0))?;
            find_member(ctx, owner, kind, signature.part(1), signature.part(2))
        }
        k if k.is_initializer() => {
            let owner = resolve_type_name(ctx, signature.part(0))?;
            let ordinal: usize = signature.part(1).parse().ok()?;
            ctx.members(owner)?
                .into_iter()
                .filter(|&m| ctx.decl_kind(m) == kind)
                .nth(ordinal)
        }
        DeclKind::TypeParameter => {
            let owner = resolve_type_name(ctx, signature.part(0))?;
            let (holder, name) = if signature.parts().len() == 4 {
                let method = [DeclKind::Method, DeclKind::Constructor]
                    .into_iter()
                    .find_map(|k| {
                        find_member(ctx, owner, k, signature.part(1), signature.part(2))
                    })?;
                (method, signature.part(3))
            } else {
                (owner, signature.part(1))
            };
            ctx.type_parameters(holder)
                .into_iter()
                .find(|&p| &*ctx.simple_name(p) == name)
        }
        _ => None,
    }
}

fn resolve_type_name<C>(ctx: &C, name: &str) -> Option<DeclId>
where
    C: Symbols + ?Sized,
{
    match name {
        ARRAY_CLASS => Some(ctx.pseudo_declaration(Pseudo::ArrayClass)),
        NO_SYMBOL => Some(ctx.pseudo_declaration(Pseudo::NoSymbol)),
        _ => ctx.lookup(Namespace::Type, name),
    }
}

/// Member of `owner` matching kind, name and descriptor exactly.
///
/// An owner known only as a binary stub has no member list; a placeholder
/// member is synthesised for it instead.
fn find_member<C>(ctx: &C, owner: DeclId, kind: DeclKind, name: &str, descriptor: &str) -> Option<DeclId>
where
    C: Symbols + TypeOps + ?Sized,
{
    let Some(members) = ctx.members(owner) else {
        tracing::trace!(name, descriptor, "owner is a binary stub");
        return Some(ctx.synthesize_member(owner, kind, name, descriptor));
    };
    members.into_iter().find(|&member| {
        ctx.decl_kind(member) == kind
            && &*ctx.simple_name(member) == name
            && &*member_descriptor(ctx, member) == descriptor
    })
}

#[cfg(test)]
mod tests;
