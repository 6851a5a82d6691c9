//! Signature codec: a declaration's identity as kind-tagged strings.
//!
//! | Kind | Parts |
//! |------|-------|
//! | package, module, type, other | `[name]` |
//! | method, constructor | `[owner, name, descriptor]` |
//! | field, enum constant, record component | `[owner, name, descriptor]` |
//! | static / instance initializer | `[owner, ordinal]` |
//! | type parameter of a type | `[owner, name]` |
//! | type parameter of a method | `[owner, method, descriptor, name]` |
//!
//! Types are named by binary name (`pkg.Outer$Inner`). Two owner names are
//! reserved: `""` is the "no symbol" sentinel and `"["` the array
//! pseudo-class.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;
use tether_model::{DeclId, DeclKind, Pseudo, Symbols, TypeOps};

use crate::descriptor::{method_descriptor, type_descriptor};
use crate::error::HandleError;

/// Owner name of the array pseudo-class.
pub(crate) const ARRAY_CLASS: &str = "[";

/// Name of the "no symbol" sentinel.
pub(crate) const NO_SYMBOL: &str = "";

/// Immutable encoded identity of a declaration.
///
/// Equality is structural and kind-exact; the looser cross-kind rule lives
/// in [`crate::ElementHandle::signature_equals`].
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Signature {
    kind: DeclKind,
    parts: SmallVec<[Arc<str>; 4]>,
}

impl Signature {
    /// Build a signature, checking the part count against `kind`.
    pub fn new<I, S>(kind: DeclKind, parts: I) -> Result<Self, HandleError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        let parts: SmallVec<[Arc<str>; 4]> = parts.into_iter().map(Into::into).collect();
        let found = parts.len();
        let valid = match arity(kind)? {
            Arity::Exactly(n) => found == n,
            Arity::TypeParameter => found == 2 || found == 4,
        };
        if !valid {
            let expected = match arity(kind)? {
                Arity::Exactly(n) => n,
                Arity::TypeParameter if found > 2 => 4,
                Arity::TypeParameter => 2,
            };
            return Err(HandleError::SignatureArity {
                kind,
                expected,
                found,
            });
        }
        Ok(Signature { kind, parts })
    }

    /// Encode a live declaration.
    #[tracing::instrument(level = "trace", skip(ctx))]
    pub fn encode<C>(ctx: &C, decl: DeclId) -> Result<Self, HandleError>
    where
        C: Symbols + TypeOps + ?Sized,
    {
        let kind = ctx.decl_kind(decl);
        let parts: SmallVec<[Arc<str>; 4]> = match kind {
            DeclKind::Package | DeclKind::Module => smallvec::smallvec![ctx.qualified_name(decl)],
            DeclKind::Other => smallvec::smallvec![ctx.simple_name(decl)],
            k if k.is_type() => smallvec::smallvec![type_name(ctx, decl)?],
            k if k.is_executable() || k.is_field() => {
                let owner = owner_name(ctx, decl)?;
                smallvec::smallvec![owner, ctx.simple_name(decl), member_descriptor(ctx, decl)]
            }
            k if k.is_initializer() => {
                let owner = ctx.enclosing(decl).ok_or(HandleError::MissingBinaryName)?;
                let ordinal = ctx
                    .members(owner)
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|&m| ctx.decl_kind(m) == kind)
                    .position(|m| m == decl)
                    .ok_or(HandleError::DetachedInitializer { kind })?;
                smallvec::smallvec![type_name(ctx, owner)?, Arc::from(ordinal.to_string())]
            }
            DeclKind::TypeParameter => type_parameter_parts(ctx, decl)?,
            _ => return Err(HandleError::UnsupportedDeclaration { kind }),
        };
        Signature::new(kind, parts)
    }

    #[inline]
    pub fn kind(&self) -> DeclKind {
        self.kind
    }

    #[inline]
    pub fn parts(&self) -> &[Arc<str>] {
        &self.parts
    }

    pub(crate) fn part(&self, index: usize) -> &str {
        self.parts.get(index).map_or("", |part| &**part)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({:?}", self.kind)?;
        for part in &self.parts {
            write!(f, ", {part:?}")?;
        }
        f.write_str(")")
    }
}

enum Arity {
    Exactly(usize),
    TypeParameter,
}

fn arity(kind: DeclKind) -> Result<Arity, HandleError> {
    match kind {
        DeclKind::Package | DeclKind::Module | DeclKind::Other => Ok(Arity::Exactly(1)),
        k if k.is_type() => Ok(Arity::Exactly(1)),
        k if k.is_executable() || k.is_field() => Ok(Arity::Exactly(3)),
        k if k.is_initializer() => Ok(Arity::Exactly(2)),
        DeclKind::TypeParameter => Ok(Arity::TypeParameter),
        _ => Err(HandleError::UnsupportedDeclaration { kind }),
    }
}

/// Binary name of a type, with the reserved names for pseudo declarations.
pub(crate) fn type_name<C>(ctx: &C, decl: DeclId) -> Result<Arc<str>, HandleError>
where
    C: Symbols + ?Sized,
{
    if decl == ctx.pseudo_declaration(Pseudo::ArrayClass) {
        return Ok(Arc::from(ARRAY_CLASS));
    }
    if decl == ctx.pseudo_declaration(Pseudo::NoSymbol) {
        return Ok(Arc::from(NO_SYMBOL));
    }
    ctx.binary_name(decl).ok_or(HandleError::MissingBinaryName)
}

fn owner_name<C>(ctx: &C, decl: DeclId) -> Result<Arc<str>, HandleError>
where
    C: Symbols + ?Sized,
{
    let owner = ctx.enclosing(decl).ok_or(HandleError::MissingBinaryName)?;
    type_name(ctx, owner)
}

/// Descriptor of a method or field, preferring the one recorded on a
/// synthesised placeholder.
pub(crate) fn member_descriptor<C>(ctx: &C, decl: DeclId) -> Arc<str>
where
    C: Symbols + TypeOps + ?Sized,
{
    if let Some(recorded) = ctx.recorded_descriptor(decl) {
        return recorded;
    }
    let descriptor = if ctx.decl_kind(decl).is_executable() {
        method_descriptor(ctx, decl)
    } else {
        type_descriptor(ctx, ctx.type_of(decl))
    };
    Arc::from(descriptor)
}

fn type_parameter_parts<C>(ctx: &C, decl: DeclId) -> Result<SmallVec<[Arc<str>; 4]>, HandleError>
where
    C: Symbols + TypeOps + ?Sized,
{
    let owner = ctx.enclosing(decl).ok_or(HandleError::MissingBinaryName)?;
    let owner_kind = ctx.decl_kind(owner);
    let name = ctx.simple_name(decl);
    if owner_kind.is_type() {
        return Ok(smallvec::smallvec![type_name(ctx, owner)?, name]);
    }
    if owner_kind.is_executable() {
        return Ok(smallvec::smallvec![
            owner_name(ctx, owner)?,
            ctx.simple_name(owner),
            member_descriptor(ctx, owner),
            name,
        ]);
    }
    Err(HandleError::UnsupportedTypeParameterOwner { owner: owner_kind })
}
