//! Erased type descriptors (`I`, `[Ljava/lang/String;`, `(IJ)V`).
//!
//! Member signatures carry descriptors instead of full generic types, so a
//! method keeps its identity when only its type arguments change, and
//! overloads still differ by parameter erasure.

use tether_model::{DeclId, Pseudo, Symbols, TypeData, TypeId, TypeOps};

const OBJECT: &str = "Ljava/lang/Object;";

/// Bound on the type-variable and bound chains followed during erasure.
const MAX_ERASURE_DEPTH: u32 = 32;

/// Descriptor of the erasure of `ty`.
pub fn type_descriptor<C>(ctx: &C, ty: TypeId) -> String
where
    C: Symbols + TypeOps + ?Sized,
{
    let mut out = String::new();
    erase_into(ctx, ty, &mut out, 0);
    out
}

/// Descriptor of an executable declaration: `(params)ret`.
///
/// Anything that is not executable gets the descriptor of a no-argument
/// `void` method.
pub fn method_descriptor<C>(ctx: &C, decl: DeclId) -> String
where
    C: Symbols + TypeOps + ?Sized,
{
    let mut out = String::from("(");
    match ctx.type_data(ctx.type_of(decl)) {
        TypeData::Executable { params, ret, .. } => {
            for param in params {
                erase_into(ctx, param, &mut out, 0);
            }
            out.push(')');
            erase_into(ctx, ret, &mut out, 0);
        }
        _ => out.push_str(")V"),
    }
    out
}

fn erase_into<C>(ctx: &C, ty: TypeId, out: &mut String, depth: u32)
where
    C: Symbols + TypeOps + ?Sized,
{
    if depth > MAX_ERASURE_DEPTH {
        out.push_str(OBJECT);
        return;
    }
    match ctx.type_data(ty) {
        TypeData::Primitive(p) => out.push(p.descriptor()),
        TypeData::Void => out.push('V'),
        TypeData::Array(component) => {
            out.push('[');
            erase_into(ctx, component, out, depth);
        }
        TypeData::Declared { decl, .. } => push_class(ctx, decl, out),
        TypeData::TypeVar { upper, .. } => erase_bound(ctx, upper, out, depth),
        TypeData::Wildcard { extends, .. } => erase_bound(ctx, extends, out, depth),
        TypeData::Intersection(bounds) | TypeData::Union(bounds) => {
            erase_bound(ctx, bounds.first().copied(), out, depth);
        }
        TypeData::Compound { supertype, .. } => erase_into(ctx, supertype, out, depth + 1),
        TypeData::Error { name, .. } if !name.is_empty() => {
            out.push('L');
            out.push_str(&name.replace('.', "/"));
            out.push(';');
        }
        TypeData::Error { .. }
        | TypeData::NoType
        | TypeData::Null
        | TypeData::Executable { .. }
        | TypeData::Package(_)
        | TypeData::Module(_) => out.push_str(OBJECT),
    }
}

fn erase_bound<C>(ctx: &C, bound: Option<TypeId>, out: &mut String, depth: u32)
where
    C: Symbols + TypeOps + ?Sized,
{
    match bound {
        Some(bound) => erase_into(ctx, bound, out, depth + 1),
        None => out.push_str(OBJECT),
    }
}

fn push_class<C>(ctx: &C, decl: DeclId, out: &mut String)
where
    C: Symbols + TypeOps + ?Sized,
{
    if decl == ctx.pseudo_declaration(Pseudo::ArrayClass) {
        out.push_str(OBJECT);
        return;
    }
    let binary = ctx
        .binary_name(decl)
        .unwrap_or_else(|| ctx.qualified_name(decl));
    out.push('L');
    out.push_str(&binary.replace('.', "/"));
    out.push(';');
}
