use pretty_assertions::assert_eq;
use tether_model::memory::{MemoryContext, Workspace};
use tether_model::{Namespace, Symbols, TypeOps};

use super::*;

const SOURCE: &str = "package q;
import java.util.List;
public class Outer<T> {
    class Inner {}
    Inner inner;
    List<? extends Number> numbers;
    int[][] grid;
    String name;
    Missing missing;
    Helper helper;
    <V extends Comparable<V>> V max(List<V> values) { return null; }
}";

const HELPER: &str = "package q;
class Helper {}";

fn workspace() -> Workspace {
    Workspace::with_files([("q/Outer.java", SOURCE), ("q/Helper.java", HELPER)])
}

fn open(workspace: &Workspace) -> MemoryContext {
    workspace.open().unwrap_or_else(|err| panic!("open failed: {err}"))
}

fn outer(ctx: &MemoryContext) -> DeclId {
    ctx.find_type("q.Outer").unwrap_or_else(|| panic!("no Outer"))
}

fn field_type(ctx: &MemoryContext, name: &str) -> TypeId {
    let field = ctx
        .find_member(outer(ctx), name)
        .unwrap_or_else(|| panic!("no member {name}"));
    ctx.type_of(field)
}

fn capture(pool: &InternPool, ctx: &MemoryContext, ty: TypeId) -> TypeHandle {
    TypeHandle::create(pool, ctx, ty).unwrap_or_else(|err| panic!("create failed: {err}"))
}

#[test]
fn test_self_referential_bound_terminates() {
    let ws = workspace();
    let ctx = open(&ws);
    let pool = InternPool::new();
    let enum_decl = ctx.find_type("java.lang.Enum").unwrap_or_else(|| panic!("no Enum"));

    let handle = capture(&pool, &ctx, ctx.type_of(enum_decl));
    let graph = handle.descriptor();

    // Enum<E>, E extends Enum<E>, and the Enum<E> in the bound.
    assert_eq!(graph.len(), 3);
    let TypeNode::Declared { args, .. } = graph.root() else {
        panic!("expected a declared root, got {:?}", graph.root());
    };
    assert_eq!(args, &vec![TypeRef(1)]);
    let Some(TypeNode::TypeVar { upper: Some(upper), .. }) = graph.node(TypeRef(1)) else {
        panic!("expected a type variable at #1");
    };
    let Some(TypeNode::Declared { args, .. }) = graph.node(*upper) else {
        panic!("expected the bound to be declared");
    };
    assert_eq!(args, &vec![TypeRef(1)]);

    let resolved = handle.resolve(&ctx).unwrap_or_else(|| panic!("Enum did not resolve"));
    assert!(ctx.is_same_type(resolved, ctx.type_of(enum_decl)));

    // The bound of the rebuilt E names the same E, not a copy.
    let TypeData::Declared { args, .. } = ctx.type_data(resolved) else {
        panic!("expected a declared type");
    };
    let var = args[0];
    let TypeData::TypeVar { upper: Some(upper), .. } = ctx.type_data(var) else {
        panic!("expected a type variable");
    };
    let TypeData::Declared { args: bound_args, .. } = ctx.type_data(upper) else {
        panic!("expected a declared bound");
    };
    assert_eq!(bound_args, vec![var]);
    assert_eq!(handle.to_string(), "java.lang.Enum<E>");
}

#[test]
fn test_method_type_variable_bound_refers_back() {
    let ws = workspace();
    let ctx = open(&ws);
    let pool = InternPool::new();
    let max = ctx
        .find_member(outer(&ctx), "max")
        .unwrap_or_else(|| panic!("no max"));
    let param = ctx.type_parameters(max)[0];

    let handle = capture(&pool, &ctx, ctx.type_of(param));
    assert_eq!(handle.kind(), TypeKind::TypeVar);
    assert_eq!(
        handle.element_handle().map(ElementHandle::kind),
        Some(DeclKind::TypeParameter)
    );
    let Some(TypeNode::Declared { args, .. }) = handle.descriptor().node(TypeRef(1)) else {
        panic!("expected Comparable<V> at #1");
    };
    assert_eq!(args, &vec![TypeRef::ROOT]);

    let later = open(&ws);
    let resolved = handle.resolve(&later).unwrap_or_else(|| panic!("V did not resolve"));
    let later_max = later
        .find_member(outer(&later), "max")
        .unwrap_or_else(|| panic!("no max"));
    assert!(later.is_same_type(resolved, later.type_of(later.type_parameters(later_max)[0])));
    assert_eq!(handle.to_string(), "V");
}

#[test]
fn test_field_types_round_trip() {
    let ws = workspace();
    let ctx = open(&ws);
    let pool = InternPool::new();
    let later = open(&ws);

    for name in ["inner", "numbers", "grid", "name", "helper"] {
        let ty = field_type(&ctx, name);
        let handle = capture(&pool, &ctx, ty);

        let same = handle.resolve(&ctx).unwrap_or_else(|| panic!("{name} did not resolve"));
        assert!(ctx.is_same_type(same, ty), "{name} changed in its own context");

        let moved = handle
            .resolve(&later)
            .unwrap_or_else(|| panic!("{name} did not resolve later"));
        assert!(
            later.is_same_type(moved, field_type(&later, name)),
            "{name} changed in a new context"
        );
    }
}

#[test]
fn test_inner_class_keeps_generic_outer() {
    let ws = workspace();
    let ctx = open(&ws);
    let pool = InternPool::new();

    let handle = capture(&pool, &ctx, field_type(&ctx, "inner"));
    let TypeNode::Declared { enclosing, args, .. } = handle.descriptor().root() else {
        panic!("expected a declared root");
    };
    assert!(args.is_empty());
    assert!(enclosing.is_some());
    assert_eq!(handle.to_string(), "q.Outer<T>.Inner");
}

#[test]
fn test_plain_type_is_nominal() {
    let ws = workspace();
    let ctx = open(&ws);
    let pool = InternPool::new();

    let handle = capture(&pool, &ctx, field_type(&ctx, "name"));
    assert_eq!(handle.descriptor().len(), 1);
    assert!(matches!(handle.descriptor().root(), TypeNode::Nominal(_)));
    assert_eq!(handle.kind(), TypeKind::Declared);
    assert_eq!(
        handle.element_handle().and_then(ElementHandle::binary_name),
        Some("java.lang.String")
    );
}

#[test]
fn test_display() {
    let ws = workspace();
    let ctx = open(&ws);
    let pool = InternPool::new();

    let shown = |name: &str| capture(&pool, &ctx, field_type(&ctx, name)).to_string();
    assert_eq!(shown("numbers"), "java.util.List<? extends java.lang.Number>");
    assert_eq!(shown("grid"), "int[][]");
    assert_eq!(shown("missing"), "Missing");
}

#[test]
fn test_executable_and_package_types_are_rejected() {
    let ws = workspace();
    let ctx = open(&ws);
    let pool = InternPool::new();

    let max = ctx
        .find_member(outer(&ctx), "max")
        .unwrap_or_else(|| panic!("no max"));
    assert_eq!(
        TypeHandle::create(&pool, &ctx, ctx.type_of(max)),
        Err(HandleError::UnsupportedType {
            kind: TypeKind::Executable
        })
    );

    let package = ctx
        .lookup(Namespace::Package, "q")
        .unwrap_or_else(|| panic!("no package q"));
    assert_eq!(
        TypeHandle::create(&pool, &ctx, ctx.type_of(package)),
        Err(HandleError::UnsupportedType {
            kind: TypeKind::Package
        })
    );
}

#[test]
fn test_deleted_declaration_does_not_resolve() {
    let ws = workspace();
    let ctx = open(&ws);
    let pool = InternPool::new();
    let handle = capture(&pool, &ctx, field_type(&ctx, "helper"));

    ws.remove_file("q/Helper.java")
        .unwrap_or_else(|err| panic!("remove failed: {err}"));
    let later = open(&ws);
    assert_eq!(handle.resolve(&later), None);
}

#[test]
fn test_error_type_survives() {
    let ws = workspace();
    let ctx = open(&ws);
    let pool = InternPool::new();

    let handle = capture(&pool, &ctx, field_type(&ctx, "missing"));
    assert_eq!(handle.kind(), TypeKind::Error);
    assert_eq!(handle.element_handle(), None);

    let later = open(&ws);
    let resolved = handle.resolve(&later).unwrap_or_else(|| panic!("error type dropped"));
    let TypeData::Error { name, decl } = later.type_data(resolved) else {
        panic!("expected an error type");
    };
    assert_eq!(&*name, "Missing");
    assert_eq!(decl, None);
}

#[test]
fn test_compound_picks_class_as_supertype() {
    let ws = workspace();
    let ctx = open(&ws);
    let pool = InternPool::new();
    let class_type = |ctx: &MemoryContext, binary: &str| {
        let decl = ctx.find_type(binary).unwrap_or_else(|| panic!("no {binary}"));
        ctx.type_of(decl)
    };

    let compound = ctx.intern(TypeData::Compound {
        supertype: class_type(&ctx, "java.lang.Number"),
        interfaces: vec![class_type(&ctx, "java.io.Serializable")],
    });
    let handle = capture(&pool, &ctx, compound);
    assert_eq!(handle.kind(), TypeKind::Declared);
    assert_eq!(handle.to_string(), "java.lang.Number & java.io.Serializable");

    let later = open(&ws);
    let resolved = handle.resolve(&later).unwrap_or_else(|| panic!("compound dropped"));
    let TypeData::Compound {
        supertype,
        interfaces,
    } = later.type_data(resolved)
    else {
        panic!("expected a compound type");
    };
    assert!(later.is_same_type(supertype, class_type(&later, "java.lang.Number")));
    assert_eq!(interfaces.len(), 1);
    assert!(later.is_same_type(interfaces[0], class_type(&later, "java.io.Serializable")));
}

#[test]
fn test_equal_types_share_one_graph() {
    let ws = workspace();
    let ctx = open(&ws);
    let later = open(&ws);
    let pool = InternPool::new();

    let a = capture(&pool, &ctx, field_type(&ctx, "numbers"));
    let b = capture(&pool, &later, field_type(&later, "numbers"));
    assert_eq!(a, b);
    assert!(TypeHandle::ptr_eq(&a, &b));
    assert_eq!(pool.types().live(), 1);
}

#[test]
fn test_deeply_nested_array() {
    const DEPTH: usize = 20_000;
    let ctx = MemoryContext::from_sources(&[]);
    let pool = InternPool::new();

    let mut ty = ctx.primitive(PrimitiveKind::ALL[0]);
    for _ in 0..DEPTH {
        ty = ctx.intern(TypeData::Array(ty));
    }
    let handle = capture(&pool, &ctx, ty);
    assert_eq!(handle.descriptor().len(), DEPTH + 1);

    let mut current = handle.resolve(&ctx).unwrap_or_else(|| panic!("deep array dropped"));
    let mut depth = 0;
    while let TypeData::Array(component) = ctx.type_data(current) {
        current = component;
        depth += 1;
    }
    assert_eq!(depth, DEPTH);
    assert_eq!(ctx.type_kind(current), TypeKind::Primitive(PrimitiveKind::ALL[0]));
}
