use pretty_assertions::assert_eq;
use tether_model::memory::{MemoryContext, Workspace};
use tether_model::{NodeKind, Trees};

use super::*;

const SOURCE: &str = "package p;
import java.util.List;
public class Shapes<T extends Number> {
    public static final int SIDES = 4;
    static { int s = SIDES; }
    { }
    private List<T> items;
    public Shapes() {}
    public Shapes(int capacity) {}
    void add(int x) {}
    void add(String x) {}
    <R> R first(List<R> values) { return null; }
    public enum Color { RED, GREEN }
    record Point(int x, int y) {}
    @interface Marker {}
    interface Visitor { void visit(Shapes<?> shapes); }
}";

fn workspace() -> Workspace {
    Workspace::with_files([("p/Shapes.java", SOURCE)])
}

fn open(workspace: &Workspace) -> MemoryContext {
    workspace.open().unwrap_or_else(|err| panic!("open failed: {err}"))
}

fn handle(pool: &InternPool, ctx: &MemoryContext, decl: DeclId) -> ElementHandle {
    ElementHandle::create(pool, ctx, decl).unwrap_or_else(|err| panic!("create failed: {err}"))
}

/// Every declaration with a signature, walked from the top-level type.
fn declarations(ctx: &MemoryContext) -> Vec<DeclId> {
    let mut out = Vec::new();
    let mut pending = vec![ctx.find_type("p.Shapes").unwrap_or_else(|| panic!("no Shapes"))];
    while let Some(decl) = pending.pop() {
        out.push(decl);
        out.extend(ctx.type_parameters(decl));
        for member in ctx.members(decl).unwrap_or_default() {
            if ctx.decl_kind(member).is_type() {
                pending.push(member);
            } else {
                out.push(member);
                out.extend(ctx.type_parameters(member));
            }
        }
    }
    out
}

#[test]
fn test_round_trip_every_kind() {
    let ws = workspace();
    ws.add_module("m.core");
    let ctx = open(&ws);
    let pool = InternPool::new();
    let decls = declarations(&ctx);

    let mut kinds: Vec<DeclKind> = decls.iter().map(|&d| ctx.decl_kind(d)).collect();
    kinds.sort();
    kinds.dedup();
    for expected in [
        DeclKind::Class,
        DeclKind::Interface,
        DeclKind::Enum,
        DeclKind::AnnotationType,
        DeclKind::Record,
        DeclKind::Method,
        DeclKind::Constructor,
        DeclKind::Field,
        DeclKind::EnumConstant,
        DeclKind::RecordComponent,
        DeclKind::StaticInit,
        DeclKind::InstanceInit,
        DeclKind::TypeParameter,
    ] {
        assert!(kinds.contains(&expected), "no {expected} in the fixture");
    }

    for decl in decls {
        let h = handle(&pool, &ctx, decl);
        assert_eq!(h.resolve(&ctx), Some(decl), "round trip of {h}");
    }

    let package = ctx.lookup(Namespace::Package, "p").unwrap_or_else(|| panic!("no p"));
    assert_eq!(handle(&pool, &ctx, package).resolve(&ctx), Some(package));

    let module = ctx
        .lookup(Namespace::Module, "m.core")
        .unwrap_or_else(|| panic!("no module m.core"));
    let h = handle(&pool, &ctx, module);
    assert_eq!(h.kind(), DeclKind::Module);
    assert_eq!(h.resolve(&ctx), Some(module));
    let named = ElementHandle::for_module(&pool, "m.core")
        .unwrap_or_else(|err| panic!("bad module handle: {err}"));
    assert_eq!(named, h);
    assert!(named.resolve(&open(&ws)).is_some());
}

#[test]
fn test_handles_survive_a_new_context() {
    let ws = workspace();
    let pool = InternPool::new();
    let first = open(&ws);
    let handles: Vec<ElementHandle> = declarations(&first)
        .into_iter()
        .map(|d| handle(&pool, &first, d))
        .collect();

    let second = open(&ws);
    for h in &handles {
        let decl = h.resolve(&second).unwrap_or_else(|| panic!("{h} lost"));
        assert_eq!(&handle(&pool, &second, decl), h);
        assert!(h.signature_equals_decl(&second, decl));
    }
}

#[test]
fn test_overloads_resolve_by_descriptor() {
    let ws = workspace();
    let ctx = open(&ws);
    let pool = InternPool::new();
    let shapes = ctx.find_type("p.Shapes").unwrap_or_else(|| panic!("no Shapes"));
    let adds: Vec<DeclId> = ctx
        .members(shapes)
        .unwrap_or_default()
        .into_iter()
        .filter(|&m| &*ctx.simple_name(m) == "add")
        .collect();
    assert_eq!(adds.len(), 2);

    let by_int = ElementHandle::from_signature(
        &pool,
        Signature::new(DeclKind::Method, ["p.Shapes", "add", "(I)V"]).unwrap_or_else(|e| panic!("{e}")),
    );
    let by_string = ElementHandle::from_signature(
        &pool,
        Signature::new(DeclKind::Method, ["p.Shapes", "add", "(Ljava/lang/String;)V"])
            .unwrap_or_else(|e| panic!("{e}")),
    );
    assert_eq!(by_int.resolve(&ctx), Some(adds[0]));
    assert_eq!(by_string.resolve(&ctx), Some(adds[1]));

    let missing = ElementHandle::from_signature(
        &pool,
        Signature::new(DeclKind::Method, ["p.Shapes", "add", "(J)V"]).unwrap_or_else(|e| panic!("{e}")),
    );
    assert_eq!(missing.resolve(&ctx), None);
}

#[test]
fn test_deleted_declaration_resolves_to_none() {
    let ws = workspace();
    let pool = InternPool::new();
    let before = open(&ws);
    let shapes = before.find_type("p.Shapes").unwrap_or_else(|| panic!("no Shapes"));
    let items = handle(&pool, &before, before.find_member(shapes, "items").unwrap_or_else(|| panic!("no items")));
    let color = handle(&pool, &before, before.find_member(shapes, "Color").unwrap_or_else(|| panic!("no Color")));

    ws.set_file("p/Shapes.java", &SOURCE.replace("    private List<T> items;\n", ""));
    let after = open(&ws);
    assert_eq!(items.resolve(&after), None);
    assert!(color.resolve(&after).is_some());

    assert!(ws.remove_file("p/Shapes.java").is_ok());
    let empty = open(&ws);
    assert_eq!(color.resolve(&empty), None);
}

#[test]
fn test_changed_kind_resolves_to_none() {
    let pool = InternPool::new();
    let ws = Workspace::with_files([("q/A.java", "package q; class A {}")]);
    let before = open(&ws);
    let a = handle(&pool, &before, before.find_type("q.A").unwrap_or_else(|| panic!("no A")));
    ws.set_file("q/A.java", "package q; interface A {}");
    assert_eq!(a.resolve(&open(&ws)), None);
}

#[test]
fn test_locals_fail_at_construction() {
    let ctx = MemoryContext::from_sources(&[("A.java", "class A { void m(int p) { int x = p; } }")]);
    let pool = InternPool::new();
    for (needle, kind) in [("x =", DeclKind::LocalVariable), ("int p", DeclKind::Parameter)] {
        let node = ctx
            .find_node("A.java", needle, NodeKind::Variable)
            .unwrap_or_else(|| panic!("no {needle}"));
        let decl = ctx.declared_by(node).unwrap_or_else(|| panic!("{needle} not declared"));
        assert_eq!(
            ElementHandle::create(&pool, &ctx, decl),
            Err(HandleError::UnsupportedDeclaration { kind })
        );
    }
}

#[test]
fn test_stub_members_are_synthesised() {
    let ws = Workspace::new();
    assert!(ws.add_stub("lib.Remote", DeclKind::Class).is_ok());
    let pool = InternPool::new();
    let call = ElementHandle::from_signature(
        &pool,
        Signature::new(DeclKind::Method, ["lib.Remote", "call", "(I)V"]).unwrap_or_else(|e| panic!("{e}")),
    );

    let first = open(&ws);
    let a = call.resolve(&first).unwrap_or_else(|| panic!("no placeholder"));
    // Synthesised once per context.
    assert_eq!(call.resolve(&first), Some(a));
    assert_eq!(first.decl_kind(a), DeclKind::Method);
    assert_eq!(&handle(&pool, &first, a), &call);

    // A second context builds its own placeholder with the same identity.
    let second = open(&ws);
    let b = call.resolve(&second).unwrap_or_else(|| panic!("no placeholder"));
    assert!(handle(&pool, &second, b).signature_equals(&handle(&pool, &first, a)));
    assert!(ElementHandle::is_same_entity(&second, &call, &handle(&pool, &second, b)));
}

#[test]
fn test_pseudo_declarations() {
    let ctx = MemoryContext::from_sources(&[]);
    let pool = InternPool::new();
    let array = ctx.pseudo_declaration(Pseudo::ArrayClass);
    let clone = ctx.find_member(array, "clone").unwrap_or_else(|| panic!("no clone"));
    let h = handle(&pool, &ctx, clone);
    assert_eq!(h.binary_name(), Some("["));
    assert_eq!(h.resolve(&ctx), Some(clone));

    let none = ctx.pseudo_declaration(Pseudo::NoSymbol);
    assert_eq!(handle(&pool, &ctx, none).resolve(&ctx), Some(none));
}

#[test]
fn test_cross_kind_equivalence() {
    let pool = InternPool::new();
    let approximate = ElementHandle::for_type(&pool, DeclKind::Other, "p.Missing").unwrap_or_else(|e| panic!("{e}"));
    let class = ElementHandle::for_type(&pool, DeclKind::Class, "p.Missing").unwrap_or_else(|e| panic!("{e}"));
    let field = ElementHandle::from_signature(
        &pool,
        Signature::new(DeclKind::Field, ["p.Missing", "f", "I"]).unwrap_or_else(|e| panic!("{e}")),
    );
    assert_ne!(approximate, class);
    assert!(approximate.signature_equals(&class));
    assert!(class.signature_equals(&approximate));
    assert!(!field.signature_equals(&class));
    assert!(ElementHandle::for_type(&pool, DeclKind::Method, "p.Missing").is_err());
}

#[test]
fn test_interning_and_names() {
    let ws = workspace();
    let ctx = open(&ws);
    let pool = InternPool::new();
    let color = ctx.find_type("p.Shapes$Color").unwrap_or_else(|| panic!("no Color"));
    let a = handle(&pool, &ctx, color);
    let b = ElementHandle::for_type(&pool, DeclKind::Enum, "p.Shapes$Color").unwrap_or_else(|e| panic!("{e}"));
    assert!(ElementHandle::ptr_eq(&a, &b));
    assert_eq!(a.qualified_name(), "p.Shapes.Color");
    assert_eq!(a.to_string(), "enum p.Shapes$Color");

    let red = handle(&pool, &ctx, ctx.find_member(color, "RED").unwrap_or_else(|| panic!("no RED")));
    assert_eq!(red.binary_name(), Some("p.Shapes$Color"));
    assert_eq!(red.to_string(), "enum constant p.Shapes$Color.RED:Lp/Shapes$Color;");

    let package = ElementHandle::for_package(&pool, "p").unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(package.binary_name(), None);
    assert_eq!(package.qualified_name(), "p");
}

#[test]
fn test_handles_are_thread_safe_values() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ElementHandle>();
    assert_send_sync::<InternPool>();
}
