use pretty_assertions::assert_eq;
use tether_model::memory::{MemoryContext, Workspace};
use tether_model::{Namespace, Symbols};

use super::*;

const FILE: &str = "p/Counter.java";

const SOURCE: &str = "package p;
import java.util.List;
@Deprecated
public class Counter {
    private int total;
    public int add(int amount) {
        int next = total + amount;
        total = next;
        return next;
    }
    void touch() { var copy = total; }
}";

fn open(workspace: &Workspace) -> MemoryContext {
    workspace.open().unwrap_or_else(|err| panic!("open failed: {err}"))
}

fn node(ctx: &MemoryContext, needle: &str, kind: NodeKind) -> NodeId {
    ctx.find_node(FILE, needle, kind)
        .unwrap_or_else(|| panic!("no {kind:?} at {needle}"))
}

fn handle(pool: &InternPool, ctx: &MemoryContext, node: NodeId) -> TreePathHandle {
    TreePathHandle::create(pool, ctx, node).unwrap_or_else(|err| panic!("create failed: {err}"))
}

#[test]
fn test_round_trip_in_same_context() {
    let ws = Workspace::with_files([(FILE, SOURCE)]);
    let ctx = open(&ws);
    let pool = InternPool::new();
    for (needle, kind) in [
        ("public class", NodeKind::Class),
        ("private int total", NodeKind::Variable),
        ("total + amount", NodeKind::Binary),
        ("amount;", NodeKind::Identifier),
        ("return next", NodeKind::Return),
        ("int amount", NodeKind::Variable),
        ("import", NodeKind::Import),
    ] {
        let target = node(&ctx, needle, kind);
        let h = handle(&pool, &ctx, target);
        assert_eq!(h.kind(), Some(kind));
        assert_eq!(h.file(), Some(FILE));
        // Resolution is idempotent.
        assert_eq!(h.resolve(&ctx), Some(target), "{needle}");
        assert_eq!(h.resolve(&ctx), Some(target), "{needle}");
    }
}

#[test]
fn test_same_offset_nodes_are_told_apart() {
    let ws = Workspace::with_files([(FILE, SOURCE)]);
    let ctx = open(&ws);
    let pool = InternPool::new();
    let annotation = node(&ctx, "@Deprecated", NodeKind::Annotation);
    let modifiers = node(&ctx, "@Deprecated", NodeKind::Modifiers);
    let class = node(&ctx, "@Deprecated", NodeKind::Class);
    assert_eq!(ctx.span(annotation).map(|s| s.start), ctx.span(class).map(|s| s.start));
    let handles = [
        handle(&pool, &ctx, annotation),
        handle(&pool, &ctx, modifiers),
        handle(&pool, &ctx, class),
    ];

    // Shift everything down by an edit above the class.
    ws.set_file(FILE, &SOURCE.replace("import java.util.List;", "import java.util.List;\nimport java.util.Map;"));
    let edited = open(&ws);
    let resolved: Vec<Option<NodeKind>> = handles
        .iter()
        .map(|h| h.resolve(&edited).map(|n| edited.node_kind(n)))
        .collect();
    assert_eq!(
        resolved,
        vec![
            Some(NodeKind::Annotation),
            Some(NodeKind::Modifiers),
            Some(NodeKind::Class)
        ]
    );
}

#[test]
fn test_offsets_follow_the_anchor() {
    let ws = Workspace::with_files([(FILE, SOURCE)]);
    let pool = InternPool::new();
    let before = open(&ws);
    let target = node(&before, "total + amount", NodeKind::Binary);
    let h = handle(&pool, &before, target);
    let anchor = h.element_handle().unwrap_or_else(|| panic!("no anchor"));
    assert_eq!(anchor.kind(), DeclKind::Method);

    ws.set_file(
        FILE,
        &SOURCE.replace("private int total;", "private int total;\n    private int limit = 10;"),
    );
    let after = open(&ws);
    let found = h.resolve(&after).unwrap_or_else(|| panic!("lost the binary node"));
    assert_eq!(after.node_kind(found), NodeKind::Binary);
    let start = after.span(found).map(|s| s.start as usize);
    let text = after.source(FILE).unwrap_or_default();
    assert_eq!(start, text.find("total + amount"));
    assert_eq!(h.resolve_element(&after), None);
}

#[test]
fn test_shape_change_resolves_to_none() {
    let ws = Workspace::with_files([(FILE, SOURCE)]);
    let pool = InternPool::new();
    let before = open(&ws);
    let h = handle(&pool, &before, node(&before, "total + amount", NodeKind::Binary));

    // Same length, but the initializer is now a call instead of a sum.
    ws.set_file(FILE, &SOURCE.replace("total + amount", "Math.abs(tot)"));
    assert_eq!(h.resolve(&open(&ws)), None);
}

#[test]
fn test_missing_anchor_resolves_to_none() {
    let ws = Workspace::with_files([(FILE, SOURCE)]);
    let pool = InternPool::new();
    let before = open(&ws);
    let h = handle(&pool, &before, node(&before, "return next", NodeKind::Return));
    ws.set_file(FILE, &SOURCE.replace("public int add(int amount)", "public int add(long amount)"));
    assert_eq!(h.resolve(&open(&ws)), None);
    assert!(ws.remove_file(FILE).is_ok());
    assert_eq!(h.resolve(&open(&ws)), None);
}

#[test]
fn test_implicit_constructor_uses_child_index() {
    let ws = Workspace::with_files([("A.java", "class A { void m() {} }\nclass B { B() {} }")]);
    let pool = InternPool::new();
    let before = open(&ws);
    let a = before.find_type("A").unwrap_or_else(|| panic!("no A"));
    let ctor_decl = before.members(a).unwrap_or_default()[0];
    let ctor = before.tree_of(ctor_decl).unwrap_or_else(|| panic!("no tree"));
    assert_eq!(before.span(ctor), None);

    let h = handle(&pool, &before, ctor);
    let TreeLocation::Indexed { index, kind, parent } = h.location() else {
        panic!("expected an indexed location, got {:?}", h.location());
    };
    assert_eq!((*index, *kind), (1, NodeKind::Method));
    assert_eq!(parent.kind(), Some(NodeKind::Class));
    assert_eq!(h.file(), Some("A.java"));

    // Adding members after the constructor slot keeps its ordinal.
    ws.set_file("A.java", "class A { void m() {} void n() {} }\nclass B { B() {} }");
    let grown = open(&ws);
    let found = h.resolve(&grown).unwrap_or_else(|| panic!("constructor lost"));
    let decl = grown.declared_by(found).unwrap_or_else(|| panic!("not a declaration"));
    assert_eq!(grown.decl_kind(decl), DeclKind::Constructor);
    assert_eq!(h.resolve_element(&grown), Some(decl));

    // An extends clause takes the slot; the kind check rejects it.
    ws.set_file("A.java", "class A extends B { void m() {} }\nclass B { B() {} }");
    assert_eq!(h.resolve(&open(&ws)), None);
}

#[test]
fn test_implicit_constructor_survives_removed_siblings() {
    let ws = Workspace::with_files([("A.java", "class A { void m() {} void n() {} }")]);
    let pool = InternPool::new();
    let before = open(&ws);
    let a = before.find_type("A").unwrap_or_else(|| panic!("no A"));
    let ctor_decl = before.members(a).unwrap_or_default()[0];
    let ctor = before.tree_of(ctor_decl).unwrap_or_else(|| panic!("no tree"));
    let h = handle(&pool, &before, ctor);
    assert!(matches!(
        h.location(),
        TreeLocation::Indexed { index: 1, kind: NodeKind::Method, .. }
    ));

    for source in ["class A { void m() {} }", "class A { }"] {
        ws.set_file("A.java", source);
        let shrunk = open(&ws);
        let found = h
            .resolve(&shrunk)
            .unwrap_or_else(|| panic!("constructor lost in {source:?}"));
        let decl = shrunk
            .declared_by(found)
            .unwrap_or_else(|| panic!("not a declaration"));
        assert_eq!(shrunk.decl_kind(decl), DeclKind::Constructor);
        assert_eq!(h.resolve_element(&shrunk), Some(decl));
    }
}

#[test]
fn test_inferred_local_type_is_indexed() {
    let ws = Workspace::with_files([(FILE, SOURCE)]);
    let pool = InternPool::new();
    let ctx = open(&ws);
    let local = node(&ctx, "copy", NodeKind::Variable);
    let inferred = ctx.children(local)[1];
    assert_eq!(ctx.node_kind(inferred), NodeKind::InferredType);

    let h = handle(&pool, &ctx, inferred);
    assert!(matches!(h.location(), TreeLocation::Indexed { index: 1, .. }));
    assert_eq!(h.element_handle().map(ElementHandle::kind), Some(DeclKind::Method));
    assert_eq!(h.resolve(&ctx), Some(inferred));

    ws.set_file(FILE, &SOURCE.replace("void touch()", "\n\n    void touch()"));
    let shifted = open(&ws);
    let found = h.resolve(&shifted).unwrap_or_else(|| panic!("inferred type lost"));
    assert_eq!(shifted.node_kind(found), NodeKind::InferredType);
}

#[test]
fn test_library_elements_have_no_tree() {
    let ctx = MemoryContext::from_sources(&[]);
    let pool = InternPool::new();
    let string = ctx
        .lookup(Namespace::Type, "java.lang.String")
        .unwrap_or_else(|| panic!("no String"));
    let element = ElementHandle::create(&pool, &ctx, string).unwrap_or_else(|e| panic!("{e}"));
    let h = TreePathHandle::from_element(&pool, &ctx, &element).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(h.location(), &TreeLocation::ElementOnly { element: element.clone() });
    assert_eq!(h.kind(), Some(NodeKind::Class));
    assert_eq!(h.file(), None);
    assert_eq!(h.resolve(&ctx), None);
    assert_eq!(h.resolve_element(&ctx), Some(string));
}

#[test]
fn test_from_element_prefers_source() {
    let ws = Workspace::with_files([(FILE, SOURCE)]);
    let pool = InternPool::new();
    let ctx = open(&ws);
    let counter = ctx.find_type("p.Counter").unwrap_or_else(|| panic!("no Counter"));
    let element = ElementHandle::create(&pool, &ctx, counter).unwrap_or_else(|e| panic!("{e}"));
    let h = TreePathHandle::from_element(&pool, &ctx, &element).unwrap_or_else(|e| panic!("{e}"));
    assert!(matches!(h.location(), TreeLocation::Positional { .. }));
    assert_eq!(h.element_handle(), Some(&element));
    assert_eq!(h.resolve(&ctx), ctx.tree_of(counter));
    assert_eq!(h.resolve_element(&ctx), Some(counter));
}

#[test]
fn test_equal_locations_are_equal_handles() {
    let ws = Workspace::with_files([(FILE, SOURCE)]);
    let pool = InternPool::new();
    let first = open(&ws);
    let second = open(&ws);
    let a = handle(&pool, &first, node(&first, "total = next", NodeKind::Assignment));
    let b = handle(&pool, &second, node(&second, "total = next", NodeKind::Assignment));
    assert_eq!(a, b);
}
