use pretty_assertions::assert_eq;

use super::*;
use crate::memory::lexer::lex;

struct Parsed {
    arena: SyntaxArena,
    docs: DocArena,
    unit: NodeId,
    errors: Vec<ParseError>,
}

fn parse(src: &str) -> Parsed {
    let tokens = lex(src);
    let mut arena = SyntaxArena::default();
    let mut docs = DocArena::default();
    let (unit, errors) =
        Parser::new(src, Arc::from("A.java"), &tokens, &mut arena, &mut docs).parse_unit();
    Parsed {
        arena,
        docs,
        unit,
        errors,
    }
}

impl Parsed {
    fn kinds(&self, node: NodeId) -> Vec<NodeKind> {
        self.arena
            .get(node)
            .children
            .iter()
            .map(|&c| self.arena.get(c).kind)
            .collect()
    }

    fn child(&self, node: NodeId, index: usize) -> NodeId {
        self.arena.get(node).children[index]
    }

    fn text(&self, node: NodeId) -> &str {
        self.arena.text(node).map_or("", |t| t)
    }
}

#[test]
fn test_unit_structure() {
    let p = parse(
        "package a.b;\nimport java.util.*;\nclass A { int f; A() {} void m(int x) {} }",
    );
    assert!(p.errors.is_empty(), "{:?}", p.errors);
    assert_eq!(
        p.kinds(p.unit),
        vec![NodeKind::Package, NodeKind::Import, NodeKind::Class]
    );

    let import = p.child(p.unit, 1);
    assert!(p.arena.get(import).flags.contains(NodeFlags::ON_DEMAND));

    let class = p.child(p.unit, 2);
    assert_eq!(p.text(class), "A");
    assert_eq!(
        p.kinds(class),
        vec![
            NodeKind::Modifiers,
            NodeKind::Variable,
            NodeKind::Method,
            NodeKind::Method
        ]
    );
    assert_eq!(p.text(p.child(class, 2)), "<init>");

    let method = p.child(class, 3);
    assert_eq!(
        p.kinds(method),
        vec![
            NodeKind::Modifiers,
            NodeKind::PrimitiveType,
            NodeKind::Variable,
            NodeKind::Block
        ]
    );
    let param = p.child(method, 2);
    assert!(p.arena.get(param).flags.contains(NodeFlags::PARAMETER));
}

#[test]
fn test_empty_modifiers_have_no_position() {
    let p = parse("class A { public int a; int b; }");
    let class = p.child(p.unit, 0);
    assert_eq!(p.arena.get(p.child(class, 0)).span, None);

    let a_mods = p.child(p.child(class, 1), 0);
    assert_eq!(p.arena.get(a_mods).span, Some(Span::new(10, 16)));
    let b_mods = p.child(p.child(class, 2), 0);
    assert_eq!(p.arena.get(b_mods).span, None);
}

#[test]
fn test_type_parameters_and_bounds() {
    let p = parse("class E<T extends Comparable<T> & Cloneable> { }");
    let class = p.child(p.unit, 0);
    assert_eq!(p.kinds(class), vec![NodeKind::Modifiers, NodeKind::TypeParameter]);
    let param = p.child(class, 1);
    assert_eq!(p.text(param), "T");
    assert_eq!(
        p.kinds(param),
        vec![NodeKind::ParameterizedType, NodeKind::Identifier]
    );
}

#[test]
fn test_var_local_gets_synthetic_type() {
    let p = parse("class A { void m() { var x = 1; String s; } }");
    assert!(p.errors.is_empty(), "{:?}", p.errors);
    let class = p.child(p.unit, 0);
    let body = p.child(p.child(class, 1), 2);
    assert_eq!(p.kinds(body), vec![NodeKind::Variable, NodeKind::Variable]);

    let x = p.child(body, 0);
    assert_eq!(
        p.kinds(x),
        vec![
            NodeKind::Modifiers,
            NodeKind::InferredType,
            NodeKind::IntLiteral
        ]
    );
    assert_eq!(p.arena.get(p.child(x, 1)).span, None);
}

#[test]
fn test_expressions() {
    let p = parse("class A { int m() { return a.b(1 + 2 * 3) == c; } }");
    assert!(p.errors.is_empty(), "{:?}", p.errors);
    let class = p.child(p.unit, 0);
    let body = p.child(p.child(class, 1), 2);
    let ret = p.child(body, 0);
    let eq = p.child(ret, 0);
    assert_eq!(p.arena.get(eq).kind, NodeKind::Binary);
    assert_eq!(p.text(eq), "==");
    let call = p.child(eq, 0);
    assert_eq!(
        p.kinds(call),
        vec![NodeKind::MemberSelect, NodeKind::Binary]
    );
    let sum = p.child(call, 1);
    assert_eq!(p.text(sum), "+");
    assert_eq!(p.text(p.child(sum, 1)), "*");
}

#[test]
fn test_enum_constants() {
    let p = parse("enum Color { RED, GREEN(1); int v; }");
    let e = p.child(p.unit, 0);
    assert_eq!(
        p.kinds(e),
        vec![
            NodeKind::Modifiers,
            NodeKind::Variable,
            NodeKind::Variable,
            NodeKind::Variable
        ]
    );
    let red = p.child(e, 1);
    assert!(p.arena.get(red).flags.contains(NodeFlags::ENUM_CONSTANT));
    let v = p.child(e, 3);
    assert!(!p.arena.get(v).flags.contains(NodeFlags::ENUM_CONSTANT));
}

#[test]
fn test_static_initializer_starts_at_keyword() {
    let src = "class A { static { } }";
    let p = parse(src);
    let class = p.child(p.unit, 0);
    let init = p.child(class, 1);
    let node = p.arena.get(init);
    assert!(node.flags.contains(NodeFlags::INITIALIZER | NodeFlags::STATIC));
    assert_eq!(node.span.map(|s| s.start), src.find("static").map(|i| i as u32));
}

#[test]
fn test_doc_comments_attach_to_declarations() {
    let p = parse("/** Doc. */\nclass A { /** Field. */ int f; int g; }");
    let class = p.child(p.unit, 0);
    let root = p.arena.get(class).doc;
    assert!(root.is_some());
    assert_eq!(root.map(|d| p.docs.get(d).owner), Some(class));

    let f = p.child(class, 1);
    assert!(p.arena.get(f).doc.is_some());
    let g = p.child(class, 2);
    assert_eq!(p.arena.get(g).doc, None);
}

#[test]
fn test_recovery_keeps_going() {
    let p = parse("class A { ) } class B { }");
    assert!(!p.errors.is_empty());
    let class = p.child(p.unit, 0);
    assert_eq!(p.kinds(class), vec![NodeKind::Modifiers, NodeKind::Erroneous]);
    assert_eq!(p.kinds(p.unit), vec![NodeKind::Class, NodeKind::Class]);
}

#[test]
fn test_local_and_anonymous_classes() {
    let p = parse("class A { void m() { class L { } Runnable r = new Runnable() { public void run() {} }; } }");
    assert!(p.errors.is_empty(), "{:?}", p.errors);
    let class = p.child(p.unit, 0);
    let body = p.child(p.child(class, 1), 2);
    assert_eq!(p.kinds(body), vec![NodeKind::Class, NodeKind::Variable]);

    let new_class = p.child(p.child(body, 1), 2);
    assert_eq!(p.kinds(new_class), vec![NodeKind::Identifier, NodeKind::Class]);
    let anonymous = p.child(new_class, 1);
    assert_eq!(p.text(anonymous), "");
    assert_eq!(p.kinds(anonymous), vec![NodeKind::Modifiers, NodeKind::Method]);
}
