use pretty_assertions::assert_eq;
use tether_model::memory::{MemoryContext, Workspace};
use tether_model::{DocTrees, NodeKind, Span};

use super::*;

const FILE: &str = "p/Counter.java";

const SOURCE: &str = "package p;
public class Counter {
    private int total;
    /**
     * Adds to the running total.
     * @param amount how much, see {@link Counter}
     * @return the new {@code total}
     */
    public int add(int amount) { total = total + amount; return total; }
}";

fn open(workspace: &Workspace) -> MemoryContext {
    workspace.open().unwrap_or_else(|err| panic!("open failed: {err}"))
}

/// Doc node of `kind` whose text starts with `needle`.
fn doc_node(ctx: &MemoryContext, needle: &str, kind: DocKind) -> DocId {
    let method = ctx
        .find_node(FILE, "public int add", NodeKind::Method)
        .unwrap_or_else(|| panic!("no method"));
    let root = ctx.doc_comment(method).unwrap_or_else(|| panic!("no comment"));
    let source = ctx.source(FILE).unwrap_or_default();
    let mut pending = vec![root];
    while let Some(doc) = pending.pop() {
        let Span { start, end } = ctx.doc_span(doc);
        if ctx.doc_kind(doc) == kind && source[start as usize..end as usize].starts_with(needle) {
            return doc;
        }
        pending.extend(ctx.doc_children(doc));
    }
    panic!("no {kind:?} starting with {needle}");
}

fn text_of(ctx: &MemoryContext, doc: DocId) -> String {
    let Span { start, end } = ctx.doc_span(doc);
    ctx.source(FILE).unwrap_or_default()[start as usize..end as usize].to_string()
}

#[test]
fn test_round_trip_and_shifted_comment() {
    let ws = Workspace::with_files([(FILE, SOURCE)]);
    let pool = InternPool::new();
    let before = open(&ws);
    let reference = doc_node(&before, "Counter", DocKind::Reference);
    let param = doc_node(&before, "amount", DocKind::Identifier);
    let tag = doc_node(&before, "@return", DocKind::Return);

    let handles: Vec<DocTreePathHandle> = [reference, param, tag]
        .into_iter()
        .map(|doc| DocTreePathHandle::create(&pool, &before, doc).unwrap_or_else(|e| panic!("{e}")))
        .collect();
    assert_eq!(handles[0].kind(), Some(DocKind::Reference));
    assert_eq!(handles[0].tree_path_handle().kind(), Some(NodeKind::Method));
    assert_eq!(handles[0].resolve(&before), Some(reference));

    ws.set_file(
        FILE,
        &SOURCE.replace("private int total;", "private int total;\n    private int limit;\n"),
    );
    let after = open(&ws);
    let texts: Vec<Option<String>> = handles
        .iter()
        .map(|h| h.resolve(&after).map(|doc| text_of(&after, doc)))
        .collect();
    assert_eq!(
        texts,
        vec![
            Some("Counter".to_string()),
            Some("amount".to_string()),
            Some("@return the new {@code total}".to_string()),
        ]
    );
}

#[test]
fn test_changed_comment_shape_resolves_to_none() {
    let ws = Workspace::with_files([(FILE, SOURCE)]);
    let pool = InternPool::new();
    let before = open(&ws);
    let reference = doc_node(&before, "Counter", DocKind::Reference);
    let h = DocTreePathHandle::create(&pool, &before, reference).unwrap_or_else(|e| panic!("{e}"));

    ws.set_file(FILE, &SOURCE.replace("{@link Counter}", "the Counter  "));
    assert_eq!(h.resolve(&open(&ws)), None);

    ws.set_file(FILE, &SOURCE.replace("/**", "/*"));
    assert_eq!(h.resolve(&open(&ws)), None);
}
