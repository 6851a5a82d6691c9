//! Documentation-comment parser.
//!
//! Splits a `/** ... */` comment into a description and block tags, and
//! the description and tag bodies into text runs and inline tags. All spans
//! are absolute file offsets.

use smallvec::SmallVec;

use super::syntax::DocArena;
use crate::ids::{DocId, NodeId, Span};
use crate::kind::DocKind;

pub(crate) struct DocParser<'a> {
    source: &'a str,
    arena: &'a mut DocArena,
    owner: NodeId,
}

impl<'a> DocParser<'a> {
    pub fn new(source: &'a str, arena: &'a mut DocArena, owner: NodeId) -> Self {
        DocParser {
            source,
            arena,
            owner,
        }
    }

    pub fn parse(mut self, comment: Span) -> DocId {
        let start = comment.start as usize;
        let end = comment.end as usize;
        let inner_start = (start + 3).min(end);
        let inner_end = if self.source[..end].ends_with("*/") && end >= inner_start + 2 {
            end - 2
        } else {
            end
        };

        let tags = self.block_tag_starts(inner_start, inner_end);
        let mut children: SmallVec<[DocId; 4]> = SmallVec::new();
        let description_end = tags.first().copied().unwrap_or(inner_end);
        children.extend(self.inline_content(inner_start, description_end));

        for (i, &tag_start) in tags.iter().enumerate() {
            let tag_end = tags.get(i + 1).copied().unwrap_or(inner_end);
            children.push(self.block_tag(tag_start, tag_end));
        }

        self.arena.alloc(DocKind::DocComment, comment, self.owner, children)
    }

    /// Offsets of `@` characters that start a line's content.
    fn block_tag_starts(&self, from: usize, to: usize) -> Vec<usize> {
        let mut starts = Vec::new();
        let mut line_start = true;
        let bytes = self.source.as_bytes();
        let mut i = from;
        while i < to {
            let b = bytes[i];
            if b == b'\n' {
                line_start = true;
            } else if line_start {
                if b == b'@' {
                    starts.push(i);
                    line_start = false;
                } else if !(b == b' ' || b == b'\t' || b == b'\r' || b == b'*') {
                    line_start = false;
                }
            }
            i += 1;
        }
        starts
    }

    fn block_tag(&mut self, start: usize, end: usize) -> DocId {
        let (name_end, name) = self.word(start + 1, end);
        let kind = match name {
            "param" => DocKind::Param,
            "return" => DocKind::Return,
            "throws" | "exception" => DocKind::Throws,
            "see" => DocKind::See,
            "since" => DocKind::Since,
            "author" => DocKind::Author,
            _ => DocKind::UnknownBlockTag,
        };

        let mut children: SmallVec<[DocId; 4]> = SmallVec::new();
        let mut body_start = name_end;
        let leading = match kind {
            DocKind::Param => Some(DocKind::Identifier),
            DocKind::Throws | DocKind::See => Some(DocKind::Reference),
            _ => None,
        };
        if let Some(leading) = leading {
            let word_start = self.skip_layout(name_end, end);
            let (word_end, word) = self.word(word_start, end);
            if !word.is_empty() {
                children.push(self.leaf(leading, word_start, word_end));
                body_start = word_end;
            }
        }
        children.extend(self.inline_content(body_start, end));

        let tag_end = self.trim_end(start, end);
        self.arena
            .alloc(kind, span(start, tag_end), self.owner, children)
    }

    /// Text runs and inline tags between `from` and `to`.
    fn inline_content(&mut self, from: usize, to: usize) -> Vec<DocId> {
        let mut out = Vec::new();
        let mut cursor = from;
        while cursor < to {
            let Some(rel) = self.source[cursor..to].find("{@") else {
                break;
            };
            let open = cursor + rel;
            self.push_text(&mut out, cursor, open);
            let close = self.source[open..to].find('}').map_or(to, |r| open + r + 1);
            out.push(self.inline_tag(open, close));
            cursor = close;
        }
        self.push_text(&mut out, cursor, to);
        out
    }

    fn inline_tag(&mut self, open: usize, close: usize) -> DocId {
        let body_end = if self.source[..close].ends_with('}') {
            close - 1
        } else {
            close
        };
        let (name_end, name) = self.word(open + 2, body_end);
        let mut children: SmallVec<[DocId; 4]> = SmallVec::new();
        let kind = match name {
            "link" | "linkplain" => {
                let ref_start = self.skip_layout(name_end, body_end);
                let (ref_end, reference) = self.word(ref_start, body_end);
                if !reference.is_empty() {
                    children.push(self.leaf(DocKind::Reference, ref_start, ref_end));
                }
                let mut rest = Vec::new();
                self.push_text(&mut rest, ref_end, body_end);
                children.extend(rest);
                DocKind::Link
            }
            "code" | "literal" => {
                let mut rest = Vec::new();
                self.push_text(&mut rest, name_end, body_end);
                children.extend(rest);
                DocKind::Code
            }
            _ => DocKind::Erroneous,
        };
        self.arena
            .alloc(kind, span(open, close), self.owner, children)
    }

    fn push_text(&mut self, out: &mut Vec<DocId>, from: usize, to: usize) {
        let start = self.skip_layout(from, to);
        let end = self.trim_end(start, to);
        if start < end {
            out.push(self.leaf(DocKind::Text, start, end));
        }
    }

    fn leaf(&mut self, kind: DocKind, start: usize, end: usize) -> DocId {
        self.arena
            .alloc(kind, span(start, end), self.owner, SmallVec::new())
    }

    /// Skip whitespace and the `*` margin of comment lines.
    fn skip_layout(&self, from: usize, to: usize) -> usize {
        let bytes = self.source.as_bytes();
        let mut i = from;
        while i < to && matches!(bytes[i], b' ' | b'\t' | b'\r' | b'\n' | b'*') {
            i += 1;
        }
        i
    }

    fn trim_end(&self, from: usize, to: usize) -> usize {
        let bytes = self.source.as_bytes();
        let mut i = to;
        while i > from && matches!(bytes[i - 1], b' ' | b'\t' | b'\r' | b'\n' | b'*') {
            i -= 1;
        }
        i
    }

    /// Word starting at `from`: everything up to whitespace or a brace.
    fn word(&self, from: usize, to: usize) -> (usize, &'a str) {
        let source: &'a str = self.source;
        let bytes = source.as_bytes();
        let mut i = from.min(to);
        while i < to && !matches!(bytes[i], b' ' | b'\t' | b'\r' | b'\n' | b'{' | b'}') {
            i += 1;
        }
        (i, &source[from.min(to)..i])
    }
}

fn span(start: usize, end: usize) -> Span {
    Span::from_range(start..end)
}
