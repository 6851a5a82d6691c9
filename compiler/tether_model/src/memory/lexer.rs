//! Lexer for the reference front end, built on logos.
//!
//! Block comments are kept as tokens so the token stream can attach
//! `/** ... */` comments to the declaration that follows them; everything
//! else that is trivia is skipped.

use logos::{Lexer, Logos};

use crate::ids::Span;

#[derive(Logos, Copy, Clone, Eq, PartialEq, Debug)]
#[logos(skip r"[ \t\r\n\f]+")]
pub(crate) enum TokenKind {
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[token("/*", block_comment)]
    BlockComment,

    // === Keywords ===
    #[token("package")]
    Package,
    #[token("import")]
    Import,
    #[token("class")]
    Class,
    #[token("interface")]
    Interface,
    #[token("enum")]
    Enum,
    #[token("record")]
    Record,
    #[token("extends")]
    Extends,
    #[token("implements")]
    Implements,
    #[token("throws")]
    Throws,
    #[token("public")]
    Public,
    #[token("private")]
    Private,
    #[token("protected")]
    Protected,
    #[token("static")]
    Static,
    #[token("final")]
    Final,
    #[token("abstract")]
    Abstract,
    #[token("default")]
    Default,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("new")]
    New,
    #[token("this")]
    This,
    #[token("super")]
    Super,
    #[token("null")]
    Null,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("void")]
    Void,

    // === Punctuation ===
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("@")]
    At,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("?")]
    Question,
    #[token("&")]
    Amp,
    #[token("=")]
    Eq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("!")]
    Bang,
    #[token(":")]
    Colon,

    // === Literals ===
    #[regex(r"[0-9][0-9_]*[lL]?")]
    IntLit,
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    StringLit,
    #[regex(r"'([^'\\\n]|\\.)'")]
    CharLit,

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Ident,

    /// Anything the lexer could not classify.
    Unknown,

    Eof,
}

fn block_comment(lex: &mut Lexer<TokenKind>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => {
            let rest = lex.remainder().len();
            lex.bump(rest);
            false
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Lexer output: significant tokens plus the doc comments preceding them.
pub(crate) struct TokenList {
    pub tokens: Vec<Token>,
    /// `(token index, comment span)` for every doc comment, keyed by the
    /// index of the first significant token after it.
    pub docs: Vec<(usize, Span)>,
}

impl TokenList {
    /// Doc comment immediately preceding token `index`, if any.
    pub fn doc_before(&self, index: usize) -> Option<Span> {
        self.docs
            .binary_search_by_key(&index, |&(at, _)| at)
            .ok()
            .map(|found| self.docs[found].1)
    }
}

pub(crate) fn lex(source: &str) -> TokenList {
    let mut tokens = Vec::new();
    let mut docs: Vec<(usize, Span)> = Vec::new();
    let mut lexer = TokenKind::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::from_range(lexer.span());
        match result {
            Ok(TokenKind::BlockComment) => {
                let text = lexer.slice();
                if text.starts_with("/**") && text != "/**/" {
                    // A later doc comment before the same token wins.
                    let index = tokens.len();
                    if let Some(last) = docs.last_mut() {
                        if last.0 == index {
                            *last = (index, span);
                            continue;
                        }
                    }
                    docs.push((index, span));
                }
            }
            Ok(kind) => tokens.push(Token { kind, span }),
            Err(()) => tokens.push(Token {
                kind: TokenKind::Unknown,
                span,
            }),
        }
    }

    let end = u32::try_from(source.len()).unwrap_or(u32::MAX);
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(end, end),
    });
    TokenList { tokens, docs }
}
