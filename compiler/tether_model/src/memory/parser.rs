//! Recursive-descent parser for the reference front end.
//!
//! Produces a flat syntax arena. Every node is allocated bottom-up with its
//! children already built, so the arena never holds orphans. Input the
//! parser cannot make sense of becomes an `Erroneous` node and parsing
//! resumes at the next `;` or `}`.
//!
//! Recursive entry points (`expr`, `unary`, `statement`, `parse_type` and
//! `type_decl`) grow the stack on demand, so nesting depth is bounded only by
//! memory.

use std::sync::Arc;

use smallvec::SmallVec;

use super::doc::DocParser;
use super::lexer::{Token, TokenKind, TokenList};
use super::syntax::{DocArena, NodeFlags, SyntaxArena};
use crate::ids::{NodeId, Span};
use crate::kind::{NodeKind, PrimitiveKind};
use crate::stack::ensure_sufficient_stack;

type Children = SmallVec<[NodeId; 4]>;

/// A recoverable syntax error.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ParseError {
    pub file: Arc<str>,
    pub span: Span,
    pub message: String,
}

pub(crate) struct Parser<'src, 'a> {
    source: &'src str,
    file: Arc<str>,
    tokens: &'a TokenList,
    pos: usize,
    arena: &'a mut SyntaxArena,
    docs: &'a mut DocArena,
    errors: Vec<ParseError>,
}

impl<'src, 'a> Parser<'src, 'a> {
    pub fn new(
        source: &'src str,
        file: Arc<str>,
        tokens: &'a TokenList,
        arena: &'a mut SyntaxArena,
        docs: &'a mut DocArena,
    ) -> Self {
        Parser {
            source,
            file,
            tokens,
            pos: 0,
            arena,
            docs,
            errors: Vec::new(),
        }
    }

    /// Parse a whole compilation unit.
    pub fn parse_unit(mut self) -> (NodeId, Vec<ParseError>) {
        let mut children = Children::new();

        if self.at(TokenKind::Package) {
            children.push(self.package_decl());
        }
        while self.at(TokenKind::Import) {
            children.push(self.import_decl());
        }
        while !self.at(TokenKind::Eof) {
            if self.eat(TokenKind::Semi).is_some() {
                continue;
            }
            children.push(self.top_level_decl());
        }

        let end = u32::try_from(self.source.len()).unwrap_or(u32::MAX);
        let unit = self
            .arena
            .alloc(NodeKind::CompilationUnit, Some(Span::new(0, end)), children);
        self.arena.get_mut(unit).text = Some(Arc::clone(&self.file));
        (unit, self.errors)
    }

    // ===== Token access =====

    fn current(&self) -> Token {
        self.tokens.tokens[self.pos.min(self.tokens.tokens.len() - 1)]
    }

    fn kind(&self) -> TokenKind {
        self.current().kind
    }

    fn peek(&self, offset: usize) -> TokenKind {
        let idx = (self.pos + offset).min(self.tokens.tokens.len() - 1);
        self.tokens.tokens[idx].kind
    }

    fn peek_text(&self, offset: usize) -> &'src str {
        let idx = (self.pos + offset).min(self.tokens.tokens.len() - 1);
        self.slice(self.tokens.tokens[idx].span)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn at_ident(&self, text: &str) -> bool {
        self.at(TokenKind::Ident) && self.peek_text(0) == text
    }

    fn bump(&mut self) -> Token {
        let token = self.current();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.bump())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Option<Token> {
        let found = self.eat(kind);
        if found.is_none() {
            let span = self.current().span;
            self.error(span, format!("expected {what}"));
        }
        found
    }

    fn error(&mut self, span: Span, message: String) {
        self.errors.push(ParseError {
            file: Arc::clone(&self.file),
            span,
            message,
        });
    }

    fn start(&self) -> u32 {
        self.current().span.start
    }

    /// End offset of the last consumed token.
    fn prev_end(&self) -> u32 {
        if self.pos == 0 {
            0
        } else {
            self.tokens.tokens[self.pos - 1].span.end
        }
    }

    fn span_from(&self, start: u32) -> Option<Span> {
        Some(Span::new(start, self.prev_end().max(start)))
    }

    fn slice(&self, span: Span) -> &'src str {
        let source: &'src str = self.source;
        &source[span.start as usize..span.end as usize]
    }

    fn ident(&mut self, what: &str) -> (Arc<str>, Span) {
        match self.expect(TokenKind::Ident, what) {
            Some(token) => (Arc::from(self.slice(token.span)), token.span),
            None => {
                let at = self.start();
                (Arc::from(""), Span::new(at, at))
            }
        }
    }

    fn leaf(&mut self, kind: NodeKind, token: Token) -> NodeId {
        let text = Arc::from(self.slice(token.span));
        self.arena.alloc_leaf(kind, Some(token.span), Some(text))
    }

    fn node(&mut self, kind: NodeKind, start: u32, children: Children) -> NodeId {
        let span = self.span_from(start);
        self.arena.alloc(kind, span, children)
    }

    fn set_text(&mut self, node: NodeId, text: Arc<str>) {
        self.arena.get_mut(node).text = Some(text);
    }

    fn add_flags(&mut self, node: NodeId, flags: NodeFlags) {
        self.arena.get_mut(node).flags |= flags;
    }

    /// Skip to the next `;` (consumed) or `}` (kept), always making progress
    /// past `progress_from`, and wrap what was skipped in an `Erroneous` node.
    fn recover(&mut self, progress_from: usize, start: u32, children: Children) -> NodeId {
        while !self.at(TokenKind::Eof) && !self.at(TokenKind::RBrace) {
            if self.bump().kind == TokenKind::Semi {
                break;
            }
        }
        if self.pos == progress_from && !self.at(TokenKind::Eof) {
            self.bump();
        }
        let span = self.span_from(start);
        self.error(
            span.unwrap_or_default(),
            "unexpected input".to_string(),
        );
        self.arena.alloc(NodeKind::Erroneous, span, children)
    }

    fn attach_doc(&mut self, node: NodeId, decl_token: usize) {
        if let Some(comment) = self.tokens.doc_before(decl_token) {
            let root = DocParser::new(self.source, self.docs, node).parse(comment);
            self.arena.get_mut(node).doc = Some(root);
        }
    }

    // ===== Compilation unit =====

    fn package_decl(&mut self) -> NodeId {
        let start = self.start();
        self.bump();
        let name = self.qualified_name();
        self.expect(TokenKind::Semi, "`;` after package name");
        self.node(NodeKind::Package, start, SmallVec::from_elem(name, 1))
    }

    fn import_decl(&mut self) -> NodeId {
        let start = self.start();
        self.bump();
        let mut flags = NodeFlags::empty();
        if self.eat(TokenKind::Static).is_some() {
            flags |= NodeFlags::STATIC;
        }
        let name = self.qualified_name();
        if self.at(TokenKind::Dot) && self.peek(1) == TokenKind::Star {
            self.bump();
            self.bump();
            flags |= NodeFlags::ON_DEMAND;
        }
        self.expect(TokenKind::Semi, "`;` after import");
        let import = self.node(NodeKind::Import, start, SmallVec::from_elem(name, 1));
        self.add_flags(import, flags);
        import
    }

    /// `a.b.c` as a left-nested chain of `MemberSelect` over an `Identifier`.
    fn qualified_name(&mut self) -> NodeId {
        let start = self.start();
        let (name, span) = self.ident("name");
        let mut node = self
            .arena
            .alloc_leaf(NodeKind::Identifier, Some(span), Some(name));
        while self.at(TokenKind::Dot) && self.peek(1) == TokenKind::Ident {
            self.bump();
            let (name, _) = self.ident("name");
            node = self.node(NodeKind::MemberSelect, start, SmallVec::from_elem(node, 1));
            self.set_text(node, name);
        }
        node
    }

    fn top_level_decl(&mut self) -> NodeId {
        let decl_token = self.pos;
        let start = self.start();
        let (mods, flags) = self.modifiers();
        if self.at_type_keyword() {
            return self.type_decl(decl_token, mods, flags);
        }
        self.recover(decl_token, start, SmallVec::from_elem(mods, 1))
    }

    fn at_type_keyword(&self) -> bool {
        match self.kind() {
            TokenKind::Class | TokenKind::Interface | TokenKind::Enum | TokenKind::Record => true,
            TokenKind::At => self.peek(1) == TokenKind::Interface,
            _ => false,
        }
    }

    // ===== Declarations =====

    /// Modifier keywords and annotations.
    ///
    /// An empty modifier list has no position, like every other node the
    /// parser does not see in the source.
    fn modifiers(&mut self) -> (NodeId, NodeFlags) {
        let start_pos = self.pos;
        let start = self.start();
        let mut flags = NodeFlags::empty();
        let mut annotations = Children::new();
        loop {
            let flag = match self.kind() {
                TokenKind::Public => NodeFlags::PUBLIC,
                TokenKind::Private => NodeFlags::PRIVATE,
                TokenKind::Protected => NodeFlags::PROTECTED,
                TokenKind::Static => NodeFlags::STATIC,
                TokenKind::Final => NodeFlags::FINAL,
                TokenKind::Abstract => NodeFlags::ABSTRACT,
                TokenKind::Default => NodeFlags::DEFAULT,
                TokenKind::At if self.peek(1) != TokenKind::Interface => {
                    annotations.push(self.annotation());
                    continue;
                }
                _ => break,
            };
            // `static {` starts an initializer, not a modifier list.
            if flag == NodeFlags::STATIC && self.peek(1) == TokenKind::LBrace {
                break;
            }
            self.bump();
            flags |= flag;
        }
        let span = if self.pos == start_pos {
            None
        } else {
            self.span_from(start)
        };
        let mods = self.arena.alloc(NodeKind::Modifiers, span, annotations);
        self.add_flags(mods, flags);
        (mods, flags)
    }

    fn annotation(&mut self) -> NodeId {
        let start = self.start();
        self.bump();
        let mut children = SmallVec::from_elem(self.qualified_name(), 1);
        if self.at(TokenKind::LParen) {
            children.extend(self.arguments());
        }
        self.node(NodeKind::Annotation, start, children)
    }

    fn type_decl(&mut self, decl_token: usize, mods: NodeId, flags: NodeFlags) -> NodeId {
        ensure_sufficient_stack(|| self.type_decl_inner(decl_token, mods, flags))
    }

    fn type_decl_inner(&mut self, decl_token: usize, mods: NodeId, flags: NodeFlags) -> NodeId {
        let start = self
            .arena
            .get(mods)
            .span
            .map_or_else(|| self.start(), |span| span.start);
        let kind = match self.bump().kind {
            TokenKind::Class => NodeKind::Class,
            TokenKind::Interface => NodeKind::Interface,
            TokenKind::Enum => NodeKind::Enum,
            TokenKind::Record => NodeKind::Record,
            _ => {
                self.bump();
                NodeKind::AnnotationType
            }
        };
        let (name, _) = self.ident("type name");

        let mut children = SmallVec::from_elem(mods, 1);
        if self.at(TokenKind::Lt) {
            children.extend(self.type_parameters());
        }
        if kind == NodeKind::Record && self.eat(TokenKind::LParen).is_some() {
            while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
                let component = self.parameter();
                self.add_flags(component, NodeFlags::RECORD_COMPONENT);
                children.push(component);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "`)` after record components");
        }
        if self.eat(TokenKind::Extends).is_some() {
            loop {
                let ty = self.parse_type();
                self.add_flags(ty, NodeFlags::EXTENDS_CLAUSE);
                children.push(ty);
                if kind != NodeKind::Interface || self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        if self.eat(TokenKind::Implements).is_some() {
            loop {
                let ty = self.parse_type();
                self.add_flags(ty, NodeFlags::IMPLEMENTS_CLAUSE);
                children.push(ty);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }

        self.expect(TokenKind::LBrace, "`{` to open the type body");
        if kind == NodeKind::Enum {
            children.extend(self.enum_constants());
        }
        self.class_body(&name, &mut children);

        let node = self.node(kind, start, children);
        self.set_text(node, name);
        self.add_flags(node, flags);
        self.attach_doc(node, decl_token);
        node
    }

    /// Members up to and including the closing `}`.
    fn class_body(&mut self, class_name: &str, children: &mut Children) {
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            if let Some(member) = self.member(class_name) {
                children.push(member);
            }
        }
        self.expect(TokenKind::RBrace, "`}` to close the type body");
    }

    fn type_parameters(&mut self) -> Children {
        let mut params = Children::new();
        self.bump();
        loop {
            let start = self.start();
            let (name, _) = self.ident("type parameter name");
            let mut bounds = Children::new();
            if self.eat(TokenKind::Extends).is_some() {
                bounds.push(self.parse_type());
                while self.eat(TokenKind::Amp).is_some() {
                    bounds.push(self.parse_type());
                }
            }
            let param = self.node(NodeKind::TypeParameter, start, bounds);
            self.set_text(param, name);
            params.push(param);
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::Gt, "`>` to close type parameters");
        params
    }

    fn enum_constants(&mut self) -> Children {
        let mut constants = Children::new();
        while self.at(TokenKind::Ident)
            && matches!(
                self.peek(1),
                TokenKind::Comma | TokenKind::Semi | TokenKind::LParen | TokenKind::RBrace
            )
        {
            let decl_token = self.pos;
            let start = self.start();
            let (name, _) = self.ident("enum constant");
            let mods = self.arena.alloc(NodeKind::Modifiers, None, Children::new());
            let mut children = SmallVec::from_elem(mods, 1);
            if self.at(TokenKind::LParen) {
                children.extend(self.arguments());
            }
            let constant = self.node(NodeKind::Variable, start, children);
            self.set_text(constant, name);
            self.add_flags(
                constant,
                NodeFlags::ENUM_CONSTANT | NodeFlags::PUBLIC | NodeFlags::STATIC | NodeFlags::FINAL,
            );
            self.attach_doc(constant, decl_token);
            constants.push(constant);
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.eat(TokenKind::Semi);
        constants
    }

    /// One class-body member, or `None` for a stray `;`.
    fn member(&mut self, class_name: &str) -> Option<NodeId> {
        if self.eat(TokenKind::Semi).is_some() {
            return None;
        }
        let decl_token = self.pos;
        let start = self.start();

        if self.at(TokenKind::LBrace) {
            let block = self.block();
            self.add_flags(block, NodeFlags::INITIALIZER);
            return Some(block);
        }
        if self.at(TokenKind::Static) && self.peek(1) == TokenKind::LBrace {
            self.bump();
            let block = self.block_from(start);
            self.add_flags(block, NodeFlags::INITIALIZER | NodeFlags::STATIC);
            return Some(block);
        }

        let (mods, flags) = self.modifiers();
        if self.at_type_keyword() {
            return Some(self.type_decl(decl_token, mods, flags));
        }

        let start = self.arena.get(mods).span.map_or(start, |span| span.start);
        let mut children = SmallVec::from_elem(mods, 1);
        if self.at(TokenKind::Lt) {
            children.extend(self.type_parameters());
        }

        if self.at_ident(class_name) && self.peek(1) == TokenKind::LParen {
            self.bump();
            let ctor = self.method_rest(start, children, Arc::from("<init>"));
            self.add_flags(ctor, flags);
            self.attach_doc(ctor, decl_token);
            return Some(ctor);
        }

        if !(self.at(TokenKind::Void) || self.at(TokenKind::Ident)) {
            return Some(self.recover(decl_token, start, children));
        }

        children.push(self.parse_type());
        let (name, _) = self.ident("member name");
        let node = if self.at(TokenKind::LParen) {
            self.method_rest(start, children, name)
        } else {
            if self.eat(TokenKind::Eq).is_some() {
                children.push(self.expr());
            }
            let field = self.node(NodeKind::Variable, start, children);
            self.set_text(field, name);
            if self.at(TokenKind::Comma) {
                let from = self.pos;
                let at = self.start();
                self.recover(from, at, Children::new());
            } else {
                self.expect(TokenKind::Semi, "`;` after field");
            }
            field
        };
        self.add_flags(node, flags);
        self.attach_doc(node, decl_token);
        Some(node)
    }

    /// Parameters, `throws` clause, and body of a method or constructor.
    fn method_rest(&mut self, start: u32, mut children: Children, name: Arc<str>) -> NodeId {
        self.expect(TokenKind::LParen, "`(` to open parameters");
        while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
            children.push(self.parameter());
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::RParen, "`)` to close parameters");
        if self.eat(TokenKind::Throws).is_some() {
            loop {
                let ty = self.parse_type();
                self.add_flags(ty, NodeFlags::THROWS_CLAUSE);
                children.push(ty);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        if self.at(TokenKind::LBrace) {
            children.push(self.block());
        } else {
            self.expect(TokenKind::Semi, "`;` or a method body");
        }
        let method = self.node(NodeKind::Method, start, children);
        self.set_text(method, name);
        method
    }

    fn parameter(&mut self) -> NodeId {
        let start = self.start();
        let (mods, flags) = self.modifiers();
        let ty = self.parse_type();
        let (name, _) = self.ident("parameter name");
        let mut children = Children::new();
        children.push(mods);
        children.push(ty);
        let param = self.node(NodeKind::Variable, start, children);
        self.set_text(param, name);
        self.add_flags(param, flags | NodeFlags::PARAMETER);
        param
    }

    // ===== Types =====

    fn parse_type(&mut self) -> NodeId {
        ensure_sufficient_stack(|| self.parse_type_inner())
    }

    fn parse_type_inner(&mut self) -> NodeId {
        let start = self.start();
        let mut node = match self.kind() {
            TokenKind::Void => {
                let token = self.bump();
                self.leaf(NodeKind::PrimitiveType, token)
            }
            TokenKind::Ident if PrimitiveKind::from_keyword(self.peek_text(0)).is_some() => {
                let token = self.bump();
                self.leaf(NodeKind::PrimitiveType, token)
            }
            TokenKind::Ident => self.class_type(),
            _ => {
                let span = self.current().span;
                self.error(span, "expected a type".to_string());
                self.arena
                    .alloc_leaf(NodeKind::Erroneous, Some(Span::new(start, start)), None)
            }
        };
        while self.at(TokenKind::LBracket) && self.peek(1) == TokenKind::RBracket {
            self.bump();
            self.bump();
            node = self.node(NodeKind::ArrayType, start, SmallVec::from_elem(node, 1));
        }
        node
    }

    fn class_type(&mut self) -> NodeId {
        let start = self.start();
        let token = self.bump();
        let mut node = self.leaf(NodeKind::Identifier, token);
        loop {
            if self.at(TokenKind::Lt) {
                let mut children = SmallVec::from_elem(node, 1);
                children.extend(self.type_arguments());
                node = self.node(NodeKind::ParameterizedType, start, children);
            } else if self.at(TokenKind::Dot) && self.peek(1) == TokenKind::Ident {
                self.bump();
                let (name, _) = self.ident("type name");
                node = self.node(NodeKind::MemberSelect, start, SmallVec::from_elem(node, 1));
                self.set_text(node, name);
            } else {
                break;
            }
        }
        node
    }

    fn type_arguments(&mut self) -> Children {
        let mut args = Children::new();
        self.bump();
        if self.eat(TokenKind::Gt).is_some() {
            return args;
        }
        loop {
            args.push(self.type_argument());
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::Gt, "`>` to close type arguments");
        args
    }

    fn type_argument(&mut self) -> NodeId {
        if !self.at(TokenKind::Question) {
            return self.parse_type();
        }
        let start = self.start();
        let token = self.bump();
        if self.eat(TokenKind::Extends).is_some() {
            let bound = self.parse_type();
            self.node(NodeKind::ExtendsWildcard, start, SmallVec::from_elem(bound, 1))
        } else if self.eat(TokenKind::Super).is_some() {
            let bound = self.parse_type();
            self.node(NodeKind::SuperWildcard, start, SmallVec::from_elem(bound, 1))
        } else {
            self.arena
                .alloc_leaf(NodeKind::UnboundedWildcard, Some(token.span), None)
        }
    }

    // ===== Statements =====

    fn block(&mut self) -> NodeId {
        let start = self.start();
        self.block_from(start)
    }

    /// Block whose span starts at `start` rather than at its `{`.
    fn block_from(&mut self, start: u32) -> NodeId {
        self.expect(TokenKind::LBrace, "`{`");
        let mut stmts = Children::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            stmts.push(self.statement());
        }
        self.expect(TokenKind::RBrace, "`}`");
        self.node(NodeKind::Block, start, stmts)
    }

    fn statement(&mut self) -> NodeId {
        ensure_sufficient_stack(|| self.statement_inner())
    }

    fn statement_inner(&mut self) -> NodeId {
        let start = self.start();
        match self.kind() {
            TokenKind::LBrace => self.block(),
            TokenKind::Semi => {
                let token = self.bump();
                self.arena
                    .alloc_leaf(NodeKind::EmptyStatement, Some(token.span), None)
            }
            TokenKind::Return => {
                self.bump();
                let mut children = Children::new();
                if !self.at(TokenKind::Semi) {
                    children.push(self.expr());
                }
                self.expect(TokenKind::Semi, "`;` after return");
                self.node(NodeKind::Return, start, children)
            }
            TokenKind::If => {
                self.bump();
                self.expect(TokenKind::LParen, "`(` after if");
                let mut children = SmallVec::from_elem(self.expr(), 1);
                self.expect(TokenKind::RParen, "`)` after condition");
                children.push(self.statement());
                if self.eat(TokenKind::Else).is_some() {
                    children.push(self.statement());
                }
                self.node(NodeKind::If, start, children)
            }
            _ if self.looks_like_local_type() => {
                let decl_token = self.pos;
                let (mods, flags) = self.modifiers();
                self.type_decl(decl_token, mods, flags)
            }
            _ if self.looks_like_local_variable() => self.local_variable(),
            _ => {
                let before = self.pos;
                let expr = self.expr();
                if self.pos == before {
                    return self.recover(before, start, SmallVec::from_elem(expr, 1));
                }
                self.expect(TokenKind::Semi, "`;` after expression");
                self.node(NodeKind::ExpressionStatement, start, SmallVec::from_elem(expr, 1))
            }
        }
    }

    fn looks_like_local_type(&self) -> bool {
        let mut i = 0;
        while matches!(
            self.peek(i),
            TokenKind::Final | TokenKind::Abstract | TokenKind::Static
        ) {
            i += 1;
        }
        matches!(
            self.peek(i),
            TokenKind::Class | TokenKind::Interface | TokenKind::Enum | TokenKind::Record
        )
    }

    /// Token-level lookahead for `Type name =` / `Type name;` / `var name`.
    fn looks_like_local_variable(&self) -> bool {
        let mut i = 0;
        while self.peek(i) == TokenKind::Final {
            i += 1;
        }
        if self.peek(i) != TokenKind::Ident {
            return false;
        }
        if self.peek_text(i) == "var" && self.peek(i + 1) == TokenKind::Ident {
            return true;
        }
        i += 1;
        loop {
            match self.peek(i) {
                TokenKind::Dot if self.peek(i + 1) == TokenKind::Ident => i += 2,
                TokenKind::Lt => {
                    let mut depth = 0usize;
                    loop {
                        match self.peek(i) {
                            TokenKind::Lt => depth += 1,
                            TokenKind::Gt => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            TokenKind::Ident
                            | TokenKind::Dot
                            | TokenKind::Comma
                            | TokenKind::Question
                            | TokenKind::Extends
                            | TokenKind::Super
                            | TokenKind::LBracket
                            | TokenKind::RBracket => {}
                            _ => return false,
                        }
                        i += 1;
                    }
                    i += 1;
                }
                TokenKind::LBracket if self.peek(i + 1) == TokenKind::RBracket => i += 2,
                _ => break,
            }
        }
        self.peek(i) == TokenKind::Ident
            && matches!(self.peek(i + 1), TokenKind::Eq | TokenKind::Semi)
    }

    fn local_variable(&mut self) -> NodeId {
        let start = self.start();
        let (mods, flags) = self.modifiers();
        let ty = if self.at_ident("var") && self.peek(1) == TokenKind::Ident {
            self.bump();
            let inferred = self.arena.alloc(NodeKind::InferredType, None, Children::new());
            self.add_flags(inferred, NodeFlags::IMPLICIT);
            inferred
        } else {
            self.parse_type()
        };
        let (name, _) = self.ident("variable name");
        let mut children = Children::new();
        children.push(mods);
        children.push(ty);
        if self.eat(TokenKind::Eq).is_some() {
            children.push(self.expr());
        }
        let var = self.node(NodeKind::Variable, start, children);
        self.set_text(var, name);
        self.add_flags(var, flags);
        self.expect(TokenKind::Semi, "`;` after variable");
        var
    }

    // ===== Expressions =====

    fn expr(&mut self) -> NodeId {
        ensure_sufficient_stack(|| self.expr_inner())
    }

    fn expr_inner(&mut self) -> NodeId {
        let start = self.start();
        let lhs = self.binary(0);
        if self.eat(TokenKind::Eq).is_some() {
            let rhs = self.expr();
            let mut children = Children::new();
            children.push(lhs);
            children.push(rhs);
            return self.node(NodeKind::Assignment, start, children);
        }
        lhs
    }

    fn binary(&mut self, min_precedence: u8) -> NodeId {
        let start = self.start();
        let mut lhs = self.unary();
        loop {
            let precedence = match self.kind() {
                TokenKind::OrOr => 1,
                TokenKind::AndAnd => 2,
                TokenKind::EqEq | TokenKind::NotEq => 3,
                TokenKind::Lt | TokenKind::Gt => 4,
                TokenKind::Plus | TokenKind::Minus => 5,
                TokenKind::Star | TokenKind::Slash => 6,
                _ => break,
            };
            if precedence < min_precedence {
                break;
            }
            let op = self.bump();
            let rhs = self.binary(precedence + 1);
            let mut children = Children::new();
            children.push(lhs);
            children.push(rhs);
            lhs = self.node(NodeKind::Binary, start, children);
            let text = Arc::from(self.slice(op.span));
            self.set_text(lhs, text);
        }
        lhs
    }

    fn unary(&mut self) -> NodeId {
        ensure_sufficient_stack(|| self.unary_inner())
    }

    fn unary_inner(&mut self) -> NodeId {
        if matches!(self.kind(), TokenKind::Bang | TokenKind::Minus) {
            let start = self.start();
            let op = self.bump();
            let operand = self.unary();
            let node = self.node(NodeKind::Unary, start, SmallVec::from_elem(operand, 1));
            let text = Arc::from(self.slice(op.span));
            self.set_text(node, text);
            return node;
        }
        self.postfix()
    }

    fn postfix(&mut self) -> NodeId {
        let start = self.start();
        let mut node = self.primary();
        while self.at(TokenKind::Dot) && self.peek(1) == TokenKind::Ident {
            self.bump();
            let (name, _) = self.ident("member name");
            let select = self.node(NodeKind::MemberSelect, start, SmallVec::from_elem(node, 1));
            self.set_text(select, name);
            node = if self.at(TokenKind::LParen) {
                let mut children = SmallVec::from_elem(select, 1);
                children.extend(self.arguments());
                self.node(NodeKind::MethodInvocation, start, children)
            } else {
                select
            };
        }
        node
    }

    fn primary(&mut self) -> NodeId {
        let start = self.start();
        match self.kind() {
            TokenKind::IntLit => {
                let token = self.bump();
                self.leaf(NodeKind::IntLiteral, token)
            }
            TokenKind::StringLit => {
                let token = self.bump();
                self.leaf(NodeKind::StringLiteral, token)
            }
            TokenKind::CharLit => {
                let token = self.bump();
                self.leaf(NodeKind::CharLiteral, token)
            }
            TokenKind::True | TokenKind::False => {
                let token = self.bump();
                self.leaf(NodeKind::BooleanLiteral, token)
            }
            TokenKind::Null => {
                let token = self.bump();
                self.leaf(NodeKind::NullLiteral, token)
            }
            TokenKind::This | TokenKind::Super => {
                let token = self.bump();
                self.leaf(NodeKind::Identifier, token)
            }
            TokenKind::Ident => {
                let token = self.bump();
                let ident = self.leaf(NodeKind::Identifier, token);
                if self.at(TokenKind::LParen) {
                    let mut children = SmallVec::from_elem(ident, 1);
                    children.extend(self.arguments());
                    return self.node(NodeKind::MethodInvocation, start, children);
                }
                ident
            }
            TokenKind::New => {
                self.bump();
                let mut children = SmallVec::from_elem(self.class_type_or_error(), 1);
                if self.at(TokenKind::LParen) {
                    children.extend(self.arguments());
                } else {
                    self.expect(TokenKind::LParen, "`(` after `new` type");
                }
                if self.at(TokenKind::LBrace) {
                    children.push(self.anonymous_class());
                }
                self.node(NodeKind::NewClass, start, children)
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.expr();
                self.expect(TokenKind::RParen, "`)`");
                self.node(NodeKind::Parenthesized, start, SmallVec::from_elem(inner, 1))
            }
            _ => {
                let span = self.current().span;
                self.error(span, "expected an expression".to_string());
                self.arena
                    .alloc_leaf(NodeKind::Erroneous, Some(Span::new(start, start)), None)
            }
        }
    }

    /// Body of an anonymous class: a nameless `Class` node.
    fn anonymous_class(&mut self) -> NodeId {
        let start = self.start();
        self.bump();
        let mods = self.arena.alloc(NodeKind::Modifiers, None, Children::new());
        let mut children = SmallVec::from_elem(mods, 1);
        self.class_body("", &mut children);
        let class = self.node(NodeKind::Class, start, children);
        self.set_text(class, Arc::from(""));
        class
    }

    fn class_type_or_error(&mut self) -> NodeId {
        if self.at(TokenKind::Ident) {
            self.class_type()
        } else {
            self.parse_type()
        }
    }

    fn arguments(&mut self) -> Children {
        let mut args = Children::new();
        self.expect(TokenKind::LParen, "`(`");
        while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
            let before = self.pos;
            args.push(self.expr());
            if self.eat(TokenKind::Comma).is_none() || self.pos == before {
                break;
            }
        }
        self.expect(TokenKind::RParen, "`)` to close arguments");
        args
    }
}

#[cfg(test)]
mod tests;
