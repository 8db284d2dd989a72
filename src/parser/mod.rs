//! Convert the lexer token stream to tree nodes.
//!
//! Parsing runs in two passes: a scan pass that folds the raw token
//! stream into text spans and whole tags (attaching border flags to
//! the adjacent text, which is how whitespace control crosses
//! segment boundaries), and a tree pass that validates nesting and
//! builds the node tree.
use std::rc::Rc;
use std::vec::IntoIter;

use logos::Span;

use crate::{
    error::{ErrorInfo, SourcePos, SyntaxError},
    lexer::{self, Block, Comment, Tag, Token},
    parser::ast::{Assign, Branch, Case, Node, SetKind, TextNode},
    strip::{Flag, Mode},
    value::Compartment,
    SyntaxResult,
};

pub mod ast;
pub(crate) mod expr;

/// Default file name.
static UNKNOWN: &str = "unknown";

/// Set the file name used in error messages.
///
/// It is also possible to set a line offset if your template is
/// being extracted from a larger document.
#[derive(Debug)]
pub struct ParserOptions {
    /// The name of a file for the template source being parsed.
    pub file_name: String,
    /// A line offset into the file for error reporting; the first
    /// line of a standalone template is line one.
    pub line_offset: usize,
}

impl ParserOptions {
    /// Create parser options using the given `file_name`.
    pub fn new(file_name: String) -> Self {
        Self {
            file_name,
            line_offset: 0,
        }
    }
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            file_name: UNKNOWN.to_string(),
            line_offset: 0,
        }
    }
}

#[derive(Debug)]
struct ParseState {
    file_name: String,
    line: usize,
}

impl From<&ParserOptions> for ParseState {
    fn from(opts: &ParserOptions) -> Self {
        Self {
            file_name: opts.file_name.clone(),
            line: opts.line_offset + 1,
        }
    }
}

/// A tag flattened out of the token stream by the scan pass.
enum RawTag {
    Text {
        text: String,
        left: Flag,
        right: Flag,
        line: usize,
    },
    Emit {
        tokens: Vec<(Tag, Span)>,
        line: usize,
        at: usize,
    },
    Action {
        tokens: Vec<(Tag, Span)>,
        line: usize,
        at: usize,
    },
}

/// A terminator tag returned out of a nested body.
struct Stop {
    name: String,
    tokens: Vec<(Tag, Span)>,
    line: usize,
    at: usize,
}

/// Cursor over the tokens of a single tag clause.
pub(crate) struct TagCursor<'a> {
    tokens: &'a [(Tag, Span)],
    pos: usize,
    source: &'a str,
    file_name: &'a str,
    line: usize,
    at: usize,
}

impl<'a> TagCursor<'a> {
    fn new(
        tokens: &'a [(Tag, Span)],
        source: &'a str,
        file_name: &'a str,
        line: usize,
        at: usize,
    ) -> Self {
        Self {
            tokens,
            pos: 0,
            source,
            file_name,
            line,
            at,
        }
    }

    pub(crate) fn peek(&self) -> Option<Tag> {
        self.tokens.get(self.pos).map(|(t, _)| *t)
    }

    pub(crate) fn next(&mut self) -> Option<(Tag, Span)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    pub(crate) fn slice(&self, span: &Span) -> &'a str {
        &self.source[span.start..span.end]
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(crate) fn expect(&mut self, tag: Tag) -> SyntaxResult<Span> {
        match self.tokens.get(self.pos) {
            Some((t, span)) if *t == tag => {
                self.pos += 1;
                Ok(span.clone())
            }
            _ => Err(match tag {
                Tag::Identifier => {
                    self.error(SyntaxError::ExpectedIdentifier)
                }
                _ => self.error(SyntaxError::Unexpected),
            }),
        }
    }

    /// Require the cursor to be exhausted.
    pub(crate) fn finish(&self) -> SyntaxResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.error(SyntaxError::TrailingTokens))
        }
    }

    /// Build a syntax error pointing at the current token.
    pub(crate) fn error(
        &self,
        ctor: fn(String) -> SyntaxError,
    ) -> SyntaxError {
        let byte = match self.tokens.get(self.pos) {
            Some((_, span)) => span.start,
            None => self
                .tokens
                .last()
                .map(|(_, span)| span.end)
                .unwrap_or(self.at),
        };
        let info = ErrorInfo::new(
            self.source,
            self.file_name,
            SourcePos(self.line, byte),
            vec![],
        );
        ctor(info.into())
    }
}

/// Convert template source to a list of tree nodes.
pub struct Parser<'source> {
    source: &'source str,
    state: ParseState,
}

impl<'source> Parser<'source> {
    /// Create a new parser for the given source template.
    pub fn new(source: &'source str, options: ParserOptions) -> Self {
        let state = ParseState::from(&options);
        Self { source, state }
    }

    /// Parse the source into the root node list.
    pub fn parse(&mut self) -> SyntaxResult<Vec<Node>> {
        let raw = self.scan()?;
        let mut iter = raw.into_iter();
        let (nodes, _) = self.parse_nodes(&mut iter, &[])?;
        log::trace!(
            "parsed template '{}' ({} root nodes)",
            self.state.file_name,
            nodes.len()
        );
        Ok(nodes)
    }

    fn error_line(
        &self,
        byte: usize,
        line: usize,
        ctor: fn(String) -> SyntaxError,
    ) -> SyntaxError {
        let info = ErrorInfo::new(
            self.source,
            &self.state.file_name,
            SourcePos(line, byte),
            vec![],
        );
        ctor(info.into())
    }

    fn cursor<'t>(
        &'t self,
        tokens: &'t [(Tag, Span)],
        line: usize,
        at: usize,
    ) -> TagCursor<'t> {
        TagCursor::new(
            tokens,
            self.source,
            &self.state.file_name,
            line,
            at,
        )
    }

    // ----- scan pass -----

    fn opener_flag(&self, span: &Span) -> Flag {
        self.source[span.start..span.end]
            .chars()
            .nth(2)
            .and_then(Flag::from_char)
            .unwrap_or(Flag::None)
    }

    fn closer_flag(slice: &str) -> Flag {
        slice
            .chars()
            .next()
            .and_then(Flag::from_char)
            .unwrap_or(Flag::None)
    }

    fn accumulate(
        &self,
        text: &mut Option<(Span, usize)>,
        span: Span,
    ) {
        match text {
            Some((ref mut acc, _)) => acc.end = span.end,
            None => *text = Some((span, self.state.line)),
        }
    }

    fn flush_text(
        &self,
        raw: &mut Vec<RawTag>,
        text: &mut Option<(Span, usize)>,
        pending: &mut Flag,
        right: Flag,
    ) {
        let left = std::mem::replace(pending, Flag::None);
        match text.take() {
            Some((span, line)) => raw.push(RawTag::Text {
                text: self.source[span.start..span.end].to_string(),
                left,
                right,
                line,
            }),
            None => {
                // An empty span between two tags still honours the
                // insert flags.
                let inserts = |f: Flag| {
                    matches!(
                        f,
                        Flag::InsertNewline | Flag::InsertSpace
                    )
                };
                if inserts(left) || inserts(right) {
                    raw.push(RawTag::Text {
                        text: String::new(),
                        left,
                        right,
                        line: self.state.line,
                    });
                }
            }
        }
    }

    fn scan(&mut self) -> SyntaxResult<Vec<RawTag>> {
        let mut raw: Vec<RawTag> = Vec::new();
        let mut text: Option<(Span, usize)> = None;
        let mut pending = Flag::None;

        let mut tokens = lexer::lex(self.source);
        while let Some(token) = tokens.next() {
            match token {
                Token::Block(lex, span) => match lex {
                    Block::Text => self.accumulate(&mut text, span),
                    Block::Newline => {
                        self.accumulate(&mut text, span);
                        self.state.line += 1;
                    }
                    Block::StartEmit | Block::StartAction => {
                        let left = self.opener_flag(&span);
                        let line = self.state.line;
                        let at = span.start;
                        self.flush_text(
                            &mut raw, &mut text, &mut pending, left,
                        );
                        let is_action = lex == Block::StartAction;
                        let (body, right) =
                            self.scan_tag(&mut tokens, is_action, at)?;
                        pending = right;
                        if is_action {
                            raw.push(RawTag::Action {
                                tokens: body,
                                line,
                                at,
                            });
                        } else {
                            raw.push(RawTag::Emit {
                                tokens: body,
                                line,
                                at,
                            });
                        }
                    }
                    Block::StartComment => {
                        let left = self.opener_flag(&span);
                        let at = span.start;
                        self.flush_text(
                            &mut raw, &mut text, &mut pending, left,
                        );
                        pending = self.scan_comment(&mut tokens, at)?;
                    }
                    Block::Error => {
                        return Err(self.error_line(
                            span.start,
                            self.state.line,
                            SyntaxError::Unexpected,
                        ))
                    }
                },
                // The scan helpers consume every token of the inner
                // modes; anything else here is a lexer fault.
                other => {
                    return Err(self.error_line(
                        other.span().start,
                        self.state.line,
                        SyntaxError::Unexpected,
                    ))
                }
            }
        }
        self.flush_text(&mut raw, &mut text, &mut pending, Flag::None);
        Ok(raw)
    }

    fn scan_tag(
        &mut self,
        tokens: &mut lexer::Lexer<'source>,
        is_action: bool,
        at: usize,
    ) -> SyntaxResult<(Vec<(Tag, Span)>, Flag)> {
        let mut body: Vec<(Tag, Span)> = Vec::new();
        while let Some(token) = tokens.next() {
            match token {
                Token::Tag(lex, span) => match lex {
                    Tag::WhiteSpace => {}
                    Tag::Newline => self.state.line += 1,
                    Tag::EndEmit | Tag::EndAction => {
                        let closes_action = lex == Tag::EndAction;
                        if closes_action != is_action {
                            return Err(self.error_line(
                                span.start,
                                self.state.line,
                                SyntaxError::MismatchedClose,
                            ));
                        }
                        let flag = Self::closer_flag(
                            &self.source[span.start..span.end],
                        );
                        return Ok((body, flag));
                    }
                    Tag::Error => {
                        return Err(self.error_line(
                            span.start,
                            self.state.line,
                            SyntaxError::Unexpected,
                        ))
                    }
                    _ => body.push((lex, span)),
                },
                other => {
                    return Err(self.error_line(
                        other.span().start,
                        self.state.line,
                        SyntaxError::Unexpected,
                    ))
                }
            }
        }
        Err(self.error_line(
            at,
            self.state.line,
            SyntaxError::UnterminatedTag,
        ))
    }

    fn scan_comment(
        &mut self,
        tokens: &mut lexer::Lexer<'source>,
        at: usize,
    ) -> SyntaxResult<Flag> {
        while let Some(token) = tokens.next() {
            match token {
                Token::Comment(lex, span) => match lex {
                    Comment::Text => {}
                    Comment::Newline => self.state.line += 1,
                    Comment::End => {
                        return Ok(Self::closer_flag(
                            &self.source[span.start..span.end],
                        ))
                    }
                    Comment::Error => {
                        return Err(self.error_line(
                            span.start,
                            self.state.line,
                            SyntaxError::Unexpected,
                        ))
                    }
                },
                other => {
                    return Err(self.error_line(
                        other.span().start,
                        self.state.line,
                        SyntaxError::Unexpected,
                    ))
                }
            }
        }
        Err(self.error_line(
            at,
            self.state.line,
            SyntaxError::UnterminatedTag,
        ))
    }

    // ----- tree pass -----

    fn parse_nodes(
        &mut self,
        iter: &mut IntoIter<RawTag>,
        stop: &[&str],
    ) -> SyntaxResult<(Vec<Node>, Option<Stop>)> {
        let mut nodes = Vec::new();
        while let Some(tag) = iter.next() {
            match tag {
                RawTag::Text {
                    text,
                    left,
                    right,
                    line,
                } => nodes.push(Node::Text(TextNode {
                    text,
                    left,
                    right,
                    line,
                })),
                RawTag::Emit { tokens, line, at } => {
                    if tokens.is_empty() {
                        return Err(self.error_line(
                            at,
                            line,
                            SyntaxError::EmptyTag,
                        ));
                    }
                    let mut cur = self.cursor(&tokens, line, at);
                    let expr = expr::parse_complete(&mut cur)?;
                    nodes.push(Node::Emit { expr, line });
                }
                RawTag::Action { tokens, line, at } => {
                    // A bare action tag exists only for its border
                    // flags.
                    if tokens.is_empty() {
                        continue;
                    }
                    let (name, rest) =
                        self.action_name(tokens, line, at)?;
                    if stop.contains(&name.as_str()) {
                        return Ok((
                            nodes,
                            Some(Stop {
                                name,
                                tokens: rest,
                                line,
                                at,
                            }),
                        ));
                    }
                    if is_clause(&name) {
                        return Err(self.error_line(
                            at,
                            line,
                            SyntaxError::OrphanClause,
                        ));
                    }
                    let node = self
                        .parse_action(&name, rest, line, at, iter)?;
                    nodes.push(node);
                }
            }
        }
        Ok((nodes, None))
    }

    fn action_name(
        &self,
        tokens: Vec<(Tag, Span)>,
        line: usize,
        at: usize,
    ) -> SyntaxResult<(String, Vec<(Tag, Span)>)> {
        match tokens.first() {
            Some((Tag::Identifier, span)) => {
                let name = &self.source[span.start..span.end];
                if name.contains('@') {
                    return Err(self.error_line(
                        span.start,
                        line,
                        SyntaxError::ExpectedIdentifier,
                    ));
                }
                Ok((name.to_string(), tokens[1..].to_vec()))
            }
            Some((_, span)) => Err(self.error_line(
                span.start,
                line,
                SyntaxError::ExpectedIdentifier,
            )),
            None => Err(self.error_line(
                at,
                line,
                SyntaxError::EmptyTag,
            )),
        }
    }

    fn close_stop(&self, stop: &Stop) -> SyntaxResult<()> {
        if stop.tokens.is_empty() {
            Ok(())
        } else {
            Err(self.error_line(
                stop.at,
                stop.line,
                SyntaxError::TrailingTokens,
            ))
        }
    }

    /// Parse a body terminated by `end` with no other clauses.
    fn parse_block(
        &mut self,
        iter: &mut IntoIter<RawTag>,
        end: &str,
        open_line: usize,
        open_at: usize,
    ) -> SyntaxResult<Vec<Node>> {
        let (body, stop) = self.parse_nodes(iter, &[end])?;
        match stop {
            Some(stop) => {
                self.close_stop(&stop)?;
                Ok(body)
            }
            None => Err(self.error_line(
                open_at,
                open_line,
                SyntaxError::Unclosed,
            )),
        }
    }

    /// Parse a body terminated by `end` with an optional bare
    /// `else` clause.
    fn parse_block_with_else(
        &mut self,
        iter: &mut IntoIter<RawTag>,
        end: &str,
        open_line: usize,
        open_at: usize,
    ) -> SyntaxResult<(Vec<Node>, Option<Vec<Node>>)> {
        let (body, stop) = self.parse_nodes(iter, &["else", end])?;
        let stop = match stop {
            Some(stop) => stop,
            None => {
                return Err(self.error_line(
                    open_at,
                    open_line,
                    SyntaxError::Unclosed,
                ))
            }
        };
        if stop.name == "else" {
            self.close_stop(&stop)?;
            let (otherwise, stop) = self.parse_nodes(iter, &[end])?;
            match stop {
                Some(stop) => {
                    self.close_stop(&stop)?;
                    Ok((body, Some(otherwise)))
                }
                None => Err(self.error_line(
                    open_at,
                    open_line,
                    SyntaxError::Unclosed,
                )),
            }
        } else {
            self.close_stop(&stop)?;
            Ok((body, None))
        }
    }

    fn parse_assigns(
        &self,
        cur: &mut TagCursor<'_>,
    ) -> SyntaxResult<Vec<Assign>> {
        let mut assigns = Vec::new();
        loop {
            let target = expr::target(cur)?;
            cur.expect(Tag::Assign)?;
            let rhs = expr::parse(cur)?;
            assigns.push(Assign { target, expr: rhs });
            if cur.peek() == Some(Tag::Comma) {
                cur.advance();
            } else {
                break;
            }
        }
        cur.finish()?;
        Ok(assigns)
    }

    fn parse_assigns_opt(
        &self,
        cur: &mut TagCursor<'_>,
    ) -> SyntaxResult<Vec<Assign>> {
        if cur.is_empty() {
            Ok(Vec::new())
        } else {
            self.parse_assigns(cur)
        }
    }

    fn parse_action(
        &mut self,
        name: &str,
        rest: Vec<(Tag, Span)>,
        line: usize,
        at: usize,
        iter: &mut IntoIter<RawTag>,
    ) -> SyntaxResult<Node> {
        match name {
            "if" => self.parse_if(rest, line, at, iter),
            "for" => self.parse_for(rest, line, at, iter),
            "foreach" => self.parse_foreach(rest, line, at, iter),
            "switch" => self.parse_switch(rest, line, at, iter),
            "set" => self.parse_set(SetKind::Default, rest, line, at),
            "global" => {
                self.parse_set(SetKind::Global, rest, line, at)
            }
            "template" => {
                self.parse_set(SetKind::Template, rest, line, at)
            }
            "private" => {
                self.parse_set(SetKind::Private, rest, line, at)
            }
            "unset" => {
                let mut cur = self.cursor(&rest, line, at);
                let mut targets = vec![expr::target(&mut cur)?];
                while cur.peek() == Some(Tag::Comma) {
                    cur.advance();
                    targets.push(expr::target(&mut cur)?);
                }
                cur.finish()?;
                Ok(Node::Unset { targets, line })
            }
            "clear" => {
                let mut cur = self.cursor(&rest, line, at);
                let compartment = self.parse_compartment(&mut cur)?;
                cur.finish()?;
                Ok(Node::Clear { compartment, line })
            }
            "scope" => {
                let mut cur = self.cursor(&rest, line, at);
                cur.finish()?;
                let body =
                    self.parse_block(iter, "endscope", line, at)?;
                Ok(Node::Scope { body, line })
            }
            "include" => self.parse_include(rest, line, at),
            "expand" => self.parse_expand(rest, line, at),
            "return" => {
                let mut cur = self.cursor(&rest, line, at);
                let assigns = self.parse_assigns(&mut cur)?;
                Ok(Node::Return { assigns, line })
            }
            "def" => self.parse_def(rest, line, at, iter),
            "call" => {
                let mut cur = self.cursor(&rest, line, at);
                let expr = expr::parse_complete(&mut cur)?;
                match expr {
                    ast::Expr::Call(target, args) => Ok(Node::Call {
                        target: *target,
                        args,
                        line,
                    }),
                    _ => Err(self.error_line(
                        at,
                        line,
                        SyntaxError::CallArguments,
                    )),
                }
            }
            "section" => {
                let mut cur = self.cursor(&rest, line, at);
                let name = expr::parse_complete(&mut cur)?;
                let body =
                    self.parse_block(iter, "endsection", line, at)?;
                Ok(Node::Section { name, body, line })
            }
            "use" => {
                let mut cur = self.cursor(&rest, line, at);
                let name = expr::parse_complete(&mut cur)?;
                Ok(Node::Use { name, line })
            }
            "var" => {
                let mut cur = self.cursor(&rest, line, at);
                let target = expr::target(&mut cur)?;
                cur.finish()?;
                let body =
                    self.parse_block(iter, "endvar", line, at)?;
                Ok(Node::Var { target, body, line })
            }
            "error" => {
                let mut cur = self.cursor(&rest, line, at);
                let expr = expr::parse_complete(&mut cur)?;
                Ok(Node::Error { expr, line })
            }
            "import" => {
                let mut cur = self.cursor(&rest, line, at);
                let assigns = self.parse_assigns(&mut cur)?;
                Ok(Node::Import { assigns, line })
            }
            "do" => {
                let mut cur = self.cursor(&rest, line, at);
                let mut exprs = vec![expr::parse(&mut cur)?];
                while cur.peek() == Some(Tag::Comma) {
                    cur.advance();
                    exprs.push(expr::parse(&mut cur)?);
                }
                cur.finish()?;
                Ok(Node::Do { exprs, line })
            }
            "hook" | "rhook" => {
                self.parse_hook(name == "rhook", rest, line, at)
            }
            "strip" => self.parse_strip(rest, line, at, iter),
            "autostrip" => {
                let mut cur = self.cursor(&rest, line, at);
                let span = cur.expect(Tag::Identifier)?;
                let mode = Mode::from_name(cur.slice(&span)).ok_or_else(
                    || cur.error(SyntaxError::UnknownMode),
                )?;
                cur.finish()?;
                Ok(Node::Autostrip { mode, line })
            }
            "break" => {
                let cur = self.cursor(&rest, line, at);
                cur.finish()?;
                Ok(Node::Break { line })
            }
            "continue" => {
                let cur = self.cursor(&rest, line, at);
                cur.finish()?;
                Ok(Node::Continue { line })
            }
            _ => Err(self.error_line(
                at,
                line,
                SyntaxError::UnknownAction,
            )),
        }
    }

    fn parse_compartment(
        &self,
        cur: &mut TagCursor<'_>,
    ) -> SyntaxResult<Compartment> {
        let span = cur.expect(Tag::Identifier)?;
        Compartment::from_name(cur.slice(&span))
            .ok_or_else(|| cur.error(SyntaxError::UnknownCompartment))
    }

    fn parse_if(
        &mut self,
        rest: Vec<(Tag, Span)>,
        line: usize,
        at: usize,
        iter: &mut IntoIter<RawTag>,
    ) -> SyntaxResult<Node> {
        let mut cur = self.cursor(&rest, line, at);
        let cond = expr::parse_complete(&mut cur)?;
        let (body, mut stop) =
            self.parse_nodes(iter, &["elif", "else", "endif"])?;
        let mut branches = vec![Branch { cond, body }];
        let mut otherwise = None;
        let mut else_seen = false;
        loop {
            let clause = match stop.take() {
                Some(clause) => clause,
                None => {
                    return Err(self.error_line(
                        at,
                        line,
                        SyntaxError::Unclosed,
                    ))
                }
            };
            match clause.name.as_str() {
                "endif" => {
                    self.close_stop(&clause)?;
                    break;
                }
                "elif" => {
                    if else_seen {
                        return Err(self.error_line(
                            clause.at,
                            clause.line,
                            SyntaxError::ClauseAfterElse,
                        ));
                    }
                    let mut cur = self.cursor(
                        &clause.tokens,
                        clause.line,
                        clause.at,
                    );
                    let cond = expr::parse_complete(&mut cur)?;
                    let (body, next) = self.parse_nodes(
                        iter,
                        &["elif", "else", "endif"],
                    )?;
                    branches.push(Branch { cond, body });
                    stop = next;
                }
                "else" => {
                    self.close_stop(&clause)?;
                    else_seen = true;
                    let (body, next) =
                        self.parse_nodes(iter, &["elif", "endif"])?;
                    otherwise = Some(body);
                    stop = next;
                }
                _ => {
                    return Err(self.error_line(
                        clause.at,
                        clause.line,
                        SyntaxError::Unexpected,
                    ))
                }
            }
        }
        Ok(Node::If {
            branches,
            otherwise,
            line,
        })
    }

    fn parse_for(
        &mut self,
        rest: Vec<(Tag, Span)>,
        line: usize,
        at: usize,
        iter: &mut IntoIter<RawTag>,
    ) -> SyntaxResult<Node> {
        let parts: Vec<&[(Tag, Span)]> =
            rest.split(|(t, _)| *t == Tag::SemiColon).collect();
        if parts.len() != 3 {
            return Err(self.error_line(
                at,
                line,
                SyntaxError::Unexpected,
            ));
        }
        let mut cur = self.cursor(parts[0], line, at);
        let init = self.parse_assigns_opt(&mut cur)?;
        let mut cur = self.cursor(parts[1], line, at);
        let test = expr::parse_complete(&mut cur)?;
        let mut cur = self.cursor(parts[2], line, at);
        let incr = self.parse_assigns_opt(&mut cur)?;
        let (body, otherwise) =
            self.parse_block_with_else(iter, "endfor", line, at)?;
        Ok(Node::For {
            init,
            test,
            incr,
            body,
            otherwise,
            line,
        })
    }

    fn parse_foreach(
        &mut self,
        rest: Vec<(Tag, Span)>,
        line: usize,
        at: usize,
        iter: &mut IntoIter<RawTag>,
    ) -> SyntaxResult<Node> {
        let mut cur = self.cursor(&rest, line, at);
        let target = expr::target(&mut cur)?;
        let index = if cur.peek() == Some(Tag::Comma) {
            cur.advance();
            Some(expr::target(&mut cur)?)
        } else {
            None
        };
        cur.expect(Tag::In)?;
        let iterable = expr::parse_complete(&mut cur)?;
        let (body, otherwise) =
            self.parse_block_with_else(iter, "endforeach", line, at)?;
        Ok(Node::Foreach {
            target,
            index,
            iterable,
            body,
            otherwise,
            line,
        })
    }

    fn parse_switch(
        &mut self,
        rest: Vec<(Tag, Span)>,
        line: usize,
        at: usize,
        iter: &mut IntoIter<RawTag>,
    ) -> SyntaxResult<Node> {
        let mut cur = self.cursor(&rest, line, at);
        let subject = expr::parse_complete(&mut cur)?;
        // Only literal text may sit between `switch` and the first
        // `case`; it is discarded.
        let (lead, mut stop) =
            self.parse_nodes(iter, &["case", "else", "endswitch"])?;
        if lead.iter().any(|n| !matches!(n, Node::Text(_))) {
            return Err(self.error_line(
                at,
                line,
                SyntaxError::Unexpected,
            ));
        }
        let mut cases = Vec::new();
        let mut default = None;
        loop {
            let clause = match stop.take() {
                Some(clause) => clause,
                None => {
                    return Err(self.error_line(
                        at,
                        line,
                        SyntaxError::Unclosed,
                    ))
                }
            };
            match clause.name.as_str() {
                "endswitch" => {
                    self.close_stop(&clause)?;
                    break;
                }
                "case" => {
                    let mut cur = self.cursor(
                        &clause.tokens,
                        clause.line,
                        clause.at,
                    );
                    let op = match cur
                        .peek()
                        .and_then(expr::comparison)
                    {
                        Some(op) => {
                            cur.advance();
                            op
                        }
                        None => {
                            return Err(cur
                                .error(SyntaxError::Unexpected))
                        }
                    };
                    let rhs = expr::parse_complete(&mut cur)?;
                    let (body, next) = self.parse_nodes(
                        iter,
                        &["case", "else", "endswitch"],
                    )?;
                    cases.push(Case { op, rhs, body });
                    stop = next;
                }
                "else" => {
                    self.close_stop(&clause)?;
                    let (body, next) =
                        self.parse_nodes(iter, &["endswitch"])?;
                    default = Some(body);
                    stop = next;
                }
                _ => {
                    return Err(self.error_line(
                        clause.at,
                        clause.line,
                        SyntaxError::Unexpected,
                    ))
                }
            }
        }
        Ok(Node::Switch {
            subject,
            cases,
            default,
            line,
        })
    }

    fn parse_set(
        &mut self,
        kind: SetKind,
        rest: Vec<(Tag, Span)>,
        line: usize,
        at: usize,
    ) -> SyntaxResult<Node> {
        let parts: Vec<&[(Tag, Span)]> =
            rest.split(|(t, _)| *t == Tag::SemiColon).collect();
        if parts.len() > 2 {
            return Err(self.error_line(
                at,
                line,
                SyntaxError::Unexpected,
            ));
        }
        let mut cur = self.cursor(parts[0], line, at);
        let assigns = self.parse_assigns(&mut cur)?;
        let otherwise = if parts.len() == 2 {
            let mut cur = self.cursor(parts[1], line, at);
            let span = cur.expect(Tag::Identifier)?;
            if cur.slice(&span) != "else" {
                return Err(cur.error(SyntaxError::Unexpected));
            }
            Some(self.parse_assigns(&mut cur)?)
        } else {
            None
        };
        Ok(Node::Set {
            kind,
            assigns,
            otherwise,
            line,
        })
    }

    fn parse_include(
        &mut self,
        rest: Vec<(Tag, Span)>,
        line: usize,
        at: usize,
    ) -> SyntaxResult<Node> {
        let parts: Vec<&[(Tag, Span)]> =
            rest.split(|(t, _)| *t == Tag::SemiColon).collect();
        let mut cur = self.cursor(parts[0], line, at);
        let path = expr::parse_complete(&mut cur)?;
        let mut returns = None;
        let mut with = Vec::new();
        let mut with_seen = false;
        for part in &parts[1..] {
            let mut cur = self.cursor(part, line, at);
            let span = cur.expect(Tag::Identifier)?;
            match cur.slice(&span) {
                "return" => {
                    if returns.is_some() {
                        return Err(cur
                            .error(SyntaxError::DuplicateClause));
                    }
                    returns = Some(expr::target(&mut cur)?);
                    cur.finish()?;
                }
                "with" => {
                    if with_seen {
                        return Err(cur
                            .error(SyntaxError::DuplicateClause));
                    }
                    with_seen = true;
                    with = self.parse_assigns(&mut cur)?;
                }
                _ => {
                    return Err(cur.error(SyntaxError::Unexpected))
                }
            }
        }
        Ok(Node::Include {
            path,
            returns,
            with,
            line,
        })
    }

    fn parse_expand(
        &mut self,
        rest: Vec<(Tag, Span)>,
        line: usize,
        at: usize,
    ) -> SyntaxResult<Node> {
        let parts: Vec<&[(Tag, Span)]> =
            rest.split(|(t, _)| *t == Tag::SemiColon).collect();
        if parts.len() > 2 {
            return Err(self.error_line(
                at,
                line,
                SyntaxError::Unexpected,
            ));
        }
        let mut cur = self.cursor(parts[0], line, at);
        let expr = expr::parse_complete(&mut cur)?;
        let compartment = if parts.len() == 2 {
            let mut cur = self.cursor(parts[1], line, at);
            let compartment = self.parse_compartment(&mut cur)?;
            cur.finish()?;
            compartment
        } else {
            Compartment::Local
        };
        Ok(Node::Expand {
            expr,
            compartment,
            line,
        })
    }

    fn parse_def(
        &mut self,
        rest: Vec<(Tag, Span)>,
        line: usize,
        at: usize,
        iter: &mut IntoIter<RawTag>,
    ) -> SyntaxResult<Node> {
        let mut cur = self.cursor(&rest, line, at);
        let name = expr::plain_identifier(&mut cur)?;
        let mut params = Vec::new();
        if cur.peek() == Some(Tag::OpenParen) {
            cur.advance();
            if cur.peek() == Some(Tag::CloseParen) {
                cur.advance();
            } else {
                loop {
                    params.push(expr::plain_identifier(&mut cur)?);
                    match cur.peek() {
                        Some(Tag::Comma) => cur.advance(),
                        Some(Tag::CloseParen) => {
                            cur.advance();
                            break;
                        }
                        _ => {
                            return Err(cur
                                .error(SyntaxError::Unexpected))
                        }
                    }
                }
            }
        }
        cur.finish()?;
        let body = self.parse_block(iter, "enddef", line, at)?;
        Ok(Node::Def {
            name,
            params,
            body: Rc::new(body),
            line,
        })
    }

    fn parse_hook(
        &mut self,
        capture: bool,
        rest: Vec<(Tag, Span)>,
        line: usize,
        at: usize,
    ) -> SyntaxResult<Node> {
        let parts: Vec<&[(Tag, Span)]> =
            rest.split(|(t, _)| *t == Tag::SemiColon).collect();
        if parts.len() > 2 {
            return Err(self.error_line(
                at,
                line,
                SyntaxError::Unexpected,
            ));
        }
        let mut cur = self.cursor(parts[0], line, at);
        let name = expr::parse_complete(&mut cur)?;
        let with = if parts.len() == 2 {
            let mut cur = self.cursor(parts[1], line, at);
            let span = cur.expect(Tag::Identifier)?;
            if cur.slice(&span) != "with" {
                return Err(cur.error(SyntaxError::Unexpected));
            }
            self.parse_assigns(&mut cur)?
        } else {
            Vec::new()
        };
        Ok(Node::Hook {
            name,
            with,
            capture,
            line,
        })
    }

    fn parse_strip(
        &mut self,
        rest: Vec<(Tag, Span)>,
        line: usize,
        at: usize,
        iter: &mut IntoIter<RawTag>,
    ) -> SyntaxResult<Node> {
        let mut cur = self.cursor(&rest, line, at);
        let mode = if cur.is_empty() {
            Mode::Strip
        } else {
            let span = cur.expect(Tag::Identifier)?;
            match cur.slice(&span) {
                "on" => Mode::Strip,
                "off" => Mode::None,
                "trim" => Mode::Trim,
                _ => {
                    return Err(cur.error(SyntaxError::UnknownMode))
                }
            }
        };
        cur.finish()?;
        let body = self.parse_block(iter, "endstrip", line, at)?;
        Ok(Node::Strip { mode, body, line })
    }
}

fn is_clause(name: &str) -> bool {
    matches!(
        name,
        "elif"
            | "else"
            | "case"
            | "endif"
            | "endfor"
            | "endforeach"
            | "endswitch"
            | "endscope"
            | "enddef"
            | "endsection"
            | "endvar"
            | "endstrip"
    )
}
