//! Iterator for grammar tokens.
//!
//! The lexer starts in the outer text mode and morphs into the tag
//! or comment mode when an opener is seen, switching back on the
//! matching closer. Border flags ride on the opener and closer
//! tokens; the parser slices them out of the source.
use logos::{Lexer as Lex, Logos, Span};

pub mod grammar;

pub use grammar::{Block, Comment, Extras, Tag};

/// Token emitted by the lexer iterator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Token {
    /// Token from the outer text mode.
    Block(Block, Span),
    /// Token from the comment mode.
    Comment(Comment, Span),
    /// Token from the in-tag expression mode.
    Tag(Tag, Span),
}

impl Token {
    /// Span into the source for this token.
    pub fn span(&self) -> &Span {
        match self {
            Token::Block(_, ref span) => span,
            Token::Comment(_, ref span) => span,
            Token::Tag(_, ref span) => span,
        }
    }

    /// Determine if this token is literal text.
    pub fn is_text(&self) -> bool {
        match self {
            Token::Block(ref t, _) => {
                t == &Block::Text || t == &Block::Newline
            }
            Token::Comment(ref t, _) => {
                t == &Comment::Text || t == &Comment::Newline
            }
            Token::Tag(_, _) => false,
        }
    }

    /// Determine if this token is a newline.
    pub fn is_newline(&self) -> bool {
        match *self {
            Token::Block(ref t, _) => t == &Block::Newline,
            Token::Comment(ref t, _) => t == &Comment::Newline,
            Token::Tag(ref t, _) => t == &Tag::Newline,
        }
    }
}

enum Modes<'source> {
    Block(Lex<'source, Block>),
    Comment(Lex<'source, Comment>),
    Tag(Lex<'source, Tag>),
}

impl<'source> Modes<'source> {
    fn new(s: &'source str) -> Self {
        Self::Block(Block::lexer(s))
    }
}

/// Iterator for a stream of grammar tokens.
pub struct Lexer<'source> {
    mode: Modes<'source>,
}

/// Clone lexers as we switch between modes.
impl<'source> Iterator for Lexer<'source> {
    type Item = Token;
    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.mode {
            Modes::Block(lexer) => {
                let result = lexer.next();
                let span = lexer.span();

                if let Some(token) = result {
                    if Block::StartEmit == token
                        || Block::StartAction == token
                    {
                        self.mode = Modes::Tag(lexer.to_owned().morph());
                    } else if Block::StartComment == token {
                        self.mode =
                            Modes::Comment(lexer.to_owned().morph());
                    }
                    Some(Token::Block(token, span))
                } else {
                    None
                }
            }
            Modes::Comment(lexer) => {
                let result = lexer.next();
                let span = lexer.span();

                if let Some(token) = result {
                    if Comment::End == token {
                        self.mode = Modes::Block(lexer.to_owned().morph());
                    }
                    Some(Token::Comment(token, span))
                } else {
                    None
                }
            }
            Modes::Tag(lexer) => {
                let result = lexer.next();
                let span = lexer.span();

                if let Some(token) = result {
                    if Tag::EndEmit == token || Tag::EndAction == token {
                        self.mode = Modes::Block(lexer.to_owned().morph());
                    }
                    Some(Token::Tag(token, span))
                } else {
                    None
                }
            }
        }
    }
}

fn normalize(tokens: Vec<Token>) -> Vec<Token> {
    let mut normalized: Vec<Token> = Vec::new();
    let mut span: Option<Span> = None;

    for t in tokens.into_iter() {
        if t.is_text() {
            if let Some(ref mut span) = span {
                span.end = t.span().end;
            } else {
                span = Some(t.span().clone());
            }
        } else {
            if let Some(span) = span.take() {
                normalized.push(Token::Block(Block::Text, span));
            }
            normalized.push(t);
        }
    }

    if let Some(span) = span.take() {
        normalized.push(Token::Block(Block::Text, span));
    }

    normalized
}

/// Get a token iterator for the given source template.
pub fn lex(s: &str) -> Lexer<'_> {
    Lexer {
        mode: Modes::new(s),
    }
}

/// Collect the input source into a vector of tokens.
///
/// If the normalized flag is given consecutive text tokens are
/// coalesced into a single token, which is useful for test cases;
/// the parser performs its own normalization.
pub fn collect(s: &str, normalized: bool) -> Vec<Token> {
    let tokens = lex(s).collect();
    if normalized {
        normalize(tokens)
    } else {
        tokens
    }
}
