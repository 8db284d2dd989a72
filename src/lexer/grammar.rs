//! Grammar token definitions for the lexer modes.
use logos::Logos;

/// Identity type for the lexer modes.
#[derive(Clone, Default)]
pub struct Extras;

/// Tokens for the outer text mode.
///
/// An opener consumes its optional border flag character so the flag
/// never leaks into the tag body.
#[derive(Logos, Clone, Debug, Eq, PartialEq)]
#[logos(extras = Extras)]
pub enum Block {
    #[regex(r"\{\{[-^+*]?")]
    StartEmit,

    #[regex(r"\{%[-^+*]?")]
    StartAction,

    #[regex(r"\{#[-^+*]?")]
    StartComment,

    #[regex(r".")]
    Text,

    #[token("\n")]
    Newline,

    #[error]
    Error,
}

/// Tokens for the comment mode; everything is skipped until the
/// closer, which may carry a border flag.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Logos)]
#[logos(extras = Extras)]
pub enum Comment {
    #[regex(r"[-^+*]?#\}")]
    End,

    #[regex(r".")]
    Text,

    #[token("\n")]
    Newline,

    #[error]
    Error,
}

/// Tokens for expression text inside emit and action tags.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Logos)]
#[logos(extras = Extras)]
#[logos(subpattern ident = r"[A-Za-z_][A-Za-z0-9_]*")]
pub enum Tag {
    #[token("and")]
    And,

    #[token("or")]
    Or,

    #[token("not")]
    Not,

    #[token("in")]
    In,

    // NOTE: the compartment prefix is part of the identifier token so
    // NOTE: the parser can split on the `@` without lookahead.
    #[regex(r"([lgpra]@)?(?&ident)", priority = 2)]
    Identifier,

    #[regex(r"[0-9]+\.[0-9]+")]
    Float,

    #[regex(r"[0-9]+")]
    Integer,

    #[regex(r#""(\\.|[^"\\\n])*""#)]
    DoubleString,

    #[regex(r"'(\\.|[^'\\\n])*'")]
    SingleString,

    #[token("(")]
    OpenParen,

    #[token(")")]
    CloseParen,

    #[token("[")]
    OpenBracket,

    #[token("]")]
    CloseBracket,

    #[token(":")]
    Colon,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token(";")]
    SemiColon,

    #[token("==")]
    Equal,

    #[token("!=")]
    NotEqual,

    #[token("<=")]
    LessEqual,

    #[token(">=")]
    GreaterEqual,

    #[token("<")]
    Less,

    #[token(">")]
    Greater,

    #[token("=")]
    Assign,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[regex(r"[-^+*]?\}\}")]
    EndEmit,

    #[regex(r"[-^+*]?%\}")]
    EndAction,

    #[regex(r"[ \t\r]+")]
    WhiteSpace,

    #[token("\n")]
    Newline,

    #[error]
    Error,
}
