//! Errors generated when compiling templates.
use std::fmt;

static SYNTAX_PREFIX: &str = "Syntax error";

/// Errors raised by the lexer and parsers.
///
/// Each variant carries a rendered source snippet locating the error.
#[derive(Eq, PartialEq)]
pub enum SyntaxError {
    /// An emit tag with no expression.
    EmptyTag(String),
    /// A token that does not fit the grammar at this position.
    Unexpected(String),
    /// A tag that is still open at the end of the source.
    UnterminatedTag(String),
    /// A segment that never saw its end tag.
    Unclosed(String),
    /// A tag closed with the delimiter of a different opener.
    MismatchedClose(String),
    /// A clause or end tag with no matching open segment.
    OrphanClause(String),
    /// An `elif` clause after `else` in the same segment.
    ClauseAfterElse(String),
    /// The same clause given twice in one tag.
    DuplicateClause(String),
    /// An action name the engine does not know.
    UnknownAction(String),
    /// An identifier was required.
    ExpectedIdentifier(String),
    /// Comparison operators do not chain.
    ChainedComparison(String),
    /// A numeric literal that does not fit the value model.
    BadNumberLiteral(String),
    /// Tokens left over after a complete clause.
    TrailingTokens(String),
    /// A `call` action whose expression has no argument list.
    CallArguments(String),
    /// A compartment name the engine does not know.
    UnknownCompartment(String),
    /// A strip or autostrip mode the engine does not know.
    UnknownMode(String),
}

impl SyntaxError {
    fn message(&self) -> &'static str {
        match *self {
            Self::EmptyTag(_) => "tag is empty",
            Self::Unexpected(_) => "unexpected token",
            Self::UnterminatedTag(_) => "tag not terminated",
            Self::Unclosed(_) => "segment is missing its end tag",
            Self::MismatchedClose(_) => {
                "closing delimiter does not match the opening tag"
            }
            Self::OrphanClause(_) => {
                "clause has no matching open segment"
            }
            Self::ClauseAfterElse(_) => "'elif' may not follow 'else'",
            Self::DuplicateClause(_) => "clause given more than once",
            Self::UnknownAction(_) => "unknown action name",
            Self::ExpectedIdentifier(_) => "expecting identifier",
            Self::ChainedComparison(_) => {
                "comparison operators do not chain"
            }
            Self::BadNumberLiteral(_) => "number literal out of range",
            Self::TrailingTokens(_) => "unexpected trailing tokens",
            Self::CallArguments(_) => {
                "call requires an argument list"
            }
            Self::UnknownCompartment(_) => "unknown compartment name",
            Self::UnknownMode(_) => "unknown whitespace mode",
        }
    }

    /// The rendered source snippet for this error.
    pub fn info(&self) -> &str {
        match *self {
            Self::EmptyTag(ref info)
            | Self::Unexpected(ref info)
            | Self::UnterminatedTag(ref info)
            | Self::Unclosed(ref info)
            | Self::MismatchedClose(ref info)
            | Self::OrphanClause(ref info)
            | Self::ClauseAfterElse(ref info)
            | Self::DuplicateClause(ref info)
            | Self::UnknownAction(ref info)
            | Self::ExpectedIdentifier(ref info)
            | Self::ChainedComparison(ref info)
            | Self::BadNumberLiteral(ref info)
            | Self::TrailingTokens(ref info)
            | Self::CallArguments(ref info)
            | Self::UnknownCompartment(ref info)
            | Self::UnknownMode(ref info) => info,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", SYNTAX_PREFIX, self.message())
    }
}

impl fmt::Debug for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self)?;
        write!(f, "{}", self.info())
    }
}

impl std::error::Error for SyntaxError {}
