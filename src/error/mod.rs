//! Error types.
use std::fmt;

pub mod render;
pub mod source;
pub mod syntax;

pub use render::{RenderError, RenderErrorKind, TraceFrame};
pub use source::{ErrorInfo, SourcePos};
pub use syntax::SyntaxError;

/// Generic error type that wraps more specific types and is
/// returned by the `Environment`.
#[derive(Eq, PartialEq)]
pub enum Error {
    /// Failure compiling a template.
    Syntax(SyntaxError),
    /// Failure rendering a template.
    Render(RenderError),
    /// A named template is neither cached nor loadable.
    TemplateNotFound(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Syntax(ref e) => fmt::Display::fmt(e, f),
            Self::Render(ref e) => fmt::Display::fmt(e, f),
            Self::TemplateNotFound(ref name) => {
                write!(f, "Template not found '{}'", name)
            }
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Syntax(ref e) => fmt::Debug::fmt(e, f),
            Self::Render(ref e) => fmt::Debug::fmt(e, f),
            Self::TemplateNotFound(_) => fmt::Display::fmt(self, f),
        }
    }
}

impl std::error::Error for Error {}

impl From<RenderError> for Error {
    fn from(err: RenderError) -> Self {
        Self::Render(err)
    }
}

impl From<SyntaxError> for Error {
    fn from(err: SyntaxError) -> Self {
        Self::Syntax(err)
    }
}
