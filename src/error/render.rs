//! Errors generated when rendering templates.
use std::fmt;
use thiserror::Error;

/// Kinds of failure a render can produce.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum RenderErrorKind {
    /// A variable that is not bound in its compartment.
    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),
    /// An operation applied to values of the wrong kind.
    #[error("Type error: {0}")]
    Type(String),
    /// A list index or dict key that does not resolve.
    #[error("Index error: {0}")]
    Index(String),
    /// Division or modulus by zero, or integer overflow.
    #[error("Arithmetic error: {0}")]
    Arithmetic(String),
    /// Raised by the `error` action with the template's own message.
    #[error("{0}")]
    User(String),
    /// A template, section or library that could not be found.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The abort predicate asked the render to stop.
    #[error("Render aborted")]
    Abort,
    /// A broken engine invariant.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// One entry in the template chain attached to a render error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TraceFrame {
    /// Canonical template name.
    pub template: String,
    /// 1-based line of the nearest enclosing node.
    pub line: usize,
}

/// Render failure carrying the template chain from the failing node
/// out through every include boundary it unwound through.
#[derive(Clone, Eq, PartialEq)]
pub struct RenderError {
    kind: RenderErrorKind,
    trace: Vec<TraceFrame>,
}

impl RenderError {
    /// Create an error located at a node.
    pub fn new(kind: RenderErrorKind, template: &str, line: usize) -> Self {
        Self {
            kind,
            trace: vec![TraceFrame {
                template: template.to_string(),
                line,
            }],
        }
    }

    /// Create an error with no location; used by host callables. The
    /// renderer attaches the failing node before propagating.
    pub fn bare(kind: RenderErrorKind) -> Self {
        Self {
            kind,
            trace: Vec::new(),
        }
    }

    /// The failure kind.
    pub fn kind(&self) -> &RenderErrorKind {
        &self.kind
    }

    /// The template chain, innermost first.
    pub fn trace(&self) -> &[TraceFrame] {
        &self.trace
    }

    /// Record the include frame the error is unwinding through.
    pub(crate) fn within(mut self, template: &str, line: usize) -> Self {
        self.trace.push(TraceFrame {
            template: template.to_string(),
            line,
        });
        self
    }

    /// Attach a location if the error does not have one yet.
    pub(crate) fn located(self, template: &str, line: usize) -> Self {
        if self.trace.is_empty() {
            let kind = self.kind;
            Self::new(kind, template, line)
        } else {
            self
        }
    }
}

impl From<RenderErrorKind> for RenderError {
    fn from(kind: RenderErrorKind) -> Self {
        Self::bare(kind)
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for frame in self.trace.iter() {
            write!(
                f,
                "\n  in '{}' (line {})",
                frame.template, frame.line
            )?;
        }
        Ok(())
    }
}

impl fmt::Debug for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl std::error::Error for RenderError {}
