//! Node and expression tree types produced by the parsers.
use std::rc::Rc;

use crate::strip::{Flag, Mode};
use crate::value::Compartment;

/// Unary operators.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnaryOp {
    /// Numeric negation.
    Neg,
    /// Logical complement.
    Not,
}

/// Binary operators.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinaryOp {
    /// Addition, string concatenation, list extension.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division; truncating toward zero on two integers.
    Div,
    /// Modulus.
    Mod,
    /// Equality.
    Eq,
    /// Inequality.
    NotEq,
    /// Less than.
    Lt,
    /// Less than or equal.
    LtEq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    GtEq,
    /// Short-circuit conjunction.
    And,
    /// Short-circuit disjunction.
    Or,
}

impl BinaryOp {
    /// Source spelling, used in error messages.
    pub fn symbol(&self) -> &'static str {
        match *self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "and",
            Self::Or => "or",
        }
    }

    /// Determine if this operator is a comparison.
    pub fn is_comparison(&self) -> bool {
        matches!(
            *self,
            Self::Eq
                | Self::NotEq
                | Self::Lt
                | Self::LtEq
                | Self::Gt
                | Self::GtEq
        )
    }
}

/// Assignment or lookup target: a name with an optional explicit
/// compartment prefix.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Target {
    /// Explicit compartment from an `x@` prefix, if any.
    pub compartment: Option<Compartment>,
    /// Variable name.
    pub name: String,
}

impl Target {
    /// The compartment this target addresses, applying name
    /// inference when no explicit prefix was given.
    pub fn resolve(&self) -> Compartment {
        self.compartment
            .unwrap_or_else(|| Compartment::infer(&self.name))
    }
}

/// One `target = expression` pair in a multi-assignment.
#[derive(Clone, Debug, PartialEq)]
pub struct Assign {
    /// Assignment target.
    pub target: Target,
    /// Right-hand side.
    pub expr: Expr,
}

/// Expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// String literal.
    String(String),
    /// Integer literal.
    Integer(i64),
    /// Float literal.
    Float(f64),
    /// List literal.
    List(Vec<Expr>),
    /// Dict literal as a sequence of key/value pairs.
    Dict(Vec<(Expr, Expr)>),
    /// Variable reference at the head of a chain.
    Variable(Target),
    /// `.name` attribute step.
    Attribute(Box<Expr>, String),
    /// `[expr]` item step.
    Item(Box<Expr>, Box<Expr>),
    /// `(args)` call step.
    Call(Box<Expr>, Vec<Expr>),
    /// Unary operator application.
    Unary(UnaryOp, Box<Expr>),
    /// Binary operator application.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

/// Literal text with its border flags.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TextNode {
    /// Raw text as it appeared in the source.
    pub text: String,
    /// Flag from the closing border of the preceding tag.
    pub left: Flag,
    /// Flag from the opening border of the following tag.
    pub right: Flag,
    /// Source line where the span starts.
    pub line: usize,
}

/// One `cond`/body pair of an `if` chain.
#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    /// Branch condition.
    pub cond: Expr,
    /// Branch body.
    pub body: Vec<Node>,
}

/// One `case` arm of a `switch` segment.
#[derive(Clone, Debug, PartialEq)]
pub struct Case {
    /// Relational operator for this arm.
    pub op: BinaryOp,
    /// Right-hand side compared against the subject.
    pub rhs: Expr,
    /// Arm body.
    pub body: Vec<Node>,
}

/// Compartment selection of the `set` action family.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SetKind {
    /// `set`: infer from each target name.
    Default,
    /// `global`.
    Global,
    /// `template`: LOCAL of the enclosing template root frame.
    Template,
    /// `private`.
    Private,
}

/// Parsed template node.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// Literal text.
    Text(TextNode),
    /// `{{ expr }}` emission.
    Emit {
        /// Expression to emit.
        expr: Expr,
        /// Source line of the tag.
        line: usize,
    },
    /// `if`/`elif`/`else` chain.
    If {
        /// Condition/body pairs in source order.
        branches: Vec<Branch>,
        /// Optional `else` body.
        otherwise: Option<Vec<Node>>,
        /// Source line of the opening tag.
        line: usize,
    },
    /// Counter loop.
    For {
        /// Assignments run before the first test.
        init: Vec<Assign>,
        /// Loop condition.
        test: Expr,
        /// Assignments run after each iteration.
        incr: Vec<Assign>,
        /// Loop body.
        body: Vec<Node>,
        /// Rendered when the test fails on the first iteration.
        otherwise: Option<Vec<Node>>,
        /// Source line of the opening tag.
        line: usize,
    },
    /// Iteration over a list, dict or string.
    Foreach {
        /// Loop variable.
        target: Target,
        /// Optional 0-based index variable.
        index: Option<Target>,
        /// Iterable expression.
        iterable: Expr,
        /// Loop body.
        body: Vec<Node>,
        /// Rendered when the iterable is empty.
        otherwise: Option<Vec<Node>>,
        /// Source line of the opening tag.
        line: usize,
    },
    /// Subject compared against a list of relational arms.
    Switch {
        /// Subject, evaluated once.
        subject: Expr,
        /// Case arms in source order.
        cases: Vec<Case>,
        /// Optional default body.
        default: Option<Vec<Node>>,
        /// Source line of the opening tag.
        line: usize,
    },
    /// `set`/`global`/`template`/`private` multi-assignment.
    Set {
        /// Which compartment family the action addresses.
        kind: SetKind,
        /// Assignments, committed all-or-nothing.
        assigns: Vec<Assign>,
        /// Recovery assignments run when any right-hand side fails.
        otherwise: Option<Vec<Assign>>,
        /// Source line of the tag.
        line: usize,
    },
    /// Remove bindings.
    Unset {
        /// Targets to remove.
        targets: Vec<Target>,
        /// Source line of the tag.
        line: usize,
    },
    /// Empty a compartment.
    Clear {
        /// Compartment to empty.
        compartment: Compartment,
        /// Source line of the tag.
        line: usize,
    },
    /// `scope` … `endscope` block.
    Scope {
        /// Block body.
        body: Vec<Node>,
        /// Source line of the opening tag.
        line: usize,
    },
    /// Render another template in place.
    Include {
        /// Logical path expression.
        path: Expr,
        /// Variable receiving the RETURN snapshot, if any.
        returns: Option<Target>,
        /// Assignments seeding the callee's LOCAL map.
        with: Vec<Assign>,
        /// Source line of the tag.
        line: usize,
    },
    /// Write the entries of a dict into a compartment.
    Expand {
        /// Dict expression.
        expr: Expr,
        /// Destination compartment.
        compartment: Compartment,
        /// Source line of the tag.
        line: usize,
    },
    /// Assignments into the RETURN compartment.
    Return {
        /// Assignments.
        assigns: Vec<Assign>,
        /// Source line of the tag.
        line: usize,
    },
    /// Define a template function.
    Def {
        /// Function name.
        name: String,
        /// Parameter names.
        params: Vec<String>,
        /// Shared body, captured by the produced callable.
        body: Rc<Vec<Node>>,
        /// Source line of the opening tag.
        line: usize,
    },
    /// Invoke a callable and discard the result.
    Call {
        /// Callable expression.
        target: Expr,
        /// Arguments.
        args: Vec<Expr>,
        /// Source line of the tag.
        line: usize,
    },
    /// Render the body into a named buffer on the render result.
    Section {
        /// Section name expression.
        name: Expr,
        /// Section body.
        body: Vec<Node>,
        /// Source line of the opening tag.
        line: usize,
    },
    /// Replay a previously captured section.
    Use {
        /// Section name expression.
        name: Expr,
        /// Source line of the tag.
        line: usize,
    },
    /// Capture the rendered body into a variable.
    Var {
        /// Destination variable.
        target: Target,
        /// Captured body.
        body: Vec<Node>,
        /// Source line of the opening tag.
        line: usize,
    },
    /// Raise a user error.
    Error {
        /// Message expression.
        expr: Expr,
        /// Source line of the tag.
        line: usize,
    },
    /// Bind registered libraries.
    Import {
        /// Assignments whose right-hand sides are library names.
        assigns: Vec<Assign>,
        /// Source line of the tag.
        line: usize,
    },
    /// Evaluate expressions for their side effects.
    Do {
        /// Expressions, evaluated in order.
        exprs: Vec<Expr>,
        /// Source line of the tag.
        line: usize,
    },
    /// Invoke a host hook.
    Hook {
        /// Hook name expression.
        name: Expr,
        /// Parameters passed to the hook.
        with: Vec<Assign>,
        /// `rhook`: capture emitted text instead of writing it.
        capture: bool,
        /// Source line of the tag.
        line: usize,
    },
    /// Override the autostrip mode for the body.
    Strip {
        /// Mode applied while the body renders.
        mode: Mode,
        /// Block body.
        body: Vec<Node>,
        /// Source line of the opening tag.
        line: usize,
    },
    /// Set the forward-looking autostrip mode.
    Autostrip {
        /// New mode.
        mode: Mode,
        /// Source line of the tag.
        line: usize,
    },
    /// Reserved; renders as a no-op.
    Break {
        /// Source line of the tag.
        line: usize,
    },
    /// Reserved; renders as a no-op.
    Continue {
        /// Source line of the tag.
        line: usize,
    },
}

impl Node {
    /// Source line of the node's opening tag.
    pub fn line(&self) -> usize {
        match *self {
            Self::Text(ref t) => t.line,
            Self::Emit { line, .. }
            | Self::If { line, .. }
            | Self::For { line, .. }
            | Self::Foreach { line, .. }
            | Self::Switch { line, .. }
            | Self::Set { line, .. }
            | Self::Unset { line, .. }
            | Self::Clear { line, .. }
            | Self::Scope { line, .. }
            | Self::Include { line, .. }
            | Self::Expand { line, .. }
            | Self::Return { line, .. }
            | Self::Def { line, .. }
            | Self::Call { line, .. }
            | Self::Section { line, .. }
            | Self::Use { line, .. }
            | Self::Var { line, .. }
            | Self::Error { line, .. }
            | Self::Import { line, .. }
            | Self::Do { line, .. }
            | Self::Hook { line, .. }
            | Self::Strip { line, .. }
            | Self::Autostrip { line, .. }
            | Self::Break { line }
            | Self::Continue { line } => line,
        }
    }
}
