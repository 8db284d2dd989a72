//! Dynamic value model shared by the expression language and the renderer.
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    error::{RenderError, RenderErrorKind},
    parser::ast::Node,
    RenderResult,
};

/// Map type used for dict values and variable compartments.
///
/// Iteration order is insertion order; equality ignores order.
pub type ValueMap = IndexMap<String, Value>;

/// Signature for native callables supplied by the host.
pub type NativeFn = Rc<dyn Fn(&[Value]) -> RenderResult<Value>>;

// Containers nested deeper than this render as a placeholder
// instead of recursing further.
const MAX_DISPLAY_DEPTH: usize = 32;

/// Variable namespaces addressed by assignments and lookups.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Compartment {
    /// Per-frame variables, copied into blocks and includes.
    Local,
    /// Single map shared by the whole render.
    Global,
    /// Per-frame variables that never cross an include boundary.
    Private,
    /// Values handed back to an including template.
    Return,
    /// Values surfaced to the host on the render result.
    App,
}

impl Compartment {
    /// Infer the compartment for a bare (unprefixed) name.
    ///
    /// A sole `_`, or a leading `_` without a trailing one, selects
    /// PRIVATE; a leading and trailing `_` selects GLOBAL; anything
    /// else is LOCAL.
    pub fn infer(name: &str) -> Self {
        if name == "_" {
            Self::Private
        } else if name.starts_with('_') {
            if name.ends_with('_') {
                Self::Global
            } else {
                Self::Private
            }
        } else {
            Self::Local
        }
    }

    /// Map an explicit `x@` prefix character.
    pub(crate) fn from_prefix(prefix: char) -> Option<Self> {
        match prefix {
            'l' => Some(Self::Local),
            'g' => Some(Self::Global),
            'p' => Some(Self::Private),
            'r' => Some(Self::Return),
            'a' => Some(Self::App),
            _ => None,
        }
    }

    /// Map a spelled-out compartment name as used by `clear` and
    /// `expand`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "local" => Some(Self::Local),
            "global" => Some(Self::Global),
            "private" => Some(Self::Private),
            "return" => Some(Self::Return),
            "app" => Some(Self::App),
            _ => None,
        }
    }

    /// Name used in error messages.
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Local => "local",
            Self::Global => "global",
            Self::Private => "private",
            Self::Return => "return",
            Self::App => "app",
        }
    }
}

/// Capability surface for host-owned handles carried through templates.
///
/// The engine never looks inside an opaque value; attribute and item
/// access and calls are delegated to these methods.
pub trait Opaque: fmt::Debug {
    /// Resolve a `.name` attribute access.
    fn get_attr(&self, name: &str) -> Option<Value> {
        let _ = name;
        None
    }

    /// Resolve a `[key]` item access.
    fn get_item(&self, key: &Value) -> Option<Value> {
        let _ = key;
        None
    }

    /// Invoke the handle; `None` means the handle is not callable.
    fn call(&self, args: &[Value]) -> Option<RenderResult<Value>> {
        let _ = args;
        None
    }

    /// Name used when the value is coerced to text or reported in
    /// errors.
    fn type_name(&self) -> &'static str {
        "opaque"
    }
}

/// Function defined by a `def` segment.
///
/// The frame maps of the defining scope are captured by handle, so
/// names bound after the definition are visible when the function is
/// invoked later in the same render.
pub struct TemplateFunction {
    pub(crate) name: String,
    pub(crate) params: Vec<String>,
    pub(crate) body: Rc<Vec<Node>>,
    pub(crate) locals: Rc<RefCell<ValueMap>>,
    pub(crate) privates: Rc<RefCell<ValueMap>>,
    pub(crate) render_id: u64,
}

impl TemplateFunction {
    /// Name given to the `def` segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter names.
    pub fn params(&self) -> &[String] {
        &self.params
    }
}

impl fmt::Debug for TemplateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateFunction")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

/// Callable value: a native host function or a template function.
#[derive(Clone)]
pub enum Callable {
    /// Host function registered through a library or seed value.
    Native(NativeFn),
    /// Function produced by a `def` segment.
    Template(Rc<TemplateFunction>),
}

impl Callable {
    fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Native(a), Self::Native(b)) => Rc::ptr_eq(a, b),
            (Self::Template(a), Self::Template(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(_) => write!(f, "Native(..)"),
            Self::Template(t) => write!(f, "Template({})", t.name()),
        }
    }
}

/// Tagged value produced and consumed by templates.
#[derive(Clone, Debug)]
pub enum Value {
    /// Absence of a value.
    None,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Double-precision float.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered sequence.
    List(Vec<Value>),
    /// String-keyed mapping.
    Dict(ValueMap),
    /// Invocable value.
    Callable(Callable),
    /// Host-owned handle passed through transparently.
    Opaque(Rc<dyn Opaque>),
}

impl Value {
    /// Kind name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match *self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
            Self::Callable(_) => "callable",
            Self::Opaque(ref o) => o.type_name(),
        }
    }

    /// Truth test used by conditionals and logical operators.
    ///
    /// None, false, zero and empty containers are false; everything
    /// else is true.
    pub fn is_truthy(&self) -> bool {
        match *self {
            Self::None => false,
            Self::Bool(b) => b,
            Self::Integer(i) => i != 0,
            Self::Float(f) => f != 0.0,
            Self::String(ref s) => !s.is_empty(),
            Self::List(ref l) => !l.is_empty(),
            Self::Dict(ref d) => !d.is_empty(),
            Self::Callable(_) | Self::Opaque(_) => true,
        }
    }

    /// Borrow the string contents when this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Self::String(ref s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the entries when this is a dict value.
    pub fn as_dict(&self) -> Option<&ValueMap> {
        match *self {
            Self::Dict(ref d) => Some(d),
            _ => None,
        }
    }

    /// Borrow the elements when this is a list value.
    pub fn as_list(&self) -> Option<&[Value]> {
        match *self {
            Self::List(ref l) => Some(l),
            _ => None,
        }
    }

    /// Coerce to output text.
    ///
    /// None renders as the empty string; containers render in literal
    /// form and are cut off with a placeholder past a fixed depth.
    pub fn to_display(&self) -> String {
        self.display_depth(0)
    }

    fn display_depth(&self, depth: usize) -> String {
        if depth > MAX_DISPLAY_DEPTH {
            return String::from("\u{2026}");
        }
        match *self {
            Self::None => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(ref s) => s.clone(),
            Self::List(ref items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|v| v.display_depth(depth + 1))
                    .collect();
                format!("[{}]", parts.join(", "))
            }
            Self::Dict(ref entries) => {
                if entries.is_empty() {
                    return String::from("[:]");
                }
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| {
                        format!("{}: {}", k, v.display_depth(depth + 1))
                    })
                    .collect();
                format!("[{}]", parts.join(", "))
            }
            Self::Callable(Callable::Native(_)) => {
                String::from("<function>")
            }
            Self::Callable(Callable::Template(ref t)) => {
                format!("<function {}>", t.name())
            }
            Self::Opaque(ref o) => format!("<{}>", o.type_name()),
        }
    }

    /// Convert a JSON value into the engine model.
    ///
    /// Numbers become integers when they fit `i64`, floats otherwise.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::None,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::List(
                items.into_iter().map(Self::from_json).collect(),
            ),
            serde_json::Value::Object(entries) => Self::Dict(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert any serializable host value into the engine model.
    pub fn from_serialize<T: Serialize>(data: &T) -> RenderResult<Self> {
        let json = serde_json::to_value(data).map_err(|e| {
            RenderError::bare(RenderErrorKind::Internal(e.to_string()))
        })?;
        Ok(Self::from_json(json))
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::None
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display())
    }
}

/// Equality is by value for scalars with integer/float widening,
/// structural for containers and by identity for callables and
/// opaques; mismatched kinds are unequal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Integer(a), Self::Float(b))
            | (Self::Float(b), Self::Integer(a)) => (*a as f64) == *b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Dict(a), Self::Dict(b)) => a == b,
            (Self::Callable(a), Self::Callable(b)) => a.ptr_eq(b),
            (Self::Opaque(a), Self::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl From<ValueMap> for Value {
    fn from(value: ValueMap) -> Self {
        Self::Dict(value)
    }
}
