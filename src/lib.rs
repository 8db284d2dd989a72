#![warn(missing_docs)]

//! Stencil is a tag-based text templating engine: template source is
//! a sequence of literal text interleaved with `{# comment #}`,
//! `{% action %}` and `{{ expression }}` tags controlling
//! substitution, iteration, conditionals, scoping and composition of
//! other templates.
//!
//! The lexer generates a stream of tokens which are consumed by a
//! parser that transforms them into tree nodes; compiled templates
//! are cached on an [Environment](environment::Environment) and
//! rendered by walking the tree against a scoped variable store.
//!
//! Variables live in *compartments*: LOCAL and PRIVATE per scope
//! frame, plus a GLOBAL, a RETURN and an APP map shared by the whole
//! render. A bare name selects its compartment by shape (`_name` is
//! private, `_name_` is global, anything else local) and the
//! explicit prefixes `l@ g@ p@ r@ a@` override.
//!
//! ## Templates
//!
//! Templates are always named so that useful error messages can be
//! generated. Compile and cache with the environment:
//!
//! ```ignore
//! let mut env = Environment::new();
//! env.insert("greeting", "Hello {{ name }}!")?;
//! let result = env.render("greeting", &json!({"name": "World"}))?;
//! ```
//!
//! For dynamic templates use [once()](environment::Environment#method.once)
//! to render a string directly:
//!
//! ```ignore
//! let result = env.once("inline", "{{ 1 + 2 }}", &json!({}))?;
//! ```
//!
//! ## Composition
//!
//! Templates include one another with `{% include "path" %}`;
//! logical paths resolve relative to the including template and are
//! mapped to source text by a [Loader](loader::Loader). Includes
//! copy the caller's LOCAL map in and restore it afterwards, get a
//! fresh PRIVATE map and share GLOBAL, RETURN and APP with the whole
//! render.
//!
//! ## Whitespace control
//!
//! A border flag directly inside a tag opener or closer trims or
//! pads the adjacent text: `-` strips through the nearest newline,
//! `^` strips up to it, `+` inserts a newline and `*` inserts a
//! space. The `autostrip` and `strip` actions apply span-wide
//! stripping to text without explicit flags.
//!
//! ## Hooks and libraries
//!
//! Host code extends the engine by registering
//! [hooks](hook::Hook) invoked by `{% hook "name" %}` and library
//! values bound by `{% import lib = "name" %}`.
pub mod environment;
pub mod error;
pub mod hook;
pub mod lexer;
pub mod loader;
pub mod output;
pub mod parser;
pub mod render;
pub mod strip;
pub mod template;
pub mod value;

/// Result type returned by the environment.
pub type Result<T> = std::result::Result<T, error::Error>;

/// Result type returned when rendering templates.
pub type RenderResult<T> = std::result::Result<T, error::RenderError>;

/// Result type returned when compiling templates.
pub type SyntaxResult<T> = std::result::Result<T, error::SyntaxError>;

pub use environment::Environment;
pub use error::Error;
pub use template::{RenderOutput, Template};
pub use value::{Compartment, Value, ValueMap};
