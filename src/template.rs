//! Compiled template handle and render results.
use std::collections::HashMap;

use serde::Serialize;

use crate::{
    environment::Environment,
    error::{Error, RenderError, RenderErrorKind},
    output::Output,
    parser::{ast::Node, Parser, ParserOptions},
    render::Render,
    value::{Value, ValueMap},
    Result, SyntaxResult,
};

/// Data a render hands back to the host besides the emitted text:
/// the RETURN and APP compartments and the named section buffers.
#[derive(Debug, Default)]
pub struct RenderOutput {
    /// Final contents of the RETURN compartment.
    pub returns: ValueMap,
    /// Final contents of the APP compartment.
    pub app: ValueMap,
    /// Buffers captured by `section` segments.
    pub sections: HashMap<String, String>,
}

/// Compiled template that may be stored in the environment.
#[derive(Debug)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

impl Template {
    /// Compile source text under a canonical name.
    pub fn compile(name: &str, source: &str) -> SyntaxResult<Self> {
        let mut parser = Parser::new(
            source,
            ParserOptions::new(name.to_string()),
        );
        let nodes = parser.parse()?;
        Ok(Self {
            name: name.to_string(),
            nodes,
        })
    }

    /// Canonical name of this template.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root nodes of the parsed tree.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Render this template to the given writer.
    ///
    /// `data` seeds the root LOCAL map and must serialize to a map
    /// (or to null for no initial locals).
    pub fn render<T>(
        &self,
        env: &Environment,
        writer: &mut dyn Output,
        data: &T,
    ) -> Result<RenderOutput>
    where
        T: Serialize,
    {
        let locals = initial_locals(data)?;
        self.render_opts(env, writer, locals, Value::None, None)
    }

    /// Render with explicit locals, userdata for hooks and an
    /// optional abort predicate polled at every node entry.
    pub fn render_opts(
        &self,
        env: &Environment,
        writer: &mut dyn Output,
        locals: ValueMap,
        userdata: Value,
        abort: Option<&dyn Fn() -> bool>,
    ) -> Result<RenderOutput> {
        let mut rc = Render::new(
            env, &self.name, writer, locals, userdata, abort,
        );
        rc.run(&self.nodes).map_err(Error::Render)?;
        Ok(rc.finish())
    }
}

pub(crate) fn initial_locals<T>(data: &T) -> Result<ValueMap>
where
    T: Serialize,
{
    match Value::from_serialize(data).map_err(Error::Render)? {
        Value::Dict(map) => Ok(map),
        Value::None => Ok(ValueMap::new()),
        other => Err(Error::Render(RenderError::bare(
            RenderErrorKind::Type(format!(
                "initial variables must be a dict, got {}",
                other.type_name()
            )),
        ))),
    }
}
