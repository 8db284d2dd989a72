//! Render a node tree to output against a scoped environment.
use std::collections::HashMap;
use std::rc::Rc;

use crate::{
    environment::Environment,
    error::{Error, RenderError, RenderErrorKind},
    loader,
    output::Output,
    parser::ast::{
        Assign, Branch, Case, Expr, Node, SetKind, Target,
    },
    strip::{self, Mode},
    template::{RenderOutput, Template},
    value::{
        Callable, Compartment, TemplateFunction, Value, ValueMap,
    },
    RenderResult,
};

mod eval;
pub mod scope;

pub use scope::Scope;

// Includes nested deeper than this are rejected rather than
// overflowing the stack on a cyclic include chain.
const MAX_INCLUDE_DEPTH: usize = 64;

/// Render state for one render invocation.
///
/// Hooks receive a mutable reference and may write output, inspect
/// and mutate the scope and render other templates with
/// [render_named](Render::render_named).
pub struct Render<'render> {
    env: &'render Environment,
    name: String,
    writer: &'render mut dyn Output,
    captures: Vec<String>,
    scope: Scope,
    sections: HashMap<String, String>,
    autostrip: Mode,
    userdata: Value,
    abort: Option<&'render dyn Fn() -> bool>,
    render_id: u64,
    line: usize,
    depth: usize,
}

impl<'render> Render<'render> {
    pub(crate) fn new(
        env: &'render Environment,
        name: &str,
        writer: &'render mut dyn Output,
        locals: ValueMap,
        userdata: Value,
        abort: Option<&'render dyn Fn() -> bool>,
    ) -> Self {
        Self {
            env,
            name: name.to_string(),
            writer,
            captures: Vec::new(),
            scope: Scope::new(env.globals().clone(), locals),
            sections: HashMap::new(),
            autostrip: Mode::None,
            userdata,
            abort,
            render_id: env.next_render_id(),
            line: 0,
            depth: 0,
        }
    }

    pub(crate) fn run(
        &mut self,
        nodes: &[Node],
    ) -> RenderResult<()> {
        self.render_nodes(nodes)
    }

    pub(crate) fn finish(self) -> RenderOutput {
        let sections = self.sections;
        let (returns, app) = self.scope.into_parts();
        RenderOutput {
            returns,
            app,
            sections,
        }
    }

    /// The environment this render runs against.
    pub fn env(&self) -> &'render Environment {
        self.env
    }

    /// Canonical name of the template currently rendering.
    pub fn template_name(&self) -> &str {
        &self.name
    }

    /// Source line of the node currently rendering.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The caller-supplied userdata value.
    pub fn userdata(&self) -> &Value {
        &self.userdata
    }

    /// The variable store.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Mutable access to the variable store.
    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    pub(crate) fn render_id(&self) -> u64 {
        self.render_id
    }

    /// Write a string to the output destination, honouring any
    /// active capture.
    pub fn write(&mut self, s: &str) -> RenderResult<()> {
        if let Some(buffer) = self.captures.last_mut() {
            buffer.push_str(s);
            return Ok(());
        }
        self.writer.write_str(s).map_err(|e| {
            self.error(RenderErrorKind::Internal(format!(
                "write: {}",
                e
            )))
        })
    }

    /// Render another template in place, as hooks do; the callee
    /// gets an include frame and the path resolves relative to the
    /// current template.
    pub fn render_named(&mut self, path: &str) -> RenderResult<()> {
        let resolved = loader::resolve(&self.name, path);
        let template = self.load_template(&resolved)?;
        self.render_template_frame(&template, Vec::new())
    }

    fn error(&self, kind: RenderErrorKind) -> RenderError {
        RenderError::new(kind, &self.name, self.line)
    }

    fn render_nodes(&mut self, nodes: &[Node]) -> RenderResult<()> {
        for node in nodes {
            self.render_node(node)?;
        }
        Ok(())
    }

    fn render_node(&mut self, node: &Node) -> RenderResult<()> {
        self.line = node.line();
        if let Some(abort) = self.abort {
            if abort() {
                return Err(self.error(RenderErrorKind::Abort));
            }
        }
        match node {
            Node::Text(text) => {
                let out = strip::apply(
                    &text.text,
                    text.left,
                    text.right,
                    self.autostrip,
                );
                self.write(&out)
            }
            Node::Emit { expr, .. } => {
                let value = self.eval(expr)?;
                let out = value.to_display();
                self.write(&out)
            }
            Node::If {
                branches,
                otherwise,
                ..
            } => self.render_if(branches, otherwise.as_deref()),
            Node::For {
                init,
                test,
                incr,
                body,
                otherwise,
                ..
            } => self.render_for(
                init,
                test,
                incr,
                body,
                otherwise.as_deref(),
            ),
            Node::Foreach {
                target,
                index,
                iterable,
                body,
                otherwise,
                ..
            } => self.render_foreach(
                target,
                index.as_ref(),
                iterable,
                body,
                otherwise.as_deref(),
            ),
            Node::Switch {
                subject,
                cases,
                default,
                ..
            } => self.render_switch(subject, cases, default.as_deref()),
            Node::Set {
                kind,
                assigns,
                otherwise,
                ..
            } => self.render_set(*kind, assigns, otherwise.as_deref()),
            Node::Unset { targets, .. } => {
                for target in targets {
                    let compartment = target.resolve();
                    self.scope.unset(&target.name, compartment);
                }
                Ok(())
            }
            Node::Clear { compartment, .. } => {
                self.scope.clear(*compartment);
                Ok(())
            }
            Node::Scope { body, .. } => {
                self.scope.push_block();
                let result = self.render_nodes(body);
                if !self.scope.pop_block() {
                    return Err(self.error(
                        RenderErrorKind::Internal(
                            "scope stack underflow".to_string(),
                        ),
                    ));
                }
                result
            }
            Node::Include {
                path,
                returns,
                with,
                ..
            } => self.render_include(path, returns.as_ref(), with),
            Node::Expand {
                expr, compartment, ..
            } => {
                let entries = match self.eval(expr)? {
                    Value::Dict(entries) => entries,
                    other => {
                        return Err(self.error(
                            RenderErrorKind::Type(format!(
                                "expand requires a dict, got {}",
                                other.type_name()
                            )),
                        ))
                    }
                };
                for (name, value) in entries {
                    self.scope.set(&name, *compartment, value);
                }
                Ok(())
            }
            Node::Return { assigns, .. } => {
                let values = self.eval_assign_values(assigns)?;
                for (assign, value) in
                    assigns.iter().zip(values.into_iter())
                {
                    self.scope.set(
                        &assign.target.name,
                        Compartment::Return,
                        value,
                    );
                }
                Ok(())
            }
            Node::Def {
                name, params, body, ..
            } => {
                let (locals, privates) = self.scope.capture();
                let function = TemplateFunction {
                    name: name.clone(),
                    params: params.clone(),
                    body: Rc::clone(body),
                    locals,
                    privates,
                    render_id: self.render_id,
                };
                let value = Value::Callable(Callable::Template(
                    Rc::new(function),
                ));
                let compartment = Compartment::infer(name);
                self.scope.set(name, compartment, value);
                Ok(())
            }
            Node::Call { target, args, .. } => {
                let callee = self.eval(target)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                self.call_value(&callee, values)?;
                Ok(())
            }
            Node::Section { name, body, .. } => {
                let line = self.line;
                let name =
                    self.string_value(name, "section name")?;
                let text = self.capture_nodes(body)?;
                self.line = line;
                self.sections.insert(name, text);
                Ok(())
            }
            Node::Use { name, .. } => {
                let name = self.string_value(name, "section name")?;
                match self.sections.get(&name).cloned() {
                    Some(text) => self.write(&text),
                    None => Err(self.error(
                        RenderErrorKind::NotFound(format!(
                            "section '{}'",
                            name
                        )),
                    )),
                }
            }
            Node::Var { target, body, .. } => {
                let line = self.line;
                let text = self.capture_nodes(body)?;
                self.line = line;
                self.bind(
                    target,
                    SetKind::Default,
                    Value::String(text),
                );
                Ok(())
            }
            Node::Error { expr, .. } => {
                let value = self.eval(expr)?;
                Err(self.error(RenderErrorKind::User(
                    value.to_display(),
                )))
            }
            Node::Import { assigns, .. } => {
                for assign in assigns {
                    let name = self.string_value(
                        &assign.expr,
                        "library name",
                    )?;
                    let value = match self.env.library(&name) {
                        Some(value) => value.clone(),
                        None => {
                            return Err(self.error(
                                RenderErrorKind::NotFound(format!(
                                    "library '{}'",
                                    name
                                )),
                            ))
                        }
                    };
                    self.bind(
                        &assign.target,
                        SetKind::Default,
                        value,
                    );
                }
                Ok(())
            }
            Node::Do { exprs, .. } => {
                for expr in exprs {
                    self.eval(expr)?;
                }
                Ok(())
            }
            Node::Hook {
                name,
                with,
                capture,
                ..
            } => self.render_hook(name, with, *capture),
            Node::Strip { mode, body, .. } => {
                let saved = self.autostrip;
                self.autostrip = *mode;
                let result = self.render_nodes(body);
                self.autostrip = saved;
                result
            }
            Node::Autostrip { mode, .. } => {
                self.autostrip = *mode;
                Ok(())
            }
            // Reserved keywords; the renderer emits no loop signals
            // for them in this revision.
            Node::Break { .. } | Node::Continue { .. } => Ok(()),
        }
    }

    fn render_if(
        &mut self,
        branches: &[Branch],
        otherwise: Option<&[Node]>,
    ) -> RenderResult<()> {
        for branch in branches {
            if self.eval(&branch.cond)?.is_truthy() {
                return self.render_nodes(&branch.body);
            }
        }
        if let Some(body) = otherwise {
            return self.render_nodes(body);
        }
        Ok(())
    }

    fn render_for(
        &mut self,
        init: &[Assign],
        test: &Expr,
        incr: &[Assign],
        body: &[Node],
        otherwise: Option<&[Node]>,
    ) -> RenderResult<()> {
        let line = self.line;
        self.run_assign_list(init)?;
        let mut entered = false;
        loop {
            self.line = line;
            if !self.eval(test)?.is_truthy() {
                break;
            }
            entered = true;
            self.render_nodes(body)?;
            self.line = line;
            self.run_assign_list(incr)?;
        }
        if !entered {
            if let Some(body) = otherwise {
                return self.render_nodes(body);
            }
        }
        Ok(())
    }

    fn render_foreach(
        &mut self,
        target: &Target,
        index: Option<&Target>,
        iterable: &Expr,
        body: &[Node],
        otherwise: Option<&[Node]>,
    ) -> RenderResult<()> {
        let line = self.line;
        let items: Vec<Value> = match self.eval(iterable)? {
            Value::List(items) => items,
            Value::Dict(entries) => entries
                .keys()
                .map(|k| Value::String(k.clone()))
                .collect(),
            Value::String(s) => s
                .chars()
                .map(|c| Value::String(c.to_string()))
                .collect(),
            other => {
                return Err(self.error(RenderErrorKind::Type(
                    format!(
                        "cannot iterate {}",
                        other.type_name()
                    ),
                )))
            }
        };
        if items.is_empty() {
            if let Some(body) = otherwise {
                return self.render_nodes(body);
            }
            return Ok(());
        }
        for (i, item) in items.into_iter().enumerate() {
            self.line = line;
            self.bind(target, SetKind::Default, item);
            if let Some(index) = index {
                self.bind(
                    index,
                    SetKind::Default,
                    Value::Integer(i as i64),
                );
            }
            self.render_nodes(body)?;
        }
        Ok(())
    }

    fn render_switch(
        &mut self,
        subject: &Expr,
        cases: &[Case],
        default: Option<&[Node]>,
    ) -> RenderResult<()> {
        let subject = self.eval(subject)?;
        for case in cases {
            let rhs = self.eval(&case.rhs)?;
            let matched = eval::compare(case.op, &subject, &rhs)
                .map_err(|kind| self.error(kind))?;
            if matched {
                return self.render_nodes(&case.body);
            }
        }
        if let Some(body) = default {
            return self.render_nodes(body);
        }
        Ok(())
    }

    fn render_set(
        &mut self,
        kind: SetKind,
        assigns: &[Assign],
        otherwise: Option<&[Assign]>,
    ) -> RenderResult<()> {
        match self.eval_assign_values(assigns) {
            Ok(values) => {
                self.commit(assigns, kind, values);
                Ok(())
            }
            Err(err) => {
                // An abort is a cancellation, not a recoverable
                // evaluation failure.
                if *err.kind() == RenderErrorKind::Abort {
                    return Err(err);
                }
                match otherwise {
                    Some(recovery) => {
                        let values =
                            self.eval_assign_values(recovery)?;
                        self.commit(recovery, kind, values);
                        Ok(())
                    }
                    None => Err(err),
                }
            }
        }
    }

    /// Evaluate every right-hand side before committing anything.
    fn eval_assign_values(
        &mut self,
        assigns: &[Assign],
    ) -> RenderResult<Vec<Value>> {
        let mut values = Vec::with_capacity(assigns.len());
        for assign in assigns {
            values.push(self.eval(&assign.expr)?);
        }
        Ok(values)
    }

    fn commit(
        &mut self,
        assigns: &[Assign],
        kind: SetKind,
        values: Vec<Value>,
    ) {
        for (assign, value) in
            assigns.iter().zip(values.into_iter())
        {
            self.bind(&assign.target, kind, value);
        }
    }

    /// Evaluate and bind in source order, as loop init and incr
    /// clauses do.
    fn run_assign_list(
        &mut self,
        assigns: &[Assign],
    ) -> RenderResult<()> {
        for assign in assigns {
            let value = self.eval(&assign.expr)?;
            self.bind(&assign.target, SetKind::Default, value);
        }
        Ok(())
    }

    fn bind(&mut self, target: &Target, kind: SetKind, value: Value) {
        match kind {
            SetKind::Default => {
                let compartment = target.resolve();
                self.scope.set(&target.name, compartment, value);
            }
            SetKind::Global => {
                let compartment = target
                    .compartment
                    .unwrap_or(Compartment::Global);
                self.scope.set(&target.name, compartment, value);
            }
            SetKind::Private => {
                let compartment = target
                    .compartment
                    .unwrap_or(Compartment::Private);
                self.scope.set(&target.name, compartment, value);
            }
            SetKind::Template => match target.compartment {
                Some(compartment) => {
                    self.scope.set(&target.name, compartment, value)
                }
                None => {
                    self.scope.set_template(&target.name, value)
                }
            },
        }
    }

    fn string_value(
        &mut self,
        expr: &Expr,
        what: &str,
    ) -> RenderResult<String> {
        match self.eval(expr)? {
            Value::String(s) => Ok(s),
            other => Err(self.error(RenderErrorKind::Type(format!(
                "{} must be a string, got {}",
                what,
                other.type_name()
            )))),
        }
    }

    fn capture_nodes(
        &mut self,
        body: &[Node],
    ) -> RenderResult<String> {
        self.captures.push(String::new());
        let result = self.render_nodes(body);
        let text = self.captures.pop().unwrap_or_default();
        result?;
        Ok(text)
    }

    fn load_template(
        &self,
        name: &str,
    ) -> RenderResult<Rc<Template>> {
        self.env.load(name).map_err(|err| match err {
            Error::TemplateNotFound(_) => self.error(
                RenderErrorKind::NotFound(format!(
                    "template '{}'",
                    name
                )),
            ),
            Error::Render(err) => err,
            Error::Syntax(err) => {
                self.error(RenderErrorKind::Internal(format!(
                    "include '{}': {}",
                    name, err
                )))
            }
        })
    }

    fn render_include(
        &mut self,
        path: &Expr,
        returns: Option<&Target>,
        with: &[Assign],
    ) -> RenderResult<()> {
        let line = self.line;
        let path = self.string_value(path, "include path")?;
        // The seed values are evaluated in the caller's scope
        // before the include frame exists.
        let mut seed = Vec::with_capacity(with.len());
        for assign in with {
            let value = self.eval(&assign.expr)?;
            seed.push((assign.target.clone(), value));
        }
        let resolved = loader::resolve(&self.name, &path);
        let template = self.load_template(&resolved)?;
        log::trace!("include '{}' from '{}'", resolved, self.name);
        self.render_template_frame(&template, seed)?;
        self.line = line;
        if let Some(target) = returns {
            let snapshot = self.scope.take_returns();
            let compartment = target.resolve();
            self.scope.set(
                &target.name,
                compartment,
                Value::Dict(snapshot),
            );
        }
        Ok(())
    }

    fn render_template_frame(
        &mut self,
        template: &Template,
        seed: Vec<(Target, Value)>,
    ) -> RenderResult<()> {
        if self.depth >= MAX_INCLUDE_DEPTH {
            return Err(self.error(RenderErrorKind::Internal(
                "include depth exceeded".to_string(),
            )));
        }
        let caller_line = self.line;
        self.scope.push_include();
        for (target, value) in seed {
            // `with` assignments land in the callee's LOCAL unless
            // an explicit prefix says otherwise.
            let compartment = target
                .compartment
                .unwrap_or(Compartment::Local);
            self.scope.set(&target.name, compartment, value);
        }
        let caller = std::mem::replace(
            &mut self.name,
            template.name().to_string(),
        );
        self.depth += 1;
        let result = self.render_nodes(template.nodes());
        self.depth -= 1;
        self.name = caller;
        if !self.scope.pop_include() {
            return Err(self.error(RenderErrorKind::Internal(
                "scope stack underflow".to_string(),
            )));
        }
        result.map_err(|err| err.within(&self.name, caller_line))
    }

    fn render_hook(
        &mut self,
        name: &Expr,
        with: &[Assign],
        capture: bool,
    ) -> RenderResult<()> {
        let name = self.string_value(name, "hook name")?;
        let mut params = ValueMap::new();
        for assign in with {
            let value = self.eval(&assign.expr)?;
            params.insert(assign.target.name.clone(), value);
        }
        let env = self.env;
        let hook = match env.hook(&name) {
            Some(hook) => hook,
            None => {
                log::debug!("hook '{}' not registered", name);
                return Ok(());
            }
        };
        log::trace!("invoke hook '{}'", name);
        if capture {
            // The captured output is the reserved result path.
            self.captures.push(String::new());
            let result = hook.call(self, &params);
            let _ = self.captures.pop();
            result
        } else {
            hook.call(self, &params)
        }
    }
}
