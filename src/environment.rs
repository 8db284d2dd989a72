//! Engine object owning parsed templates, hooks and libraries.
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;

use crate::{
    hook::Hook,
    loader::{Loader, MemoryLoader},
    output::{Output, StringOutput},
    template::{initial_locals, RenderOutput, Template},
    value::{Value, ValueMap},
    Result,
};

/// Environment is the entry point for compiling and rendering
/// templates.
///
/// It owns the parsed-tree cache, the hook and library registries
/// and the GLOBAL seed applied to every render.
pub struct Environment {
    loader: Box<dyn Loader>,
    cache: RefCell<HashMap<String, Rc<Template>>>,
    hooks: HashMap<String, Box<dyn Hook>>,
    libraries: HashMap<String, Value>,
    globals: ValueMap,
    render_seq: Cell<u64>,
}

impl Environment {
    /// Create an environment backed by an empty in-memory loader.
    pub fn new() -> Self {
        Self::with_loader(Box::new(MemoryLoader::new()))
    }

    /// Create an environment using the given loader for templates
    /// that are not already cached.
    pub fn with_loader(loader: Box<dyn Loader>) -> Self {
        Self {
            loader,
            cache: RefCell::new(HashMap::new()),
            hooks: HashMap::new(),
            libraries: HashMap::new(),
            globals: ValueMap::new(),
            render_seq: Cell::new(0),
        }
    }

    /// Seed a single GLOBAL variable.
    pub fn set_global(&mut self, name: &str, value: Value) {
        self.globals.insert(name.to_string(), value);
    }

    /// Merge a serializable map into the GLOBAL seed.
    pub fn set_globals<T>(&mut self, data: &T) -> Result<()>
    where
        T: Serialize,
    {
        for (name, value) in initial_locals(data)? {
            self.globals.insert(name, value);
        }
        Ok(())
    }

    /// The GLOBAL seed map.
    pub fn globals(&self) -> &ValueMap {
        &self.globals
    }

    /// Compile a template and cache it under `name`.
    pub fn insert(&mut self, name: &str, source: &str) -> Result<()> {
        let template = Rc::new(Template::compile(name, source)?);
        self.cache
            .borrow_mut()
            .insert(name.to_string(), template);
        Ok(())
    }

    /// Get a cached template handle.
    pub fn template(&self, name: &str) -> Option<Rc<Template>> {
        self.cache.borrow().get(name).map(Rc::clone)
    }

    /// Get a template, consulting the loader and caching the
    /// compiled tree on a miss.
    pub fn load(&self, name: &str) -> Result<Rc<Template>> {
        if let Some(template) = self.cache.borrow().get(name) {
            return Ok(Rc::clone(template));
        }
        let (source, canonical) = self.loader.load(name)?;
        let template =
            Rc::new(Template::compile(&canonical, &source)?);
        log::debug!("compiled template '{}'", canonical);
        let mut cache = self.cache.borrow_mut();
        cache.insert(name.to_string(), Rc::clone(&template));
        if canonical != name {
            cache.insert(canonical, Rc::clone(&template));
        }
        Ok(template)
    }

    /// Register a hook under a name.
    pub fn register_hook(&mut self, name: &str, hook: Box<dyn Hook>) {
        self.hooks.insert(name.to_string(), hook);
    }

    /// Look up a registered hook.
    pub fn hook(&self, name: &str) -> Option<&dyn Hook> {
        self.hooks.get(name).map(|hook| hook.as_ref())
    }

    /// Register a library value (a callable or a dict of callables)
    /// that templates bind with the `import` action.
    pub fn register_library(&mut self, name: &str, value: Value) {
        self.libraries.insert(name.to_string(), value);
    }

    /// Look up a registered library.
    pub fn library(&self, name: &str) -> Option<&Value> {
        self.libraries.get(name)
    }

    pub(crate) fn next_render_id(&self) -> u64 {
        let id = self.render_seq.get() + 1;
        self.render_seq.set(id);
        id
    }

    /// Render a named template and buffer the result to a string.
    pub fn render<T>(&self, name: &str, data: &T) -> Result<String>
    where
        T: Serialize,
    {
        let mut writer = StringOutput::new();
        self.render_to_write(name, data, &mut writer)?;
        Ok(writer.into_string())
    }

    /// Render a named template to a writer.
    pub fn render_to_write<T>(
        &self,
        name: &str,
        data: &T,
        writer: &mut dyn Output,
    ) -> Result<RenderOutput>
    where
        T: Serialize,
    {
        let template = self.load(name)?;
        template.render(self, writer, data)
    }

    /// Render a string template without registering it and return
    /// the result as a string.
    pub fn once<T>(
        &self,
        name: &str,
        source: &str,
        data: &T,
    ) -> Result<String>
    where
        T: Serialize,
    {
        let template = Template::compile(name, source)?;
        let mut writer = StringOutput::new();
        template.render(self, &mut writer, data)?;
        Ok(writer.into_string())
    }

    /// Render a string template and also hand back the render
    /// output data.
    pub fn once_with<T>(
        &self,
        name: &str,
        source: &str,
        data: &T,
    ) -> Result<(String, RenderOutput)>
    where
        T: Serialize,
    {
        let template = Template::compile(name, source)?;
        let mut writer = StringOutput::new();
        let output = template.render(self, &mut writer, data)?;
        Ok((writer.into_string(), output))
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
