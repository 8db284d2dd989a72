//! Four-compartment variable store with include stack discipline.
use std::cell::RefCell;
use std::rc::Rc;

use crate::value::{Compartment, Value, ValueMap};

/// One entry on the frame stack.
///
/// The maps are individually reference counted so a `def` segment can
/// capture them; everything else treats them as owned by the frame.
#[derive(Debug)]
pub(crate) struct Frame {
    locals: Rc<RefCell<ValueMap>>,
    privates: Rc<RefCell<ValueMap>>,
    template_root: bool,
}

impl Frame {
    fn new(
        locals: ValueMap,
        privates: ValueMap,
        template_root: bool,
    ) -> Self {
        Self {
            locals: Rc::new(RefCell::new(locals)),
            privates: Rc::new(RefCell::new(privates)),
            template_root,
        }
    }

    fn branch(&self) -> Self {
        Self::new(
            self.locals.borrow().clone(),
            self.privates.borrow().clone(),
            false,
        )
    }
}

/// Variable store for one render invocation.
///
/// LOCAL and PRIVATE live on a stack of frames; GLOBAL, RETURN and
/// APP are single maps shared by the whole render.
#[derive(Debug)]
pub struct Scope {
    frames: Vec<Frame>,
    globals: ValueMap,
    returns: ValueMap,
    app: ValueMap,
}

impl Scope {
    /// Create the render root scope from the global seed and the
    /// caller's initial locals.
    pub(crate) fn new(globals: ValueMap, locals: ValueMap) -> Self {
        Self {
            frames: vec![Frame::new(locals, ValueMap::new(), true)],
            globals,
            returns: ValueMap::new(),
            app: ValueMap::new(),
        }
    }

    fn frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Read a variable from the named compartment.
    pub fn get(
        &self,
        name: &str,
        compartment: Compartment,
    ) -> Option<Value> {
        match compartment {
            Compartment::Local => self
                .frame()
                .and_then(|f| f.locals.borrow().get(name).cloned()),
            Compartment::Private => self
                .frame()
                .and_then(|f| f.privates.borrow().get(name).cloned()),
            Compartment::Global => self.globals.get(name).cloned(),
            Compartment::Return => self.returns.get(name).cloned(),
            Compartment::App => self.app.get(name).cloned(),
        }
    }

    /// Resolve a read the way templates do: an explicit compartment
    /// is authoritative, while a bare LOCAL-shaped name falls back to
    /// GLOBAL when it has no local binding.
    pub fn lookup(
        &self,
        name: &str,
        explicit: Option<Compartment>,
    ) -> Option<Value> {
        match explicit {
            Some(compartment) => self.get(name, compartment),
            None => match Compartment::infer(name) {
                Compartment::Local => self
                    .get(name, Compartment::Local)
                    .or_else(|| self.get(name, Compartment::Global)),
                inferred => self.get(name, inferred),
            },
        }
    }

    /// Write a variable into the named compartment.
    pub fn set(
        &mut self,
        name: &str,
        compartment: Compartment,
        value: Value,
    ) {
        let name = name.to_string();
        match compartment {
            Compartment::Local => {
                if let Some(f) = self.frames.last() {
                    f.locals.borrow_mut().insert(name, value);
                }
            }
            Compartment::Private => {
                if let Some(f) = self.frames.last() {
                    f.privates.borrow_mut().insert(name, value);
                }
            }
            Compartment::Global => {
                self.globals.insert(name, value);
            }
            Compartment::Return => {
                self.returns.insert(name, value);
            }
            Compartment::App => {
                self.app.insert(name, value);
            }
        }
    }

    /// Write into the LOCAL map of the enclosing template root
    /// frame, as the `template` action does.
    pub(crate) fn set_template(&mut self, name: &str, value: Value) {
        let frame = self
            .frames
            .iter()
            .rev()
            .find(|f| f.template_root)
            .or_else(|| self.frames.first());
        if let Some(frame) = frame {
            frame
                .locals
                .borrow_mut()
                .insert(name.to_string(), value);
        }
    }

    /// Remove a binding; missing names are ignored.
    pub fn unset(&mut self, name: &str, compartment: Compartment) {
        match compartment {
            Compartment::Local => {
                if let Some(f) = self.frames.last() {
                    f.locals.borrow_mut().remove(name);
                }
            }
            Compartment::Private => {
                if let Some(f) = self.frames.last() {
                    f.privates.borrow_mut().remove(name);
                }
            }
            Compartment::Global => {
                self.globals.remove(name);
            }
            Compartment::Return => {
                self.returns.remove(name);
            }
            Compartment::App => {
                self.app.remove(name);
            }
        }
    }

    /// Empty a compartment; LOCAL and PRIVATE clear the current
    /// frame only.
    pub fn clear(&mut self, compartment: Compartment) {
        match compartment {
            Compartment::Local => {
                if let Some(f) = self.frames.last() {
                    f.locals.borrow_mut().clear();
                }
            }
            Compartment::Private => {
                if let Some(f) = self.frames.last() {
                    f.privates.borrow_mut().clear();
                }
            }
            Compartment::Global => self.globals.clear(),
            Compartment::Return => self.returns.clear(),
            Compartment::App => self.app.clear(),
        }
    }

    /// Push a block frame inheriting shallow copies of LOCAL and
    /// PRIVATE.
    pub(crate) fn push_block(&mut self) {
        let frame = match self.frames.last() {
            Some(f) => f.branch(),
            None => Frame::new(ValueMap::new(), ValueMap::new(), true),
        };
        self.frames.push(frame);
    }

    /// Pop a block frame; the caller's maps are restored untouched.
    pub(crate) fn pop_block(&mut self) -> bool {
        self.pop_frame()
    }

    /// Push an include frame: a shallow copy of the caller's LOCAL
    /// and a fresh PRIVATE, marked as a template root.
    pub(crate) fn push_include(&mut self) {
        let locals = match self.frames.last() {
            Some(f) => f.locals.borrow().clone(),
            None => ValueMap::new(),
        };
        self.frames.push(Frame::new(locals, ValueMap::new(), true));
    }

    /// Pop an include frame.
    pub(crate) fn pop_include(&mut self) -> bool {
        self.pop_frame()
    }

    /// Push a frame for a template function call over its captured
    /// maps.
    pub(crate) fn push_call(
        &mut self,
        locals: ValueMap,
        privates: ValueMap,
    ) {
        self.frames.push(Frame::new(locals, privates, false));
    }

    /// Pop a template function call frame.
    pub(crate) fn pop_call(&mut self) -> bool {
        self.pop_frame()
    }

    fn pop_frame(&mut self) -> bool {
        if self.frames.len() > 1 {
            self.frames.pop();
            true
        } else {
            false
        }
    }

    /// Capture handles to the current frame maps for a `def`.
    pub(crate) fn capture(
        &self,
    ) -> (Rc<RefCell<ValueMap>>, Rc<RefCell<ValueMap>>) {
        match self.frames.last() {
            Some(f) => (Rc::clone(&f.locals), Rc::clone(&f.privates)),
            None => (
                Rc::new(RefCell::new(ValueMap::new())),
                Rc::new(RefCell::new(ValueMap::new())),
            ),
        }
    }

    /// Snapshot and empty the RETURN compartment, as an include with
    /// a return target does.
    pub(crate) fn take_returns(&mut self) -> ValueMap {
        std::mem::replace(&mut self.returns, ValueMap::new())
    }

    /// Current frame stack depth.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Consume the scope, yielding the RETURN and APP maps.
    pub(crate) fn into_parts(self) -> (ValueMap, ValueMap) {
        (self.returns, self.app)
    }
}
