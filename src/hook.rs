//! Host extension points invoked by the `hook` and `rhook` actions.
use std::rc::Rc;

use crate::{
    render::Render,
    value::{Callable, Value, ValueMap},
    RenderResult,
};

/// Trait for host extensions invoked from templates.
///
/// The renderer exposes the template name, source line, output,
/// scope and userdata through `rc`; `params` holds the evaluated
/// `with` assignments of the invoking tag. Absent hooks are skipped
/// silently; a hook that fails propagates its error.
pub trait Hook {
    /// Invoke the hook.
    fn call(
        &self,
        rc: &mut Render<'_>,
        params: &ValueMap,
    ) -> RenderResult<()>;
}

/// Wrap a closure as a callable value, suitable for registering as
/// a library or seeding into the scope.
pub fn native<F>(function: F) -> Value
where
    F: Fn(&[Value]) -> RenderResult<Value> + 'static,
{
    Value::Callable(Callable::Native(Rc::new(function)))
}
