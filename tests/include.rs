use serde_json::json;
use stencil::{
    error::RenderErrorKind,
    loader::{self, MemoryLoader},
    Environment, Error, Result, Value,
};

static NAME: &str = "include.rs";

#[test]
fn resolve_relative_paths() {
    assert_eq!("partial", loader::resolve("page", "partial"));
    assert_eq!(
        "pages/partial",
        loader::resolve("pages/index", "partial")
    );
    assert_eq!(
        "partials/header",
        loader::resolve("pages/index", "../partials/header")
    );
    assert_eq!(
        "abs/path",
        loader::resolve("pages/index", "/abs/path")
    );
    assert_eq!(
        "pages/a",
        loader::resolve("pages/index", "./a")
    );
}

#[test]
fn include_renders_in_place() -> Result<()> {
    let mut env = Environment::new();
    env.insert("header", "== {{ title }} ==")?;
    let result = env.once(
        NAME,
        "{% include \"header\" %}\nbody",
        &json!({"title": "Doc"}),
    )?;
    assert_eq!("== Doc ==\nbody", result);
    Ok(())
}

#[test]
fn include_through_loader() -> Result<()> {
    let mut loader = MemoryLoader::new();
    loader.insert("pages/index", "{% include \"../partials/head\" %}!");
    loader.insert("partials/head", "head");
    let env = Environment::with_loader(Box::new(loader));
    let result = env.render("pages/index", &json!({}))?;
    assert_eq!("head!", result);
    Ok(())
}

#[test]
fn include_with_assignments() -> Result<()> {
    let mut env = Environment::new();
    env.insert("li", "<li>{{ label }}</li>")?;
    let result = env.once(
        NAME,
        "{% include \"li\" ; with label=\"one\" %}",
        &json!({}),
    )?;
    assert_eq!("<li>one</li>", result);
    Ok(())
}

#[test]
fn include_return_snapshot() -> Result<()> {
    let mut env = Environment::new();
    env.insert("sub", "{% return x=42, tag=\"sub\" %}")?;
    let value = "{% include \"sub\" ; return data %}\
{{ data.x }}/{{ data.tag }}";
    let result = env.once(NAME, value, &json!({}))?;
    assert_eq!("42/sub", result);
    Ok(())
}

#[test]
fn include_return_clears_compartment() -> Result<()> {
    let mut env = Environment::new();
    env.insert("sub", "{% return x=1 %}")?;
    let value = "{% include \"sub\" ; return data %}";
    let (_, output) = env.once_with(NAME, value, &json!({}))?;
    // The snapshot moved into `data`; the shared RETURN map is empty.
    assert!(output.returns.is_empty());
    Ok(())
}

#[test]
fn callee_locals_do_not_leak() -> Result<()> {
    let mut env = Environment::new();
    env.insert("sub", "{% set x=2 %}callee={{ x }}")?;
    let value = "{% set x=1 %}{% include \"sub\" %} caller={{ x }}";
    let result = env.once(NAME, value, &json!({}))?;
    assert_eq!("callee=2 caller=1", result);
    Ok(())
}

#[test]
fn callee_sees_copied_locals() -> Result<()> {
    let mut env = Environment::new();
    env.insert("sub", "{{ x }}")?;
    let value = "{% set x=\"inherit\" %}{% include \"sub\" %}";
    let result = env.once(NAME, value, &json!({}))?;
    assert_eq!("inherit", result);
    Ok(())
}

#[test]
fn private_is_isolated_across_include() -> Result<()> {
    let mut env = Environment::new();
    env.insert("sub", "{% set _p=2 %}")?;
    let value = "{% set _p=1 %}{% include \"sub\" %}{{ _p }}";
    let result = env.once(NAME, value, &json!({}))?;
    assert_eq!("1", result);
    Ok(())
}

#[test]
fn callee_cannot_read_caller_private() {
    let mut env = Environment::new();
    env.insert("sub", "{{ _p }}").expect("compile");
    let value = "{% set _p=1 %}{% include \"sub\" %}";
    let result = env.once(NAME, value, &json!({}));
    assert!(matches!(
        result,
        Err(Error::Render(ref e))
            if matches!(e.kind(), RenderErrorKind::UnknownVariable(_))
    ));
}

#[test]
fn global_write_persists_after_include() -> Result<()> {
    let mut env = Environment::new();
    env.insert("sub", "{% global shared=5 %}")?;
    let value = "{% include \"sub\" %}{{ shared }}";
    let result = env.once(NAME, value, &json!({}))?;
    assert_eq!("5", result);
    Ok(())
}

#[test]
fn app_write_persists_after_include() -> Result<()> {
    let mut env = Environment::new();
    env.insert("sub", "{% set a@mark=1 %}")?;
    let (_, output) =
        env.once_with(NAME, "{% include \"sub\" %}", &json!({}))?;
    assert_eq!(Some(&Value::Integer(1)), output.app.get("mark"));
    Ok(())
}

#[test]
fn missing_template_is_not_found() {
    let env = Environment::new();
    let result =
        env.once(NAME, "{% include \"absent\" %}", &json!({}));
    assert!(matches!(
        result,
        Err(Error::Render(ref e))
            if matches!(e.kind(), RenderErrorKind::NotFound(_))
    ));
}

#[test]
fn nested_error_carries_template_chain() {
    let mut env = Environment::new();
    env.insert("inner", "{{ missing }}").expect("compile");
    env.insert("outer", "{% include \"inner\" %}").expect("compile");
    let result = env.once(NAME, "{% include \"outer\" %}", &json!({}));
    match result {
        Err(Error::Render(err)) => {
            let trace = err.trace();
            assert_eq!(3, trace.len());
            assert_eq!("inner", trace[0].template);
            assert_eq!("outer", trace[1].template);
            assert_eq!(NAME, trace[2].template);
        }
        other => panic!("expected render error, got {:?}", other),
    }
}

#[test]
fn cyclic_include_is_rejected() {
    let mut env = Environment::new();
    env.insert("loop", "{% include \"loop\" %}").expect("compile");
    let result = env.once(NAME, "{% include \"loop\" %}", &json!({}));
    assert!(matches!(
        result,
        Err(Error::Render(ref e))
            if matches!(e.kind(), RenderErrorKind::Internal(_))
    ));
}
