use serde_json::json;
use stencil::{
    error::RenderErrorKind,
    hook::native,
    output::StringOutput,
    value::ValueMap,
    Environment, Error, Result, Template, Value,
};

static NAME: &str = "functions.rs";

#[test]
fn def_and_call() -> Result<()> {
    let env = Environment::new();
    let value = "{% def greet(name) %}Hello {{ name }}!{% enddef %}\
{% call greet(\"World\") %}";
    let result = env.once(NAME, value, &json!({}))?;
    assert_eq!("Hello World!", result);
    Ok(())
}

#[test]
fn def_emits_through_statement() -> Result<()> {
    let env = Environment::new();
    // The body writes to the sink; the call itself yields none.
    let value = "{% def tag(t) %}<{{ t }}>{% enddef %}{{ tag(\"b\") }}";
    let result = env.once(NAME, value, &json!({}))?;
    assert_eq!("<b>", result);
    Ok(())
}

#[test]
fn def_without_parameters() -> Result<()> {
    let env = Environment::new();
    let value = "{% def rule() %}----{% enddef %}{% call rule() %}";
    let result = env.once(NAME, value, &json!({}))?;
    assert_eq!("----", result);
    Ok(())
}

#[test]
fn def_captures_late_bindings() -> Result<()> {
    let env = Environment::new();
    // The captured frame is shared by handle, so names bound after
    // the definition are visible at call time.
    let value = "{% def show() %}{{ v }}{% enddef %}\
{% set v=1 %}{% call show() %}";
    let result = env.once(NAME, value, &json!({}))?;
    assert_eq!("1", result);
    Ok(())
}

#[test]
fn def_arity_mismatch() {
    let env = Environment::new();
    let value = "{% def one(a) %}{{ a }}{% enddef %}{% call one() %}";
    let result = env.once(NAME, value, &json!({}));
    assert!(matches!(
        result,
        Err(Error::Render(ref e))
            if matches!(e.kind(), RenderErrorKind::Type(_))
    ));
}

#[test]
fn call_requires_callable() {
    let env = Environment::new();
    let result =
        env.once(NAME, "{% call x() %}", &json!({"x": 1}));
    assert!(matches!(
        result,
        Err(Error::Render(ref e))
            if matches!(e.kind(), RenderErrorKind::Type(_))
    ));
}

#[test]
fn import_native_library() -> Result<()> {
    let mut env = Environment::new();
    env.register_library(
        "strupper",
        native(|args: &[Value]| {
            let input = args
                .first()
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            Ok(Value::String(input.to_uppercase()))
        }),
    );
    let value = "{% import up=\"strupper\" %}{{ up(\"abc\") }}";
    let result = env.once(NAME, value, &json!({}))?;
    assert_eq!("ABC", result);
    Ok(())
}

#[test]
fn import_library_dict() -> Result<()> {
    let mut env = Environment::new();
    let mut lib = ValueMap::new();
    lib.insert(
        "double".to_string(),
        native(|args: &[Value]| match args.first() {
            Some(Value::Integer(i)) => Ok(Value::Integer(i * 2)),
            _ => Ok(Value::None),
        }),
    );
    env.register_library("mathlib", Value::Dict(lib));
    let value = "{% import m=\"mathlib\" %}{{ m.double(21) }}";
    let result = env.once(NAME, value, &json!({}))?;
    assert_eq!("42", result);
    Ok(())
}

#[test]
fn import_unknown_library() {
    let env = Environment::new();
    let result =
        env.once(NAME, "{% import x=\"absent\" %}", &json!({}));
    assert!(matches!(
        result,
        Err(Error::Render(ref e))
            if matches!(e.kind(), RenderErrorKind::NotFound(_))
    ));
}

#[test]
fn error_action_raises_user_error() {
    let env = Environment::new();
    let value = "{% error \"boom: \" + reason %}";
    let result =
        env.once(NAME, value, &json!({"reason": "bad state"}));
    match result {
        Err(Error::Render(err)) => match err.kind() {
            RenderErrorKind::User(message) => {
                assert_eq!("boom: bad state", message)
            }
            other => panic!("unexpected kind {:?}", other),
        },
        other => panic!("expected render error, got {:?}", other),
    }
}

#[test]
fn section_captures_and_use_replays() -> Result<()> {
    let env = Environment::new();
    let value = "{% section \"nav\" %}<nav>{{ page }}</nav>\
{% endsection %}body|{% use \"nav\" %}";
    let (result, output) =
        env.once_with(NAME, value, &json!({"page": "home"}))?;
    assert_eq!("body|<nav>home</nav>", result);
    assert_eq!(
        Some(&"<nav>home</nav>".to_string()),
        output.sections.get("nav")
    );
    Ok(())
}

#[test]
fn section_replaces_prior_capture() -> Result<()> {
    let env = Environment::new();
    let value = "{% section \"s\" %}first{% endsection %}\
{% section \"s\" %}second{% endsection %}{% use \"s\" %}";
    let result = env.once(NAME, value, &json!({}))?;
    assert_eq!("second", result);
    Ok(())
}

#[test]
fn use_unknown_section() {
    let env = Environment::new();
    let result = env.once(NAME, "{% use \"absent\" %}", &json!({}));
    assert!(matches!(
        result,
        Err(Error::Render(ref e))
            if matches!(e.kind(), RenderErrorKind::NotFound(_))
    ));
}

#[test]
fn function_rejected_outside_defining_render() -> Result<()> {
    let env = Environment::new();
    let first = Template::compile(
        NAME,
        "{% def f() %}x{% enddef %}{% set a@keep=f %}",
    )?;
    let mut writer = StringOutput::new();
    let output = first.render(&env, &mut writer, &json!({}))?;
    let escaped = output.app.get("keep").cloned().expect("callable");

    let second = Template::compile(NAME, "{% call f() %}")?;
    let mut locals = ValueMap::new();
    locals.insert("f".to_string(), escaped);
    let mut writer = StringOutput::new();
    let result = second.render_opts(
        &env,
        &mut writer,
        locals,
        Value::None,
        None,
    );
    assert!(matches!(
        result,
        Err(Error::Render(ref e))
            if matches!(e.kind(), RenderErrorKind::Internal(_))
    ));
    Ok(())
}
