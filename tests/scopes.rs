use serde_json::json;
use stencil::{error::RenderErrorKind, Environment, Error, Result, Value};

static NAME: &str = "scopes.rs";

#[test]
fn set_binds_local() -> Result<()> {
    let env = Environment::new();
    let result =
        env.once(NAME, "{% set x=10 %}{{ x }}", &json!({}))?;
    assert_eq!("10", result);
    Ok(())
}

#[test]
fn set_else_not_taken() -> Result<()> {
    let env = Environment::new();
    let result =
        env.once(NAME, "{% set x=10 ; else x=0 %}{{ x }}", &json!({}))?;
    assert_eq!("10", result);
    Ok(())
}

#[test]
fn set_else_recovers() -> Result<()> {
    let env = Environment::new();
    let result =
        env.once(NAME, "{% set x=y ; else x=0 %}{{ x }}", &json!({}))?;
    assert_eq!("0", result);
    Ok(())
}

#[test]
fn set_is_all_or_nothing() -> Result<()> {
    let env = Environment::new();
    // `a` must not be bound when the second assignment fails.
    let value = "{% set a=1, b=missing ; else ok=1 %}\
{% set probe=a ; else probe=\"clean\" %}{{ probe }}";
    let result = env.once(NAME, value, &json!({}))?;
    assert_eq!("clean", result);
    Ok(())
}

#[test]
fn set_without_else_propagates() {
    let env = Environment::new();
    let result = env.once(NAME, "{% set x=y %}", &json!({}));
    match result {
        Err(Error::Render(err)) => match err.kind() {
            RenderErrorKind::UnknownVariable(name) => {
                assert_eq!("y", name)
            }
            other => panic!("unexpected kind {:?}", other),
        },
        other => panic!("expected render error, got {:?}", other),
    }
}

#[test]
fn global_survives_scope_block() -> Result<()> {
    let env = Environment::new();
    let value = "{% global g=1 %}{% scope %}{% global g=2 %}\
{% endscope %}{{ g }}";
    let result = env.once(NAME, value, &json!({}))?;
    assert_eq!("2", result);
    Ok(())
}

#[test]
fn local_writes_do_not_escape_scope_block() -> Result<()> {
    let env = Environment::new();
    let value =
        "{% set x=1 %}{% scope %}{% set x=2 %}{% endscope %}{{ x }}";
    let result = env.once(NAME, value, &json!({}))?;
    assert_eq!("1", result);
    Ok(())
}

#[test]
fn scope_block_inherits_locals() -> Result<()> {
    let env = Environment::new();
    let value = "{% set x=7 %}{% scope %}{{ x }}{% endscope %}";
    let result = env.once(NAME, value, &json!({}))?;
    assert_eq!("7", result);
    Ok(())
}

#[test]
fn name_shape_selects_compartment() -> Result<()> {
    let env = Environment::new();
    // `_p` is private, `_g_` is global; both readable by shape.
    let value = "{% set _p=1, _g_=2 %}{{ _p }}{{ _g_ }}";
    let result = env.once(NAME, value, &json!({}))?;
    assert_eq!("12", result);
    Ok(())
}

#[test]
fn explicit_prefix_overrides_shape() -> Result<()> {
    let env = Environment::new();
    let value = "{% set g@counter=3 %}{{ g@counter }}";
    let result = env.once(NAME, value, &json!({}))?;
    assert_eq!("3", result);
    Ok(())
}

#[test]
fn private_action_forces_compartment() -> Result<()> {
    let env = Environment::new();
    let value = "{% private token=9 %}{{ p@token }}";
    let result = env.once(NAME, value, &json!({}))?;
    assert_eq!("9", result);
    Ok(())
}

#[test]
fn unset_removes_binding() {
    let env = Environment::new();
    let value = "{% set x=1 %}{% unset x %}{{ x }}";
    let result = env.once(NAME, value, &json!({}));
    assert!(matches!(
        result,
        Err(Error::Render(ref e))
            if matches!(e.kind(), RenderErrorKind::UnknownVariable(_))
    ));
}

#[test]
fn clear_empties_compartment() {
    let env = Environment::new();
    let value = "{% set a=1, b=2 %}{% clear local %}{{ a }}";
    let result = env.once(NAME, value, &json!({}));
    assert!(matches!(
        result,
        Err(Error::Render(ref e))
            if matches!(e.kind(), RenderErrorKind::UnknownVariable(_))
    ));
}

#[test]
fn expand_writes_entries() -> Result<()> {
    let env = Environment::new();
    let value = "{% expand d %}{{ a }}/{{ b }}";
    let data = json!({"d": {"a": 1, "b": 2}});
    let result = env.once(NAME, value, &data)?;
    assert_eq!("1/2", result);
    Ok(())
}

#[test]
fn expand_into_global() -> Result<()> {
    let env = Environment::new();
    let value =
        "{% scope %}{% expand d ; global %}{% endscope %}{{ a }}";
    let data = json!({"d": {"a": 5}});
    let result = env.once(NAME, value, &data)?;
    assert_eq!("5", result);
    Ok(())
}

#[test]
fn expand_rejects_non_dict() {
    let env = Environment::new();
    let result =
        env.once(NAME, "{% expand xs %}", &json!({"xs": [1]}));
    assert!(matches!(
        result,
        Err(Error::Render(ref e))
            if matches!(e.kind(), RenderErrorKind::Type(_))
    ));
}

#[test]
fn var_captures_rendered_body() -> Result<()> {
    let env = Environment::new();
    let value = "{% var banner %}== {{ title }} =={% endvar %}\
{{ banner }}/{{ banner }}";
    let data = json!({"title": "Hi"});
    let result = env.once(NAME, value, &data)?;
    assert_eq!("== Hi ==/== Hi ==", result);
    Ok(())
}

#[test]
fn do_discards_values() -> Result<()> {
    let env = Environment::new();
    let value = "{% do 1 + 2, x %}ok";
    let result = env.once(NAME, value, &json!({"x": "ignored"}))?;
    assert_eq!("ok", result);
    Ok(())
}

#[test]
fn app_compartment_surfaces_on_result() -> Result<()> {
    let env = Environment::new();
    let value = "{% set a@flag=1, a@name=\"out\" %}";
    let (result, output) = env.once_with(NAME, value, &json!({}))?;
    assert_eq!("", result);
    assert_eq!(Some(&Value::Integer(1)), output.app.get("flag"));
    assert_eq!(
        Some(&Value::String("out".to_string())),
        output.app.get("name")
    );
    Ok(())
}

#[test]
fn return_compartment_surfaces_on_result() -> Result<()> {
    let env = Environment::new();
    let value = "{% return status=\"done\", code=0 %}";
    let (_, output) = env.once_with(NAME, value, &json!({}))?;
    assert_eq!(
        Some(&Value::String("done".to_string())),
        output.returns.get("status")
    );
    assert_eq!(Some(&Value::Integer(0)), output.returns.get("code"));
    Ok(())
}

#[test]
fn template_set_reaches_template_root() -> Result<()> {
    let env = Environment::new();
    let value = "{% scope %}{% template t=1 %}{% endscope %}{{ t }}";
    let result = env.once(NAME, value, &json!({}))?;
    assert_eq!("1", result);
    Ok(())
}
