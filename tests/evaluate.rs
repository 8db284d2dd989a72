use serde_json::json;
use stencil::{error::RenderErrorKind, Environment, Error, Result};

static NAME: &str = "evaluate.rs";

fn render_kind(source: &str) -> RenderErrorKind {
    let env = Environment::new();
    match env.once(NAME, source, &json!({"x": 5, "xs": [1, 2, 3]})) {
        Err(Error::Render(err)) => err.kind().clone(),
        other => panic!("expected render error, got {:?}", other),
    }
}

#[test]
fn precedence() -> Result<()> {
    let env = Environment::new();
    assert_eq!("14", env.once(NAME, "{{ 2 + 3 * 4 }}", &json!({}))?);
    assert_eq!(
        "20",
        env.once(NAME, "{{ (2 + 3) * 4 }}", &json!({}))?
    );
    assert_eq!("-1", env.once(NAME, "{{ 1 - 2 }}", &json!({}))?);
    Ok(())
}

#[test]
fn integer_division_truncates_toward_zero() -> Result<()> {
    let env = Environment::new();
    assert_eq!("3", env.once(NAME, "{{ 7 / 2 }}", &json!({}))?);
    assert_eq!(
        "-3",
        env.once(NAME, "{{ (0 - 7) / 2 }}", &json!({}))?
    );
    Ok(())
}

#[test]
fn mixed_numeric_promotes_to_float() -> Result<()> {
    let env = Environment::new();
    assert_eq!("3.5", env.once(NAME, "{{ 7.0 / 2 }}", &json!({}))?);
    assert_eq!("2.5", env.once(NAME, "{{ 2 + 0.5 }}", &json!({}))?);
    Ok(())
}

#[test]
fn division_by_zero() {
    assert!(matches!(
        render_kind("{{ 1 / 0 }}"),
        RenderErrorKind::Arithmetic(_)
    ));
    assert!(matches!(
        render_kind("{{ 1.5 / 0.0 }}"),
        RenderErrorKind::Arithmetic(_)
    ));
    assert!(matches!(
        render_kind("{{ 5 % 0 }}"),
        RenderErrorKind::Arithmetic(_)
    ));
}

#[test]
fn modulus() -> Result<()> {
    let env = Environment::new();
    assert_eq!("2", env.once(NAME, "{{ 5 % 3 }}", &json!({}))?);
    Ok(())
}

#[test]
fn integer_overflow() {
    assert!(matches!(
        render_kind("{{ 9223372036854775807 + 1 }}"),
        RenderErrorKind::Arithmetic(_)
    ));
}

#[test]
fn string_concat() -> Result<()> {
    let env = Environment::new();
    assert_eq!(
        "ab",
        env.once(NAME, r#"{{ "a" + "b" }}"#, &json!({}))?
    );
    Ok(())
}

#[test]
fn string_concat_requires_strings() {
    assert!(matches!(
        render_kind(r#"{{ "a" + 1 }}"#),
        RenderErrorKind::Type(_)
    ));
}

#[test]
fn list_extend() -> Result<()> {
    let env = Environment::new();
    assert_eq!(
        "[1, 2, 3]",
        env.once(NAME, "{{ [1] + [2, 3] }}", &json!({}))?
    );
    Ok(())
}

#[test]
fn unary_minus() -> Result<()> {
    let env = Environment::new();
    assert_eq!("-5", env.once(NAME, "{{ -x }}", &json!({"x": 5}))?);
    assert_eq!("5", env.once(NAME, "{{ -(-x) }}", &json!({"x": 5}))?);
    Ok(())
}

#[test]
fn logical_yield_deciding_operand() -> Result<()> {
    let env = Environment::new();
    assert_eq!(
        "fallback",
        env.once(NAME, r#"{{ 0 or "fallback" }}"#, &json!({}))?
    );
    assert_eq!(
        "second",
        env.once(NAME, r#"{{ "first" and "second" }}"#, &json!({}))?
    );
    Ok(())
}

#[test]
fn logical_short_circuit() -> Result<()> {
    let env = Environment::new();
    // `boom` is undefined but never evaluated.
    assert_eq!("0", env.once(NAME, "{{ 0 and boom }}", &json!({}))?);
    assert_eq!("1", env.once(NAME, "{{ 1 or boom }}", &json!({}))?);
    Ok(())
}

#[test]
fn numeric_widening_equality() -> Result<()> {
    let env = Environment::new();
    assert_eq!(
        "true",
        env.once(NAME, "{{ 1 == 1.0 }}", &json!({}))?
    );
    assert_eq!(
        "true",
        env.once(NAME, "{{ 2 >= 1.5 }}", &json!({}))?
    );
    Ok(())
}

#[test]
fn none_is_equal_only_to_none() -> Result<()> {
    let env = Environment::new();
    let data = json!({"a": null, "b": null, "c": 1});
    assert_eq!("true", env.once(NAME, "{{ a == b }}", &data)?);
    assert_eq!("false", env.once(NAME, "{{ a == c }}", &data)?);
    assert_eq!("true", env.once(NAME, "{{ a != c }}", &data)?);
    Ok(())
}

#[test]
fn incompatible_comparison() {
    assert!(matches!(
        render_kind(r#"{{ 1 < "a" }}"#),
        RenderErrorKind::Type(_)
    ));
    assert!(matches!(
        render_kind(r#"{{ [1] == "a" }}"#),
        RenderErrorKind::Type(_)
    ));
}

#[test]
fn string_ordering() -> Result<()> {
    let env = Environment::new();
    assert_eq!(
        "true",
        env.once(NAME, r#"{{ "apple" < "pear" }}"#, &json!({}))?
    );
    Ok(())
}

#[test]
fn list_indexing() -> Result<()> {
    let env = Environment::new();
    let data = json!({"xs": [10, 20, 30]});
    assert_eq!("20", env.once(NAME, "{{ xs[1] }}", &data)?);
    assert_eq!("30", env.once(NAME, "{{ xs[1 + 1] }}", &data)?);
    Ok(())
}

#[test]
fn list_index_out_of_range() {
    assert!(matches!(
        render_kind("{{ xs[9] }}"),
        RenderErrorKind::Index(_)
    ));
    // Negative indices never wrap around.
    assert!(matches!(
        render_kind("{{ xs[-1] }}"),
        RenderErrorKind::Index(_)
    ));
}

#[test]
fn dict_access() -> Result<()> {
    let env = Environment::new();
    let data = json!({"d": {"k": "v", "nested": {"x": 1}}});
    assert_eq!("v", env.once(NAME, "{{ d.k }}", &data)?);
    assert_eq!("v", env.once(NAME, r#"{{ d["k"] }}"#, &data)?);
    assert_eq!("1", env.once(NAME, "{{ d.nested.x }}", &data)?);
    Ok(())
}

#[test]
fn dict_missing_key() {
    let env = Environment::new();
    let data = json!({"d": {"k": 1}});
    let result = env.once(NAME, r#"{{ d["nope"] }}"#, &data);
    assert!(matches!(
        result,
        Err(Error::Render(ref e))
            if matches!(e.kind(), RenderErrorKind::Index(_))
    ));
    let result = env.once(NAME, "{{ d.nope }}", &data);
    assert!(matches!(
        result,
        Err(Error::Render(ref e))
            if matches!(e.kind(), RenderErrorKind::UnknownVariable(_))
    ));
}

#[test]
fn container_literals() -> Result<()> {
    let env = Environment::new();
    assert_eq!(
        "1",
        env.once(NAME, r#"{{ ["a": 1]["a"] }}"#, &json!({}))?
    );
    assert_eq!(
        "empty",
        env.once(
            NAME,
            "{% if [:] %}full{% else %}empty{% endif %}",
            &json!({})
        )?
    );
    assert_eq!("[]", env.once(NAME, "{{ [] }}", &json!({}))?);
    Ok(())
}

#[test]
fn unknown_variable() {
    assert!(matches!(
        render_kind("{{ missing }}"),
        RenderErrorKind::UnknownVariable(_)
    ));
}

#[test]
fn attribute_on_scalar() {
    assert!(matches!(
        render_kind("{{ x.field }}"),
        RenderErrorKind::Type(_)
    ));
}
