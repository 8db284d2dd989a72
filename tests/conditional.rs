use serde_json::json;
use stencil::{Environment, Result};

static NAME: &str = "conditional.rs";

static CHAIN: &str =
    "{% if a == 1 %}one{% elif a == 2 %}two{% else %}other{% endif %}";

#[test]
fn if_first_branch() -> Result<()> {
    let env = Environment::new();
    let result = env.once(NAME, CHAIN, &json!({"a": 1}))?;
    assert_eq!("one", result);
    Ok(())
}

#[test]
fn if_elif_branch() -> Result<()> {
    let env = Environment::new();
    let result = env.once(NAME, CHAIN, &json!({"a": 2}))?;
    assert_eq!("two", result);
    Ok(())
}

#[test]
fn if_else_branch() -> Result<()> {
    let env = Environment::new();
    let result = env.once(NAME, CHAIN, &json!({"a": 9}))?;
    assert_eq!("other", result);
    Ok(())
}

#[test]
fn if_without_else_renders_nothing() -> Result<()> {
    let env = Environment::new();
    let result = env.once(
        NAME,
        "{% if flag %}yes{% endif %}",
        &json!({"flag": false}),
    )?;
    assert_eq!("", result);
    Ok(())
}

#[test]
fn truthiness_of_empties() -> Result<()> {
    let env = Environment::new();
    let value = "{% if s %}s{% endif %}{% if l %}l{% endif %}\
{% if d %}d{% endif %}{% if n %}n{% endif %}{% if f %}f{% endif %}";
    let data = json!({
        "s": "", "l": [], "d": {}, "n": 0, "f": 0.0
    });
    let result = env.once(NAME, value, &data)?;
    assert_eq!("", result);
    Ok(())
}

#[test]
fn logical_operators() -> Result<()> {
    let env = Environment::new();
    let value = "{% if a and not b or c %}pass{% endif %}";
    let data = json!({"a": 1, "b": 0, "c": 0});
    let result = env.once(NAME, value, &data)?;
    assert_eq!("pass", result);
    Ok(())
}

#[test]
fn switch_matches_first_case() -> Result<()> {
    let env = Environment::new();
    let value = "{% switch n %}\
{% case < 0 %}negative\
{% case == 0 %}zero\
{% case > 100 %}big\
{% else %}small\
{% endswitch %}";
    let cases = [
        (json!({"n": -4}), "negative"),
        (json!({"n": 0}), "zero"),
        (json!({"n": 250}), "big"),
        (json!({"n": 7}), "small"),
    ];
    for (data, expected) in cases.iter() {
        let result = env.once(NAME, value, data)?;
        assert_eq!(*expected, result);
    }
    Ok(())
}

#[test]
fn switch_without_default() -> Result<()> {
    let env = Environment::new();
    let value =
        "{% switch n %}{% case == 1 %}one{% endswitch %}done";
    let result = env.once(NAME, value, &json!({"n": 5}))?;
    assert_eq!("done", result);
    Ok(())
}

#[test]
fn switch_subject_strings() -> Result<()> {
    let env = Environment::new();
    let value = "{% switch kind %}\
{% case == \"dir\" %}directory\
{% case != \"file\" %}other\
{% endswitch %}";
    let result = env.once(NAME, value, &json!({"kind": "dir"}))?;
    assert_eq!("directory", result);
    let result = env.once(NAME, value, &json!({"kind": "link"}))?;
    assert_eq!("other", result);
    Ok(())
}
