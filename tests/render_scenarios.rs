use mtmpl::{render, Context, ErrorKind, EvalError, TemplateError};
use serde_json::json;

fn ctx(data: serde_json::Value) -> Context {
    Context::from_serialize(&data).unwrap()
}

/// Trims every line and drops blank ones, for comparing indented templates.
fn squash(s: &str) -> String {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn variable_insertion() {
    let rendered = render("Hello, {{ name }}!", &ctx(json!({"name": "Alice"}))).unwrap();
    assert_eq!(rendered, "Hello, Alice!");
}

#[test]
fn if_condition_true_and_false() {
    let template = "{% if user %}Hello, {{ user }}!{% endif %}";
    assert_eq!(render(template, &ctx(json!({"user": "Bob"}))).unwrap(), "Hello, Bob!");
    assert_eq!(render(template, &ctx(json!({"user": null}))).unwrap(), "");
}

#[test]
fn if_else() {
    let template = "{% if user %}Hi {{ user }}{% else %}Hi Guest{% endif %}";
    assert_eq!(render(template, &ctx(json!({"user": "Carol"}))).unwrap(), "Hi Carol");
    assert_eq!(render(template, &ctx(json!({"user": null}))).unwrap(), "Hi Guest");
}

#[test]
fn if_elif_else() {
    let template = "{% if score >= 90 %}A{% elif score >= 80 %}B{% else %}C{% endif %}";
    assert_eq!(render(template, &ctx(json!({"score": 85}))).unwrap(), "B");
    assert_eq!(render(template, &ctx(json!({"score": 75}))).unwrap(), "C");
    assert_eq!(render(template, &ctx(json!({"score": 95}))).unwrap(), "A");
}

#[test]
fn for_loop() {
    let template = "<ul>{% for item in items %}<li>{{ item }}</li>{% endfor %}</ul>";
    let rendered = render(template, &ctx(json!({"items": ["Apple", "Banana", "Cherry"]}))).unwrap();
    assert_eq!(rendered, "<ul><li>Apple</li><li>Banana</li><li>Cherry</li></ul>");
}

#[test]
fn for_loop_empty() {
    let template = "<ul>{% for item in items %}<li>{{ item }}</li>{% endfor %}</ul>";
    assert_eq!(render(template, &ctx(json!({"items": []}))).unwrap(), "<ul></ul>");
}

#[test]
fn for_loop_with_range() {
    let rendered = render("{% for i in range(3) %}{{ i }} {% endfor %}", &Context::new()).unwrap();
    assert_eq!(rendered, "0 1 2 ");
}

#[test]
fn nested_if_in_for() {
    let template = r#"
<ul>
{% for user in users %}
    {% if user.active %}
        <li>{{ user.name }} (Active)</li>
    {% else %}
        <li>{{ user.name }} (Inactive)</li>
    {% endif %}
{% endfor %}
</ul>
"#;
    let data = ctx(json!({
        "users": [
            {"name": "Alice", "active": true},
            {"name": "Bob", "active": false},
            {"name": "Charlie", "active": true},
        ]
    }));
    let rendered = render(template, &data).unwrap();
    assert_eq!(
        squash(&rendered),
        "<ul>\n<li>Alice (Active)</li>\n<li>Bob (Inactive)</li>\n<li>Charlie (Active)</li>\n</ul>"
    );
}

#[test]
fn deeply_nested_conditions() {
    let template = r#"
{% if outer %}
    {% for user in users %}
        {% if user.active %}
            <p>{{ user.name }} is active.</p>
        {% else %}
            <p>{{ user.name }} is inactive.</p>
        {% endif %}
    {% endfor %}
{% else %}
    <p>No outer condition.</p>
{% endif %}
"#;
    let users = json!([
        {"name": "Dave", "active": true},
        {"name": "Eve", "active": false},
    ]);
    let rendered = render(template, &ctx(json!({"outer": true, "users": users}))).unwrap();
    assert_eq!(squash(&rendered), "<p>Dave is active.</p>\n<p>Eve is inactive.</p>");

    let rendered = render(template, &ctx(json!({"outer": false, "users": users}))).unwrap();
    assert_eq!(squash(&rendered), "<p>No outer condition.</p>");
}

#[test]
fn unmatched_if() {
    let err = render("{% if user %}Hello, {{ user }}!", &ctx(json!({"user": "Dave"}))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnclosedBlock);
}

#[test]
fn unmatched_for() {
    let data = ctx(json!({"items": ["A", "B"]}));
    let err = render("{% for item in items %}{{ item }}", &data).unwrap_err();
    assert!(matches!(err, TemplateError::UnclosedBlock { tag: "for", .. }));
}

#[test]
fn division_by_zero() {
    let err = render("Result: {{ 1 / 0 }}", &Context::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EvaluationError);
    assert_eq!(err.eval_cause(), Some(&EvalError::DivisionByZero));
}

#[test]
fn unknown_tag() {
    let err = render("{% unknown_tag %}Content{% endunknown_tag %}", &Context::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownTag);
    assert!(err.to_string().contains("unknown_tag"));
}

#[test]
fn multiple_variables() {
    let data = ctx(json!({"name": "Eve", "age": 30}));
    let rendered = render("Name: {{ name }}, Age: {{ age }}", &data).unwrap();
    assert_eq!(rendered, "Name: Eve, Age: 30");
}

#[test]
fn whitespace_handling() {
    let template = "Start {{   var1   }} Middle {% if var2 %}Yes{% else %}No{% endif %} End";
    let rendered = render(template, &ctx(json!({"var1": "Value1", "var2": true}))).unwrap();
    assert_eq!(rendered, "Start Value1 Middle Yes End");
}

#[test]
fn complex_expression() {
    let data = ctx(json!({"price": 19.99, "quantity": 3}));
    let rendered = render("Total: {{ price * quantity }}", &data).unwrap();
    assert_eq!(rendered, "Total: 59.97");
}

#[test]
fn if_with_no_else() {
    let template = "{% if show %}Visible{% endif %}";
    assert_eq!(render(template, &ctx(json!({"show": true}))).unwrap(), "Visible");
    assert_eq!(render(template, &ctx(json!({"show": false}))).unwrap(), "");
}
