use mtmpl::lexer::tokenize;
use mtmpl::{render, Context, Renderer};
use proptest::prelude::*;
use serde_json::json;

proptest! {
    /// Text with no marker prefixes renders unchanged, stray braces included.
    #[test]
    fn plain_text_round_trips(s in "[^{]*(\\{[^{%][^{]*)*") {
        prop_assert_eq!(render(&s, &Context::new()).unwrap(), s.clone());
        let nodes = Renderer::new().parse(&s).unwrap();
        prop_assert!(nodes.len() <= 1);
    }
}

proptest! {
    /// Tokenizer and renderer never panic; they return Ok or Err.
    #[test]
    fn arbitrary_input_does_not_panic(s in "\\PC*") {
        let _ = tokenize(&s);
        let _ = render(&s, &Context::new());
    }
}

proptest! {
    /// Exactly one branch is selected: the first truthy condition, else the fallback.
    #[test]
    fn if_elif_else_selects_first_truthy(a: bool, b: bool, c: bool) {
        let template = "{% if a %}A{% elif b %}B{% elif c %}C{% else %}E{% endif %}";
        let ctx = Context::from_serialize(&json!({"a": a, "b": b, "c": c})).unwrap();
        let expected = if a { "A" } else if b { "B" } else if c { "C" } else { "E" };
        prop_assert_eq!(render(template, &ctx).unwrap(), expected);
    }
}

proptest! {
    /// A loop renders its body once per element, in order.
    #[test]
    fn for_renders_each_element(items in proptest::collection::vec(-1000i64..1000, 0..20)) {
        let ctx = Context::new().with("items", items.clone());
        let expected: String = items.iter().map(|i| format!("{i};")).collect();
        let rendered = render("{% for i in items %}{{ i }};{% endfor %}", &ctx).unwrap();
        prop_assert_eq!(rendered, expected);
    }
}

proptest! {
    /// Integer arithmetic agrees with floor-division semantics.
    #[test]
    fn floor_div_and_mod_identity(a in -10_000i64..10_000, b in -100i64..100) {
        prop_assume!(b != 0);
        let ctx = Context::new().with("a", a).with("b", b);
        let rendered = render("{{ (a // b) * b + a % b == a }}", &ctx).unwrap();
        prop_assert_eq!(rendered, "true");
    }
}
