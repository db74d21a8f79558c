use treetrim_analysis::{AttributionError, Completion, attribute, is_subtree, signature};
use treetrim_parse::get_node;
use treetrim_syntax::Node;

fn strings(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|&token| token.to_owned()).collect()
}

#[track_caller]
fn attributed(code: &str, tokens: &[&str], logprobs: &[f64]) -> Node {
    let mut tree = get_node(code).unwrap();
    attribute(&mut tree, code, &strings(tokens), logprobs).unwrap();
    tree
}

#[test]
fn operator_cost_lands_on_the_enclosing_node() {
    let tree = attributed("x+1", &["x", "+", "1"], &[-0.1, -0.2, -0.05]);

    assert_eq!(tree.nll, Some(0.2));
    assert_eq!(tree.tokens, ["+"]);
    assert_eq!(tree.children[0].nll, Some(0.1));
    assert_eq!(tree.children[1].nll, Some(0.05));
}

#[test]
fn completion_tokens_drive_attribution() {
    let completion = Completion {
        text: " foo(a, b)\n    return".to_owned(),
        tokens: strings(&[" foo", "(", "a", ",", " b", ")\n", "   ", " return"]),
        token_logprobs: vec![-1.0, -0.5, -0.25, -0.5, -0.125, -2.0, -0.0, -0.0],
    };
    let line = completion.first_line();
    let tokens = line.tokens.iter().map(String::as_str).collect::<Vec<_>>();
    let tree = attributed(&line.text, &tokens, &line.token_logprobs);

    // CALL owns `(`, `,` and `)`
    assert_eq!(tree.nll, Some(3.0));
    let leaves = tree.children.iter().map(|child| child.nll.unwrap()).collect::<Vec<_>>();
    assert_eq!(leaves, [1.0, 0.25, 0.125]);
}

#[test]
fn tokens_for_other_code_are_rejected() {
    let mut tree = get_node("x+1").unwrap();
    let error = attribute(&mut tree, "x+1", &strings(&["x", "+", "2"]), &[-0.1, -0.1, -0.1]);
    assert!(matches!(error, Err(AttributionError::TokenMismatch { token: 2, .. })));
}

#[test]
fn identical_trees_are_contained() {
    let target = get_node("x + 1").unwrap();
    let pruned = get_node("x+1").unwrap();

    assert_eq!(signature("x + 1", &target), "+");
    let verdict = is_subtree("x + 1", &target, "x+1", Some(&pruned));
    assert!(verdict.eval, "{verdict:?}");
    assert_eq!(verdict.reason, None);
}

#[test]
fn pruned_children_may_be_missing() {
    let target = get_node("x+2").unwrap();
    let mut pruned = get_node("x+1").unwrap();
    pruned.children[1].deleted = Some(true);

    assert!(is_subtree("x+2", &target, "x+1", Some(&pruned)).eval);
    assert!(!is_subtree("x+2", &target, "x+1", Some(&get_node("x+1").unwrap())).eval);
}

#[test]
fn absent_prediction_is_trivially_contained() {
    let target = get_node("x").unwrap();
    assert!(is_subtree("x", &target, "", None).eval);
}

#[test]
fn mismatches_explain_themselves() {
    let target = get_node("x+1").unwrap();
    let verdict = is_subtree("x+1", &target, "x*1", get_node("x*1").as_ref());
    assert!(!verdict.eval);
    assert_eq!(verdict.reason.as_deref(), Some(r#"nodes differ: pruned "*", target "+""#));

    let target = get_node("f(b)").unwrap();
    let verdict = is_subtree("f(b)", &target, "f(a)", get_node("f(a)").as_ref());
    assert_eq!(verdict.reason.as_deref(), Some(r#"target has no child "a""#));
}

#[test]
fn verdict_serializes_without_empty_reason() {
    let target = get_node("x").unwrap();
    let verdict = is_subtree("x", &target, "x", Some(&target));
    assert_eq!(serde_json::to_string(&verdict).unwrap(), r#"{"eval":true}"#);
}
