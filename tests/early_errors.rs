use aot_vm::{JSError, evaluate_script};

// Initialize logger for this integration test binary so `RUST_LOG` is honored.
// Using `ctor` ensures initialization runs before tests start.
#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

fn assert_early_error(script: &str) {
    match evaluate_script(script) {
        Err(ref e) if e.is_syntax_error() => {}
        other => panic!("expected an early error for {script:?}, got {other:?}"),
    }
}

#[cfg(test)]
mod early_error_tests {
    use super::*;

    #[test]
    fn test_duplicate_lexical_declarations() {
        assert_early_error("let a; let a;");
        assert_early_error("const b = 1; class b {}");
        assert_early_error("{ let c; var c; }");
        assert_early_error("var d; let d;");
        assert_early_error("function f() { let x; { var x; } }");
    }

    #[test]
    fn test_let_as_lexical_name() {
        assert_early_error("let let = 1;");
    }

    #[test]
    fn test_early_errors_prevent_any_evaluation() {
        // nothing runs, not even the statements before the offending declaration
        let mut agent = aot_vm::Agent::new(aot_vm::AgentOptions::default());
        let result = agent.run_script("globalThis.ran = true; let a; let a;", &aot_vm::SourceOptions::default());
        assert!(matches!(result, Err(JSError::SyntaxError { .. })), "{result:?}");
        let ran = agent.run_script("typeof ran", &aot_vm::SourceOptions::default()).unwrap();
        assert_eq!(ran, aot_vm::Value::from("undefined"));
    }

    #[test]
    fn test_const_requires_initializer() {
        assert_early_error("const missing;");
        assert_early_error("let [a];");
    }

    #[test]
    fn test_class_constructor_rules() {
        assert_early_error("class A { constructor() {} constructor() {} }");
        assert_early_error("class A { constructor = 1; }");
        assert_early_error("class A { static prototype() {} }");
    }

    #[test]
    fn test_super_outside_methods() {
        assert_early_error("function f() { super.x; }");
        assert_early_error("class A { constructor() { super(); } }");
        assert_early_error("class A extends Object { method() { super(); } }");
        assert_early_error("super.x;");
    }

    #[test]
    fn test_new_target_outside_functions() {
        assert_early_error("new.target");
        assert!(evaluate_script("function f() { return new.target; } f()").is_ok());
    }

    #[test]
    fn test_control_flow_targets() {
        assert_early_error("break;");
        assert_early_error("continue;");
        assert_early_error("while (true) { break missing; }");
        assert_early_error("label: { continue label; }");
        assert_early_error("a: a: ;");
        assert_early_error("return 1;");
    }

    #[test]
    fn test_invalid_assignment_targets() {
        assert_early_error("1 = 2;");
        assert_early_error("f() = 1;");
        assert_early_error("++1;");
    }

    #[test]
    fn test_strict_mode_restrictions() {
        assert_early_error("'use strict'; var x; delete x;");
        assert_early_error("'use strict'; var eval = 1;");
        assert_early_error("function f(a, a) { 'use strict'; }");
        assert_early_error("function f(a = 1) { 'use strict'; }");
        assert_early_error("(a, a) => a;");
        assert!(evaluate_script("function f(a, a) { return a; } f(1, 2)").is_ok());
    }

    #[test]
    fn test_object_literal_restrictions() {
        assert_early_error("({ __proto__: null, __proto__: null });");
        assert_early_error("({ a = 1 });");
    }

    #[test]
    fn test_parse_errors_are_reported_as_syntax_errors() {
        let result = evaluate_script("let = ;");
        assert!(matches!(result, Err(ref e) if e.is_syntax_error()), "{result:?}");
        let result = evaluate_script("'unterminated");
        assert!(matches!(result, Err(JSError::TokenizationError { .. }) | Err(JSError::ParseError { .. })), "{result:?}");
    }

    #[test]
    fn test_deeply_nested_sources_are_rejected() {
        assert_early_error(&format!("{}1{}", "(".repeat(500), ")".repeat(500)));
        assert_early_error(&format!("{}{}", "[".repeat(500), "]".repeat(500)));
        assert_early_error(&format!("x = {}1{};", "{ a: ".repeat(500), " }".repeat(500)));
        assert_early_error(&format!("{}0", "- ".repeat(2000)));
        assert_early_error(&format!("{}{}", "{".repeat(500), "}".repeat(500)));
        // parsed iteratively, but left-nested too deep to wrap
        assert_early_error(&vec!["1"; 1000].join(" + "));
    }

    #[test]
    fn test_moderately_nested_sources_evaluate() {
        let script = format!("{}1{}", "(".repeat(30), ")".repeat(30));
        assert_eq!(evaluate_script(script).unwrap(), aot_vm::Value::from(1));
        let script = vec!["1"; 100].join(" + ");
        assert_eq!(evaluate_script(script).unwrap(), aot_vm::Value::from(100));
    }
}
