use aot_vm::{JSError, Value, evaluate_script};

// Initialize logger for this integration test binary so `RUST_LOG` is honored.
// Using `ctor` ensures initialization runs before tests start.
#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

fn error_name(script: &str) -> String {
    match evaluate_script(script) {
        Err(JSError::Throw { message }) => message.split(':').next().unwrap_or_default().to_string(),
        other => panic!("expected an uncaught throw, got {other:?}"),
    }
}

#[cfg(test)]
mod environment_tests {
    use super::*;

    #[test]
    fn test_var_hoisting() {
        let script = r#"
            const before = typeof hoisted;
            var hoisted = 1;
            before + ":" + hoisted
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("undefined:1"));
    }

    #[test]
    fn test_function_hoisting() {
        assert_eq!(evaluate_script("early(); function early() { return 42; } early()").unwrap(), Value::from(42));
    }

    #[test]
    fn test_let_temporal_dead_zone() {
        assert_eq!(error_name("x; let x = 1;"), "ReferenceError");
        assert_eq!(error_name("{ typeof y; let y; }"), "ReferenceError");
        assert_eq!(evaluate_script("let z; z").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_const_assignment() {
        assert_eq!(error_name("const c = 1; c = 2;"), "TypeError");
        assert_eq!(error_name("const c = 1; c += 2;"), "TypeError");
    }

    #[test]
    fn test_block_scoping() {
        let script = r#"
            let x = "outer";
            {
                let x = "inner";
                var seen = x;
            }
            seen + "," + x
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("inner,outer"));
    }

    #[test]
    fn test_block_function_is_lexical() {
        let script = r#"
            {
                function inner() { return "inner"; }
                var result = inner();
            }
            result + "," + typeof inner
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("inner,undefined"));
    }

    #[test]
    fn test_closures_capture_environments() {
        let script = r#"
            function counter() {
                let count = 0;
                return { inc: () => ++count, get: () => count };
            }
            const a = counter();
            const b = counter();
            a.inc(); a.inc(); b.inc();
            a.get() * 10 + b.get()
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from(21));
    }

    #[test]
    fn test_per_iteration_let_bindings() {
        let script = r#"
            const fns = [];
            for (let i = 0; i < 3; i++) { fns.push(() => i); }
            const vars = [];
            for (var j = 0; j < 3; j++) { vars.push(() => j); }
            fns.map(f => f()).join("") + "|" + vars.map(f => f()).join("")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("012|333"));
    }

    #[test]
    fn test_for_of_fresh_binding_per_iteration() {
        let script = r#"
            const fns = [];
            for (const item of ["a", "b"]) { fns.push(() => item); }
            fns[0]() + fns[1]()
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("ab"));
    }

    #[test]
    fn test_global_var_becomes_global_property() {
        let script = r#"
            var declared = 1;
            let lexical = 2;
            function fn() {}
            [globalThis.declared, globalThis.lexical, typeof globalThis.fn,
             Object.getOwnPropertyDescriptor(globalThis, "declared").configurable].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("1,,function,false"));
    }

    #[test]
    fn test_global_lexical_shadows_global_object() {
        let script = r#"
            globalThis.shadow = "property";
            let shadow = "binding";
            shadow + "," + globalThis.shadow
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("binding,property"));
    }

    #[test]
    fn test_restricted_global_redeclaration() {
        assert_eq!(error_name("let undefined = 1;"), "SyntaxError");
        assert_eq!(error_name("let NaN;"), "SyntaxError");
        assert_eq!(error_name("function Infinity() {}"), "TypeError");
        assert_eq!(evaluate_script("var undefined; typeof undefined").unwrap(), Value::from("undefined"));
    }

    #[test]
    fn test_unresolvable_reference() {
        assert_eq!(error_name("missing + 1"), "ReferenceError");
        assert_eq!(evaluate_script("typeof missing").unwrap(), Value::from("undefined"));
        assert_eq!(evaluate_script("implicit = 5; globalThis.implicit").unwrap(), Value::from(5));
        assert_eq!(error_name("'use strict'; implicitStrict = 5;"), "ReferenceError");
    }

    #[test]
    fn test_catch_parameter_scope() {
        let script = r#"
            let e = "outer";
            try { throw "inner"; } catch (e) { var caught = e; }
            caught + "," + e
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("inner,outer"));
    }

    #[test]
    fn test_switch_case_block_scope() {
        let script = r#"
            let out = "";
            switch (2) {
                case 1: let shared = "one";
                case 2: shared = "two"; out = shared;
            }
            out
        "#;
        // `shared` is hoisted to the case block but never initialized on this path
        assert_eq!(error_name(script), "ReferenceError");
    }

    #[test]
    fn test_delete_binding() {
        let script = r#"
            globalThis.removable = 1;
            var permanent = 2;
            [delete removable, typeof removable, delete permanent, permanent].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("true,undefined,false,2"));
    }
}
