use aot_vm::{JSError, Value, evaluate_script};

// Initialize logger for this integration test binary so `RUST_LOG` is honored.
// Using `ctor` ensures initialization runs before tests start.
#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

#[cfg(test)]
mod destructuring_tests {
    use super::*;

    #[test]
    fn test_array_binding_patterns() {
        let script = r#"
            const [a, , b = "default", ...rest] = [1, 2, undefined, 4, 5];
            [a, b, rest.join("+")].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("1,default,4+5"));
    }

    #[test]
    fn test_object_binding_patterns() {
        let script = r#"
            const key = "dynamic";
            const { x, y: renamed, z = 3, [key]: computed, ...others } = { x: 1, y: 2, dynamic: "d", p: 4, q: 5 };
            [x, renamed, z, computed, Object.keys(others).join("")].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("1,2,3,d,pq"));
    }

    #[test]
    fn test_nested_patterns_with_defaults() {
        let script = r#"
            const { outer: { inner: [first, second = "fallback"] = [] } = {} } = { outer: { inner: ["only"] } };
            const { missing: { deep = "deep default" } = {} } = {};
            [first, second, deep].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("only,fallback,deep default"));
    }

    #[test]
    fn test_defaults_only_apply_to_undefined() {
        let script = r#"
            const [a = 1, b = 2, c = 3] = [null, 0, undefined];
            [a, b, c].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from(",0,3"));
    }

    #[test]
    fn test_anonymous_functions_in_defaults_are_named() {
        let script = r#"
            const { handler = function () {}, arrow = () => {} } = {};
            const [klass = class {}] = [];
            [handler.name, arrow.name, klass.name].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("handler,arrow,klass"));
    }

    #[test]
    fn test_destructuring_assignment() {
        let script = r#"
            let a = 1, b = 2;
            [a, b] = [b, a];
            const target = {};
            ({ x: target.x, y: target["y"] = "dy" } = { x: "dx" });
            let rest;
            [, ...rest] = "abc".length ? [0, 1, 2] : [];
            [a, b, target.x, target.y, rest.join("")].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("2,1,dx,dy,12"));
    }

    #[test]
    fn test_assignment_expression_value_is_right_hand_side() {
        let script = r#"
            let a, b;
            const source = [1, 2];
            const result = [a, b] = source;
            result === source
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_destructuring_iterates_with_the_iterator_protocol() {
        let script = r#"
            let pulled = 0;
            let closed = false;
            const iterable = {
                [Symbol.iterator]() {
                    return {
                        next() { pulled++; return { value: pulled, done: false }; },
                        return() { closed = true; return {}; },
                    };
                },
            };
            const [first, second] = iterable;
            [first, second, pulled, closed].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("1,2,2,true"));
    }

    #[test]
    fn test_destructuring_nullish_throws() {
        for script in ["const { a } = null;", "const [b] = undefined;", "let { c } = undefined;"] {
            let result = evaluate_script(script);
            assert!(matches!(result, Err(JSError::Throw { ref message }) if message.starts_with("TypeError")), "{result:?}");
        }
    }

    #[test]
    fn test_array_pattern_requires_iterable() {
        let result = evaluate_script("const [x] = {};");
        assert!(matches!(result, Err(JSError::Throw { ref message }) if message.starts_with("TypeError")), "{result:?}");
    }

    #[test]
    fn test_empty_object_pattern_accepts_primitives() {
        assert_eq!(evaluate_script("const {} = 5; const { length } = 'abc'; length").unwrap(), Value::from(3));
    }

    #[test]
    fn test_catch_and_loop_patterns() {
        let script = r#"
            let out = [];
            try { throw { code: 7, detail: ["x"] }; } catch ({ code, detail: [d] }) { out.push(code + d); }
            for (const { k, v = "none" } of [{ k: 1, v: "one" }, { k: 2 }]) out.push(k + v);
            out.join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("7x,1one,2none"));
    }
}
