use aot_vm::{AgentOptions, JSError, SourceOptions, Value, evaluate_script};

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
mod function_tests {
    use super::*;

    #[test]
    fn test_function_declaration_and_call() {
        assert_eq!(evaluate_script("function add(a, b) { return a + b; } add(2, 3)").unwrap(), Value::from(5));
    }

    #[test]
    fn test_missing_arguments_are_undefined() {
        assert_eq!(evaluate_script("function f(a, b) { return b; } f(1)").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_default_and_rest_parameters() {
        let script = r#"
            function f(a, b = a * 2, ...rest) { return [a, b, rest.length, rest.join("-")].join(","); }
            f(1) + "|" + f(1, 5, 6, 7)
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("1,2,0,|1,5,2,6-7"));
    }

    #[test]
    fn test_destructuring_parameters() {
        let script = r#"
            function f({ x, y = 10 }, [first, , third]) { return x + y + first + third; }
            f({ x: 1 }, [100, 200, 300])
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from(411));
    }

    #[test]
    fn test_function_length_and_name() {
        let script = r#"
            function f(a, b = 1, c) {}
            const g = function () {};
            const h = (x, y) => x;
            const o = { m() {}, get p() { return 1; } };
            [f.length, f.name, g.name, h.length, h.name, o.m.name,
             Object.getOwnPropertyDescriptor(o, "p").get.name].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("1,f,g,2,h,m,get p"));
    }

    #[test]
    fn test_mapped_arguments_alias_parameters() {
        let script = r#"
            function sloppy(a) { arguments[0] = "changed"; return a; }
            function strict(a) { "use strict"; arguments[0] = "changed"; return a; }
            function reverse(a) { a = "param"; return arguments[0]; }
            [sloppy("original"), strict("original"), reverse("original")].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("changed,original,param"));
    }

    #[test]
    fn test_arguments_object_shape() {
        let script = r#"
            function f() { return [arguments.length, arguments[1], typeof arguments, Array.isArray(arguments)].join(","); }
            f("a", "b", "c")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("3,b,object,false"));
    }

    #[test]
    fn test_arrow_functions_have_lexical_this_and_arguments() {
        let script = r#"
            function outer() {
                const arrow = () => [this.tag, arguments[0]].join(",");
                return arrow("ignored");
            }
            outer.call({ tag: "lexical" }, "outer-arg")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("lexical,outer-arg"));
    }

    #[test]
    fn test_arrow_is_not_constructor() {
        assert_eq!(error_name("const A = () => {}; new A();"), "TypeError");
    }

    #[test]
    fn test_this_binding_modes() {
        let script = r#"
            function sloppy() { return this === globalThis; }
            function strict() { "use strict"; return this; }
            [sloppy(), strict() === undefined, sloppy.call(null), typeof strict.call(5)].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("true,true,true,number"));
    }

    #[test]
    fn test_constructors_and_prototypes() {
        let script = r#"
            function Point(x, y) { this.x = x; this.y = y; }
            Point.prototype.sum = function () { return this.x + this.y; };
            const p = new Point(2, 3);
            [p.sum(), p instanceof Point, Object.getPrototypeOf(p) === Point.prototype,
             Point.prototype.constructor === Point].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("5,true,true,true"));
    }

    #[test]
    fn test_constructor_returning_object() {
        let script = r#"
            function F() { this.a = 1; return { b: 2 }; }
            function G() { this.a = 1; return 3; }
            [new F().b, new F().a, new G().a].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("2,,1"));
    }

    #[test]
    fn test_call_and_apply() {
        let script = r#"
            function join(sep) { return [this.a, this.b].join(sep); }
            join.call({ a: 1, b: 2 }, "+") + " " + join.apply({ a: 3, b: 4 }, ["-"])
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("1+2 3-4"));
    }

    #[test]
    fn test_spread_arguments() {
        let script = r#"
            function sum(a, b, c) { return a + b + c; }
            const rest = [2, 3];
            sum(1, ...rest) + sum(...[10, 20, 30])
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from(66));
    }

    #[test]
    fn test_recursion() {
        let script = r#"
            function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); }
            fib(15)
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from(610));
    }

    #[test]
    fn test_call_depth_limit() {
        let mut agent = aot_vm::Agent::new(AgentOptions {
            max_call_depth: Some(64),
            ..AgentOptions::default()
        });
        let result = agent.run_script("function f() { return f(); } f();", &SourceOptions::default());
        assert!(matches!(result, Err(JSError::Throw { ref message }) if message.starts_with("RangeError")), "{result:?}");
    }

    #[test]
    fn test_deep_recursion_runs_without_a_limit() {
        // tree walking costs native stack per call; give the evaluator room for 10k frames
        let handle = std::thread::Builder::new()
            .stack_size(1 << 30)
            .spawn(|| {
                let script = "function d(n) { return n === 0 ? 0 : 1 + d(n - 1); } d(200) + d(10000)";
                assert_eq!(evaluate_script(script).unwrap(), Value::from(10200));
            })
            .unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_call_depth_limit_is_configurable() {
        let mut agent = aot_vm::Agent::new(AgentOptions {
            max_call_depth: Some(8),
            ..AgentOptions::default()
        });
        let script = "function depth(n) { return n === 0 ? 0 : 1 + depth(n - 1); } depth(20)";
        let result = agent.run_script(script, &SourceOptions::default());
        assert!(matches!(result, Err(JSError::Throw { ref message }) if message.starts_with("RangeError")), "{result:?}");
        assert_eq!(agent.run_script("depth(3)", &SourceOptions::default()).unwrap(), Value::from(3));
    }

    #[test]
    fn test_calling_non_callable() {
        assert_eq!(error_name("const x = 1; x();"), "TypeError");
        assert_eq!(error_name("const o = {}; o.missing();"), "TypeError");
        assert_eq!(error_name("new Math();"), "ReferenceError");
    }

    #[test]
    fn test_function_constructor_throws() {
        assert_eq!(error_name("Function('return 1')"), "TypeError");
    }

    #[test]
    fn test_function_to_string_returns_source() {
        let script = r#"
            function answer() { return 42; }
            answer.toString()
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("function answer() { return 42; }"));
    }

    #[test]
    fn test_parameter_expression_scope() {
        let script = r#"
            var x = "global";
            function f(a = () => x) { var x = "local"; return a(); }
            f()
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("global"));
    }

    #[test]
    fn test_object_methods_and_super() {
        let script = r#"
            const base = { greet() { return "base"; } };
            const derived = { __proto__: base, greet() { return super.greet() + "+derived"; } };
            derived.greet()
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("base+derived"));
    }
}
