use aot_vm::{AgentOptions, JSError, SourceOptions, Value, evaluate_script};

// Initialize logger for this integration test binary so `RUST_LOG` is honored.
// Using `ctor` ensures initialization runs before tests start.
#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

#[cfg(test)]
mod control_flow_tests {
    use super::*;

    #[test]
    fn test_if_else_completion_values() {
        assert_eq!(evaluate_script("if (true) { 1; } else { 2; }").unwrap(), Value::from(1));
        assert_eq!(evaluate_script("if (0) { 1; } else { 2; }").unwrap(), Value::from(2));
        assert_eq!(evaluate_script("3; if (false) { 1; }").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_statement_list_keeps_last_value() {
        assert_eq!(evaluate_script("1; var x = 5;").unwrap(), Value::from(1));
        assert_eq!(evaluate_script("1; ;").unwrap(), Value::from(1));
        assert_eq!(evaluate_script("").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_loops() {
        let script = r#"
            let total = 0;
            for (let i = 0; i < 5; i++) { total += i; }
            let n = 0;
            while (n < 3) { n++; }
            let m = 10;
            do { m++; } while (m < 5);
            [total, n, m].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("10,3,11"));
    }

    #[test]
    fn test_loop_completion_value() {
        assert_eq!(evaluate_script("for (var i = 0; i < 3; i++) { i * 2; }").unwrap(), Value::from(4));
        assert_eq!(evaluate_script("7; while (false) {}").unwrap(), Value::Undefined);
        assert_eq!(evaluate_script("for (;;) { 5; break; }").unwrap(), Value::from(5));
    }

    #[test]
    fn test_break_and_continue() {
        let script = r#"
            const seen = [];
            for (let i = 0; i < 10; i++) {
                if (i % 2) continue;
                if (i > 6) break;
                seen.push(i);
            }
            seen.join("")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("0246"));
    }

    #[test]
    fn test_labeled_break_and_continue() {
        let script = r#"
            const pairs = [];
            outer: for (let i = 0; i < 3; i++) {
                inner: for (let j = 0; j < 3; j++) {
                    if (j === 1) continue outer;
                    if (i === 2) break outer;
                    pairs.push(i + "" + j);
                }
            }
            block: {
                pairs.push("in");
                break block;
                pairs.push("never");
            }
            pairs.join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("00,10,in"));
    }

    #[test]
    fn test_for_in_enumeration() {
        let script = r#"
            const proto = { inherited: 1, shadowed: 2 };
            const object = Object.create(proto);
            object.own = 3;
            object.shadowed = 4;
            Object.defineProperty(object, "hidden", { value: 5, enumerable: false });
            const keys = [];
            for (const key in object) keys.push(key);
            keys.join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("own,shadowed,inherited"));
    }

    #[test]
    fn test_for_in_skips_deleted_keys_and_nullish() {
        let script = r#"
            const object = { a: 1, b: 2, c: 3 };
            const keys = [];
            for (var key in object) { keys.push(key); delete object.b; }
            for (var k in null) keys.push("null");
            for (var k in undefined) keys.push("undefined");
            keys.join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("a,c"));
    }

    #[test]
    fn test_for_in_array_indices() {
        let script = r#"
            const keys = [];
            for (const index in ["x", "y"]) keys.push(typeof index + index);
            keys.join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("string0,string1"));
    }

    #[test]
    fn test_for_of_arrays_and_iterators() {
        let script = r#"
            let out = "";
            for (const value of [1, 2, 3]) out += value;
            for (const ch of ["a", "b"].values()) out += ch;
            let last;
            for (last of ["p", "q"]) {}
            out + last
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("123abq"));
    }

    #[test]
    fn test_for_of_destructuring() {
        let script = r#"
            let sum = 0;
            for (const [a, { b }] of [[1, { b: 2 }], [3, { b: 4 }]]) sum += a * b;
            sum
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from(14));
    }

    #[test]
    fn test_for_of_closes_iterator_on_break() {
        let script = r#"
            let closed = 0;
            const iterable = {
                [Symbol.iterator]() {
                    let n = 0;
                    return {
                        next() { n++; return { value: n, done: n > 5 }; },
                        return() { closed++; return {}; },
                    };
                },
            };
            for (const value of iterable) { if (value === 2) break; }
            try { for (const value of iterable) { throw "stop"; } } catch (e) {}
            for (const value of iterable) {}
            closed
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from(2));
    }

    #[test]
    fn test_for_of_over_string() {
        let script = r#"
            const seen = [];
            for (const ch of 'ab') seen.push(ch);
            for (const ch of '') seen.push('never');
            for (const ch of 'x😀') { if (ch === 'x') continue; seen.push(ch.length > 0); }
            seen.join(',')
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("a,b,true"));
    }

    #[test]
    fn test_for_of_non_iterable() {
        let result = evaluate_script("for (const x of 5) {}");
        assert!(matches!(result, Err(JSError::Throw { ref message }) if message.starts_with("TypeError")), "{result:?}");
    }

    #[test]
    fn test_switch() {
        let script = r#"
            function classify(x) {
                let out = "";
                switch (x) {
                    case 1: out += "one";
                    case 2: out += "two"; break;
                    default: out += "default";
                    case 3: out += "three";
                }
                return out;
            }
            [classify(1), classify(2), classify(3), classify(9), classify("1")].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("onetwo,two,three,defaultthree,defaultthree"));
    }

    #[test]
    fn test_switch_completion_value() {
        assert_eq!(evaluate_script("switch (1) { case 1: 'hit'; }").unwrap(), Value::from("hit"));
        assert_eq!(evaluate_script("5; switch (1) { case 2: 'miss'; }").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_try_catch_finally() {
        let script = r#"
            const log = [];
            try { log.push("try"); throw new TypeError("bad"); }
            catch ({ name, message }) { log.push(name + ":" + message); }
            finally { log.push("finally"); }
            try { log.push("no-binding"); throw 1; } catch { log.push("caught"); }
            log.join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("try,TypeError:bad,finally,no-binding,caught"));
    }

    #[test]
    fn test_finally_overrides_only_when_abrupt() {
        let script = r#"
            function normal() { try { return "try"; } finally { "ignored"; } }
            function override() { try { return "try"; } finally { return "finally"; } }
            function swallow() { for (;;) { try { throw "lost"; } finally { break; } } return "swallowed"; }
            [normal(), override(), swallow()].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("try,finally,swallowed"));
    }

    #[test]
    fn test_try_completion_value() {
        assert_eq!(evaluate_script("try { 1; } finally { 2; }").unwrap(), Value::from(1));
        assert_eq!(evaluate_script("try { throw 0; } catch (e) { 'c'; }").unwrap(), Value::from("c"));
    }

    #[test]
    fn test_uncaught_throw_of_primitive() {
        let result = evaluate_script("throw 'plain';");
        assert!(matches!(result, Err(JSError::Throw { .. })), "{result:?}");
    }

    #[test]
    fn test_loop_iteration_limit() {
        let mut agent = aot_vm::Agent::new(AgentOptions {
            max_loop_iterations: Some(100),
            ..AgentOptions::default()
        });
        let result = agent.run_script("while (true) {}", &SourceOptions::default());
        assert!(matches!(result, Err(JSError::Throw { ref message }) if message.starts_with("RangeError")), "{result:?}");
        let result = agent.run_script("let i = 0; for (; i < 50; i++) {} i", &SourceOptions::default());
        assert_eq!(result.unwrap(), Value::from(50));
    }

    #[test]
    fn test_loops_are_unbounded_by_default() {
        let script = "let i = 0; while (i < 1500001) i++; i";
        assert_eq!(evaluate_script(script).unwrap(), Value::from(1500001));
    }

    #[test]
    fn test_logical_and_conditional_operators() {
        let script = r#"
            let a = null;
            a ??= "set";
            let b = 0;
            b ||= 7;
            let c = 1;
            c &&= 9;
            [a, b, c, null ?? "d", 0 || "e", 1 && "f", true ? "g" : "h"].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("set,7,9,d,e,f,g"));
    }
}
