use aot_vm::{JSError, Value, evaluate_script};

// Initialize logger for this integration test binary so `RUST_LOG` is honored.
// Using `ctor` ensures initialization runs before tests start.
#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

fn eval_str(script: &str) -> String {
    match evaluate_script(script) {
        Ok(Value::String(s)) => s.to_string(),
        other => panic!("expected a string result, got {other:?}"),
    }
}

#[cfg(test)]
mod operations_tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        assert_eq!(evaluate_script("1 + 2 * 3 - 4 / 2").unwrap(), Value::from(5));
        assert_eq!(evaluate_script("2 ** 3 ** 2").unwrap(), Value::from(512));
        assert_eq!(evaluate_script("-7 % 3").unwrap(), Value::from(-1));
        assert_eq!(evaluate_script("1 / 0").unwrap(), Value::from(f64::INFINITY));
        assert_eq!(evaluate_script("0 / 0").unwrap(), Value::from(f64::NAN));
        assert_eq!(evaluate_script("-0").unwrap(), Value::from(-0.0));
    }

    #[test]
    fn test_bitwise_and_shifts() {
        assert_eq!(evaluate_script("5 & 3 | 8 ^ 1").unwrap(), Value::from(1 | (8 ^ 1)));
        assert_eq!(evaluate_script("~5").unwrap(), Value::from(-6));
        assert_eq!(evaluate_script("1 << 31").unwrap(), Value::from(-2147483648));
        assert_eq!(evaluate_script("-1 >>> 28").unwrap(), Value::from(15));
        assert_eq!(evaluate_script("-16 >> 2").unwrap(), Value::from(-4));
    }

    #[test]
    fn test_string_concatenation_and_conversion() {
        assert_eq!(eval_str("'a' + 1 + 2"), "a12");
        assert_eq!(evaluate_script("1 + 2 + 'a'").unwrap(), Value::from("3a"));
        assert_eq!(eval_str("String(null) + String(undefined) + String(true)"), "nullundefinedtrue");
        assert_eq!(eval_str("'' + [1, [2, 3]]"), "1,2,3");
        assert_eq!(eval_str("'' + {}"), "[object Object]");
        assert_eq!(eval_str("String(0.1 + 0.2)"), "0.30000000000000004");
        assert_eq!(eval_str("String(1e21) + ' ' + String(-1e-7)"), "1e+21 -1e-7");
    }

    #[test]
    fn test_to_number() {
        assert_eq!(evaluate_script("+'  42  '").unwrap(), Value::from(42));
        assert_eq!(evaluate_script("+''").unwrap(), Value::from(0));
        assert_eq!(evaluate_script("+'0x1f'").unwrap(), Value::from(31));
        assert_eq!(evaluate_script("+true + +null").unwrap(), Value::from(1));
        assert_eq!(evaluate_script("+undefined").unwrap(), Value::from(f64::NAN));
        assert_eq!(evaluate_script("+'12px'").unwrap(), Value::from(f64::NAN));
        assert_eq!(evaluate_script("+[5]").unwrap(), Value::from(5));
    }

    #[test]
    fn test_to_primitive_uses_value_of_and_to_string() {
        let script = r#"
            const money = { valueOf() { return 10; }, toString() { return "ten"; } };
            [money + 1, `${money}`, money * 2].join(",")
        "#;
        assert_eq!(eval_str(script), "11,ten,20");
    }

    #[test]
    fn test_to_primitive_failure() {
        let script = "const bad = { valueOf() { return {}; }, toString() { return {}; } }; bad + 1";
        let result = evaluate_script(script);
        assert!(matches!(result, Err(JSError::Throw { ref message }) if message.starts_with("TypeError")), "{result:?}");
    }

    #[test]
    fn test_equality() {
        let script = r#"
            [1 == "1", 0 == false, null == undefined, null == 0, NaN == NaN,
             1 === 1, "1" === 1, {} === {}, [1] == 1, undefined === void 0].join(",")
        "#;
        assert_eq!(eval_str(script), "true,true,true,false,false,true,false,false,true,true");
    }

    #[test]
    fn test_relational() {
        let script = r#"
            ["a" < "b", "10" < "9", 10 < 9, "10" < 9, null >= 0, undefined < 1, NaN <= NaN].join(",")
        "#;
        assert_eq!(eval_str(script), "true,true,false,false,true,false,false");
    }

    #[test]
    fn test_typeof() {
        let script = r#"
            [typeof 1, typeof "s", typeof true, typeof undefined, typeof null, typeof {},
             typeof function () {}, typeof class {}, typeof Symbol(), typeof []].join(",")
        "#;
        assert_eq!(eval_str(script), "number,string,boolean,undefined,object,object,function,function,symbol,object");
    }

    #[test]
    fn test_in_and_instanceof() {
        let script = r#"
            const o = { a: 1 };
            class A {}
            ["a" in o, "toString" in o, "b" in o, 0 in ["x"], new A() instanceof A, {} instanceof A,
             [] instanceof Array, Object.create(null) instanceof Object].join(",")
        "#;
        assert_eq!(eval_str(script), "true,true,false,true,true,false,true,false");
    }

    #[test]
    fn test_in_requires_object() {
        let result = evaluate_script("'a' in 'abc'");
        assert!(matches!(result, Err(JSError::Throw { ref message }) if message.starts_with("TypeError")), "{result:?}");
    }

    #[test]
    fn test_has_instance_hook() {
        let script = r#"
            const Even = { [Symbol.hasInstance](n) { return n % 2 === 0; } };
            [2 instanceof Even, 3 instanceof Even].join(",")
        "#;
        assert_eq!(eval_str(script), "true,false");
    }

    #[test]
    fn test_update_expressions() {
        let script = r#"
            let i = 5;
            const post = i++;
            const pre = ++i;
            const o = { n: "3" };
            o.n--;
            [post, pre, i, o.n, typeof o.n].join(",")
        "#;
        assert_eq!(eval_str(script), "5,7,7,2,number");
    }

    #[test]
    fn test_compound_assignment() {
        let script = r#"
            let x = 10;
            x += 5; x -= 3; x *= 2; x /= 4; x %= 4; x **= 3; x <<= 2; x |= 1;
            x
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from(33));
    }

    #[test]
    fn test_template_literals() {
        let script = r#"
            const name = "world";
            const n = 3;
            `hello ${name}, ${n + 1} ${"nested " + `${n}`}`
        "#;
        assert_eq!(eval_str(script), "hello world, 4 nested 3");
    }

    #[test]
    fn test_object_literals() {
        let script = r#"
            const key = "dyn";
            const shorthand = 1;
            const base = { inherited: true };
            const o = {
                shorthand,
                [key + "amic"]: 2,
                __proto__: base,
                ...{ spread: 3 },
                get computed() { return this.shorthand + this.dynamic; },
                "quoted key": 4,
                7: "number key",
            };
            [o.shorthand, o.dynamic, o.inherited, o.spread, o.computed, o["quoted key"], o[7],
             Object.getPrototypeOf(o) === base, Object.keys(o).join("|")].join(",")
        "#;
        assert_eq!(eval_str(script), "1,2,true,3,3,4,number key,true,7|shorthand|dynamic|spread|computed|quoted key");
    }

    #[test]
    fn test_array_literals_and_holes() {
        let script = r#"
            const holes = [1, , 3];
            const spread = [0, ...holes, 4];
            [holes.length, 1 in holes, spread.length, spread.join("-"), [,].length].join(",")
        "#;
        assert_eq!(eval_str(script), "3,false,5,0-1--3-4,1");
    }

    #[test]
    fn test_array_length_semantics() {
        let script = r#"
            const a = [1, 2, 3];
            a.length = 1;
            a[4] = "x";
            [a.length, a[1], a.indexOf("x")].join(",")
        "#;
        assert_eq!(eval_str(script), "5,,4");
    }

    #[test]
    fn test_property_access_on_primitives() {
        assert_eq!(evaluate_script("'abc'.length").unwrap(), Value::from(3));
        assert_eq!(eval_str("'abc'[1]"), "b");
        assert_eq!(eval_str("(5).toString()"), "5");
        let result = evaluate_script("null.x");
        assert!(matches!(result, Err(JSError::Throw { ref message }) if message.starts_with("TypeError")), "{result:?}");
    }

    #[test]
    fn test_symbols_as_keys() {
        let script = r#"
            const s = Symbol("tag");
            const o = { [s]: 1, plain: 2 };
            [o[s], Object.keys(o).length, s.toString(), typeof Object.getOwnPropertyNames(o)[1]].join(",")
        "#;
        assert_eq!(eval_str(script), "1,1,Symbol(tag),undefined");
    }

    #[test]
    fn test_define_property_and_freeze() {
        let script = r#"
            "use strict";
            const o = {};
            Object.defineProperty(o, "fixed", { value: 1, writable: false });
            let assignment;
            try { o.fixed = 2; } catch (e) { assignment = e.name; }
            const frozen = Object.freeze({ a: 1 });
            let addition;
            try { frozen.b = 1; } catch (e) { addition = e.name; }
            [o.fixed, assignment, addition, Object.isExtensible(frozen)].join(",")
        "#;
        assert_eq!(eval_str(script), "1,TypeError,TypeError,false");
    }

    #[test]
    fn test_errors() {
        let script = r#"
            const e = new RangeError("out of range");
            [e.name, e.message, e instanceof Error, String(e), Object.prototype.toString.call(e),
             Object.prototype.toString.call([]), Object.prototype.toString.call(null)].join("|")
        "#;
        assert_eq!(eval_str(script), "RangeError|out of range|true|RangeError: out of range|[object Error]|[object Array]|[object Null]");
    }

    #[test]
    fn test_comma_void_and_conditional() {
        assert_eq!(evaluate_script("(1, 2, 3)").unwrap(), Value::from(3));
        assert_eq!(evaluate_script("void 'x'").unwrap(), Value::Undefined);
        assert_eq!(eval_str("0 ? 'yes' : 'no'"), "no");
    }

    #[test]
    fn test_strings_iterate_by_code_point() {
        let script = r#"
            const chars = [...'a😀b'];
            const [first, ...rest] = 'xyz';
            const iterator = 'hi'[Symbol.iterator]();
            const steps = [iterator.next().value, iterator.next().value, iterator.next().done, iterator.next().done];
            [
                chars.length,
                chars[1] === '😀',
                first + rest.join(''),
                steps.join(','),
                [...new String('ok')].join(''),
                Object.prototype.toString.call(iterator),
                String.prototype[Symbol.iterator].name,
            ].join('|')
        "#;
        assert_eq!(eval_str(script), "3|true|xyz|h,i,true,true|ok|[object String Iterator]|[Symbol.iterator]");
    }

    #[test]
    fn test_string_iterator_rejects_nullish_receivers() {
        let script = r#"
            const results = [];
            for (const receiver of [null, undefined]) {
                try { String.prototype[Symbol.iterator].call(receiver); } catch (e) { results.push(e.name); }
            }
            const next = ''[Symbol.iterator]().next;
            try { next.call([]); } catch (e) { results.push(e.name); }
            results.join(',')
        "#;
        assert_eq!(eval_str(script), "TypeError,TypeError,TypeError");
    }
}
