use aot_vm::{JSError, Value, evaluate_module};

// Initialize logger for this integration test binary so `RUST_LOG` is honored.
// Using `ctor` ensures initialization runs before tests start.
#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

fn export<'a>(exports: &'a [(String, Value)], name: &str) -> &'a Value {
    exports
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
        .unwrap_or_else(|| panic!("missing export {name}"))
}

#[cfg(test)]
mod module_tests {
    use super::*;

    #[test]
    fn test_named_imports_and_exports() {
        let modules = [
            ("math", "export const pi = 3; export function double(x) { return x * 2; }"),
            ("main", "import { pi, double as twice } from 'math'; export const result = twice(pi);"),
        ];
        let exports = evaluate_module("main", &modules).unwrap();
        assert_eq!(export(&exports, "result"), &Value::from(6));
    }

    #[test]
    fn test_namespace_exports_are_sorted() {
        let modules = [("main", "export const zeta = 1; export let alpha = 2; export function mid() {}")];
        let exports = evaluate_module("main", &modules).unwrap();
        let names: Vec<&str> = exports.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_default_exports() {
        let modules = [
            ("expr", "export default 40 + 2;"),
            ("func", "export default function () { return 'anonymous'; }"),
            ("klass", "export default class { static tag() { return 'class'; } }"),
            ("named", "export default class Named {} export const same = Named;"),
            (
                "main",
                "import value from 'expr';
                 import fn from 'func';
                 import Klass from 'klass';
                 import Named, { same } from 'named';
                 export const results = [value, fn(), fn.name, Klass.tag(), Klass.name, Named === same, Named.name].join(',');",
            ),
        ];
        let exports = evaluate_module("main", &modules).unwrap();
        assert_eq!(export(&exports, "results"), &Value::from("42,anonymous,default,class,default,true,Named"));
    }

    #[test]
    fn test_default_function_is_hoisted() {
        let modules = [
            ("dep", "export default function () { return 'hoisted'; }"),
            ("main", "import f from 'dep'; export const early = f();"),
        ];
        let exports = evaluate_module("main", &modules).unwrap();
        assert_eq!(export(&exports, "early"), &Value::from("hoisted"));
    }

    #[test]
    fn test_live_bindings() {
        let modules = [
            ("counter", "export let count = 0; export function increment() { count++; }"),
            ("main", "import { count, increment } from 'counter'; increment(); increment(); export const seen = count;"),
        ];
        let exports = evaluate_module("main", &modules).unwrap();
        assert_eq!(export(&exports, "seen"), &Value::from(2));
    }

    #[test]
    fn test_imports_are_immutable() {
        let modules = [("dep", "export let x = 1;"), ("main", "import { x } from 'dep'; x = 2;")];
        let result = evaluate_module("main", &modules);
        assert!(matches!(result, Err(JSError::Throw { ref message }) if message.starts_with("TypeError")), "{result:?}");
    }

    #[test]
    fn test_re_exports() {
        let modules = [
            ("base", "export const a = 'a'; export const b = 'b'; export default 'base default';"),
            ("middle", "export { a as renamed } from 'base'; export * from 'base'; import { b } from 'base'; export { b as local };"),
            ("main", "import { renamed, b, local } from 'middle'; export const joined = renamed + b + local;"),
        ];
        let exports = evaluate_module("main", &modules).unwrap();
        assert_eq!(export(&exports, "joined"), &Value::from("abb"));

        let middle = evaluate_module("middle", &modules).unwrap();
        let names: Vec<&str> = middle.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "local", "renamed"]);
    }

    #[test]
    fn test_star_export_excludes_default() {
        let modules = [
            ("base", "export default 1; export const named = 2;"),
            ("middle", "export * from 'base';"),
            ("main", "import def from 'middle';"),
        ];
        let result = evaluate_module("main", &modules);
        assert!(matches!(result, Err(JSError::Throw { ref message }) if message.starts_with("SyntaxError")), "{result:?}");
    }

    #[test]
    fn test_namespace_imports() {
        let modules = [
            ("dep", "export const x = 1; export function f() { return 'f'; }"),
            (
                "main",
                "import * as ns from 'dep';
                 export * as again from 'dep';
                 let frozen;
                 try { ns.x = 2; frozen = 'no error'; } catch (e) { frozen = e.name; }
                 export const results = [ns.x, ns.f(), Object.keys(ns).join('+'), frozen, Object.getPrototypeOf(ns) === null].join(',');",
            ),
        ];
        let exports = evaluate_module("main", &modules).unwrap();
        assert_eq!(export(&exports, "results"), &Value::from("1,f,f+x,TypeError,true"));
        let Value::Object(_) = export(&exports, "again") else {
            panic!("expected namespace object");
        };
    }

    #[test]
    fn test_ambiguous_star_exports() {
        let modules = [
            ("left", "export const shared = 'left';"),
            ("right", "export const shared = 'right';"),
            ("both", "export * from 'left'; export * from 'right';"),
            ("main", "import { shared } from 'both';"),
        ];
        let result = evaluate_module("main", &modules);
        assert!(matches!(result, Err(JSError::Throw { ref message }) if message.contains("conflicting")), "{result:?}");

        // ambiguous names are left out of the namespace instead of failing
        let exports = evaluate_module("both", &modules).unwrap();
        assert!(exports.is_empty());
    }

    #[test]
    fn test_missing_export_is_syntax_error() {
        let modules = [("dep", "export const x = 1;"), ("main", "import { y } from 'dep';")];
        let result = evaluate_module("main", &modules);
        assert!(matches!(result, Err(JSError::Throw { ref message }) if message.starts_with("SyntaxError")), "{result:?}");
    }

    #[test]
    fn test_missing_module() {
        let result = evaluate_module("main", &[("main", "import 'nowhere';")]);
        assert!(matches!(result, Err(JSError::ModuleNotFound { ref specifier, .. }) if specifier == "nowhere"), "{result:?}");
    }

    #[test]
    fn test_cyclic_imports() {
        let modules = [
            ("a", "import { fromB } from 'b'; export function fromA() { return 'A'; } export const combined = fromB();"),
            ("b", "import { fromA } from 'a'; export function fromB() { return 'B' + fromA(); }"),
        ];
        let exports = evaluate_module("a", &modules).unwrap();
        assert_eq!(export(&exports, "combined"), &Value::from("BA"));
    }

    #[test]
    fn test_cyclic_tdz() {
        let modules = [
            ("a", "import { b } from 'b'; export const a = 'a';"),
            ("b", "import { a } from 'a'; export const b = a;"),
        ];
        let result = evaluate_module("a", &modules);
        assert!(matches!(result, Err(JSError::Throw { ref message }) if message.starts_with("ReferenceError")), "{result:?}");
    }

    #[test]
    fn test_evaluation_order_and_single_evaluation() {
        let modules = [
            ("log", "export const log = [];"),
            ("first", "import { log } from 'log'; log.push('first');"),
            ("second", "import { log } from 'log'; import 'first'; log.push('second');"),
            ("main", "import { log } from 'log'; import 'first'; import 'second'; log.push('main'); export const order = log.join(',');"),
        ];
        let exports = evaluate_module("main", &modules).unwrap();
        assert_eq!(export(&exports, "order"), &Value::from("first,second,main"));
    }

    #[test]
    fn test_module_code_is_strict() {
        let modules = [("main", "export let result; try { undeclared = 1; } catch (e) { result = e.name; } export const self = this;")];
        let exports = evaluate_module("main", &modules).unwrap();
        assert_eq!(export(&exports, "result"), &Value::from("ReferenceError"));
        assert_eq!(export(&exports, "self"), &Value::Undefined);
    }

    #[test]
    fn test_evaluation_error_propagates() {
        let modules = [("dep", "throw new Error('dep failed');"), ("main", "import 'dep';")];
        let result = evaluate_module("main", &modules);
        assert!(matches!(result, Err(JSError::Throw { ref message }) if message == "Error: dep failed"), "{result:?}");
    }

    #[test]
    fn test_module_early_errors() {
        let result = evaluate_module("main", &[("main", "export const a = 1; export { a };")]);
        assert!(matches!(result, Err(ref e) if e.is_syntax_error()), "{result:?}");
        let result = evaluate_module("main", &[("main", "export { nothing };")]);
        assert!(matches!(result, Err(ref e) if e.is_syntax_error()), "{result:?}");
    }
}
