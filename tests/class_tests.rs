use aot_vm::{JSError, Value, evaluate_script};

// Initialize logger for this integration test binary so `RUST_LOG` is honored.
// Using `ctor` ensures initialization runs before tests start.
#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

fn thrown(script: &str) -> String {
    match evaluate_script(script) {
        Err(JSError::Throw { message }) => message,
        other => panic!("expected an uncaught throw, got {other:?}"),
    }
}

#[cfg(test)]
mod class_tests {
    use super::*;

    #[test]
    fn test_base_class_prototype_chain() {
        let script = r#"
            class Foo {}
            Object.getPrototypeOf(Foo.prototype) === Object.prototype
                && Object.getPrototypeOf(Foo) === Function.prototype
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from(true));
    }

    #[test]
    fn test_derived_class_prototype_chain() {
        let script = r#"
            class A {}
            class B extends A {}
            Object.getPrototypeOf(B.prototype) === A.prototype && Object.getPrototypeOf(B) === A
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from(true));
    }

    #[test]
    fn test_extends_null() {
        let script = r#"
            class C extends null {
                constructor() { this.x = 1; }
            }
            let result;
            try {
                new C();
                result = "constructed";
            } catch (e) {
                result = e instanceof ReferenceError;
            }
            Object.getPrototypeOf(C.prototype) === null && result
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from(true));
    }

    #[test]
    fn test_extends_non_constructor_is_type_error() {
        let message = thrown("class C extends 5 {}");
        assert!(message.starts_with("TypeError"), "{message}");

        let message = thrown("class C extends ({}) {}");
        assert!(message.starts_with("TypeError"), "{message}");

        let message = thrown("function F() {} F.prototype = 3; class C extends F {}");
        assert!(message.starts_with("TypeError"), "{message}");
    }

    #[test]
    fn test_static_and_prototype_methods() {
        let script = r#"
            class Foo {
                static x() { return 1; }
                bar() { return 2; }
            }
            [Foo.x(), Foo.prototype.bar(), typeof Foo.prototype.x, Foo.prototype.hasOwnProperty("bar")].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("1,2,undefined,true"));
    }

    #[test]
    fn test_methods_are_non_enumerable() {
        let script = r#"
            class Foo { bar() {} static baz() {} }
            Object.keys(Foo.prototype).length + Object.keys(Foo).length
                + (Foo.prototype.propertyIsEnumerable("constructor") ? 10 : 0)
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from(0));
    }

    #[test]
    fn test_class_constructor_not_callable() {
        let message = thrown("class Foo {} Foo();");
        assert!(message.starts_with("TypeError"), "{message}");
    }

    #[test]
    fn test_class_binding_inner_scope_is_immutable() {
        let script = r#"
            let result;
            class Foo {
                static rename() {
                    try { Foo = 1; } catch (e) { return e instanceof TypeError; }
                    return false;
                }
            }
            Foo.rename()
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from(true));
    }

    #[test]
    fn test_class_declaration_tdz() {
        let message = thrown("new Foo(); class Foo {}");
        assert!(message.starts_with("ReferenceError"), "{message}");
    }

    #[test]
    fn test_super_calls_and_properties() {
        let script = r#"
            class A {
                constructor(x) { this.x = x; }
                describe() { return "A" + this.x; }
                static make() { return "static A"; }
            }
            class B extends A {
                constructor(x, y) { super(x); this.y = y; }
                describe() { return super.describe() + "B" + this.y; }
                static make() { return super.make() + " via B"; }
            }
            const b = new B(1, 2);
            [b.describe(), B.make(), b instanceof A, b.constructor === B].join("|")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("A1B2|static A via B|true|true"));
    }

    #[test]
    fn test_default_derived_constructor_forwards_arguments() {
        let script = r#"
            class A { constructor(a, b) { this.sum = a + b; } }
            class B extends A {}
            new B(3, 4).sum
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from(7));
    }

    #[test]
    fn test_this_before_super_is_reference_error() {
        let script = r#"
            class A {}
            class B extends A { constructor() { this.x = 1; super(); } }
            try { new B(); "no error"; } catch (e) { e.name; }
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("ReferenceError"));
    }

    #[test]
    fn test_super_called_twice_is_reference_error() {
        let script = r#"
            class A {}
            class B extends A { constructor() { super(); super(); } }
            try { new B(); "no error"; } catch (e) { e.name; }
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("ReferenceError"));
    }

    #[test]
    fn test_derived_constructor_return_rules() {
        let script = r#"
            class A {}
            class ReturnsObject extends A { constructor() { super(); return { tag: "obj" }; } }
            class ReturnsPrimitive extends A { constructor() { super(); return 1; } }
            class Base { constructor() { return 1; } }
            let primitive;
            try { new ReturnsPrimitive(); } catch (e) { primitive = e.name; }
            [new ReturnsObject().tag, primitive, new Base() instanceof Base].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("obj,TypeError,true"));
    }

    #[test]
    fn test_accessors() {
        let script = r#"
            class Temp {
                constructor() { this._c = 10; }
                get f() { return this._c * 9 / 5 + 32; }
                set f(v) { this._c = (v - 32) * 5 / 9; }
                static get kind() { return "temp"; }
            }
            const t = new Temp();
            t.f = 212;
            [t._c, t.f, Temp.kind].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("100,212,temp"));
    }

    #[test]
    fn test_computed_member_names_in_order() {
        let script = r#"
            const order = [];
            function key(name) { order.push(name); return name; }
            class K {
                [key("a")]() { return 1; }
                static [key("b")]() { return 2; }
                [key("c")] = 3;
            }
            order.join("") + new K().a() + K.b() + new K().c
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("abc123"));
    }

    #[test]
    fn test_throwing_member_key_leaves_binding_uninitialized() {
        let script = r#"
            let installed = [];
            try {
                class K {
                    a() {}
                    [(() => { throw new Error("boom"); })()]() {}
                    c() {}
                }
            } catch (e) {
                installed.push(e.message);
            }
            installed.join()
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("boom"));
    }

    #[test]
    fn test_fields() {
        let script = r#"
            let counter = 0;
            class A {
                x = ++counter;
                y = this.x * 10;
                static s = "static";
            }
            class B extends A {
                z = this.y + 1;
                constructor() { super(); this.after = this.z; }
            }
            const b = new B();
            [b.x, b.y, b.z, b.after, A.s, new A().x, A.prototype.hasOwnProperty("x")].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("1,10,11,11,static,2,false"));
    }

    #[test]
    fn test_field_initializer_this_and_arrow() {
        let script = r#"
            class Counter {
                count = 0;
                inc = () => ++this.count;
            }
            const c = new Counter();
            const inc = c.inc;
            inc(); inc();
            c.count
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from(2));
    }

    #[test]
    fn test_class_names() {
        let script = r#"
            class Named {}
            const plain = class {};
            const expression = class Inner {};
            const holder = { prop: class {} };
            const unnamed = (0, class {});
            [Named.name, plain.name, expression.name, holder.prop.name, unnamed.hasOwnProperty("name")].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("Named,plain,Inner,prop,false"));
    }

    #[test]
    fn test_class_expressions_evaluate_independently() {
        let script = r#"
            function make() { return class {}; }
            const first = make();
            const second = make();
            Object.defineProperty(first, "name", { value: "First" });
            Object.defineProperty(second, "name", { value: "Second" });
            [first !== second, first.prototype !== second.prototype, first.name, second.name].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("true,true,First,Second"));
    }

    #[test]
    fn test_class_source_text() {
        let script = r#"
            class Foo { bar() { return 1; } }
            Foo.toString()
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("class Foo { bar() { return 1; } }"));
    }

    #[test]
    fn test_class_body_is_strict() {
        let script = r#"
            class Foo { static leak() { undeclared = 1; } }
            try { Foo.leak(); "no error"; } catch (e) { e.name; }
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("ReferenceError"));
    }

    #[test]
    fn test_new_target_in_constructors() {
        let script = r#"
            class A { constructor() { this.target = new.target; } }
            class B extends A {}
            new B().target === B && new A().target === A
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from(true));
    }

    #[test]
    fn test_extends_expression_with_side_effects() {
        let script = r#"
            let evaluated = 0;
            function mixin(Base) { evaluated++; return class extends Base { mixed() { return "mixed"; } }; }
            class Root { root() { return "root"; } }
            class Leaf extends mixin(Root) {}
            const leaf = new Leaf();
            [evaluated, leaf.mixed(), leaf.root()].join(",")
        "#;
        assert_eq!(evaluate_script(script).unwrap(), Value::from("1,mixed,root"));
    }
}
