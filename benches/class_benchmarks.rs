use aot_vm::{Agent, AgentOptions, SourceOptions, evaluate_module, evaluate_script};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

// cargo bench --profile dev

// Initialize logger for benchmark so `RUST_LOG` is honored.
#[ctor::ctor]
fn __init_bench_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).try_init();
}

fn benchmark_class_definition(c: &mut Criterion) {
    // Class definition evaluation with methods, accessors and fields
    c.bench_function("class_definition", |b| {
        b.iter(|| {
            let script = r#"
                class Shape {
                    sides = 0;
                    static count = 0;
                    constructor(name) { this.name = name; Shape.count++; }
                    get label() { return this.name + "/" + this.sides; }
                    describe() { return this.label; }
                }
                class Square extends Shape {
                    sides = 4;
                    area(size) { return size * size; }
                }
                new Square("square").describe();
            "#;
            let _ = black_box(evaluate_script(script));
        })
    });

    // Many class expressions in a loop
    c.bench_function("class_expression_loop", |b| {
        b.iter(|| {
            let script = r#"
                const classes = [];
                for (let i = 0; i < 50; i++) {
                    classes.push(class { static id() { return i; } });
                }
                classes.length;
            "#;
            let _ = black_box(evaluate_script(script));
        })
    });
}

fn benchmark_method_calls(c: &mut Criterion) {
    // Construction and super calls through a three level hierarchy
    c.bench_function("derived_construct_and_super", |b| {
        b.iter(|| {
            let script = r#"
                class A { constructor(x) { this.x = x; } value() { return this.x; } }
                class B extends A { value() { return super.value() + 1; } }
                class C extends B { value() { return super.value() * 2; } }
                let total = 0;
                for (let i = 0; i < 200; i++) total += new C(i).value();
                total;
            "#;
            let _ = black_box(evaluate_script(script));
        })
    });

    // Repeated calls on a realm that already holds the class
    let mut agent = Agent::new(AgentOptions::default());
    let options = SourceOptions::default();
    let _ = agent.run_script("class Counter { n = 0; inc() { return ++this.n; } } var counter = new Counter();", &options);
    c.bench_function("method_call_warm_realm", |b| {
        b.iter(|| {
            let _ = black_box(agent.run_script("for (let i = 0; i < 100; i++) counter.inc(); counter.n", &options));
        })
    });
}

fn benchmark_module_linking(c: &mut Criterion) {
    c.bench_function("module_graph_link_and_evaluate", |b| {
        let modules = [
            ("shapes", "export class Shape { area() { return 0; } } export default class Circle extends Shape {}"),
            ("utils", "export * from 'shapes'; export const twice = (x) => x * 2;"),
            ("main", "import Circle from 'shapes'; import { twice, Shape } from 'utils'; export const ok = new Circle() instanceof Shape && twice(2) === 4;"),
        ];
        b.iter(|| {
            let _ = black_box(evaluate_module("main", &modules));
        })
    });
}

criterion_group!(benches, benchmark_class_definition, benchmark_method_calls, benchmark_module_linking);
criterion_main!(benches);
