use aot_vm::core::heap;
use aot_vm::{Agent, AgentOptions, SourceOptions, Value, evaluate_module, evaluate_script};

// Initialize logger for this integration test binary so `RUST_LOG` is honored.
// Using `ctor` ensures initialization runs before tests start.
#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

#[cfg(test)]
mod memory_tests {
    use super::*;

    const CYCLIC_SCRIPT: &str = r#"
        class Node { constructor(next) { this.next = next || this; } size() { return 1; } }
        function outer() { let inner = () => inner; return inner; }
        const ring = new Node(new Node());
        ring.next.next = ring;
        outer() !== null && ring.size() + ring.next.size()
    "#;

    #[test]
    fn test_repeated_scripts_do_not_grow_the_heap() {
        assert_eq!(evaluate_script(CYCLIC_SCRIPT).unwrap(), Value::from(2));
        let baseline = heap::live_count();
        for _ in 0..20 {
            assert_eq!(evaluate_script(CYCLIC_SCRIPT).unwrap(), Value::from(2));
        }
        assert!(heap::live_count() <= baseline, "{} live after repeated runs, {baseline} after the first", heap::live_count());
    }

    #[test]
    fn test_repeated_module_graphs_do_not_grow_the_heap() {
        let modules = [
            ("a", "import { b } from 'b'; export const a = () => b; export class Cycle {}"),
            ("b", "import { a } from 'a'; export const b = 1; export const check = () => typeof a;"),
        ];
        evaluate_module("a", &modules).unwrap();
        let baseline = heap::live_count();
        for _ in 0..10 {
            evaluate_module("a", &modules).unwrap();
        }
        assert!(heap::live_count() <= baseline);
    }

    #[test]
    fn test_host_held_class_outlives_collection_until_agent_drops() {
        let mut agent = Agent::new(AgentOptions::default());
        let Value::Object(class) = agent.run_script("class Held { method() { return 7; } }; Held", &SourceOptions::default()).unwrap() else {
            panic!("expected a class");
        };
        let weak = class.downgrade();
        agent.collect_garbage();
        assert!(weak.upgrade().is_some());
        assert_eq!(agent.run_script("new Held().method()", &SourceOptions::default()).unwrap(), Value::from(7));
        drop(class);
        drop(agent);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_collect_garbage_frees_discarded_closures() {
        let mut agent = Agent::new(AgentOptions::default());
        let options = SourceOptions::default();
        let Value::Object(closure) = agent.run_script("(() => { let self = () => self; return self; })()", &options).unwrap() else {
            panic!("expected a function");
        };
        let weak = closure.downgrade();
        drop(closure);
        assert!(agent.collect_garbage() > 0);
        assert!(weak.upgrade().is_none());
        assert_eq!(agent.run_script("typeof Object", &options).unwrap(), Value::from("function"));
    }
}
