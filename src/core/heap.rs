//! Cycle collection for the reference-counted object graph.
//!
//! Objects, environment records and module records are `Rc`s, and the language
//! builds cycles between them all the time (`F.prototype.constructor === F`, a
//! closure stored in its own scope, a namespace and its module). Every such node
//! is registered here when it is allocated. [`collect_cycles`] finds the nodes
//! that nothing outside the graph can reach and empties them, which lets `Rc`
//! free them.
//!
//! Reachability works without knowing the host's roots: a node whose strong count
//! exceeds the number of references held by other tracked nodes is referenced from
//! outside (a realm, an execution context, a `Value` in host code) and is a root.

use crate::core::{Environment, EnvironmentRecord, Object, ObjectData, Value, module::ModuleRecord};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

const MIN_PRUNE_THRESHOLD: usize = 1024;

pub(crate) enum Tracked {
    Object(Weak<RefCell<ObjectData>>),
    Environment(Weak<RefCell<EnvironmentRecord>>),
    Module(Weak<ModuleRecord>),
}

impl Tracked {
    fn is_live(&self) -> bool {
        match self {
            Tracked::Object(weak) => weak.strong_count() > 0,
            Tracked::Environment(weak) => weak.strong_count() > 0,
            Tracked::Module(weak) => weak.strong_count() > 0,
        }
    }

    fn upgrade(&self) -> Option<Node> {
        match self {
            Tracked::Object(weak) => weak.upgrade().map(|rc| Node::Object(Object::from_rc(rc))),
            Tracked::Environment(weak) => weak.upgrade().map(|rc| Node::Environment(Environment::from_rc(rc))),
            Tracked::Module(weak) => weak.upgrade().map(Node::Module),
        }
    }
}

/// A strong handle taken for the duration of one collection.
enum Node {
    Object(Object),
    Environment(Environment),
    Module(Rc<ModuleRecord>),
}

impl Node {
    fn addr(&self) -> usize {
        match self {
            Node::Object(object) => object.addr(),
            Node::Environment(env) => env.addr(),
            Node::Module(module) => Rc::as_ptr(module) as *const () as usize,
        }
    }

    fn strong_count(&self) -> usize {
        match self {
            Node::Object(object) => object.strong_count(),
            Node::Environment(env) => env.strong_count(),
            Node::Module(module) => Rc::strong_count(module),
        }
    }

    /// Reports every outgoing edge; `false` when the node is borrowed and could not be inspected.
    fn trace(&self, visit: &mut dyn FnMut(usize)) -> bool {
        match self {
            Node::Object(object) => object.trace(visit),
            Node::Environment(env) => env.trace(visit),
            Node::Module(module) => module.trace(visit),
        }
    }

    fn release(&self) {
        match self {
            Node::Object(object) => object.release(),
            Node::Environment(env) => env.release(),
            Node::Module(module) => module.release(),
        }
    }

    fn downgrade(&self) -> Tracked {
        match self {
            Node::Object(object) => Tracked::Object(object.weak()),
            Node::Environment(env) => Tracked::Environment(env.weak()),
            Node::Module(module) => Tracked::Module(Rc::downgrade(module)),
        }
    }
}

struct Heap {
    tracked: Vec<Tracked>,
    prune_at: usize,
}

thread_local! {
    static HEAP: RefCell<Heap> = const {
        RefCell::new(Heap {
            tracked: Vec::new(),
            prune_at: MIN_PRUNE_THRESHOLD,
        })
    };
}

pub(crate) fn trace_value(value: &Value, visit: &mut dyn FnMut(usize)) {
    if let Value::Object(object) = value {
        visit(object.addr());
    }
}

/// Registers a freshly allocated node.
pub(crate) fn track(node: Tracked) {
    // fails only while the thread is shutting down, when nothing is collected anyway
    let _ = HEAP.try_with(|heap| {
        let mut heap = heap.borrow_mut();
        if heap.tracked.len() >= heap.prune_at {
            heap.tracked.retain(Tracked::is_live);
            heap.prune_at = (heap.tracked.len() * 2).max(MIN_PRUNE_THRESHOLD);
        }
        heap.tracked.push(node);
    });
}

/// Number of tracked nodes that are still alive on this thread.
pub fn live_count() -> usize {
    HEAP.try_with(|heap| heap.borrow().tracked.iter().filter(|node| node.is_live()).count())
        .unwrap_or(0)
}

/// Frees every cycle on this thread that is unreachable from outside the object
/// graph. Returns the number of nodes released.
pub fn collect_cycles() -> usize {
    let Ok(tracked) = HEAP.try_with(|heap| std::mem::take(&mut heap.borrow_mut().tracked)) else {
        return 0;
    };
    let nodes: Vec<Node> = tracked.iter().filter_map(Tracked::upgrade).collect();
    drop(tracked);

    let index: HashMap<usize, usize> = nodes.iter().enumerate().map(|(i, node)| (node.addr(), i)).collect();

    // references held by other tracked nodes
    let mut internal = vec![0usize; nodes.len()];
    let mut opaque = vec![false; nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        let traced = node.trace(&mut |addr| {
            if let Some(&j) = index.get(&addr) {
                internal[j] += 1;
            }
        });
        opaque[i] = !traced;
    }

    // the snapshot in `nodes` holds one reference of its own
    let mut marked = vec![false; nodes.len()];
    let mut stack: Vec<usize> = (0..nodes.len())
        .filter(|&i| opaque[i] || nodes[i].strong_count() > internal[i] + 1)
        .collect();
    for &i in &stack {
        marked[i] = true;
    }
    while let Some(i) = stack.pop() {
        nodes[i].trace(&mut |addr| {
            if let Some(&j) = index.get(&addr)
                && !marked[j]
            {
                marked[j] = true;
                stack.push(j);
            }
        });
    }

    let survivors: Vec<Tracked> = nodes.iter().zip(&marked).filter(|(_, marked)| **marked).map(|(node, _)| node.downgrade()).collect();
    let _ = HEAP.try_with(|heap| heap.borrow_mut().tracked.extend(survivors));

    let mut released = 0;
    for (node, _) in nodes.iter().zip(&marked).filter(|(_, marked)| !**marked) {
        node.release();
        released += 1;
    }
    if released > 0 {
        log::debug!("collected {released} of {} tracked nodes", nodes.len());
    }
    released
}

#[cfg(test)]
mod heap_tests {
    use super::*;
    use crate::core::Agent;
    use crate::options::{AgentOptions, SourceOptions};

    fn run(agent: &mut Agent, source: &str) -> Value {
        agent.run_script(source, &SourceOptions::default()).unwrap()
    }

    #[test]
    fn test_unreachable_closure_cycle_is_collected() {
        let mut agent = Agent::new(AgentOptions::default());
        let Value::Object(function) = run(&mut agent, "(function () { let f = function () { return f; }; return f; })()") else {
            panic!("expected a function");
        };
        let weak = function.downgrade();
        drop(function);
        assert!(weak.upgrade().is_some(), "the closure keeps itself alive through its scope");
        assert!(collect_cycles() > 0);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_collection_keeps_reachable_graph() {
        let mut agent = Agent::new(AgentOptions::default());
        run(&mut agent, "class Keep { constructor() { this.self = this; } get() { return 42; } } var kept = new Keep();");
        let Value::Object(held) = run(&mut agent, "({ self: null })") else {
            panic!("expected an object");
        };
        collect_cycles();
        assert_eq!(run(&mut agent, "kept.self.get() + [1, 2].length"), Value::from(44));
        assert!(held.borrow().properties.len() == 1, "objects held by the host survive collection");
    }

    #[test]
    fn test_dropping_agent_releases_its_realm() {
        let weak = {
            let mut agent = Agent::new(AgentOptions::default());
            let Value::Object(class) = run(&mut agent, "class Leak { method() {} static other() {} }; Leak") else {
                panic!("expected a class");
            };
            class.downgrade()
        };
        assert!(weak.upgrade().is_none());
    }
}
