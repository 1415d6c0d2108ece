pub mod ast;
pub mod core;
pub(crate) mod error;
pub mod options;
pub mod syntax;

pub use core::{Agent, ModuleMap, ModuleResolver, Object, Value};
pub use error::JSError;
pub use options::{AgentOptions, SourceOptions};

/// Evaluates `script` as a sloppy-mode script in a fresh agent and returns its completion value.
pub fn evaluate_script<T: AsRef<str>>(script: T) -> Result<Value, JSError> {
    evaluate_script_with_options(script, &SourceOptions::default())
}

pub fn evaluate_script_with_options<T: AsRef<str>>(script: T, options: &SourceOptions) -> Result<Value, JSError> {
    let script = script.as_ref();
    log::debug!("evaluate_script called with script len {}", script.len());
    let mut agent = Agent::new(AgentOptions::default());
    agent.run_script(script, options)
}

/// Loads, links and evaluates the module graph rooted at `entry`, with every module
/// source supplied up front as `(specifier, source)` pairs. Returns the entry's exports
/// in namespace key order.
pub fn evaluate_module(entry: &str, modules: &[(&str, &str)]) -> Result<Vec<(String, Value)>, JSError> {
    let mut agent = Agent::new(AgentOptions::default());
    let map = ModuleMap::new(agent.realm().clone());
    for (specifier, source) in modules {
        map.insert(specifier, source);
    }
    let namespace = agent.run_module(&map, entry)?;
    let keys = namespace.own_property_keys(&mut agent).map_err(|abrupt| agent.uncaught(abrupt))?;
    let mut exports = Vec::with_capacity(keys.len());
    for key in keys.into_iter().filter(|key| !key.is_symbol()) {
        let value = core::get(&mut agent, &namespace, &key).map_err(|abrupt| agent.uncaught(abrupt))?;
        exports.push((key.to_string(), value));
    }
    Ok(exports)
}
