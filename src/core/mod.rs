//! Runtime layer of the abstract machine: values, objects, environments,
//! realms, execution contexts, abstract operations and module records.

mod number;
pub(crate) use number::*;

mod value;
pub use value::*;

mod property_key;
pub use property_key::*;

mod descriptor;
pub use descriptor::*;

mod completion;
pub use completion::*;

mod object;
pub use object::*;

pub mod heap;

pub mod exotics;

mod environment;
pub use environment::*;

mod reference;
pub use reference::*;

mod realm;
pub use realm::*;

mod context;
pub use context::*;

mod builtins;
pub use builtins::{BuiltinFunction, NativeFn};

mod operations;
pub use operations::*;

mod iteration;
pub use iteration::*;

mod function;
pub use function::*;

pub mod module;
pub use module::{ModuleMap, ModuleRecord, ModuleResolver, ModuleStatus, ResolveSet, ResolvedBindingRecord, ResolvedExport};
