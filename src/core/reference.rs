use crate::core::{Agent, Completion, Environment, PropertyKey, Value, throw_reference_error, throw_type_error, to_object};
use std::rc::Rc;

/// A Reference Record.
#[derive(Clone, Debug)]
pub enum Reference {
    Unresolvable {
        name: Rc<str>,
        strict: bool,
    },
    Binding {
        env: Environment,
        name: Rc<str>,
        strict: bool,
    },
    /// `this_value` is present only for super references.
    Property {
        base: Value,
        key: PropertyKey,
        strict: bool,
        this_value: Option<Value>,
    },
}

impl Reference {
    pub fn is_property_reference(&self) -> bool {
        matches!(self, Reference::Property { .. })
    }

    pub fn is_super_reference(&self) -> bool {
        matches!(self, Reference::Property { this_value: Some(_), .. })
    }

    pub fn is_unresolvable(&self) -> bool {
        matches!(self, Reference::Unresolvable { .. })
    }

    fn property_base(agent: &mut Agent, base: &Value, key: &PropertyKey, action: (&str, &str)) -> Completion<crate::core::Object> {
        if base.is_nullish() {
            let (verb, gerund) = action;
            return throw_type_error(agent, &format!("Cannot {verb} properties of {base:?} ({gerund} '{key}')"));
        }
        to_object(agent, base)
    }

    /// GetValue(V)
    pub fn get_value(&self, agent: &mut Agent) -> Completion<Value> {
        match self {
            Reference::Unresolvable { name, .. } => throw_reference_error(agent, &format!("{name} is not defined")),
            Reference::Property { base, key, .. } => {
                let object = Self::property_base(agent, base, key, ("read", "reading"))?;
                object.get(agent, key, &self.get_this_value())
            }
            Reference::Binding { env, name, strict } => env.get_binding_value(agent, name, *strict),
        }
    }

    /// PutValue(V, W)
    pub fn put_value(&self, agent: &mut Agent, value: Value) -> Completion<()> {
        match self {
            Reference::Unresolvable { name, strict } => {
                if *strict {
                    return throw_reference_error(agent, &format!("{name} is not defined"));
                }
                let global = agent.global_object();
                global.set(agent, &PropertyKey::from(name), value, &Value::Object(global.clone()))?;
                Ok(())
            }
            Reference::Property { base, key, strict, .. } => {
                let object = Self::property_base(agent, base, key, ("set", "setting"))?;
                let succeeded = object.set(agent, key, value, &self.get_this_value())?;
                if !succeeded && *strict {
                    return throw_type_error(agent, &format!("Cannot assign to read only property '{key}' of object"));
                }
                Ok(())
            }
            Reference::Binding { env, name, strict } => env.set_mutable_binding(agent, name, value, *strict),
        }
    }

    /// GetThisValue(V)
    pub fn get_this_value(&self) -> Value {
        match self {
            Reference::Property {
                this_value: Some(this), ..
            } => this.clone(),
            Reference::Property { base, .. } => base.clone(),
            _ => Value::Undefined,
        }
    }

    /// InitializeReferencedBinding(V, W)
    pub fn initialize_referenced_binding(&self, agent: &mut Agent, value: Value) -> Completion<()> {
        match self {
            Reference::Binding { env, name, .. } => env.initialize_binding(agent, name, value),
            _ => throw_reference_error(agent, "Invalid binding initialization target"),
        }
    }

    /// The `delete` operator applied to a reference.
    pub fn delete(&self, agent: &mut Agent) -> Completion<bool> {
        match self {
            Reference::Unresolvable { .. } => Ok(true),
            Reference::Property { this_value: Some(_), .. } => throw_reference_error(agent, "Unsupported reference to 'super'"),
            Reference::Property { base, key, strict, .. } => {
                let object = Self::property_base(agent, base, key, ("delete", "deleting"))?;
                let deleted = object.delete(agent, key)?;
                if !deleted && *strict {
                    return throw_type_error(agent, &format!("Cannot delete property '{key}' of object"));
                }
                Ok(deleted)
            }
            Reference::Binding { env, name, .. } => env.delete_binding(agent, name),
        }
    }
}

/// The result of evaluating an expression: a value or a reference still to be dereferenced.
#[derive(Clone, Debug)]
pub enum Evaluated {
    Value(Value),
    Reference(Reference),
}

impl Evaluated {
    pub fn get_value(self, agent: &mut Agent) -> Completion<Value> {
        match self {
            Evaluated::Value(value) => Ok(value),
            Evaluated::Reference(reference) => reference.get_value(agent),
        }
    }
}

impl From<Value> for Evaluated {
    fn from(value: Value) -> Self {
        Evaluated::Value(value)
    }
}

impl From<Reference> for Evaluated {
    fn from(reference: Reference) -> Self {
        Evaluated::Reference(reference)
    }
}
