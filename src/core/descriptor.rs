use crate::core::{
    Agent, Completion, Intrinsic, Object, PropertyKey, Value, create_data_property_or_throw, get, has_property, throw_type_error, to_boolean,
};

/// A possibly partial Property Descriptor, as accepted by [[DefineOwnProperty]].
#[derive(Clone, Debug, Default)]
pub struct PropertyDescriptor {
    pub value: Option<Value>,
    pub writable: Option<bool>,
    pub get: Option<Value>,
    pub set: Option<Value>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    pub fn data(value: Value, writable: bool, enumerable: bool, configurable: bool) -> Self {
        PropertyDescriptor {
            value: Some(value),
            writable: Some(writable),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
            ..Default::default()
        }
    }

    pub fn accessor(get: Value, set: Value, enumerable: bool, configurable: bool) -> Self {
        PropertyDescriptor {
            get: Some(get),
            set: Some(set),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
            ..Default::default()
        }
    }

    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    pub fn is_generic_descriptor(&self) -> bool {
        !self.is_accessor_descriptor() && !self.is_data_descriptor()
    }

    /// ToPropertyDescriptor
    pub fn from_value(agent: &mut Agent, value: &Value) -> Completion<Self> {
        let Value::Object(obj) = value else {
            return throw_type_error(agent, "Property description must be an object");
        };
        let mut desc = PropertyDescriptor::default();
        let field = |agent: &mut Agent, name: &str| -> Completion<Option<Value>> {
            let key = PropertyKey::from(name);
            if has_property(agent, obj, &key)? {
                Ok(Some(get(agent, obj, &key)?))
            } else {
                Ok(None)
            }
        };
        desc.enumerable = field(agent, "enumerable")?.map(|v| to_boolean(&v));
        desc.configurable = field(agent, "configurable")?.map(|v| to_boolean(&v));
        desc.value = field(agent, "value")?;
        desc.writable = field(agent, "writable")?.map(|v| to_boolean(&v));
        if let Some(getter) = field(agent, "get")? {
            if !getter.is_undefined() && !getter.is_callable() {
                return throw_type_error(agent, "Getter must be a function");
            }
            desc.get = Some(getter);
        }
        if let Some(setter) = field(agent, "set")? {
            if !setter.is_undefined() && !setter.is_callable() {
                return throw_type_error(agent, "Setter must be a function");
            }
            desc.set = Some(setter);
        }
        if desc.is_accessor_descriptor() && desc.is_data_descriptor() {
            return throw_type_error(agent, "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute");
        }
        Ok(desc)
    }

    /// FromPropertyDescriptor
    pub fn to_object(&self, agent: &mut Agent) -> Completion<Object> {
        let obj = Object::ordinary(Some(agent.intrinsic(Intrinsic::ObjectPrototype)));
        let fields = [
            ("value", self.value.clone()),
            ("writable", self.writable.map(Value::Boolean)),
            ("get", self.get.clone()),
            ("set", self.set.clone()),
            ("enumerable", self.enumerable.map(Value::Boolean)),
            ("configurable", self.configurable.map(Value::Boolean)),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                create_data_property_or_throw(agent, &obj, &PropertyKey::from(name), value)?;
            }
        }
        Ok(obj)
    }
}

/// A property as stored in an object's property table; always complete.
#[derive(Clone, Debug)]
pub enum Property {
    Data {
        value: Value,
        writable: bool,
        enumerable: bool,
        configurable: bool,
    },
    Accessor {
        get: Value,
        set: Value,
        enumerable: bool,
        configurable: bool,
    },
}

impl Property {
    pub fn data(value: Value, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Property::Data {
            value,
            writable,
            enumerable,
            configurable,
        }
    }

    /// writable, non-enumerable, configurable: the attributes of built-in methods
    pub fn method(value: Value) -> Self {
        Property::data(value, true, false, true)
    }

    pub fn enumerable(&self) -> bool {
        match self {
            Property::Data { enumerable, .. } | Property::Accessor { enumerable, .. } => *enumerable,
        }
    }

    pub fn configurable(&self) -> bool {
        match self {
            Property::Data { configurable, .. } | Property::Accessor { configurable, .. } => *configurable,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Property::Data { value, .. } => Some(value),
            Property::Accessor { .. } => None,
        }
    }

    pub fn to_descriptor(&self) -> PropertyDescriptor {
        match self {
            Property::Data {
                value,
                writable,
                enumerable,
                configurable,
            } => PropertyDescriptor::data(value.clone(), *writable, *enumerable, *configurable),
            Property::Accessor {
                get,
                set,
                enumerable,
                configurable,
            } => PropertyDescriptor::accessor(get.clone(), set.clone(), *enumerable, *configurable),
        }
    }

    /// Builds a new property from a descriptor, filling absent fields with defaults.
    pub fn from_descriptor(desc: &PropertyDescriptor) -> Self {
        let enumerable = desc.enumerable.unwrap_or(false);
        let configurable = desc.configurable.unwrap_or(false);
        if desc.is_accessor_descriptor() {
            Property::Accessor {
                get: desc.get.clone().unwrap_or_default(),
                set: desc.set.clone().unwrap_or_default(),
                enumerable,
                configurable,
            }
        } else {
            Property::Data {
                value: desc.value.clone().unwrap_or_default(),
                writable: desc.writable.unwrap_or(false),
                enumerable,
                configurable,
            }
        }
    }
}
