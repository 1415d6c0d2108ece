use crate::core::{
    Agent, ArrayIteratorState, BuiltinFunction, Completion, FunctionData, Property, PropertyDescriptor, PropertyKey, StringIteratorState,
    Symbol, Value,
    builtins::{call_builtin, construct_builtin},
    call, call_ecmascript_function, construct_ecmascript_function,
    exotics::{
        ArgumentsMap, NamespaceData, arguments_define_own_property, arguments_delete, arguments_get, arguments_get_own_property,
        arguments_set, array_define_own_property, namespace_define_own_property, namespace_delete, namespace_get,
        namespace_get_own_property, namespace_has_property, namespace_own_property_keys, string_define_own_property,
        string_get_own_property, string_own_property_keys,
    },
    heap::{self, Tracked, trace_value},
    same_value, throw_type_error,
};
use indexmap::IndexMap;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

pub struct ObjectData {
    pub prototype: Option<Object>,
    pub extensible: bool,
    pub properties: IndexMap<PropertyKey, Property>,
    pub kind: ObjectKind,
}

/// Internal slots beyond the ordinary ones; selects the internal-method behavior.
pub enum ObjectKind {
    Ordinary,
    /// ECMAScript function object.
    Function(Box<FunctionData>),
    Builtin(BuiltinFunction),
    Array,
    /// Arguments exotic object; `None` for unmapped arguments.
    Arguments(Option<ArgumentsMap>),
    Namespace(NamespaceData),
    String(Rc<str>),
    Number(f64),
    Boolean(bool),
    Symbol(Symbol),
    Error,
    ArrayIterator(ArrayIteratorState),
    StringIterator(StringIteratorState),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Exotic {
    Ordinary,
    Array,
    Arguments,
    Namespace,
    String,
}

/// A shared handle to an object. Equality is identity.
#[derive(Clone)]
pub struct Object(Rc<RefCell<ObjectData>>);

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Object {}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.try_borrow() {
            Ok(_) => write!(f, "[object {}]", self.class_name()),
            Err(_) => write!(f, "[object]"),
        }
    }
}

/// A handle that does not keep its object alive.
#[derive(Clone)]
pub struct WeakObject(Weak<RefCell<ObjectData>>);

impl WeakObject {
    pub fn upgrade(&self) -> Option<Object> {
        self.0.upgrade().map(Object)
    }
}

impl Object {
    pub fn new(prototype: Option<Object>, kind: ObjectKind) -> Self {
        let object = Object(Rc::new(RefCell::new(ObjectData {
            prototype,
            extensible: true,
            properties: IndexMap::new(),
            kind,
        })));
        heap::track(Tracked::Object(object.weak()));
        object
    }

    pub(crate) fn from_rc(rc: Rc<RefCell<ObjectData>>) -> Self {
        Object(rc)
    }

    pub(crate) fn weak(&self) -> Weak<RefCell<ObjectData>> {
        Rc::downgrade(&self.0)
    }

    pub fn downgrade(&self) -> WeakObject {
        WeakObject(self.weak())
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub(crate) fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Reports the address of every object, environment and module this object references.
    pub(crate) fn trace(&self, visit: &mut dyn FnMut(usize)) -> bool {
        let Ok(data) = self.0.try_borrow() else {
            return false;
        };
        if let Some(prototype) = &data.prototype {
            visit(prototype.addr());
        }
        for property in data.properties.values() {
            match property {
                Property::Data { value, .. } => trace_value(value, visit),
                Property::Accessor { get, set, .. } => {
                    trace_value(get, visit);
                    trace_value(set, visit);
                }
            }
        }
        match &data.kind {
            ObjectKind::Function(function) => function.trace(visit),
            ObjectKind::Arguments(Some(map)) => visit(map.env.addr()),
            ObjectKind::Namespace(namespace) => visit(Rc::as_ptr(&namespace.module) as *const () as usize),
            ObjectKind::ArrayIterator(state) => {
                if let Some(iterated) = &state.iterated {
                    visit(iterated.addr());
                }
            }
            _ => {}
        }
        true
    }

    /// Drops every reference this object holds. Only for objects found unreachable.
    pub(crate) fn release(&self) {
        let released = match self.0.try_borrow_mut() {
            Ok(mut data) => Some((
                data.prototype.take(),
                std::mem::take(&mut data.properties),
                std::mem::replace(&mut data.kind, ObjectKind::Ordinary),
            )),
            Err(_) => None,
        };
        drop(released);
    }

    /// OrdinaryObjectCreate(proto)
    pub fn ordinary(prototype: Option<Object>) -> Self {
        Object::new(prototype, ObjectKind::Ordinary)
    }

    pub fn borrow(&self) -> Ref<'_, ObjectData> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, ObjectData> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Inserts or replaces an own property without any validation. Only for freshly
    /// created objects whose shape is fully controlled by the caller.
    pub fn define_raw(&self, key: impl Into<PropertyKey>, property: Property) {
        self.borrow_mut().properties.insert(key.into(), property);
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Function(_) | ObjectKind::Builtin(_))
    }

    pub fn is_constructor(&self) -> bool {
        match &self.borrow().kind {
            ObjectKind::Function(data) => data.is_constructor,
            ObjectKind::Builtin(builtin) => builtin.constructor,
            _ => false,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Array)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Error)
    }

    /// The builtin tag used by `Object.prototype.toString`.
    pub fn class_name(&self) -> &'static str {
        match &self.borrow().kind {
            ObjectKind::Function(_) | ObjectKind::Builtin(_) => "Function",
            ObjectKind::Array => "Array",
            ObjectKind::Arguments(_) => "Arguments",
            ObjectKind::Error => "Error",
            ObjectKind::Boolean(_) => "Boolean",
            ObjectKind::Number(_) => "Number",
            ObjectKind::String(_) => "String",
            ObjectKind::Namespace(_) | ObjectKind::Symbol(_) | ObjectKind::ArrayIterator(_) | ObjectKind::StringIterator(_) | ObjectKind::Ordinary => "Object",
        }
    }

    fn exotic(&self) -> Exotic {
        match &self.borrow().kind {
            ObjectKind::Array => Exotic::Array,
            ObjectKind::Arguments(Some(_)) => Exotic::Arguments,
            ObjectKind::Namespace(_) => Exotic::Namespace,
            ObjectKind::String(_) => Exotic::String,
            _ => Exotic::Ordinary,
        }
    }

    /// [[GetPrototypeOf]]
    pub fn get_prototype_of(&self) -> Option<Object> {
        match self.exotic() {
            Exotic::Namespace => None,
            _ => self.borrow().prototype.clone(),
        }
    }

    /// [[SetPrototypeOf]]
    pub fn set_prototype_of(&self, prototype: Option<Object>) -> bool {
        let current = self.get_prototype_of();
        if current == prototype {
            return true;
        }
        // namespaces have an immutable prototype
        if self.exotic() == Exotic::Namespace || !self.is_extensible() {
            return false;
        }
        let mut p = prototype.clone();
        while let Some(candidate) = p {
            if candidate.ptr_eq(self) {
                return false;
            }
            p = candidate.get_prototype_of();
        }
        self.borrow_mut().prototype = prototype;
        true
    }

    /// [[IsExtensible]]
    pub fn is_extensible(&self) -> bool {
        match self.exotic() {
            Exotic::Namespace => false,
            _ => self.borrow().extensible,
        }
    }

    /// [[PreventExtensions]]
    pub fn prevent_extensions(&self) -> bool {
        self.borrow_mut().extensible = false;
        true
    }

    /// [[GetOwnProperty]]
    pub fn get_own_property(&self, agent: &mut Agent, key: &PropertyKey) -> Completion<Option<Property>> {
        match self.exotic() {
            Exotic::Arguments => arguments_get_own_property(agent, self, key),
            Exotic::Namespace => namespace_get_own_property(agent, self, key),
            Exotic::String => Ok(string_get_own_property(self, key)),
            Exotic::Ordinary | Exotic::Array => Ok(ordinary_get_own_property(self, key)),
        }
    }

    /// [[DefineOwnProperty]]
    pub fn define_own_property(&self, agent: &mut Agent, key: &PropertyKey, desc: PropertyDescriptor) -> Completion<bool> {
        match self.exotic() {
            Exotic::Array => array_define_own_property(agent, self, key, desc),
            Exotic::Arguments => arguments_define_own_property(agent, self, key, desc),
            Exotic::Namespace => namespace_define_own_property(agent, self, key, desc),
            Exotic::String => string_define_own_property(agent, self, key, desc),
            Exotic::Ordinary => ordinary_define_own_property(agent, self, key, desc),
        }
    }

    /// [[HasProperty]]
    pub fn has_property(&self, agent: &mut Agent, key: &PropertyKey) -> Completion<bool> {
        match self.exotic() {
            Exotic::Namespace => namespace_has_property(agent, self, key),
            _ => ordinary_has_property(agent, self, key),
        }
    }

    /// [[Get]]
    pub fn get(&self, agent: &mut Agent, key: &PropertyKey, receiver: &Value) -> Completion<Value> {
        match self.exotic() {
            Exotic::Arguments => arguments_get(agent, self, key, receiver),
            Exotic::Namespace => namespace_get(agent, self, key, receiver),
            _ => ordinary_get(agent, self, key, receiver),
        }
    }

    /// [[Set]]
    pub fn set(&self, agent: &mut Agent, key: &PropertyKey, value: Value, receiver: &Value) -> Completion<bool> {
        match self.exotic() {
            Exotic::Arguments => arguments_set(agent, self, key, value, receiver),
            // namespace exports are never writable through the object
            Exotic::Namespace => Ok(false),
            _ => ordinary_set(agent, self, key, value, receiver),
        }
    }

    /// [[Delete]]
    pub fn delete(&self, agent: &mut Agent, key: &PropertyKey) -> Completion<bool> {
        match self.exotic() {
            Exotic::Arguments => arguments_delete(agent, self, key),
            Exotic::Namespace => namespace_delete(agent, self, key),
            _ => ordinary_delete(agent, self, key),
        }
    }

    /// [[OwnPropertyKeys]]
    pub fn own_property_keys(&self, _agent: &mut Agent) -> Completion<Vec<PropertyKey>> {
        match self.exotic() {
            Exotic::Namespace => Ok(namespace_own_property_keys(self)),
            Exotic::String => Ok(string_own_property_keys(self)),
            _ => Ok(ordinary_own_property_keys(self)),
        }
    }

    /// [[Call]]
    pub fn call(&self, agent: &mut Agent, this: &Value, args: &[Value]) -> Completion<Value> {
        let native = match &self.borrow().kind {
            ObjectKind::Function(_) => None,
            ObjectKind::Builtin(builtin) => Some(builtin.behavior),
            _ => return throw_type_error(agent, "object is not a function"),
        };
        match native {
            Some(behavior) => call_builtin(agent, self, behavior, this, args),
            None => call_ecmascript_function(agent, self, this, args),
        }
    }

    /// [[Construct]]
    pub fn construct(&self, agent: &mut Agent, args: &[Value], new_target: &Object) -> Completion<Value> {
        if !self.is_constructor() {
            return throw_type_error(agent, "object is not a constructor");
        }
        let native = match &self.borrow().kind {
            ObjectKind::Builtin(builtin) => Some(builtin.behavior),
            _ => None,
        };
        match native {
            Some(behavior) => construct_builtin(agent, self, behavior, args, new_target),
            None => construct_ecmascript_function(agent, self, args, new_target),
        }
    }
}

/// OrdinaryGetOwnProperty
pub fn ordinary_get_own_property(obj: &Object, key: &PropertyKey) -> Option<Property> {
    obj.borrow().properties.get(key).cloned()
}

/// OrdinaryDefineOwnProperty
pub fn ordinary_define_own_property(agent: &mut Agent, obj: &Object, key: &PropertyKey, desc: PropertyDescriptor) -> Completion<bool> {
    let current = obj.get_own_property(agent, key)?;
    let extensible = obj.is_extensible();
    Ok(validate_and_apply_property_descriptor(Some(obj), key, extensible, &desc, current.as_ref()))
}

/// IsCompatiblePropertyDescriptor
pub fn is_compatible_property_descriptor(extensible: bool, desc: &PropertyDescriptor, current: Option<&Property>) -> bool {
    validate_and_apply_property_descriptor(None, &PropertyKey::from(""), extensible, desc, current)
}

/// ValidateAndApplyPropertyDescriptor. With `obj == None` only validates.
pub fn validate_and_apply_property_descriptor(
    obj: Option<&Object>,
    key: &PropertyKey,
    extensible: bool,
    desc: &PropertyDescriptor,
    current: Option<&Property>,
) -> bool {
    let Some(current) = current else {
        if !extensible {
            return false;
        }
        if let Some(obj) = obj {
            obj.define_raw(key.clone(), Property::from_descriptor(desc));
        }
        return true;
    };

    if !current.configurable() {
        if desc.configurable == Some(true) {
            return false;
        }
        if desc.enumerable.is_some_and(|e| e != current.enumerable()) {
            return false;
        }
    }

    let current_is_data = matches!(current, Property::Data { .. });
    if !desc.is_generic_descriptor() && current_is_data != desc.is_data_descriptor() {
        if !current.configurable() {
            return false;
        }
    } else if let Property::Data { value, writable, .. } = current
        && desc.is_data_descriptor()
    {
        if !current.configurable() && !writable {
            if desc.writable == Some(true) {
                return false;
            }
            if desc.value.as_ref().is_some_and(|v| !same_value(v, value)) {
                return false;
            }
            return true;
        }
    } else if let Property::Accessor { get, set, .. } = current
        && desc.is_accessor_descriptor()
        && !current.configurable()
    {
        if desc.set.as_ref().is_some_and(|s| !same_value(s, set)) {
            return false;
        }
        if desc.get.as_ref().is_some_and(|g| !same_value(g, get)) {
            return false;
        }
        return true;
    }

    if let Some(obj) = obj {
        obj.define_raw(key.clone(), merge_property(current, desc));
    }
    true
}

/// Overlays the present fields of `desc` on `current`, converting between data and
/// accessor kinds while preserving `enumerable` and `configurable`.
fn merge_property(current: &Property, desc: &PropertyDescriptor) -> Property {
    let enumerable = desc.enumerable.unwrap_or(current.enumerable());
    let configurable = desc.configurable.unwrap_or(current.configurable());
    match current {
        Property::Data { value, writable, .. } if !desc.is_accessor_descriptor() => Property::Data {
            value: desc.value.clone().unwrap_or_else(|| value.clone()),
            writable: desc.writable.unwrap_or(*writable),
            enumerable,
            configurable,
        },
        Property::Accessor { get, set, .. } if !desc.is_data_descriptor() => Property::Accessor {
            get: desc.get.clone().unwrap_or_else(|| get.clone()),
            set: desc.set.clone().unwrap_or_else(|| set.clone()),
            enumerable,
            configurable,
        },
        Property::Data { .. } => Property::Accessor {
            get: desc.get.clone().unwrap_or_default(),
            set: desc.set.clone().unwrap_or_default(),
            enumerable,
            configurable,
        },
        Property::Accessor { .. } => Property::Data {
            value: desc.value.clone().unwrap_or_default(),
            writable: desc.writable.unwrap_or(false),
            enumerable,
            configurable,
        },
    }
}

/// OrdinaryHasProperty
pub fn ordinary_has_property(agent: &mut Agent, obj: &Object, key: &PropertyKey) -> Completion<bool> {
    if obj.get_own_property(agent, key)?.is_some() {
        return Ok(true);
    }
    match obj.get_prototype_of() {
        Some(parent) => parent.has_property(agent, key),
        None => Ok(false),
    }
}

/// OrdinaryGet
pub fn ordinary_get(agent: &mut Agent, obj: &Object, key: &PropertyKey, receiver: &Value) -> Completion<Value> {
    match obj.get_own_property(agent, key)? {
        None => match obj.get_prototype_of() {
            Some(parent) => parent.get(agent, key, receiver),
            None => Ok(Value::Undefined),
        },
        Some(Property::Data { value, .. }) => Ok(value),
        Some(Property::Accessor { get, .. }) => {
            if get.is_undefined() {
                Ok(Value::Undefined)
            } else {
                call(agent, &get, receiver, &[])
            }
        }
    }
}

/// OrdinarySet
pub fn ordinary_set(agent: &mut Agent, obj: &Object, key: &PropertyKey, value: Value, receiver: &Value) -> Completion<bool> {
    let own = obj.get_own_property(agent, key)?;
    ordinary_set_with_own_descriptor(agent, obj, key, value, receiver, own)
}

/// OrdinarySetWithOwnDescriptor
pub fn ordinary_set_with_own_descriptor(
    agent: &mut Agent,
    obj: &Object,
    key: &PropertyKey,
    value: Value,
    receiver: &Value,
    own: Option<Property>,
) -> Completion<bool> {
    let own = match own {
        Some(own) => own,
        None => match obj.get_prototype_of() {
            Some(parent) => return parent.set(agent, key, value, receiver),
            None => Property::data(Value::Undefined, true, true, true),
        },
    };
    match own {
        Property::Data { writable, .. } => {
            if !writable {
                return Ok(false);
            }
            let Value::Object(receiver) = receiver else {
                return Ok(false);
            };
            match receiver.get_own_property(agent, key)? {
                Some(Property::Accessor { .. }) => Ok(false),
                Some(Property::Data { writable: false, .. }) => Ok(false),
                Some(Property::Data { .. }) => {
                    let desc = PropertyDescriptor {
                        value: Some(value),
                        ..Default::default()
                    };
                    receiver.define_own_property(agent, key, desc)
                }
                None => receiver.define_own_property(agent, key, PropertyDescriptor::data(value, true, true, true)),
            }
        }
        Property::Accessor { set, .. } => {
            if set.is_undefined() {
                return Ok(false);
            }
            call(agent, &set, receiver, &[value])?;
            Ok(true)
        }
    }
}

/// OrdinaryDelete
pub fn ordinary_delete(agent: &mut Agent, obj: &Object, key: &PropertyKey) -> Completion<bool> {
    match obj.get_own_property(agent, key)? {
        None => Ok(true),
        Some(property) if property.configurable() => {
            obj.borrow_mut().properties.shift_remove(key);
            Ok(true)
        }
        Some(_) => Ok(false),
    }
}

/// OrdinaryOwnPropertyKeys: array indices ascending, then strings and symbols in creation order.
pub fn ordinary_own_property_keys(obj: &Object) -> Vec<PropertyKey> {
    let data = obj.borrow();
    let mut indices: Vec<(u32, PropertyKey)> = Vec::new();
    let mut strings = Vec::new();
    let mut symbols = Vec::new();
    for key in data.properties.keys() {
        if let Some(index) = key.array_index() {
            indices.push((index, key.clone()));
        } else if key.is_symbol() {
            symbols.push(key.clone());
        } else {
            strings.push(key.clone());
        }
    }
    indices.sort_by_key(|(index, _)| *index);
    indices.into_iter().map(|(_, key)| key).chain(strings).chain(symbols).collect()
}

#[cfg(test)]
mod object_tests {
    use super::*;

    #[test]
    fn test_validate_non_configurable() {
        let obj = Object::ordinary(None);
        let key = PropertyKey::from("x");
        obj.define_raw(key.clone(), Property::data(Value::Number(1.0), false, true, false));
        let current = ordinary_get_own_property(&obj, &key);

        let same = PropertyDescriptor {
            value: Some(Value::Number(1.0)),
            ..Default::default()
        };
        assert!(validate_and_apply_property_descriptor(Some(&obj), &key, true, &same, current.as_ref()));

        let different = PropertyDescriptor {
            value: Some(Value::Number(2.0)),
            ..Default::default()
        };
        assert!(!validate_and_apply_property_descriptor(Some(&obj), &key, true, &different, current.as_ref()));

        let reconfigure = PropertyDescriptor {
            configurable: Some(true),
            ..Default::default()
        };
        assert!(!validate_and_apply_property_descriptor(Some(&obj), &key, true, &reconfigure, current.as_ref()));
    }

    #[test]
    fn test_data_to_accessor_conversion_keeps_flags() {
        let obj = Object::ordinary(None);
        let key = PropertyKey::from("x");
        obj.define_raw(key.clone(), Property::data(Value::Number(1.0), true, false, true));
        let current = ordinary_get_own_property(&obj, &key);
        let desc = PropertyDescriptor {
            get: Some(Value::Undefined),
            ..Default::default()
        };
        assert!(validate_and_apply_property_descriptor(Some(&obj), &key, true, &desc, current.as_ref()));
        match ordinary_get_own_property(&obj, &key) {
            Some(Property::Accessor {
                enumerable, configurable, ..
            }) => {
                assert!(!enumerable);
                assert!(configurable);
            }
            other => panic!("expected accessor, got {other:?}"),
        }
    }

    #[test]
    fn test_own_property_key_order() {
        let obj = Object::ordinary(None);
        let sym = Symbol::new(None);
        obj.define_raw("b", Property::data(Value::Undefined, true, true, true));
        obj.define_raw(PropertyKey::Symbol(sym.clone()), Property::data(Value::Undefined, true, true, true));
        obj.define_raw("10", Property::data(Value::Undefined, true, true, true));
        obj.define_raw("a", Property::data(Value::Undefined, true, true, true));
        obj.define_raw("2", Property::data(Value::Undefined, true, true, true));
        let keys = ordinary_own_property_keys(&obj);
        assert_eq!(
            keys,
            vec![
                PropertyKey::from("2"),
                PropertyKey::from("10"),
                PropertyKey::from("b"),
                PropertyKey::from("a"),
                PropertyKey::Symbol(sym)
            ]
        );
    }

    #[test]
    fn test_prototype_cycle_rejected() {
        let a = Object::ordinary(None);
        let b = Object::ordinary(Some(a.clone()));
        assert!(!a.set_prototype_of(Some(b.clone())));
        assert!(b.set_prototype_of(None));
        a.prevent_extensions();
        assert!(!a.set_prototype_of(Some(b)));
    }
}
