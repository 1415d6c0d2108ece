//! Abstract operations: type conversion, testing and comparison, and operations on objects.

use crate::core::{
    Abrupt, Agent, Completion, Intrinsic, Object, ObjectKind, Property, PropertyDescriptor, PropertyKey, Value, WellKnownSymbol,
    exotics::string_create, f64_to_int32, f64_to_uint32, number_to_string, string_to_number,
};
use std::cmp::Ordering;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreferredType {
    Default,
    String,
    Number,
}

// Errors

/// Creates an instance of one of the realm's native error constructors.
pub fn create_error(agent: &Agent, prototype: Intrinsic, message: &str) -> Object {
    let error = Object::new(Some(agent.intrinsic(prototype)), ObjectKind::Error);
    error.define_raw("message", Property::method(Value::from(message)));
    error
}

fn throw<T>(agent: &Agent, prototype: Intrinsic, message: &str) -> Completion<T> {
    log::trace!("throwing {prototype:?}: {message}");
    Err(Abrupt::Throw(Value::Object(create_error(agent, prototype, message))))
}

pub fn throw_type_error<T>(agent: &Agent, message: &str) -> Completion<T> {
    throw(agent, Intrinsic::TypeErrorPrototype, message)
}

pub fn throw_reference_error<T>(agent: &Agent, message: &str) -> Completion<T> {
    throw(agent, Intrinsic::ReferenceErrorPrototype, message)
}

pub fn throw_syntax_error<T>(agent: &Agent, message: &str) -> Completion<T> {
    throw(agent, Intrinsic::SyntaxErrorPrototype, message)
}

pub fn throw_range_error<T>(agent: &Agent, message: &str) -> Completion<T> {
    throw(agent, Intrinsic::RangeErrorPrototype, message)
}

/// Renders a thrown value as `Name: message` without running user code that could throw again.
pub fn describe_thrown_value(agent: &mut Agent, value: &Value) -> String {
    if let Value::Object(object) = value
        && object.is_error()
    {
        let name = get(agent, object, &PropertyKey::from("name")).ok();
        let message = get(agent, object, &PropertyKey::from("message")).ok();
        let name = name.and_then(|v| v.as_str().map(str::to_string)).unwrap_or_else(|| "Error".to_string());
        return match message.as_ref().and_then(Value::as_str) {
            Some(message) if !message.is_empty() => format!("{name}: {message}"),
            _ => name,
        };
    }
    match value {
        Value::Object(_) => to_string(agent, value).map(|s| s.to_string()).unwrap_or_else(|_| format!("{value:?}")),
        other => format!("{other:?}"),
    }
}

// Type conversion

/// ToPrimitive(input, preferredType)
pub fn to_primitive(agent: &mut Agent, input: &Value, preferred: PreferredType) -> Completion<Value> {
    let Value::Object(object) = input else {
        return Ok(input.clone());
    };
    let to_primitive_key = PropertyKey::Symbol(agent.well_known_symbol(WellKnownSymbol::ToPrimitive));
    if let Some(exotic) = get_method(agent, input, &to_primitive_key)? {
        let hint = match preferred {
            PreferredType::Default => "default",
            PreferredType::String => "string",
            PreferredType::Number => "number",
        };
        let result = call(agent, &exotic, input, &[Value::from(hint)])?;
        if result.is_object() {
            return throw_type_error(agent, "Cannot convert object to primitive value");
        }
        return Ok(result);
    }
    let preferred = if preferred == PreferredType::Default {
        PreferredType::Number
    } else {
        preferred
    };
    ordinary_to_primitive(agent, object, preferred)
}

/// OrdinaryToPrimitive(O, hint)
pub fn ordinary_to_primitive(agent: &mut Agent, object: &Object, hint: PreferredType) -> Completion<Value> {
    let names = if hint == PreferredType::String {
        ["toString", "valueOf"]
    } else {
        ["valueOf", "toString"]
    };
    for name in names {
        let method = get(agent, object, &PropertyKey::from(name))?;
        if method.is_callable() {
            let result = call(agent, &method, &Value::Object(object.clone()), &[])?;
            if !result.is_object() {
                return Ok(result);
            }
        }
    }
    throw_type_error(agent, "Cannot convert object to primitive value")
}

/// ToBoolean(argument)
pub fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Boolean(b) => *b,
        Value::Number(n) => !(*n == 0.0 || n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Symbol(_) | Value::Object(_) => true,
    }
}

/// ToNumber(argument)
pub fn to_number(agent: &mut Agent, value: &Value) -> Completion<f64> {
    match value {
        Value::Undefined => Ok(f64::NAN),
        Value::Null => Ok(0.0),
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => Ok(*n),
        Value::String(s) => Ok(string_to_number(s)),
        Value::Symbol(_) => throw_type_error(agent, "Cannot convert a Symbol value to a number"),
        Value::Object(_) => {
            let primitive = to_primitive(agent, value, PreferredType::Number)?;
            to_number(agent, &primitive)
        }
    }
}

/// ToIntegerOrInfinity(argument)
pub fn to_integer_or_infinity(agent: &mut Agent, value: &Value) -> Completion<f64> {
    let number = to_number(agent, value)?;
    if number.is_nan() || number == 0.0 {
        return Ok(0.0);
    }
    Ok(number.trunc())
}

/// ToInt32(argument)
pub fn to_int32(agent: &mut Agent, value: &Value) -> Completion<i32> {
    Ok(f64_to_int32(to_number(agent, value)?))
}

/// ToUint32(argument)
pub fn to_uint32(agent: &mut Agent, value: &Value) -> Completion<u32> {
    Ok(f64_to_uint32(to_number(agent, value)?))
}

/// ToLength(argument)
pub fn to_length(agent: &mut Agent, value: &Value) -> Completion<f64> {
    let len = to_integer_or_infinity(agent, value)?;
    if len <= 0.0 {
        return Ok(0.0);
    }
    Ok(len.min(9_007_199_254_740_991.0))
}

/// ToString(argument)
pub fn to_string(agent: &mut Agent, value: &Value) -> Completion<Rc<str>> {
    match value {
        Value::Undefined => Ok(Rc::from("undefined")),
        Value::Null => Ok(Rc::from("null")),
        Value::Boolean(b) => Ok(Rc::from(if *b { "true" } else { "false" })),
        Value::Number(n) => Ok(Rc::from(number_to_string(*n))),
        Value::String(s) => Ok(s.clone()),
        Value::Symbol(_) => throw_type_error(agent, "Cannot convert a Symbol value to a string"),
        Value::Object(_) => {
            let primitive = to_primitive(agent, value, PreferredType::String)?;
            to_string(agent, &primitive)
        }
    }
}

/// ToObject(argument)
pub fn to_object(agent: &mut Agent, value: &Value) -> Completion<Object> {
    let (prototype, kind) = match value {
        Value::Undefined | Value::Null => {
            return throw_type_error(agent, &format!("Cannot convert {value:?} to object"));
        }
        Value::Object(object) => return Ok(object.clone()),
        Value::String(s) => return Ok(string_create(s.clone(), agent.intrinsic(Intrinsic::StringPrototype))),
        Value::Boolean(b) => (Intrinsic::BooleanPrototype, ObjectKind::Boolean(*b)),
        Value::Number(n) => (Intrinsic::NumberPrototype, ObjectKind::Number(*n)),
        Value::Symbol(sym) => (Intrinsic::SymbolPrototype, ObjectKind::Symbol(sym.clone())),
    };
    Ok(Object::new(Some(agent.intrinsic(prototype)), kind))
}

/// ToPropertyKey(argument)
pub fn to_property_key(agent: &mut Agent, value: &Value) -> Completion<PropertyKey> {
    let key = to_primitive(agent, value, PreferredType::String)?;
    match key {
        Value::Symbol(sym) => Ok(PropertyKey::Symbol(sym)),
        other => Ok(PropertyKey::String(to_string(agent, &other)?)),
    }
}

/// CanonicalNumericIndexString(argument)
pub fn canonical_numeric_index_string(s: &str) -> Option<f64> {
    if s == "-0" {
        return Some(-0.0);
    }
    let n = string_to_number(s);
    (number_to_string(n) == s).then_some(n)
}

/// RequireObjectCoercible(argument)
pub fn require_object_coercible(agent: &mut Agent, value: &Value) -> Completion<()> {
    if value.is_nullish() {
        return throw_type_error(agent, &format!("Cannot destructure '{value:?}' as it is {value:?}."));
    }
    Ok(())
}

/// Number of UTF-16 code units, the `length` of a string value.
pub fn string_length(s: &str) -> usize {
    s.encode_utf16().count()
}

// Testing and comparison

pub fn is_callable(value: &Value) -> bool {
    value.is_callable()
}

pub fn is_constructor(value: &Value) -> bool {
    value.is_constructor()
}

/// SameValue(x, y)
pub fn same_value(x: &Value, y: &Value) -> bool {
    match (x, y) {
        (Value::Number(a), Value::Number(b)) => {
            if a.is_nan() && b.is_nan() {
                return true;
            }
            a == b && a.is_sign_negative() == b.is_sign_negative()
        }
        _ => same_value_non_number(x, y),
    }
}

/// SameValueZero(x, y)
pub fn same_value_zero(x: &Value, y: &Value) -> bool {
    match (x, y) {
        (Value::Number(a), Value::Number(b)) => (a.is_nan() && b.is_nan()) || a == b,
        _ => same_value_non_number(x, y),
    }
}

fn same_value_non_number(x: &Value, y: &Value) -> bool {
    match (x, y) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Symbol(a), Value::Symbol(b)) => a == b,
        (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
        _ => false,
    }
}

/// IsStrictlyEqual(x, y)
pub fn strict_equality_comparison(x: &Value, y: &Value) -> bool {
    match (x, y) {
        (Value::Number(a), Value::Number(b)) => a == b,
        _ => same_value_non_number(x, y),
    }
}

/// IsLooselyEqual(x, y)
pub fn abstract_equality_comparison(agent: &mut Agent, x: &Value, y: &Value) -> Completion<bool> {
    match (x, y) {
        (Value::Number(_), Value::Number(_))
        | (Value::String(_), Value::String(_))
        | (Value::Boolean(_), Value::Boolean(_))
        | (Value::Symbol(_), Value::Symbol(_))
        | (Value::Object(_), Value::Object(_))
        | (Value::Undefined, Value::Undefined)
        | (Value::Null, Value::Null) => Ok(strict_equality_comparison(x, y)),
        (Value::Undefined, Value::Null) | (Value::Null, Value::Undefined) => Ok(true),
        (Value::Number(a), Value::String(s)) => Ok(*a == string_to_number(s)),
        (Value::String(s), Value::Number(b)) => Ok(string_to_number(s) == *b),
        (Value::Boolean(b), _) => {
            let x = Value::Number(if *b { 1.0 } else { 0.0 });
            abstract_equality_comparison(agent, &x, y)
        }
        (_, Value::Boolean(b)) => {
            let y = Value::Number(if *b { 1.0 } else { 0.0 });
            abstract_equality_comparison(agent, x, &y)
        }
        (Value::Number(_) | Value::String(_) | Value::Symbol(_), Value::Object(_)) => {
            let y = to_primitive(agent, y, PreferredType::Default)?;
            abstract_equality_comparison(agent, x, &y)
        }
        (Value::Object(_), Value::Number(_) | Value::String(_) | Value::Symbol(_)) => {
            let x = to_primitive(agent, x, PreferredType::Default)?;
            abstract_equality_comparison(agent, &x, y)
        }
        _ => Ok(false),
    }
}

/// IsLessThan(x, y, LeftFirst). `None` stands for `undefined` (a NaN operand).
pub fn abstract_relational_comparison(agent: &mut Agent, x: &Value, y: &Value, left_first: bool) -> Completion<Option<bool>> {
    let (px, py) = if left_first {
        let px = to_primitive(agent, x, PreferredType::Number)?;
        let py = to_primitive(agent, y, PreferredType::Number)?;
        (px, py)
    } else {
        let py = to_primitive(agent, y, PreferredType::Number)?;
        let px = to_primitive(agent, x, PreferredType::Number)?;
        (px, py)
    };
    if let (Value::String(a), Value::String(b)) = (&px, &py) {
        return Ok(Some(a.encode_utf16().cmp(b.encode_utf16()) == Ordering::Less));
    }
    let nx = to_number(agent, &px)?;
    let ny = to_number(agent, &py)?;
    if nx.is_nan() || ny.is_nan() {
        return Ok(None);
    }
    Ok(Some(nx < ny))
}

// Operations on objects

/// Get(O, P)
pub fn get(agent: &mut Agent, object: &Object, key: &PropertyKey) -> Completion<Value> {
    object.get(agent, key, &Value::Object(object.clone()))
}

/// GetV(V, P)
pub fn get_v(agent: &mut Agent, value: &Value, key: &PropertyKey) -> Completion<Value> {
    let object = to_object(agent, value)?;
    object.get(agent, key, value)
}

/// Set(O, P, V, Throw)
pub fn set(agent: &mut Agent, object: &Object, key: &PropertyKey, value: Value, throw: bool) -> Completion<bool> {
    let success = object.set(agent, key, value, &Value::Object(object.clone()))?;
    if !success && throw {
        return throw_type_error(agent, &format!("Cannot assign to read only property '{key}' of object"));
    }
    Ok(success)
}

/// CreateDataProperty(O, P, V)
pub fn create_data_property(agent: &mut Agent, object: &Object, key: &PropertyKey, value: Value) -> Completion<bool> {
    object.define_own_property(agent, key, PropertyDescriptor::data(value, true, true, true))
}

/// CreateDataPropertyOrThrow(O, P, V)
pub fn create_data_property_or_throw(agent: &mut Agent, object: &Object, key: &PropertyKey, value: Value) -> Completion<()> {
    if !create_data_property(agent, object, key, value)? {
        return throw_type_error(agent, &format!("Cannot define property {key}"));
    }
    Ok(())
}

/// DefinePropertyOrThrow(O, P, desc)
pub fn define_property_or_throw(agent: &mut Agent, object: &Object, key: &PropertyKey, desc: PropertyDescriptor) -> Completion<()> {
    if !object.define_own_property(agent, key, desc)? {
        return throw_type_error(agent, &format!("Cannot redefine property: {key}"));
    }
    Ok(())
}

/// DeletePropertyOrThrow(O, P)
pub fn delete_property_or_throw(agent: &mut Agent, object: &Object, key: &PropertyKey) -> Completion<()> {
    if !object.delete(agent, key)? {
        return throw_type_error(agent, &format!("Cannot delete property '{key}'"));
    }
    Ok(())
}

/// GetMethod(V, P). `None` when the property is undefined or null.
pub fn get_method(agent: &mut Agent, value: &Value, key: &PropertyKey) -> Completion<Option<Value>> {
    let func = get_v(agent, value, key)?;
    if func.is_nullish() {
        return Ok(None);
    }
    if !func.is_callable() {
        return throw_type_error(agent, &format!("{key} is not a function"));
    }
    Ok(Some(func))
}

/// HasProperty(O, P)
pub fn has_property(agent: &mut Agent, object: &Object, key: &PropertyKey) -> Completion<bool> {
    object.has_property(agent, key)
}

/// HasOwnProperty(O, P)
pub fn has_own_property(agent: &mut Agent, object: &Object, key: &PropertyKey) -> Completion<bool> {
    Ok(object.get_own_property(agent, key)?.is_some())
}

/// Call(F, V, argumentsList)
pub fn call(agent: &mut Agent, func: &Value, this: &Value, args: &[Value]) -> Completion<Value> {
    match func {
        Value::Object(object) if object.is_callable() => object.call(agent, this, args),
        other => throw_type_error(agent, &format!("{other:?} is not a function")),
    }
}

/// Construct(F, argumentsList, newTarget)
pub fn construct(agent: &mut Agent, func: &Object, args: &[Value], new_target: Option<&Object>) -> Completion<Object> {
    let new_target = new_target.unwrap_or(func);
    match func.construct(agent, args, new_target)? {
        Value::Object(object) => Ok(object),
        _ => throw_type_error(agent, "constructor did not return an object"),
    }
}

/// LengthOfArrayLike(obj)
pub fn length_of_array_like(agent: &mut Agent, object: &Object) -> Completion<f64> {
    let length = get(agent, object, &PropertyKey::from("length"))?;
    to_length(agent, &length)
}

/// CreateListFromArrayLike(obj)
pub fn create_list_from_array_like(agent: &mut Agent, value: &Value) -> Completion<Vec<Value>> {
    let Value::Object(object) = value else {
        return throw_type_error(agent, "CreateListFromArrayLike called on non-object");
    };
    let length = length_of_array_like(agent, object)? as usize;
    let mut list = Vec::with_capacity(length.min(1024));
    for index in 0..length {
        list.push(get(agent, object, &PropertyKey::from_index(index))?);
    }
    Ok(list)
}

/// GetPrototypeFromConstructor(constructor, intrinsicDefaultProto)
pub fn get_prototype_from_constructor(agent: &mut Agent, constructor: &Object, default: Intrinsic) -> Completion<Object> {
    match get(agent, constructor, &PropertyKey::from("prototype"))? {
        Value::Object(prototype) => Ok(prototype),
        _ => Ok(agent.intrinsic(default)),
    }
}

/// OrdinaryCreateFromConstructor(constructor, intrinsicDefaultProto)
pub fn ordinary_create_from_constructor(agent: &mut Agent, constructor: &Object, default: Intrinsic, kind: ObjectKind) -> Completion<Object> {
    let prototype = get_prototype_from_constructor(agent, constructor, default)?;
    Ok(Object::new(Some(prototype), kind))
}

/// OrdinaryHasInstance(C, O)
pub fn ordinary_has_instance(agent: &mut Agent, constructor: &Value, value: &Value) -> Completion<bool> {
    let Value::Object(c) = constructor else {
        return Ok(false);
    };
    if !c.is_callable() {
        return Ok(false);
    }
    let Value::Object(object) = value else {
        return Ok(false);
    };
    let prototype = get(agent, c, &PropertyKey::from("prototype"))?;
    let Value::Object(prototype) = prototype else {
        return throw_type_error(agent, "Function has non-object prototype in instanceof check");
    };
    let mut current = object.get_prototype_of();
    while let Some(p) = current {
        if p.ptr_eq(&prototype) {
            return Ok(true);
        }
        current = p.get_prototype_of();
    }
    Ok(false)
}

/// InstanceofOperator(V, target)
pub fn instanceof_operator(agent: &mut Agent, value: &Value, target: &Value) -> Completion<bool> {
    if !target.is_object() {
        return throw_type_error(agent, "Right-hand side of 'instanceof' is not an object");
    }
    let has_instance = PropertyKey::Symbol(agent.well_known_symbol(WellKnownSymbol::HasInstance));
    if let Some(handler) = get_method(agent, target, &has_instance)? {
        let result = call(agent, &handler, target, std::slice::from_ref(value))?;
        return Ok(to_boolean(&result));
    }
    if !target.is_callable() {
        return throw_type_error(agent, "Right-hand side of 'instanceof' is not callable");
    }
    ordinary_has_instance(agent, target, value)
}

/// CopyDataProperties(target, source, excludedItems)
pub fn copy_data_properties(agent: &mut Agent, target: &Object, source: &Value, excluded: &[PropertyKey]) -> Completion<()> {
    if source.is_nullish() {
        return Ok(());
    }
    let from = to_object(agent, source)?;
    for key in from.own_property_keys(agent)? {
        if excluded.contains(&key) {
            continue;
        }
        if let Some(property) = from.get_own_property(agent, &key)?
            && property.enumerable()
        {
            let value = get(agent, &from, &key)?;
            create_data_property_or_throw(agent, target, &key, value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod operations_tests {
    use super::*;
    use crate::options::AgentOptions;

    #[test]
    fn test_same_value_variants() {
        assert!(same_value(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
        assert!(!same_value(&Value::Number(0.0), &Value::Number(-0.0)));
        assert!(same_value_zero(&Value::Number(0.0), &Value::Number(-0.0)));
        assert!(!strict_equality_comparison(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
        assert!(strict_equality_comparison(&Value::Number(0.0), &Value::Number(-0.0)));
    }

    #[test]
    fn test_loose_equality() {
        let mut agent = Agent::new(AgentOptions::default());
        assert!(abstract_equality_comparison(&mut agent, &Value::Null, &Value::Undefined).unwrap());
        assert!(abstract_equality_comparison(&mut agent, &Value::from("1"), &Value::Number(1.0)).unwrap());
        assert!(abstract_equality_comparison(&mut agent, &Value::Boolean(true), &Value::from("1")).unwrap());
        assert!(!abstract_equality_comparison(&mut agent, &Value::Null, &Value::Number(0.0)).unwrap());
    }

    #[test]
    fn test_relational_comparison_strings_and_nan() {
        let mut agent = Agent::new(AgentOptions::default());
        let less = abstract_relational_comparison(&mut agent, &Value::from("a"), &Value::from("b"), true).unwrap();
        assert_eq!(less, Some(true));
        let nan = abstract_relational_comparison(&mut agent, &Value::Number(f64::NAN), &Value::Number(1.0), true).unwrap();
        assert_eq!(nan, None);
    }

    #[test]
    fn test_to_property_key_and_canonical_index() {
        let mut agent = Agent::new(AgentOptions::default());
        let key = to_property_key(&mut agent, &Value::Number(1.5)).unwrap();
        assert_eq!(key, PropertyKey::from("1.5"));
        assert_eq!(canonical_numeric_index_string("10"), Some(10.0));
        assert_eq!(canonical_numeric_index_string("010"), None);
    }

    #[test]
    fn test_to_object_rejects_nullish() {
        let mut agent = Agent::new(AgentOptions::default());
        assert!(to_object(&mut agent, &Value::Undefined).is_err());
        let wrapper = to_object(&mut agent, &Value::from("ab")).unwrap();
        let length = get(&mut agent, &wrapper, &PropertyKey::from("length")).unwrap();
        assert_eq!(length, Value::Number(2.0));
    }
}
