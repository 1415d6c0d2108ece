use super::{Installer, arg};
use crate::core::{
    Agent, Completion, Intrinsic, Object, ObjectKind, Property, Symbol, Value, WellKnownSymbol, throw_type_error, to_string,
};

pub(super) fn initialize(installer: &mut Installer) {
    let object_prototype = installer.get(Intrinsic::ObjectPrototype);
    let prototype = Object::ordinary(Some(object_prototype));
    let constructor = installer.constructor(
        "Symbol",
        0,
        symbol_constructor,
        prototype.clone(),
        Intrinsic::SymbolConstructor,
        Intrinsic::SymbolPrototype,
    );
    for well_known in WellKnownSymbol::ALL {
        let symbol = installer.symbols.get(well_known);
        constructor.define_raw(well_known.name(), Property::data(Value::Symbol(symbol), false, false, false));
    }
    installer.method(&prototype, "toString", 0, symbol_prototype_to_string);
    installer.method(&prototype, "valueOf", 0, symbol_prototype_value_of);
    installer.to_string_tag(&prototype, "Symbol");
}

fn symbol_constructor(agent: &mut Agent, _this: &Value, args: &[Value], new_target: Option<&Object>) -> Completion<Value> {
    if new_target.is_some() {
        return throw_type_error(agent, "Symbol is not a constructor");
    }
    let description = match arg(args, 0) {
        Value::Undefined => None,
        other => Some(to_string(agent, &other)?),
    };
    Ok(Value::Symbol(Symbol::new(description)))
}

/// thisSymbolValue(value)
fn this_symbol_value(agent: &mut Agent, value: &Value) -> Completion<Symbol> {
    match value {
        Value::Symbol(symbol) => Ok(symbol.clone()),
        Value::Object(object) => match &object.borrow().kind {
            ObjectKind::Symbol(symbol) => Ok(symbol.clone()),
            _ => throw_type_error(agent, "Symbol.prototype method called on incompatible receiver"),
        },
        _ => throw_type_error(agent, "Symbol.prototype method called on incompatible receiver"),
    }
}

fn symbol_prototype_to_string(agent: &mut Agent, this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let symbol = this_symbol_value(agent, this)?;
    Ok(Value::from(symbol.descriptive_string()))
}

fn symbol_prototype_value_of(agent: &mut Agent, this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    Ok(Value::Symbol(this_symbol_value(agent, this)?))
}
