//! Property names and binding/assignment patterns.

use super::{Context, Cx, Expression, NodeInfo, check_binding_identifier, resolve_binding_in};
use crate::JSError;
use crate::core::{
    Agent, Completion, Environment, Evaluated, Intrinsic, IteratorRecord, Object, PropertyKey, Reference, Value, copy_data_properties,
    create_data_property_or_throw, exotics::array_create, get_iterator, get_v, iterator_close, iterator_step, iterator_step_value,
    require_object_coercible, throw_syntax_error, to_property_key,
};
use crate::raise_syntax_error;
use crate::syntax;
use std::rc::Rc;

/// A property name in an object literal, class body or object pattern.
pub enum PropertyName {
    Literal(PropertyKey),
    Computed(Box<Expression>),
}

impl PropertyName {
    pub(crate) fn wrap(cx: &mut Cx, name: &syntax::PropertyName) -> Result<PropertyName, JSError> {
        Ok(match name {
            syntax::PropertyName::Identifier(s) | syntax::PropertyName::String(s) => PropertyName::Literal(PropertyKey::from(s.as_str())),
            syntax::PropertyName::Number(n) => PropertyName::Literal(PropertyKey::from_number(*n)),
            syntax::PropertyName::Computed(expr) => PropertyName::Computed(Box::new(Expression::wrap(cx, expr)?)),
        })
    }

    /// PropName: the key when it is known statically.
    pub fn literal(&self) -> Option<&PropertyKey> {
        match self {
            PropertyName::Literal(key) => Some(key),
            PropertyName::Computed(_) => None,
        }
    }

    pub fn evaluate(&self, agent: &mut Agent) -> Completion<PropertyKey> {
        match self {
            PropertyName::Literal(key) => Ok(key.clone()),
            PropertyName::Computed(expr) => {
                let value = expr.evaluate_value(agent)?;
                to_property_key(agent, &value)
            }
        }
    }
}

pub struct BindingIdentifier {
    pub info: NodeInfo,
    pub name: Rc<str>,
    pub strict: bool,
}

/// A binding pattern in declarations and parameters, or an assignment pattern.
pub enum Pattern {
    Identifier(BindingIdentifier),
    Array(ArrayPattern),
    Object(ObjectPattern),
    /// A member or super-property target; assignment patterns only.
    Expression(Box<Expression>),
}

pub struct PatternElement {
    pub target: Pattern,
    pub default: Option<Expression>,
}

pub struct ArrayPattern {
    pub info: NodeInfo,
    /// `None` is an elision.
    pub elements: Vec<Option<PatternElement>>,
    pub rest: Option<Box<Pattern>>,
}

pub struct PatternProperty {
    pub key: PropertyName,
    pub value: PatternElement,
}

pub struct ObjectPattern {
    pub info: NodeInfo,
    pub properties: Vec<PatternProperty>,
    pub rest: Option<Box<Pattern>>,
}

impl PatternElement {
    fn wrap(cx: &mut Cx, element: &syntax::PatternElement) -> Result<PatternElement, JSError> {
        Ok(PatternElement {
            target: Pattern::wrap(cx, &element.target)?,
            default: element.default.as_ref().map(|default| Expression::wrap(cx, default)).transpose()?,
        })
    }

    /// Binds one element. The target reference is resolved before `fetch` runs.
    pub(crate) fn bind_with(
        &self,
        agent: &mut Agent,
        env: Option<&Environment>,
        fetch: impl FnOnce(&mut Agent) -> Completion<Value>,
    ) -> Completion<()> {
        let reference = if self.target.is_destructuring() {
            None
        } else {
            Some(self.target.reference(agent, env)?)
        };
        let mut value = fetch(agent)?;
        if value.is_undefined()
            && let Some(default) = &self.default
        {
            value = match &self.target {
                Pattern::Identifier(identifier) => default.evaluate_named(agent, &PropertyKey::from(&identifier.name))?,
                _ => default.evaluate_value(agent)?,
            };
        }
        match reference {
            Some(reference) => store(agent, &reference, value, env),
            None => self.target.bind(agent, value, env),
        }
    }
}

/// InitializeReferencedBinding when an environment is given, PutValue otherwise.
fn store(agent: &mut Agent, reference: &Reference, value: Value, env: Option<&Environment>) -> Completion<()> {
    match env {
        Some(_) => reference.initialize_referenced_binding(agent, value),
        None => reference.put_value(agent, value),
    }
}

impl Pattern {
    pub(crate) fn wrap(cx: &mut Cx, pattern: &syntax::Pattern) -> Result<Pattern, JSError> {
        Ok(match pattern {
            syntax::Pattern::Identifier(name, span) => {
                check_binding_identifier(cx, name)?;
                if name == "arguments" {
                    if cx.flags.contains(Context::IN_CLASS_FIELD) {
                        return Err(raise_syntax_error!("'arguments' is not allowed in class field initializer"));
                    }
                    cx.mark_arguments();
                }
                Pattern::Identifier(cx.node(*span, |cx, info| {
                    Ok(BindingIdentifier {
                        info,
                        name: Rc::from(name.as_str()),
                        strict: cx.strict(),
                    })
                })?)
            }
            syntax::Pattern::Array { elements, rest, span } => Pattern::Array(cx.node(*span, |cx, info| {
                Ok(ArrayPattern {
                    info,
                    elements: elements
                        .iter()
                        .map(|element| element.as_ref().map(|element| PatternElement::wrap(cx, element)).transpose())
                        .collect::<Result<_, _>>()?,
                    rest: rest.as_ref().map(|rest| Pattern::wrap(cx, rest).map(Box::new)).transpose()?,
                })
            })?),
            syntax::Pattern::Object { properties, rest, span } => Pattern::Object(cx.node(*span, |cx, info| {
                let mut wrapped = Vec::with_capacity(properties.len());
                for property in properties {
                    wrapped.push(PatternProperty {
                        key: PropertyName::wrap(cx, &property.key)?,
                        value: PatternElement::wrap(cx, &property.value)?,
                    });
                }
                Ok(ObjectPattern {
                    info,
                    properties: wrapped,
                    rest: rest.as_ref().map(|rest| Pattern::wrap(cx, rest).map(Box::new)).transpose()?,
                })
            })?),
            syntax::Pattern::Expr(expr) => Pattern::Expression(Box::new(Expression::wrap(cx, expr)?)),
        })
    }

    pub fn is_destructuring(&self) -> bool {
        matches!(self, Pattern::Array(_) | Pattern::Object(_))
    }

    /// BoundNames
    pub fn bound_names(&self, out: &mut Vec<Rc<str>>) {
        match self {
            Pattern::Identifier(identifier) => out.push(identifier.name.clone()),
            Pattern::Array(array) => {
                for element in array.elements.iter().flatten() {
                    element.target.bound_names(out);
                }
                if let Some(rest) = &array.rest {
                    rest.bound_names(out);
                }
            }
            Pattern::Object(object) => {
                for property in &object.properties {
                    property.value.target.bound_names(out);
                }
                if let Some(rest) = &object.rest {
                    rest.bound_names(out);
                }
            }
            Pattern::Expression(_) => {}
        }
    }

    /// ContainsExpression: defaults or computed keys anywhere in the pattern.
    pub fn contains_expression(&self) -> bool {
        match self {
            Pattern::Identifier(_) | Pattern::Expression(_) => false,
            Pattern::Array(array) => {
                array
                    .elements
                    .iter()
                    .flatten()
                    .any(|element| element.default.is_some() || element.target.contains_expression())
                    || array.rest.as_ref().is_some_and(|rest| rest.contains_expression())
            }
            Pattern::Object(object) => {
                object.properties.iter().any(|property| {
                    matches!(property.key, PropertyName::Computed(_))
                        || property.value.default.is_some()
                        || property.value.target.contains_expression()
                }) || object.rest.as_ref().is_some_and(|rest| rest.contains_expression())
            }
        }
    }

    /// The reference a simple target denotes.
    pub(crate) fn reference(&self, agent: &mut Agent, env: Option<&Environment>) -> Completion<Reference> {
        match self {
            Pattern::Identifier(identifier) => resolve_binding_in(agent, &identifier.name, env, identifier.strict),
            Pattern::Expression(expr) => match expr.evaluate(agent)? {
                Evaluated::Reference(reference) => Ok(reference),
                Evaluated::Value(_) => throw_syntax_error(agent, "Invalid left-hand side in assignment"),
            },
            Pattern::Array(_) | Pattern::Object(_) => throw_syntax_error(agent, "Invalid destructuring assignment target"),
        }
    }

    /// BindingInitialization(value, env) when `env` is given; DestructuringAssignmentEvaluation
    /// (or var binding through PutValue) otherwise.
    pub fn bind(&self, agent: &mut Agent, value: Value, env: Option<&Environment>) -> Completion<()> {
        match self {
            Pattern::Identifier(_) | Pattern::Expression(_) => {
                let reference = self.reference(agent, env)?;
                store(agent, &reference, value, env)
            }
            Pattern::Array(array) => {
                let mut record = get_iterator(agent, &value)?;
                let result = array.bind_elements(agent, &mut record, env);
                if record.done {
                    return result;
                }
                iterator_close(agent, &record, result)
            }
            Pattern::Object(object) => object.bind(agent, value, env),
        }
    }
}

fn next_or_undefined(agent: &mut Agent, record: &mut IteratorRecord) -> Completion<Value> {
    if record.done {
        return Ok(Value::Undefined);
    }
    Ok(iterator_step_value(agent, record)?.unwrap_or_default())
}

impl ArrayPattern {
    /// IteratorBindingInitialization / IteratorDestructuringAssignmentEvaluation
    fn bind_elements(&self, agent: &mut Agent, record: &mut IteratorRecord, env: Option<&Environment>) -> Completion<()> {
        for element in &self.elements {
            match element {
                None => {
                    if !record.done {
                        iterator_step(agent, record)?;
                    }
                }
                Some(element) => element.bind_with(agent, env, |agent| next_or_undefined(agent, record))?,
            }
        }
        let Some(rest) = &self.rest else {
            return Ok(());
        };
        let reference = if rest.is_destructuring() {
            None
        } else {
            Some(rest.reference(agent, env)?)
        };
        let array = array_create(agent, 0.0, None)?;
        let mut index = 0usize;
        while !record.done {
            if let Some(value) = iterator_step_value(agent, record)? {
                create_data_property_or_throw(agent, &array, &PropertyKey::from_index(index), value)?;
                index += 1;
            }
        }
        match reference {
            Some(reference) => store(agent, &reference, Value::Object(array), env),
            None => rest.bind(agent, Value::Object(array), env),
        }
    }
}

impl ObjectPattern {
    fn bind(&self, agent: &mut Agent, value: Value, env: Option<&Environment>) -> Completion<()> {
        require_object_coercible(agent, &value)?;
        let mut excluded = Vec::with_capacity(self.properties.len());
        for property in &self.properties {
            let key = property.key.evaluate(agent)?;
            property.value.bind_with(agent, env, |agent| get_v(agent, &value, &key))?;
            excluded.push(key);
        }
        let Some(rest) = &self.rest else {
            return Ok(());
        };
        let reference = rest.reference(agent, env)?;
        let rest_object = Object::ordinary(Some(agent.intrinsic(Intrinsic::ObjectPrototype)));
        copy_data_properties(agent, &rest_object, &value, &excluded)?;
        store(agent, &reference, Value::Object(rest_object), env)
    }
}
