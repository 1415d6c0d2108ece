//! Expression nodes. `evaluate` yields an [`Evaluated`] (value or reference);
//! `evaluate_value` applies GetValue.

use super::{ArrowFunction, ClassExpression, Context, Cx, FunctionExpression, MethodDefinition, NodeInfo, Pattern, PropertyName, log_evaluate};
use crate::JSError;
use crate::core::{
    Agent, Completion, Environment, Evaluated, Intrinsic, Object, PreferredType, PropertyKey, Reference, Value, abstract_equality_comparison,
    abstract_relational_comparison, call, construct, copy_data_properties, create_data_property_or_throw, exotics::array_create,
    get_iterator, has_property, initialize_instance_elements, instanceof_operator, iterable_to_list, iterator_step_value, set,
    strict_equality_comparison, throw_syntax_error, throw_type_error, to_boolean, to_int32, to_number, to_primitive, to_property_key,
    to_string, to_uint32,
};
use crate::raise_syntax_error;
use crate::syntax::{self, AssignOp, BinaryOp, LogicalOp, UnaryOp, UpdateOp};
use std::rc::Rc;

pub enum Expression {
    Literal(Literal),
    Template(TemplateLiteral),
    Identifier(IdentifierReference),
    This(ThisExpression),
    Array(ArrayLiteral),
    Object(ObjectLiteral),
    Function(FunctionExpression),
    Arrow(ArrowFunction),
    Class(Box<ClassExpression>),
    Member(MemberExpression),
    SuperProperty(SuperProperty),
    SuperCall(SuperCall),
    NewTarget(NewTarget),
    Call(CallExpression),
    New(NewExpression),
    Unary(UnaryExpression),
    Update(UpdateExpression),
    Binary(BinaryExpression),
    Logical(LogicalExpression),
    Conditional(ConditionalExpression),
    Assignment(AssignmentExpression),
    Sequence(SequenceExpression),
}

/// An element of an argument list or array literal.
pub enum ListElement {
    Plain(Expression),
    Spread(Expression),
}

impl ListElement {
    pub(crate) fn wrap(cx: &mut Cx, element: &syntax::ArrayElement) -> Result<ListElement, JSError> {
        Ok(match element {
            syntax::ArrayElement::Expr(expr) => ListElement::Plain(Expression::wrap(cx, expr)?),
            syntax::ArrayElement::Spread(expr) => ListElement::Spread(Expression::wrap(cx, expr)?),
        })
    }

    fn wrap_all(cx: &mut Cx, elements: &[syntax::ArrayElement]) -> Result<Vec<ListElement>, JSError> {
        elements.iter().map(|element| ListElement::wrap(cx, element)).collect()
    }
}

/// ArgumentListEvaluation
pub(crate) fn argument_list_evaluation(agent: &mut Agent, arguments: &[ListElement]) -> Completion<Vec<Value>> {
    let mut values = Vec::with_capacity(arguments.len());
    for argument in arguments {
        match argument {
            ListElement::Plain(expr) => values.push(expr.evaluate_value(agent)?),
            ListElement::Spread(expr) => {
                let spread = expr.evaluate_value(agent)?;
                values.extend(iterable_to_list(agent, &spread)?);
            }
        }
    }
    Ok(values)
}

impl Expression {
    pub(crate) fn wrap(cx: &mut Cx, expr: &syntax::Expr) -> Result<Expression, JSError> {
        use syntax::ExprKind as K;
        let span = expr.span;
        let wrapped = match &expr.kind {
            K::Paren(inner) => return Expression::wrap(cx, inner),
            K::Number(n) => Expression::Literal(Literal::wrap(cx, span, Value::Number(*n))?),
            K::String(s) => Expression::Literal(Literal::wrap(cx, span, Value::from(s.as_str()))?),
            K::Boolean(b) => Expression::Literal(Literal::wrap(cx, span, Value::Boolean(*b))?),
            K::Null => Expression::Literal(Literal::wrap(cx, span, Value::Null)?),
            K::Template { quasis, expressions } => Expression::Template(cx.node(span, |cx, info| {
                Ok(TemplateLiteral {
                    info,
                    quasis: quasis.iter().map(|q| Rc::from(q.as_str())).collect(),
                    expressions: expressions.iter().map(|e| Expression::wrap(cx, e)).collect::<Result<_, _>>()?,
                })
            })?),
            K::Identifier(name) => Expression::Identifier(IdentifierReference::wrap(cx, span, name)?),
            K::This => Expression::This(cx.node(span, |_, info| Ok(ThisExpression { info }))?),
            K::Array(elements) => Expression::Array(cx.node(span, |cx, info| {
                let elements = elements
                    .iter()
                    .map(|element| element.as_ref().map(|element| ListElement::wrap(cx, element)).transpose())
                    .collect::<Result<_, _>>()?;
                Ok(ArrayLiteral { info, elements })
            })?),
            K::Object(properties) => Expression::Object(ObjectLiteral::wrap(cx, span, properties)?),
            K::Function(function) => Expression::Function(FunctionExpression::wrap(cx, function)?),
            K::Arrow(function) => Expression::Arrow(ArrowFunction::wrap(cx, function)?),
            K::Class(class) => Expression::Class(Box::new(ClassExpression::wrap(cx, class)?)),
            K::Member { object, property } => Expression::Member(cx.node(span, |cx, info| {
                Ok(MemberExpression {
                    info,
                    object: Box::new(Expression::wrap(cx, object)?),
                    property: MemberKey::wrap(cx, property)?,
                    strict: cx.strict(),
                })
            })?),
            K::SuperMember(property) => {
                if !cx.flags.contains(Context::SUPER_PROPERTY) {
                    return Err(raise_syntax_error!("'super' keyword unexpected here"));
                }
                Expression::SuperProperty(cx.node(span, |cx, info| {
                    Ok(SuperProperty {
                        info,
                        property: MemberKey::wrap(cx, property)?,
                        strict: cx.strict(),
                    })
                })?)
            }
            K::SuperCall(arguments) => {
                if !cx.flags.contains(Context::SUPER_CALL) {
                    return Err(raise_syntax_error!("'super' keyword unexpected here"));
                }
                Expression::SuperCall(cx.node(span, |cx, info| {
                    Ok(SuperCall {
                        info,
                        arguments: ListElement::wrap_all(cx, arguments)?,
                    })
                })?)
            }
            K::NewTarget => {
                if !cx.flags.contains(Context::NEW_TARGET) {
                    return Err(raise_syntax_error!("new.target expression is not allowed here"));
                }
                Expression::NewTarget(cx.node(span, |_, info| Ok(NewTarget { info }))?)
            }
            K::Call { callee, arguments } => Expression::Call(cx.node(span, |cx, info| {
                Ok(CallExpression {
                    info,
                    callee_text: cx.text(callee.span),
                    callee: Box::new(Expression::wrap(cx, callee)?),
                    arguments: ListElement::wrap_all(cx, arguments)?,
                })
            })?),
            K::New { callee, arguments } => Expression::New(cx.node(span, |cx, info| {
                Ok(NewExpression {
                    info,
                    callee_text: cx.text(callee.span),
                    callee: Box::new(Expression::wrap(cx, callee)?),
                    arguments: ListElement::wrap_all(cx, arguments)?,
                })
            })?),
            K::Unary(op, argument) => {
                if *op == UnaryOp::Delete && cx.strict() && is_identifier(argument) {
                    return Err(raise_syntax_error!("Delete of an unqualified identifier in strict mode."));
                }
                Expression::Unary(cx.node(span, |cx, info| {
                    Ok(UnaryExpression {
                        info,
                        op: *op,
                        argument: Box::new(Expression::wrap(cx, argument)?),
                    })
                })?)
            }
            K::Update { op, prefix, argument } => {
                if let syntax::ExprKind::Identifier(name) = &unparenthesized(argument).kind {
                    super::check_binding_identifier(cx, name)?;
                }
                Expression::Update(cx.node(span, |cx, info| {
                    Ok(UpdateExpression {
                        info,
                        op: *op,
                        prefix: *prefix,
                        argument: Box::new(Expression::wrap(cx, argument)?),
                    })
                })?)
            }
            K::Binary(op, left, right) => Expression::Binary(cx.node(span, |cx, info| {
                Ok(BinaryExpression {
                    info,
                    op: *op,
                    left: Box::new(Expression::wrap(cx, left)?),
                    right: Box::new(Expression::wrap(cx, right)?),
                })
            })?),
            K::Logical(op, left, right) => Expression::Logical(cx.node(span, |cx, info| {
                Ok(LogicalExpression {
                    info,
                    op: *op,
                    left: Box::new(Expression::wrap(cx, left)?),
                    right: Box::new(Expression::wrap(cx, right)?),
                })
            })?),
            K::Conditional(test, consequent, alternate) => Expression::Conditional(cx.node(span, |cx, info| {
                Ok(ConditionalExpression {
                    info,
                    test: Box::new(Expression::wrap(cx, test)?),
                    consequent: Box::new(Expression::wrap(cx, consequent)?),
                    alternate: Box::new(Expression::wrap(cx, alternate)?),
                })
            })?),
            K::Assign { op, target, value } => Expression::Assignment(cx.node(span, |cx, info| {
                Ok(AssignmentExpression {
                    info,
                    op: *op,
                    target: Pattern::wrap(cx, target)?,
                    value: Box::new(Expression::wrap(cx, value)?),
                })
            })?),
            K::Sequence(expressions) => Expression::Sequence(cx.node(span, |cx, info| {
                Ok(SequenceExpression {
                    info,
                    expressions: expressions.iter().map(|e| Expression::wrap(cx, e)).collect::<Result<_, _>>()?,
                })
            })?),
        };
        Ok(wrapped)
    }

    pub fn info(&self) -> &NodeInfo {
        match self {
            Expression::Literal(n) => &n.info,
            Expression::Template(n) => &n.info,
            Expression::Identifier(n) => &n.info,
            Expression::This(n) => &n.info,
            Expression::Array(n) => &n.info,
            Expression::Object(n) => &n.info,
            Expression::Function(n) => &n.info,
            Expression::Arrow(n) => &n.info,
            Expression::Class(n) => &n.info,
            Expression::Member(n) => &n.info,
            Expression::SuperProperty(n) => &n.info,
            Expression::SuperCall(n) => &n.info,
            Expression::NewTarget(n) => &n.info,
            Expression::Call(n) => &n.info,
            Expression::New(n) => &n.info,
            Expression::Unary(n) => &n.info,
            Expression::Update(n) => &n.info,
            Expression::Binary(n) => &n.info,
            Expression::Logical(n) => &n.info,
            Expression::Conditional(n) => &n.info,
            Expression::Assignment(n) => &n.info,
            Expression::Sequence(n) => &n.info,
        }
    }

    /// IsAnonymousFunctionDefinition
    pub fn is_anonymous_function_definition(&self) -> bool {
        match self {
            Expression::Function(function) => function.name.is_none(),
            Expression::Arrow(_) => true,
            Expression::Class(class) => class.name.is_none(),
            _ => false,
        }
    }

    /// Evaluation. Identifier, member and super-property expressions produce references.
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Evaluated> {
        match self {
            Expression::Identifier(node) => node.evaluate(agent).map(Evaluated::from),
            Expression::Member(node) => node.evaluate(agent).map(Evaluated::from),
            Expression::SuperProperty(node) => node.evaluate(agent).map(Evaluated::from),
            _ => self.evaluate_value(agent).map(Evaluated::from),
        }
    }

    /// Evaluation followed by GetValue.
    pub fn evaluate_value(&self, agent: &mut Agent) -> Completion<Value> {
        match self {
            Expression::Identifier(_) | Expression::Member(_) | Expression::SuperProperty(_) => self.evaluate(agent)?.get_value(agent),
            Expression::Literal(node) => node.evaluate(agent),
            Expression::Template(node) => node.evaluate(agent),
            Expression::This(node) => node.evaluate(agent),
            Expression::Array(node) => node.evaluate(agent),
            Expression::Object(node) => node.evaluate(agent),
            Expression::Function(node) => node.evaluate(agent),
            Expression::Arrow(node) => node.evaluate(agent),
            Expression::Class(node) => node.evaluate(agent),
            Expression::SuperCall(node) => node.evaluate(agent),
            Expression::NewTarget(node) => node.evaluate(agent),
            Expression::Call(node) => node.evaluate(agent),
            Expression::New(node) => node.evaluate(agent),
            Expression::Unary(node) => node.evaluate(agent),
            Expression::Update(node) => node.evaluate(agent),
            Expression::Binary(node) => node.evaluate(agent),
            Expression::Logical(node) => node.evaluate(agent),
            Expression::Conditional(node) => node.evaluate(agent),
            Expression::Assignment(node) => node.evaluate(agent),
            Expression::Sequence(node) => node.evaluate(agent),
        }
    }

    /// NamedEvaluation when this is an anonymous function definition, plain evaluation otherwise.
    pub fn evaluate_named(&self, agent: &mut Agent, name: &PropertyKey) -> Completion<Value> {
        match self {
            Expression::Function(function) if function.name.is_none() => function.instantiate(agent, Some(name)).map(Value::Object),
            Expression::Arrow(arrow) => arrow.instantiate(agent, Some(name)).map(Value::Object),
            Expression::Class(class) if class.name.is_none() => class.evaluate_named(agent, name).map(Value::Object),
            _ => self.evaluate_value(agent),
        }
    }
}

fn unparenthesized(expr: &syntax::Expr) -> &syntax::Expr {
    match &expr.kind {
        syntax::ExprKind::Paren(inner) => unparenthesized(inner),
        _ => expr,
    }
}

fn is_identifier(expr: &syntax::Expr) -> bool {
    matches!(unparenthesized(expr).kind, syntax::ExprKind::Identifier(_))
}

pub struct Literal {
    pub info: NodeInfo,
    pub value: Value,
}

impl Literal {
    fn wrap(cx: &mut Cx, span: syntax::Span, value: Value) -> Result<Literal, JSError> {
        cx.node(span, |_, info| Ok(Literal { info, value }))
    }

    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Value> {
        log_evaluate!("Literal", self.info, agent);
        Ok(self.value.clone())
    }
}

/// An untagged template literal; `quasis` holds the cooked strings.
pub struct TemplateLiteral {
    pub info: NodeInfo,
    pub quasis: Vec<Rc<str>>,
    pub expressions: Vec<Expression>,
}

impl TemplateLiteral {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Value> {
        log_evaluate!("TemplateLiteral", self.info, agent);
        let mut out = String::new();
        for (index, quasi) in self.quasis.iter().enumerate() {
            out.push_str(quasi);
            if let Some(expr) = self.expressions.get(index) {
                let value = expr.evaluate_value(agent)?;
                out.push_str(&to_string(agent, &value)?);
            }
        }
        Ok(Value::from(out))
    }
}

pub struct IdentifierReference {
    pub info: NodeInfo,
    pub name: Rc<str>,
    pub strict: bool,
}

impl IdentifierReference {
    pub(crate) fn wrap(cx: &mut Cx, span: syntax::Span, name: &str) -> Result<IdentifierReference, JSError> {
        if name == "arguments" {
            if cx.flags.contains(Context::IN_CLASS_FIELD) {
                return Err(raise_syntax_error!("'arguments' is not allowed in class field initializer"));
            }
            cx.mark_arguments();
        }
        cx.node(span, |cx, info| {
            Ok(IdentifierReference {
                info,
                name: Rc::from(name),
                strict: cx.strict(),
            })
        })
    }

    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Reference> {
        log_evaluate!("IdentifierReference", self.info, agent);
        agent.resolve_binding(&self.name, self.strict)
    }
}

pub struct ThisExpression {
    pub info: NodeInfo,
}

impl ThisExpression {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Value> {
        log_evaluate!("ThisExpression", self.info, agent);
        agent.resolve_this_binding()
    }
}

pub struct ArrayLiteral {
    pub info: NodeInfo,
    /// `None` is an elision.
    pub elements: Vec<Option<ListElement>>,
}

impl ArrayLiteral {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Value> {
        log_evaluate!("ArrayLiteral", self.info, agent);
        let array = array_create(agent, 0.0, None)?;
        let mut index = 0usize;
        for element in &self.elements {
            match element {
                None => index += 1,
                Some(ListElement::Plain(expr)) => {
                    let value = expr.evaluate_value(agent)?;
                    create_data_property_or_throw(agent, &array, &PropertyKey::from_index(index), value)?;
                    index += 1;
                }
                Some(ListElement::Spread(expr)) => {
                    let spread = expr.evaluate_value(agent)?;
                    let mut record = get_iterator(agent, &spread)?;
                    while let Some(value) = iterator_step_value(agent, &mut record)? {
                        create_data_property_or_throw(agent, &array, &PropertyKey::from_index(index), value)?;
                        index += 1;
                    }
                }
            }
        }
        // trailing elisions still count towards the length
        set(agent, &array, &PropertyKey::from("length"), Value::from(index), true)?;
        Ok(Value::Object(array))
    }
}

pub enum ObjectProperty {
    KeyValue {
        key: PropertyName,
        value: Expression,
        /// A non-computed `__proto__: value` definition.
        proto_setter: bool,
    },
    Shorthand(IdentifierReference),
    Method(MethodDefinition),
    Spread(Expression),
}

pub struct ObjectLiteral {
    pub info: NodeInfo,
    pub properties: Vec<ObjectProperty>,
}

impl ObjectLiteral {
    fn wrap(cx: &mut Cx, span: syntax::Span, properties: &[syntax::PropertyDefinition]) -> Result<ObjectLiteral, JSError> {
        cx.node(span, |cx, info| {
            let mut wrapped = Vec::with_capacity(properties.len());
            let mut has_proto = false;
            for property in properties {
                wrapped.push(match property {
                    syntax::PropertyDefinition::KeyValue(key, value) => {
                        let proto_setter = matches!(
                            key,
                            syntax::PropertyName::Identifier(name) | syntax::PropertyName::String(name) if name == "__proto__"
                        );
                        if proto_setter {
                            if has_proto {
                                return Err(raise_syntax_error!("Duplicate __proto__ fields are not allowed in object literals"));
                            }
                            has_proto = true;
                        }
                        ObjectProperty::KeyValue {
                            key: PropertyName::wrap(cx, key)?,
                            value: Expression::wrap(cx, value)?,
                            proto_setter,
                        }
                    }
                    syntax::PropertyDefinition::Shorthand(name, span) => ObjectProperty::Shorthand(IdentifierReference::wrap(cx, *span, name)?),
                    syntax::PropertyDefinition::CoverInitialized(..) => {
                        return Err(raise_syntax_error!("Invalid shorthand property initializer"));
                    }
                    syntax::PropertyDefinition::Method(method) => ObjectProperty::Method(MethodDefinition::wrap(cx, method, false)?),
                    syntax::PropertyDefinition::Spread(expr) => ObjectProperty::Spread(Expression::wrap(cx, expr)?),
                });
            }
            Ok(ObjectLiteral { info, properties: wrapped })
        })
    }

    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Value> {
        log_evaluate!("ObjectLiteral", self.info, agent);
        let object = Object::ordinary(Some(agent.intrinsic(Intrinsic::ObjectPrototype)));
        for property in &self.properties {
            property.evaluate(agent, &object)?;
        }
        Ok(Value::Object(object))
    }
}

impl ObjectProperty {
    /// PropertyDefinitionEvaluation
    fn evaluate(&self, agent: &mut Agent, object: &Object) -> Completion<()> {
        match self {
            ObjectProperty::KeyValue {
                value, proto_setter: true, ..
            } => {
                let value = value.evaluate_value(agent)?;
                match value {
                    Value::Object(prototype) => {
                        object.set_prototype_of(Some(prototype));
                    }
                    Value::Null => {
                        object.set_prototype_of(None);
                    }
                    _ => {}
                }
                Ok(())
            }
            ObjectProperty::KeyValue { key, value, .. } => {
                let key = key.evaluate(agent)?;
                let value = value.evaluate_named(agent, &key)?;
                create_data_property_or_throw(agent, object, &key, value)
            }
            ObjectProperty::Shorthand(identifier) => {
                let value = identifier.evaluate(agent)?.get_value(agent)?;
                create_data_property_or_throw(agent, object, &PropertyKey::from(&identifier.name), value)
            }
            ObjectProperty::Method(method) => method.evaluate_property_definition(agent, object, true),
            ObjectProperty::Spread(expr) => {
                let source = expr.evaluate_value(agent)?;
                copy_data_properties(agent, object, &source, &[])
            }
        }
    }
}

/// The property part of a member or super-property expression.
pub enum MemberKey {
    Name(PropertyKey),
    Computed(Box<Expression>),
}

impl MemberKey {
    fn wrap(cx: &mut Cx, property: &syntax::MemberProperty) -> Result<MemberKey, JSError> {
        Ok(match property {
            syntax::MemberProperty::Name(name) => MemberKey::Name(PropertyKey::from(name.as_str())),
            syntax::MemberProperty::Computed(expr) => MemberKey::Computed(Box::new(Expression::wrap(cx, expr)?)),
        })
    }

    fn evaluate(&self, agent: &mut Agent) -> Completion<PropertyKey> {
        match self {
            MemberKey::Name(key) => Ok(key.clone()),
            MemberKey::Computed(expr) => {
                let value = expr.evaluate_value(agent)?;
                to_property_key(agent, &value)
            }
        }
    }
}

pub struct MemberExpression {
    pub info: NodeInfo,
    pub object: Box<Expression>,
    pub property: MemberKey,
    pub strict: bool,
}

impl MemberExpression {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Reference> {
        log_evaluate!("MemberExpression", self.info, agent);
        let base = self.object.evaluate_value(agent)?;
        let key = self.property.evaluate(agent)?;
        Ok(Reference::Property {
            base,
            key,
            strict: self.strict,
            this_value: None,
        })
    }
}

/// `super.x` and `super[x]`.
pub struct SuperProperty {
    pub info: NodeInfo,
    pub property: MemberKey,
    pub strict: bool,
}

impl SuperProperty {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Reference> {
        log_evaluate!("SuperProperty", self.info, agent);
        let env = agent.get_this_environment();
        let actual_this = env.get_this_binding(agent)?;
        let key = self.property.evaluate(agent)?;
        // MakeSuperPropertyReference
        let base = env.get_super_base();
        Ok(Reference::Property {
            base,
            key,
            strict: self.strict,
            this_value: Some(actual_this),
        })
    }
}

/// `super(...args)`
pub struct SuperCall {
    pub info: NodeInfo,
    pub arguments: Vec<ListElement>,
}

impl SuperCall {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Value> {
        log_evaluate!("SuperCall", self.info, agent);
        let new_target = agent.get_new_target();
        let this_env = agent.get_this_environment();
        // GetSuperConstructor
        let active_function = this_env.function_object();
        let super_constructor = active_function.as_ref().and_then(Object::get_prototype_of);
        let args = argument_list_evaluation(agent, &self.arguments)?;
        let Some(constructor) = super_constructor.filter(Object::is_constructor) else {
            return throw_type_error(agent, "Super constructor is not a constructor");
        };
        let Value::Object(new_target) = new_target else {
            return throw_syntax_error(agent, "'super' keyword unexpected here");
        };
        let result = construct(agent, &constructor, &args, Some(&new_target))?;
        this_env.bind_this_value(agent, Value::Object(result.clone()))?;
        if let Some(function) = &active_function {
            initialize_instance_elements(agent, &result, function)?;
        }
        Ok(Value::Object(result))
    }
}

pub struct NewTarget {
    pub info: NodeInfo,
}

impl NewTarget {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Value> {
        log_evaluate!("NewTarget", self.info, agent);
        Ok(agent.get_new_target())
    }
}

pub struct CallExpression {
    pub info: NodeInfo,
    pub callee: Box<Expression>,
    pub arguments: Vec<ListElement>,
    /// Source text of the callee, for diagnostics.
    pub callee_text: Rc<str>,
}

impl CallExpression {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Value> {
        log_evaluate!("CallExpression", self.info, agent);
        let (function, this_value) = match self.callee.evaluate(agent)? {
            Evaluated::Reference(reference) => {
                let function = reference.get_value(agent)?;
                let this_value = match &reference {
                    Reference::Property { .. } => reference.get_this_value(),
                    Reference::Binding { env, .. } => env.with_base_object(),
                    Reference::Unresolvable { .. } => Value::Undefined,
                };
                (function, this_value)
            }
            Evaluated::Value(function) => (function, Value::Undefined),
        };
        let args = argument_list_evaluation(agent, &self.arguments)?;
        if !function.is_callable() {
            return throw_type_error(agent, &format!("{} is not a function", self.callee_text));
        }
        call(agent, &function, &this_value, &args)
    }
}

pub struct NewExpression {
    pub info: NodeInfo,
    pub callee: Box<Expression>,
    pub arguments: Vec<ListElement>,
    pub callee_text: Rc<str>,
}

impl NewExpression {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Value> {
        log_evaluate!("NewExpression", self.info, agent);
        let constructor = self.callee.evaluate_value(agent)?;
        let args = argument_list_evaluation(agent, &self.arguments)?;
        match &constructor {
            Value::Object(object) if object.is_constructor() => construct(agent, object, &args, None).map(Value::Object),
            _ => throw_type_error(agent, &format!("{} is not a constructor", self.callee_text)),
        }
    }
}

pub struct UnaryExpression {
    pub info: NodeInfo,
    pub op: UnaryOp,
    pub argument: Box<Expression>,
}

impl UnaryExpression {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Value> {
        log_evaluate!("UnaryExpression", self.info, agent);
        match self.op {
            UnaryOp::Delete => match self.argument.evaluate(agent)? {
                Evaluated::Value(_) => Ok(Value::Boolean(true)),
                Evaluated::Reference(reference) => reference.delete(agent).map(Value::Boolean),
            },
            UnaryOp::Void => {
                self.argument.evaluate_value(agent)?;
                Ok(Value::Undefined)
            }
            UnaryOp::TypeOf => {
                let evaluated = self.argument.evaluate(agent)?;
                if let Evaluated::Reference(reference) = &evaluated
                    && reference.is_unresolvable()
                {
                    return Ok(Value::from("undefined"));
                }
                let value = evaluated.get_value(agent)?;
                Ok(Value::from(value.type_of()))
            }
            UnaryOp::Plus => {
                let value = self.argument.evaluate_value(agent)?;
                to_number(agent, &value).map(Value::Number)
            }
            UnaryOp::Minus => {
                let value = self.argument.evaluate_value(agent)?;
                to_number(agent, &value).map(|n| Value::Number(-n))
            }
            UnaryOp::BitNot => {
                let value = self.argument.evaluate_value(agent)?;
                to_int32(agent, &value).map(|n| Value::Number(f64::from(!n)))
            }
            UnaryOp::Not => {
                let value = self.argument.evaluate_value(agent)?;
                Ok(Value::Boolean(!to_boolean(&value)))
            }
        }
    }
}

pub struct UpdateExpression {
    pub info: NodeInfo,
    pub op: UpdateOp,
    pub prefix: bool,
    pub argument: Box<Expression>,
}

impl UpdateExpression {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Value> {
        log_evaluate!("UpdateExpression", self.info, agent);
        let Evaluated::Reference(reference) = self.argument.evaluate(agent)? else {
            return throw_syntax_error(agent, "Invalid left-hand side expression in update operation");
        };
        let old_value = reference.get_value(agent)?;
        let old_value = to_number(agent, &old_value)?;
        let new_value = match self.op {
            UpdateOp::Increment => old_value + 1.0,
            UpdateOp::Decrement => old_value - 1.0,
        };
        reference.put_value(agent, Value::Number(new_value))?;
        Ok(Value::Number(if self.prefix { new_value } else { old_value }))
    }
}

pub struct BinaryExpression {
    pub info: NodeInfo,
    pub op: BinaryOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

impl BinaryExpression {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Value> {
        log_evaluate!("BinaryExpression", self.info, agent);
        let left = self.left.evaluate_value(agent)?;
        let right = self.right.evaluate_value(agent)?;
        apply_binary_operator(agent, self.op, left, right)
    }
}

fn exponentiate(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        return f64::NAN;
    }
    base.powf(exponent)
}

/// ApplyStringOrNumericBinaryOperator plus the relational, equality and bitwise operators.
pub(crate) fn apply_binary_operator(agent: &mut Agent, op: BinaryOp, left: Value, right: Value) -> Completion<Value> {
    let value = match op {
        BinaryOp::Add => {
            let left = to_primitive(agent, &left, PreferredType::Default)?;
            let right = to_primitive(agent, &right, PreferredType::Default)?;
            if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
                let left = to_string(agent, &left)?;
                let right = to_string(agent, &right)?;
                Value::from(format!("{left}{right}"))
            } else {
                Value::Number(to_number(agent, &left)? + to_number(agent, &right)?)
            }
        }
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Exp => {
            let l = to_number(agent, &left)?;
            let r = to_number(agent, &right)?;
            Value::Number(match op {
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div => l / r,
                BinaryOp::Mod => l % r,
                _ => exponentiate(l, r),
            })
        }
        BinaryOp::LeftShift => {
            let l = to_int32(agent, &left)?;
            let r = to_uint32(agent, &right)?;
            Value::Number(f64::from(l.wrapping_shl(r & 0x1f)))
        }
        BinaryOp::RightShift => {
            let l = to_int32(agent, &left)?;
            let r = to_uint32(agent, &right)?;
            Value::Number(f64::from(l >> (r & 0x1f)))
        }
        BinaryOp::UnsignedRightShift => {
            let l = to_uint32(agent, &left)?;
            let r = to_uint32(agent, &right)?;
            Value::Number(f64::from(l >> (r & 0x1f)))
        }
        BinaryOp::LessThan => Value::Boolean(abstract_relational_comparison(agent, &left, &right, true)? == Some(true)),
        BinaryOp::GreaterThan => Value::Boolean(abstract_relational_comparison(agent, &right, &left, false)? == Some(true)),
        BinaryOp::LessEqual => Value::Boolean(abstract_relational_comparison(agent, &right, &left, false)? == Some(false)),
        BinaryOp::GreaterEqual => Value::Boolean(abstract_relational_comparison(agent, &left, &right, true)? == Some(false)),
        BinaryOp::InstanceOf => Value::Boolean(instanceof_operator(agent, &left, &right)?),
        BinaryOp::In => {
            let Value::Object(object) = &right else {
                let key = to_string(agent, &left).unwrap_or_else(|_| Rc::from("key"));
                return throw_type_error(agent, &format!("Cannot use 'in' operator to search for '{key}' in {right:?}"));
            };
            let key = to_property_key(agent, &left)?;
            Value::Boolean(has_property(agent, object, &key)?)
        }
        BinaryOp::Equal => Value::Boolean(abstract_equality_comparison(agent, &left, &right)?),
        BinaryOp::NotEqual => Value::Boolean(!abstract_equality_comparison(agent, &left, &right)?),
        BinaryOp::StrictEqual => Value::Boolean(strict_equality_comparison(&left, &right)),
        BinaryOp::StrictNotEqual => Value::Boolean(!strict_equality_comparison(&left, &right)),
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
            let l = to_int32(agent, &left)?;
            let r = to_int32(agent, &right)?;
            Value::Number(f64::from(match op {
                BinaryOp::BitAnd => l & r,
                BinaryOp::BitOr => l | r,
                _ => l ^ r,
            }))
        }
    };
    Ok(value)
}

pub struct LogicalExpression {
    pub info: NodeInfo,
    pub op: LogicalOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

/// Whether the right operand of `op` is skipped for a left operand of `left`.
fn short_circuits(op: LogicalOp, left: &Value) -> bool {
    match op {
        LogicalOp::And => !to_boolean(left),
        LogicalOp::Or => to_boolean(left),
        LogicalOp::Nullish => !left.is_nullish(),
    }
}

impl LogicalExpression {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Value> {
        log_evaluate!("LogicalExpression", self.info, agent);
        let left = self.left.evaluate_value(agent)?;
        if short_circuits(self.op, &left) {
            return Ok(left);
        }
        self.right.evaluate_value(agent)
    }
}

pub struct ConditionalExpression {
    pub info: NodeInfo,
    pub test: Box<Expression>,
    pub consequent: Box<Expression>,
    pub alternate: Box<Expression>,
}

impl ConditionalExpression {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Value> {
        log_evaluate!("ConditionalExpression", self.info, agent);
        let test = self.test.evaluate_value(agent)?;
        if to_boolean(&test) {
            self.consequent.evaluate_value(agent)
        } else {
            self.alternate.evaluate_value(agent)
        }
    }
}

pub struct AssignmentExpression {
    pub info: NodeInfo,
    pub op: AssignOp,
    pub target: Pattern,
    pub value: Box<Expression>,
}

impl AssignmentExpression {
    fn evaluate_value_for_target(&self, agent: &mut Agent) -> Completion<Value> {
        match &self.target {
            Pattern::Identifier(identifier) => self.value.evaluate_named(agent, &PropertyKey::from(&identifier.name)),
            _ => self.value.evaluate_value(agent),
        }
    }

    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Value> {
        log_evaluate!("AssignmentExpression", self.info, agent);
        match self.op {
            AssignOp::Assign if self.target.is_destructuring() => {
                let value = self.value.evaluate_value(agent)?;
                self.target.bind(agent, value.clone(), None)?;
                Ok(value)
            }
            AssignOp::Assign => {
                let reference = self.target.reference(agent, None)?;
                let value = self.evaluate_value_for_target(agent)?;
                reference.put_value(agent, value.clone())?;
                Ok(value)
            }
            AssignOp::Binary(op) => {
                let reference = self.target.reference(agent, None)?;
                let left = reference.get_value(agent)?;
                let right = self.value.evaluate_value(agent)?;
                let result = apply_binary_operator(agent, op, left, right)?;
                reference.put_value(agent, result.clone())?;
                Ok(result)
            }
            AssignOp::Logical(op) => {
                let reference = self.target.reference(agent, None)?;
                let left = reference.get_value(agent)?;
                if short_circuits(op, &left) {
                    return Ok(left);
                }
                let value = self.evaluate_value_for_target(agent)?;
                reference.put_value(agent, value.clone())?;
                Ok(value)
            }
        }
    }
}

pub struct SequenceExpression {
    pub info: NodeInfo,
    pub expressions: Vec<Expression>,
}

impl SequenceExpression {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Value> {
        log_evaluate!("SequenceExpression", self.info, agent);
        let mut last = Value::Undefined;
        for expr in &self.expressions {
            last = expr.evaluate_value(agent)?;
        }
        Ok(last)
    }
}

/// Resolves `name` against `env` when given, against the running lexical environment otherwise.
pub(crate) fn resolve_binding_in(agent: &mut Agent, name: &Rc<str>, env: Option<&Environment>, strict: bool) -> Completion<Reference> {
    match env {
        Some(env) => crate::core::get_identifier_reference(agent, Some(env.clone()), name, strict),
        None => agent.resolve_binding(name, strict),
    }
}
