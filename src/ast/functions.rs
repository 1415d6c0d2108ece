//! Function code shared by function objects, and the function-defining nodes:
//! declarations, expressions, arrows and methods.

use super::{Context, Cx, Expression, NodeInfo, PatternElement, PropertyName, Scope, StatementList, check_duplicates, has_use_strict_directive, log_evaluate};
use crate::JSError;
use crate::core::{
    Abrupt, Agent, Completion, Environment, Intrinsic, Object, PropertyDescriptor, PropertyKey, Value, class_field_initializer_name,
    define_property_or_throw,
    exotics::{create_array_from_list, create_mapped_arguments_object, create_unmapped_arguments_object},
    make_constructor, make_method, ordinary_function_create, set_function_name,
};
use crate::raise_syntax_error;
use crate::syntax::{self, MethodKind};
use std::rc::Rc;

/// What kind of function a [`FunctionCode`] is the body of.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeKind {
    Normal,
    Arrow,
    Method,
    Getter,
    Setter,
    BaseConstructor,
    DerivedConstructor,
    FieldInitializer,
}

pub struct FormalParameter {
    pub element: PatternElement,
    pub rest: bool,
}

pub enum FunctionBody {
    Statements(StatementList),
    /// Concise arrow body.
    Expression(Box<Expression>),
    /// Class field initializer: evaluated with NamedEvaluation against the field name.
    Initializer(Box<Expression>),
}

/// The parameters and body of a function, with their static semantics.
pub struct FunctionCode {
    pub info: NodeInfo,
    pub kind: CodeKind,
    pub params: Vec<FormalParameter>,
    pub body: FunctionBody,
    pub strict: bool,
    pub source_text: Rc<str>,
    pub parameter_names: Vec<Rc<str>>,
    pub has_duplicates: bool,
    pub simple_parameter_list: bool,
    pub has_parameter_expressions: bool,
    /// ExpectedArgumentCount, the `length` of the function object.
    pub expected_argument_count: usize,
    pub arguments_object_needed: bool,
}

impl FunctionCode {
    pub(crate) fn wrap(cx: &mut Cx, function: &syntax::FunctionNode, kind: CodeKind, source_text: Rc<str>) -> Result<Rc<FunctionCode>, JSError> {
        let statements: &[syntax::Statement] = match &function.body {
            syntax::FunctionBodyNode::Block(statements) => statements,
            syntax::FunctionBodyNode::Expression(_) => &[],
        };
        let use_strict = has_use_strict_directive(cx, statements);
        let strict = cx.strict() || use_strict;
        let simple_parameter_list = function
            .params
            .iter()
            .all(|param| !param.rest && param.default.is_none() && matches!(param.pattern, syntax::Pattern::Identifier(..)));
        if use_strict && !simple_parameter_list {
            return Err(raise_syntax_error!("Illegal 'use strict' directive in function with non-simple parameter list"));
        }
        if strict && let Some(name) = &function.name {
            if name == "eval" || name == "arguments" {
                return Err(raise_syntax_error!("Unexpected eval or arguments in strict mode"));
            }
        }

        let inherited = cx.flags & (Context::STRICT | Context::MODULE);
        let mut flags = match kind {
            CodeKind::Arrow => cx.flags | Context::IN_FUNCTION,
            CodeKind::Normal => inherited | Context::IN_FUNCTION | Context::NEW_TARGET,
            CodeKind::Method | CodeKind::Getter | CodeKind::Setter | CodeKind::BaseConstructor => {
                inherited | Context::IN_FUNCTION | Context::NEW_TARGET | Context::SUPER_PROPERTY
            }
            CodeKind::DerivedConstructor => {
                inherited | Context::IN_FUNCTION | Context::NEW_TARGET | Context::SUPER_PROPERTY | Context::SUPER_CALL
            }
            CodeKind::FieldInitializer => inherited | Context::NEW_TARGET | Context::SUPER_PROPERTY | Context::IN_CLASS_FIELD,
        };
        if strict {
            flags |= Context::STRICT;
        }

        cx.enter_function(kind == CodeKind::Arrow);
        let wrapped = cx.with_flags(flags, |cx| {
            cx.node(function.span, |cx, info| {
                let params = function
                    .params
                    .iter()
                    .map(|param| FormalParameter::wrap(cx, param))
                    .collect::<Result<Vec<_>, _>>()?;
                let body = match &function.body {
                    syntax::FunctionBodyNode::Block(statements) => FunctionBody::Statements(StatementList::wrap(cx, statements, true)?),
                    syntax::FunctionBodyNode::Expression(expr) => FunctionBody::Expression(Box::new(Expression::wrap(cx, expr)?)),
                };
                Ok((info, params, body))
            })
        });
        let uses_arguments = cx.leave_function();
        let (info, params, body) = wrapped?;

        let mut parameter_names = Vec::new();
        for param in &params {
            param.element.target.bound_names(&mut parameter_names);
        }
        let has_duplicates = check_duplicates(&parameter_names).is_err();
        if has_duplicates && (strict || !simple_parameter_list || kind != CodeKind::Normal) {
            return Err(raise_syntax_error!("Duplicate parameter name not allowed in this context"));
        }
        let has_parameter_expressions = params
            .iter()
            .any(|param| param.element.default.is_some() || param.element.target.contains_expression());
        let expected_argument_count = params.iter().take_while(|param| !param.rest && param.element.default.is_none()).count();

        let mut code = FunctionCode {
            info,
            kind,
            params,
            body,
            strict,
            source_text,
            parameter_names,
            has_duplicates,
            simple_parameter_list,
            has_parameter_expressions,
            expected_argument_count,
            arguments_object_needed: false,
        };
        if let Some(scope) = code.scope() {
            let lexical_names = scope.lexically_declared_names();
            if let Some(name) = lexical_names.iter().find(|name| code.parameter_names.contains(name)) {
                return Err(raise_syntax_error!("Identifier '{name}' has already been declared"));
            }
        }
        code.arguments_object_needed = kind != CodeKind::Arrow && uses_arguments && code.needs_arguments_binding();
        Ok(Rc::new(code))
    }

    /// Code for a synthesized function: no parameter expressions, no declarations.
    pub(crate) fn synthesized(info: NodeInfo, kind: CodeKind, params: Vec<FormalParameter>, body: FunctionBody, source_text: Rc<str>) -> FunctionCode {
        let mut parameter_names = Vec::new();
        for param in &params {
            param.element.target.bound_names(&mut parameter_names);
        }
        let expected_argument_count = params.iter().take_while(|param| !param.rest && param.element.default.is_none()).count();
        FunctionCode {
            info,
            kind,
            simple_parameter_list: params.iter().all(|param| !param.rest),
            params,
            body,
            strict: true,
            source_text,
            parameter_names,
            has_duplicates: false,
            has_parameter_expressions: false,
            expected_argument_count,
            arguments_object_needed: false,
        }
    }

    fn scope(&self) -> Option<&Scope> {
        match &self.body {
            FunctionBody::Statements(list) => Some(&list.scope),
            _ => None,
        }
    }

    fn needs_arguments_binding(&self) -> bool {
        if self.parameter_names.iter().any(|name| &**name == "arguments") {
            return false;
        }
        if self.has_parameter_expressions {
            return true;
        }
        match self.scope() {
            Some(scope) => {
                !scope.functions.iter().any(|function| &*function.bound_name() == "arguments")
                    && !scope.lexically_declared_names().iter().any(|name| &**name == "arguments")
            }
            None => true,
        }
    }

    /// EvaluateBody, with OrdinaryCallEvaluateBody's treatment of `return`.
    pub fn evaluate_body(&self, agent: &mut Agent, function: &Object, args: &[Value]) -> Completion<Value> {
        log_evaluate!("FunctionBody", self.info, agent);
        match &self.body {
            FunctionBody::Statements(list) => {
                self.function_declaration_instantiation(agent, function, args)?;
                match list.evaluate(agent) {
                    Ok(_) => Ok(Value::Undefined),
                    Err(Abrupt::Return(value)) => Ok(value),
                    Err(abrupt) => Err(abrupt),
                }
            }
            FunctionBody::Expression(expr) => {
                self.function_declaration_instantiation(agent, function, args)?;
                expr.evaluate_value(agent)
            }
            FunctionBody::Initializer(expr) => match class_field_initializer_name(function) {
                Some(name) => expr.evaluate_named(agent, &name),
                None => expr.evaluate_value(agent),
            },
        }
    }

    /// FunctionDeclarationInstantiation(func, argumentsList)
    fn function_declaration_instantiation(&self, agent: &mut Agent, function: &Object, args: &[Value]) -> Completion<()> {
        let callee_env = agent.lexical_environment();
        let env = if self.strict || !self.has_parameter_expressions {
            callee_env
        } else {
            let env = Environment::new_declarative(Some(callee_env));
            agent.set_lexical_environment(env.clone());
            env
        };

        for name in &self.parameter_names {
            if !env.has_binding(agent, name)? {
                env.create_mutable_binding(agent, name, false)?;
                if self.has_duplicates {
                    env.initialize_binding(agent, name, Value::Undefined)?;
                }
            }
        }

        let mut parameter_bindings = self.parameter_names.clone();
        if self.arguments_object_needed {
            let arguments = if self.strict || !self.simple_parameter_list {
                create_unmapped_arguments_object(agent, args)
            } else {
                create_mapped_arguments_object(agent, function, &self.parameter_names, args, &env)
            };
            if self.strict {
                env.create_immutable_binding(agent, "arguments", false)?;
            } else {
                env.create_mutable_binding(agent, "arguments", false)?;
            }
            env.initialize_binding(agent, "arguments", Value::Object(arguments))?;
            parameter_bindings.push(Rc::from("arguments"));
        }

        let binding_env = if self.has_duplicates { None } else { Some(&env) };
        self.bind_parameters(agent, args, binding_env)?;

        let Some(scope) = self.scope() else {
            return Ok(());
        };
        let var_env = if !self.has_parameter_expressions {
            let mut instantiated = parameter_bindings;
            for name in &scope.var_names {
                if !instantiated.contains(name) {
                    instantiated.push(name.clone());
                    env.create_mutable_binding(agent, name, false)?;
                    env.initialize_binding(agent, name, Value::Undefined)?;
                }
            }
            env
        } else {
            // parameter expressions get their own scope, separate from the body's vars
            let var_env = Environment::new_declarative(Some(env.clone()));
            agent.set_variable_environment(var_env.clone());
            let mut instantiated: Vec<Rc<str>> = Vec::new();
            for name in &scope.var_names {
                if instantiated.contains(name) {
                    continue;
                }
                instantiated.push(name.clone());
                var_env.create_mutable_binding(agent, name, false)?;
                let is_function = scope.functions.iter().any(|function| function.bound_name() == *name);
                let initial = if !parameter_bindings.contains(name) || is_function {
                    Value::Undefined
                } else {
                    env.get_binding_value(agent, name, false)?
                };
                var_env.initialize_binding(agent, name, initial)?;
            }
            var_env
        };

        let lex_env = if self.strict {
            var_env.clone()
        } else {
            Environment::new_declarative(Some(var_env.clone()))
        };
        agent.set_lexical_environment(lex_env.clone());
        scope.create_lexical_bindings(agent, &lex_env)?;
        for declaration in &scope.functions {
            let object = declaration.instantiate(agent, &lex_env);
            var_env.set_mutable_binding(agent, &declaration.bound_name(), Value::Object(object), false)?;
        }
        Ok(())
    }

    /// IteratorBindingInitialization of the formals over the argument list.
    fn bind_parameters(&self, agent: &mut Agent, args: &[Value], env: Option<&Environment>) -> Completion<()> {
        for (index, param) in self.params.iter().enumerate() {
            if param.rest {
                let rest = args.get(index..).unwrap_or_default().to_vec();
                let rest = create_array_from_list(agent, rest);
                param.element.bind_with(agent, env, |_| Ok(Value::Object(rest)))?;
                break;
            }
            let value = args.get(index).cloned().unwrap_or_default();
            param.element.bind_with(agent, env, |_| Ok(value))?;
        }
        Ok(())
    }
}

impl FormalParameter {
    fn wrap(cx: &mut Cx, param: &syntax::Param) -> Result<FormalParameter, JSError> {
        Ok(FormalParameter {
            element: PatternElement {
                target: super::Pattern::wrap(cx, &param.pattern)?,
                default: param.default.as_ref().map(|default| Expression::wrap(cx, default)).transpose()?,
            },
            rest: param.rest,
        })
    }
}

/// Whether a non-computed property name is exactly `name`.
pub(crate) fn is_property_name(key: &syntax::PropertyName, name: &str) -> bool {
    matches!(key, syntax::PropertyName::Identifier(s) | syntax::PropertyName::String(s) if s == name)
}

/// A hoistable `function` declaration.
pub struct FunctionDeclaration {
    pub info: NodeInfo,
    pub name: Option<Rc<str>>,
    pub code: Rc<FunctionCode>,
}

impl FunctionDeclaration {
    pub(crate) fn wrap(cx: &mut Cx, function: &syntax::FunctionNode) -> Result<Rc<FunctionDeclaration>, JSError> {
        if let Some(name) = &function.name {
            super::check_binding_identifier(cx, name)?;
        }
        cx.node(function.span, |cx, info| {
            let source_text = cx.text(function.span);
            Ok(Rc::new(FunctionDeclaration {
                info,
                name: function.name.as_deref().map(Rc::from),
                code: FunctionCode::wrap(cx, function, CodeKind::Normal, source_text)?,
            }))
        })
    }

    /// BoundNames: the name, or `*default*` for `export default function () {}`.
    pub fn bound_name(&self) -> Rc<str> {
        self.name.clone().unwrap_or_else(|| Rc::from("*default*"))
    }

    /// InstantiateFunctionObject(env)
    pub fn instantiate(&self, agent: &mut Agent, env: &Environment) -> Object {
        let prototype = agent.intrinsic(Intrinsic::FunctionPrototype);
        let function = ordinary_function_create(agent, prototype, self.code.source_text.clone(), self.code.clone(), false, env.clone());
        let name = self.name.clone().unwrap_or_else(|| Rc::from("default"));
        set_function_name(&function, &PropertyKey::from(name), None);
        make_constructor(agent, &function, true, None);
        function
    }

    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Option<Value>> {
        log_evaluate!("FunctionDeclaration", self.info, agent);
        Ok(None)
    }
}

pub struct FunctionExpression {
    pub info: NodeInfo,
    pub name: Option<Rc<str>>,
    pub code: Rc<FunctionCode>,
}

impl FunctionExpression {
    pub(crate) fn wrap(cx: &mut Cx, function: &syntax::FunctionNode) -> Result<FunctionExpression, JSError> {
        cx.node(function.span, |cx, info| {
            let source_text = cx.text(function.span);
            Ok(FunctionExpression {
                info,
                name: function.name.as_deref().map(Rc::from),
                code: FunctionCode::wrap(cx, function, CodeKind::Normal, source_text)?,
            })
        })
    }

    /// InstantiateOrdinaryFunctionExpression(name)
    pub fn instantiate(&self, agent: &mut Agent, name: Option<&PropertyKey>) -> Completion<Object> {
        let env = agent.lexical_environment();
        let prototype = agent.intrinsic(Intrinsic::FunctionPrototype);
        let source_text = self.code.source_text.clone();
        let Some(own_name) = &self.name else {
            let closure = ordinary_function_create(agent, prototype, source_text, self.code.clone(), false, env);
            set_function_name(&closure, name.unwrap_or(&PropertyKey::from("")), None);
            make_constructor(agent, &closure, true, None);
            return Ok(closure);
        };
        // the function's own name is visible inside it through a dedicated scope
        let func_env = Environment::new_declarative(Some(env));
        func_env.create_immutable_binding(agent, own_name, false)?;
        let closure = ordinary_function_create(agent, prototype, source_text, self.code.clone(), false, func_env.clone());
        set_function_name(&closure, &PropertyKey::from(own_name), None);
        make_constructor(agent, &closure, true, None);
        func_env.initialize_binding(agent, own_name, Value::Object(closure.clone()))?;
        Ok(closure)
    }

    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Value> {
        log_evaluate!("FunctionExpression", self.info, agent);
        self.instantiate(agent, None).map(Value::Object)
    }
}

pub struct ArrowFunction {
    pub info: NodeInfo,
    pub code: Rc<FunctionCode>,
}

impl ArrowFunction {
    pub(crate) fn wrap(cx: &mut Cx, function: &syntax::FunctionNode) -> Result<ArrowFunction, JSError> {
        cx.node(function.span, |cx, info| {
            let source_text = cx.text(function.span);
            Ok(ArrowFunction {
                info,
                code: FunctionCode::wrap(cx, function, CodeKind::Arrow, source_text)?,
            })
        })
    }

    /// InstantiateArrowFunctionExpression(name)
    pub fn instantiate(&self, agent: &mut Agent, name: Option<&PropertyKey>) -> Completion<Object> {
        let env = agent.lexical_environment();
        let prototype = agent.intrinsic(Intrinsic::FunctionPrototype);
        let closure = ordinary_function_create(agent, prototype, self.code.source_text.clone(), self.code.clone(), true, env);
        set_function_name(&closure, name.unwrap_or(&PropertyKey::from("")), None);
        Ok(closure)
    }

    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Value> {
        log_evaluate!("ArrowFunction", self.info, agent);
        self.instantiate(agent, None).map(Value::Object)
    }
}

/// A method, getter or setter in an object literal or class body.
pub struct MethodDefinition {
    pub info: NodeInfo,
    pub key: PropertyName,
    pub kind: MethodKind,
    pub is_static: bool,
    pub code: Rc<FunctionCode>,
}

impl MethodDefinition {
    pub(crate) fn wrap(cx: &mut Cx, method: &syntax::MethodNode, is_class_member: bool) -> Result<MethodDefinition, JSError> {
        if is_class_member && method.is_static && is_property_name(&method.key, "prototype") {
            return Err(raise_syntax_error!("Classes may not have a static property named 'prototype'"));
        }
        cx.node(method.span, |cx, info| {
            let code_kind = match method.kind {
                MethodKind::Getter => CodeKind::Getter,
                MethodKind::Setter => CodeKind::Setter,
                MethodKind::Method | MethodKind::Constructor => CodeKind::Method,
            };
            let source_text = cx.text(method.span);
            Ok(MethodDefinition {
                info,
                key: PropertyName::wrap(cx, &method.key)?,
                kind: method.kind,
                is_static: method.is_static,
                code: FunctionCode::wrap(cx, &method.function, code_kind, source_text)?,
            })
        })
    }

    /// DefineMethod(object, functionPrototype)
    pub fn define_method(&self, agent: &mut Agent, object: &Object, function_prototype: Option<Object>) -> Completion<(PropertyKey, Object)> {
        let key = self.key.evaluate(agent)?;
        let env = agent.lexical_environment();
        let prototype = function_prototype.unwrap_or_else(|| agent.intrinsic(Intrinsic::FunctionPrototype));
        let closure = ordinary_function_create(agent, prototype, self.code.source_text.clone(), self.code.clone(), false, env);
        make_method(&closure, object);
        Ok((key, closure))
    }

    /// MethodDefinitionEvaluation(object, enumerable)
    pub fn evaluate_property_definition(&self, agent: &mut Agent, object: &Object, enumerable: bool) -> Completion<()> {
        log_evaluate!("MethodDefinition", self.info, agent);
        let (key, closure) = self.define_method(agent, object, None)?;
        let descriptor = match self.kind {
            MethodKind::Getter => {
                set_function_name(&closure, &key, Some("get"));
                PropertyDescriptor {
                    get: Some(Value::Object(closure)),
                    enumerable: Some(enumerable),
                    configurable: Some(true),
                    ..Default::default()
                }
            }
            MethodKind::Setter => {
                set_function_name(&closure, &key, Some("set"));
                PropertyDescriptor {
                    set: Some(Value::Object(closure)),
                    enumerable: Some(enumerable),
                    configurable: Some(true),
                    ..Default::default()
                }
            }
            MethodKind::Method | MethodKind::Constructor => {
                set_function_name(&closure, &key, None);
                PropertyDescriptor::data(Value::Object(closure), true, enumerable, true)
            }
        };
        define_property_or_throw(agent, object, &key, descriptor)
    }
}
