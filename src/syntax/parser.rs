use crate::{
    JSError, raise_parse_error,
    syntax::{
        ArrayElement, AssignOp, BinaryOp, ClassMember, ClassNode, Expr, ExprKind, FunctionBodyNode, FunctionNode, LogicalOp,
        MemberProperty, MethodKind, MethodNode, Param, Pattern, PatternElement, PatternProperty, PropertyDefinition, PropertyName,
        Span, TemplatePart, Token, TokenData, UnaryOp, UpdateOp, parse_function_body_statements,
    },
};

/// Deepest recursion of expressions and statements the parser accepts.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Cursor over a token list. The list always ends with `Token::EOF`.
pub struct TokenStream {
    tokens: Vec<TokenData>,
    pos: usize,
    depth: usize,
    /// Set while parsing the head of a `for` statement, where `in` is not a binary operator.
    pub(crate) no_in: bool,
}

impl TokenStream {
    pub fn new(mut tokens: Vec<TokenData>) -> Self {
        if !matches!(tokens.last().map(|t| &t.token), Some(Token::EOF)) {
            let (end, line, column) = tokens.last().map(|t| (t.end, t.line, t.column)).unwrap_or((0, 1, 1));
            tokens.push(TokenData {
                token: Token::EOF,
                start: end,
                end,
                line,
                column,
                newline_before: false,
            });
        }
        TokenStream {
            tokens,
            pos: 0,
            depth: 0,
            no_in: false,
        }
    }

    pub fn peek(&self) -> &Token {
        &self.current().token
    }

    pub fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].token
    }

    pub fn current(&self) -> &TokenData {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub fn advance(&mut self) -> TokenData {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    pub fn at(&self, token: &Token) -> bool {
        self.peek() == token
    }

    pub fn at_identifier(&self, name: &str) -> bool {
        matches!(self.peek(), Token::Identifier(s) if s == name)
    }

    pub fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, token: Token) -> Result<TokenData, JSError> {
        if self.at(&token) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("expected {token:?}")))
        }
    }

    pub fn unexpected(&self, context: &str) -> JSError {
        let t = self.current();
        raise_parse_error!(format!("Unexpected token {:?}, {context}", t.token), t)
    }

    pub fn start_span(&self) -> Span {
        let t = self.current();
        Span {
            start: t.start,
            end: t.end,
            line: t.line,
            column: t.column,
        }
    }

    /// Span from `start` up to the end of the last consumed token.
    pub fn finish(&self, start: Span) -> Span {
        let end = if self.pos == 0 { start.end } else { self.tokens[self.pos - 1].end };
        Span { end: end.max(start.start), ..start }
    }

    /// Automatic semicolon insertion.
    pub fn consume_semicolon(&mut self) -> Result<(), JSError> {
        if self.eat(&Token::Semicolon) {
            return Ok(());
        }
        if matches!(self.peek(), Token::RBrace | Token::EOF) || self.current().newline_before {
            return Ok(());
        }
        Err(self.unexpected("expected ';'"))
    }

    /// Runs `parse` one nesting level deeper, failing once [`MAX_NESTING_DEPTH`] is reached.
    pub fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, JSError>) -> Result<T, JSError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(raise_parse_error!("Maximum nesting depth exceeded", self.current()));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    pub fn identifier(&mut self) -> Result<String, JSError> {
        match self.peek().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("expected identifier")),
        }
    }
}

fn node(kind: ExprKind, span: Span) -> Expr {
    Expr { kind, span }
}

pub fn parse_expression(ts: &mut TokenStream) -> Result<Expr, JSError> {
    let start = ts.start_span();
    let first = parse_assignment(ts)?;
    if !ts.at(&Token::Comma) {
        return Ok(first);
    }
    let mut expressions = vec![first];
    while ts.eat(&Token::Comma) {
        expressions.push(parse_assignment(ts)?);
    }
    Ok(node(ExprKind::Sequence(expressions), ts.finish(start)))
}

fn assignment_operator(token: &Token) -> Option<AssignOp> {
    let op = match token {
        Token::Assign => AssignOp::Assign,
        Token::AddAssign => AssignOp::Binary(BinaryOp::Add),
        Token::SubAssign => AssignOp::Binary(BinaryOp::Sub),
        Token::MulAssign => AssignOp::Binary(BinaryOp::Mul),
        Token::DivAssign => AssignOp::Binary(BinaryOp::Div),
        Token::ModAssign => AssignOp::Binary(BinaryOp::Mod),
        Token::PowAssign => AssignOp::Binary(BinaryOp::Exp),
        Token::LeftShiftAssign => AssignOp::Binary(BinaryOp::LeftShift),
        Token::RightShiftAssign => AssignOp::Binary(BinaryOp::RightShift),
        Token::UnsignedRightShiftAssign => AssignOp::Binary(BinaryOp::UnsignedRightShift),
        Token::BitAndAssign => AssignOp::Binary(BinaryOp::BitAnd),
        Token::BitOrAssign => AssignOp::Binary(BinaryOp::BitOr),
        Token::BitXorAssign => AssignOp::Binary(BinaryOp::BitXor),
        Token::LogicalAndAssign => AssignOp::Logical(LogicalOp::And),
        Token::LogicalOrAssign => AssignOp::Logical(LogicalOp::Or),
        Token::NullishAssign => AssignOp::Logical(LogicalOp::Nullish),
        _ => return None,
    };
    Some(op)
}

/// Looks past a parenthesized list starting at the current `(` to see whether an arrow follows.
fn is_arrow_ahead(ts: &TokenStream) -> bool {
    let mut depth = 0usize;
    let mut offset = 0usize;
    loop {
        match ts.peek_at(offset) {
            Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
            Token::RParen | Token::RBracket | Token::RBrace => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return matches!(ts.peek_at(offset + 1), Token::Arrow);
                }
            }
            Token::EOF => return false,
            _ => {}
        }
        offset += 1;
    }
}

pub fn parse_assignment(ts: &mut TokenStream) -> Result<Expr, JSError> {
    ts.nested(parse_assignment_inner)
}

fn parse_assignment_inner(ts: &mut TokenStream) -> Result<Expr, JSError> {
    let start = ts.start_span();

    if let Token::Identifier(name) = ts.peek().clone()
        && matches!(ts.peek_at(1), Token::Arrow)
    {
        let param_span = ts.start_span();
        ts.advance();
        let params = vec![Param {
            pattern: Pattern::Identifier(name, param_span),
            default: None,
            rest: false,
        }];
        return parse_arrow_rest(ts, params, start);
    }
    if ts.at(&Token::LParen) && is_arrow_ahead(ts) {
        ts.advance();
        let params = parse_formal_parameters(ts)?;
        return parse_arrow_rest(ts, params, start);
    }

    let left = parse_conditional(ts)?;
    let Some(op) = assignment_operator(ts.peek()) else {
        return Ok(left);
    };
    let target = match op {
        AssignOp::Assign => expr_to_pattern(left)?,
        _ => simple_assignment_target(left)?,
    };
    ts.advance();
    let value = parse_assignment(ts)?;
    Ok(node(
        ExprKind::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        },
        ts.finish(start),
    ))
}

fn parse_arrow_rest(ts: &mut TokenStream, params: Vec<Param>, start: Span) -> Result<Expr, JSError> {
    if ts.current().newline_before {
        return Err(ts.unexpected("line terminator before '=>'"));
    }
    ts.expect(Token::Arrow)?;
    let body = if ts.at(&Token::LBrace) {
        ts.advance();
        let statements = parse_function_body_statements(ts)?;
        ts.expect(Token::RBrace)?;
        FunctionBodyNode::Block(statements)
    } else {
        let no_in = std::mem::replace(&mut ts.no_in, false);
        let expr = parse_assignment(ts);
        ts.no_in = no_in;
        FunctionBodyNode::Expression(Box::new(expr?))
    };
    let span = ts.finish(start);
    let function = FunctionNode {
        name: None,
        params,
        body,
        span,
    };
    Ok(node(ExprKind::Arrow(Box::new(function)), span))
}

fn simple_assignment_target(expr: Expr) -> Result<Pattern, JSError> {
    match expr.kind {
        ExprKind::Identifier(name) => Ok(Pattern::Identifier(name, expr.span)),
        ExprKind::Member { .. } | ExprKind::SuperMember(_) => Ok(Pattern::Expr(Box::new(expr))),
        ExprKind::Paren(inner) => simple_assignment_target(*inner),
        _ => Err(JSError::SyntaxError {
            message: "Invalid left-hand side in assignment".to_string(),
        }),
    }
}

fn element_to_pattern(expr: Expr) -> Result<PatternElement, JSError> {
    match expr.kind {
        ExprKind::Assign {
            op: AssignOp::Assign,
            target,
            value,
        } => Ok(PatternElement {
            target: *target,
            default: Some(*value),
        }),
        _ => Ok(PatternElement {
            target: expr_to_pattern(expr)?,
            default: None,
        }),
    }
}

/// Reinterprets an expression parsed as an array or object literal as an assignment pattern.
pub fn expr_to_pattern(expr: Expr) -> Result<Pattern, JSError> {
    let span = expr.span;
    match expr.kind {
        ExprKind::Array(elements) => {
            let mut out = Vec::new();
            let mut rest = None;
            let count = elements.len();
            for (i, element) in elements.into_iter().enumerate() {
                match element {
                    None => out.push(None),
                    Some(ArrayElement::Expr(e)) => out.push(Some(element_to_pattern(e)?)),
                    Some(ArrayElement::Spread(e)) => {
                        if i + 1 != count {
                            return Err(crate::raise_syntax_error!("Rest element must be last element"));
                        }
                        rest = Some(Box::new(expr_to_pattern(e)?));
                    }
                }
            }
            Ok(Pattern::Array { elements: out, rest, span })
        }
        ExprKind::Object(properties) => {
            let mut out = Vec::new();
            let mut rest = None;
            let count = properties.len();
            for (i, property) in properties.into_iter().enumerate() {
                match property {
                    PropertyDefinition::KeyValue(key, value) => out.push(PatternProperty {
                        key,
                        value: element_to_pattern(value)?,
                    }),
                    PropertyDefinition::Shorthand(name, span) => out.push(PatternProperty {
                        key: PropertyName::Identifier(name.clone()),
                        value: PatternElement {
                            target: Pattern::Identifier(name, span),
                            default: None,
                        },
                    }),
                    PropertyDefinition::CoverInitialized(name, default, span) => out.push(PatternProperty {
                        key: PropertyName::Identifier(name.clone()),
                        value: PatternElement {
                            target: Pattern::Identifier(name, span),
                            default: Some(default),
                        },
                    }),
                    PropertyDefinition::Spread(e) => {
                        if i + 1 != count {
                            return Err(crate::raise_syntax_error!("Rest element must be last element"));
                        }
                        rest = Some(Box::new(simple_assignment_target(e)?));
                    }
                    PropertyDefinition::Method(_) => return Err(crate::raise_syntax_error!("Invalid destructuring assignment target")),
                }
            }
            Ok(Pattern::Object { properties: out, rest, span })
        }
        _ => simple_assignment_target(expr),
    }
}

fn parse_conditional(ts: &mut TokenStream) -> Result<Expr, JSError> {
    let start = ts.start_span();
    let condition = parse_binary(ts, 0)?;
    if !ts.eat(&Token::QuestionMark) {
        return Ok(condition);
    }
    // `in` is always allowed between `?` and `:`
    let no_in = std::mem::replace(&mut ts.no_in, false);
    let consequent = parse_assignment(ts);
    ts.no_in = no_in;
    let consequent = consequent?;
    ts.expect(Token::Colon)?;
    let alternate = parse_assignment(ts)?;
    Ok(node(
        ExprKind::Conditional(Box::new(condition), Box::new(consequent), Box::new(alternate)),
        ts.finish(start),
    ))
}

enum Operator {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

fn binary_operator(token: &Token, no_in: bool) -> Option<(u8, Operator)> {
    let entry = match token {
        Token::NullishCoalescing => (1, Operator::Logical(LogicalOp::Nullish)),
        Token::LogicalOr => (2, Operator::Logical(LogicalOp::Or)),
        Token::LogicalAnd => (3, Operator::Logical(LogicalOp::And)),
        Token::BitOr => (4, Operator::Binary(BinaryOp::BitOr)),
        Token::BitXor => (5, Operator::Binary(BinaryOp::BitXor)),
        Token::BitAnd => (6, Operator::Binary(BinaryOp::BitAnd)),
        Token::Equal => (7, Operator::Binary(BinaryOp::Equal)),
        Token::NotEqual => (7, Operator::Binary(BinaryOp::NotEqual)),
        Token::StrictEqual => (7, Operator::Binary(BinaryOp::StrictEqual)),
        Token::StrictNotEqual => (7, Operator::Binary(BinaryOp::StrictNotEqual)),
        Token::LessThan => (8, Operator::Binary(BinaryOp::LessThan)),
        Token::GreaterThan => (8, Operator::Binary(BinaryOp::GreaterThan)),
        Token::LessEqual => (8, Operator::Binary(BinaryOp::LessEqual)),
        Token::GreaterEqual => (8, Operator::Binary(BinaryOp::GreaterEqual)),
        Token::InstanceOf => (8, Operator::Binary(BinaryOp::InstanceOf)),
        Token::In if !no_in => (8, Operator::Binary(BinaryOp::In)),
        Token::LeftShift => (9, Operator::Binary(BinaryOp::LeftShift)),
        Token::RightShift => (9, Operator::Binary(BinaryOp::RightShift)),
        Token::UnsignedRightShift => (9, Operator::Binary(BinaryOp::UnsignedRightShift)),
        Token::Plus => (10, Operator::Binary(BinaryOp::Add)),
        Token::Minus => (10, Operator::Binary(BinaryOp::Sub)),
        Token::Multiply => (11, Operator::Binary(BinaryOp::Mul)),
        Token::Divide => (11, Operator::Binary(BinaryOp::Div)),
        Token::Mod => (11, Operator::Binary(BinaryOp::Mod)),
        Token::Exponent => (12, Operator::Binary(BinaryOp::Exp)),
        _ => return None,
    };
    Some(entry)
}

/// Precedence climbing over binary and logical operators; `**` is right-associative.
fn parse_binary(ts: &mut TokenStream, min_precedence: u8) -> Result<Expr, JSError> {
    let start = ts.start_span();
    let mut left = parse_unary(ts)?;
    while let Some((precedence, op)) = binary_operator(ts.peek(), ts.no_in) {
        if precedence <= min_precedence && !(precedence == 12 && min_precedence == 12) {
            break;
        }
        ts.advance();
        let right = if precedence == 12 {
            parse_binary(ts, 11)?
        } else {
            parse_binary(ts, precedence)?
        };
        let span = ts.finish(start);
        left = match op {
            Operator::Binary(op) => node(ExprKind::Binary(op, Box::new(left), Box::new(right)), span),
            Operator::Logical(op) => node(ExprKind::Logical(op, Box::new(left), Box::new(right)), span),
        };
    }
    Ok(left)
}

fn parse_unary(ts: &mut TokenStream) -> Result<Expr, JSError> {
    ts.nested(parse_unary_inner)
}

fn parse_unary_inner(ts: &mut TokenStream) -> Result<Expr, JSError> {
    let start = ts.start_span();
    let op = match ts.peek() {
        Token::Delete => Some(UnaryOp::Delete),
        Token::Void => Some(UnaryOp::Void),
        Token::TypeOf => Some(UnaryOp::TypeOf),
        Token::Plus => Some(UnaryOp::Plus),
        Token::Minus => Some(UnaryOp::Minus),
        Token::BitNot => Some(UnaryOp::BitNot),
        Token::LogicalNot => Some(UnaryOp::Not),
        _ => None,
    };
    if let Some(op) = op {
        ts.advance();
        let argument = parse_unary(ts)?;
        return Ok(node(ExprKind::Unary(op, Box::new(argument)), ts.finish(start)));
    }
    let update = match ts.peek() {
        Token::Increment => Some(UpdateOp::Increment),
        Token::Decrement => Some(UpdateOp::Decrement),
        _ => None,
    };
    if let Some(op) = update {
        ts.advance();
        let argument = parse_unary(ts)?;
        check_update_target(&argument)?;
        return Ok(node(
            ExprKind::Update {
                op,
                prefix: true,
                argument: Box::new(argument),
            },
            ts.finish(start),
        ));
    }
    let expr = parse_lhs(ts)?;
    let update = match ts.peek() {
        Token::Increment if !ts.current().newline_before => Some(UpdateOp::Increment),
        Token::Decrement if !ts.current().newline_before => Some(UpdateOp::Decrement),
        _ => None,
    };
    if let Some(op) = update {
        ts.advance();
        check_update_target(&expr)?;
        return Ok(node(
            ExprKind::Update {
                op,
                prefix: false,
                argument: Box::new(expr),
            },
            ts.finish(start),
        ));
    }
    Ok(expr)
}

fn check_update_target(expr: &Expr) -> Result<(), JSError> {
    match &expr.kind {
        ExprKind::Identifier(_) | ExprKind::Member { .. } | ExprKind::SuperMember(_) => Ok(()),
        ExprKind::Paren(inner) => check_update_target(inner),
        _ => Err(crate::raise_syntax_error!("Invalid left-hand side expression in update operation")),
    }
}

fn parse_arguments(ts: &mut TokenStream) -> Result<Vec<ArrayElement>, JSError> {
    ts.expect(Token::LParen)?;
    let no_in = std::mem::replace(&mut ts.no_in, false);
    let mut arguments = Vec::new();
    let result = (|| {
        while !ts.at(&Token::RParen) {
            if ts.eat(&Token::Spread) {
                arguments.push(ArrayElement::Spread(parse_assignment(ts)?));
            } else {
                arguments.push(ArrayElement::Expr(parse_assignment(ts)?));
            }
            if !ts.eat(&Token::Comma) {
                break;
            }
        }
        ts.expect(Token::RParen).map(|_| ())
    })();
    ts.no_in = no_in;
    result?;
    Ok(arguments)
}

fn parse_member_property(ts: &mut TokenStream) -> Result<Option<MemberProperty>, JSError> {
    if ts.eat(&Token::Dot) {
        let name = ts.peek().as_identifier_string().ok_or_else(|| ts.unexpected("expected property name"))?;
        ts.advance();
        return Ok(Some(MemberProperty::Name(name)));
    }
    if ts.eat(&Token::LBracket) {
        let no_in = std::mem::replace(&mut ts.no_in, false);
        let property = parse_expression(ts);
        ts.no_in = no_in;
        let property = property?;
        ts.expect(Token::RBracket)?;
        return Ok(Some(MemberProperty::Computed(Box::new(property))));
    }
    Ok(None)
}

/// LeftHandSideExpression: `new`, `super`, member accesses and calls.
pub fn parse_lhs(ts: &mut TokenStream) -> Result<Expr, JSError> {
    parse_lhs_inner(ts, true)
}

fn parse_lhs_inner(ts: &mut TokenStream, allow_call: bool) -> Result<Expr, JSError> {
    let start = ts.start_span();
    let mut expr = if ts.at(&Token::New) {
        ts.advance();
        if ts.eat(&Token::Dot) {
            if !ts.at_identifier("target") {
                return Err(ts.unexpected("expected 'target' after 'new.'"));
            }
            ts.advance();
            node(ExprKind::NewTarget, ts.finish(start))
        } else {
            let callee = parse_lhs_inner(ts, false)?;
            let arguments = if ts.at(&Token::LParen) { parse_arguments(ts)? } else { Vec::new() };
            node(
                ExprKind::New {
                    callee: Box::new(callee),
                    arguments,
                },
                ts.finish(start),
            )
        }
    } else if ts.at(&Token::Super) {
        ts.advance();
        if ts.at(&Token::LParen) {
            if !allow_call {
                return Err(ts.unexpected("'super' call is not allowed here"));
            }
            let arguments = parse_arguments(ts)?;
            node(ExprKind::SuperCall(arguments), ts.finish(start))
        } else {
            let property = parse_member_property(ts)?.ok_or_else(|| ts.unexpected("'super' keyword unexpected here"))?;
            node(ExprKind::SuperMember(property), ts.finish(start))
        }
    } else {
        parse_primary(ts)?
    };

    loop {
        if let Some(property) = parse_member_property(ts)? {
            expr = node(
                ExprKind::Member {
                    object: Box::new(expr),
                    property,
                },
                ts.finish(start),
            );
        } else if allow_call && ts.at(&Token::LParen) {
            let arguments = parse_arguments(ts)?;
            expr = node(
                ExprKind::Call {
                    callee: Box::new(expr),
                    arguments,
                },
                ts.finish(start),
            );
        } else if matches!(ts.peek(), Token::TemplateString(_)) {
            return Err(ts.unexpected("tagged templates are not supported"));
        } else {
            break;
        }
    }
    Ok(expr)
}

fn parse_primary(ts: &mut TokenStream) -> Result<Expr, JSError> {
    let start = ts.start_span();
    let token = ts.advance();
    let kind = match token.token {
        Token::Number(n) => ExprKind::Number(n),
        Token::StringLit(s) => ExprKind::String(s),
        Token::TemplateString(parts) => parse_template(parts)?,
        Token::True => ExprKind::Boolean(true),
        Token::False => ExprKind::Boolean(false),
        Token::Null => ExprKind::Null,
        Token::This => ExprKind::This,
        Token::Identifier(name) => ExprKind::Identifier(name),
        Token::LParen => {
            let no_in = std::mem::replace(&mut ts.no_in, false);
            let inner = parse_expression(ts);
            ts.no_in = no_in;
            let inner = inner?;
            ts.expect(Token::RParen)?;
            ExprKind::Paren(Box::new(inner))
        }
        Token::LBracket => parse_array_literal(ts)?,
        Token::LBrace => parse_object_literal(ts)?,
        Token::Function => {
            if ts.at(&Token::Multiply) {
                return Err(ts.unexpected("generator functions are not supported"));
            }
            let name = if let Token::Identifier(name) = ts.peek().clone() {
                ts.advance();
                Some(name)
            } else {
                None
            };
            let function = parse_function_rest(ts, name, start)?;
            ExprKind::Function(Box::new(function))
        }
        Token::Class => {
            let class = parse_class_rest(ts, start, false)?;
            ExprKind::Class(Box::new(class))
        }
        _ => return Err(raise_parse_error!(format!("Unexpected token {:?}", token.token), token)),
    };
    Ok(node(kind, ts.finish(start)))
}

fn parse_template(parts: Vec<TemplatePart>) -> Result<ExprKind, JSError> {
    let mut quasis = Vec::new();
    let mut expressions = Vec::new();
    for part in parts {
        match part {
            TemplatePart::String(s) => quasis.push(s),
            TemplatePart::Expr(tokens) => {
                let mut inner = TokenStream::new(tokens);
                expressions.push(parse_expression(&mut inner)?);
                if !inner.at(&Token::EOF) {
                    return Err(inner.unexpected("in template substitution"));
                }
            }
        }
    }
    Ok(ExprKind::Template { quasis, expressions })
}

fn parse_array_literal(ts: &mut TokenStream) -> Result<ExprKind, JSError> {
    let no_in = std::mem::replace(&mut ts.no_in, false);
    let mut elements = Vec::new();
    let result = (|| {
        loop {
            if ts.eat(&Token::RBracket) {
                return Ok(());
            }
            if ts.eat(&Token::Comma) {
                elements.push(None);
                continue;
            }
            if ts.eat(&Token::Spread) {
                elements.push(Some(ArrayElement::Spread(parse_assignment(ts)?)));
            } else {
                elements.push(Some(ArrayElement::Expr(parse_assignment(ts)?)));
            }
            if !ts.eat(&Token::Comma) {
                ts.expect(Token::RBracket)?;
                return Ok(());
            }
        }
    })();
    ts.no_in = no_in;
    result?;
    Ok(ExprKind::Array(elements))
}

pub fn parse_property_name(ts: &mut TokenStream) -> Result<PropertyName, JSError> {
    let token = ts.advance();
    match token.token {
        Token::StringLit(s) => Ok(PropertyName::String(s)),
        Token::Number(n) => Ok(PropertyName::Number(n)),
        Token::LBracket => {
            let expr = parse_assignment(ts)?;
            ts.expect(Token::RBracket)?;
            Ok(PropertyName::Computed(Box::new(expr)))
        }
        other => match other.as_identifier_string() {
            Some(name) => Ok(PropertyName::Identifier(name)),
            None => Err(raise_parse_error!(format!("Unexpected token {other:?}, expected property name"), token)),
        },
    }
}

/// After `get`/`set`, decides whether the word is an accessor prefix or the property name itself.
fn is_accessor_prefix(ts: &TokenStream) -> bool {
    let next = ts.peek_at(1);
    !matches!(
        next,
        Token::LParen | Token::Colon | Token::Comma | Token::RBrace | Token::Assign | Token::Semicolon | Token::EOF
    )
}

fn parse_object_literal(ts: &mut TokenStream) -> Result<ExprKind, JSError> {
    let no_in = std::mem::replace(&mut ts.no_in, false);
    let mut properties = Vec::new();
    let result = (|| {
        while !ts.eat(&Token::RBrace) {
            let start = ts.start_span();
            if ts.eat(&Token::Spread) {
                properties.push(PropertyDefinition::Spread(parse_assignment(ts)?));
            } else if ts.at(&Token::Multiply) || (ts.at_identifier("async") && is_accessor_prefix(ts)) {
                return Err(ts.unexpected("generator and async methods are not supported"));
            } else if (ts.at_identifier("get") || ts.at_identifier("set")) && is_accessor_prefix(ts) {
                let kind = if ts.at_identifier("get") { MethodKind::Getter } else { MethodKind::Setter };
                ts.advance();
                let key = parse_property_name(ts)?;
                let function = parse_function_rest(ts, None, start)?;
                properties.push(PropertyDefinition::Method(MethodNode {
                    key,
                    kind,
                    is_static: false,
                    span: function.span,
                    function,
                }));
            } else {
                let shorthand = match ts.peek() {
                    Token::Identifier(name) => Some(name.clone()),
                    _ => None,
                };
                let key = parse_property_name(ts)?;
                if ts.at(&Token::LParen) {
                    let function = parse_function_rest(ts, None, start)?;
                    properties.push(PropertyDefinition::Method(MethodNode {
                        key,
                        kind: MethodKind::Method,
                        is_static: false,
                        span: function.span,
                        function,
                    }));
                } else if ts.eat(&Token::Colon) {
                    properties.push(PropertyDefinition::KeyValue(key, parse_assignment(ts)?));
                } else if let Some(name) = shorthand {
                    let span = ts.finish(start);
                    if ts.eat(&Token::Assign) {
                        let default = parse_assignment(ts)?;
                        properties.push(PropertyDefinition::CoverInitialized(name, default, span));
                    } else {
                        properties.push(PropertyDefinition::Shorthand(name, span));
                    }
                } else {
                    return Err(ts.unexpected("expected ':' in object literal"));
                }
            }
            if !ts.eat(&Token::Comma) {
                ts.expect(Token::RBrace)?;
                break;
            }
        }
        Ok(())
    })();
    ts.no_in = no_in;
    result?;
    Ok(ExprKind::Object(properties))
}

/// Parses `( params ) { body }` for functions and methods whose head was already consumed.
pub fn parse_function_rest(ts: &mut TokenStream, name: Option<String>, start: Span) -> Result<FunctionNode, JSError> {
    ts.expect(Token::LParen)?;
    let params = parse_formal_parameters(ts)?;
    ts.expect(Token::LBrace)?;
    let no_in = std::mem::replace(&mut ts.no_in, false);
    let statements = parse_function_body_statements(ts);
    ts.no_in = no_in;
    let statements = statements?;
    ts.expect(Token::RBrace)?;
    Ok(FunctionNode {
        name,
        params,
        body: FunctionBodyNode::Block(statements),
        span: ts.finish(start),
    })
}

/// Parses formal parameters after the opening parenthesis, consuming the closing one.
pub fn parse_formal_parameters(ts: &mut TokenStream) -> Result<Vec<Param>, JSError> {
    let mut params = Vec::new();
    while !ts.at(&Token::RParen) {
        if ts.eat(&Token::Spread) {
            let pattern = parse_binding_target(ts)?;
            params.push(Param {
                pattern,
                default: None,
                rest: true,
            });
            break;
        }
        let pattern = parse_binding_target(ts)?;
        let default = if ts.eat(&Token::Assign) { Some(parse_assignment(ts)?) } else { None };
        params.push(Param {
            pattern,
            default,
            rest: false,
        });
        if !ts.eat(&Token::Comma) {
            break;
        }
    }
    ts.expect(Token::RParen)?;
    Ok(params)
}

/// BindingIdentifier or BindingPattern.
pub fn parse_binding_target(ts: &mut TokenStream) -> Result<Pattern, JSError> {
    let start = ts.start_span();
    match ts.peek().clone() {
        Token::Identifier(name) => {
            ts.advance();
            Ok(Pattern::Identifier(name, start))
        }
        Token::LBracket => {
            ts.advance();
            let mut elements = Vec::new();
            let mut rest = None;
            loop {
                if ts.eat(&Token::RBracket) {
                    break;
                }
                if ts.eat(&Token::Comma) {
                    elements.push(None);
                    continue;
                }
                if ts.eat(&Token::Spread) {
                    rest = Some(Box::new(parse_binding_target(ts)?));
                    ts.expect(Token::RBracket)?;
                    break;
                }
                elements.push(Some(parse_binding_element(ts)?));
                if !ts.eat(&Token::Comma) {
                    ts.expect(Token::RBracket)?;
                    break;
                }
            }
            Ok(Pattern::Array {
                elements,
                rest,
                span: ts.finish(start),
            })
        }
        Token::LBrace => {
            ts.advance();
            let mut properties = Vec::new();
            let mut rest = None;
            loop {
                if ts.eat(&Token::RBrace) {
                    break;
                }
                if ts.eat(&Token::Spread) {
                    let span = ts.start_span();
                    rest = Some(Box::new(Pattern::Identifier(ts.identifier()?, span)));
                    ts.expect(Token::RBrace)?;
                    break;
                }
                let key_span = ts.start_span();
                let shorthand = match ts.peek() {
                    Token::Identifier(name) => Some(name.clone()),
                    _ => None,
                };
                let key = parse_property_name(ts)?;
                let value = if ts.eat(&Token::Colon) {
                    parse_binding_element(ts)?
                } else if let Some(name) = shorthand {
                    let default = if ts.eat(&Token::Assign) { Some(parse_assignment(ts)?) } else { None };
                    PatternElement {
                        target: Pattern::Identifier(name, key_span),
                        default,
                    }
                } else {
                    return Err(ts.unexpected("expected ':' in object pattern"));
                };
                properties.push(PatternProperty { key, value });
                if !ts.eat(&Token::Comma) {
                    ts.expect(Token::RBrace)?;
                    break;
                }
            }
            Ok(Pattern::Object {
                properties,
                rest,
                span: ts.finish(start),
            })
        }
        _ => Err(ts.unexpected("expected binding identifier or pattern")),
    }
}

fn parse_binding_element(ts: &mut TokenStream) -> Result<PatternElement, JSError> {
    let target = parse_binding_target(ts)?;
    let default = if ts.eat(&Token::Assign) { Some(parse_assignment(ts)?) } else { None };
    Ok(PatternElement { target, default })
}

/// Parses a class after the `class` keyword. `name_required` is set for declarations.
pub fn parse_class_rest(ts: &mut TokenStream, start: Span, name_required: bool) -> Result<ClassNode, JSError> {
    let name = match ts.peek().clone() {
        Token::Identifier(name) => {
            ts.advance();
            Some(name)
        }
        _ if name_required => return Err(ts.unexpected("class name required")),
        _ => None,
    };
    let heritage = if ts.eat(&Token::Extends) {
        Some(Box::new(parse_lhs(ts)?))
    } else {
        None
    };
    ts.expect(Token::LBrace)?;
    let no_in = std::mem::replace(&mut ts.no_in, false);
    let members = parse_class_body(ts);
    ts.no_in = no_in;
    let members = members?;
    Ok(ClassNode {
        name,
        heritage,
        members,
        span: ts.finish(start),
    })
}

fn parse_class_body(ts: &mut TokenStream) -> Result<Vec<ClassMember>, JSError> {
    let mut members = Vec::new();
    while !ts.eat(&Token::RBrace) {
        let start = ts.start_span();
        if ts.eat(&Token::Semicolon) {
            members.push(ClassMember::Empty(start));
            continue;
        }
        let is_static = ts.at_identifier("static") && !matches!(ts.peek_at(1), Token::LParen | Token::Assign | Token::Semicolon);
        if is_static {
            ts.advance();
        }
        if ts.at(&Token::Multiply) || (ts.at_identifier("async") && is_accessor_prefix(ts)) {
            return Err(ts.unexpected("generator and async methods are not supported"));
        }
        let mut kind = MethodKind::Method;
        if (ts.at_identifier("get") || ts.at_identifier("set")) && is_accessor_prefix(ts) {
            kind = if ts.at_identifier("get") { MethodKind::Getter } else { MethodKind::Setter };
            ts.advance();
        }
        let key = parse_property_name(ts)?;
        if ts.at(&Token::LParen) {
            let is_constructor_name = matches!(&key, PropertyName::Identifier(n) | PropertyName::String(n) if n == "constructor");
            if is_constructor_name && !is_static {
                if kind != MethodKind::Method {
                    return Err(crate::raise_syntax_error!("Class constructor may not be an accessor"));
                }
                kind = MethodKind::Constructor;
            }
            let function = parse_function_rest(ts, None, start)?;
            members.push(ClassMember::Method(MethodNode {
                key,
                kind,
                is_static,
                span: function.span,
                function,
            }));
        } else {
            if kind != MethodKind::Method {
                return Err(ts.unexpected("expected '(' after accessor name"));
            }
            let value = if ts.eat(&Token::Assign) { Some(parse_assignment(ts)?) } else { None };
            ts.consume_semicolon()?;
            members.push(ClassMember::Field {
                key,
                is_static,
                value,
                span: ts.finish(start),
            });
        }
    }
    Ok(members)
}
