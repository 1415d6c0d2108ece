use crate::{
    JSError,
    syntax::{
        CatchClause, ExportDeclaration, ExportSpecifier, ForHead, ForInit, Goal, ImportDeclaration, ImportSpecifier, Program, Span,
        Statement, StatementKind, SwitchCase, Token, TokenStream, VariableDeclarator, VariableKind, expr_to_pattern,
        parse_assignment, parse_binding_target, parse_class_rest, parse_expression, parse_function_rest,
    },
};

pub fn parse_program(ts: &mut TokenStream, goal: Goal) -> Result<Program, JSError> {
    let start = ts.start_span();
    let mut body = Vec::new();
    while !ts.at(&Token::EOF) {
        body.push(parse_statement(ts, goal)?);
    }
    let span = ts.finish(start);
    log::trace!("parsed {goal:?} with {} top-level statements", body.len());
    Ok(Program { goal, body, span })
}

/// Statements up to (not including) the closing brace of a function body.
pub fn parse_function_body_statements(ts: &mut TokenStream) -> Result<Vec<Statement>, JSError> {
    parse_block_statements(ts, Goal::Script)
}

fn parse_block_statements(ts: &mut TokenStream, goal: Goal) -> Result<Vec<Statement>, JSError> {
    let mut body = Vec::new();
    while !matches!(ts.peek(), Token::RBrace | Token::EOF) {
        body.push(parse_nested_statement(ts, goal)?);
    }
    Ok(body)
}

/// Statements below the top level never accept import or export declarations.
fn parse_nested_statement(ts: &mut TokenStream, goal: Goal) -> Result<Statement, JSError> {
    if matches!(ts.peek(), Token::Import | Token::Export) {
        return Err(ts.unexpected("import and export declarations may only appear at the top level of a module"));
    }
    parse_statement(ts, goal)
}

fn statement(kind: StatementKind, span: Span) -> Statement {
    Statement { kind, span }
}

pub fn parse_statement(ts: &mut TokenStream, goal: Goal) -> Result<Statement, JSError> {
    ts.nested(|ts| parse_statement_inner(ts, goal))
}

fn parse_statement_inner(ts: &mut TokenStream, goal: Goal) -> Result<Statement, JSError> {
    let start = ts.start_span();
    let kind = match ts.peek().clone() {
        Token::LBrace => {
            ts.advance();
            let body = parse_block_statements(ts, goal)?;
            ts.expect(Token::RBrace)?;
            StatementKind::Block(body)
        }
        Token::Var | Token::Let | Token::Const => {
            let (kind, declarators) = parse_variable_declaration(ts)?;
            ts.consume_semicolon()?;
            StatementKind::Variable(kind, declarators)
        }
        Token::Function => {
            ts.advance();
            if ts.at(&Token::Multiply) {
                return Err(ts.unexpected("generator functions are not supported"));
            }
            let name = ts.identifier()?;
            StatementKind::Function(parse_function_rest(ts, Some(name), start)?)
        }
        Token::Class => {
            ts.advance();
            StatementKind::Class(parse_class_rest(ts, start, true)?)
        }
        Token::If => {
            ts.advance();
            ts.expect(Token::LParen)?;
            let test = parse_expression(ts)?;
            ts.expect(Token::RParen)?;
            let consequent = parse_nested_statement(ts, goal)?;
            let alternate = if ts.eat(&Token::Else) {
                Some(Box::new(parse_nested_statement(ts, goal)?))
            } else {
                None
            };
            StatementKind::If(test, Box::new(consequent), alternate)
        }
        Token::For => parse_for(ts, goal)?,
        Token::While => {
            ts.advance();
            ts.expect(Token::LParen)?;
            let test = parse_expression(ts)?;
            ts.expect(Token::RParen)?;
            StatementKind::While(test, Box::new(parse_nested_statement(ts, goal)?))
        }
        Token::Do => {
            ts.advance();
            let body = parse_nested_statement(ts, goal)?;
            ts.expect(Token::While)?;
            ts.expect(Token::LParen)?;
            let test = parse_expression(ts)?;
            ts.expect(Token::RParen)?;
            // a semicolon after do-while is always optional
            ts.eat(&Token::Semicolon);
            StatementKind::DoWhile(Box::new(body), test)
        }
        Token::Switch => parse_switch(ts, goal)?,
        Token::Break | Token::Continue => {
            let is_break = ts.at(&Token::Break);
            ts.advance();
            let label = match ts.peek().clone() {
                Token::Identifier(name) if !ts.current().newline_before => {
                    ts.advance();
                    Some(name)
                }
                _ => None,
            };
            ts.consume_semicolon()?;
            if is_break {
                StatementKind::Break(label)
            } else {
                StatementKind::Continue(label)
            }
        }
        Token::Return => {
            ts.advance();
            let argument = if matches!(ts.peek(), Token::Semicolon | Token::RBrace | Token::EOF) || ts.current().newline_before {
                None
            } else {
                Some(parse_expression(ts)?)
            };
            ts.consume_semicolon()?;
            StatementKind::Return(argument)
        }
        Token::Throw => {
            ts.advance();
            if ts.current().newline_before {
                return Err(ts.unexpected("illegal newline after throw"));
            }
            let argument = parse_expression(ts)?;
            ts.consume_semicolon()?;
            StatementKind::Throw(argument)
        }
        Token::Try => parse_try(ts, goal)?,
        Token::Semicolon => {
            ts.advance();
            StatementKind::Empty
        }
        Token::Debugger => {
            ts.advance();
            ts.consume_semicolon()?;
            StatementKind::Debugger
        }
        Token::Import if goal == Goal::Module && !matches!(ts.peek_at(1), Token::LParen | Token::Dot) => {
            StatementKind::Import(parse_import(ts)?)
        }
        Token::Export if goal == Goal::Module => StatementKind::Export(parse_export(ts)?),
        Token::Identifier(label) if matches!(ts.peek_at(1), Token::Colon) => {
            ts.advance();
            ts.advance();
            if ts.at(&Token::Function) {
                return Err(ts.unexpected("labelled function declarations are not allowed"));
            }
            StatementKind::Labeled(label, Box::new(parse_nested_statement(ts, goal)?))
        }
        _ => {
            let expr = parse_expression(ts)?;
            ts.consume_semicolon()?;
            StatementKind::Expression(expr)
        }
    };
    Ok(statement(kind, ts.finish(start)))
}

fn variable_kind(token: &Token) -> Option<VariableKind> {
    match token {
        Token::Var => Some(VariableKind::Var),
        Token::Let => Some(VariableKind::Let),
        Token::Const => Some(VariableKind::Const),
        _ => None,
    }
}

fn parse_variable_declaration(ts: &mut TokenStream) -> Result<(VariableKind, Vec<VariableDeclarator>), JSError> {
    let kind = variable_kind(ts.peek()).ok_or_else(|| ts.unexpected("expected variable declaration"))?;
    ts.advance();
    let mut declarators = Vec::new();
    loop {
        let start = ts.start_span();
        let target = parse_binding_target(ts)?;
        let init = if ts.eat(&Token::Assign) { Some(parse_assignment(ts)?) } else { None };
        declarators.push(VariableDeclarator {
            target,
            init,
            span: ts.finish(start),
        });
        if !ts.eat(&Token::Comma) {
            break;
        }
    }
    Ok((kind, declarators))
}

fn parse_for(ts: &mut TokenStream, goal: Goal) -> Result<StatementKind, JSError> {
    ts.expect(Token::For)?;
    ts.expect(Token::LParen)?;

    let mut init = None;
    if let Some(kind) = variable_kind(ts.peek()) {
        if matches!(ts.peek_at(2), Token::In) || (matches!(ts.peek_at(1), Token::Identifier(_)) && is_of(ts.peek_at(2))) {
            ts.advance();
            let target = parse_binding_target(ts)?;
            return parse_for_in_of(ts, goal, ForHead::Variable(kind, target));
        }
        if matches!(ts.peek_at(1), Token::LBracket | Token::LBrace) {
            // destructuring head: parse the pattern, then decide
            let save = ts.no_in;
            ts.no_in = true;
            ts.advance();
            let target = parse_binding_target(ts);
            ts.no_in = save;
            let target = target?;
            if ts.at(&Token::In) || is_of(ts.peek()) {
                return parse_for_in_of(ts, goal, ForHead::Variable(kind, target));
            }
            let start = ts.start_span();
            ts.expect(Token::Assign)?;
            let mut declarators = vec![VariableDeclarator {
                init: Some(with_no_in(ts, parse_assignment)?),
                span: target.span().to(ts.finish(start)),
                target,
            }];
            while ts.eat(&Token::Comma) {
                let start = ts.start_span();
                let target = parse_binding_target(ts)?;
                let init = if ts.eat(&Token::Assign) { Some(with_no_in(ts, parse_assignment)?) } else { None };
                declarators.push(VariableDeclarator {
                    target,
                    init,
                    span: ts.finish(start),
                });
            }
            init = Some(ForInit::Variable(kind, declarators));
        } else {
            let save = ts.no_in;
            ts.no_in = true;
            let declaration = parse_variable_declaration(ts);
            ts.no_in = save;
            let (kind, declarators) = declaration?;
            init = Some(ForInit::Variable(kind, declarators));
        }
    } else if !ts.at(&Token::Semicolon) {
        let expr = with_no_in(ts, parse_expression)?;
        if ts.at(&Token::In) || is_of(ts.peek()) {
            let target = expr_to_pattern(expr)?;
            return parse_for_in_of(ts, goal, ForHead::Pattern(target));
        }
        init = Some(ForInit::Expression(expr));
    }

    ts.expect(Token::Semicolon)?;
    let test = if ts.at(&Token::Semicolon) { None } else { Some(parse_expression(ts)?) };
    ts.expect(Token::Semicolon)?;
    let update = if ts.at(&Token::RParen) { None } else { Some(parse_expression(ts)?) };
    ts.expect(Token::RParen)?;
    let body = parse_nested_statement(ts, goal)?;
    Ok(StatementKind::For {
        init,
        test,
        update,
        body: Box::new(body),
    })
}

fn is_of(token: &Token) -> bool {
    matches!(token, Token::Identifier(s) if s == "of")
}

fn with_no_in<T>(ts: &mut TokenStream, f: fn(&mut TokenStream) -> Result<T, JSError>) -> Result<T, JSError> {
    let save = ts.no_in;
    ts.no_in = true;
    let result = f(ts);
    ts.no_in = save;
    result
}

fn parse_for_in_of(ts: &mut TokenStream, goal: Goal, head: ForHead) -> Result<StatementKind, JSError> {
    if ts.eat(&Token::In) {
        let right = parse_expression(ts)?;
        ts.expect(Token::RParen)?;
        let body = parse_nested_statement(ts, goal)?;
        return Ok(StatementKind::ForIn(head, right, Box::new(body)));
    }
    if !is_of(ts.peek()) {
        return Err(ts.unexpected("expected 'in' or 'of'"));
    }
    ts.advance();
    let right = parse_assignment(ts)?;
    ts.expect(Token::RParen)?;
    let body = parse_nested_statement(ts, goal)?;
    Ok(StatementKind::ForOf(head, right, Box::new(body)))
}

fn parse_switch(ts: &mut TokenStream, goal: Goal) -> Result<StatementKind, JSError> {
    ts.expect(Token::Switch)?;
    ts.expect(Token::LParen)?;
    let discriminant = parse_expression(ts)?;
    ts.expect(Token::RParen)?;
    ts.expect(Token::LBrace)?;
    let mut cases = Vec::new();
    let mut seen_default = false;
    while !ts.eat(&Token::RBrace) {
        let start = ts.start_span();
        let test = if ts.eat(&Token::Case) {
            Some(parse_expression(ts)?)
        } else if ts.eat(&Token::Default) {
            if seen_default {
                return Err(crate::raise_syntax_error!("More than one default clause in switch statement"));
            }
            seen_default = true;
            None
        } else {
            return Err(ts.unexpected("expected 'case' or 'default'"));
        };
        ts.expect(Token::Colon)?;
        let mut body = Vec::new();
        while !matches!(ts.peek(), Token::Case | Token::Default | Token::RBrace | Token::EOF) {
            body.push(parse_nested_statement(ts, goal)?);
        }
        cases.push(SwitchCase {
            test,
            body,
            span: ts.finish(start),
        });
    }
    Ok(StatementKind::Switch(discriminant, cases))
}

fn parse_try(ts: &mut TokenStream, goal: Goal) -> Result<StatementKind, JSError> {
    ts.expect(Token::Try)?;
    ts.expect(Token::LBrace)?;
    let block = parse_block_statements(ts, goal)?;
    ts.expect(Token::RBrace)?;

    let handler = if ts.at(&Token::Catch) {
        let start = ts.start_span();
        ts.advance();
        let param = if ts.eat(&Token::LParen) {
            let param = parse_binding_target(ts)?;
            ts.expect(Token::RParen)?;
            Some(param)
        } else {
            None
        };
        ts.expect(Token::LBrace)?;
        let body = parse_block_statements(ts, goal)?;
        ts.expect(Token::RBrace)?;
        Some(CatchClause {
            param,
            body,
            span: ts.finish(start),
        })
    } else {
        None
    };

    let finalizer = if ts.eat(&Token::Finally) {
        ts.expect(Token::LBrace)?;
        let body = parse_block_statements(ts, goal)?;
        ts.expect(Token::RBrace)?;
        Some(body)
    } else {
        None
    };

    if handler.is_none() && finalizer.is_none() {
        return Err(ts.unexpected("missing catch or finally after try"));
    }
    Ok(StatementKind::Try { block, handler, finalizer })
}

fn parse_module_specifier(ts: &mut TokenStream) -> Result<String, JSError> {
    match ts.peek().clone() {
        Token::StringLit(s) => {
            ts.advance();
            Ok(s)
        }
        _ => Err(ts.unexpected("expected module specifier")),
    }
}

fn expect_contextual(ts: &mut TokenStream, word: &str) -> Result<(), JSError> {
    if ts.at_identifier(word) {
        ts.advance();
        Ok(())
    } else {
        Err(ts.unexpected(&format!("expected '{word}'")))
    }
}

/// ModuleExportName: an IdentifierName (reserved words included) or a string literal.
fn parse_export_name(ts: &mut TokenStream) -> Result<String, JSError> {
    if let Token::StringLit(s) = ts.peek().clone() {
        ts.advance();
        return Ok(s);
    }
    let name = ts.peek().as_identifier_string().ok_or_else(|| ts.unexpected("expected export name"))?;
    ts.advance();
    Ok(name)
}

fn parse_import(ts: &mut TokenStream) -> Result<ImportDeclaration, JSError> {
    ts.expect(Token::Import)?;
    let mut specifiers = Vec::new();
    if let Token::StringLit(module) = ts.peek().clone() {
        ts.advance();
        ts.consume_semicolon()?;
        return Ok(ImportDeclaration { specifiers, module });
    }

    if let Token::Identifier(local) = ts.peek().clone() {
        ts.advance();
        specifiers.push(ImportSpecifier::Default(local));
        if !ts.eat(&Token::Comma) {
            expect_contextual(ts, "from")?;
            let module = parse_module_specifier(ts)?;
            ts.consume_semicolon()?;
            return Ok(ImportDeclaration { specifiers, module });
        }
    }

    if ts.eat(&Token::Multiply) {
        expect_contextual(ts, "as")?;
        specifiers.push(ImportSpecifier::Namespace(ts.identifier()?));
    } else {
        ts.expect(Token::LBrace)?;
        while !ts.eat(&Token::RBrace) {
            let imported = parse_export_name(ts)?;
            let local = if ts.at_identifier("as") {
                ts.advance();
                ts.identifier()?
            } else {
                imported.clone()
            };
            specifiers.push(ImportSpecifier::Named { imported, local });
            if !ts.eat(&Token::Comma) {
                ts.expect(Token::RBrace)?;
                break;
            }
        }
    }
    expect_contextual(ts, "from")?;
    let module = parse_module_specifier(ts)?;
    ts.consume_semicolon()?;
    Ok(ImportDeclaration { specifiers, module })
}

fn parse_export(ts: &mut TokenStream) -> Result<ExportDeclaration, JSError> {
    ts.expect(Token::Export)?;

    if ts.eat(&Token::Default) {
        let start = ts.start_span();
        if ts.eat(&Token::Function) {
            if ts.at(&Token::Multiply) {
                return Err(ts.unexpected("generator functions are not supported"));
            }
            let name = match ts.peek().clone() {
                Token::Identifier(name) => {
                    ts.advance();
                    Some(name)
                }
                _ => None,
            };
            return Ok(ExportDeclaration::DefaultFunction(parse_function_rest(ts, name, start)?));
        }
        if ts.eat(&Token::Class) {
            return Ok(ExportDeclaration::DefaultClass(parse_class_rest(ts, start, false)?));
        }
        let expr = parse_assignment(ts)?;
        ts.consume_semicolon()?;
        return Ok(ExportDeclaration::DefaultExpression(expr));
    }

    if ts.eat(&Token::Multiply) {
        let alias = if ts.at_identifier("as") {
            ts.advance();
            Some(parse_export_name(ts)?)
        } else {
            None
        };
        expect_contextual(ts, "from")?;
        let from = parse_module_specifier(ts)?;
        ts.consume_semicolon()?;
        return Ok(ExportDeclaration::All { alias, from });
    }

    if ts.eat(&Token::LBrace) {
        let mut specifiers = Vec::new();
        while !ts.eat(&Token::RBrace) {
            let local = parse_export_name(ts)?;
            let exported = if ts.at_identifier("as") {
                ts.advance();
                parse_export_name(ts)?
            } else {
                local.clone()
            };
            specifiers.push(ExportSpecifier { local, exported });
            if !ts.eat(&Token::Comma) {
                ts.expect(Token::RBrace)?;
                break;
            }
        }
        let from = if ts.at_identifier("from") {
            ts.advance();
            Some(parse_module_specifier(ts)?)
        } else {
            None
        };
        ts.consume_semicolon()?;
        return Ok(ExportDeclaration::Named { specifiers, from });
    }

    match ts.peek() {
        Token::Var | Token::Let | Token::Const | Token::Function | Token::Class => {
            let declaration = parse_statement(ts, Goal::Module)?;
            Ok(ExportDeclaration::Declaration(Box::new(declaration)))
        }
        _ => Err(ts.unexpected("unexpected token after 'export'")),
    }
}
