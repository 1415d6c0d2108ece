use crate::{JSError, raise_tokenize_error};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    StringLit(String),
    TemplateString(Vec<TemplatePart>),
    Identifier(String),
    Plus,
    Minus,
    Multiply,
    /// Exponentiation operator `**`
    Exponent,
    Divide,
    Mod,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Colon,
    Dot,
    Comma,
    Semicolon,
    Var,
    Let,
    Const,
    Class,
    Extends,
    Super,
    This,
    New,
    InstanceOf,
    TypeOf,
    In,
    Delete,
    Void,
    Function,
    Return,
    If,
    Else,
    For,
    While,
    Do,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Try,
    Catch,
    Finally,
    Throw,
    Import,
    Export,
    Debugger,
    True,
    False,
    Null,
    Assign,
    Equal,
    StrictEqual,
    NotEqual,
    StrictNotEqual,
    LessThan,
    GreaterThan,
    LessEqual,
    GreaterEqual,
    Arrow,
    Spread,
    QuestionMark,
    NullishCoalescing,
    LogicalNot,
    LogicalAnd,
    LogicalOr,
    LogicalAndAssign,
    LogicalOrAssign,
    NullishAssign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    /// Exponentiation assignment (`**=`)
    PowAssign,
    BitAnd,
    BitOr,
    BitXor,
    BitNot,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
    LeftShift,
    RightShift,
    UnsignedRightShift,
    LeftShiftAssign,
    RightShiftAssign,
    UnsignedRightShiftAssign,
    Increment,
    Decrement,
    EOF,
}

impl Token {
    /// Get the string representation of a token that can be used as a property name
    pub fn as_identifier_string(&self) -> Option<String> {
        let s = match self {
            Token::Identifier(s) => return Some(s.clone()),
            Token::Var => "var",
            Token::Let => "let",
            Token::Const => "const",
            Token::Class => "class",
            Token::Extends => "extends",
            Token::Super => "super",
            Token::This => "this",
            Token::New => "new",
            Token::InstanceOf => "instanceof",
            Token::TypeOf => "typeof",
            Token::In => "in",
            Token::Delete => "delete",
            Token::Void => "void",
            Token::Function => "function",
            Token::Return => "return",
            Token::If => "if",
            Token::Else => "else",
            Token::For => "for",
            Token::While => "while",
            Token::Do => "do",
            Token::Switch => "switch",
            Token::Case => "case",
            Token::Default => "default",
            Token::Break => "break",
            Token::Continue => "continue",
            Token::Try => "try",
            Token::Catch => "catch",
            Token::Finally => "finally",
            Token::Throw => "throw",
            Token::Import => "import",
            Token::Export => "export",
            Token::Debugger => "debugger",
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            _ => return None,
        };
        Some(s.to_string())
    }

    fn keyword(word: &str) -> Option<Token> {
        let token = match word {
            "var" => Token::Var,
            "let" => Token::Let,
            "const" => Token::Const,
            "class" => Token::Class,
            "extends" => Token::Extends,
            "super" => Token::Super,
            "this" => Token::This,
            "new" => Token::New,
            "instanceof" => Token::InstanceOf,
            "typeof" => Token::TypeOf,
            "in" => Token::In,
            "delete" => Token::Delete,
            "void" => Token::Void,
            "function" => Token::Function,
            "return" => Token::Return,
            "if" => Token::If,
            "else" => Token::Else,
            "for" => Token::For,
            "while" => Token::While,
            "do" => Token::Do,
            "switch" => Token::Switch,
            "case" => Token::Case,
            "default" => Token::Default,
            "break" => Token::Break,
            "continue" => Token::Continue,
            "try" => Token::Try,
            "catch" => Token::Catch,
            "finally" => Token::Finally,
            "throw" => Token::Throw,
            "import" => Token::Import,
            "export" => Token::Export,
            "debugger" => Token::Debugger,
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            _ => return None,
        };
        Some(token)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    String(String),
    Expr(Vec<TokenData>),
}

/// A token together with its position in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenData {
    pub token: Token,
    /// Byte offsets into the source text.
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
    /// Whether a line terminator appeared between this token and the previous one.
    pub newline_before: bool,
}

struct Lexer<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    i: usize,
    line: usize,
    line_start: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Lexer {
            source,
            chars: source.char_indices().collect(),
            i: 0,
            line: 1,
            line_start: 0,
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.i + offset).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars.get(self.i).map(|(o, _)| *o).unwrap_or(self.source.len())
    }

    fn column(&self) -> usize {
        self.i - self.line_start + 1
    }

    fn newline(&mut self) {
        self.line += 1;
        self.line_start = self.i + 1;
    }

    fn error(&self, message: &str) -> JSError {
        raise_tokenize_error!(message, self.line, self.column())
    }

    /// Tokenizes until end of input, or until an unmatched `}` when `in_template` is set.
    fn run(&mut self, in_template: bool) -> Result<Vec<TokenData>, JSError> {
        let mut tokens = Vec::new();
        let mut newline_before = false;
        let mut brace_depth = 0usize;
        while let Some(c) = self.peek(0) {
            match c {
                ' ' | '\t' | '\r' | '\u{feff}' | '\u{a0}' | '\u{0b}' | '\u{0c}' => {
                    self.i += 1;
                    continue;
                }
                '\n' | '\u{2028}' | '\u{2029}' => {
                    self.newline();
                    self.i += 1;
                    newline_before = true;
                    continue;
                }
                '/' if self.peek(1) == Some('/') => {
                    while let Some(c) = self.peek(0) {
                        if c == '\n' {
                            break;
                        }
                        self.i += 1;
                    }
                    continue;
                }
                '/' if self.peek(1) == Some('*') => {
                    self.i += 2;
                    loop {
                        match self.peek(0) {
                            None => return Err(self.error("Unterminated comment")),
                            Some('*') if self.peek(1) == Some('/') => {
                                self.i += 2;
                                break;
                            }
                            Some('\n') => {
                                self.newline();
                                newline_before = true;
                                self.i += 1;
                            }
                            Some(_) => self.i += 1,
                        }
                    }
                    continue;
                }
                _ => {}
            }

            let start = self.offset();
            let line = self.line;
            let column = self.column();

            if in_template && c == '}' && brace_depth == 0 {
                self.i += 1;
                return Ok(tokens);
            }

            let token = if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|d| d.is_ascii_digit())) {
                self.lex_number()?
            } else if c == '"' || c == '\'' {
                self.lex_string(c)?
            } else if c == '`' {
                self.lex_template()?
            } else if c == '_' || c == '$' || c.is_alphabetic() || c == '\\' {
                let word = self.lex_word()?;
                Token::keyword(&word).unwrap_or(Token::Identifier(word))
            } else {
                let token = self.lex_punctuator()?;
                match token {
                    Token::LBrace => brace_depth += 1,
                    Token::RBrace => brace_depth = brace_depth.saturating_sub(1),
                    _ => {}
                }
                token
            };

            tokens.push(TokenData {
                token,
                start,
                end: self.offset(),
                line,
                column,
                newline_before,
            });
            newline_before = false;
        }

        if in_template {
            return Err(self.error("Unterminated template expression"));
        }
        let end = self.source.len();
        tokens.push(TokenData {
            token: Token::EOF,
            start: end,
            end,
            line: self.line,
            column: self.column(),
            newline_before,
        });
        Ok(tokens)
    }

    fn lex_word(&mut self) -> Result<String, JSError> {
        let mut word = String::new();
        while let Some(c) = self.peek(0) {
            if c == '_' || c == '$' || c.is_alphanumeric() {
                word.push(c);
                self.i += 1;
            } else if c == '\\' && self.peek(1) == Some('u') {
                self.i += 2;
                let ch = self.lex_unicode_escape()?;
                word.push(ch);
            } else {
                break;
            }
        }
        Ok(word)
    }

    fn lex_number(&mut self) -> Result<Token, JSError> {
        let radix = match (self.peek(0), self.peek(1)) {
            (Some('0'), Some('x' | 'X')) => 16,
            (Some('0'), Some('o' | 'O')) => 8,
            (Some('0'), Some('b' | 'B')) => 2,
            _ => 10,
        };
        if radix != 10 {
            self.i += 2;
            let mut value = 0f64;
            let mut any = false;
            while let Some(c) = self.peek(0) {
                if c == '_' {
                    self.i += 1;
                    continue;
                }
                match c.to_digit(radix) {
                    Some(d) => {
                        value = value * radix as f64 + d as f64;
                        any = true;
                        self.i += 1;
                    }
                    None => break,
                }
            }
            if !any {
                return Err(self.error("Invalid numeric literal"));
            }
            return Ok(Token::Number(value));
        }

        let mut text = String::new();
        let mut seen_dot = false;
        let mut seen_exp = false;
        while let Some(c) = self.peek(0) {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '_' {
                // numeric separator
            } else if c == '.' && !seen_dot && !seen_exp {
                seen_dot = true;
                text.push(c);
            } else if (c == 'e' || c == 'E') && !seen_exp {
                seen_exp = true;
                text.push(c);
                if let Some(sign @ ('+' | '-')) = self.peek(1) {
                    text.push(sign);
                    self.i += 1;
                }
            } else {
                break;
            }
            self.i += 1;
        }
        if self.peek(0).is_some_and(|c| c == '_' || c.is_alphabetic()) {
            return Err(self.error("Identifier starts immediately after numeric literal"));
        }
        text.parse::<f64>().map(Token::Number).map_err(|_| self.error("Invalid numeric literal"))
    }

    fn lex_hex_digits(&mut self, count: usize) -> Result<u32, JSError> {
        let mut value = 0u32;
        for _ in 0..count {
            let d = self.peek(0).and_then(|c| c.to_digit(16)).ok_or_else(|| self.error("Invalid hexadecimal escape sequence"))?;
            value = value * 16 + d;
            self.i += 1;
        }
        Ok(value)
    }

    /// Parses the part of a `\u` escape after the `u`.
    fn lex_unicode_escape(&mut self) -> Result<char, JSError> {
        let code = if self.peek(0) == Some('{') {
            self.i += 1;
            let mut value = 0u32;
            loop {
                match self.peek(0) {
                    Some('}') => {
                        self.i += 1;
                        break;
                    }
                    Some(c) if c.is_ascii_hexdigit() => {
                        value = value.saturating_mul(16).saturating_add(c.to_digit(16).unwrap_or(0));
                        self.i += 1;
                    }
                    _ => return Err(self.error("Invalid Unicode escape sequence")),
                }
            }
            value
        } else {
            let high = self.lex_hex_digits(4)?;
            // Combine surrogate pairs written as two escapes.
            if (0xD800..0xDC00).contains(&high) && self.peek(0) == Some('\\') && self.peek(1) == Some('u') {
                let save = self.i;
                self.i += 2;
                let low = self.lex_hex_digits(4)?;
                if (0xDC00..0xE000).contains(&low) {
                    return Ok(char::from_u32(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)).unwrap_or('\u{fffd}'));
                }
                self.i = save;
            }
            high
        };
        Ok(char::from_u32(code).unwrap_or('\u{fffd}'))
    }

    fn lex_escape(&mut self, out: &mut String) -> Result<(), JSError> {
        // the backslash has been consumed
        let c = self.peek(0).ok_or_else(|| self.error("Unterminated string literal"))?;
        self.i += 1;
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            '0' if !self.peek(0).is_some_and(|d| d.is_ascii_digit()) => out.push('\0'),
            'x' => {
                let code = self.lex_hex_digits(2)?;
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            'u' => {
                let ch = self.lex_unicode_escape()?;
                out.push(ch);
            }
            '\r' => {
                if self.peek(0) == Some('\n') {
                    self.i += 1;
                }
                self.newline();
            }
            '\n' | '\u{2028}' | '\u{2029}' => self.newline(),
            other => out.push(other),
        }
        Ok(())
    }

    fn lex_string(&mut self, quote: char) -> Result<Token, JSError> {
        self.i += 1;
        let mut value = String::new();
        loop {
            match self.peek(0) {
                None | Some('\n') => return Err(self.error("Unterminated string literal")),
                Some(c) if c == quote => {
                    self.i += 1;
                    break;
                }
                Some('\\') => {
                    self.i += 1;
                    self.lex_escape(&mut value)?;
                }
                Some(c) => {
                    value.push(c);
                    self.i += 1;
                }
            }
        }
        Ok(Token::StringLit(value))
    }

    fn lex_template(&mut self) -> Result<Token, JSError> {
        self.i += 1;
        let mut parts = Vec::new();
        let mut current = String::new();
        loop {
            match self.peek(0) {
                None => return Err(self.error("Unterminated template literal")),
                Some('`') => {
                    self.i += 1;
                    break;
                }
                Some('\\') => {
                    self.i += 1;
                    self.lex_escape(&mut current)?;
                }
                Some('$') if self.peek(1) == Some('{') => {
                    self.i += 2;
                    parts.push(TemplatePart::String(std::mem::take(&mut current)));
                    let inner = self.run(true)?;
                    parts.push(TemplatePart::Expr(inner));
                }
                Some(c) => {
                    if c == '\n' {
                        self.newline();
                    }
                    current.push(c);
                    self.i += 1;
                }
            }
        }
        parts.push(TemplatePart::String(current));
        Ok(Token::TemplateString(parts))
    }

    fn lex_punctuator(&mut self) -> Result<Token, JSError> {
        let c = self.peek(0).unwrap_or('\0');
        let c1 = self.peek(1);
        let c2 = self.peek(2);
        let c3 = self.peek(3);
        let (token, len) = match c {
            '+' => match c1 {
                Some('+') => (Token::Increment, 2),
                Some('=') => (Token::AddAssign, 2),
                _ => (Token::Plus, 1),
            },
            '-' => match c1 {
                Some('-') => (Token::Decrement, 2),
                Some('=') => (Token::SubAssign, 2),
                _ => (Token::Minus, 1),
            },
            '*' => match (c1, c2) {
                (Some('*'), Some('=')) => (Token::PowAssign, 3),
                (Some('*'), _) => (Token::Exponent, 2),
                (Some('='), _) => (Token::MulAssign, 2),
                _ => (Token::Multiply, 1),
            },
            '/' => match c1 {
                Some('=') => (Token::DivAssign, 2),
                _ => (Token::Divide, 1),
            },
            '%' => match c1 {
                Some('=') => (Token::ModAssign, 2),
                _ => (Token::Mod, 1),
            },
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            '[' => (Token::LBracket, 1),
            ']' => (Token::RBracket, 1),
            '{' => (Token::LBrace, 1),
            '}' => (Token::RBrace, 1),
            ':' => (Token::Colon, 1),
            ';' => (Token::Semicolon, 1),
            ',' => (Token::Comma, 1),
            '~' => (Token::BitNot, 1),
            '.' => match (c1, c2) {
                (Some('.'), Some('.')) => (Token::Spread, 3),
                _ => (Token::Dot, 1),
            },
            '=' => match (c1, c2) {
                (Some('='), Some('=')) => (Token::StrictEqual, 3),
                (Some('='), _) => (Token::Equal, 2),
                (Some('>'), _) => (Token::Arrow, 2),
                _ => (Token::Assign, 1),
            },
            '!' => match (c1, c2) {
                (Some('='), Some('=')) => (Token::StrictNotEqual, 3),
                (Some('='), _) => (Token::NotEqual, 2),
                _ => (Token::LogicalNot, 1),
            },
            '<' => match (c1, c2) {
                (Some('<'), Some('=')) => (Token::LeftShiftAssign, 3),
                (Some('<'), _) => (Token::LeftShift, 2),
                (Some('='), _) => (Token::LessEqual, 2),
                _ => (Token::LessThan, 1),
            },
            '>' => match (c1, c2, c3) {
                (Some('>'), Some('>'), Some('=')) => (Token::UnsignedRightShiftAssign, 4),
                (Some('>'), Some('>'), _) => (Token::UnsignedRightShift, 3),
                (Some('>'), Some('='), _) => (Token::RightShiftAssign, 3),
                (Some('>'), _, _) => (Token::RightShift, 2),
                (Some('='), _, _) => (Token::GreaterEqual, 2),
                _ => (Token::GreaterThan, 1),
            },
            '&' => match (c1, c2) {
                (Some('&'), Some('=')) => (Token::LogicalAndAssign, 3),
                (Some('&'), _) => (Token::LogicalAnd, 2),
                (Some('='), _) => (Token::BitAndAssign, 2),
                _ => (Token::BitAnd, 1),
            },
            '|' => match (c1, c2) {
                (Some('|'), Some('=')) => (Token::LogicalOrAssign, 3),
                (Some('|'), _) => (Token::LogicalOr, 2),
                (Some('='), _) => (Token::BitOrAssign, 2),
                _ => (Token::BitOr, 1),
            },
            '^' => match c1 {
                Some('=') => (Token::BitXorAssign, 2),
                _ => (Token::BitXor, 1),
            },
            '?' => match (c1, c2) {
                (Some('?'), Some('=')) => (Token::NullishAssign, 3),
                (Some('?'), _) => (Token::NullishCoalescing, 2),
                _ => (Token::QuestionMark, 1),
            },
            other => return Err(self.error(&format!("Unexpected character '{other}'"))),
        };
        self.i += len;
        Ok(token)
    }
}

/// Splits source text into tokens. The returned list always ends with `Token::EOF`.
pub fn tokenize(source: &str) -> Result<Vec<TokenData>, JSError> {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.run(false)?;
    log::trace!("tokenize: {} tokens", tokens.len());
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn test_punctuators_longest_match() {
        assert_eq!(
            kinds("a >>>= b ?? c"),
            vec![
                Token::Identifier("a".into()),
                Token::UnsignedRightShiftAssign,
                Token::Identifier("b".into()),
                Token::NullishCoalescing,
                Token::Identifier("c".into()),
                Token::EOF
            ]
        );
    }

    #[test]
    fn test_numbers_and_strings() {
        assert_eq!(kinds("0x1F 1e3 .5"), vec![Token::Number(31.0), Token::Number(1000.0), Token::Number(0.5), Token::EOF]);
        assert_eq!(kinds(r#"'a\nb' "\u{41}""#), vec![Token::StringLit("a\nb".into()), Token::StringLit("A".into()), Token::EOF]);
    }

    #[test]
    fn test_newline_tracking_and_comments() {
        let tokens = tokenize("a // comment\n/* multi\nline */ b").unwrap();
        assert_eq!(tokens[1].token, Token::Identifier("b".into()));
        assert!(tokens[1].newline_before);
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_template_with_nested_braces() {
        let tokens = tokenize("`a${ {x: 1}.x }b`").unwrap();
        match &tokens[0].token {
            Token::TemplateString(parts) => {
                assert_eq!(parts.len(), 3);
                assert_eq!(parts[0], TemplatePart::String("a".into()));
                assert_eq!(parts[2], TemplatePart::String("b".into()));
            }
            other => panic!("unexpected token {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_string_is_error() {
        assert!(matches!(tokenize("'abc"), Err(JSError::TokenizationError { .. })));
    }
}
