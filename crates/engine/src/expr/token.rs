//! Expression lexer.

use super::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    AndAnd,
    OrOr,
    Question,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Comma,
}

pub(super) fn tokenize(source: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' => tokens.push(read_number(&mut chars)?),
            '\'' | '"' => tokens.push(read_string(&mut chars)?),
            c if is_ident_start(c) => tokens.push(read_ident(&mut chars)),
            '+' => push_single(&mut chars, &mut tokens, Token::Plus),
            '-' => push_single(&mut chars, &mut tokens, Token::Minus),
            '*' => push_single(&mut chars, &mut tokens, Token::Star),
            '/' => push_single(&mut chars, &mut tokens, Token::Slash),
            '%' => push_single(&mut chars, &mut tokens, Token::Percent),
            '?' => push_single(&mut chars, &mut tokens, Token::Question),
            ':' => push_single(&mut chars, &mut tokens, Token::Colon),
            '(' => push_single(&mut chars, &mut tokens, Token::LParen),
            ')' => push_single(&mut chars, &mut tokens, Token::RParen),
            '[' => push_single(&mut chars, &mut tokens, Token::LBracket),
            ']' => push_single(&mut chars, &mut tokens, Token::RBracket),
            '.' => push_single(&mut chars, &mut tokens, Token::Dot),
            ',' => push_single(&mut chars, &mut tokens, Token::Comma),
            '<' => {
                chars.next();
                tokens.push(if eat(&mut chars, '=') { Token::Le } else { Token::Lt });
            }
            '>' => {
                chars.next();
                tokens.push(if eat(&mut chars, '=') { Token::Ge } else { Token::Gt });
            }
            '!' => {
                chars.next();
                if eat(&mut chars, '=') {
                    // `!==` and `!=` both lex to strict inequality.
                    eat(&mut chars, '=');
                    tokens.push(Token::Ne);
                } else {
                    tokens.push(Token::Bang);
                }
            }
            '=' => {
                chars.next();
                if eat(&mut chars, '=') {
                    eat(&mut chars, '=');
                    tokens.push(Token::Eq);
                } else {
                    return Err(EvalError::Syntax(
                        "assignment is not supported".to_string(),
                    ));
                }
            }
            '&' => {
                chars.next();
                if eat(&mut chars, '&') {
                    tokens.push(Token::AndAnd);
                } else {
                    return Err(EvalError::Syntax("expected `&&`".to_string()));
                }
            }
            '|' => {
                chars.next();
                if eat(&mut chars, '|') {
                    tokens.push(Token::OrOr);
                } else {
                    return Err(EvalError::Syntax("expected `||`".to_string()));
                }
            }
            other => {
                return Err(EvalError::Syntax(format!("unexpected character `{other}`")));
            }
        }
    }

    Ok(tokens)
}

fn push_single(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    tokens: &mut Vec<Token>,
    token: Token,
) {
    chars.next();
    tokens.push(token);
}

fn eat(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, expected: char) -> bool {
    if chars.peek() == Some(&expected) {
        chars.next();
        true
    } else {
        false
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn read_number(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Result<Token, EvalError> {
    let mut raw = String::new();
    let mut is_float = false;

    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            raw.push(c);
            chars.next();
        } else if c == '.' && !is_float {
            // A digit must follow; `1.foo` is member access on an integer.
            let mut ahead = chars.clone();
            ahead.next();
            if ahead.peek().is_some_and(|d| d.is_ascii_digit()) {
                is_float = true;
                raw.push(c);
                chars.next();
            } else {
                break;
            }
        } else {
            break;
        }
    }

    if is_float {
        raw.parse::<f64>()
            .map(Token::Float)
            .map_err(|_| EvalError::Syntax(format!("invalid number `{raw}`")))
    } else {
        match raw.parse::<i64>() {
            Ok(n) => Ok(Token::Int(n)),
            Err(_) => raw
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| EvalError::Syntax(format!("invalid number `{raw}`"))),
        }
    }
}

fn read_string(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Result<Token, EvalError> {
    let quote = chars.next().expect("caller peeked a quote");
    let mut out = String::new();

    while let Some(c) = chars.next() {
        if c == quote {
            return Ok(Token::Str(out));
        }
        if c == '\\' {
            match chars.next() {
                Some(escaped) => out.push(unescape(escaped)),
                None => break,
            }
        } else {
            out.push(c);
        }
    }

    Err(EvalError::Syntax("unterminated string literal".to_string()))
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        other => other,
    }
}

fn read_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Token {
    let mut name = String::new();
    while let Some(&c) = chars.peek() {
        if is_ident_continue(c) {
            name.push(c);
            chars.next();
        } else {
            break;
        }
    }
    match name.as_str() {
        "true" => Token::True,
        "false" => Token::False,
        "null" => Token::Null,
        _ => Token::Ident(name),
    }
}
