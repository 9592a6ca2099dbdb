//! Sandboxed expression evaluator.
//!
//! Pipeline code, compare expressions, url/message templates, and curl
//! `{{ }}` tokens all run through this module. It is a restricted
//! interpreter — lexer, recursive-descent parser, and tree-walking
//! evaluation over [`serde_json::Value`] — not a general-purpose engine.
//!
//! Supported grammar: literals (number/string/bool/null), identifiers
//! with two-tier scope lookup, field access and indexing, unary `!`/`-`,
//! arithmetic, comparisons, strict equality (`===`/`!==` read the same
//! as `==`/`!=`), short-circuit `&&`/`||`, the ternary operator, and
//! calls to a fixed helper set (`date`, `dateTime`, `exit`, `select`).
//!
//! Snippets follow the implicit-return convention: without a `return`
//! keyword the whole snippet is the expression; otherwise evaluation
//! starts after the first `return`.

mod ast;
mod eval;
mod helpers;
mod parser;
mod scope;
mod token;

pub use eval::{display_string, truthy};
pub use scope::Scope;

use ast::Expr;

/// Evaluation failure. Callers treat these as soft faults: logged with
/// listener/step attribution, with the dependent value falling back to
/// a safe default.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unknown identifier: {0}")]
    Reference(String),

    #[error("type error: {0}")]
    Type(String),
}

/// Evaluate a snippet against a scope.
pub fn evaluate(source: &str, scope: &Scope<'_>) -> Result<serde_json::Value, EvalError> {
    let expr = compile(source)?;
    eval::eval(&expr, scope)
}

/// Parse a snippet into its expression tree.
fn compile(source: &str) -> Result<Expr, EvalError> {
    let body = expression_body(source);
    if body.is_empty() {
        return Err(EvalError::Syntax("empty expression".to_string()));
    }
    let tokens = token::tokenize(body)?;
    parser::parse(&tokens)
}

/// Strip the implicit-return framing: take everything after the first
/// `return` keyword, or the whole snippet when there is none. Trailing
/// semicolons are discarded.
fn expression_body(source: &str) -> &str {
    let trimmed = source.trim();
    let body = match find_return(trimmed) {
        Some(end) => trimmed[end..].trim_start(),
        None => trimmed,
    };
    body.trim_end_matches(';').trim_end()
}

/// Whether the snippet contains a `return` keyword at a word boundary.
pub fn has_return_keyword(source: &str) -> bool {
    find_return(source).is_some()
}

/// Byte offset just past the first word-boundary `return` keyword.
fn find_return(source: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut from = 0;
    while let Some(pos) = source[from..].find("return") {
        let start = from + pos;
        let end = start + "return".len();
        let boundary_before = start == 0 || !is_ident_byte(bytes[start - 1]);
        let boundary_after = end >= bytes.len() || !is_ident_byte(bytes[end]);
        if boundary_before && boundary_after {
            return Some(end);
        }
        from = end;
    }
    None
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval_simple(src: &str) -> serde_json::Value {
        evaluate(src, &Scope::new()).unwrap()
    }

    #[test]
    fn implicit_return_arithmetic() {
        assert_eq!(eval_simple("1 + 2 * 3"), json!(7));
    }

    #[test]
    fn explicit_return_prefix() {
        assert_eq!(eval_simple("return 40 + 2"), json!(42));
    }

    #[test]
    fn trailing_semicolon_ignored() {
        assert_eq!(eval_simple("return 1;"), json!(1));
    }

    #[test]
    fn return_not_matched_inside_identifier() {
        assert!(!has_return_keyword("returned + value"));
        assert!(has_return_keyword("return value"));
        assert!(has_return_keyword("if_true ? 1 : 0; return 2"));
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(eval_simple("'a' + 'b' + 1"), json!("ab1"));
    }

    #[test]
    fn integer_arithmetic_stays_integral() {
        assert_eq!(eval_simple("3 + 1"), json!(4));
        assert_eq!(eval_simple("7 % 3"), json!(1));
    }

    #[test]
    fn float_arithmetic() {
        assert_eq!(eval_simple("1 / 2"), json!(0.5));
        assert_eq!(eval_simple("1.5 + 1"), json!(2.5));
    }

    #[test]
    fn strict_equality_variants() {
        assert_eq!(eval_simple("1 === 1"), json!(true));
        assert_eq!(eval_simple("1 !== 2"), json!(true));
        assert_eq!(eval_simple("1 == 1.0"), json!(true));
        assert_eq!(eval_simple("'a' != 'a'"), json!(false));
    }

    #[test]
    fn ternary_and_logic() {
        assert_eq!(eval_simple("1 < 2 ? 'yes' : 'no'"), json!("yes"));
        assert_eq!(eval_simple("false || 'fallback'"), json!("fallback"));
        assert_eq!(eval_simple("0 && 1"), json!(0));
    }

    #[test]
    fn scope_field_lookup() {
        let value = json!({"price": 42, "name": "btc"});
        let scope = Scope::new().with_value(&value);
        assert_eq!(evaluate("price + 1", &scope).unwrap(), json!(43));
        assert_eq!(evaluate("value.price", &scope).unwrap(), json!(42));
    }

    #[test]
    fn inner_tier_shadows_outer() {
        let value = json!({"text": "inner"});
        let scope = Scope::new()
            .bind("text", json!("outer"))
            .with_value(&value);
        assert_eq!(evaluate("text", &scope).unwrap(), json!("inner"));
    }

    #[test]
    fn unknown_identifier_is_reference_error() {
        let err = evaluate("missing + 1", &Scope::new()).unwrap_err();
        assert!(matches!(err, EvalError::Reference(_)));
    }

    #[test]
    fn member_access_on_null_faults() {
        let scope = Scope::new().bind("json", serde_json::Value::Null);
        let err = evaluate("json.price", &scope).unwrap_err();
        assert!(matches!(err, EvalError::Type(_)));
    }

    #[test]
    fn missing_field_reads_null() {
        let scope = Scope::new().bind("json", json!({"a": 1}));
        assert_eq!(evaluate("json.b", &scope).unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn index_access() {
        let scope = Scope::new().bind("json", json!({"items": [10, 20, 30]}));
        assert_eq!(evaluate("json.items[1]", &scope).unwrap(), json!(20));
        assert_eq!(evaluate("json['items'][0]", &scope).unwrap(), json!(10));
    }

    #[test]
    fn exit_helper_sets_flag() {
        let scope = Scope::new();
        let value = evaluate("exit()", &scope).unwrap();
        assert_eq!(value, json!("exit"));
        assert!(scope.exit_requested());
    }

    #[test]
    fn exit_not_taken_in_untaken_branch() {
        let scope = Scope::new().bind("value", json!(1));
        let result = evaluate("value > 10 ? exit() : value + 1", &scope).unwrap();
        assert_eq!(result, json!(2));
        assert!(!scope.exit_requested());
    }

    #[test]
    fn default_compare_expression() {
        let value = json!(42);
        let scope = Scope::new().bind("prevValue", json!(0)).with_value(&value);
        assert_eq!(
            evaluate(crate::definition::DEFAULT_COMPARE, &scope).unwrap(),
            json!(true)
        );

        let scope = Scope::new().bind("prevValue", json!(42)).with_value(&value);
        assert_eq!(
            evaluate(crate::definition::DEFAULT_COMPARE, &scope).unwrap(),
            json!(false)
        );
    }

    #[test]
    fn unterminated_string_is_syntax_error() {
        assert!(matches!(
            evaluate("'oops", &Scope::new()),
            Err(EvalError::Syntax(_))
        ));
    }
}
