//! Row filter expression language
//!
//! ```text
//! expr    := and ("||" and)*
//! and     := term ("&&" term)*
//! term    := "(" expr ")" | path op operand
//! op      := "==" | "!=" | "=~" | "in"
//! operand := string | number | true | false | null | $user | "[" operand,* "]"
//! ```
//!
//! Paths are dotted; numeric segments index arrays. A path that does not
//! resolve compares as `null`. `=~` takes a string literal regex that must
//! match somewhere in the value, which must itself be a string.
//!
//! ```text
//! partner == $user && region in ["us", "ca"]
//! ```

use super::RowFilterEvaluator;
use crate::error::RowFilterError;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{escaped, is_not, tag, take_while},
    character::complete::{char, digit1, multispace0, one_of, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, recognize, value},
    multi::{separated_list0, separated_list1},
    sequence::{delimited, pair, terminated, tuple},
};
use regex::Regex;
use serde_json::{Number, Value};

/// Placeholder replaced with the requesting user name
pub const USER_PLACEHOLDER: &str = "$user";

static NULL: Value = Value::Null;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Matches,
    In,
}

/// Right-hand side of a comparison
#[derive(Debug, Clone)]
pub enum Operand {
    Literal(Value),
    User,
    List(Vec<Operand>),
    Pattern(Regex),
}

/// Parsed filter expression
#[derive(Debug, Clone)]
pub enum Expr {
    Or(Vec<Expr>),
    And(Vec<Expr>),
    Compare {
        path: String,
        op: Operator,
        operand: Operand,
    },
}

impl Expr {
    /// Parse an expression
    pub fn parse(input: &str) -> Result<Self, RowFilterError> {
        let expr = match all_consuming(any_of)(input) {
            Ok((_, expr)) => expr,
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                let offset = input.len() - e.input.len();
                let reason = if e.input.trim().is_empty() {
                    "unexpected end of expression".to_string()
                } else {
                    let near: String = e.input.chars().take(16).collect();
                    format!("unexpected input '{}'", near)
                };
                return Err(RowFilterError::parse(offset, reason));
            }
            Err(nom::Err::Incomplete(_)) => {
                return Err(RowFilterError::parse(input.len(), "incomplete expression"));
            }
        };
        compile_patterns(expr)
    }

    /// Evaluate against `record` for `user`
    pub fn eval(&self, user: &str, record: &Value) -> bool {
        match self {
            Expr::Or(terms) => terms.iter().any(|t| t.eval(user, record)),
            Expr::And(terms) => terms.iter().all(|t| t.eval(user, record)),
            Expr::Compare { path, op, operand } => {
                let actual = lookup(record, path);
                compare(actual, *op, operand, user)
            }
        }
    }
}

fn lookup<'a>(record: &'a Value, path: &str) -> &'a Value {
    path.split('.')
        .try_fold(record, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
        .unwrap_or(&NULL)
}

fn resolve(operand: &Operand, user: &str) -> Value {
    match operand {
        Operand::Literal(value) => value.clone(),
        Operand::User => Value::String(user.to_string()),
        Operand::List(items) => Value::Array(items.iter().map(|i| resolve(i, user)).collect()),
        Operand::Pattern(regex) => Value::String(regex.as_str().to_string()),
    }
}

fn compare(actual: &Value, op: Operator, operand: &Operand, user: &str) -> bool {
    match (op, operand) {
        (Operator::Eq, _) => *actual == resolve(operand, user),
        (Operator::Ne, _) => *actual != resolve(operand, user),
        (Operator::Matches, Operand::Pattern(regex)) => {
            actual.as_str().is_some_and(|s| regex.is_match(s))
        }
        (Operator::In, Operand::List(items)) => items.iter().any(|i| *actual == resolve(i, user)),
        _ => false,
    }
}

/// Built-in evaluator for the expression language above
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpressionFilter;

impl ExpressionFilter {
    pub fn new() -> Self {
        Self
    }
}

impl RowFilterEvaluator for ExpressionFilter {
    fn evaluate(
        &self,
        expression: &str,
        user: &str,
        record: &Value,
    ) -> Result<bool, RowFilterError> {
        Ok(Expr::parse(expression)?.eval(user, record))
    }
}

/// Turn the string operand of every `=~` into a compiled regex
fn compile_patterns(expr: Expr) -> Result<Expr, RowFilterError> {
    match expr {
        Expr::Or(terms) => Ok(Expr::Or(
            terms
                .into_iter()
                .map(compile_patterns)
                .collect::<Result<_, _>>()?,
        )),
        Expr::And(terms) => Ok(Expr::And(
            terms
                .into_iter()
                .map(compile_patterns)
                .collect::<Result<_, _>>()?,
        )),
        Expr::Compare {
            path,
            op: Operator::Matches,
            operand: Operand::Literal(Value::String(pattern)),
        } => {
            let regex = Regex::new(&pattern).map_err(|e| RowFilterError::InvalidPattern {
                pattern,
                reason: e.to_string(),
            })?;
            Ok(Expr::Compare {
                path,
                op: Operator::Matches,
                operand: Operand::Pattern(regex),
            })
        }
        other => Ok(other),
    }
}

// =============================================================================
// Grammar
// =============================================================================

fn is_path_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// `word` not followed by another path character
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(word), not(satisfy(is_path_char)))
}

fn any_of(input: &str) -> IResult<&str, Expr> {
    map(separated_list1(ws(tag("||")), all_of), |terms| {
        collapse(terms, Expr::Or)
    })(input)
}

fn all_of(input: &str) -> IResult<&str, Expr> {
    map(separated_list1(ws(tag("&&")), term), |terms| {
        collapse(terms, Expr::And)
    })(input)
}

fn collapse(mut terms: Vec<Expr>, combine: fn(Vec<Expr>) -> Expr) -> Expr {
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        combine(terms)
    }
}

fn term(input: &str) -> IResult<&str, Expr> {
    alt((
        delimited(ws(char('(')), any_of, ws(char(')'))),
        comparison,
    ))(input)
}

fn comparison(input: &str) -> IResult<&str, Expr> {
    let (input, path) = ws(field_path)(input)?;
    let (input, op) = ws(operator)(input)?;
    let (input, operand) = match op {
        Operator::Eq | Operator::Ne => scalar(input)?,
        // Compiled once the whole expression has parsed
        Operator::Matches => {
            map(ws(string_literal), |p| Operand::Literal(Value::String(p)))(input)?
        }
        Operator::In => list(input)?,
    };
    Ok((input, Expr::Compare { path, op, operand }))
}

fn field_path(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            satisfy(|c: char| c.is_alphabetic() || c == '_'),
            take_while(is_path_char),
        )),
        str::to_string,
    )(input)
}

fn operator(input: &str) -> IResult<&str, Operator> {
    alt((
        value(Operator::Eq, tag("==")),
        value(Operator::Ne, tag("!=")),
        value(Operator::Matches, tag("=~")),
        value(Operator::In, keyword("in")),
    ))(input)
}

fn scalar(input: &str) -> IResult<&str, Operand> {
    ws(alt((
        map(literal, Operand::Literal),
        value(Operand::User, keyword(USER_PLACEHOLDER)),
    )))(input)
}

fn list(input: &str) -> IResult<&str, Operand> {
    map(
        delimited(
            ws(char('[')),
            separated_list0(ws(char(',')), scalar),
            ws(char(']')),
        ),
        Operand::List,
    )(input)
}

fn literal(input: &str) -> IResult<&str, Value> {
    alt((
        map(string_literal, Value::String),
        map(number, Value::Number),
        value(Value::Bool(true), keyword("true")),
        value(Value::Bool(false), keyword("false")),
        value(Value::Null, keyword("null")),
    ))(input)
}

/// A JSON string literal, escapes included
fn string_literal(input: &str) -> IResult<&str, String> {
    map_res(
        recognize(delimited(
            char('"'),
            opt(escaped(is_not("\"\\"), '\\', one_of("\"\\/bfnrtu"))),
            char('"'),
        )),
        |raw: &str| serde_json::from_str::<String>(raw),
    )(input)
}

/// A JSON number literal
fn number(input: &str) -> IResult<&str, Number> {
    map_res(
        recognize(tuple((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), digit1)),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |raw: &str| serde_json::from_str::<Number>(raw),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(expr: &str, user: &str, record: &Value) -> bool {
        ExpressionFilter::new().evaluate(expr, user, record).unwrap()
    }

    #[test]
    fn test_equality_with_user() {
        let record = json!({"partner": "acme", "region": "us"});
        assert!(eval("partner == $user", "acme", &record));
        assert!(!eval("partner == $user", "globex", &record));
        assert!(eval("partner != $user", "globex", &record));
    }

    #[test]
    fn test_literals() {
        let record = json!({"n": 3, "flag": true, "gone": null, "name": "a \"b\""});
        assert!(eval("n == 3", "u", &record));
        assert!(eval("flag == true", "u", &record));
        assert!(eval("gone == null", "u", &record));
        assert!(eval("missing == null", "u", &record));
        assert!(eval(r#"name == "a \"b\"""#, "u", &record));
    }

    #[test]
    fn test_nested_paths_and_indices() {
        let record = json!({"owner": {"id": "u1"}, "tags": ["x", "y"]});
        assert!(eval("owner.id == $user", "u1", &record));
        assert!(eval(r#"tags.1 == "y""#, "u", &record));
        assert!(eval("tags.9 == null", "u", &record));
    }

    #[test]
    fn test_in_and_regex() {
        let record = json!({"region": "ca", "email": "bob@example.com"});
        assert!(eval(r#"region in ["us", "ca"]"#, "u", &record));
        assert!(!eval(r#"region in []"#, "u", &record));
        assert!(eval(r#"email =~ "@example\\.com$""#, "u", &record));
        assert!(!eval(r#"region =~ "^u""#, "u", &record));
    }

    #[test]
    fn test_precedence_and_grouping() {
        let record = json!({"a": 1, "b": 2, "c": 3});
        // && binds tighter than ||
        assert!(eval("a == 9 && b == 2 || c == 3", "u", &record));
        assert!(!eval("a == 9 && (b == 2 || c == 3)", "u", &record));
    }

    #[test]
    fn test_parse_errors() {
        let filter = ExpressionFilter::new();
        let record = json!({});
        for bad in [
            "",
            "partner ==",
            "partner $user",
            "== 3",
            "(a == 1",
            "a == 1 b",
            r#"a == "unterminated"#,
            "a in [1, 2",
            "a # 1",
        ] {
            assert!(
                matches!(
                    filter.evaluate(bad, "u", &record),
                    Err(RowFilterError::Parse { .. })
                ),
                "expected parse error for {bad:?}"
            );
        }
    }

    #[test]
    fn test_empty_string_and_escapes() {
        let record = json!({"a": "", "b": "é", "n": -2.5});
        assert!(eval(r#"a == """#, "u", &record));
        assert!(eval(r#"b == "\u00e9""#, "u", &record));
        assert!(eval("n == -2.5", "u", &record));
        assert!(eval("  (n != 1)  &&a==\"\"  ", "u", &record));
    }

    #[test]
    fn test_parse_error_offset() {
        let err = Expr::parse("a == 1 b").unwrap_err();
        assert_eq!(err, RowFilterError::parse(7, "unexpected input 'b'"));
        let err = Expr::parse("a ==").unwrap_err();
        assert!(matches!(err, RowFilterError::Parse { .. }));
    }

    #[test]
    fn test_invalid_regex() {
        let result = ExpressionFilter::new().evaluate(r#"a =~ "(""#, "u", &json!({}));
        assert!(matches!(result, Err(RowFilterError::InvalidPattern { .. })));
    }
}
