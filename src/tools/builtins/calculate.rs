//! Calculate built-in tool.
//!
//! Evaluates arithmetic over numeric literals, `+ - * / **` and parentheses.
//! Nothing else is accepted: identifiers, attribute access, calls, indexing
//! and every other character are rejected at tokenization, so there is no
//! path from the input string to anything but floating point arithmetic.
//!
//! Operator precedence follows the usual mathematical convention, with `**`
//! right-associative and binding tighter than unary minus (`-2 ** 2 == -4`).

use crate::tools::definition::{ToolDefinition, ToolDescriptor, ToolHandler};
use crate::tools::error::ToolError;
use crate::tools::schema::{ParamType, ParameterSchema, ParameterSpec};
use serde::{Deserialize, Serialize};

/// Longest accepted expression, in bytes.
pub const MAX_EXPRESSION_LENGTH: usize = 1000;

/// Deepest accepted nesting of parentheses and unary signs.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Calculate tool executor.
#[derive(Debug, Default, Clone)]
pub struct CalculateTool;

/// Arguments for the calculate tool.
#[derive(Debug, Deserialize)]
pub struct CalculateArgs {
    /// Arithmetic expression to evaluate
    pub expression: String,
}

/// Result of a successful evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculateOutput {
    pub expression: String,
    pub result: f64,
    /// `result` rendered without a trailing `.0` when integral
    pub formatted: String,
}

impl CalculateTool {
    /// The registered tool name.
    pub const NAME: &'static str = "calculate";

    /// Creates a new calculate tool.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the parameter schema.
    #[must_use]
    pub fn schema() -> ParameterSchema {
        ParameterSchema::new().with(
            ParameterSpec::required(
                "expression",
                ParamType::String,
                "Arithmetic expression, e.g. '(2 + 3) * 4' or '2 ** 10'",
            )
            .with_max_length(MAX_EXPRESSION_LENGTH),
        )
    }

    /// Returns the descriptor for registration.
    #[must_use]
    pub fn descriptor(&self) -> ToolDescriptor {
        let schema = Self::schema();
        ToolDescriptor::new(
            ToolDefinition::new(
                Self::NAME,
                "Evaluate an arithmetic expression. Supports numbers, + - * / ** (power) and parentheses only.",
                schema.to_json_schema(),
            ),
            schema,
            ToolHandler::Calculate(self.clone()),
        )
    }

    /// Evaluates the expression in `args`.
    ///
    /// # Errors
    ///
    /// `InvalidExpression` for anything outside the grammar or a non-finite
    /// result, `DivisionByZero` for `x / 0` and `0 ** -n`.
    pub fn execute(&self, args: CalculateArgs) -> Result<CalculateOutput, ToolError> {
        let result = evaluate(&args.expression)?;
        tracing::debug!(expression = %args.expression, result, "expression evaluated");
        Ok(CalculateOutput {
            formatted: format_number(result),
            expression: args.expression,
            result,
        })
    }
}

/// Formats a result, dropping the fractional part of integral values.
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Evaluates an arithmetic expression.
///
/// # Errors
///
/// See [`CalculateTool::execute`].
pub fn evaluate(expression: &str) -> Result<f64, ToolError> {
    if expression.len() > MAX_EXPRESSION_LENGTH {
        return Err(ToolError::invalid_expression(
            truncate(expression),
            format!("expression is longer than {MAX_EXPRESSION_LENGTH} characters"),
        ));
    }

    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(ToolError::invalid_expression(expression, "expression is empty"));
    }

    let mut parser = Parser {
        expression,
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;

    if let Some(token) = parser.peek() {
        return Err(ToolError::invalid_expression(
            expression,
            format!("unexpected {} at position {}", token.kind, token.offset),
        ));
    }

    Ok(value)
}

fn truncate(expression: &str) -> String {
    expression.chars().take(40).chain("...".chars()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TokenKind {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Power,
    LParen,
    RParen,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "number {n}"),
            Self::Plus => f.write_str("'+'"),
            Self::Minus => f.write_str("'-'"),
            Self::Star => f.write_str("'*'"),
            Self::Slash => f.write_str("'/'"),
            Self::Power => f.write_str("'**'"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    /// Byte offset into the expression
    offset: usize,
}

fn tokenize(expression: &str) -> Result<Vec<Token>, ToolError> {
    let bytes = expression.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let kind = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
                continue;
            }
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'/' => TokenKind::Slash,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'*' if bytes.get(i + 1) == Some(&b'*') => {
                tokens.push(Token {
                    kind: TokenKind::Power,
                    offset: i,
                });
                i += 2;
                continue;
            }
            b'*' => TokenKind::Star,
            b'0'..=b'9' | b'.' => {
                let (value, end) = scan_number(expression, i)?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    offset: i,
                });
                i = end;
                continue;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let end = scan_identifier(bytes, i);
                return Err(ToolError::invalid_expression(
                    expression,
                    format!(
                        "identifier '{}' at position {} is not allowed",
                        &expression[i..end],
                        i
                    ),
                ));
            }
            _ => {
                let ch = expression[i..].chars().next().unwrap_or('?');
                return Err(ToolError::invalid_expression(
                    expression,
                    format!("character '{}' at position {} is not allowed", ch, i),
                ));
            }
        };
        tokens.push(Token { kind, offset: i });
        i += 1;
    }

    Ok(tokens)
}

fn scan_identifier(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
        end += 1;
    }
    end
}

/// Scans `digits [. digits] [(e|E) [+-] digits]` or `. digits ...` starting at `start`.
fn scan_number(expression: &str, start: usize) -> Result<(f64, usize), ToolError> {
    let bytes = expression.as_bytes();
    let mut end = start;
    let digits = |end: &mut usize| {
        let from = *end;
        while *end < bytes.len() && bytes[*end].is_ascii_digit() {
            *end += 1;
        }
        *end - from
    };

    let mut mantissa_digits = digits(&mut end);
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        mantissa_digits += digits(&mut end);
    }
    if mantissa_digits == 0 {
        return Err(ToolError::invalid_expression(
            expression,
            format!("malformed number at position {start}"),
        ));
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        if digits(&mut exp_end) == 0 {
            return Err(ToolError::invalid_expression(
                expression,
                format!("malformed exponent in number at position {start}"),
            ));
        }
        end = exp_end;
    }

    // "2x", "3.5.1", "1_000": a number must not run straight into another word
    if end < bytes.len()
        && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_' || bytes[end] == b'.')
    {
        let tail = scan_identifier(bytes, end).max(end + 1);
        return Err(ToolError::invalid_expression(
            expression,
            format!(
                "malformed number '{}' at position {}",
                &expression[start..tail],
                start
            ),
        ));
    }

    let text = &expression[start..end];
    let value: f64 = text.parse().map_err(|_| {
        ToolError::invalid_expression(expression, format!("malformed number '{text}'"))
    })?;
    if !value.is_finite() {
        return Err(ToolError::invalid_expression(
            expression,
            format!("number '{text}' is out of range"),
        ));
    }
    Ok((value, end))
}

struct Parser<'a> {
    expression: &'a str,
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance_if(&mut self, kind: TokenKind) -> bool {
        if self.peek().is_some_and(|t| t.kind == kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, reason: impl Into<String>) -> ToolError {
        ToolError::invalid_expression(self.expression, reason)
    }

    fn enter(&mut self) -> Result<(), ToolError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(self.error(format!("nesting deeper than {MAX_NESTING_DEPTH} levels")));
        }
        Ok(())
    }

    fn checked(&self, value: f64) -> Result<f64, ToolError> {
        if value.is_nan() {
            Err(self.error("result is not a real number"))
        } else if value.is_infinite() {
            Err(self.error("result is too large to represent"))
        } else {
            Ok(value)
        }
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64, ToolError> {
        let mut value = self.term()?;
        loop {
            if self.advance_if(TokenKind::Plus) {
                let rhs = self.term()?;
                value = self.checked(value + rhs)?;
            } else if self.advance_if(TokenKind::Minus) {
                let rhs = self.term()?;
                value = self.checked(value - rhs)?;
            } else {
                return Ok(value);
            }
        }
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self) -> Result<f64, ToolError> {
        let mut value = self.factor()?;
        loop {
            if self.advance_if(TokenKind::Star) {
                let rhs = self.factor()?;
                value = self.checked(value * rhs)?;
            } else if self.advance_if(TokenKind::Slash) {
                let divisor = self.factor()?;
                if divisor == 0.0 {
                    return Err(ToolError::division_by_zero(self.expression));
                }
                value = self.checked(value / divisor)?;
            } else {
                return Ok(value);
            }
        }
    }

    // factor := ('+' | '-') factor | power
    fn factor(&mut self) -> Result<f64, ToolError> {
        if self.advance_if(TokenKind::Minus) {
            self.enter()?;
            let value = -self.factor()?;
            self.depth -= 1;
            Ok(value)
        } else if self.advance_if(TokenKind::Plus) {
            self.enter()?;
            let value = self.factor()?;
            self.depth -= 1;
            Ok(value)
        } else {
            self.power()
        }
    }

    // power := atom ['**' factor]
    fn power(&mut self) -> Result<f64, ToolError> {
        let base = self.atom()?;
        if !self.advance_if(TokenKind::Power) {
            return Ok(base);
        }
        self.enter()?;
        let exponent = self.factor()?;
        self.depth -= 1;
        if base == 0.0 && exponent < 0.0 {
            return Err(ToolError::division_by_zero(self.expression));
        }
        self.checked(base.powf(exponent))
    }

    // atom := NUMBER | '(' expr ')'
    fn atom(&mut self) -> Result<f64, ToolError> {
        let Some(token) = self.peek() else {
            return Err(self.error("expression ends unexpectedly"));
        };
        match token.kind {
            TokenKind::Number(value) => {
                self.pos += 1;
                Ok(value)
            }
            TokenKind::LParen => {
                self.pos += 1;
                self.enter()?;
                let value = self.expr()?;
                if !self.advance_if(TokenKind::RParen) {
                    return Err(self.error(format!(
                        "unclosed '(' at position {}",
                        token.offset
                    )));
                }
                self.depth -= 1;
                Ok(value)
            }
            other => Err(self.error(format!(
                "unexpected {} at position {}",
                other, token.offset
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::error::ToolErrorKind;

    fn eval(expression: &str) -> f64 {
        evaluate(expression).unwrap_or_else(|e| panic!("{expression}: {e}"))
    }

    fn assert_invalid(expression: &str) {
        let err = evaluate(expression).unwrap_err();
        assert!(
            matches!(err.kind(), ToolErrorKind::InvalidExpression { .. }),
            "{expression:?} gave {err}"
        );
    }

    #[test]
    fn basic_arithmetic() {
        assert_eq!(eval("2 + 2"), 4.0);
        assert_eq!(eval("10 - 3"), 7.0);
        assert_eq!(eval("6 * 7"), 42.0);
        assert_eq!(eval("20 / 4"), 5.0);
        assert_eq!(eval("7 / 2"), 3.5);
    }

    #[test]
    fn operator_precedence() {
        assert_eq!(eval("2 + 3 * 4"), 14.0);
        assert_eq!(eval("(2+3)*4"), 20.0);
        assert_eq!(eval("(5 + 3) * 2 / 4 - 1"), 3.0);
        assert_eq!(eval("10 - 4 - 3"), 3.0);
        assert_eq!(eval("64 / 4 / 2"), 8.0);
    }

    #[test]
    fn power_is_right_associative_and_binds_tighter_than_unary_minus() {
        assert_eq!(eval("2 ** 10"), 1024.0);
        assert_eq!(eval("2 ** 3 ** 2"), 512.0);
        assert_eq!(eval("-2 ** 2"), -4.0);
        assert_eq!(eval("(-2) ** 2"), 4.0);
        assert_eq!(eval("2 ** -1"), 0.5);
        assert_eq!(eval("2 * 3 ** 2"), 18.0);
    }

    #[test]
    fn unary_signs_and_literals() {
        assert_eq!(eval("-5 + +3"), -2.0);
        assert_eq!(eval("--4"), 4.0);
        assert_eq!(eval(".5 * 4"), 2.0);
        assert_eq!(eval("1.5e2"), 150.0);
        assert_eq!(eval("2.5E-1 * 4"), 1.0);
        assert_eq!(eval("  \t42\n"), 42.0);
    }

    #[test]
    fn division_by_zero() {
        for expression in ["1/0", "1 / (2 - 2)", "0 ** -1", "5 / 0.0"] {
            let err = evaluate(expression).unwrap_err();
            assert!(
                matches!(err.kind(), ToolErrorKind::DivisionByZero { .. }),
                "{expression} gave {err}"
            );
        }
    }

    #[test]
    fn rejects_code_injection() {
        assert_invalid("__import__('os')");
        assert_invalid("__import__('os').system('rm -rf /')");
        assert_invalid("os.system('ls')");
        assert_invalid("abs(-5)");
        assert_invalid("pi");
        assert_invalid("x + 1");
        assert_invalid("[1, 2][0]");
        assert_invalid("1; 2");
        assert_invalid("2 ^ 3");
        assert_invalid("7 % 2");
        assert_invalid("7 // 2");
        assert_invalid("'a' * 3");
        assert_invalid("1 if 1 else 0");
        assert_invalid("lambda: 0");
    }

    #[test]
    fn rejects_malformed_input() {
        assert_invalid("");
        assert_invalid("   ");
        assert_invalid("(");
        assert_invalid("(1 + 2");
        assert_invalid("1 + 2)");
        assert_invalid("1 +");
        assert_invalid("* 2");
        assert_invalid("2 3");
        assert_invalid("1.2.3");
        assert_invalid("2x");
        assert_invalid("1e");
        assert_invalid("1_000");
        assert_invalid(".");
        assert_invalid("()");
    }

    #[test]
    fn rejects_non_finite_results() {
        assert_invalid("1e308 * 10");
        assert_invalid("10 ** 400");
        assert_invalid("(-8) ** 0.5");
        assert_invalid("1e999");
    }

    #[test]
    fn enforces_limits() {
        let long = format!("1{}", " + 1".repeat(MAX_EXPRESSION_LENGTH));
        assert_invalid(&long);

        let nest = |n: usize| format!("{}1{}", "(".repeat(n), ")".repeat(n));
        assert_invalid(&nest(MAX_NESTING_DEPTH + 1));

        let ok = nest(MAX_NESTING_DEPTH);
        assert_eq!(eval(&ok), 1.0);

        assert_invalid(&format!("{}1", "-".repeat(MAX_NESTING_DEPTH + 1)));
    }

    #[test]
    fn error_names_offending_token() {
        let err = evaluate("2 + foo").unwrap_err();
        assert!(err.to_string().contains("foo"));
        let err = evaluate("2 $ 3").unwrap_err();
        assert!(err.to_string().contains('$'));
    }

    #[test]
    fn execute_formats_output() {
        let tool = CalculateTool::new();
        let out = tool
            .execute(CalculateArgs {
                expression: "100 + 200".to_string(),
            })
            .unwrap();
        assert_eq!(out.result, 300.0);
        assert_eq!(out.formatted, "300");

        let out = tool
            .execute(CalculateArgs {
                expression: "1 / 4".to_string(),
            })
            .unwrap();
        assert_eq!(out.formatted, "0.25");
    }

    #[test]
    fn descriptor_matches_schema() {
        let descriptor = CalculateTool::new().descriptor();
        assert_eq!(descriptor.name(), "calculate");
        let schema = &descriptor.definition().input_schema;
        assert_eq!(schema["properties"]["expression"]["type"], "string");
        assert_eq!(schema["required"], serde_json::json!(["expression"]));
    }
}
