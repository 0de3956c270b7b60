//! Demo tools used by the bundled agent catalog.

use super::Tool;
use crate::error::ApiError;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Canned weather report for a city.
pub struct GetWeather;

#[async_trait]
impl Tool for GetWeather {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather for a city"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": { "type": "string", "description": "City name" }
            },
            "required": ["city"]
        })
    }

    async fn call(&self, input: Value) -> Result<String, ApiError> {
        let city = input
            .get("city")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ApiError::ToolError("get_weather requires a 'city' string".to_string()))?;
        Ok(format!("{}: sunny, 25°C, light breeze", city))
    }
}

/// Arithmetic expression evaluator.
pub struct Calculate;

#[async_trait]
impl Tool for Calculate {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression with + - * / % ^ and parentheses"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": { "type": "string", "description": "Expression such as (2 + 3) * 4" }
            },
            "required": ["expression"]
        })
    }

    async fn call(&self, input: Value) -> Result<String, ApiError> {
        let expression = input
            .get("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ApiError::ToolError("calculate requires an 'expression' string".to_string())
            })?;
        let value = evaluate(expression).map_err(ApiError::ToolError)?;
        Ok(format_number(value))
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Evaluate `expression` by recursive descent.
pub fn evaluate(expression: &str) -> Result<f64, String> {
    let mut parser = Parser {
        chars: expression.chars().filter(|c| !c.is_whitespace()).collect(),
        pos: 0,
        depth: 0,
    };
    if parser.chars.is_empty() {
        return Err("empty expression".to_string());
    }
    let value = parser.expr()?;
    if parser.pos != parser.chars.len() {
        return Err(format!(
            "unexpected '{}' at position {}",
            parser.chars[parser.pos], parser.pos
        ));
    }
    if !value.is_finite() {
        return Err("result is not a finite number".to_string());
    }
    Ok(value)
}

/// Deepest accepted nesting of parentheses, signs and exponents
const MAX_DEPTH: usize = 64;

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn nested(&mut self, parse: fn(&mut Self) -> Result<f64, String>) -> Result<f64, String> {
        if self.depth >= MAX_DEPTH {
            return Err("expression nested too deeply".to_string());
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn expr(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.power()?;
        while let Some(op @ ('*' | '/' | '%')) = self.peek() {
            self.pos += 1;
            let rhs = self.power()?;
            if op != '*' && rhs == 0.0 {
                return Err("division by zero".to_string());
            }
            value = match op {
                '*' => value * rhs,
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    // right-associative
    fn power(&mut self) -> Result<f64, String> {
        let base = self.unary()?;
        if self.peek() == Some('^') {
            self.pos += 1;
            let exponent = self.nested(Self::power)?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn unary(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some('-') => {
                self.pos += 1;
                Ok(-self.nested(Self::unary)?)
            }
            Some('+') => {
                self.pos += 1;
                self.nested(Self::unary)
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                let value = self.nested(Self::expr)?;
                if self.peek() != Some(')') {
                    return Err("missing closing parenthesis".to_string());
                }
                self.pos += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
                    self.pos += 1;
                }
                let text: String = self.chars[start..self.pos].iter().collect();
                text.parse::<f64>()
                    .map_err(|_| format!("invalid number '{}'", text))
            }
            Some(c) => Err(format!("unexpected '{}' at position {}", c, self.pos)),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_precedence_and_parentheses() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("2 ^ 3 ^ 2").unwrap(), 512.0);
        assert_eq!(evaluate("-4 + 10 % 4").unwrap(), -2.0);
        assert_eq!(evaluate("1.5 * 2").unwrap(), 3.0);
    }

    #[test]
    fn reports_errors() {
        assert!(evaluate("").is_err());
        assert!(evaluate("1 / 0").unwrap_err().contains("division by zero"));
        assert!(evaluate("(1 + 2").unwrap_err().contains("parenthesis"));
        assert!(evaluate("2 $ 3").is_err());
        assert!(evaluate("1..2").is_err());
    }

    #[test]
    fn rejects_deep_nesting_without_overflow() {
        let parens = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(evaluate(&parens).unwrap_err(), "expression nested too deeply");
        let signs = format!("{}1", "-".repeat(100_000));
        assert_eq!(evaluate(&signs).unwrap_err(), "expression nested too deeply");
        let powers = vec!["2"; 100_000].join("^");
        assert_eq!(evaluate(&powers).unwrap_err(), "expression nested too deeply");

        let shallow = format!("{}7{}", "(".repeat(32), ")".repeat(32));
        assert_eq!(evaluate(&shallow).unwrap(), 7.0);
    }

    #[tokio::test]
    async fn calculate_tool_formats_integers() {
        let out = Calculate.call(json!({"expression": "6 * 7"})).await.unwrap();
        assert_eq!(out, "42");
        let out = Calculate.call(json!({"expression": "1 / 4"})).await.unwrap();
        assert_eq!(out, "0.25");
        assert!(Calculate.call(json!({})).await.is_err());
    }

    #[tokio::test]
    async fn weather_requires_city() {
        let out = GetWeather.call(json!({"city": "Hangzhou"})).await.unwrap();
        assert!(out.starts_with("Hangzhou"));
        assert!(GetWeather.call(json!({"city": " "})).await.is_err());
    }
}
