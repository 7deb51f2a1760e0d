//! Safe arithmetic expression evaluator.
//!
//! Supports `+ - * / // % **`, integer xor `^`, unary signs, parentheses,
//! list literals for `min`/`max`/`sum`, the usual math functions and the
//! constants `pi`, `e`, `tau`, `inf`. Nothing else is evaluated.

use super::{parse_args, ParamKind, ParameterSpec, Tool, ToolDescriptor, ToolError, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;

/// Deepest allowed nesting of parentheses, brackets and calls.
const MAX_DEPTH: usize = 100;

/// Calculator tool (`evaluate_expression`).
pub struct Calculator {
    descriptor: ToolDescriptor,
}

#[derive(Debug, Deserialize)]
struct CalculatorArgs {
    expression: String,
}

impl Calculator {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                "evaluate_expression",
                "Perform mathematical calculations safely. Handles arithmetic (+, -, *, /, %, //, **), \
                functions (sqrt, sin, cos, tan, log, exp, abs, round, min, max, sum, factorial, ...) \
                and constants (pi, e, tau, inf). Examples: \"2 + 3 * 4\", \"sqrt(16)\", \"sin(pi/2)\".",
                vec![ParameterSpec::required(
                    "expression",
                    ParamKind::String,
                    "Mathematical expression as a string",
                )],
            ),
        }
    }
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for Calculator {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, args: serde_json::Value) -> ToolOutput {
        let args: CalculatorArgs = parse_args(args)?;
        evaluate(&args.expression)
    }
}

/// Evaluate an expression and format the result the way the model expects.
pub fn evaluate(expression: &str) -> ToolOutput {
    let expression = expression.trim();
    if expression.is_empty() {
        return Err(ToolError::Evaluation("Empty expression provided".to_string()));
    }

    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        return Err(syntax_error());
    }

    match value {
        Value::Number(n) => Ok(format_number(n)),
        Value::List(items) => Ok(format!(
            "[{}]",
            items.iter().map(|n| format_number(*n)).collect::<Vec<_>>().join(", ")
        )),
    }
}

fn syntax_error() -> ToolError {
    ToolError::Evaluation("Invalid mathematical expression syntax".to_string())
}

fn domain_error() -> ToolError {
    ToolError::Evaluation("math domain error".to_string())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    DoubleStar,
    Caret,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ToolError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Exponent part, e.g. 1e-3
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let number = literal.parse::<f64>().map_err(|_| syntax_error())?;
                tokens.push(Token::Number(number));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::DoubleStar);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '/' => {
                if chars.get(i + 1) == Some(&'/') {
                    tokens.push(Token::DoubleSlash);
                    i += 2;
                } else {
                    tokens.push(Token::Slash);
                    i += 1;
                }
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            other => {
                return Err(ToolError::Unsupported(format!("character '{}'", other)));
            }
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Number(f64),
    List(Vec<f64>),
}

impl Value {
    fn number(self) -> Result<f64, ToolError> {
        match self {
            Value::Number(n) => Ok(n),
            Value::List(_) => Err(ToolError::Evaluation(
                "A list can only be passed to min, max or sum".to_string(),
            )),
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    /// Run `f` one nesting level deeper, refusing past [`MAX_DEPTH`].
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, ToolError>) -> Result<T, ToolError> {
        if self.depth >= MAX_DEPTH {
            return Err(ToolError::Evaluation("expression nested too deeply".to_string()));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn expect(&mut self, token: Token) -> Result<(), ToolError> {
        match self.advance() {
            Some(t) if t == token => Ok(()),
            _ => Err(syntax_error()),
        }
    }

    // xor binds loosest, below + and -
    fn expression(&mut self) -> Result<Value, ToolError> {
        let mut left = self.sum()?;
        while self.peek() == Some(&Token::Caret) {
            self.advance();
            let right = self.sum()?.number()?;
            let left_n = left.number()?;
            if left_n.fract() != 0.0 || right.fract() != 0.0 {
                return Err(ToolError::Unsupported("xor on non-integer operands".to_string()));
            }
            left = Value::Number(((left_n as i64) ^ (right as i64)) as f64);
        }
        Ok(left)
    }

    fn sum(&mut self) -> Result<Value, ToolError> {
        let mut left = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    let right = self.term()?.number()?;
                    left = Value::Number(left.number()? + right);
                }
                Some(Token::Minus) => {
                    self.advance();
                    let right = self.term()?.number()?;
                    left = Value::Number(left.number()? - right);
                }
                _ => return Ok(left),
            }
        }
    }

    fn term(&mut self) -> Result<Value, ToolError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) | Some(Token::Slash) | Some(Token::DoubleSlash)
                | Some(Token::Percent) => self.advance(),
                _ => return Ok(left),
            };
            let right = self.unary()?.number()?;
            let l = left.number()?;
            let result = match op {
                Some(Token::Star) => l * right,
                Some(Token::Slash) => {
                    if right == 0.0 {
                        return Err(ToolError::Evaluation("Division by zero".to_string()));
                    }
                    l / right
                }
                Some(Token::DoubleSlash) => {
                    if right == 0.0 {
                        return Err(ToolError::Evaluation("Division by zero".to_string()));
                    }
                    (l / right).floor()
                }
                _ => {
                    if right == 0.0 {
                        return Err(ToolError::Evaluation("Division by zero".to_string()));
                    }
                    // Result takes the sign of the divisor
                    l - right * (l / right).floor()
                }
            };
            left = Value::Number(result);
        }
    }

    fn unary(&mut self) -> Result<Value, ToolError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                Ok(Value::Number(-self.nested(Self::unary)?.number()?))
            }
            Some(Token::Plus) => {
                self.advance();
                Ok(Value::Number(self.nested(Self::unary)?.number()?))
            }
            _ => self.power(),
        }
    }

    // `**` is right-associative and binds tighter than a leading sign: -2**2 == -4
    fn power(&mut self) -> Result<Value, ToolError> {
        let base = self.primary()?;
        if self.peek() == Some(&Token::DoubleStar) {
            self.advance();
            let exponent = self.nested(Self::unary)?.number()?;
            let base = base.number()?;
            if base == 0.0 && exponent < 0.0 {
                return Err(ToolError::Evaluation("Division by zero".to_string()));
            }
            let result = base.powf(exponent);
            if result.is_nan() {
                return Err(domain_error());
            }
            return Ok(Value::Number(result));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Value, ToolError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Value::Number(n)),
            Some(Token::LParen) => self.nested(|p| {
                let value = p.expression()?;
                p.expect(Token::RParen)?;
                Ok(value)
            }),
            Some(Token::LBracket) => {
                let items = self.nested(|p| p.arguments(Token::RBracket))?;
                let numbers = items
                    .into_iter()
                    .map(Value::number)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(numbers))
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    if !FUNCTIONS.contains(&name.as_str()) {
                        return Err(ToolError::Unsupported(format!("function {}", name)));
                    }
                    self.advance();
                    let args = self.nested(|p| p.arguments(Token::RParen))?;
                    call_function(&name, args)
                } else {
                    constant(&name)
                }
            }
            _ => Err(syntax_error()),
        }
    }

    /// Comma-separated expressions up to the closing token.
    fn arguments(&mut self, close: Token) -> Result<Vec<Value>, ToolError> {
        let mut args = Vec::new();
        if self.peek() == Some(&close) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            match self.advance() {
                Some(Token::Comma) => continue,
                Some(t) if t == close => return Ok(args),
                _ => return Err(syntax_error()),
            }
        }
    }
}

const FUNCTIONS: &[&str] = &[
    "abs", "round", "min", "max", "sum", "pow", "sqrt", "sin", "cos", "tan", "asin", "acos",
    "atan", "sinh", "cosh", "tanh", "log", "log10", "log2", "exp", "ceil", "floor", "factorial",
    "degrees", "radians",
];

fn constant(name: &str) -> Result<Value, ToolError> {
    let value = match name {
        "pi" => std::f64::consts::PI,
        "e" => std::f64::consts::E,
        "tau" => std::f64::consts::TAU,
        "inf" => f64::INFINITY,
        _ => return Err(ToolError::Evaluation(format!("Undefined variable: {}", name))),
    };
    Ok(Value::Number(value))
}

/// Flatten `f([a, b])` and `f(a, b)` into one list of numbers.
fn collect_numbers(args: Vec<Value>) -> Result<Vec<f64>, ToolError> {
    match args.as_slice() {
        [Value::List(items)] => Ok(items.clone()),
        _ => args.into_iter().map(Value::number).collect(),
    }
}

fn unary_fn(name: &str, args: Vec<Value>, f: fn(f64) -> f64) -> Result<Value, ToolError> {
    let [arg] = <[Value; 1]>::try_from(args).map_err(|_| {
        ToolError::Evaluation(format!("{}() takes exactly one argument", name))
    })?;
    let result = f(arg.number()?);
    if result.is_nan() {
        return Err(domain_error());
    }
    Ok(Value::Number(result))
}

fn call_function(name: &str, args: Vec<Value>) -> Result<Value, ToolError> {
    match name {
        "abs" => unary_fn(name, args, f64::abs),
        "sqrt" => unary_fn(name, args, f64::sqrt),
        "sin" => unary_fn(name, args, f64::sin),
        "cos" => unary_fn(name, args, f64::cos),
        "tan" => unary_fn(name, args, f64::tan),
        "asin" => unary_fn(name, args, f64::asin),
        "acos" => unary_fn(name, args, f64::acos),
        "atan" => unary_fn(name, args, f64::atan),
        "sinh" => unary_fn(name, args, f64::sinh),
        "cosh" => unary_fn(name, args, f64::cosh),
        "tanh" => unary_fn(name, args, f64::tanh),
        "log10" => positive_log(name, args, f64::log10),
        "log2" => positive_log(name, args, f64::log2),
        "exp" => unary_fn(name, args, f64::exp),
        "ceil" => unary_fn(name, args, f64::ceil),
        "floor" => unary_fn(name, args, f64::floor),
        "degrees" => unary_fn(name, args, f64::to_degrees),
        "radians" => unary_fn(name, args, f64::to_radians),
        "log" => match args.len() {
            1 => positive_log(name, args, f64::ln),
            2 => {
                let numbers = collect_numbers(args)?;
                if numbers[0] <= 0.0 || numbers[1] <= 0.0 || numbers[1] == 1.0 {
                    return Err(domain_error());
                }
                Ok(Value::Number(numbers[0].log(numbers[1])))
            }
            _ => Err(ToolError::Evaluation("log() takes one or two arguments".to_string())),
        },
        "pow" => {
            let numbers = collect_numbers(args)?;
            if numbers.len() != 2 {
                return Err(ToolError::Evaluation("pow() takes exactly two arguments".to_string()));
            }
            let result = numbers[0].powf(numbers[1]);
            if result.is_nan() {
                return Err(domain_error());
            }
            Ok(Value::Number(result))
        }
        "round" => {
            let numbers = collect_numbers(args)?;
            match numbers.as_slice() {
                [x] => Ok(Value::Number(x.round_ties_even())),
                [x, digits] => {
                    let scale = 10f64.powi(*digits as i32);
                    Ok(Value::Number((x * scale).round_ties_even() / scale))
                }
                _ => Err(ToolError::Evaluation("round() takes one or two arguments".to_string())),
            }
        }
        "min" | "max" => {
            let numbers = collect_numbers(args)?;
            if numbers.is_empty() {
                return Err(ToolError::Evaluation(format!("{}() arg is an empty sequence", name)));
            }
            let fold: fn(f64, f64) -> f64 = if name == "min" { f64::min } else { f64::max };
            Ok(Value::Number(numbers[1..].iter().fold(numbers[0], |acc, n| fold(acc, *n))))
        }
        "sum" => Ok(Value::Number(collect_numbers(args)?.iter().sum())),
        "factorial" => {
            let numbers = collect_numbers(args)?;
            let [n] = numbers.as_slice() else {
                return Err(ToolError::Evaluation("factorial() takes exactly one argument".to_string()));
            };
            if *n < 0.0 || n.fract() != 0.0 {
                return Err(ToolError::Evaluation(
                    "factorial() only accepts non-negative integral values".to_string(),
                ));
            }
            if *n > 170.0 {
                return Err(ToolError::Evaluation("factorial() result too large".to_string()));
            }
            Ok(Value::Number((1..=(*n as u64)).fold(1.0, |acc, k| acc * k as f64)))
        }
        _ => Err(ToolError::Unsupported(format!("function {}", name))),
    }
}

fn positive_log(name: &str, args: Vec<Value>, f: fn(f64) -> f64) -> Result<Value, ToolError> {
    let numbers = collect_numbers(args)?;
    match numbers.as_slice() {
        [x] if *x > 0.0 => Ok(Value::Number(f(*x))),
        [_] => Err(domain_error()),
        _ => Err(ToolError::Evaluation(format!("{}() takes exactly one argument", name))),
    }
}

/// Integers print without a decimal point; other values keep ten significant digits.
fn format_number(n: f64) -> String {
    if n.is_infinite() {
        return if n > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }
    if n.fract() == 0.0 && n.abs() < 1e16 {
        return format!("{}", n as i64);
    }

    let magnitude = n.abs().log10().floor() as i32;
    if (-5..10).contains(&magnitude) {
        let decimals = (9 - magnitude).max(0) as usize;
        let fixed = format!("{:.*}", decimals, n);
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        let sci = format!("{:.9e}", n);
        match sci.split_once('e') {
            Some((mantissa, exp)) => {
                let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
                format!("{}e{}", mantissa, exp)
            }
            None => sci,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str) -> String {
        evaluate(expr).unwrap()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("2 + 3 * 4"), "14");
        assert_eq!(eval("(2 + 3) * 4"), "20");
        assert_eq!(eval("2**3"), "8");
        assert_eq!(eval("-2**2"), "-4");
        assert_eq!(eval("2**-1"), "0.5");
        assert_eq!(eval("2**3**2"), "512");
    }

    #[test]
    fn test_floor_division_and_modulo() {
        assert_eq!(eval("7 // 2"), "3");
        assert_eq!(eval("-7 // 2"), "-4");
        assert_eq!(eval("-7 % 3"), "2");
        assert_eq!(eval("10 / 4"), "2.5");
    }

    #[test]
    fn test_functions_and_constants() {
        assert_eq!(eval("sqrt(16)"), "4");
        assert_eq!(eval("sin(pi/2)"), "1");
        assert_eq!(eval("log(e)"), "1");
        assert_eq!(eval("log(8, 2)"), "3");
        assert_eq!(eval("max([1, 7, 3])"), "7");
        assert_eq!(eval("min(4, 2, 9)"), "2");
        assert_eq!(eval("sum([1, 2, 3.5])"), "6.5");
        assert_eq!(eval("factorial(5)"), "120");
        assert_eq!(eval("round(2.5)"), "2");
        assert_eq!(eval("round(3.14159, 2)"), "3.14");
        assert_eq!(eval("5 ^ 3"), "6");
    }

    #[test]
    fn test_ten_significant_digits() {
        assert_eq!(eval("1/3"), "0.3333333333");
        assert_eq!(eval("sqrt(2)"), "1.414213562");
    }

    #[test]
    fn test_errors_are_values() {
        assert_eq!(
            evaluate("1/0"),
            Err(ToolError::Evaluation("Division by zero".to_string()))
        );
        assert!(matches!(evaluate("sqrt(-1)"), Err(ToolError::Evaluation(_))));
        assert!(matches!(evaluate("open('x')"), Err(ToolError::Unsupported(_))));
        assert!(matches!(evaluate("__import__(os)"), Err(ToolError::Unsupported(_))));
        assert!(matches!(evaluate("x + 1"), Err(ToolError::Evaluation(_))));
        assert!(matches!(evaluate("2 +"), Err(ToolError::Evaluation(_))));
        assert!(matches!(evaluate("   "), Err(ToolError::Evaluation(_))));
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(
            evaluate(&parens),
            Err(ToolError::Evaluation("expression nested too deeply".to_string()))
        );

        let calls = format!("{}1{}", "abs(".repeat(5_000), ")".repeat(5_000));
        assert!(evaluate(&calls).is_err());
        let lists = format!("{}1{}", "sum([".repeat(5_000), "])".repeat(5_000));
        assert!(evaluate(&lists).is_err());
        assert!(evaluate(&format!("{}1", "-".repeat(10_000))).is_err());
        assert!(evaluate(&format!("2{}", "**2".repeat(10_000))).is_err());

        let shallow = format!("{}7{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(eval(&shallow), "7");
        assert_eq!(eval("--3"), "3");
    }

    #[tokio::test]
    async fn test_tool_invocation() {
        let calculator = Calculator::new();
        let output = calculator
            .invoke(serde_json::json!({"expression": "6 * 7"}))
            .await;
        assert_eq!(output, Ok("42".to_string()));

        let bad = calculator.invoke(serde_json::json!({"expr": "6 * 7"})).await;
        assert!(matches!(bad, Err(ToolError::InvalidArguments(_))));
    }
}
