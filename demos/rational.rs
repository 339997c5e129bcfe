//! The rational-number example grammar (SPEC_FULL §10.4, spec §8 scenario S3):
//! arithmetic over exact rationals represented as sign + integer numerator and
//! denominator, reduced to lowest terms at every operation. Grounded directly
//! on `examples/original_source/bootpeg_examples/math.py`'s `Rational`
//! NamedTuple and its `gcd`/`fraction`/`neg`/`add`/`sub`/`mul`/`div` functions,
//! re-expressed over pegboot's capture/transform actions instead of
//! `apegs_globals`-style keyword actions.

use std::fmt;
use std::io::{self, Write};

use pegboot::dialect::bpeg::Bpeg;
use pegboot::{create_parser, ActionTable, Capture, ParserOptions, Value};

/// A reduced fraction with an explicit sign, mirroring `math.py`'s
/// `Rational(negative, numerator, denominator)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rational {
    negative: bool,
    numerator: i64,
    denominator: i64,
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.negative { "-" } else { "" };
        if self.denominator == 1 {
            write!(f, "{sign}{}", self.numerator)
        } else {
            write!(f, "{sign}{}/{}", self.numerator, self.denominator)
        }
    }
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a, b);
    while b > 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

fn fraction(numerator: i64, denominator: i64) -> Rational {
    let negative = (numerator < 0) ^ (denominator < 0);
    let numerator = numerator.abs();
    let denominator = denominator.abs();
    let divisor = gcd(numerator, denominator).max(1);
    Rational {
        negative,
        numerator: numerator / divisor,
        denominator: denominator / divisor,
    }
}

fn sign(r: Rational) -> i64 {
    if r.negative {
        -1
    } else {
        1
    }
}

fn neg(of: Rational) -> Rational {
    Rational {
        negative: !of.negative,
        ..of
    }
}

fn add(lhs: Rational, rhs: Rational) -> Rational {
    fraction(
        sign(lhs) * lhs.numerator * rhs.denominator + sign(rhs) * rhs.numerator * lhs.denominator,
        lhs.denominator * rhs.denominator,
    )
}

fn sub(lhs: Rational, rhs: Rational) -> Rational {
    add(lhs, neg(rhs))
}

fn inv(of: Rational) -> Rational {
    Rational {
        negative: of.negative,
        numerator: of.denominator,
        denominator: of.numerator,
    }
}

fn mul(lhs: Rational, rhs: Rational) -> Rational {
    let numerator = lhs.numerator * rhs.numerator;
    let denominator = lhs.denominator * rhs.denominator;
    let divisor = gcd(numerator, denominator).max(1);
    Rational {
        negative: lhs.negative != rhs.negative,
        numerator: numerator / divisor,
        denominator: denominator / divisor,
    }
}

fn div(lhs: Rational, rhs: Rational) -> Rational {
    mul(lhs, inv(rhs))
}

/// Parse a literal decimal such as `"12.3"` (no sign: the grammar treats a
/// leading `-` as unary negation of a positive number).
fn parse_decimal(literal: &str) -> Rational {
    match literal.find('.') {
        None => Rational {
            negative: false,
            numerator: literal.parse().unwrap_or(0),
            denominator: 1,
        },
        Some(dot) => {
            let digits = format!("{}{}", &literal[..dot], &literal[dot + 1..]);
            let numerator: i64 = digits.parse().unwrap_or(0);
            let scale = 10_i64.pow((literal.len() - dot - 1) as u32);
            fraction(numerator, scale)
        }
    }
}

fn parse_integer(literal: &str) -> Rational {
    Rational {
        negative: false,
        numerator: literal.parse().unwrap_or(0),
        denominator: 1,
    }
}

/// The rational-arithmetic grammar, written in the primary surface syntax.
/// `factor` handles unary negation and parenthesized grouping; `term`/`expr`
/// are the usual `*`//`/` and `+`/`-` precedence tiers.
pub const GRAMMAR: &str = indoc::indoc! {r#"
    digit:
        | "0" - "9"

    integer:
        | value=digit+ { integer }

    decimal:
        | value=(digit+ "." digit+) { decimal }

    number:
        | decimal
        | integer

    factor:
        | "(" (" " | "") expr=expr (" " | "") ")" { paren_group }
        | "-" (" " | "") expr=factor { neg }
        | number

    term:
        | lhs=term (" " | "") "*" (" " | "") rhs=factor { mul }
        | lhs=term (" " | "") "/" (" " | "") rhs=factor { div }
        | factor

    expr:
        | lhs=expr (" " | "") "+" (" " | "") rhs=term { add }
        | lhs=expr (" " | "") "-" (" " | "") rhs=term { sub }
        | term

    top:
        | expr
"#};

fn raw_capture(action: &str, caps: &[Capture<String, Rational>], name: &str) -> Result<String, pegboot::error::ActionError> {
    match pegboot::action::capture_value(caps, name) {
        Some(Value::Raw(s)) => Ok(s.clone()),
        _ => Err(action_error(action, format!("expected a raw capture {name:?}"))),
    }
}

fn rational_capture(action: &str, caps: &[Capture<String, Rational>], name: &str) -> Result<Rational, pegboot::error::ActionError> {
    match pegboot::action::capture_value(caps, name) {
        Some(Value::Action(r)) => Ok(**r),
        _ => Err(action_error(action, format!("expected a computed capture {name:?}"))),
    }
}

fn action_error(action: &str, message: String) -> pegboot::error::ActionError {
    pegboot::error::ActionError {
        action: action.into(),
        message,
    }
}

/// The action table this grammar needs (mirrors `math.py`'s `math_actions`
/// dict: `integer`, `decimal`, plus the five arithmetic operations). Every
/// action is registered with its declared capture names, so bind-time
/// signature checking (spec §4.3 property 8) actually runs.
pub fn actions() -> ActionTable<String, Rational> {
    let mut table = ActionTable::new();
    table.register_checked("integer", ["value"], |caps| {
        Ok(parse_integer(&raw_capture("integer", caps, "value")?))
    });
    table.register_checked("decimal", ["value"], |caps| {
        Ok(parse_decimal(&raw_capture("decimal", caps, "value")?))
    });
    table.register_checked("paren_group", ["expr"], |caps| {
        rational_capture("paren_group", caps, "expr")
    });
    table.register_checked("neg", ["expr"], |caps| {
        Ok(neg(rational_capture("neg", caps, "expr")?))
    });
    table.register_checked("mul", ["lhs", "rhs"], |caps| {
        Ok(mul(
            rational_capture("mul", caps, "lhs")?,
            rational_capture("mul", caps, "rhs")?,
        ))
    });
    table.register_checked("div", ["lhs", "rhs"], |caps| {
        Ok(div(
            rational_capture("div", caps, "lhs")?,
            rational_capture("div", caps, "rhs")?,
        ))
    });
    table.register_checked("add", ["lhs", "rhs"], |caps| {
        Ok(add(
            rational_capture("add", caps, "lhs")?,
            rational_capture("add", caps, "rhs")?,
        ))
    });
    table.register_checked("sub", ["lhs", "rhs"], |caps| {
        Ok(sub(
            rational_capture("sub", caps, "lhs")?,
            rational_capture("sub", caps, "rhs")?,
        ))
    });
    table
}

pub fn interpret(expression: &str) -> Result<Rational, String> {
    let parser = create_parser::<String, Rational>(
        GRAMMAR,
        &Bpeg::new(),
        actions(),
        ParserOptions::default(),
    )
    .map_err(|err| err.to_string())?;
    parser
        .parse_report(&expression.to_string())
        .map(|value| match value {
            Value::Action(r) => *r,
            _ => unreachable!("top is always transformed into a Rational"),
        })
        .map_err(|err| err.to_string())
}

fn main() {
    eprintln!("Examples: rational [pegboot]");
    eprintln!("Type 'exit' to exit");
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!(">>> ");
        io::stdout().flush().ok();
        line.clear();
        if stdin.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let expression = line.trim_end_matches('\n');
        if expression == "exit" {
            break;
        }
        match interpret(expression) {
            Ok(value) => println!("{value}"),
            Err(message) => println!("{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_two_integers() {
        assert_eq!(interpret("1 + 2").unwrap().to_string(), "3");
    }

    #[test]
    fn multiplies_a_decimal_by_a_negative_integer() {
        assert_eq!(interpret("3.5 * -2").unwrap().to_string(), "-7");
    }

    #[test]
    fn respects_precedence_and_left_associativity() {
        assert_eq!(interpret("12.5 + 3.5 - 2").unwrap().to_string(), "14");
    }

    #[test]
    fn groups_with_parentheses() {
        assert_eq!(interpret("(1 + 2) * 3").unwrap().to_string(), "9");
    }
}
