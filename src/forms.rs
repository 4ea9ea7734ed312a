//! The fixed form set of the language.
//!
//! This module enumerates every special form and built-in math operator as
//! closed enums rather than a runtime-mutable table: the form set never
//! changes, so exhaustive matching in the evaluator catches a missing
//! handler at compile time.
//!
//! ## Special forms vs math operators
//!
//! - **Special forms** control evaluation of their arguments (`quote`
//!   returns its argument untouched, `if` evaluates exactly one branch).
//!   Their handlers live in the evaluator, which owns the environment.
//! - **Math operators** (`+ - * / mod >`) always receive two evaluated
//!   integer operands and are applied here, with checked arithmetic.
//!
//! ## Arity contracts
//!
//! Every form carries an [`Arity`] counted as the whole-form length, head
//! symbol included: `(quote x)` has length 2, `(if c a b)` has length 4.
//! Violations surface as [`Error::Arity`] naming the form.

use crate::Error;
use crate::ast::{IntegerType, Value};

/// Expected length of a form, head symbol included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly n elements
    Exact(usize),
    /// At least n elements
    AtLeast(usize),
}

impl Arity {
    /// Check a form length against this contract.
    pub(crate) fn validate(self, form: &str, got: usize) -> Result<(), Error> {
        let (expected, ok) = match self {
            Arity::Exact(n) => (n, got == n),
            Arity::AtLeast(n) => (n, got >= n),
        };
        if ok {
            Ok(())
        } else {
            Err(Error::arity(form, expected, got))
        }
    }
}

/// The special forms of the language, one variant per form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    Quote,
    Atom,
    Eq,
    If,
    Define,
    Lambda,
    Defn,
    Cons,
    Head,
    Tail,
    Empty,
    Cond,
    Let,
}

impl SpecialForm {
    /// Resolve a head symbol to a special form, if it names one.
    pub fn from_name(name: &str) -> Option<SpecialForm> {
        match name {
            "quote" => Some(SpecialForm::Quote),
            "atom" => Some(SpecialForm::Atom),
            "eq" => Some(SpecialForm::Eq),
            "if" => Some(SpecialForm::If),
            "define" => Some(SpecialForm::Define),
            "lambda" => Some(SpecialForm::Lambda),
            "defn" => Some(SpecialForm::Defn),
            "cons" => Some(SpecialForm::Cons),
            "head" => Some(SpecialForm::Head),
            "tail" => Some(SpecialForm::Tail),
            "empty" => Some(SpecialForm::Empty),
            "cond" => Some(SpecialForm::Cond),
            "let" => Some(SpecialForm::Let),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SpecialForm::Quote => "quote",
            SpecialForm::Atom => "atom",
            SpecialForm::Eq => "eq",
            SpecialForm::If => "if",
            SpecialForm::Define => "define",
            SpecialForm::Lambda => "lambda",
            SpecialForm::Defn => "defn",
            SpecialForm::Cons => "cons",
            SpecialForm::Head => "head",
            SpecialForm::Tail => "tail",
            SpecialForm::Empty => "empty",
            SpecialForm::Cond => "cond",
            SpecialForm::Let => "let",
        }
    }

    /// Whole-form arity contract for this form.
    pub(crate) fn arity(self) -> Arity {
        match self {
            SpecialForm::Quote
            | SpecialForm::Atom
            | SpecialForm::Head
            | SpecialForm::Tail
            | SpecialForm::Empty => Arity::Exact(2),
            SpecialForm::Eq
            | SpecialForm::Define
            | SpecialForm::Lambda
            | SpecialForm::Cons
            | SpecialForm::Let => Arity::Exact(3),
            SpecialForm::If | SpecialForm::Defn => Arity::Exact(4),
            // (cond) with no clauses is valid and evaluates to #f
            SpecialForm::Cond => Arity::AtLeast(1),
        }
    }
}

/// The built-in arithmetic and comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Gt,
}

impl MathOp {
    /// Resolve a head symbol to a math operator, if it names one.
    pub fn from_name(name: &str) -> Option<MathOp> {
        match name {
            "+" => Some(MathOp::Add),
            "-" => Some(MathOp::Sub),
            "*" => Some(MathOp::Mul),
            "/" => Some(MathOp::Div),
            "mod" => Some(MathOp::Mod),
            ">" => Some(MathOp::Gt),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MathOp::Add => "+",
            MathOp::Sub => "-",
            MathOp::Mul => "*",
            MathOp::Div => "/",
            MathOp::Mod => "mod",
            MathOp::Gt => ">",
        }
    }

    /// Apply this operator to two evaluated operands.
    ///
    /// Operands must both be integers. Arithmetic is checked: overflow and
    /// division by zero are reported as errors, never panics. Division and
    /// modulo use flooring semantics (quotient rounds toward negative
    /// infinity, remainder takes the divisor's sign).
    pub(crate) fn apply(self, lhs: &Value, rhs: &Value) -> Result<Value, Error> {
        let (Value::Integer(a), Value::Integer(b)) = (lhs, rhs) else {
            return Err(Error::Type(
                "math operation requires integer operands".to_owned(),
            ));
        };
        let (a, b) = (*a, *b);

        let result = match self {
            MathOp::Add => a.checked_add(b),
            MathOp::Sub => a.checked_sub(b),
            MathOp::Mul => a.checked_mul(b),
            MathOp::Div => {
                if b == 0 {
                    return Err(Error::Type("division by zero".to_owned()));
                }
                floor_div(a, b)
            }
            MathOp::Mod => {
                if b == 0 {
                    return Err(Error::Type("modulo by zero".to_owned()));
                }
                floor_mod(a, b)
            }
            MathOp::Gt => return Ok(Value::Boolean(a > b)),
        };

        result
            .map(Value::Integer)
            .ok_or_else(|| Error::Type(format!("integer overflow in {}", self.name())))
    }
}

/// Flooring division: the quotient rounds toward negative infinity.
/// `None` on overflow (IntegerType::MIN / -1).
fn floor_div(a: IntegerType, b: IntegerType) -> Option<IntegerType> {
    let quotient = a.checked_div(b)?;
    let remainder = a % b;
    if remainder != 0 && (remainder < 0) != (b < 0) {
        // Truncation rounded toward zero; floor is one step further down.
        // No underflow: the quotient only equals MIN when the remainder is 0.
        Some(quotient - 1)
    } else {
        Some(quotient)
    }
}

/// Flooring modulo: the remainder takes the divisor's sign.
/// `None` on overflow (IntegerType::MIN mod -1).
fn floor_mod(a: IntegerType, b: IntegerType) -> Option<IntegerType> {
    let remainder = a.checked_rem(b)?;
    if remainder != 0 && (remainder < 0) != (b < 0) {
        Some(remainder + b)
    } else {
        Some(remainder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::val;

    const ALL_FORMS: [SpecialForm; 13] = [
        SpecialForm::Quote,
        SpecialForm::Atom,
        SpecialForm::Eq,
        SpecialForm::If,
        SpecialForm::Define,
        SpecialForm::Lambda,
        SpecialForm::Defn,
        SpecialForm::Cons,
        SpecialForm::Head,
        SpecialForm::Tail,
        SpecialForm::Empty,
        SpecialForm::Cond,
        SpecialForm::Let,
    ];

    #[test]
    fn test_special_form_names_round_trip() {
        for form in ALL_FORMS {
            assert_eq!(SpecialForm::from_name(form.name()), Some(form));
        }
        assert_eq!(SpecialForm::from_name("quota"), None);
        assert_eq!(SpecialForm::from_name(""), None);
        // Math operators are not special forms
        assert_eq!(SpecialForm::from_name("+"), None);
    }

    #[test]
    fn test_math_op_names_round_trip() {
        for op in [
            MathOp::Add,
            MathOp::Sub,
            MathOp::Mul,
            MathOp::Div,
            MathOp::Mod,
            MathOp::Gt,
        ] {
            assert_eq!(MathOp::from_name(op.name()), Some(op));
        }
        assert_eq!(MathOp::from_name("<"), None);
        assert_eq!(MathOp::from_name("modulo"), None);
    }

    #[test]
    fn test_arity_validation() {
        assert!(Arity::Exact(2).validate("quote", 2).is_ok());
        assert!(Arity::AtLeast(1).validate("cond", 5).is_ok());

        match Arity::Exact(4).validate("if", 3) {
            Err(Error::Arity {
                form,
                expected,
                got,
            }) => {
                assert_eq!(form, "if");
                assert_eq!(expected, 4);
                assert_eq!(got, 3);
            }
            other => panic!("expected arity error, got {other:?}"),
        }

        assert!(Arity::AtLeast(1).validate("cond", 0).is_err());
    }

    #[test]
    fn test_math_data_driven() {
        // (op, lhs, rhs, expected)
        let cases = vec![
            (MathOp::Add, 2, 3, val(5)),
            (MathOp::Sub, 2, 3, val(-1)),
            (MathOp::Mul, -4, 3, val(-12)),
            (MathOp::Div, 7, 2, val(3)),
            (MathOp::Mod, 7, 2, val(1)),
            (MathOp::Gt, 3, 2, val(true)),
            (MathOp::Gt, 2, 3, val(false)),
            (MathOp::Gt, 2, 2, val(false)),
            // Flooring semantics on negative operands: the quotient rounds
            // toward negative infinity and the remainder takes the
            // divisor's sign.
            (MathOp::Div, -7, 2, val(-4)),
            (MathOp::Mod, -7, 2, val(1)),
            (MathOp::Div, 7, -2, val(-4)),
            (MathOp::Mod, 7, -2, val(-1)),
            (MathOp::Div, -7, -2, val(3)),
            (MathOp::Mod, -7, -2, val(-1)),
            (MathOp::Div, -8, 2, val(-4)),
            (MathOp::Mod, -8, 2, val(0)),
        ];

        for (op, a, b, expected) in cases {
            let result = op.apply(&val(a), &val(b));
            assert_eq!(
                result.as_ref().ok(),
                Some(&expected),
                "({} {a} {b}) -> {result:?}",
                op.name()
            );
        }
    }

    #[test]
    fn test_math_failures() {
        // Division and modulo by zero fail, never panic
        assert!(MathOp::Div.apply(&val(1), &val(0)).is_err());
        assert!(MathOp::Mod.apply(&val(1), &val(0)).is_err());

        // Overflow is an error, not a wrap
        assert!(MathOp::Add.apply(&val(i64::MAX), &val(1)).is_err());
        assert!(MathOp::Sub.apply(&val(i64::MIN), &val(1)).is_err());
        assert!(MathOp::Mul.apply(&val(i64::MAX / 2 + 1), &val(2)).is_err());
        assert!(MathOp::Div.apply(&val(i64::MIN), &val(-1)).is_err());
        assert!(MathOp::Mod.apply(&val(i64::MIN), &val(-1)).is_err());

        // Non-integer operands are type errors for every operator
        for op in [MathOp::Add, MathOp::Div, MathOp::Gt] {
            match op.apply(&val("one"), &val(2)) {
                Err(Error::Type(msg)) => {
                    assert!(msg.contains("integer operands"), "unexpected message: {msg}")
                }
                other => panic!("expected type error, got {other:?}"),
            }
            assert!(op.apply(&val(1), &val(true)).is_err());
        }
    }
}
