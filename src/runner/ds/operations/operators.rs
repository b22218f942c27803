//! The operator half of the value adapter: `binary_op` and `unary_op`
//! dispatch over the operator enums the parser produces.

use crate::parser::ast::{BinaryOperator, UnaryOperator};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::test_and_comparison::{
    compare_values, loose_equality, strict_equality,
};
use crate::runner::ds::operations::type_conversion::{
    get_type, number_to_f64, to_boolean, to_i32, to_number, to_string, to_u32,
};
use crate::runner::ds::value::{JsNumberType, JsValue};

pub fn binary_op<'a>(
    left: &JsValue<'a>,
    op: BinaryOperator,
    right: &JsValue<'a>,
) -> Result<JsValue<'a>, JErrorType> {
    Ok(match op {
        BinaryOperator::Add => add_values(left, right),
        BinaryOperator::Subtract => {
            apply_numeric_op(&to_number(left), &to_number(right), |a, b| a - b, |a, b| a - b)
        }
        BinaryOperator::Multiply => {
            apply_numeric_op(&to_number(left), &to_number(right), |a, b| a * b, |a, b| a * b)
        }
        BinaryOperator::Divide => divide_values(left, right),
        BinaryOperator::Modulo => modulo_values(left, right),

        BinaryOperator::LessThan => JsValue::Boolean(compare_values(left, right, |a, b| a < b)),
        BinaryOperator::GreaterThan => JsValue::Boolean(compare_values(left, right, |a, b| a > b)),
        BinaryOperator::LessThanEqual => {
            JsValue::Boolean(compare_values(left, right, |a, b| a <= b))
        }
        BinaryOperator::GreaterThanEqual => {
            JsValue::Boolean(compare_values(left, right, |a, b| a >= b))
        }

        BinaryOperator::LooselyEqual => JsValue::Boolean(loose_equality(left, right)),
        BinaryOperator::LooselyUnequal => JsValue::Boolean(!loose_equality(left, right)),
        BinaryOperator::StrictlyEqual => JsValue::Boolean(strict_equality(left, right)),
        BinaryOperator::StrictlyUnequal => JsValue::Boolean(!strict_equality(left, right)),

        BinaryOperator::BitwiseAnd => {
            JsValue::Number(JsNumberType::Integer((to_i32(left) & to_i32(right)) as i64))
        }
        BinaryOperator::BitwiseOr => {
            JsValue::Number(JsNumberType::Integer((to_i32(left) | to_i32(right)) as i64))
        }
        BinaryOperator::BitwiseXor => {
            JsValue::Number(JsNumberType::Integer((to_i32(left) ^ to_i32(right)) as i64))
        }
        BinaryOperator::BitwiseLeftShift => {
            let shift = to_u32(right) & 0x1f;
            JsValue::Number(JsNumberType::Integer((to_i32(left) << shift) as i64))
        }
        BinaryOperator::BitwiseRightShift => {
            let shift = to_u32(right) & 0x1f;
            JsValue::Number(JsNumberType::Integer((to_i32(left) >> shift) as i64))
        }
        BinaryOperator::BitwiseUnsignedRightShift => {
            let shift = to_u32(right) & 0x1f;
            JsValue::Number(JsNumberType::Integer((to_u32(left) >> shift) as i64))
        }
    })
}

pub fn unary_op<'a>(op: UnaryOperator, value: &JsValue<'a>) -> Result<JsValue<'a>, JErrorType> {
    Ok(match op {
        UnaryOperator::Minus => negate_number(value),
        UnaryOperator::Plus => JsValue::Number(to_number(value)),
        UnaryOperator::LogicalNot => JsValue::Boolean(!to_boolean(value)),
        UnaryOperator::BitwiseNot => JsValue::Number(JsNumberType::Integer(!to_i32(value) as i64)),
        UnaryOperator::TypeOf => JsValue::String(get_type(value).to_string()),
        UnaryOperator::Void => JsValue::Undefined,
    })
}

/// `+` concatenates as soon as either side is a string, otherwise adds
/// numerically.
fn add_values<'a>(left: &JsValue<'a>, right: &JsValue<'a>) -> JsValue<'a> {
    if matches!(left, JsValue::String(_)) || matches!(right, JsValue::String(_)) {
        return JsValue::String(format!("{}{}", to_string(left), to_string(right)));
    }
    apply_numeric_op(&to_number(left), &to_number(right), |a, b| a + b, |a, b| a + b)
}

fn divide_values<'a>(left: &JsValue<'a>, right: &JsValue<'a>) -> JsValue<'a> {
    let l = to_number(left);
    let r = to_number(right);
    if let (JsNumberType::Integer(a), JsNumberType::Integer(b)) = (&l, &r) {
        if *b == 0 {
            return JsValue::Number(match a.signum() {
                1 => JsNumberType::PositiveInfinity,
                -1 => JsNumberType::NegativeInfinity,
                _ => JsNumberType::NaN,
            });
        }
        // Integer division only when it loses nothing.
        if a % b == 0 {
            return JsValue::Number(JsNumberType::Integer(a / b));
        }
    }
    JsValue::Number(float_result(number_to_f64(&l) / number_to_f64(&r)))
}

fn modulo_values<'a>(left: &JsValue<'a>, right: &JsValue<'a>) -> JsValue<'a> {
    let l = to_number(left);
    let r = to_number(right);
    if let (JsNumberType::Integer(a), JsNumberType::Integer(b)) = (&l, &r) {
        if *b == 0 {
            return JsValue::Number(JsNumberType::NaN);
        }
        return JsValue::Number(JsNumberType::Integer(a % b));
    }
    JsValue::Number(float_result(number_to_f64(&l) % number_to_f64(&r)))
}

fn apply_numeric_op<'a, F, G>(
    left: &JsNumberType,
    right: &JsNumberType,
    int_op: F,
    float_op: G,
) -> JsValue<'a>
where
    F: Fn(i64, i64) -> i64,
    G: Fn(f64, f64) -> f64,
{
    match (left, right) {
        (JsNumberType::NaN, _) | (_, JsNumberType::NaN) => JsValue::Number(JsNumberType::NaN),
        (JsNumberType::Integer(a), JsNumberType::Integer(b)) => {
            JsValue::Number(JsNumberType::Integer(int_op(*a, *b)))
        }
        (a, b) => JsValue::Number(float_result(float_op(number_to_f64(a), number_to_f64(b)))),
    }
}

fn float_result(f: f64) -> JsNumberType {
    if f.is_nan() {
        JsNumberType::NaN
    } else if f == f64::INFINITY {
        JsNumberType::PositiveInfinity
    } else if f == f64::NEG_INFINITY {
        JsNumberType::NegativeInfinity
    } else {
        JsNumberType::Float(f)
    }
}

fn negate_number<'a>(value: &JsValue<'a>) -> JsValue<'a> {
    JsValue::Number(match to_number(value) {
        JsNumberType::Integer(i) => JsNumberType::Integer(-i),
        JsNumberType::Float(f) => JsNumberType::Float(-f),
        JsNumberType::NaN => JsNumberType::NaN,
        JsNumberType::PositiveInfinity => JsNumberType::NegativeInfinity,
        JsNumberType::NegativeInfinity => JsNumberType::PositiveInfinity,
    })
}
