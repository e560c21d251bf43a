use fincheck_types::Value;
use std::cmp::Ordering;

use crate::ast::{ArithOp, CompareOp, Expr, UnaryOp};
use crate::error::EvalError;
use crate::functions;
use crate::scope::Scope;

/// 对语法树求值
pub fn eval<S: Scope + ?Sized>(expr: &Expr, scope: &S) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Field(name) => scope
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownIdentifier(name.clone())),
        Expr::List(items) => items
            .iter()
            .map(|item| eval(item, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Expr::Call { name, args } => {
            functions::check_call(name, args.len())?;
            let args = args
                .iter()
                .map(|arg| eval(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            functions::call(name, args)
        }
        Expr::Unary { op, operand } => {
            let value = eval(operand, scope)?;
            match (op, value) {
                (UnaryOp::Not, value) => Ok(Value::Bool(!value.truthy())),
                (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
                (UnaryOp::Neg, other) => Err(EvalError::TypeMismatch {
                    op: "-",
                    left: "",
                    right: other.type_name(),
                }),
            }
        }
        Expr::Arith { first, rest } => {
            let mut acc = eval(first, scope)?;
            for (op, operand) in rest {
                let rhs = eval(operand, scope)?;
                acc = arith(*op, acc, rhs)?;
            }
            Ok(acc)
        }
        Expr::Compare { first, rest } => {
            let mut left = eval(first, scope)?;
            for (op, operand) in rest {
                let right = eval(operand, scope)?;
                if !compare(*op, &left, &right)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
        // and / or 返回决定结果的操作数本身，而不是布尔值
        Expr::And(items) => logical(items, scope, false),
        Expr::Or(items) => logical(items, scope, true),
    }
}

/// 依次求值，遇到真值等于 `stop_on` 的操作数即返回它，否则返回最后一个
fn logical<S: Scope + ?Sized>(items: &[Expr], scope: &S, stop_on: bool) -> Result<Value, EvalError> {
    let mut last = Value::Bool(!stop_on);
    for item in items {
        last = eval(item, scope)?;
        if last.truthy() == stop_on {
            break;
        }
    }
    Ok(last)
}

fn mismatch(op: &'static str, left: &Value, right: &Value) -> EvalError {
    EvalError::TypeMismatch {
        op,
        left: left.type_name(),
        right: right.type_name(),
    }
}

pub(crate) fn finite(n: f64) -> Result<Value, EvalError> {
    if n.is_finite() {
        Ok(Value::Number(n))
    } else {
        Err(EvalError::NonFinite)
    }
}

fn arith(op: ArithOp, left: Value, right: Value) -> Result<Value, EvalError> {
    match (op, &left, &right) {
        (ArithOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        // 日期相减得到天数
        (ArithOp::Sub, Value::Date(a), Value::Date(b)) => {
            Ok(Value::Number(a.signed_duration_since(*b).num_days() as f64))
        }
        (_, Value::Number(a), Value::Number(b)) => {
            let (a, b) = (*a, *b);
            match op {
                ArithOp::Add => finite(a + b),
                ArithOp::Sub => finite(a - b),
                ArithOp::Mul => finite(a * b),
                ArithOp::Div if b == 0.0 => Err(EvalError::DivisionByZero),
                ArithOp::Div => finite(a / b),
                ArithOp::Rem if b == 0.0 => Err(EvalError::DivisionByZero),
                ArithOp::Rem => {
                    // 取模结果与除数同号
                    let r = a % b;
                    if r != 0.0 && (r < 0.0) != (b < 0.0) {
                        finite(r + b)
                    } else {
                        finite(r)
                    }
                }
            }
        }
        _ => Err(mismatch(op.symbol(), &left, &right)),
    }
}

/// 相等比较是全函数：类型不同即不相等
pub(crate) fn equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equal(x, y))
        }
        _ => left == right,
    }
}

/// 有序比较只在同类型的数字、字符串、日期之间成立
pub(crate) fn order(op: &'static str, left: &Value, right: &Value) -> Result<Ordering, EvalError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            a.partial_cmp(b).ok_or_else(|| mismatch(op, left, right))
        }
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Ok(a.cmp(b)),
        _ => Err(mismatch(op, left, right)),
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    match op {
        CompareOp::Eq => Ok(equal(left, right)),
        CompareOp::Ne => Ok(!equal(left, right)),
        CompareOp::Lt => Ok(order(op.symbol(), left, right)? == Ordering::Less),
        CompareOp::Le => Ok(order(op.symbol(), left, right)? != Ordering::Greater),
        CompareOp::Gt => Ok(order(op.symbol(), left, right)? == Ordering::Greater),
        CompareOp::Ge => Ok(order(op.symbol(), left, right)? != Ordering::Less),
        CompareOp::In => contains(op, left, right),
        CompareOp::NotIn => contains(op, left, right).map(|found| !found),
        CompareOp::Is => identical(op, left, right),
        CompareOp::IsNot => identical(op, left, right).map(|same| !same),
    }
}

fn contains(op: CompareOp, needle: &Value, haystack: &Value) -> Result<bool, EvalError> {
    match (needle, haystack) {
        (Value::Str(n), Value::Str(h)) => Ok(h.contains(n.as_str())),
        (_, Value::List(items)) => Ok(items.iter().any(|item| equal(needle, item))),
        _ => Err(mismatch(op.symbol(), needle, haystack)),
    }
}

/// `is` 只用于 null 与布尔值
fn identical(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    match (left, right) {
        (Value::Null | Value::Bool(_), _) | (_, Value::Null | Value::Bool(_)) => {
            Ok(left == right)
        }
        _ => Err(mismatch(op.symbol(), left, right)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::collections::HashMap;

    fn run(source: &str, scope: &HashMap<String, Value>) -> Result<Value, EvalError> {
        eval(&parse(source).unwrap(), scope)
    }

    fn scope() -> HashMap<String, Value> {
        let mut scope = HashMap::new();
        scope.insert("amount".to_string(), Value::Number(-250.0));
        scope.insert("currency".to_string(), Value::from("EUR"));
        scope.insert("merchant".to_string(), Value::from("Uber Eats"));
        scope.insert("category".to_string(), Value::Null);
        scope
    }

    #[test]
    fn test_arithmetic() {
        let s = scope();
        assert_eq!(run("amount * 2 + 100", &s).unwrap(), Value::Number(-400.0));
        assert_eq!(run("-7 % 3", &s).unwrap(), Value::Number(2.0));
        assert_eq!(run("7 % -3", &s).unwrap(), Value::Number(-2.0));
        assert_eq!(run("'a' + 'b'", &s).unwrap(), Value::from("ab"));
        assert_eq!(run("1 / 0", &s), Err(EvalError::DivisionByZero));
        assert_eq!(run("1 % 0", &s), Err(EvalError::DivisionByZero));
        assert!(matches!(run("currency + 1", &s), Err(EvalError::TypeMismatch { .. })));
        assert_eq!(run("1e308 * 10", &s), Err(EvalError::NonFinite));
    }

    #[test]
    fn test_equality_is_total() {
        let s = scope();
        assert_eq!(run("category == 'Travel'", &s).unwrap(), Value::Bool(false));
        assert_eq!(run("category != 'Travel'", &s).unwrap(), Value::Bool(true));
        assert_eq!(run("category == null", &s).unwrap(), Value::Bool(true));
        assert_eq!(run("amount == '-250'", &s).unwrap(), Value::Bool(false));
        assert_eq!(run("[1, 'a'] == [1, 'a']", &s).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_ordering_requires_same_type() {
        let s = scope();
        assert_eq!(run("amount < 0", &s).unwrap(), Value::Bool(true));
        assert_eq!(run("currency >= 'EUR'", &s).unwrap(), Value::Bool(true));
        assert!(matches!(run("category > 5", &s), Err(EvalError::TypeMismatch { .. })));
        assert!(matches!(run("currency < 5", &s), Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    fn test_chained_comparison_short_circuits() {
        let s = scope();
        assert_eq!(run("-1000 < amount < 0", &s).unwrap(), Value::Bool(true));
        assert_eq!(run("0 < amount < 1000", &s).unwrap(), Value::Bool(false));
        // 第一段为 false 后不再比较 'x'
        assert_eq!(run("1 > 2 > 'x'", &s).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_membership() {
        let s = scope();
        assert_eq!(run("'Uber' in merchant", &s).unwrap(), Value::Bool(true));
        assert_eq!(run("currency in ['EUR', 'USD']", &s).unwrap(), Value::Bool(true));
        assert_eq!(run("currency not in ['EUR', 'USD']", &s).unwrap(), Value::Bool(false));
        assert!(matches!(run("'x' in category", &s), Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    fn test_identity() {
        let s = scope();
        assert_eq!(run("category is None", &s).unwrap(), Value::Bool(true));
        assert_eq!(run("merchant is not None", &s).unwrap(), Value::Bool(true));
        assert!(run("merchant is 'x'", &s).is_err());
    }

    #[test]
    fn test_logic_short_circuits() {
        let s = scope();
        assert_eq!(
            run("category is not None and category == 'Travel'", &s).unwrap(),
            Value::Bool(false)
        );
        // 右侧引用了不存在的字段，但不会被求值
        assert_eq!(run("amount < 0 or missing > 1", &s).unwrap(), Value::Bool(true));
        assert_eq!(
            run("amount > 0 or missing > 1", &s),
            Err(EvalError::UnknownIdentifier("missing".to_string()))
        );
        assert_eq!(run("not not true", &s).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_truthiness_of_operands() {
        let mut s = scope();
        s.insert("description".to_string(), Value::from(""));

        assert_eq!(run("not category", &s).unwrap(), Value::Bool(true));
        assert_eq!(run("not description", &s).unwrap(), Value::Bool(true));
        assert_eq!(run("not merchant", &s).unwrap(), Value::Bool(false));
        assert_eq!(run("not amount", &s).unwrap(), Value::Bool(false));
        assert_eq!(run("not []", &s).unwrap(), Value::Bool(true));

        // and / or 返回操作数
        assert_eq!(run("amount and merchant", &s).unwrap(), Value::from("Uber Eats"));
        assert_eq!(run("category and merchant", &s).unwrap(), Value::Null);
        assert_eq!(run("category or 'Other'", &s).unwrap(), Value::from("Other"));
        assert_eq!(run("(category or 'Other') == 'Other'", &s).unwrap(), Value::Bool(true));
        assert_eq!(run("0 or ''", &s).unwrap(), Value::from(""));
    }

    #[test]
    fn test_unary_minus_on_field() {
        let s = scope();
        assert_eq!(run("-amount", &s).unwrap(), Value::Number(250.0));
        assert!(matches!(run("-currency", &s), Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    fn test_date_arithmetic() {
        let mut s = scope();
        s.insert(
            "date".to_string(),
            Value::Date(chrono::NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()),
        );
        assert_eq!(run("date - date('2024-03-01')", &s).unwrap(), Value::Number(30.0));
        assert_eq!(run("date > date('2024-01-01')", &s).unwrap(), Value::Bool(true));
        assert_eq!(run("month(date) == 3", &s).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_unknown_function_is_error() {
        let s = scope();
        assert_eq!(
            run("exec('rm -rf /')", &s),
            Err(EvalError::UnknownFunction("exec".to_string()))
        );
    }
}
