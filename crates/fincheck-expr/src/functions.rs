use chrono::{Datelike, NaiveDate};
use fincheck_types::Value;
use std::cmp::Ordering;

use crate::error::EvalError;
use crate::eval::{finite, order};

/// 内置函数签名
#[derive(Debug, Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub min_args: usize,
    /// `None` 表示不限
    pub max_args: Option<usize>,
}

impl Builtin {
    const fn new(name: &'static str, min_args: usize, max_args: Option<usize>) -> Self {
        Self {
            name,
            min_args,
            max_args,
        }
    }

    fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }

    fn expected(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{}..={}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        }
    }
}

/// 固定的安全函数集合
pub const BUILTINS: &[Builtin] = &[
    Builtin::new("abs", 1, Some(1)),
    Builtin::new("min", 1, None),
    Builtin::new("max", 1, None),
    Builtin::new("round", 1, Some(2)),
    Builtin::new("len", 1, Some(1)),
    Builtin::new("lower", 1, Some(1)),
    Builtin::new("upper", 1, Some(1)),
    Builtin::new("contains", 2, Some(2)),
    Builtin::new("startswith", 2, Some(2)),
    Builtin::new("endswith", 2, Some(2)),
    Builtin::new("date", 1, Some(3)),
    Builtin::new("year", 1, Some(1)),
    Builtin::new("month", 1, Some(1)),
    Builtin::new("day", 1, Some(1)),
    Builtin::new("weekday", 1, Some(1)),
];

pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

/// 检查函数名与参数个数
pub fn check_call(name: &str, arg_count: usize) -> Result<(), EvalError> {
    let builtin = lookup(name).ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
    if !builtin.accepts(arg_count) {
        return Err(EvalError::Arity {
            function: name.to_string(),
            expected: builtin.expected(),
            found: arg_count,
        });
    }
    Ok(())
}

/// 调用内置函数
pub fn call(name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
    check_call(name, args.len())?;

    match name {
        "abs" => Ok(Value::Number(number_arg(name, &args[0])?.abs())),
        "min" => extreme("min", args, Ordering::Less),
        "max" => extreme("max", args, Ordering::Greater),
        "round" => round(&args),
        "len" => match &args[0] {
            Value::Str(s) => Ok(Value::Number(s.chars().count() as f64)),
            Value::List(items) => Ok(Value::Number(items.len() as f64)),
            other => Err(invalid(name, format!("expected string or list, found {}", other.type_name()))),
        },
        "lower" => Ok(Value::Str(str_arg(name, &args[0])?.to_lowercase())),
        "upper" => Ok(Value::Str(str_arg(name, &args[0])?.to_uppercase())),
        "contains" => {
            let (s, sub) = (str_arg(name, &args[0])?, str_arg(name, &args[1])?);
            Ok(Value::Bool(s.contains(sub)))
        }
        "startswith" => {
            let (s, prefix) = (str_arg(name, &args[0])?, str_arg(name, &args[1])?);
            Ok(Value::Bool(s.starts_with(prefix)))
        }
        "endswith" => {
            let (s, suffix) = (str_arg(name, &args[0])?, str_arg(name, &args[1])?);
            Ok(Value::Bool(s.ends_with(suffix)))
        }
        "date" => make_date(&args),
        "year" => Ok(Value::Number(date_arg(name, &args[0])?.year() as f64)),
        "month" => Ok(Value::Number(date_arg(name, &args[0])?.month() as f64)),
        "day" => Ok(Value::Number(date_arg(name, &args[0])?.day() as f64)),
        "weekday" => Ok(Value::Number(
            date_arg(name, &args[0])?.weekday().num_days_from_monday() as f64,
        )),
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}

fn invalid(function: &str, reason: impl Into<String>) -> EvalError {
    EvalError::InvalidArgument {
        function: function.to_string(),
        reason: reason.into(),
    }
}

fn number_arg(function: &str, value: &Value) -> Result<f64, EvalError> {
    value
        .as_number()
        .ok_or_else(|| invalid(function, format!("expected number, found {}", value.type_name())))
}

fn str_arg<'a>(function: &str, value: &'a Value) -> Result<&'a str, EvalError> {
    value
        .as_str()
        .ok_or_else(|| invalid(function, format!("expected string, found {}", value.type_name())))
}

fn date_arg(function: &str, value: &Value) -> Result<NaiveDate, EvalError> {
    value
        .as_date()
        .ok_or_else(|| invalid(function, format!("expected date, found {}", value.type_name())))
}

/// min/max：多个参数，或单个列表参数
fn extreme(name: &'static str, args: Vec<Value>, wanted: Ordering) -> Result<Value, EvalError> {
    let items = match <[Value; 1]>::try_from(args) {
        Ok([Value::List(items)]) => items,
        Ok([single]) => vec![single],
        Err(args) => args,
    };

    let mut iter = items.into_iter();
    let mut best = iter
        .next()
        .ok_or_else(|| invalid(name, "empty list"))?;
    for item in iter {
        if order(name, &item, &best)? == wanted {
            best = item;
        }
    }
    Ok(best)
}

fn round(args: &[Value]) -> Result<Value, EvalError> {
    let n = number_arg("round", &args[0])?;
    let digits = match args.get(1) {
        Some(v) => {
            let d = number_arg("round", v)?;
            if d.fract() != 0.0 || !(0.0..=12.0).contains(&d) {
                return Err(invalid("round", "digits must be an integer in 0..=12"));
            }
            d as i32
        }
        None => 0,
    };
    let factor = 10f64.powi(digits);
    finite((n * factor).round() / factor)
}

/// `date('2024-01-31')` 或 `date(2024, 1, 31)`
fn make_date(args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [Value::Date(d)] => Ok(Value::Date(*d)),
        [Value::Str(s)] => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|e| invalid("date", format!("'{}': {}", s, e))),
        [y, m, d] => {
            let (y, m, d) = (
                number_arg("date", y)?,
                number_arg("date", m)?,
                number_arg("date", d)?,
            );
            if [y, m, d].iter().any(|n| n.fract() != 0.0) {
                return Err(invalid("date", "components must be integers"));
            }
            NaiveDate::from_ymd_opt(y as i32, m as u32, d as u32)
                .map(Value::Date)
                .ok_or_else(|| invalid("date", format!("no such date {}-{}-{}", y, m, d)))
        }
        [other] => Err(invalid("date", format!("expected string, found {}", other.type_name()))),
        _ => Err(EvalError::Arity {
            function: "date".to_string(),
            expected: "1 or 3".to_string(),
            found: args.len(),
        }),
    }
}
