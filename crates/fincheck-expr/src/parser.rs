//! 条件表达式解析器（nom）
//!
//! 语法（优先级从低到高）：
//!
//! ```text
//! or         := and ( ("or" | "||") and )*
//! and        := not ( ("and" | "&&") not )*
//! not        := ("not" | "!")* comparison
//! comparison := additive ( cmp_op additive )*
//! additive   := term ( ("+" | "-") term )*
//! term       := unary ( ("*" | "/" | "%") unary )*
//! unary      := "-"* primary
//! primary    := number | string | list | "(" or ")" | ident [ "(" args ")" ]
//! ```

use fincheck_types::Value;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, multispace0, multispace1, one_of, satisfy},
    combinator::{all_consuming, map, not, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::ast::{ArithOp, CompareOp, Expr, UnaryOp};
use crate::error::ParseError;

/// 表达式最大长度（字节）
pub const MAX_EXPRESSION_LEN: usize = 1024;

/// 括号最大嵌套层数
pub const MAX_NESTING_DEPTH: usize = 64;

const RESERVED: &[&str] = &[
    "and", "or", "not", "in", "is", "true", "false", "null", "True", "False", "None",
];

/// 解析条件表达式
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    if source.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    if source.len() > MAX_EXPRESSION_LEN {
        return Err(ParseError::TooLong {
            len: source.len(),
            max: MAX_EXPRESSION_LEN,
        });
    }
    check_depth(source)?;

    match all_consuming(ws(or_expr))(source) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(syntax_error(source, e)),
        Err(nom::Err::Incomplete(_)) => Err(ParseError::Syntax {
            offset: source.len(),
            message: "unexpected end of expression".to_string(),
        }),
    }
}

fn syntax_error(source: &str, e: Error<&str>) -> ParseError {
    let offset = source.len() - e.input.len();
    let message = if e.input.is_empty() {
        "unexpected end of expression".to_string()
    } else {
        let snippet: String = e.input.chars().take(16).collect();
        format!("unexpected input near `{}`", snippet)
    };
    ParseError::Syntax { offset, message }
}

/// 预扫描括号深度，防止恶意输入耗尽栈
fn check_depth(source: &str) -> Result<(), ParseError> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in source.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' => {
                depth += 1;
                if depth > MAX_NESTING_DEPTH {
                    return Err(ParseError::TooDeep(MAX_NESTING_DEPTH));
                }
            }
            ')' | ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// 关键字后面不能紧跟标识符字符（`in` 不匹配 `income`）
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(word), not(satisfy(is_ident_char)))
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(satisfy(is_ident_start), take_while(is_ident_char)))(input)
}

/// 数字字面量：`12`、`10_000`、`0.5`、`1e4`；溢出为无穷大的字面量无效
fn number(input: &str) -> IResult<&str, f64> {
    let (rest, raw) = recognize(tuple((
        digit1,
        take_while(|c: char| c.is_ascii_digit() || c == '_'),
        opt(pair(char('.'), digit1)),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)?;
    let (rest, _) = not(satisfy(is_ident_char))(rest)?;

    match raw.replace('_', "").parse::<f64>() {
        Ok(n) if n.is_finite() => Ok((rest, n)),
        _ => Err(nom::Err::Error(Error::new(input, ErrorKind::Float))),
    }
}

/// 单引号或双引号字符串，支持 `\n`、`\t`、`\r` 及引号转义
fn string_literal(input: &str) -> IResult<&str, String> {
    let (body, quote) = one_of("'\"")(input)?;
    let mut out = String::new();
    let mut chars = body.char_indices();

    while let Some((i, c)) = chars.next() {
        if c == quote {
            return Ok((&body[i + c.len_utf8()..], out));
        }
        if c == '\\' {
            match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, other)) => out.push(other),
                None => break,
            }
        } else {
            out.push(c);
        }
    }

    // 未闭合的字符串不再回溯
    Err(nom::Err::Failure(Error::new(input, ErrorKind::Char)))
}

fn arguments(input: &str) -> IResult<&str, Vec<Expr>> {
    separated_list0(ws(char(',')), or_expr)(input)
}

// =============================================================================
// GRAMMAR
// =============================================================================

fn or_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(
        ws(alt((keyword("or"), tag("||")))),
        and_expr,
    ))(input)?;
    Ok((input, logical(first, rest, Expr::Or)))
}

fn and_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = not_expr(input)?;
    let (input, rest) = many0(preceded(
        ws(alt((keyword("and"), tag("&&")))),
        not_expr,
    ))(input)?;
    Ok((input, logical(first, rest, Expr::And)))
}

fn logical(first: Expr, rest: Vec<Expr>, build: fn(Vec<Expr>) -> Expr) -> Expr {
    if rest.is_empty() {
        return first;
    }
    let mut items = Vec::with_capacity(rest.len() + 1);
    items.push(first);
    items.extend(rest);
    build(items)
}

fn not_expr(input: &str) -> IResult<&str, Expr> {
    let bang = terminated(tag("!"), not(char('=')));
    let (input, negations) = many0(ws(alt((keyword("not"), bang))))(input)?;
    let (input, operand) = comparison(input)?;
    Ok((input, prefixed(UnaryOp::Not, negations.len(), operand)))
}

/// 连续的前缀运算按奇偶折叠，语法树最多两层
///
/// 偶数次保留两层：`not not x` 是 x 的真值，`--x` 仍要求 x 为数字。
fn prefixed(op: UnaryOp, count: usize, operand: Expr) -> Expr {
    let levels = match count {
        0 => 0,
        n if n % 2 == 1 => 1,
        _ => 2,
    };
    (0..levels).fold(operand, |acc, _| Expr::Unary {
        op,
        operand: Box::new(acc),
    })
}

fn compare_op(input: &str) -> IResult<&str, CompareOp> {
    alt((
        value(CompareOp::Eq, tag("==")),
        value(CompareOp::Ne, tag("!=")),
        value(CompareOp::Le, tag("<=")),
        value(CompareOp::Ge, tag(">=")),
        value(CompareOp::Lt, tag("<")),
        value(CompareOp::Gt, tag(">")),
        value(
            CompareOp::NotIn,
            tuple((keyword("not"), multispace1, keyword("in"))),
        ),
        value(CompareOp::In, keyword("in")),
        value(
            CompareOp::IsNot,
            tuple((keyword("is"), multispace1, keyword("not"))),
        ),
        value(CompareOp::Is, keyword("is")),
    ))(input)
}

fn comparison(input: &str) -> IResult<&str, Expr> {
    let (input, first) = additive(input)?;
    let (input, rest) = many0(pair(ws(compare_op), additive))(input)?;

    if rest.is_empty() {
        return Ok((input, first));
    }
    Ok((
        input,
        Expr::Compare {
            first: Box::new(first),
            rest,
        },
    ))
}

fn additive(input: &str) -> IResult<&str, Expr> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(pair(
        ws(alt((
            value(ArithOp::Add, char('+')),
            value(ArithOp::Sub, char('-')),
        ))),
        term,
    ))(input)?;
    Ok((input, arith(first, rest)))
}

fn term(input: &str) -> IResult<&str, Expr> {
    let (input, first) = unary(input)?;
    let (input, rest) = many0(pair(
        ws(alt((
            value(ArithOp::Mul, char('*')),
            value(ArithOp::Div, char('/')),
            value(ArithOp::Rem, char('%')),
        ))),
        unary,
    ))(input)?;
    Ok((input, arith(first, rest)))
}

fn arith(first: Expr, rest: Vec<(ArithOp, Expr)>) -> Expr {
    if rest.is_empty() {
        return first;
    }
    Expr::Arith {
        first: Box::new(first),
        rest,
    }
}

fn unary(input: &str) -> IResult<&str, Expr> {
    let (input, signs) = many0(ws(char('-')))(input)?;
    let (input, operand) = primary(input)?;

    let expr = match operand {
        // 数字字面量直接折叠符号
        Expr::Literal(Value::Number(n)) if signs.len() % 2 == 1 => Expr::Literal(Value::Number(-n)),
        literal @ Expr::Literal(Value::Number(_)) => literal,
        other => prefixed(UnaryOp::Neg, signs.len(), other),
    };
    Ok((input, expr))
}

fn primary(input: &str) -> IResult<&str, Expr> {
    ws(alt((
        map(number, |n| Expr::Literal(Value::Number(n))),
        map(string_literal, |s| Expr::Literal(Value::Str(s))),
        map(
            delimited(ws(char('[')), arguments, char(']')),
            Expr::List,
        ),
        delimited(ws(char('(')), or_expr, char(')')),
        name_or_call,
    )))(input)
}

fn name_or_call(input: &str) -> IResult<&str, Expr> {
    let (rest, name) = identifier(input)?;

    match name {
        "true" | "True" => return Ok((rest, Expr::Literal(Value::Bool(true)))),
        "false" | "False" => return Ok((rest, Expr::Literal(Value::Bool(false)))),
        "null" | "None" => return Ok((rest, Expr::Literal(Value::Null))),
        _ if RESERVED.contains(&name) => {
            return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)));
        }
        _ => {}
    }

    let (rest, args) = opt(delimited(
        preceded(multispace0, char('(')),
        ws(arguments),
        char(')'),
    ))(rest)?;

    let expr = match args {
        Some(args) => Expr::Call {
            name: name.to_string(),
            args,
        },
        None => Expr::Field(name.to_string()),
    };
    Ok((rest, expr))
}
