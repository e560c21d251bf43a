use fincheck_types::Value;

/// 一元运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// 算术运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Rem => "%",
        }
    }
}

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::In => "in",
            CompareOp::NotIn => "not in",
            CompareOp::Is => "is",
            CompareOp::IsNot => "is not",
        }
    }
}

/// 条件表达式语法树
///
/// 同一优先级的二元运算保存为扁平链（`first` + `rest`），
/// 求值时按顺序迭代，不会因长链产生深递归。
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Field(String),
    List(Vec<Expr>),
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Arith {
        first: Box<Expr>,
        rest: Vec<(ArithOp, Expr)>,
    },
    /// 链式比较：`a < b < c` 等价于 `a < b and b < c`
    Compare {
        first: Box<Expr>,
        rest: Vec<(CompareOp, Expr)>,
    },
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    /// 前序遍历所有节点
    pub fn walk<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Expr),
    {
        f(self);
        match self {
            Expr::Literal(_) | Expr::Field(_) => {}
            Expr::List(items) | Expr::And(items) | Expr::Or(items) => {
                for item in items {
                    item.walk(f);
                }
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.walk(f);
                }
            }
            Expr::Unary { operand, .. } => operand.walk(f),
            Expr::Arith { first, rest } => {
                first.walk(f);
                for (_, operand) in rest {
                    operand.walk(f);
                }
            }
            Expr::Compare { first, rest } => {
                first.walk(f);
                for (_, operand) in rest {
                    operand.walk(f);
                }
            }
        }
    }
}
