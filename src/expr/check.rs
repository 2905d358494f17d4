//! Allow-list check: turns an unchecked [`Node`] tree into an [`Expr`].
//!
//! `Expr` can only represent accepted constructs, so anything the evaluator
//! receives has already passed the check. Every construct not matched
//! explicitly below is rejected.

use std::fmt;

use super::parser::{BinaryOp, Node, UnaryOp};

/// A checked expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(f64),
    /// Reference to a named column, bare or quoted.
    Column(String),
    Neg(Box<Expr>),
    Pos(Box<Expr>),
    Binary {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: Function,
        arg: Box<Expr>,
    },
}

impl Expr {
    /// Visit column references in left-to-right order.
    pub fn for_each_column<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            Expr::Literal(_) => {}
            Expr::Column(name) => f(name),
            Expr::Neg(inner) | Expr::Pos(inner) => inner.for_each_column(f),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.for_each_column(f);
                rhs.for_each_column(f);
            }
            Expr::Call { arg, .. } => arg.for_each_column(f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl ArithOp {
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
            // Floored modulo: the result takes the sign of the divisor.
            ArithOp::Mod => {
                let r = a % b;
                if r != 0.0 && (r < 0.0) != (b < 0.0) {
                    r + b
                } else {
                    r
                }
            }
            ArithOp::Pow => a.powf(b),
        }
    }
}

/// The single-argument functions an expression may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Log,
    Log10,
    Log2,
    Sqrt,
    Abs,
    Sin,
    Cos,
    Tan,
    Exp,
}

impl Function {
    pub const ALL: [Function; 9] = [
        Function::Log,
        Function::Log10,
        Function::Log2,
        Function::Sqrt,
        Function::Abs,
        Function::Sin,
        Function::Cos,
        Function::Tan,
        Function::Exp,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Log => "log",
            Function::Log10 => "log10",
            Function::Log2 => "log2",
            Function::Sqrt => "sqrt",
            Function::Abs => "abs",
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Exp => "exp",
        }
    }

    pub fn apply(self, x: f64) -> f64 {
        match self {
            Function::Log => x.ln(),
            Function::Log10 => x.log10(),
            Function::Log2 => x.log2(),
            Function::Sqrt => x.sqrt(),
            Function::Abs => x.abs(),
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
            Function::Tan => x.tan(),
            Function::Exp => x.exp(),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a tree was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection(pub String);

fn reject<T>(message: impl Into<String>) -> Result<T, Rejection> {
    Err(Rejection(message.into()))
}

fn allowed_functions() -> String {
    Function::ALL.map(Function::name).join(", ")
}

pub fn check(node: &Node) -> Result<Expr, Rejection> {
    match node {
        Node::Number(n) => Ok(Expr::Literal(*n)),
        Node::Name(name) | Node::Str(name) => Ok(Expr::Column(name.clone())),

        Node::Unary { op, operand } => {
            let inner = Box::new(check(operand)?);
            match op {
                UnaryOp::Neg => Ok(Expr::Neg(inner)),
                UnaryOp::Pos => Ok(Expr::Pos(inner)),
                UnaryOp::Invert => reject("Operator '~' is not allowed"),
            }
        }

        Node::Binary { op, left, right } => {
            let op = match op {
                BinaryOp::Add => ArithOp::Add,
                BinaryOp::Sub => ArithOp::Sub,
                BinaryOp::Mul => ArithOp::Mul,
                BinaryOp::Div => ArithOp::Div,
                BinaryOp::Mod => ArithOp::Mod,
                BinaryOp::Pow => ArithOp::Pow,
                BinaryOp::FloorDiv => return reject("Operator '//' is not allowed"),
                BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                    return reject("Bitwise operators are not allowed")
                }
            };
            Ok(Expr::Binary {
                op,
                lhs: Box::new(check(left)?),
                rhs: Box::new(check(right)?),
            })
        }

        Node::Call { callee, args } => {
            let Node::Name(name) = callee.as_ref() else {
                return reject("Only direct calls to allowed functions are permitted");
            };
            let Some(func) = Function::from_name(name) else {
                return reject(format!(
                    "Function '{name}' is not allowed. Allowed functions: {}",
                    allowed_functions()
                ));
            };
            let [arg] = args.as_slice() else {
                return reject(format!(
                    "Function '{name}' takes exactly 1 argument ({} given)",
                    args.len()
                ));
            };
            Ok(Expr::Call {
                func,
                arg: Box::new(check(arg)?),
            })
        }

        Node::Concat(_) => reject("String concatenation is not allowed"),
        Node::Compare { .. } => reject("Comparison operators are not allowed"),
        Node::Bool { .. } | Node::Not(_) => reject("Boolean operators are not allowed"),
        Node::Conditional { .. } => reject("Conditional expressions are not allowed"),
        Node::Attribute { attr, .. } => reject(format!("Attribute access ('.{attr}') is not allowed")),
        Node::Subscript { .. } => reject("Subscript access is not allowed"),
        Node::Tuple(_) => reject("Tuples are not allowed"),
        Node::List(_) => reject("Lists are not allowed"),
        Node::Comprehension { .. } => reject("Comprehensions are not allowed"),
    }
}

#[cfg(test)]
mod tests {
    use super::super::{lexer::tokenize, parser::parse};
    use super::*;

    fn checked(text: &str) -> Result<Expr, Rejection> {
        check(&parse(&tokenize(text).unwrap()).unwrap())
    }

    #[test]
    fn accepts_grammar() {
        for text in [
            "x + y",
            "-x ** 2",
            "+x % 3",
            "log(x) / log10(y) * log2(z)",
            "sqrt(abs(sin(x) + cos(y) - tan(z))) + exp(1)",
            "\"Column 1\" * 2",
        ] {
            assert!(checked(text).is_ok(), "{text} should be accepted");
        }
    }

    #[test]
    fn rejects_everything_else() {
        for text in [
            "__import__('os')",
            "os.system('ls')",
            "x.real",
            "x[0]",
            "[x for x in y]",
            "x > 1",
            "x and y",
            "not x",
            "x if y else z",
            "max(x)",
            "log(x, 2)",
            "log()",
            "'a' 'b'",
            "x // 2",
            "x & y",
            "~x",
            "(x, y)",
            "[1, 2]",
        ] {
            assert!(checked(text).is_err(), "{text} should be rejected");
        }
    }

    #[test]
    fn unknown_function_lists_allow_list() {
        let Rejection(message) = checked("max(x)").unwrap_err();
        assert!(message.contains("'max'"));
        assert!(message.contains("log, log10, log2, sqrt, abs, sin, cos, tan, exp"));
    }

    #[test]
    fn floored_modulo() {
        assert_eq!(ArithOp::Mod.apply(7.0, 3.0), 1.0);
        assert_eq!(ArithOp::Mod.apply(-7.0, 3.0), 2.0);
        assert_eq!(ArithOp::Mod.apply(7.0, -3.0), -2.0);
        assert!(ArithOp::Mod.apply(1.0, 0.0).is_nan());
    }

    #[test]
    fn column_references_in_order() {
        let expr = checked("a + log(\"b c\") * a").unwrap();
        let mut seen = Vec::new();
        expr.for_each_column(&mut |name| seen.push(name));
        assert_eq!(seen, vec!["a", "b c", "a"]);
    }
}
