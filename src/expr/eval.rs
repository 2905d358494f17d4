//! Element-wise evaluation of a checked [`Expr`].

use std::borrow::Cow;
use std::collections::BTreeMap;

use super::check::{ArithOp, Expr};

/// An intermediate result: a broadcastable scalar or a full-length array.
#[derive(Debug, Clone, PartialEq)]
enum Value<'a> {
    Scalar(f64),
    Array(Cow<'a, [f64]>),
}

impl<'a> Value<'a> {
    fn map(self, f: impl Fn(f64) -> f64) -> Value<'a> {
        match self {
            Value::Scalar(x) => Value::Scalar(f(x)),
            Value::Array(values) => Value::Array(match values {
                Cow::Owned(mut owned) => {
                    owned.iter_mut().for_each(|v| *v = f(*v));
                    Cow::Owned(owned)
                }
                Cow::Borrowed(slice) => Cow::Owned(slice.iter().map(|v| f(*v)).collect()),
            }),
        }
    }

    fn combine(self, op: ArithOp, rhs: Value<'a>) -> Value<'a> {
        match (self, rhs) {
            (Value::Scalar(a), Value::Scalar(b)) => Value::Scalar(op.apply(a, b)),
            (Value::Scalar(a), array) => array.map(|b| op.apply(a, b)),
            (array, Value::Scalar(b)) => array.map(|a| op.apply(a, b)),
            (Value::Array(a), Value::Array(b)) => Value::Array(Cow::Owned(
                a.iter().zip(b.iter()).map(|(x, y)| op.apply(*x, *y)).collect(),
            )),
        }
    }

    fn into_vec(self, len: usize) -> Vec<f64> {
        match self {
            Value::Scalar(x) => vec![x; len],
            Value::Array(values) => values.into_owned(),
        }
    }
}

/// Evaluate `expr` with every column reference already resolved in `bound`.
///
/// All arrays in `bound` must have length `len`; scalars broadcast to it.
pub(crate) fn evaluate(expr: &Expr, bound: &BTreeMap<&str, &[f64]>, len: usize) -> Vec<f64> {
    eval_node(expr, bound).into_vec(len)
}

fn eval_node<'a>(expr: &Expr, bound: &BTreeMap<&str, &'a [f64]>) -> Value<'a> {
    match expr {
        Expr::Literal(x) => Value::Scalar(*x),
        // Every reference is bound before evaluation starts.
        Expr::Column(name) => Value::Array(Cow::Borrowed(
            bound.get(name.as_str()).copied().unwrap_or_default(),
        )),
        Expr::Neg(inner) => eval_node(inner, bound).map(|x| -x),
        Expr::Pos(inner) => eval_node(inner, bound),
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval_node(lhs, bound);
            let rhs = eval_node(rhs, bound);
            lhs.combine(*op, rhs)
        }
        Expr::Call { func, arg } => eval_node(arg, bound).map(|x| func.apply(x)),
    }
}
