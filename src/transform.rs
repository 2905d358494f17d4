use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Preset transforms
// ---------------------------------------------------------------------------

/// One-click transformations applied to a whole column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    Log,
    Log10,
    Log2,
    Square,
    Cube,
    Sqrt,
    Cbrt,
    Sin,
    Cos,
    Tan,
    Arcsin,
    Arccos,
    Arctan,
    Abs,
    Inverse,
    Exp,
    Negate,
}

impl Transform {
    pub const ALL: [Transform; 17] = [
        Transform::Log,
        Transform::Log10,
        Transform::Log2,
        Transform::Square,
        Transform::Cube,
        Transform::Sqrt,
        Transform::Cbrt,
        Transform::Sin,
        Transform::Cos,
        Transform::Tan,
        Transform::Arcsin,
        Transform::Arccos,
        Transform::Arctan,
        Transform::Abs,
        Transform::Inverse,
        Transform::Exp,
        Transform::Negate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Transform::Log => "log",
            Transform::Log10 => "log10",
            Transform::Log2 => "log2",
            Transform::Square => "square",
            Transform::Cube => "cube",
            Transform::Sqrt => "sqrt",
            Transform::Cbrt => "cbrt",
            Transform::Sin => "sin",
            Transform::Cos => "cos",
            Transform::Tan => "tan",
            Transform::Arcsin => "arcsin",
            Transform::Arccos => "arccos",
            Transform::Arctan => "arctan",
            Transform::Abs => "abs",
            Transform::Inverse => "inverse",
            Transform::Exp => "exp",
            Transform::Negate => "negate",
        }
    }

    /// Check that every value lies in this transform's domain.
    pub fn validate(self, data: &[f64]) -> Result<(), ValidationError> {
        let violation = match self {
            Transform::Log | Transform::Log10 | Transform::Log2 => data
                .iter()
                .any(|v| *v <= 0.0)
                .then(|| (format!("{self} requires positive values"), "contains non-positive values")),
            Transform::Sqrt => data
                .iter()
                .any(|v| *v < 0.0)
                .then(|| ("sqrt requires non-negative values".to_string(), "contains negative values")),
            Transform::Arcsin | Transform::Arccos => data.iter().any(|v| v.abs() > 1.0).then(|| {
                (
                    format!("{self} requires values in [-1, 1]"),
                    "contains values outside [-1, 1]",
                )
            }),
            Transform::Inverse => data
                .iter()
                .any(|v| *v == 0.0)
                .then(|| ("inverse (1/x) requires non-zero values".to_string(), "contains zero")),
            _ => None,
        };

        match violation {
            Some((message, value)) => Err(ValidationError::new(message)
                .with_field("data")
                .with_value(value)),
            None => Ok(()),
        }
    }

    /// Validate `data` against the domain, then transform every value.
    pub fn apply(self, data: &[f64]) -> Result<Vec<f64>, ValidationError> {
        self.validate(data)?;
        let f: fn(f64) -> f64 = match self {
            Transform::Log => f64::ln,
            Transform::Log10 => f64::log10,
            Transform::Log2 => f64::log2,
            Transform::Square => |x: f64| x * x,
            Transform::Cube => |x: f64| x * x * x,
            Transform::Sqrt => f64::sqrt,
            Transform::Cbrt => f64::cbrt,
            Transform::Sin => f64::sin,
            Transform::Cos => f64::cos,
            Transform::Tan => f64::tan,
            Transform::Arcsin => f64::asin,
            Transform::Arccos => f64::acos,
            Transform::Arctan => f64::atan,
            Transform::Abs => f64::abs,
            Transform::Inverse => f64::recip,
            Transform::Exp => f64::exp,
            Transform::Negate => |x: f64| -x,
        };
        Ok(data.iter().map(|v| f(*v)).collect())
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Transform {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Transform::ALL
            .into_iter()
            .find(|t| t.name() == wanted)
            .ok_or_else(|| {
                ValidationError::new("Unknown transform")
                    .with_field("transform")
                    .with_value(s)
            })
    }
}
