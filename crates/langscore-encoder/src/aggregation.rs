//! Token aggregation policies.
//!
//! A stimulus usually spans several tokens; aggregation reduces the
//! `[span_len, hidden]` slice of one layer to a single `[hidden]` vector.

use std::fmt;
use std::sync::Arc;

use candle_core::{DType, Tensor};

use langscore_core::util::median;
use langscore_core::CoreError;

use crate::error::{EncoderError, EncoderResult};

/// User-supplied reduction from `[span_len, hidden]` to `[hidden]`.
pub type AggregateFn = Arc<dyn Fn(&Tensor) -> candle_core::Result<Tensor> + Send + Sync>;

/// How the token states of one stimulus are reduced.
#[derive(Clone)]
pub enum AggregationPolicy {
    First,
    Last,
    Mean,
    Sum,
    Median,
    /// Named custom reduction. The name is part of the cache identity.
    Custom { name: String, func: AggregateFn },
}

impl AggregationPolicy {
    /// Names accepted by [`AggregationPolicy::from_name`].
    pub const NAMES: &'static [&'static str] = &["first", "last", "mean", "sum", "median"];

    /// Parse a built-in policy name.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownName`] for anything outside [`AggregationPolicy::NAMES`].
    pub fn from_name(name: &str) -> EncoderResult<Self> {
        match name {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            "mean" => Ok(Self::Mean),
            "sum" => Ok(Self::Sum),
            "median" => Ok(Self::Median),
            other => Err(EncoderError::Core(CoreError::UnknownName {
                kind: "aggregation",
                name: other.to_string(),
                expected: Self::NAMES.join(", "),
            })),
        }
    }

    pub fn custom(name: impl Into<String>, func: AggregateFn) -> Self {
        Self::Custom {
            name: name.into(),
            func,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::First => "first",
            Self::Last => "last",
            Self::Mean => "mean",
            Self::Sum => "sum",
            Self::Median => "median",
            Self::Custom { name, .. } => name.as_str(),
        }
    }

    /// Name recorded in the cache identity. Custom names are prefixed with
    /// `custom:` so they never collide with a built-in.
    pub fn identity(&self) -> String {
        match self {
            Self::Custom { name, .. } => format!("custom:{name}"),
            builtin => builtin.name().to_string(),
        }
    }

    /// Reduce `states` (`[span_len, hidden]`) along the token axis.
    pub fn aggregate(&self, states: &Tensor) -> EncoderResult<Tensor> {
        let (span_len, hidden) = states.dims2()?;
        if span_len == 0 {
            return Err(EncoderError::ShapeMismatch {
                context: format!("{} aggregation over an empty span", self.name()),
                expected: vec![1, hidden],
                actual: vec![0, hidden],
            });
        }

        let reduced = match self {
            Self::First => states.get(0)?,
            Self::Last => states.get(span_len - 1)?,
            Self::Mean => states.mean(0)?,
            Self::Sum => states.sum(0)?,
            Self::Median => column_median(states)?,
            Self::Custom { func, .. } => func(states)?,
        };

        if reduced.rank() != 1 {
            return Err(EncoderError::ShapeMismatch {
                context: format!("{} aggregation output", self.name()),
                expected: vec![hidden],
                actual: reduced.dims().to_vec(),
            });
        }
        Ok(reduced)
    }
}

impl fmt::Debug for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom { name, .. } => f.debug_struct("Custom").field("name", name).finish(),
            other => f.write_str(other.name()),
        }
    }
}

impl PartialEq for AggregationPolicy {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

/// Per-column median; even counts average the two middle values.
fn column_median(states: &Tensor) -> EncoderResult<Tensor> {
    let rows: Vec<Vec<f32>> = states.to_dtype(DType::F32)?.to_vec2()?;
    let hidden = rows.first().map_or(0, Vec::len);
    let medians: Vec<f32> = (0..hidden)
        .map(|c| {
            let column: Vec<f64> = rows.iter().map(|row| row[c] as f64).collect();
            median(&column) as f32
        })
        .collect();
    Ok(Tensor::from_vec(medians, hidden, states.device())?.to_dtype(states.dtype())?)
}
