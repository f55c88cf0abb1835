//! Filter grammar: the closed operator set, its arity classes, and filter validation.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter};
use thiserror::Error;

use crate::core::types::{FilterId, display_scalar, is_truthy};

/// Comparison operator usable in a widget filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    #[strum(serialize = "=")]
    Equal,
    #[serde(rename = "!=")]
    #[strum(serialize = "!=")]
    NotEqual,
    #[serde(rename = ">")]
    #[strum(serialize = ">")]
    Greater,
    #[serde(rename = ">=")]
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[serde(rename = "<")]
    #[strum(serialize = "<")]
    Less,
    #[serde(rename = "<=")]
    #[strum(serialize = "<=")]
    LessEqual,
    #[serde(rename = "LIKE")]
    #[strum(serialize = "LIKE")]
    Like,
    #[serde(rename = "NOT LIKE")]
    #[strum(serialize = "NOT LIKE")]
    NotLike,
    #[serde(rename = "BETWEEN")]
    #[strum(serialize = "BETWEEN")]
    Between,
    #[serde(rename = "IN")]
    #[strum(serialize = "IN")]
    In,
    #[serde(rename = "IS NULL")]
    #[strum(serialize = "IS NULL")]
    IsNull,
    #[serde(rename = "IS NOT NULL")]
    #[strum(serialize = "IS NOT NULL")]
    IsNotNull,
}

/// How many values an operator consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Zero,
    Single,
    Two,
    Multi,
}

impl Operator {
    pub fn arity(self) -> Arity {
        match self {
            Operator::IsNull | Operator::IsNotNull => Arity::Zero,
            Operator::Between => Arity::Two,
            Operator::In => Arity::Multi,
            Operator::Equal
            | Operator::NotEqual
            | Operator::Greater
            | Operator::GreaterEqual
            | Operator::Less
            | Operator::LessEqual
            | Operator::Like
            | Operator::NotLike => Arity::Single,
        }
    }
}

pub fn operator_requires_value(op: Operator) -> bool {
    op.arity() != Arity::Zero
}

pub fn operator_requires_two_values(op: Operator) -> bool {
    op.arity() == Arity::Two
}

pub fn operator_accepts_multiple_values(op: Operator) -> bool {
    op.arity() == Arity::Multi
}

/// A single column filter. Value fields are only meaningful for the operator's arity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(default)]
    pub id: FilterId,
    #[serde(default)]
    pub column: String,
    #[serde(default)]
    pub operator: Option<Operator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,
}

/// Why a filter draft was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Select a column for the filter")]
    MissingColumn,
    #[error("Select an operator for the filter")]
    MissingOperator,
    #[error("{0} requires two values")]
    MissingRange(Operator),
    #[error("{0} requires at least one value")]
    MissingValues(Operator),
    #[error("{0} requires a value")]
    MissingValue(Operator),
}

impl Filter {
    pub fn new(column: impl Into<String>, operator: Operator) -> Self {
        Self {
            column: column.into(),
            operator: Some(operator),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_range(mut self, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.value = Some(low.into());
        self.value2 = Some(high.into());
        self
    }

    pub fn with_values<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Column and operator are both set. This is the narrowing applied on save.
    pub fn has_column_and_operator(&self) -> bool {
        !self.column.is_empty() && self.operator.is_some()
    }

    /// One-line description for lists and logs
    pub fn summary(&self) -> String {
        let Some(op) = self.operator else {
            return format!("{} <no operator>", self.column);
        };
        let value = self.value.as_ref().map(display_scalar).unwrap_or_default();
        match op.arity() {
            Arity::Zero => format!("{} {}", self.column, op),
            Arity::Single => format!("{} {} {}", self.column, op, value),
            Arity::Two => {
                let high = self.value2.as_ref().map(display_scalar).unwrap_or_default();
                format!("{} {} {} AND {}", self.column, op, value, high)
            }
            Arity::Multi => {
                let values: Vec<String> = self.values.iter().map(display_scalar).collect();
                format!("{} {} ({})", self.column, op, values.join(", "))
            }
        }
    }
}

/// Validate a filter, failing fast on the first problem.
///
/// Order: column, operator, then the operator's arity class. Two-value operators need
/// both bounds truthy, multi-value operators a non-empty list, single-value operators a
/// truthy value or the number zero. Zero-value operators ignore any populated values.
pub fn validate_filter(filter: &Filter) -> Result<(), FilterError> {
    if filter.column.trim().is_empty() {
        return Err(FilterError::MissingColumn);
    }
    let op = filter.operator.ok_or(FilterError::MissingOperator)?;
    match op.arity() {
        Arity::Zero => Ok(()),
        Arity::Two => {
            let low = filter.value.as_ref().is_some_and(is_truthy);
            let high = filter.value2.as_ref().is_some_and(is_truthy);
            if low && high { Ok(()) } else { Err(FilterError::MissingRange(op)) }
        }
        Arity::Multi => {
            if filter.values.is_empty() {
                Err(FilterError::MissingValues(op))
            } else {
                Ok(())
            }
        }
        Arity::Single => match &filter.value {
            Some(v) if is_truthy(v) || is_zero(v) => Ok(()),
            _ => Err(FilterError::MissingValue(op)),
        },
    }
}

fn is_zero(value: &Value) -> bool {
    matches!(value, Value::Number(n) if n.as_f64() == Some(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strum::IntoEnumIterator;

    #[test]
    fn arity_is_fixed_per_operator() {
        for op in Operator::iter() {
            let expected = match op {
                Operator::IsNull | Operator::IsNotNull => Arity::Zero,
                Operator::Between => Arity::Two,
                Operator::In => Arity::Multi,
                _ => Arity::Single,
            };
            assert_eq!(op.arity(), expected, "{op}");
        }
        assert!(!operator_requires_value(Operator::IsNull));
        assert!(operator_requires_two_values(Operator::Between));
        assert!(operator_accepts_multiple_values(Operator::In));
        assert!(!operator_accepts_multiple_values(Operator::Like));
    }

    #[test]
    fn operator_serializes_as_sql_symbol() {
        assert_eq!(serde_json::to_string(&Operator::NotLike).unwrap(), "\"NOT LIKE\"");
        let op: Operator = serde_json::from_str("\"=\"").unwrap();
        assert_eq!(op, Operator::Equal);
        assert_eq!(Operator::GreaterEqual.to_string(), ">=");
    }

    #[test]
    fn validation_fails_fast_in_order() {
        let mut f = Filter::default();
        assert_eq!(validate_filter(&f), Err(FilterError::MissingColumn));
        f.column = "x".into();
        assert_eq!(validate_filter(&f), Err(FilterError::MissingOperator));
        f.operator = Some(Operator::Equal);
        assert_eq!(validate_filter(&f), Err(FilterError::MissingValue(Operator::Equal)));
    }

    #[test]
    fn between_needs_both_bounds() {
        let only_low = Filter::new("amount", Operator::Between).with_value(10);
        assert_eq!(validate_filter(&only_low), Err(FilterError::MissingRange(Operator::Between)));
        let both = Filter::new("amount", Operator::Between).with_range(10, 20);
        assert!(validate_filter(&both).is_ok());
        // bounds are checked for truthiness, so a zero bound is refused
        let zero = Filter::new("amount", Operator::Between).with_range(0, 20);
        assert!(validate_filter(&zero).is_err());
    }

    #[test]
    fn single_value_accepts_zero_but_not_empty() {
        assert!(validate_filter(&Filter::new("n", Operator::Equal).with_value(0)).is_ok());
        assert!(validate_filter(&Filter::new("n", Operator::Greater).with_value("5")).is_ok());
        assert!(validate_filter(&Filter::new("n", Operator::Equal).with_value("")).is_err());
        assert!(validate_filter(&Filter::new("n", Operator::Equal).with_value(Value::Null)).is_err());
    }

    #[test]
    fn in_needs_values() {
        assert_eq!(
            validate_filter(&Filter::new("s", Operator::In)),
            Err(FilterError::MissingValues(Operator::In))
        );
        assert!(validate_filter(&Filter::new("s", Operator::In).with_values(["a", "b"])).is_ok());
    }

    #[test]
    fn null_checks_ignore_values() {
        let f = Filter::new("due", Operator::IsNull).with_value("ignored").with_values([1, 2]);
        assert!(validate_filter(&f).is_ok());
        assert!(validate_filter(&Filter::new("due", Operator::IsNotNull)).is_ok());
    }

    #[test]
    fn summary_formats_by_arity() {
        assert_eq!(Filter::new("a", Operator::IsNull).summary(), "a IS NULL");
        assert_eq!(Filter::new("a", Operator::Like).with_value("x%").summary(), "a LIKE x%");
        assert_eq!(Filter::new("a", Operator::Between).with_range(1, 2).summary(), "a BETWEEN 1 AND 2");
        assert_eq!(Filter::new("a", Operator::In).with_values([json!("p"), json!("q")]).summary(), "a IN (p, q)");
    }
}
