//! Key inference for pie charts.
//!
//! Name and value keys are resolved by walking an ordered list of strategies; the first that
//! yields a key wins. An explicit binding always wins, even when the row does not carry it, so
//! that a stale binding is reported instead of silently replaced.
use serde::Serialize;
use strum::Display;

use crate::core::types::{ResultRow, is_numeric_like};
use crate::core::widget::ChartConfig;
use crate::render::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum NameStrategy {
    ExplicitXAxis,
    ExplicitGroupBy,
    FirstTextKey,
    FirstKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum ValueStrategy {
    ExplicitYAxis,
    FirstNumericKey,
    SecondKey,
    FirstKey,
}

pub const NAME_STRATEGIES: [NameStrategy; 4] = [
    NameStrategy::ExplicitXAxis,
    NameStrategy::ExplicitGroupBy,
    NameStrategy::FirstTextKey,
    NameStrategy::FirstKey,
];

pub const VALUE_STRATEGIES: [ValueStrategy; 4] = [
    ValueStrategy::ExplicitYAxis,
    ValueStrategy::FirstNumericKey,
    ValueStrategy::SecondKey,
    ValueStrategy::FirstKey,
];

impl NameStrategy {
    pub fn resolve(self, row: &ResultRow, chart: &ChartConfig) -> Option<String> {
        match self {
            NameStrategy::ExplicitXAxis => chart.x_axis.clone().filter(|k| !k.is_empty()),
            NameStrategy::ExplicitGroupBy => chart.group_by.clone().filter(|k| !k.is_empty()),
            NameStrategy::FirstTextKey => row.iter().find(|(_, v)| !is_numeric_like(v)).map(|(k, _)| k.clone()),
            NameStrategy::FirstKey => row.keys().next().cloned(),
        }
    }
}

impl ValueStrategy {
    pub fn resolve(self, row: &ResultRow, chart: &ChartConfig) -> Option<String> {
        match self {
            ValueStrategy::ExplicitYAxis => chart.y_axis.first().filter(|k| !k.is_empty()).cloned(),
            ValueStrategy::FirstNumericKey => row.iter().find(|(_, v)| is_numeric_like(v)).map(|(k, _)| k.clone()),
            ValueStrategy::SecondKey => row.keys().nth(1).cloned(),
            ValueStrategy::FirstKey => row.keys().next().cloned(),
        }
    }
}

/// Resolved pie keys and the strategies that produced them
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PieKeys {
    pub name_key: String,
    pub value_key: String,
    pub name_via: NameStrategy,
    pub value_via: ValueStrategy,
}

fn first_match<S: Copy>(
    strategies: &[S],
    resolve: impl Fn(S) -> Option<String>,
) -> Option<(String, S)> {
    strategies.iter().find_map(|s| resolve(*s).map(|key| (key, *s)))
}

/// Pick the name and value keys for a pie from the first result row
pub fn infer_pie_keys(row: &ResultRow, chart: &ChartConfig) -> Result<PieKeys, RenderError> {
    let name = first_match(&NAME_STRATEGIES, |s| s.resolve(row, chart));
    let value = first_match(&VALUE_STRATEGIES, |s| s.resolve(row, chart));

    match (name, value) {
        (Some((name_key, name_via)), Some((value_key, value_via)))
            if row.contains_key(&name_key) && row.contains_key(&value_key) =>
        {
            Ok(PieKeys { name_key, value_key, name_via, value_via })
        }
        (name, value) => Err(RenderError::InferenceFailed {
            attempted_name: name.map(|(k, _)| k).unwrap_or_default(),
            attempted_value: value.map(|(k, _)| k).unwrap_or_default(),
            available: row.keys().cloned().collect(),
        }),
    }
}
