//! Console rendering of pool state.
//!
//! Purely presentational. The numbers come from `PoolView`, the same
//! decimal conversion the decision engine uses.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

use crate::engine::decision::PoolView;

/// Pool figures for the per-cycle summary table.
#[derive(Debug, Clone)]
pub struct PoolSummary {
    pub max_pool_size: Decimal,
    pub total_staked: Decimal,
    pub available_space: Decimal,
    pub unit: String,
    pub taken_at: DateTime<Utc>,
}

impl PoolSummary {
    pub fn new(view: &PoolView, unit: &str) -> Self {
        Self {
            max_pool_size: view.max_pool_size,
            total_staked: view.total_staked,
            available_space: view.available_space,
            unit: unit.to_string(),
            taken_at: Utc::now(),
        }
    }

    /// `Pool: 400/1000 LINK, Av.: 600 LINK`
    pub fn one_line(&self) -> String {
        format!(
            "Pool: {}/{} {unit}, Av.: {} {unit}",
            self.total_staked,
            self.max_pool_size,
            self.available_space,
            unit = self.unit
        )
    }
}

impl fmt::Display for PoolSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("Max Pool Size", format!("{} {}", self.max_pool_size, self.unit)),
            ("Total Staked", format!("{} {}", self.total_staked, self.unit)),
            ("Available Space", format!("{} {}", self.available_space, self.unit)),
        ];
        let title = format!("Pool Info ({})", self.taken_at.format("%Y-%m-%d %H:%M:%S"));

        let metric_w = rows.iter().map(|(m, _)| m.len()).max().unwrap_or(0).max("Metric".len());
        let value_w = rows.iter().map(|(_, v)| v.len()).max().unwrap_or(0).max("Value".len());
        let border = format!("+-{}-+-{}-+", "-".repeat(metric_w), "-".repeat(value_w));

        writeln!(f, "{title}")?;
        writeln!(f, "{border}")?;
        writeln!(f, "| {:<metric_w$} | {:<value_w$} |", "Metric", "Value")?;
        writeln!(f, "{border}")?;
        for (metric, value) in &rows {
            writeln!(f, "| {metric:<metric_w$} | {value:<value_w$} |")?;
        }
        write!(f, "{border}")
    }
}
