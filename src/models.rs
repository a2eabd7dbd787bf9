use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;

/// Concatenated upload: ordered column names and rows with one cell per column.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub path: PathBuf,
    pub rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Region,
    Month,
    Enrolment,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Region => "region",
            Role::Month => "month",
            Role::Enrolment => "enrolment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    pub region: String,
    pub month: String,
    pub enrolment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameChange {
    pub raw: String,
    pub canonical: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StandardizationImpact {
    pub already_clean: usize,
    pub auto_standardized: usize,
}

impl StandardizationImpact {
    pub fn total(&self) -> usize {
        self.already_clean + self.auto_standardized
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRow {
    pub month: NaiveDate,
    pub region: String,
    pub enrolment: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DataQuality {
    pub dropped_months: usize,
    pub blank_enrolment: usize,
    pub invalid_enrolment: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub title: String,
    pub sources: Vec<SourceSummary>,
    pub total_rows: usize,
    pub preview: Table,
    pub columns: ColumnMapping,
    pub name_changes: Vec<NameChange>,
    pub impact: StandardizationImpact,
    pub trend: Vec<TrendRow>,
    pub quality: DataQuality,
    pub regions: Vec<String>,
    pub selected_region: Option<String>,
    pub insights: Vec<String>,
}

impl Dashboard {
    pub fn region_trend<'a>(&'a self, region: &'a str) -> impl Iterator<Item = &'a TrendRow> + 'a {
        self.trend.iter().filter(move |row| row.region == region)
    }
}

pub fn month_label(month: NaiveDate) -> String {
    month.format("%b-%Y").to_string()
}

pub fn format_count(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_label_uses_short_month_and_year() {
        let month = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        assert_eq!(month_label(month), "Jan-2023");
    }

    #[test]
    fn counts_render_without_spurious_decimals() {
        assert_eq!(format_count(100.0), "100");
        assert_eq!(format_count(12.5), "12.50");
    }
}
