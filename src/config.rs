use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

pub const DEFAULT_REFERENCE_REGIONS: [&str; 15] = [
    "ANDHRA PRADESH",
    "ODISHA",
    "DELHI",
    "MAHARASHTRA",
    "TAMIL NADU",
    "KARNATAKA",
    "TELANGANA",
    "WEST BENGAL",
    "UTTAR PRADESH",
    "GUJARAT",
    "RAJASTHAN",
    "KERALA",
    "PUNJAB",
    "BIHAR",
    "MADHYA PRADESH",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub preview_rows: usize,
    pub similarity_cutoff: f64,
    pub reference_regions: Vec<String>,
    pub invalid_months: InvalidMonthPolicy,
    pub columns: ColumnRules,
}

/// What to do with a row whose month cell cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidMonthPolicy {
    #[serde(rename = "drop")]
    Drop,
    #[serde(rename = "fail")]
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnRules {
    pub region: ColumnRule,
    pub month: ColumnRule,
    pub enrolment: ColumnRule,
}

/// Either an exact column name or a keyword searched for in column names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnRule {
    pub keyword: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl ColumnRule {
    pub fn keyword(keyword: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            column: None,
        }
    }

    pub fn describe(&self) -> String {
        match &self.column {
            Some(column) => format!("column named {column:?}"),
            None => format!("a column containing {:?}", self.keyword),
        }
    }
}

impl Default for ColumnRules {
    fn default() -> Self {
        Self {
            region: ColumnRule::keyword("state"),
            month: ColumnRule::keyword("month"),
            enrolment: ColumnRule::keyword("enrol"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Enrolment Data Standardization & Trend Studio".to_string(),
            preview_rows: 5,
            similarity_cutoff: 0.7,
            reference_regions: DEFAULT_REFERENCE_REGIONS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            invalid_months: InvalidMonthPolicy::Drop,
            columns: ColumnRules::default(),
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)
            .with_context(|| format!("failed to read config {}", file_path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", file_path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)
            .with_context(|| format!("failed to write config {}", file_path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), DashboardError> {
        if !(0.0..=1.0).contains(&self.similarity_cutoff) {
            return Err(DashboardError::InvalidConfig(format!(
                "similarity_cutoff must be between 0 and 1, got {}",
                self.similarity_cutoff
            )));
        }

        let rules = [
            ("region", &self.columns.region),
            ("month", &self.columns.month),
            ("enrolment", &self.columns.enrolment),
        ];
        for (role, rule) in rules {
            if rule.column.is_none() && rule.keyword.trim().is_empty() {
                return Err(DashboardError::InvalidConfig(format!(
                    "columns.{role} needs a keyword or a column name"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_heuristics() {
        let config = Config::default();
        assert_eq!(config.columns.region.keyword, "state");
        assert_eq!(config.columns.month.keyword, "month");
        assert_eq!(config.columns.enrolment.keyword, "enrol");
        assert_eq!(config.similarity_cutoff, 0.7);
        assert_eq!(config.reference_regions.len(), 15);
        assert_eq!(config.invalid_months, InvalidMonthPolicy::Drop);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            invalid_months = "fail"

            [columns.region]
            keyword = "province"
            column = "Province Name"
            "#,
        )
        .unwrap();

        assert_eq!(config.invalid_months, InvalidMonthPolicy::Fail);
        assert_eq!(config.columns.region.column.as_deref(), Some("Province Name"));
        assert_eq!(config.columns.month.keyword, "month");
        assert_eq!(config.preview_rows, 5);
    }

    #[test]
    fn rejects_out_of_range_cutoff() {
        let config = Config {
            similarity_cutoff: 1.5,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DashboardError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_rule_without_keyword_or_column() {
        let mut config = Config::default();
        config.columns.month = ColumnRule::keyword("  ");
        assert!(matches!(
            config.validate(),
            Err(DashboardError::InvalidConfig(_))
        ));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studio.toml");
        let mut config = Config::default();
        config.reference_regions = vec!["GOA".to_string()];
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.reference_regions, vec!["GOA".to_string()]);
        assert_eq!(loaded.title, config.title);
    }
}
