use std::collections::HashSet;
use std::fmt::Write;

use tracing::info;

use crate::config::Config;
use crate::error::DashboardError;
use crate::models::{
    format_count, month_label, Dashboard, DataQuality, NameChange, SourceSummary,
    StandardizationImpact, Table,
};
use crate::normalize::RegionNormalizer;
use crate::resolve;
use crate::trend::{self, Observation};

/// Runs resolve, normalize and aggregate over one upload.
pub fn build_dashboard(
    table: &Table,
    sources: Vec<SourceSummary>,
    config: &Config,
    region: Option<&str>,
) -> Result<Dashboard, DashboardError> {
    let columns = resolve::resolve_columns(&table.columns, &config.columns)?;
    let normalizer = RegionNormalizer::new(&config.reference_regions, config.similarity_cutoff);

    let region_idx = table.column_index(&columns.region).unwrap_or_default();
    let month_idx = table.column_index(&columns.month).unwrap_or_default();
    let enrolment_idx = table.column_index(&columns.enrolment).unwrap_or_default();

    let canonical: Vec<String> = table
        .rows
        .iter()
        .map(|row| normalizer.normalize(&row[region_idx]))
        .collect();

    let name_changes = summarize_name_changes(
        table.rows.iter().map(|row| row[region_idx].as_str()),
        &canonical,
    );
    let impact = standardization_impact(
        table.rows.iter().map(|row| row[region_idx].as_str()),
        &canonical,
    );
    info!(
        "{} rows already clean, {} auto-standardized",
        impact.already_clean, impact.auto_standardized
    );

    let observations = table
        .rows
        .iter()
        .zip(&canonical)
        .map(|(row, region)| Observation {
            region: region.as_str(),
            month: row[month_idx].as_str(),
            enrolment: row[enrolment_idx].as_str(),
        });
    let aggregation = trend::aggregate(observations, config.invalid_months)?;
    let regions = trend::regions(&aggregation.rows);

    let selected_region = match region {
        Some(wanted) => {
            let wanted = wanted.trim().to_uppercase();
            if !regions.contains(&wanted) {
                return Err(DashboardError::UnknownRegion(wanted));
            }
            Some(wanted)
        }
        None => regions.first().cloned(),
    };

    let preview = Table {
        columns: table.columns.clone(),
        rows: table.rows.iter().take(config.preview_rows).cloned().collect(),
    };
    let insights = build_insights(table.len(), &impact, &aggregation.quality, regions.len());

    Ok(Dashboard {
        title: config.title.clone(),
        sources,
        total_rows: table.len(),
        preview,
        columns,
        name_changes,
        impact,
        trend: aggregation.rows,
        quality: aggregation.quality,
        regions,
        selected_region,
        insights,
    })
}

/// Unique (raw, canonical) pairs in first-seen order.
pub fn summarize_name_changes<'a>(
    raw: impl Iterator<Item = &'a str>,
    canonical: &[String],
) -> Vec<NameChange> {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut changes = Vec::new();

    for (raw, canonical) in raw.zip(canonical) {
        if seen.insert((raw, canonical.as_str())) {
            changes.push(NameChange {
                raw: raw.to_string(),
                canonical: canonical.clone(),
            });
        }
    }

    changes
}

/// A row counts as clean when its upper-cased raw value already equals the canonical one.
pub fn standardization_impact<'a>(
    raw: impl Iterator<Item = &'a str>,
    canonical: &[String],
) -> StandardizationImpact {
    let mut impact = StandardizationImpact::default();
    for (raw, canonical) in raw.zip(canonical) {
        if raw.to_uppercase() == *canonical {
            impact.already_clean += 1;
        } else {
            impact.auto_standardized += 1;
        }
    }
    impact
}

pub fn build_insights(
    total_rows: usize,
    impact: &StandardizationImpact,
    quality: &DataQuality,
    region_count: usize,
) -> Vec<String> {
    let mut insights = vec![
        "Multiple state naming formats fragment enrolment analysis".to_string(),
        "Auto-standardization improves aggregation accuracy".to_string(),
        "Clean timelines enable reliable trend interpretation".to_string(),
        "Dynamic column detection makes the system robust".to_string(),
    ];

    if total_rows > 0 {
        let share = impact.auto_standardized as f64 * 100.0 / total_rows as f64;
        insights.push(format!(
            "Rows with a standardized region name: {} of {} ({:.1}%)",
            impact.auto_standardized, total_rows, share
        ));
    }
    insights.push(format!("Regions in the trend: {region_count}"));
    if quality.dropped_months > 0 {
        insights.push(format!(
            "Rows excluded for an unparseable month: {}",
            quality.dropped_months
        ));
    }
    if quality.invalid_enrolment > 0 {
        insights.push(format!(
            "Rows with a non-numeric enrolment counted as zero: {}",
            quality.invalid_enrolment
        ));
    }

    insights
}

pub fn build_summary(dashboard: &Dashboard) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# {}", dashboard.title);
    let _ = writeln!(
        output,
        "Loaded {} rows from {} files",
        dashboard.total_rows,
        dashboard.sources.len()
    );
    for source in &dashboard.sources {
        let _ = writeln!(output, "- {}: {} rows", source.path.display(), source.rows);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Columns");
    let _ = writeln!(output, "- region: {}", dashboard.columns.region);
    let _ = writeln!(output, "- month: {}", dashboard.columns.month);
    let _ = writeln!(output, "- enrolment: {}", dashboard.columns.enrolment);

    let _ = writeln!(output);
    let _ = writeln!(output, "## State Name Standardization");
    if dashboard.name_changes.is_empty() {
        let _ = writeln!(output, "No region values found.");
    } else {
        for change in &dashboard.name_changes {
            let _ = writeln!(output, "- {} -> {}", change.raw, change.canonical);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Standardization Impact");
    let _ = writeln!(output, "- Already Clean: {}", dashboard.impact.already_clean);
    let _ = writeln!(
        output,
        "- Auto-Standardized: {}",
        dashboard.impact.auto_standardized
    );

    let _ = writeln!(output);
    match &dashboard.selected_region {
        Some(region) => {
            let _ = writeln!(output, "## Monthly Enrolment Trend - {region}");
            for row in dashboard.region_trend(region) {
                let _ = writeln!(
                    output,
                    "- {}: {}",
                    month_label(row.month),
                    format_count(row.enrolment)
                );
            }
        }
        None => {
            let _ = writeln!(output, "## Monthly Enrolment Trend");
            let _ = writeln!(output, "No rows with a parseable month.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Data Quality");
    let _ = writeln!(
        output,
        "- Dropped (unparseable month): {}",
        dashboard.quality.dropped_months
    );
    let _ = writeln!(
        output,
        "- Blank enrolment: {}",
        dashboard.quality.blank_enrolment
    );
    let _ = writeln!(
        output,
        "- Non-numeric enrolment: {}",
        dashboard.quality.invalid_enrolment
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Insights");
    for insight in &dashboard.insights {
        let _ = writeln!(output, "- {insight}");
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InvalidMonthPolicy;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    fn sources(rows: usize) -> Vec<SourceSummary> {
        vec![SourceSummary {
            path: PathBuf::from("upload.csv"),
            rows,
        }]
    }

    #[test]
    fn scenario_row_lands_in_january_aggregate() {
        let upload = table(
            &["StateName", "EnrollMonth", "EnrolCount"],
            &[&["andhra pradesh", "2023-01", "100"]],
        );

        let dashboard = build_dashboard(&upload, sources(1), &Config::default(), None).unwrap();
        assert_eq!(dashboard.columns.region, "StateName");
        assert_eq!(dashboard.columns.month, "EnrollMonth");
        assert_eq!(dashboard.columns.enrolment, "EnrolCount");
        assert_eq!(dashboard.trend.len(), 1);

        let row = &dashboard.trend[0];
        assert_eq!(row.region, "ANDHRA PRADESH");
        assert_eq!(row.month, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(month_label(row.month), "Jan-2023");
        assert_eq!(row.enrolment, 100.0);
    }

    #[test]
    fn rows_with_bad_months_are_excluded_but_still_count_for_impact() {
        let upload = table(
            &["state", "month", "enrolment"],
            &[
                &["Delhi", "2023-01", "10"],
                &["delhi", "not-a-date", "500"],
                &["Tamilnadu", "2023-01", "4"],
            ],
        );

        let dashboard = build_dashboard(&upload, sources(3), &Config::default(), None).unwrap();
        assert_eq!(dashboard.quality.dropped_months, 1);
        assert_eq!(dashboard.impact.total(), 3);
        assert_eq!(dashboard.impact.already_clean, 2);
        assert_eq!(dashboard.impact.auto_standardized, 1);

        let total: f64 = dashboard.trend.iter().map(|row| row.enrolment).sum();
        assert_eq!(total, 14.0);
        assert!(dashboard
            .insights
            .iter()
            .any(|line| line == "Rows excluded for an unparseable month: 1"));
    }

    #[test]
    fn insight_counts_read_correctly_for_a_single_row() {
        let quality = DataQuality {
            dropped_months: 1,
            blank_enrolment: 0,
            invalid_enrolment: 1,
        };
        let impact = StandardizationImpact {
            already_clean: 0,
            auto_standardized: 1,
        };

        let insights = build_insights(1, &impact, &quality, 1);
        let has = |expected: &str| insights.iter().any(|line| line == expected);
        assert!(has("Rows with a standardized region name: 1 of 1 (100.0%)"));
        assert!(has("Regions in the trend: 1"));
        assert!(has("Rows excluded for an unparseable month: 1"));
        assert!(has("Rows with a non-numeric enrolment counted as zero: 1"));
        assert!(!insights.iter().any(|line| line.contains("1 rows")));
    }

    #[test]
    fn fail_policy_aborts_the_build() {
        let upload = table(
            &["state", "month", "enrolment"],
            &[&["Delhi", "someday", "10"]],
        );
        let config = Config {
            invalid_months: InvalidMonthPolicy::Fail,
            ..Config::default()
        };

        let err = build_dashboard(&upload, sources(1), &config, None).unwrap_err();
        assert!(matches!(err, DashboardError::UnparseableMonth { row: 1, .. }));
    }

    #[test]
    fn missing_column_stops_processing() {
        let upload = table(&["state", "enrolment"], &[&["Delhi", "10"]]);
        let err = build_dashboard(&upload, sources(1), &Config::default(), None).unwrap_err();
        assert!(matches!(err, DashboardError::MissingMonthColumn(_)));
    }

    #[test]
    fn name_changes_are_unique_pairs_in_first_seen_order() {
        let raw = ["Kerala", "kerala", "Kerala", "Orissa"];
        let canonical: Vec<String> = ["KERALA", "KERALA", "KERALA", "ORISSA"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let changes = summarize_name_changes(raw.into_iter(), &canonical);
        let pairs: Vec<(&str, &str)> = changes
            .iter()
            .map(|c| (c.raw.as_str(), c.canonical.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("Kerala", "KERALA"), ("kerala", "KERALA"), ("Orissa", "ORISSA")]
        );
    }

    #[test]
    fn region_selection_defaults_to_first_and_validates_choice() {
        let upload = table(
            &["state", "month", "enrolment"],
            &[&["Kerala", "2023-01", "1"], &["Bihar", "2023-01", "2"]],
        );

        let dashboard = build_dashboard(&upload, sources(2), &Config::default(), None).unwrap();
        assert_eq!(dashboard.regions, vec!["BIHAR", "KERALA"]);
        assert_eq!(dashboard.selected_region.as_deref(), Some("BIHAR"));

        let dashboard =
            build_dashboard(&upload, sources(2), &Config::default(), Some("kerala")).unwrap();
        assert_eq!(dashboard.selected_region.as_deref(), Some("KERALA"));

        let err =
            build_dashboard(&upload, sources(2), &Config::default(), Some("Goa")).unwrap_err();
        assert!(matches!(err, DashboardError::UnknownRegion(name) if name == "GOA"));
    }

    #[test]
    fn preview_is_limited_to_configured_rows() {
        let upload = table(
            &["state", "month", "enrolment"],
            &[
                &["Kerala", "2023-01", "1"],
                &["Kerala", "2023-02", "1"],
                &["Kerala", "2023-03", "1"],
            ],
        );
        let config = Config {
            preview_rows: 2,
            ..Config::default()
        };

        let dashboard = build_dashboard(&upload, sources(3), &config, None).unwrap();
        assert_eq!(dashboard.preview.rows.len(), 2);
        assert_eq!(dashboard.total_rows, 3);
    }

    #[test]
    fn summary_lists_selected_region_trend() {
        let upload = table(
            &["state", "month", "enrolment"],
            &[&["Kerala", "2023-01", "12"], &["Kerala", "2023-02", "8"]],
        );
        let dashboard = build_dashboard(&upload, sources(2), &Config::default(), None).unwrap();

        let summary = build_summary(&dashboard);
        assert!(summary.contains("## Monthly Enrolment Trend - KERALA"));
        assert!(summary.contains("- Jan-2023: 12"));
        assert!(summary.contains("- Feb-2023: 8"));
        assert!(summary.contains("- region: state"));
    }
}
