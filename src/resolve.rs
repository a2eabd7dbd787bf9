use tracing::info;

use crate::config::{ColumnRule, ColumnRules};
use crate::error::DashboardError;
use crate::models::{ColumnMapping, Role};

/// Resolves region, month and enrolment in that order.
///
/// A column claimed by an earlier role is not eligible for a later one; among
/// eligible columns the first by position wins.
pub fn resolve_columns(
    columns: &[String],
    rules: &ColumnRules,
) -> Result<ColumnMapping, DashboardError> {
    let mut claimed: Vec<usize> = Vec::with_capacity(3);

    let mut pick = |role: Role, rule: &ColumnRule| -> Result<String, DashboardError> {
        let index = find_column(columns, rule, &claimed).ok_or_else(|| missing(role, rule))?;
        claimed.push(index);
        info!("using {} column: {}", role.label(), columns[index]);
        Ok(columns[index].clone())
    };

    let region = pick(Role::Region, &rules.region)?;
    let month = pick(Role::Month, &rules.month)?;
    let enrolment = pick(Role::Enrolment, &rules.enrolment)?;

    Ok(ColumnMapping {
        region,
        month,
        enrolment,
    })
}

/// First column, by position, that satisfies `rule` and is not in `excluded`.
pub fn find_column(columns: &[String], rule: &ColumnRule, excluded: &[usize]) -> Option<usize> {
    let eligible = columns
        .iter()
        .enumerate()
        .filter(|(index, _)| !excluded.contains(index));

    match &rule.column {
        Some(name) => eligible
            .filter(|(_, column)| column.to_lowercase() == name.to_lowercase())
            .map(|(index, _)| index)
            .next(),
        None => {
            let keyword = rule.keyword.to_lowercase();
            eligible
                .filter(|(_, column)| column.to_lowercase().contains(&keyword))
                .map(|(index, _)| index)
                .next()
        }
    }
}

fn missing(role: Role, rule: &ColumnRule) -> DashboardError {
    let wanted = rule.describe();
    match role {
        Role::Region => DashboardError::MissingRegionColumn(wanted),
        Role::Month => DashboardError::MissingMonthColumn(wanted),
        Role::Enrolment => DashboardError::MissingEnrolmentColumn(wanted),
    }
}
