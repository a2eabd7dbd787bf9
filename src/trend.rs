use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use crate::config::InvalidMonthPolicy;
use crate::error::DashboardError;
use crate::models::{DataQuality, TrendRow};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: [&str; 10] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%b %d, %Y",
];

/// Best-effort date parsing for month cells. Values without a day resolve to
/// the first of the month.
pub fn parse_month(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.date_naive());
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed.date());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, format) {
            return Some(parsed);
        }
    }

    if value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, "%Y%m%d") {
            return Some(parsed);
        }
    }

    // year and month only
    for (format, sep) in [("%Y-%m-%d", '-'), ("%Y/%m/%d", '/')] {
        if let Ok(parsed) = NaiveDate::parse_from_str(&format!("{value}{sep}01"), format) {
            return Some(parsed);
        }
    }

    // month name and year: Jan-2023, January 2023
    for (prefix, format) in [("01-", "%d-%b-%Y"), ("01 ", "%d %b %Y"), ("01/", "%d/%b/%Y")] {
        if let Ok(parsed) = NaiveDate::parse_from_str(&format!("{prefix}{value}"), format) {
            return Some(parsed);
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Enrolment {
    Value(f64),
    Blank,
    Invalid,
}

pub fn parse_enrolment(raw: &str) -> Enrolment {
    let value = raw.trim();
    if value.is_empty() {
        return Enrolment::Blank;
    }
    match value.replace(',', "").parse::<f64>() {
        Ok(number) if number.is_finite() => Enrolment::Value(number),
        _ => Enrolment::Invalid,
    }
}

/// One row fed into the aggregation: canonical region plus raw month and
/// enrolment cells.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub region: &'a str,
    pub month: &'a str,
    pub enrolment: &'a str,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub rows: Vec<TrendRow>,
    pub quality: DataQuality,
}

/// Groups observations by (parsed month, region) and sums enrolment.
///
/// Rows are returned sorted by month, then region.
pub fn aggregate<'a>(
    observations: impl IntoIterator<Item = Observation<'a>>,
    policy: InvalidMonthPolicy,
) -> Result<Aggregation, DashboardError> {
    let mut groups: BTreeMap<(NaiveDate, String), f64> = BTreeMap::new();
    let mut quality = DataQuality::default();

    for (index, observation) in observations.into_iter().enumerate() {
        let row = index + 1;
        let Some(month) = parse_month(observation.month) else {
            match policy {
                InvalidMonthPolicy::Fail => {
                    return Err(DashboardError::UnparseableMonth {
                        row,
                        value: observation.month.to_string(),
                    });
                }
                InvalidMonthPolicy::Drop => {
                    debug!("row {row}: dropping unparseable month {:?}", observation.month);
                    quality.dropped_months += 1;
                    continue;
                }
            }
        };

        let amount = match parse_enrolment(observation.enrolment) {
            Enrolment::Value(number) => number,
            Enrolment::Blank => {
                quality.blank_enrolment += 1;
                0.0
            }
            Enrolment::Invalid => {
                debug!("row {row}: enrolment {:?} is not numeric", observation.enrolment);
                quality.invalid_enrolment += 1;
                0.0
            }
        };

        *groups
            .entry((month, observation.region.to_string()))
            .or_insert(0.0) += amount;
    }

    if quality.dropped_months > 0 {
        warn!(
            "rows dropped for an unparseable month: {}",
            quality.dropped_months
        );
    }
    if quality.invalid_enrolment > 0 {
        warn!(
            "rows with a non-numeric enrolment: {}",
            quality.invalid_enrolment
        );
    }

    let rows = groups
        .into_iter()
        .map(|((month, region), enrolment)| TrendRow {
            month,
            region,
            enrolment,
        })
        .collect();

    Ok(Aggregation { rows, quality })
}

/// Distinct regions in trend order.
pub fn regions(rows: &[TrendRow]) -> Vec<String> {
    let mut seen = Vec::new();
    for row in rows {
        if !seen.contains(&row.region) {
            seen.push(row.region.clone());
        }
    }
    seen
}
