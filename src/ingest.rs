use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::models::{SourceSummary, Table};

/// Reads every file and concatenates them row-wise.
///
/// Columns are unioned by header name in first-seen order; a file lacking a
/// column contributes empty cells for it.
pub fn load_uploads(paths: &[PathBuf]) -> anyhow::Result<(Table, Vec<SourceSummary>)> {
    let mut tables = Vec::with_capacity(paths.len());
    let mut sources = Vec::with_capacity(paths.len());

    for path in paths {
        let table = read_csv(path)?;
        if table.is_empty() {
            warn!("{} has a header but no rows", path.display());
        } else {
            info!("loaded {} rows from {}", table.len(), path.display());
        }
        sources.push(SourceSummary {
            path: path.clone(),
            rows: table.len(),
        });
        tables.push(table);
    }

    let merged = concat(tables);
    info!(
        "merged {} files into {} rows x {} columns",
        sources.len(),
        merged.len(),
        merged.columns.len()
    );
    Ok((merged, sources))
}

pub fn read_csv(path: &Path) -> anyhow::Result<Table> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    read_csv_from(file).with_context(|| format!("failed to read CSV {}", path.display()))
}

pub fn read_csv_from<R: std::io::Read>(source: R) -> anyhow::Result<Table> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);

    let headers = reader.headers()?.clone();
    let columns = dedupe_headers(headers.iter());
    let width = columns.len();

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result?;
        if record.len() != width {
            debug!(
                "row {} has {} cells, expected {}",
                index + 1,
                record.len(),
                width
            );
        }
        let mut row: Vec<String> = record.iter().take(width).map(str::to_string).collect();
        row.resize(width, String::new());
        rows.push(row);
    }

    Ok(Table { columns, rows })
}

/// Renames repeated headers to `name.1`, `name.2`, ... so every column is addressable.
///
/// A suffix is skipped when that name is already used by any header in the
/// file, so the result never contains the same name twice.
fn dedupe_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let originals: Vec<&str> = headers.collect();
    let reserved: HashSet<&str> = originals.iter().copied().collect();
    let mut taken: HashSet<String> = HashSet::new();
    let mut columns = Vec::with_capacity(originals.len());

    for header in originals {
        let mut name = header.to_string();
        let mut suffix = 1;
        while taken.contains(&name) || (name != header && reserved.contains(name.as_str())) {
            name = format!("{header}.{suffix}");
            suffix += 1;
        }
        taken.insert(name.clone());
        columns.push(name);
    }

    columns
}

pub fn concat(tables: Vec<Table>) -> Table {
    let mut columns: Vec<String> = Vec::new();
    let mut lookup: HashMap<String, usize> = HashMap::new();

    let mut layouts = Vec::with_capacity(tables.len());
    for table in &tables {
        let positions: Vec<usize> = table
            .columns
            .iter()
            .map(|column| {
                *lookup.entry(column.clone()).or_insert_with(|| {
                    columns.push(column.clone());
                    columns.len() - 1
                })
            })
            .collect();
        layouts.push(positions);
    }

    let mut rows = Vec::with_capacity(tables.iter().map(Table::len).sum());
    for (table, positions) in tables.into_iter().zip(layouts) {
        for row in table.rows {
            let mut merged = vec![String::new(); columns.len()];
            for (cell, &position) in row.into_iter().zip(&positions) {
                merged[position] = cell;
            }
            rows.push(merged);
        }
    }

    Table { columns, rows }
}
