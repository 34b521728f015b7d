use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::model::{AreaRow, AreaTable, ForestType};
use crate::error::ForestError;

/// Columns of a wide area table that are not age groups.
pub const INDEX_COLUMNS: [&str; 3] = ["YEAR", "UNIT", "TYPE"];

// ---------------------------------------------------------------------------
// Raw export records
// ---------------------------------------------------------------------------

/// One row of a raw inventory export, keyed by header.
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// `file.csv row N`, used in error messages.
    pub origin: String,
    pub fields: BTreeMap<String, String>,
}

impl RawRecord {
    /// Field value, or `""` when the column is absent in this row.
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }
}

/// Read a semicolon-delimited raw export. Fails when a `required` column is
/// missing from the header.
pub fn load_export(path: &Path, required: &[&str]) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("reading headers of {}", path.display()))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    for column in required {
        if !headers.iter().any(|h| h == column) {
            return Err(ForestError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            }
            .into());
        }
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("{} row {row_no}", path.display()))?;
        let fields = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        records.push(RawRecord {
            origin: format!("{file_name} row {row_no}"),
            fields,
        });
    }

    log::debug!("loaded {} rows from {}", records.len(), path.display());
    Ok(records)
}

/// Read and concatenate several raw exports of the same layout.
pub fn load_exports<P: AsRef<Path>>(paths: &[P], required: &[&str]) -> Result<Vec<RawRecord>> {
    let mut all = Vec::new();
    for path in paths {
        all.extend(load_export(path.as_ref(), required)?);
    }
    log::info!("loaded {} raw rows from {} files", all.len(), paths.len());
    Ok(all)
}

// ---------------------------------------------------------------------------
// Tidy tables (comma-delimited)
// ---------------------------------------------------------------------------

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Write serde rows as CSV, creating parent directories.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    create_parent(path)?;
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    for rec in records {
        writer
            .serialize(rec)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    writer.flush()?;
    log::info!("wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    reader
        .deserialize()
        .enumerate()
        .map(|(row_no, rec)| rec.with_context(|| format!("{} row {row_no}", path.display())))
        .collect()
}

// ---------------------------------------------------------------------------
// Wide area tables
// ---------------------------------------------------------------------------

/// Write a wide table as `YEAR,UNIT,TYPE,<age groups...>`.
pub fn write_area_table(path: &Path, table: &AreaTable) -> Result<()> {
    create_parent(path)?;
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);

    let header: Vec<&str> = INDEX_COLUMNS
        .iter()
        .copied()
        .chain(table.age_groups.iter().map(String::as_str))
        .collect();
    writer.write_record(&header)?;

    for row in &table.rows {
        let mut record = vec![
            row.year.to_string(),
            row.unit.clone(),
            row.forest_type.to_string(),
        ];
        record.extend(row.areas.iter().map(|a| a.to_string()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    log::info!("wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

/// Read a wide table written by [`write_area_table`]. Empty cells read as 0.
pub fn read_area_table(path: &Path) -> Result<AreaTable> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let position = |column: &str| -> Result<usize> {
        headers.iter().position(|h| h == column).ok_or_else(|| {
            ForestError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            }
            .into()
        })
    };
    let year_idx = position("YEAR")?;
    let unit_idx = position("UNIT")?;
    let type_idx = position("TYPE")?;

    let value_cols: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !INDEX_COLUMNS.contains(&h.as_str()))
        .map(|(i, h)| (i, h.clone()))
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("{} row {row_no}", path.display()))?;
        let context = format!("{} row {row_no}", path.display());
        let cell = |idx: usize| record.get(idx).unwrap_or("").trim();

        let year = cell(year_idx)
            .parse::<i32>()
            .map_err(|_| ForestError::InvalidYear {
                context: context.clone(),
                value: cell(year_idx).to_string(),
            })?;
        let forest_type: ForestType = cell(type_idx).parse()?;
        let areas = value_cols
            .iter()
            .map(|(idx, _)| {
                let raw = cell(*idx);
                if raw.is_empty() {
                    return Ok(0.0);
                }
                raw.parse::<f64>().map_err(|_| ForestError::InvalidNumber {
                    context: context.clone(),
                    value: raw.to_string(),
                })
            })
            .collect::<Result<Vec<f64>, ForestError>>()?;

        rows.push(AreaRow {
            year,
            unit: cell(unit_idx).to_string(),
            forest_type,
            areas,
        });
    }
    rows.sort_by_key(|r| r.year);

    Ok(AreaTable {
        age_groups: value_cols.into_iter().map(|(_, h)| h).collect(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{AgeGroupArea, CuttingArea};

    #[test]
    fn raw_export_reads_semicolon_rows_and_strips_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");
        fs::write(
            &path,
            "\u{feff}Aasta;Kaitsepõhjus;Meetriku väärtus\n2020;11...20;1 234,5\n",
        )
        .unwrap();

        let rows = load_export(&path, &["Aasta", "Meetriku väärtus"]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Aasta"), "2020");
        assert_eq!(rows[0].get("Meetriku väärtus"), "1 234,5");
        assert_eq!(rows[0].get("Enamuspuuliik"), "");
        assert_eq!(rows[0].origin, "export.csv row 0");
    }

    #[test]
    fn raw_export_reports_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");
        fs::write(&path, "Aasta;Meetrik\n2020;x\n").unwrap();

        let err = load_export(&path, &["Aasta", "Meetriku väärtus"]).unwrap_err();
        let domain = err.downcast_ref::<ForestError>().unwrap();
        assert!(matches!(domain, ForestError::MissingColumn { column, .. } if column == "Meetriku väärtus"));
    }

    #[test]
    fn area_table_survives_a_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plot").join("areas.csv");
        let table = AreaTable::pivot(&[
            AgeGroupArea::new(2021, ForestType::Production, "81...", 12.25),
            AgeGroupArea::new(2020, ForestType::Production, "0...20", 3.5),
        ]);

        write_area_table(&path, &table).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("YEAR,UNIT,TYPE,0...20,81...\n"));

        assert_eq!(read_area_table(&path).unwrap(), table);
    }

    #[test]
    fn serde_rows_use_upper_case_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cutting.csv");
        let rows = vec![CuttingArea {
            year: 2020,
            forest_type: ForestType::Production,
            area: 14.5,
            unit: "kha".into(),
        }];

        write_records(&path, &rows).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("YEAR,TYPE,AREA,UNIT\n2020,production,14.5,kha"));
        assert_eq!(read_records::<CuttingArea>(&path).unwrap(), rows);
    }
}
