use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ForestError;

/// Area unit used by every table: thousand hectares.
pub const AREA_UNIT: &str = "kha";

/// Age-group label of area whose stand age was not determined.
pub const UNKNOWN_AGE_GROUP: &str = "unknown";

// ---------------------------------------------------------------------------
// ForestType – management status of an area
// ---------------------------------------------------------------------------

/// Management status. `Protected` is never measured directly; it is the
/// residual of `All` minus `Production`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForestType {
    All,
    Production,
    Protected,
}

impl ForestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForestType::All => "all",
            ForestType::Production => "production",
            ForestType::Protected => "protected",
        }
    }
}

impl fmt::Display for ForestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForestType {
    type Err = ForestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(ForestType::All),
            "production" => Ok(ForestType::Production),
            "protected" => Ok(ForestType::Protected),
            other => Err(ForestError::UnknownType(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tidy rows
// ---------------------------------------------------------------------------

/// One cleaned age-group measurement. Field order is the clean CSV layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaRecord {
    #[serde(rename = "YEAR")]
    pub year: i32,
    #[serde(rename = "DOMINANT_SPECIES")]
    pub dominant_species: Option<String>,
    #[serde(rename = "AGE_GROUP")]
    pub age_group: String,
    #[serde(rename = "TYPE")]
    pub forest_type: ForestType,
    #[serde(rename = "AREA")]
    pub area: f64,
    #[serde(rename = "UNIT")]
    pub unit: String,
}

/// Age-group area of a single species selection, keyed by (year, type, age group).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeGroupArea {
    #[serde(rename = "YEAR")]
    pub year: i32,
    #[serde(rename = "TYPE")]
    pub forest_type: ForestType,
    #[serde(rename = "AGE_GROUP")]
    pub age_group: String,
    #[serde(rename = "AREA")]
    pub area: f64,
    #[serde(rename = "UNIT")]
    pub unit: String,
}

impl AgeGroupArea {
    pub fn new(year: i32, forest_type: ForestType, age_group: &str, area: f64) -> Self {
        AgeGroupArea {
            year,
            forest_type,
            age_group: age_group.to_string(),
            area,
            unit: AREA_UNIT.to_string(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.age_group == UNKNOWN_AGE_GROUP
    }
}

/// Annual regeneration cutting total, as published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuttingRecord {
    #[serde(rename = "YEAR")]
    pub year: i32,
    #[serde(rename = "AREA")]
    pub area: f64,
    #[serde(rename = "UNIT")]
    pub unit: String,
}

/// Regeneration cutting total attributed to one management type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuttingArea {
    #[serde(rename = "YEAR")]
    pub year: i32,
    #[serde(rename = "TYPE")]
    pub forest_type: ForestType,
    #[serde(rename = "AREA")]
    pub area: f64,
    #[serde(rename = "UNIT")]
    pub unit: String,
}

// ---------------------------------------------------------------------------
// Age-group labels
// ---------------------------------------------------------------------------

/// Numeric lower bound of an age-group label: `"81..."` → 81,
/// `"61...80"` → 61, `"...10"` → 0. Labels without a numeric bound
/// (`"clearcut"`, `"unknown"`) yield `None`.
pub fn age_group_lower_bound(label: &str) -> Option<u32> {
    let head = label.split("...").next()?.trim();
    if head.is_empty() {
        return label.contains("...").then_some(0);
    }
    head.parse().ok()
}

/// Sort labels by numeric lower bound; labels without one go last, by name.
pub fn sort_age_groups(labels: &mut [String]) {
    labels.sort_by(|a, b| {
        let ka = (age_group_lower_bound(a).unwrap_or(u32::MAX), a);
        let kb = (age_group_lower_bound(b).unwrap_or(u32::MAX), b);
        ka.cmp(&kb)
    });
}

/// Round to two decimals, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// AreaTable – the wide layout handed to the chart
// ---------------------------------------------------------------------------

/// One wide row: the area of every age-group column for a (year, unit, type).
#[derive(Debug, Clone, PartialEq)]
pub struct AreaRow {
    pub year: i32,
    pub unit: String,
    pub forest_type: ForestType,
    /// Aligned with [`AreaTable::age_groups`].
    pub areas: Vec<f64>,
}

/// Age-group areas pivoted to one column per age group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreaTable {
    /// Column labels, ordered by age.
    pub age_groups: Vec<String>,
    /// Rows sorted by year.
    pub rows: Vec<AreaRow>,
}

impl AreaTable {
    /// Pivot long rows into one column per distinct age group, indexed by
    /// (year, unit, type). Missing cells are filled with 0.
    pub fn pivot(records: &[AgeGroupArea]) -> Self {
        let mut labels: Vec<String> = records
            .iter()
            .map(|r| r.age_group.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        sort_age_groups(&mut labels);

        let column: BTreeMap<&str, usize> = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.as_str(), i))
            .collect();

        let mut cells: BTreeMap<(i32, String, ForestType), Vec<f64>> = BTreeMap::new();
        for rec in records {
            let row = cells
                .entry((rec.year, rec.unit.clone(), rec.forest_type))
                .or_insert_with(|| vec![0.0; labels.len()]);
            if let Some(&idx) = column.get(rec.age_group.as_str()) {
                if row[idx] != 0.0 {
                    log::debug!(
                        "pivot: duplicate cell {} {} {}, summing",
                        rec.year,
                        rec.forest_type,
                        rec.age_group
                    );
                }
                row[idx] += rec.area;
            }
        }

        let rows = cells
            .into_iter()
            .map(|((year, unit, forest_type), areas)| AreaRow {
                year,
                unit,
                forest_type,
                areas,
            })
            .collect();

        AreaTable {
            age_groups: labels,
            rows,
        }
    }

    /// Inverse of [`AreaTable::pivot`]: one long row per cell, 0-filled
    /// cells included.
    pub fn melt(&self) -> Vec<AgeGroupArea> {
        self.rows
            .iter()
            .flat_map(|row| {
                self.age_groups
                    .iter()
                    .zip(row.areas.iter())
                    .map(move |(label, &area)| AgeGroupArea {
                        year: row.year,
                        forest_type: row.forest_type,
                        age_group: label.clone(),
                        area,
                        unit: row.unit.clone(),
                    })
            })
            .collect()
    }

    /// Distinct management types present in the table.
    pub fn types(&self) -> BTreeSet<ForestType> {
        self.rows.iter().map(|r| r.forest_type).collect()
    }

    /// The table's management type; fails unless exactly one is present.
    pub fn single_type(&self, table: &str) -> Result<ForestType, ForestError> {
        let types = self.types();
        let mut iter = types.iter();
        match (iter.next(), iter.next()) {
            (Some(&only), None) => Ok(only),
            (None, _) => Err(ForestError::EmptyTable(table.to_string())),
            _ => Err(ForestError::MultipleTypes {
                table: table.to_string(),
                types: types
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
