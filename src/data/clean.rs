use std::collections::BTreeMap;

use super::loader::RawRecord;
use super::model::{round2, AreaRecord, CuttingRecord, ForestType, AREA_UNIT};
use crate::error::ForestError;

/// Estonian headers of the inventory exports.
pub mod columns {
    pub const YEAR: &str = "Aasta";
    pub const CUTTING_YEAR: &str = "Raie aasta";
    /// Holds the age group in age-class exports and the cutting kind in
    /// cutting exports.
    pub const CATEGORY: &str = "Kaitsepõhjus";
    pub const METRIC: &str = "Meetrik";
    pub const METRIC_VALUE: &str = "Meetriku väärtus";
    pub const DOMINANT_SPECIES: &str = "Enamuspuuliik";
}

/// `Meetrik` value of area measurements.
pub const AREA_METRIC: &str = "Pindala (tuhat ha)";
/// Age-group label of per-year totals.
pub const TOTAL_LABEL: &str = "Kokku";
/// `Kaitsepõhjus` value of the annual regeneration cutting total.
pub const REGENERATION_CUTTING_TOTAL: &str = "Uuendusraie kokku";

pub const AGE_GROUP_COLUMNS: [&str; 5] = [
    columns::YEAR,
    columns::CATEGORY,
    columns::METRIC,
    columns::METRIC_VALUE,
    columns::DOMINANT_SPECIES,
];

pub const CUTTING_COLUMNS: [&str; 4] = [
    columns::CUTTING_YEAR,
    columns::CATEGORY,
    columns::METRIC,
    columns::METRIC_VALUE,
];

// ---------------------------------------------------------------------------
// Cell parsing
// ---------------------------------------------------------------------------

/// Parse an export number: whitespace (thousands separators) removed,
/// comma decimal. Empty cells are `None`.
pub fn parse_decimal(raw: &str, context: &str) -> Result<Option<f64>, ForestError> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if compact.is_empty() {
        return Ok(None);
    }
    compact
        .parse::<f64>()
        .map(Some)
        .map_err(|_| ForestError::InvalidNumber {
            context: context.to_string(),
            value: raw.to_string(),
        })
}

pub fn parse_year(raw: &str, context: &str) -> Result<i32, ForestError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    compact.parse().map_err(|_| ForestError::InvalidYear {
        context: context.to_string(),
        value: raw.to_string(),
    })
}

/// Trim and translate a label; untranslated labels pass through.
pub fn translate(label: &str, translations: &BTreeMap<String, String>) -> String {
    let label = label.trim();
    translations
        .get(label)
        .cloned()
        .unwrap_or_else(|| label.to_string())
}

// ---------------------------------------------------------------------------
// Age-group exports
// ---------------------------------------------------------------------------

/// Clean an age-class export into tidy rows of the given type.
///
/// Per-year totals (`Kokku`) are discarded, non-area metrics skipped, empty
/// values become 0 and species / age-group labels are translated.
pub fn clean_age_group_data(
    records: &[RawRecord],
    forest_type: ForestType,
    translations: &BTreeMap<String, String>,
) -> Result<Vec<AreaRecord>, ForestError> {
    let mut out = Vec::with_capacity(records.len());
    let mut skipped_metrics = 0usize;
    let mut negative = 0usize;

    for rec in records {
        let category = rec.get(columns::CATEGORY).trim();
        if category == TOTAL_LABEL {
            continue;
        }
        if rec.get(columns::METRIC).trim() != AREA_METRIC {
            skipped_metrics += 1;
            continue;
        }

        let year = parse_year(rec.get(columns::YEAR), &rec.origin)?;
        let area = parse_decimal(rec.get(columns::METRIC_VALUE), &rec.origin)?.unwrap_or(0.0);
        if area < 0.0 {
            log::warn!("{}: negative area {area}", rec.origin);
            negative += 1;
        }
        let species = translate(rec.get(columns::DOMINANT_SPECIES), translations);

        out.push(AreaRecord {
            year,
            dominant_species: (!species.is_empty()).then_some(species),
            age_group: translate(category, translations),
            forest_type,
            area,
            unit: AREA_UNIT.to_string(),
        });
    }

    if skipped_metrics > 0 {
        log::warn!("{forest_type}: skipped {skipped_metrics} rows with a non-area metric");
    }
    if negative > 0 {
        log::warn!("{forest_type}: kept {negative} rows with a negative area");
    }
    log::info!("{forest_type}: cleaned {} age group rows", out.len());
    Ok(out)
}

// ---------------------------------------------------------------------------
// Regeneration cutting export
// ---------------------------------------------------------------------------

/// Keep the annual regeneration cutting area totals, rounded to 2 decimals
/// and sorted by year.
pub fn clean_regeneration_cutting_data(
    records: &[RawRecord],
) -> Result<Vec<CuttingRecord>, ForestError> {
    let mut out = Vec::new();
    for rec in records {
        if rec.get(columns::METRIC).trim() != AREA_METRIC
            || rec.get(columns::CATEGORY).trim() != REGENERATION_CUTTING_TOTAL
        {
            continue;
        }
        let year = parse_year(rec.get(columns::CUTTING_YEAR), &rec.origin)?;
        let area = parse_decimal(rec.get(columns::METRIC_VALUE), &rec.origin)?.unwrap_or(0.0);
        out.push(CuttingRecord {
            year,
            area: round2(area),
            unit: AREA_UNIT.to_string(),
        });
    }
    out.sort_by_key(|r| r.year);
    log::info!("cleaned {} regeneration cutting rows", out.len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> RawRecord {
        RawRecord {
            origin: "test row".into(),
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn age_row(year: &str, species: &str, group: &str, value: &str) -> RawRecord {
        raw(&[
            (columns::YEAR, year),
            (columns::DOMINANT_SPECIES, species),
            (columns::CATEGORY, group),
            (columns::METRIC, AREA_METRIC),
            (columns::METRIC_VALUE, value),
        ])
    }

    fn translations() -> BTreeMap<String, String> {
        [("Selguseta ala", "unknown"), ("Kuusk", "spruce"), ("Kokku", "all")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn decimals_accept_comma_and_thousand_spaces() {
        assert_eq!(parse_decimal("1 234,56", "t").unwrap(), Some(1234.56));
        assert_eq!(parse_decimal("1\u{a0}000,5", "t").unwrap(), Some(1000.5));
        assert_eq!(parse_decimal(" 12 ", "t").unwrap(), Some(12.0));
        assert_eq!(parse_decimal("", "t").unwrap(), None);
        assert!(matches!(
            parse_decimal("n/a", "t"),
            Err(ForestError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn age_group_rows_are_cleaned_and_translated() {
        let records = vec![
            age_row("2020", " Kuusk ", "Kokku", "100,0"),
            age_row("2020", "Kuusk", " Selguseta ala ", "1,5"),
            age_row("2020", "Kokku", "11...20", ""),
            age_row("2 021", "Kuusk", "141...", "2 000,25"),
        ];

        let clean = clean_age_group_data(&records, ForestType::All, &translations()).unwrap();

        assert_eq!(clean.len(), 3);
        assert_eq!(clean[0].dominant_species.as_deref(), Some("spruce"));
        assert_eq!(clean[0].age_group, "unknown");
        assert_eq!(clean[0].area, 1.5);
        assert_eq!(clean[1].dominant_species.as_deref(), Some("all"));
        assert_eq!(clean[1].area, 0.0);
        assert_eq!(clean[2].year, 2021);
        assert_eq!(clean[2].area, 2000.25);
        assert!(clean.iter().all(|r| r.unit == "kha" && r.forest_type == ForestType::All));
    }

    #[test]
    fn non_area_metrics_are_skipped() {
        let mut volume = age_row("2020", "Kuusk", "11...20", "5,0");
        volume
            .fields
            .insert(columns::METRIC.into(), "Tagavara (tuhat tm)".into());

        let clean = clean_age_group_data(&[volume], ForestType::Production, &translations()).unwrap();
        assert!(clean.is_empty());
    }

    #[test]
    fn negative_areas_are_kept_unclamped() {
        let records = vec![
            age_row("2020", "Kuusk", "11...20", "-3,25"),
            age_row("2020", "Kuusk", "21...30", "4,0"),
        ];

        let clean = clean_age_group_data(&records, ForestType::All, &translations()).unwrap();

        assert_eq!(clean.len(), 2);
        assert_eq!(clean[0].area, -3.25);
        assert_eq!(clean[1].area, 4.0);
    }

    #[test]
    fn bad_year_is_an_error() {
        let err = clean_age_group_data(
            &[age_row("year", "Kuusk", "11...20", "1")],
            ForestType::All,
            &translations(),
        )
        .unwrap_err();
        assert!(matches!(err, ForestError::InvalidYear { .. }));
    }

    #[test]
    fn cutting_keeps_only_regeneration_totals() {
        let row = |year: &str, kind: &str, metric: &str, value: &str| {
            raw(&[
                (columns::CUTTING_YEAR, year),
                (columns::CATEGORY, kind),
                (columns::METRIC, metric),
                (columns::METRIC_VALUE, value),
            ])
        };
        let records = vec![
            row("2021", REGENERATION_CUTTING_TOTAL, AREA_METRIC, "14,567"),
            row("2020", REGENERATION_CUTTING_TOTAL, AREA_METRIC, "12,3"),
            row("2020", "Harvendusraie", AREA_METRIC, "30,0"),
            row("2020", REGENERATION_CUTTING_TOTAL, "Maht (tuhat tm)", "900,0"),
        ];

        let clean = clean_regeneration_cutting_data(&records).unwrap();

        assert_eq!(clean.len(), 2);
        assert_eq!((clean[0].year, clean[0].area), (2020, 12.3));
        assert_eq!((clean[1].year, clean[1].area), (2021, 14.57));
    }
}
