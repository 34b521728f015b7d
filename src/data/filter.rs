use super::model::{AgeGroupArea, AreaRecord, ForestType};

// ---------------------------------------------------------------------------
// Row selection
// ---------------------------------------------------------------------------

/// Rows of one dominant species, with the species column dropped.
pub fn select_species(records: &[AreaRecord], species: &str) -> Vec<AgeGroupArea> {
    let selected: Vec<AgeGroupArea> = records
        .iter()
        .filter(|r| r.dominant_species.as_deref() == Some(species))
        .map(|r| AgeGroupArea {
            year: r.year,
            forest_type: r.forest_type,
            age_group: r.age_group.clone(),
            area: r.area,
            unit: r.unit.clone(),
        })
        .collect();
    log::debug!("species '{species}': {} rows", selected.len());
    selected
}

/// Rows of one management type.
pub fn select_type(records: &[AgeGroupArea], forest_type: ForestType) -> Vec<AgeGroupArea> {
    records
        .iter()
        .filter(|r| r.forest_type == forest_type)
        .cloned()
        .collect()
}

/// Split rows into (known, unknown) age groups.
pub fn split_unknown(records: Vec<AgeGroupArea>) -> (Vec<AgeGroupArea>, Vec<AgeGroupArea>) {
    let (unknown, known): (Vec<_>, Vec<_>) =
        records.into_iter().partition(AgeGroupArea::is_unknown);
    (known, unknown)
}

/// First and last year present, or `None` for no rows.
pub fn year_range(records: &[AreaRecord]) -> Option<(i32, i32)> {
    let min = records.iter().map(|r| r.year).min()?;
    let max = records.iter().map(|r| r.year).max()?;
    Some((min, max))
}
