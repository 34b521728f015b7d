//! Area arithmetic between the clean tables and the chart tables.
//!
//! ```text
//!  known + unknown ──► add_unknown_area ──► aggregate_age_groups
//!                                                  │
//!  cutting ──► align_regeneration_cutting ──► subtract_regeneration_cutting
//! ```

use std::collections::BTreeMap;

use super::model::{
    age_group_lower_bound, round2, AgeGroupArea, CuttingArea, CuttingRecord, ForestType,
    AREA_UNIT,
};

type GroupKey = (i32, ForestType);

fn group_key(rec: &AgeGroupArea) -> GroupKey {
    (rec.year, rec.forest_type)
}

fn sum_by_group<'a>(rows: impl IntoIterator<Item = &'a AgeGroupArea>) -> BTreeMap<GroupKey, f64> {
    let mut totals = BTreeMap::new();
    for rec in rows {
        *totals.entry(group_key(rec)).or_insert(0.0) += rec.area;
    }
    totals
}

// ---------------------------------------------------------------------------
// Unknown-area allocation
// ---------------------------------------------------------------------------

/// Spread the "unknown" age-group area of each (year, type) over the known
/// age groups in proportion to their share of the known total.
///
/// A group whose known total is 0 receives nothing.
pub fn add_unknown_area(known: &[AgeGroupArea], unknown: &[AgeGroupArea]) -> Vec<AgeGroupArea> {
    let totals = sum_by_group(known);
    let unknown_by_group = sum_by_group(unknown);

    for (key, area) in &unknown_by_group {
        if !totals.contains_key(key) && *area != 0.0 {
            log::warn!(
                "{} {}: {area} kha of unknown age has no known age groups to go to",
                key.0,
                key.1
            );
        }
    }

    known
        .iter()
        .map(|rec| {
            let key = group_key(rec);
            let total = totals.get(&key).copied().unwrap_or(0.0);
            let unknown_area = unknown_by_group.get(&key).copied().unwrap_or(0.0);
            let added = if total == 0.0 {
                if unknown_area != 0.0 {
                    log::debug!("{} {}: known total is 0, unknown area not added", key.0, key.1);
                }
                0.0
            } else {
                rec.area / total * unknown_area
            };
            AgeGroupArea {
                area: rec.area + added,
                ..rec.clone()
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Age-group aggregation
// ---------------------------------------------------------------------------

/// Relabel age groups through `aggregation` (unmapped labels pass through)
/// and sum the area of each (year, type, new label).
pub fn aggregate_age_groups(
    rows: &[AgeGroupArea],
    aggregation: &BTreeMap<String, String>,
) -> Vec<AgeGroupArea> {
    let mut groups: BTreeMap<(i32, ForestType, String), (f64, String)> = BTreeMap::new();
    for rec in rows {
        let label = aggregation
            .get(&rec.age_group)
            .cloned()
            .unwrap_or_else(|| rec.age_group.clone());
        let entry = groups
            .entry((rec.year, rec.forest_type, label))
            .or_insert_with(|| (0.0, rec.unit.clone()));
        entry.0 += rec.area;
    }

    groups
        .into_iter()
        .map(|((year, forest_type, age_group), (area, unit))| AgeGroupArea {
            year,
            forest_type,
            age_group,
            area,
            unit,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Regeneration cutting
// ---------------------------------------------------------------------------

/// One cutting row per year in `year_min..=year_max` for `forest_type`;
/// years absent from `data` get 0.
pub fn align_regeneration_cutting(
    data: &[CuttingRecord],
    year_min: i32,
    year_max: i32,
    forest_type: ForestType,
) -> Vec<CuttingArea> {
    let by_year: BTreeMap<i32, &CuttingRecord> = data.iter().map(|r| (r.year, r)).collect();
    (year_min..=year_max)
        .map(|year| match by_year.get(&year) {
            Some(rec) => CuttingArea {
                year,
                forest_type,
                area: rec.area,
                unit: rec.unit.clone(),
            },
            None => CuttingArea {
                year,
                forest_type,
                area: 0.0,
                unit: AREA_UNIT.to_string(),
            },
        })
        .collect()
}

/// Subtract each (year, type)'s regeneration cutting area from the age
/// groups whose lower bound is at least `threshold`, in proportion to their
/// share of the eligible area. Adjusted areas are rounded to 2 decimals and
/// may go negative; other groups are unchanged.
pub fn subtract_regeneration_cutting(
    rows: &[AgeGroupArea],
    cutting: &[CuttingArea],
    threshold: u32,
) -> Vec<AgeGroupArea> {
    let is_eligible = |rec: &AgeGroupArea| {
        age_group_lower_bound(&rec.age_group).is_some_and(|bound| bound >= threshold)
    };

    let eligible_totals = sum_by_group(rows.iter().filter(|r| is_eligible(r)));

    let mut cutting_by_group: BTreeMap<GroupKey, f64> = BTreeMap::new();
    for rec in cutting {
        *cutting_by_group.entry((rec.year, rec.forest_type)).or_insert(0.0) += rec.area;
    }

    rows.iter()
        .map(|rec| {
            if !is_eligible(rec) {
                return rec.clone();
            }
            let key = group_key(rec);
            let eligible_total = eligible_totals.get(&key).copied().unwrap_or(0.0);
            let proportion = if eligible_total == 0.0 {
                0.0
            } else {
                rec.area / eligible_total
            };
            let cutting_total = cutting_by_group.get(&key).copied().unwrap_or(0.0);
            AgeGroupArea {
                area: round2(rec.area - proportion * cutting_total),
                ..rec.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: ForestType = ForestType::Production;

    fn total(rows: &[AgeGroupArea], year: i32, forest_type: ForestType) -> f64 {
        rows.iter()
            .filter(|r| r.year == year && r.forest_type == forest_type)
            .map(|r| r.area)
            .sum()
    }

    fn area(rows: &[AgeGroupArea], group: &str) -> f64 {
        rows.iter().find(|r| r.age_group == group).map(|r| r.area).unwrap()
    }

    fn aggregation() -> BTreeMap<String, String> {
        [
            ("clearcut", "0...20"),
            ("...10", "0...20"),
            ("11...20", "0...20"),
            ("21...30", "21...40"),
            ("31...40", "21...40"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn unknown_area_is_added_proportionally() {
        let known = vec![
            AgeGroupArea::new(2020, P, "A", 10.0),
            AgeGroupArea::new(2020, P, "B", 30.0),
        ];
        let unknown = vec![AgeGroupArea::new(2020, P, "unknown", 10.0)];

        let out = add_unknown_area(&known, &unknown);

        assert_eq!(area(&out, "A"), 12.5);
        assert_eq!(area(&out, "B"), 37.5);

        let unknown = vec![AgeGroupArea::new(2020, P, "unknown", 15.0)];
        let out = add_unknown_area(&known, &unknown);
        assert_eq!(area(&out, "A"), 13.75);
        assert_eq!(area(&out, "B"), 41.25);
    }

    #[test]
    fn unknown_allocation_conserves_mass_per_group() {
        let known = vec![
            AgeGroupArea::new(2020, P, "11...20", 3.3),
            AgeGroupArea::new(2020, P, "21...30", 7.1),
            AgeGroupArea::new(2020, ForestType::Protected, "11...20", 1.9),
            AgeGroupArea::new(2021, P, "11...20", 4.0),
        ];
        let unknown = vec![
            AgeGroupArea::new(2020, P, "unknown", 0.7),
            AgeGroupArea::new(2020, ForestType::Protected, "unknown", 0.2),
        ];

        let out = add_unknown_area(&known, &unknown);

        assert!((total(&out, 2020, P) - (10.4 + 0.7)).abs() < 1e-9);
        assert!((total(&out, 2020, ForestType::Protected) - 2.1).abs() < 1e-9);
        // No unknown row for 2021: unchanged.
        assert_eq!(total(&out, 2021, P), 4.0);
    }

    #[test]
    fn zero_known_total_adds_nothing() {
        let known = vec![
            AgeGroupArea::new(2020, P, "A", 0.0),
            AgeGroupArea::new(2020, P, "B", 0.0),
        ];
        let unknown = vec![AgeGroupArea::new(2020, P, "unknown", 5.0)];

        let out = add_unknown_area(&known, &unknown);

        assert!(out.iter().all(|r| r.area == 0.0 && !r.area.is_nan()));
    }

    #[test]
    fn aggregation_sums_into_coarse_buckets() {
        let rows = vec![
            AgeGroupArea::new(2020, P, "clearcut", 1.0),
            AgeGroupArea::new(2020, P, "...10", 2.0),
            AgeGroupArea::new(2020, P, "11...20", 3.0),
            AgeGroupArea::new(2020, P, "31...40", 4.0),
            AgeGroupArea::new(2020, P, "141...", 5.0),
        ];

        let out = aggregate_age_groups(&rows, &aggregation());

        assert_eq!(out.len(), 3);
        assert_eq!(area(&out, "0...20"), 6.0);
        assert_eq!(area(&out, "21...40"), 4.0);
        // Unmapped label passes through.
        assert_eq!(area(&out, "141..."), 5.0);
        assert_eq!(total(&out, 2020, P), total(&rows, 2020, P));
    }

    #[test]
    fn aggregation_keeps_year_and_type_apart() {
        let rows = vec![
            AgeGroupArea::new(2020, P, "11...20", 3.0),
            AgeGroupArea::new(2021, P, "11...20", 4.0),
            AgeGroupArea::new(2020, ForestType::Protected, "11...20", 5.0),
        ];
        let out = aggregate_age_groups(&rows, &aggregation());
        assert_eq!(out.len(), 3);
        assert_eq!(total(&out, 2021, P), 4.0);
        assert_eq!(total(&out, 2020, ForestType::Protected), 5.0);
    }

    #[test]
    fn cutting_alignment_fills_missing_years() {
        let data = vec![
            CuttingRecord {
                year: 2019,
                area: 9.0,
                unit: "kha".into(),
            },
            CuttingRecord {
                year: 2021,
                area: 11.5,
                unit: "kha".into(),
            },
        ];

        let aligned = align_regeneration_cutting(&data, 2020, 2022, P);

        let areas: Vec<(i32, f64)> = aligned.iter().map(|r| (r.year, r.area)).collect();
        assert_eq!(areas, vec![(2020, 0.0), (2021, 11.5), (2022, 0.0)]);
        assert!(aligned.iter().all(|r| r.forest_type == P && r.unit == "kha"));

        let protected = align_regeneration_cutting(&[], 2020, 2021, ForestType::Protected);
        assert_eq!(protected.len(), 2);
        assert!(protected.iter().all(|r| r.area == 0.0));
    }

    #[test]
    fn cutting_is_subtracted_from_eligible_buckets() {
        let rows = vec![
            AgeGroupArea::new(2020, P, "41...60", 100.0),
            AgeGroupArea::new(2020, P, "61...80", 50.0),
            AgeGroupArea::new(2020, P, "81...", 20.0),
        ];
        let cutting = vec![CuttingArea {
            year: 2020,
            forest_type: P,
            area: 14.0,
            unit: "kha".into(),
        }];

        let out = subtract_regeneration_cutting(&rows, &cutting, 60);

        assert_eq!(area(&out, "41...60"), 100.0);
        assert_eq!(area(&out, "61...80"), 40.0);
        assert_eq!(area(&out, "81..."), 16.0);
    }

    #[test]
    fn cutting_only_touches_its_own_year_and_type() {
        let rows = vec![
            AgeGroupArea::new(2020, P, "81...", 20.0),
            AgeGroupArea::new(2020, ForestType::Protected, "81...", 20.0),
            AgeGroupArea::new(2021, P, "81...", 20.0),
        ];
        let cutting = vec![CuttingArea {
            year: 2020,
            forest_type: P,
            area: 5.0,
            unit: "kha".into(),
        }];

        let out = subtract_regeneration_cutting(&rows, &cutting, 60);

        assert_eq!(total(&out, 2020, P), 15.0);
        assert_eq!(total(&out, 2020, ForestType::Protected), 20.0);
        assert_eq!(total(&out, 2021, P), 20.0);
    }

    #[test]
    fn zero_eligible_area_leaves_rows_unchanged() {
        let rows = vec![
            AgeGroupArea::new(2020, P, "41...60", 100.0),
            AgeGroupArea::new(2020, P, "61...80", 0.0),
            AgeGroupArea::new(2020, P, "81...", 0.0),
        ];
        let cutting = vec![CuttingArea {
            year: 2020,
            forest_type: P,
            area: 14.0,
            unit: "kha".into(),
        }];

        let out = subtract_regeneration_cutting(&rows, &cutting, 60);

        assert_eq!(out, rows);
    }

    #[test]
    fn oversized_cutting_goes_negative() {
        let rows = vec![AgeGroupArea::new(2020, P, "81...", 10.0)];
        let cutting = vec![CuttingArea {
            year: 2020,
            forest_type: P,
            area: 12.5,
            unit: "kha".into(),
        }];

        let out = subtract_regeneration_cutting(&rows, &cutting, 60);

        assert_eq!(out[0].area, -2.5);
    }
}
