use std::collections::BTreeMap;

use super::model::{round2, AreaRecord, ForestType};

type JoinKey = (i32, Option<String>, String, String);

fn join_key(rec: &AreaRecord) -> JoinKey {
    (
        rec.year,
        rec.dominant_species.clone(),
        rec.age_group.clone(),
        rec.unit.clone(),
    )
}

/// Split the "all" measurement into production and protected rows.
///
/// Rows are joined on (year, species, age group, unit); protected area is
/// `all - production`. An "all" row with no production counterpart counts
/// as having no production area. Areas are rounded to 2 decimals and the
/// output is sorted by year, species, type and age group.
pub fn combine_all_and_production(
    all: &[AreaRecord],
    production: &[AreaRecord],
) -> Vec<AreaRecord> {
    let production_by_key: BTreeMap<JoinKey, f64> = production
        .iter()
        .map(|rec| (join_key(rec), rec.area))
        .collect();

    let mut unmatched = 0usize;
    let mut out = Vec::with_capacity(all.len() * 2);

    for rec in all {
        let production_area = match production_by_key.get(&join_key(rec)) {
            Some(&area) => area,
            None => {
                unmatched += 1;
                0.0
            }
        };

        for (forest_type, area) in [
            (ForestType::Production, production_area),
            (ForestType::Protected, rec.area - production_area),
        ] {
            out.push(AreaRecord {
                forest_type,
                area: round2(area),
                ..rec.clone()
            });
        }
    }

    if unmatched > 0 {
        log::warn!("{unmatched} rows have no production counterpart; production area set to 0");
    }

    out.sort_by(|a, b| {
        (a.year, &a.dominant_species, a.forest_type, &a.age_group).cmp(&(
            b.year,
            &b.dominant_species,
            b.forest_type,
            &b.age_group,
        ))
    });
    log::info!("reconciled {} production/protected rows", out.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::AREA_UNIT;

    fn rec(year: i32, species: &str, group: &str, forest_type: ForestType, area: f64) -> AreaRecord {
        AreaRecord {
            year,
            dominant_species: Some(species.to_string()),
            age_group: group.to_string(),
            forest_type,
            area,
            unit: AREA_UNIT.to_string(),
        }
    }

    fn area_of(rows: &[AreaRecord], group: &str, forest_type: ForestType) -> f64 {
        rows.iter()
            .find(|r| r.age_group == group && r.forest_type == forest_type)
            .map(|r| r.area)
            .unwrap()
    }

    #[test]
    fn protected_is_all_minus_production() {
        let all = vec![
            rec(2020, "pine", "11...20", ForestType::All, 10.456),
            rec(2020, "pine", "21...30", ForestType::All, 5.0),
        ];
        let production = vec![
            rec(2020, "pine", "11...20", ForestType::Production, 7.2),
            rec(2020, "pine", "21...30", ForestType::Production, 5.0),
        ];

        let rows = combine_all_and_production(&all, &production);

        assert_eq!(rows.len(), 4);
        assert_eq!(area_of(&rows, "11...20", ForestType::Production), 7.2);
        assert_eq!(area_of(&rows, "11...20", ForestType::Protected), 3.26);
        assert_eq!(area_of(&rows, "21...30", ForestType::Protected), 0.0);
        assert!(rows.iter().all(|r| r.forest_type != ForestType::All));
    }

    #[test]
    fn missing_production_counts_as_zero() {
        let all = vec![rec(2020, "birch", "141...", ForestType::All, 2.5)];
        let production = vec![rec(2020, "spruce", "141...", ForestType::Production, 1.0)];

        let rows = combine_all_and_production(&all, &production);

        assert_eq!(area_of(&rows, "141...", ForestType::Production), 0.0);
        assert_eq!(area_of(&rows, "141...", ForestType::Protected), 2.5);
    }

    #[test]
    fn output_is_sorted_by_year_species_type_group() {
        let all = vec![
            rec(2021, "pine", "11...20", ForestType::All, 1.0),
            rec(2020, "pine", "21...30", ForestType::All, 1.0),
            rec(2020, "pine", "11...20", ForestType::All, 1.0),
        ];
        let rows = combine_all_and_production(&all, &[]);

        let keys: Vec<_> = rows
            .iter()
            .map(|r| (r.year, r.forest_type, r.age_group.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (2020, ForestType::Production, "11...20"),
                (2020, ForestType::Production, "21...30"),
                (2020, ForestType::Protected, "11...20"),
                (2020, ForestType::Protected, "21...30"),
                (2021, ForestType::Production, "11...20"),
                (2021, ForestType::Protected, "11...20"),
            ]
        );
    }
}
