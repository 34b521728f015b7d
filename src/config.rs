use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ForestError;

/// Species selections published by the inventory, `all` being the total.
pub const TREE_SPECIES: [&str; 8] = [
    "all",
    "aspen",
    "birch",
    "black alder",
    "grey alder",
    "other",
    "pine",
    "spruce",
];

const RAW_AGE_GROUP_PREFIX: &str = "data/raw/1.11.X Vanuseklassid + uuend_data";
const RAW_CUTTING_PATH: &str = "data/raw/3.2.2.X Raiete ajalugu.csv";

fn string_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn raw_age_group_paths(measurement: &str) -> Vec<PathBuf> {
    TREE_SPECIES
        .iter()
        .map(|species| {
            PathBuf::from(format!(
                "{RAW_AGE_GROUP_PREFIX}_{}_{measurement}.csv",
                species.replace(' ', "_")
            ))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Pipeline configuration
// ---------------------------------------------------------------------------

/// Everything a run needs. Relative paths resolve against `root_dir`.
///
/// Deserialized with `#[serde(default)]`, so a JSON file only needs the keys
/// it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Dominant species to chart; one of [`TREE_SPECIES`].
    pub tree_species: String,
    pub root_dir: PathBuf,
    /// "All forest" age-class exports, one per species.
    pub age_group_all_raw_paths: Vec<PathBuf>,
    /// Production-forest age-class exports, one per species.
    pub age_group_production_raw_paths: Vec<PathBuf>,
    pub regeneration_cutting_raw_path: PathBuf,
    pub clean_dir: PathBuf,
    pub plot_data_dir: PathBuf,
    /// PNG path; derived from the species when unset.
    pub plot_save_path: Option<PathBuf>,
    /// Estonian export labels → English labels.
    pub translations: BTreeMap<String, String>,
    /// Fine age group → display age group.
    pub age_group_aggregation: BTreeMap<String, String>,
    /// Regeneration cutting is subtracted from age groups starting at or
    /// above this age.
    pub regeneration_cutting_age_threshold: u32,
    pub plot: PlotConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tree_species: "all".into(),
            root_dir: PathBuf::from("age_group_trends"),
            age_group_all_raw_paths: raw_age_group_paths("all"),
            age_group_production_raw_paths: raw_age_group_paths("production"),
            regeneration_cutting_raw_path: PathBuf::from(RAW_CUTTING_PATH),
            clean_dir: PathBuf::from("data/clean"),
            plot_data_dir: PathBuf::from("data/plot"),
            plot_save_path: None,
            translations: string_map(&[
                ("Selguseta ala", "unknown"),
                ("Lage ala", "clearcut"),
                ("Kokku", "all"),
                ("Haab", "aspen"),
                ("Kask", "birch"),
                ("Sanglepp", "black alder"),
                ("Hall lepp", "grey alder"),
                ("Teised", "other"),
                ("Mänd", "pine"),
                ("Kuusk", "spruce"),
            ]),
            age_group_aggregation: string_map(&[
                ("clearcut", "0...20"),
                ("...10", "0...20"),
                ("11...20", "0...20"),
                ("21...30", "21...40"),
                ("31...40", "21...40"),
                ("41...50", "41...60"),
                ("51...60", "41...60"),
                ("61...70", "61...80"),
                ("71...80", "61...80"),
                ("81...90", "81..."),
                ("91...100", "81..."),
                ("101...110", "81..."),
                ("111...120", "81..."),
                ("121...130", "81..."),
                ("131...140", "81..."),
                ("141...", "81..."),
            ]),
            regeneration_cutting_age_threshold: 60,
            plot: PlotConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file; missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), ForestError> {
        if !TREE_SPECIES.contains(&self.tree_species.as_str()) {
            return Err(ForestError::UnknownSpecies(self.tree_species.clone()));
        }
        self.production_colour_scale()?;
        Ok(())
    }

    /// The inventory publishes regeneration cutting only for all species
    /// combined.
    pub fn is_regeneration_cutting_available(&self) -> bool {
        self.tree_species == "all"
    }

    pub fn production_colour_scale(&self) -> Result<&str, ForestError> {
        self.plot
            .production_colour_scales
            .get(&self.tree_species)
            .map(String::as_str)
            .ok_or_else(|| {
                ForestError::UnknownColourScale(format!("(none set for '{}')", self.tree_species))
            })
    }

    fn species_slug(&self) -> String {
        self.tree_species.replace(' ', "_")
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root_dir.join(path)
    }

    pub fn raw_all_paths(&self) -> Vec<PathBuf> {
        self.age_group_all_raw_paths.iter().map(|p| self.resolve(p)).collect()
    }

    pub fn raw_production_paths(&self) -> Vec<PathBuf> {
        self.age_group_production_raw_paths
            .iter()
            .map(|p| self.resolve(p))
            .collect()
    }

    pub fn raw_cutting_path(&self) -> PathBuf {
        self.resolve(&self.regeneration_cutting_raw_path)
    }

    fn clean_file(&self, stem: &str) -> PathBuf {
        self.resolve(&self.clean_dir)
            .join(format!("{stem}_{}.csv", self.species_slug()))
    }

    fn plot_file(&self, stem: &str) -> PathBuf {
        self.resolve(&self.plot_data_dir)
            .join(format!("{stem}_{}.csv", self.species_slug()))
    }

    pub fn age_group_clean_path(&self) -> PathBuf {
        self.clean_file("age_group")
    }

    pub fn regeneration_cutting_clean_path(&self) -> PathBuf {
        self.clean_file("regeneration_cutting")
    }

    pub fn production_cutting_plot_path(&self) -> PathBuf {
        self.plot_file("production_regeneration_cutting")
    }

    pub fn protected_cutting_plot_path(&self) -> PathBuf {
        self.plot_file("protected_regeneration_cutting")
    }

    pub fn production_areas_plot_path(&self) -> PathBuf {
        self.plot_file("production_areas")
    }

    pub fn protected_areas_plot_path(&self) -> PathBuf {
        self.plot_file("protected_areas")
    }

    pub fn chart_path(&self) -> PathBuf {
        match &self.plot_save_path {
            Some(path) => self.resolve(path),
            None => self.resolve(Path::new(&format!(
                "metsamaa_pindala_{}.png",
                self.species_slug()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Chart configuration
// ---------------------------------------------------------------------------

/// Chart title and the words drawn in the indicator colours.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleConfig {
    pub text: String,
    pub apply_production_colour_to: String,
    pub apply_protected_colour_to: String,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            text: "Mittemajandatava ja majandatava metsamaa pindalad vanusegruppide kaupa".into(),
            apply_production_colour_to: "majandatava".into(),
            apply_protected_colour_to: "Mittemajandatava".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub title: TitleConfig,
    pub x_axis_title: String,
    pub y_axis_title: String,
    pub legend_title: String,
    pub source: String,
    pub regeneration_cutting_name: String,
    /// Species → colour scale of the production bars.
    pub production_colour_scales: BTreeMap<String, String>,
    pub protected_colour_scale: String,
    pub legend_colour_scale: String,
    /// `#rrggbb`.
    pub regeneration_cutting_colour: String,
    pub width: u32,
    pub height: u32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            title: TitleConfig::default(),
            x_axis_title: "Aasta".into(),
            y_axis_title: "pindala (tuhat ha)".into(),
            legend_title: "Vanusegrupid:".into(),
            source: "source: https://github.com/martroben/forest_analysis/tree/main/age_group_trends"
                .into(),
            regeneration_cutting_name: "uuendusraie".into(),
            production_colour_scales: string_map(&[
                ("all", "algae"),
                ("aspen", "Purples"),
                ("birch", "speed"),
                ("black alder", "turbid"),
                ("grey alder", "YlOrBr"),
                ("other", "Greys"),
                ("pine", "amp"),
                ("spruce", "tempo"),
            ]),
            protected_colour_scale: "Darkmint".into(),
            legend_colour_scale: "Greys".into(),
            regeneration_cutting_colour: "#C35B00".into(),
            width: 1600,
            height: 900,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_species() {
        let config = PipelineConfig::default();
        assert_eq!(config.age_group_all_raw_paths.len(), TREE_SPECIES.len());
        assert_eq!(
            config.age_group_production_raw_paths[3],
            PathBuf::from("data/raw/1.11.X Vanuseklassid + uuend_data_black_alder_production.csv")
        );
        for species in TREE_SPECIES {
            assert!(config.plot.production_colour_scales.contains_key(species));
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{ "tree_species": "black alder", "plot": { "width": 800 } }"#,
        )
        .unwrap();

        assert_eq!(config.tree_species, "black alder");
        assert_eq!(config.plot.width, 800);
        assert_eq!(config.plot.height, 900);
        assert_eq!(config.regeneration_cutting_age_threshold, 60);
        assert!(!config.is_regeneration_cutting_available());
        assert_eq!(config.production_colour_scale().unwrap(), "turbid");
        assert_eq!(
            config.production_areas_plot_path(),
            PathBuf::from("age_group_trends/data/plot/production_areas_black_alder.csv")
        );
        assert_eq!(
            config.chart_path(),
            PathBuf::from("age_group_trends/metsamaa_pindala_black_alder.png")
        );
    }

    #[test]
    fn unknown_species_is_rejected() {
        let config = PipelineConfig {
            tree_species: "oak".into(),
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ForestError::UnknownSpecies(s)) if s == "oak"));
    }

    #[test]
    fn config_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "regeneration_cutting_age_threshold": 80 }"#).unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.regeneration_cutting_age_threshold, 80);
        assert!(config.is_regeneration_cutting_available());
    }
}
