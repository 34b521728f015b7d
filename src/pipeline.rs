use anyhow::{Context, Result};

use crate::chart::{render_chart, ChartInput, CuttingSeries};
use crate::config::PipelineConfig;
use crate::data::clean::{
    clean_age_group_data, clean_regeneration_cutting_data, AGE_GROUP_COLUMNS, CUTTING_COLUMNS,
};
use crate::data::filter::{select_species, select_type, split_unknown, year_range};
use crate::data::loader::{
    load_export, load_exports, read_area_table, read_records, write_area_table, write_records,
};
use crate::data::model::{AreaRecord, AreaTable, CuttingArea, CuttingRecord, ForestType};
use crate::data::prepare::{
    add_unknown_area, aggregate_age_groups, align_regeneration_cutting,
    subtract_regeneration_cutting,
};
use crate::data::reconcile::combine_all_and_production;
use crate::error::ForestError;

// ---------------------------------------------------------------------------
// Stage outputs
// ---------------------------------------------------------------------------

/// Clean tables, as written to `data/clean`.
#[derive(Debug, Clone)]
pub struct CleanData {
    pub age_groups: Vec<AreaRecord>,
    /// `None` when cutting data is not published for the selected species.
    pub regeneration_cutting: Option<Vec<CuttingRecord>>,
}

/// Aligned regeneration cutting per management type.
#[derive(Debug, Clone)]
pub struct CuttingPlotData {
    pub protected: Vec<CuttingArea>,
    pub production: Vec<CuttingArea>,
}

/// Chart-ready tables, as written to `data/plot`.
#[derive(Debug, Clone)]
pub struct PlotData {
    pub protected_areas: AreaTable,
    pub production_areas: AreaTable,
    pub cutting: Option<CuttingPlotData>,
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Read and clean the raw exports.
pub fn clean(config: &PipelineConfig) -> Result<CleanData> {
    let regeneration_cutting = if config.is_regeneration_cutting_available() {
        let raw = load_export(&config.raw_cutting_path(), &CUTTING_COLUMNS)?;
        Some(clean_regeneration_cutting_data(&raw)?)
    } else {
        log::info!(
            "no regeneration cutting data for species '{}'",
            config.tree_species
        );
        None
    };

    let all_raw = load_exports(&config.raw_all_paths(), &AGE_GROUP_COLUMNS)
        .context("loading all-forest age group exports")?;
    let production_raw = load_exports(&config.raw_production_paths(), &AGE_GROUP_COLUMNS)
        .context("loading production-forest age group exports")?;

    let all = clean_age_group_data(&all_raw, ForestType::All, &config.translations)?;
    let production =
        clean_age_group_data(&production_raw, ForestType::Production, &config.translations)?;

    Ok(CleanData {
        age_groups: combine_all_and_production(&all, &production),
        regeneration_cutting,
    })
}

/// Turn clean tables into the chart tables for the configured species.
pub fn prepare(config: &PipelineConfig, clean: &CleanData) -> Result<PlotData> {
    let (year_min, year_max) = year_range(&clean.age_groups)
        .ok_or_else(|| ForestError::EmptyTable("age group".into()))?;

    let cutting = clean.regeneration_cutting.as_ref().map(|series| CuttingPlotData {
        // Regeneration cutting in protected forest is taken as negligible.
        protected: align_regeneration_cutting(&[], year_min, year_max, ForestType::Protected),
        production: align_regeneration_cutting(series, year_min, year_max, ForestType::Production),
    });

    let species_rows = select_species(&clean.age_groups, &config.tree_species);
    if species_rows.is_empty() {
        return Err(ForestError::EmptyTable(format!("'{}' age group", config.tree_species)).into());
    }

    let (known, unknown) = split_unknown(species_rows);
    let allocated = add_unknown_area(&known, &unknown);
    let aggregated = aggregate_age_groups(&allocated, &config.age_group_aggregation);

    let adjusted = match &cutting {
        Some(series) => {
            let all_cutting: Vec<CuttingArea> = series
                .protected
                .iter()
                .chain(series.production.iter())
                .cloned()
                .collect();
            subtract_regeneration_cutting(
                &aggregated,
                &all_cutting,
                config.regeneration_cutting_age_threshold,
            )
        }
        None => aggregated,
    };

    let protected_areas = AreaTable::pivot(&select_type(&adjusted, ForestType::Protected));
    let production_areas = AreaTable::pivot(&select_type(&adjusted, ForestType::Production));
    if protected_areas.is_empty() || production_areas.is_empty() {
        log::warn!("a management type has no rows for species '{}'", config.tree_species);
    }
    log::info!(
        "prepared {} protected and {} production years over {} age groups",
        protected_areas.len(),
        production_areas.len(),
        production_areas.age_groups.len()
    );

    Ok(PlotData {
        protected_areas,
        production_areas,
        cutting,
    })
}

pub fn write_clean(config: &PipelineConfig, clean: &CleanData) -> Result<()> {
    write_records(&config.age_group_clean_path(), &clean.age_groups)?;
    if let Some(cutting) = &clean.regeneration_cutting {
        write_records(&config.regeneration_cutting_clean_path(), cutting)?;
    }
    Ok(())
}

pub fn write_plot_data(config: &PipelineConfig, data: &PlotData) -> Result<()> {
    if let Some(cutting) = &data.cutting {
        write_records(&config.protected_cutting_plot_path(), &cutting.protected)?;
        write_records(&config.production_cutting_plot_path(), &cutting.production)?;
    }
    write_area_table(&config.protected_areas_plot_path(), &data.protected_areas)?;
    write_area_table(&config.production_areas_plot_path(), &data.production_areas)?;
    Ok(())
}

/// Read back the chart tables written by [`write_plot_data`].
pub fn load_plot_data(config: &PipelineConfig) -> Result<PlotData> {
    let cutting = if config.is_regeneration_cutting_available() {
        Some(CuttingPlotData {
            protected: read_records(&config.protected_cutting_plot_path())?,
            production: read_records(&config.production_cutting_plot_path())?,
        })
    } else {
        None
    };
    Ok(PlotData {
        protected_areas: read_area_table(&config.protected_areas_plot_path())?,
        production_areas: read_area_table(&config.production_areas_plot_path())?,
        cutting,
    })
}

pub fn render(config: &PipelineConfig, data: &PlotData) -> Result<()> {
    let input = ChartInput {
        protected: &data.protected_areas,
        production: &data.production_areas,
        cutting: data.cutting.as_ref().map(|c| CuttingSeries {
            protected: &c.protected,
            production: &c.production,
        }),
    };
    render_chart(
        &input,
        &config.plot,
        config.production_colour_scale()?,
        &config.chart_path(),
    )
}

/// Clean, prepare and write every table without drawing.
pub fn build_tables(config: &PipelineConfig) -> Result<PlotData> {
    config.validate()?;
    let clean_data = clean(config)?;
    write_clean(config, &clean_data)?;
    let plot_data = prepare(config, &clean_data)?;
    write_plot_data(config, &plot_data)?;
    Ok(plot_data)
}

/// Full run: tables, then the chart.
pub fn run(config: &PipelineConfig) -> Result<PlotData> {
    let plot_data = build_tables(config)?;
    render(config, &plot_data)?;
    Ok(plot_data)
}
