use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use plotters::prelude::*;

use crate::color::{get_colours, parse_hex, ColorMap};
use crate::config::PlotConfig;
use crate::data::model::{sort_age_groups, AreaTable, CuttingArea, ForestType};
use crate::error::ForestError;

const BAR_GAP: f64 = 0.02;
const BAR_WIDTH: f64 = 0.38;
const TITLE_HEIGHT: u32 = 70;
const CAPTION_HEIGHT: u32 = 30;
const LEGEND_WIDTH: u32 = 220;
const LEGEND_PAD: i32 = 16;
const LEGEND_ROW: i32 = 28;
const SWATCH: i32 = 18;

// ---------------------------------------------------------------------------
// Chart input
// ---------------------------------------------------------------------------

/// Regeneration cutting series drawn on top of the bars.
pub struct CuttingSeries<'a> {
    pub protected: &'a [CuttingArea],
    pub production: &'a [CuttingArea],
}

/// Wide tables of one chart. Each table must hold a single management type.
pub struct ChartInput<'a> {
    pub protected: &'a AreaTable,
    pub production: &'a AreaTable,
    pub cutting: Option<CuttingSeries<'a>>,
}

// ---------------------------------------------------------------------------
// Layout – everything needed to draw, computed without a backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub label: String,
    pub bottom: f64,
    pub top: f64,
    pub colour: RGBColor,
}

/// One stacked bar: the protected bar sits left of its year, production right.
#[derive(Debug, Clone, PartialEq)]
pub struct BarStack {
    pub year: i32,
    pub forest_type: ForestType,
    pub x0: f64,
    pub x1: f64,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleSegment {
    pub text: String,
    pub colour: RGBColor,
}

#[derive(Debug, Clone)]
pub struct ChartLayout {
    pub title: Vec<TitleSegment>,
    pub bars: Vec<BarStack>,
    pub legend: Vec<(String, RGBColor)>,
    pub years: (i32, i32),
    pub y_range: (f64, f64),
}

fn bar_span(year: i32, forest_type: ForestType) -> (f64, f64) {
    let x = year as f64;
    match forest_type {
        ForestType::Protected => (x - BAR_GAP - BAR_WIDTH, x - BAR_GAP),
        _ => (x + BAR_GAP, x + BAR_GAP + BAR_WIDTH),
    }
}

fn cutting_by_year(series: &[CuttingArea]) -> BTreeMap<i32, f64> {
    series.iter().map(|c| (c.year, c.area)).collect()
}

fn stack_table(
    table: &AreaTable,
    forest_type: ForestType,
    colours: &ColorMap,
    cutting: Option<(&BTreeMap<i32, f64>, &str, RGBColor)>,
) -> Vec<BarStack> {
    let mut stacks: BTreeMap<i32, BarStack> = BTreeMap::new();
    for rec in table.melt() {
        let (x0, x1) = bar_span(rec.year, forest_type);
        let stack = stacks.entry(rec.year).or_insert_with(|| BarStack {
            year: rec.year,
            forest_type,
            x0,
            x1,
            segments: Vec::new(),
        });
        let bottom = stack.segments.last().map(|s| s.top).unwrap_or(0.0);
        stack.segments.push(Segment {
            colour: colours.color_for(&rec.age_group),
            label: rec.age_group,
            bottom,
            top: bottom + rec.area,
        });
    }

    if let Some((by_year, name, colour)) = cutting {
        for stack in stacks.values_mut() {
            let area = by_year.get(&stack.year).copied().unwrap_or(0.0);
            let bottom = stack.segments.last().map(|s| s.top).unwrap_or(0.0);
            stack.segments.push(Segment {
                label: name.to_string(),
                bottom,
                top: bottom + area,
                colour,
            });
        }
    }

    stacks.into_values().collect()
}

fn is_word_char(c: Option<char>) -> bool {
    c.is_some_and(char::is_alphanumeric)
}

/// Split `text` into runs, colouring whole-word occurrences of each
/// highlight. Earlier highlights win where they overlap.
pub fn title_segments(
    text: &str,
    highlights: &[(&str, RGBColor)],
    default: RGBColor,
) -> Vec<TitleSegment> {
    let mut segments: Vec<TitleSegment> = Vec::new();
    let mut plain = String::new();
    let mut rest = text;
    let mut prev: Option<char> = None;

    'scan: while !rest.is_empty() {
        if !is_word_char(prev) {
            for (word, colour) in highlights {
                if word.is_empty() || !rest.starts_with(word) {
                    continue;
                }
                if is_word_char(rest[word.len()..].chars().next()) {
                    continue;
                }
                if !plain.is_empty() {
                    segments.push(TitleSegment {
                        text: std::mem::take(&mut plain),
                        colour: default,
                    });
                }
                segments.push(TitleSegment {
                    text: word.to_string(),
                    colour: *colour,
                });
                rest = &rest[word.len()..];
                prev = word.chars().last();
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            plain.push(c);
            prev = Some(c);
        }
        rest = chars.as_str();
    }

    if !plain.is_empty() {
        segments.push(TitleSegment {
            text: plain,
            colour: default,
        });
    }
    segments
}

/// Validate the chart input and compute bars, legend and title.
pub fn build_layout(
    input: &ChartInput<'_>,
    plot: &PlotConfig,
    production_scale: &str,
) -> Result<ChartLayout, ForestError> {
    let protected_type = input.protected.single_type("protected areas")?;
    let production_type = input.production.single_type("production areas")?;

    let mut age_groups: Vec<String> = input
        .protected
        .age_groups
        .iter()
        .chain(input.production.age_groups.iter())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    sort_age_groups(&mut age_groups);

    let protected_colours = ColorMap::new(&age_groups, &plot.protected_colour_scale)?;
    let production_colours = ColorMap::new(&age_groups, production_scale)?;
    let cutting_colour = parse_hex(&plot.regeneration_cutting_colour)?;

    let mut legend: Vec<(String, RGBColor)> = age_groups
        .iter()
        .cloned()
        .zip(get_colours(age_groups.len(), &plot.legend_colour_scale)?)
        .collect();

    let name = plot.regeneration_cutting_name.as_str();
    let (protected_cutting, production_cutting) = match &input.cutting {
        Some(series) => {
            legend.push((name.to_string(), cutting_colour));
            (
                Some(cutting_by_year(series.protected)),
                Some(cutting_by_year(series.production)),
            )
        }
        None => (None, None),
    };

    let mut bars = stack_table(
        input.protected,
        protected_type,
        &protected_colours,
        protected_cutting.as_ref().map(|c| (c, name, cutting_colour)),
    );
    bars.extend(stack_table(
        input.production,
        production_type,
        &production_colours,
        production_cutting.as_ref().map(|c| (c, name, cutting_colour)),
    ));

    let years = bars.iter().map(|b| b.year);
    let years = (
        years.clone().min().unwrap_or(0),
        years.max().unwrap_or(0),
    );

    let (mut y_min, mut y_max) = (0.0_f64, 0.0_f64);
    for seg in bars.iter().flat_map(|b| b.segments.iter()) {
        y_min = y_min.min(seg.bottom).min(seg.top);
        y_max = y_max.max(seg.bottom).max(seg.top);
    }
    if y_max <= y_min {
        y_max = y_min + 1.0;
    }

    let protected_indicator = get_colours(5, &plot.protected_colour_scale)?[2];
    let production_indicator = get_colours(5, production_scale)?[3];
    let title = title_segments(
        &plot.title.text,
        &[
            (plot.title.apply_protected_colour_to.as_str(), protected_indicator),
            (plot.title.apply_production_colour_to.as_str(), production_indicator),
        ],
        BLACK,
    );

    Ok(ChartLayout {
        title,
        bars,
        legend,
        years,
        y_range: (y_min, y_max * 1.05),
    })
}

/// One legend line in pixel coordinates of the legend panel. The title line
/// has no swatch.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendRow {
    pub label: String,
    pub swatch: Option<([(i32, i32); 2], RGBColor)>,
    pub text_at: (i32, i32),
}

/// Stack the legend title and entries top-down in a panel `LEGEND_WIDTH`
/// wide, right of the bars.
pub fn legend_rows(title: &str, entries: &[(String, RGBColor)]) -> Vec<LegendRow> {
    let mut rows = vec![LegendRow {
        label: title.to_string(),
        swatch: None,
        text_at: (LEGEND_PAD, LEGEND_PAD),
    }];
    for (i, (label, colour)) in entries.iter().enumerate() {
        let y = LEGEND_PAD + (i as i32 + 1) * LEGEND_ROW;
        rows.push(LegendRow {
            label: label.clone(),
            swatch: Some(([(LEGEND_PAD, y), (LEGEND_PAD + SWATCH, y + SWATCH)], *colour)),
            text_at: (LEGEND_PAD + SWATCH + 10, y),
        });
    }
    rows
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

/// Render the chart to a PNG file.
pub fn render_chart(
    input: &ChartInput<'_>,
    plot: &PlotConfig,
    production_scale: &str,
    path: &Path,
) -> Result<()> {
    let layout = build_layout(input, plot, production_scale)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
    }

    let root = BitMapBackend::new(path, (plot.width, plot.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let (title_area, rest) = root.split_vertically(TITLE_HEIGHT);
    let (plot_area, caption_area) =
        rest.split_vertically(plot.height.saturating_sub(TITLE_HEIGHT + CAPTION_HEIGHT));

    // Title, centred, one run per colour.
    let title_font = ("sans-serif", 28).into_font();
    let mut widths = Vec::with_capacity(layout.title.len());
    for seg in &layout.title {
        let style = title_font.color(&seg.colour);
        widths.push(title_area.estimate_text_size(&seg.text, &style)?.0 as i32);
    }
    let mut x = (plot.width as i32 - widths.iter().sum::<i32>()) / 2;
    for (seg, width) in layout.title.iter().zip(widths) {
        title_area.draw(&Text::new(
            seg.text.clone(),
            (x, 25),
            title_font.color(&seg.colour),
        ))?;
        x += width;
    }

    let (year_min, year_max) = layout.years;
    let (bars_area, legend_area) =
        plot_area.split_horizontally(plot.width.saturating_sub(LEGEND_WIDTH));

    let mut chart = ChartBuilder::on(&bars_area)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(
            (year_min as f64 - 1.0)..(year_max as f64 + 1.0),
            layout.y_range.0..layout.y_range.1,
        )?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels((year_max - year_min + 3).max(2) as usize)
        .x_label_formatter(&|v| format!("{:.0}", v))
        .y_label_formatter(&|v| format!("{:.0}", v))
        .x_desc(plot.x_axis_title.as_str())
        .y_desc(plot.y_axis_title.as_str())
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()?;

    chart.draw_series(layout.bars.iter().flat_map(|bar| {
        bar.segments.iter().map(move |seg| {
            Rectangle::new([(bar.x0, seg.bottom), (bar.x1, seg.top)], seg.colour.filled())
        })
    }))?;

    // Legend panel right of the bars, swatches outlined.
    let legend_font = ("sans-serif", 16).into_font();
    for row in legend_rows(&plot.legend_title, &layout.legend) {
        if let Some((corners, colour)) = row.swatch {
            legend_area.draw(&Rectangle::new(corners, colour.filled()))?;
            legend_area.draw(&Rectangle::new(corners, BLACK.stroke_width(1)))?;
        }
        legend_area.draw(&Text::new(row.label, row.text_at, legend_font.clone()))?;
    }

    caption_area.draw(&Text::new(
        plot.source.clone(),
        (10, 8),
        ("sans-serif", 14).into_font().color(&RGBColor(110, 110, 110)),
    ))?;

    root.present()
        .with_context(|| format!("writing chart {}", path.display()))?;
    log::info!("saved chart to {}", path.display());
    Ok(())
}
