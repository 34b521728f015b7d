//! Writes a synthetic raw export set in the inventory's layout:
//! `;`-delimited, Estonian headers, comma decimals with space-grouped
//! thousands.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueHint};

const YEARS: std::ops::RangeInclusive<i32> = 2008..=2022;

/// (file slug, Estonian label, share of the all-species area)
const SPECIES: [(&str, &str, f64); 7] = [
    ("aspen", "Haab", 0.08),
    ("birch", "Kask", 0.30),
    ("black_alder", "Sanglepp", 0.04),
    ("grey_alder", "Hall lepp", 0.09),
    ("other", "Teised", 0.02),
    ("pine", "Mänd", 0.30),
    ("spruce", "Kuusk", 0.17),
];

/// (label, base area in kha for all species)
const AGE_GROUPS: [(&str, f64); 16] = [
    ("Lage ala", 45.0),
    ("...10", 180.0),
    ("11...20", 160.0),
    ("21...30", 140.0),
    ("31...40", 150.0),
    ("41...50", 190.0),
    ("51...60", 230.0),
    ("61...70", 210.0),
    ("71...80", 170.0),
    ("81...90", 120.0),
    ("91...100", 80.0),
    ("101...110", 45.0),
    ("111...120", 25.0),
    ("121...130", 12.0),
    ("131...140", 6.0),
    ("141...", 4.0),
];

#[derive(Debug, Parser)]
#[command(
    name = "generate_sample",
    version,
    about = "Write synthetic forest inventory exports for trying out forest-trends"
)]
struct Args {
    /// Project root; exports go to ROOT_DIR/data/raw.
    #[arg(default_value = "age_group_trends", value_hint = ValueHint::DirPath)]
    root_dir: PathBuf,
}

const UNKNOWN_AREA: f64 = 20.0;
const AREA_METRIC: &str = "Pindala (tuhat ha)";

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    /// Uniform in `[1 - spread, 1 + spread)`.
    fn jitter(&mut self, spread: f64) -> f64 {
        let unit = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        1.0 - spread + 2.0 * spread * unit
    }
}

/// `1234.5` → `"1 234,50"`.
fn estonian_number(value: f64) -> String {
    let fixed = format!("{value:.2}");
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::new();
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(*c);
    }
    format!("{grouped},{frac}")
}

fn writer(path: &Path) -> Result<csv::Writer<fs::File>> {
    csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))
}

/// Age-class export of one species; `share` scales the all-species areas.
fn write_age_groups(
    path: &Path,
    species_label: &str,
    share: f64,
    production_share: f64,
    rng: &mut SimpleRng,
) -> Result<()> {
    let mut out = writer(path)?;
    out.write_record(["Aasta", "Enamuspuuliik", "Kaitsepõhjus", "Meetrik", "Meetriku väärtus"])?;

    for (offset, year) in YEARS.enumerate() {
        // Older stands slowly grow, younger ones shrink.
        let drift = offset as f64 * 0.01;
        let mut total = 0.0;
        let mut rows: Vec<(String, f64)> = Vec::new();

        for (i, (label, base)) in AGE_GROUPS.iter().enumerate() {
            let age_drift = if i >= 9 { 1.0 + drift } else { 1.0 - drift / 2.0 };
            let area = base * share * production_share * age_drift * rng.jitter(0.05);
            total += area;
            rows.push((label.to_string(), area));
        }
        let unknown = UNKNOWN_AREA * share * production_share * rng.jitter(0.2);
        total += unknown;
        rows.push(("Selguseta ala".into(), unknown));
        rows.push(("Kokku".into(), total));

        for (label, area) in rows {
            out.write_record([
                year.to_string(),
                species_label.to_string(),
                label,
                AREA_METRIC.to_string(),
                estonian_number(area),
            ])?;
        }
    }
    out.flush()?;
    Ok(())
}

fn write_cutting(path: &Path, rng: &mut SimpleRng) -> Result<()> {
    let mut out = writer(path)?;
    out.write_record(["Raie aasta", "Kaitsepõhjus", "Meetrik", "Meetriku väärtus"])?;
    for year in YEARS {
        let regeneration = 24.0 * rng.jitter(0.15);
        let thinning = 35.0 * rng.jitter(0.15);
        for (kind, area) in [("Uuendusraie kokku", regeneration), ("Harvendusraie", thinning)] {
            out.write_record([
                year.to_string(),
                kind.to_string(),
                AREA_METRIC.to_string(),
                estonian_number(area),
            ])?;
            out.write_record([
                year.to_string(),
                kind.to_string(),
                "Maht (tuhat tm)".to_string(),
                estonian_number(area * 180.0),
            ])?;
        }
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let raw_dir = args.root_dir.join("data/raw");
    fs::create_dir_all(&raw_dir).with_context(|| format!("creating {}", raw_dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let prefix = "1.11.X Vanuseklassid + uuend_data";

    let all_species = std::iter::once(("all", "Kokku", 1.0)).chain(SPECIES);
    let mut files = 0;
    for (slug, label, share) in all_species {
        for (measurement, production_share) in [("all", 1.0), ("production", 0.72)] {
            let path = raw_dir.join(format!("{prefix}_{slug}_{measurement}.csv"));
            write_age_groups(&path, label, share, production_share, &mut rng)?;
            files += 1;
        }
    }
    write_cutting(&raw_dir.join("3.2.2.X Raiete ajalugu.csv"), &mut rng)?;
    files += 1;

    log::info!("wrote {files} raw exports to {}", raw_dir.display());
    println!("Wrote {files} raw exports to {}", raw_dir.display());
    Ok(())
}
