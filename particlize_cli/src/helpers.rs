use anyhow::{bail, Context, Result};
use particlize::cell::FreezeoutCell;
use particlize::coefficients::ConstantCoefficients;
use particlize::config::RawConfig;
use particlize::species::{HadronSpecies, Statistics};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// The YAML parameter file: the sampler keys plus an optional constant
/// df-coefficient block standing in for the external tables.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    #[serde(flatten)]
    pub raw: RawConfig,
    pub df: ConstantCoefficients,
}

pub fn read_config(path: &Path) -> Result<FileConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("unable to read parameter file '{}'", path.display()))?;

    serde_yaml::from_str(&text)
        .with_context(|| format!("unable to parse parameter file '{}'", path.display()))
}

fn numbers(line: &str) -> Result<Vec<f64>> {
    line.split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .with_context(|| format!("invalid number '{token}'"))
        })
        .collect()
}

/// Reads a freezeout surface table with the columns
/// `tau x y eta dat dax day dan ux uy un E T P pixx pixy pixn piyy piyn
/// bulkPi [muB nB Vx Vy Vn]`. Lines starting with `#` are skipped.
pub fn read_surface(path: &Path) -> Result<Vec<FreezeoutCell>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("unable to read surface file '{}'", path.display()))?;

    let mut cells = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let columns = numbers(line)
            .with_context(|| format!("surface file line {}", index + 1))?;

        if columns.len() != 20 && columns.len() != 25 {
            bail!(
                "surface file line {} has {} columns, expected 20 or 25",
                index + 1,
                columns.len()
            );
        }

        let mut cell = FreezeoutCell {
            tau: columns[0],
            x: columns[1],
            y: columns[2],
            eta: columns[3],
            dsigma_tau: columns[4],
            dsigma_x: columns[5],
            dsigma_y: columns[6],
            dsigma_eta: columns[7],
            ux: columns[8],
            uy: columns[9],
            un: columns[10],
            energy_density: columns[11],
            temperature: columns[12],
            pressure: columns[13],
            pixx: columns[14],
            pixy: columns[15],
            pixn: columns[16],
            piyy: columns[17],
            piyn: columns[18],
            bulk_pi: columns[19],
            ..FreezeoutCell::default()
        };

        if columns.len() == 25 {
            cell.mub = columns[20];
            cell.nb = columns[21];
            cell.vx = columns[22];
            cell.vy = columns[23];
            cell.vn = columns[24];
        }

        cells.push(cell);
    }

    if cells.is_empty() {
        bail!("surface file '{}' contains no cells", path.display());
    }

    Ok(cells)
}

/// Reads a chosen-species table with the columns
/// `mcid mass degeneracy baryon sign [neq bulk_density diff_density]`.
pub fn read_species(path: &Path) -> Result<Vec<HadronSpecies>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("unable to read species file '{}'", path.display()))?;

    let mut species = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let columns = numbers(line)
            .with_context(|| format!("species file line {}", index + 1))?;

        if columns.len() != 5 && columns.len() != 8 {
            bail!(
                "species file line {} has {} columns, expected 5 or 8",
                index + 1,
                columns.len()
            );
        }

        #[allow(clippy::cast_possible_truncation)]
        let mc_id = columns[0] as i32;

        let mut part = HadronSpecies::new(
            mc_id,
            columns[1],
            columns[2],
            columns[3],
            Statistics::from_sign(columns[4]),
        );

        if columns.len() == 8 {
            part.equilibrium_density = columns[5];
            part.bulk_density = columns[6];
            part.diff_density = columns[7];
        }

        species.push(part);
    }

    if species.is_empty() {
        bail!("species file '{}' contains no entries", path.display());
    }

    Ok(species)
}
