//! Run configuration.
//!
//! Parameter files keep the upstream numeric key conventions (df_mode
//! 1-5, dimension 2/3, integer toggles); deserialization goes through a
//! raw record that is then validated into the strongly typed
//! [`SamplerConfig`]. Unrecognized scheme or dimension values are fatal.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default cap on the number of species entering the anisotropic thermal
/// integrals (heaviest dropped).
pub const ANISO_SPECIES_CAP: usize = 320;

/// The viscous correction scheme.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DfMode {
    /// Grad 14-moment approximation.
    Grad14,
    /// RTA Chapman-Enskog expansion.
    ChapmanEnskog,
    /// PTM modified equilibrium distribution.
    PtmModified,
    /// PTB modified equilibrium distribution.
    PtbModified,
    /// PTM modified anisotropic distribution.
    PtmAniso,
}

impl DfMode {
    /// Parses the upstream integer key.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for values outside 1..=5.
    pub fn from_key(key: i64) -> Result<Self> {
        match key {
            1 => Ok(Self::Grad14),
            2 => Ok(Self::ChapmanEnskog),
            3 => Ok(Self::PtmModified),
            4 => Ok(Self::PtbModified),
            5 => Ok(Self::PtmAniso),
            _ => Err(Error::Config(format!(
                "df_mode must be 1 (14-moment), 2 (Chapman-Enskog), 3 (PTM), 4 (PTB) or 5 (PTM aniso), got {key}"
            ))),
        }
    }

    /// Human-readable scheme name for run banners.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Grad14 => "Grad 14-moment approximation",
            Self::ChapmanEnskog => "RTA Chapman-Enskog expansion",
            Self::PtmModified => "PTM modified equilibrium distribution",
            Self::PtbModified => "PTB modified equilibrium distribution",
            Self::PtmAniso => "PTM modified anisotropic distribution",
        }
    }
}

/// Dimensionality of the freezeout surface.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Dimension {
    /// 2+1D boost-invariant surface; particle rapidity is sampled on
    /// [-y_cut, y_cut).
    TwoPlusOne,
    /// 3+1D surface; spacetime rapidity comes from the cell.
    ThreePlusOne,
}

impl Dimension {
    /// Parses the upstream integer key.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for values outside {2, 3}.
    pub fn from_key(key: i64) -> Result<Self> {
        match key {
            2 => Ok(Self::TwoPlusOne),
            3 => Ok(Self::ThreePlusOne),
            _ => Err(Error::Config(format!("dimension must be 2 or 3, got {key}"))),
        }
    }
}

/// Validated sampler configuration.
#[derive(Clone, Debug)]
pub struct SamplerConfig {
    /// Viscous correction scheme.
    pub df_mode: DfMode,
    /// Surface dimensionality.
    pub dimension: Dimension,
    /// Include baryon chemical potential and net-baryon density.
    pub include_baryon: bool,
    /// Include the bulk viscous correction.
    pub include_bulk_deltaf: bool,
    /// Include the shear viscous correction.
    pub include_shear_deltaf: bool,
    /// Include the baryon-diffusion correction.
    pub include_baryondiff_deltaf: bool,
    /// Lower bound on the deformation determinant before the modified
    /// schemes fall back.
    pub deta_min: f64,
    /// Rapidity half-width of the 2+1D volume extension.
    pub y_cut: f64,
    /// Pion-0 mass used by the linearized-density feasibility check (GeV).
    pub mass_pion0: f64,
    /// Evaluate the feasibility check at the surface-averaged state.
    pub fast: bool,
    /// Oversample events to reach `min_num_hadrons`.
    pub oversample: bool,
    /// Target total hadron count across events.
    pub min_num_hadrons: f64,
    /// Hard cap on the number of sampled events.
    pub max_num_samples: u64,
    /// Master seed; negative requests a wall-clock seed.
    pub sampler_seed: i64,
    /// Cap on species entering the anisotropic reconstruction.
    pub aniso_species_cap: usize,
}

impl SamplerConfig {
    /// Effective rapidity half-width: `y_cut` in 2+1D, 1/2 in 3+1D (so the
    /// volume extension factor 2 y_max is one).
    #[must_use]
    pub const fn y_max(&self) -> f64 {
        match self.dimension {
            Dimension::TwoPlusOne => self.y_cut,
            Dimension::ThreePlusOne => 0.5,
        }
    }
}

/// The raw parameter record with the upstream key conventions.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RawConfig {
    /// 0: spacetime distributions, 1: continuous spectra, 2: sampling.
    pub operation: i64,
    /// Correction scheme key (1-5).
    pub df_mode: i64,
    /// Surface dimensionality key (2 or 3).
    pub dimension: i64,
    /// Baryon toggle (0/1).
    pub include_baryon: i64,
    /// Bulk correction toggle (0/1).
    pub include_bulk_deltaf: i64,
    /// Shear correction toggle (0/1).
    pub include_shear_deltaf: i64,
    /// Diffusion correction toggle (0/1).
    pub include_baryondiff_deltaf: i64,
    /// Deformation determinant floor.
    pub deta_min: f64,
    /// Rapidity half-width in 2+1D.
    pub y_cut: f64,
    /// Pion-0 mass (GeV).
    pub mass_pion0: f64,
    /// FAST-mode toggle (0/1).
    pub fast: i64,
    /// Oversampling toggle (0/1).
    pub oversample: i64,
    /// Target hadron count when oversampling.
    pub min_num_hadrons: f64,
    /// Event-count cap when oversampling.
    pub max_num_samples: u64,
    /// Master seed (negative: wall clock).
    pub sampler_seed: i64,
    /// Species cap of the anisotropic reconstruction.
    pub aniso_species_cap: usize,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            operation: 2,
            df_mode: 2,
            dimension: 2,
            include_baryon: 0,
            include_bulk_deltaf: 1,
            include_shear_deltaf: 1,
            include_baryondiff_deltaf: 0,
            deta_min: 0.01,
            y_cut: 5.0,
            mass_pion0: 0.134_976_6,
            fast: 0,
            oversample: 1,
            min_num_hadrons: 100_000.0,
            max_num_samples: 1000,
            sampler_seed: -1,
            aniso_species_cap: ANISO_SPECIES_CAP,
        }
    }
}

impl RawConfig {
    /// Validates into a [`SamplerConfig`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unrecognized `df_mode` or
    /// `dimension` keys or a nonpositive rapidity cut.
    pub fn validate(&self) -> Result<SamplerConfig> {
        let df_mode = DfMode::from_key(self.df_mode)?;
        let dimension = Dimension::from_key(self.dimension)?;

        if dimension == Dimension::TwoPlusOne && self.y_cut <= 0.0 {
            return Err(Error::Config(format!(
                "y_cut must be positive in 2+1D, got {}",
                self.y_cut
            )));
        }

        Ok(SamplerConfig {
            df_mode,
            dimension,
            include_baryon: self.include_baryon != 0,
            include_bulk_deltaf: self.include_bulk_deltaf != 0,
            include_shear_deltaf: self.include_shear_deltaf != 0,
            include_baryondiff_deltaf: self.include_baryondiff_deltaf != 0,
            deta_min: self.deta_min,
            y_cut: self.y_cut,
            mass_pion0: self.mass_pion0,
            fast: self.fast != 0,
            oversample: self.oversample != 0,
            min_num_hadrons: self.min_num_hadrons,
            max_num_samples: self.max_num_samples,
            sampler_seed: self.sampler_seed,
            aniso_species_cap: self.aniso_species_cap,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_raw_config_validates() {
        let config = RawConfig::default().validate().unwrap();

        assert_eq!(config.df_mode, DfMode::ChapmanEnskog);
        assert_eq!(config.dimension, Dimension::TwoPlusOne);
        assert!(config.oversample);
    }

    #[test]
    fn bad_df_mode_is_fatal() {
        let raw = RawConfig {
            df_mode: 7,
            ..RawConfig::default()
        };

        assert!(raw.validate().is_err());
    }

    #[test]
    fn bad_dimension_is_fatal() {
        let raw = RawConfig {
            dimension: 4,
            ..RawConfig::default()
        };

        assert!(raw.validate().is_err());
    }

    #[test]
    fn y_max_is_half_in_three_plus_one() {
        let raw = RawConfig {
            dimension: 3,
            ..RawConfig::default()
        };
        let config = raw.validate().unwrap();

        float_cmp::assert_approx_eq!(f64, config.y_max(), 0.5, ulps = 2);
    }
}
