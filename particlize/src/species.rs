//! Hadron species records supplied by the external PDG ingestion step.

use serde::{Deserialize, Serialize};

/// Quantum statistics of a species.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Statistics {
    /// Bose-Einstein statistics (mesons).
    BoseEinstein,
    /// Fermi-Dirac statistics (baryons).
    FermiDirac,
}

impl Statistics {
    /// Sign entering `1 / (exp((E - mu)/T) + sign)`: `-1` for bosons, `+1`
    /// for fermions.
    #[must_use]
    pub const fn sign(self) -> f64 {
        match self {
            Self::BoseEinstein => -1.0,
            Self::FermiDirac => 1.0,
        }
    }

    /// Statistics from the sign convention used in PDG-derived tables.
    #[must_use]
    pub fn from_sign(sign: f64) -> Self {
        if sign < 0.0 {
            Self::BoseEinstein
        } else {
            Self::FermiDirac
        }
    }
}

/// A single hadron species eligible for emission.
///
/// The thermal density columns are evaluated by the external PDG/df
/// collaborator at the surface-averaged thermodynamic state; they feed the
/// FAST yield estimate and carry the bulk/diffusion corrections with the
/// `Pi u.dSigma` and `V.dSigma` factors stripped off.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HadronSpecies {
    /// Monte-Carlo PDG identifier.
    pub mc_id: i32,
    /// Rest mass in GeV.
    pub mass: f64,
    /// Spin degeneracy factor g.
    pub degeneracy: f64,
    /// Baryon number.
    pub baryon: f64,
    /// Quantum statistics.
    pub statistics: Statistics,
    /// Equilibrium number density in fm^-3.
    pub equilibrium_density: f64,
    /// Bulk correction density in fm^-3.
    pub bulk_density: f64,
    /// Baryon-diffusion correction density in fm^-3.
    pub diff_density: f64,
}

impl HadronSpecies {
    /// Species with zero precomputed densities; used when the exact
    /// per-cell Gauss-Laguerre densities are requested instead of the FAST
    /// tables.
    #[must_use]
    pub fn new(mc_id: i32, mass: f64, degeneracy: f64, baryon: f64, statistics: Statistics) -> Self {
        Self {
            mc_id,
            mass,
            degeneracy,
            baryon,
            statistics,
            equilibrium_density: 0.0,
            bulk_density: 0.0,
            diff_density: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_signs() {
        assert_eq!(Statistics::BoseEinstein.sign(), -1.0);
        assert_eq!(Statistics::FermiDirac.sign(), 1.0);
        assert_eq!(Statistics::from_sign(-1.0), Statistics::BoseEinstein);
        assert_eq!(Statistics::from_sign(1.0), Statistics::FermiDirac);
    }
}
