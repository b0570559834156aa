#![warn(clippy::all, clippy::cargo, clippy::nursery, clippy::pedantic)]
#![warn(missing_docs)]

//! `particlize` converts a discretized freezeout hypersurface into a
//! stochastic set of hadrons distributed according to the Cooper-Frye
//! formula with viscous corrections.

pub mod aniso;
pub mod averages;
pub mod basis;
pub mod cell;
pub mod coefficients;
pub mod config;
mod convert;
pub mod emission;
pub mod error;
pub mod feqmod;
pub mod momentum;
pub mod quadrature;
pub mod species;
pub mod thermal;
pub mod yields;

/// hbar*c in GeV fm.
pub const HBARC: f64 = 0.197327053;

/// 2 pi^2 (hbar c)^3 in GeV^3 fm^3, the phase-space normalization of the
/// thermal moment integrals.
pub const TWO_PI2_HBARC3: f64 =
    2.0 * std::f64::consts::PI * std::f64::consts::PI * HBARC * HBARC * HBARC;
