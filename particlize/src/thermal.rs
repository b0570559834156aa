//! Maxwell-Juttner thermal moment integrals evaluated with the
//! generalized Gauss-Laguerre rules.
//!
//! All integrands are written against the reduced momentum `pbar = p / T`
//! and carry the `exp(pbar)` factor that cancels the Laguerre weight
//! function, so an `x^a exp(-x)` rule integrates them exactly in the
//! Boltzmann limit. Densities follow from `n = g T^3 / (2 pi^2 (hbar c)^3)
//! * integral`.

use crate::quadrature::GaussLaguerre;
use crate::TWO_PI2_HBARC3;

/// Equilibrium occupation `1 / (exp(ebar - chem) + sign)`.
#[must_use]
pub fn occupation(ebar: f64, chem: f64, sign: f64) -> f64 {
    1.0 / ((ebar - chem).exp() + sign)
}

/// Dimensionless density moment `int dpbar pbar^2 f(ebar)`, evaluated on
/// the a = 1 row.
#[must_use]
pub fn neq_moment(laguerre: &GaussLaguerre, mbar: f64, chem: f64, sign: f64) -> f64 {
    let mbar2 = mbar * mbar;

    laguerre
        .nodes(1)
        .map(|(pbar, weight)| {
            let ebar = (pbar * pbar + mbar2).sqrt();
            weight * pbar * pbar.exp() * occupation(ebar, chem, sign)
        })
        .sum()
}

/// Dimensionless moment `int dpbar pbar^2 f fbar` (the alpha_B derivative
/// of the density), evaluated on the a = 1 row.
#[must_use]
pub fn j10_moment(laguerre: &GaussLaguerre, mbar: f64, chem: f64, sign: f64) -> f64 {
    let mbar2 = mbar * mbar;

    laguerre
        .nodes(1)
        .map(|(pbar, weight)| {
            let ebar = (pbar * pbar + mbar2).sqrt();
            let f = occupation(ebar, chem, sign);
            weight * pbar * pbar.exp() * f * (1.0 - sign * f)
        })
        .sum()
}

/// Dimensionless moment `int dpbar pbar^2 ebar f fbar`, evaluated on the
/// a = 2 row.
#[must_use]
pub fn j20_moment(laguerre: &GaussLaguerre, mbar: f64, chem: f64, sign: f64) -> f64 {
    let mbar2 = mbar * mbar;

    laguerre
        .nodes(2)
        .map(|(pbar, weight)| {
            let ebar = (pbar * pbar + mbar2).sqrt();
            let f = occupation(ebar, chem, sign);
            weight * pbar.exp() * ebar * f * (1.0 - sign * f)
        })
        .sum()
}

/// Equilibrium number density in fm^-3 of one species at temperature `t`.
#[must_use]
pub fn equilibrium_density(
    laguerre: &GaussLaguerre,
    mass: f64,
    degeneracy: f64,
    t: f64,
    chem: f64,
    sign: f64,
) -> f64 {
    let neq_fact = t * t * t / TWO_PI2_HBARC3;

    neq_fact * degeneracy * neq_moment(laguerre, mass / t, chem, sign)
}
