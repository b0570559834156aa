//! Gauss-Laguerre and Gauss-Legendre quadrature nodes.
//!
//! The thermal moment integrals use generalized Gauss-Laguerre rules with
//! weight `x^a exp(-x)` for a = 0, 1, 2 (one row per moment power) and a
//! Gauss-Legendre rule for the angular integrals of the anisotropic
//! moments. Nodes are found by Newton iteration on the three-term
//! recurrences; externally tabulated nodes can be injected through
//! [`GaussLaguerre::from_parts`].

use crate::convert::checked_node_count;
use crate::error::{Error, Result};
use ndarray::Array2;

/// Number of generalized exponents carried by a [`GaussLaguerre`] rule.
pub const LAGUERRE_ORDERS: usize = 3;

const NEWTON_MAX_ITER: usize = 100;
const NEWTON_TOL: f64 = 1e-14;

/// Generalized Gauss-Laguerre roots and weights for a = 0, 1, 2.
#[derive(Clone, Debug)]
pub struct GaussLaguerre {
    points: usize,
    roots: Array2<f64>,
    weights: Array2<f64>,
}

impl GaussLaguerre {
    /// Computes an `points`-point rule for each generalized exponent.
    ///
    /// # Errors
    ///
    /// Returns an error if `points` is zero or out of range, or if the
    /// Newton iteration fails to locate a root.
    pub fn new(points: usize) -> Result<Self> {
        if points == 0 {
            return Err(Error::General(
                "Gauss-Laguerre rule needs at least one point".to_owned(),
            ));
        }

        let mut roots = Array2::zeros((LAGUERRE_ORDERS, points));
        let mut weights = Array2::zeros((LAGUERRE_ORDERS, points));

        for alpha in 0..LAGUERRE_ORDERS {
            let (r, w) = laguerre_rule(points, alpha)?;
            for i in 0..points {
                roots[[alpha, i]] = r[i];
                weights[[alpha, i]] = w[i];
            }
        }

        Ok(Self {
            points,
            roots,
            weights,
        })
    }

    /// Wraps externally tabulated roots and weights, one row per
    /// generalized exponent a = 0, 1, 2.
    ///
    /// # Errors
    ///
    /// Returns an error unless exactly [`LAGUERRE_ORDERS`] rows of equal
    /// nonzero length are supplied.
    pub fn from_parts(roots: Vec<Vec<f64>>, weights: Vec<Vec<f64>>) -> Result<Self> {
        let points = roots.first().map_or(0, Vec::len);

        if roots.len() != LAGUERRE_ORDERS
            || weights.len() != LAGUERRE_ORDERS
            || points == 0
            || roots.iter().any(|r| r.len() != points)
            || weights.iter().any(|w| w.len() != points)
        {
            return Err(Error::General(
                "Gauss-Laguerre tables must hold three equally long rows".to_owned(),
            ));
        }

        let mut root_arr = Array2::zeros((LAGUERRE_ORDERS, points));
        let mut weight_arr = Array2::zeros((LAGUERRE_ORDERS, points));

        for alpha in 0..LAGUERRE_ORDERS {
            for i in 0..points {
                root_arr[[alpha, i]] = roots[alpha][i];
                weight_arr[[alpha, i]] = weights[alpha][i];
            }
        }

        Ok(Self {
            points,
            roots: root_arr,
            weights: weight_arr,
        })
    }

    /// Number of points per rule.
    #[must_use]
    pub const fn points(&self) -> usize {
        self.points
    }

    /// Root/weight pairs for the generalized exponent `alpha`.
    ///
    /// # Panics
    ///
    /// Panics if `alpha >= LAGUERRE_ORDERS`.
    pub fn nodes(&self, alpha: usize) -> impl Iterator<Item = (f64, f64)> + '_ {
        assert!(alpha < LAGUERRE_ORDERS);

        (0..self.points).map(move |i| (self.roots[[alpha, i]], self.weights[[alpha, i]]))
    }
}

/// Gauss-Legendre roots and weights on [-1, 1].
#[derive(Clone, Debug)]
pub struct GaussLegendre {
    roots: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussLegendre {
    /// Computes an `points`-point rule.
    ///
    /// # Errors
    ///
    /// Returns an error if `points` is zero or out of range.
    pub fn new(points: usize) -> Result<Self> {
        if points == 0 {
            return Err(Error::General(
                "Gauss-Legendre rule needs at least one point".to_owned(),
            ));
        }

        let n = checked_node_count(points)?;
        let mut roots = vec![0.0; points];
        let mut weights = vec![0.0; points];

        for i in 0..points.div_ceil(2) {
            let mut z = (std::f64::consts::PI * (index(i) + 0.75) / (n + 0.5)).cos();
            let mut pp = 0.0;

            for _ in 0..NEWTON_MAX_ITER {
                let (p1, p2) = legendre_pair(points, z);
                pp = n * (z * p1 - p2) / (z * z - 1.0);
                let z1 = z;
                z = z1 - p1 / pp;

                if (z - z1).abs() < NEWTON_TOL {
                    break;
                }
            }

            roots[i] = -z;
            roots[points - 1 - i] = z;
            weights[i] = 2.0 / ((1.0 - z * z) * pp * pp);
            weights[points - 1 - i] = weights[i];
        }

        Ok(Self { roots, weights })
    }

    /// Number of points.
    #[must_use]
    pub fn points(&self) -> usize {
        self.roots.len()
    }

    /// Root/weight pairs.
    pub fn nodes(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.roots
            .iter()
            .copied()
            .zip(self.weights.iter().copied())
    }
}

/// Loop indices as f64; exact because the node count is validated against
/// the u32 range before any rule is built.
#[allow(clippy::cast_precision_loss)]
const fn index(i: usize) -> f64 {
    i as f64
}

/// Value of (L_n^(a), L_{n-1}^(a)) at `x`.
fn laguerre_pair(n: usize, alpha: f64, x: f64) -> (f64, f64) {
    let mut p1 = 1.0;
    let mut p2 = 0.0;

    for j in 0..n {
        let jf = index(j);
        let p3 = p2;
        p2 = p1;
        p1 = ((2.0 * jf + 1.0 + alpha - x) * p2 - (jf + alpha) * p3) / (jf + 1.0);
    }

    (p1, p2)
}

/// Value of (P_n, P_{n-1}) at `x`.
fn legendre_pair(n: usize, x: f64) -> (f64, f64) {
    let mut p1 = 1.0;
    let mut p2 = 0.0;

    for j in 0..n {
        let jf = index(j);
        let p3 = p2;
        p2 = p1;
        p1 = ((2.0 * jf + 1.0) * x * p2 - jf * p3) / (jf + 1.0);
    }

    (p1, p2)
}

fn laguerre_rule(n: usize, alpha: usize) -> Result<(Vec<f64>, Vec<f64>)> {
    let nf = checked_node_count(n)?;
    let mut roots = vec![0.0; n];
    let mut weights = vec![0.0; n];

    // Gamma(n + alpha) / n! for the supported exponents
    let norm_ratio = match alpha {
        0 => 1.0 / nf,
        1 => 1.0,
        2 => nf + 1.0,
        _ => {
            return Err(Error::General(format!(
                "unsupported Laguerre exponent {alpha}"
            )))
        }
    };

    let alf = index(alpha);
    let mut z = 0.0;

    for i in 0..n {
        // initial guesses marching up from the smallest root
        if i == 0 {
            z = (1.0 + alf) * (3.0 + 0.92 * alf) / (1.0 + 2.4 * nf + 1.8 * alf);
        } else if i == 1 {
            z += (15.0 + 6.25 * alf) / (1.0 + 0.9 * alf + 2.5 * nf);
        } else {
            let ai = index(i - 1);
            z += ((1.0 + 2.55 * ai) / (1.9 * ai) + 1.26 * ai * alf / (1.0 + 3.5 * ai))
                * (z - roots[i - 2])
                / (1.0 + 0.3 * alf);
        }

        let mut converged = false;
        let mut p2 = 0.0;

        for _ in 0..NEWTON_MAX_ITER {
            let pair = laguerre_pair(n, alf, z);
            p2 = pair.1;
            let pp = (nf * pair.0 - (nf + alf) * p2) / z;
            let z1 = z;
            z = z1 - pair.0 / pp;

            if (z - z1).abs() < NEWTON_TOL * z.max(1.0) {
                converged = true;
                break;
            }
        }

        if !converged {
            return Err(Error::General(format!(
                "Gauss-Laguerre Newton iteration stalled at root {i} of {n}"
            )));
        }

        roots[i] = z;
        weights[i] = norm_ratio * z / ((nf + alf) * p2 * p2);
    }

    Ok((roots, weights))
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn laguerre_two_point_closed_form() {
        let rule = GaussLaguerre::new(2).unwrap();
        let nodes: Vec<_> = rule.nodes(0).collect();
        let sqrt2 = std::f64::consts::SQRT_2;

        assert_approx_eq!(f64, nodes[0].0, 2.0 - sqrt2, epsilon = 1e-12);
        assert_approx_eq!(f64, nodes[1].0, 2.0 + sqrt2, epsilon = 1e-12);
        assert_approx_eq!(f64, nodes[0].1, (2.0 + sqrt2) / 4.0, epsilon = 1e-12);
        assert_approx_eq!(f64, nodes[1].1, (2.0 - sqrt2) / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn laguerre_weight_sums_match_gamma() {
        let rule = GaussLaguerre::new(24).unwrap();

        // sum of weights = integral of x^a exp(-x) = Gamma(a + 1)
        for (alpha, gamma) in [(0, 1.0), (1, 1.0), (2, 2.0)] {
            let sum: f64 = rule.nodes(alpha).map(|(_, w)| w).sum();
            assert_approx_eq!(f64, sum, gamma, epsilon = 1e-10);
        }
    }

    #[test]
    fn laguerre_integrates_high_moments() {
        let rule = GaussLaguerre::new(32).unwrap();

        // integral of x^5 exp(-x) through the a = 1 row
        let moment: f64 = rule.nodes(1).map(|(x, w)| w * x.powi(4)).sum();
        assert_approx_eq!(f64, moment, 120.0, epsilon = 1e-8);
    }

    #[test]
    fn legendre_low_order_closed_forms() {
        let rule = GaussLegendre::new(3).unwrap();
        let nodes: Vec<_> = rule.nodes().collect();
        let x1 = (3.0_f64 / 5.0).sqrt();

        assert_approx_eq!(f64, nodes[0].0, -x1, epsilon = 1e-12);
        assert_approx_eq!(f64, nodes[1].0, 0.0, epsilon = 1e-12);
        assert_approx_eq!(f64, nodes[2].0, x1, epsilon = 1e-12);
        assert_approx_eq!(f64, nodes[0].1, 5.0 / 9.0, epsilon = 1e-12);
        assert_approx_eq!(f64, nodes[1].1, 8.0 / 9.0, epsilon = 1e-12);
    }

    #[test]
    fn legendre_integrates_polynomials() {
        let rule = GaussLegendre::new(16).unwrap();
        let integral: f64 = rule.nodes().map(|(z, w)| w * z * z * (1.0 - z * z)).sum();

        // int_-1^1 z^2 (1 - z^2) dz = 4/15
        assert_approx_eq!(f64, integral, 4.0 / 15.0, epsilon = 1e-12);
    }

    #[test]
    fn from_parts_round_trip() {
        let computed = GaussLaguerre::new(8).unwrap();
        let roots: Vec<Vec<f64>> = (0..LAGUERRE_ORDERS)
            .map(|a| computed.nodes(a).map(|(r, _)| r).collect())
            .collect();
        let weights: Vec<Vec<f64>> = (0..LAGUERRE_ORDERS)
            .map(|a| computed.nodes(a).map(|(_, w)| w).collect())
            .collect();

        let wrapped = GaussLaguerre::from_parts(roots, weights).unwrap();
        assert_eq!(wrapped.points(), 8);

        for alpha in 0..LAGUERRE_ORDERS {
            for ((r0, w0), (r1, w1)) in computed.nodes(alpha).zip(wrapped.nodes(alpha)) {
                assert_approx_eq!(f64, r0, r1, ulps = 2);
                assert_approx_eq!(f64, w0, w1, ulps = 2);
            }
        }
    }

    #[test]
    fn zero_points_is_rejected() {
        assert!(GaussLaguerre::new(0).is_err());
        assert!(GaussLegendre::new(0).is_err());
    }
}
