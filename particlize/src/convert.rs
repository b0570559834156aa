//! Numeric casts at the sampler's integer/float seams.

use crate::error::{Error, Result};

/// A Poisson draw as a hadron count. Nonpositive or non-finite draws give
/// an empty event.
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
pub fn hadron_count_from_draw(draw: f64) -> usize {
    draw.max(0.0) as usize
}

/// A quadrature node count as an exactly representable f64.
///
/// The Newton recurrences evaluate the node count and its indices in
/// floating point; counts beyond the u32 range would round silently, so
/// they are rejected instead.
pub fn checked_node_count(points: usize) -> Result<f64> {
    u32::try_from(points).map(f64::from).map_err(|_| {
        Error::General(format!("quadrature node count {points} is out of range"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_clamp_to_zero() {
        assert_eq!(hadron_count_from_draw(-3.0), 0);
        assert_eq!(hadron_count_from_draw(f64::NAN), 0);
        assert_eq!(hadron_count_from_draw(41.7), 41);
    }

    #[test]
    fn oversized_node_counts_are_rejected() {
        assert!(checked_node_count(1 << 40).is_err());
        float_cmp::assert_approx_eq!(f64, checked_node_count(24).unwrap(), 24.0, ulps = 2);
    }
}
