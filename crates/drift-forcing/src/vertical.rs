//! Vertical level lookup for 3-D fields.

use crate::error::ForcingError;

/// How a 3-D field is interpolated between depth levels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerticalInterp {
    /// Value of the closest level.
    #[default]
    Nearest,
    /// Linear blend of the two levels bracketing the depth.
    Linear,
}

/// Levels and weight for one depth: `value = a[lo] + w * (a[hi] - a[lo])`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct LevelWeight {
    pub lo: usize,
    pub hi: usize,
    pub w: f64,
}

/// Reject level depths that are empty, non-finite, or not strictly
/// increasing (positive downward).
pub(crate) fn validate_depths(depths: &[f64]) -> Result<(), ForcingError> {
    if depths.is_empty() {
        return Err(ForcingError::InvalidDepths {
            reason: "no levels".to_string(),
        });
    }
    if let Some(d) = depths.iter().find(|d| !d.is_finite()) {
        return Err(ForcingError::InvalidDepths {
            reason: format!("non-finite depth {d}"),
        });
    }
    if let Some(k) = (1..depths.len()).find(|&k| depths[k] <= depths[k - 1]) {
        return Err(ForcingError::InvalidDepths {
            reason: format!("depth {k} ({}) not below depth {} ({})", depths[k], k - 1, depths[k - 1]),
        });
    }
    Ok(())
}

impl VerticalInterp {
    /// Bracketing levels for depth `z`. Depths above the first level or
    /// below the last clamp to that level. A NaN depth yields a NaN
    /// weight so the sample is NaN.
    pub(crate) fn weight(self, depths: &[f64], z: f64) -> LevelWeight {
        let n = depths.len();
        if n == 1 || z.is_nan() {
            return LevelWeight {
                lo: 0,
                hi: 0,
                w: z * 0.0,
            };
        }
        // First level strictly deeper than z, clamped into 1..n.
        let above = depths.partition_point(|&d| d <= z).clamp(1, n - 1);
        let (lo, hi) = (above - 1, above);
        let frac = ((z - depths[lo]) / (depths[hi] - depths[lo])).clamp(0.0, 1.0);
        match self {
            Self::Linear => LevelWeight { lo, hi, w: frac },
            Self::Nearest => {
                let k = if frac <= 0.5 { lo } else { hi };
                LevelWeight { lo: k, hi: k, w: 0.0 }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DEPTHS: [f64; 4] = [0.0, 10.0, 20.0, 50.0];

    #[test]
    fn linear_between_levels() {
        let w = VerticalInterp::Linear.weight(&DEPTHS, 15.0);
        assert_eq!(w, LevelWeight { lo: 1, hi: 2, w: 0.5 });
        let w = VerticalInterp::Linear.weight(&DEPTHS, 20.0);
        assert_eq!((w.lo, w.hi, w.w), (2, 3, 0.0));
    }

    #[test]
    fn clamps_outside_levels() {
        let top = VerticalInterp::Linear.weight(&DEPTHS, -3.0);
        assert_eq!((top.lo, top.w), (0, 0.0));
        let bottom = VerticalInterp::Linear.weight(&DEPTHS, 80.0);
        assert_eq!((bottom.hi, bottom.w), (3, 1.0));
    }

    #[test]
    fn nearest_picks_closest() {
        assert_eq!(VerticalInterp::Nearest.weight(&DEPTHS, 14.0).lo, 1);
        assert_eq!(VerticalInterp::Nearest.weight(&DEPTHS, 16.0).lo, 2);
        assert_eq!(VerticalInterp::Nearest.weight(&DEPTHS, 99.0).lo, 3);
    }

    #[test]
    fn nan_depth_gives_nan_weight() {
        assert!(VerticalInterp::Linear.weight(&DEPTHS, f64::NAN).w.is_nan());
        assert!(VerticalInterp::Nearest.weight(&DEPTHS, f64::NAN).w.is_nan());
    }

    #[test]
    fn depth_validation() {
        assert!(validate_depths(&DEPTHS).is_ok());
        assert!(validate_depths(&[]).is_err());
        assert!(validate_depths(&[0.0, 0.0]).is_err());
        assert!(validate_depths(&[0.0, f64::INFINITY]).is_err());
    }

    proptest! {
        #[test]
        fn weights_stay_in_the_bracket(z in -20.0f64..100.0) {
            let w = VerticalInterp::Linear.weight(&DEPTHS, z);
            prop_assert!(w.lo + 1 == w.hi);
            prop_assert!((0.0..=1.0).contains(&w.w));
            let at = DEPTHS[w.lo] + w.w * (DEPTHS[w.hi] - DEPTHS[w.lo]);
            let clamped = z.clamp(DEPTHS[0], DEPTHS[3]);
            prop_assert!((at - clamped).abs() < 1e-9, "{} vs {}", at, clamped);

            let n = VerticalInterp::Nearest.weight(&DEPTHS, z);
            prop_assert_eq!(n.lo, n.hi);
            let best = DEPTHS
                .iter()
                .map(|d| (d - clamped).abs())
                .fold(f64::INFINITY, f64::min);
            prop_assert!(((DEPTHS[n.lo] - clamped).abs() - best).abs() < 1e-9);
        }
    }
}
