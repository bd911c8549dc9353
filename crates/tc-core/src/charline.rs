//! Piecewise-linear characteristic curves.
//!
//! Performance maps (part-load efficiency, heat-transfer scaling, pressure
//! drop vs. flow) are stored as breakpoint tables and evaluated by linear
//! interpolation. Outside the breakpoint domain the nearest edge segment's
//! slope is continued, so evaluation never fails; callers that care about
//! leaving the supported range check [`CharLine::outside_margin`].

use crate::error::{CoreError, CoreResult};

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CharLine {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl CharLine {
    /// Build a curve from breakpoint arrays.
    ///
    /// Requires at least two points, strictly increasing finite `x`, and
    /// finite `y` of the same length.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> CoreResult<Self> {
        if x.len() < 2 {
            return Err(CoreError::InvalidArg {
                what: "characteristic needs at least two breakpoints",
            });
        }
        if x.len() != y.len() {
            return Err(CoreError::InvalidArg {
                what: "characteristic x/y arrays differ in length",
            });
        }
        for &v in x.iter().chain(y.iter()) {
            if !v.is_finite() {
                return Err(CoreError::NonFinite {
                    what: "characteristic breakpoint",
                    value: v,
                });
            }
        }
        if x.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CoreError::InvalidArg {
                what: "characteristic x breakpoints must be strictly increasing",
            });
        }
        Ok(Self { x, y })
    }

    pub fn from_points(points: &[(f64, f64)]) -> CoreResult<Self> {
        let (x, y) = points.iter().copied().unzip();
        Self::new(x, y)
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Inclusive x-range covered by breakpoints.
    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// Interpolate at `x`; extrapolate linearly with the edge segment's
    /// slope when `x` lies outside the breakpoint domain.
    pub fn evaluate(&self, x: f64) -> f64 {
        let n = self.x.len();
        // Edge segments also serve as the extrapolation rays.
        let seg = if x <= self.x[0] {
            0
        } else if x >= self.x[n - 1] {
            n - 2
        } else {
            self.x.partition_point(|&xi| xi <= x) - 1
        };
        let (x0, x1) = (self.x[seg], self.x[seg + 1]);
        let (y0, y1) = (self.y[seg], self.y[seg + 1]);
        y0 + (x - x0) * (y1 - y0) / (x1 - x0)
    }

    /// True when `x` lies beyond the domain by more than `rel_margin`
    /// (relative to the domain span). Used to surface extrapolation
    /// warnings without making evaluation fail.
    pub fn outside_margin(&self, x: f64, rel_margin: f64) -> bool {
        let (lo, hi) = self.domain();
        let slack = rel_margin * (hi - lo);
        x < lo - slack || x > hi + slack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line() -> CharLine {
        CharLine::from_points(&[(0.5, 0.8), (1.0, 1.0), (1.5, 1.1)]).unwrap()
    }

    #[test]
    fn rejects_bad_breakpoints() {
        assert!(CharLine::new(vec![1.0], vec![1.0]).is_err());
        assert!(CharLine::new(vec![0.0, 1.0], vec![1.0]).is_err());
        assert!(CharLine::new(vec![0.0, 0.0], vec![1.0, 2.0]).is_err());
        assert!(CharLine::new(vec![1.0, 0.5], vec![1.0, 2.0]).is_err());
        assert!(CharLine::new(vec![0.0, f64::NAN], vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn hits_breakpoints_exactly() {
        let c = line();
        assert_eq!(c.evaluate(0.5), 0.8);
        assert_eq!(c.evaluate(1.0), 1.0);
        assert_eq!(c.evaluate(1.5), 1.1);
    }

    #[test]
    fn interpolates_linearly() {
        let c = line();
        assert!((c.evaluate(0.75) - 0.9).abs() < 1e-12);
        assert!((c.evaluate(1.25) - 1.05).abs() < 1e-12);
    }

    #[test]
    fn extrapolates_with_edge_slope() {
        let c = line();
        // Below domain: slope of first segment is 0.4 per unit x.
        assert!((c.evaluate(0.0) - (0.8 - 0.5 * 0.4)).abs() < 1e-12);
        // Above domain: slope of last segment is 0.2 per unit x.
        assert!((c.evaluate(2.0) - (1.1 + 0.5 * 0.2)).abs() < 1e-12);
    }

    #[test]
    fn margin_check_flags_far_points_only() {
        let c = line();
        assert!(!c.outside_margin(0.5, 0.1));
        assert!(!c.outside_margin(1.55, 0.1));
        assert!(c.outside_margin(1.75, 0.1));
        assert!(c.outside_margin(0.2, 0.1));
    }

    proptest! {
        #[test]
        fn monotone_breakpoints_give_monotone_evaluation(
            steps in proptest::collection::vec(0.01f64..1.0, 2..8),
            rises in proptest::collection::vec(0.0f64..1.0, 2..8),
            a in -2.0f64..3.0,
            b in -2.0f64..3.0,
        ) {
            let n = steps.len().min(rises.len());
            let mut x = vec![0.0];
            let mut y = vec![0.0];
            for i in 0..n {
                x.push(x[i] + steps[i]);
                y.push(y[i] + rises[i]);
            }
            let c = CharLine::new(x, y).unwrap();
            let (lo, hi) = (a.min(b), a.max(b));
            prop_assert!(c.evaluate(lo) <= c.evaluate(hi) + 1e-9);
        }
    }
}
