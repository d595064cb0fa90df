use glam::Vec2;

use crate::config::{GearParameters, NewtonConfig, ToothProfile};
use crate::error::{GearError, Result};
use crate::types::ProfilePoint;

/// Radial slopes below this stop the Newton iteration.
const MIN_SLOPE: f32 = 1e-6;

/// Evaluates the leading tooth flank and inverts it by radius.
///
/// The flank is parametrised by the roll angle `theta`, with `theta = 0`
/// at the pitch point `(0, rp)`. Both profiles share one form:
///
/// `p(theta, d) = evolute(theta) + (kappa(theta) + d) * u(theta)`
///
/// where `u = (cos(pa + theta), sin(pa + theta))` is the unit normal and
/// `kappa` the radius of curvature. For the exact involute the evolute is
/// the base circle; the arc approximation freezes both at their pitch-point
/// values, which turns the flank into a circle of radius `rp sin(pa)`.
/// The offset `d` moves the point along the normal, into the gap.
#[derive(Debug, Clone, Copy)]
pub struct InvoluteSolver {
    profile: ToothProfile,
    pressure_angle: f32,
    pitch_radius: f32,
    base_radius: f32,
    newton: NewtonConfig,
}

impl InvoluteSolver {
    pub fn new(params: &GearParameters) -> Self {
        Self {
            profile: params.profile,
            pressure_angle: params.pressure_angle,
            pitch_radius: params.pitch_radius(),
            base_radius: params.base_radius(),
            newton: params.newton,
        }
    }

    pub fn profile(&self) -> ToothProfile {
        self.profile
    }

    fn curvature(&self, theta: f32) -> f32 {
        let (sin_pa, cos_pa) = self.pressure_angle.sin_cos();
        match self.profile {
            ToothProfile::ExactInvolute => self.pitch_radius * (sin_pa + theta * cos_pa),
            ToothProfile::ArcApproximation => self.pitch_radius * sin_pa,
        }
    }

    fn evolute(&self, theta: f32) -> Vec2 {
        let phi = match self.profile {
            ToothProfile::ExactInvolute => self.pressure_angle + theta,
            ToothProfile::ArcApproximation => self.pressure_angle,
        };
        let (sin, cos) = phi.sin_cos();
        self.base_radius * Vec2::new(-sin, cos)
    }

    /// Unit normal of the flank, pointing out of the tooth.
    pub fn normal_at(&self, theta: f32) -> Vec2 {
        Vec2::from_angle(self.pressure_angle + theta)
    }

    pub fn point_at(&self, theta: f32, offset: f32) -> Vec2 {
        self.evolute(theta) + (self.curvature(theta) + offset) * self.normal_at(theta)
    }

    /// dp/dtheta. The evolute and curvature terms cancel for both profiles,
    /// leaving the rotated normal scaled by the offset radius of curvature.
    pub fn tangent_at(&self, theta: f32, offset: f32) -> Vec2 {
        (self.curvature(theta) + offset) * self.normal_at(theta).perp()
    }

    /// d|p|/dtheta.
    pub fn radial_slope(&self, theta: f32, offset: f32) -> f32 {
        let p = self.point_at(theta, offset);
        let length = p.length();
        if length == 0.0 {
            return 0.0;
        }
        p.dot(self.tangent_at(theta, offset)) / length
    }

    /// Direct inverse of `|p(theta, offset)| = radius`, on the branch that
    /// grows with theta. Radii below the reachable minimum clamp to it.
    pub fn closed_form_theta(&self, radius: f32, offset: f32) -> f32 {
        let rbc = self.base_radius;
        let (sin_pa, cos_pa) = self.pressure_angle.sin_cos();
        match self.profile {
            ToothProfile::ExactInvolute => {
                // The evolute is perpendicular to u, so |p|^2 = rbc^2 + (kappa + d)^2.
                let arm = (radius * radius - rbc * rbc).max(0.0).sqrt();
                ((arm - offset) / self.pitch_radius - sin_pa) / cos_pa
            }
            ToothProfile::ArcApproximation => {
                // |p|^2 = rbc^2 + R^2 + 2 rbc R sin(theta) with R the arc radius.
                let arc = self.curvature(0.0) + offset;
                let sin_theta =
                    (radius * radius - rbc * rbc - arc * arc) / (2.0 * rbc * arc);
                sin_theta.clamp(-1.0, 1.0).asin()
            }
        }
    }

    /// Largest radius the flank can reach. The involute is unbounded; the
    /// arc peaks where its normal lines up with the evolute centre.
    pub fn reach_radius(&self) -> Option<f32> {
        match self.profile {
            ToothProfile::ExactInvolute => None,
            ToothProfile::ArcApproximation => Some(self.base_radius + self.curvature(0.0)),
        }
    }

    /// Roll angle at which the flank meets the base circle.
    pub fn base_theta(&self) -> f32 {
        match self.profile {
            ToothProfile::ExactInvolute => -self.pressure_angle.tan(),
            ToothProfile::ArcApproximation => self.closed_form_theta(self.base_radius, 0.0),
        }
    }

    /// Fixed-iteration Newton-Raphson for `|p(theta, offset)| = radius`.
    ///
    /// There is no convergence test: `guess` has to be close. When a residual
    /// tolerance is configured, a larger residual after the last iteration is
    /// an error.
    pub fn solve_theta(&self, radius: f32, guess: f32, offset: f32) -> Result<f32> {
        let mut theta = guess;
        for _ in 0..self.newton.iterations {
            let slope = self.radial_slope(theta, offset);
            if slope.abs() < MIN_SLOPE || !slope.is_finite() {
                break;
            }
            theta += (radius - self.point_at(theta, offset).length()) / slope;
        }

        if let Some(tolerance) = self.newton.residual_tolerance {
            let residual = (self.point_at(theta, offset).length() - radius).abs();
            if !residual.is_finite() || residual > tolerance {
                return Err(GearError::NonConvergence { radius, residual });
            }
        }
        Ok(theta)
    }

    /// Flank point at `radius`, starting Newton from `guess`. Returns the
    /// point and its roll angle for use as the next guess.
    pub fn sample(&self, radius: f32, guess: f32) -> Result<(ProfilePoint, f32)> {
        let theta = self.solve_theta(radius, guess, 0.0)?;
        Ok((self.profile_point(theta), theta))
    }

    pub fn profile_point(&self, theta: f32) -> ProfilePoint {
        ProfilePoint::new(self.point_at(theta, 0.0), self.normal_at(theta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn solver(teeth: u32, degrees: f32, profile: ToothProfile) -> InvoluteSolver {
        let params = GearParameters {
            profile,
            ..GearParameters::new(teeth, degrees.to_radians(), 4.0)
        };
        InvoluteSolver::new(&params)
    }

    #[test]
    fn arc_reach_is_base_plus_arc_radius() {
        let pa = 20.0_f32.to_radians();
        let arc = solver(6, 20.0, ToothProfile::ArcApproximation);
        assert_abs_diff_eq!(arc.reach_radius().unwrap(), 3.0 * (pa.cos() + pa.sin()), epsilon = 1e-5);
        // The peak sits a quarter turn past the pitch point.
        let peak = arc.point_at(std::f32::consts::FRAC_PI_2, 0.0).length();
        assert_abs_diff_eq!(peak, arc.reach_radius().unwrap(), epsilon = 1e-4);

        assert!(solver(6, 20.0, ToothProfile::ExactInvolute).reach_radius().is_none());
    }

    #[test]
    fn pitch_point_on_y_axis() {
        for profile in [ToothProfile::ExactInvolute, ToothProfile::ArcApproximation] {
            let s = solver(16, 20.0, profile);
            let p = s.point_at(0.0, 0.0);
            assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-5);
            assert_abs_diff_eq!(p.y, 8.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn base_point_on_base_circle() {
        let exact = solver(16, 20.0, ToothProfile::ExactInvolute);
        let rbc = 8.0 * 20.0_f32.to_radians().cos();
        assert_abs_diff_eq!(exact.base_theta(), -20.0_f32.to_radians().tan());
        assert_abs_diff_eq!(exact.point_at(exact.base_theta(), 0.0).length(), rbc, epsilon = 1e-4);

        let arc = solver(16, 20.0, ToothProfile::ArcApproximation);
        let expected = -(20.0_f32.to_radians().tan() / 2.0).asin();
        assert_abs_diff_eq!(arc.base_theta(), expected, epsilon = 1e-5);
        assert_abs_diff_eq!(arc.point_at(arc.base_theta(), 0.0).length(), rbc, epsilon = 1e-4);
    }

    #[test]
    fn closed_form_inverts_radius() {
        for profile in [ToothProfile::ExactInvolute, ToothProfile::ArcApproximation] {
            let s = solver(24, 20.0, profile);
            for radius in [11.5, 12.0, 12.6, 13.0] {
                for offset in [0.0, 0.25] {
                    let theta = s.closed_form_theta(radius, offset);
                    let r = s.point_at(theta, offset).length();
                    assert_abs_diff_eq!(r, radius, epsilon = 1e-4);
                }
            }
        }
    }

    #[test]
    fn newton_converges_from_pitch_guess() {
        let s = solver(30, 20.0, ToothProfile::ExactInvolute);
        for radius in [14.5, 15.0, 15.5, 16.0] {
            let theta = s.solve_theta(radius, 0.0, 0.0).unwrap();
            assert_abs_diff_eq!(s.point_at(theta, 0.0).length(), radius, epsilon = 1e-4);
            assert_abs_diff_eq!(theta, s.closed_form_theta(radius, 0.0), epsilon = 1e-4);
        }
    }

    #[test]
    fn normal_is_unit_and_perpendicular_to_tangent() {
        for profile in [ToothProfile::ExactInvolute, ToothProfile::ArcApproximation] {
            let s = solver(20, 25.0, profile);
            for theta in [-0.2, 0.0, 0.3, 0.6] {
                let n = s.normal_at(theta);
                assert_abs_diff_eq!(n.length(), 1.0, epsilon = 1e-6);
                assert_abs_diff_eq!(n.dot(s.tangent_at(theta, 0.0)), 0.0, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn tangent_matches_finite_difference() {
        let s = solver(20, 20.0, ToothProfile::ExactInvolute);
        let h = 1e-2;
        let theta = 0.2;
        let fd = (s.point_at(theta + h, 0.0) - s.point_at(theta - h, 0.0)) / (2.0 * h);
        let t = s.tangent_at(theta, 0.0);
        assert_abs_diff_eq!(fd.x, t.x, epsilon = 1e-2);
        assert_abs_diff_eq!(fd.y, t.y, epsilon = 1e-2);
    }

    #[test]
    fn flank_leans_towards_tooth_above_pitch() {
        // Tooth material is counter-clockwise of the leading flank.
        let s = solver(16, 20.0, ToothProfile::ExactInvolute);
        let (tip, _) = s.sample(9.0, 0.0).unwrap();
        assert!(tip.position.x < 0.0);
        assert!(tip.normal.x > 0.0);
    }

    #[test]
    fn zero_slope_stops_iteration() {
        let s = solver(16, 20.0, ToothProfile::ExactInvolute);
        let offset = -s.curvature(0.0);
        let theta = s.solve_theta(9.0, 0.0, offset).unwrap();
        assert_eq!(theta, 0.0);
    }

    #[test]
    fn residual_check_reports_non_convergence() {
        let params = GearParameters {
            newton: NewtonConfig {
                iterations: 1,
                residual_tolerance: Some(1e-6),
            },
            ..GearParameters::new(16, 20.0_f32.to_radians(), 4.0)
        };
        let s = InvoluteSolver::new(&params);
        let err = s.solve_theta(8.5, 1.5, 0.0).unwrap_err();
        assert!(matches!(err, GearError::NonConvergence { .. }));
    }

    #[test]
    fn residual_check_passes_with_good_guess() {
        let params = GearParameters {
            newton: NewtonConfig {
                iterations: 6,
                residual_tolerance: Some(1e-3),
            },
            ..GearParameters::new(16, 20.0_f32.to_radians(), 4.0)
        };
        let s = InvoluteSolver::new(&params);
        let guess = s.closed_form_theta(8.7, 0.0);
        assert!(s.solve_theta(8.7, guess, 0.0).is_ok());
    }
}
