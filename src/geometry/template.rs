use std::f32::consts::{PI, TAU};
use std::fmt;

use glam::Vec2;
use tracing::debug;

use crate::config::GearParameters;
use crate::error::{GearError, Result};
use crate::types::{ProfilePoint, SectorTemplate};

use super::involute::InvoluteSolver;

/// How the root fillet joins the flank on gears whose root circle lies
/// inside the base circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilletBlend {
    /// Tangent to the straight radial run below the base circle.
    Radial,
    /// Tangent to the involute itself, above the base circle.
    Involute,
}

impl fmt::Display for FilletBlend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilletBlend::Radial => write!(f, "radial"),
            FilletBlend::Involute => write!(f, "involute"),
        }
    }
}

/// Builds the profile of one tooth: both flanks, root to tip.
pub struct ToothTemplateBuilder<'a> {
    params: &'a GearParameters,
    solver: InvoluteSolver,
}

impl<'a> ToothTemplateBuilder<'a> {
    pub fn new(params: &'a GearParameters) -> Self {
        Self {
            params,
            solver: InvoluteSolver::new(params),
        }
    }

    pub fn build(&self) -> Result<SectorTemplate> {
        let p = self.params;
        debug!(
            teeth = p.teeth,
            pitch_radius = p.pitch_radius(),
            base_radius = p.base_radius(),
            major_radius = p.major_radius(),
            minor_radius = p.minor_radius(),
            critical_teeth = p.critical_tooth_count(),
            pure_involute = p.uses_pure_involute(),
            profile = %self.solver.profile(),
            "Building tooth template"
        );

        let leading = self.leading_flank()?;
        let trailing = mirror_flank(&leading, p.gap_angle());
        check_clearance(&leading, &trailing, p.teeth)?;

        Ok(SectorTemplate {
            leading,
            trailing,
            half_thickness: p.half_thickness,
        })
    }

    /// The flank with the tooth on its counter-clockwise side.
    pub fn leading_flank(&self) -> Result<Vec<ProfilePoint>> {
        let tip_radius = self.params.major_radius();
        if let Some(reach) = self.solver.reach_radius() {
            if reach < tip_radius {
                return Err(GearError::Geometry(format!(
                    "{} flank reaches radius {reach:.3}, short of the tip radius {tip_radius:.3} \
                     for {} teeth",
                    self.solver.profile(),
                    self.params.teeth
                )));
            }
        }

        if self.params.uses_pure_involute() {
            self.pure_flank()
        } else {
            self.filleted_flank()
        }
    }

    /// Which fillet construction a non-pure gear uses. The radial blend
    /// touches the run at `sqrt((rmin + rho)^2 - rho^2)`; above the base
    /// corner that point does not exist on the run.
    pub fn fillet_blend(&self) -> FilletBlend {
        let p = self.params;
        let rho = p.fillet_radius;
        let outer = p.minor_radius() + rho;
        let tangent_radius = (outer * outer - rho * rho).sqrt();
        let corner_radius = self
            .solver
            .point_at(self.solver.base_theta(), 0.0)
            .length();

        if tangent_radius <= corner_radius {
            FilletBlend::Radial
        } else {
            FilletBlend::Involute
        }
    }

    fn pure_flank(&self) -> Result<Vec<ProfilePoint>> {
        let p = self.params;
        let samples = p.curve_samples;
        let (rmin, rmaj) = (p.minor_radius(), p.major_radius());
        let step = (rmaj - rmin) / (samples - 1) as f32;

        let mut flank = Vec::with_capacity(samples);
        self.sample_run((0..samples).map(|i| rmin + i as f32 * step), &mut flank)?;
        Ok(flank)
    }

    fn filleted_flank(&self) -> Result<Vec<ProfilePoint>> {
        let p = self.params;
        let samples = p.curve_samples;
        let pitch = p.pitch_sample();
        let fillet = p.fillet_samples;
        let rho = p.fillet_radius;
        let rmin = p.minor_radius();
        let rp = p.pitch_radius();

        let mut flank = Vec::with_capacity(samples);
        let blend = self.fillet_blend();

        // Below the pitch circle: fillet arc, then uniform radii up to rp.
        let (start_radius, first_uniform) = match blend {
            FilletBlend::Radial => {
                let corner = self.solver.point_at(self.solver.base_theta(), 0.0);
                let corner_radius = corner.length();
                let run = corner / corner_radius;
                let gap_side = Vec2::new(run.y, -run.x);
                let outer = rmin + rho;
                let tangent_radius = (outer * outer - rho * rho).sqrt();
                let center = tangent_radius * run + rho * gap_side;

                push_fillet_arc(&mut flank, center, rho, -gap_side, fillet);
                flank.push(ProfilePoint::new(corner, gap_side));
                debug!(%blend, tangent_radius, corner_radius, "Root fillet");
                (corner_radius, fillet + 1)
            }
            FilletBlend::Involute => {
                let seed = self.solver.closed_form_theta(rmin + rho, rho);
                let theta = self.solver.solve_theta(rmin + rho, seed, rho)?;
                let touch = self.solver.profile_point(theta);
                let touch_radius = touch.radius();
                if !touch_radius.is_finite() || touch_radius >= rp {
                    return Err(GearError::Geometry(format!(
                        "root fillet of radius {rho} does not meet the flank below the pitch circle"
                    )));
                }
                let center = touch.position + rho * touch.normal;

                push_fillet_arc(&mut flank, center, rho, -touch.normal, fillet);
                debug!(%blend, tangent_radius = touch_radius, "Root fillet");
                (touch_radius, fillet)
            }
        };

        let spans = (pitch - (first_uniform - 1)) as f32;
        let step = (rp - start_radius) / spans;
        self.sample_run(
            (first_uniform..pitch).map(|j| start_radius + (j + 1 - first_uniform) as f32 * step),
            &mut flank,
        )?;

        // Exactly at the pitch point.
        flank.push(self.solver.profile_point(0.0));

        // Above the pitch circle: uniform radii from rp to the tip.
        let tip_spans = (samples - 1 - pitch) as f32;
        let rmaj = p.major_radius();
        self.sample_run(
            (pitch + 1..samples).map(|i| rp + (i - pitch) as f32 / tip_spans * (rmaj - rp)),
            &mut flank,
        )?;

        Ok(flank)
    }

    /// Solve a run of increasing radii. The first radius is seeded by the
    /// closed form, the rest by the previous solution.
    fn sample_run(
        &self,
        radii: impl Iterator<Item = f32>,
        flank: &mut Vec<ProfilePoint>,
    ) -> Result<()> {
        let mut guess: Option<f32> = None;
        for radius in radii {
            let seed = guess.unwrap_or_else(|| self.solver.closed_form_theta(radius, 0.0));
            let (point, theta) = self.solver.sample(radius, seed)?;
            flank.push(point);
            guess = Some(theta);
        }
        Ok(())
    }
}

/// Arc samples from the root circle to the tangent point in direction
/// `end` from the centre, both ends included.
fn push_fillet_arc(
    flank: &mut Vec<ProfilePoint>,
    center: Vec2,
    radius: f32,
    end: Vec2,
    samples: usize,
) {
    let start_angle = (-center).to_angle();
    let sweep = (end.to_angle() - start_angle + PI).rem_euclid(TAU) - PI;
    let spans = (samples - 1) as f32;

    for k in 0..samples {
        let dir = Vec2::from_angle(start_angle + sweep * k as f32 / spans);
        flank.push(ProfilePoint::new(center + radius * dir, -dir));
    }
}

/// Reflect the leading flank in the y axis and turn it by `gap_angle`.
pub fn mirror_flank(leading: &[ProfilePoint], gap_angle: f32) -> Vec<ProfilePoint> {
    let rotation = Vec2::from_angle(gap_angle);
    leading
        .iter()
        .map(|p| p.mirrored_x().rotated(rotation))
        .collect()
}

/// Neighbouring root fillets must leave a floor between them and the two
/// flanks of a tooth must not cross below the tip.
fn check_clearance(leading: &[ProfilePoint], trailing: &[ProfilePoint], teeth: u32) -> Result<()> {
    let angle = |p: &ProfilePoint| p.position.to_angle();
    let (Some(lead_root), Some(trail_root), Some(lead_tip), Some(trail_tip)) = (
        leading.first(),
        trailing.first(),
        leading.last(),
        trailing.last(),
    ) else {
        return Err(GearError::Geometry("empty tooth profile".into()));
    };

    let floor = angle(lead_root) + TAU / teeth as f32 - angle(trail_root);
    if floor <= 0.0 {
        return Err(GearError::Geometry(format!(
            "root fillets of neighbouring teeth overlap by {:.4} rad",
            -floor
        )));
    }

    let land = angle(trail_tip) - angle(lead_tip);
    if land <= 0.0 {
        return Err(GearError::Geometry(format!(
            "tooth flanks cross below the tip circle by {:.4} rad",
            -land
        )));
    }
    Ok(())
}
