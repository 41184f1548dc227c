//! Involute spur-gear profiles for laser cutting.
//!
//! Tooth depth constants follow the Machinery's Handbook module system:
//! addendum one module, dedendum 1.25 modules, both offset by the profile
//! shift.

use std::f64::consts::{PI, TAU};

use anyhow::Result;
use nalgebra::Point2;

use crate::Surface;

/// Points sampled along each involute flank.
const FLANK_SAMPLES: usize = 8;

/// Outline points generated per tooth (root, flank, tip, flank, root).
pub const POINTS_PER_TOOTH: usize = 2 * FLANK_SAMPLES + 3;

#[derive(Debug, Clone)]
pub struct GearParams {
    pub teeth: u32,
    /// Module in mm (pitch diameter / tooth count).
    pub module: f64,
    /// Pressure angle in degrees.
    pub pressure_angle: f64,
    /// Profile shift as a fraction of the module.
    pub profile_shift: f64,
}

impl GearParams {
    pub fn pitch_radius(&self) -> f64 {
        self.module * self.teeth as f64 / 2.0
    }

    pub fn base_radius(&self) -> f64 {
        self.pitch_radius() * self.pressure_angle.to_radians().cos()
    }

    pub fn outside_radius(&self) -> f64 {
        self.pitch_radius() + self.module * (1.0 + self.profile_shift)
    }

    pub fn root_radius(&self) -> f64 {
        self.pitch_radius() - self.module * (1.25 - self.profile_shift)
    }
}

fn involute(a: f64) -> f64 {
    a.tan() - a
}

/// Closed outline of the gear, centered on the origin,
/// `POINTS_PER_TOOTH * teeth` points.
pub fn outline(params: &GearParams) -> Vec<Point2<f64>> {
    let z = params.teeth as f64;
    let pa = params.pressure_angle.to_radians();
    let rp = params.pitch_radius();
    let rb = params.base_radius();
    let ro = params.outside_radius();
    let rr = params.root_radius();
    // The involute only exists outside the base circle
    let r_start = rb.max(rr);

    // Half tooth thickness, as an angle at the pitch circle
    let beta = (PI / 2.0 + 2.0 * params.profile_shift * pa.tan()) / z;
    // Half tooth angle at radius r, measured from the tooth center line
    let delta = |r: f64| {
        let a = (rb / r).min(1.0).acos();
        beta + involute(pa) - involute(a)
    };
    let delta_start = delta(r_start);
    let delta_tip = delta(ro);

    let polar = |r: f64, angle: f64| Point2::new(r * angle.cos(), r * angle.sin());

    let mut points = Vec::with_capacity(POINTS_PER_TOOTH * params.teeth as usize);
    for i in 0..params.teeth {
        let center = i as f64 * TAU / z;
        // Root landing ahead of the rising flank
        points.push(polar(rr, center - delta_start));
        // Rising flank
        for k in 0..FLANK_SAMPLES {
            let r = r_start + (ro - r_start) * k as f64 / (FLANK_SAMPLES - 1) as f64;
            points.push(polar(r, center - delta(r)));
        }
        // Tip land
        points.push(polar(ro, center));
        // Falling flank
        for k in 0..FLANK_SAMPLES {
            let r = ro - (ro - r_start) * k as f64 / (FLANK_SAMPLES - 1) as f64;
            points.push(polar(r, center + delta(r)));
        }
        // Root landing after the falling flank; the polygon edge to the
        // next tooth's landing forms the root gap
        points.push(polar(rr, center + delta_start));
    }
    points
}

/// Cut a shaft hole at the frame origin: a circle of `diameter`, flattened
/// on one side so the remaining width is `d_percentage` percent of the
/// diameter (100 keeps it round).
pub fn shaft_hole(surface: &mut Surface, diameter: f64, d_percentage: f64) {
    let r = diameter / 2.0;
    if r <= 0.0 {
        return;
    }
    let p = (d_percentage / 100.0).max(0.0).min(1.0);
    if p >= 1.0 {
        surface.circle(0.0, 0.0, r);
        return;
    }
    let flat_x = r * (2.0 * p - 1.0);
    let a0 = (flat_x / r).acos();
    let n = 48;
    let mut points = Vec::with_capacity(n + 1);
    for i in 0..=n {
        let a = a0 + (TAU - 2.0 * a0) * i as f64 / n as f64;
        points.push(Point2::new(r * a.cos(), r * a.sin()));
    }
    // polygon() closes the flat side with the chord
    surface.polygon(&points);
}

/// Place a gear wheel honoring the placement protocol. `mount` is drawn
/// with the frame at the wheel center and cuts the mounting feature
/// (shaft hole, crosshole, ...).
pub fn gear_wheel<F>(surface: &mut Surface, params: &GearParams, mv: &str, mount: F) -> Result<()>
where
    F: FnOnce(&mut Surface),
{
    let ro = params.outside_radius();
    let size = 2.0 * ro;
    if surface.place(size, size, mv, true)? {
        return Ok(());
    }
    surface.move_to(ro, ro, 0.0);
    surface.polygon(&outline(params));
    surface.save_context();
    mount(surface);
    surface.restore_context();
    surface.place(size, size, mv, false)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> GearParams {
        GearParams {
            teeth: 32,
            module: 2.0,
            pressure_angle: 20.0,
            profile_shift: 0.2,
        }
    }

    #[test]
    fn test_radii() {
        let p = params();
        assert!((p.pitch_radius() - 32.0).abs() < 1e-9);
        assert!(p.base_radius() < p.pitch_radius());
        assert!((p.outside_radius() - (32.0 + 2.0 * 1.2)).abs() < 1e-9);
        assert!(p.root_radius() < p.base_radius());
    }

    #[test]
    fn test_outline_point_count() {
        let p = params();
        let pts = outline(&p);
        assert_eq!(pts.len(), POINTS_PER_TOOTH * 32);
    }

    #[test]
    fn test_outline_stays_between_root_and_tip() {
        let p = params();
        let ro = p.outside_radius();
        let rr = p.root_radius();
        let mut max_r: f64 = 0.0;
        for pt in outline(&p) {
            let r = (pt.x * pt.x + pt.y * pt.y).sqrt();
            assert!(r >= rr - 1e-6);
            assert!(r <= ro + 1e-6);
            max_r = max_r.max(r);
        }
        // The tip land reaches the addendum circle
        assert!((max_r - ro).abs() < 1e-6);
    }

    #[test]
    fn test_round_shaft_hole_is_circle() {
        let mut s = Surface::new(3.0, 0.0, 2.0);
        shaft_hole(&mut s, 6.0, 100.0);
        assert_eq!(s.path_count(), 1);
    }

    #[test]
    fn test_gear_wheel_places_outline_and_mount() {
        let mut s = Surface::new(3.0, 0.0, 2.0);
        let p = params();
        gear_wheel(&mut s, &p, "down", |s| shaft_hole(s, 6.0, 75.0)).unwrap();
        // Outline plus the D-section hole
        assert_eq!(s.path_count(), 2);
    }

    #[test]
    fn test_gear_wheel_only_skips() {
        let mut s = Surface::new(3.0, 0.0, 2.0);
        let p = params();
        gear_wheel(&mut s, &p, "right only", |_| unreachable!()).unwrap();
        assert_eq!(s.path_count(), 0);
    }
}
