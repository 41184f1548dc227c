//! Stepped axle: cross-section spec parsing and the cut outlines for the
//! removable two-piece axle.
//!
//! The axle is built from two flat sides standing in a cross. The slotted
//! side has a half-length slot cut into its tip, the keyed side carries a
//! matching tab plus a separate locking strip, and two end discs with
//! plus-shaped crossholes retain the assembly.

use anyhow::{anyhow, bail, Context, Result};

use crate::edges::FingerJointEdge;
use crate::Surface;

/// One section of the stepped axle profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxleSegment {
    pub radius: f64,
    pub length: f64,
}

/// A parsed axle cross-section spec: comma-separated `radius:length`
/// segments, ordered from the frame end towards the tip, with an
/// `N*radius:length` repeat shorthand. Example: `10:4,2*8:3,5:26`.
#[derive(Debug, Clone)]
pub struct AxleSpec {
    segments: Vec<AxleSegment>,
}

impl AxleSpec {
    pub fn parse(spec: &str) -> Result<AxleSpec> {
        let mut segments = Vec::new();
        for raw in spec.split(',') {
            let part = raw.trim();
            if part.is_empty() {
                bail!("empty segment in axle spec {:?}", spec);
            }
            let (repeat, seg) = match part.split_once('*') {
                Some((n, rest)) => {
                    let n: usize = n
                        .trim()
                        .parse()
                        .with_context(|| format!("bad repeat count in {:?}", part))?;
                    (n, rest.trim())
                }
                None => (1, part),
            };
            if repeat == 0 {
                bail!("repeat count must be at least 1 in {:?}", part);
            }
            let (radius, length) = seg
                .split_once(':')
                .ok_or_else(|| anyhow!("segment {:?} is not radius:length", part))?;
            let radius: f64 = radius
                .trim()
                .parse()
                .with_context(|| format!("bad radius in {:?}", part))?;
            let length: f64 = length
                .trim()
                .parse()
                .with_context(|| format!("bad length in {:?}", part))?;
            if radius <= 0.0 || length <= 0.0 {
                bail!("radius and length must be positive in {:?}", part);
            }
            for _ in 0..repeat {
                segments.push(AxleSegment { radius, length });
            }
        }
        if segments.is_empty() {
            bail!("axle spec {:?} has no segments", spec);
        }
        Ok(AxleSpec { segments })
    }

    pub fn segments(&self) -> &[AxleSegment] {
        &self.segments
    }

    /// Sum of all expanded segment lengths.
    pub fn total_length(&self) -> f64 {
        self.segments.iter().map(|s| s.length).sum()
    }

    /// Twice the largest radius: the stock height the axle sides need.
    pub fn height(&self) -> f64 {
        2.0 * self
            .segments
            .iter()
            .map(|s| s.radius)
            .fold(0.0, f64::max)
    }

    /// Radius of the segment the gear wheel seats on (the second section,
    /// falling back to the first for single-step axles).
    pub fn gear_seat_radius(&self) -> f64 {
        let steps = merge_steps(&self.segments);
        steps.get(1).unwrap_or(&steps[0]).radius
    }
}

impl std::str::FromStr for AxleSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        AxleSpec::parse(s)
    }
}

// Adjacent segments of equal radius read as one section of the silhouette.
fn merge_steps(segments: &[AxleSegment]) -> Vec<AxleSegment> {
    let mut merged: Vec<AxleSegment> = Vec::new();
    for seg in segments {
        if let Some(last) = merged.last_mut() {
            if (last.radius - seg.radius).abs() < 1e-9 {
                last.length += seg.length;
                continue;
            }
        }
        merged.push(*seg);
    }
    merged
}

struct AxleProfile {
    steps: Vec<AxleSegment>,
    total: f64,
    incut: f64,
    r_back: f64,
    r_tip: f64,
}

// Corner radius at the tip, in mm.
const TIP_CORNER: f64 = 1.0;

fn profile(spec: &AxleSpec, t: f64) -> Result<AxleProfile> {
    let steps = merge_steps(spec.segments());
    for pair in steps.windows(2) {
        if pair[1].radius >= pair[0].radius {
            bail!(
                "axle radii must step down towards the tip ({} then {})",
                pair[0].radius,
                pair[1].radius
            );
        }
    }
    let total = spec.total_length();
    let incut = (total - 3.0 * t) * 0.5;
    if incut <= 0.0 {
        bail!(
            "axle of length {} is too short to slot with {} mm stock",
            total,
            t
        );
    }
    let r_back = steps[0].radius;
    let r_tip = steps[steps.len() - 1].radius;
    if r_tip - t / 2.0 - TIP_CORNER <= 0.0 {
        bail!("tip radius {} is too small for {} mm stock", r_tip, t);
    }
    Ok(AxleProfile {
        steps,
        total,
        incut,
        r_back,
        r_tip,
    })
}

// Top silhouette from the back end to the tip: along each section, then
// down the radius step. The last section stops short of the tip detail.
fn silhouette_to_tip(surface: &mut Surface, p: &AxleProfile, t: f64) {
    for (i, step) in p.steps.iter().enumerate() {
        if i + 1 < p.steps.len() {
            surface.edge(step.length);
            surface.corner(90.0);
            surface.edge(step.radius - p.steps[i + 1].radius);
            surface.corner(-90.0);
        } else {
            surface.edge(step.length - t - TIP_CORNER);
        }
    }
}

// Mirror image of `silhouette_to_tip`, walking back towards the back end.
fn silhouette_from_tip(surface: &mut Surface, p: &AxleProfile, t: f64) {
    for (i, step) in p.steps.iter().enumerate().rev() {
        if i + 1 < p.steps.len() {
            surface.corner(-90.0);
            surface.edge(step.radius - p.steps[i + 1].radius);
            surface.corner(90.0);
            surface.edge(step.length);
        } else {
            surface.edge(step.length - t - TIP_CORNER);
        }
    }
}

/// The axle side with the slot: the other side and the locking strip slide
/// through it. The back edge carries the strut joint so the side locks
/// into the frame panels.
pub fn slotted_side(
    surface: &mut Surface,
    spec: &AxleSpec,
    joint: &FingerJointEdge,
    mv: &str,
) -> Result<()> {
    let t = surface.thickness();
    let p = profile(spec, t)?;
    let cr = TIP_CORNER;
    if surface.place(p.total, 2.0 * p.r_back, mv, true)? {
        return Ok(());
    }
    surface.save_context();
    surface.move_to(p.total, 0.0, 90.0);
    joint.draw(surface, 2.0 * p.r_back);
    surface.corner(90.0);
    silhouette_to_tip(surface, &p, t);
    // Tip with the slot for the keyed side
    surface.corner_radius(90.0, cr);
    surface.edge(p.r_tip - t / 2.0 - cr);
    surface.corner(90.0);
    surface.edge(p.incut);
    surface.corner(-90.0);
    surface.edge(t);
    surface.corner(-90.0);
    surface.edge(p.incut);
    surface.corner(90.0);
    surface.edge(p.r_tip - t / 2.0 - cr);
    surface.corner_radius(90.0, cr);
    silhouette_from_tip(surface, &p, t);
    surface.corner(-90.0);
    surface.restore_context();
    surface.place(p.total, 2.0 * p.r_back, mv, false)?;
    Ok(())
}

/// The axle side with the cross tab at the tip, drawn together with the
/// separate locking strip that pins the two sides through the end discs.
pub fn keyed_side(surface: &mut Surface, spec: &AxleSpec, mv: &str) -> Result<()> {
    let t = surface.thickness();
    let p = profile(spec, t)?;
    let cr = TIP_CORNER;
    let r_second = p.steps.get(1).map(|s| s.radius).unwrap_or(p.r_back);
    let height = 2.0 * p.r_back + t + surface.spacing();
    if surface.place(p.total, height, mv, true)? {
        return Ok(());
    }
    surface.save_context();
    // Locking strip above the main silhouette
    surface.move_to(0.0, r_second + p.r_tip + surface.spacing(), -90.0);
    surface.edge(p.r_tip - t / 2.0 - cr);
    surface.corner(90.0);
    surface.edge(p.total - p.incut);
    surface.corner(-90.0);
    surface.edge(t);
    surface.corner(-90.0);
    surface.edge(p.total - p.incut);
    surface.corner(90.0);
    surface.edge(p.r_tip - t / 2.0 - cr);
    surface.corner_radius(90.0, cr);
    surface.edge(t - cr);
    // Main silhouette
    surface.corner(-90.0);
    surface.edge(p.r_back - p.r_tip);
    surface.corner(90.0);
    silhouette_to_tip(surface, &p, t);
    surface.corner_radius(90.0, cr);
    // Cross tab at the tip
    surface.edge(p.r_tip - t / 2.0 - cr);
    surface.corner(90.0);
    surface.edge(t);
    surface.corner(180.0);
    surface.edge(t);
    surface.corner(90.0);
    surface.edge(t);
    surface.corner(90.0);
    surface.edge(t);
    surface.corner(180.0);
    surface.edge(t);
    surface.corner(90.0);
    surface.edge(p.r_tip - t / 2.0 - cr);
    surface.corner_radius(90.0, cr);
    silhouette_from_tip(surface, &p, t);
    surface.corner(90.0);
    surface.edge(p.r_back - p.r_tip);
    surface.corner(-90.0);
    surface.edge(t - cr);
    surface.corner_radius(90.0, cr);
    surface.restore_context();
    surface.place(p.total, height, mv, false)?;
    Ok(())
}

/// Plus-shaped hole taking the crossed axle tip, drawn around the frame
/// origin.
pub fn crosshole(surface: &mut Surface, radius: f64) {
    let t = surface.thickness();
    surface.save_context();
    surface.move_to(radius, 0.5 * t, 180.0);
    for _ in 0..4 {
        surface.edge(radius - 0.5 * t);
        surface.corner(-90.0);
        surface.edge(radius - 0.5 * t);
        surface.corner(90.0);
        surface.edge(t);
        surface.corner(90.0);
    }
    surface.restore_context();
}

/// Retaining disc slid over the axle tip: a circle of `retain_radius` with
/// a crosshole sized for the tip segment.
pub fn end_disc(
    surface: &mut Surface,
    retain_radius: f64,
    tip_radius: f64,
    mv: &str,
) -> Result<()> {
    let size = 2.0 * retain_radius;
    if surface.place(size, size, mv, true)? {
        return Ok(());
    }
    surface.move_to(retain_radius, retain_radius, 0.0);
    surface.circle(0.0, 0.0, retain_radius);
    crosshole(surface, tip_radius);
    surface.place(size, size, mv, false)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edges::{FingerJointEdge, FingerJointSettings, FingerStyle};

    const DEFAULT_SPEC: &str = "10:4,2*8:3,5:26";

    #[test]
    fn test_parse_expands_repeats() {
        let spec = AxleSpec::parse(DEFAULT_SPEC).unwrap();
        assert_eq!(spec.segments().len(), 4);
        assert_eq!(
            spec.segments()[1],
            AxleSegment {
                radius: 8.0,
                length: 3.0
            }
        );
        assert_eq!(spec.segments()[1], spec.segments()[2]);
    }

    #[test]
    fn test_lengths_sum_to_total() {
        let spec = AxleSpec::parse(DEFAULT_SPEC).unwrap();
        let sum: f64 = spec.segments().iter().map(|s| s.length).sum();
        assert!((sum - spec.total_length()).abs() < 1e-9);
        assert!((spec.total_length() - 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_height_is_twice_max_radius() {
        let spec = AxleSpec::parse("5:10, 9:2, 7:4").unwrap();
        let max_r = spec
            .segments()
            .iter()
            .map(|s| s.radius)
            .fold(0.0, f64::max);
        assert!((spec.height() - 2.0 * max_r).abs() < 1e-9);
        assert!((spec.height() - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(AxleSpec::parse("").is_err());
        assert!(AxleSpec::parse("10").is_err());
        assert!(AxleSpec::parse("10:").is_err());
        assert!(AxleSpec::parse(":4").is_err());
        assert!(AxleSpec::parse("10:4,,5:2").is_err());
        assert!(AxleSpec::parse("0*10:4").is_err());
        assert!(AxleSpec::parse("-1:4").is_err());
        assert!(AxleSpec::parse("10:-4").is_err());
        assert!(AxleSpec::parse("x*10:4").is_err());
    }

    #[test]
    fn test_merge_steps_joins_repeats() {
        let spec = AxleSpec::parse(DEFAULT_SPEC).unwrap();
        let steps = merge_steps(spec.segments());
        assert_eq!(steps.len(), 3);
        assert!((steps[1].length - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_gear_seat_radius() {
        let spec = AxleSpec::parse(DEFAULT_SPEC).unwrap();
        assert!((spec.gear_seat_radius() - 8.0).abs() < 1e-9);
        let single = AxleSpec::parse("6:40").unwrap();
        assert!((single.gear_seat_radius() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_profile_rejects_rising_radii() {
        let spec = AxleSpec::parse("5:10,8:10").unwrap();
        assert!(profile(&spec, 3.0).is_err());
    }

    #[test]
    fn test_profile_rejects_short_axle() {
        let spec = AxleSpec::parse("10:3,8:3,5:3").unwrap();
        assert!(profile(&spec, 3.0).is_err());
    }

    fn strut_joint() -> FingerJointEdge {
        FingerJointEdge::new(FingerJointSettings {
            finger: 10.0,
            space: 10.0,
            width: 3.0,
            relative: false,
            style: FingerStyle::Springs,
            ..FingerJointSettings::default()
        })
    }

    #[test]
    fn test_axle_sides_draw() {
        let spec = AxleSpec::parse(DEFAULT_SPEC).unwrap();
        let mut s = Surface::new(3.0, 0.0, 2.0);
        slotted_side(&mut s, &spec, &strut_joint(), "right").unwrap();
        assert!(s.path_count() >= 1);
        let before = s.path_count();
        keyed_side(&mut s, &spec, "right").unwrap();
        assert!(s.path_count() > before);
    }

    #[test]
    fn test_end_disc_is_circle_and_crosshole() {
        let spec = AxleSpec::parse(DEFAULT_SPEC).unwrap();
        let mut s = Surface::new(3.0, 0.0, 2.0);
        let tip = spec.segments().last().unwrap().radius;
        end_disc(&mut s, 8.0, tip, "right").unwrap();
        assert_eq!(s.path_count(), 2);
    }
}
