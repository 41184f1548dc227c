//! Cutting-plan generator for a gear-driven frame braced by triangulated
//! struts, with a removable stepped axle.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use structopt::StructOpt;

use cutplan::axle::{self, AxleSpec};
use cutplan::edges::{FingerJointEdge, FingerJointSettings, FingerStyle};
use cutplan::gears::{gear_wheel, shaft_hole, GearParams};
use cutplan::{rectangular_wall, Color, Draw, Surface};

#[derive(Debug, StructOpt)]
#[structopt(name = "struts_gen", about = "A strut-braced gear frame generator")]
struct Opt {
    /// Width of the frame panels, in mm
    #[structopt(long, default_value = "400")]
    x: f64,

    /// Height of the frame panels, in mm
    #[structopt(long, default_value = "100")]
    y: f64,

    /// Width of the strut walls
    #[structopt(long, default_value = "40")]
    strutx: f64,

    /// Height of the strut walls
    #[structopt(long, default_value = "40")]
    struty: f64,

    /// Strength of the struts (rib width, in mm)
    #[structopt(long, default_value = "3")]
    strength: f64,

    /// Factor for diagonal struts
    #[structopt(long, default_value = "1.4")]
    factor: f64,

    /// Number of triangle pairs in x direction
    #[structopt(long, default_value = "2")]
    nx: u32,

    /// Number of triangle pairs in y direction
    #[structopt(long, default_value = "2")]
    ny: u32,

    /// Direction of spacers (diag, rect)
    #[structopt(long, default_value = "diag")]
    spacerdir: String,

    /// Radius of the disc holding the axle, in mm
    #[structopt(long, default_value = "8.0")]
    axleradius: f64,

    /// Axle cross section: radius:length segments from frame to tip,
    /// N* repeats a segment
    #[structopt(long, default_value = "10:4,2*8:3,5:26")]
    axle: String,

    /// Number of teeth on the pinion
    #[structopt(long, default_value = "12")]
    teeth1: u32,

    /// Diameter of shaft 1, in mm
    #[structopt(long, default_value = "6.0")]
    shaft1: f64,

    /// Percent of the D section of shaft 1 (100 for a round shaft)
    #[structopt(long, default_value = "75")]
    dpercentage1: f64,

    /// Number of teeth on the gear wheel
    #[structopt(long, default_value = "32")]
    teeth2: u32,

    /// Diameter of shaft 2 (zero rides on the axle crosshole)
    #[structopt(long, default_value = "0.0")]
    shaft2: f64,

    /// Percent of the D section of shaft 2 (zero for same as shaft 1)
    #[structopt(long, default_value = "0")]
    dpercentage2: f64,

    /// Size of teeth (diameter / teeth) in mm
    #[structopt(long, default_value = "2")]
    modulus: f64,

    /// Angle of the teeth touching, in degrees
    #[structopt(long, default_value = "20")]
    pressure_angle: f64,

    /// Profile shift, in percent of the modulus
    #[structopt(long, default_value = "20")]
    profile_shift: f64,

    /// Material thickness, in mm
    #[structopt(long, default_value = "3.0")]
    thickness: f64,

    /// Kerf compensation, in mm
    #[structopt(long, default_value = "0.1")]
    burn: f64,

    /// Space between parts on the sheet, in mm
    #[structopt(long, default_value = "2.0")]
    spacing: f64,

    /// Finger width of the panel joints, in multiples of thickness
    #[structopt(long, default_value = "1.0")]
    finger: f64,

    /// Space between panel-joint fingers, in multiples of thickness
    #[structopt(long, default_value = "1.0")]
    space: f64,

    /// Output file for the resulting SVG
    #[structopt(short, long, parse(from_os_str))]
    output: PathBuf,
}

/// Leg lengths of one lattice triangle, derived from the strut wall size.
#[derive(Debug, Clone, Copy)]
struct Triangle {
    x: f64,
    y: f64,
    h: f64,
    /// Angle opposite the x leg, in degrees.
    alpha: f64,
}

fn triangle_dimensions(opt: &Opt) -> Result<Triangle> {
    let s = opt.strength;
    let x = (opt.strutx - s) / opt.nx as f64 - s - opt.factor * s;
    let y = (opt.struty - s) / opt.ny as f64 - s;
    if x <= 0.0 || y <= 0.0 {
        bail!(
            "strength {} leaves no room for triangles in a {} x {} strut",
            s,
            opt.strutx,
            opt.struty
        );
    }
    let h = x.hypot(y);
    let alpha = x.atan2(y).to_degrees();
    Ok(Triangle { x, y, h, alpha })
}

fn draw_tri_even(sf: &mut Surface, tri: &Triangle, s: f64, f: f64) {
    sf.polyline(&[
        Draw::Edge(tri.y),
        Draw::Turn(-90.0),
        Draw::Edge(tri.x),
        Draw::Turn(-90.0 - tri.alpha),
        Draw::Edge(tri.h),
        Draw::Turn(180.0 + tri.alpha),
    ]);
    sf.move_to(tri.y, -(tri.x + s * f), 180.0);
    sf.polyline(&[
        Draw::Edge(tri.y),
        Draw::Turn(-90.0),
        Draw::Edge(tri.x),
        Draw::Turn(-90.0 - tri.alpha),
        Draw::Edge(tri.h),
        Draw::Turn(180.0 + tri.alpha),
    ]);
    sf.move_to(tri.y, s, 180.0);
}

fn draw_tri_odd(sf: &mut Surface, tri: &Triangle, s: f64, f: f64) {
    sf.polyline(&[
        Draw::Edge(tri.y),
        Draw::Turn(-180.0 + tri.alpha),
        Draw::Edge(tri.h),
        Draw::Turn(-90.0 - tri.alpha),
        Draw::Edge(tri.x),
        Draw::Turn(-90.0),
    ]);
    sf.move_to(tri.y, -f * s, -90.0);
    sf.polyline(&[
        Draw::Edge(tri.x),
        Draw::Turn(-90.0),
        Draw::Edge(tri.y),
        Draw::Turn(180.0 + tri.alpha),
        Draw::Edge(tri.h),
        Draw::Turn(-tri.alpha),
    ]);
    sf.move_to(-tri.y, -tri.x - s, 0.0);
}

/// Triangle cutouts of a strut wall: alternating pairs, `nx` per row over
/// `ny` rows.
fn triangle_lattice(sf: &mut Surface, tri: &Triangle, nx: u32, ny: u32, s: f64, f: f64) {
    sf.move_to(s, s, 90.0);
    for j in 0..ny {
        for i in 0..nx {
            if (i + j) % 2 == 0 {
                draw_tri_even(sf, tri, s, f);
            } else {
                draw_tri_odd(sf, tri, s, f);
            }
        }
        let n = nx as f64;
        sf.move_to(tri.y + s, n * tri.x + n * f * s + n * s, 0.0);
    }
}

// Axle hole plus an annotation rectangle marking the strut footprint.
fn frame_features(sf: &mut Surface, opt: &Opt, inset_x: f64, inset_y: f64) {
    sf.circle(opt.x / 3.0, opt.y / 2.0, opt.axleradius);
    sf.save_context();
    sf.set_color(Color::Annotations);
    sf.move_to(inset_x, inset_y, 0.0);
    sf.rectangle(opt.x - 2.0 * inset_x, opt.y - 2.0 * inset_y);
    sf.restore_context();
}

fn frame_holes_diag(
    sf: &mut Surface,
    edge_num: usize,
    opt: &Opt,
    joint: &FingerJointEdge,
) -> Result<()> {
    if edge_num == 0 {
        let sx = opt.strutx / 2f64.sqrt();
        let sy = opt.struty / 2f64.sqrt();
        frame_features(sf, opt, sx, sy);
    }
    // Strut rows run diagonally inward from each corner
    sf.move_to(0.0, 0.0, -45.0);
    joint.finger_holes_at(sf, 0.0, 0.0, 90.0, opt.strutx);
    Ok(())
}

fn frame_holes_rect(
    sf: &mut Surface,
    edge_num: usize,
    opt: &Opt,
    joint: &FingerJointEdge,
) -> Result<()> {
    let t = opt.thickness;
    if edge_num == 0 {
        frame_features(sf, opt, 3.0 * t, 3.0 * t);
    }
    sf.save_context();
    sf.move_to(2.0 * t, 3.0 * t, 0.0);
    joint.finger_holes_at(sf, 0.0, 0.0, 90.0, opt.strutx);
    sf.restore_context();
    sf.save_context();
    sf.move_to(3.0 * t, 2.0 * t, -90.0);
    joint.finger_holes_at(sf, 0.0, 0.0, 90.0, opt.strutx);
    sf.restore_context();
    Ok(())
}

fn render(opt: &Opt, spec: &AxleSpec, surface: &mut Surface) -> Result<()> {
    let tri = triangle_dimensions(opt)?;
    let s = opt.strength;
    let f = opt.factor;

    let panel_joint = FingerJointEdge::new(FingerJointSettings {
        finger: opt.finger,
        space: opt.space,
        ..FingerJointSettings::default()
    });
    // Flexing joint holding the axle in the frame: absolute 10 mm fingers
    // with relief slits
    let axle_joint = FingerJointEdge::new(FingerJointSettings {
        finger: 10.0,
        space: 10.0,
        width: opt.thickness,
        relative: false,
        style: FingerStyle::Springs,
        ..FingerJointSettings::default()
    });

    let strut_cb = |sf: &mut Surface, edge_num: usize| -> Result<()> {
        if edge_num == 0 {
            triangle_lattice(sf, &tri, opt.nx, opt.ny, s, f);
        }
        Ok(())
    };

    if opt.spacerdir == "rect" {
        for _ in 0..8 {
            rectangular_wall(
                surface,
                opt.strutx,
                opt.struty,
                "fefe",
                &panel_joint,
                "left",
                strut_cb,
            )?;
        }
        for _ in 0..2 {
            rectangular_wall(surface, opt.x, opt.y, "eeee", &panel_joint, "down", |sf, e| {
                frame_holes_rect(sf, e, opt, &panel_joint)
            })?;
        }
    } else {
        for _ in 0..4 {
            rectangular_wall(
                surface,
                opt.strutx,
                opt.struty,
                "fefe",
                &panel_joint,
                "left",
                strut_cb,
            )?;
        }
        rectangular_wall(surface, opt.x, opt.y, "eeee", &panel_joint, "down", |sf, e| {
            frame_holes_diag(sf, e, opt, &panel_joint)
        })?;
        rectangular_wall(surface, opt.x, opt.y, "eeee", &panel_joint, "left", |sf, e| {
            frame_holes_diag(sf, e, opt, &panel_joint)
        })?;
    }

    axle::slotted_side(surface, spec, &axle_joint, "right down")?;
    axle::keyed_side(surface, spec, "right")?;
    let tip_radius = spec.segments()[spec.segments().len() - 1].radius;
    axle::end_disc(surface, opt.axleradius, tip_radius, "right")?;
    axle::end_disc(surface, opt.axleradius, tip_radius, "right")?;

    let shift = opt.profile_shift / 100.0;
    let wheel = GearParams {
        teeth: opt.teeth2,
        module: opt.modulus,
        pressure_angle: opt.pressure_angle,
        profile_shift: shift,
    };
    if opt.shaft2 > 0.0 {
        let dp2 = if opt.dpercentage2 > 0.0 {
            opt.dpercentage2
        } else {
            opt.dpercentage1
        };
        gear_wheel(surface, &wheel, "down", |sf| {
            shaft_hole(sf, opt.shaft2, dp2)
        })?;
    } else {
        let seat = spec.gear_seat_radius();
        gear_wheel(surface, &wheel, "down", |sf| axle::crosshole(sf, seat))?;
    }
    let pinion = GearParams {
        teeth: opt.teeth1,
        module: opt.modulus,
        pressure_angle: opt.pressure_angle,
        profile_shift: shift,
    };
    gear_wheel(surface, &pinion, "down", |sf| {
        shaft_hole(sf, opt.shaft1, opt.dpercentage1)
    })?;

    Ok(())
}

fn help_text(opt: &Opt, spec: &AxleSpec) {
    let wheel_pitch = opt.modulus * opt.teeth2 as f64;
    let pinion_pitch = opt.modulus * opt.teeth1 as f64;
    println!(
        "Assembly notes:
        - frame panels {} x {} mm, axle hole at ({:.1}, {:.1})
        - axle {:.1} mm long, {:.1} mm wide at the tip
        - gear pair {}/{} teeth, pitch diameters {:.1}/{:.1} mm",
        opt.x,
        opt.y,
        opt.x / 3.0,
        opt.y / 2.0,
        spec.total_length(),
        spec.height(),
        opt.teeth1,
        opt.teeth2,
        pinion_pitch,
        wheel_pitch
    )
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    let spec: AxleSpec = opt.axle.parse().context("invalid --axle spec")?;
    let mut surface = Surface::new(opt.thickness, opt.burn, opt.spacing);
    render(&opt, &spec, &mut surface)?;
    help_text(&opt, &spec);
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&opt.output)?;
    surface.write_svg(&mut file)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use structopt::StructOpt;

    fn opt_with(args: &[&str]) -> Opt {
        let mut argv = vec!["struts_gen", "--output", "plan.svg"];
        argv.extend_from_slice(args);
        Opt::from_iter(argv)
    }

    #[test]
    fn test_triangle_dimensions_match_closed_form() {
        let opt = opt_with(&[]);
        let tri = triangle_dimensions(&opt).unwrap();
        // (40 - 3)/2 - 3 - 1.4*3 and (40 - 3)/2 - 3 with the defaults
        assert!((tri.x - 11.3).abs() < 1e-9);
        assert!((tri.y - 15.5).abs() < 1e-9);
        assert!((tri.h - (tri.x * tri.x + tri.y * tri.y).sqrt()).abs() < 1e-9);
        assert!(tri.alpha > 0.0 && tri.alpha < 90.0);
    }

    #[test]
    fn test_oversized_strength_is_rejected() {
        let opt = opt_with(&["--strength", "12"]);
        assert!(triangle_dimensions(&opt).is_err());
    }

    #[test]
    fn test_render_default_plan() {
        let opt = opt_with(&[]);
        let spec: AxleSpec = opt.axle.parse().unwrap();
        let mut surface = Surface::new(opt.thickness, opt.burn, opt.spacing);
        render(&opt, &spec, &mut surface).unwrap();
        let mut out = Vec::new();
        surface.write_svg(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let doc = roxmltree::Document::parse(&text).unwrap();
        assert_eq!(doc.root_element().tag_name().name(), "svg");
        let paths = doc
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "path")
            .count();
        // 4 strut walls with lattices, 2 frame panels, axle parts, discs,
        // two gears and their mounts add up to a lot of separate cuts
        assert!(paths > 20);
        assert!(text.contains("#0000ff"));
    }

    #[test]
    fn test_render_rect_spacers() {
        let opt = opt_with(&["--spacerdir", "rect"]);
        let spec: AxleSpec = opt.axle.parse().unwrap();
        let mut surface = Surface::new(opt.thickness, opt.burn, opt.spacing);
        render(&opt, &spec, &mut surface).unwrap();
        assert!(surface.path_count() > 20);
    }
}
