//! 2D cutting-plan surface for laser-cut parts.
//!
//! Parts are drawn with a turtle-style cursor (edges, corners, circles)
//! relative to a movable frame, and the finished plan is written out as SVG.

use std::io::Write;

use anyhow::{bail, Result};
use nalgebra::Point2;

use crate::edges::FingerJointEdge;
use crate::geometry::{BoundingBox, Frame};

pub mod axle;
pub mod edges;
pub mod gears;
pub mod geometry;

/// Drawing layer. Cut lines are black, annotations render blue and are
/// meant to be dropped before sending the plan to the cutter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Color {
    Cut,
    Annotations,
}

impl Color {
    fn stroke(self) -> &'static str {
        match self {
            Color::Cut => "#000000",
            Color::Annotations => "#0000ff",
        }
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Move(Point2<f64>),
    Line(Point2<f64>),
    Arc {
        end: Point2<f64>,
        center: Point2<f64>,
        radius: f64,
        start_angle: f64,
        /// Signed sweep in radians, positive counter-clockwise.
        sweep: f64,
    },
}

#[derive(Debug, Clone)]
struct Path {
    color: Color,
    segments: Vec<Segment>,
}

/// One step of a [`Surface::polyline`] call.
#[derive(Debug, Clone, Copy)]
pub enum Draw {
    Edge(f64),
    Turn(f64),
}

/// The drawing surface. Owns the cursor frame, the context stack and all
/// paths recorded so far.
pub struct Surface {
    thickness: f64,
    burn: f64,
    spacing: f64,
    frame: Frame,
    color: Color,
    stack: Vec<SavedContext>,
    paths: Vec<Path>,
    /// Current point plus the path it belongs to, if the pen is down.
    pen: Option<(usize, Point2<f64>)>,
}

#[derive(Debug, Clone, Copy)]
struct SavedContext {
    frame: Frame,
    color: Color,
    pen: Option<(usize, Point2<f64>)>,
}

impl Surface {
    pub fn new(thickness: f64, burn: f64, spacing: f64) -> Self {
        Surface {
            thickness,
            burn,
            spacing,
            frame: Frame::new(),
            color: Color::Cut,
            stack: Vec::new(),
            paths: Vec::new(),
            pen: None,
        }
    }

    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Current cursor position in sheet coordinates.
    pub fn position(&self) -> Point2<f64> {
        self.frame.origin
    }

    /// Number of separate cut loops recorded so far.
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn save_context(&mut self) {
        self.stack.push(SavedContext {
            frame: self.frame,
            color: self.color,
            pen: self.pen,
        });
    }

    /// Restore frame, color and current point. The pen comes back too, so a
    /// saved-context detour does not split a continuous outline.
    pub fn restore_context(&mut self) {
        if let Some(ctx) = self.stack.pop() {
            self.frame = ctx.frame;
            self.color = ctx.color;
            self.pen = ctx.pen;
        }
    }

    /// Translate the frame by (dx, dy) in frame coordinates, then turn it by
    /// `degrees`. Lifts the pen.
    pub fn move_to(&mut self, dx: f64, dy: f64, degrees: f64) {
        self.frame.shift(dx, dy, degrees);
        self.pen = None;
    }

    fn append(&mut self, seg: Segment, start: Point2<f64>) {
        let index = match self.pen {
            Some((i, p)) if (p - start).norm() < 1e-9 => i,
            _ => {
                self.paths.push(Path {
                    color: self.color,
                    segments: vec![Segment::Move(start)],
                });
                self.paths.len() - 1
            }
        };
        let end = match &seg {
            Segment::Move(p) | Segment::Line(p) => *p,
            Segment::Arc { end, .. } => *end,
        };
        if let Some(path) = self.paths.get_mut(index) {
            path.segments.push(seg);
        }
        self.pen = Some((index, end));
    }

    /// Cut a straight edge of `length` along the heading and advance.
    pub fn edge(&mut self, length: f64) {
        let start = self.frame.origin;
        self.frame.advance(length);
        let end = self.frame.origin;
        self.append(Segment::Line(end), start);
    }

    /// Turn in place by `degrees` (positive is left).
    pub fn corner(&mut self, degrees: f64) {
        self.corner_radius(degrees, 0.0);
    }

    /// Turn by `degrees` along an arc of `radius`. Outside corners grow by
    /// the burn correction, inside corners shrink.
    pub fn corner_radius(&mut self, degrees: f64, radius: f64) {
        if radius <= 0.0 {
            self.frame.turn(degrees);
            return;
        }
        let r = if degrees > 0.0 {
            radius + self.burn
        } else {
            (radius - self.burn).max(0.0)
        };
        let start = self.frame.origin;
        let side = if degrees > 0.0 { 1.0 } else { -1.0 };
        let center = start + self.frame.normal() * (r * side);
        let d = start - center;
        let start_angle = d.y.atan2(d.x);
        let sweep = degrees.to_radians();
        let end_angle = start_angle + sweep;
        let end = Point2::new(
            center.x + r * end_angle.cos(),
            center.y + r * end_angle.sin(),
        );
        self.append(
            Segment::Arc {
                end,
                center,
                radius: r,
                start_angle,
                sweep,
            },
            start,
        );
        self.frame.origin = end;
        self.frame.turn(degrees);
    }

    /// Run a sequence of edges and turns.
    pub fn polyline(&mut self, ops: &[Draw]) {
        for op in ops {
            match *op {
                Draw::Edge(l) => self.edge(l),
                Draw::Turn(d) => self.corner(d),
            }
        }
    }

    /// Cut a full circle around (cx, cy) in frame coordinates. The cursor
    /// does not move; hole radii grow by the burn correction.
    pub fn circle(&mut self, cx: f64, cy: f64, radius: f64) {
        let center = self.frame.to_world(Point2::new(cx, cy));
        let r = radius + self.burn;
        let pi = std::f64::consts::PI;
        let start = Point2::new(center.x + r, center.y);
        let mid = Point2::new(center.x - r, center.y);
        self.paths.push(Path {
            color: self.color,
            segments: vec![
                Segment::Move(start),
                Segment::Arc {
                    end: mid,
                    center,
                    radius: r,
                    start_angle: 0.0,
                    sweep: pi,
                },
                Segment::Arc {
                    end: start,
                    center,
                    radius: r,
                    start_angle: pi,
                    sweep: pi,
                },
            ],
        });
        self.pen = None;
    }

    /// Cut a closed polygon given in frame coordinates. The cursor does not
    /// move.
    pub fn polygon(&mut self, points: &[Point2<f64>]) {
        if points.len() < 2 {
            return;
        }
        let world: Vec<Point2<f64>> = points.iter().map(|p| self.frame.to_world(*p)).collect();
        let mut segments = Vec::with_capacity(world.len() + 1);
        segments.push(Segment::Move(world[0]));
        for p in &world[1..] {
            segments.push(Segment::Line(*p));
        }
        segments.push(Segment::Line(world[0]));
        self.paths.push(Path {
            color: self.color,
            segments,
        });
        self.pen = None;
    }

    /// Outline a rectangle with its lower-left corner at the frame origin.
    pub fn rectangle(&mut self, width: f64, height: f64) {
        self.polygon(&[
            Point2::new(0.0, 0.0),
            Point2::new(width, 0.0),
            Point2::new(width, height),
            Point2::new(0.0, height),
        ]);
    }

    /// Part placement protocol. `spec` is a whitespace-separated list of
    /// `right`, `left`, `up`, `down` and `only`. Call once with
    /// `before = true` ahead of drawing a part of the given size; if it
    /// returns true the part is skipped (`only`). Call again with
    /// `before = false` after drawing. `left` and `down` moves are applied
    /// before drawing, `right` and `up` after.
    pub fn place(&mut self, width: f64, height: f64, spec: &str, before: bool) -> Result<bool> {
        let terms: Vec<&str> = spec.split_whitespace().collect();
        let dont_draw = before && terms.iter().any(|t| *t == "only");
        let w = width + self.spacing;
        let h = height + self.spacing;
        if !before {
            self.restore_context();
        }
        for term in &terms {
            let (dx, dy, before_draw) = match *term {
                "up" => (0.0, h, false),
                "down" => (0.0, -h, true),
                "left" => (-w, 0.0, true),
                "right" => (w, 0.0, false),
                "only" => continue,
                other => bail!("unknown placement term {:?}", other),
            };
            if (before_draw && before) || (!before_draw && !before) || dont_draw {
                self.move_to(dx, dy, 0.0);
            }
        }
        if before {
            self.save_context();
        }
        Ok(dont_draw)
    }

    /// Write the whole plan as an SVG document, one `<path>` per cut loop.
    pub fn write_svg(&self, out: &mut dyn Write) -> Result<()> {
        let mut bbox = BoundingBox::empty();
        for path in &self.paths {
            for seg in &path.segments {
                match seg {
                    Segment::Move(p) | Segment::Line(p) => bbox.update(*p),
                    Segment::Arc {
                        center,
                        radius,
                        start_angle,
                        sweep,
                        ..
                    } => bbox.update_arc(*center, *radius, *start_angle, *sweep),
                }
            }
        }
        if bbox.is_empty() {
            bbox.update(Point2::origin());
        }
        let margin = self.spacing.max(1.0);
        let min_x = bbox.min.x - margin;
        let min_y = bbox.min.y - margin;
        let width = bbox.width() + 2.0 * margin;
        let height = bbox.height() + 2.0 * margin;

        writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.2}mm" height="{:.2}mm" viewBox="{:.3} {:.3} {:.3} {:.3}">"#,
            width, height, min_x, min_y, width, height
        )?;
        // Flip y so parts render the way they were drawn
        writeln!(
            out,
            r#"<g transform="matrix(1 0 0 -1 0 {:.3})">"#,
            2.0 * min_y + height
        )?;
        for path in &self.paths {
            let mut d = String::new();
            for seg in &path.segments {
                match seg {
                    Segment::Move(p) => {
                        d.push_str(&format!("M {:.3} {:.3} ", p.x, p.y));
                    }
                    Segment::Line(p) => {
                        d.push_str(&format!("L {:.3} {:.3} ", p.x, p.y));
                    }
                    Segment::Arc {
                        end,
                        radius,
                        sweep,
                        ..
                    } => {
                        let large = if sweep.abs() > std::f64::consts::PI {
                            1
                        } else {
                            0
                        };
                        let flag = if *sweep > 0.0 { 1 } else { 0 };
                        d.push_str(&format!(
                            "A {:.3} {:.3} 0 {} {} {:.3} {:.3} ",
                            radius, radius, large, flag, end.x, end.y
                        ));
                    }
                }
            }
            writeln!(
                out,
                r#"<path d="{}" fill="none" stroke="{}" stroke-width="0.1"/>"#,
                d.trim_end(),
                path.color.stroke()
            )?;
        }
        writeln!(out, "</g>")?;
        writeln!(out, "</svg>")?;
        Ok(())
    }
}

/// Draw a rectangular wall of `width` x `height` honoring the placement
/// protocol. `edge_spec` holds one character per side (bottom, right, top,
/// left): `e` plain, `f` fingers out, `F` notches in. The callback runs
/// before each side with the side index, frame at that side's start.
pub fn rectangular_wall<F>(
    surface: &mut Surface,
    width: f64,
    height: f64,
    edge_spec: &str,
    joint: &FingerJointEdge,
    mv: &str,
    mut callback: F,
) -> Result<()>
where
    F: FnMut(&mut Surface, usize) -> Result<()>,
{
    let chars: Vec<char> = edge_spec.chars().collect();
    if chars.len() != 4 {
        bail!("edge spec needs exactly four sides, got {:?}", edge_spec);
    }
    let t = surface.thickness();
    let margins: Vec<f64> = chars
        .iter()
        .map(|&c| if c == 'f' { joint.depth(t) } else { 0.0 })
        .collect();
    let total_w = width + margins[1] + margins[3];
    let total_h = height + margins[0] + margins[2];
    if surface.place(total_w, total_h, mv, true)? {
        return Ok(());
    }
    surface.move_to(margins[3], margins[0], 0.0);
    for (i, &c) in chars.iter().enumerate() {
        let len = if i % 2 == 0 { width } else { height };
        surface.save_context();
        callback(surface, i)?;
        surface.restore_context();
        match c {
            'e' => surface.edge(len),
            'f' => joint.draw(surface, len),
            'F' => joint.draw_counterpart(surface, len),
            other => bail!("unknown edge type {:?}", other),
        }
        surface.corner(90.0);
    }
    surface.place(total_w, total_h, mv, false)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edges::FingerJointSettings;

    #[test]
    fn test_edge_advances_cursor() {
        let mut s = Surface::new(3.0, 0.0, 2.0);
        s.edge(10.0);
        s.corner(90.0);
        s.edge(5.0);
        assert!((s.frame.origin.x - 10.0).abs() < 1e-9);
        assert!((s.frame.origin.y - 5.0).abs() < 1e-9);
        // One continuous cut
        assert_eq!(s.path_count(), 1);
    }

    #[test]
    fn test_move_to_lifts_pen() {
        let mut s = Surface::new(3.0, 0.0, 2.0);
        s.edge(10.0);
        s.move_to(5.0, 5.0, 0.0);
        s.edge(10.0);
        assert_eq!(s.path_count(), 2);
    }

    #[test]
    fn test_closed_square_is_one_path() {
        let mut s = Surface::new(3.0, 0.0, 2.0);
        for _ in 0..4 {
            s.edge(10.0);
            s.corner(90.0);
        }
        assert_eq!(s.path_count(), 1);
        assert!((s.frame.origin.x).abs() < 1e-9);
        assert!((s.frame.origin.y).abs() < 1e-9);
    }

    #[test]
    fn test_place_only_skips_drawing() {
        let mut s = Surface::new(3.0, 0.0, 2.0);
        assert!(s.place(10.0, 10.0, "right only", true).unwrap());
        // Skipped parts still advance the cursor
        assert!((s.frame.origin.x - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_place_down_moves_before_drawing() {
        let mut s = Surface::new(3.0, 0.0, 2.0);
        assert!(!s.place(10.0, 8.0, "down", true).unwrap());
        assert!((s.frame.origin.y + 10.0).abs() < 1e-9);
        s.edge(10.0);
        s.place(10.0, 8.0, "down", false).unwrap();
        // After-placement restores the pre-draw frame; "down" applied once
        assert!((s.frame.origin.y + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_place_rejects_unknown_term() {
        let mut s = Surface::new(3.0, 0.0, 2.0);
        assert!(s.place(10.0, 10.0, "sideways", true).is_err());
    }

    #[test]
    fn test_saved_context_restores_frame_and_color() {
        let mut s = Surface::new(3.0, 0.0, 2.0);
        s.save_context();
        s.move_to(7.0, 3.0, 45.0);
        s.set_color(Color::Annotations);
        s.restore_context();
        assert!((s.frame.origin.x).abs() < 1e-9);
        assert!((s.frame.origin.y).abs() < 1e-9);
        assert_eq!(s.color, Color::Cut);
    }

    #[test]
    fn test_burn_grows_holes() {
        let mut s = Surface::new(3.0, 0.2, 2.0);
        s.circle(0.0, 0.0, 5.0);
        let mut out = Vec::new();
        s.write_svg(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("A 5.200"));
    }

    #[test]
    fn test_svg_output_parses() {
        let mut s = Surface::new(3.0, 0.0, 2.0);
        s.rectangle(20.0, 10.0);
        s.set_color(Color::Annotations);
        s.circle(10.0, 5.0, 2.0);
        let mut out = Vec::new();
        s.write_svg(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let doc = roxmltree::Document::parse(&text).unwrap();
        let root = doc.root_element();
        assert_eq!(root.tag_name().name(), "svg");
        assert!(root.attribute("viewBox").is_some());
        let paths: Vec<_> = doc
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "path")
            .collect();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[1].attribute("stroke"), Some("#0000ff"));
    }

    #[test]
    fn test_rectangular_wall_draws_closed_outline() {
        let mut s = Surface::new(3.0, 0.0, 2.0);
        let joint = FingerJointEdge::new(FingerJointSettings::default());
        rectangular_wall(&mut s, 60.0, 40.0, "eeee", &joint, "right", |_, _| Ok(()))
            .unwrap();
        assert_eq!(s.path_count(), 1);
    }
}
