//! Finger-joint edge profiles and matching hole rows.
//!
//! Layout follows the classic tabbed-box rule: fingers and spaces are
//! multiples of the material thickness (or absolute millimetres when
//! `relative` is off), with surrounding space split evenly at both ends.

use nalgebra::Point2;

use crate::{Draw, Surface};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FingerStyle {
    Rectangular,
    /// Rectangular fingers with a centered relief slit so the joint flexes.
    Springs,
}

#[derive(Debug, Clone)]
pub struct FingerJointSettings {
    /// Finger width, in multiples of thickness (or mm when not relative).
    pub finger: f64,
    /// Space between fingers.
    pub space: f64,
    /// Space at both ends, in multiples of normal spaces.
    pub surrounding_spaces: f64,
    /// Extra room for the counterpart notches.
    pub play: f64,
    /// Extra finger length, for flush sanding after assembly.
    pub extra_length: f64,
    pub style: FingerStyle,
    /// Depth of the joint, normally the mating part's thickness.
    pub width: f64,
    /// Interpret the dimensions as multiples of thickness.
    pub relative: bool,
}

impl Default for FingerJointSettings {
    fn default() -> Self {
        FingerJointSettings {
            finger: 2.0,
            space: 2.0,
            surrounding_spaces: 2.0,
            play: 0.0,
            extra_length: 0.0,
            style: FingerStyle::Rectangular,
            width: 1.0,
            relative: true,
        }
    }
}

impl FingerJointSettings {
    fn scale(&self, v: f64, t: f64) -> f64 {
        if self.relative {
            v * t
        } else {
            v
        }
    }

    pub fn finger_mm(&self, t: f64) -> f64 {
        self.scale(self.finger, t)
    }

    pub fn space_mm(&self, t: f64) -> f64 {
        self.scale(self.space, t)
    }

    pub fn width_mm(&self, t: f64) -> f64 {
        self.scale(self.width, t)
    }

    pub fn play_mm(&self, t: f64) -> f64 {
        self.scale(self.play, t)
    }

    pub fn extra_mm(&self, t: f64) -> f64 {
        self.scale(self.extra_length, t)
    }
}

/// A finger-joint edge profile bound to one settings set.
pub struct FingerJointEdge {
    pub settings: FingerJointSettings,
}

impl FingerJointEdge {
    pub fn new(settings: FingerJointSettings) -> Self {
        FingerJointEdge { settings }
    }

    /// How far the positive profile reaches past the base line.
    pub fn depth(&self, t: f64) -> f64 {
        self.settings.width_mm(t) + self.settings.extra_mm(t)
    }

    /// Number of fingers that fit in `length`, and the leftover space that
    /// is split between the two ends.
    pub fn calc_fingers(&self, length: f64, t: f64) -> (usize, f64) {
        let s = &self.settings;
        let space = s.space_mm(t);
        let finger = s.finger_mm(t);
        let mut fingers = if space + finger > 0.0 {
            ((length - (s.surrounding_spaces - 1.0) * space) / (space + finger))
                .floor()
                .max(0.0) as usize
        } else {
            0
        };
        if fingers == 0 && length > finger + t {
            fingers = 1;
        }
        if finger <= 0.0 {
            fingers = 0;
        }
        let leftover = if fingers > 0 {
            length - fingers as f64 * (space + finger) + space
        } else {
            length
        };
        (fingers, leftover)
    }

    /// Draw the positive profile (fingers out) along the heading, advancing
    /// the frame by exactly `length`.
    pub fn draw(&self, surface: &mut Surface, length: f64) {
        let t = surface.thickness();
        let s = &self.settings;
        let finger = s.finger_mm(t);
        let space = s.space_mm(t);
        let depth = self.depth(t);
        let (count, leftover) = self.calc_fingers(length, t);
        if count == 0 {
            surface.edge(length);
            return;
        }
        surface.edge(leftover / 2.0);
        for i in 0..count {
            if s.style == FingerStyle::Springs {
                self.spring_slit(surface, finger, depth);
            }
            surface.polyline(&[
                Draw::Turn(-90.0),
                Draw::Edge(depth),
                Draw::Turn(90.0),
                Draw::Edge(finger),
                Draw::Turn(90.0),
                Draw::Edge(depth),
                Draw::Turn(-90.0),
            ]);
            if i + 1 < count {
                surface.edge(space);
            }
        }
        surface.edge(leftover / 2.0);
    }

    /// Draw the negative profile (notches in) along the heading. Notches
    /// widen by the configured play.
    pub fn draw_counterpart(&self, surface: &mut Surface, length: f64) {
        let t = surface.thickness();
        let s = &self.settings;
        let play = s.play_mm(t);
        let finger = s.finger_mm(t) + play;
        let space = s.space_mm(t) - play;
        let depth = s.width_mm(t);
        let (count, leftover) = self.calc_fingers(length, t);
        if count == 0 {
            surface.edge(length);
            return;
        }
        let leftover = leftover - play;
        surface.edge(leftover / 2.0);
        for i in 0..count {
            surface.polyline(&[
                Draw::Turn(90.0),
                Draw::Edge(depth),
                Draw::Turn(-90.0),
                Draw::Edge(finger),
                Draw::Turn(-90.0),
                Draw::Edge(depth),
                Draw::Turn(90.0),
            ]);
            if i + 1 < count {
                surface.edge(space);
            }
        }
        surface.edge(leftover / 2.0);
    }

    /// Cut a row of slot holes matching the positive profile, along a line
    /// starting at (x, y) in frame coordinates, rotated by `angle` degrees.
    pub fn finger_holes_at(
        &self,
        surface: &mut Surface,
        x: f64,
        y: f64,
        angle: f64,
        length: f64,
    ) {
        let t = surface.thickness();
        let s = &self.settings;
        let finger = s.finger_mm(t);
        let space = s.space_mm(t);
        let w = s.width_mm(t);
        let (count, leftover) = self.calc_fingers(length, t);
        surface.save_context();
        surface.move_to(x, y, angle);
        let mut pos = leftover / 2.0;
        for _ in 0..count {
            surface.polygon(&[
                Point2::new(pos, -w / 2.0),
                Point2::new(pos + finger, -w / 2.0),
                Point2::new(pos + finger, w / 2.0),
                Point2::new(pos, w / 2.0),
            ]);
            pos += finger + space;
        }
        surface.restore_context();
    }

    // Relief cut inside the upcoming finger; its own path, pen untouched.
    fn spring_slit(&self, surface: &mut Surface, finger: f64, depth: f64) {
        surface.save_context();
        surface.move_to(finger / 2.0, -depth * 0.25, -90.0);
        surface.edge(depth * 0.5);
        surface.restore_context();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn test_calc_fingers_counts() {
        let joint = strut_joint();
        let (n, leftover) = joint.calc_fingers(40.0, 3.0);
        // 40mm with absolute 10/10 layout: one finger, the rest is leftover
        assert_eq!(n, 1);
        assert!((leftover - 30.0).abs() < 1e-9);

        let (n, leftover) = joint.calc_fingers(100.0, 3.0);
        assert_eq!(n, 4);
        assert!((leftover - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_calc_fingers_degenerate() {
        let joint = FingerJointEdge::new(FingerJointSettings {
            finger: 0.0,
            ..FingerJointSettings::default()
        });
        let (n, leftover) = joint.calc_fingers(50.0, 3.0);
        assert_eq!(n, 0);
        assert!((leftover - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_draw_advances_exact_length() {
        let joint = FingerJointEdge::new(FingerJointSettings::default());
        let mut s = Surface::new(3.0, 0.0, 2.0);
        joint.draw(&mut s, 100.0);
        assert!((s.position().x - 100.0).abs() < 1e-9);
        assert!(s.position().y.abs() < 1e-9);
    }

    #[test]
    fn test_counterpart_advances_exact_length() {
        let joint = FingerJointEdge::new(FingerJointSettings {
            play: 0.05,
            ..FingerJointSettings::default()
        });
        let mut s = Surface::new(3.0, 0.0, 2.0);
        joint.draw_counterpart(&mut s, 100.0);
        assert!((s.position().x - 100.0).abs() < 1e-9);
        assert!(s.position().y.abs() < 1e-9);
    }

    #[test]
    fn test_springs_style_adds_slits() {
        let joint = strut_joint();
        let mut s = Surface::new(3.0, 0.0, 2.0);
        joint.draw(&mut s, 100.0);
        let (n, _) = joint.calc_fingers(100.0, 3.0);
        // One slit per finger plus the continuous outline
        assert_eq!(s.path_count(), n + 1);
    }

    #[test]
    fn test_finger_holes_match_layout() {
        let joint = strut_joint();
        let mut s = Surface::new(3.0, 0.0, 2.0);
        joint.finger_holes_at(&mut s, 0.0, 0.0, -45.0, 100.0);
        let (n, _) = joint.calc_fingers(100.0, 3.0);
        assert_eq!(s.path_count(), n);
    }
}
