use nalgebra::{Point2, Vector2};

/// A local drawing frame: an origin and a heading in the sheet plane.
/// All turtle primitives are expressed relative to the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub origin: Point2<f64>,
    /// Heading in radians, counter-clockwise from +x.
    pub heading: f64,
}

impl Frame {
    pub fn new() -> Self {
        Frame {
            origin: Point2::origin(),
            heading: 0.0,
        }
    }

    /// Map a point given in frame coordinates to sheet coordinates.
    pub fn to_world(&self, local: Point2<f64>) -> Point2<f64> {
        let (s, c) = self.heading.sin_cos();
        Point2::new(
            self.origin.x + local.x * c - local.y * s,
            self.origin.y + local.x * s + local.y * c,
        )
    }

    /// Unit vector along the current heading.
    pub fn direction(&self) -> Vector2<f64> {
        Vector2::new(self.heading.cos(), self.heading.sin())
    }

    /// Unit vector 90 degrees to the left of the heading.
    pub fn normal(&self) -> Vector2<f64> {
        Vector2::new(-self.heading.sin(), self.heading.cos())
    }

    /// Translate by (dx, dy) in frame coordinates, then turn by `degrees`.
    pub fn shift(&mut self, dx: f64, dy: f64, degrees: f64) {
        self.origin = self.to_world(Point2::new(dx, dy));
        self.heading += degrees.to_radians();
    }

    pub fn advance(&mut self, dist: f64) {
        self.shift(dist, 0.0, 0.0);
    }

    pub fn turn(&mut self, degrees: f64) {
        self.heading += degrees.to_radians();
    }
}

impl Default for Frame {
    fn default() -> Self {
        Frame::new()
    }
}

/// Axis-aligned bounding box accumulated over everything drawn so far.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl BoundingBox {
    pub fn empty() -> Self {
        BoundingBox {
            min: Point2::new(f64::INFINITY, f64::INFINITY),
            max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    pub fn update(&mut self, p: Point2<f64>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    /// Grow by the extrema of an arc around `center`, from `start_angle`
    /// sweeping `sweep` radians (signed).
    pub fn update_arc(&mut self, center: Point2<f64>, radius: f64, start_angle: f64, sweep: f64) {
        // Sampling every ~11 degrees is plenty for layout purposes
        let steps = ((sweep.abs() / 0.2).ceil() as usize).max(1);
        for i in 0..=steps {
            let a = start_angle + sweep * (i as f64) / (steps as f64);
            self.update(Point2::new(
                center.x + radius * a.cos(),
                center.y + radius * a.sin(),
            ));
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}
