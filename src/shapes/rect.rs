#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RectF32 {
    // centerpoint
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl RectF32 {
    pub fn from_center(xc: f32, yc: f32, w: f32, h: f32) -> RectF32 {
        RectF32 { x: xc, y: yc, w, h }
    }

    pub fn left(&self) -> f32 {
        self.x - self.w / 2.
    }
    pub fn right(&self) -> f32 {
        self.x + self.w / 2.
    }
    pub fn top(&self) -> f32 {
        self.y - self.h / 2.
    }
    pub fn bottom(&self) -> f32 {
        self.y + self.h / 2.
    }
    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    /// Shifts the center by (dx, dy) and replaces the size with (w, h).
    pub fn adjust(&mut self, dx: f32, dy: f32, w: f32, h: f32) -> RectF32 {
        self.x += dx;
        self.y += dy;
        self.w = w;
        self.h = h;

        *self
    }

    pub fn scale(&mut self, scale_x: f32, scale_y: f32) -> RectF32 {
        self.x *= scale_x;
        self.y *= scale_y;
        self.w *= scale_x;
        self.h *= scale_y;

        *self
    }

    /// Intersection over union, as a percentage.
    pub fn overlap_pct(&self, other: &RectF32) -> f32 {
        let x_min = self.left().max(other.left());
        let x_max = self.right().min(other.right());
        let y_min = self.top().max(other.top());
        let y_max = self.bottom().min(other.bottom());

        let overlap_area = if x_min < x_max && y_min < y_max {
            (x_max - x_min) * (y_max - y_min)
        } else {
            0.
        };

        let area_delta = self.area() + other.area() - overlap_area;

        if area_delta > 0. {
            overlap_area / area_delta * 100.
        } else {
            0.
        }
    }
}
