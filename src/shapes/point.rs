#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointF32 {
    pub x: f32,
    pub y: f32,
}

impl PointF32 {
    pub fn new(x: f32, y: f32) -> PointF32 {
        PointF32 { x, y }
    }

    /// Rotates clockwise (in image space, y down) about `origin` by `theta` radians.
    pub fn rotate(&mut self, origin: PointF32, theta: f32) -> PointF32 {
        let x = self.x - origin.x;
        let y = self.y - origin.y;

        let rot_x = x * theta.cos() - y * theta.sin();
        let rot_y = x * theta.sin() + y * theta.cos();

        self.x = rot_x + origin.x;
        self.y = rot_y + origin.y;

        *self
    }

    pub fn translate(&mut self, dx: f32, dy: f32) -> PointF32 {
        self.x += dx;
        self.y += dy;

        *self
    }
}
