//! Axis-aligned boxes and view-frustum tests for candidate culling.

use glam::{Mat4, Vec3};

/// Axis-aligned bounding box in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Box grown by `margin` on every side.
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }
}

/// Plane in `normal · p + d = 0` form with a unit normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    /// Signed distance from the plane; positive is inside.
    pub fn distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

/// Six-plane view frustum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    planes: [Plane; 6],
}

impl Frustum {
    /// Extract planes from a view-projection matrix with 0..1 clip depth.
    pub fn from_view_projection(view_proj: Mat4) -> Self {
        let m = view_proj.transpose();
        let (r0, r1, r2, r3) = (m.x_axis, m.y_axis, m.z_axis, m.w_axis);

        let raw = [
            r3 + r0, // left
            r3 - r0, // right
            r3 + r1, // bottom
            r3 - r1, // top
            r2,      // near
            r3 - r2, // far
        ];

        let planes = raw.map(|p| {
            let n = Vec3::new(p.x, p.y, p.z);
            let len = n.length();
            let inv_len = if len > 0.0 { 1.0 / len } else { 0.0 };
            Plane {
                normal: n * inv_len,
                d: p.w * inv_len,
            }
        });

        Self { planes }
    }

    /// Frustum that contains everything; used before a camera exists.
    pub fn unbounded() -> Self {
        let plane = Plane { normal: Vec3::ZERO, d: 1.0 };
        Self { planes: [plane; 6] }
    }

    pub fn planes(&self) -> &[Plane; 6] {
        &self.planes
    }

    /// Conservative box test: false only when the box is fully outside a plane.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let center = aabb.center();
        let extents = aabb.extents();

        self.planes.iter().all(|p| {
            let r = extents.dot(p.normal.abs());
            p.distance(center) + r >= 0.0
        })
    }
}
