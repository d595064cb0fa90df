use glam::{Vec2, Vec3};

/// A sample on a tooth flank in the gear plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfilePoint {
    pub position: Vec2,
    /// Unit normal pointing away from the tooth material.
    pub normal: Vec2,
}

impl ProfilePoint {
    pub fn new(position: Vec2, normal: Vec2) -> Self {
        Self { position, normal }
    }

    pub fn radius(&self) -> f32 {
        self.position.length()
    }

    /// Reflect in the y axis.
    pub fn mirrored_x(&self) -> Self {
        Self {
            position: Vec2::new(-self.position.x, self.position.y),
            normal: Vec2::new(-self.normal.x, self.normal.y),
        }
    }

    /// Rotate counter-clockwise about the gear axis by `rotation`
    /// (a unit complex number, see [`Vec2::from_angle`]).
    pub fn rotated(&self, rotation: Vec2) -> Self {
        Self {
            position: rotation.rotate(self.position),
            normal: rotation.rotate(self.normal),
        }
    }

    /// Position lifted to the plane z.
    pub fn at_z(&self, z: f32) -> Vec3 {
        self.position.extend(z)
    }
}

/// The two flanks bounding one tooth, root to tip, and the hub centres.
///
/// The leading flank has the tooth material on its counter-clockwise side;
/// the trailing flank is its mirror image turned by the gap angle.
#[derive(Debug, Clone)]
pub struct SectorTemplate {
    pub leading: Vec<ProfilePoint>,
    pub trailing: Vec<ProfilePoint>,
    pub half_thickness: f32,
}

impl SectorTemplate {
    pub fn front_center(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.half_thickness)
    }

    pub fn back_center(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, -self.half_thickness)
    }

    pub fn samples(&self) -> usize {
        self.leading.len()
    }
}
