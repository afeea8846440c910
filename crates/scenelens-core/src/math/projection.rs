//! Camera-space to screen-space projection.

use serde::{Deserialize, Serialize};

use super::{Rotator, Vec3};

/// Camera state for one acquisition cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraPose {
    pub location: Vec3,
    /// Degrees.
    pub rotation: Rotator,
    /// Horizontal field of view, degrees.
    pub fov: f32,
}

impl CameraPose {
    pub fn new(location: Vec3, rotation: Rotator, fov: f32) -> Self {
        Self {
            location,
            rotation,
            fov,
        }
    }

    /// A pose read from garbage memory typically fails one of these.
    pub fn is_plausible(&self) -> bool {
        self.location.is_finite() && self.rotation.is_finite() && self.fov > 0.0 && self.fov < 180.0
    }
}

/// Orthonormal camera basis built from pitch/yaw/roll.
///
/// Rows are forward (X), right (Y) and up (Z).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationMatrix {
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl RotationMatrix {
    pub fn from_rotator(rotation: Rotator) -> Self {
        let (sp, cp) = rotation.pitch.to_radians().sin_cos();
        let (sy, cy) = rotation.yaw.to_radians().sin_cos();
        let (sr, cr) = rotation.roll.to_radians().sin_cos();

        Self {
            forward: Vec3::new(cp * cy, cp * sy, sp),
            right: Vec3::new(sr * sp * cy - cr * sy, sr * sp * sy + cr * cy, -sr * cp),
            up: Vec3::new(-(cr * sp * cy + sr * sy), cy * sr - cr * sp * sy, cr * cp),
        }
    }
}

/// Result of projecting a world point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Projection {
    pub x: f32,
    pub y: f32,
    /// Forward view-space distance. Non-positive means behind the camera.
    pub depth: f32,
}

impl Projection {
    /// Whether the point is in front of the camera at all.
    pub fn is_visible(&self) -> bool {
        self.depth > 0.0
    }

    /// In front of the camera and inside the screen rectangle grown by `margin`.
    pub fn on_screen(&self, width: f32, height: f32, margin: f32) -> bool {
        self.is_visible()
            && self.x >= -margin
            && self.x <= width + margin
            && self.y >= -margin
            && self.y <= height + margin
    }
}

/// Project `world` into screen coordinates for a `width` x `height` surface.
///
/// A point at zero forward distance maps to the screen centre.
pub fn project(world: Vec3, camera: &CameraPose, width: f32, height: f32) -> Projection {
    let basis = RotationMatrix::from_rotator(camera.rotation);
    let delta = world - camera.location;

    let view_x = delta.dot(basis.right);
    let view_y = delta.dot(basis.up);
    let depth = delta.dot(basis.forward);

    let center_x = width / 2.0;
    let center_y = height / 2.0;

    if depth.abs() < f32::EPSILON {
        return Projection {
            x: center_x,
            y: center_y,
            depth,
        };
    }

    let focal = center_x / (camera.fov.to_radians() / 2.0).tan();

    Projection {
        x: center_x + view_x * focal / depth,
        y: center_y - view_y * focal / depth,
        depth,
    }
}
