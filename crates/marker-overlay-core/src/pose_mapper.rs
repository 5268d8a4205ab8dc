//! Marker pose to renderer world transform.
//!
//! Vision camera space has +Y down and +Z forward; the renderer's camera has
//! +Y up and looks down -Z with the model sitting in front of it. Flipping X
//! and Y (a 180 degree turn about Z) reconciles the two. A further rotation
//! about the marker's local X axis stands the model up on the printed plane.

use nalgebra::{Matrix3, Matrix4, Rotation3, Vector3};

use crate::pose::{MarkerPose, TransformComponents, WorldTransform};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Default orientation correction about local X, in degrees.
pub const DEFAULT_ORIENTATION_CORRECTION_DEG: f32 = 90.0;

/// A marker pose in renderer space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MappedPose {
    pub world: WorldTransform,
    /// `world` split into node components.
    pub components: TransformComponents,
}

/// Maps marker poses into the renderer's coordinate convention.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseMapper {
    correction: Matrix4<f32>,
}

impl Default for PoseMapper {
    fn default() -> Self {
        Self::with_correction_deg(DEFAULT_ORIENTATION_CORRECTION_DEG)
    }
}

impl PoseMapper {
    /// Mapper applying `angle_deg` about the local X axis after the axis flip.
    pub fn with_correction_deg(angle_deg: f32) -> Self {
        let r = Rotation3::from_axis_angle(&Vector3::x_axis(), angle_deg.to_radians());
        Self {
            correction: r.to_homogeneous(),
        }
    }

    /// Full world matrix for a marker pose.
    pub fn world_transform(&self, pose: &MarkerPose) -> WorldTransform {
        WorldTransform::new(flip_xy(pose) * self.correction)
    }

    /// World matrix and its node components, ready to assign to a root node.
    ///
    /// `None` when the pose is not finite, or stops being finite once narrowed
    /// to `f32`.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn map(&self, pose: &MarkerPose) -> Option<MappedPose> {
        if !pose.is_finite() {
            return None;
        }
        let world = self.world_transform(pose);
        let components = world.decompose();
        (world.is_finite() && components.is_finite()).then_some(MappedPose { world, components })
    }
}

/// Homogeneous matrix of `pose` with the first two rows of `R` and the first
/// two components of `t` negated.
pub fn flip_xy(pose: &MarkerPose) -> Matrix4<f32> {
    let flip = Matrix3::from_diagonal(&Vector3::new(-1.0, -1.0, 1.0));
    let r: Matrix3<f32> = (flip * pose.rotation).cast();
    let t: Vector3<f32> = (flip * pose.translation).cast();

    let mut m = Matrix4::identity();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
    m.fixed_view_mut::<3, 1>(0, 3).copy_from(&t);
    m
}
