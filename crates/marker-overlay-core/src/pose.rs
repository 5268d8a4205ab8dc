use nalgebra::{Matrix3, Matrix4, Rotation3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Marker-to-camera rigid transform in vision convention.
///
/// Camera space is right-handed with +X right, +Y down and +Z looking into
/// the scene.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerPose {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl MarkerPose {
    pub fn new(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn from_rows(rows: [[f64; 3]; 3], translation: [f64; 3]) -> Self {
        Self::new(
            Matrix3::new(
                rows[0][0], rows[0][1], rows[0][2], //
                rows[1][0], rows[1][1], rows[1][2], //
                rows[2][0], rows[2][1], rows[2][2],
            ),
            Vector3::from(translation),
        )
    }

    pub fn identity_at(translation: [f64; 3]) -> Self {
        Self::new(Matrix3::identity(), Vector3::from(translation))
    }

    /// Returns `true` when every entry is finite.
    pub fn is_finite(&self) -> bool {
        self.rotation.iter().all(|v| v.is_finite()) && self.translation.iter().all(|v| v.is_finite())
    }
}

/// Translation, rotation and scale of a node, applied as `T * R * S`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformComponents {
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Default for TransformComponents {
    fn default() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl TransformComponents {
    pub fn at(translation: Vector3<f32>) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    pub fn is_finite(&self) -> bool {
        self.translation.iter().all(|v| v.is_finite())
            && self.rotation.coords.iter().all(|v| v.is_finite())
            && self.scale.iter().all(|v| v.is_finite())
    }

    pub fn to_matrix(&self) -> Matrix4<f32> {
        Translation3::from(self.translation).to_homogeneous()
            * self.rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }
}

/// Column-major 4x4 world matrix in renderer convention.
///
/// Rotation occupies the upper-left 3x3 block and translation the last
/// column, which is the layout GL-style uniform uploads expect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldTransform {
    pub matrix: Matrix4<f32>,
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl WorldTransform {
    pub fn new(matrix: Matrix4<f32>) -> Self {
        Self { matrix }
    }

    pub fn identity() -> Self {
        Self::new(Matrix4::identity())
    }

    pub fn from_translation(t: Vector3<f32>) -> Self {
        Self::new(Translation3::from(t).to_homogeneous())
    }

    /// `false` when any entry overflowed or is NaN.
    pub fn is_finite(&self) -> bool {
        self.matrix.iter().all(|v| v.is_finite())
    }

    #[inline]
    pub fn translation(&self) -> Vector3<f32> {
        self.matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Matrix entries in column-major order.
    pub fn to_cols_array(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        out.copy_from_slice(self.matrix.as_slice());
        out
    }

    /// Matrix rows, convenient for reports and logs.
    pub fn to_rows(&self) -> [[f32; 4]; 4] {
        let m = &self.matrix;
        std::array::from_fn(|r| std::array::from_fn(|c| m[(r, c)]))
    }

    /// Split into translation, rotation and scale.
    ///
    /// Scale is the length of each basis column; a mirrored basis moves its
    /// sign onto the X scale so the remaining rotation stays proper.
    pub fn decompose(&self) -> TransformComponents {
        let m = &self.matrix;
        let basis = m.fixed_view::<3, 3>(0, 0).into_owned();
        let mut scale = Vector3::new(
            basis.column(0).norm(),
            basis.column(1).norm(),
            basis.column(2).norm(),
        );
        if basis.determinant() < 0.0 {
            scale.x = -scale.x;
        }

        let rotation = if scale.iter().all(|s| s.abs() > 1e-12) {
            let r = Matrix3::from_columns(&[
                basis.column(0) / scale.x,
                basis.column(1) / scale.y,
                basis.column(2) / scale.z,
            ]);
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r))
        } else {
            UnitQuaternion::identity()
        };

        TransformComponents {
            translation: self.translation(),
            rotation,
            scale,
        }
    }
}
