use cgmath::{
    InnerSpace, Matrix, Matrix3, Matrix4, One, Quaternion, SquareMatrix, Vector3, Vector4,
};

/// Pivots below this are treated as zero when decomposing.
const EPSILON: f32 = 1e-6;

/// Represents the spatial data for anything.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpatialTransform {
    pub scale: Vector3<f32>,
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
}

impl SpatialTransform {
    /// Get the identity transform (ie doesn't do anything).
    pub fn identity() -> Self {
        Self {
            scale: Vector3::new(1.0, 1.0, 1.0),
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
        }
    }

    /// Get the model matrix (`translation * rotation * scale`).
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

/// A matrix split into its affine parts plus whatever else it contained.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decomposed {
    pub transform: SpatialTransform,
    /// Shear factors (xy, xz, yz).
    pub skew: Vector3<f32>,
    pub perspective: Vector4<f32>,
}

impl Decomposed {
    /// Split `matrix` into translation, rotation, scale, skew and perspective.
    ///
    /// Returns `None` for matrices with no usable affine part (zero `w` scale,
    /// singular upper 3x3 or a zero-length axis).
    pub fn from_matrix(matrix: &Matrix4<f32>) -> Option<Self> {
        if matrix.w.w.abs() < EPSILON {
            return None;
        }
        let mut local = *matrix / matrix.w.w;

        let mut perspective_matrix = local;
        perspective_matrix.x.w = 0.0;
        perspective_matrix.y.w = 0.0;
        perspective_matrix.z.w = 0.0;
        perspective_matrix.w.w = 1.0;
        if perspective_matrix.determinant().abs() < EPSILON {
            return None;
        }

        let perspective = if local.x.w != 0.0 || local.y.w != 0.0 || local.z.w != 0.0 {
            let rhs = Vector4::new(local.x.w, local.y.w, local.z.w, local.w.w);
            let inverse = perspective_matrix.invert()?;
            local.x.w = 0.0;
            local.y.w = 0.0;
            local.z.w = 0.0;
            local.w.w = 1.0;
            inverse.transpose() * rhs
        } else {
            Vector4::new(0.0, 0.0, 0.0, 1.0)
        };

        let position = local.w.truncate();

        let mut x = local.x.truncate();
        let mut y = local.y.truncate();
        let mut z = local.z.truncate();
        let mut scale = Vector3::new(x.magnitude(), 0.0, 0.0);
        if scale.x < EPSILON {
            return None;
        }
        x /= scale.x;

        let mut skew = Vector3::new(0.0, 0.0, x.dot(y));
        y -= x * skew.z;
        scale.y = y.magnitude();
        if scale.y < EPSILON {
            return None;
        }
        y /= scale.y;
        skew.z /= scale.y;

        skew.y = x.dot(z);
        z -= x * skew.y;
        skew.x = y.dot(z);
        z -= y * skew.x;
        scale.z = z.magnitude();
        if scale.z < EPSILON {
            return None;
        }
        z /= scale.z;
        skew.y /= scale.z;
        skew.x /= scale.z;

        // Mirrored coordinate system: fold the flip into the scale.
        if x.dot(y.cross(z)) < 0.0 {
            scale = -scale;
            x = -x;
            y = -y;
            z = -z;
        }

        let rotation = Quaternion::from(Matrix3::from_cols(x, y, z)).normalize();
        Some(Self {
            transform: SpatialTransform {
                scale,
                position,
                rotation,
            },
            skew,
            perspective,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::test_util::assert_matrix_eq;
    use cgmath::{Deg, Rotation3};

    #[test]
    fn identity_is_identity_matrix() {
        assert_matrix_eq(&SpatialTransform::identity().to_matrix(), &Matrix4::identity());
    }

    #[test]
    fn decomposes_trs() {
        let transform = SpatialTransform {
            scale: Vector3::new(2.0, 3.0, 0.5),
            position: Vector3::new(1.0, -2.0, 4.0),
            rotation: Quaternion::from_axis_angle(Vector3::new(1.0, 1.0, 0.0).normalize(), Deg(35.0)),
        };
        let matrix = transform.to_matrix();
        let decomposed = Decomposed::from_matrix(&matrix).unwrap();

        assert!((decomposed.transform.position - transform.position).magnitude() < 1e-5);
        assert!((decomposed.transform.scale - transform.scale).magnitude() < 1e-5);
        assert!(decomposed.skew.magnitude() < 1e-5);
        assert_eq!(decomposed.perspective, Vector4::new(0.0, 0.0, 0.0, 1.0));
        assert_matrix_eq(&decomposed.transform.to_matrix(), &matrix);
    }

    #[test]
    fn mirrored_matrix_round_trips() {
        let matrix = Matrix4::from_nonuniform_scale(-1.0, 2.0, 2.0);
        let decomposed = Decomposed::from_matrix(&matrix).unwrap();
        assert_matrix_eq(&decomposed.transform.to_matrix(), &matrix);
    }

    #[test]
    fn degenerate_matrices_are_rejected() {
        let mut no_w = Matrix4::identity();
        no_w.w.w = 0.0;
        assert_eq!(Decomposed::from_matrix(&no_w), None);
        assert_eq!(
            Decomposed::from_matrix(&Matrix4::from_nonuniform_scale(1.0, 0.0, 1.0)),
            None
        );
    }
}
