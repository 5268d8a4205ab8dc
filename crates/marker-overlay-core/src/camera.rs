//! Calibrated pinhole camera with Brown radial-tangential distortion.
//!
//! The calibration is loaded once at startup and handed to the marker
//! detector; it never changes for the lifetime of the process.

use nalgebra::{Point3, Vector2};
use serde::{Deserialize, Serialize};

/// Calibration validation errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("image size must be non-zero (width={width}, height={height})")]
    InvalidImageSize { width: u32, height: u32 },
    #[error("focal lengths must be finite and non-zero (fx={fx}, fy={fy})")]
    InvalidFocalLength { fx: f64, fy: f64 },
    #[error("principal point must be finite")]
    InvalidPrincipalPoint,
    #[error("distortion coefficients must be finite")]
    InvalidDistortion,
    #[error("at most 3 radial coefficients are supported, got {0}")]
    TooManyRadialTerms(usize),
}

/// Pinhole intrinsics in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PinholeIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    #[serde(default)]
    pub skew: f64,
}

/// Radial (`k1..k3`) and tangential (`t1`, `t2`) distortion terms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RadialTangential {
    #[serde(default)]
    pub radial: Vec<f64>,
    #[serde(default)]
    pub t1: f64,
    #[serde(default)]
    pub t2: f64,
}

impl RadialTangential {
    #[inline]
    fn k(&self, i: usize) -> f64 {
        self.radial.get(i).copied().unwrap_or(0.0)
    }

    /// Apply distortion to normalized image coordinates.
    pub fn distort_normalized(&self, xn: Vector2<f64>) -> Vector2<f64> {
        let (x, y) = (xn.x, xn.y);
        let r2 = x * x + y * y;
        let radial = 1.0 + self.k(0) * r2 + self.k(1) * r2 * r2 + self.k(2) * r2 * r2 * r2;
        let x_tan = 2.0 * self.t1 * x * y + self.t2 * (r2 + 2.0 * x * x);
        let y_tan = self.t1 * (r2 + 2.0 * y * y) + 2.0 * self.t2 * x * y;
        Vector2::new(x * radial + x_tan, y * radial + y_tan)
    }
}

/// Intrinsics, distortion and the pixel size they were calibrated at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalibratedCamera {
    pub width: u32,
    pub height: u32,
    pub pinhole: PinholeIntrinsics,
    #[serde(default)]
    pub radial_tangential: RadialTangential,
}

impl CalibratedCamera {
    /// Validate and build a camera.
    pub fn new(
        width: u32,
        height: u32,
        pinhole: PinholeIntrinsics,
        radial_tangential: RadialTangential,
    ) -> Result<Self, CameraError> {
        let cam = Self {
            width,
            height,
            pinhole,
            radial_tangential,
        };
        cam.validate()?;
        Ok(cam)
    }

    pub fn validate(&self) -> Result<(), CameraError> {
        if self.width == 0 || self.height == 0 {
            return Err(CameraError::InvalidImageSize {
                width: self.width,
                height: self.height,
            });
        }
        let p = &self.pinhole;
        if !p.fx.is_finite() || !p.fy.is_finite() || p.fx.abs() < 1e-12 || p.fy.abs() < 1e-12 {
            return Err(CameraError::InvalidFocalLength { fx: p.fx, fy: p.fy });
        }
        if !p.cx.is_finite() || !p.cy.is_finite() || !p.skew.is_finite() {
            return Err(CameraError::InvalidPrincipalPoint);
        }
        let d = &self.radial_tangential;
        if d.radial.len() > 3 {
            return Err(CameraError::TooManyRadialTerms(d.radial.len()));
        }
        if !d.radial.iter().all(|k| k.is_finite()) || !d.t1.is_finite() || !d.t2.is_finite() {
            return Err(CameraError::InvalidDistortion);
        }
        Ok(())
    }

    /// Pixel to normalized pinhole coordinates (distortion is not removed).
    pub fn pixel_to_normalized(&self, pixel: Vector2<f64>) -> Vector2<f64> {
        let p = &self.pinhole;
        let y = (pixel.y - p.cy) / p.fy;
        let x = (pixel.x - p.cx - p.skew * y) / p.fx;
        Vector2::new(x, y)
    }

    pub fn normalized_to_pixel(&self, xn: Vector2<f64>) -> Vector2<f64> {
        let p = &self.pinhole;
        Vector2::new(p.fx * xn.x + p.skew * xn.y + p.cx, p.fy * xn.y + p.cy)
    }

    /// Project a point in camera coordinates (+Z forward) to distorted pixels.
    ///
    /// Returns `None` for points on or behind the image plane.
    pub fn project(&self, p: &Point3<f64>) -> Option<Vector2<f64>> {
        if p.z <= 1e-12 {
            return None;
        }
        let xn = Vector2::new(p.x / p.z, p.y / p.z);
        let xd = self.radial_tangential.distort_normalized(xn);
        Some(self.normalized_to_pixel(xd))
    }
}
