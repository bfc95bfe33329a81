use std::ops::{Add, Mul, Neg, Sub};

/// A 3-vector; positions on the celestial sphere are unit vectors.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const X: Vector3 = Vector3::new(1.0, 0.0, 0.0);
    pub const Y: Vector3 = Vector3::new(0.0, 1.0, 0.0);
    pub const Z: Vector3 = Vector3::new(0.0, 0.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Unit vector for a right ascension and declination, in radians.
    pub fn from_radec(ra: f64, dec: f64) -> Self {
        let (sin_ra, cos_ra) = ra.sin_cos();
        let (sin_dec, cos_dec) = dec.sin_cos();
        Self::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec)
    }

    pub fn from_radec_degrees(ra: f64, dec: f64) -> Self {
        Self::from_radec(ra.to_radians(), dec.to_radians())
    }

    /// Right ascension in radians, in `[0, 2π)`.
    pub fn ra(&self) -> f64 {
        let ra = self.y.atan2(self.x);
        if ra < 0.0 { ra + std::f64::consts::TAU } else { ra }
    }

    /// Declination in radians, in `[-π/2, π/2]`.
    pub fn dec(&self) -> f64 {
        self.z.atan2(self.x.hypot(self.y))
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// `None` for the zero vector (and anything too short to point anywhere).
    pub fn normalize(&self) -> Option<Self> {
        let norm = self.norm();
        (norm > f64::MIN_POSITIVE && norm.is_finite()).then(|| *self * (1.0 / norm))
    }

    /// Angle between two vectors, in radians.
    pub fn angle_to(&self, other: &Self) -> f64 {
        self.cross(other).norm().atan2(self.dot(other))
    }
}

impl Add for Vector3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vector3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}
