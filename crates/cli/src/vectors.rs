use rand::Rng;

/// Axis range for generated vectors.
const AXIS_RANGE: f32 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            x: rng.gen_range(-AXIS_RANGE..=AXIS_RANGE),
            y: rng.gen_range(-AXIS_RANGE..=AXIS_RANGE),
            z: rng.gen_range(-AXIS_RANGE..=AXIS_RANGE),
        }
    }

    pub fn magnitude(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit vector in the same direction. The zero vector is returned unchanged.
    pub fn normalized(self) -> Self {
        let mag = self.magnitude();
        if mag == 0.0 {
            return self;
        }
        Self {
            x: self.x / mag,
            y: self.y / mag,
            z: self.z / mag,
        }
    }
}

/// Outcome of one normalisation batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeReport {
    pub total: usize,
    /// Vectors whose normalised magnitude came out exactly 0 or 1.
    pub exact: usize,
    /// Mean magnitude of the remaining vectors, 0 when there are none.
    pub average_inexact: f32,
}

/// Generate `count` random vectors and normalise each one, counting how
/// many land exactly on unit length in `f32`.
pub fn normalize_random<R: Rng + ?Sized>(count: usize, rng: &mut R) -> NormalizeReport {
    let mut exact = 0;
    let mut inexact_sum = 0.0f64;

    for _ in 0..count {
        let mag = Vec3::random(rng).normalized().magnitude();
        if mag == 0.0 || mag == 1.0 {
            exact += 1;
        } else {
            inexact_sum += f64::from(mag);
        }
    }

    let inexact = count - exact;
    NormalizeReport {
        total: count,
        exact,
        average_inexact: if inexact == 0 {
            0.0
        } else {
            (inexact_sum / inexact as f64) as f32
        },
    }
}
