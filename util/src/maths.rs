//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

/// Limit a value to the closed range `[min, max]`.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: PartialOrd,
{
    if value > max {
        max
    } else if value < min {
        min
    } else {
        value
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// Float round-off can make the result equal `rhs.abs()` when `lhs` is a tiny negative number.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Wrap an angle in degrees into `[0, 360)`.
pub fn wrap_deg_360<T>(angle_deg: T) -> T
where
    T: Float,
{
    let full = T::from(360.0).unwrap_or_else(T::zero);
    let wrapped = rem_euclid(angle_deg, full);

    // Guard against the round-off case documented on rem_euclid
    if wrapped >= full {
        T::zero()
    } else {
        wrapped
    }
}

/// Round a value to the nearest multiple of `step`, halves rounding away from zero.
pub fn round_to_multiple<T>(value: T, step: T) -> T
where
    T: Float,
{
    (value / step).round() * step
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 1f64), (100f64, 255f64), 0.5), 177.5);
        assert_eq!(lin_map((0f64, 90f64), (0f64, 0.3f64), 90.0), 0.3);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(5, 0, 3), 3);
        assert_eq!(clamp(-1.0, 0.0, 3.0), 0.0);
        assert_eq!(clamp(1.5, 0.0, 3.0), 1.5);
    }

    #[test]
    fn test_wrap_deg_360() {
        assert_eq!(wrap_deg_360(0f64), 0.0);
        assert_eq!(wrap_deg_360(360f64), 0.0);
        assert_eq!(wrap_deg_360(-90f64), 270.0);
        assert_eq!(wrap_deg_360(725f64), 5.0);
        assert!(wrap_deg_360(-1e-14f64) < 360.0);
    }

    #[test]
    fn test_round_to_multiple() {
        assert_eq!(round_to_multiple(390f64, 400.0), 400.0);
        assert_eq!(round_to_multiple(-190f64, 400.0), 0.0);
        assert_eq!(round_to_multiple(-210f64, 400.0), -400.0);
        assert_eq!(round_to_multiple(1200f64, 400.0), 1200.0);
    }
}
