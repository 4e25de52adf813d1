//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Constrain a value to the range `[min, max]`.
///
/// A NaN input maps to the middle of the range so that a bad sample can never
/// drive an output to one of its extremes.
pub fn constrain<T>(value: T, min: T, max: T) -> T
where
    T: Float,
{
    if value.is_nan() {
        return (min + max) / (T::one() + T::one());
    }

    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Move `value` towards `target` by at most `step`, without passing it.
///
/// `step` is taken by magnitude.
pub fn move_towards<T>(value: T, target: T, step: T) -> T
where
    T: Float,
{
    let step = step.abs();

    if value < target {
        (value + step).min(target)
    } else {
        (value - step).max(target)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_constrain() {
        assert_eq!(constrain(1.5f64, 0.0, 1.0), 1.0);
        assert_eq!(constrain(-0.2f64, 0.0, 1.0), 0.0);
        assert_eq!(constrain(0.3f64, 0.0, 1.0), 0.3);
        assert_eq!(constrain(std::f64::NAN, 0.0, 1.0), 0.5);
    }

    #[test]
    fn test_move_towards() {
        assert_eq!(move_towards(5.0f64, 11.0, 0.5), 5.5);
        assert_eq!(move_towards(10.8f64, 11.0, 0.5), 11.0);
        assert_eq!(move_towards(1.3f64, 1.0, 0.5), 1.0);
        assert_eq!(move_towards(1.5f64, 1.0, -0.25), 1.25);
        assert_eq!(move_towards(2.0f64, 2.0, 0.1), 2.0);
    }
}
