//! Output sizes in pixels or physical units.

use num_traits::{FromPrimitive, Num};
use serde::{Deserialize, Serialize};

/// A 2d size. Negative dimensions are clamped to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size<N: Num + PartialOrd + Copy = f64> {
    width: N,
    height: N,
}

impl<N: Num + PartialOrd + Copy + FromPrimitive> Size<N> {
    /// Creates a new size, clamping negative values to zero.
    pub fn new(width: N, height: N) -> Self {
        let zero = N::zero();
        Self {
            width: if width < zero { zero } else { width },
            height: if height < zero { zero } else { height },
        }
    }

    /// Width value.
    pub fn width(&self) -> N {
        self.width
    }

    /// Height value.
    pub fn height(&self) -> N {
        self.height
    }

    /// Returns true if either dimension is zero.
    pub fn is_zero(&self) -> bool {
        self.width.is_zero() || self.height.is_zero()
    }

    /// Converts both dimensions to `f64`.
    pub fn cast_f64(&self) -> Size<f64>
    where
        N: Into<f64>,
    {
        Size {
            width: self.width.into(),
            height: self.height.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_dimensions_are_clamped() {
        let size = Size::new(-1.0, 10.0);
        assert_eq!(size.width(), 0.0);
        assert_eq!(size.height(), 10.0);
        assert!(size.is_zero());
    }

    #[test]
    fn integer_size_casts_to_f64() {
        let size: Size<u32> = Size::new(800, 600);
        let cast = size.cast_f64();
        assert_eq!(cast.width(), 800.0);
        assert_eq!(cast.height(), 600.0);
    }
}
