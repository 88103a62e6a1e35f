//! Geometry primitives shared by the host interfaces and the alignment
//! engine. All values are f64 logical units unless stated otherwise.

/// Axis-aligned rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub w: f64,
    /// Height.
    pub h: f64,
}

impl Rect {
    /// Construct a rectangle from its origin and extent.
    #[must_use]
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Extent of the rectangle.
    #[must_use]
    pub const fn size(&self) -> Size {
        Size {
            width: self.w,
            height: self.h,
        }
    }
}

/// Width/height pair.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Size {
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl Size {
    /// Construct a size.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Device-to-logical scale transform reported by a screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Horizontal device-to-logical scale factor.
    pub scale_x: f64,
    /// Vertical device-to-logical scale factor.
    pub scale_y: f64,
}

impl Transform {
    /// No scaling (96 DPI equivalent).
    pub const IDENTITY: Self = Self {
        scale_x: 1.0,
        scale_y: 1.0,
    };

    /// Map a device-unit rectangle into logical units.
    #[must_use]
    pub fn to_logical(&self, rect: Rect) -> Rect {
        Rect {
            x: rect.x * self.scale_x,
            y: rect.y * self.scale_y,
            w: rect.w * self.scale_x,
            h: rect.h * self.scale_y,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Strict tolerance comparison used for convergence checks.
#[inline]
#[must_use]
pub fn within_tolerance(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() < tolerance
}
