//! Anatomical range-of-motion limits attached to each segment.
//!
//! The limits are data only; `crate::ik::constraints` evaluates them.

/// Swing limits as four half-angles (degrees), one per quadrant of the
/// reference frame's local X/Z plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeLimits {
    /// Towards local +X.
    pub right: f64,
    /// Towards local +Z.
    pub forward: f64,
    /// Towards local -X.
    pub left: f64,
    /// Towards local -Z.
    pub back: f64,
}

impl ConeLimits {
    pub const fn new(right: f64, forward: f64, left: f64, back: f64) -> Self {
        Self {
            right,
            forward,
            left,
            back,
        }
    }

    pub const fn uniform(angle: f64) -> Self {
        Self::new(angle, angle, angle, angle)
    }

    /// Every direction allowed.
    pub const fn unconstrained() -> Self {
        Self::uniform(180.0)
    }

    pub fn is_unconstrained(&self) -> bool {
        self.right >= 180.0 && self.forward >= 180.0 && self.left >= 180.0 && self.back >= 180.0
    }

    /// Half-angles `(x_limit, z_limit)` for the quadrant containing the local
    /// lateral offset `(x, z)`.
    pub fn quadrant(&self, x: f64, z: f64) -> (f64, f64) {
        let x_limit = if x >= 0.0 { self.right } else { self.left };
        let z_limit = if z >= 0.0 { self.forward } else { self.back };
        (x_limit, z_limit)
    }

    /// Same limits with the lateral sides exchanged.
    pub const fn mirrored(self) -> Self {
        Self::new(self.left, self.forward, self.right, self.back)
    }
}

impl Default for ConeLimits {
    fn default() -> Self {
        Self::unconstrained()
    }
}

/// Allowed twist about the segment's own +Y axis, in degrees.
///
/// `start < end` allows `[start, end]`; `start >= end` allows the wrap-around
/// range `[start, 180] ∪ [-180, end]`. Both zero disables the limit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TwistLimits {
    pub start: f64,
    pub end: f64,
}

impl TwistLimits {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub const fn unconstrained() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn is_unconstrained(&self) -> bool {
        self.start == 0.0 && self.end == 0.0
    }

    pub fn contains(&self, angle: f64) -> bool {
        if self.is_unconstrained() {
            return true;
        }
        if self.start < self.end {
            angle >= self.start && angle <= self.end
        } else {
            angle >= self.start || angle <= self.end
        }
    }
}

/// Complete joint limit set for one segment.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointConstraint {
    pub cone: ConeLimits,
    pub twist: TwistLimits,
}

impl JointConstraint {
    pub const fn new(cone: ConeLimits, twist: TwistLimits) -> Self {
        Self { cone, twist }
    }
}
