//! Axis-aligned bounding boxes

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Smallest axis-aligned box containing a set of points.
///
/// An empty box has `min = +inf` and `max = -inf` so that the first
/// point expanded into it becomes both corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: DVec3,
    pub max: DVec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    pub const EMPTY: Self = Self {
        min: DVec3::INFINITY,
        max: DVec3::NEG_INFINITY,
    };

    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Box with the given size centered on the origin
    pub fn centered(size: DVec3) -> Self {
        let half = size * 0.5;
        Self::new(-half, half)
    }

    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = DVec3>,
    {
        points.into_iter().fold(Self::EMPTY, |mut bounds, p| {
            bounds.expand_by_point(p);
            bounds
        })
    }

    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    /// Componentwise `max - min`, zero for an empty box
    pub fn size(&self) -> DVec3 {
        if self.is_empty() {
            DVec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn center(&self) -> DVec3 {
        if self.is_empty() {
            DVec3::ZERO
        } else {
            (self.min + self.max) * 0.5
        }
    }

    pub fn expand_by_point(&mut self, point: DVec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// The eight corners, used to carry a local box into world space
    pub fn corners(&self) -> [DVec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            DVec3::new(lo.x, lo.y, lo.z),
            DVec3::new(hi.x, lo.y, lo.z),
            DVec3::new(lo.x, hi.y, lo.z),
            DVec3::new(hi.x, hi.y, lo.z),
            DVec3::new(lo.x, lo.y, hi.z),
            DVec3::new(hi.x, lo.y, hi.z),
            DVec3::new(lo.x, hi.y, hi.z),
            DVec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Bounds of this box after mapping each corner through `transform`
    pub fn transformed<F>(&self, transform: F) -> Self
    where
        F: Fn(DVec3) -> DVec3,
    {
        if self.is_empty() {
            return *self;
        }
        Self::from_points(self.corners().into_iter().map(transform))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let bounds = BoundingBox::from_points([
            DVec3::new(1.0, -2.0, 0.5),
            DVec3::new(-1.0, 3.0, 0.0),
            DVec3::new(0.0, 0.0, -4.0),
        ]);
        assert_eq!(bounds.min, DVec3::new(-1.0, -2.0, -4.0));
        assert_eq!(bounds.max, DVec3::new(1.0, 3.0, 0.5));
        assert_eq!(bounds.size(), DVec3::new(2.0, 5.0, 4.5));
    }

    #[test]
    fn test_empty_box() {
        let bounds = BoundingBox::from_points(std::iter::empty());
        assert!(bounds.is_empty());
        assert_eq!(bounds.size(), DVec3::ZERO);
        assert_eq!(bounds.center(), DVec3::ZERO);
        assert!(bounds.transformed(|p| p * 2.0).is_empty());
    }

    #[test]
    fn test_single_point_is_degenerate_not_empty() {
        let bounds = BoundingBox::from_points([DVec3::new(1.0, 1.0, 1.0)]);
        assert!(!bounds.is_empty());
        assert_eq!(bounds.size(), DVec3::ZERO);
    }

    #[test]
    fn test_union() {
        let a = BoundingBox::new(DVec3::ZERO, DVec3::ONE);
        let b = BoundingBox::new(DVec3::splat(-1.0), DVec3::splat(0.5));
        let u = a.union(&b);
        assert_eq!(u.min, DVec3::splat(-1.0));
        assert_eq!(u.max, DVec3::ONE);

        // Union with empty is identity
        assert_eq!(a.union(&BoundingBox::EMPTY), a);
    }

    #[test]
    fn test_transformed_rotation_grows_box() {
        let bounds = BoundingBox::centered(DVec3::new(2.0, 2.0, 2.0));
        let rotation = glam::DQuat::from_rotation_y(std::f64::consts::FRAC_PI_4);
        let rotated = bounds.transformed(|p| rotation * p);

        let expected = 2.0_f64.sqrt();
        assert!((rotated.max.x - expected).abs() < 1e-12);
        assert!((rotated.max.z - expected).abs() < 1e-12);
        assert!((rotated.max.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_transformed_translation() {
        let bounds = BoundingBox::centered(DVec3::ONE);
        let moved = bounds.transformed(|p| p + DVec3::new(0.0, 0.0, -3.0));
        assert_eq!(moved.center(), DVec3::new(0.0, 0.0, -3.0));
        assert_eq!(moved.size(), DVec3::ONE);
    }
}
