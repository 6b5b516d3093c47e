//! Position / scale / visibility controls generated for a loaded model

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::bounds::BoundingBox;

/// One slider-backed value with its range and step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangedValue {
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl RangedValue {
    pub fn new(value: f64, min: f64, max: f64, step: f64) -> Self {
        let mut ranged = Self {
            value,
            min,
            max,
            step,
        };
        ranged.set(value);
        ranged
    }

    /// Store `value` clamped to the range; NaN is ignored
    pub fn set(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.value = if self.min <= self.max {
            value.clamp(self.min, self.max)
        } else {
            value
        };
    }
}

/// Axis of a position control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Order the position folder lists its sliders in
    pub const PANEL_ORDER: [Axis; 3] = [Axis::Y, Axis::X, Axis::Z];

    pub fn label(&self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }
}

/// Control state for the model currently in the scene.
///
/// Position sliders all share the range `[-size.x / 2, size.x / 2]` of the
/// model's bounding box. Scale is uniform across the three axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelControls {
    pub x: RangedValue,
    pub y: RangedValue,
    pub z: RangedValue,
    pub scale: RangedValue,
    pub visible: bool,
}

impl ModelControls {
    pub const SCALE_MIN: f64 = 0.0;

    /// Build controls for a model whose current position and scale are given
    pub fn for_model(
        bounds: &BoundingBox,
        position: DVec3,
        scale: f64,
        visible: bool,
        position_step: f64,
        scale_max: f64,
    ) -> Self {
        let half_width = bounds.size().x / 2.0;
        let axis = |value: f64| RangedValue::new(value, -half_width, half_width, position_step);

        Self {
            x: axis(position.x),
            y: axis(position.y),
            z: axis(position.z),
            scale: RangedValue::new(scale, Self::SCALE_MIN, scale_max, 0.01),
            visible,
        }
    }

    pub fn axis(&self, axis: Axis) -> &RangedValue {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }

    pub fn axis_mut(&mut self, axis: Axis) -> &mut RangedValue {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
        }
    }

    pub fn position(&self) -> DVec3 {
        DVec3::new(self.x.value, self.y.value, self.z.value)
    }

    pub fn set_position(&mut self, position: DVec3) {
        self.x.set(position.x);
        self.y.set(position.y);
        self.z.set(position.z);
    }

    /// Uniform scale vector
    pub fn scale(&self) -> DVec3 {
        DVec3::splat(self.scale.value)
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale.set(scale);
    }
}
