//! Bounded stat values

use crate::core::types::STAT_EPSILON;
use serde::{Deserialize, Serialize};

/// A numeric stat with optional clamp bounds fixed at initialization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatValue {
    value: f32,
    #[serde(default)]
    min: Option<f32>,
    #[serde(default)]
    max: Option<f32>,
}

/// Old and new value of a stat write that actually changed something
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatChange {
    pub old: f32,
    pub new: f32,
}

impl StatValue {
    pub fn unbounded(value: f32) -> Self {
        Self { value, min: None, max: None }
    }

    pub fn bounded(value: f32, min: Option<f32>, max: Option<f32>) -> Self {
        let mut stat = Self { value, min, max };
        stat.value = stat.clamp(value);
        stat
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn min(&self) -> Option<f32> {
        self.min
    }

    pub fn max(&self) -> Option<f32> {
        self.max
    }

    pub fn clamp(&self, value: f32) -> f32 {
        let mut v = value;
        if let Some(min) = self.min {
            v = v.max(min);
        }
        if let Some(max) = self.max {
            v = v.min(max);
        }
        v
    }

    /// Set the (clamped) value. Writes and returns the change only if it
    /// moves by more than [`STAT_EPSILON`]; smaller writes leave it alone.
    pub fn set(&mut self, value: f32) -> Option<StatChange> {
        let old = self.value;
        let new = self.clamp(value);
        if (new - old).abs() > STAT_EPSILON {
            self.value = new;
            Some(StatChange { old, new })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamps_to_bounds() {
        let mut stat = StatValue::bounded(0.0, Some(0.0), Some(100.0));
        let change = stat.set(150.0).unwrap();
        assert_eq!(change.old, 0.0);
        assert_eq!(change.new, 100.0);
        assert_eq!(stat.value(), 100.0);

        let change = stat.set(-5.0).unwrap();
        assert_eq!(change.new, 0.0);
    }

    #[test]
    fn test_initial_value_is_clamped() {
        let stat = StatValue::bounded(250.0, None, Some(100.0));
        assert_eq!(stat.value(), 100.0);
    }

    #[test]
    fn test_no_change_below_epsilon() {
        let mut stat = StatValue::bounded(100.0, Some(0.0), Some(100.0));
        assert!(stat.set(120.0).is_none());
        assert!(stat.set(100.00001).is_none());
    }

    #[test]
    fn test_sub_epsilon_writes_do_not_drift() {
        let mut stat = StatValue::unbounded(50.0);
        for _ in 0..100 {
            assert!(stat.set(stat.value() + 0.00005).is_none());
        }
        assert_eq!(stat.value(), 50.0);

        let change = stat.set(50.5).unwrap();
        assert_eq!(change.old, 50.0);
    }
}
