//! Simulation clock with time-of-day tracking
//!
//! Time only moves forward through [`Clock::advance`], which the world tick
//! calls once per frame. Hour of day is derived from elapsed seconds for
//! time-window conditions.

use crate::core::config::CalendarConfig;
use crate::core::types::SimTime;
use serde::{Deserialize, Serialize};

/// Clock tracks simulation time and derives the hour of day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clock {
    now: SimTime,
    seconds_per_day: f64,
    start_hour: f32,
}

impl Clock {
    pub fn new(config: &CalendarConfig) -> Self {
        Self {
            now: SimTime::ZERO,
            seconds_per_day: config.seconds_per_day.max(1.0),
            start_hour: config.start_hour.rem_euclid(24.0),
        }
    }

    pub fn advance(&mut self, delta_seconds: f64) {
        self.now += delta_seconds;
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Restore an absolute time (snapshot restore, world reset)
    pub fn set_now(&mut self, now: SimTime) {
        self.now = now;
    }

    /// Hour of day in `[0, 24)`
    pub fn hour_of_day(&self) -> f32 {
        let hours = self.start_hour as f64 + self.now.as_secs() * 24.0 / self.seconds_per_day;
        hours.rem_euclid(24.0) as f32
    }

    /// Inclusive hour window; wraps past midnight when `start > end`
    pub fn is_within_hours(&self, start_hour: f32, end_hour: f32) -> bool {
        let hour = self.hour_of_day();
        if start_hour <= end_hour {
            hour >= start_hour && hour <= end_hour
        } else {
            hour >= start_hour || hour <= end_hour
        }
    }

    pub fn seconds_per_day(&self) -> f64 {
        self.seconds_per_day
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(&CalendarConfig::default())
    }
}
