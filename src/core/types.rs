//! Core type definitions used throughout the codebase

use derive_more::Display;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::rc::Rc;

/// Tolerance used when comparing simulation timestamps
pub const TIME_EPSILON: f64 = 1e-6;

/// Tolerance used for stat equality comparisons
pub const STAT_EPSILON: f32 = 1e-4;

/// Unique identifier for entities
///
/// Ids are handed out monotonically by the entity store and never reused
/// within a session. Zero is the invalid id.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[display(fmt = "entity#{}", _0)]
pub struct EntityId(pub u64);

impl EntityId {
    pub const INVALID: EntityId = EntityId(0);

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

/// Identifier of a running timer
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[display(fmt = "timer#{}", _0)]
pub struct TimerId(pub u64);

/// Identifier of a live event instance
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[display(fmt = "event#{}", _0)]
pub struct EventInstanceId(pub u64);

/// Interned name of a piece of content (stat, tag, action, event, item...)
///
/// Cloning is a reference-count bump. Equality and hashing are on the
/// string value, so maps keyed by `ContentKey` can be queried with `&str`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ContentKey(Rc<str>);

impl ContentKey {
    pub fn new(key: &str) -> Self {
        Self(Rc::from(key))
    }

    /// Empty keys never name anything
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The empty (invalid) key
impl Default for ContentKey {
    fn default() -> Self {
        Self(Rc::from(""))
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ContentKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContentKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ContentKey {
    fn from(key: String) -> Self {
        Self(Rc::from(key))
    }
}

impl From<ContentKey> for String {
    fn from(key: ContentKey) -> Self {
        key.0.to_string()
    }
}

/// Monotonic simulation clock value in seconds
///
/// Only the world tick advances time. Ordering is total so timestamps can
/// be used as map keys and sorted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct SimTime(OrderedFloat<f64>);

impl SimTime {
    pub const ZERO: SimTime = SimTime(OrderedFloat(0.0));

    pub fn from_secs(secs: f64) -> Self {
        Self(OrderedFloat(secs))
    }

    pub fn as_secs(&self) -> f64 {
        self.0.into_inner()
    }

    /// Equality within [`TIME_EPSILON`]
    pub fn approx_eq(&self, other: SimTime) -> bool {
        (self.as_secs() - other.as_secs()).abs() <= TIME_EPSILON
    }

    /// True once this time is at or past `deadline` (within epsilon)
    pub fn has_reached(&self, deadline: SimTime) -> bool {
        self.as_secs() >= deadline.as_secs() - TIME_EPSILON
    }

    /// Seconds elapsed since `earlier`
    pub fn since(&self, earlier: SimTime) -> f64 {
        self.as_secs() - earlier.as_secs()
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs())
    }
}

impl std::ops::Add<f64> for SimTime {
    type Output = SimTime;
    fn add(self, rhs: f64) -> SimTime {
        SimTime::from_secs(self.as_secs() + rhs)
    }
}

impl std::ops::AddAssign<f64> for SimTime {
    fn add_assign(&mut self, rhs: f64) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for SimTime {
    type Output = f64;
    fn sub(self, rhs: SimTime) -> f64 {
        self.as_secs() - rhs.as_secs()
    }
}

/// 2D position
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashMap;

    #[test]
    fn test_entity_id_validity() {
        assert!(!EntityId::INVALID.is_valid());
        assert!(!EntityId::default().is_valid());
        assert!(EntityId(7).is_valid());
        assert_eq!(EntityId(7).to_string(), "entity#7");
    }

    #[test]
    fn test_content_key_value_equality() {
        let a = ContentKey::new("health");
        let b = ContentKey::from(String::from("health"));
        assert_eq!(a, b);
        assert!(a.is_valid());
        assert!(!ContentKey::new("").is_valid());
    }

    #[test]
    fn test_content_key_lookup_by_str() {
        let mut map: AHashMap<ContentKey, u32> = AHashMap::new();
        map.insert(ContentKey::new("gold"), 3);
        assert_eq!(map.get("gold"), Some(&3));
        assert_eq!(map.get("silver"), None);
    }

    #[test]
    fn test_content_key_serializes_as_string() {
        let key = ContentKey::new("stamina");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"stamina\"");
        let back: ContentKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_sim_time_arithmetic() {
        let start = SimTime::from_secs(1.5);
        let later = start + 2.0;
        assert!((later - start - 2.0).abs() < 1e-9);
        assert!(later > start);
        assert!(later.has_reached(SimTime::from_secs(3.5)));
        assert!(!start.has_reached(SimTime::from_secs(3.5)));
    }

    #[test]
    fn test_sim_time_epsilon_equality() {
        let a = SimTime::from_secs(0.1 + 0.2);
        let b = SimTime::from_secs(0.3);
        assert!(a.approx_eq(b));
        assert!(a.has_reached(b));
    }

    #[test]
    fn test_vec2_distance() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
        assert!(((b - a).length() - 5.0).abs() < 1e-6);
    }
}
