//! Typed scratch values
//!
//! Entities carry an open-ended key -> value store for behavior-specific
//! data, and the action pipeline passes a similar bag between handlers and
//! callers. Both store [`Value`] so readers get typed access instead of
//! downcasting.

use crate::core::types::{ContentKey, EntityId, Vec2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f32),
    Text(String),
    Key(ContentKey),
    Entity(EntityId),
    Position(Vec2),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats, with integers widened
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f32),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_key(&self) -> Option<&ContentKey> {
        match self {
            Value::Key(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Value::Entity(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_position(&self) -> Option<Vec2> {
        match self {
            Value::Position(p) => Some(*p),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<EntityId> for Value {
    fn from(v: EntityId) -> Self {
        Value::Entity(v)
    }
}

impl From<Vec2> for Value {
    fn from(v: Vec2) -> Self {
        Value::Position(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(3i64).as_int(), Some(3));
        assert_eq!(Value::from(3i64).as_float(), Some(3.0));
        assert_eq!(Value::from("hi").as_text(), Some("hi"));
        assert_eq!(Value::from(EntityId(4)).as_entity(), Some(EntityId(4)));
        assert_eq!(Value::from(1.5f32).as_bool(), None);
    }

    #[test]
    fn test_value_json_shape() {
        let json = serde_json::to_string(&Value::Int(5)).unwrap();
        assert_eq!(json, r#"{"int":5}"#);
    }
}
