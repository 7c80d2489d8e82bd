//! Unlocked progression keys

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::bus::Signal;
use crate::core::types::ContentKey;
use crate::ecs::world::World;

#[derive(Debug, Clone, Default)]
pub struct Progression {
    unlocked: AHashSet<ContentKey>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressionSnapshot {
    pub unlocked: Vec<ContentKey>,
}

impl Progression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true on the first unlock of `key`
    pub fn unlock(&mut self, key: ContentKey) -> bool {
        key.is_valid() && self.unlocked.insert(key)
    }

    pub fn is_unlocked(&self, key: &str) -> bool {
        self.unlocked.contains(key)
    }

    /// Sorted for stable output
    pub fn unlocked(&self) -> Vec<&ContentKey> {
        let mut keys: Vec<_> = self.unlocked.iter().collect();
        keys.sort();
        keys
    }

    pub fn clear(&mut self) {
        self.unlocked.clear();
    }

    pub fn create_snapshot(&self) -> ProgressionSnapshot {
        ProgressionSnapshot {
            unlocked: self.unlocked().into_iter().cloned().collect(),
        }
    }

    pub fn restore_from_snapshot(&mut self, snapshot: &ProgressionSnapshot) {
        self.unlocked = snapshot.unlocked.iter().cloned().collect();
    }
}

impl World {
    /// Unlock `key`, publishing only the first time
    pub fn unlock(&mut self, key: impl Into<ContentKey>) -> bool {
        let key = key.into();
        if !self.progression.unlock(key.clone()) {
            return false;
        }
        self.publish(Signal::ProgressionUnlocked { key });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlock_once() {
        let mut progression = Progression::new();
        assert!(progression.unlock(ContentKey::new("forge")));
        assert!(!progression.unlock(ContentKey::new("forge")));
        assert!(!progression.unlock(ContentKey::new("")));
        assert!(progression.is_unlocked("forge"));
        assert!(!progression.is_unlocked("mill"));
    }

    #[test]
    fn test_snapshot_sorted() {
        let mut progression = Progression::new();
        progression.unlock(ContentKey::new("mill"));
        progression.unlock(ContentKey::new("forge"));
        let snapshot = progression.create_snapshot();
        assert_eq!(
            snapshot.unlocked,
            vec![ContentKey::new("forge"), ContentKey::new("mill")]
        );

        let mut restored = Progression::new();
        restored.restore_from_snapshot(&snapshot);
        assert!(restored.is_unlocked("mill"));
    }
}
