use serde::{Deserialize, Serialize};

/// Native priority range accepted by a scheduler integration.
///
/// The surrounding engine maps its own priorities into this range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityBounds {
    pub min: i64,
    pub max: i64,
}

impl PriorityBounds {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Clamp a value into the accepted range.
    #[inline]
    pub fn clamp(&self, value: i64) -> i64 {
        value.clamp(self.min, self.max)
    }
}
