//! Recipe model consumed by cooking sessions
//!
//! Recipes are owned by the surrounding application; the engine only reads
//! them. They deserialise from the same JSON shape the recipe store uses.

use serde::{Deserialize, Serialize};

/// A single preparation step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Free-text instruction, read aloud during hands-free mode
    pub instruction: String,
    /// Optional explicit duration text (e.g. "10 minutes")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl Step {
    /// Creates a step without an explicit duration
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            duration: None,
        }
    }

    /// Creates a step with an explicit duration text
    pub fn with_duration(instruction: impl Into<String>, duration: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            duration: Some(duration.into()),
        }
    }
}

/// An ordered list of steps with an identifier and a title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Recipe {
    pub fn new(id: impl Into<String>, title: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            steps,
        }
    }

    /// Returns the step at `index`, if any
    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
