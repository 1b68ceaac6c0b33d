//! Cooking session state machine
//!
//! One guided walkthrough of a recipe. Progress is a per-step status array
//! plus the index of the step being cooked, so completed steps can never
//! fall outside the recipe. Transitions return outcomes; speaking them and
//! emitting events is the engine's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::duration::parse_duration;
use crate::error::EngineError;
use crate::recipe::{Recipe, Step};

/// Identifier of a cooking session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stored progress of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    Done,
}

/// Presented state of a step; the current step shows as `Current`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Current,
    Done,
}

/// Outcome of a next/previous request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMove {
    Moved { index: usize },
    AtFirst,
    AtLast,
}

/// Outcome of marking the current step complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The step was marked done and the session moved on
    Advanced { completed: usize, index: usize },
    /// The final step was marked done; the recipe is finished
    Finished { completed: usize },
    /// The recipe had already been finished
    AlreadyFinished,
}

/// Serialisable snapshot of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: SessionId,
    pub recipe_id: String,
    pub title: String,
    pub current_step: usize,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub completion_ratio: f32,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// A recipe being cooked
#[derive(Debug, Clone)]
pub struct CookingSession {
    id: SessionId,
    recipe: Arc<Recipe>,
    current: usize,
    status: Vec<StepStatus>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl CookingSession {
    /// Start cooking `recipe` now
    pub fn new(recipe: Arc<Recipe>) -> Result<Self, EngineError> {
        Self::started_at(recipe, Utc::now())
    }

    /// Start cooking `recipe` with an explicit start time
    pub fn started_at(recipe: Arc<Recipe>, started_at: DateTime<Utc>) -> Result<Self, EngineError> {
        if recipe.is_empty() {
            return Err(EngineError::EmptyRecipe(recipe.id.clone()));
        }

        Ok(Self {
            id: SessionId::new(),
            status: vec![StepStatus::Pending; recipe.len()],
            recipe,
            current: 0,
            started_at,
            finished_at: None,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub fn started(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Index of the step being cooked
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> &Step {
        &self.recipe.steps[self.current]
    }

    pub fn total_steps(&self) -> usize {
        self.status.len()
    }

    pub fn is_first_step(&self) -> bool {
        self.current == 0
    }

    pub fn is_last_step(&self) -> bool {
        self.current + 1 == self.status.len()
    }

    /// Advance to the next step unless already on the last one
    pub fn next(&mut self) -> StepMove {
        if self.is_last_step() {
            return StepMove::AtLast;
        }
        self.current += 1;
        StepMove::Moved {
            index: self.current,
        }
    }

    /// Go back one step unless already on the first one
    pub fn previous(&mut self) -> StepMove {
        if self.is_first_step() {
            return StepMove::AtFirst;
        }
        self.current -= 1;
        StepMove::Moved {
            index: self.current,
        }
    }

    /// Mark the current step done, moving on or finishing the recipe
    pub fn mark_complete(&mut self) -> CompletionOutcome {
        self.mark_complete_at(Utc::now())
    }

    pub fn mark_complete_at(&mut self, now: DateTime<Utc>) -> CompletionOutcome {
        let completed = self.current;
        self.status[completed] = StepStatus::Done;

        if !self.is_last_step() {
            self.current += 1;
            return CompletionOutcome::Advanced {
                completed,
                index: self.current,
            };
        }

        if self.finished_at.is_some() {
            return CompletionOutcome::AlreadyFinished;
        }
        self.finished_at = Some(now);
        CompletionOutcome::Finished { completed }
    }

    /// Presented state of step `index`
    pub fn step_state(&self, index: usize) -> Option<StepState> {
        let status = self.status.get(index)?;
        Some(if index == self.current {
            StepState::Current
        } else {
            match status {
                StepStatus::Pending => StepState::Pending,
                StepStatus::Done => StepState::Done,
            }
        })
    }

    pub fn step_states(&self) -> Vec<StepState> {
        (0..self.status.len())
            .filter_map(|i| self.step_state(i))
            .collect()
    }

    /// Whether step `index` has been marked done
    pub fn is_step_done(&self, index: usize) -> bool {
        self.status.get(index) == Some(&StepStatus::Done)
    }

    /// Indices of completed steps, ascending
    pub fn completed_indices(&self) -> Vec<usize> {
        self.status
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == StepStatus::Done)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn completed_count(&self) -> usize {
        self.status
            .iter()
            .filter(|s| **s == StepStatus::Done)
            .count()
    }

    /// Completed steps over total steps
    pub fn completion_ratio(&self) -> f32 {
        self.completed_count() as f32 / self.status.len() as f32
    }

    /// Countdown length for the current step
    ///
    /// The explicit duration text wins over the instruction text.
    pub fn current_duration_seconds(&self) -> Option<u32> {
        let step = self.current_step();
        step.duration
            .as_deref()
            .and_then(parse_duration)
            .or_else(|| parse_duration(&step.instruction))
    }

    /// Whole minutes spent cooking, rounded, never less than one
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> u32 {
        let end = self.finished_at.unwrap_or(now);
        let seconds = (end - self.started_at).num_seconds().max(0);
        let minutes = (seconds + 30) / 60;
        u32::try_from(minutes).unwrap_or(u32::MAX).max(1)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            recipe_id: self.recipe.id.clone(),
            title: self.recipe.title.clone(),
            current_step: self.current,
            total_steps: self.status.len(),
            completed_steps: self.completed_count(),
            completion_ratio: self.completion_ratio(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}
