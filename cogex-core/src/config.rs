use crate::keys::Choices;
use crate::stimulus::{Cell, ImageRef};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors reported when a trial definition is loaded from a file
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("stimuli must contain at least one image")]
    EmptySequence,
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("sequence_reps must be -1 or at least 1")]
    ZeroRepetitions,
    #[error("scene row {row} has {found} cells, expected {expected}")]
    RaggedScene {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("image_size must be two positive numbers")]
    InvalidImageSize,
}

/// How many times the stimulus sequence is played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum SequenceReps {
    Times(u32),
    /// Plays until a response ends the trial
    Unbounded,
}

impl SequenceReps {
    pub fn is_reached(&self, reps: u32) -> bool {
        match self {
            SequenceReps::Times(target) => reps >= *target,
            SequenceReps::Unbounded => false,
        }
    }
}

impl Default for SequenceReps {
    fn default() -> Self {
        SequenceReps::Times(1)
    }
}

impl From<i64> for SequenceReps {
    fn from(n: i64) -> Self {
        if n < 0 {
            SequenceReps::Unbounded
        } else {
            SequenceReps::Times(n.min(u32::MAX as i64) as u32)
        }
    }
}

impl From<SequenceReps> for i64 {
    fn from(reps: SequenceReps) -> Self {
        match reps {
            SequenceReps::Times(n) => n as i64,
            SequenceReps::Unbounded => -1,
        }
    }
}

/// How animation frames reach the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Frames are painted into an offscreen pixel buffer
    Canvas,
    /// Frames are written as `<img>` markup
    Markup,
}

/// Parameters of one categorize-animation trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationConfig {
    pub stimuli: Vec<ImageRef>,
    pub key_answer: String,
    #[serde(default)]
    pub choices: Choices,
    #[serde(default)]
    pub text_answer: String,
    #[serde(default = "default_correct_text")]
    pub correct_text: String,
    #[serde(default = "default_incorrect_text")]
    pub incorrect_text: String,
    #[serde(rename = "frame_time", default = "default_frame_time")]
    pub frame_time_ms: u64,
    #[serde(default)]
    pub sequence_reps: SequenceReps,
    #[serde(default)]
    pub allow_response_before_complete: bool,
    #[serde(rename = "feedback_duration", default = "default_feedback_duration")]
    pub feedback_duration_ms: u64,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default = "default_true")]
    pub render_on_canvas: bool,
}

fn default_correct_text() -> String {
    "Correct.".to_string()
}

fn default_incorrect_text() -> String {
    "Wrong.".to_string()
}

fn default_frame_time() -> u64 {
    500
}

fn default_feedback_duration() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

impl AnimationConfig {
    pub fn new<I, S>(stimuli: I, key_answer: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ImageRef>,
    {
        Self {
            stimuli: stimuli.into_iter().map(Into::into).collect(),
            key_answer: key_answer.into(),
            choices: Choices::All,
            text_answer: String::new(),
            correct_text: default_correct_text(),
            incorrect_text: default_incorrect_text(),
            frame_time_ms: default_frame_time(),
            sequence_reps: SequenceReps::default(),
            allow_response_before_complete: false,
            feedback_duration_ms: default_feedback_duration(),
            prompt: None,
            render_on_canvas: true,
        }
    }

    #[must_use]
    pub fn with_choices(mut self, choices: Choices) -> Self {
        self.choices = choices;
        self
    }

    #[must_use]
    pub fn with_text_answer(mut self, answer: impl Into<String>) -> Self {
        self.text_answer = answer.into();
        self
    }

    #[must_use]
    pub fn with_feedback_text(
        mut self,
        correct: impl Into<String>,
        incorrect: impl Into<String>,
    ) -> Self {
        self.correct_text = correct.into();
        self.incorrect_text = incorrect.into();
        self
    }

    #[must_use]
    pub fn with_frame_time_ms(mut self, ms: u64) -> Self {
        self.frame_time_ms = ms;
        self
    }

    #[must_use]
    pub fn with_sequence_reps(mut self, reps: SequenceReps) -> Self {
        self.sequence_reps = reps;
        self
    }

    #[must_use]
    pub fn with_response_before_complete(mut self, allow: bool) -> Self {
        self.allow_response_before_complete = allow;
        self
    }

    #[must_use]
    pub fn with_feedback_duration_ms(mut self, ms: u64) -> Self {
        self.feedback_duration_ms = ms;
        self
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    #[must_use]
    pub fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.render_on_canvas = mode == RenderMode::Canvas;
        self
    }

    pub fn render_mode(&self) -> RenderMode {
        if self.render_on_canvas {
            RenderMode::Canvas
        } else {
            RenderMode::Markup
        }
    }

    pub fn frame_time(&self) -> Duration {
        Duration::from_millis(self.frame_time_ms)
    }

    pub fn feedback_duration(&self) -> Duration {
        Duration::from_millis(self.feedback_duration_ms)
    }

    /// Checks a definition read from outside the program. Plugins themselves
    /// assume their configuration is valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stimuli.is_empty() {
            return Err(ConfigError::EmptySequence);
        }
        if self.frame_time_ms == 0 {
            return Err(ConfigError::ZeroDuration("frame_time"));
        }
        if self.sequence_reps == SequenceReps::Times(0) {
            return Err(ConfigError::ZeroRepetitions);
        }
        Ok(())
    }
}

/// Parameters of one static scene trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    pub stimuli: Vec<Vec<Cell>>,
    #[serde(default = "default_image_size")]
    pub image_size: [u32; 2],
    #[serde(rename = "trial_duration", default = "default_scene_duration")]
    pub trial_duration_ms: u64,
}

fn default_image_size() -> [u32; 2] {
    [100, 100]
}

fn default_scene_duration() -> u64 {
    2000
}

impl SceneConfig {
    pub fn new(stimuli: Vec<Vec<Cell>>) -> Self {
        Self {
            stimuli,
            image_size: default_image_size(),
            trial_duration_ms: default_scene_duration(),
        }
    }

    #[must_use]
    pub fn with_image_size(mut self, width: u32, height: u32) -> Self {
        self.image_size = [width, height];
        self
    }

    #[must_use]
    pub fn with_trial_duration_ms(mut self, ms: u64) -> Self {
        self.trial_duration_ms = ms;
        self
    }

    pub fn trial_duration(&self) -> Duration {
        Duration::from_millis(self.trial_duration_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image_size.contains(&0) {
            return Err(ConfigError::InvalidImageSize);
        }
        if self.trial_duration_ms == 0 {
            return Err(ConfigError::ZeroDuration("trial_duration"));
        }
        if let Some(first) = self.stimuli.first() {
            let expected = first.len();
            for (row, cells) in self.stimuli.iter().enumerate() {
                if cells.len() != expected {
                    return Err(ConfigError::RaggedScene {
                        row,
                        found: cells.len(),
                        expected,
                    });
                }
            }
        }
        Ok(())
    }
}
