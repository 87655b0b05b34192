pub mod config;
pub mod feedback;
pub mod keys;
pub mod params;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use config::{AnimationConfig, ConfigError, RenderMode, SceneConfig, SequenceReps};
pub use feedback::{ANSWER_TOKEN, render_feedback};
pub use keys::{Choices, KeyPolicy};
pub use params::{ParameterInfo, ParameterKind, PluginInfo};
pub use phase::AnimationPhase;
pub use stimulus::{Cell, ImageRef, Stimulus};
pub use trial::{Response, TrialRecord};
