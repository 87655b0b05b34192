pub mod animation;
pub mod config;
pub mod host;
pub mod plugin;
pub mod scene;
pub mod simulate;
pub mod timeline;
pub mod virtual_host;

pub use animation::{ANIMATION_INFO, AnimationTrial, RunState};
pub use config::RunConfig;
pub use host::{Display, Host, KeyEvent, KeyListenerOptions, KeyListeners, ListenerId};
pub use plugin::Plugin;
pub use scene::{SCENE_INFO, SceneTrial};
pub use simulate::{Responder, ScriptedResponder, SimulatedResponder, earliest_response};
pub use timeline::{Timeline, TimelineError, TimelineRecord, TrialSpec};
pub use virtual_host::{HostError, HostStats, KeyPress, VirtualHost};

/// Parameter tables of every plugin this crate provides
pub fn plugins() -> [&'static cogex_core::PluginInfo; 2] {
    [&ANIMATION_INFO, &SCENE_INFO]
}
