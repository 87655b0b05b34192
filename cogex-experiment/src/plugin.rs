use crate::host::{Host, KeyEvent, ListenerId};
use cogex_core::PluginInfo;
use cogex_timing::TimerId;

/// A trial type the runner can execute
pub trait Plugin {
    fn info(&self) -> &'static PluginInfo;

    /// Mounts the trial and arms whatever timers and listeners it needs
    fn start(&mut self, host: &mut dyn Host);

    fn on_timer(&mut self, timer: TimerId, host: &mut dyn Host);

    fn on_key(&mut self, _listener: ListenerId, _event: &KeyEvent, _host: &mut dyn Host) {}

    fn is_finished(&self) -> bool;
}
