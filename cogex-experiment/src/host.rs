//! Capabilities a trial runner lends to a plugin for the length of one trial.

use cogex_core::{Choices, KeyPolicy, TrialRecord};
use cogex_render::{ImageStore, Mount};
use cogex_timing::TimerId;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyListenerOptions {
    pub choices: Choices,
    /// Keep listening after the first accepted key
    pub persist: bool,
    /// Deliver auto-repeat events of a key that is held down
    pub allow_held_key: bool,
}

/// A key press as delivered to a plugin
#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    pub key: String,
    /// Time since the listener was registered
    pub rt: Duration,
}

impl KeyEvent {
    pub fn rt_ms(&self) -> f64 {
        self.rt.as_nanos() as f64 / 1e6
    }
}

#[derive(Debug)]
struct Listener {
    options: KeyListenerOptions,
    registered_at: Duration,
}

/// Listener bookkeeping shared by the hosts
#[derive(Debug, Default)]
pub struct KeyListeners {
    listeners: BTreeMap<ListenerId, Listener>,
    next: u64,
}

impl KeyListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, options: KeyListenerOptions, now: Duration) -> ListenerId {
        let id = ListenerId(self.next);
        self.next += 1;
        self.listeners.insert(
            id,
            Listener {
                options,
                registered_at: now,
            },
        );
        id
    }

    pub fn deregister(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Listeners that would take this key press, in registration order
    pub fn targets(&self, key: &str, repeat: bool, policy: &KeyPolicy) -> Vec<ListenerId> {
        self.listeners
            .iter()
            .filter(|(_, l)| {
                (!repeat || l.options.allow_held_key) && l.options.choices.accepts(key, policy)
            })
            .map(|(id, _)| *id)
            .collect()
    }

    /// Builds the event for one target. Returns `None` if the listener went
    /// away in the meantime; one-shot listeners are removed here.
    pub fn take_event(&mut self, id: ListenerId, key: &str, now: Duration) -> Option<KeyEvent> {
        let listener = self.listeners.get(&id)?;
        let event = KeyEvent {
            key: key.to_string(),
            rt: now.saturating_sub(listener.registered_at),
        };
        if !listener.options.persist {
            self.listeners.remove(&id);
        }
        Some(event)
    }
}

/// Drawing targets of the running trial
pub struct Display<'a> {
    pub mount: &'a mut Mount,
    pub images: &'a ImageStore,
}

/// Everything a plugin may ask of the runner.
///
/// Timer and key callbacks come back through [`Plugin::on_timer`] and
/// [`Plugin::on_key`], never concurrently. Once a listener is deregistered
/// no further events reach it, including ones already queued.
///
/// [`Plugin::on_timer`]: crate::Plugin::on_timer
/// [`Plugin::on_key`]: crate::Plugin::on_key
pub trait Host {
    /// Host clock, offset from when the host was created
    fn now(&self) -> Duration;

    fn schedule_once(&mut self, delay: Duration) -> TimerId;

    fn schedule_repeating(&mut self, interval: Duration) -> TimerId;

    fn cancel_timer(&mut self, timer: TimerId);

    fn register_key_listener(&mut self, options: KeyListenerOptions) -> ListenerId;

    fn deregister_key_listener(&mut self, listener: ListenerId);

    /// Key equality under the host's policy
    fn compare_keys(&self, expected: &str, observed: &str) -> bool;

    fn display(&mut self) -> Display<'_>;

    /// Ends the trial. Called exactly once per trial.
    fn finish_trial(&mut self, record: TrialRecord);
}
