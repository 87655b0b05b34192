//! Deterministic host running trials on virtual time.
//!
//! Timers and scripted key presses are merged on one timeline. At equal
//! timestamps timers fire before keys. Time jumps straight to the next event,
//! so a trial of several seconds runs in microseconds.

use crate::config::RunConfig;
use crate::host::{Display, Host, KeyListenerOptions, KeyListeners, ListenerId};
use crate::plugin::Plugin;
use cogex_core::{KeyPolicy, TrialRecord};
use cogex_render::{ImageStore, Mount};
use cogex_timing::{Timer, TimerId, TimerQueue, VirtualClock};
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("trial did not finish within {steps} events")]
    StepLimit { steps: usize },
    #[error("trial is waiting with nothing scheduled at {at:?}")]
    Stalled { at: Duration },
}

/// A key press queued for delivery at an absolute host time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub at: Duration,
    pub key: String,
    /// Auto-repeat of a held key
    pub repeat: bool,
}

/// Counters tests use to check the host contract
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    pub once_armed: usize,
    pub repeating_armed: usize,
    pub timers_cancelled: usize,
    pub listeners_registered: usize,
    pub listeners_deregistered: usize,
    pub keys_delivered: usize,
    pub keys_dropped: usize,
    pub finish_calls: usize,
}

pub struct VirtualHost {
    clock: VirtualClock,
    timers: TimerQueue,
    listeners: KeyListeners,
    keys: VecDeque<KeyPress>,
    key_policy: KeyPolicy,
    mount: Mount,
    images: ImageStore,
    finished: Option<TrialRecord>,
    step_limit: usize,
    stats: HostStats,
}

impl VirtualHost {
    pub fn new(config: &RunConfig) -> Self {
        let images = match &config.image_dir {
            Some(dir) => ImageStore::with_base_dir(dir),
            None => ImageStore::new(),
        };
        Self {
            clock: VirtualClock::new(),
            timers: TimerQueue::new(),
            listeners: KeyListeners::new(),
            keys: VecDeque::new(),
            key_policy: config.key_policy,
            mount: Mount::new(config.display_width, config.display_height),
            images,
            finished: None,
            step_limit: config.step_limit,
            stats: HostStats::default(),
        }
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    pub fn mount(&self) -> &Mount {
        &self.mount
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    pub fn images_mut(&mut self) -> &mut ImageStore {
        &mut self.images
    }

    pub fn stats(&self) -> HostStats {
        self.stats
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Queues a key press at absolute host time `at`
    pub fn press_at(&mut self, at: Duration, key: impl Into<String>) {
        self.queue_key(KeyPress {
            at,
            key: key.into(),
            repeat: false,
        });
    }

    /// Queues a key press `delay` after the current host time
    pub fn press_after(&mut self, delay: Duration, key: impl Into<String>) {
        let at = self.now() + delay;
        self.press_at(at, key);
    }

    pub fn queue_key(&mut self, press: KeyPress) {
        let idx = self.keys.partition_point(|k| k.at <= press.at);
        self.keys.insert(idx, press);
    }

    /// Lets virtual time pass with no trial running
    pub fn idle(&mut self, d: Duration) {
        self.clock.sleep(d);
        self.drop_keys_before(self.now());
    }

    /// Starts `plugin` on this host
    pub fn start(&mut self, plugin: &mut dyn Plugin) {
        self.finished = None;
        debug!(plugin = plugin.info().name, at = ?self.now(), "starting trial");
        plugin.start(self);
    }

    /// Processes events up to and including `until`. Returns the record if
    /// the trial ended on the way; the clock is left at `until` otherwise.
    pub fn run_until(
        &mut self,
        plugin: &mut dyn Plugin,
        until: Duration,
    ) -> Result<Option<TrialRecord>, HostError> {
        if let Some(record) = self.take_finished() {
            return Ok(Some(record));
        }
        let mut steps = 0;
        loop {
            if !self.step(plugin, Some(until)) {
                self.clock.advance_to(until);
                return Ok(None);
            }
            if let Some(record) = self.take_finished() {
                return Ok(Some(record));
            }
            steps += 1;
            if steps >= self.step_limit {
                return Err(HostError::StepLimit { steps });
            }
        }
    }

    /// Starts `plugin` and runs it until it finishes
    pub fn run_trial(&mut self, plugin: &mut dyn Plugin) -> Result<TrialRecord, HostError> {
        self.start(plugin);
        if let Some(record) = self.take_finished() {
            return Ok(record);
        }
        let mut steps = 0;
        loop {
            if !self.step(plugin, None) {
                return Err(HostError::Stalled { at: self.now() });
            }
            if let Some(record) = self.take_finished() {
                return Ok(record);
            }
            steps += 1;
            if steps >= self.step_limit {
                self.reset_trial_resources();
                return Err(HostError::StepLimit { steps });
            }
        }
    }

    /// Fires the next timer or key press, if any is due by `until`
    fn step(&mut self, plugin: &mut dyn Plugin, until: Option<Duration>) -> bool {
        let timer_at = self.timers.next_deadline();
        let key_at = self.keys.front().map(|k| k.at);
        let next = match (timer_at, key_at) {
            (Some(t), Some(k)) => t.min(k),
            (Some(t), None) => t,
            (None, Some(k)) => k,
            (None, None) => return false,
        };
        if until.is_some_and(|u| next > u) {
            return false;
        }
        self.clock.advance_to(next);

        if timer_at == Some(next) {
            if let Some((timer, _)) = self.timers.pop_due(next) {
                trace!(%timer, at = ?next, "timer fired");
                plugin.on_timer(timer, self);
            }
        } else if let Some(press) = self.keys.pop_front() {
            self.deliver(plugin, press);
        }
        true
    }

    fn deliver(&mut self, plugin: &mut dyn Plugin, press: KeyPress) {
        let now = self.now();
        let targets = self
            .listeners
            .targets(&press.key, press.repeat, &self.key_policy);
        if targets.is_empty() {
            trace!(key = %press.key, "key press with no listener");
            self.stats.keys_dropped += 1;
            return;
        }
        for id in targets {
            // An earlier listener's callback may have deregistered this one.
            let Some(event) = self.listeners.take_event(id, &press.key, now) else {
                continue;
            };
            self.stats.keys_delivered += 1;
            plugin.on_key(id, &event, self);
        }
    }

    fn take_finished(&mut self) -> Option<TrialRecord> {
        let record = self.finished.take()?;
        self.reset_trial_resources();
        Some(record)
    }

    /// Timers, listeners and key presses do not outlive their trial
    fn reset_trial_resources(&mut self) {
        self.timers.clear();
        self.listeners.clear();
        self.mount.clear();
        if !self.keys.is_empty() {
            trace!(keys = self.keys.len(), "dropping key presses queued past trial end");
            self.stats.keys_dropped += self.keys.len();
            self.keys.clear();
        }
    }

    fn drop_keys_before(&mut self, t: Duration) {
        while self.keys.front().is_some_and(|k| k.at < t) {
            self.keys.pop_front();
        }
    }
}

impl Host for VirtualHost {
    fn now(&self) -> Duration {
        self.clock.since_start()
    }

    fn schedule_once(&mut self, delay: Duration) -> TimerId {
        self.stats.once_armed += 1;
        self.timers.schedule_once(self.now(), delay)
    }

    fn schedule_repeating(&mut self, interval: Duration) -> TimerId {
        self.stats.repeating_armed += 1;
        self.timers.schedule_repeating(self.now(), interval)
    }

    fn cancel_timer(&mut self, timer: TimerId) {
        if self.timers.cancel(timer) {
            self.stats.timers_cancelled += 1;
        }
    }

    fn register_key_listener(&mut self, options: KeyListenerOptions) -> ListenerId {
        let id = self.listeners.register(options, self.now());
        self.stats.listeners_registered += 1;
        id
    }

    fn deregister_key_listener(&mut self, listener: ListenerId) {
        if self.listeners.deregister(listener) {
            self.stats.listeners_deregistered += 1;
        }
    }

    fn compare_keys(&self, expected: &str, observed: &str) -> bool {
        self.key_policy.matches(expected, observed)
    }

    fn display(&mut self) -> Display<'_> {
        Display {
            mount: &mut self.mount,
            images: &self.images,
        }
    }

    fn finish_trial(&mut self, record: TrialRecord) {
        self.stats.finish_calls += 1;
        debug!(plugin = record.plugin_name(), at = ?self.now(), "trial finished");
        self.finished = Some(record);
    }
}
