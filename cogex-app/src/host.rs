//! Wall-clock host for the windowed runner.
//!
//! The event loop calls [`WindowHost::poll`] on every redraw to fire due
//! timers and [`WindowHost::key`] for each key press. A poll only blocks to
//! sleep through a deadline less than [`SLEEP_AHEAD`] away.

use cogex_core::{KeyPolicy, TrialRecord};
use cogex_experiment::{
    Display, Host, KeyListenerOptions, KeyListeners, ListenerId, Plugin, RunConfig,
};
use cogex_render::{ImageStore, Mount};
use cogex_timing::{HighPrecisionTimer, Timer, TimerId, TimerQueue};
use std::time::Duration;
use tracing::{debug, trace};

/// Deadlines at most this far off are slept to instead of waiting a redraw
pub const SLEEP_AHEAD: Duration = Duration::from_millis(2);

pub struct WindowHost {
    clock: HighPrecisionTimer,
    timers: TimerQueue,
    listeners: KeyListeners,
    key_policy: KeyPolicy,
    mount: Mount,
    images: ImageStore,
    finished: Option<TrialRecord>,
}

impl WindowHost {
    pub fn new(config: &RunConfig, images: ImageStore) -> Self {
        Self {
            clock: HighPrecisionTimer::new(),
            timers: TimerQueue::new(),
            listeners: KeyListeners::new(),
            key_policy: config.key_policy,
            mount: Mount::new(config.display_width, config.display_height),
            images,
            finished: None,
        }
    }

    pub fn clock(&self) -> &HighPrecisionTimer {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut HighPrecisionTimer {
        &mut self.clock
    }

    pub fn mount(&self) -> &Mount {
        &self.mount
    }

    pub fn mount_mut(&mut self) -> &mut Mount {
        &mut self.mount
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    pub fn start(&mut self, plugin: &mut dyn Plugin) {
        self.finished = None;
        debug!(plugin = plugin.info().name, at = ?self.now(), "starting trial");
        plugin.start(self);
    }

    /// Fires every timer that is due. Returns the record once the trial ends.
    /// A repeating timer that fell several ticks behind fires only once.
    pub fn poll(&mut self, plugin: &mut dyn Plugin) -> Option<TrialRecord> {
        self.sleep_to_imminent_deadline();
        let now = self.now();
        while self.finished.is_none() {
            let Some((timer, deadline)) = self.timers.pop_due_coalesced(now) else {
                break;
            };
            let late = now.saturating_sub(deadline);
            trace!(%timer, late_us = late.as_micros() as u64, "timer fired");
            plugin.on_timer(timer, self);
        }
        self.take_finished()
    }

    pub fn key(
        &mut self,
        plugin: &mut dyn Plugin,
        key: &str,
        repeat: bool,
    ) -> Option<TrialRecord> {
        let now = self.now();
        for id in self.listeners.targets(key, repeat, &self.key_policy) {
            if let Some(event) = self.listeners.take_event(id, key, now) {
                plugin.on_key(id, &event, self);
            }
        }
        self.take_finished()
    }

    fn sleep_to_imminent_deadline(&mut self) {
        let Some(deadline) = self.timers.next_deadline() else {
            return;
        };
        let ahead = deadline.saturating_sub(self.now());
        if !ahead.is_zero() && ahead <= SLEEP_AHEAD {
            trace!(ahead_us = ahead.as_micros() as u64, "sleeping to deadline");
            self.clock.sleep(ahead);
        }
    }

    fn take_finished(&mut self) -> Option<TrialRecord> {
        let record = self.finished.take()?;
        self.timers.clear();
        self.listeners.clear();
        self.mount.clear();
        Some(record)
    }
}

impl Host for WindowHost {
    fn now(&self) -> Duration {
        self.clock.since_start()
    }

    fn schedule_once(&mut self, delay: Duration) -> TimerId {
        self.timers.schedule_once(self.now(), delay)
    }

    fn schedule_repeating(&mut self, interval: Duration) -> TimerId {
        self.timers.schedule_repeating(self.now(), interval)
    }

    fn cancel_timer(&mut self, timer: TimerId) {
        self.timers.cancel(timer);
    }

    fn register_key_listener(&mut self, options: KeyListenerOptions) -> ListenerId {
        self.listeners.register(options, self.now())
    }

    fn deregister_key_listener(&mut self, listener: ListenerId) {
        self.listeners.deregister(listener);
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
        debug!(plugin = record.plugin_name(), at = ?self.now(), "trial finished");
        self.finished = Some(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogex_core::PluginInfo;

    static TICKER_INFO: PluginInfo = PluginInfo {
        name: "ticker",
        parameters: &[],
    };

    /// Arms one timer on start and ends after `ticks_to_finish` fires
    struct Ticker {
        interval: Duration,
        repeating: bool,
        ticks: usize,
        ticks_to_finish: usize,
    }

    impl Ticker {
        fn once(delay: Duration) -> Self {
            Self {
                interval: delay,
                repeating: false,
                ticks: 0,
                ticks_to_finish: 1,
            }
        }

        fn repeating(interval: Duration) -> Self {
            Self {
                interval,
                repeating: true,
                ticks: 0,
                ticks_to_finish: usize::MAX,
            }
        }
    }

    impl Plugin for Ticker {
        fn info(&self) -> &'static PluginInfo {
            &TICKER_INFO
        }

        fn start(&mut self, host: &mut dyn Host) {
            if self.repeating {
                host.schedule_repeating(self.interval);
            } else {
                host.schedule_once(self.interval);
            }
        }

        fn on_timer(&mut self, _timer: TimerId, host: &mut dyn Host) {
            self.ticks += 1;
            if self.ticks == self.ticks_to_finish {
                host.finish_trial(TrialRecord::Scene { stimulus: vec![] });
            }
        }

        fn is_finished(&self) -> bool {
            self.ticks >= self.ticks_to_finish
        }
    }

    fn host() -> WindowHost {
        WindowHost::new(&RunConfig::default(), ImageStore::new())
    }

    #[test]
    fn poll_sleeps_through_an_imminent_deadline() {
        let mut host = host();
        let mut ticker = Ticker::once(Duration::from_millis(1));
        host.start(&mut ticker);
        let record = host.poll(&mut ticker);
        assert_eq!(record, Some(TrialRecord::Scene { stimulus: vec![] }));
        assert!(host.now() >= Duration::from_millis(1));
    }

    #[test]
    fn distant_deadlines_wait_for_a_later_poll() {
        let mut host = host();
        let mut ticker = Ticker::once(Duration::from_secs(5));
        host.start(&mut ticker);
        assert_eq!(host.poll(&mut ticker), None);
        assert_eq!(ticker.ticks, 0);
        assert!(host.now() < Duration::from_secs(5));
    }

    #[test]
    fn a_stalled_ticker_fires_once_per_poll() {
        let mut host = host();
        let mut ticker = Ticker::repeating(Duration::from_millis(5));
        host.start(&mut ticker);
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(host.poll(&mut ticker), None);
        assert_eq!(ticker.ticks, 1);
    }
}
