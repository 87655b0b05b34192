//! Simulated participants for dry runs of a timeline.

use crate::timeline::TrialSpec;
use cogex_core::{AnimationConfig, Choices, SequenceReps};
use rand::Rng;
use std::time::Duration;

/// Plans the key presses of one trial, relative to its start
pub trait Responder {
    fn plan(&mut self, trial: &TrialSpec) -> Vec<(Duration, String)>;
}

/// Keys tried when a trial accepts any key and a wrong answer is needed
const FALLBACK_KEYS: [&str; 6] = ["f", "j", "d", "k", " ", "a"];

/// Answers correctly with probability `accuracy`, after a response time drawn
/// uniformly from half to one and a half times `mean_rt`, counted from the
/// first moment a response is accepted.
#[derive(Debug, Clone)]
pub struct SimulatedResponder<R: Rng> {
    rng: R,
    pub accuracy: f64,
    pub mean_rt: Duration,
}

impl<R: Rng> SimulatedResponder<R> {
    pub fn new(rng: R, accuracy: f64, mean_rt: Duration) -> Self {
        Self {
            rng,
            accuracy: accuracy.clamp(0.0, 1.0),
            mean_rt,
        }
    }

    fn response_time(&mut self) -> Duration {
        let mean = self.mean_rt.as_secs_f64();
        if mean <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.rng.random_range(mean * 0.5..mean * 1.5))
    }

    fn pick_key(&mut self, config: &AnimationConfig) -> String {
        if self.rng.random_bool(self.accuracy) {
            return config.key_answer.clone();
        }
        let wrong: Vec<&str> = match &config.choices {
            Choices::Keys(keys) => keys
                .iter()
                .map(String::as_str)
                .filter(|k| *k != config.key_answer)
                .collect(),
            Choices::All => FALLBACK_KEYS
                .iter()
                .copied()
                .filter(|k| *k != config.key_answer)
                .collect(),
            Choices::None => Vec::new(),
        };
        if wrong.is_empty() {
            return config.key_answer.clone();
        }
        wrong[self.rng.random_range(0..wrong.len())].to_string()
    }
}

/// Earliest offset from trial start at which a key is scored
pub fn earliest_response(config: &AnimationConfig) -> Duration {
    if config.allow_response_before_complete {
        return Duration::ZERO;
    }
    match config.sequence_reps {
        SequenceReps::Times(reps) => {
            config.frame_time() * (config.stimuli.len() as u32).saturating_mul(reps)
        }
        // Never accepted; the press is planned anyway and will be ignored.
        SequenceReps::Unbounded => Duration::ZERO,
    }
}

impl<R: Rng> Responder for SimulatedResponder<R> {
    fn plan(&mut self, trial: &TrialSpec) -> Vec<(Duration, String)> {
        match trial {
            TrialSpec::CategorizeAnimation(config) => {
                let at = earliest_response(config) + self.response_time();
                vec![(at, self.pick_key(config))]
            }
            TrialSpec::Scene(_) => Vec::new(),
        }
    }
}

/// Presses the same keys at the same offsets in every trial
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptedResponder {
    pub presses: Vec<(Duration, String)>,
}

impl ScriptedResponder {
    pub fn new(presses: Vec<(Duration, String)>) -> Self {
        Self { presses }
    }
}

impl Responder for ScriptedResponder {
    fn plan(&mut self, _trial: &TrialSpec) -> Vec<(Duration, String)> {
        self.presses.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn animation() -> AnimationConfig {
        AnimationConfig::new(["a", "b", "c"], "j")
            .with_frame_time_ms(100)
            .with_sequence_reps(SequenceReps::Times(2))
            .with_choices(Choices::keys(["f", "j"]))
    }

    #[test]
    fn earliest_response_waits_for_the_animation() {
        assert_eq!(earliest_response(&animation()), Duration::from_millis(600));
        let eager = animation().with_response_before_complete(true);
        assert_eq!(earliest_response(&eager), Duration::ZERO);
    }

    #[test]
    fn perfect_responder_always_answers_correctly() {
        let rng = StdRng::seed_from_u64(7);
        let mut r = SimulatedResponder::new(rng, 1.0, Duration::from_millis(400));
        for _ in 0..20 {
            let plan = r.plan(&TrialSpec::CategorizeAnimation(animation()));
            assert_eq!(plan.len(), 1);
            let (at, key) = &plan[0];
            assert_eq!(key, "j");
            assert!(*at >= Duration::from_millis(800) && *at < Duration::from_millis(1200));
        }
    }

    #[test]
    fn wrong_answers_come_from_the_choices() {
        let rng = StdRng::seed_from_u64(7);
        let mut r = SimulatedResponder::new(rng, 0.0, Duration::from_millis(400));
        let plan = r.plan(&TrialSpec::CategorizeAnimation(animation()));
        assert_eq!(plan[0].1, "f");
    }

    #[test]
    fn scenes_need_no_keys() {
        let rng = StdRng::seed_from_u64(1);
        let mut r = SimulatedResponder::new(rng, 0.5, Duration::from_millis(400));
        let scene = TrialSpec::Scene(cogex_core::SceneConfig::new(vec![]));
        assert!(r.plan(&scene).is_empty());
    }
}
