//! Categorize-animation trial.
//!
//! A repeating tick steps through the stimulus frames. Once the sequence has
//! played the configured number of times the tick keeps firing, and from then
//! on it only drives display changes: revealing the prompt, taking the
//! stimulus down, and after a response, drawing feedback and arming the
//! end-of-trial timer. The tick is cancelled only when the trial ends.

use crate::host::{Host, KeyEvent, KeyListenerOptions, ListenerId};
use crate::plugin::Plugin;
use cogex_core::{
    AnimationConfig, AnimationPhase, ParameterInfo, ParameterKind, PluginInfo, Response,
    TrialRecord, render_feedback,
};
use cogex_render::{FrameRenderer, renderer_for};
use cogex_timing::TimerId;
use tracing::{debug, info, trace};

pub static ANIMATION_INFO: PluginInfo = PluginInfo {
    name: "categorize-animation",
    parameters: &[
        ParameterInfo {
            name: "stimuli",
            pretty_name: "Stimuli",
            kind: ParameterKind::Image,
            default: None,
            array: true,
            description: "Images shown in order, one per frame",
        },
        ParameterInfo {
            name: "key_answer",
            pretty_name: "Key answer",
            kind: ParameterKind::Key,
            default: None,
            array: false,
            description: "Key that counts as a correct response",
        },
        ParameterInfo {
            name: "choices",
            pretty_name: "Choices",
            kind: ParameterKind::Key,
            default: Some("ALL_KEYS"),
            array: true,
            description: "Keys accepted as a response",
        },
        ParameterInfo {
            name: "text_answer",
            pretty_name: "Text answer",
            kind: ParameterKind::Html,
            default: Some(""),
            array: false,
            description: "Label substituted for %ANS% in the feedback",
        },
        ParameterInfo {
            name: "correct_text",
            pretty_name: "Correct text",
            kind: ParameterKind::Html,
            default: Some("Correct."),
            array: false,
            description: "Feedback after a correct response",
        },
        ParameterInfo {
            name: "incorrect_text",
            pretty_name: "Incorrect text",
            kind: ParameterKind::Html,
            default: Some("Wrong."),
            array: false,
            description: "Feedback after an incorrect response",
        },
        ParameterInfo {
            name: "frame_time",
            pretty_name: "Frame time",
            kind: ParameterKind::Int,
            default: Some("500"),
            array: false,
            description: "Milliseconds each frame stays on screen",
        },
        ParameterInfo {
            name: "sequence_reps",
            pretty_name: "Sequence repetitions",
            kind: ParameterKind::Int,
            default: Some("1"),
            array: false,
            description: "Times the sequence plays; -1 plays until a response",
        },
        ParameterInfo {
            name: "allow_response_before_complete",
            pretty_name: "Allow response before complete",
            kind: ParameterKind::Bool,
            default: Some("false"),
            array: false,
            description: "Accept a response while the animation is still playing",
        },
        ParameterInfo {
            name: "feedback_duration",
            pretty_name: "Feedback duration",
            kind: ParameterKind::Int,
            default: Some("2000"),
            array: false,
            description: "Milliseconds the feedback stays on screen",
        },
        ParameterInfo {
            name: "prompt",
            pretty_name: "Prompt",
            kind: ParameterKind::Html,
            default: Some("null"),
            array: false,
            description: "Markup shown once a response can be given",
        },
        ParameterInfo {
            name: "render_on_canvas",
            pretty_name: "Render on canvas",
            kind: ParameterKind::Bool,
            default: Some("true"),
            array: false,
            description: "Paint frames into a buffer instead of image markup",
        },
    ],
};

/// Mutable state of one running trial
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    /// Index of the frame on screen; -1 before the first tick
    pub frame: isize,
    /// Completed passes through the sequence
    pub reps: u32,
    pub animating: bool,
    pub responded: bool,
    pub correct: Option<bool>,
    pub response: Option<Response>,
    pub frames_drawn: usize,
    pub ticks: usize,
    tick: Option<TimerId>,
    listener: Option<ListenerId>,
    feedback_timer: Option<TimerId>,
    ended: bool,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            frame: -1,
            reps: 0,
            animating: true,
            responded: false,
            correct: None,
            response: None,
            frames_drawn: 0,
            ticks: 0,
            tick: None,
            listener: None,
            feedback_timer: None,
            ended: false,
        }
    }
}

impl RunState {
    pub fn phase(&self) -> AnimationPhase {
        if self.ended {
            AnimationPhase::Ended
        } else if self.feedback_timer.is_some() {
            AnimationPhase::FeedbackShown
        } else if self.responded {
            AnimationPhase::Responded
        } else if self.animating {
            AnimationPhase::Animating
        } else {
            AnimationPhase::AwaitingResponse
        }
    }

    pub fn feedback_armed(&self) -> bool {
        self.feedback_timer.is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }
}

pub struct AnimationTrial {
    config: AnimationConfig,
    renderer: Box<dyn FrameRenderer>,
    state: RunState,
}

impl std::fmt::Debug for AnimationTrial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationTrial")
            .field("config", &self.config)
            .field("mode", &self.renderer.mode())
            .field("state", &self.state)
            .finish()
    }
}

impl AnimationTrial {
    pub fn new(config: AnimationConfig) -> Self {
        let renderer = renderer_for(config.render_mode());
        Self {
            config,
            renderer,
            state: RunState::default(),
        }
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn phase(&self) -> AnimationPhase {
        self.state.phase()
    }

    /// Feedback for the recorded response, with the answer label filled in
    pub fn feedback_text(&self) -> Option<String> {
        let template = match self.state.correct? {
            true => &self.config.correct_text,
            false => &self.config.incorrect_text,
        };
        Some(render_feedback(template, &self.config.text_answer))
    }

    fn on_tick(&mut self, host: &mut dyn Host) {
        let state = &mut self.state;
        state.ticks += 1;

        if state.animating && !state.responded {
            state.frame += 1;
            if state.frame as usize == self.config.stimuli.len() {
                state.frame = 0;
                state.reps += 1;
                if self.config.sequence_reps.is_reached(state.reps) {
                    state.animating = false;
                    debug!(reps = state.reps, "animation complete");
                }
            }
        }

        let display = host.display();
        if state.animating && !state.responded {
            let image = &self.config.stimuli[state.frame as usize];
            trace!(frame = state.frame, %image, "drawing frame");
            self.renderer.draw_frame(display.mount, display.images, image);
            state.frames_drawn += 1;
        }

        if !state.responded {
            if self.config.allow_response_before_complete || !state.animating {
                if let Some(prompt) = &self.config.prompt {
                    self.renderer.show_prompt(display.mount, prompt);
                }
            }
            if !state.animating {
                self.renderer.remove_stimulus(display.mount);
            }
            return;
        }

        let feedback = self.feedback_text().unwrap_or_default();
        display.mount.set_body(feedback);
        if self.state.feedback_timer.is_none() {
            let timer = host.schedule_once(self.config.feedback_duration());
            debug!(%timer, "feedback shown, end of trial armed");
            self.state.feedback_timer = Some(timer);
        }
    }

    fn on_response(&mut self, event: &KeyEvent, host: &mut dyn Host) {
        let phase = self.phase();
        if !phase.accepts_response(self.config.allow_response_before_complete) {
            trace!(key = %event.key, ?phase, "response ignored");
            return;
        }

        let correct = host.compare_keys(&self.config.key_answer, &event.key);
        debug!(key = %event.key, rt_ms = event.rt_ms(), correct, "response recorded");
        self.state.correct = Some(correct);
        self.state.responded = true;
        self.state.response = Some(Response {
            key: event.key.clone(),
            rt_ms: event.rt_ms(),
            correct,
        });
        if let Some(listener) = self.state.listener.take() {
            host.deregister_key_listener(listener);
        }
    }

    fn end_trial(&mut self, host: &mut dyn Host) {
        if let Some(tick) = self.state.tick.take() {
            host.cancel_timer(tick);
        }
        if let Some(listener) = self.state.listener.take() {
            host.deregister_key_listener(listener);
        }
        host.display().mount.clear();
        self.state.ended = true;

        let record = TrialRecord::CategorizeAnimation {
            stimulus: self.config.stimuli.clone(),
            response: self.state.response.clone(),
        };
        info!(
            correct = ?self.state.correct,
            ticks = self.state.ticks,
            "categorize-animation trial ended"
        );
        host.finish_trial(record);
    }
}

impl Plugin for AnimationTrial {
    fn info(&self) -> &'static PluginInfo {
        &ANIMATION_INFO
    }

    fn start(&mut self, host: &mut dyn Host) {
        info!(
            frames = self.config.stimuli.len(),
            reps = ?self.config.sequence_reps,
            frame_time_ms = self.config.frame_time_ms,
            mode = ?self.renderer.mode(),
            "categorize-animation trial started"
        );
        self.state = RunState::default();
        self.state.listener = Some(host.register_key_listener(KeyListenerOptions {
            choices: self.config.choices.clone(),
            persist: true,
            allow_held_key: false,
        }));
        // First frame goes up immediately; the tick takes over from there.
        self.on_tick(host);
        self.state.tick = Some(host.schedule_repeating(self.config.frame_time()));
    }

    fn on_timer(&mut self, timer: TimerId, host: &mut dyn Host) {
        if self.state.ended {
            return;
        }
        if self.state.tick == Some(timer) {
            self.on_tick(host);
        } else if self.state.feedback_timer == Some(timer) {
            self.end_trial(host);
        }
    }

    fn on_key(&mut self, listener: ListenerId, event: &KeyEvent, host: &mut dyn Host) {
        if self.state.listener == Some(listener) {
            self.on_response(event, host);
        }
    }

    fn is_finished(&self) -> bool {
        self.phase().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::virtual_host::VirtualHost;
    use cogex_core::{Choices, RenderMode, SequenceReps};
    use std::time::Duration;

    const MS: fn(u64) -> Duration = Duration::from_millis;

    fn config() -> AnimationConfig {
        AnimationConfig::new(["a.png", "b.png", "c.png"], "j")
            .with_choices(Choices::keys(["f", "j"]))
            .with_frame_time_ms(100)
            .with_sequence_reps(SequenceReps::Times(2))
            .with_feedback_duration_ms(500)
            .with_render_mode(RenderMode::Markup)
    }

    #[test]
    fn first_frame_is_drawn_on_start() {
        let mut host = VirtualHost::new(&RunConfig::default());
        let mut trial = AnimationTrial::new(config());
        host.start(&mut trial);
        assert_eq!(trial.state().frame, 0);
        assert_eq!(trial.state().frames_drawn, 1);
        assert!(host.mount().markup().contains(r#"src="a.png""#));
        assert!(trial.state().is_listening());
        assert_eq!(trial.phase(), AnimationPhase::Animating);
    }

    #[test]
    fn frames_wrap_and_count_repetitions() {
        let mut host = VirtualHost::new(&RunConfig::default());
        let mut trial = AnimationTrial::new(config());
        host.start(&mut trial);
        host.run_until(&mut trial, MS(350)).unwrap();
        assert_eq!(trial.state().frame, 0);
        assert_eq!(trial.state().reps, 1);
        assert!(trial.state().animating);

        host.run_until(&mut trial, MS(600)).unwrap();
        assert!(!trial.state().animating);
        assert_eq!(trial.state().frames_drawn, 6);
        assert_eq!(trial.phase(), AnimationPhase::AwaitingResponse);
        assert!(host.mount().stimulus().is_none());
    }

    #[test]
    fn prompt_appears_once_responses_are_accepted() {
        let mut host = VirtualHost::new(&RunConfig::default());
        let mut trial = AnimationTrial::new(config().with_prompt("<p>Which?</p>"));
        host.start(&mut trial);
        assert_eq!(host.mount().prompt(), None);
        host.run_until(&mut trial, MS(600)).unwrap();
        assert_eq!(host.mount().prompt(), Some("<p>Which?</p>"));

        let mut host = VirtualHost::new(&RunConfig::default());
        let mut eager = AnimationTrial::new(
            config()
                .with_prompt("<p>Which?</p>")
                .with_response_before_complete(true),
        );
        host.start(&mut eager);
        assert_eq!(host.mount().prompt(), Some("<p>Which?</p>"));
        assert!(host.mount().stimulus().is_some());
    }

    #[test]
    fn feedback_fills_in_the_answer_label() {
        let mut host = VirtualHost::new(&RunConfig::default());
        let mut trial = AnimationTrial::new(
            config()
                .with_text_answer("Cat")
                .with_feedback_text("Yes, %ANS%!", "No, it was %ANS%."),
        );
        host.press_at(MS(650), "f");
        host.start(&mut trial);
        host.run_until(&mut trial, MS(700)).unwrap();
        assert_eq!(trial.state().correct, Some(false));
        assert_eq!(trial.feedback_text().as_deref(), Some("No, it was Cat."));
        assert_eq!(host.mount().body(), Some("No, it was Cat."));
        assert_eq!(trial.phase(), AnimationPhase::FeedbackShown);
    }

    #[test]
    fn stimuli_and_key_answer_are_required() {
        let required: Vec<_> = ANIMATION_INFO.required().map(|p| p.name).collect();
        assert_eq!(required, ["stimuli", "key_answer"]);
        assert_eq!(
            ANIMATION_INFO.parameter("frame_time").and_then(|p| p.default),
            Some("500")
        );
    }

    #[test]
    fn no_feedback_without_a_response() {
        let trial = AnimationTrial::new(config());
        assert_eq!(trial.feedback_text(), None);
    }

    #[test]
    fn frames_stop_advancing_after_an_early_response() {
        let mut host = VirtualHost::new(&RunConfig::default());
        let mut trial = AnimationTrial::new(config().with_response_before_complete(true));
        host.press_at(MS(150), "j");
        host.start(&mut trial);
        host.run_until(&mut trial, MS(450)).unwrap();
        assert!(trial.state().responded);
        assert_eq!(trial.state().frame, 1);
        assert_eq!(trial.state().frames_drawn, 2);
        assert!(!trial.state().is_listening());
    }

    #[test]
    fn ending_cancels_the_tick_and_clears_the_display() {
        let mut host = VirtualHost::new(&RunConfig::default());
        let mut trial = AnimationTrial::new(config());
        host.press_at(MS(610), "j");
        let record = host.run_trial(&mut trial).unwrap();
        assert!(trial.is_finished());
        assert_eq!(trial.phase(), AnimationPhase::Ended);
        assert_eq!(record.correct(), Some(true));
        assert!(host.mount().is_empty());
        assert_eq!(host.stats().timers_cancelled, 1);
        assert_eq!(host.pending_timers(), 0);
    }
}
