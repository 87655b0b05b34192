/// Where a categorize-animation trial is in its protocol
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum AnimationPhase {
    /// Frames are still being drawn
    #[default]
    Animating,
    /// Sequence finished, no response yet
    AwaitingResponse,
    /// A qualifying key was recorded, feedback not drawn yet
    Responded,
    /// Feedback is on screen and the end-of-trial timer is armed
    FeedbackShown,
    Ended,
}

impl AnimationPhase {
    /// Whether a key event would be scored in this phase
    pub fn accepts_response(&self, allow_before_complete: bool) -> bool {
        match self {
            AnimationPhase::Animating => allow_before_complete,
            AnimationPhase::AwaitingResponse => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnimationPhase::Ended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responses_gate_on_policy_while_animating() {
        assert!(!AnimationPhase::Animating.accepts_response(false));
        assert!(AnimationPhase::Animating.accepts_response(true));
        assert!(AnimationPhase::AwaitingResponse.accepts_response(false));
        assert!(!AnimationPhase::Responded.accepts_response(true));
        assert!(!AnimationPhase::Ended.accepts_response(true));
    }

    #[test]
    fn only_ended_is_terminal() {
        assert!(AnimationPhase::Ended.is_terminal());
        assert!(!AnimationPhase::FeedbackShown.is_terminal());
        assert!(!AnimationPhase::default().is_terminal());
    }
}
