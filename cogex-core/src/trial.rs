use crate::stimulus::{Cell, ImageRef};
use serde::{Deserialize, Serialize};

/// The one key a participant's answer was scored on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub key: String,
    /// Milliseconds from the start of listening to the key press
    pub rt_ms: f64,
    pub correct: bool,
}

/// Data a trial hands to the host when it ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "plugin", rename_all = "kebab-case")]
pub enum TrialRecord {
    CategorizeAnimation {
        stimulus: Vec<ImageRef>,
        response: Option<Response>,
    },
    Scene {
        stimulus: Vec<Vec<Cell>>,
    },
}

impl TrialRecord {
    pub fn response(&self) -> Option<&Response> {
        match self {
            TrialRecord::CategorizeAnimation { response, .. } => response.as_ref(),
            TrialRecord::Scene { .. } => None,
        }
    }

    pub fn correct(&self) -> Option<bool> {
        self.response().map(|r| r.correct)
    }

    pub fn plugin_name(&self) -> &'static str {
        match self {
            TrialRecord::CategorizeAnimation { .. } => "categorize-animation",
            TrialRecord::Scene { .. } => "scene",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_tagged_by_plugin() {
        let record = TrialRecord::CategorizeAnimation {
            stimulus: vec![ImageRef::from("a.png")],
            response: Some(Response {
                key: "j".into(),
                rt_ms: 812.5,
                correct: true,
            }),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["plugin"], "categorize-animation");
        assert_eq!(json["response"]["key"], "j");
        assert_eq!(json["response"]["correct"], true);
        assert_eq!(record.correct(), Some(true));
        assert_eq!(record.plugin_name(), "categorize-animation");
    }

    #[test]
    fn scene_records_have_no_response() {
        let record = TrialRecord::Scene {
            stimulus: vec![vec![Cell::Empty]],
        };
        assert_eq!(record.response(), None);
        assert_eq!(serde_json::to_value(&record).unwrap()["stimulus"][0][0], 0);
    }
}
