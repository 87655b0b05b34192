//! A sequence of trials loaded from JSON and run back to back on one host.

use crate::animation::AnimationTrial;
use crate::config::RunConfig;
use crate::plugin::Plugin;
use crate::scene::SceneTrial;
use crate::simulate::Responder;
use crate::virtual_host::{HostError, VirtualHost};
use cogex_core::{AnimationConfig, ConfigError, ImageRef, SceneConfig, TrialRecord};
use cogex_render::ImageError;
use cogex_timing::Timer;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid timeline JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("trial {index}: {source}")]
    Config {
        index: usize,
        #[source]
        source: ConfigError,
    },
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("trial {index}: {source}")]
    Host {
        index: usize,
        #[source]
        source: HostError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TrialSpec {
    CategorizeAnimation(AnimationConfig),
    Scene(SceneConfig),
}

impl TrialSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            TrialSpec::CategorizeAnimation(c) => c.validate(),
            TrialSpec::Scene(c) => c.validate(),
        }
    }

    pub fn images(&self) -> Vec<&ImageRef> {
        match self {
            TrialSpec::CategorizeAnimation(c) => c.stimuli.iter().collect(),
            TrialSpec::Scene(c) => c
                .stimuli
                .iter()
                .flatten()
                .filter_map(|cell| cell.image())
                .collect(),
        }
    }

    pub fn plugin(&self) -> Box<dyn Plugin> {
        match self {
            TrialSpec::CategorizeAnimation(c) => Box::new(AnimationTrial::new(c.clone())),
            TrialSpec::Scene(c) => Box::new(SceneTrial::new(c.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub settings: RunConfig,
    pub trials: Vec<TrialSpec>,
}

/// One line of the results file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineRecord {
    pub trial_index: usize,
    /// Host time at which the trial ended
    pub time_elapsed_ms: f64,
    #[serde(flatten)]
    pub record: TrialRecord,
}

impl Timeline {
    pub fn from_json(json: &str) -> Result<Self, TimelineError> {
        let timeline: Timeline = serde_json::from_str(json)?;
        timeline.validate()?;
        Ok(timeline)
    }

    pub fn load(path: &Path) -> Result<Self, TimelineError> {
        let json = std::fs::read_to_string(path).map_err(|source| TimelineError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut timeline = Self::from_json(&json)?;
        // Images are looked up next to the timeline unless told otherwise.
        if timeline.settings.image_dir.is_none() {
            timeline.settings.image_dir = path.parent().map(Path::to_path_buf);
        }
        Ok(timeline)
    }

    pub fn validate(&self) -> Result<(), TimelineError> {
        for (index, trial) in self.trials.iter().enumerate() {
            trial
                .validate()
                .map_err(|source| TimelineError::Config { index, source })?;
        }
        Ok(())
    }

    /// Every image any trial can show, in first-use order without repeats
    pub fn images(&self) -> Vec<&ImageRef> {
        let mut seen = Vec::new();
        for image in self.trials.iter().flat_map(TrialSpec::images) {
            if !seen.contains(&image) {
                seen.push(image);
            }
        }
        seen
    }

    pub fn host(&self) -> VirtualHost {
        VirtualHost::new(&self.settings)
    }

    /// Decodes every stimulus into the host's image store
    pub fn preload(&self, host: &mut VirtualHost) -> Result<usize, TimelineError> {
        Ok(host.images_mut().preload(self.images())?)
    }

    /// Runs every trial in order. A responder, if given, queues key presses
    /// for each trial just before it starts.
    pub fn run(
        &self,
        host: &mut VirtualHost,
        mut responder: Option<&mut dyn Responder>,
    ) -> Result<Vec<TimelineRecord>, TimelineError> {
        let total = self.trials.len();
        let iti = Duration::from_millis(self.settings.inter_trial_interval_ms);
        let mut records = Vec::with_capacity(total);

        for (index, spec) in self.trials.iter().enumerate() {
            if index > 0 && !iti.is_zero() {
                host.idle(iti);
            }
            if let Some(responder) = responder.as_deref_mut() {
                for (delay, key) in responder.plan(spec) {
                    host.press_after(delay, key);
                }
            }

            let mut plugin = spec.plugin();
            info!(trial = index + 1, total, plugin = plugin.info().name, "running trial");
            let record = host
                .run_trial(plugin.as_mut())
                .map_err(|source| TimelineError::Host { index, source })?;
            records.push(TimelineRecord {
                trial_index: index,
                time_elapsed_ms: host.clock().since_start().as_nanos() as f64 / 1e6,
                record,
            });
        }

        summarize(&records);
        Ok(records)
    }
}

fn summarize(records: &[TimelineRecord]) {
    let responses: Vec<_> = records.iter().filter_map(|r| r.record.response()).collect();
    if responses.is_empty() {
        info!(trials = records.len(), "timeline complete");
        return;
    }
    let correct = responses.iter().filter(|r| r.correct).count();
    let mean_rt = responses.iter().map(|r| r.rt_ms).sum::<f64>() / responses.len() as f64;
    info!(
        trials = records.len(),
        responses = responses.len(),
        accuracy = correct as f64 / responses.len() as f64,
        mean_rt_ms = mean_rt,
        "timeline complete"
    );
}
