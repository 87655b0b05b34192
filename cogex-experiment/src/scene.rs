use crate::host::Host;
use crate::plugin::Plugin;
use cogex_core::{ParameterInfo, ParameterKind, PluginInfo, SceneConfig, TrialRecord};
use cogex_render::SceneLayout;
use cogex_timing::TimerId;
use tracing::info;

pub static SCENE_INFO: PluginInfo = PluginInfo {
    name: "scene",
    parameters: &[
        ParameterInfo {
            name: "stimuli",
            pretty_name: "Stimuli",
            kind: ParameterKind::Image,
            default: None,
            array: true,
            description: "Rows of image paths; 0 leaves a cell empty",
        },
        ParameterInfo {
            name: "image_size",
            pretty_name: "Image size",
            kind: ParameterKind::Int,
            default: Some("[100, 100]"),
            array: true,
            description: "Width and height of every image in pixels",
        },
        ParameterInfo {
            name: "trial_duration",
            pretty_name: "Trial duration",
            kind: ParameterKind::Int,
            default: Some("2000"),
            array: false,
            description: "Milliseconds the scene stays on screen",
        },
    ],
};

/// Shows a grid of images for a fixed time, no interaction
#[derive(Debug)]
pub struct SceneTrial {
    config: SceneConfig,
    timer: Option<TimerId>,
    ended: bool,
}

impl SceneTrial {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            config,
            timer: None,
            ended: false,
        }
    }

    pub fn layout(&self) -> SceneLayout {
        SceneLayout::new(&self.config.stimuli, self.config.image_size)
    }
}

impl Plugin for SceneTrial {
    fn info(&self) -> &'static PluginInfo {
        &SCENE_INFO
    }

    fn start(&mut self, host: &mut dyn Host) {
        let layout = self.layout();
        info!(
            images = layout.placements.len(),
            width = layout.width,
            height = layout.height,
            "scene trial started"
        );
        host.display()
            .mount
            .set_scene(layout.width, layout.height, layout.placements);
        self.ended = false;
        self.timer = Some(host.schedule_once(self.config.trial_duration()));
    }

    fn on_timer(&mut self, timer: TimerId, host: &mut dyn Host) {
        if self.ended || self.timer != Some(timer) {
            return;
        }
        self.timer = None;
        self.ended = true;
        host.display().mount.clear();
        info!("scene trial ended");
        host.finish_trial(TrialRecord::Scene {
            stimulus: self.config.stimuli.clone(),
        });
    }

    fn is_finished(&self) -> bool {
        self.ended
    }
}
