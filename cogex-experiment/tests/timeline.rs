use cogex_core::{Cell, TrialRecord};
use cogex_experiment::{
    ScriptedResponder, SimulatedResponder, Timeline, TimelineError, TrialSpec,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;
use tiny_skia::{Color, Pixmap};

const TIMELINE: &str = r#"{
    "settings": { "inter_trial_interval_ms": 250 },
    "trials": [
        {
            "type": "categorize-animation",
            "stimuli": ["a.png", "b.png"],
            "key_answer": "j",
            "choices": ["f", "j"],
            "text_answer": "cat",
            "correct_text": "Right: %ANS%",
            "frame_time": 100,
            "sequence_reps": 2,
            "feedback_duration": 500
        },
        {
            "type": "scene",
            "stimuli": [["a.png", 0], [0, "b.png"]],
            "image_size": [40, 30],
            "trial_duration": 1000
        }
    ]
}"#;

fn write_png(path: &std::path::Path, color: Color) {
    let mut pm = Pixmap::new(8, 6).unwrap();
    pm.fill(color);
    pm.save_png(path).unwrap();
}

#[test]
fn parses_both_trial_types() {
    let timeline = Timeline::from_json(TIMELINE).unwrap();
    assert_eq!(timeline.settings.inter_trial_interval_ms, 250);
    assert_eq!(timeline.settings.display_width, 1280);
    assert_eq!(timeline.trials.len(), 2);

    let TrialSpec::CategorizeAnimation(anim) = &timeline.trials[0] else {
        panic!("first trial should be an animation");
    };
    assert_eq!(anim.frame_time_ms, 100);
    assert_eq!(anim.incorrect_text, "Wrong.");

    let TrialSpec::Scene(scene) = &timeline.trials[1] else {
        panic!("second trial should be a scene");
    };
    assert_eq!(scene.stimuli[0][1], Cell::Empty);
    assert_eq!(scene.image_size, [40, 30]);

    let images: Vec<&str> = timeline.images().iter().map(|i| i.as_str()).collect();
    assert_eq!(images, ["a.png", "b.png"]);
}

#[test]
fn invalid_trials_are_rejected_with_their_index() {
    let json = r#"{ "trials": [
        { "type": "scene", "stimuli": [[0]] },
        { "type": "categorize-animation", "stimuli": [], "key_answer": "j" }
    ] }"#;
    match Timeline::from_json(json) {
        Err(TimelineError::Config { index, .. }) => assert_eq!(index, 1),
        other => panic!("expected a config error, got {other:?}"),
    }
}

#[test]
fn unknown_trial_type_is_a_json_error() {
    let json = r#"{ "trials": [{ "type": "survey-text" }] }"#;
    assert!(matches!(
        Timeline::from_json(json),
        Err(TimelineError::Json(_))
    ));
}

#[test]
fn runs_a_loaded_timeline_with_a_simulated_participant() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("a.png"), Color::from_rgba8(255, 0, 0, 255));
    write_png(&dir.path().join("b.png"), Color::from_rgba8(0, 0, 255, 255));
    let path = dir.path().join("timeline.json");
    std::fs::write(&path, TIMELINE).unwrap();

    let timeline = Timeline::load(&path).unwrap();
    let mut host = timeline.host();
    assert_eq!(timeline.preload(&mut host).unwrap(), 2);

    let rng = StdRng::seed_from_u64(3);
    let mut responder = SimulatedResponder::new(rng, 1.0, Duration::from_millis(300));
    let records = timeline.run(&mut host, Some(&mut responder)).unwrap();
    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(first.trial_index, 0);
    assert_eq!(first.record.correct(), Some(true));
    let rt = first.record.response().unwrap().rt_ms;
    assert!((550.0..850.0).contains(&rt), "{rt}");

    let second = &records[1];
    assert!(matches!(second.record, TrialRecord::Scene { .. }));
    let gap = second.time_elapsed_ms - first.time_elapsed_ms;
    assert_eq!(gap, 1250.0);
    assert_eq!(host.stats().finish_calls, 2);
}

#[test]
fn each_trial_scores_only_its_own_key_presses() {
    let json = r#"{
        "settings": { "inter_trial_interval_ms": 0 },
        "trials": [
            {
                "type": "categorize-animation",
                "stimuli": ["a.png", "b.png"],
                "key_answer": "j",
                "choices": ["f", "j"],
                "frame_time": 100,
                "sequence_reps": 2,
                "feedback_duration": 100
            },
            {
                "type": "categorize-animation",
                "stimuli": ["a.png", "b.png"],
                "key_answer": "j",
                "choices": ["f", "j"],
                "frame_time": 100,
                "sequence_reps": 2,
                "allow_response_before_complete": true,
                "feedback_duration": 100
            }
        ]
    }"#;
    let timeline = Timeline::from_json(json).unwrap();
    let mut host = timeline.host();
    // The late "f" lands after each trial has already ended.
    let mut responder = ScriptedResponder::new(vec![
        (Duration::from_millis(900), "j".to_string()),
        (Duration::from_millis(1300), "f".to_string()),
    ]);
    let records = timeline.run(&mut host, Some(&mut responder)).unwrap();

    for record in &records {
        let response = record.record.response().unwrap();
        assert_eq!(response.key, "j");
        assert_eq!(response.rt_ms, 900.0);
        assert!(response.correct);
    }
    assert_eq!(host.stats().keys_dropped, 2);
}

#[test]
fn records_serialize_flat() {
    let timeline = Timeline::from_json(TIMELINE).unwrap();
    let mut host = timeline.host();
    let rng = StdRng::seed_from_u64(9);
    let mut responder = SimulatedResponder::new(rng, 0.0, Duration::from_millis(200));
    let records = timeline.run(&mut host, Some(&mut responder)).unwrap();

    let json = serde_json::to_value(&records).unwrap();
    assert_eq!(json[0]["plugin"], "categorize-animation");
    assert_eq!(json[0]["trial_index"], 0);
    assert_eq!(json[0]["response"]["key"], "f");
    assert_eq!(json[0]["response"]["correct"], false);
    assert_eq!(json[1]["plugin"], "scene");
    assert_eq!(json[1]["stimulus"][0][1], 0);
}

#[test]
fn missing_images_fail_preload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timeline.json");
    std::fs::write(&path, TIMELINE).unwrap();
    let timeline = Timeline::load(&path).unwrap();
    let mut host = timeline.host();
    assert!(matches!(
        timeline.preload(&mut host),
        Err(TimelineError::Image(_))
    ));
}
