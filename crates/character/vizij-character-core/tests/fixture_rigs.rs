use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Deserialize;
use vizij_character_core::{
    AnimationFeature, BlendMode, Callbacks, Config, Easing, Messenger, SimulatedMixer,
    StateOptions,
};

fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

#[derive(Debug, Deserialize)]
struct Rig {
    clips: BTreeMap<String, f32>,
    states: Vec<RigState>,
}

#[derive(Debug, Deserialize)]
struct RigState {
    name: String,
    options: StateOptions,
}

fn load_feature(rig: &str, config: &str) -> (AnimationFeature, Rig) {
    let rig: Rig = vizij_test_fixtures::rigs::load(rig).expect("load rig fixture");
    let config: Config = vizij_test_fixtures::configs::load(config).expect("load config fixture");
    let mixer = SimulatedMixer::from_durations(rig.clips.iter().map(|(k, v)| (k.clone(), *v)));
    let mut feature = AnimationFeature::new(mixer, Rc::new(Messenger::new())).with_config(config);
    for s in &rig.states {
        feature
            .register_state(&s.name, s.options.clone())
            .expect("register fixture state");
    }
    (feature, rig)
}

#[test]
fn every_rig_registers_cleanly() {
    for key in vizij_test_fixtures::rigs::keys() {
        let (feature, rig) = load_feature(&key, "default");
        let names: Vec<&str> = feature.state_names().collect();
        let expected: Vec<&str> = rig.states.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, expected, "rig {key}");
    }
}

#[test]
fn basic_rig_options_reach_the_states() {
    let (mut feature, _) = load_feature("host-basic", "default");
    let nod = feature.state("nod").unwrap();
    assert_eq!(nod.loop_count(), 2);
    assert_eq!(nod.time_scale(), 2.0);
    assert_eq!(nod.weight(), 0.0);
    assert_eq!(feature.active_states(), vec!["idle"]);

    // nod: 0.5s clip at double speed, two repetitions
    let play = feature.play_state("nod", Callbacks::new()).unwrap();
    for _ in 0..40 {
        feature.update(16.0);
    }
    assert!(play.is_resolved());
}

#[test]
fn layered_rig_mixes_override_and_additive() {
    let (mut feature, _) = load_feature("host-layered", "default");
    assert_eq!(
        feature.state("breathe").unwrap().blend_mode(),
        BlendMode::Additive
    );
    feature.set_layer_weight(0.5, 0.0).unwrap();
    feature.update(16.0);
    approx(feature.state("stand").unwrap().internal_weight(), 0.5, 1e-6);
    approx(feature.state("breathe").unwrap().internal_weight(), 0.25, 1e-6);
}

#[test]
fn eased_config_changes_transitions_and_clamps_frames() {
    let config: Config = vizij_test_fixtures::configs::load("eased").unwrap();
    assert_eq!(config.default_easing, Easing::QuadraticInOut);
    assert_eq!(config.max_delta_ms, Some(100.0));

    let (mut feature, _) = load_feature("host-basic", "eased");
    let fade = feature.set_weight("wave", 1.0, 400.0).unwrap();
    feature.update(100.0);
    // quadratic in-out at a quarter of the way
    approx(feature.state("wave").unwrap().weight(), 0.125, 1e-5);
    assert_eq!(feature.update(10_000.0).delta_ms, 100.0);
    feature.update(100.0);
    feature.update(100.0);
    assert!(fade.is_resolved());
}

#[test]
fn fixture_options_parse_standalone() {
    let value: serde_json::Value = vizij_test_fixtures::rigs::load("host-layered").unwrap();
    let blink = StateOptions::from_json(&value["states"][2]["options"].to_string()).unwrap();
    assert_eq!(blink.clip, "blink");
    assert_eq!(blink.loop_count, 1);
    assert_eq!(blink.time_scale, 1.0);
    assert!(vizij_test_fixtures::rigs::load::<serde_json::Value>("missing").is_err());
}
