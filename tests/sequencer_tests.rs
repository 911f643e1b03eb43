/// Sequencer integration tests — navigation, transitions, save and restore.

mod common;

use std::time::Duration;

use common::{load_fixture, Call, FailingStore, Harness, SharedPrefs};
use scene_engine::core::catalog::SceneCatalog;
use scene_engine::core::host::Presentation;
use scene_engine::core::persistence::Preferences;
use scene_engine::core::sequencer::{Input, Key, SequencerError, SequencerState};
use scene_engine::schema::scene::{HandoffScene, LinearScene, Scene, SceneIndex, Sentence};

fn linear(name: &str, lines: &[&str], next: Option<usize>) -> Scene {
    Scene::Linear(LinearScene {
        name: name.to_string(),
        background: format!("bg/{name}.png"),
        sentences: lines.iter().map(|l| Sentence::new(*l)).collect(),
        next: next.map(SceneIndex),
    })
}

fn handoff(name: &str, screen: &str) -> Scene {
    Scene::Handoff(HandoffScene {
        name: name.to_string(),
        screen: screen.to_string(),
    })
}

fn catalog(scenes: Vec<Scene>) -> SceneCatalog {
    SceneCatalog::new(scenes, SceneIndex(0)).unwrap()
}

#[test]
fn two_scene_story_hands_off_once() {
    let mut h = Harness::new(catalog(vec![
        linear("a", &["First line.", "Second line."], Some(1)),
        handoff("b", "MainMenu"),
    ]));
    h.seq.start().unwrap();
    assert_eq!(h.seq.presentation().sentence_index(), 0);

    h.read_on();
    assert_eq!(h.seq.presentation().sentence_index(), 1);

    h.read_on();
    assert_eq!(h.seq.state(), SequencerState::Transitioning);
    h.settle();

    h.read_on();
    assert_eq!(h.activations(), vec!["MainMenu".to_string()]);
    assert!(h.seq.is_handed_off());
}

#[test]
fn advancing_never_skips_past_the_last_sentence() {
    let lines = ["a", "bb", "ccc", "dddd", "eeeee"];
    let mut h = Harness::new(catalog(vec![
        linear("long", &lines, Some(1)),
        linear("next", &["done"], None),
    ]));
    h.seq.start().unwrap();

    let mut seen = vec![h.seq.presentation().sentence_index()];
    for _ in 0..200 {
        h.clock.advance_ms(150);
        h.seq
            .presentation_mut()
            .dialogue
            .update(Duration::from_millis(150));
        h.seq.advance();
        if h.seq.current_scene() != SceneIndex(0) {
            break;
        }
        seen.push(h.seq.presentation().sentence_index());
    }

    assert_eq!(h.seq.current_scene(), SceneIndex(1));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert!(seen.iter().all(|&i| i <= lines.len() - 1));
    assert_eq!(seen.last().copied(), Some(lines.len() - 1));
}

#[test]
fn go_back_from_second_scene_lands_before_the_transition() {
    let mut h = Harness::new(catalog(vec![
        linear("a", &["one", "two", "three"], Some(1)),
        linear("b", &["four", "five"], None),
    ]));
    h.seq.start().unwrap();
    h.read_on();
    h.read_on();
    h.read_on();
    h.settle();
    assert_eq!(h.seq.history(), &[SceneIndex(0), SceneIndex(1)]);
    assert!(h.seq.presentation().is_first_sentence());

    h.clear_log();
    h.seq.go_back();

    assert_eq!(h.seq.current_scene(), SceneIndex(0));
    assert_eq!(h.seq.history(), &[SceneIndex(0)]);
    assert_eq!(h.seq.presentation().sentence_index(), 1);
    assert_eq!(h.seq.state(), SequencerState::Idle);
    let calls = h.calls();
    assert_eq!(calls[0], Call::StopTyping);
    assert!(calls.contains(&Call::PlayScene {
        scene: 0,
        sentence: 1,
        animated: false,
    }));
    assert!(!calls.contains(&Call::Hide));
}

#[test]
fn go_back_inside_a_scene_rewinds_one_sentence() {
    let mut h = Harness::new(catalog(vec![linear("a", &["one", "two"], None)]));
    h.seq.start().unwrap();
    h.read_on();
    h.clear_log();

    h.seq.handle_input(Input::RightClick).unwrap();
    assert_eq!(h.calls(), vec![Call::Rewind]);
    assert_eq!(h.seq.presentation().sentence_index(), 0);

    // First sentence of the first scene: nowhere to go.
    h.clear_log();
    h.seq.go_back();
    assert!(h.calls().is_empty());
    assert_eq!(h.seq.history(), &[SceneIndex(0)]);
}

#[test]
fn go_back_across_a_choice_skips_the_decision() {
    let mut h = Harness::new(load_fixture("demo_catalog.ron"));
    h.seq.start().unwrap();
    h.read_on();
    h.read_on();
    h.read_on();
    h.settle();
    assert_eq!(h.seq.state(), SequencerState::Choosing);

    h.seq.resolve_choice(0).unwrap();
    h.settle();
    assert_eq!(h.seq.history(), &[SceneIndex(0), SceneIndex(2)]);

    h.seq.go_back();
    assert_eq!(h.seq.current_scene(), SceneIndex(0));
    assert_eq!(h.seq.presentation().sentence_index(), 1);
    assert_eq!(h.seq.history(), &[SceneIndex(0)]);
}

#[test]
fn animated_transition_issues_commands_in_phase_order() {
    let mut h = Harness::new(load_fixture("demo_catalog.ron"));
    h.seq.start().unwrap();
    h.read_on();
    h.read_on();
    h.read_on();
    h.settle();
    h.clear_log();

    h.seq.resolve_choice(0).unwrap();
    assert_eq!(
        h.calls(),
        vec![Call::DismissCharacters(true), Call::Hide]
    );

    h.clear_log();
    h.settle();
    assert_eq!(
        h.calls(),
        vec![
            Call::PlayAudio(None, Some("sfx/door.wav".to_string())),
            Call::SwitchBackground("bg/clubroom.png".to_string()),
            Call::ClearText,
            Call::Show,
            Call::PlayScene {
                scene: 2,
                sentence: 0,
                animated: true,
            },
        ]
    );
}

#[test]
fn choice_branch_reaches_handoff() {
    let mut h = Harness::new(load_fixture("demo_catalog.ron"));
    h.seq.start().unwrap();
    for _ in 0..3 {
        h.read_on();
    }
    h.settle();
    assert!(h.calls().contains(&Call::SetupChoice(1)));

    h.seq.resolve_choice(1).unwrap();
    h.settle();
    assert_eq!(h.seq.current_scene(), SceneIndex(3));

    h.read_on();
    h.settle();
    assert_eq!(h.activations(), vec!["Credits".to_string()]);
}

#[test]
fn input_is_ignored_while_choosing() {
    let mut h = Harness::new(load_fixture("demo_catalog.ron"));
    h.seq.start().unwrap();
    for _ in 0..3 {
        h.read_on();
    }
    h.settle();
    h.clear_log();

    h.seq.handle_input(Input::Click).unwrap();
    h.seq.handle_input(Input::RightClick).unwrap();
    h.seq.handle_input(Input::Key(Key::Escape)).unwrap();
    assert!(h.calls().is_empty());
    assert_eq!(h.seq.state(), SequencerState::Choosing);
}

#[test]
fn double_press_while_typing_speeds_up_and_triple_skips() {
    let mut h = Harness::new(catalog(vec![
        linear("a", &["A sentence that takes a while to type out."], Some(1)),
        linear("b", &["later"], None),
    ]));
    h.seq.start().unwrap();
    // Replay the only sentence with typing.
    h.seq.go_to_scene(SceneIndex(0), None, true).unwrap();
    h.settle();
    assert!(!h.seq.presentation().is_completed());
    h.clear_log();

    h.clock.advance_ms(600);
    h.seq.advance();
    assert!(h.calls().is_empty());

    h.clock.advance_ms(200);
    h.seq.advance();
    assert_eq!(h.calls(), vec![Call::SpeedUp]);
    assert_eq!(h.seq.state(), SequencerState::Idle);

    h.clock.advance_ms(200);
    h.seq.advance();
    assert_eq!(h.calls(), vec![Call::SpeedUp, Call::StopTyping]);
    assert_eq!(h.seq.current_scene(), SceneIndex(0));
    assert_eq!(h.seq.state(), SequencerState::Idle);
    assert!(h.seq.presentation().is_completed());
}

#[test]
fn slow_presses_while_typing_do_nothing() {
    let mut h = Harness::new(catalog(vec![linear(
        "a",
        &["short", "A much longer second sentence to type."],
        None,
    )]));
    h.seq.start().unwrap();
    h.read_on();
    h.clear_log();

    for _ in 0..3 {
        h.clock.advance_ms(700);
        h.seq.advance();
    }
    assert!(h.calls().is_empty());
    assert_eq!(h.seq.presentation().sentence_index(), 1);
}

#[test]
fn sentence_audio_plays_on_advance() {
    let mut h = Harness::new(load_fixture("demo_catalog.ron"));
    h.seq.start().unwrap();
    assert!(h
        .calls()
        .contains(&Call::PlayAudio(Some("music/afternoon.ogg".to_string()), None)));

    h.clear_log();
    h.read_on();
    assert_eq!(
        h.calls(),
        vec![Call::PlayNextSentence, Call::PlayAudio(None, None)]
    );
}

#[test]
fn checkpoint_then_restore_round_trips() {
    let prefs = SharedPrefs::default();
    let mut h = Harness::with_prefs(load_fixture("demo_catalog.ron"), prefs.clone());
    h.seq.start().unwrap();
    for _ in 0..3 {
        h.read_on();
    }
    h.settle();
    h.seq.resolve_choice(0).unwrap();
    h.settle();
    h.read_on();

    let scene = h.seq.current_scene();
    let sentence = h.seq.presentation().sentence_index();
    let history = h.seq.history().to_vec();

    h.seq.handle_input(Input::Key(Key::Escape)).unwrap();
    assert_eq!(h.activations(), vec!["menu".to_string()]);
    assert_eq!(
        prefs.get_string("savedGame").as_deref(),
        Some(r#"{"sentence":1,"prevScenes":[0,2]}"#)
    );

    // Handed off: further input does nothing.
    h.clear_log();
    h.seq.handle_input(Input::Click).unwrap();
    assert!(h.calls().is_empty());

    let mut resumed = Harness::with_prefs(load_fixture("demo_catalog.ron"), prefs);
    resumed.seq.start().unwrap();
    assert_eq!(resumed.seq.current_scene(), scene);
    assert_eq!(resumed.seq.presentation().sentence_index(), sentence);
    assert_eq!(resumed.seq.history(), history.as_slice());
    assert_eq!(resumed.seq.state(), SequencerState::Idle);
    assert!(resumed.calls().contains(&Call::PlayScene {
        scene: 2,
        sentence: 1,
        animated: false,
    }));
    assert!(!resumed.calls().contains(&Call::Hide));
}

#[test]
fn start_without_save_is_a_new_game() {
    let mut h = Harness::new(load_fixture("demo_catalog.ron"));
    h.seq.start().unwrap();
    assert_eq!(h.seq.state(), SequencerState::Idle);
    assert_eq!(h.seq.current_scene(), SceneIndex(0));
    assert_eq!(h.seq.history(), &[SceneIndex(0)]);
    assert_eq!(h.seq.presentation().sentence_index(), 0);
}

#[test]
fn malformed_save_falls_back_to_new_game() {
    let mut prefs = SharedPrefs::default();
    prefs.set_string("savedGame", "{\"sentence\":".to_string());
    let mut h = Harness::with_prefs(load_fixture("demo_catalog.ron"), prefs);
    h.seq.start().unwrap();
    assert_eq!(h.seq.current_scene(), SceneIndex(0));
    assert_eq!(h.seq.history(), &[SceneIndex(0)]);
}

#[test]
fn empty_history_save_falls_back_to_new_game() {
    let mut prefs = SharedPrefs::default();
    prefs.set_string("savedGame", r#"{"sentence":0,"prevScenes":[]}"#.to_string());
    let mut h = Harness::with_prefs(load_fixture("demo_catalog.ron"), prefs);
    h.seq.start().unwrap();
    assert_eq!(h.seq.history(), &[SceneIndex(0)]);
}

#[test]
fn out_of_range_save_is_a_configuration_error() {
    let mut prefs = SharedPrefs::default();
    prefs.set_string("savedGame", r#"{"sentence":0,"prevScenes":[0,42]}"#.to_string());
    let mut h = Harness::with_prefs(load_fixture("demo_catalog.ron"), prefs);

    let result = h.seq.start();
    assert!(matches!(
        result,
        Err(SequencerError::SceneOutOfRange {
            index: SceneIndex(42),
            len: 6,
        })
    ));
    assert!(h.calls().is_empty());
}

#[test]
fn non_linear_save_entry_is_rejected() {
    let mut prefs = SharedPrefs::default();
    prefs.set_string("savedGame", r#"{"sentence":0,"prevScenes":[1]}"#.to_string());
    let mut h = Harness::with_prefs(load_fixture("demo_catalog.ron"), prefs);
    assert!(matches!(
        h.seq.start(),
        Err(SequencerError::NotLinear(SceneIndex(1)))
    ));
}

#[test]
fn discard_save_clears_the_slot() {
    let prefs = SharedPrefs::default();
    let mut h = Harness::with_prefs(load_fixture("demo_catalog.ron"), prefs.clone());
    h.seq.start().unwrap();
    h.seq.checkpoint().unwrap();
    assert!(prefs.has_key("savedGame"));

    h.seq.discard_save().unwrap();
    assert!(!prefs.has_key("savedGame"));
}

#[test]
fn failed_restore_refuses_input_until_new_game() {
    let mut prefs = SharedPrefs::default();
    prefs.set_string("savedGame", r#"{"sentence":0,"prevScenes":[0,42]}"#.to_string());
    let mut h = Harness::with_prefs(load_fixture("demo_catalog.ron"), prefs);

    assert!(h.seq.start().is_err());
    assert!(h.seq.is_halted());
    assert!(h.seq.history().is_empty());

    h.clock.advance_ms(600);
    h.seq.handle_input(Input::Click).unwrap();
    h.seq.handle_input(Input::RightClick).unwrap();
    h.seq.advance();
    h.settle();
    assert!(h.calls().is_empty());

    h.seq.new_game().unwrap();
    assert!(!h.seq.is_halted());
    h.clear_log();
    h.read_on();
    assert!(h.calls().contains(&Call::PlayNextSentence));
}

#[test]
fn checkpoint_is_refused_mid_transition() {
    let prefs = SharedPrefs::default();
    let mut h = Harness::with_prefs(load_fixture("demo_catalog.ron"), prefs.clone());
    h.seq.start().unwrap();
    for _ in 0..3 {
        h.read_on();
    }
    h.settle();
    assert!(matches!(
        h.seq.checkpoint(),
        Err(SequencerError::NotAcceptingInput)
    ));

    h.seq.resolve_choice(0).unwrap();
    h.clock.advance_ms(1_000);
    h.seq.tick();
    assert_eq!(h.seq.history(), &[SceneIndex(0), SceneIndex(2)]);
    assert!(matches!(
        h.seq.checkpoint(),
        Err(SequencerError::TransitionInProgress)
    ));
    assert!(!prefs.has_key("savedGame"));
    assert!(!h.seq.is_handed_off());

    h.settle();
    h.seq.checkpoint().unwrap();
    assert_eq!(
        prefs.get_string("savedGame").as_deref(),
        Some(r#"{"sentence":0,"prevScenes":[0,2]}"#)
    );
}

#[test]
fn failed_save_keeps_control() {
    let mut h = Harness::with_store(load_fixture("demo_catalog.ron"), FailingStore);
    h.seq.start().unwrap();

    let result = h.seq.handle_input(Input::Key(Key::Escape));
    assert!(matches!(result, Err(SequencerError::Persistence(_))));
    assert!(h.activations().is_empty());
    assert!(!h.seq.is_handed_off());

    h.clear_log();
    h.read_on();
    assert!(h.calls().contains(&Call::PlayNextSentence));
}

#[test]
fn missing_optional_hosts_are_skipped() {
    let mut h = Harness::without_hosts(load_fixture("demo_catalog.ron"));
    h.seq.start().unwrap();
    for _ in 0..3 {
        h.read_on();
    }
    h.settle();
    assert_eq!(h.seq.state(), SequencerState::Choosing);

    h.seq.resolve_choice(1).unwrap();
    h.settle();
    assert_eq!(h.seq.current_scene(), SceneIndex(3));
    h.read_on();
    h.settle();
    assert!(h.seq.is_handed_off());

    assert!(!h.calls().iter().any(|c| matches!(
        c,
        Call::PlayAudio(..) | Call::SetupChoice(_) | Call::Activate(_)
    )));

    // Nothing to save into: the checkpoint still returns to the menu.
    let mut fresh = Harness::without_hosts(load_fixture("demo_catalog.ron"));
    fresh.seq.start().unwrap();
    fresh.seq.checkpoint().unwrap();
    assert!(fresh.seq.is_handed_off());
}

#[test]
fn renamed_speaker_shows_in_the_dialogue_box() {
    let mut h = Harness::new(load_fixture("demo_catalog.ron"));
    h.seq.start().unwrap();
    h.seq.set_speaker_name("Aiko", "  Captain ");
    assert_eq!(h.seq.speaker_name("Aiko"), "Captain");
    assert_eq!(h.seq.speaker_name("Ren"), "Ren");
    assert!(h
        .calls()
        .contains(&Call::RenameSpeaker("Aiko".to_string(), "Captain".to_string())));

    h.read_on();
    assert_eq!(h.seq.presentation().dialogue.speaker_name(), Some("Captain"));
    h.read_on();
    assert_eq!(h.seq.presentation().dialogue.speaker_name(), Some("Ren"));

    h.seq.set_speaker_name("Aiko", " ");
    assert_eq!(h.seq.speaker_name("Aiko"), "Aiko");
    h.seq.go_back();
    assert_eq!(h.seq.presentation().dialogue.speaker_name(), Some("Aiko"));
}
