//! WASM bindings for scene-engine — drives a visual novel from a browser page.
//!
//! The page owns rendering and timing. It feeds input and frame timestamps
//! in, then drains the queued host commands as JSON and draws them.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::prelude::*;

use scene_engine::core::catalog::SceneCatalog;
use scene_engine::core::clock::ManualClock;
use scene_engine::core::config::SequencerConfig;
use scene_engine::core::dialogue::DialogueBox;
use scene_engine::core::host::{AudioPlayer, ChoiceHost, Presentation, ScreenHost};
use scene_engine::core::persistence::{MemoryPreferences, Preferences, PrefsSaveStore};
use scene_engine::core::sequencer::{Input, Key, Sequencer, SequencerState};
use scene_engine::schema::scene::{ChoiceScene, LinearScene, SceneIndex};

// ---------------------------------------------------------------------------
// Embedded story data — compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const AFTER_SCHOOL: &str = include_str!("../../stories/after_school.ron");
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum HostCommand {
    SetBackground { image: String },
    SwitchBackground { image: String },
    PlayScene { scene: usize, name: String, sentence: usize, animated: bool },
    NextSentence,
    Rewind,
    ClearText,
    Show,
    Hide,
    SpeedUp,
    StopTyping,
    DismissCharacters { animated: bool },
    RenameSpeaker { speaker: String, name: String },
    PlayAudio { music: Option<String>, sound: Option<String> },
    SetupChoice { scene: usize, prompt: Option<String>, options: Vec<String> },
    Activate { screen: String },
}

#[derive(serde::Serialize)]
struct DialogueView {
    visible: bool,
    sentence: usize,
    speaker: Option<String>,
    text: String,
    completed: bool,
}

type Queue = Rc<RefCell<Vec<HostCommand>>>;

fn push(queue: &Queue, command: HostCommand) {
    queue.borrow_mut().push(command);
}

// ---------------------------------------------------------------------------
// Host collaborators that queue commands for the page
// ---------------------------------------------------------------------------
struct QueueStage {
    dialogue: DialogueBox,
    queue: Queue,
}

impl Presentation for QueueStage {
    fn set_background(&mut self, image: &str) {
        push(&self.queue, HostCommand::SetBackground { image: image.to_string() });
    }

    fn switch_background(&mut self, image: &str) {
        push(&self.queue, HostCommand::SwitchBackground { image: image.to_string() });
    }

    fn play_scene(&mut self, index: SceneIndex, scene: &LinearScene, sentence: usize, animated: bool) {
        self.dialogue.play_scene(scene, sentence, animated);
        push(
            &self.queue,
            HostCommand::PlayScene {
                scene: index.0,
                name: scene.name.clone(),
                sentence: self.dialogue.sentence_index(),
                animated,
            },
        );
    }

    fn play_next_sentence(&mut self) {
        self.dialogue.play_next_sentence();
        push(&self.queue, HostCommand::NextSentence);
    }

    fn rewind(&mut self) {
        self.dialogue.go_back();
        push(&self.queue, HostCommand::Rewind);
    }

    fn clear_text(&mut self) {
        self.dialogue.clear();
        push(&self.queue, HostCommand::ClearText);
    }

    fn show(&mut self) {
        self.dialogue.set_visible(true);
        push(&self.queue, HostCommand::Show);
    }

    fn hide(&mut self) {
        self.dialogue.set_visible(false);
        push(&self.queue, HostCommand::Hide);
    }

    fn speed_up(&mut self) {
        self.dialogue.speed_up();
        push(&self.queue, HostCommand::SpeedUp);
    }

    fn stop_typing(&mut self) {
        self.dialogue.stop_typing();
        push(&self.queue, HostCommand::StopTyping);
    }

    fn dismiss_characters(&mut self, animated: bool) {
        push(&self.queue, HostCommand::DismissCharacters { animated });
    }

    fn rename_speaker(&mut self, speaker: &str, name: &str) {
        self.dialogue.set_speaker_name(speaker, name);
        push(
            &self.queue,
            HostCommand::RenameSpeaker {
                speaker: speaker.to_string(),
                name: name.to_string(),
            },
        );
    }

    fn is_completed(&self) -> bool {
        self.dialogue.is_completed()
    }

    fn is_first_sentence(&self) -> bool {
        self.dialogue.is_first_sentence()
    }

    fn is_last_sentence(&self) -> bool {
        self.dialogue.is_last_sentence()
    }

    fn sentence_index(&self) -> usize {
        self.dialogue.sentence_index()
    }
}

struct QueueAudio(Queue);

impl AudioPlayer for QueueAudio {
    fn play_audio(&mut self, music: Option<&str>, sound: Option<&str>) {
        push(
            &self.0,
            HostCommand::PlayAudio {
                music: music.map(str::to_string),
                sound: sound.map(str::to_string),
            },
        );
    }
}

struct QueueChoices(Queue);

impl ChoiceHost for QueueChoices {
    fn setup_choice(&mut self, index: SceneIndex, scene: &ChoiceScene) {
        push(
            &self.0,
            HostCommand::SetupChoice {
                scene: index.0,
                prompt: scene.prompt.clone(),
                options: scene.options.iter().map(|o| o.label.clone()).collect(),
            },
        );
    }
}

struct QueueScreens(Queue);

impl ScreenHost for QueueScreens {
    fn activate(&mut self, screen: &str) {
        push(&self.0, HostCommand::Activate { screen: screen.to_string() });
    }
}

fn state_label(state: SequencerState) -> &'static str {
    match state {
        SequencerState::Idle => "idle",
        SequencerState::Transitioning => "transitioning",
        SequencerState::Choosing => "choosing",
    }
}

fn millis(ms: f64) -> Duration {
    Duration::from_secs_f64(ms.max(0.0) / 1000.0)
}

// ---------------------------------------------------------------------------
// ScenePlayer — the main WASM-exported type
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct ScenePlayer {
    sequencer: Sequencer<QueueStage>,
    clock: ManualClock,
    queue: Queue,
    prefs: Rc<RefCell<MemoryPreferences>>,
    save_key: String,
    last_frame: Duration,
}

#[wasm_bindgen]
impl ScenePlayer {
    /// Create a player for a RON scene catalog. `saved_game` is the JSON
    /// record a previous session returned from [`ScenePlayer::saved_game`].
    #[wasm_bindgen(constructor)]
    pub fn new(
        catalog_ron: &str,
        config_ron: Option<String>,
        saved_game: Option<String>,
    ) -> Result<ScenePlayer, JsError> {
        let catalog = SceneCatalog::parse_ron(catalog_ron)
            .map_err(|e| JsError::new(&format!("Catalog parse error: {e}")))?;
        let config = match config_ron {
            Some(src) => SequencerConfig::parse_ron(&src)
                .map_err(|e| JsError::new(&format!("Config parse error: {e}")))?,
            None => SequencerConfig::default(),
        };

        let save_key = config.save_key.clone();
        let prefs = Rc::new(RefCell::new(MemoryPreferences::new()));
        if let Some(json) = saved_game {
            prefs.borrow_mut().set_string(&save_key, json);
        }

        let queue: Queue = Rc::new(RefCell::new(Vec::new()));
        let clock = ManualClock::new();
        let sequencer = Sequencer::builder()
            .with_catalog(catalog)
            .with_config(config)
            .presentation(QueueStage {
                dialogue: DialogueBox::default(),
                queue: queue.clone(),
            })
            .audio(QueueAudio(queue.clone()))
            .choices(QueueChoices(queue.clone()))
            .screens(QueueScreens(queue.clone()))
            .store(PrefsSaveStore::new(prefs.clone(), save_key.clone()))
            .clock(clock.clone())
            .build()
            .map_err(|e| JsError::new(&format!("Sequencer build error: {e}")))?;

        Ok(ScenePlayer {
            sequencer,
            clock,
            queue,
            prefs,
            save_key,
            last_frame: Duration::ZERO,
        })
    }

    /// A player for the bundled "after school" story.
    pub fn demo(saved_game: Option<String>) -> Result<ScenePlayer, JsError> {
        ScenePlayer::new(data::AFTER_SCHOOL, None, saved_game)
    }

    /// Resume the saved game if there is one, otherwise start a new game.
    pub fn start(&mut self) -> Result<(), JsError> {
        self.sequencer
            .start()
            .map_err(|e| JsError::new(&format!("Start error: {e}")))
    }

    /// Drop the saved game and start over.
    pub fn new_game(&mut self) -> Result<(), JsError> {
        self.sequencer
            .discard_save()
            .and_then(|_| self.sequencer.new_game())
            .map_err(|e| JsError::new(&format!("New game error: {e}")))
    }

    /// Advance time to `now_ms` (a page timestamp such as
    /// `performance.now()`), type out text and run due transition phases.
    /// Returns the sequencer state after the frame.
    pub fn frame(&mut self, now_ms: f64) -> String {
        let now = millis(now_ms);
        self.clock.set(now);
        let elapsed = now.saturating_sub(self.last_frame);
        self.last_frame = now;
        self.sequencer.presentation_mut().dialogue.update(elapsed);
        state_label(self.sequencer.tick()).to_string()
    }

    pub fn click(&mut self) -> Result<(), JsError> {
        self.input(Input::Click)
    }

    pub fn right_click(&mut self) -> Result<(), JsError> {
        self.input(Input::RightClick)
    }

    /// A key press by DOM key name. "Escape" saves and returns to the menu.
    pub fn key(&mut self, name: &str) -> Result<(), JsError> {
        let key = if name.eq_ignore_ascii_case("escape") {
            Key::Escape
        } else {
            Key::Named(name.to_string())
        };
        self.input(Input::Key(key))
    }

    pub fn choose(&mut self, option: usize) -> Result<(), JsError> {
        self.sequencer
            .resolve_choice(option)
            .map_err(|e| JsError::new(&format!("Choice error: {e}")))
    }

    /// Take every command queued since the last call, as a JSON array.
    pub fn drain_commands(&mut self) -> Result<String, JsError> {
        let commands: Vec<HostCommand> = self.queue.borrow_mut().drain(..).collect();
        serde_json::to_string(&commands)
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// The dialogue box as the page should draw it right now.
    pub fn dialogue(&self) -> Result<String, JsError> {
        let dialogue = &self.sequencer.presentation().dialogue;
        let view = DialogueView {
            visible: dialogue.is_visible(),
            sentence: dialogue.sentence_index(),
            speaker: dialogue.speaker_name().map(str::to_string),
            text: dialogue.visible_text(),
            completed: dialogue.is_completed(),
        };
        serde_json::to_string(&view)
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// Show `speaker`'s lines under a player-chosen `name`. An empty name
    /// restores the scripted one.
    pub fn rename_speaker(&mut self, speaker: &str, name: &str) {
        self.sequencer.set_speaker_name(speaker, name);
    }

    pub fn state(&self) -> String {
        state_label(self.sequencer.state()).to_string()
    }

    pub fn is_handed_off(&self) -> bool {
        self.sequencer.is_handed_off()
    }

    /// The saved game record, for the page to keep in `localStorage`.
    pub fn saved_game(&self) -> Option<String> {
        self.prefs.borrow().get_string(&self.save_key)
    }
}

impl ScenePlayer {
    fn input(&mut self, input: Input) -> Result<(), JsError> {
        self.sequencer
            .handle_input(input)
            .map_err(|e| JsError::new(&format!("Input error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(player: &ScenePlayer) -> Vec<HostCommand> {
        player.queue.borrow_mut().drain(..).collect()
    }

    fn started() -> ScenePlayer {
        let mut player = ScenePlayer::demo(None).unwrap();
        player.start().unwrap();
        player
    }

    fn read_sentence(player: &mut ScenePlayer, now_ms: &mut f64) {
        *now_ms += 10_000.0;
        player.frame(*now_ms);
        player.click().unwrap();
    }

    #[test]
    fn demo_starts_at_the_first_scene() {
        let player = started();
        let commands = drain(&player);
        assert!(commands.contains(&HostCommand::SetBackground {
            image: "bg/classroom.png".to_string()
        }));
        assert!(commands.contains(&HostCommand::PlayAudio {
            music: Some("music/afternoon.ogg".to_string()),
            sound: None,
        }));
        assert!(commands.contains(&HostCommand::PlayScene {
            scene: 0,
            name: "classroom".to_string(),
            sentence: 0,
            animated: false,
        }));
        assert_eq!(player.state(), "idle");
    }

    #[test]
    fn frames_type_out_the_sentence() {
        let mut player = started();
        // The opening sentence appears complete; the next one types.
        player.click().unwrap();
        assert!(player.dialogue().unwrap().contains(r#""completed":false"#));
        player.frame(10_000.0);
        assert!(player.dialogue().unwrap().contains(r#""completed":true"#));
    }

    #[test]
    fn walking_to_the_choice_queues_the_options() {
        let mut player = started();
        let mut now = 0.0;
        for _ in 0..4 {
            read_sentence(&mut player, &mut now);
        }
        now += 5_000.0;
        assert_eq!(player.frame(now), "choosing");
        let commands = drain(&player);
        assert!(commands.contains(&HostCommand::SetupChoice {
            scene: 1,
            prompt: Some("Go to the club meeting?".to_string()),
            options: vec!["Go with Aiko".to_string(), "Head home".to_string()],
        }));
    }

    #[test]
    fn escape_saves_for_the_page() {
        let mut player = started();
        player.key("Escape").unwrap();
        assert!(player.is_handed_off());
        assert_eq!(
            player.saved_game().as_deref(),
            Some(r#"{"sentence":0,"prevScenes":[0]}"#)
        );
        assert!(drain(&player).contains(&HostCommand::Activate {
            screen: "menu".to_string()
        }));

        let mut resumed = ScenePlayer::demo(player.saved_game()).unwrap();
        resumed.start().unwrap();
        assert_eq!(resumed.state(), "idle");
    }

    #[test]
    fn renamed_speaker_reaches_the_page() {
        let mut player = started();
        player.rename_speaker("Aiko", "Captain");
        let mut now = 0.0;
        read_sentence(&mut player, &mut now);
        read_sentence(&mut player, &mut now);
        now += 10_000.0;
        player.frame(now);
        assert!(player.dialogue().unwrap().contains(r#""speaker":"Captain""#));
        assert!(drain(&player).contains(&HostCommand::RenameSpeaker {
            speaker: "Aiko".to_string(),
            name: "Captain".to_string(),
        }));
    }

    #[test]
    fn drained_commands_are_tagged_json() {
        let mut player = started();
        let json = player.drain_commands().unwrap();
        assert!(json.starts_with(r#"[{"type":"dismiss_characters","animated":false},"#));
        assert!(json.contains(r#"{"type":"set_background","image":"bg/classroom.png"}"#));
        assert_eq!(player.drain_commands().unwrap(), "[]");
    }
}
