//! Recording fakes for the host collaborators.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use scene_engine::core::catalog::SceneCatalog;
use scene_engine::core::clock::ManualClock;
use scene_engine::core::dialogue::DialogueBox;
use scene_engine::core::host::{AudioPlayer, ChoiceHost, Presentation, ScreenHost};
use scene_engine::core::persistence::{MemoryPreferences, PersistenceError, PrefsSaveStore, SaveStore};
use scene_engine::core::sequencer::{Sequencer, SequencerBuilder};
use scene_engine::schema::scene::{ChoiceScene, LinearScene, SceneIndex};
use scene_engine::schema::snapshot::Snapshot;

/// One command received by a collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetBackground(String),
    SwitchBackground(String),
    PlayScene {
        scene: usize,
        sentence: usize,
        animated: bool,
    },
    PlayNextSentence,
    Rewind,
    ClearText,
    Show,
    Hide,
    SpeedUp,
    StopTyping,
    DismissCharacters(bool),
    RenameSpeaker(String, String),
    PlayAudio(Option<String>, Option<String>),
    SetupChoice(usize),
    Activate(String),
}

pub type Log = Rc<RefCell<Vec<Call>>>;

/// Presentation sink backed by a real [`DialogueBox`], logging every command.
pub struct RecordingStage {
    pub log: Log,
    pub dialogue: DialogueBox,
}

impl RecordingStage {
    pub fn new(log: Log) -> Self {
        Self {
            log,
            dialogue: DialogueBox::default(),
        }
    }

    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }
}

impl Presentation for RecordingStage {
    fn set_background(&mut self, image: &str) {
        self.record(Call::SetBackground(image.to_string()));
    }

    fn switch_background(&mut self, image: &str) {
        self.record(Call::SwitchBackground(image.to_string()));
    }

    fn play_scene(&mut self, index: SceneIndex, scene: &LinearScene, sentence: usize, animated: bool) {
        self.record(Call::PlayScene {
            scene: index.0,
            sentence,
            animated,
        });
        self.dialogue.play_scene(scene, sentence, animated);
    }

    fn play_next_sentence(&mut self) {
        self.record(Call::PlayNextSentence);
        self.dialogue.play_next_sentence();
    }

    fn rewind(&mut self) {
        self.record(Call::Rewind);
        self.dialogue.go_back();
    }

    fn clear_text(&mut self) {
        self.record(Call::ClearText);
        self.dialogue.clear();
    }

    fn show(&mut self) {
        self.record(Call::Show);
    }

    fn hide(&mut self) {
        self.record(Call::Hide);
    }

    fn speed_up(&mut self) {
        self.record(Call::SpeedUp);
        self.dialogue.speed_up();
    }

    fn stop_typing(&mut self) {
        self.record(Call::StopTyping);
        self.dialogue.stop_typing();
    }

    fn dismiss_characters(&mut self, animated: bool) {
        self.record(Call::DismissCharacters(animated));
    }

    fn rename_speaker(&mut self, speaker: &str, name: &str) {
        self.record(Call::RenameSpeaker(speaker.to_string(), name.to_string()));
        self.dialogue.set_speaker_name(speaker, name);
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

pub struct RecordingAudio(pub Log);

impl AudioPlayer for RecordingAudio {
    fn play_audio(&mut self, music: Option<&str>, sound: Option<&str>) {
        self.0.borrow_mut().push(Call::PlayAudio(
            music.map(str::to_string),
            sound.map(str::to_string),
        ));
    }
}

pub struct RecordingChoices(pub Log);

impl ChoiceHost for RecordingChoices {
    fn setup_choice(&mut self, index: SceneIndex, _scene: &ChoiceScene) {
        self.0.borrow_mut().push(Call::SetupChoice(index.0));
    }
}

pub struct RecordingScreens(pub Log);

impl ScreenHost for RecordingScreens {
    fn activate(&mut self, screen: &str) {
        self.0.borrow_mut().push(Call::Activate(screen.to_string()));
    }
}

/// Preferences shared between a test and the sequencer that owns the store.
pub type SharedPrefs = Rc<RefCell<MemoryPreferences>>;

/// A save slot whose writes always fail.
pub struct FailingStore;

impl SaveStore for FailingStore {
    fn has_saved(&self) -> bool {
        false
    }

    fn save(&mut self, _snapshot: &Snapshot) -> Result<(), PersistenceError> {
        Err(PersistenceError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }

    fn load(&self) -> Result<Option<Snapshot>, PersistenceError> {
        Ok(None)
    }

    fn clear(&mut self) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// A sequencer wired to recording fakes, plus handles to inspect them.
pub struct Harness {
    pub seq: Sequencer<RecordingStage>,
    pub clock: ManualClock,
    pub log: Log,
    pub prefs: SharedPrefs,
}

impl Harness {
    pub fn new(catalog: SceneCatalog) -> Self {
        Self::with_prefs(catalog, SharedPrefs::default())
    }

    pub fn with_prefs(catalog: SceneCatalog, prefs: SharedPrefs) -> Self {
        let store = PrefsSaveStore::new(prefs.clone(), "savedGame");
        Self::assemble(catalog, prefs, |builder, log| {
            builder
                .audio(RecordingAudio(log.clone()))
                .choices(RecordingChoices(log.clone()))
                .screens(RecordingScreens(log.clone()))
                .store(store)
        })
    }

    /// All hosts recorded, saves going to `store`.
    pub fn with_store(catalog: SceneCatalog, store: impl SaveStore + 'static) -> Self {
        Self::assemble(catalog, SharedPrefs::default(), |builder, log| {
            builder
                .audio(RecordingAudio(log.clone()))
                .choices(RecordingChoices(log.clone()))
                .screens(RecordingScreens(log.clone()))
                .store(store)
        })
    }

    /// Only the presentation sink: no audio, choice, screen host or store.
    pub fn without_hosts(catalog: SceneCatalog) -> Self {
        Self::assemble(catalog, SharedPrefs::default(), |builder, _| builder)
    }

    fn assemble(
        catalog: SceneCatalog,
        prefs: SharedPrefs,
        hosts: impl FnOnce(SequencerBuilder<RecordingStage>, &Log) -> SequencerBuilder<RecordingStage>,
    ) -> Self {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let clock = ManualClock::new();
        let builder = Sequencer::builder()
            .with_catalog(catalog)
            .presentation(RecordingStage::new(log.clone()))
            .clock(clock.clone());
        let seq = hosts(builder, &log).build().expect("sequencer builds");
        Self {
            seq,
            clock,
            log,
            prefs,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn activations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Activate(screen) => Some(screen),
                _ => None,
            })
            .collect()
    }

    /// Finish typing the current sentence, as if the player waited.
    pub fn finish_typing(&mut self) {
        self.seq.presentation_mut().dialogue.stop_typing();
    }

    /// Let an animated transition run to completion.
    pub fn settle(&mut self) {
        self.clock.advance_ms(3_000);
        self.seq.tick();
    }

    /// Click through the current sentence: finish typing, then advance.
    /// Presses are spaced past the debounce window.
    pub fn read_on(&mut self) {
        self.clock.advance_ms(600);
        self.finish_typing();
        self.seq.advance();
    }
}

pub fn load_fixture(name: &str) -> SceneCatalog {
    let path = std::path::PathBuf::from(format!("tests/fixtures/{name}"));
    SceneCatalog::load_from_ron(&path).expect("fixture catalog loads")
}
