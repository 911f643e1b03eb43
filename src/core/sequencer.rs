/// The scene sequencer: input → transition decision → host commands.
///
/// Owns the current scene, the back-navigation history and the
/// Idle/Transitioning/Choosing state. Animated transitions are explicit
/// phase values with deadlines; the host drives them by calling
/// [`Sequencer::tick`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::core::catalog::{CatalogError, SceneCatalog};
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::{ConfigError, SequencerConfig};
use crate::core::debounce::{PressAction, PressDebouncer};
use crate::core::host::{AudioPlayer, ChoiceHost, Presentation, ScreenHost};
use crate::core::persistence::{PersistenceError, SaveStore};
use crate::schema::scene::{Scene, SceneIndex, Sentence};
use crate::schema::snapshot::Snapshot;

#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("no scene catalog was provided")]
    MissingCatalog,
    #[error("no presentation sink was provided")]
    MissingPresentation,
    #[error("scene {index} is out of range for a catalog of {len} scenes")]
    SceneOutOfRange { index: SceneIndex, len: usize },
    #[error("history entry {0} is not a linear scene")]
    NotLinear(SceneIndex),
    #[error("a scene transition is already in progress")]
    TransitionInProgress,
    #[error("the sequencer is not accepting input")]
    NotAcceptingInput,
    #[error("no choice is waiting to be resolved")]
    NoPendingChoice,
    #[error("choice option {option} does not exist ({count} options)")]
    InvalidOption { option: usize, count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    /// Accepting input.
    Idle,
    /// A scene change is being presented; input is ignored.
    Transitioning,
    /// The choice host owns the screen until an option is resolved.
    Choosing,
}

/// The pause an animated transition is currently sitting in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    /// UI is hiding; next the target scene is entered and the background swapped.
    WaitingForHide,
    /// Background is cross-fading; next the text box is cleared and shown.
    WaitingForBackgroundSwap,
    /// Text box is appearing; next the scene starts playing.
    WaitingForReveal,
}

#[derive(Debug, Clone, Copy)]
struct PendingTransition {
    target: SceneIndex,
    sentence: usize,
    phase: TransitionPhase,
    deadline: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Escape,
    /// Any other key, by name. Bound through [`SequencerConfig`].
    Named(String),
}

/// Explicit host input, replacing per-frame device polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Click,
    RightClick,
    Key(Key),
}

/// The scene sequencer. Built via `Sequencer::builder()`.
pub struct Sequencer<P: Presentation> {
    catalog: SceneCatalog,
    config: SequencerConfig,
    presentation: P,
    audio: Option<Box<dyn AudioPlayer>>,
    choices: Option<Box<dyn ChoiceHost>>,
    screens: Option<Box<dyn ScreenHost>>,
    store: Option<Box<dyn SaveStore>>,
    clock: Box<dyn Clock>,
    debouncer: PressDebouncer,
    state: SequencerState,
    current: SceneIndex,
    history: Vec<SceneIndex>,
    pending: Option<PendingTransition>,
    handed_off: bool,
    /// Set when a saved game could not be restored. Cleared by the next
    /// successful `start`, `new_game`, `restore` or `go_to_scene`.
    halted: bool,
    speaker_names: BTreeMap<String, String>,
}

/// Builder for constructing a `Sequencer`.
pub struct SequencerBuilder<P: Presentation> {
    catalog: Option<SceneCatalog>,
    catalog_path: Option<PathBuf>,
    config: Option<SequencerConfig>,
    config_path: Option<PathBuf>,
    presentation: Option<P>,
    audio: Option<Box<dyn AudioPlayer>>,
    choices: Option<Box<dyn ChoiceHost>>,
    screens: Option<Box<dyn ScreenHost>>,
    store: Option<Box<dyn SaveStore>>,
    clock: Option<Box<dyn Clock>>,
}

impl<P: Presentation> Sequencer<P> {
    pub fn builder() -> SequencerBuilder<P> {
        SequencerBuilder {
            catalog: None,
            catalog_path: None,
            config: None,
            config_path: None,
            presentation: None,
            audio: None,
            choices: None,
            screens: None,
            store: None,
            clock: None,
        }
    }

    /// Resume from the save slot if it holds a readable snapshot, otherwise
    /// begin a new game. A snapshot naming scenes the catalog cannot serve
    /// is a configuration error and nothing is rendered.
    pub fn start(&mut self) -> Result<(), SequencerError> {
        match self.saved_snapshot() {
            Some(snapshot) => self.restore(&snapshot),
            None => self.new_game(),
        }
    }

    /// Present the catalog's start scene immediately.
    pub fn new_game(&mut self) -> Result<(), SequencerError> {
        self.reset_runtime();
        let start = self.catalog.start();
        info!(scene = %start, "starting new game");
        self.go_to_scene(start, None, false)
    }

    /// Rebuild history from `snapshot` and present its last scene at the
    /// saved sentence, without animation.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), SequencerError> {
        let history = snapshot.history();
        for &index in &history {
            let rejected = match self.catalog.get(index) {
                Some(Scene::Linear(_)) => continue,
                Some(_) => SequencerError::NotLinear(index),
                None => SequencerError::SceneOutOfRange {
                    index,
                    len: self.catalog.len(),
                },
            };
            error!(scene = %index, error = %rejected, "saved game does not fit the catalog");
            self.reset_runtime();
            self.halted = true;
            return Err(rejected);
        }

        let Some(&last) = history.last() else {
            warn!("saved snapshot has an empty history; starting a new game");
            return self.new_game();
        };

        self.reset_runtime();
        self.history = history;
        self.current = last;
        info!(
            scene = %last,
            sentence = snapshot.sentence,
            depth = self.history.len(),
            "restoring saved game"
        );
        self.present_now(last, snapshot.sentence);
        Ok(())
    }

    /// Move to `target`. `sentence` defaults to the first one. Animated
    /// transitions pause between phases and finish through [`tick`](Self::tick);
    /// unanimated ones are applied before this returns.
    pub fn go_to_scene(
        &mut self,
        target: SceneIndex,
        sentence: Option<usize>,
        animated: bool,
    ) -> Result<(), SequencerError> {
        if self.pending.is_some() {
            return Err(SequencerError::TransitionInProgress);
        }
        if self.catalog.get(target).is_none() {
            return Err(SequencerError::SceneOutOfRange {
                index: target,
                len: self.catalog.len(),
            });
        }

        debug!(scene = %target, ?sentence, animated, "switching scene");
        self.presentation.dismiss_characters(animated);
        self.state = SequencerState::Transitioning;
        self.current = target;
        self.handed_off = false;
        self.halted = false;
        let sentence = sentence.unwrap_or(0);

        if animated {
            self.presentation.hide();
            self.pending = Some(PendingTransition {
                target,
                sentence,
                phase: TransitionPhase::WaitingForHide,
                deadline: self.clock.now() + self.config.phase_pause(),
            });
        } else {
            let now = self.clock.now();
            self.enter_scene(target, sentence, false, now);
        }
        Ok(())
    }

    /// Forward input: finish or skip typing, next sentence, or next scene.
    pub fn advance(&mut self) {
        if !self.accepts_input() {
            return;
        }

        let action = self.debouncer.press(self.clock.now());
        if !self.presentation.is_completed() {
            match action {
                PressAction::Single => {}
                PressAction::SpeedUp => self.presentation.speed_up(),
                PressAction::Skip => self.presentation.stop_typing(),
            }
            return;
        }

        if self.presentation.is_last_sentence() {
            let next = self
                .catalog
                .get(self.current)
                .and_then(Scene::as_linear)
                .and_then(|scene| scene.next);
            match next {
                Some(next) => {
                    if let Err(e) = self.go_to_scene(next, None, true) {
                        error!(scene = %next, error = %e, "could not advance to next scene");
                    }
                }
                None => info!(scene = %self.current, "reached the end of the story"),
            }
        } else {
            self.presentation.play_next_sentence();
            let index = self.presentation.sentence_index();
            if let Some(Scene::Linear(scene)) = self.catalog.get(self.current) {
                if let Some(sentence) = scene.sentences.get(index) {
                    play_audio(&mut self.audio, sentence);
                }
            }
        }
    }

    /// Back input: previous sentence, or, from a scene's first sentence,
    /// the second-to-last sentence of the scene before the last decision.
    pub fn go_back(&mut self) {
        if !self.accepts_input() {
            return;
        }

        if !self.presentation.is_first_sentence() {
            self.presentation.rewind();
            return;
        }
        if self.history.len() <= 1 {
            debug!("already at the first scene");
            return;
        }

        self.presentation.stop_typing();
        self.history.pop();
        let Some(previous) = self.history.pop() else {
            return;
        };
        let sentence = self
            .catalog
            .get(previous)
            .and_then(Scene::as_linear)
            .map(|scene| scene.rewind_target())
            .unwrap_or(0);

        debug!(scene = %previous, sentence, "going back");
        if let Err(e) = self.go_to_scene(previous, Some(sentence), false) {
            error!(scene = %previous, error = %e, "could not go back");
        }
    }

    /// Pick option `option` of the choice on screen.
    pub fn resolve_choice(&mut self, option: usize) -> Result<(), SequencerError> {
        if self.state != SequencerState::Choosing {
            return Err(SequencerError::NoPendingChoice);
        }
        let next = match self.catalog.get(self.current) {
            Some(Scene::Choice(choice)) => choice
                .options
                .get(option)
                .map(|o| o.next)
                .ok_or(SequencerError::InvalidOption {
                    option,
                    count: choice.options.len(),
                })?,
            _ => return Err(SequencerError::NoPendingChoice),
        };
        debug!(option, scene = %next, "choice resolved");
        self.go_to_scene(next, None, true)
    }

    /// Save progress and return to the menu screen. If saving fails the
    /// error is returned and the sequencer keeps control.
    pub fn checkpoint(&mut self) -> Result<(), SequencerError> {
        if self.pending.is_some() || self.state == SequencerState::Transitioning {
            return Err(SequencerError::TransitionInProgress);
        }
        if !self.accepts_input() {
            return Err(SequencerError::NotAcceptingInput);
        }
        let snapshot = self.snapshot();
        match self.store.as_mut() {
            Some(store) => {
                store.save(&snapshot)?;
                info!(
                    sentence = snapshot.sentence,
                    depth = snapshot.prev_scenes.len(),
                    "progress saved"
                );
            }
            None => warn!("no save store configured; progress not saved"),
        }
        let menu = self.config.menu_screen.clone();
        self.hand_off(&menu);
        Ok(())
    }

    /// Forget the saved game, if any.
    pub fn discard_save(&mut self) -> Result<(), SequencerError> {
        match self.store.as_mut() {
            Some(store) => store.clear()?,
            None => warn!("no save store configured; nothing to discard"),
        }
        Ok(())
    }

    /// Display `speaker`'s lines under `name`. An empty (or blank) name
    /// restores the scripted one.
    pub fn set_speaker_name(&mut self, speaker: &str, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            self.speaker_names.remove(speaker);
        } else {
            self.speaker_names.insert(speaker.to_string(), name.to_string());
        }
        info!(speaker, name, "speaker renamed");
        self.presentation.rename_speaker(speaker, name);
    }

    /// The name `speaker` is currently shown under.
    pub fn speaker_name<'a>(&'a self, speaker: &'a str) -> &'a str {
        self.speaker_names
            .get(speaker)
            .map(String::as_str)
            .unwrap_or(speaker)
    }

    /// Run every transition phase whose pause has elapsed.
    pub fn tick(&mut self) -> SequencerState {
        let now = self.clock.now();
        while let Some(pending) = self.pending {
            if now < pending.deadline {
                break;
            }
            self.pending = None;
            self.finish_phase(pending);
        }
        self.state
    }

    pub fn handle_input(&mut self, input: Input) -> Result<(), SequencerError> {
        if !self.accepts_input() {
            debug!(?input, state = ?self.state, "input ignored");
            return Ok(());
        }
        match input {
            Input::Click => self.advance(),
            Input::RightClick => self.go_back(),
            Input::Key(Key::Escape) => return self.checkpoint(),
            Input::Key(Key::Named(name)) => {
                if self.config.is_advance_key(&name) {
                    self.advance();
                } else if self.config.is_back_key(&name) {
                    self.go_back();
                } else {
                    debug!(key = %name, "unbound key");
                }
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.presentation.sentence_index(), &self.history)
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn current_scene(&self) -> SceneIndex {
        self.current
    }

    pub fn history(&self) -> &[SceneIndex] {
        &self.history
    }

    pub fn transition_phase(&self) -> Option<TransitionPhase> {
        self.pending.map(|p| p.phase)
    }

    /// When the host must call [`tick`](Self::tick) next, if a transition is pending.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.map(|p| p.deadline)
    }

    /// True after a saved game failed to restore. Input is ignored until a
    /// scene is presented again.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// True once control has gone to another screen (a handoff scene or a
    /// checkpoint). Input is ignored until `start` or `go_to_scene`.
    pub fn is_handed_off(&self) -> bool {
        self.handed_off
    }

    pub fn catalog(&self) -> &SceneCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut P {
        &mut self.presentation
    }

    fn accepts_input(&self) -> bool {
        self.state == SequencerState::Idle
            && self.pending.is_none()
            && !self.handed_off
            && !self.halted
    }

    fn saved_snapshot(&self) -> Option<Snapshot> {
        let store = self.store.as_ref()?;
        if !store.has_saved() {
            return None;
        }
        match store.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "saved game is unreadable; starting a new game");
                None
            }
        }
    }

    fn reset_runtime(&mut self) {
        self.history.clear();
        self.pending = None;
        self.handed_off = false;
        self.halted = false;
        self.debouncer.reset();
        self.state = SequencerState::Idle;
    }

    fn hand_off(&mut self, screen: &str) {
        self.handed_off = true;
        self.pending = None;
        info!(screen, "handing control to screen");
        match self.screens.as_mut() {
            Some(screens) => screens.activate(screen),
            None => warn!(screen, "no screen host configured; handoff dropped"),
        }
    }

    /// Enter `target` once the UI is out of the way. `base` is the time the
    /// previous phase ended, so pauses do not drift with late ticks.
    fn enter_scene(&mut self, target: SceneIndex, sentence: usize, animated: bool, base: Duration) {
        match self.catalog.get(target) {
            Some(Scene::Linear(scene)) => {
                self.history.push(target);
                if animated {
                    let sentence = sentence.min(scene.last_sentence());
                    play_audio(&mut self.audio, &scene.sentences[sentence]);
                    self.presentation.switch_background(&scene.background);
                    self.pending = Some(PendingTransition {
                        target,
                        sentence,
                        phase: TransitionPhase::WaitingForBackgroundSwap,
                        deadline: base + self.config.phase_pause(),
                    });
                } else {
                    self.present_now(target, sentence);
                }
            }
            Some(Scene::Choice(choice)) => {
                self.state = SequencerState::Choosing;
                match self.choices.as_mut() {
                    Some(host) => host.setup_choice(target, choice),
                    None => warn!(scene = %target, "no choice host configured; choice not shown"),
                }
            }
            Some(Scene::Handoff(handoff)) => {
                let screen = handoff.screen.clone();
                self.hand_off(&screen);
            }
            None => {
                error!(scene = %target, "scene vanished from the catalog");
                self.state = SequencerState::Idle;
            }
        }
    }

    fn finish_phase(&mut self, pending: PendingTransition) {
        let PendingTransition {
            target,
            sentence,
            phase,
            deadline,
        } = pending;
        debug!(scene = %target, ?phase, "transition phase elapsed");
        match phase {
            TransitionPhase::WaitingForHide => self.enter_scene(target, sentence, true, deadline),
            TransitionPhase::WaitingForBackgroundSwap => {
                self.presentation.clear_text();
                self.presentation.show();
                self.pending = Some(PendingTransition {
                    phase: TransitionPhase::WaitingForReveal,
                    deadline: deadline + self.config.phase_pause(),
                    ..pending
                });
            }
            TransitionPhase::WaitingForReveal => {
                if let Some(Scene::Linear(scene)) = self.catalog.get(target) {
                    self.presentation.play_scene(target, scene, sentence, true);
                }
                self.state = SequencerState::Idle;
            }
        }
    }

    /// Apply a Linear scene in one step: audio, background, text.
    fn present_now(&mut self, target: SceneIndex, sentence: usize) {
        let Some(Scene::Linear(scene)) = self.catalog.get(target) else {
            error!(scene = %target, "cannot present a non-linear scene directly");
            return;
        };
        let clamped = sentence.min(scene.last_sentence());
        if clamped != sentence {
            warn!(scene = %target, sentence, "sentence index past the end of the scene");
        }
        play_audio(&mut self.audio, &scene.sentences[clamped]);
        self.presentation.set_background(&scene.background);
        self.presentation.clear_text();
        self.presentation.play_scene(target, scene, clamped, false);
        self.state = SequencerState::Idle;
    }
}

fn play_audio(audio: &mut Option<Box<dyn AudioPlayer>>, sentence: &Sentence) {
    match audio.as_mut() {
        Some(player) => player.play_audio(sentence.music.as_deref(), sentence.sound.as_deref()),
        None if sentence.has_audio() => warn!("no audio player configured; cue dropped"),
        None => {}
    }
}

impl<P: Presentation> SequencerBuilder<P> {
    /// Provide the catalog directly.
    pub fn with_catalog(mut self, catalog: SceneCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Load the catalog from a RON file at build time.
    pub fn catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    pub fn with_config(mut self, config: SequencerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load the config from a RON file at build time.
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn presentation(mut self, presentation: P) -> Self {
        self.presentation = Some(presentation);
        self
    }

    pub fn audio(mut self, audio: impl AudioPlayer + 'static) -> Self {
        self.audio = Some(Box::new(audio));
        self
    }

    pub fn choices(mut self, choices: impl ChoiceHost + 'static) -> Self {
        self.choices = Some(Box::new(choices));
        self
    }

    pub fn screens(mut self, screens: impl ScreenHost + 'static) -> Self {
        self.screens = Some(Box::new(screens));
        self
    }

    pub fn store(mut self, store: impl SaveStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn build(self) -> Result<Sequencer<P>, SequencerError> {
        let catalog = match (self.catalog, self.catalog_path) {
            (Some(catalog), _) => catalog,
            (None, Some(path)) => SceneCatalog::load_from_ron(&path)?,
            (None, None) => return Err(SequencerError::MissingCatalog),
        };
        let config = match (self.config, self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => SequencerConfig::load_from_ron(&path)?,
            (None, None) => SequencerConfig::default(),
        };
        let presentation = self
            .presentation
            .ok_or(SequencerError::MissingPresentation)?;
        let clock = self
            .clock
            .unwrap_or_else(|| Box::new(SystemClock::new()));

        if self.audio.is_none() {
            warn!("sequencer built without an audio player");
        }
        if self.choices.is_none() {
            warn!("sequencer built without a choice host");
        }
        if self.screens.is_none() {
            warn!("sequencer built without a screen host");
        }

        let start = catalog.start();
        Ok(Sequencer {
            debouncer: PressDebouncer::new(config.debounce_window()),
            catalog,
            config,
            presentation,
            audio: self.audio,
            choices: self.choices,
            screens: self.screens,
            store: self.store,
            clock,
            state: SequencerState::Idle,
            current: start,
            history: Vec::new(),
            pending: None,
            handed_off: false,
            halted: false,
            speaker_names: BTreeMap::new(),
        })
    }
}
