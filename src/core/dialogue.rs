/// Dialogue box model — sentence cursor and typewriter reveal.
///
/// Hosts embed a [`DialogueBox`] to answer the query half of
/// [`Presentation`](crate::core::host::Presentation) without re-implementing
/// the bookkeeping: which sentence is showing, and how much of it is typed.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::schema::scene::{LinearScene, Sentence};

pub const DEFAULT_CHARS_PER_SECOND: f32 = 40.0;
pub const SPEED_UP_FACTOR: f32 = 4.0;

#[derive(Debug, Clone)]
pub struct DialogueBox {
    sentences: Vec<Sentence>,
    index: usize,
    /// Characters of the current sentence shown so far.
    revealed: usize,
    /// Fractional characters carried between updates.
    carry: f32,
    chars_per_second: f32,
    speed: f32,
    visible: bool,
    /// Player-chosen display names, keyed by scripted speaker.
    speaker_names: BTreeMap<String, String>,
}

impl Default for DialogueBox {
    fn default() -> Self {
        Self::new(DEFAULT_CHARS_PER_SECOND)
    }
}

impl DialogueBox {
    pub fn new(chars_per_second: f32) -> Self {
        Self {
            sentences: Vec::new(),
            index: 0,
            revealed: 0,
            carry: 0.0,
            chars_per_second,
            speed: 1.0,
            visible: true,
            speaker_names: BTreeMap::new(),
        }
    }

    /// Load a scene and show `sentence`. Animated scenes type from the
    /// start; otherwise the sentence appears complete.
    pub fn play_scene(&mut self, scene: &LinearScene, sentence: usize, animated: bool) {
        self.sentences = scene.sentences.clone();
        self.index = sentence.min(self.sentences.len().saturating_sub(1));
        self.restart_typing();
        if !animated {
            self.stop_typing();
        }
    }

    pub fn play_next_sentence(&mut self) {
        if self.index + 1 < self.sentences.len() {
            self.index += 1;
        }
        self.restart_typing();
    }

    /// Step back one sentence, shown complete.
    pub fn go_back(&mut self) {
        self.index = self.index.saturating_sub(1);
        self.restart_typing();
        self.stop_typing();
    }

    pub fn speed_up(&mut self) {
        self.speed = SPEED_UP_FACTOR;
    }

    pub fn stop_typing(&mut self) {
        self.revealed = self.current_len();
        self.carry = 0.0;
    }

    pub fn clear(&mut self) {
        self.sentences.clear();
        self.index = 0;
        self.restart_typing();
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Reveal characters for `elapsed` of typing time.
    pub fn update(&mut self, elapsed: Duration) {
        if self.is_completed() {
            return;
        }
        self.carry += elapsed.as_secs_f32() * self.chars_per_second * self.speed;
        let whole = self.carry.floor();
        self.carry -= whole;
        self.revealed = (self.revealed + whole as usize).min(self.current_len());
    }

    pub fn current(&self) -> Option<&Sentence> {
        self.sentences.get(self.index)
    }

    /// Show `speaker`'s lines under `name` from now on. An empty name
    /// restores the scripted one.
    pub fn set_speaker_name(&mut self, speaker: &str, name: &str) {
        if name.is_empty() {
            self.speaker_names.remove(speaker);
        } else {
            self.speaker_names.insert(speaker.to_string(), name.to_string());
        }
    }

    /// Display name for the current sentence's speaker.
    pub fn speaker_name(&self) -> Option<&str> {
        let speaker = self.current()?.speaker.as_deref()?;
        Some(
            self.speaker_names
                .get(speaker)
                .map(String::as_str)
                .unwrap_or(speaker),
        )
    }

    pub fn visible_text(&self) -> String {
        self.current()
            .map(|s| s.text.chars().take(self.revealed).collect())
            .unwrap_or_default()
    }

    pub fn is_completed(&self) -> bool {
        self.revealed >= self.current_len()
    }

    pub fn is_first_sentence(&self) -> bool {
        self.index == 0
    }

    pub fn is_last_sentence(&self) -> bool {
        self.index + 1 >= self.sentences.len()
    }

    pub fn sentence_index(&self) -> usize {
        self.index
    }

    fn current_len(&self) -> usize {
        self.current().map(|s| s.text.chars().count()).unwrap_or(0)
    }

    fn restart_typing(&mut self) {
        self.revealed = 0;
        self.carry = 0.0;
        self.speed = 1.0;
    }
}
