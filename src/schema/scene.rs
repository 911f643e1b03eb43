use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype wrapper for a scene's position in the catalog.
///
/// The index is the only addressing scheme persisted in save data, so it
/// must stay stable for as long as saves made against a catalog exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneIndex(pub usize);

impl fmt::Display for SceneIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single line of dialogue or narration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    pub text: String,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub music: Option<String>,
    #[serde(default)]
    pub sound: Option<String>,
}

impl Sentence {
    /// A sentence with text only: no speaker and no audio cues.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            speaker: None,
            music: None,
            sound: None,
        }
    }

    pub fn spoken_by(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    pub fn with_music(mut self, music: impl Into<String>) -> Self {
        self.music = Some(music.into());
        self
    }

    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = Some(sound.into());
        self
    }

    /// Returns true if this sentence asks the audio player for anything.
    pub fn has_audio(&self) -> bool {
        self.music.is_some() || self.sound.is_some()
    }
}

/// An ordered run of sentences over one background, followed by a single
/// successor scene. `next == None` marks the end of the story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearScene {
    pub name: String,
    pub background: String,
    pub sentences: Vec<Sentence>,
    pub next: Option<SceneIndex>,
}

impl LinearScene {
    /// Index of the sentence a back-navigation lands on: the one before the
    /// last, so the player re-reads up to the decision point that led away.
    pub fn rewind_target(&self) -> usize {
        self.sentences.len().saturating_sub(2)
    }

    pub fn last_sentence(&self) -> usize {
        self.sentences.len().saturating_sub(1)
    }
}

/// One selectable option of a choice scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub label: String,
    pub next: SceneIndex,
}

/// A branching point: the player picks one option, each with its own successor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceScene {
    pub name: String,
    #[serde(default)]
    pub prompt: Option<String>,
    pub options: Vec<ChoiceOption>,
}

/// Terminal entry that gives control to another screen of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffScene {
    pub name: String,
    pub screen: String,
}

/// A catalog entry. Dispatch on the variant is always an exhaustive `match`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scene {
    Linear(LinearScene),
    Choice(ChoiceScene),
    Handoff(HandoffScene),
}

impl Scene {
    pub fn name(&self) -> &str {
        match self {
            Self::Linear(s) => &s.name,
            Self::Choice(s) => &s.name,
            Self::Handoff(s) => &s.name,
        }
    }

    /// Short label for the variant, used in logs and lint output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Linear(_) => "linear",
            Self::Choice(_) => "choice",
            Self::Handoff(_) => "handoff",
        }
    }

    pub fn as_linear(&self) -> Option<&LinearScene> {
        match self {
            Self::Linear(s) => Some(s),
            _ => None,
        }
    }

    /// Every scene this one can lead to, in declaration order.
    pub fn successors(&self) -> Vec<SceneIndex> {
        match self {
            Self::Linear(s) => s.next.into_iter().collect(),
            Self::Choice(s) => s.options.iter().map(|o| o.next).collect(),
            Self::Handoff(_) => Vec::new(),
        }
    }
}
