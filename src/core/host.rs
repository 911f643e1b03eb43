/// Collaborator traits — everything the sequencer asks the host to do.
///
/// All calls are one-directional commands except the four queries on
/// [`Presentation`], which report what the text typer has shown so far.

use crate::schema::scene::{ChoiceScene, LinearScene, SceneIndex};

/// Background renderer plus text typer.
pub trait Presentation {
    /// Show `image` immediately.
    fn set_background(&mut self, image: &str);
    /// Cross-fade to `image`.
    fn switch_background(&mut self, image: &str);
    /// Start presenting `scene` at `sentence`. With `animated == false` the
    /// text may appear without typing.
    fn play_scene(&mut self, index: SceneIndex, scene: &LinearScene, sentence: usize, animated: bool);
    fn play_next_sentence(&mut self);
    /// Step back one sentence within the current scene.
    fn rewind(&mut self);
    fn clear_text(&mut self);
    fn show(&mut self);
    fn hide(&mut self);
    /// Type the current sentence faster.
    fn speed_up(&mut self);
    /// Finish the current sentence at once.
    fn stop_typing(&mut self);
    /// Move on-stage characters off screen, fading them first when animated.
    fn dismiss_characters(&mut self, animated: bool);
    /// Show `speaker`'s lines under `name`; empty restores the scripted name.
    fn rename_speaker(&mut self, speaker: &str, name: &str);

    fn is_completed(&self) -> bool;
    fn is_first_sentence(&self) -> bool;
    fn is_last_sentence(&self) -> bool;
    fn sentence_index(&self) -> usize;
}

pub trait AudioPlayer {
    fn play_audio(&mut self, music: Option<&str>, sound: Option<&str>);
}

/// Renders the options of a choice scene. Once the player picks one, the
/// host calls [`Sequencer::resolve_choice`](crate::core::sequencer::Sequencer::resolve_choice).
pub trait ChoiceHost {
    fn setup_choice(&mut self, index: SceneIndex, scene: &ChoiceScene);
}

/// Hands control to another screen of the application. Nothing comes back.
pub trait ScreenHost {
    fn activate(&mut self, screen: &str);
}
