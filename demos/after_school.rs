/// After School example — plays the bundled story from start to credits.
///
/// A scripted reader: click through the classroom, go with Aiko, rename the
/// narrator, save at the rooftop, then resume from the save and finish.
///
/// Run with: cargo run --example after_school

use scene_engine::core::catalog::SceneCatalog;
use scene_engine::core::clock::ManualClock;
use scene_engine::core::dialogue::DialogueBox;
use scene_engine::core::host::{AudioPlayer, ChoiceHost, Presentation, ScreenHost};
use scene_engine::core::persistence::{MemoryPreferences, Preferences, PrefsSaveStore};
use scene_engine::core::sequencer::{Input, Key, Sequencer, SequencerState};
use scene_engine::schema::scene::{ChoiceScene, LinearScene, SceneIndex};
use std::cell::RefCell;
use std::rc::Rc;

struct PrintStage {
    dialogue: DialogueBox,
}

impl PrintStage {
    fn print_line(&self) {
        let speaker = self
            .dialogue
            .speaker_name()
            .map(|s| format!("{s}: "))
            .unwrap_or_default();
        println!("    {}{}", speaker, self.dialogue.visible_text());
    }
}

impl Presentation for PrintStage {
    fn set_background(&mut self, image: &str) {
        println!("  [background {image}]");
    }

    fn switch_background(&mut self, image: &str) {
        println!("  [fade to {image}]");
    }

    fn play_scene(&mut self, index: SceneIndex, scene: &LinearScene, sentence: usize, animated: bool) {
        println!("\n--- {} {} ---", scene.name, index);
        self.dialogue.play_scene(scene, sentence, animated);
        // The reader waits for each line to finish typing.
        self.dialogue.stop_typing();
        self.print_line();
    }

    fn play_next_sentence(&mut self) {
        self.dialogue.play_next_sentence();
        self.dialogue.stop_typing();
        self.print_line();
    }

    fn rewind(&mut self) {
        self.dialogue.go_back();
        self.print_line();
    }

    fn clear_text(&mut self) {
        self.dialogue.clear();
    }

    fn show(&mut self) {
        self.dialogue.set_visible(true);
    }

    fn hide(&mut self) {
        self.dialogue.set_visible(false);
    }

    fn speed_up(&mut self) {
        self.dialogue.speed_up();
    }

    fn stop_typing(&mut self) {
        self.dialogue.stop_typing();
    }

    fn dismiss_characters(&mut self, _animated: bool) {}

    fn rename_speaker(&mut self, speaker: &str, name: &str) {
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

struct PrintAudio;

impl AudioPlayer for PrintAudio {
    fn play_audio(&mut self, music: Option<&str>, sound: Option<&str>) {
        if let Some(music) = music {
            println!("  [music {music}]");
        }
        if let Some(sound) = sound {
            println!("  [sound {sound}]");
        }
    }
}

struct PrintChoices;

impl ChoiceHost for PrintChoices {
    fn setup_choice(&mut self, _index: SceneIndex, scene: &ChoiceScene) {
        println!("\n  ? {}", scene.prompt.as_deref().unwrap_or(&scene.name));
        for (i, option) in scene.options.iter().enumerate() {
            println!("    {i}) {}", option.label);
        }
    }
}

struct PrintScreens;

impl ScreenHost for PrintScreens {
    fn activate(&mut self, screen: &str) {
        println!("\n>>> {screen}");
    }
}

fn build(
    catalog: SceneCatalog,
    prefs: Rc<RefCell<MemoryPreferences>>,
    clock: ManualClock,
) -> Sequencer<PrintStage> {
    Sequencer::builder()
        .with_catalog(catalog)
        .presentation(PrintStage {
            dialogue: DialogueBox::default(),
        })
        .audio(PrintAudio)
        .choices(PrintChoices)
        .screens(PrintScreens)
        .store(PrefsSaveStore::new(prefs, "savedGame"))
        .clock(clock)
        .build()
        .expect("Failed to build sequencer")
}

/// Click once, then let any transition play out.
fn click(sequencer: &mut Sequencer<PrintStage>, clock: &ManualClock) {
    clock.advance_ms(1_000);
    sequencer
        .handle_input(Input::Click)
        .expect("Click failed");
    while let Some(deadline) = sequencer.next_deadline() {
        clock.set(deadline);
        sequencer.tick();
    }
}

fn main() {
    let catalog = SceneCatalog::load_from_ron(std::path::Path::new("stories/after_school.ron"))
        .expect("Failed to load story");
    let prefs = Rc::new(RefCell::new(MemoryPreferences::new()));
    let clock = ManualClock::new();

    // --- First session: read to the choice, pick the club ---
    let mut sequencer = build(catalog.clone(), prefs.clone(), clock.clone());
    sequencer.start().expect("Failed to start");
    sequencer.set_speaker_name("Ren", "You");

    while sequencer.state() != SequencerState::Choosing {
        click(&mut sequencer, &clock);
    }
    println!("  > Go with Aiko");
    sequencer.resolve_choice(0).expect("Choice failed");
    while let Some(deadline) = sequencer.next_deadline() {
        clock.set(deadline);
        sequencer.tick();
    }

    // --- Read into the rooftop scene, then save and quit to the menu ---
    while sequencer.catalog().get(sequencer.current_scene()).map(|s| s.name()) != Some("rooftop") {
        click(&mut sequencer, &clock);
    }
    sequencer
        .handle_input(Input::Key(Key::Escape))
        .expect("Save failed");
    println!(
        "  saved: {}",
        prefs.get_string("savedGame").unwrap_or_default()
    );

    // --- Second session: resume from the save and finish ---
    println!("\n=== Resuming ===");
    let mut sequencer = build(catalog, prefs, clock.clone());
    sequencer.start().expect("Failed to resume");
    while !sequencer.is_handed_off() {
        click(&mut sequencer, &clock);
    }
}
