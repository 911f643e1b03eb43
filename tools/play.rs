/// Play — terminal player for trying out a scene catalog.
///
/// Usage: play --catalog <path> [--save <path>] [--config <path>] [--new]
///
/// Commands:
///   <enter> / click     — advance (press quickly to speed up or skip typing)
///   back                — go back
///   choose <n>          — pick option n of the current choice
///   key <name>          — press a named key (bound in the config)
///   name <speaker> <as> — show a speaker under another name
///   save                — save and return to the menu (Escape)
///   status              — show sequencer state
///   new                 — discard the save and restart
///   help                — list commands
///   quit                — exit

use scene_engine::core::clock::{Clock, SystemClock};
use scene_engine::core::config::SequencerConfig;
use scene_engine::core::dialogue::DialogueBox;
use scene_engine::core::host::{AudioPlayer, ChoiceHost, Presentation, ScreenHost};
use scene_engine::core::persistence::{FilePreferences, PrefsSaveStore};
use scene_engine::core::sequencer::{Input, Key, Sequencer};
use scene_engine::schema::scene::{ChoiceScene, LinearScene, SceneIndex};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Prints what a graphical host would draw.
struct TerminalStage {
    dialogue: DialogueBox,
    last_update: Duration,
    clock: SystemClock,
}

impl TerminalStage {
    fn new(clock: SystemClock) -> Self {
        Self {
            dialogue: DialogueBox::default(),
            last_update: clock.now(),
            clock,
        }
    }

    /// Catch the typewriter up with wall-clock time.
    fn update(&mut self) {
        let now = self.clock.now();
        self.dialogue.update(now.saturating_sub(self.last_update));
        self.last_update = now;
    }

    fn print_line(&self) {
        if !self.dialogue.is_visible() {
            return;
        }
        let speaker = self
            .dialogue
            .speaker_name()
            .map(|s| format!("{}: ", s))
            .unwrap_or_default();
        let ellipsis = if self.dialogue.is_completed() { "" } else { "…" };
        println!(
            "  [{}] {}{}{}",
            self.dialogue.sentence_index() + 1,
            speaker,
            self.dialogue.visible_text(),
            ellipsis
        );
    }
}

impl Presentation for TerminalStage {
    fn set_background(&mut self, image: &str) {
        println!("  (background: {})", image);
    }

    fn switch_background(&mut self, image: &str) {
        println!("  (background fades to: {})", image);
    }

    fn play_scene(&mut self, index: SceneIndex, scene: &LinearScene, sentence: usize, animated: bool) {
        println!("\n=== {} {} ===", scene.name, index);
        self.last_update = self.clock.now();
        self.dialogue.play_scene(scene, sentence, animated);
    }

    fn play_next_sentence(&mut self) {
        self.last_update = self.clock.now();
        self.dialogue.play_next_sentence();
    }

    fn rewind(&mut self) {
        self.dialogue.go_back();
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
        println!("  (faster)");
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

struct TerminalAudio;

impl AudioPlayer for TerminalAudio {
    fn play_audio(&mut self, music: Option<&str>, sound: Option<&str>) {
        if let Some(music) = music {
            println!("  ♪ {}", music);
        }
        if let Some(sound) = sound {
            println!("  ♫ {}", sound);
        }
    }
}

struct TerminalChoices;

impl ChoiceHost for TerminalChoices {
    fn setup_choice(&mut self, _index: SceneIndex, scene: &ChoiceScene) {
        println!();
        if let Some(ref prompt) = scene.prompt {
            println!("  {}", prompt);
        }
        for (i, option) in scene.options.iter().enumerate() {
            println!("    {}) {}", i, option.label);
        }
        println!("  (type 'choose <n>')");
    }
}

struct TerminalScreens;

impl ScreenHost for TerminalScreens {
    fn activate(&mut self, screen: &str) {
        println!("\n>>> switching to screen '{}'", screen);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut catalog_path = None;
    let mut save_path = "save.json".to_string();
    let mut config_path = None;
    let mut fresh = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--catalog" if i + 1 < args.len() => {
                i += 1;
                catalog_path = Some(args[i].clone());
            }
            "--save" if i + 1 < args.len() => {
                i += 1;
                save_path = args[i].clone();
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--new" => fresh = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(catalog_path) = catalog_path else {
        eprintln!("ERROR: --catalog is required");
        std::process::exit(1);
    };

    let config = match config_path {
        Some(ref path) => match SequencerConfig::load_from_ron(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ERROR: Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => SequencerConfig::default(),
    };

    let prefs = match FilePreferences::open(Path::new(&save_path)) {
        Ok(prefs) => prefs,
        Err(e) => {
            eprintln!("ERROR: Failed to open save file: {}", e);
            std::process::exit(1);
        }
    };
    let store = PrefsSaveStore::new(prefs, config.save_key.clone());

    let clock = SystemClock::new();
    let mut sequencer = match Sequencer::builder()
        .catalog_path(&catalog_path)
        .with_config(config)
        .presentation(TerminalStage::new(clock))
        .audio(TerminalAudio)
        .choices(TerminalChoices)
        .screens(TerminalScreens)
        .store(store)
        .clock(clock)
        .build()
    {
        Ok(sequencer) => sequencer,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let started = if fresh {
        sequencer.discard_save().and_then(|_| sequencer.new_game())
    } else {
        sequencer.start()
    };
    if let Err(e) = started {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }

    println!("Loaded {} scenes", sequencer.catalog().len());
    println!("Type 'help' for commands.\n");
    sequencer.presentation().print_line();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("play> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        sequencer.presentation_mut().update();

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts.first().map(|c| c.to_lowercase()).unwrap_or_default();

        let result = match cmd.as_str() {
            "" | "click" | "c" => sequencer.handle_input(Input::Click),
            "back" | "b" => sequencer.handle_input(Input::RightClick),
            "save" | "esc" => sequencer.handle_input(Input::Key(Key::Escape)),
            "key" if parts.len() > 1 => {
                sequencer.handle_input(Input::Key(Key::Named(parts[1].to_string())))
            }
            "choose" => match parts.get(1).and_then(|n| n.parse::<usize>().ok()) {
                Some(option) => sequencer.resolve_choice(option),
                None => {
                    println!("Usage: choose <n>");
                    continue;
                }
            },
            "name" if parts.len() > 1 => {
                let display = parts[2..].join(" ");
                sequencer.set_speaker_name(parts[1], &display);
                sequencer.presentation().print_line();
                continue;
            }
            "status" => {
                println!(
                    "state={:?} scene={} history={:?} phase={:?}",
                    sequencer.state(),
                    sequencer.current_scene(),
                    sequencer.history(),
                    sequencer.transition_phase()
                );
                continue;
            }
            "new" => sequencer.discard_save().and_then(|_| sequencer.new_game()),
            "help" | "h" | "?" => {
                print_help();
                continue;
            }
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            other => {
                println!("Unknown command: {}. Type 'help'.", other);
                continue;
            }
        };

        if let Err(e) = result {
            println!("ERROR: {}", e);
        }

        wait_for_transition(&mut sequencer, &clock);
        if sequencer.is_handed_off() {
            break;
        }
        sequencer.presentation().print_line();
    }
}

/// Sleep through any pending transition so the prompt only returns once the
/// sequencer accepts input again.
fn wait_for_transition(sequencer: &mut Sequencer<TerminalStage>, clock: &SystemClock) {
    while let Some(deadline) = sequencer.next_deadline() {
        std::thread::sleep(deadline.saturating_sub(clock.now()));
        sequencer.tick();
    }
    sequencer.presentation_mut().update();
}

fn print_usage() {
    println!("Usage: play --catalog <path> [--save <path>] [--config <path>] [--new]");
}

fn print_help() {
    println!("Commands:");
    println!("  <enter> / click   advance (press quickly to speed up or skip typing)");
    println!("  back              go back");
    println!("  choose <n>        pick option n of the current choice");
    println!("  key <name>        press a named key");
    println!("  name <speaker> <as>  show a speaker under another name (blank resets)");
    println!("  save              save and return to the menu");
    println!("  status            show sequencer state");
    println!("  new               discard the save and restart");
    println!("  quit              exit");
}
