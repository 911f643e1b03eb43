/// Scene catalog — the ordered, immutable list of scenes a story is made of.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::schema::scene::{
    ChoiceOption, ChoiceScene, HandoffScene, LinearScene, Scene, SceneIndex, Sentence,
};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("catalog has no scenes")]
    Empty,
    #[error("duplicate scene name '{0}'")]
    DuplicateName(String),
    #[error("scene '{scene}' refers to unknown scene '{target}'")]
    UnknownScene { scene: String, target: String },
    #[error("linear scene '{0}' has no sentences")]
    NoSentences(String),
    #[error("choice scene '{0}' has no options")]
    NoOptions(String),
    #[error("scene '{scene}' points at {target}, but the catalog has {len} scenes")]
    OutOfRange {
        scene: String,
        target: SceneIndex,
        len: usize,
    },
}

/// The validated scene list. Every successor index is in bounds, every
/// Linear scene has at least one sentence and every Choice at least one option.
#[derive(Debug, Clone)]
pub struct SceneCatalog {
    scenes: Vec<Scene>,
    start: SceneIndex,
    by_name: FxHashMap<String, SceneIndex>,
}

// RON deserialization helpers. Successors are written by scene name in
// catalog files and resolved to indices once everything is read.

#[derive(Debug, Deserialize)]
#[serde(rename = "Catalog")]
struct RonCatalog {
    /// Name of the first scene. Empty means the first scene in the list.
    #[serde(default)]
    start: String,
    scenes: Vec<RonScene>,
}

#[derive(Debug, Deserialize)]
enum RonScene {
    Linear {
        name: String,
        background: String,
        sentences: Vec<Sentence>,
        #[serde(default)]
        next: Option<String>,
    },
    Choice {
        name: String,
        #[serde(default)]
        prompt: Option<String>,
        options: Vec<RonOption>,
    },
    Handoff {
        name: String,
        screen: String,
    },
}

impl RonScene {
    fn name(&self) -> &str {
        match self {
            Self::Linear { name, .. } | Self::Choice { name, .. } | Self::Handoff { name, .. } => {
                name
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RonOption {
    label: String,
    next: String,
}

impl SceneCatalog {
    /// Build a catalog from scenes already addressed by index.
    pub fn new(scenes: Vec<Scene>, start: SceneIndex) -> Result<SceneCatalog, CatalogError> {
        if scenes.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut by_name = FxHashMap::default();
        for (i, scene) in scenes.iter().enumerate() {
            if by_name.insert(scene.name().to_string(), SceneIndex(i)).is_some() {
                return Err(CatalogError::DuplicateName(scene.name().to_string()));
            }
        }

        let len = scenes.len();
        for scene in &scenes {
            match scene {
                Scene::Linear(s) if s.sentences.is_empty() => {
                    return Err(CatalogError::NoSentences(s.name.clone()));
                }
                Scene::Choice(s) if s.options.is_empty() => {
                    return Err(CatalogError::NoOptions(s.name.clone()));
                }
                _ => {}
            }
            if let Some(target) = scene.successors().into_iter().find(|t| t.0 >= len) {
                return Err(CatalogError::OutOfRange {
                    scene: scene.name().to_string(),
                    target,
                    len,
                });
            }
        }

        if start.0 >= len {
            return Err(CatalogError::OutOfRange {
                scene: "<start>".to_string(),
                target: start,
                len,
            });
        }

        Ok(SceneCatalog {
            scenes,
            start,
            by_name,
        })
    }

    /// Load a catalog from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<SceneCatalog, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a catalog from a RON string.
    pub fn parse_ron(input: &str) -> Result<SceneCatalog, CatalogError> {
        let raw: RonCatalog = ron::from_str(input)?;

        let mut names: FxHashMap<String, SceneIndex> = FxHashMap::default();
        for (i, scene) in raw.scenes.iter().enumerate() {
            if names.insert(scene.name().to_string(), SceneIndex(i)).is_some() {
                return Err(CatalogError::DuplicateName(scene.name().to_string()));
            }
        }

        let resolve = |scene: &str, target: &str| -> Result<SceneIndex, CatalogError> {
            names
                .get(target)
                .copied()
                .ok_or_else(|| CatalogError::UnknownScene {
                    scene: scene.to_string(),
                    target: target.to_string(),
                })
        };

        let mut scenes = Vec::with_capacity(raw.scenes.len());
        for scene in raw.scenes {
            let resolved = match scene {
                RonScene::Linear {
                    name,
                    background,
                    sentences,
                    next,
                } => {
                    let next = match next {
                        Some(target) => Some(resolve(name.as_str(), target.as_str())?),
                        None => None,
                    };
                    Scene::Linear(LinearScene {
                        name,
                        background,
                        sentences,
                        next,
                    })
                }
                RonScene::Choice {
                    name,
                    prompt,
                    options,
                } => {
                    let mut resolved_options = Vec::with_capacity(options.len());
                    for opt in options {
                        resolved_options.push(ChoiceOption {
                            next: resolve(name.as_str(), opt.next.as_str())?,
                            label: opt.label,
                        });
                    }
                    Scene::Choice(ChoiceScene {
                        name,
                        prompt,
                        options: resolved_options,
                    })
                }
                RonScene::Handoff { name, screen } => Scene::Handoff(HandoffScene { name, screen }),
            };
            scenes.push(resolved);
        }

        let start = if raw.start.is_empty() {
            SceneIndex(0)
        } else {
            resolve("<start>", raw.start.as_str())?
        };

        Self::new(scenes, start)
    }

    pub fn get(&self, index: SceneIndex) -> Option<&Scene> {
        self.scenes.get(index.0)
    }

    pub fn index_of(&self, name: &str) -> Option<SceneIndex> {
        self.by_name.get(name).copied()
    }

    pub fn start(&self) -> SceneIndex {
        self.start
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SceneIndex, &Scene)> {
        self.scenes
            .iter()
            .enumerate()
            .map(|(i, scene)| (SceneIndex(i), scene))
    }

    /// Scenes no path from the start scene reaches.
    pub fn unreachable(&self) -> Vec<SceneIndex> {
        let mut seen = FxHashSet::default();
        let mut stack = vec![self.start];
        while let Some(index) = stack.pop() {
            if !seen.insert(index) {
                continue;
            }
            if let Some(scene) = self.get(index) {
                stack.extend(scene.successors());
            }
        }
        self.iter()
            .map(|(i, _)| i)
            .filter(|i| !seen.contains(i))
            .collect()
    }

    /// Linear scenes with no successor: the story stops there without
    /// handing control anywhere.
    pub fn dead_ends(&self) -> Vec<SceneIndex> {
        self.iter()
            .filter(|(_, scene)| matches!(scene, Scene::Linear(s) if s.next.is_none()))
            .map(|(i, _)| i)
            .collect()
    }
}
