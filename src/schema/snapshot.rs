use serde::{Deserialize, Serialize};

use super::scene::SceneIndex;

/// The persisted progress of one playthrough: the sentence being read and
/// every Linear scene on the back-navigation history, oldest first.
///
/// Serialized as a single JSON record, `{"sentence":3,"prevScenes":[0,2]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub sentence: usize,
    #[serde(rename = "prevScenes")]
    pub prev_scenes: Vec<usize>,
}

impl Snapshot {
    pub fn new(sentence: usize, history: &[SceneIndex]) -> Self {
        Self {
            sentence,
            prev_scenes: history.iter().map(|i| i.0).collect(),
        }
    }

    pub fn history(&self) -> Vec<SceneIndex> {
        self.prev_scenes.iter().copied().map(SceneIndex).collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(input: &str) -> Result<Snapshot, serde_json::Error> {
        serde_json::from_str(input)
    }
}
