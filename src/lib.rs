//! Scene Engine — a scene sequencer for visual novels.
//!
//! Steps through a catalog of dialogue, choice and handoff scenes in
//! response to explicit host input, keeps a back-navigation history, and
//! saves progress to a single preference-backed slot. Rendering, typing,
//! audio and screen changes are delegated to host collaborators.

pub mod core;
pub mod schema;
