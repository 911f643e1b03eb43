//! Runtime: catalog loading, the sequencer and its collaborators.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod debounce;
pub mod dialogue;
pub mod host;
pub mod persistence;
pub mod sequencer;
