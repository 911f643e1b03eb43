//! Static story data and the persisted progress record.

pub mod scene;
pub mod snapshot;
