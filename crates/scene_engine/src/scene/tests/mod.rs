//! Cross-module scene scenarios

mod physics_sync;
