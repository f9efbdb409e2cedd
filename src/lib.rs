//! kastle: versioned configuration graphs
//!
//! A tree is a named graph whose history is a series of immutable-once-tagged
//! versions. Each version owns its nodes and directed edges. Tagged versions
//! can be restored or branched from as fresh copies, and any version can be
//! walked depth-first or searched for a path.
//!
//! Layers:
//! - [`domain`]: entities, the in-memory record store and graph walks
//! - [`application`]: services over a shared, journal-backed store
//! - [`infrastructure`]: journal implementations and service wiring
//! - [`cli`]: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
