//! repoviz - repository visualization data generator
//!
//! Turns a local git repository into one JSON document: the file tree,
//! extracted code components, a deduplicated relationship graph and a
//! sampled timeline of historical snapshots.

pub mod cli;
pub mod config;
pub mod git;
pub mod github;
pub mod graph;
pub mod inventory;
pub mod models;
pub mod parsers;
pub mod pipeline;
pub mod reporters;
pub mod stats;
