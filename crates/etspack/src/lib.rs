//! Single-file bundler for ArkTS page sources
//!
//! Given an entry `.ets` file, resolves its local imports transitively and merges
//! everything into one output file, with external imports hoisted to the top and resource
//! references replaced by their catalog values.

pub mod bundler;
pub mod comments;
pub mod config;
pub mod error;
pub mod extractor;
pub mod import_graph;
pub mod import_parser;
pub mod orchestrator;
pub mod resolver;
pub mod resources;
pub mod tokens;
pub mod types;
