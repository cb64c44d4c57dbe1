//! cutr generates projects from templated directory trees.
//! A template is a directory with a `cutr.yaml` declaring variables and hooks;
//! every path segment and text file in it is rendered against the collected values.

/// Command-line interface module for the cutr application
pub mod cli;

/// Template configuration: metadata, variable declarations, hooks and settings
/// Supports JSON and YAML formats (cutr.yaml, cutr.yml, cutr.json)
pub mod config;

/// Error types and handling for the cutr application
pub mod error;

/// Orchestration of a whole generation run
pub mod generator;

/// Pre and post generation shell hooks with a phase timeout
pub mod hooks;

/// Ignore patterns from the template settings
pub mod ignore;

/// Template source resolution: local directories and git repositories
pub mod loader;

/// Directory tree rendering
/// Walks the template and writes the rendered copy into the output directory
pub mod processor;

/// Spinner shown on stderr during long stages
pub mod progress;

/// User input and interaction handling
pub mod prompt;

/// The `{{ .name }}` template language
pub mod template;

/// Variable values and JSON answer parsing
pub mod value;
