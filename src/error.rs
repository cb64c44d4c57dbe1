//! Error handling for the cutr application.
//! Defines the crate-wide error type and result alias used by every stage of
//! the generation pipeline.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Custom error types for cutr operations.
///
/// Every variant carries enough context (relative path, variable name,
/// hook phase or command) to diagnose a failure without re-running.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    /// File system failure tied to a specific path
    #[error("IO error on '{}': {source}.", .path.display())]
    FileError { path: PathBuf, source: io::Error },

    /// Malformed or incomplete configuration document
    #[error("Configuration error: {0}.")]
    ConfigError(String),

    /// A variable declaration that can never be satisfied
    #[error("Invalid declaration of variable '{name}': {reason}.")]
    DeclarationValidationError { name: String, reason: String },

    /// A collected value violates its variable's constraints
    #[error("Invalid value for variable '{name}': {reason}.")]
    ValueValidationError { name: String, reason: String },

    /// Malformed placeholder syntax in a path segment, file or hook command
    #[error("Template parse error in {context}: {message}.")]
    TemplateParseError { context: String, message: String },

    /// Template evaluation failed, including references to undefined keys
    #[error("Template execution error in {context}: {message}.")]
    TemplateExecutionError { context: String, message: String },

    /// A hook command exited non-zero, was killed, or could not start
    #[error("Hook execution error: {phase} hook `{command}` failed: {reason}.")]
    HookCommandError { phase: String, command: String, reason: String },

    /// The template source could not be resolved to a local directory
    #[error("Template source error: {0}.")]
    TemplateSourceError(String),

    #[error("Output directory '{output_dir}' already exists. Use --force to overwrite it.")]
    OutputDirectoryExistsError { output_dir: String },

    #[error("Git error: {0}.")]
    Git2Error(#[from] git2::Error),

    /// Interactive input failed or was interrupted
    #[error("Prompt error: {0}.")]
    PromptError(String),
}

/// Convenience type alias for Results with [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wraps an I/O error with the path it happened on.
    pub fn file<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Error::FileError { path: path.into(), source }
    }
}

/// Default error handler that prints the error and exits the program.
///
/// # Behavior
/// Prints the error message to stderr and exits with status code 1
pub fn default_error_handler(err: Error) {
    eprintln!("{err}");
    std::process::exit(1);
}
