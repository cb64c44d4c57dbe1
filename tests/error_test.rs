use std::io;
use std::path::PathBuf;

use cutr::error::Error;

#[test]
fn test_error_conversion() {
    let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let err: Error = io_err.into();

    match err {
        Error::IoError(_) => (),
        _ => panic!("Expected IoError variant"),
    }
}

#[test]
fn test_error_display() {
    let err = Error::ConfigError("invalid config".to_string());
    assert_eq!(err.to_string(), "Configuration error: invalid config.");

    let err = Error::TemplateParseError {
        context: "file 'src/main.rs'".to_string(),
        message: "line 3: unclosed action".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Template parse error in file 'src/main.rs': line 3: unclosed action."
    );

    let err = Error::HookCommandError {
        phase: "post-generation".to_string(),
        command: "git init".to_string(),
        reason: "exit status 128".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Hook execution error: post-generation hook `git init` failed: exit status 128."
    );

    let err = Error::DeclarationValidationError {
        name: "db".to_string(),
        reason: "choices required for choice type".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Invalid declaration of variable 'db': choices required for choice type."
    );
}

#[test]
fn test_file_error_names_path() {
    let err = Error::file(
        PathBuf::from("out/readme.md"),
        io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
    );
    assert_eq!(err.to_string(), "IO error on 'out/readme.md': denied.");
}

#[test]
fn test_output_directory_exists_display() {
    let err = Error::OutputDirectoryExistsError { output_dir: "out".to_string() };
    assert_eq!(
        err.to_string(),
        "Output directory 'out' already exists. Use --force to overwrite it."
    );
}
