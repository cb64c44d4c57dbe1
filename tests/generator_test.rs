use std::fs;
use std::path::Path;

use cutr::error::Error;
use cutr::generator::{generate, get_output_dir, GenerateOptions};
use cutr::prompt::DefaultsPrompter;
use cutr::value::Value;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn service_template(hooks: &str) -> TempDir {
    let template = TempDir::new().unwrap();
    write(
        template.path(),
        "cutr.yaml",
        &format!(
            r#"
name: service
variables:
  project_name:
    type: string
    default: web-api
  use_docker:
    type: boolean
    default: false
{hooks}
"#
        ),
    );
    write(template.path(), "{{ .project_name }}/README.md", "# {{ .project_name | title }}\n");
    write(
        template.path(),
        "{{ .project_name }}/{{ if .use_docker }}Dockerfile{{ end }}",
        "FROM rust\n",
    );
    template
}

fn options(template: &Path, output: &Path) -> GenerateOptions {
    GenerateOptions::new(template.to_string_lossy(), output)
}

#[test_log::test]
fn test_generate_with_defaults() {
    let template = service_template("");
    let output = TempDir::new().unwrap();
    let destination = output.path().join("project");

    let report = generate(&options(template.path(), &destination), &DefaultsPrompter).unwrap();

    assert_eq!(report.config.name, "service");
    assert_eq!(report.values["project_name"], Value::from("web-api"));
    assert_eq!(
        fs::read_to_string(destination.join("web-api/README.md")).unwrap(),
        "# Web Api\n"
    );
    assert!(!destination.join("web-api/Dockerfile").exists());
    assert!(!destination.join("cutr.yaml").exists());
    assert_eq!(report.summary.rendered, 1);
    assert!(!report.hooks_executed);
}

#[test]
fn test_preloaded_answers() {
    let template = service_template("");
    let output = TempDir::new().unwrap();
    let destination = output.path().join("project");
    let mut opts = options(template.path(), &destination);
    opts.preloaded.insert("use_docker".to_string(), Value::from("yes"));

    generate(&opts, &DefaultsPrompter).unwrap();
    assert!(destination.join("web-api/Dockerfile").exists());
}

#[test]
fn test_existing_output_requires_force() {
    let template = service_template("");
    let output = TempDir::new().unwrap();

    let err = generate(&options(template.path(), output.path()), &DefaultsPrompter).unwrap_err();
    assert!(matches!(err, Error::OutputDirectoryExistsError { .. }));

    let mut opts = options(template.path(), output.path());
    opts.force = true;
    generate(&opts, &DefaultsPrompter).unwrap();
    assert!(output.path().join("web-api/README.md").exists());
}

#[test]
fn test_get_output_dir() {
    let temp_dir = TempDir::new().unwrap();
    let new_dir = temp_dir.path().join("new_dir");

    assert_eq!(get_output_dir(&new_dir, false).unwrap(), new_dir);
    assert!(get_output_dir(temp_dir.path(), false).is_err());
    assert!(get_output_dir(temp_dir.path(), true).is_ok());
}

#[test]
fn test_missing_template() {
    let output = TempDir::new().unwrap();
    let err = generate(
        &GenerateOptions::new("/nonexistent/cutr/template", output.path().join("out")),
        &DefaultsPrompter,
    )
    .unwrap_err();
    assert!(matches!(err, Error::TemplateSourceError(_)));
}

#[cfg(unix)]
#[test]
fn test_hooks_need_confirmation() {
    let template = service_template("hooks:\n  post_generation:\n    - touch hooked-{{ .project_name }}");
    let output = TempDir::new().unwrap();
    let destination = output.path().join("project");

    let report = generate(&options(template.path(), &destination), &DefaultsPrompter).unwrap();
    assert!(!report.hooks_executed);
    assert!(!destination.join("hooked-web-api").exists());
}

#[cfg(unix)]
#[test]
fn test_hooks_run_in_their_directories() {
    let template = service_template(
        "hooks:\n  pre_generation:\n    - touch pre-ran\n  post_generation:\n    - touch hooked-{{ .project_name }}",
    );
    let output = TempDir::new().unwrap();
    let destination = output.path().join("project");
    let mut opts = options(template.path(), &destination);
    opts.skip_hooks_check = true;

    let report = generate(&opts, &DefaultsPrompter).unwrap();

    assert!(report.hooks_executed);
    assert!(destination.join("hooked-web-api").exists());
    // Pre-generation hooks run in the template directory, before rendering,
    // so their output is picked up by the walk.
    assert!(template.path().join("pre-ran").exists());
    assert!(destination.join("pre-ran").exists());
}

#[cfg(unix)]
#[test]
fn test_failing_pre_hook_stops_before_rendering() {
    let template = service_template("hooks:\n  pre_generation:\n    - exit 2");
    let output = TempDir::new().unwrap();
    let destination = output.path().join("project");
    let mut opts = options(template.path(), &destination);
    opts.skip_hooks_check = true;

    let err = generate(&opts, &DefaultsPrompter).unwrap_err();
    assert!(matches!(err, Error::HookCommandError { ref reason, .. } if reason == "exit status 2"));
    assert!(!destination.exists());
}

#[cfg(unix)]
#[test]
fn test_no_hooks_overrides_confirmation() {
    let template = service_template("hooks:\n  post_generation:\n    - exit 1");
    let output = TempDir::new().unwrap();
    let mut opts = options(template.path(), &output.path().join("project"));
    opts.no_hooks = true;

    let report = generate(&opts, &DefaultsPrompter).unwrap();
    assert!(!report.hooks_executed);
}
