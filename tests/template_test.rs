use cutr::error::Error;
use cutr::template::{render_str, Template, TemplateError};
use cutr::value::{Value, Values};

fn values() -> Values {
    let mut values = Values::new();
    values.insert("name".to_string(), Value::from("My Project"));
    values.insert("port".to_string(), Value::from(8080_i64));
    values.insert("ratio".to_string(), Value::from(0.5));
    values.insert("docker".to_string(), Value::Bool(true));
    values.insert("tests".to_string(), Value::Bool(false));
    values.insert("db".to_string(), Value::from("postgres"));
    values.insert("empty".to_string(), Value::from(""));
    values.insert("app.name".to_string(), Value::from("dotted"));
    values
}

fn render(src: &str) -> String {
    render_str(src, &values()).unwrap()
}

#[test]
fn test_plain_text_is_unchanged() {
    let src = "no placeholders here { } }} {\n";
    assert_eq!(render(src), src);
    assert!(Template::parse(src).unwrap().is_static());
}

#[test]
fn test_interpolation() {
    assert_eq!(render("Hello {{.name}}!"), "Hello My Project!");
    assert_eq!(render("port={{ .port }} ratio={{ .ratio }}"), "port=8080 ratio=0.5");
    assert_eq!(render("{{ .docker }}/{{ .tests }}"), "true/false");
    assert_eq!(render("{{ .app.name }}"), "dotted");
    assert!(!Template::parse("{{ .name }}").unwrap().is_static());
}

#[test]
fn test_functions() {
    assert_eq!(render("{{ .name | upper }}"), "MY PROJECT");
    assert_eq!(render("{{ .name | lower }}"), "my project");
    assert_eq!(render("{{ .name | snake }}"), "my_project");
    assert_eq!(render("{{ .name | kebab }}"), "my-project");
    assert_eq!(render("{{ .name | camel }}"), "myProject");
    assert_eq!(render("{{ .name | pascal }}"), "MyProject");
    assert_eq!(render("{{ \"  padded \" | trim }}"), "padded");
    assert_eq!(render("{{ \"hello world\" | title }}"), "Hello World");
}

#[test]
fn test_replace_pipe_and_call_forms_agree() {
    assert_eq!(render("{{ .name | replace \" \" \"_\" }}"), "My_Project");
    assert_eq!(render("{{ replace .name \" \" \"_\" }}"), "My_Project");
    assert_eq!(render("{{ .name | replace \" \" \"-\" | lower }}"), "my-project");
}

#[test]
fn test_if_else_chain() {
    let src = "{{ if eq .db \"mysql\" }}M{{ else if eq .db \"postgres\" }}P{{ else }}O{{ end }}";
    assert_eq!(render(src), "P");
    assert_eq!(render("{{ if .tests }}yes{{ else }}no{{ end }}"), "no");
    assert_eq!(render("{{ if not .tests }}skip{{ end }}"), "skip");
    assert_eq!(render("{{ if .empty }}x{{ end }}"), "");
    assert_eq!(render("{{ if ne .port 80 }}custom{{ end }}"), "custom");
}

#[test]
fn test_nested_if() {
    let src = "{{ if .docker }}D{{ if .tests }}T{{ else }}-{{ end }}{{ end }}";
    assert_eq!(render(src), "D-");
}

#[test]
fn test_trim_markers_and_comments() {
    assert_eq!(render("a  {{- .db -}}  b"), "apostgresb");
    assert_eq!(render("x{{/* ignored */}}y"), "xy");
    let src = "services:\n  {{- if .docker }}\n  docker: yes\n  {{- end }}\n";
    assert_eq!(render(src), "services:\n  docker: yes\n");
}

#[test]
fn test_parenthesized_pipeline() {
    assert_eq!(render("{{ if eq (.db | upper) \"POSTGRES\" }}ok{{ end }}"), "ok");
}

#[test]
fn test_missing_key_is_an_error() {
    let err = render_str("{{ .missing }}", &values()).unwrap_err();
    assert_eq!(err, TemplateError::MissingKey { key: "missing".to_string() });

    // Also inside a branch that would not render
    let err = render_str("{{ if .missing }}x{{ end }}", &values()).unwrap_err();
    assert!(matches!(err, TemplateError::MissingKey { .. }));
}

#[test]
fn test_parse_errors() {
    for src in [
        "{{ .name",
        "{{ if .docker }}unclosed",
        "{{ end }}",
        "{{ else }}",
        "{{ .name | shout }}",
        "{{ replace .name \"a\" }}",
        "{{ }}",
        "{{ \"unterminated }}",
    ] {
        let err = Template::parse(src).unwrap_err();
        assert!(matches!(err, TemplateError::Parse { .. }), "{src:?} gave {err:?}");
    }
}

#[test]
fn test_parse_error_reports_line() {
    let err = Template::parse("line one\nline two {{ .name | nope }}").unwrap_err();
    assert!(err.to_string().starts_with("line 2:"), "{err}");
}

#[test]
fn test_with_context() {
    let err = Template::parse("{{ if .x }}").unwrap_err().with_context("file 'a.txt'");
    assert!(matches!(err, Error::TemplateParseError { ref context, .. } if context == "file 'a.txt'"));

    let err = render_str("{{ .nope }}", &values()).unwrap_err().with_context("path 'x'");
    assert_eq!(
        err.to_string(),
        "Template execution error in path 'x': map has no entry for key \"nope\"."
    );
}

#[test]
fn test_parse_once_render_many() {
    let template = Template::parse("{{ .name | snake }}").unwrap();
    let mut other = Values::new();
    other.insert("name".to_string(), Value::from("Second Run"));
    assert_eq!(template.render(&values()).unwrap(), "my_project");
    assert_eq!(template.render(&other).unwrap(), "second_run");
}
