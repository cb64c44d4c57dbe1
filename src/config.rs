//! Configuration handling for cutr templates.
//! This module parses the template's configuration document into a validated
//! [`TemplateConfig`] and checks collected values against variable constraints.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use globset::GlobBuilder;
use indexmap::IndexMap;
use log::{debug, warn};
use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::value::{parse_bool_like, Value, Values};

/// Supported configuration file names, in lookup order
pub const CONFIG_FILES: [&str; 3] = ["cutr.yaml", "cutr.yml", "cutr.json"];

/// Version-control metadata directory, never rendered
pub const VCS_DIR: &str = ".git";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariableKind {
    #[default]
    String,
    Choice,
    Number,
    Boolean,
}

impl FromStr for VariableKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "string" => Ok(VariableKind::String),
            "choice" => Ok(VariableKind::Choice),
            "number" => Ok(VariableKind::Number),
            "boolean" => Ok(VariableKind::Boolean),
            other => Err(format!("invalid variable type '{other}'")),
        }
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariableKind::String => "string",
            VariableKind::Choice => "choice",
            VariableKind::Number => "number",
            VariableKind::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// A declared template variable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariableSpec {
    pub name: String,
    pub kind: VariableKind,
    pub prompt: String,
    pub default: Option<Value>,
    pub choices: Vec<String>,
    /// Only meaningful for [`VariableKind::String`].
    pub pattern: Option<String>,
    /// Shown alongside validation failures.
    pub help: Option<String>,
    /// Bounds for [`VariableKind::Number`]; zero means unbounded.
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Commands run before and after rendering.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Hooks {
    pub pre_generation: Vec<String>,
    pub post_generation: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemplateSettings {
    pub ignore_patterns: Vec<String>,
    pub keep_permissions: bool,
}

/// Validated template configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemplateConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub author: Option<String>,
    pub repository: Option<String>,
    pub variables: BTreeMap<String, VariableSpec>,
    pub hooks: Hooks,
    pub template_settings: TemplateSettings,
    /// Declaration order recovered while parsing.
    variable_order: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    name: Option<String>,
    description: Option<String>,
    version: Option<serde_yaml::Value>,
    author: Option<String>,
    repository: Option<String>,
    variables: Option<IndexMap<String, RawVariable>>,
    hooks: Option<RawHooks>,
    template: Option<RawSettings>,
}

#[derive(Debug, Deserialize)]
struct RawVariable {
    #[serde(rename = "type")]
    kind: Option<String>,
    prompt: Option<String>,
    default: Option<Value>,
    choices: Option<Vec<Value>>,
    pattern: Option<String>,
    help: Option<String>,
    min: Option<f64>,
    max: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawHooks {
    pre_generation: Option<Vec<String>>,
    post_generation: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    ignore_patterns: Option<Vec<String>>,
    keep_permissions: Option<bool>,
}

/// Finds the configuration file in `template_dir` and parses it.
///
/// # Errors
/// * `Error::ConfigError` if no configuration file exists or it is invalid
pub fn load_config<P: AsRef<Path>>(template_dir: P) -> Result<TemplateConfig> {
    for file in CONFIG_FILES {
        let config_path = template_dir.as_ref().join(file);
        if config_path.is_file() {
            debug!("Loading configuration from {}", config_path.display());
            let content =
                std::fs::read(&config_path).map_err(|e| Error::file(&config_path, e))?;
            return TemplateConfig::parse(&content);
        }
    }

    Err(Error::ConfigError(format!(
        "No configuration file found (tried: {})",
        CONFIG_FILES.join(", ")
    )))
}

/// Parses a configuration document held in a string.
pub fn parse_config(content: &str) -> Result<TemplateConfig> {
    TemplateConfig::parse(content.as_bytes())
}

/// Keeps the scalar's text, so `version: 1.0` stays `"1.0"`.
fn version_text(version: serde_yaml::Value) -> Result<String> {
    match version {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(Error::ConfigError(format!("version must be a scalar, got {other:?}"))),
    }
}

impl TemplateConfig {
    /// Creates an empty configuration, mostly useful when assembling one in code.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Parses and validates a configuration document (YAML, or JSON).
    ///
    /// # Errors
    /// * `Error::ConfigError` on malformed syntax, a missing `name` or a bad ignore pattern
    /// * `Error::DeclarationValidationError` if a variable declaration is invalid
    pub fn parse(document: &[u8]) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_slice(document)
            .map_err(|e| Error::ConfigError(format!("Invalid configuration format: {e}")))?;

        let name = raw.name.unwrap_or_default();
        if name.trim().is_empty() {
            return Err(Error::ConfigError("name is required".to_string()));
        }

        let mut config = TemplateConfig::new(name);
        config.description = raw.description;
        config.version = raw.version.map(version_text).transpose()?;
        config.author = raw.author;
        config.repository = raw.repository;

        for (var_name, raw_var) in raw.variables.unwrap_or_default() {
            let spec = VariableSpec::from_raw(var_name, raw_var)?;
            spec.validate_declaration()?;
            config.add_variable(spec);
        }

        if let Some(hooks) = raw.hooks {
            config.hooks = Hooks {
                pre_generation: hooks.pre_generation.unwrap_or_default(),
                post_generation: hooks.post_generation.unwrap_or_default(),
            };
        }

        if let Some(settings) = raw.template {
            config.template_settings = TemplateSettings {
                ignore_patterns: settings.ignore_patterns.unwrap_or_default(),
                keep_permissions: settings.keep_permissions.unwrap_or(false),
            };
        }
        for pattern in &config.template_settings.ignore_patterns {
            GlobBuilder::new(pattern).literal_separator(true).build().map_err(|e| {
                Error::ConfigError(format!("invalid ignore pattern '{pattern}': {e}"))
            })?;
        }

        debug!(
            "Parsed template '{}' with {} variable(s)",
            config.name,
            config.variables.len()
        );
        Ok(config)
    }

    /// Adds a variable, keeping declaration order.
    pub fn add_variable(&mut self, spec: VariableSpec) {
        if !self.variables.contains_key(&spec.name) {
            self.variable_order.push(spec.name.clone());
        }
        self.variables.insert(spec.name.clone(), spec);
    }

    /// Variable names in declaration order.
    ///
    /// Falls back to lexicographic order when the recorded order no longer
    /// matches `variables` (for example after `variables` was edited directly).
    pub fn variable_order(&self) -> Vec<String> {
        let consistent = self.variable_order.len() == self.variables.len()
            && self.variable_order.iter().all(|n| self.variables.contains_key(n));
        if consistent {
            self.variable_order.clone()
        } else {
            self.variables.keys().cloned().collect()
        }
    }

    /// Checks every declared variable has a valid value in `values`.
    pub fn validate_values(&self, values: &Values) -> Result<()> {
        for name in self.variable_order() {
            let spec = &self.variables[&name];
            match values.get(&name) {
                Some(value) => spec.validate(value)?,
                None => {
                    return Err(Error::ValueValidationError {
                        name,
                        reason: "value is missing".to_string(),
                    })
                }
            }
        }
        Ok(())
    }
}

impl VariableSpec {
    pub fn new<S: Into<String>>(name: S, kind: VariableKind) -> Self {
        let name = name.into();
        Self { prompt: name.clone(), name, kind, ..Self::default() }
    }

    fn from_raw(name: String, raw: RawVariable) -> Result<Self> {
        let choices: Vec<String> =
            raw.choices.unwrap_or_default().iter().map(Value::to_string).collect();

        let kind = match raw.kind.as_deref() {
            Some(kind) => kind.parse::<VariableKind>().map_err(|reason| {
                Error::DeclarationValidationError { name: name.clone(), reason }
            })?,
            None if !choices.is_empty() => VariableKind::Choice,
            None => match raw.default {
                Some(Value::Bool(_)) => VariableKind::Boolean,
                Some(Value::Number(_)) => VariableKind::Number,
                _ => VariableKind::String,
            },
        };

        Ok(Self {
            prompt: raw.prompt.filter(|p| !p.is_empty()).unwrap_or_else(|| name.clone()),
            name,
            kind,
            default: raw.default,
            choices,
            pattern: raw.pattern.filter(|p| !p.is_empty()),
            help: raw.help.filter(|h| !h.is_empty()),
            min: raw.min,
            max: raw.max,
        })
    }

    /// Rejects declarations that no value could ever satisfy.
    pub fn validate_declaration(&self) -> Result<()> {
        let invalid = |reason: String| Error::DeclarationValidationError {
            name: self.name.clone(),
            reason,
        };

        match self.kind {
            VariableKind::Choice if self.choices.is_empty() => {
                return Err(invalid("choices required for choice type".to_string()));
            }
            VariableKind::Number => {
                if let (Some(min), Some(max)) = (self.min_bound(), self.max_bound()) {
                    if min > max {
                        return Err(invalid("min cannot be greater than max".to_string()));
                    }
                }
            }
            VariableKind::String => {
                if let Some(pattern) = &self.pattern {
                    Regex::new(pattern)
                        .map_err(|e| invalid(format!("invalid pattern '{pattern}': {e}")))?;
                }
            }
            _ => {}
        }

        if self.pattern.is_some() && self.kind != VariableKind::String {
            warn!("Variable '{}': pattern is ignored for {} variables", self.name, self.kind);
        }

        if let Some(default) = &self.default {
            let coerced = self.coerce(default.clone()).map_err(|e| match e {
                Error::ValueValidationError { reason, .. } => invalid(format!("default {reason}")),
                other => other,
            })?;
            if let (VariableKind::Choice, Value::String(choice)) = (self.kind, &coerced) {
                if !choice.contains("{{") && !self.choices.contains(choice) {
                    return Err(invalid(format!(
                        "default '{choice}' is not one of: {}",
                        self.choices.join(", ")
                    )));
                }
            }
        }
        Ok(())
    }

    /// Converts a raw answer into this variable's value shape.
    ///
    /// Numeric strings become numbers and boolean-like strings (`yes`, `n`,
    /// `true`, `0`, ...) become booleans.
    pub fn coerce(&self, value: Value) -> Result<Value> {
        let mismatch = |value: &Value| Error::ValueValidationError {
            name: self.name.clone(),
            reason: format!("expected a {}, got {} '{}'", self.kind, value.type_name(), value),
        };

        match (self.kind, value) {
            (VariableKind::String | VariableKind::Choice, Value::String(s)) => Ok(Value::String(s)),
            (VariableKind::String | VariableKind::Choice, other) => Ok(Value::String(other.to_string())),
            (VariableKind::Number, Value::Number(n)) => Ok(Value::Number(n)),
            (VariableKind::Number, Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(n) => Ok(Value::Number(n)),
                Err(_) => Err(mismatch(&Value::String(s))),
            },
            (VariableKind::Boolean, Value::Bool(b)) => Ok(Value::Bool(b)),
            (VariableKind::Boolean, Value::String(s)) => match parse_bool_like(&s) {
                Some(b) => Ok(Value::Bool(b)),
                None => Err(mismatch(&Value::String(s))),
            },
            (VariableKind::Boolean, Value::Number(n)) if n == 0.0 || n == 1.0 => {
                Ok(Value::Bool(n == 1.0))
            }
            (_, other) => Err(mismatch(&other)),
        }
    }

    /// Checks a collected value against this variable's constraints.
    ///
    /// # Errors
    /// * `Error::ValueValidationError` naming the violated constraint and the offending value
    pub fn validate(&self, value: &Value) -> Result<()> {
        let fail = |reason: String| Error::ValueValidationError {
            name: self.name.clone(),
            reason: match &self.help {
                Some(help) => format!("{reason} ({help})"),
                None => reason,
            },
        };

        match (self.kind, value) {
            (VariableKind::String, Value::String(s)) => {
                if let Some(pattern) = &self.pattern {
                    let re = Regex::new(pattern).map_err(|e| Error::DeclarationValidationError {
                        name: self.name.clone(),
                        reason: format!("invalid pattern '{pattern}': {e}"),
                    })?;
                    if !re.is_match(s) {
                        return Err(fail(format!(
                            "value '{s}' does not match pattern '{pattern}'"
                        )));
                    }
                }
                Ok(())
            }
            (VariableKind::Choice, Value::String(s)) => {
                if self.choices.iter().any(|c| c == s) {
                    Ok(())
                } else {
                    Err(fail(format!(
                        "value '{s}' is not one of: {}",
                        self.choices.join(", ")
                    )))
                }
            }
            (VariableKind::Number, Value::Number(n)) => {
                if let Some(min) = self.min_bound() {
                    if *n < min {
                        return Err(fail(format!(
                            "value {value} below minimum {}",
                            Value::Number(min)
                        )));
                    }
                }
                if let Some(max) = self.max_bound() {
                    if *n > max {
                        return Err(fail(format!(
                            "value {value} above maximum {}",
                            Value::Number(max)
                        )));
                    }
                }
                Ok(())
            }
            (VariableKind::Boolean, Value::Bool(_)) => Ok(()),
            (kind, other) => Err(fail(format!(
                "expected a {kind}, got {} '{other}'",
                other.type_name()
            ))),
        }
    }

    /// Typed default: the declared default coerced to the kind, otherwise
    /// the first choice, `""`, `0` or `false`.
    pub fn default_value(&self) -> Value {
        if let Some(value) = self.default.clone().and_then(|d| self.coerce(d).ok()) {
            return value;
        }
        match self.kind {
            VariableKind::String => Value::String(String::new()),
            VariableKind::Choice => {
                Value::String(self.choices.first().cloned().unwrap_or_default())
            }
            VariableKind::Number => Value::Number(0.0),
            VariableKind::Boolean => Value::Bool(false),
        }
    }

    fn min_bound(&self) -> Option<f64> {
        self.min.filter(|m| *m != 0.0)
    }

    fn max_bound(&self) -> Option<f64> {
        self.max.filter(|m| *m != 0.0)
    }
}
