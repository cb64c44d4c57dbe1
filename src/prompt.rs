//! Value collection for template variables.
//! Answers come from preloaded values (e.g. JSON on stdin) or from a
//! [`Prompter`]; every answer is coerced to its variable's kind and validated.

use crate::config::{TemplateConfig, VariableKind, VariableSpec};
use crate::error::{Error, Result};
use crate::template::render_str;
use crate::value::{Value, Values};
use dialoguer::{Confirm, Input, Select};
use log::debug;

/// Source of answers for variables that were not preloaded.
pub trait Prompter {
    /// Asks for the value of `spec`, offering `default`.
    fn ask(&self, spec: &VariableSpec, default: &Value) -> Result<Value>;

    /// Asks a yes/no question. `skip` answers yes without asking.
    fn confirm(&self, skip: bool, prompt: String) -> Result<bool>;
}

/// Interactive terminal prompts.
#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self
    }

    fn ask_text(&self, spec: &VariableSpec, default: &Value) -> Result<Value> {
        let input = Input::<String>::new()
            .with_prompt(&spec.prompt)
            .default(default.to_string())
            .validate_with(|input: &String| -> std::result::Result<(), String> {
                spec.coerce(Value::from(input.as_str()))
                    .and_then(|value| spec.validate(&value))
                    .map_err(|e| e.to_string())
            })
            .interact_text()
            .map_err(|e| Error::PromptError(e.to_string()))?;
        spec.coerce(Value::String(input))
    }
}

impl Prompter for DialoguerPrompter {
    fn ask(&self, spec: &VariableSpec, default: &Value) -> Result<Value> {
        match spec.kind {
            VariableKind::Choice => {
                let default_index = default
                    .as_str()
                    .and_then(|d| spec.choices.iter().position(|c| c == d))
                    .unwrap_or(0);
                let selection = Select::new()
                    .with_prompt(&spec.prompt)
                    .default(default_index)
                    .items(&spec.choices)
                    .interact()
                    .map_err(|e| Error::PromptError(e.to_string()))?;
                Ok(Value::String(spec.choices[selection].clone()))
            }
            VariableKind::Boolean => {
                let answer = Confirm::new()
                    .with_prompt(&spec.prompt)
                    .default(default.as_bool().unwrap_or(false))
                    .interact()
                    .map_err(|e| Error::PromptError(e.to_string()))?;
                Ok(Value::Bool(answer))
            }
            VariableKind::String | VariableKind::Number => self.ask_text(spec, default),
        }
    }

    fn confirm(&self, skip: bool, prompt: String) -> Result<bool> {
        if skip {
            return Ok(true);
        }
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| Error::PromptError(e.to_string()))
    }
}

/// Answers every question with its default; confirmations need `skip`.
#[derive(Debug, Default)]
pub struct DefaultsPrompter;

impl Prompter for DefaultsPrompter {
    fn ask(&self, _spec: &VariableSpec, default: &Value) -> Result<Value> {
        Ok(default.clone())
    }

    fn confirm(&self, skip: bool, _prompt: String) -> Result<bool> {
        Ok(skip)
    }
}

/// Collects a value for every declared variable, in declaration order.
///
/// Preloaded answers win over prompting. String defaults may reference
/// earlier variables, e.g. `{{ .project_name | snake }}`.
///
/// # Errors
/// * `Error::ValueValidationError` if an answer cannot be coerced or fails validation
/// * `Error::TemplateExecutionError` if a templated default references an unknown variable
pub fn collect_values(
    config: &TemplateConfig,
    prompter: &dyn Prompter,
    preloaded: &Values,
) -> Result<Values> {
    let mut values = Values::new();

    for name in config.variable_order() {
        let spec = &config.variables[&name];
        let value = match preloaded.get(&name) {
            Some(answer) => {
                debug!("Using preloaded answer for '{name}'");
                spec.coerce(answer.clone())?
            }
            None => {
                let default = resolve_default(spec, &values)?;
                spec.coerce(prompter.ask(spec, &default)?)?
            }
        };
        spec.validate(&value)?;
        values.insert(name, value);
    }

    for key in preloaded.keys().filter(|k| !config.variables.contains_key(*k)) {
        debug!("Ignoring answer for undeclared variable '{key}'");
    }
    Ok(values)
}

fn resolve_default(spec: &VariableSpec, collected: &Values) -> Result<Value> {
    match spec.default_value() {
        Value::String(s) if s.contains("{{") => render_str(&s, collected)
            .map(Value::String)
            .map_err(|e| e.with_context(format!("default of variable '{}'", spec.name))),
        other => Ok(other),
    }
}
