//! Minimal templating language used for path segments, file contents and
//! hook commands.
//!
//! A template is parsed once into a tree and can then be rendered any number
//! of times against a [`Values`] mapping:
//!
//! ```
//! use cutr::template::Template;
//! use cutr::value::{Value, Values};
//!
//! let template = Template::parse("{{ if .docker }}FROM {{ .name | kebab }}{{ end }}").unwrap();
//! let mut values = Values::new();
//! values.insert("docker".to_string(), Value::Bool(true));
//! values.insert("name".to_string(), Value::from("MyService"));
//! assert_eq!(template.render(&values).unwrap(), "FROM my-service");
//! ```
//!
//! Referencing a key that is not in the mapping is always an error. Nothing
//! is ever silently rendered as an empty string.

pub mod funcs;
pub mod lexer;
pub mod parser;

use thiserror::Error;

use crate::error::Error;
use crate::value::{Value, Values};
use parser::{Command, Node, Operand, Pipeline};

/// Failure while parsing or executing a template.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("map has no entry for key \"{key}\"")]
    MissingKey { key: String },
}

impl TemplateError {
    pub(crate) fn parse(src: &str, position: usize, message: String) -> Self {
        let line = src[..position.min(src.len())].matches('\n').count() + 1;
        TemplateError::Parse { line, message }
    }

    /// Converts into the crate error, naming what was being rendered.
    pub fn with_context<S: Into<String>>(self, context: S) -> Error {
        let context = context.into();
        match self {
            TemplateError::Parse { .. } => {
                Error::TemplateParseError { context, message: self.to_string() }
            }
            TemplateError::MissingKey { .. } => {
                Error::TemplateExecutionError { context, message: self.to_string() }
            }
        }
    }
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(src: &str) -> Result<Self, TemplateError> {
        let tokens = lexer::tokenize(src)?;
        let nodes = parser::parse(src, tokens)?;
        Ok(Self { nodes })
    }

    /// True when the source had no actions at all.
    pub fn is_static(&self) -> bool {
        self.nodes.iter().all(|n| matches!(n, Node::Text(_)))
    }

    pub fn render(&self, values: &Values) -> Result<String, TemplateError> {
        let mut out = String::new();
        render_nodes(&self.nodes, values, &mut out)?;
        Ok(out)
    }
}

/// Parses and renders `src` in one step.
pub fn render_str(src: &str, values: &Values) -> Result<String, TemplateError> {
    Template::parse(src)?.render(values)
}

fn render_nodes(nodes: &[Node], values: &Values, out: &mut String) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Output(pipeline) => out.push_str(&eval_pipeline(pipeline, values)?.to_string()),
            Node::If(if_node) => {
                let mut taken = false;
                for (condition, body) in &if_node.branches {
                    if eval_pipeline(condition, values)?.is_truthy() {
                        render_nodes(body, values, out)?;
                        taken = true;
                        break;
                    }
                }
                if !taken {
                    render_nodes(&if_node.otherwise, values, out)?;
                }
            }
        }
    }
    Ok(())
}

fn eval_pipeline(pipeline: &Pipeline, values: &Values) -> Result<Value, TemplateError> {
    let mut piped: Option<Value> = None;
    for command in &pipeline.commands {
        let result = match command {
            Command::Operand(operand) => eval_operand(operand, values)?,
            Command::Call { func, args } => {
                let mut evaluated = Vec::with_capacity(args.len() + 1);
                evaluated.extend(piped.take());
                for arg in args {
                    evaluated.push(eval_operand(arg, values)?);
                }
                func.call(&evaluated)
            }
        };
        piped = Some(result);
    }
    // The parser never produces an empty pipeline.
    Ok(piped.unwrap_or(Value::String(String::new())))
}

fn eval_operand(operand: &Operand, values: &Values) -> Result<Value, TemplateError> {
    match operand {
        Operand::Field(key) => values
            .get(key)
            .cloned()
            .ok_or_else(|| TemplateError::MissingKey { key: key.clone() }),
        Operand::Literal(value) => Ok(value.clone()),
        Operand::Nested(pipeline) => eval_pipeline(pipeline, values),
    }
}
