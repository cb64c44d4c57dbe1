//! Generation pipeline.
//!
//! Sequences the stages of one run:
//! `ConfigLoaded -> ValuesCollected -> PreHooksRun -> Rendered -> PostHooksRun -> Done`.
//! The first failing stage ends the run; nothing already written is undone.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};

use crate::config::{load_config, TemplateConfig};
use crate::error::{Error, Result};
use crate::hooks::{HookExecutor, Phase, DEFAULT_HOOK_TIMEOUT};
use crate::loader::load_template;
use crate::processor::{render_tree, RenderSummary};
use crate::progress::with_progress;
use crate::prompt::{collect_values, Prompter};
use crate::value::Values;

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ConfigLoaded,
    ValuesCollected,
    PreHooksRun,
    Rendered,
    PostHooksRun,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Options for one generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Template path or git URL
    pub template: String,
    pub output_dir: PathBuf,
    /// Allow rendering into an existing output directory
    pub force: bool,
    /// Run hooks without asking
    pub skip_hooks_check: bool,
    /// Never run hooks
    pub no_hooks: bool,
    /// Bound on each hook phase
    pub hook_timeout: Duration,
    /// Forward hook output to stdout
    pub stream_hook_output: bool,
    /// Draw spinners while rendering and running hooks
    pub show_progress: bool,
    /// Answers that skip prompting
    pub preloaded: Values,
}

impl GenerateOptions {
    pub fn new<S: Into<String>, P: Into<PathBuf>>(template: S, output_dir: P) -> Self {
        Self {
            template: template.into(),
            output_dir: output_dir.into(),
            force: false,
            skip_hooks_check: false,
            no_hooks: false,
            hook_timeout: DEFAULT_HOOK_TIMEOUT,
            stream_hook_output: false,
            show_progress: false,
            preloaded: Values::new(),
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub config: TemplateConfig,
    pub values: Values,
    pub summary: RenderSummary,
    pub hooks_executed: bool,
}

/// Ensures the output directory is safe to write to.
///
/// # Errors
/// * `Error::OutputDirectoryExistsError` if it exists and `force` is false
pub fn get_output_dir<P: AsRef<Path>>(output_dir: P, force: bool) -> Result<PathBuf> {
    let output_dir = output_dir.as_ref();
    if output_dir.exists() && !force {
        return Err(Error::OutputDirectoryExistsError {
            output_dir: output_dir.display().to_string(),
        });
    }
    Ok(output_dir.to_path_buf())
}

/// Runs the whole pipeline.
///
/// A temporary clone of a remote template is removed when this returns,
/// on success and on failure.
pub fn generate(options: &GenerateOptions, prompter: &dyn Prompter) -> Result<GenerateReport> {
    let output_root = get_output_dir(&options.output_dir, options.force)?;
    let template = load_template(&options.template)?;
    let template_root = template.path();

    let config = load_config(template_root)?;
    stage(Stage::ConfigLoaded);

    let values = collect_values(&config, prompter, &options.preloaded)?;
    stage(Stage::ValuesCollected);

    let has_hooks =
        !config.hooks.pre_generation.is_empty() || !config.hooks.post_generation.is_empty();
    let execute_hooks = has_hooks && confirm_hooks(options, prompter)?;

    let mut executor = HookExecutor::new(options.hook_timeout);
    if options.stream_hook_output {
        executor = executor.with_sink(std::io::stdout());
    }

    if execute_hooks {
        let commands = &config.hooks.pre_generation;
        run_phase(&mut executor, options, Phase::PreGeneration, commands, template_root, &values)?;
    }
    stage(Stage::PreHooksRun);

    let summary = with_progress("Rendering template files", options.show_progress, || {
        render_tree(template_root, &output_root, &values, &config.template_settings)
    })?;
    stage(Stage::Rendered);

    if execute_hooks {
        let commands = &config.hooks.post_generation;
        run_phase(&mut executor, options, Phase::PostGeneration, commands, &output_root, &values)?;
    }
    stage(Stage::PostHooksRun);
    stage(Stage::Done);

    Ok(GenerateReport { config, values, summary, hooks_executed: execute_hooks })
}

fn confirm_hooks(options: &GenerateOptions, prompter: &dyn Prompter) -> Result<bool> {
    if options.no_hooks {
        debug!("Hooks disabled");
        return Ok(false);
    }
    let confirmed = prompter.confirm(
        options.skip_hooks_check,
        "This template contains hooks that will execute commands on your system. Run them?"
            .to_string(),
    )?;
    if !confirmed {
        warn!("Skipping template hooks");
    }
    Ok(confirmed)
}

fn run_phase(
    executor: &mut HookExecutor,
    options: &GenerateOptions,
    phase: Phase,
    commands: &[String],
    work_dir: &Path,
    values: &Values,
) -> Result<()> {
    if commands.is_empty() {
        return Ok(());
    }
    let animate = options.show_progress && !executor.is_streaming();
    with_progress(&format!("Running {phase} hooks"), animate, || {
        executor.run_phase(phase, commands, work_dir, values)
    })
}

fn stage(stage: Stage) {
    debug!("Generation stage reached: {stage}");
}
