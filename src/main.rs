//! cutr's application entry point.
//! Parses arguments, configures logging and hands off to the generator.

use std::io::{IsTerminal, Read};

use cutr::{
    cli::{get_args, Args},
    error::{default_error_handler, Error, Result},
    generator::{generate, GenerateOptions},
    prompt::{DefaultsPrompter, DialoguerPrompter, Prompter},
    value::{values_from_json, Values},
};

/// Main application entry point.
fn main() {
    let args = get_args();

    // Logger configuration
    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Off
        })
        .init();

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

/// Reads preloaded answers from stdin when requested.
fn read_answers(from_stdin: bool) -> Result<Values> {
    if !from_stdin {
        return Ok(Values::new());
    }
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf).map_err(Error::IoError)?;
    values_from_json(&buf)
}

fn run(args: Args) -> Result<()> {
    let preloaded = read_answers(args.stdin)?;

    // Prompts need a terminal; stdin answers consume it.
    let interactive =
        !args.non_interactive && !args.stdin && std::io::stdin().is_terminal();
    let prompter: Box<dyn Prompter> = if interactive {
        Box::new(DialoguerPrompter::new())
    } else {
        Box::new(DefaultsPrompter)
    };

    let mut options = GenerateOptions::new(args.template.clone(), args.output_dir.clone());
    options.force = args.force;
    options.skip_hooks_check = args.skip_hooks_check;
    options.no_hooks = args.no_hooks;
    options.hook_timeout = args.hook_timeout();
    options.stream_hook_output = args.stream_hooks;
    options.show_progress = !args.verbose;
    options.preloaded = preloaded;

    let report = generate(&options, &*prompter)?;
    let summary = report.summary;
    println!(
        "Generated '{}' in {}: {} rendered, {} copied, {} skipped.",
        report.config.name,
        args.output_dir.display(),
        summary.rendered,
        summary.copied,
        summary.skipped
    );
    if !report.hooks_executed
        && (!report.config.hooks.pre_generation.is_empty()
            || !report.config.hooks.post_generation.is_empty())
    {
        println!("Template hooks were not run.");
    }
    Ok(())
}
