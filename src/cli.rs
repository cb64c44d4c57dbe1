//! Command-line interface for cutr.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, CommandFactory, Parser};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments structure for cutr.
#[derive(Parser, Debug)]
#[command(author, version, about = "cutr: project scaffolding from templated directory trees", long_about = None)]
pub struct Args {
    /// Path to the template directory or git repository URL
    #[arg(value_name = "TEMPLATE")]
    pub template: String,

    /// Directory where the generated project will be created
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Render into the output directory even if it already exists
    #[arg(short, long)]
    pub force: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Read answers as a JSON object from stdin
    #[arg(short, long)]
    pub stdin: bool,

    /// Never prompt; use defaults for variables without an answer
    #[arg(long)]
    pub non_interactive: bool,

    /// Skip confirmation prompts when executing hooks.
    /// This will automatically execute any pre/post generation hooks defined
    /// in the template without asking for confirmation first.
    #[arg(long)]
    pub skip_hooks_check: bool,

    /// Do not run template hooks at all
    #[arg(long, conflicts_with = "skip_hooks_check")]
    pub no_hooks: bool,

    /// Time limit for each hook phase, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 300)]
    pub hook_timeout: u64,

    /// Print hook output as it is produced
    #[arg(long)]
    pub stream_hooks: bool,
}

impl Args {
    pub fn hook_timeout(&self) -> Duration {
        Duration::from_secs(self.hook_timeout)
    }
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
