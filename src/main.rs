use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};

use pwakit::config::{self, ProjectConfig};
use pwakit::output;
use pwakit::runner::{self, CommandResult, RunError};
use pwakit::stage;

/// External commands, fixed per subcommand.
const NPM: &str = "npm";
const NPX: &str = "npx";
const INSTALL_ARGS: &[&str] = &["install"];
const BUILD_ARGS: &[&str] = &["run", "build"];
const BUNDLER_ARGS: &[&str] = &["vite", "build"];

/// Lines of combined output shown after `install`.
const INSTALL_TAIL_LINES: usize = 50;

#[derive(Parser)]
#[command(
    name = "pwakit",
    about = "Build-automation helper for a Vite-based PWA project"
)]
struct Cli {
    /// Project directory containing package.json (and optional pwakit.toml)
    #[arg(
        short = 'C',
        long,
        global = true,
        env = "PWAKIT_PROJECT_DIR",
        default_value = "."
    )]
    project_dir: PathBuf,

    /// Show command resolution details and bundler output on success
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install npm dependencies
    Install,
    /// Run the bundler and report the outcome
    Build,
    /// Run the build with a timeout and verify the output directory
    Check,
    /// Build, then copy PWA artifacts into the output directory
    Stage,
}

/// Run one external command in the project directory. A timeout is
/// converted to a printed failure (`None`) rather than a propagated
/// error; every other [`RunError`] bubbles up.
fn run_step(
    program: &str,
    args: &[&str],
    dir: &Path,
    timeout: Option<Duration>,
    verbose: bool,
) -> anyhow::Result<Option<CommandResult>> {
    if verbose {
        eprintln!(
            "[pwakit] running `{program} {}` in {}",
            args.join(" "),
            dir.display()
        );
    }
    match runner::execute(program, args, dir, timeout) {
        Ok(result) => Ok(Some(result)),
        Err(RunError::Timeout(limit)) => {
            println!("✗ {program} timed out after {}s", limit.as_secs());
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Print the build outcome and map it to an exit code. Captured output
/// is shown on failure; on success it stays behind `--verbose`.
fn report_build(result: &CommandResult, verbose: bool) -> i32 {
    if result.success() {
        if verbose && !result.combined.is_empty() {
            println!("{}", result.combined);
        }
        println!("✓ build succeeded");
        0
    } else {
        if !result.combined.is_empty() {
            println!("{}", result.combined);
        }
        println!("✗ build failed (exit code {})", result.exit_code);
        1
    }
}

fn cmd_install(dir: &Path, config: &ProjectConfig, verbose: bool) -> anyhow::Result<i32> {
    let timeout = Duration::from_secs(config.install_timeout_secs);
    let Some(result) = run_step(NPM, INSTALL_ARGS, dir, Some(timeout), verbose)? else {
        return Ok(1);
    };

    println!("exit code: {}", result.exit_code);
    let tail = output::tail(&result.combined, INSTALL_TAIL_LINES);
    if !tail.is_empty() {
        println!("{tail}");
    }

    if result.success() {
        println!("✓ install succeeded");
        Ok(0)
    } else {
        println!("✗ install failed (exit code {})", result.exit_code);
        Ok(1)
    }
}

fn cmd_build(dir: &Path, verbose: bool) -> anyhow::Result<i32> {
    let Some(result) = run_step(NPX, BUNDLER_ARGS, dir, None, verbose)? else {
        return Ok(1);
    };
    Ok(report_build(&result, verbose))
}

fn cmd_check(dir: &Path, config: &ProjectConfig, verbose: bool) -> anyhow::Result<i32> {
    let timeout = Duration::from_secs(config.build_timeout_secs);
    let Some(result) = run_step(NPM, BUILD_ARGS, dir, Some(timeout), verbose)? else {
        return Ok(1);
    };
    let code = report_build(&result, verbose);
    if code != 0 {
        return Ok(code);
    }

    let index = Path::new(&config.dist_dir).join("index.html");
    if dir.join(&index).is_file() {
        println!("✓ {} exists", index.display());
        Ok(0)
    } else {
        println!("✗ {} missing", index.display());
        Ok(1)
    }
}

fn cmd_stage(dir: &Path, config: &ProjectConfig, verbose: bool) -> anyhow::Result<i32> {
    let Some(result) = run_step(NPM, BUILD_ARGS, dir, None, verbose)? else {
        return Ok(1);
    };
    let code = report_build(&result, verbose);
    if code != 0 {
        return Ok(code);
    }

    let dist = dir.join(&config.dist_dir);
    let copied = stage::copy_artifacts(dir, &dist)?;
    for name in copied {
        println!("✓ copied {name}");
    }
    print!("{}", stage::render_tree(&dist)?);
    Ok(0)
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let dir = &cli.project_dir;
    let config = match config::try_load(dir)? {
        Some(config) => {
            if cli.verbose {
                eprintln!("[pwakit] loaded {}", config::CONFIG_FILE);
            }
            config
        }
        None => ProjectConfig::default(),
    };
    if cli.verbose {
        eprintln!("[pwakit] project dir: {}", dir.display());
    }

    match cli.command {
        Commands::Install => cmd_install(dir, &config, cli.verbose),
        Commands::Build => cmd_build(dir, cli.verbose),
        Commands::Check => cmd_check(dir, &config, cli.verbose),
        Commands::Stage => cmd_stage(dir, &config, cli.verbose),
    }
}

fn main() {
    let cli = Cli::parse();
    let exit_code = run(&cli).unwrap_or_else(|e| {
        eprintln!("[pwakit] error: {e:#}");
        1
    });
    std::process::exit(exit_code);
}
