mod commands;
mod core;
mod release;
mod ui;
mod utils;

use clap::{Args, Parser, Subcommand};
use core::context::StageContext;
use core::error::{ReleaseError, ReleaseResult, print_error};
use release::BumpPart;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Staged, resumable releases across many independently versioned git packages
#[derive(Parser)]
#[command(name = "release-train")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Configuration file (default: release-train.toml, .release-train.toml, .config/release-train.toml)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Print the stage summary as JSON on stdout (progress goes to stderr)
  #[arg(long, global = true)]
  json: bool,

  /// Debug-level logging on stderr
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Args, Clone, Copy)]
struct DryRun {
  /// Print intended git commands and writes without changing anything
  #[arg(long)]
  dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
  /// Prepare the dev branch in every package
  Stage0 {
    /// Dev branch to prepare
    #[arg(long, default_value = "dev_branch")]
    branch: String,
    /// Base branch a new dev branch starts from
    #[arg(long, default_value = "main")]
    base_branch: String,
    /// Push the branch when it has unpushed commits
    #[arg(long)]
    push: bool,
    /// Fail on a dirty working tree instead of stashing
    #[arg(long)]
    no_stash: bool,
    /// Stash message (default: release-train-stage0-<branch>)
    #[arg(long)]
    stash_name: Option<String>,
    /// Leave the stash in place after restoring it
    #[arg(long)]
    keep_stash: bool,
    /// Never start the branch from the remote default branch
    #[arg(long)]
    no_fallback_head: bool,
    /// Never start the branch from a local base branch
    #[arg(long)]
    no_fallback_local: bool,
    #[command(flatten)]
    dry_run: DryRun,
  },

  /// Snapshot uncommitted changes (then edit the commit message)
  Stage1 {
    /// Omit the full diff from the snapshot
    #[arg(long)]
    no_full_diff: bool,
    #[command(flatten)]
    dry_run: DryRun,
  },

  /// Commit prepared messages and/or push (neither flag = commit)
  Stage2 {
    #[arg(long)]
    commit: bool,
    #[arg(long)]
    push: bool,
    #[command(flatten)]
    dry_run: DryRun,
  },

  /// Snapshot changes since the last tag (then edit the tag message)
  Stage3 {
    /// JSON object mapping package name to the tag to diff from
    #[arg(long)]
    tags_file: Option<PathBuf>,
    #[command(flatten)]
    dry_run: DryRun,
  },

  /// Bump versions, commit releases and pin staging
  Stage4 {
    /// Version part to bump
    #[arg(long, value_enum)]
    bump: Option<BumpPart>,
    /// Push branches with unpushed commits
    #[arg(long)]
    push: bool,
    #[command(flatten)]
    dry_run: DryRun,
  },

  /// Tag releases and pin prod
  Stage5 {
    /// Push tags and the prod manifest commit
    #[arg(long)]
    push: bool,
    /// Fast-forward the base branch before tagging
    #[arg(long)]
    sync: bool,
    #[arg(long, default_value = "main")]
    base_branch: String,
    /// Local branch to delete after syncing
    #[arg(long)]
    delete_branch: Option<String>,
    /// Remote name (default: git_remote from configuration)
    #[arg(long)]
    remote: Option<String>,
    #[command(flatten)]
    dry_run: DryRun,
  },

  /// Start the next development cycle
  Stage6 {
    #[arg(long, default_value = "dev_branch")]
    branch: String,
    #[arg(long, default_value = "main")]
    base_branch: String,
    #[arg(long)]
    push: bool,
    /// Remote name (default: git_remote from configuration)
    #[arg(long)]
    remote: Option<String>,
    #[command(flatten)]
    dry_run: DryRun,
  },

  /// Remove and recreate the artifact tree
  Clear {
    #[command(flatten)]
    dry_run: DryRun,
  },
}

impl Commands {
  fn dry_run(&self) -> bool {
    match self {
      Commands::Stage0 { dry_run, .. }
      | Commands::Stage1 { dry_run, .. }
      | Commands::Stage2 { dry_run, .. }
      | Commands::Stage3 { dry_run, .. }
      | Commands::Stage4 { dry_run, .. }
      | Commands::Stage5 { dry_run, .. }
      | Commands::Stage6 { dry_run, .. }
      | Commands::Clear { dry_run } => dry_run.dry_run,
    }
  }
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

/// Logs always go to stderr; `RUST_LOG` overrides the level
fn init_tracing(verbose: bool) {
  let default = if verbose { "release_train=debug" } else { "release_train=warn" };
  let filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

  tracing_subscriber::registry()
    .with(filter)
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false),
    )
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.verbose);
  ui::set_machine_output(cli.json);

  let workspace_root = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => handle_error(e.into()),
  };

  let ctx = match StageContext::build(&workspace_root, cli.config.as_deref()) {
    Ok(ctx) => ctx.with_dry_run(cli.command.dry_run()),
    Err(e) => handle_error(e),
  };
  tracing::debug!(config = %ctx.config.source_display(), dry_run = ctx.dry_run, "context ready");

  if let Err(err) = run(&ctx, cli.command) {
    handle_error(err);
  }
}

fn run(ctx: &StageContext, command: Commands) -> ReleaseResult<()> {
  match command {
    Commands::Stage0 {
      branch,
      base_branch,
      push,
      no_stash,
      stash_name,
      keep_stash,
      no_fallback_head,
      no_fallback_local,
      ..
    } => commands::run_stage0(
      ctx,
      &commands::Stage0Options {
        branch,
        base_branch,
        push,
        no_stash,
        stash_name,
        keep_stash,
        no_fallback_head,
        no_fallback_local,
      },
    )?
    .print(),
    Commands::Stage1 { no_full_diff, .. } => commands::run_stage1(ctx, !no_full_diff)?.print(),
    Commands::Stage2 { commit, push, .. } => commands::run_stage2(ctx, commit, push)?.print(),
    Commands::Stage3 { tags_file, .. } => commands::run_stage3(ctx, tags_file.as_deref())?.print(),
    Commands::Stage4 { bump, push, .. } => commands::run_stage4(ctx, commands::Stage4Options { bump, push })?.print(),
    Commands::Stage5 {
      push,
      sync,
      base_branch,
      delete_branch,
      remote,
      ..
    } => commands::run_stage5(
      ctx,
      &commands::Stage5Options {
        push,
        sync,
        base_branch,
        delete_branch,
        remote,
      },
    )?
    .print(),
    Commands::Stage6 {
      branch,
      base_branch,
      push,
      remote,
      ..
    } => commands::run_stage6(
      ctx,
      &commands::Stage6Options {
        branch,
        base_branch,
        push,
        remote,
      },
    )?
    .print(),
    Commands::Clear { .. } => commands::run_clear(ctx)?.print(),
  }
}

fn handle_error(err: ReleaseError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
