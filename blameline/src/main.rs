//! blameline - inline git blame annotations
//!
//! Command line front end over `blameline-core`. Each subcommand drives the
//! same pipeline an editor integration would: resolve the document, fetch
//! annotations through the cache, render decorations or hovers.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/blameline/config.toml (~/.config/blameline/config.toml)
//! - Settings: $XDG_STATE_HOME/blameline/settings.toml
//! - Logs: $XDG_STATE_HOME/blameline/blameline.log

mod terminal;
mod watch;

use anyhow::{bail, Context, Result};
use blameline_core::document::Workspace;
use blameline_core::format::{format_relative_time, truncate};
use blameline_core::git::{GitCli, GitRunner};
use blameline_core::render::DiffCommand;
use blameline_core::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use terminal::{annotation_source, Session, Target};

#[derive(Parser)]
#[command(name = "blameline")]
#[command(about = "Inline git blame annotations")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the commit that last touched every line of a file
    Annotate {
        file: PathBuf,

        /// Annotate the file as of this revision instead of the working tree
        #[arg(long)]
        rev: Option<String>,

        /// Emit JSON records instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the hover page for one line
    Hover {
        file: PathBuf,

        /// 1-based line number
        line: u32,

        #[arg(long)]
        rev: Option<String>,
    },

    /// Show how the repository's origin remote is linked
    Remote {
        /// Directory inside the repository (defaults to the current directory)
        dir: Option<PathBuf>,
    },

    /// Show a file's changes in a revision against its parent
    Diff { file: PathBuf, rev: String },

    /// Flip the persisted enabled setting
    Toggle,

    /// Keep annotations for a file up to date as it changes
    Watch {
        file: PathBuf,

        /// 1-based line to annotate initially
        #[arg(long, default_value = "1")]
        line: u32,

        /// Poll interval in milliseconds
        #[arg(long, default_value = "500")]
        poll: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard =
        blameline_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("blameline starting");

    match args.command {
        Commands::Annotate { file, rev, json } => annotate(&config, file, rev, json).await,
        Commands::Hover { file, line, rev } => hover(&config, file, line, rev).await,
        Commands::Remote { dir } => remote(&config, dir).await,
        Commands::Diff { file, rev } => diff(&config, file, rev).await,
        Commands::Toggle => toggle(&config).await,
        Commands::Watch { file, line, poll } => {
            let git = GitCli::from_config(&config.annotation);
            let target = Target::open(&git, &file, None).await?;
            let path = target.repo.join(&target.info.file_path);
            let session = Session::new(
                &config,
                target.workspace.clone(),
                vec![target.view(line.saturating_sub(1))],
                true,
            );
            watch::run(session, target.document, &path, Duration::from_millis(poll)).await
        }
    }
}

async fn annotate(config: &Config, file: PathBuf, rev: Option<String>, json: bool) -> Result<()> {
    let git = GitCli::from_config(&config.annotation);
    let target = Target::open(&git, &file, rev.as_deref()).await?;
    let source = annotation_source(config);

    let Some(map) = source.annotations(&target.info).await else {
        bail!(
            "no annotations for {} (see {} for details)",
            file.display(),
            Config::log_path().display()
        );
    };

    let records = map.sorted();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&records).context("failed to serialize annotations")?
        );
        return Ok(());
    }

    let now = chrono::Utc::now().timestamp();
    let author_width = records
        .iter()
        .map(|r| r.author.chars().count())
        .max()
        .unwrap_or(0)
        .min(20);

    for record in records {
        println!(
            "{} {:>5}  {:<width$}  {:<14}  {}",
            record.short_revision(),
            record.line_number,
            truncate(&record.author, author_width),
            format_relative_time(record.author_time, now),
            truncate(&record.summary, config.annotation.summary_max_chars),
            width = author_width,
        );
    }
    Ok(())
}

async fn hover(config: &Config, file: PathBuf, line: u32, rev: Option<String>) -> Result<()> {
    if line == 0 {
        bail!("line numbers start at 1");
    }
    let git = GitCli::from_config(&config.annotation);
    let target = Target::open(&git, &file, rev.as_deref()).await?;
    let session = Session::new(
        config,
        target.workspace.clone(),
        vec![target.view(line - 1)],
        false,
    );

    session.controller.start().await;
    let content = session
        .controller
        .hover_provider()
        .provide(&target.document, line - 1);
    session.controller.dispose();

    match content {
        Some(content) => print!("{}", content.markdown),
        None => println!("No annotation for line {}", line),
    }
    Ok(())
}

async fn remote(config: &Config, dir: Option<PathBuf>) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to read current directory")?,
    };
    let git = GitCli::from_config(&config.annotation);
    let repo = git
        .toplevel(&dir)
        .await
        .with_context(|| format!("{} is not inside a git repository", dir.display()))?;

    let source = annotation_source(config);
    match source.remote_info(&repo).await {
        Some(info) => {
            println!("Repository: {}", info.repo_url());
            println!("Host:       {}", info.host.display_name());
            match info.commit_url("<revision>") {
                Some(url) => println!("Commits:    {}", url),
                None => println!("Commits:    (no links for this host)"),
            }
        }
        None => println!("No recognised origin remote for {}", repo.display()),
    }
    Ok(())
}

async fn diff(config: &Config, file: PathBuf, rev: String) -> Result<()> {
    let git = GitCli::from_config(&config.annotation);
    let target = Target::open(&git, &file, None).await?;
    let session = Session::new(config, target.workspace.clone(), Vec::new(), false);

    let command = DiffCommand {
        revision: rev,
        repo: target.repo.clone(),
        path: target.info.file_path.clone(),
    };
    let opened = session.controller.show_diff(&command).await;
    session.controller.dispose();

    if opened.is_none() {
        bail!("failed to show diff for {}", command.revision);
    }
    Ok(())
}

async fn toggle(config: &Config) -> Result<()> {
    let session = Session::new(config, Workspace::new([]), Vec::new(), false);
    let enabled = session.controller.toggle().await;
    session.controller.dispose();

    tracing::info!(enabled, path = %Config::settings_path().display(), "Toggled annotations");
    Ok(())
}
