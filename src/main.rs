use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};

use dragonite::bump::{apply_release, read_pkgbuild, render_pkgbuild, write_pkgbuild};
use dragonite::matching::AssetOutcome;
use dragonite::release::GitHubClient;
use dragonite::repo::GitCli;
use dragonite::{BotConfig, BumpOptions, IgnoreList, Release, Updater, distance};

#[derive(Parser)]
#[command(name = "dragonite")]
#[command(about = "Propose package metadata bumps for new upstream releases", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to dragonite.config.json in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the edit distance between two strings
    Distance {
        /// First string
        a: String,
        /// Second string
        b: String,
    },
    /// Apply a saved release payload to a single pkgbuild.json
    Bump(BumpArgs),
    /// Clone the metadata repository and run one update pass
    Check(RunArgs),
    /// Clone the metadata repository and run update passes forever
    Watch(RunArgs),
}

#[derive(Args)]
struct BumpArgs {
    /// Package metadata file to update
    pkgbuild: PathBuf,

    /// JSON release payload as returned by the GitHub releases API
    release: PathBuf,

    /// Print the updated document instead of writing it
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct RunArgs {
    /// Directory the metadata repository is cloned into
    #[arg(long, default_value = ".")]
    workdir: PathBuf,

    /// Metadata repository as owner/name
    #[arg(long, env = "TARGET_REPO")]
    target_repo: Option<String>,

    /// GitHub token used for API requests
    #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Distance { a, b } => {
            println!("{}", distance(&a, &b));
            Ok(())
        }
        Commands::Bump(args) => run_bump(&config, &args),
        Commands::Check(args) => run_check(config, &args),
        Commands::Watch(args) => run_watch(config, &args),
    }
}

fn load_config(path: Option<&Path>) -> Result<BotConfig> {
    match path {
        Some(path) => BotConfig::from_path(path)
            .ok_or_else(|| anyhow!("failed to load configuration from {}", path.display())),
        None => {
            let cwd = env::current_dir().context("failed to resolve working directory")?;
            Ok(BotConfig::discover(&cwd))
        }
    }
}

fn run_bump(config: &BotConfig, args: &BumpArgs) -> Result<()> {
    let payload = fs::read_to_string(&args.release)
        .with_context(|| format!("failed to read {}", args.release.display()))?;
    let release: Release =
        serde_json::from_str(&payload).context("failed to parse release payload")?;

    let mut pkgbuild = read_pkgbuild(&args.pkgbuild)?;
    let outcome = apply_release(&mut pkgbuild, &release, &BumpOptions::from(config))?;

    log::info!(
        "{} -> {}",
        if outcome.previous_version.is_empty() {
            "(none)"
        } else {
            outcome.previous_version.as_str()
        },
        outcome.version
    );
    for (index, asset) in outcome.report.outcomes.iter().enumerate() {
        if let AssetOutcome::Retargeted { from, to, distance, .. } = asset {
            log::info!("asset {index}: {from} -> {to} (distance {distance})");
        }
    }

    if args.dry_run {
        println!("{}", render_pkgbuild(&pkgbuild)?);
    } else {
        write_pkgbuild(&args.pkgbuild, &pkgbuild)?;
    }
    Ok(())
}

struct Session {
    config: BotConfig,
    client: GitHubClient,
    git: GitCli,
    packages_dir: PathBuf,
}

impl Session {
    fn open(mut config: BotConfig, args: &RunArgs) -> Result<Self> {
        if let Some(target_repo) = &args.target_repo {
            config.target_repo = target_repo.clone();
        }
        let client = GitHubClient::new(&config.api_base, args.token.clone())?;
        let git = GitCli::new(config.checkout_path(&args.workdir), &config.base_branch);
        git.clone_fresh(&config.clone_url(), &config.git_user_name, &config.git_user_email)
            .with_context(|| format!("failed to clone {}", config.target_repo))?;
        let packages_dir = config.packages_path(&args.workdir);
        Ok(Self {
            config,
            client,
            git,
            packages_dir,
        })
    }

    fn load_ignore_list(&self) -> Result<IgnoreList> {
        let list = match &self.config.ignore_list_path {
            Some(path) => IgnoreList::load_from_path(path)?,
            None => IgnoreList::fetch(&self.client, &self.config.ignore_list_url)?,
        };
        log::info!("loaded {} ignored versions", list.len());
        Ok(list)
    }

    fn run_pass(&self, ignore: &IgnoreList) -> Result<()> {
        let options = BumpOptions::from(&self.config);
        Updater::new(&self.client, &self.git, ignore, options)
            .with_push(self.config.push)
            .check_for_updates(&self.packages_dir)?;
        Ok(())
    }
}

fn run_check(config: BotConfig, args: &RunArgs) -> Result<()> {
    let session = Session::open(config, args)?;
    let ignore = session.load_ignore_list()?;
    session.run_pass(&ignore)
}

fn run_watch(config: BotConfig, args: &RunArgs) -> Result<()> {
    let session = Session::open(config, args)?;
    let ignore = session.load_ignore_list()?;
    let interval = Duration::from_secs(session.config.poll_interval_secs);

    loop {
        if let Err(err) = session.git.refresh() {
            log::error!("failed to refresh checkout: {err:#}");
        } else if let Err(err) = session.run_pass(&ignore) {
            log::error!("update pass failed: {err:#}");
        }
        log::info!("sleeping for {}s", interval.as_secs());
        thread::sleep(interval);
    }
}
