//! warden CLI - access gatekeeper tooling
//!
//! # Configuration
//!
//! Configuration is loaded from multiple sources with priority:
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`WARDEN_*`)
//! 3. Project config (`.warden/config.toml` in the project directory)
//! 4. Global config (`~/.warden/config.toml`)
//! 5. Default values (lowest priority)
//!
//! # Commands
//!
//! - `warden validate [ROLES]`: build a permission index and report counts
//! - `warden check ...`: evaluate one call (optionally repeated) and print
//!   each decision as JSON on stdout
//! - `warden config`: print the merged configuration as TOML
//!
//! Logs go to stderr so stdout stays machine readable.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use warden_auth::{PermissionIndex, PermissionSource};
use warden_runtime::config::{ConfigLoader, WardenConfig};
use warden_runtime::ratelimit::SystemClock;
use warden_runtime::{Gatekeeper, Route};
use warden_types::{CompanyId, Identity, ResourceOwner, TeamId, UserId};

/// warden CLI - access gatekeeper tooling
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root directory (defaults to current directory)
    #[arg(short = 'C', long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a permission index from a role/grant source and report it
    Validate {
        /// Role/grant TOML source (defaults to `permissions.source`)
        roles: Option<PathBuf>,
    },
    /// Evaluate a call against the gatekeeper
    Check(CheckArgs),
    /// Print the merged configuration
    Config,
}

#[derive(ClapArgs, Debug)]
struct CheckArgs {
    /// Role/grant TOML source (defaults to `permissions.source`)
    #[arg(long)]
    roles: Option<PathBuf>,

    /// Acting user id
    #[arg(long)]
    user: UserId,

    /// Acting user's company id
    #[arg(long)]
    company: CompanyId,

    /// Team membership (repeatable)
    #[arg(long = "team")]
    teams: Vec<TeamId>,

    /// Assigned role (repeatable)
    #[arg(long = "role")]
    role_ids: Vec<String>,

    /// Directly assigned grant (repeatable)
    #[arg(long = "grant")]
    grant_ids: Vec<String>,

    /// Rate limit route group
    #[arg(long)]
    group: String,

    /// Resource kind
    #[arg(long)]
    resource: String,

    /// Action on the resource
    #[arg(long)]
    action: String,

    /// Owning user of the target resource
    #[arg(long)]
    owner_user: Option<UserId>,

    /// Owning team of the target resource
    #[arg(long)]
    owner_team: Option<TeamId>,

    /// Owning company of the target resource
    #[arg(long)]
    owner_company: Option<CompanyId>,

    /// Number of evaluations to run
    #[arg(long, default_value_t = 1)]
    repeat: u32,
}

impl CheckArgs {
    fn identity(&self) -> Identity {
        let mut identity = Identity::new(self.user, self.company);
        for team in &self.teams {
            identity = identity.with_team(*team);
        }
        for role in &self.role_ids {
            identity = identity.with_role(role.as_str());
        }
        for grant in &self.grant_ids {
            identity = identity.with_grant(grant.as_str());
        }
        identity
    }

    /// `None` unless at least one owner field is set.
    fn owner(&self) -> Option<ResourceOwner> {
        let any = self.owner_user.is_some()
            || self.owner_team.is_some()
            || self.owner_company.is_some();
        any.then(|| ResourceOwner::new(self.owner_user, self.owner_team, self.owner_company))
    }

    fn route(&self) -> Route {
        Route::new(&self.group, &self.resource, &self.action)
    }
}

/// Merges file/env config via [`ConfigLoader`] and applies CLI overrides.
fn resolve_config(args: &Args) -> Result<WardenConfig> {
    let project_root = match &args.project {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("failed to get current directory")?,
    };

    let mut config = ConfigLoader::new()
        .with_project_root(&project_root)
        .load()
        .context("config error")?;

    if args.debug {
        config.debug = true;
    }
    Ok(config)
}

fn init_tracing(debug: bool, verbose: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .init();
}

fn validate(config: &WardenConfig, roles: Option<PathBuf>) -> Result<()> {
    let path = roles
        .or_else(|| config.permissions.source.clone())
        .context("no role source given and `permissions.source` is not configured")?;

    let source = PermissionSource::from_file(&path)?;
    let index = PermissionIndex::build(&source)
        .with_context(|| format!("invalid role source '{}'", path.display()))?;
    let snapshot = index.snapshot();

    println!(
        "{}: {} role(s), {} grant(s)",
        path.display(),
        snapshot.role_count(),
        snapshot.grant_count()
    );
    Ok(())
}

fn check(mut config: WardenConfig, args: &CheckArgs) -> Result<()> {
    if let Some(roles) = &args.roles {
        config.permissions.source = Some(roles.clone());
    }

    let gatekeeper = Gatekeeper::from_config(&config, Arc::new(SystemClock::new()))?;
    let identity = args.identity();
    let owner = args.owner();
    let route = args.route();

    for _ in 0..args.repeat {
        let decision = gatekeeper.evaluate(&identity, &route, owner.as_ref());
        println!("{}", serde_json::to_string(&decision)?);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = resolve_config(&args)?;

    init_tracing(config.debug, args.verbose);
    info!(version = env!("CARGO_PKG_VERSION"), "warden starting");

    match args.command {
        Command::Validate { roles } => validate(&config, roles),
        Command::Check(ref check_args) => check(config, check_args),
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
