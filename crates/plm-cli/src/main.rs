use anyhow::Result;
use clap::{Parser, Subcommand};
use plm_reconcile::{LimitItem, LimitType, DEFAULT_LIMITS_CONF};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "plm")]
#[command(about = "Reconcile PAM resource-limit directives in limits.conf", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add or update one directive
    Set {
        /// Username, @group, wildcard, or uid/gid range
        #[arg(long)]
        domain: String,

        /// soft | hard | -
        #[arg(long = "type")]
        limit_type: LimitType,

        /// core, data, nofile, nproc, ... (see limits.conf(5))
        #[arg(long = "item")]
        limit_item: LimitItem,

        #[arg(long, allow_negative_numbers = true)]
        value: i64,

        /// Keep the smaller of the existing and requested value
        #[arg(long, conflicts_with = "use_max")]
        use_min: bool,

        /// Keep the larger of the existing and requested value
        #[arg(long)]
        use_max: bool,

        /// Trailing comment for the written line (replaces the existing one)
        #[arg(long)]
        comment: Option<String>,

        /// Snapshot the file before rewriting it
        #[arg(long, default_value_t = false)]
        backup: bool,

        #[arg(long, env = "PLM_LIMITS_CONF", default_value = DEFAULT_LIMITS_CONF)]
        dest: PathBuf,

        /// Report what would change without writing
        #[arg(long, default_value_t = false)]
        check: bool,

        /// Print the outcome as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Apply every directive of a layered YAML manifest
    Apply {
        /// Manifest paths in merge order (base -> host -> overrides)
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        #[arg(long, default_value_t = false)]
        check: bool,

        #[arg(long, default_value_t = false)]
        json: bool,

        /// Fail on unknown manifest keys instead of warning
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Compute layered manifest hash + print canonical JSON
    ConfigHash {
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

fn main() -> Result<()> {
    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Set {
            domain,
            limit_type,
            limit_item,
            value,
            use_min,
            use_max,
            comment,
            backup,
            dest,
            check,
            json,
        } => commands::set::run_set(commands::set::SetArgs {
            domain,
            limit_type,
            limit_item,
            value,
            use_min,
            use_max,
            comment,
            backup,
            dest,
            check,
            json,
        })?,

        Commands::Apply {
            config_paths,
            check,
            json,
            strict,
        } => commands::manifest::run_apply(config_paths, check, json, strict)?,

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = plm_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries the result.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
