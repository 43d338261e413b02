//! Tenet CLI (`tnt`)
//!
//! 정책 문서를 검증하고, 단일 작업을 평가하고, 멀티 테넌트 데모를 실행하는 Operator 도구입니다.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tnt_core::privacy::PolicyDocument;
use tnt_core::EngineConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "tnt")]
#[command(author, version, about = "Tenet CLI - operator tool for privacy policies", long_about = None)]
struct Cli {
    /// Policy document (overrides config and TNT_POLICY_PATH)
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a policy document and list its policy sets
    Check,

    /// Evaluate one operation against the policy
    Eval {
        /// Entity type name
        #[arg(long)]
        entity: String,

        /// Operation (create, read, update, delete)
        #[arg(long)]
        op: String,

        /// Viewer role (admin, view)
        #[arg(long)]
        role: Option<String>,

        /// Viewer tenant id
        #[arg(long)]
        tenant: Option<u64>,

        /// Evaluate without a viewer
        #[arg(long, conflicts_with_all = ["role", "tenant"])]
        no_viewer: bool,

        /// Mutation fields (JSON object)
        #[arg(long)]
        fields: Option<String>,

        /// Initial predicate (JSON object, e.g. {"age": {"$gt": 18}})
        #[arg(long = "where")]
        filter: Option<String>,
    },

    /// Run the multi-tenant demo with the built-in policy
    Demo,

    /// Manage CLI config
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set config values (`tnt config set --policy <file>`)
    Set,
    /// Show current config
    Show,
    /// Clear config
    Clear,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // 로깅 초기화
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tnt_core=warn,tnt_store=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // 설정 로드
    let config = CliConfig::load()?;
    let engine_config = EngineConfig::from_env();

    match cli.command {
        Commands::Check => {
            let path = config.policy_path(cli.policy.as_deref(), &engine_config)?;
            commands::check::check(&path, engine_config, cli.format)
        }

        Commands::Eval {
            entity,
            op,
            role,
            tenant,
            no_viewer,
            fields,
            filter,
        } => {
            let path = config.policy_path(cli.policy.as_deref(), &engine_config)?;
            let engine = PolicyDocument::from_path(&path)?.compile(engine_config)?;
            let args = commands::eval::EvalArgs {
                entity,
                op,
                role,
                tenant,
                no_viewer,
                fields,
                filter,
            };
            commands::eval::eval(&engine, args, cli.format)
        }

        Commands::Demo => commands::demo::run(engine_config),

        Commands::Config { action } => match action {
            ConfigAction::Set => commands::config::set(cli.policy),
            ConfigAction::Show => commands::config::show(),
            ConfigAction::Clear => commands::config::clear(),
        },
    }
}
