use clap::{Parser, Subcommand};
use devcamper::api::error_response;
use devcamper::cli::{self as prog_cli, Command};
use devcamper::config::AppConfig;
use devcamper::resources::Service;
use devcamper::store::Engine;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "devcamper", version, about = "Resource query and aggregate engine CLI", long_about = None)]
struct Cli {
    #[arg(long, help = "Path to a config file (TOML). Takes precedence over other config files.")]
    config: Option<PathBuf>,
    #[arg(long, help = "Log level override: error|warn|info|debug|trace")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "List a resource; prints the paginated JSON envelope")]
    Query {
        #[arg(help = "Resource name (bootcamps, courses, reviews, users)")]
        resource: String,
        #[arg(help = "Query parameters as key=value, e.g. averageCost[lte]=10000 sort=-name")]
        params: Vec<String>,
        #[arg(long, help = "JSON fixture file to load before querying")]
        seed: Option<PathBuf>,
    },
    #[command(about = "Load a JSON fixture file keyed by resource name")]
    Seed {
        #[arg(help = "Path to the fixture file")]
        file: PathBuf,
    },
    #[command(about = "Print the aggregate dependency table")]
    Dependencies,
}

fn build_service(cfg: &AppConfig) -> Result<Service, devcamper::ApiError> {
    let table = cfg.dependency_table()?;
    Ok(Service::new(
        Engine::new(),
        devcamper::resources::ResourceRegistry::standard(),
        Arc::new(table),
        cfg.service_options(),
    ))
}

fn main() {
    let cli = Cli::parse();
    let mut cfg = match AppConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    // CLI flags sit above env and files
    if let Some(level) = cli.log_level {
        cfg.log.level = level;
    }
    if let Err(e) = devcamper::logger::init_from_config(&cfg.log) {
        eprintln!("{e}");
    }
    let service = match build_service(&cfg) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    let cmd = match cli.command {
        Commands::Query { resource, params, seed } => match prog_cli::parse_params(&params) {
            Ok(params) => Command::Query { resource, params, seed },
            Err(e) => {
                eprintln!("{}", error_response(&e).body);
                std::process::exit(1);
            }
        },
        Commands::Seed { file } => Command::Seed { file },
        Commands::Dependencies => Command::Dependencies,
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = prog_cli::run(&service, cmd, &mut out) {
        eprintln!("{}", error_response(&e).body);
        std::process::exit(1);
    }
}
