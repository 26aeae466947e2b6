//! `capflow` command line: simulate, demo, check-config

use anyhow::Context;
use capflow_core::CaptureConfig;
use capflow_model::ArtifactKind;
use capflow_sim::{run_demo, run_simulator, SimulatorConfig};
use clap::{value_parser, Arg, ArgAction, Command};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("capflow")
        .version(capflow_sim::VERSION)
        .about("Guided capture workflow engine")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .help("Capture configuration file (TOML)"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run the workflow simulator")
                .arg(
                    Arg::new("operations")
                        .long("ops")
                        .default_value("10000")
                        .value_parser(value_parser!(u64))
                        .help("Number of operations to simulate"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("workflows")
                        .long("workflows")
                        .default_value("8")
                        .value_parser(value_parser!(usize))
                        .help("Workflows alive at once"),
                )
                .arg(
                    Arg::new("keep-going")
                        .long("keep-going")
                        .action(ArgAction::SetTrue)
                        .help("Continue after the first violation"),
                ),
        )
        .subcommand(
            Command::new("demo")
                .about("Walk one artifact from start to hand-off")
                .arg(
                    Arg::new("kind")
                        .long("kind")
                        .default_value("audit")
                        .help("audit, guide, bda or map"),
                )
                .arg(
                    Arg::new("role")
                        .long("role")
                        .default_value("technician")
                        .help("Role of the signed-in user"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("check-config")
                .about("Validate a capture configuration file")
                .arg(
                    Arg::new("path")
                        .long("path")
                        .required(true)
                        .help("Path to the TOML file"),
                ),
        )
}

fn load_config(path: Option<&String>) -> anyhow::Result<CaptureConfig> {
    match path {
        Some(p) => CaptureConfig::load(p).with_context(|| format!("loading {p}")),
        None => Ok(CaptureConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    let config = load_config(matches.get_one::<String>("config"))?;

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let operations = args.get_one::<u64>("operations").copied().unwrap_or(10_000);
            let seed = args.get_one::<u64>("seed").copied().unwrap_or(42);
            let workflows = args.get_one::<usize>("workflows").copied().unwrap_or(8);

            println!("Running capflow simulator...");
            println!("Operations: {operations}");
            println!("Seed: {seed}");
            println!();

            let report = run_simulator(SimulatorConfig {
                seed,
                total_operations: operations,
                max_concurrent_workflows: workflows,
                capture: config,
                stop_on_first_violation: !args.get_flag("keep-going"),
                ..Default::default()
            });
            println!("{}", report.generate_text());

            if !report.passed() {
                std::process::exit(1);
            }
        }
        Some(("demo", args)) => {
            let kind: ArtifactKind = args
                .get_one::<String>("kind")
                .map_or("audit", String::as_str)
                .parse()?;
            let role = args
                .get_one::<String>("role")
                .map_or("technician", String::as_str);

            let report = run_demo(kind, role, config).await?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render_text());
            }
        }
        Some(("check-config", args)) => {
            let path = args
                .get_one::<String>("path")
                .context("--path is required")?;
            let checked = CaptureConfig::load(path).with_context(|| format!("loading {path}"))?;
            println!("{path}: OK");
            print!("{}", toml::to_string(&checked)?);
        }
        _ => {
            cli().print_help()?;
        }
    }
    Ok(())
}
