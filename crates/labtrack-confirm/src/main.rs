use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use labtrack_confirm::{
    ConfirmConfig, ConfirmEngine, ConfirmError, ConfirmStrategy, PlannedStrategy, Problem,
    SectionStrategy,
};
use labtrack_model::ConfirmationRequest;
use labtrack_store::{MemoryStore, TransactionalStore, UserRepo};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn inputs(command: Command) -> Command {
    command
        .arg(
            Arg::new("store")
                .long("store")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Store snapshot JSON"),
        )
        .arg(
            Arg::new("request")
                .long("request")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Confirmation request JSON"),
        )
        .arg(
            Arg::new("strategy")
                .long("strategy")
                .default_value("section")
                .value_parser(["section", "planned"])
                .help("Confirmation strategy"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("Confirmation config TOML"),
        )
}

fn cli() -> Command {
    Command::new("labtrack")
        .version(labtrack_confirm::VERSION)
        .about("Confirm planned labware operations against a store snapshot")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            inputs(Command::new("confirm").about("Validate and apply a confirmation request"))
                .arg(
                    Arg::new("user")
                        .long("user")
                        .required(true)
                        .help("Requesting username"),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write the committed store snapshot here"),
                ),
        )
        .subcommand(inputs(
            Command::new("check").about("Validate a confirmation request without applying it"),
        ))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let outcome = match matches.subcommand() {
        Some((name, args)) => dispatch(name, args),
        None => Ok(ExitCode::FAILURE),
    };
    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn dispatch(name: &str, args: &ArgMatches) -> Result<ExitCode> {
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => ConfirmConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ConfirmConfig::default(),
    };
    let strategy = args
        .get_one::<String>("strategy")
        .map_or("section", String::as_str);
    match strategy {
        "planned" => run(name, args, ConfirmEngine::new(PlannedStrategy).with_config(config)),
        _ => run(name, args, ConfirmEngine::new(SectionStrategy).with_config(config)),
    }
}

fn run<S: ConfirmStrategy>(
    name: &str,
    args: &ArgMatches,
    engine: ConfirmEngine<S>,
) -> Result<ExitCode> {
    let store_path = args
        .get_one::<PathBuf>("store")
        .context("missing --store")?;
    let request_path = args
        .get_one::<PathBuf>("request")
        .context("missing --request")?;

    let store = MemoryStore::load(store_path)
        .with_context(|| format!("loading store {}", store_path.display()))?;
    let text = std::fs::read_to_string(request_path)
        .with_context(|| format!("reading request {}", request_path.display()))?;
    let request: ConfirmationRequest =
        serde_json::from_str(&text).context("parsing confirmation request")?;

    if name == "check" {
        let problems = engine.check(&store, &request)?;
        if problems.is_empty() {
            println!("OK: {} labware would be confirmed", request.labware.len());
            return Ok(ExitCode::SUCCESS);
        }
        print_problems(&problems);
        return Ok(ExitCode::FAILURE);
    }

    let username = args
        .get_one::<String>("user")
        .context("missing --user")?;
    let user = store
        .transaction(|tx| tx.find_user(username))?
        .with_context(|| format!("unknown user {username}"))?;

    match engine.confirm(&store, &user, &request) {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            if let Some(out) = args.get_one::<PathBuf>("out") {
                store
                    .snapshot()?
                    .write(out)
                    .with_context(|| format!("writing snapshot {}", out.display()))?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(ConfirmError::Validation(problems)) => {
            print_problems(&problems);
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err.into()),
    }
}

fn print_problems(problems: &[Problem]) {
    eprintln!("{} problem(s) found:", problems.len());
    for problem in problems {
        eprintln!("  - {problem}");
    }
}
