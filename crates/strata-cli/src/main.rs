use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgMatches, Command};
use strata_core::{init_tracing_with, StrataConfig};
use tracing::debug;

mod scenarios;

use scenarios::Scenario;

fn cli() -> Command {
    let scenario_arg = || {
        Arg::new("scenario")
            .value_name("SCENARIO")
            .help("Scenario to use")
            .value_parser(Scenario::ALL.map(|scenario| scenario.name()))
            .required(true)
            .index(1)
    };

    Command::new("strata")
        .version(strata_core::VERSION)
        .about("Run and inspect Strata object-model scenarios")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("JSON configuration file")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Default log level for strata components")
                .default_value("warn")
                .global(true),
        )
        .subcommand(
            Command::new("run")
                .about("Run a scenario and print each step")
                .arg(scenario_arg()),
        )
        .subcommand(
            Command::new("inspect")
                .about("Print the definitions and final instance of a scenario as JSON")
                .arg(scenario_arg()),
        )
        .subcommand(Command::new("list").about("List bundled scenarios"))
}

fn main() -> Result<()> {
    let matches = cli().get_matches();

    let level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("warn");
    init_tracing_with(&format!("strata_core={level}"))?;

    let config = match matches.get_one::<String>("config") {
        Some(path) => load_config(Path::new(path))?,
        None => StrataConfig::default(),
    };
    debug!(?config, "loaded configuration");

    match matches.subcommand() {
        Some(("run", sub)) => run(&scenario(sub)?, &config),
        Some(("inspect", sub)) => inspect(&scenario(sub)?, &config),
        Some(("list", _)) => {
            for scenario in Scenario::ALL {
                println!("{}", scenario.name());
            }
            Ok(())
        }
        _ => Err(anyhow!("no subcommand given")),
    }
}

fn load_config(path: &Path) -> Result<StrataConfig> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    StrataConfig::from_json(&source)
        .with_context(|| format!("invalid config file {}", path.display()))
}

fn scenario(matches: &ArgMatches) -> Result<Scenario> {
    let name = matches
        .get_one::<String>("scenario")
        .ok_or_else(|| anyhow!("missing scenario name"))?;
    Scenario::from_name(name)
}

fn run(scenario: &Scenario, config: &StrataConfig) -> Result<()> {
    let run = scenario.run(config)?;
    println!("Scenario: {}", scenario.name());
    for step in &run.steps {
        println!("  {} => {}", step.action, step.result);
    }
    Ok(())
}

fn inspect(scenario: &Scenario, config: &StrataConfig) -> Result<()> {
    let run = scenario.run(config)?;
    println!("{}", serde_json::to_string_pretty(&run.inspect())?);
    Ok(())
}
