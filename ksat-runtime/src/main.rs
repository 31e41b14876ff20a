use anyhow::{anyhow, Result};
use clap::{arg, ArgAction, Command};
use ksat_algorithms::satisfiability::{Algorithm, SearchOutcome};
use ksat_challenges::satisfiability::{Difficulty, Formula};
use serde::Serialize;
use serde_json::{Map, Value};
use statrs::statistics::Statistics;
use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
    thread,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("ksat-runtime")
        .about("Generates random k-SAT formulas and runs local search on them")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("generate")
                .about("Generates a uniform random k-SAT formula")
                .arg(
                    arg!(--k <K> "Clause size (k)")
                        .allow_negative_numbers(true)
                        .value_parser(clap::value_parser!(i64)),
                )
                .arg(
                    arg!(--n <N> "Number of variables")
                        .allow_negative_numbers(true)
                        .value_parser(clap::value_parser!(i64)),
                )
                .arg(
                    arg!(--m <M> "Number of clauses")
                        .allow_negative_numbers(true)
                        .value_parser(clap::value_parser!(i64)),
                )
                .arg(
                    arg!(--seed [SEED] "Optional random seed for reproducibility")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--json [JSON] "Print the formula as json instead of text")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("solve")
                .about("Runs one search algorithm on a formula")
                .arg(
                    arg!(<FORMULA> "Formula text like '[1,-2,3] [-1,2,4]', or path to a json file")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--n [N] "Number of variables (required for formula text)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--algo [ALGO] "One of hc, beam, beam<width>, vnd")
                        .default_value("hc")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--seed [SEED] "Optional random seed for reproducibility")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--hyperparameters [HYPERPARAMETERS] "Hyperparameters json string or path to json file")
                        .value_parser(clap::value_parser!(String)),
                ),
        )
        .subcommand(
            Command::new("experiment")
                .about("Compares algorithms over freshly generated formulas")
                .arg(
                    arg!(--k [K] "Clause size (k)")
                        .default_value("3")
                        .allow_negative_numbers(true)
                        .value_parser(clap::value_parser!(i64)),
                )
                .arg(
                    arg!(--n <N> "Number of variables")
                        .allow_negative_numbers(true)
                        .value_parser(clap::value_parser!(i64)),
                )
                .arg(
                    arg!(--m <M> "Number of clauses")
                        .allow_negative_numbers(true)
                        .value_parser(clap::value_parser!(i64)),
                )
                .arg(
                    arg!(--trials [TRIALS] "Number of trials")
                        .default_value("30")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--algos [ALGOS] "Comma-separated algorithms: hc, beam3, beam4, vnd")
                        .default_value("hc,beam3,beam4,vnd")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--seed [SEED] "Base seed; trial t uses seed + t")
                        .default_value("0")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--hyperparameters [HYPERPARAMETERS] "Json object keyed by algorithm name, inline or path to json file")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--workers [WORKERS] "Number of worker threads")
                        .default_value("1")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--output [OUTPUT_FILE] "If set, records are written to this file instead of stdout")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}

fn enable_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

fn main() {
    enable_tracing();
    let matches = cli().get_matches();

    if let Err(e) = match matches.subcommand() {
        Some(("generate", sub_m)) => generate(
            *sub_m.get_one::<i64>("k").unwrap(),
            *sub_m.get_one::<i64>("n").unwrap(),
            *sub_m.get_one::<i64>("m").unwrap(),
            sub_m.get_one::<u64>("seed").copied(),
            *sub_m.get_one::<bool>("json").unwrap(),
        ),
        Some(("solve", sub_m)) => solve(
            sub_m.get_one::<String>("FORMULA").unwrap(),
            sub_m.get_one::<usize>("n").copied(),
            sub_m.get_one::<String>("algo").unwrap(),
            sub_m.get_one::<u64>("seed").copied(),
            sub_m.get_one::<String>("hyperparameters").map(String::as_str),
        ),
        Some(("experiment", sub_m)) => experiment(ExperimentSettings {
            k: *sub_m.get_one::<i64>("k").unwrap(),
            n: *sub_m.get_one::<i64>("n").unwrap(),
            m: *sub_m.get_one::<i64>("m").unwrap(),
            trials: *sub_m.get_one::<usize>("trials").unwrap(),
            algos: sub_m.get_one::<String>("algos").unwrap().clone(),
            seed: *sub_m.get_one::<u64>("seed").unwrap(),
            hyperparameters: sub_m.get_one::<String>("hyperparameters").cloned(),
            workers: *sub_m.get_one::<usize>("workers").unwrap(),
            output: sub_m.get_one::<PathBuf>("output").cloned(),
        }),
        _ => Err(anyhow!("Invalid subcommand")),
    } {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

pub fn generate(k: i64, n: i64, m: i64, seed: Option<u64>, json: bool) -> Result<()> {
    let difficulty = Difficulty::try_from(vec![k, n, m])?;
    let seed = seed.unwrap_or_else(rand::random);
    let formula = Formula::generate_instance(seed, &difficulty)?;
    debug!(seed, k, n, m, "formula generated");

    if json {
        println!("{}", serde_json::to_string(&formula)?);
    } else {
        println!("\nGenerated k-SAT Formula:");
        println!("{}", formula);
    }
    Ok(())
}

#[derive(Serialize)]
struct SolveOutput<'a> {
    algo: &'a str,
    seed: u64,
    penetrance: f64,
    #[serde(flatten)]
    outcome: SearchOutcome,
}

pub fn solve(
    formula: &str,
    num_variables: Option<usize>,
    algo: &str,
    seed: Option<u64>,
    hyperparameters: Option<&str>,
) -> Result<()> {
    let formula = load_formula(formula, num_variables)?;
    let algorithm = algo.parse::<Algorithm>()?;
    let hyperparameters = hyperparameters.map(load_json_object).transpose()?;
    let seed = seed.unwrap_or_else(rand::random);

    let outcome = algorithm.solve(&formula, seed, &hyperparameters)?;
    let output = SolveOutput {
        algo,
        seed,
        penetrance: penetrance(outcome.score, formula.num_clauses()),
        outcome,
    };
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

pub struct ExperimentSettings {
    pub k: i64,
    pub n: i64,
    pub m: i64,
    pub trials: usize,
    pub algos: String,
    pub seed: u64,
    pub hyperparameters: Option<String>,
    pub workers: usize,
    pub output: Option<PathBuf>,
}

#[derive(Serialize, Debug, Clone)]
pub struct Record {
    pub trial: usize,
    pub n: usize,
    pub m: usize,
    pub algo: String,
    pub score: usize,
    pub penetrance: f64,
    pub time_seconds: f64,
    pub iterations: u64,
}

pub fn experiment(settings: ExperimentSettings) -> Result<()> {
    let difficulty = Difficulty::try_from(vec![settings.k, settings.n, settings.m])?;
    let algos = settings
        .algos
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| -> Result<(String, Algorithm)> {
            Ok((name.to_string(), name.parse::<Algorithm>()?))
        })
        .collect::<Result<Vec<_>>>()?;
    if algos.is_empty() {
        return Err(anyhow!("No algorithms selected"));
    }
    let hyperparameters = match &settings.hyperparameters {
        Some(h) => load_json_object(h)?,
        None => Map::new(),
    };
    let workers = settings.workers.clamp(1, settings.trials.max(1));

    let mut records = thread::scope(|scope| {
        let handles = (0..workers)
            .map(|worker| {
                let (algos, hyperparameters) = (&algos, &hyperparameters);
                scope.spawn(move || {
                    (worker..settings.trials)
                        .step_by(workers)
                        .map(|trial| {
                            run_trial(
                                trial,
                                &difficulty,
                                settings.seed.wrapping_add(trial as u64),
                                algos,
                                hyperparameters,
                            )
                        })
                        .collect::<Result<Vec<_>>>()
                })
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(_) => Err(anyhow!("Experiment worker panicked")),
            })
            .collect::<Result<Vec<_>>>()
    })?
    .into_iter()
    .flatten()
    .flatten()
    .collect::<Vec<Record>>();
    // Records of one trial are already in algorithm order.
    records.sort_by_key(|record| record.trial);

    let mut out: Box<dyn Write> = match &settings.output {
        Some(path) => Box::new(io::BufWriter::new(fs::File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    for record in &records {
        writeln!(out, "{}", serde_json::to_string(record)?)?;
    }
    out.flush()?;
    if let Some(path) = &settings.output {
        eprintln!("Results saved to {}", path.display());
    }

    print_summary(&records, &algos);
    Ok(())
}

fn run_trial(
    trial: usize,
    difficulty: &Difficulty,
    seed: u64,
    algos: &[(String, Algorithm)],
    hyperparameters: &Map<String, Value>,
) -> Result<Vec<Record>> {
    let formula = Formula::generate_instance(seed, difficulty)?;
    algos
        .iter()
        .map(|(name, algorithm)| -> Result<Record> {
            let params = hyperparameters
                .get(name)
                .and_then(Value::as_object)
                .cloned();
            let outcome = algorithm.solve(&formula, seed, &params)?;
            info!(trial, algo = %name, score = outcome.score, "trial finished");
            Ok(Record {
                trial,
                n: formula.num_variables(),
                m: formula.num_clauses(),
                algo: name.clone(),
                score: outcome.score,
                penetrance: penetrance(outcome.score, formula.num_clauses()),
                time_seconds: outcome.stats.time_seconds,
                iterations: outcome.stats.iterations,
            })
        })
        .collect()
}

fn print_summary(records: &[Record], algos: &[(String, Algorithm)]) {
    eprintln!("Average Scores (Penetrance) per Algorithm:");
    for (name, _) in algos {
        let values = select(records, name, |r| r.penetrance);
        eprintln!(
            "{}: {:.6} (std dev {:.6})",
            name,
            values.iter().mean(),
            values.iter().std_dev()
        );
    }
    eprintln!("\nAverage Times (Seconds) per Algorithm:");
    for (name, _) in algos {
        let values = select(records, name, |r| r.time_seconds);
        eprintln!(
            "{}: {:.6} (std dev {:.6})",
            name,
            values.iter().mean(),
            values.iter().std_dev()
        );
    }
}

fn select(records: &[Record], algo: &str, field: impl Fn(&Record) -> f64) -> Vec<f64> {
    records
        .iter()
        .filter(|r| r.algo == algo)
        .map(field)
        .collect()
}

/// Fraction of satisfied clauses; a formula without clauses counts as fully satisfied.
fn penetrance(score: usize, num_clauses: usize) -> f64 {
    if num_clauses == 0 {
        1.0
    } else {
        score as f64 / num_clauses as f64
    }
}

fn load_formula(formula: &str, num_variables: Option<usize>) -> Result<Formula> {
    if formula.ends_with(".json") {
        let json = fs::read_to_string(formula)
            .map_err(|e| anyhow!("Failed to read formula file {}: {}", formula, e))?;
        return Ok(serde_json::from_str::<Formula>(&json)?);
    }
    let num_variables =
        num_variables.ok_or_else(|| anyhow!("--n is required when the formula is given as text"))?;
    Ok(Formula::parse(num_variables, formula)?)
}

fn load_json_object(value: &str) -> Result<Map<String, Value>> {
    let json = if value.ends_with(".json") {
        fs::read_to_string(value)
            .map_err(|e| anyhow!("Failed to read hyperparameters file {}: {}", value, e))?
    } else {
        value.to_string()
    };
    match serde_json::from_str::<Value>(&json)? {
        Value::Object(map) => Ok(map),
        _ => Err(anyhow!("Hyperparameters must be a json object")),
    }
}
