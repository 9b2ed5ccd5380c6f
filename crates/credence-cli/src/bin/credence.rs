//! Credence CLI - query a discrete Bayesian network from the console
//!
//! Usage:
//!   credence                                  # Interactive credit-worthiness console
//!   credence --evidence "0,1,,2"              # One-shot query
//!   credence --network net.json --query Q     # Query a network loaded from JSON
//!   credence --evidence "0,1" -o json         # Output the posterior as JSON

use std::io::{self, BufRead, IsTerminal, Write};
use std::process;

use clap::{Parser, ValueEnum};
use credence_core::models::credit_net::{credit_net, CREDIT_WORTHINESS, WORTHY};
use credence_core::{
    BayesNet, BeliefQuery, EliminationConfig, EliminationOrder, Evidence, InferenceError,
    NetworkDef, VariableId,
};
use serde_json::json;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "credence")]
#[command(version)]
#[command(about = "Credence - exact Bayesian network queries")]
#[command(
    long_about = "Compute P(query = outcome | evidence) by variable elimination. Evidence is a line of \
comma-separated optional integers, one per non-query variable in declaration order; \
an empty field leaves the variable unobserved."
)]
struct Cli {
    /// JSON network definition (defaults to the built-in credit network)
    #[arg(short, long, value_name = "FILE")]
    network: Option<String>,

    /// Query variable
    #[arg(short, long, default_value = CREDIT_WORTHINESS, value_name = "NAME")]
    query: String,

    /// Outcome index of the query variable to report
    #[arg(long, default_value_t = WORTHY, value_name = "INDEX")]
    outcome: usize,

    /// Elimination order heuristic
    #[arg(long, value_enum, default_value_t = OrderArg::ReverseTopological)]
    order: OrderArg,

    /// Evaluate a single evidence line and exit
    #[arg(short, long, value_name = "LINE", allow_hyphen_values = true)]
    evidence: Option<String>,

    /// Output format: summary or json
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Summary)]
    output: OutputFormat,

    /// List the network's variables and exit
    #[arg(short, long)]
    list_variables: bool,

    /// Log engine diagnostics to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderArg {
    ReverseTopological,
    MinWeight,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Summary,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let network = match load_network(cli.network.as_deref()) {
        Ok(network) => network,
        Err(e) => {
            eprintln!("Error loading network: {}", e);
            process::exit(1);
        }
    };

    if cli.list_variables {
        print_variables(&network);
        return;
    }

    let order = match cli.order {
        OrderArg::ReverseTopological => EliminationOrder::ReverseTopological,
        OrderArg::MinWeight => EliminationOrder::MinWeight,
    };
    let query = match BeliefQuery::new(&network, &cli.query)
        .and_then(|q| q.with_config(EliminationConfig::with_order(order)))
    {
        Ok(query) => query,
        Err(e) => {
            eprintln!("Error preparing query: {}", e);
            process::exit(1);
        }
    };
    let observables = observable_variables(&network, query.target());

    if let Some(line) = &cli.evidence {
        match evaluate_line(&query, &observables, line, cli.outcome) {
            Ok(answer) => print_answer(&network, &answer, cli.output),
            Err(e) => {
                eprintln!("Wrong set of parameters! {}", e);
                process::exit(1);
            }
        }
        return;
    }

    if let Err(e) = run_console(&network, &query, &observables, &cli) {
        eprintln!("Console error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_network(path: Option<&str>) -> Result<BayesNet, String> {
    let Some(path) = path else {
        return credit_net().map_err(|e| e.to_string());
    };
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read '{}': {}", path, e))?;
    let definition: NetworkDef =
        serde_json::from_str(&source).map_err(|e| format!("invalid JSON in '{}': {}", path, e))?;
    let network = definition.build().map_err(|e| e.to_string())?;
    tracing::info!(path, variables = network.len(), "loaded network definition");
    Ok(network)
}

/// Every variable except the query, in declaration order.
fn observable_variables(network: &BayesNet, target: VariableId) -> Vec<VariableId> {
    network
        .variables()
        .iter()
        .map(|v| v.id())
        .filter(|id| *id != target)
        .collect()
}

struct Answer {
    query: String,
    outcome: usize,
    probability: f64,
    posterior: credence_core::PosteriorMarginal,
}

#[derive(Debug, Error)]
enum LineError {
    #[error("{0}")]
    Parse(String),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

fn evaluate_line(
    query: &BeliefQuery<'_>,
    observables: &[VariableId],
    line: &str,
    outcome: usize,
) -> Result<Answer, LineError> {
    let readings = parse_readings(line, observables.len())?;
    let mut evidence = Evidence::new();
    for (&id, reading) in observables.iter().zip(&readings) {
        if let Some(value) = reading {
            evidence.observe(query.network(), id, *value)?;
        }
    }

    let target = query.network().resolve(query.target())?;
    target.check_outcome(outcome)?;
    let posterior = query.posterior(&evidence)?;
    Ok(Answer {
        query: target.name().to_string(),
        outcome,
        probability: posterior.probability(outcome)?,
        posterior,
    })
}

/// Parses `"0,1,,2"` into `[Some(0), Some(1), None, Some(2)]`.
///
/// Missing trailing fields are unobserved; more than `expected` fields is an
/// error. Short lines are accepted deliberately.
fn parse_readings(line: &str, expected: usize) -> Result<Vec<Option<usize>>, LineError> {
    let fields: Vec<&str> = line.trim().split(',').collect();
    if fields.len() > expected {
        return Err(LineError::Parse(format!(
            "expected at most {} values, got {}",
            expected,
            fields.len()
        )));
    }
    fields
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let field = field.trim();
            if field.is_empty() {
                Ok(None)
            } else {
                field.parse::<usize>().map(Some).map_err(|_| {
                    LineError::Parse(format!("value {} ('{}') is not an outcome index", idx + 1, field))
                })
            }
        })
        .collect()
}

fn run_console(
    network: &BayesNet,
    query: &BeliefQuery<'_>,
    observables: &[VariableId],
    cli: &Cli,
) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();
    let color = stdout.is_terminal();

    loop {
        print_prompt(&mut stdout, network, observables)?;
        let Some(line) = lines.next().transpose()? else {
            return Ok(());
        };
        writeln!(stdout)?;
        if line.trim().is_empty() {
            return Ok(());
        }

        match evaluate_line(query, observables, &line, cli.outcome) {
            Ok(answer) if cli.output == OutputFormat::Summary && color => {
                println!("{}", paint(GREEN, &summary_line(&answer)));
            }
            Ok(answer) => print_answer(network, &answer, cli.output),
            Err(e) => {
                tracing::debug!(error = %e, "rejected evidence line");
                let message = format!("Wrong set of parameters! {}", e);
                if color {
                    println!("{}", paint(RED, &message));
                } else {
                    println!("{}", message);
                }
            }
        }
        writeln!(stdout)?;
    }
}

fn print_prompt(
    out: &mut impl Write,
    network: &BayesNet,
    observables: &[VariableId],
) -> io::Result<()> {
    let described: Vec<String> = observables
        .iter()
        .filter_map(|id| network.variable(*id))
        .map(|v| {
            let labels: Vec<String> = (0..v.cardinality())
                .map(|i| match v.outcome_label(i) {
                    Some(label) => format!("{}={}", i, label),
                    None => i.to_string(),
                })
                .collect();
            format!("{} ({})", v.name(), labels.join(", "))
        })
        .collect();
    writeln!(out, "Enter parameters (skip = only comma):")?;
    for line in described.chunks(3) {
        writeln!(out, "  {}", line.join(", "))?;
    }
    writeln!(
        out,
        "(separated by comma in a single line and press Enter or simply press Enter to exit)"
    )?;
    writeln!(out)?;
    out.flush()
}

fn print_answer(network: &BayesNet, answer: &Answer, format: OutputFormat) {
    match format {
        OutputFormat::Summary => println!("{}", summary_line(answer)),
        OutputFormat::Json => {
            let label = network
                .variable(answer.posterior.variable())
                .and_then(|v| v.outcome_label(answer.outcome));
            let body = json!({
                "query": answer.query,
                "outcome": answer.outcome,
                "label": label,
                "probability": answer.probability,
                "posterior": answer.posterior,
            });
            match serde_json::to_string_pretty(&body) {
                Ok(text) => println!("{}", text),
                Err(e) => eprintln!("Error serializing to JSON: {}", e),
            }
        }
    }
}

const RED: &str = "31";
const GREEN: &str = "32";

fn paint(code: &str, text: &str) -> String {
    format!("\x1b[{}m{}\x1b[0m", code, text)
}

fn summary_line(answer: &Answer) -> String {
    format!(
        "P({} | parameter values) = {:.4}",
        display_name(&answer.query),
        answer.probability
    )
}

/// `CreditWorthiness` -> `credit-worthiness`
fn display_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (idx, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if idx > 0 {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn print_variables(network: &BayesNet) {
    println!("Variables ({}):", network.len());
    for variable in network.variables() {
        println!("  {}", describe_variable(network, variable.id()));
    }
}

/// `Name [cardinality] <- parents -> children`
fn describe_variable(network: &BayesNet, id: VariableId) -> String {
    fn names<'n>(network: &'n BayesNet, ids: &[VariableId]) -> Vec<&'n str> {
        ids.iter()
            .filter_map(|id| network.variable(*id))
            .map(|v| v.name())
            .collect()
    }
    let Some(variable) = network.variable(id) else {
        return format!("{:?}", id);
    };
    let mut line = format!("{} [{}]", variable.name(), variable.cardinality());
    let parents = names(network, variable.parents());
    if !parents.is_empty() {
        line.push_str(&format!(" <- {}", parents.join(", ")));
    }
    let children = names(network, network.children(id));
    if !children.is_empty() {
        line.push_str(&format!(" -> {}", children.join(", ")));
    }
    line
}
