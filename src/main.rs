use std::time::Duration;

use clap::{arg, command, value_parser, Arg, ArgAction, ArgMatches};
use combcheck::circuits::{self, CIRCUITS};
use combir::design::{Design, DesignError};
use combir::elab::{ElabConfig, ElabError, Elaborator, NetlistElaborator, PriorityRule};
use combir::formal::{CheckResult, Degradation, FormalConfig, FormalEngine, FormalError, Verdict};
use combir::netlist::{InputAssignment, NetDriver, Netlist, SimError};
use log::info;
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
enum CliError {
	#[error(transparent)]
	#[diagnostic(code(combcheck::design))]
	Design(#[from] DesignError),

	#[error(transparent)]
	#[diagnostic(code(combcheck::elab))]
	Elab(#[from] ElabError),

	#[error(transparent)]
	#[diagnostic(code(combcheck::simulate), help("every input needs a value: --set NAME=VALUE"))]
	Sim(#[from] SimError),

	#[error(transparent)]
	#[diagnostic(code(combcheck::formal))]
	Formal(#[from] FormalError),

	#[error(transparent)]
	#[diagnostic(code(combcheck::json))]
	Json(#[from] serde_json::Error),

	#[error("Invalid input assignment '{0}'")]
	#[diagnostic(code(combcheck::cli), help("expected NAME=VALUE with an unsigned VALUE"))]
	InvalidAssignment(String),

	#[error("Unknown circuit '{0}'")]
	#[diagnostic(code(combcheck::cli))]
	UnknownCircuit(String),

	#[error("{0} obligation(s) failed")]
	#[diagnostic(code(combcheck::check))]
	ObligationsFailed(usize),
}

#[derive(Serialize)]
struct WitnessValue<'a> {
	input: &'a str,
	value: u64,
}

#[derive(Serialize)]
struct CheckRecord<'a> {
	name: &'a str,
	kind: String,
	verdict: &'static str,
	detail: Option<String>,
	index: Option<u64>,
	witness: Option<Vec<WitnessValue<'a>>>,
}

impl<'a> From<&'a CheckResult> for CheckRecord<'a> {
	fn from(result: &'a CheckResult) -> Self {
		let witness = result.verdict.witness();
		CheckRecord {
			name: &result.name,
			kind: result.kind.to_string(),
			verdict: result.verdict.label(),
			detail: match &result.verdict {
				Verdict::Inconclusive(reason) => Some(reason.to_string()),
				_ => None,
			},
			index: witness.and_then(|w| w.index),
			witness: witness.map(|w| {
				w.inputs
					.iter()
					.map(|(input, value)| WitnessValue { input, value: *value })
					.collect()
			}),
		}
	}
}

#[derive(Serialize)]
struct NetValue<'a> {
	net: &'a str,
	value: u64,
}

fn parse_assignments(matches: &ArgMatches) -> Result<InputAssignment, CliError> {
	let mut inputs = InputAssignment::new();
	for entry in matches.get_many::<String>("set").unwrap_or_default() {
		let (name, value) = entry
			.split_once('=')
			.ok_or_else(|| CliError::InvalidAssignment(entry.clone()))?;
		let value = value
			.trim()
			.parse::<u64>()
			.map_err(|_| CliError::InvalidAssignment(entry.clone()))?;
		inputs = inputs.with_name(name.trim(), value);
	}
	Ok(inputs)
}

fn formal_config(matches: &ArgMatches) -> FormalConfig {
	let mut config = FormalConfig {
		budget: matches.get_one::<u64>("budget").copied(),
		deadline: matches.get_one::<u64>("deadline").map(|s| Duration::from_secs(*s)),
		parallel: !matches.get_flag("no-parallel"),
		..Default::default()
	};

	if let Some(bits) = matches.get_one::<u32>("max-bits") {
		config.max_exhaustive_bits = *bits;
	}

	if let Some(samples) = matches.get_one::<u64>("sample") {
		config.degradation = Degradation::Sample {
			samples: *samples,
			seed: matches.get_one::<u64>("seed").copied().unwrap_or(0),
		};
	}

	config
}

fn elaborate(matches: &ArgMatches, formal: bool) -> Result<Netlist, CliError> {
	let name = matches.get_one::<String>("circuit").cloned().unwrap_or_default();
	let config = ElabConfig {
		priority: matches
			.get_one::<PriorityRule>("priority")
			.copied()
			.unwrap_or_default(),
		strict: matches.get_flag("strict"),
		..Default::default()
	};

	let mut design = Design::new();
	let module = circuits::build(&mut design, &name, formal)?.ok_or(CliError::UnknownCircuit(name))?;
	Ok(NetlistElaborator::new(&design, config).elaborate(module.id())?)
}

fn simulate_cmd(matches: &ArgMatches) -> Result<(), CliError> {
	let netlist = elaborate(matches, false)?;
	let inputs = parse_assignments(matches)?;
	let values = netlist.simulate(&inputs)?;

	if matches.get_flag("json") {
		let records: Vec<NetValue> = values.iter().map(|(net, value)| NetValue { net, value }).collect();
		println!("{}", serde_json::to_string_pretty(&records)?);
	}
	else {
		for (net, value) in values.iter() {
			println!("{} = {}", net, value);
		}
	}
	Ok(())
}

fn check_cmd(matches: &ArgMatches) -> Result<(), CliError> {
	let netlist = elaborate(matches, true)?;
	let engine = FormalEngine::new(formal_config(matches));
	info!("Checking {} obligations of {}", netlist.obligations().len(), netlist.name());
	let results = engine.check_all(&netlist)?;

	if matches.get_flag("json") {
		let records: Vec<CheckRecord> = results.iter().map(CheckRecord::from).collect();
		println!("{}", serde_json::to_string_pretty(&records)?);
	}
	else {
		for result in &results {
			println!("{:<8} {:<32} {}", result.kind.to_string(), result.name, result.verdict);
			if let Some(witness) = result.verdict.witness() {
				for (input, value) in &witness.inputs {
					println!("         {} = {}", input, value);
				}
			}
		}
	}

	let failed = results
		.iter()
		.filter(|r| matches!(r.verdict, Verdict::Counterexample(_) | Verdict::Unreachable))
		.count();
	match failed {
		0 => Ok(()),
		n => Err(CliError::ObligationsFailed(n)),
	}
}

fn netlist_cmd(matches: &ArgMatches) -> Result<(), CliError> {
	let netlist = elaborate(matches, matches.get_flag("formal"))?;

	println!("netlist {}", netlist.name());
	for net in netlist.nets() {
		let kind = match &net.driver {
			NetDriver::Input(domain) => format!("input [{}, {}]", domain.lo, domain.hi),
			NetDriver::Expr(_) if netlist.outputs().iter().any(|id| netlist.net(*id).name == net.name) => {
				"output".to_string()
			},
			NetDriver::Expr(_) => "wire".to_string(),
		};
		println!("  {:<24} {:>2} bits  {}", net.name, net.width, kind);
	}

	for obligation in netlist.obligations() {
		println!("  {} {}", obligation.kind, obligation.name);
	}

	for message in netlist.report().messages() {
		println!("  {}", message);
	}
	Ok(())
}

fn main() -> miette::Result<()> {
	let matches = command!()
		.arg(
			Arg::new("circuit")
				.required(true)
				.value_parser(CIRCUITS.to_vec())
				.help("Circuit to work on"),
		)
		.arg(
			arg!(<MODE>)
				.help("Specify which action should be performed")
				.value_parser(["simulate", "check", "netlist"])
				.required(false)
				.short('m')
				.long("mode"),
		)
		.arg(
			Arg::new("set")
				.long("set")
				.value_name("NAME=VALUE")
				.action(ArgAction::Append)
				.help("Input value for simulate mode"),
		)
		.arg(arg!(--budget <N> "Maximum number of candidates per obligation").value_parser(value_parser!(u64)))
		.arg(arg!(--deadline <SECONDS> "Wall-clock limit for the whole check").value_parser(value_parser!(u64)))
		.arg(
			Arg::new("max-bits")
				.long("max-bits")
				.value_name("BITS")
				.value_parser(value_parser!(u32))
				.help("Widest input space enumerated exhaustively"),
		)
		.arg(
			arg!(--sample <N> "Sample N candidates when the space is too large to enumerate")
				.value_parser(value_parser!(u64)),
		)
		.arg(arg!(--seed <SEED> "Seed for sampling").value_parser(value_parser!(u64)))
		.arg(
			arg!(--priority <RULE> "Rule resolving simultaneously active assignments")
				.value_parser(|s: &str| s.parse::<PriorityRule>()),
		)
		.arg(arg!(--json "Print results as JSON"))
		.arg(
			Arg::new("no-parallel")
				.long("no-parallel")
				.action(ArgAction::SetTrue)
				.help("Enumerate on a single thread"),
		)
		.arg(arg!(--formal "List the formal harness instead of the circuit"))
		.arg(arg!(--strict "Treat every elaboration message as an error"))
		.arg(arg!(-v --verbose ... "Raise log verbosity"))
		.get_matches();

	let level = match matches.get_count("verbose") {
		0 => "warn",
		1 => "info",
		_ => "debug",
	};
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

	let mode = match matches.get_one::<String>("MODE") {
		None => "check",
		Some(x) => x,
	};

	match mode {
		"simulate" => simulate_cmd(&matches)?,
		"netlist" => netlist_cmd(&matches)?,
		_ => check_cmd(&matches)?,
	};
	Ok(())
}
