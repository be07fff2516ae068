mod space;

use std::collections::HashSet;
use std::fmt::Display;
use std::time::{Duration, Instant};

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use thiserror::Error;

use self::space::InputSpace;
use crate::design::PropertyKind;
use crate::netlist::{Evaluates, InputAssignment, NetDriver, NetExpr, NetId, Netlist};

/// Property compiled against a netlist
#[derive(Clone, Debug)]
pub struct Obligation {
	pub name: String,
	pub kind: PropertyKind,

	/// Candidates for which the guard is zero are skipped
	pub guard: NetExpr,
	pub predicate: NetExpr,
}

/// Input assignment demonstrating a cover or refuting an assertion
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Witness {
	/// Values of all top-level inputs, in netlist input order
	pub inputs: Vec<(String, u64)>,

	/// Position of the candidate in the enumeration order, `None` for sampled witnesses
	pub index: Option<u64>,
}

impl Witness {
	pub fn get(&self, name: &str) -> Option<u64> {
		self.inputs.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
	}

	/// Input assignment replaying the witness in a simulation
	pub fn assignment(&self) -> InputAssignment {
		self.inputs
			.iter()
			.fold(InputAssignment::new(), |acc, (name, value)| acc.with_name(name, *value))
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inconclusive {
	/// The enumeration budget ran out
	BudgetExceeded { checked: u64 },

	/// The wall-clock deadline passed
	DeadlineExpired { checked: u64 },

	/// The input space is above the exhaustive threshold and sampling found nothing
	SpaceTooLarge { bits: u64, sampled: u64 },
}

impl Display for Inconclusive {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::BudgetExceeded { checked } => write!(f, "budget exhausted after {} candidates", checked),
			Self::DeadlineExpired { checked } => write!(f, "deadline expired after {} candidates", checked),
			Self::SpaceTooLarge { bits, sampled } => {
				write!(f, "{}-bit input space, {} samples without a witness", bits, sampled)
			},
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
	Proven,
	Counterexample(Witness),
	Reachable(Witness),
	Unreachable,
	Inconclusive(Inconclusive),
}

impl Verdict {
	pub fn witness(&self) -> Option<&Witness> {
		match self {
			Self::Counterexample(w) | Self::Reachable(w) => Some(w),
			_ => None,
		}
	}

	pub fn is_inconclusive(&self) -> bool {
		matches!(self, Self::Inconclusive(_))
	}

	/// Whether the obligation holds (proven assertion or reachable cover)
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Proven | Self::Reachable(_))
	}

	pub fn label(&self) -> &'static str {
		match self {
			Self::Proven => "PROVEN",
			Self::Counterexample(_) => "COUNTEREXAMPLE",
			Self::Reachable(_) => "REACHABLE",
			Self::Unreachable => "UNREACHABLE",
			Self::Inconclusive(_) => "INCONCLUSIVE",
		}
	}
}

impl Display for Verdict {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Inconclusive(reason) => write!(f, "{} ({})", self.label(), reason),
			_ => write!(f, "{}", self.label()),
		}
	}
}

#[derive(Clone, Debug)]
pub struct CheckResult {
	pub name: String,
	pub kind: PropertyKind,
	pub verdict: Verdict,
}

/// What to do when an input space is above the exhaustive threshold
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Degradation {
	#[default]
	Inconclusive,

	/// Draws `samples` candidates from a generator seeded with `seed` plus the obligation index
	Sample { samples: u64, seed: u64 },
}

#[derive(Clone, Copy, Debug)]
pub struct FormalConfig {
	/// Widest input space (in bits) which is enumerated exhaustively. Capped at 63.
	pub max_exhaustive_bits: u32,
	pub degradation: Degradation,

	/// Maximum number of candidates per obligation
	pub budget: Option<u64>,

	/// Wall-clock limit for the whole check, measured from its start
	pub deadline: Option<Duration>,
	pub parallel: bool,

	/// Candidates handed to the thread pool at once
	pub chunk_size: u64,
}

impl Default for FormalConfig {
	fn default() -> Self {
		FormalConfig {
			max_exhaustive_bits: 24,
			degradation: Degradation::default(),
			budget: None,
			deadline: None,
			parallel: true,
			chunk_size: 1 << 16,
		}
	}
}

#[derive(Clone, Debug, Error)]
pub enum FormalError {
	#[error("Obligation '{obligation}' references net {net}, which is not part of netlist '{netlist}'")]
	ForeignNet {
		obligation: String,
		netlist: String,
		net: usize,
	},

	#[error("Enumeration chunk size must be positive")]
	ZeroChunkSize,
}

/// Everything needed to test a single candidate
struct Probe<'a> {
	obligation: &'a Obligation,
	netlist: &'a Netlist,

	/// Nets read by the guard, in evaluation order
	guard_nets: Vec<NetId>,

	/// Remaining nets read by the predicate, in evaluation order
	predicate_nets: Vec<NetId>,
}

impl<'a> Probe<'a> {
	fn new(netlist: &'a Netlist, obligation: &'a Obligation) -> (Self, Vec<NetId>) {
		let guard_cone = netlist.cone(&[&obligation.guard]);
		let cone = netlist.cone(&[&obligation.guard, &obligation.predicate]);

		let guard_set: HashSet<NetId> = guard_cone.nets.iter().copied().collect();
		let predicate_nets = cone.nets.iter().copied().filter(|id| !guard_set.contains(id)).collect();

		let probe = Self {
			obligation,
			netlist,
			guard_nets: guard_cone.nets,
			predicate_nets,
		};
		(probe, cone.inputs)
	}

	/// Evaluates the cone for the inputs in `values`.
	/// Returns true if the candidate refutes an assertion or hits a cover.
	fn hit(&self, values: &mut [u64]) -> bool {
		self.netlist.evaluate_nets(&self.guard_nets, values);
		if self.obligation.guard.eval(values) == 0 {
			return false;
		}

		self.netlist.evaluate_nets(&self.predicate_nets, values);
		let holds = self.obligation.predicate.eval(values) != 0;
		match self.obligation.kind {
			PropertyKind::Assert => !holds,
			PropertyKind::Cover => holds,
		}
	}
}

/// Checks obligations by enumerating the input space of a netlist
pub struct FormalEngine {
	config: FormalConfig,
}

impl FormalEngine {
	pub fn new(config: FormalConfig) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &FormalConfig {
		&self.config
	}

	/// Checks all obligations collected during elaboration
	pub fn check_all(&self, netlist: &Netlist) -> Result<Vec<CheckResult>, FormalError> {
		self.check(netlist, netlist.obligations())
	}

	/// Checks each obligation independently. Results follow the order of `obligations`.
	pub fn check(&self, netlist: &Netlist, obligations: &[Obligation]) -> Result<Vec<CheckResult>, FormalError> {
		if self.config.chunk_size == 0 {
			return Err(FormalError::ZeroChunkSize);
		}
		for obligation in obligations {
			validate(netlist, obligation)?;
		}

		let deadline = self.config.deadline.map(|d| Instant::now() + d);
		let mut results = Vec::with_capacity(obligations.len());

		for (index, obligation) in obligations.iter().enumerate() {
			let verdict = self.check_obligation(netlist, obligation, index as u64, deadline);
			info!("{} {}: {}", obligation.kind, obligation.name, verdict);

			results.push(CheckResult {
				name: obligation.name.clone(),
				kind: obligation.kind,
				verdict,
			});
		}

		Ok(results)
	}

	fn check_obligation(
		&self,
		netlist: &Netlist,
		obligation: &Obligation,
		index: u64,
		deadline: Option<Instant>,
	) -> Verdict {
		let (probe, cone_inputs) = Probe::new(netlist, obligation);
		let space = InputSpace::new(netlist, &cone_inputs);
		let bits = space.bits();
		debug!(
			"Obligation {}: {} of {} inputs in cone, {}-bit space, {} nets",
			obligation.name,
			cone_inputs.len(),
			netlist.inputs().len(),
			bits,
			probe.guard_nets.len() + probe.predicate_nets.len()
		);

		// Inputs outside of the cone stay at the bottom of their domains
		let mut base = vec![0u64; netlist.nets().len()];
		for id in netlist.inputs() {
			if let NetDriver::Input(domain) = netlist.net(*id).driver {
				base[id.index()] = domain.lo;
			}
		}

		let exhaustive_limit = self.config.max_exhaustive_bits.min(63) as u64;
		match space.len() {
			Some(total) if bits <= exhaustive_limit => self.enumerate(&probe, &space, base, total, deadline),
			_ => match self.config.degradation {
				Degradation::Inconclusive => Verdict::Inconclusive(Inconclusive::SpaceTooLarge { bits, sampled: 0 }),
				Degradation::Sample { samples, seed } => {
					let rng = StdRng::seed_from_u64(seed.wrapping_add(index));
					self.sample(&probe, &space, base, bits, samples, rng, deadline)
				},
			},
		}
	}

	fn enumerate(
		&self,
		probe: &Probe,
		space: &InputSpace,
		base: Vec<u64>,
		total: u64,
		deadline: Option<Instant>,
	) -> Verdict {
		let limit = self.config.budget.map_or(total, |b| b.min(total));
		let mut start = 0;

		while start < limit {
			if deadline.is_some_and(|d| Instant::now() >= d) {
				return Verdict::Inconclusive(Inconclusive::DeadlineExpired { checked: start });
			}

			let end = limit.min(start.saturating_add(self.config.chunk_size));
			let found = if self.config.parallel {
				(start..end)
					.into_par_iter()
					.map_init(|| base.clone(), |values, idx| {
						space.load(idx, values);
						probe.hit(values).then_some(idx)
					})
					.find_map_first(|idx| idx)
			}
			else {
				let mut values = base.clone();
				(start..end).find(|idx| {
					space.load(*idx, &mut values);
					probe.hit(&mut values)
				})
			};

			if let Some(idx) = found {
				let mut values = base;
				space.load(idx, &mut values);
				return found_verdict(probe, &values, Some(idx));
			}
			start = end;
		}

		if limit < total {
			return Verdict::Inconclusive(Inconclusive::BudgetExceeded { checked: limit });
		}

		match probe.obligation.kind {
			PropertyKind::Assert => Verdict::Proven,
			PropertyKind::Cover => Verdict::Unreachable,
		}
	}

	#[allow(clippy::too_many_arguments)]
	fn sample(
		&self,
		probe: &Probe,
		space: &InputSpace,
		base: Vec<u64>,
		bits: u64,
		samples: u64,
		mut rng: StdRng,
		deadline: Option<Instant>,
	) -> Verdict {
		let limit = self.config.budget.map_or(samples, |b| b.min(samples));
		let mut values = base;

		for checked in 0..limit {
			if checked % self.config.chunk_size == 0 && deadline.is_some_and(|d| Instant::now() >= d) {
				return Verdict::Inconclusive(Inconclusive::DeadlineExpired { checked });
			}

			space.sample(&mut rng, &mut values);
			if probe.hit(&mut values) {
				return found_verdict(probe, &values, None);
			}
		}

		match limit < samples {
			true => Verdict::Inconclusive(Inconclusive::BudgetExceeded { checked: limit }),
			false => Verdict::Inconclusive(Inconclusive::SpaceTooLarge { bits, sampled: limit }),
		}
	}
}

fn found_verdict(probe: &Probe, values: &[u64], index: Option<u64>) -> Verdict {
	let witness = Witness {
		inputs: probe
			.netlist
			.inputs()
			.iter()
			.map(|id| (probe.netlist.net(*id).name.clone(), values[id.index()]))
			.collect(),
		index,
	};

	match probe.obligation.kind {
		PropertyKind::Assert => Verdict::Counterexample(witness),
		PropertyKind::Cover => Verdict::Reachable(witness),
	}
}

fn validate(netlist: &Netlist, obligation: &Obligation) -> Result<(), FormalError> {
	let mut deps = vec![];
	obligation.guard.dependencies(&mut deps);
	obligation.predicate.dependencies(&mut deps);

	match deps.into_iter().find(|id| id.index() >= netlist.nets().len()) {
		Some(id) => Err(FormalError::ForeignNet {
			obligation: obligation.name.clone(),
			netlist: netlist.name().into(),
			net: id.index(),
		}),
		None => Ok(()),
	}
}

/// Checks obligations with the default configuration and an optional per-obligation budget
pub fn check(netlist: &Netlist, obligations: &[Obligation], budget: Option<u64>) -> Result<Vec<CheckResult>, FormalError> {
	let config = FormalConfig {
		budget,
		..Default::default()
	};
	FormalEngine::new(config).check(netlist, obligations)
}

#[cfg(test)]
mod test {
	use std::error::Error;

	use rstest::rstest;

	use super::*;
	use crate::design::{Design, Expression, ModuleHandle, SignalDirection, SignalId};
	use crate::elab::{ElabConfig, Elaborator, NetlistElaborator};

	struct Adder {
		design: Design,
		module: ModuleHandle,
		a: SignalId,
		b: SignalId,
		sum: SignalId,
	}

	fn adder() -> Result<Adder, Box<dyn Error>> {
		let mut design = Design::new();
		let mut module = design.new_module("adder")?;
		let a = module.input("a", 4)?;
		let b = module.input("b", 4)?;
		let sum = module.output("sum", 5)?;
		module.scope().assign(sum, Expression::from(a) + Expression::from(b))?;
		Ok(Adder {
			design,
			module,
			a,
			b,
			sum,
		})
	}

	fn elaborate(adder: &Adder) -> Result<Netlist, Box<dyn Error>> {
		Ok(NetlistElaborator::new(&adder.design, ElabConfig::default()).elaborate(adder.module.id())?)
	}

	fn engine(parallel: bool) -> FormalEngine {
		FormalEngine::new(FormalConfig {
			parallel,
			chunk_size: 7,
			..Default::default()
		})
	}

	#[rstest]
	#[case(true)]
	#[case(false)]
	fn test_exhaustive_verdicts(#[case] parallel: bool) -> Result<(), Box<dyn Error>> {
		let adder = adder()?;
		let (a, b, sum) = (adder.a, adder.b, adder.sum);
		let mut scope = adder.module.scope();
		scope.assert_that("no_overflow", Expression::from(sum).ge(a))?;
		scope.assert_that("a_not_five", Expression::from(a).ne(5u64))?;
		scope.cover("sum_31", Expression::from(sum).eq(31u64))?;
		scope.cover("sum_30", Expression::from(sum).eq(30u64))?;
		scope.if_scope(Expression::from(b).eq(0u64))?.assert_that("identity", Expression::from(sum).eq(a))?;

		let netlist = elaborate(&adder)?;
		let results = engine(parallel).check_all(&netlist)?;
		let verdicts: Vec<&Verdict> = results.iter().map(|r| &r.verdict).collect();

		assert_eq!(verdicts[0], &Verdict::Proven);
		assert_eq!(
			verdicts[1],
			&Verdict::Counterexample(Witness {
				inputs: vec![("a".into(), 5), ("b".into(), 0)],
				index: Some(5),
			})
		);
		assert_eq!(verdicts[2], &Verdict::Unreachable);
		assert_eq!(verdicts[3].witness().and_then(|w| w.get("a")), Some(15));
		assert_eq!(verdicts[4], &Verdict::Proven);
		Ok(())
	}

	#[test]
	fn test_first_witness_in_order() -> Result<(), Box<dyn Error>> {
		let adder = adder()?;
		let sum = adder.sum;
		adder.module.scope().cover("sum_20", Expression::from(sum).eq(20u64))?;
		let netlist = elaborate(&adder)?;

		let parallel = engine(true).check_all(&netlist)?;
		let sequential = engine(false).check_all(&netlist)?;
		assert_eq!(parallel[0].verdict, sequential[0].verdict);

		// 5 + 15 is the lexicographically first way to make 20
		let witness = parallel[0].verdict.witness().cloned().ok_or("no witness")?;
		assert_eq!(witness.inputs, vec![("a".into(), 5), ("b".into(), 15)]);
		assert_eq!(netlist.simulate(&witness.assignment())?.get(sum), Some(20));
		Ok(())
	}

	#[test]
	fn test_budget_and_deadline() -> Result<(), Box<dyn Error>> {
		let adder = adder()?;
		let (a, sum) = (adder.a, adder.sum);
		adder.module.scope().assert_that("no_overflow", Expression::from(sum).ge(a))?;
		let netlist = elaborate(&adder)?;

		let results = check(&netlist, netlist.obligations(), Some(10))?;
		assert_eq!(
			results[0].verdict,
			Verdict::Inconclusive(Inconclusive::BudgetExceeded { checked: 10 })
		);

		let expired = FormalEngine::new(FormalConfig {
			deadline: Some(Duration::ZERO),
			..Default::default()
		});
		assert_eq!(
			expired.check_all(&netlist)?[0].verdict,
			Verdict::Inconclusive(Inconclusive::DeadlineExpired { checked: 0 })
		);

		// A budget covering the whole space still proves
		assert_eq!(check(&netlist, netlist.obligations(), Some(256))?[0].verdict, Verdict::Proven);
		Ok(())
	}

	#[test]
	fn test_degradation() -> Result<(), Box<dyn Error>> {
		let adder = adder()?;
		let (a, sum) = (adder.a, adder.sum);
		adder.module.scope().assert_that("no_overflow", Expression::from(sum).ge(a))?;
		adder.module.scope().cover("nonzero", Expression::from(sum).ne(0u64))?;
		let netlist = elaborate(&adder)?;

		let inconclusive = FormalEngine::new(FormalConfig {
			max_exhaustive_bits: 4,
			..Default::default()
		});
		let results = inconclusive.check_all(&netlist)?;
		assert!(results.iter().all(|r| r.verdict.is_inconclusive()));

		let sampling = FormalEngine::new(FormalConfig {
			max_exhaustive_bits: 4,
			degradation: Degradation::Sample { samples: 64, seed: 1 },
			..Default::default()
		});
		let results = sampling.check_all(&netlist)?;
		assert_eq!(
			results[0].verdict,
			Verdict::Inconclusive(Inconclusive::SpaceTooLarge { bits: 8, sampled: 64 })
		);
		assert!(matches!(&results[1].verdict, Verdict::Reachable(w) if w.index.is_none()));
		Ok(())
	}

	#[test]
	fn test_range_domain() -> Result<(), Box<dyn Error>> {
		let mut d = Design::new();
		let mut m = d.new_module("ranged")?;
		let day = m.scope().new_signal("day")?.range(3, 5).build()?;
		m.expose(day, SignalDirection::Input)?;
		let unused = m.input("unused", 8)?;
		let y = m.output("y", 3)?;
		m.scope().assign(y, Expression::from(day))?;
		m.scope().cover("two", Expression::from(y).eq(2u64))?;
		m.scope().cover("four", Expression::from(y).eq(4u64))?;

		let netlist = NetlistElaborator::new(&d, ElabConfig::default()).elaborate(m.id())?;
		let results = check(&netlist, netlist.obligations(), None)?;
		assert_eq!(results[0].verdict, Verdict::Unreachable);

		// Only the cone is enumerated, inputs outside of it stay at their lowest value
		let witness = results[1].verdict.witness().ok_or("no witness")?;
		assert_eq!(witness.index, Some(1));
		assert_eq!(witness.get("unused"), Some(0));
		assert!(netlist.net_of(unused).is_some());
		Ok(())
	}
}
