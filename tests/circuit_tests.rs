use std::error::Error;

use combcheck::circuits::{Circuit, Life3x3, Life4x4, NextDay, PennyCounter};
use combir::design::{Design, Expression, ModuleHandle};
use combir::elab::{ElabConfig, ElabError, Elaborator, NetlistElaborator, PriorityRule};
use combir::formal::{Degradation, FormalConfig, FormalEngine, Inconclusive, Verdict};
use combir::netlist::{InputAssignment, Netlist, SimError};
use rstest::*;

type TestResult = Result<(), Box<dyn Error>>;

fn elaborate(design: &Design, module: &ModuleHandle, priority: PriorityRule) -> Result<Netlist, ElabError> {
	let config = ElabConfig {
		priority,
		..Default::default()
	};
	NetlistElaborator::new(design, config).elaborate(module.id())
}

/// Elaborates the formal harness of a circuit and checks all of its obligations
fn check_harness<C: Circuit>(config: FormalConfig) -> Result<(Netlist, Vec<(String, Verdict)>), Box<dyn Error>> {
	let mut design = Design::new();
	let harness = C::new(&mut design)?.formal(&mut design)?;
	let netlist = elaborate(&design, &harness, PriorityRule::default())?;
	let results = FormalEngine::new(config)
		.check_all(&netlist)?
		.into_iter()
		.map(|r| (r.name, r.verdict))
		.collect();
	Ok((netlist, results))
}

fn verdict<'a>(results: &'a [(String, Verdict)], name: &str) -> &'a Verdict {
	&results
		.iter()
		.find(|(n, _)| n == name)
		.unwrap_or_else(|| panic!("no obligation named {}", name))
		.1
}

fn coins(pennies: u64, nickels: u64, dimes: u64, quarters: u64, dollars: u64) -> InputAssignment {
	InputAssignment::new()
		.with_name("in_pennies", pennies)
		.with_name("in_nickels", nickels)
		.with_name("in_dimes", dimes)
		.with_name("in_quarters", quarters)
		.with_name("in_dollars", dollars)
}

#[rstest]
#[case(37, 3, 10, 5, 2, 477)]
#[case(0, 0, 0, 0, 0, 0)]
#[case(255, 15, 15, 15, 15, 2355)]
#[case(3, 0, 2, 1, 5, 548)]
fn test_penny_counter_sum(
	#[case] pennies: u64,
	#[case] nickels: u64,
	#[case] dimes: u64,
	#[case] quarters: u64,
	#[case] dollars: u64,
	#[case] expected: u64,
) -> TestResult {
	let mut design = Design::new();
	let counter = PennyCounter::new(&mut design)?;
	let netlist = elaborate(&design, counter.module(), PriorityRule::default())?;

	let inputs = coins(pennies, nickels, dimes, quarters, dollars);
	let first = netlist.simulate(&inputs)?.get(counter.out_pennies);
	let second = netlist.simulate(&inputs)?.get(counter.out_pennies);
	assert_eq!(first, Some(expected));
	assert_eq!(first, second);
	Ok(())
}

#[test]
fn test_penny_counter_strict() -> TestResult {
	let mut design = Design::new();
	let counter = PennyCounter::new(&mut design)?;
	let strict = ElabConfig {
		strict: true,
		..Default::default()
	};

	// The sum is exactly as wide as the output, so nothing is reported
	let netlist = NetlistElaborator::new(&design, strict).elaborate(counter.module().id())?;
	assert!(netlist.report().messages().is_empty());
	Ok(())
}

#[test]
fn test_penny_counter_rejects_bad_inputs() -> TestResult {
	let mut design = Design::new();
	let counter = PennyCounter::new(&mut design)?;
	let netlist = elaborate(&design, counter.module(), PriorityRule::default())?;

	assert!(matches!(netlist.simulate(&coins(1, 16, 0, 0, 0)), Err(SimError::Domain(_))));
	assert!(matches!(
		netlist.simulate(&InputAssignment::new().with(counter.in_pennies, 1)),
		Err(SimError::MissingInput(_))
	));
	Ok(())
}

#[test]
fn test_penny_counter_formal() -> TestResult {
	let (netlist, results) = check_harness::<PennyCounter>(FormalConfig::default())?;

	for name in ["exact_change", "total_548", "no_pennies_multiple_of_5", "mod_5_matches"] {
		assert!(matches!(verdict(&results, name), Verdict::Reachable(_)), "{}", name);
	}
	assert_eq!(verdict(&results, "no_pennies_is_multiple_of_5"), &Verdict::Proven);
	assert_eq!(verdict(&results, "mod_5_invariant"), &Verdict::Proven);

	// Replay the witness of the 64 penny cover
	let witness = verdict(&results, "total_64_twice_nickels")
		.witness()
		.ok_or("cover not reached")?;
	let values = netlist.simulate(&witness.assignment())?;
	let nickels = witness.get("in_nickels").ok_or("no nickels")?;
	let dimes = witness.get("in_dimes").ok_or("no dimes")?;
	assert_eq!(values.by_name("dut.out_pennies"), Some(64));
	assert_eq!(nickels, 2 * dimes);
	assert!(dimes > 0);
	Ok(())
}

fn next_day(priority: PriorityRule) -> Result<(NextDay, Netlist), Box<dyn Error>> {
	let mut design = Design::new();
	let circuit = NextDay::new(&mut design)?;
	let netlist = elaborate(&design, circuit.module(), priority)?;
	Ok((circuit, netlist))
}

#[rstest]
#[case((1900, 2, 28), (1900, 3, 1, 0))]
#[case((2000, 2, 28), (2000, 2, 29, 0))]
#[case((2000, 1, 1), (2000, 1, 2, 0))]
#[case((2023, 4, 30), (2023, 5, 1, 0))]
#[case((1999, 12, 31), (2000, 1, 1, 0))]
#[case((2024, 2, 29), (2024, 3, 1, 0))]
#[case((0, 0, 0), (0, 0, 0, 1))]
fn test_next_day(#[case] date: (u64, u64, u64), #[case] expected: (u64, u64, u64, u64)) -> TestResult {
	let (circuit, netlist) = next_day(PriorityRule::NarrowestFirst)?;
	let inputs = InputAssignment::new()
		.with(circuit.in_year, date.0)
		.with(circuit.in_month, date.1)
		.with(circuit.in_day, date.2);

	let values = netlist.simulate(&inputs)?;
	let next = (
		values.get(circuit.out_year),
		values.get(circuit.out_month),
		values.get(circuit.out_day),
		values.get(circuit.out_invalid),
	);
	assert_eq!(next, (Some(expected.0), Some(expected.1), Some(expected.2), Some(expected.3)));
	Ok(())
}

#[test]
fn test_next_day_last_declared() -> TestResult {
	let (circuit, netlist) = next_day(PriorityRule::LastDeclared)?;
	let inputs = InputAssignment::new()
		.with(circuit.in_year, 0)
		.with(circuit.in_month, 0)
		.with(circuit.in_day, 0);

	// The unconditional increment is declared after the invalid-date block and wins
	let values = netlist.simulate(&inputs)?;
	assert_eq!(values.get(circuit.out_day), Some(1));
	assert_eq!(values.get(circuit.out_invalid), Some(1));
	Ok(())
}

#[test]
fn test_next_day_year_domain() -> TestResult {
	let (circuit, netlist) = next_day(PriorityRule::default())?;
	let inputs = InputAssignment::new()
		.with(circuit.in_year, 10000)
		.with(circuit.in_month, 1)
		.with(circuit.in_day, 1);

	assert!(matches!(netlist.simulate(&inputs), Err(SimError::Domain(e)) if e.hi == 9999));
	Ok(())
}

#[test]
fn test_next_day_formal() -> TestResult {
	let (_, results) = check_harness::<NextDay>(FormalConfig::default())?;
	assert_eq!(results.len(), 4);
	for (name, verdict) in &results {
		assert_eq!(verdict, &Verdict::Proven, "{}", name);
	}
	Ok(())
}

#[rstest]
#[case(Degradation::Inconclusive)]
#[case(Degradation::Sample { samples: 1000, seed: 7 })]
fn test_next_day_above_threshold(#[case] degradation: Degradation) -> TestResult {
	let config = FormalConfig {
		max_exhaustive_bits: 16,
		degradation,
		..Default::default()
	};

	let (_, results) = check_harness::<NextDay>(config)?;
	for (name, verdict) in &results {
		assert!(
			matches!(verdict, Verdict::Inconclusive(Inconclusive::SpaceTooLarge { bits: 23, .. })),
			"{}: {}",
			name,
			verdict
		);
	}
	Ok(())
}

#[test]
fn test_life3x3_formal() -> TestResult {
	let (_, results) = check_harness::<Life3x3>(FormalConfig::default())?;
	assert_eq!(verdict(&results, "three_neighbors_live"), &Verdict::Proven);
	assert_eq!(verdict(&results, "two_neighbors_keep"), &Verdict::Proven);
	Ok(())
}

#[rstest]
#[case(0b000_010_000, 0)]
#[case(0b000_111_000, 1)]
#[case(0b010_000_011, 1)]
#[case(0b111_111_111, 0)]
#[case(0b110_010_000, 1)]
fn test_life3x3_rules(#[case] cells: u64, #[case] expected: u64) -> TestResult {
	let mut design = Design::new();
	let life = Life3x3::new(&mut design)?;
	let netlist = elaborate(&design, life.module(), PriorityRule::default())?;

	let values = netlist.simulate(&InputAssignment::new().with(life.in_cells, cells))?;
	assert_eq!(values.get(life.out_state), Some(expected));
	Ok(())
}

#[test]
fn test_life4x4_formal() -> TestResult {
	let (netlist, results) = check_harness::<Life4x4>(FormalConfig::default())?;
	assert_eq!(verdict(&results, "isolated_block"), &Verdict::Proven);

	let witness = verdict(&results, "stable_center").witness().ok_or("cover not reached")?;
	let values = netlist.simulate(&witness.assignment())?;
	assert!(values.by_name("dut.out_state").unwrap_or(0) > 0);
	Ok(())
}

#[rstest]
#[case(PriorityRule::NarrowestFirst)]
#[case(PriorityRule::LastDeclared)]
fn test_life4x4_composition(#[case] priority: PriorityRule) -> TestResult {
	let mut design = Design::new();
	let grid = Life4x4::new(&mut design)?;
	let harness = grid.composition(&mut design)?;
	let netlist = elaborate(&design, &harness, priority)?;

	let results = FormalEngine::new(FormalConfig::default()).check_all(&netlist)?;
	assert_eq!(results.len(), 4);
	for result in &results {
		assert_eq!(result.verdict, Verdict::Proven, "{}", result.name);
	}
	Ok(())
}

#[test]
fn test_guarded_override() -> TestResult {
	let mut design = Design::new();
	let mut module = design.new_module("override")?;
	let enable = module.input("enable", 1)?;
	let data = module.input("data", 4)?;
	let y = module.output("y", 4)?;

	module.scope().assign(y, 9u64.into())?;
	module
		.scope()
		.if_scope(Expression::from(enable))?
		.assign(y, Expression::from(data))?;

	let netlist = elaborate(&design, &module, PriorityRule::default())?;
	for (en, value) in [(0, 3), (1, 3), (0, 12), (1, 12)] {
		let values = netlist.simulate(&InputAssignment::new().with(enable, en).with(data, value))?;
		let expected = if en == 1 { value } else { 9 };
		assert_eq!(values.get(y), Some(expected));
	}
	Ok(())
}

#[test]
fn test_overlapping_drivers() -> TestResult {
	let mut design = Design::new();
	let mut module = design.new_module("overlap")?;
	let a = module.input("a", 4)?;
	let y = module.output("y", 4)?;

	module.scope().assign(y.bits(0..3), Expression::from(a).bits(0..3))?;
	module.scope().assign(y.bits(2..4), 0u64.into())?;

	let result = elaborate(&design, &module, PriorityRule::default());
	assert!(matches!(result, Err(ElabError::OverlappingDriver(e)) if e.lsb == 2 && e.msb == 2));
	Ok(())
}
