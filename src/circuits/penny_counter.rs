use combir::design::{Design, DesignError, Expression, ModuleHandle, SignalId};

use super::Circuit;

/// Adds up the value of a handful of coins, in pennies
pub struct PennyCounter {
	module: ModuleHandle,
	pub in_pennies: SignalId,
	pub in_nickels: SignalId,
	pub in_dimes: SignalId,
	pub in_quarters: SignalId,
	pub in_dollars: SignalId,
	pub out_pennies: SignalId,
}

impl Circuit for PennyCounter {
	const NAME: &'static str = "penny_counter";

	fn new(design: &mut Design) -> Result<Self, DesignError> {
		let mut module = design.new_module(Self::NAME)?;
		let in_pennies = module.input("in_pennies", 8)?;
		let in_nickels = module.input("in_nickels", 4)?;
		let in_dimes = module.input("in_dimes", 4)?;
		let in_quarters = module.input("in_quarters", 4)?;
		let in_dollars = module.input("in_dollars", 4)?;
		let out_pennies = module.output("out_pennies", 12)?;

		module.scope().assign(
			out_pennies,
			Expression::from(in_pennies)
				+ Expression::from(in_nickels) * 5u64
				+ Expression::from(in_dimes) * 10u64
				+ Expression::from(in_quarters) * 25u64
				+ Expression::from(in_dollars) * 100u64,
		)?;

		Ok(Self {
			module,
			in_pennies,
			in_nickels,
			in_dimes,
			in_quarters,
			in_dollars,
			out_pennies,
		})
	}

	fn module(&self) -> &ModuleHandle {
		&self.module
	}

	fn formal(&self, design: &mut Design) -> Result<ModuleHandle, DesignError> {
		let (harness, dut) = design.new_harness(self.module.id(), "penny_counter_formal")?;
		let port = |name: &str| dut.port(name).map(Expression::from);
		let pennies = port("in_pennies")?;
		let nickels = port("in_nickels")?;
		let dimes = port("in_dimes")?;
		let quarters = port("in_quarters")?;
		let dollars = port("in_dollars")?;
		let out = port("out_pennies")?;

		let mut scope = harness.scope();
		scope.cover(
			"exact_change",
			pennies
				.clone()
				.eq(37u64)
				.logical_and(nickels.clone().eq(3u64))
				.logical_and(dimes.clone().eq(10u64))
				.logical_and(quarters.eq(5u64))
				.logical_and(dollars.eq(2u64)),
		)?;
		scope.cover("total_548", out.clone().eq(548u64))?;
		scope.cover(
			"total_64_twice_nickels",
			out.clone()
				.eq(64u64)
				.logical_and(nickels.eq(dimes.clone() * 2u64))
				.logical_and(dimes.gt(0u64)),
		)?;
		scope.cover(
			"no_pennies_multiple_of_5",
			pennies.clone().eq(0u64).logical_and((out.clone() % 5u64).eq(0u64)),
		)?;
		scope.cover("mod_5_matches", (out.clone() % 5u64).eq(pennies.clone() % 5u64))?;

		scope
			.if_scope(pennies.clone().eq(0u64))?
			.assert_that("no_pennies_is_multiple_of_5", (out.clone() % 5u64).eq(0u64))?;
		scope.assert_that("mod_5_invariant", (out % 5u64).eq(pennies % 5u64))?;

		Ok(harness)
	}
}
