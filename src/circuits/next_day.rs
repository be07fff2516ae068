use combir::design::{Design, DesignError, Expression, ModuleHandle, SignalDirection, SignalId};

use super::Circuit;

/// Calendar date increment with Gregorian leap years.
/// The all-zero date is rejected by raising `out_invalid`.
pub struct NextDay {
	module: ModuleHandle,
	pub in_year: SignalId,
	pub in_month: SignalId,
	pub in_day: SignalId,
	pub out_year: SignalId,
	pub out_month: SignalId,
	pub out_day: SignalId,
	pub out_invalid: SignalId,
}

impl Circuit for NextDay {
	const NAME: &'static str = "next_day";

	fn new(design: &mut Design) -> Result<Self, DesignError> {
		let mut module = design.new_module(Self::NAME)?;
		let mut scope = module.scope();

		let in_year = scope.new_signal("in_year")?.range(0, 9999).build()?;
		module.expose(in_year, SignalDirection::Input)?;
		let in_month = module.input("in_month", 4)?;
		let in_day = module.input("in_day", 5)?;

		let out_year = scope.new_signal("out_year")?.range(0, 10000).build()?;
		module.expose(out_year, SignalDirection::Output)?;
		let out_month = scope.new_signal("out_month")?.like(in_month).build()?;
		module.expose(out_month, SignalDirection::Output)?;
		let out_day = scope.new_signal("out_day")?.like(in_day).build()?;
		module.expose(out_day, SignalDirection::Output)?;
		let out_invalid = module.output("out_invalid", 1)?;

		let is_leap = scope.new_signal("is_leap")?.unsigned(1).build()?;
		let rollover = scope.new_signal("rollover")?.like(in_day).build()?;

		let year = Expression::from(in_year);
		let month = Expression::from(in_month);
		let day = Expression::from(in_day);

		let mut invalid = scope.if_scope(
			year.clone()
				.eq(0u64)
				.logical_and(month.clone().eq(0u64))
				.logical_and(day.clone().eq(0u64)),
		)?;
		invalid.assign(out_year, 0u64.into())?;
		invalid.assign(out_month, 0u64.into())?;
		invalid.assign(out_day, 0u64.into())?;
		invalid.assign(out_invalid, 1u64.into())?;

		scope.assign(is_leap, 0u64.into())?;
		scope
			.if_scope((year.clone() % 4u64).eq(0u64).logical_and((year.clone() % 100u64).ne(0u64)))?
			.assign(is_leap, 1u64.into())?;
		scope
			.if_scope((year.clone() % 400u64).eq(0u64))?
			.assign(is_leap, 1u64.into())?;

		let mut days_in_month = scope.switch_scope(month.clone())?;
		days_in_month
			.case(&[2])?
			.assign(rollover, Expression::from(28u64) + Expression::from(is_leap))?;
		days_in_month.case(&[4, 6, 9, 11])?.assign(rollover, 30u64.into())?;
		days_in_month.default()?.assign(rollover, 31u64.into())?;

		scope.assign(out_year, year.clone())?;
		scope.assign(out_month, month.clone())?;
		scope.assign(out_day, day.clone() + 1u64)?;

		let mut last_day = scope.if_scope(day.eq(rollover))?;
		last_day.assign(out_day, 1u64.into())?;
		last_day.assign(out_month, month.clone() + 1u64)?;

		let mut last_month = last_day.if_scope(month.eq(12u64))?;
		last_month.assign(out_month, 1u64.into())?;
		last_month.assign(out_year, year + 1u64)?;

		Ok(Self {
			module,
			in_year,
			in_month,
			in_day,
			out_year,
			out_month,
			out_day,
			out_invalid,
		})
	}

	fn module(&self) -> &ModuleHandle {
		&self.module
	}

	fn formal(&self, design: &mut Design) -> Result<ModuleHandle, DesignError> {
		let (harness, dut) = design.new_harness(self.module.id(), "next_day_formal")?;
		let port = |name: &str| dut.port(name).map(Expression::from);
		let (year, month, day) = (port("in_year")?, port("in_month")?, port("in_day")?);
		let (out_year, out_month, out_day) = (port("out_year")?, port("out_month")?, port("out_day")?);
		let invalid = port("out_invalid")?;

		let date = |y: u64, m: u64, d: u64| {
			year.clone()
				.eq(y)
				.logical_and(month.clone().eq(m))
				.logical_and(day.clone().eq(d))
		};
		let next = |y: u64, m: u64, d: u64| {
			out_year
				.clone()
				.eq(y)
				.logical_and(out_month.clone().eq(m))
				.logical_and(out_day.clone().eq(d))
				.logical_and(invalid.clone().eq(0u64))
		};

		let mut scope = harness.scope();
		scope
			.if_scope(date(2000, 1, 1))?
			.assert_that("new_year", next(2000, 1, 2))?;
		scope
			.if_scope(date(2000, 2, 28))?
			.assert_that("leap_year", next(2000, 2, 29))?;
		scope
			.if_scope(date(1900, 2, 28))?
			.assert_that("century_not_leap", next(1900, 3, 1))?;
		scope
			.if_scope(date(0, 0, 0))?
			.assert_that("zero_date_invalid", invalid.clone().eq(1u64))?;

		Ok(harness)
	}
}
