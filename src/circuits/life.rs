use combir::design::{
	Design, DesignError, Expression, InstanceHandle, ModuleHandle, ScopeHandle, SignalId, SignalRef,
};

use super::Circuit;

/// Number of live cells around the center of a 3x3 neighborhood
pub fn neighbor_count(cells: Expression) -> Expression {
	(0..9)
		.filter(|i| *i != 4)
		.map(|i| cells.clone().bit(i))
		.reduce(|acc, cell| acc + cell)
		.unwrap_or_else(Expression::new_zero)
}

/// Next state of the center cell of a 3x3 neighborhood
pub struct Life3x3 {
	module: ModuleHandle,
	pub in_cells: SignalId,
	pub out_state: SignalId,
}

impl Circuit for Life3x3 {
	const NAME: &'static str = "life3x3";

	fn new(design: &mut Design) -> Result<Self, DesignError> {
		let mut module = design.new_module(Self::NAME)?;
		let in_cells = module.input("in_cells", 9)?;
		let out_state = module.output("out_state", 1)?;

		let mut scope = module.scope();
		let neighbors = scope.new_signal("neighbors")?.unsigned(4).build()?;
		scope.assign(neighbors, neighbor_count(in_cells.into()))?;

		let middle = Expression::from(in_cells.bit(4));
		let count = Expression::from(neighbors);

		scope.assign(out_state, 0u64.into())?;
		scope
			.if_scope(middle.clone().logical_and(count.clone().eq(2u64).logical_or(count.clone().eq(3u64))))?
			.assign(out_state, 1u64.into())?;
		scope
			.if_scope(middle.logical_not().logical_and(count.eq(3u64)))?
			.assign(out_state, 1u64.into())?;

		Ok(Self {
			module,
			in_cells,
			out_state,
		})
	}

	fn module(&self) -> &ModuleHandle {
		&self.module
	}

	fn formal(&self, design: &mut Design) -> Result<ModuleHandle, DesignError> {
		let (harness, dut) = design.new_harness(self.module.id(), "life3x3_formal")?;
		let cells = Expression::from(dut.port("in_cells")?);
		let state = Expression::from(dut.port("out_state")?);
		let count = neighbor_count(cells.clone());

		let mut scope = harness.scope();
		scope
			.if_scope(count.clone().eq(3u64))?
			.assert_that("three_neighbors_live", state.clone())?;
		scope
			.if_scope(count.eq(2u64))?
			.assert_that("two_neighbors_keep", state.eq(cells.bit(4)))?;

		Ok(harness)
	}
}

/// 3x3 tile of a 4x4 grid: instance name, index of the top-left cell and output bit
const TILES: [(&str, u32, u32); 4] = [("tl", 0, 0), ("tr", 1, 1), ("bl", 4, 2), ("br", 5, 3)];

/// Drives the cells of a 3x3 instance from the 4x4 grid `grid`, starting at cell `origin`
fn wire_tile(
	scope: &mut ScopeHandle,
	tile: &InstanceHandle,
	grid: SignalRef,
	origin: u32,
) -> Result<(), DesignError> {
	let cells = tile.port("in_cells")?;
	for row in 0..3 {
		let from = origin + 4 * row;
		scope.assign(cells.bits(3 * row..3 * row + 3), grid.bits(from..from + 3).into())?;
	}
	Ok(())
}

/// Next state of the four center cells of a 4x4 grid, built from four 3x3 instances
pub struct Life4x4 {
	module: ModuleHandle,
	cell: Life3x3,
	pub in_cells: SignalId,
	pub out_state: SignalId,
}

impl Life4x4 {
	/// Name of the harness comparing the grid against standalone 3x3 instances
	pub const COMPOSITION: &'static str = "life4x4_composition";

	/// The 3x3 circuit instantiated by the grid
	pub fn cell(&self) -> &Life3x3 {
		&self.cell
	}

	/// Builds a harness asserting that every output bit matches a separately
	/// instantiated 3x3 circuit fed the same cells
	pub fn composition(&self, design: &mut Design) -> Result<ModuleHandle, DesignError> {
		let (mut harness, dut) = design.new_harness(self.module.id(), Self::COMPOSITION)?;
		let grid = dut.port("in_cells")?;
		let state = dut.port("out_state")?;
		let mut scope = harness.scope();

		for (name, origin, bit) in TILES {
			let reference = harness.instantiate(self.cell.module.id(), &format!("ref_{}", name))?;
			wire_tile(&mut scope, &reference, grid, origin)?;

			let expected = Expression::from(reference.port("out_state")?);
			scope.assert_that(&format!("tile_{}", name), Expression::from(state.bit(bit)).eq(expected))?;
		}

		Ok(harness)
	}
}

impl Circuit for Life4x4 {
	const NAME: &'static str = "life4x4";

	fn new(design: &mut Design) -> Result<Self, DesignError> {
		let cell = Life3x3::new(design)?;
		let mut module = design.new_module(Self::NAME)?;
		let in_cells = module.input("in_cells", 16)?;
		let out_state = module.output("out_state", 4)?;

		let mut scope = module.scope();
		for (name, origin, bit) in TILES {
			let tile = module.instantiate(cell.module.id(), name)?;
			wire_tile(&mut scope, &tile, in_cells.into(), origin)?;
			scope.assign(out_state.bit(bit), tile.port("out_state")?.into())?;
		}

		Ok(Self {
			module,
			cell,
			in_cells,
			out_state,
		})
	}

	fn module(&self) -> &ModuleHandle {
		&self.module
	}

	fn formal(&self, design: &mut Design) -> Result<ModuleHandle, DesignError> {
		let (harness, dut) = design.new_harness(self.module.id(), "life4x4_formal")?;
		let cells = dut.port("in_cells")?;
		let state = Expression::from(dut.port("out_state")?);
		let cell = |i: u32| Expression::from(cells.bit(i));
		let span = |range: std::ops::Range<u32>| Expression::from(cells.bits(range));

		let mut scope = harness.scope();
		scope.cover(
			"stable_center",
			cell(5)
				.eq(state.clone().bit(0))
				.logical_and(cell(6).eq(state.clone().bit(1)))
				.logical_and(cell(9).eq(state.clone().bit(2)))
				.logical_and(cell(10).eq(state.clone().bit(3)))
				.logical_and(state.clone().gt(0u64)),
		)?;

		// A surviving 2x2 block needs a dead ring around it
		let block = state.all().logical_and(span(5..7).all()).logical_and(span(9..11).all());
		scope.if_scope(block)?.assert_that(
			"isolated_block",
			span(0..5)
				.any()
				.logical_or(span(7..9).any())
				.logical_or(span(11..16).any())
				.logical_not(),
		)?;

		Ok(harness)
	}
}
