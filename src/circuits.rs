mod life;
mod next_day;
mod penny_counter;

pub use life::{neighbor_count, Life3x3, Life4x4};
pub use next_day::NextDay;
pub use penny_counter::PennyCounter;

use combir::design::{Design, DesignError, ModuleHandle};

/// Example circuit which knows how to wrap itself in a formal harness
pub trait Circuit: Sized {
	/// Name of the circuit module
	const NAME: &'static str;

	fn new(design: &mut Design) -> Result<Self, DesignError>;

	fn module(&self) -> &ModuleHandle;

	/// Builds a harness module instantiating the circuit as `dut` and carrying its properties
	fn formal(&self, design: &mut Design) -> Result<ModuleHandle, DesignError>;
}

/// Names accepted by [`build`]
pub const CIRCUITS: &[&str] = &[
	PennyCounter::NAME,
	NextDay::NAME,
	Life3x3::NAME,
	Life4x4::NAME,
	Life4x4::COMPOSITION,
];

fn make<C: Circuit>(design: &mut Design, formal: bool) -> Result<ModuleHandle, DesignError> {
	let circuit = C::new(design)?;
	match formal {
		true => circuit.formal(design),
		false => Ok(circuit.module().clone()),
	}
}

/// Builds a circuit by name into `design`.
/// With `formal` set, the circuit's harness is returned instead of the circuit itself.
/// A module of that name already in the design is returned as is.
pub fn build(design: &mut Design, name: &str, formal: bool) -> Result<Option<ModuleHandle>, DesignError> {
	if let Some(id) = design.find_module(name).filter(|_| !formal) {
		return Ok(design.get_module_handle(id));
	}

	let module = match name {
		PennyCounter::NAME => make::<PennyCounter>(design, formal)?,
		NextDay::NAME => make::<NextDay>(design, formal)?,
		Life3x3::NAME => make::<Life3x3>(design, formal)?,
		Life4x4::NAME => make::<Life4x4>(design, formal)?,

		// Only exists as a harness
		Life4x4::COMPOSITION => Life4x4::new(design)?.composition(design)?,
		_ => return Ok(None),
	};

	Ok(Some(module))
}
