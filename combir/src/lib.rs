pub mod design;
pub mod elab;
pub mod formal;
pub mod netlist;

pub use design::{BinaryOp, Design, DesignError, Expression, Module, ModuleId, ScopeId, SignalId, UnaryOp};
pub use elab::{ElabConfig, ElabError, Elaborator, NetlistElaborator, PriorityRule};
pub use formal::{check, CheckResult, FormalConfig, FormalEngine, Verdict};
pub use netlist::{InputAssignment, Netlist, SimError};

/// Elaborates `module` with the default configuration
pub fn build(design: &Design, module: ModuleId) -> Result<Netlist, ElabError> {
	NetlistElaborator::new(design, ElabConfig::default()).elaborate(module)
}
