mod config;
mod drive_mask;
mod flatten;
mod report;
mod template;

pub use config::{ElabConfig, PriorityRule};
pub use drive_mask::SignalMask;
pub use flatten::NetlistElaborator;
pub use report::{
	DefaultSeverityPolicy, ElabMessage, ElabMessageKind, ElabMessageSeverity, ElabReport, SeverityPolicy,
	StrictSeverityPolicy,
};

use thiserror::Error;

use crate::design::{DesignError, ModuleId};
use crate::netlist::Netlist;

#[derive(Clone, Debug)]
pub struct OverlappingDriverError {
	pub module: String,
	pub signal: String,
	pub lsb: u32,
	pub msb: u32,
}

#[derive(Clone, Debug)]
pub struct UnresolvedReferenceError {
	pub module: String,
	pub detail: String,
}

impl From<OverlappingDriverError> for ElabError {
	fn from(err: OverlappingDriverError) -> Self {
		Self::OverlappingDriver(Box::new(err))
	}
}

impl From<UnresolvedReferenceError> for ElabError {
	fn from(err: UnresolvedReferenceError) -> Self {
		Self::UnresolvedReference(Box::new(err))
	}
}

#[derive(Clone, Debug, Error)]
pub enum ElabError {
	#[error(
		"Bits {}..={} of '{}' in module '{}' are driven more than once in the same scope",
		.0.lsb, .0.msb, .0.signal, .0.module
	)]
	OverlappingDriver(Box<OverlappingDriverError>),

	#[error("Unresolved reference in module '{}': {}", .0.module, .0.detail)]
	UnresolvedReference(Box<UnresolvedReferenceError>),

	#[error("Signal '{signal}' cannot be driven from module '{module}'")]
	NotDrivable { module: String, signal: String },

	#[error("Signal '{signal}' is {width} bits wide, which exceeds the configured limit")]
	SignalTooWide { signal: String, width: u32 },

	#[error("The design contains a combinational loop through {nets:?}")]
	CombLoop { nets: Vec<String> },

	#[error("Module '{module}' instantiates itself")]
	RecursiveInstance { module: String },

	#[error("Instance hierarchy is deeper than {0} levels")]
	InstanceDepthExceeded(usize),

	#[error("Elaboration of '{module}' reported {count} error(s)")]
	Report { module: String, count: usize },

	#[error("Module to elaborate is not part of the design")]
	InvalidModule(ModuleId),

	#[error("Invalid design")]
	Design(#[from] DesignError),
}

/// Trait which must be implemented by all elaborators
pub trait Elaborator {
	fn elaborate(&mut self, id: ModuleId) -> Result<Netlist, ElabError>;
}
