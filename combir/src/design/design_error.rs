use thiserror::Error;

use super::{InstanceId, ModuleId, ScopeId, SignalId};

#[derive(Clone, Debug)]
pub struct SignalNameConflictError {
	pub module: String,
	pub name: String,
}

#[derive(Clone, Debug)]
pub struct SliceOutOfRangeError {
	pub lsb: u32,
	pub width: u32,
	pub operand_width: u32,
}

impl From<SignalNameConflictError> for DesignError {
	fn from(err: SignalNameConflictError) -> Self {
		Self::SignalNameConflict(Box::new(err))
	}
}

impl From<SliceOutOfRangeError> for DesignError {
	fn from(err: SliceOutOfRangeError) -> Self {
		Self::SliceOutOfRange(Box::new(err))
	}
}

/// Represents an error that can occur during circuit construction.
/// Elaboration errors are not accounted for here.
#[derive(Clone, Debug, Error)]
pub enum DesignError {
	#[error("This object is not part of any design")]
	NotInDesign,

	#[error("Invalid name '{0}'")]
	InvalidName(String),

	#[error("Invalid module ID")]
	InvalidModuleId(ModuleId),

	#[error("Invalid scope ID")]
	InvalidScopeId(ScopeId),

	#[error("Invalid signal ID")]
	InvalidSignalId(SignalId),

	#[error("Invalid instance ID")]
	InvalidInstanceId(InstanceId),

	#[error("Signal is already part of the module interface")]
	DuplicateInterfaceBinding(SignalId),

	#[error("Signal does not belong to the module it is exposed from")]
	ForeignInterfaceSignal(SignalId),

	#[error("Instantiated module has no interface signal named '{0}'")]
	InvalidInterfaceSignalName(String),

	#[error("Signal shape not specified")]
	SignalShapeNotSpecified,

	#[error("Invalid signal width {0} (must be between 1 and 64)")]
	InvalidSignalWidth(u32),

	#[error("Invalid signal range [{lo}, {hi}]")]
	InvalidSignalRange { lo: u64, hi: u64 },

	#[error("Initial value {0} does not fit the signal shape")]
	InvalidInitialValue(u64),

	#[error("Numeric constant width is not sufficient to store the provided value")]
	NumericConstantWidthTooSmall,

	#[error("Bit slice is out of range of the sliced expression")]
	SliceOutOfRange(Box<SliceOutOfRangeError>),

	#[error("Empty bit slice")]
	EmptySlice,

	#[error("Concatenation of nothing")]
	EmptyConcat,

	#[error("Expression is {0} bits wide, which exceeds the maximum width")]
	ExpressionTooWide(u32),

	#[error("Switch case declared after the default branch")]
	CaseAfterDefault,

	#[error("Switch already has a default branch")]
	DuplicateDefault,

	#[error("Signal name conflict in module")]
	SignalNameConflict(Box<SignalNameConflictError>),

	#[error("Module name conflict: '{0}'")]
	ModuleNameConflict(String),

	#[error("Instance name conflict: '{0}'")]
	InstanceNameConflict(String),
}
