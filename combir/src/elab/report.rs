use std::fmt::Display;

use log::debug;
use thiserror::Error;

pub trait SeverityPolicy {
	fn severity(&self, kind: &ElabMessageKind) -> ElabMessageSeverity;
}

pub struct DefaultSeverityPolicy;

impl SeverityPolicy for DefaultSeverityPolicy {
	fn severity(&self, kind: &ElabMessageKind) -> ElabMessageSeverity {
		use ElabMessageKind::*;
		use ElabMessageSeverity::*;
		match kind {
			SignalNotDriven { .. } => Warning,
			SignalPartiallyDriven { .. } => Warning,
			InstanceInputNotBound { .. } => Warning,
			InputUnused { .. } => Info,
			WidthMismatch { .. } => Info,
		}
	}
}

/// Treats every message as an error
pub struct StrictSeverityPolicy;

impl SeverityPolicy for StrictSeverityPolicy {
	fn severity(&self, _kind: &ElabMessageKind) -> ElabMessageSeverity {
		ElabMessageSeverity::Error
	}
}

#[derive(Clone, Debug, Default)]
pub struct ElabReport {
	messages: Vec<ElabMessage>,
}

impl ElabReport {
	pub fn add_message(&mut self, msg: ElabMessage) {
		debug!("Elab message: {}", msg);
		self.messages.push(msg);
	}

	pub fn messages(&self) -> &[ElabMessage] {
		&self.messages
	}

	/// Messages with at least the given severity under `policy`
	pub fn filter<'a>(
		&'a self,
		policy: &'a dyn SeverityPolicy,
		min: ElabMessageSeverity,
	) -> impl Iterator<Item = &'a ElabMessage> + 'a {
		self.messages.iter().filter(move |m| m.severity(policy) >= min)
	}

	pub fn has_errors(&self, policy: &dyn SeverityPolicy) -> bool {
		self.filter(policy, ElabMessageSeverity::Error).next().is_some()
	}
}

#[derive(Clone, Debug)]
pub struct ElabMessage {
	kind: ElabMessageKind,
	module: String,
}

impl ElabMessage {
	pub fn new(kind: ElabMessageKind, module: &str) -> Self {
		Self {
			kind,
			module: module.into(),
		}
	}

	pub fn kind(&self) -> &ElabMessageKind {
		&self.kind
	}

	pub fn default_severity(&self) -> ElabMessageSeverity {
		DefaultSeverityPolicy.severity(&self.kind)
	}

	pub fn severity(&self, policy: &dyn SeverityPolicy) -> ElabMessageSeverity {
		policy.severity(&self.kind)
	}

	/// Name of the module the message originates from
	pub fn module(&self) -> &str {
		&self.module
	}
}

impl Display for ElabMessage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:?}: {} (in {})", self.default_severity(), self.kind(), self.module)
	}
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum ElabMessageSeverity {
	Info,
	Warning,
	Error,
}

#[derive(Clone, Debug, Error)]
pub enum ElabMessageKind {
	#[error("Signal '{signal}' has no driver and keeps its initial value")]
	SignalNotDriven { signal: String },

	#[error("Bits {bits:?} of signal '{signal}' have no driver")]
	SignalPartiallyDriven { signal: String, bits: Vec<(u32, u32)> },

	#[error("Instance input '{signal}' is not bound")]
	InstanceInputNotBound { signal: String },

	#[error("Input '{signal}' is not being used")]
	InputUnused { signal: String },

	#[error("{value_width}-bit value assigned to {target_width}-bit target '{signal}'")]
	WidthMismatch {
		signal: String,
		target_width: u32,
		value_width: u32,
	},
}
