use std::str::FromStr;

/// Decides which of several simultaneously active assignments drives a signal
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PriorityRule {
	/// The assignment in the most deeply nested scope wins, ties go to the earliest declared one
	#[default]
	NarrowestFirst,

	/// The assignment declared last wins
	LastDeclared,
}

impl FromStr for PriorityRule {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"narrowest" | "narrowest-first" => Ok(Self::NarrowestFirst),
			"last" | "last-declared" => Ok(Self::LastDeclared),
			_ => Err(format!("unknown priority rule '{}'", s)),
		}
	}
}

/// Elaboration limits and semantics
#[derive(Clone, Copy, Debug)]
pub struct ElabConfig {
	pub max_signal_width: u32,
	pub max_instance_depth: usize,
	pub priority: PriorityRule,

	/// Fail elaboration if the report contains any message
	pub strict: bool,
}

impl Default for ElabConfig {
	fn default() -> Self {
		ElabConfig {
			max_signal_width: 64,
			max_instance_depth: 64,
			priority: PriorityRule::default(),
			strict: false,
		}
	}
}
