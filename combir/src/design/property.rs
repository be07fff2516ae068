use std::fmt::Display;

use super::Expression;

/// Kind of a verification obligation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKind {
	/// Predicate must hold for every input satisfying the guard
	Assert,

	/// Predicate must hold for at least one input satisfying the guard
	Cover,
}

impl Display for PropertyKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Assert => write!(f, "assert"),
			Self::Cover => write!(f, "cover"),
		}
	}
}

/// Assert or cover claim declared against the signals of a module
#[derive(Clone, Debug)]
pub struct Property {
	pub name: String,
	pub kind: PropertyKind,

	/// Additional guard, `None` meaning always true
	pub guard: Option<Expression>,
	pub predicate: Expression,

	pub(super) seq: usize,
}

impl Property {
	fn new(name: &str, kind: PropertyKind, predicate: Expression) -> Self {
		Self {
			name: name.into(),
			kind,
			guard: None,
			predicate,
			seq: 0,
		}
	}

	pub fn assert(name: &str, predicate: Expression) -> Self {
		Self::new(name, PropertyKind::Assert, predicate)
	}

	pub fn cover(name: &str, predicate: Expression) -> Self {
		Self::new(name, PropertyKind::Cover, predicate)
	}

	/// Restricts the property to inputs for which `guard` is true
	pub fn with_guard(mut self, guard: Expression) -> Self {
		self.guard = Some(match self.guard {
			Some(g) => g.logical_and(guard),
			None => guard,
		});
		self
	}

	/// Declaration order within the design
	pub fn seq(&self) -> usize {
		self.seq
	}
}
