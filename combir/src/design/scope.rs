use log::debug;

use super::signal::SignalBuilder;
use super::utils::is_name_valid;
use super::{
	DesignError, DesignHandle, Expression, ExpressionWidth, ModuleId, Property, ScopeId, SignalSlice,
};

/// Assignment of an expression to a signal (or a part of it)
#[derive(Clone, Debug)]
pub struct Assignment {
	/// Driven signal bits
	pub target: SignalSlice,

	/// Driving expression, truncated or zero-extended to the target width
	pub value: Expression,

	/// Declaration order within the design
	pub seq: usize,
}

/// A scope groups assignments and obligations which share a common condition
#[derive(Clone, Debug)]
pub struct Scope {
	/// Self-reference
	pub(super) id: ScopeId,

	/// Module the scope belongs to
	pub(super) module: ModuleId,

	/// Enclosing scope (`None` for the module's main scope)
	pub(super) parent: Option<ScopeId>,

	/// Condition that has to hold on top of the parent's for the scope to be active
	pub(super) condition: Option<Expression>,

	/// Nesting depth, the main scope has depth 0
	pub(super) depth: u32,

	pub(super) assignments: Vec<Assignment>,
	pub(super) properties: Vec<Property>,

	/// Child scopes in declaration order
	pub(super) subscopes: Vec<ScopeId>,
}

impl Scope {
	pub(super) fn new(
		id: ScopeId,
		module: ModuleId,
		parent: Option<ScopeId>,
		condition: Option<Expression>,
		depth: u32,
	) -> Self {
		Self {
			id,
			module,
			parent,
			condition,
			depth,
			assignments: vec![],
			properties: vec![],
			subscopes: vec![],
		}
	}

	pub fn id(&self) -> ScopeId {
		self.id
	}

	pub fn module(&self) -> ModuleId {
		self.module
	}

	pub fn parent(&self) -> Option<ScopeId> {
		self.parent
	}

	pub fn condition(&self) -> Option<&Expression> {
		self.condition.as_ref()
	}

	pub fn depth(&self) -> u32 {
		self.depth
	}

	pub fn assignments(&self) -> &[Assignment] {
		&self.assignments
	}

	pub fn properties(&self) -> &[Property] {
		&self.properties
	}

	pub fn subscopes(&self) -> &[ScopeId] {
		&self.subscopes
	}
}

/// References a scope in the design
#[derive(Clone)]
pub struct ScopeHandle {
	design: DesignHandle,
	scope: ScopeId,
}

impl ScopeHandle {
	pub fn new(design: DesignHandle, scope: ScopeId) -> Self {
		Self { design, scope }
	}

	pub fn id(&self) -> ScopeId {
		self.scope
	}

	fn module(&self) -> Result<ModuleId, DesignError> {
		self.design
			.borrow()
			.get_scope(self.scope)
			.map(|s| s.module)
			.ok_or(DesignError::InvalidScopeId(self.scope))
	}

	/// Creates a child scope active when `condition` is non-zero
	fn new_child_scope(&mut self, condition: Expression) -> Result<ScopeHandle, DesignError> {
		let module = self.module()?;
		let mut core = self.design.borrow_mut();
		condition.width(&core)?;
		core.new_scope(module, Some(self.scope), Some(condition))
	}

	/// Starts building a new signal owned by the module of this scope
	pub fn new_signal(&mut self, name: &str) -> Result<SignalBuilder, DesignError> {
		Ok(SignalBuilder::new(self.design.clone(), self.module()?, name))
	}

	/// Creates a scope whose assignments only apply if `condition` is true
	pub fn if_scope(&mut self, condition: Expression) -> Result<ScopeHandle, DesignError> {
		self.new_child_scope(condition)
	}

	/// Creates a pair of scopes, the second one active exactly when the first is not
	pub fn if_else_scope(&mut self, condition: Expression) -> Result<(ScopeHandle, ScopeHandle), DesignError> {
		let on_true = self.new_child_scope(condition.clone())?;
		let on_false = self.new_child_scope(condition.logical_not())?;
		Ok((on_true, on_false))
	}

	/// Starts a switch statement on `subject`. Cases are added through the returned handle.
	pub fn switch_scope(&mut self, subject: Expression) -> Result<SwitchHandle, DesignError> {
		subject.width(&self.design.borrow())?;
		Ok(SwitchHandle {
			scope: self.clone(),
			subject,
			cases: vec![],
			has_default: false,
		})
	}

	/// Drives `target` with `value` whenever this scope is active
	pub fn assign(&mut self, target: impl Into<SignalSlice>, value: Expression) -> Result<(), DesignError> {
		let target = target.into();
		let mut core = self.design.borrow_mut();

		let signal_width = core
			.get_signal(target.signal.signal)
			.map(|s| s.width())
			.ok_or(DesignError::InvalidSignalId(target.signal.signal))?;
		let (_, target_width) = target.lsb_width(signal_width)?;

		let value_width = value.width(&core)?;
		if value_width != target_width {
			debug!(
				"Assignment resizes {}-bit value to {}-bit target {:?}",
				value_width, target_width, target
			);
		}

		let seq = core.next_seq();
		core.get_scope_mut(self.scope)
			.ok_or(DesignError::InvalidScopeId(self.scope))?
			.assignments
			.push(Assignment { target, value, seq });
		Ok(())
	}

	/// Adds a property whose guard is combined with the conditions of this scope
	pub fn add_property(&mut self, mut property: Property) -> Result<(), DesignError> {
		if !is_name_valid(&property.name) {
			return Err(DesignError::InvalidName(property.name));
		}

		let mut core = self.design.borrow_mut();
		property.predicate.width(&core)?;
		if let Some(guard) = &property.guard {
			guard.width(&core)?;
		}

		property.seq = core.next_seq();
		core.get_scope_mut(self.scope)
			.ok_or(DesignError::InvalidScopeId(self.scope))?
			.properties
			.push(property);
		Ok(())
	}

	/// Declares that `predicate` holds for every input for which this scope is active
	pub fn assert_that(&mut self, name: &str, predicate: Expression) -> Result<(), DesignError> {
		self.add_property(Property::assert(name, predicate))
	}

	/// Declares that some input activates this scope and satisfies `predicate`
	pub fn cover(&mut self, name: &str, predicate: Expression) -> Result<(), DesignError> {
		self.add_property(Property::cover(name, predicate))
	}
}

/// Builds case scopes of a switch statement.
///
/// Only the first matching case is active. The default scope is active when no case matches.
pub struct SwitchHandle {
	scope: ScopeHandle,
	subject: Expression,

	/// Match conditions of the cases declared so far
	cases: Vec<Expression>,
	has_default: bool,
}

impl SwitchHandle {
	/// Condition true if any of the previous cases matched
	fn earlier_match(&self) -> Option<Expression> {
		self.cases.iter().cloned().reduce(|acc, c| acc.logical_or(c))
	}

	/// Adds a case matching any of `values`
	pub fn case(&mut self, values: &[u64]) -> Result<ScopeHandle, DesignError> {
		if self.has_default {
			return Err(DesignError::CaseAfterDefault);
		}

		let hit = values
			.iter()
			.map(|v| self.subject.clone().eq(*v))
			.reduce(|acc, c| acc.logical_or(c))
			.unwrap_or_else(Expression::new_zero);

		let guard = match self.earlier_match() {
			Some(earlier) => earlier.logical_not().logical_and(hit.clone()),
			None => hit.clone(),
		};

		self.cases.push(hit);
		self.scope.new_child_scope(guard)
	}

	/// Adds the default case
	pub fn default(&mut self) -> Result<ScopeHandle, DesignError> {
		if self.has_default {
			return Err(DesignError::DuplicateDefault);
		}
		self.has_default = true;

		let guard = match self.earlier_match() {
			Some(earlier) => earlier.logical_not(),
			None => Expression::new_one(),
		};

		self.scope.new_child_scope(guard)
	}
}
