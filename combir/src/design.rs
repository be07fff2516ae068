pub mod design_error;
pub mod expression;
pub mod expression_ops;
pub mod instance;
pub mod module;
pub mod property;
pub mod scope;
pub mod signal;
mod utils;

pub(crate) use expression::{check_slice, concat_width};

pub use design_error::{DesignError, SignalNameConflictError, SliceOutOfRangeError};
pub use expression::{
	BinaryExpression, BinaryOp, ConditionalBranch, ConditionalExpression, Expression, ExpressionWidth,
	NumericConstant, SliceExpression, UnaryExpression, UnaryOp,
};
pub use instance::{InstanceHandle, ModuleInstance};
pub use module::{InterfaceSignal, Module, ModuleHandle};
pub use property::{Property, PropertyKind};
pub use scope::{Assignment, Scope, ScopeHandle, SwitchHandle};
pub use signal::{Domain, Signal, SignalBuilder, SignalDirection, SignalRef, SignalShape, SignalSlice};

use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};

/// Widest signal (and expression result) the design can represent
pub const MAX_SIGNAL_WIDTH: u32 = 64;

/// References a module in a design
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct ModuleId {
	id: usize,
}

impl ModuleId {
	/// Checks if the reference is valid
	pub fn is_null(&self) -> bool {
		self.id == 0
	}
}

/// References a signal in a design
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct SignalId {
	id: usize,
}

impl SignalId {
	/// Checks if the reference is valid
	pub fn is_null(&self) -> bool {
		self.id == 0
	}
}

/// References a scope in a design
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct ScopeId {
	id: usize,
}

impl ScopeId {
	/// Checks if the reference is valid
	pub fn is_null(&self) -> bool {
		self.id == 0
	}
}

/// References a module instance in a design
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct InstanceId {
	id: usize,
}

/// Core part of the design representation.
/// Referred to via multiple handles with reference counting.
pub struct DesignCore {
	weak: WeakDesignHandle,
	modules: Vec<Module>,
	scopes: Vec<Scope>,
	signals: Vec<Signal>,
	instances: Vec<ModuleInstance>,
	next_seq: usize,
}

impl DesignCore {
	/// Creates a new empty design
	fn new() -> Self {
		Self {
			weak: WeakDesignHandle::new(),
			modules: Vec::new(),
			scopes: Vec::new(),
			signals: Vec::new(),
			instances: Vec::new(),
			next_seq: 1,
		}
	}

	fn handle(&self) -> Result<DesignHandle, DesignError> {
		self.weak.upgrade().ok_or(DesignError::NotInDesign)
	}

	/// Returns the next declaration sequence number.
	/// Every assignment and obligation gets one, so source order survives elaboration.
	pub(super) fn next_seq(&mut self) -> usize {
		let seq = self.next_seq;
		self.next_seq += 1;
		seq
	}

	/// Creates a new scope and adds it to the design
	pub(super) fn new_scope(
		&mut self,
		module: ModuleId,
		parent: Option<ScopeId>,
		condition: Option<Expression>,
	) -> Result<ScopeHandle, DesignError> {
		let id = ScopeId {
			id: self.scopes.len() + 1,
		};

		let depth = match parent {
			Some(parent_id) => {
				let parent_scope = self.get_scope_mut(parent_id).ok_or(DesignError::InvalidScopeId(parent_id))?;
				parent_scope.subscopes.push(id);
				parent_scope.depth + 1
			},
			None => 0,
		};

		self.scopes.push(Scope::new(id, module, parent, condition, depth));
		Ok(ScopeHandle::new(self.handle()?, id))
	}

	/// Adds an existing signal to the design
	///
	/// Performs check for conflicting signal names within the owning module.
	pub(super) fn add_signal(&mut self, signal: Signal) -> Result<SignalId, DesignError> {
		let id = SignalId {
			id: self.signals.len() + 1,
		};

		let module = self
			.get_module(signal.module)
			.ok_or(DesignError::InvalidModuleId(signal.module))?;

		for other_id in &module.signals {
			let other = self.get_signal(*other_id).ok_or(DesignError::InvalidSignalId(*other_id))?;
			if other.name == signal.name {
				return Err(SignalNameConflictError {
					module: module.name.clone(),
					name: signal.name,
				}
				.into());
			}
		}

		let mut sig = signal;
		sig.id = id;
		let module_id = sig.module;
		self.signals.push(sig);
		self.get_module_mut(module_id)
			.ok_or(DesignError::InvalidModuleId(module_id))?
			.signals
			.push(id);
		Ok(id)
	}

	/// Adds an existing module to the design
	fn add_module(&mut self, module: Module) -> Result<ModuleId, DesignError> {
		if self.modules.iter().any(|other| other.name == module.name) {
			return Err(DesignError::ModuleNameConflict(module.name));
		}

		let id = ModuleId {
			id: self.modules.len() + 1,
		};
		let mut m = module;
		m.id = id;
		self.modules.push(m);
		Ok(id)
	}

	/// Registers a new instance of `module` inside `parent`
	pub(super) fn add_instance(
		&mut self,
		parent: ModuleId,
		module: ModuleId,
		name: &str,
	) -> Result<InstanceId, DesignError> {
		if !utils::is_name_valid(name) {
			return Err(DesignError::InvalidName(name.into()));
		}
		self.get_module(module).ok_or(DesignError::InvalidModuleId(module))?;

		let parent_module = self.get_module(parent).ok_or(DesignError::InvalidModuleId(parent))?;
		for other in &parent_module.instances {
			if self.get_instance(*other).map(|i| i.name.as_str()) == Some(name) {
				return Err(DesignError::InstanceNameConflict(name.into()));
			}
		}

		let id = InstanceId {
			id: self.instances.len() + 1,
		};
		self.instances.push(ModuleInstance::new(id, parent, module, name));
		self.get_module_mut(parent)
			.ok_or(DesignError::InvalidModuleId(parent))?
			.instances
			.push(id);
		Ok(id)
	}

	/// Returns a mutable reference to the scope with the given ID
	pub(super) fn get_scope_mut(&mut self, scope: ScopeId) -> Option<&mut Scope> {
		self.scopes.get_mut(scope.id.checked_sub(1)?)
	}

	/// Returns a reference to the scope with the given ID
	pub fn get_scope(&self, scope: ScopeId) -> Option<&Scope> {
		self.scopes.get(scope.id.checked_sub(1)?)
	}

	/// Returns a mutable reference to the module with the given ID
	pub(super) fn get_module_mut(&mut self, module: ModuleId) -> Option<&mut Module> {
		self.modules.get_mut(module.id.checked_sub(1)?)
	}

	/// Returns a reference to the module with the given ID
	pub fn get_module(&self, module: ModuleId) -> Option<&Module> {
		self.modules.get(module.id.checked_sub(1)?)
	}

	/// Returns a mutable reference to the signal with the given ID
	pub(super) fn get_signal_mut(&mut self, signal: SignalId) -> Option<&mut Signal> {
		self.signals.get_mut(signal.id.checked_sub(1)?)
	}

	/// Returns a reference to the signal with the given ID
	pub fn get_signal(&self, signal: SignalId) -> Option<&Signal> {
		self.signals.get(signal.id.checked_sub(1)?)
	}

	/// Returns a reference to the instance with the given ID
	pub fn get_instance(&self, instance: InstanceId) -> Option<&ModuleInstance> {
		self.instances.get(instance.id.checked_sub(1)?)
	}

	/// Creates a new module in the design
	pub fn new_module(&mut self, name: &str) -> Result<ModuleHandle, DesignError> {
		if !utils::is_name_valid(name) {
			return Err(DesignError::InvalidName(name.into()));
		}

		let id = self.add_module(Module::new(name.into()))?;
		let main_scope = self.new_scope(id, None, None)?;
		self.get_module_mut(id).ok_or(DesignError::InvalidModuleId(id))?.main_scope = main_scope.id();
		Ok(ModuleHandle::new(self.handle()?, id))
	}
}

/// Weak reference to a design
pub type WeakDesignHandle = Weak<RefCell<DesignCore>>;

/// Strong reference to a design
pub type DesignHandle = Rc<RefCell<DesignCore>>;

/// Represents a combinational hardware design
pub struct Design {
	handle: DesignHandle,
}

impl Default for Design {
	fn default() -> Self {
		Self::new()
	}
}

impl Design {
	/// Creates a new empty design
	pub fn new() -> Self {
		let d = Self {
			handle: Rc::new(RefCell::new(DesignCore::new())),
		};

		d.handle.borrow_mut().weak = Rc::downgrade(&d.handle);
		d
	}

	pub fn borrow(&self) -> Ref<'_, DesignCore> {
		self.handle.borrow()
	}

	pub fn handle(&self) -> DesignHandle {
		self.handle.clone()
	}

	/// Creates a new module with provided name and returns a handle to it
	pub fn new_module(&mut self, name: &str) -> Result<ModuleHandle, DesignError> {
		self.handle.borrow_mut().new_module(name)
	}

	pub fn get_module_handle(&self, module: ModuleId) -> Option<ModuleHandle> {
		self.handle.borrow().get_module(module)?;
		Some(ModuleHandle::new(self.handle.clone(), module))
	}

	/// Looks up a module by name
	pub fn find_module(&self, name: &str) -> Option<ModuleId> {
		self.handle
			.borrow()
			.modules
			.iter()
			.find(|m| m.name == name)
			.map(|m| m.id)
	}

	pub fn get_signal(&self, signal: SignalId) -> Option<Signal> {
		self.handle.borrow().get_signal(signal).cloned()
	}

	/// Creates a verification harness around `dut`.
	///
	/// The harness instantiates `dut` as `dut` and mirrors every input of it
	/// with an identically shaped harness input wired straight through, so the
	/// harness inputs span exactly the input space of the device.
	pub fn new_harness(&mut self, dut: ModuleId, name: &str) -> Result<(ModuleHandle, InstanceHandle), DesignError> {
		let mut harness = self.new_module(name)?;
		let inst = harness.instantiate(dut, "dut")?;

		let inputs: Vec<(String, SignalId)> = {
			let core = self.handle.borrow();
			let module = core.get_module(dut).ok_or(DesignError::InvalidModuleId(dut))?;
			module
				.interface
				.iter()
				.filter(|i| i.direction == SignalDirection::Input)
				.map(|i| {
					core.get_signal(i.signal)
						.map(|sig| (sig.name.clone(), i.signal))
						.ok_or(DesignError::InvalidSignalId(i.signal))
				})
				.collect::<Result<_, _>>()?
		};

		for (port_name, port_id) in inputs {
			let mirror = harness.scope().new_signal(&port_name)?.like(port_id).build()?;
			harness.expose(mirror, SignalDirection::Input)?;
			harness.scope().assign(inst.port(&port_name)?, mirror.into())?;
		}

		Ok((harness, inst))
	}
}
