use super::{
	DesignError, DesignHandle, InstanceHandle, InstanceId, ModuleId, ScopeHandle, ScopeId, SignalDirection, SignalId,
};

/// Represents a signal exposed to a module interface
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterfaceSignal {
	pub signal: SignalId,
	pub direction: SignalDirection,
}

impl InterfaceSignal {
	pub fn is_input(&self) -> bool {
		self.direction == SignalDirection::Input
	}

	pub fn is_output(&self) -> bool {
		self.direction == SignalDirection::Output
	}
}

/// Represents a combinational circuit
#[derive(Clone, Debug)]
pub struct Module {
	/// Self-reference
	pub(super) id: ModuleId,

	/// Name of the module
	pub name: String,

	/// Main scope of the module
	pub main_scope: ScopeId,

	/// Signals exposed to the module interface
	pub interface: Vec<InterfaceSignal>,

	/// All signals owned by the module, in declaration order
	pub signals: Vec<SignalId>,

	/// Submodule instances, in declaration order
	pub instances: Vec<InstanceId>,
}

impl Module {
	/// Creates a new module
	pub(super) fn new(name: String) -> Self {
		Self {
			id: ModuleId { id: 0 },
			name,
			main_scope: ScopeId { id: 0 },
			interface: vec![],
			signals: vec![],
			instances: vec![],
		}
	}

	pub fn id(&self) -> ModuleId {
		self.id
	}

	pub fn inputs(&self) -> impl Iterator<Item = SignalId> + '_ {
		self.interface.iter().filter(|i| i.is_input()).map(|i| i.signal)
	}

	pub fn outputs(&self) -> impl Iterator<Item = SignalId> + '_ {
		self.interface.iter().filter(|i| i.is_output()).map(|i| i.signal)
	}
}

/// References a module in the design
#[derive(Clone)]
pub struct ModuleHandle {
	/// Handle to the design
	design: DesignHandle,

	/// ID of the module
	id: ModuleId,
}

impl ModuleHandle {
	/// Creates a new module handle
	pub(super) fn new(design: DesignHandle, id: ModuleId) -> Self {
		Self { design, id }
	}

	pub fn id(&self) -> ModuleId {
		self.id
	}

	pub fn design(&self) -> DesignHandle {
		self.design.clone()
	}

	pub fn name(&self) -> String {
		self.design
			.borrow()
			.get_module(self.id)
			.map(|m| m.name.clone())
			.unwrap_or_default()
	}

	/// Returns a handle to the module's main scope
	pub fn scope(&self) -> ScopeHandle {
		let main_scope = self
			.design
			.borrow()
			.get_module(self.id)
			.map(|m| m.main_scope)
			.unwrap_or(ScopeId { id: 0 });
		ScopeHandle::new(self.design.clone(), main_scope)
	}

	/// Returns a copy of the module interface
	pub fn interface(&self) -> Vec<InterfaceSignal> {
		self.design
			.borrow()
			.get_module(self.id)
			.map(|m| m.interface.clone())
			.unwrap_or_default()
	}

	/// Exposes a signal to the module interface
	pub fn expose(&mut self, signal: SignalId, direction: SignalDirection) -> Result<(), DesignError> {
		let mut core = self.design.borrow_mut();
		let sig = core.get_signal_mut(signal).ok_or(DesignError::InvalidSignalId(signal))?;

		if sig.module != self.id {
			return Err(DesignError::ForeignInterfaceSignal(signal));
		}

		if sig.direction.is_some() {
			return Err(DesignError::DuplicateInterfaceBinding(signal));
		}

		sig.direction = Some(direction);
		core.get_module_mut(self.id)
			.ok_or(DesignError::InvalidModuleId(self.id))?
			.interface
			.push(InterfaceSignal { signal, direction });
		Ok(())
	}

	/// Creates an unsigned input signal and exposes it
	pub fn input(&mut self, name: &str, width: u32) -> Result<SignalId, DesignError> {
		let signal = self.scope().new_signal(name)?.unsigned(width).build()?;
		self.expose(signal, SignalDirection::Input)?;
		Ok(signal)
	}

	/// Creates an unsigned output signal and exposes it
	pub fn output(&mut self, name: &str, width: u32) -> Result<SignalId, DesignError> {
		let signal = self.scope().new_signal(name)?.unsigned(width).build()?;
		self.expose(signal, SignalDirection::Output)?;
		Ok(signal)
	}

	/// Instantiates `module` inside this module under `name`
	pub fn instantiate(&mut self, module: ModuleId, name: &str) -> Result<InstanceHandle, DesignError> {
		let id = self.design.borrow_mut().add_instance(self.id, module, name)?;
		Ok(InstanceHandle::new(self.design.clone(), id))
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::design::Design;

	#[test]
	fn test_expose() -> Result<(), DesignError> {
		let mut d = Design::new();
		let mut m = d.new_module("adder")?;
		let a = m.input("a", 4)?;
		let y = m.output("y", 5)?;
		let internal = m.scope().new_signal("internal")?.unsigned(3).build()?;

		assert!(matches!(
			m.expose(a, SignalDirection::Output),
			Err(DesignError::DuplicateInterfaceBinding(_))
		));

		let mut other = d.new_module("other")?;
		assert!(matches!(
			other.expose(internal, SignalDirection::Input),
			Err(DesignError::ForeignInterfaceSignal(_))
		));

		let core = d.borrow();
		let module = core.get_module(m.id()).unwrap();
		assert_eq!(module.inputs().collect::<Vec<_>>(), vec![a]);
		assert_eq!(module.outputs().collect::<Vec<_>>(), vec![y]);
		assert_eq!(module.signals.len(), 3);
		Ok(())
	}

	#[test]
	fn test_instance_names() -> Result<(), DesignError> {
		let mut d = Design::new();
		let leaf = d.new_module("leaf")?;
		let mut top = d.new_module("top")?;

		top.instantiate(leaf.id(), "tl")?;
		top.instantiate(leaf.id(), "tr")?;
		assert!(matches!(
			top.instantiate(leaf.id(), "tl"),
			Err(DesignError::InstanceNameConflict(_))
		));
		assert!(matches!(top.instantiate(leaf.id(), "t.l"), Err(DesignError::InvalidName(_))));
		assert_eq!(top.name(), "top");
		Ok(())
	}
}
