use super::{DesignError, DesignHandle, InstanceId, ModuleId, SignalRef};

/// Instance of a module inside another module
#[derive(Clone, Debug)]
pub struct ModuleInstance {
	/// Self-reference
	pub(super) id: InstanceId,

	/// Module containing the instance
	pub parent: ModuleId,

	/// Instantiated module
	pub module: ModuleId,

	/// Instance name, used as a prefix of the flattened signal names
	pub name: String,
}

impl ModuleInstance {
	pub(super) fn new(id: InstanceId, parent: ModuleId, module: ModuleId, name: &str) -> Self {
		Self {
			id,
			parent,
			module,
			name: name.into(),
		}
	}

	pub fn id(&self) -> InstanceId {
		self.id
	}
}

/// References a module instance in the design
#[derive(Clone)]
pub struct InstanceHandle {
	design: DesignHandle,
	id: InstanceId,
}

impl InstanceHandle {
	pub(super) fn new(design: DesignHandle, id: InstanceId) -> Self {
		Self { design, id }
	}

	pub fn id(&self) -> InstanceId {
		self.id
	}

	/// Returns the instantiated module
	pub fn module(&self) -> Result<ModuleId, DesignError> {
		self.design
			.borrow()
			.get_instance(self.id)
			.map(|i| i.module)
			.ok_or(DesignError::InvalidInstanceId(self.id))
	}

	/// References an interface signal of the instantiated module by name.
	///
	/// The parent module drives input ports and reads output ports through the returned reference.
	pub fn port(&self, name: &str) -> Result<SignalRef, DesignError> {
		let core = self.design.borrow();
		let instance = core.get_instance(self.id).ok_or(DesignError::InvalidInstanceId(self.id))?;
		let module = core
			.get_module(instance.module)
			.ok_or(DesignError::InvalidModuleId(instance.module))?;

		module
			.interface
			.iter()
			.find(|i| core.get_signal(i.signal).map_or(false, |s| s.name == name))
			.map(|i| SignalRef {
				instance: Some(self.id),
				signal: i.signal,
			})
			.ok_or_else(|| DesignError::InvalidInterfaceSignalName(name.into()))
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::design::{Design, SignalDirection};

	#[test]
	fn test_ports() -> Result<(), DesignError> {
		let mut d = Design::new();
		let mut leaf = d.new_module("leaf")?;
		let cells = leaf.input("in_cells", 9)?;
		leaf.scope().new_signal("hidden")?.unsigned(1).build()?;
		let state = leaf.scope().new_signal("out_state")?.unsigned(1).build()?;
		leaf.expose(state, SignalDirection::Output)?;

		let mut top = d.new_module("top")?;
		let inst = top.instantiate(leaf.id(), "tl")?;

		assert_eq!(inst.port("in_cells")?.signal, cells);
		assert_eq!(inst.port("out_state")?.instance, Some(inst.id()));
		assert_eq!(inst.module()?, leaf.id());
		assert!(matches!(
			inst.port("hidden"),
			Err(DesignError::InvalidInterfaceSignalName(_))
		));
		Ok(())
	}
}
