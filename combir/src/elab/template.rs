use std::collections::{BTreeMap, HashMap};

use log::{debug, error};

use super::{ElabConfig, ElabError, OverlappingDriverError, SignalMask, UnresolvedReferenceError};
use crate::design::{
	Assignment, DesignCore, DesignError, Domain, Expression, InstanceId, ModuleId, Property, ScopeId,
	SignalDirection, SignalId, SignalRef,
};

/// Signal of an elaborated module
#[derive(Clone, Debug)]
pub(super) struct TemplateSignal {
	pub id: SignalId,
	pub name: String,
	pub width: u32,
	pub domain: Domain,
	pub initial: u64,
	pub direction: Option<SignalDirection>,
}

#[derive(Clone, Debug)]
pub(super) struct TemplateInstance {
	pub id: InstanceId,
	pub name: String,
	pub module: ModuleId,
}

/// Assignment together with everything needed to rank it against other drivers of the same bits
#[derive(Clone, Debug)]
pub(super) struct Driver {
	pub lsb: u32,
	pub width: u32,
	pub value: Expression,

	/// Conjunction of the enclosing scope conditions, `None` in the main scope
	pub guard: Option<Expression>,
	pub depth: u32,
	pub seq: usize,
}

#[derive(Clone, Debug)]
pub(super) struct TemplateProperty {
	pub property: Property,

	/// Conjunction of the enclosing scope conditions and the property's own guard
	pub guard: Option<Expression>,
}

/// Scope-free description of a single module, shared by all of its instances
#[derive(Clone, Debug)]
pub(super) struct ModuleTemplate {
	pub id: ModuleId,
	pub name: String,
	pub signals: Vec<TemplateSignal>,

	/// Exposed signals in interface order
	pub interface: Vec<SignalId>,
	pub instances: Vec<TemplateInstance>,

	/// Drivers of own signals and of instance input ports
	pub drivers: BTreeMap<SignalRef, Vec<Driver>>,
	pub properties: Vec<TemplateProperty>,
}

fn combine_guards(outer: Option<Expression>, inner: Option<Expression>) -> Option<Expression> {
	match (outer, inner) {
		(Some(o), Some(i)) => Some(o.logical_and(i)),
		(o, None) => o,
		(None, i) => i,
	}
}

/// Gathers module contents from the design
struct TemplateBuilder<'c> {
	core: &'c DesignCore,
	module: ModuleId,
	module_name: String,
	instances: HashMap<InstanceId, ModuleId>,
}

impl<'c> TemplateBuilder<'c> {
	fn unresolved(&self, detail: String) -> ElabError {
		error!("Unresolved reference in {}: {}", self.module_name, detail);
		UnresolvedReferenceError {
			module: self.module_name.clone(),
			detail,
		}
		.into()
	}

	fn ref_name(&self, signal: &SignalRef) -> String {
		let name = self
			.core
			.get_signal(signal.signal)
			.map(|s| s.name.clone())
			.unwrap_or_else(|| format!("{:?}", signal.signal));

		match signal.instance.and_then(|i| self.core.get_instance(i)) {
			Some(instance) => format!("{}.{}", instance.name, name),
			None => name,
		}
	}

	/// Direction of the referenced signal as seen from this module.
	/// Fails if the reference is not visible here.
	fn check_ref(&self, signal: &SignalRef) -> Result<Option<SignalDirection>, ElabError> {
		let sig = self
			.core
			.get_signal(signal.signal)
			.ok_or_else(|| self.unresolved(format!("{:?}", signal.signal)))?;

		match signal.instance {
			None if sig.module == self.module => Ok(sig.direction),
			None => Err(self.unresolved(format!("'{}' belongs to another module", sig.name))),
			Some(instance) => {
				let module = self
					.instances
					.get(&instance)
					.ok_or_else(|| self.unresolved(format!("'{}' of a foreign instance", sig.name)))?;

				if sig.module != *module || sig.direction.is_none() {
					return Err(self.unresolved(format!(
						"'{}' is not a port of instance",
						self.ref_name(signal)
					)));
				}

				Ok(sig.direction)
			},
		}
	}

	fn check_expr(&self, expr: &Expression) -> Result<(), ElabError> {
		for signal in expr.signals() {
			self.check_ref(&signal)?;
		}
		Ok(())
	}

	/// Assignment targets have to be own non-input signals or instance input ports
	fn check_target(&self, target: &SignalRef) -> Result<(), ElabError> {
		let direction = self.check_ref(target)?;
		let drivable = match target.instance {
			None => direction != Some(SignalDirection::Input),
			Some(_) => direction == Some(SignalDirection::Input),
		};

		if !drivable {
			error!("Signal {} is not drivable from {}", self.ref_name(target), self.module_name);
			return Err(ElabError::NotDrivable {
				module: self.module_name.clone(),
				signal: self.ref_name(target),
			});
		}

		Ok(())
	}
}

impl ModuleTemplate {
	pub fn build(core: &DesignCore, id: ModuleId, config: &ElabConfig) -> Result<Self, ElabError> {
		let module = core.get_module(id).ok_or(ElabError::InvalidModule(id))?;
		debug!("Building template of module {}", module.name);

		let mut signals = Vec::with_capacity(module.signals.len());
		for signal_id in &module.signals {
			let signal = core
				.get_signal(*signal_id)
				.ok_or(DesignError::InvalidSignalId(*signal_id))?;

			if signal.width() > config.max_signal_width {
				return Err(ElabError::SignalTooWide {
					signal: signal.name.clone(),
					width: signal.width(),
				});
			}

			signals.push(TemplateSignal {
				id: *signal_id,
				name: signal.name.clone(),
				width: signal.width(),
				domain: signal.shape.domain(),
				initial: signal.initial,
				direction: signal.direction,
			});
		}

		let mut instances = Vec::with_capacity(module.instances.len());
		for instance_id in &module.instances {
			let instance = core
				.get_instance(*instance_id)
				.ok_or(DesignError::InvalidInstanceId(*instance_id))?;
			instances.push(TemplateInstance {
				id: *instance_id,
				name: instance.name.clone(),
				module: instance.module,
			});
		}

		let builder = TemplateBuilder {
			core,
			module: id,
			module_name: module.name.clone(),
			instances: instances.iter().map(|i| (i.id, i.module)).collect(),
		};

		let mut template = ModuleTemplate {
			id,
			name: module.name.clone(),
			signals,
			interface: module.interface.iter().map(|i| i.signal).collect(),
			instances,
			drivers: BTreeMap::new(),
			properties: vec![],
		};

		// Preorder walk from the main scope, guards accumulate on the way down
		let mut stack: Vec<(ScopeId, Option<Expression>)> = vec![(module.main_scope, None)];
		while let Some((scope_id, outer_guard)) = stack.pop() {
			let scope = core
				.get_scope(scope_id)
				.ok_or(DesignError::InvalidScopeId(scope_id))?;

			if let Some(condition) = scope.condition() {
				builder.check_expr(condition)?;
			}
			let guard = combine_guards(outer_guard, scope.condition().cloned());

			template.add_scope_drivers(&builder, scope.assignments(), &guard, scope.depth())?;

			for property in scope.properties() {
				builder.check_expr(&property.predicate)?;
				if let Some(own_guard) = &property.guard {
					builder.check_expr(own_guard)?;
				}

				template.properties.push(TemplateProperty {
					property: property.clone(),
					guard: combine_guards(guard.clone(), property.guard.clone()),
				});
			}

			for child in scope.subscopes().iter().rev() {
				stack.push((*child, guard.clone()));
			}
		}

		template.properties.sort_by_key(|p| p.property.seq());
		debug!(
			"Module {}: {} driven targets, {} properties",
			template.name,
			template.drivers.len(),
			template.properties.len()
		);
		Ok(template)
	}

	fn add_scope_drivers(
		&mut self,
		builder: &TemplateBuilder,
		assignments: &[Assignment],
		guard: &Option<Expression>,
		depth: u32,
	) -> Result<(), ElabError> {
		// Bits driven so far within this scope
		let mut driven: HashMap<SignalRef, SignalMask> = HashMap::new();

		for assignment in assignments {
			let target = assignment.target.signal;
			builder.check_target(&target)?;
			builder.check_expr(&assignment.value)?;

			let signal_width = builder
				.core
				.get_signal(target.signal)
				.map(|s| s.width())
				.ok_or(DesignError::InvalidSignalId(target.signal))?;
			let (lsb, width) = assignment.target.lsb_width(signal_width)?;

			let conflict = driven
				.entry(target)
				.or_insert_with(|| SignalMask::new(signal_width))
				.set_bits(lsb, lsb + width - 1);

			if let Some((conflict_lsb, conflict_msb)) = conflict.ranges(true).first().copied() {
				error!(
					"Overlapping drivers of {} in module {}",
					builder.ref_name(&target),
					self.name
				);
				return Err(OverlappingDriverError {
					module: self.name.clone(),
					signal: builder.ref_name(&target),
					lsb: conflict_lsb,
					msb: conflict_msb,
				}
				.into());
			}

			self.drivers.entry(target).or_default().push(Driver {
				lsb,
				width,
				value: assignment.value.clone(),
				guard: guard.clone(),
				depth,
				seq: assignment.seq,
			});
		}

		Ok(())
	}

	pub fn signal(&self, id: SignalId) -> Option<&TemplateSignal> {
		self.signals.iter().find(|s| s.id == id)
	}
}
