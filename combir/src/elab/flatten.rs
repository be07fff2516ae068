use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, error, info, warn};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::GraphMap;
use petgraph::Directed;

use super::template::{Driver, ModuleTemplate};
use super::{
	DefaultSeverityPolicy, ElabConfig, ElabError, ElabMessage, ElabMessageKind, ElabMessageSeverity, ElabReport,
	Elaborator, PriorityRule, SeverityPolicy, SignalMask, StrictSeverityPolicy, UnresolvedReferenceError,
};
use crate::design::{Design, Expression, InstanceId, ModuleId, SignalDirection, SignalId, SignalRef};
use crate::formal::Obligation;
use crate::netlist::{Net, NetDriver, NetExpr, NetId, Netlist};

/// Net dependency graph, edges point from a net to its readers
type CombGraph = GraphMap<NetId, (), Directed>;

/// Module instance in the flattened hierarchy
struct Frame {
	template: Arc<ModuleTemplate>,

	/// Prefix of net names (`tl.`), empty for the top module
	prefix: String,

	/// Parent frame and the instance this frame was created for
	parent: Option<(usize, InstanceId)>,
	children: HashMap<InstanceId, usize>,
	nets: HashMap<SignalId, NetId>,
}

/// State of a single elaboration run
struct FlattenCtx {
	config: ElabConfig,
	frames: Vec<Frame>,
	nets: Vec<Net>,
	report: ElabReport,
}

impl FlattenCtx {
	fn new(config: ElabConfig) -> Self {
		Self {
			config,
			frames: vec![],
			nets: vec![],
			report: ElabReport::default(),
		}
	}

	fn message(&mut self, kind: ElabMessageKind, module: &str) {
		let msg = ElabMessage::new(kind, module);
		if msg.default_severity() >= ElabMessageSeverity::Warning {
			warn!("{}", msg);
		}
		self.report.add_message(msg);
	}

	/// Finds the net of a signal referenced from within `frame`
	fn resolve(&self, frame: usize, signal: &SignalRef) -> Result<(NetId, u32), ElabError> {
		let current = &self.frames[frame];
		let net = match signal.instance {
			None => current.nets.get(&signal.signal),
			Some(instance) => current
				.children
				.get(&instance)
				.and_then(|child| self.frames[*child].nets.get(&signal.signal)),
		};

		match net {
			Some(net) => Ok((*net, self.nets[net.0].width)),
			None => Err(UnresolvedReferenceError {
				module: current.template.name.clone(),
				detail: format!("{:?}", signal),
			}
			.into()),
		}
	}

	fn lower(&self, frame: usize, expr: &Expression) -> Result<NetExpr, ElabError> {
		NetExpr::from_expression(expr, &|signal: &SignalRef| self.resolve(frame, signal))
	}

	/// Replaces the placeholder drivers of all non-input nets with resolved expressions
	fn resolve_nets(&mut self) -> Result<(), ElabError> {
		for frame in 0..self.frames.len() {
			let template = self.frames[frame].template.clone();

			for signal in &template.signals {
				let net = self.frames[frame].nets[&signal.id];
				let is_input = signal.direction == Some(SignalDirection::Input);

				// Ports are driven by the parent, everything else by the module itself
				let (owner_frame, key) = match (is_input, self.frames[frame].parent) {
					(true, None) => continue,
					(true, Some((parent, instance))) => (
						parent,
						SignalRef {
							instance: Some(instance),
							signal: signal.id,
						},
					),
					(false, _) => (frame, SignalRef::from(signal.id)),
				};

				let owner = self.frames[owner_frame].template.clone();
				let name = self.nets[net.0].name.clone();
				let drivers = owner.drivers.get(&key).map(|d| d.as_slice()).unwrap_or(&[]);

				if drivers.is_empty() {
					let kind = match is_input {
						true => ElabMessageKind::InstanceInputNotBound { signal: name },
						false => ElabMessageKind::SignalNotDriven { signal: name },
					};
					self.message(kind, &template.name);
					continue;
				}

				let expr = self.resolve_drivers(owner_frame, &owner.name, &name, drivers, signal.width, signal.initial)?;
				self.nets[net.0].driver = NetDriver::Expr(expr);
			}
		}

		Ok(())
	}

	/// Builds the priority chains of a net, split into bit segments with a common set of drivers
	fn resolve_drivers(
		&mut self,
		frame: usize,
		module: &str,
		name: &str,
		drivers: &[Driver],
		width: u32,
		initial: u64,
	) -> Result<NetExpr, ElabError> {
		let mut coverage = SignalMask::new(width);
		let mut bounds = vec![0, width];
		let mut ranked = Vec::with_capacity(drivers.len());

		for driver in drivers {
			coverage.set_bits(driver.lsb, driver.lsb + driver.width - 1);
			bounds.push(driver.lsb);
			bounds.push(driver.lsb + driver.width);

			let value = self.lower(frame, &driver.value)?;
			if value.width() != driver.width {
				self.message(
					ElabMessageKind::WidthMismatch {
						signal: name.into(),
						target_width: driver.width,
						value_width: value.width(),
					},
					module,
				);
			}

			let guard = match &driver.guard {
				Some(guard) => Some(self.lower(frame, guard)?),
				None => None,
			};
			ranked.push((driver, guard, value.resize(driver.width)));
		}

		if !coverage.is_full() {
			self.message(
				ElabMessageKind::SignalPartiallyDriven {
					signal: name.into(),
					bits: coverage.ranges(false),
				},
				module,
			);
		}

		match self.config.priority {
			PriorityRule::NarrowestFirst => {
				ranked.sort_by(|a, b| b.0.depth.cmp(&a.0.depth).then(a.0.seq.cmp(&b.0.seq)))
			},
			PriorityRule::LastDeclared => ranked.sort_by(|a, b| b.0.seq.cmp(&a.0.seq)),
		}

		bounds.sort_unstable();
		bounds.dedup();

		let mut segments = Vec::with_capacity(bounds.len() - 1);
		for window in bounds.windows(2) {
			let (lo, hi) = (window[0], window[1]);
			let mut branches = vec![];
			let mut default = None;

			for (driver, guard, value) in &ranked {
				if driver.lsb > lo || driver.lsb + driver.width < hi {
					continue;
				}

				let part = value.clone().slice(lo - driver.lsb, hi - lo);
				match guard {
					Some(guard) => branches.push((guard.clone(), part)),
					None => {
						// Unconditional driver, nothing ranked below can take effect
						default = Some(part);
						break;
					},
				}
			}

			let default = default.unwrap_or_else(|| NetExpr::constant(initial >> lo, hi - lo));
			segments.push(match branches.is_empty() {
				true => default,
				false => NetExpr::Priority {
					branches,
					default: Box::new(default),
					width: hi - lo,
				},
			});
		}

		debug!(
			"Resolved {} from {} drivers into {} segments",
			name,
			drivers.len(),
			segments.len()
		);
		Ok(NetExpr::concat(segments))
	}

	/// Compiles properties of all frames, in hierarchy preorder
	fn compile_obligations(&self) -> Result<Vec<Obligation>, ElabError> {
		let mut obligations = vec![];
		for (index, frame) in self.frames.iter().enumerate() {
			for property in &frame.template.properties {
				let guard = match &property.guard {
					Some(guard) => self.lower(index, guard)?,
					None => NetExpr::constant(1, 1),
				};

				obligations.push(Obligation {
					name: format!("{}{}", frame.prefix, property.property.name),
					kind: property.property.kind,
					guard,
					predicate: self.lower(index, &property.property.predicate)?,
				});
			}
		}

		Ok(obligations)
	}

	/// Orders non-input nets topologically, fails on combinational loops
	fn evaluation_order(&self) -> Result<Vec<NetId>, ElabError> {
		let mut graph = CombGraph::new();
		for (index, net) in self.nets.iter().enumerate() {
			let id = NetId(index);
			graph.add_node(id);

			if let NetDriver::Expr(expr) = &net.driver {
				let mut deps = vec![];
				expr.dependencies(&mut deps);
				for dep in deps {
					graph.add_edge(dep, id, ());
				}
			}
		}

		info!(
			"Net graph: {} nodes, {} edges",
			graph.node_count(),
			graph.edge_count()
		);

		match toposort(&graph, None) {
			Ok(order) => Ok(order.into_iter().filter(|id| !self.nets[id.0].is_input()).collect()),
			Err(_) => {
				let nets: Vec<String> = tarjan_scc(&graph)
					.into_iter()
					.filter(|component| component.len() > 1 || graph.contains_edge(component[0], component[0]))
					.flatten()
					.map(|id| self.nets[id.0].name.clone())
					.collect();

				error!("Comb loop check failed - loop through {:?}", nets);
				Err(ElabError::CombLoop { nets })
			},
		}
	}

	fn report_unused_inputs(&mut self, inputs: &[NetId], obligations: &[Obligation]) {
		let mut read = vec![];
		for net in &self.nets {
			if let NetDriver::Expr(expr) = &net.driver {
				expr.dependencies(&mut read);
			}
		}
		for obligation in obligations {
			obligation.guard.dependencies(&mut read);
			obligation.predicate.dependencies(&mut read);
		}

		let read: HashSet<NetId> = read.into_iter().collect();
		let module = self.frames[0].template.name.clone();
		for input in inputs {
			if !read.contains(input) {
				let signal = self.nets[input.0].name.clone();
				self.message(ElabMessageKind::InputUnused { signal }, &module);
			}
		}
	}
}

/// Elaborates a module hierarchy into a flat netlist.
///
/// Module templates are cached, so elaborating several top modules of one design
/// only walks each module's scopes once.
pub struct NetlistElaborator<'d> {
	design: &'d Design,
	config: ElabConfig,
	cache: HashMap<ModuleId, Arc<ModuleTemplate>>,
}

impl<'d> NetlistElaborator<'d> {
	pub fn new(design: &'d Design, config: ElabConfig) -> Self {
		Self {
			design,
			config,
			cache: HashMap::new(),
		}
	}

	fn template(&mut self, id: ModuleId) -> Result<Arc<ModuleTemplate>, ElabError> {
		if let Some(template) = self.cache.get(&id) {
			return Ok(template.clone());
		}

		let template = Arc::new(ModuleTemplate::build(&self.design.borrow(), id, &self.config)?);
		self.cache.insert(id, template.clone());
		Ok(template)
	}

	/// Allocates nets for the module and, recursively, for all of its instances
	fn alloc_frame(
		&mut self,
		ctx: &mut FlattenCtx,
		template: Arc<ModuleTemplate>,
		prefix: String,
		parent: Option<(usize, InstanceId)>,
		stack: &mut Vec<ModuleId>,
	) -> Result<usize, ElabError> {
		if stack.contains(&template.id) {
			error!("Module {} instantiates itself", template.name);
			return Err(ElabError::RecursiveInstance {
				module: template.name.clone(),
			});
		}

		if stack.len() >= self.config.max_instance_depth {
			return Err(ElabError::InstanceDepthExceeded(self.config.max_instance_depth));
		}

		let index = ctx.frames.len();
		let mut nets = HashMap::new();
		for signal in &template.signals {
			let driver = match (signal.direction, parent) {
				(Some(SignalDirection::Input), None) => NetDriver::Input(signal.domain),
				_ => NetDriver::Expr(NetExpr::constant(signal.initial, signal.width)),
			};

			let id = NetId(ctx.nets.len());
			ctx.nets.push(Net {
				name: format!("{}{}", prefix, signal.name),
				width: signal.width,
				driver,
			});
			nets.insert(signal.id, id);
		}

		ctx.frames.push(Frame {
			template: template.clone(),
			prefix: prefix.clone(),
			parent,
			children: HashMap::new(),
			nets,
		});

		stack.push(template.id);
		for instance in &template.instances {
			let child_template = self.template(instance.module)?;
			let child_prefix = format!("{}{}.", prefix, instance.name);
			let child = self.alloc_frame(ctx, child_template, child_prefix, Some((index, instance.id)), stack)?;
			ctx.frames[index].children.insert(instance.id, child);
		}
		stack.pop();

		Ok(index)
	}
}

impl<'d> Elaborator for NetlistElaborator<'d> {
	fn elaborate(&mut self, id: ModuleId) -> Result<Netlist, ElabError> {
		let top = self.template(id)?;
		info!("Elaborating module {}", top.name);

		let mut ctx = FlattenCtx::new(self.config);
		self.alloc_frame(&mut ctx, top.clone(), String::new(), None, &mut vec![])?;
		ctx.resolve_nets()?;

		let obligations = ctx.compile_obligations()?;
		let order = ctx.evaluation_order()?;

		let top_frame = &ctx.frames[0];
		let mut refs: HashMap<SignalRef, NetId> = top_frame
			.nets
			.iter()
			.map(|(signal, net)| (SignalRef::from(*signal), *net))
			.collect();

		for (instance, child) in &top_frame.children {
			let child = &ctx.frames[*child];
			for signal in &child.template.interface {
				refs.insert(
					SignalRef {
						instance: Some(*instance),
						signal: *signal,
					},
					child.nets[signal],
				);
			}
		}

		let ports = |direction: SignalDirection| -> Vec<NetId> {
			top.interface
				.iter()
				.filter(|s| top.signal(**s).and_then(|s| s.direction) == Some(direction))
				.map(|s| top_frame.nets[s])
				.collect()
		};
		let inputs = ports(SignalDirection::Input);
		let outputs = ports(SignalDirection::Output);

		ctx.report_unused_inputs(&inputs, &obligations);

		let policy: &dyn SeverityPolicy = match self.config.strict {
			true => &StrictSeverityPolicy,
			false => &DefaultSeverityPolicy,
		};
		if ctx.report.has_errors(policy) {
			let count = ctx.report.filter(policy, ElabMessageSeverity::Error).count();
			error!("Elaboration of {} reported {} error(s)", top.name, count);
			return Err(ElabError::Report {
				module: top.name.clone(),
				count,
			});
		}

		info!(
			"Elaborated {}: {} nets, {} inputs, {} obligations",
			top.name,
			ctx.nets.len(),
			inputs.len(),
			obligations.len()
		);

		Ok(Netlist {
			name: top.name.clone(),
			nets: ctx.nets,
			inputs,
			outputs,
			order,
			refs,
			obligations,
			report: ctx.report,
		})
	}
}

#[cfg(test)]
mod test {
	use std::error::Error;

	use super::*;
	use crate::design::DesignError;
	use crate::netlist::InputAssignment;

	fn elaborate(d: &Design, id: ModuleId, priority: PriorityRule) -> Result<Netlist, ElabError> {
		let config = ElabConfig {
			priority,
			..Default::default()
		};
		NetlistElaborator::new(d, config).elaborate(id)
	}

	#[test]
	fn test_guarded_override() -> Result<(), Box<dyn Error>> {
		let mut d = Design::new();
		let mut m = d.new_module("override")?;
		let a = m.input("a", 4)?;
		let y = m.output("y", 4)?;

		m.scope().assign(y, 7u64.into())?;
		m.scope()
			.if_scope(Expression::from(a).eq(3u64))?
			.assign(y, Expression::from(a))?;

		let netlist = elaborate(&d, m.id(), PriorityRule::NarrowestFirst)?;
		for value in 0..16 {
			let sim = netlist.simulate(&InputAssignment::new().with(a, value))?;
			let expected = if value == 3 { 3 } else { 7 };
			assert_eq!(sim.get(y), Some(expected));
		}
		Ok(())
	}

	#[test]
	fn test_priority_rules() -> Result<(), Box<dyn Error>> {
		let mut d = Design::new();
		let mut m = d.new_module("rules")?;
		let a = m.input("a", 1)?;
		let y = m.output("y", 2)?;

		m.scope().if_scope(Expression::from(a))?.assign(y, 1u64.into())?;
		m.scope().assign(y, 2u64.into())?;

		let narrowest = elaborate(&d, m.id(), PriorityRule::NarrowestFirst)?;
		let last = elaborate(&d, m.id(), PriorityRule::LastDeclared)?;

		let inputs = InputAssignment::new().with(a, 1);
		assert_eq!(narrowest.simulate(&inputs)?.get(y), Some(1));
		assert_eq!(last.simulate(&inputs)?.get(y), Some(2));
		Ok(())
	}

	#[test]
	fn test_same_depth_tie() -> Result<(), Box<dyn Error>> {
		let mut d = Design::new();
		let mut m = d.new_module("tie")?;
		let a = m.input("a", 2)?;
		let y = m.output("y", 2)?;

		m.scope().if_scope(Expression::from(a).bit(0))?.assign(y, 1u64.into())?;
		m.scope().if_scope(Expression::from(a).bit(1))?.assign(y, 2u64.into())?;

		let netlist = elaborate(&d, m.id(), PriorityRule::NarrowestFirst)?;
		assert_eq!(netlist.simulate(&InputAssignment::new().with(a, 3))?.get(y), Some(1));
		assert_eq!(netlist.simulate(&InputAssignment::new().with(a, 2))?.get(y), Some(2));
		assert_eq!(netlist.simulate(&InputAssignment::new().with(a, 0))?.get(y), Some(0));
		Ok(())
	}

	#[test]
	fn test_partial_drivers() -> Result<(), Box<dyn Error>> {
		let mut d = Design::new();
		let mut m = d.new_module("partial")?;
		let a = m.input("a", 4)?;
		let y = m.scope().new_signal("y")?.unsigned(8).initial(0xa0).build()?;
		m.expose(y, SignalDirection::Output)?;

		m.scope().assign(y.bits(0..4), Expression::from(a))?;

		let netlist = elaborate(&d, m.id(), PriorityRule::NarrowestFirst)?;
		assert_eq!(netlist.simulate(&InputAssignment::new().with(a, 5))?.get(y), Some(0xa5));
		assert!(netlist
			.report()
			.messages()
			.iter()
			.any(|msg| matches!(msg.kind(), ElabMessageKind::SignalPartiallyDriven { bits, .. } if bits == &vec![(4, 7)])));
		Ok(())
	}

	#[test]
	fn test_instance_wiring() -> Result<(), Box<dyn Error>> {
		let mut d = Design::new();
		let mut inc = d.new_module("inc")?;
		let x = inc.input("x", 4)?;
		let y = inc.output("y", 4)?;
		inc.scope().assign(y, Expression::from(x) + 1u64)?;

		let mut top = d.new_module("top")?;
		let a = top.input("a", 4)?;
		let out = top.output("out", 4)?;
		let first = top.instantiate(inc.id(), "first")?;
		let second = top.instantiate(inc.id(), "second")?;
		top.scope().assign(first.port("x")?, Expression::from(a))?;
		top.scope().assign(second.port("x")?, Expression::from(first.port("y")?))?;
		top.scope().assign(out, Expression::from(second.port("y")?))?;

		let netlist = elaborate(&d, top.id(), PriorityRule::NarrowestFirst)?;
		let sim = netlist.simulate(&InputAssignment::new().with(a, 15))?;
		assert_eq!(sim.get(out), Some(1));
		assert_eq!(sim.by_name("first.y"), Some(0));
		assert_eq!(sim.get(first.port("y")?), Some(0));
		assert!(netlist.find("second.x").is_some());
		Ok(())
	}

	#[test]
	fn test_unbound_instance_input() -> Result<(), ElabError> {
		let mut d = Design::new();
		let mut leaf = d.new_module("leaf")?;
		let x = leaf.input("x", 2)?;
		let y = leaf.output("y", 2)?;
		leaf.scope().assign(y, Expression::from(x))?;

		let mut top = d.new_module("top")?;
		top.instantiate(leaf.id(), "inst")?;

		let netlist = elaborate(&d, top.id(), PriorityRule::NarrowestFirst)?;
		assert!(netlist
			.report()
			.messages()
			.iter()
			.any(|msg| matches!(msg.kind(), ElabMessageKind::InstanceInputNotBound { signal } if signal == "inst.x")));
		Ok(())
	}

	#[test]
	fn test_strict_report() -> Result<(), ElabError> {
		let mut d = Design::new();
		let mut leaf = d.new_module("leaf")?;
		let x = leaf.input("x", 2)?;
		let y = leaf.output("y", 2)?;
		leaf.scope().assign(y, Expression::from(x))?;

		let mut top = d.new_module("top")?;
		let a = top.input("a", 2)?;
		let out = top.output("out", 2)?;
		let inst = top.instantiate(leaf.id(), "inst")?;
		top.scope().assign(inst.port("x")?, Expression::from(a))?;
		top.scope().assign(out, Expression::from(inst.port("y")?))?;

		let strict = ElabConfig {
			strict: true,
			..Default::default()
		};
		assert!(NetlistElaborator::new(&d, strict).elaborate(top.id()).is_ok());

		// Leaving the instance input unbound only warns by default
		let mut loose = d.new_module("loose")?;
		loose.instantiate(leaf.id(), "inst")?;
		assert!(elaborate(&d, loose.id(), PriorityRule::NarrowestFirst).is_ok());

		let result = NetlistElaborator::new(&d, strict).elaborate(loose.id());
		assert!(matches!(result, Err(ElabError::Report { module, count }) if module == "loose" && count >= 1));
		Ok(())
	}

	#[test]
	fn test_comb_loop() -> Result<(), ElabError> {
		let mut d = Design::new();
		let mut m = d.new_module("looped")?;
		let p = m.scope().new_signal("p")?.unsigned(1).build()?;
		let q = m.scope().new_signal("q")?.unsigned(1).build()?;
		m.scope().assign(p, Expression::from(q))?;
		m.scope().assign(q, !Expression::from(p))?;

		let result = elaborate(&d, m.id(), PriorityRule::NarrowestFirst);
		assert!(matches!(result, Err(ElabError::CombLoop { nets }) if nets.len() == 2));
		Ok(())
	}

	#[test]
	fn test_recursive_instance() -> Result<(), DesignError> {
		let mut d = Design::new();
		let mut m = d.new_module("ouroboros")?;
		m.instantiate(m.id(), "again")?;

		assert!(matches!(
			elaborate(&d, m.id(), PriorityRule::NarrowestFirst),
			Err(ElabError::RecursiveInstance { .. })
		));
		Ok(())
	}
}
