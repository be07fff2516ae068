mod eval;
mod net_expr;
mod simulate;

pub use eval::Evaluates;
pub use net_expr::NetExpr;
pub use simulate::{DomainError, InputAssignment, SimError, SimValues};

use std::collections::{HashMap, HashSet};

use crate::design::{Domain, Property, SignalRef};
use crate::elab::{ElabError, ElabReport, UnresolvedReferenceError};
use crate::formal::Obligation;

/// References a net in a netlist
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetId(pub(crate) usize);

impl NetId {
	pub fn index(&self) -> usize {
		self.0
	}
}

/// Source of the value of a net
#[derive(Clone, Debug)]
pub enum NetDriver {
	/// Free top-level input restricted to a domain
	Input(Domain),

	/// Resolved combinational expression
	Expr(NetExpr),
}

#[derive(Clone, Debug)]
pub struct Net {
	/// Hierarchical name (`tl.in_cells`)
	pub name: String,
	pub width: u32,
	pub driver: NetDriver,
}

impl Net {
	pub fn is_input(&self) -> bool {
		matches!(self.driver, NetDriver::Input(_))
	}
}

/// Inputs and internal nets an expression transitively depends on
#[derive(Clone, Debug, Default)]
pub struct Cone {
	/// Top-level inputs, in netlist input order
	pub inputs: Vec<NetId>,

	/// Non-input nets, in evaluation order
	pub nets: Vec<NetId>,
}

/// Flat, immutable result of elaboration
#[derive(Clone, Debug)]
pub struct Netlist {
	pub(crate) name: String,
	pub(crate) nets: Vec<Net>,
	pub(crate) inputs: Vec<NetId>,
	pub(crate) outputs: Vec<NetId>,

	/// Non-input nets in topological order
	pub(crate) order: Vec<NetId>,

	/// Nets of the top module signals and of the ports of its direct instances
	pub(crate) refs: HashMap<SignalRef, NetId>,
	pub(crate) obligations: Vec<Obligation>,
	pub(crate) report: ElabReport,
}

impl Netlist {
	/// Name of the top module
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn nets(&self) -> &[Net] {
		&self.nets
	}

	pub fn net(&self, id: NetId) -> &Net {
		&self.nets[id.0]
	}

	pub fn inputs(&self) -> &[NetId] {
		&self.inputs
	}

	pub fn outputs(&self) -> &[NetId] {
		&self.outputs
	}

	pub fn order(&self) -> &[NetId] {
		&self.order
	}

	/// Obligations declared in the elaborated hierarchy, in declaration order
	pub fn obligations(&self) -> &[Obligation] {
		&self.obligations
	}

	pub fn report(&self) -> &ElabReport {
		&self.report
	}

	/// Looks up a net by its hierarchical name
	pub fn find(&self, name: &str) -> Option<NetId> {
		self.nets.iter().position(|n| n.name == name).map(NetId)
	}

	/// Net of a top module signal or a port of a direct instance
	pub fn net_of(&self, signal: impl Into<SignalRef>) -> Option<NetId> {
		self.refs.get(&signal.into()).copied()
	}

	/// Evaluates all non-input nets. Input values have to be loaded into `values` beforehand.
	pub fn evaluate(&self, values: &mut [u64]) {
		self.evaluate_nets(&self.order, values);
	}

	/// Evaluates the given nets, which have to be in evaluation order
	pub(crate) fn evaluate_nets(&self, nets: &[NetId], values: &mut [u64]) {
		for id in nets {
			if let NetDriver::Expr(expr) = &self.nets[id.0].driver {
				values[id.0] = expr.eval(values);
			}
		}
	}

	/// Computes the cone of influence of a set of expressions
	pub fn cone(&self, exprs: &[&NetExpr]) -> Cone {
		let mut stack = vec![];
		for expr in exprs {
			expr.dependencies(&mut stack);
		}

		let mut visited = HashSet::new();
		while let Some(id) = stack.pop() {
			if !visited.insert(id) {
				continue;
			}

			if let NetDriver::Expr(expr) = &self.nets[id.0].driver {
				expr.dependencies(&mut stack);
			}
		}

		Cone {
			inputs: self.inputs.iter().copied().filter(|id| visited.contains(id)).collect(),
			nets: self.order.iter().copied().filter(|id| visited.contains(id)).collect(),
		}
	}

	/// Compiles a property against the top module of the netlist
	pub fn obligation(&self, property: &Property) -> Result<Obligation, ElabError> {
		let resolve = |signal: &SignalRef| -> Result<(NetId, u32), ElabError> {
			self.net_of(*signal)
				.map(|id| (id, self.nets[id.0].width))
				.ok_or_else(|| {
					UnresolvedReferenceError {
						module: self.name.clone(),
						detail: format!("{:?} in property '{}'", signal, property.name),
					}
					.into()
				})
		};

		let guard = match &property.guard {
			Some(guard) => NetExpr::from_expression(guard, &resolve)?,
			None => NetExpr::constant(1, 1),
		};

		Ok(Obligation {
			name: property.name.clone(),
			kind: property.kind,
			guard,
			predicate: NetExpr::from_expression(&property.predicate, &resolve)?,
		})
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::design::{Design, DesignError, Expression, ModuleId, SignalDirection, SignalId};
	use crate::elab::{ElabConfig, Elaborator, NetlistElaborator};
	use crate::formal::{check, Verdict};

	#[test]
	fn test_cone_of_influence() -> Result<(), ElabError> {
		let mut d = Design::new();
		let mut m = d.new_module("cone")?;
		let a = m.input("a", 4)?;
		let b = m.input("b", 4)?;
		let c = m.input("c", 4)?;
		let sum = m.output("sum", 5)?;
		let other = m.output("other", 4)?;

		m.scope().assign(sum, Expression::from(a) + Expression::from(b))?;
		m.scope().assign(other, Expression::from(c))?;

		let netlist = NetlistElaborator::new(&d, ElabConfig::default()).elaborate(m.id())?;
		let sum_net = netlist.net_of(sum).unwrap();
		let probe = NetExpr::Net {
			net: sum_net,
			width: 5,
		};

		let cone = netlist.cone(&[&probe]);
		assert_eq!(cone.inputs, vec![netlist.net_of(a).unwrap(), netlist.net_of(b).unwrap()]);
		assert_eq!(cone.nets, vec![sum_net]);
		Ok(())
	}

	#[test]
	fn test_obligation_unresolved() -> Result<(), DesignError> {
		let mut d = Design::new();
		let mut m = d.new_module("top")?;
		let a = m.input("a", 1)?;
		let mut other = d.new_module("other")?;
		let foreign = other.scope().new_signal("foreign")?.unsigned(1).build()?;
		other.expose(foreign, SignalDirection::Output)?;

		let netlist = NetlistElaborator::new(&d, ElabConfig::default())
			.elaborate(m.id())
			.map_err(|_| DesignError::NotInDesign)?;

		assert!(netlist.obligation(&Property::cover("ok", Expression::from(a))).is_ok());
		assert!(matches!(
			netlist.obligation(&Property::cover("bad", Expression::from(foreign))),
			Err(ElabError::UnresolvedReference(_))
		));
		Ok(())
	}

	/// Module selecting between `a` and a constant, plus the parity of `a`
	fn select_module(d: &mut Design) -> Result<(ModuleId, [SignalId; 4]), DesignError> {
		let mut m = d.new_module("select")?;
		let a = m.input("a", 4)?;
		let s = m.input("s", 1)?;
		let y = m.output("y", 8)?;
		let parity = m.output("parity", 1)?;

		m.scope()
			.assign(y, Expression::from(s).mux(Expression::from(a), 200u64.into()))?;
		m.scope().assign(parity, Expression::from(a).xor_reduce())?;
		Ok((m.id(), [a, s, y, parity]))
	}

	#[test]
	fn test_mux_and_parity() -> Result<(), Box<dyn std::error::Error>> {
		let mut d = Design::new();
		let (id, [a, s, y, parity]) = select_module(&mut d)?;
		let netlist = NetlistElaborator::new(&d, ElabConfig::default()).elaborate(id)?;

		let sim = netlist.simulate(&InputAssignment::new().with(a, 9).with(s, 1))?;
		assert_eq!(sim.get(y), Some(9));
		assert_eq!(sim.get(parity), Some(0));

		let sim = netlist.simulate(&InputAssignment::new().with(a, 0b1011).with(s, 0))?;
		assert_eq!(sim.get(y), Some(200));
		assert_eq!(sim.get(parity), Some(1));
		Ok(())
	}

	#[test]
	fn test_guarded_obligation() -> Result<(), Box<dyn std::error::Error>> {
		let mut d = Design::new();
		let (id, [a, s, y, _]) = select_module(&mut d)?;
		let netlist = NetlistElaborator::new(&d, ElabConfig::default()).elaborate(id)?;

		let passes_a = Expression::from(y).eq(Expression::from(a));
		let obligations = [
			Property::assert("selected", passes_a.clone()).with_guard(Expression::from(s).eq(1u64)),
			Property::assert("always_selected", passes_a),
		]
		.iter()
		.map(|p| netlist.obligation(p))
		.collect::<Result<Vec<_>, _>>()?;

		let results = check(&netlist, &obligations, None)?;
		assert_eq!(results[0].verdict, Verdict::Proven);

		let witness = results[1].verdict.witness().ok_or("no counterexample")?;
		assert!(matches!(results[1].verdict, Verdict::Counterexample(_)));
		assert_eq!(witness.get("s"), Some(0));
		assert_eq!(netlist.simulate(&witness.assignment())?.get(y), Some(200));
		Ok(())
	}
}
