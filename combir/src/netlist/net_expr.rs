use super::NetId;
use crate::design::signal::mask;
use crate::design::{
	check_slice, concat_width, BinaryOp, DesignError, Expression, NumericConstant, SignalRef, UnaryOp,
	MAX_SIGNAL_WIDTH,
};

/// Expression over nets of a flattened netlist.
///
/// Every node carries its own width, so evaluation never needs to consult the design.
#[derive(Clone, Debug)]
pub enum NetExpr {
	Constant {
		value: u64,
		width: u32,
	},
	Net {
		net: NetId,
		width: u32,
	},
	Slice {
		operand: Box<NetExpr>,
		lsb: u32,
		width: u32,
	},

	/// Concatenation, first part in the least significant bits
	Concat {
		parts: Vec<NetExpr>,
		width: u32,
	},
	Unary {
		op: UnaryOp,
		operand: Box<NetExpr>,
		width: u32,
	},
	Binary {
		op: BinaryOp,
		lhs: Box<NetExpr>,
		rhs: Box<NetExpr>,
		width: u32,
	},

	/// Value of the first branch with a non-zero condition, `default` if there is none
	Priority {
		branches: Vec<(NetExpr, NetExpr)>,
		default: Box<NetExpr>,
		width: u32,
	},
}

impl NetExpr {
	pub fn constant(value: u64, width: u32) -> Self {
		Self::Constant {
			value: value & mask(width),
			width,
		}
	}

	pub fn width(&self) -> u32 {
		use NetExpr::*;
		match self {
			Constant { width, .. }
			| Net { width, .. }
			| Slice { width, .. }
			| Concat { width, .. }
			| Unary { width, .. }
			| Binary { width, .. }
			| Priority { width, .. } => *width,
		}
	}

	/// Selects `width` bits starting at `lsb`. Selecting the whole expression is a no-op.
	pub fn slice(self, lsb: u32, width: u32) -> Self {
		if lsb == 0 && width == self.width() {
			return self;
		}

		match self {
			Self::Constant { value, .. } => Self::constant(value >> lsb, width),
			operand => Self::Slice {
				operand: Box::new(operand),
				lsb,
				width,
			},
		}
	}

	/// Truncates or zero-extends the expression to `width` bits
	pub fn resize(self, width: u32) -> Self {
		let own = self.width();
		if own > width {
			self.slice(0, width)
		}
		else if own < width {
			match self {
				Self::Constant { value, .. } => Self::constant(value, width),
				operand => Self::Concat {
					parts: vec![operand, Self::constant(0, width - own)],
					width,
				},
			}
		}
		else {
			self
		}
	}

	/// Concatenates parts (least significant first), skipping the node for a single part
	pub fn concat(mut parts: Vec<NetExpr>) -> Self {
		if parts.len() == 1 {
			return parts.remove(0);
		}

		let width = parts.iter().map(|p| p.width()).sum();
		Self::Concat { parts, width }
	}

	/// Collects nets the expression reads
	pub fn dependencies(&self, out: &mut Vec<NetId>) {
		use NetExpr::*;
		match self {
			Constant { .. } => {},
			Net { net, .. } => out.push(*net),
			Slice { operand, .. } | Unary { operand, .. } => operand.dependencies(out),
			Concat { parts, .. } => parts.iter().for_each(|p| p.dependencies(out)),
			Binary { lhs, rhs, .. } => {
				lhs.dependencies(out);
				rhs.dependencies(out);
			},
			Priority { branches, default, .. } => {
				for (condition, value) in branches {
					condition.dependencies(out);
					value.dependencies(out);
				}
				default.dependencies(out);
			},
		}
	}

	/// Lowers a design expression, resolving signal references with `resolve`
	pub fn from_expression<F, E>(expr: &Expression, resolve: &F) -> Result<NetExpr, E>
	where
		F: Fn(&SignalRef) -> Result<(NetId, u32), E>,
		E: From<DesignError>,
	{
		use Expression::*;
		let lowered = match expr {
			Constant(constant) => constant_expr(constant),
			Signal(sig) => {
				let (net, width) = resolve(sig)?;
				NetExpr::Net { net, width }
			},
			Slice(slice) => {
				let operand = Self::from_expression(&slice.operand, resolve)?;
				check_slice(slice.lsb, slice.width, operand.width())?;
				operand.slice(slice.lsb, slice.width)
			},
			Concat(parts) => {
				let parts = parts
					.iter()
					.map(|p| Self::from_expression(p, resolve))
					.collect::<Result<Vec<_>, E>>()?;
				let width = concat_width(parts.iter().map(|p| p.width()))?;
				NetExpr::Concat { parts, width }
			},
			Unary(unary) => {
				let operand = Self::from_expression(&unary.operand, resolve)?;
				NetExpr::Unary {
					op: unary.op,
					width: unary.op.result_width(operand.width()),
					operand: Box::new(operand),
				}
			},
			Binary(binary) => {
				let lhs = Self::from_expression(&binary.lhs, resolve)?;
				let rhs = Self::from_expression(&binary.rhs, resolve)?;
				NetExpr::Binary {
					op: binary.op,
					width: binary.op.result_width(lhs.width(), rhs.width()),
					lhs: Box::new(lhs),
					rhs: Box::new(rhs),
				}
			},
			Conditional(conditional) => {
				let default = Self::from_expression(&conditional.default, resolve)?;
				let mut branches = Vec::with_capacity(conditional.branches.len());
				for branch in &conditional.branches {
					branches.push((
						Self::from_expression(&branch.condition, resolve)?,
						Self::from_expression(&branch.value, resolve)?,
					));
				}

				let width = branches
					.iter()
					.map(|(_, v)| v.width())
					.fold(default.width(), u32::max)
					.min(MAX_SIGNAL_WIDTH);

				NetExpr::Priority {
					branches: branches.into_iter().map(|(c, v)| (c, v.resize(width))).collect(),
					default: Box::new(default.resize(width)),
					width,
				}
			},
		};

		Ok(lowered)
	}
}

fn constant_expr(constant: &NumericConstant) -> NetExpr {
	NetExpr::Constant {
		value: constant.value(),
		width: constant.width(),
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_resize() {
		let net = NetExpr::Net {
			net: NetId(0),
			width: 4,
		};
		assert_eq!(net.clone().resize(4).width(), 4);
		assert!(matches!(net.clone().resize(2), NetExpr::Slice { lsb: 0, width: 2, .. }));
		assert!(matches!(net.resize(9), NetExpr::Concat { width: 9, .. }));
		assert!(matches!(
			NetExpr::constant(0xff, 8).resize(3),
			NetExpr::Constant { value: 7, width: 3 }
		));
	}

	#[test]
	fn test_dependencies() {
		let a = NetExpr::Net {
			net: NetId(1),
			width: 1,
		};
		let b = NetExpr::Net {
			net: NetId(2),
			width: 8,
		};
		let expr = NetExpr::Priority {
			branches: vec![(a, NetExpr::constant(3, 8))],
			default: Box::new(b),
			width: 8,
		};

		let mut deps = vec![];
		expr.dependencies(&mut deps);
		assert_eq!(deps, vec![NetId(1), NetId(2)]);
	}
}
