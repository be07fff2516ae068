use super::NetExpr;
use crate::design::signal::mask;
use crate::design::{BinaryOp, UnaryOp};

/// Bit-accurate evaluation against a table of net values indexed by net ID
pub trait Evaluates {
	fn eval(&self, values: &[u64]) -> u64;
}

impl BinaryOp {
	/// Applies the operator to two operand values, truncating to `width` bits
	pub fn apply(&self, lhs: u64, rhs: u64, width: u32) -> u64 {
		use BinaryOp::*;
		let value = match self {
			Add => lhs.wrapping_add(rhs),
			Subtract => lhs.wrapping_sub(rhs),
			Multiply => lhs.wrapping_mul(rhs),
			Divide => lhs.checked_div(rhs).unwrap_or(0),
			Modulo => lhs.checked_rem(rhs).unwrap_or(0),
			BitwiseAnd => lhs & rhs,
			BitwiseOr => lhs | rhs,
			BitwiseXor => lhs ^ rhs,
			LogicalAnd => (lhs != 0 && rhs != 0) as u64,
			LogicalOr => (lhs != 0 || rhs != 0) as u64,
			Equal => (lhs == rhs) as u64,
			NotEqual => (lhs != rhs) as u64,
			Less => (lhs < rhs) as u64,
			LessEqual => (lhs <= rhs) as u64,
			Greater => (lhs > rhs) as u64,
			GreaterEqual => (lhs >= rhs) as u64,
		};
		value & mask(width)
	}
}

impl UnaryOp {
	/// Applies the operator to an operand of `operand_width` bits
	pub fn apply(&self, operand: u64, operand_width: u32) -> u64 {
		use UnaryOp::*;
		match self {
			BitwiseNot => !operand & mask(operand_width),
			LogicalNot => (operand == 0) as u64,
			ReductionAnd => (operand == mask(operand_width)) as u64,
			ReductionOr => (operand != 0) as u64,
			ReductionXor => (operand.count_ones() & 1) as u64,
		}
	}
}

impl Evaluates for NetExpr {
	fn eval(&self, values: &[u64]) -> u64 {
		use NetExpr::*;
		match self {
			Constant { value, .. } => *value,
			Net { net, .. } => values[net.0],
			Slice { operand, lsb, width } => (operand.eval(values) >> lsb) & mask(*width),
			Concat { parts, .. } => {
				let mut value = 0u64;
				let mut shift = 0u32;
				for part in parts {
					value |= part.eval(values).checked_shl(shift).unwrap_or(0);
					shift += part.width();
				}
				value
			},
			Unary { op, operand, .. } => op.apply(operand.eval(values), operand.width()),
			Binary { op, lhs, rhs, width } => op.apply(lhs.eval(values), rhs.eval(values), *width),
			Priority { branches, default, .. } => {
				for (condition, value) in branches {
					if condition.eval(values) != 0 {
						return value.eval(values);
					}
				}
				default.eval(values)
			},
		}
	}
}
