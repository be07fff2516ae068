mod expression_width;
mod numeric_constant;

pub use expression_width::ExpressionWidth;
pub use numeric_constant::NumericConstant;

pub(crate) use expression_width::{check_slice, concat_width};

use std::ops::Range;

use super::{SignalId, SignalRef, SignalSlice};

/// Binary operators
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
	Add,
	Subtract,
	Multiply,
	Divide,
	Modulo,
	BitwiseAnd,
	BitwiseOr,
	BitwiseXor,
	LogicalAnd,
	LogicalOr,
	Equal,
	NotEqual,
	Less,
	LessEqual,
	Greater,
	GreaterEqual,
}

/// Unary operators
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
	BitwiseNot,
	LogicalNot,
	ReductionAnd,
	ReductionOr,
	ReductionXor,
}

/// Represents a conditional expression branch
#[derive(Clone, Debug)]
pub struct ConditionalBranch {
	/// Condition expression (true when non-zero)
	pub condition: Expression,

	/// Value when condition is true
	pub value: Expression,
}

/// Conditional expression
/// Evaluates to the first branch where the condition is true
#[derive(Clone, Debug)]
pub struct ConditionalExpression {
	/// Branches
	pub branches: Vec<ConditionalBranch>,

	/// Default value if all conditions are false
	pub default: Box<Expression>,
}

/// A binary expression
#[derive(Clone, Debug)]
pub struct BinaryExpression {
	/// Binary operator type
	pub op: BinaryOp,

	/// Left hand side expression
	pub lhs: Box<Expression>,

	/// Right hand side expression
	pub rhs: Box<Expression>,
}

/// A unary expression
#[derive(Clone, Debug)]
pub struct UnaryExpression {
	/// Unary operator type
	pub op: UnaryOp,

	/// Operand expression
	pub operand: Box<Expression>,
}

/// Selects `width` bits of the operand starting at `lsb`
#[derive(Clone, Debug)]
pub struct SliceExpression {
	pub operand: Box<Expression>,
	pub lsb: u32,
	pub width: u32,
}

/// Combinational expression over unsigned bit-vectors
#[derive(Clone, Debug)]
pub enum Expression {
	Constant(NumericConstant),
	Signal(SignalRef),
	Slice(SliceExpression),

	/// Concatenation, first part ends up in the least significant bits
	Concat(Vec<Expression>),
	Unary(UnaryExpression),
	Binary(BinaryExpression),
	Conditional(ConditionalExpression),
}

impl Expression {
	/// Returns a new zero-valued expression
	pub fn new_zero() -> Self {
		Self::Constant(NumericConstant::zero())
	}

	/// Returns a new one-valued expression
	pub fn new_one() -> Self {
		Self::Constant(NumericConstant::one())
	}

	/// Creates a binary expression
	pub fn binary(op: BinaryOp, lhs: Expression, rhs: Expression) -> Self {
		Self::Binary(BinaryExpression {
			op,
			lhs: Box::new(lhs),
			rhs: Box::new(rhs),
		})
	}

	/// Creates a unary expression
	pub fn unary(op: UnaryOp, operand: Expression) -> Self {
		Self::Unary(UnaryExpression {
			op,
			operand: Box::new(operand),
		})
	}

	/// Selects range of bits (`lsb..msb+1`) from the expression
	pub fn bits(self, range: Range<u32>) -> Self {
		Self::Slice(SliceExpression {
			operand: Box::new(self),
			lsb: range.start,
			width: range.end.saturating_sub(range.start),
		})
	}

	/// Selects a single bit from the expression
	pub fn bit(self, index: u32) -> Self {
		self.bits(index..index + 1)
	}

	/// Concatenates expressions, the first one forms the least significant bits
	pub fn concat(parts: Vec<Expression>) -> Self {
		Self::Concat(parts)
	}

	/// Uses `self` as a condition selecting between two values
	pub fn mux(self, on_true: Expression, on_false: Expression) -> Self {
		Self::Conditional(ConditionalExpression {
			branches: vec![ConditionalBranch {
				condition: self,
				value: on_true,
			}],
			default: Box::new(on_false),
		})
	}

	pub fn eq(self, rhs: impl Into<Expression>) -> Self {
		Self::binary(BinaryOp::Equal, self, rhs.into())
	}

	pub fn ne(self, rhs: impl Into<Expression>) -> Self {
		Self::binary(BinaryOp::NotEqual, self, rhs.into())
	}

	pub fn lt(self, rhs: impl Into<Expression>) -> Self {
		Self::binary(BinaryOp::Less, self, rhs.into())
	}

	pub fn le(self, rhs: impl Into<Expression>) -> Self {
		Self::binary(BinaryOp::LessEqual, self, rhs.into())
	}

	pub fn gt(self, rhs: impl Into<Expression>) -> Self {
		Self::binary(BinaryOp::Greater, self, rhs.into())
	}

	pub fn ge(self, rhs: impl Into<Expression>) -> Self {
		Self::binary(BinaryOp::GreaterEqual, self, rhs.into())
	}

	pub fn logical_and(self, rhs: impl Into<Expression>) -> Self {
		Self::binary(BinaryOp::LogicalAnd, self, rhs.into())
	}

	pub fn logical_or(self, rhs: impl Into<Expression>) -> Self {
		Self::binary(BinaryOp::LogicalOr, self, rhs.into())
	}

	pub fn logical_not(self) -> Self {
		Self::unary(UnaryOp::LogicalNot, self)
	}

	/// True if all bits are set
	pub fn all(self) -> Self {
		Self::unary(UnaryOp::ReductionAnd, self)
	}

	/// True if any bit is set
	pub fn any(self) -> Self {
		Self::unary(UnaryOp::ReductionOr, self)
	}

	/// Parity of the bits
	pub fn xor_reduce(self) -> Self {
		Self::unary(UnaryOp::ReductionXor, self)
	}

	/// Collects all signals referenced by the expression
	pub fn signals(&self) -> Vec<SignalRef> {
		let mut out = Vec::new();
		self.collect_signals(&mut out);
		out
	}

	fn collect_signals(&self, out: &mut Vec<SignalRef>) {
		use Expression::*;
		match self {
			Constant(_) => {},
			Signal(sig) => out.push(*sig),
			Slice(slice) => slice.operand.collect_signals(out),
			Concat(parts) => parts.iter().for_each(|p| p.collect_signals(out)),
			Unary(expr) => expr.operand.collect_signals(out),
			Binary(expr) => {
				expr.lhs.collect_signals(out);
				expr.rhs.collect_signals(out);
			},
			Conditional(expr) => {
				for branch in &expr.branches {
					branch.condition.collect_signals(out);
					branch.value.collect_signals(out);
				}
				expr.default.collect_signals(out);
			},
		}
	}
}

/// Implements a conversion from signal ID to an expression
impl From<SignalId> for Expression {
	fn from(signal: SignalId) -> Self {
		Self::Signal(signal.into())
	}
}

impl From<SignalRef> for Expression {
	fn from(signal: SignalRef) -> Self {
		Self::Signal(signal)
	}
}

impl From<SignalSlice> for Expression {
	fn from(slice: SignalSlice) -> Self {
		match slice.bits {
			None => Self::Signal(slice.signal),
			Some(range) => Self::Signal(slice.signal).bits(range),
		}
	}
}

impl From<NumericConstant> for Expression {
	fn from(value: NumericConstant) -> Self {
		Self::Constant(value)
	}
}

impl From<u64> for Expression {
	fn from(value: u64) -> Self {
		Self::Constant(value.into())
	}
}

impl From<u32> for Expression {
	fn from(value: u32) -> Self {
		Self::Constant(value.into())
	}
}

impl From<bool> for Expression {
	fn from(value: bool) -> Self {
		Self::Constant(value.into())
	}
}
