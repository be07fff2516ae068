use super::{BinaryOp, Expression, UnaryOp};
use std::ops;

macro_rules! impl_binary_op_for_expression {
	($trait: ident, $trait_func: ident, $op: ident) => {
		impl ops::$trait<Expression> for Expression {
			type Output = Expression;

			fn $trait_func(self, rhs: Expression) -> Self::Output {
				Expression::binary(BinaryOp::$op, self, rhs)
			}
		}

		impl ops::$trait<u64> for Expression {
			type Output = Expression;

			fn $trait_func(self, rhs: u64) -> Self::Output {
				Expression::binary(BinaryOp::$op, self, rhs.into())
			}
		}
	};
}

macro_rules! impl_unary_op_for_expression {
	($trait: ident, $trait_func: ident, $op: ident) => {
		impl ops::$trait for Expression {
			type Output = Expression;

			fn $trait_func(self) -> Self::Output {
				Expression::unary(UnaryOp::$op, self)
			}
		}
	};
}

impl_binary_op_for_expression!(Add, add, Add);
impl_binary_op_for_expression!(Sub, sub, Subtract);
impl_binary_op_for_expression!(Mul, mul, Multiply);
impl_binary_op_for_expression!(Div, div, Divide);
impl_binary_op_for_expression!(Rem, rem, Modulo);
impl_binary_op_for_expression!(BitAnd, bitand, BitwiseAnd);
impl_binary_op_for_expression!(BitOr, bitor, BitwiseOr);
impl_binary_op_for_expression!(BitXor, bitxor, BitwiseXor);

impl_unary_op_for_expression!(Not, not, BitwiseNot);
