use super::{
	BinaryExpression, BinaryOp, ConditionalExpression, Expression, SliceExpression, UnaryExpression, UnaryOp,
};
use crate::design::{DesignCore, DesignError, SliceOutOfRangeError, MAX_SIGNAL_WIDTH};

impl BinaryOp {
	/// Width of the result given operand widths.
	/// Results wider than 64 bits wrap around at 64 bits.
	pub fn result_width(&self, lhs: u32, rhs: u32) -> u32 {
		use BinaryOp::*;
		let width = match self {
			Add => lhs.max(rhs) + 1,
			Multiply => lhs + rhs,
			Subtract | Divide | Modulo => lhs.max(rhs),
			BitwiseAnd | BitwiseOr | BitwiseXor => lhs.max(rhs),
			LogicalAnd | LogicalOr => 1,
			Equal | NotEqual | Less | LessEqual | Greater | GreaterEqual => 1,
		};
		width.min(MAX_SIGNAL_WIDTH)
	}
}

impl UnaryOp {
	/// Width of the result given operand width
	pub fn result_width(&self, operand: u32) -> u32 {
		use UnaryOp::*;
		match self {
			BitwiseNot => operand,
			LogicalNot | ReductionAnd | ReductionOr | ReductionXor => 1,
		}
	}
}

/// Checks that `width` bits starting at `lsb` fit into an operand of `operand_width` bits
pub(crate) fn check_slice(lsb: u32, width: u32, operand_width: u32) -> Result<(), DesignError> {
	if width == 0 {
		return Err(DesignError::EmptySlice);
	}

	if lsb.checked_add(width).map_or(true, |end| end > operand_width) {
		return Err(SliceOutOfRangeError {
			lsb,
			width,
			operand_width,
		}
		.into());
	}

	Ok(())
}

/// Total width of a concatenation
pub(crate) fn concat_width(parts: impl Iterator<Item = u32>) -> Result<u32, DesignError> {
	let mut total = 0u32;
	let mut count = 0;
	for width in parts {
		total = total.saturating_add(width);
		count += 1;
	}

	if count == 0 {
		return Err(DesignError::EmptyConcat);
	}

	if total > MAX_SIGNAL_WIDTH {
		return Err(DesignError::ExpressionTooWide(total));
	}

	Ok(total)
}

/// Computes (and validates) the width of an expression in the context of a design
pub trait ExpressionWidth {
	fn width(&self, design: &DesignCore) -> Result<u32, DesignError>;
}

impl ExpressionWidth for UnaryExpression {
	fn width(&self, design: &DesignCore) -> Result<u32, DesignError> {
		Ok(self.op.result_width(self.operand.width(design)?))
	}
}

impl ExpressionWidth for BinaryExpression {
	fn width(&self, design: &DesignCore) -> Result<u32, DesignError> {
		Ok(self.op.result_width(self.lhs.width(design)?, self.rhs.width(design)?))
	}
}

impl ExpressionWidth for SliceExpression {
	fn width(&self, design: &DesignCore) -> Result<u32, DesignError> {
		check_slice(self.lsb, self.width, self.operand.width(design)?)?;
		Ok(self.width)
	}
}

impl ExpressionWidth for ConditionalExpression {
	fn width(&self, design: &DesignCore) -> Result<u32, DesignError> {
		let mut width = self.default.width(design)?;
		for branch in &self.branches {
			branch.condition.width(design)?;
			width = width.max(branch.value.width(design)?);
		}
		Ok(width)
	}
}

impl ExpressionWidth for Expression {
	fn width(&self, design: &DesignCore) -> Result<u32, DesignError> {
		use Expression::*;
		match self {
			Constant(constant) => Ok(constant.width()),
			Signal(sig) => design
				.get_signal(sig.signal)
				.map(|s| s.width())
				.ok_or(DesignError::InvalidSignalId(sig.signal)),
			Slice(expr) => expr.width(design),
			Concat(parts) => {
				let widths = parts.iter().map(|p| p.width(design)).collect::<Result<Vec<_>, _>>()?;
				concat_width(widths.into_iter())
			},
			Unary(expr) => expr.width(design),
			Binary(expr) => expr.width(design),
			Conditional(expr) => expr.width(design),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::design::{Design, SignalDirection};

	#[test]
	fn test_width_rules() {
		assert_eq!(BinaryOp::Add.result_width(8, 3), 9);
		assert_eq!(BinaryOp::Multiply.result_width(4, 3), 7);
		assert_eq!(BinaryOp::Subtract.result_width(5, 1), 5);
		assert_eq!(BinaryOp::Modulo.result_width(14, 9), 14);
		assert_eq!(BinaryOp::Equal.result_width(14, 9), 1);
		assert_eq!(BinaryOp::Multiply.result_width(40, 40), 64);
		assert_eq!(UnaryOp::BitwiseNot.result_width(5), 5);
		assert_eq!(UnaryOp::ReductionAnd.result_width(5), 1);
	}

	#[test]
	fn test_expression_widths() -> Result<(), DesignError> {
		let mut d = Design::new();
		let mut m = d.new_module("widths")?;
		let cells = m.scope().new_signal("cells")?.unsigned(9).build()?;
		let nickels = m.scope().new_signal("nickels")?.unsigned(4).build()?;
		m.expose(cells, SignalDirection::Input)?;

		let core = d.borrow();
		assert_eq!((Expression::from(nickels) * 5u64).width(&core)?, 7);
		assert_eq!(Expression::from(cells).bits(0..3).width(&core)?, 3);
		assert_eq!(
			Expression::concat(vec![cells.into(), Expression::from(nickels)]).width(&core)?,
			13
		);
		assert_eq!(
			Expression::from(cells).bit(0).mux(nickels.into(), 0u64.into()).width(&core)?,
			4
		);
		Ok(())
	}

	#[test]
	fn test_slice_out_of_range() -> Result<(), DesignError> {
		let mut d = Design::new();
		let mut m = d.new_module("slices")?;
		let cells = m.scope().new_signal("cells")?.unsigned(9).build()?;

		let core = d.borrow();
		assert!(matches!(
			Expression::from(cells).bits(7..10).width(&core),
			Err(DesignError::SliceOutOfRange(_))
		));
		assert!(matches!(
			Expression::concat(vec![]).width(&core),
			Err(DesignError::EmptyConcat)
		));
		Ok(())
	}
}
