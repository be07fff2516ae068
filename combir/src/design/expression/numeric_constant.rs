use crate::design::signal::mask;
use crate::design::{DesignError, MAX_SIGNAL_WIDTH};

/// Represents a numeric constant value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NumericConstant {
	value: u64,
	width: u32,
}

impl NumericConstant {
	/// New unsigned constant with bit width optimal to store the provided value
	pub fn new_unsigned(value: u64) -> Self {
		let width = (u64::BITS - value.leading_zeros()).max(1);
		Self { value, width }
	}

	/// New constant with explicitly specified width
	pub fn new(value: u64, width: u32) -> Result<Self, DesignError> {
		if width == 0 || width > MAX_SIGNAL_WIDTH {
			return Err(DesignError::InvalidSignalWidth(width));
		}

		if value > mask(width) {
			return Err(DesignError::NumericConstantWidthTooSmall);
		}

		Ok(Self { value, width })
	}

	pub fn zero() -> NumericConstant {
		Self::new_unsigned(0)
	}

	pub fn one() -> NumericConstant {
		Self::new_unsigned(1)
	}

	pub fn value(&self) -> u64 {
		self.value
	}

	pub fn width(&self) -> u32 {
		self.width
	}

	pub fn is_zero(&self) -> bool {
		self.value == 0
	}
}

impl From<u64> for NumericConstant {
	fn from(value: u64) -> Self {
		Self::new_unsigned(value)
	}
}

impl From<u32> for NumericConstant {
	fn from(value: u32) -> Self {
		Self::new_unsigned(value.into())
	}
}

impl From<bool> for NumericConstant {
	fn from(value: bool) -> Self {
		Self::new_unsigned(value.into())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_minimal_width() {
		assert_eq!(NumericConstant::from(0u64).width(), 1);
		assert_eq!(NumericConstant::from(1u64).width(), 1);
		assert_eq!(NumericConstant::from(5u64).width(), 3);
		assert_eq!(NumericConstant::from(100u32).width(), 7);
		assert_eq!(NumericConstant::from(u64::MAX).width(), 64);
	}

	#[test]
	fn test_explicit_width() {
		assert_eq!(NumericConstant::new(3, 8).unwrap().width(), 8);
		assert!(matches!(
			NumericConstant::new(16, 4),
			Err(DesignError::NumericConstantWidthTooSmall)
		));
		assert!(matches!(NumericConstant::new(0, 0), Err(DesignError::InvalidSignalWidth(0))));
	}
}
