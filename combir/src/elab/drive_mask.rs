use std::ops::Shl;

use num_bigint::BigUint;

/// Set of bits of a signal, used to track which bits are driven
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignalMask {
	/// All bits set or all bits clear
	Full { width: u32, set: bool },

	/// Arbitrary subset of bits
	Sparse { width: u32, mask: BigUint },
}

impl SignalMask {
	pub fn new(width: u32) -> Self {
		assert_ne!(width, 0, "SignalMask width cannot be 0");
		Self::Full { width, set: false }
	}

	pub fn width(&self) -> u32 {
		match self {
			Self::Full { width, .. } | Self::Sparse { width, .. } => *width,
		}
	}

	fn ones(width: u32) -> BigUint {
		BigUint::from(1u32).shl(width) - 1u32
	}

	fn range_mask(lsb: u32, msb: u32) -> BigUint {
		Self::ones(msb - lsb + 1).shl(lsb)
	}

	fn bits(&self) -> BigUint {
		match self {
			Self::Full { set: false, .. } => BigUint::from(0u32),
			Self::Full { width, set: true } => Self::ones(*width),
			Self::Sparse { mask, .. } => mask.clone(),
		}
	}

	/// Collapses the sparse representation if all bits are equal
	fn normalized(width: u32, mask: BigUint) -> Self {
		if mask == BigUint::from(0u32) {
			Self::Full { width, set: false }
		}
		else if mask == Self::ones(width) {
			Self::Full { width, set: true }
		}
		else {
			Self::Sparse { width, mask }
		}
	}

	pub fn get_bit(&self, bit: u32) -> bool {
		assert!(bit < self.width());
		match self {
			Self::Full { set, .. } => *set,
			Self::Sparse { mask, .. } => mask.bit(bit as u64),
		}
	}

	/// Sets bits `lsb..=msb` and returns the bits which were already set
	pub fn set_bits(&mut self, lsb: u32, msb: u32) -> SignalMask {
		let width = self.width();
		assert!(lsb <= msb && msb < width);

		let range = Self::range_mask(lsb, msb);
		let current = self.bits();
		let conflict = &current & &range;
		*self = Self::normalized(width, current | range);
		Self::normalized(width, conflict)
	}

	pub fn is_empty(&self) -> bool {
		matches!(self, Self::Full { set: false, .. })
	}

	pub fn is_full(&self) -> bool {
		matches!(self, Self::Full { set: true, .. })
	}

	/// Inclusive `(lsb, msb)` ranges of bits with the given state
	pub fn ranges(&self, set: bool) -> Vec<(u32, u32)> {
		let mut ranges = vec![];
		let mut group_start = None;

		for i in 0..self.width() {
			match (self.get_bit(i) == set, group_start) {
				(true, None) => group_start = Some(i),
				(false, Some(start)) => {
					ranges.push((start, i - 1));
					group_start = None;
				},
				_ => {},
			}
		}

		if let Some(start) = group_start {
			ranges.push((start, self.width() - 1));
		}

		ranges
	}
}
