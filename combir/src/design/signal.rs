use std::ops::Range;

use super::utils::is_name_valid;
use super::{DesignError, DesignHandle, InstanceId, ModuleId, SignalId, MAX_SIGNAL_WIDTH};

/// Determines representation of a signal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalShape {
	/// Unsigned integer with given bit width, any value in `[0, 2^width)` is valid
	Unsigned(u32),

	/// Unsigned integer restricted to the inclusive range `[lo, hi]`.
	/// Its width is the minimal width able to hold `hi`.
	Range { lo: u64, hi: u64 },
}

impl SignalShape {
	/// Returns the bit width of the shape
	pub fn width(&self) -> u32 {
		match self {
			Self::Unsigned(width) => *width,
			Self::Range { hi, .. } => (u64::BITS - hi.leading_zeros()).max(1),
		}
	}

	/// Returns the set of values which are valid inputs for this shape
	pub fn domain(&self) -> Domain {
		match self {
			Self::Unsigned(width) => Domain {
				lo: 0,
				hi: mask(*width),
			},
			Self::Range { lo, hi } => Domain { lo: *lo, hi: *hi },
		}
	}

	fn validate(&self) -> Result<(), DesignError> {
		match self {
			Self::Unsigned(width) if *width == 0 || *width > MAX_SIGNAL_WIDTH => {
				Err(DesignError::InvalidSignalWidth(*width))
			},
			Self::Range { lo, hi } if lo > hi => Err(DesignError::InvalidSignalRange { lo: *lo, hi: *hi }),
			_ => Ok(()),
		}
	}
}

/// All-ones value of the given width
pub(crate) fn mask(width: u32) -> u64 {
	if width >= u64::BITS {
		u64::MAX
	}
	else {
		(1u64 << width) - 1
	}
}

/// Inclusive range of valid values of a signal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Domain {
	pub lo: u64,
	pub hi: u64,
}

impl Domain {
	/// Number of values in the domain
	pub fn size(&self) -> u128 {
		(self.hi - self.lo) as u128 + 1
	}

	pub fn contains(&self, value: u64) -> bool {
		value >= self.lo && value <= self.hi
	}
}

/// Specifies direction for signals in module interface
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignalDirection {
	/// Input signal (from the perspective of the module)
	Input,

	/// Output signal (from the perspective of the module)
	Output,
}

/// Signal representation
#[derive(Clone, Debug)]
pub struct Signal {
	/// Self-reference
	pub(super) id: SignalId,

	/// Module owning the signal
	pub module: ModuleId,

	/// Name of the signal
	pub name: String,

	/// Width or value range
	pub shape: SignalShape,

	/// Value the signal holds when nothing drives it
	pub initial: u64,

	/// Interface direction, if the signal is exposed
	pub direction: Option<SignalDirection>,
}

impl Signal {
	pub fn id(&self) -> SignalId {
		self.id
	}

	pub fn width(&self) -> u32 {
		self.shape.width()
	}
}

/// References a signal either directly or through an instance of a submodule
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalRef {
	/// Instance the signal is accessed through (`None` for signals of the current module)
	pub instance: Option<InstanceId>,

	/// Referenced signal (an interface signal of the instantiated module if `instance` is set)
	pub signal: SignalId,
}

impl SignalRef {
	/// Selects a range of bits (`lsb..msb+1`)
	pub fn bits(self, range: Range<u32>) -> SignalSlice {
		SignalSlice {
			signal: self,
			bits: Some(range),
		}
	}

	/// Selects a single bit
	pub fn bit(self, index: u32) -> SignalSlice {
		self.bits(index..index + 1)
	}
}

impl From<SignalId> for SignalRef {
	fn from(signal: SignalId) -> Self {
		Self {
			instance: None,
			signal,
		}
	}
}

impl SignalId {
	/// Selects a range of bits (`lsb..msb+1`)
	pub fn bits(self, range: Range<u32>) -> SignalSlice {
		SignalRef::from(self).bits(range)
	}

	/// Selects a single bit
	pub fn bit(self, index: u32) -> SignalSlice {
		SignalRef::from(self).bit(index)
	}
}

/// Determines which bits of a signal are driven by an assignment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignalSlice {
	/// Signal being accessed
	pub signal: SignalRef,

	/// Bit range, `None` meaning the whole signal
	pub bits: Option<Range<u32>>,
}

impl SignalSlice {
	/// Returns the `(lsb, width)` pair of the slice, given the width of the signal
	pub fn lsb_width(&self, signal_width: u32) -> Result<(u32, u32), DesignError> {
		match &self.bits {
			None => Ok((0, signal_width)),
			Some(range) if range.start >= range.end => Err(DesignError::EmptySlice),
			Some(range) if range.end > signal_width => Err(super::SliceOutOfRangeError {
				lsb: range.start,
				width: range.end - range.start,
				operand_width: signal_width,
			}
			.into()),
			Some(range) => Ok((range.start, range.end - range.start)),
		}
	}
}

impl From<SignalRef> for SignalSlice {
	fn from(signal: SignalRef) -> Self {
		Self { signal, bits: None }
	}
}

impl From<SignalId> for SignalSlice {
	fn from(signal: SignalId) -> Self {
		SignalRef::from(signal).into()
	}
}

/// Signal builder helper
pub struct SignalBuilder {
	/// Handle to the design where the signal will be added
	design: DesignHandle,

	/// Module owning the signal
	module: ModuleId,

	/// Name for the signal
	name: String,

	/// Signal representation
	shape: Option<SignalShape>,

	/// Signal to copy the shape from
	like: Option<SignalId>,

	/// Initial value
	initial: u64,
}

impl SignalBuilder {
	/// Starts building a new signal
	pub fn new(design: DesignHandle, module: ModuleId, name: &str) -> Self {
		Self {
			design,
			module,
			name: name.into(),
			shape: None,
			like: None,
			initial: 0,
		}
	}

	/// Sets type to unsigned and specifies width
	pub fn unsigned(mut self, width: u32) -> Self {
		assert!(self.shape.is_none() && self.like.is_none());
		self.shape = Some(SignalShape::Unsigned(width));
		self
	}

	/// Restricts the signal to an inclusive range of values
	pub fn range(mut self, lo: u64, hi: u64) -> Self {
		assert!(self.shape.is_none() && self.like.is_none());
		self.shape = Some(SignalShape::Range { lo, hi });
		self
	}

	/// Copies the shape of another signal
	pub fn like(mut self, other: SignalId) -> Self {
		assert!(self.shape.is_none() && self.like.is_none());
		self.like = Some(other);
		self
	}

	/// Sets the value of the signal when it is not driven
	pub fn initial(mut self, value: u64) -> Self {
		self.initial = value;
		self
	}

	/// Creates the signal and adds it to the design. Returns the signal ID.
	pub fn build(self) -> Result<SignalId, DesignError> {
		if !is_name_valid(&self.name) {
			return Err(DesignError::InvalidName(self.name));
		}

		let mut design = self.design.borrow_mut();
		let shape = match (self.shape, self.like) {
			(Some(shape), None) => shape,
			(None, Some(other)) => {
				design
					.get_signal(other)
					.ok_or(DesignError::InvalidSignalId(other))?
					.shape
			},
			_ => return Err(DesignError::SignalShapeNotSpecified),
		};

		shape.validate()?;
		if self.initial > mask(shape.width()) {
			return Err(DesignError::InvalidInitialValue(self.initial));
		}

		design.add_signal(Signal {
			id: SignalId { id: 0 },
			module: self.module,
			name: self.name,
			shape,
			initial: self.initial,
			direction: None,
		})
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::design::Design;

	#[test]
	fn test_range_width() {
		assert_eq!(SignalShape::Range { lo: 1, hi: 9999 }.width(), 14);
		assert_eq!(SignalShape::Range { lo: 0, hi: 10000 }.width(), 14);
		assert_eq!(SignalShape::Range { lo: 0, hi: 0 }.width(), 1);
		assert_eq!(SignalShape::Range { lo: 0, hi: 1 }.width(), 1);
		assert_eq!(SignalShape::Range { lo: 0, hi: 2 }.width(), 2);
	}

	#[test]
	fn test_domains() {
		assert_eq!(SignalShape::Unsigned(4).domain(), Domain { lo: 0, hi: 15 });
		assert_eq!(SignalShape::Unsigned(64).domain().size(), 1u128 << 64);
		assert!(SignalShape::Range { lo: 3, hi: 7 }.domain().contains(7));
		assert!(!SignalShape::Range { lo: 3, hi: 7 }.domain().contains(2));
	}

	#[test]
	fn test_invalid_shapes() -> Result<(), DesignError> {
		let mut d = Design::new();
		let mut m = d.new_module("test")?;

		assert!(matches!(
			m.scope().new_signal("zero")?.unsigned(0).build(),
			Err(DesignError::InvalidSignalWidth(0))
		));
		assert!(matches!(
			m.scope().new_signal("wide")?.unsigned(65).build(),
			Err(DesignError::InvalidSignalWidth(65))
		));
		assert!(matches!(
			m.scope().new_signal("backwards")?.range(5, 2).build(),
			Err(DesignError::InvalidSignalRange { lo: 5, hi: 2 })
		));
		assert!(matches!(
			m.scope().new_signal("init")?.unsigned(2).initial(4).build(),
			Err(DesignError::InvalidInitialValue(4))
		));
		assert!(matches!(
			m.scope().new_signal("no_shape")?.build(),
			Err(DesignError::SignalShapeNotSpecified)
		));
		Ok(())
	}

	#[test]
	fn test_slice_bounds() {
		let sig = SignalId { id: 1 };
		assert_eq!(sig.bits(2..5).lsb_width(8).unwrap(), (2, 3));
		assert_eq!(SignalSlice::from(sig).lsb_width(8).unwrap(), (0, 8));
		assert!(matches!(sig.bits(6..9).lsb_width(8), Err(DesignError::SliceOutOfRange(_))));
		assert!(matches!(sig.bits(3..3).lsb_width(8), Err(DesignError::EmptySlice)));
	}
}
