use num_bigint::BigUint;
use rand::rngs::StdRng;
use rand::Rng;

use crate::design::Domain;
use crate::netlist::{NetDriver, NetId, Netlist};

/// Cartesian product of the domains of a set of inputs.
///
/// Candidates are numbered in mixed radix with the last input varying fastest,
/// so increasing indices walk the space in lexicographic order.
#[derive(Clone, Debug)]
pub(super) struct InputSpace {
	inputs: Vec<(NetId, Domain)>,
	size: BigUint,
}

impl InputSpace {
	pub fn new(netlist: &Netlist, inputs: &[NetId]) -> Self {
		let inputs: Vec<(NetId, Domain)> = inputs
			.iter()
			.filter_map(|id| match netlist.net(*id).driver {
				NetDriver::Input(domain) => Some((*id, domain)),
				NetDriver::Expr(_) => None,
			})
			.collect();

		let size = inputs
			.iter()
			.fold(BigUint::from(1u32), |acc, (_, domain)| acc * BigUint::from(domain.size()));

		Self { inputs, size }
	}

	pub fn size(&self) -> &BigUint {
		&self.size
	}

	/// Number of bits needed to index every candidate
	pub fn bits(&self) -> u64 {
		if self.size <= BigUint::from(1u32) {
			return 0;
		}
		(&self.size - 1u32).bits()
	}

	/// Number of candidates, if it fits in a `u64`
	pub fn len(&self) -> Option<u64> {
		u64::try_from(&self.size).ok()
	}

	/// Writes the values of candidate `index` into `values`
	pub fn load(&self, index: u64, values: &mut [u64]) {
		let mut rest = index as u128;
		for (id, domain) in self.inputs.iter().rev() {
			let radix = domain.size();
			values[id.index()] = domain.lo + (rest % radix) as u64;
			rest /= radix;
		}
	}

	/// Writes a uniformly drawn candidate into `values`
	pub fn sample(&self, rng: &mut StdRng, values: &mut [u64]) {
		for (id, domain) in &self.inputs {
			values[id.index()] = rng.gen_range(domain.lo..=domain.hi);
		}
	}
}
