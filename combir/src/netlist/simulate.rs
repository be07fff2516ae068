use thiserror::Error;

use super::{NetDriver, NetId, Netlist};
use crate::design::SignalRef;

#[derive(Clone, Debug)]
pub struct DomainError {
	pub name: String,
	pub value: u64,
	pub lo: u64,
	pub hi: u64,
}

impl From<DomainError> for SimError {
	fn from(err: DomainError) -> Self {
		Self::Domain(Box::new(err))
	}
}

/// Errors rejecting an input assignment before evaluation
#[derive(Clone, Debug, Error)]
pub enum SimError {
	#[error("Input '{0}' was not assigned a value")]
	MissingInput(String),

	#[error("'{0}' is not an input of the netlist")]
	NotAnInput(String),

	#[error("Value is outside of the input domain")]
	Domain(Box<DomainError>),
}

#[derive(Clone, Debug)]
enum InputKey {
	Signal(SignalRef),
	Name(String),
}

/// Values of the top-level inputs for a single simulation
#[derive(Clone, Debug, Default)]
pub struct InputAssignment {
	values: Vec<(InputKey, u64)>,
}

impl InputAssignment {
	pub fn new() -> Self {
		Self::default()
	}

	/// Assigns a value to an input signal of the top module
	pub fn with(mut self, signal: impl Into<SignalRef>, value: u64) -> Self {
		self.values.push((InputKey::Signal(signal.into()), value));
		self
	}

	/// Assigns a value to an input net by its flattened name
	pub fn with_name(mut self, name: &str, value: u64) -> Self {
		self.values.push((InputKey::Name(name.into()), value));
		self
	}
}

/// Values of all nets after a simulation
pub struct SimValues<'n> {
	netlist: &'n Netlist,
	values: Vec<u64>,
}

impl<'n> SimValues<'n> {
	/// Value of a top module signal (or a port of one of its instances)
	pub fn get(&self, signal: impl Into<SignalRef>) -> Option<u64> {
		self.netlist.net_of(signal).map(|id| self.values[id.0])
	}

	/// Value of a net by its flattened name
	pub fn by_name(&self, name: &str) -> Option<u64> {
		self.netlist.find(name).map(|id| self.values[id.0])
	}

	pub fn net(&self, id: NetId) -> u64 {
		self.values[id.0]
	}

	/// Iterates over `(name, value)` pairs of all nets
	pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
		self.netlist
			.nets()
			.iter()
			.zip(self.values.iter())
			.map(|(net, value)| (net.name.as_str(), *value))
	}
}

impl Netlist {
	/// Evaluates the netlist for a complete assignment of its inputs
	pub fn simulate(&self, inputs: &InputAssignment) -> Result<SimValues<'_>, SimError> {
		let mut values = vec![0u64; self.nets.len()];
		let mut assigned = vec![false; self.nets.len()];

		for (key, value) in &inputs.values {
			let id = match key {
				InputKey::Signal(signal) => self
					.net_of(*signal)
					.ok_or_else(|| SimError::NotAnInput(format!("{:?}", signal)))?,
				InputKey::Name(name) => self.find(name).ok_or_else(|| SimError::NotAnInput(name.clone()))?,
			};

			let net = &self.nets[id.0];
			let NetDriver::Input(domain) = net.driver
			else {
				return Err(SimError::NotAnInput(net.name.clone()));
			};

			if !domain.contains(*value) {
				return Err(DomainError {
					name: net.name.clone(),
					value: *value,
					lo: domain.lo,
					hi: domain.hi,
				}
				.into());
			}

			values[id.0] = *value;
			assigned[id.0] = true;
		}

		if let Some(missing) = self.inputs.iter().find(|id| !assigned[id.0]) {
			return Err(SimError::MissingInput(self.nets[missing.0].name.clone()));
		}

		self.evaluate(&mut values);
		Ok(SimValues { netlist: self, values })
	}
}
