use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
	static ref VALID_NAME_REGEX: Regex = Regex::new(r"^[a-zA-Z_][0-9a-zA-Z_]*$").unwrap();
}

/// Checks if given name can be used for a module, signal or instance.
/// Names end up joined with dots in flattened netlists, so they have to be plain identifiers.
pub(super) fn is_name_valid(name: &str) -> bool {
	VALID_NAME_REGEX.is_match(name)
}
