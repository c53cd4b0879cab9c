/// Pattern every placeholder compiles to.
pub const PATTERN: &str = "([0-9A-Za-z_]+)";

/// A named placeholder taken from a `{name}` span of a route template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
	name: String,
}

impl Parameter {
	/// Builds a parameter from the literal placeholder text, braces included.
	pub fn from_placeholder(placeholder: &str) -> Self {
		let name = placeholder
			.strip_prefix('{')
			.and_then(|rest| rest.strip_suffix('}'))
			.unwrap_or(placeholder);

		Self {
			name: name.to_owned(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn pattern(&self) -> &'static str {
		PATTERN
	}
}
