use crate::parameter::Parameter;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Template of the method-scoped catch-all route.
pub const WILDCARD: &str = "*";

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[0-9A-Za-z_]+\}").unwrap());
static QUERY_PAIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"([^?=&]+)(=([^&]*))?").unwrap());

/// A compiled route template.
///
/// Placeholders (`{name}`) become capture groups in `matcher`, in template order; literal text is
/// matched verbatim. The matcher is anchored at the end of the path and at its start, where a
/// single leading `/` is optional, so `users/{id}` and `/users/{id}` are interchangeable.
///
/// Anchoring the start is deliberate: a template without placeholders then accepts exactly its
/// own path, and `users/{id}` does not also match `/api/users/4`. Mount such routes under a
/// prefix group instead.
#[derive(Debug, Clone)]
pub struct Route {
	template: String,
	matcher: Regex,
	parameters: Vec<Parameter>,
}

impl Route {
	pub fn new(template: &str) -> Result<Self, regex::Error> {
		let template = strip_trailing_slash(template);

		if template == WILDCARD {
			return Ok(Self {
				template: template.to_owned(),
				matcher: Regex::new("([^ ]+)$")?,
				parameters: vec![],
			});
		}

		let body = template.strip_prefix('/').unwrap_or(template);
		let mut pattern = String::from("^/?");
		let mut parameters = vec![];
		let mut literal_start = 0;

		for span in PLACEHOLDER.find_iter(body) {
			pattern.push_str(&regex::escape(&body[literal_start..span.start()]));

			let parameter = Parameter::from_placeholder(span.as_str());
			pattern.push_str(parameter.pattern());
			parameters.push(parameter);

			literal_start = span.end();
		}

		pattern.push_str(&regex::escape(&body[literal_start..]));
		pattern.push('$');

		Ok(Self {
			template: template.to_owned(),
			matcher: Regex::new(&pattern)?,
			parameters,
		})
	}

	pub fn template(&self) -> &str {
		&self.template
	}

	pub fn parameters(&self) -> &[Parameter] {
		&self.parameters
	}

	pub fn is_wildcard(&self) -> bool {
		self.template == WILDCARD
	}

	/// Whether `path` (query string and trailing slash ignored) is accepted by this route.
	pub fn matches(&self, path: &str) -> bool {
		self.matcher.is_match(clean(path))
	}

	/// Pairs each placeholder with the path text it captured.
	///
	/// Only meaningful after [`Route::matches`] accepted `path`; otherwise the map is empty.
	pub fn extract_parameters(&self, path: &str) -> HashMap<String, String> {
		let mut params = HashMap::new();

		if let Some(captures) = self.matcher.captures(clean(path)) {
			for (parameter, capture) in self.parameters.iter().zip(captures.iter().skip(1)) {
				if let Some(value) = capture {
					params.insert(parameter.name().to_owned(), value.as_str().to_owned());
				}
			}
		}

		params
	}
}

/// Checks that every brace in `template` belongs to a `{identifier}` placeholder.
pub fn is_well_formed(template: &str) -> bool {
	let rest = PLACEHOLDER.replace_all(template, "");
	!rest.contains('{') && !rest.contains('}')
}

/// Decodes the `key=value` pairs following the first `?` of `url`.
///
/// A key without `=` maps to `None`. For a repeated key the first non-empty value wins: an
/// earlier valueless (`a`) or empty (`a=`) occurrence is replaced by a later value, a stored
/// non-empty value never is. Keys starting with `/` are dropped. Values are kept as they appear
/// in the URL.
pub fn parse_query(url: &str) -> HashMap<String, Option<String>> {
	let mut query = HashMap::new();

	let component = match url.find('?') {
		Some(index) => &url[index + 1..],
		None => return query,
	};

	for pair in QUERY_PAIR.captures_iter(component) {
		let key = &pair[1];
		if key.starts_with('/') {
			continue;
		}

		let value = pair.get(3).map(|value| value.as_str().to_owned());
		let slot: &mut Option<String> = query.entry(key.to_owned()).or_default();
		if value.is_some() && slot.as_deref().map_or(true, str::is_empty) {
			*slot = value;
		}
	}

	query
}

fn strip_trailing_slash(template: &str) -> &str {
	if template.len() > 1 {
		template.strip_suffix('/').unwrap_or(template)
	} else {
		template
	}
}

fn clean(path: &str) -> &str {
	let path = match path.find('?') {
		Some(index) => &path[..index],
		None => path,
	};

	path.strip_suffix('/').unwrap_or(path)
}
