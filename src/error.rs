use hyper::Method;
use thiserror::Error;

/// Why a route could not be registered.
#[derive(Debug, Error)]
pub enum InvalidRegistration {
	#[error("route template must not be empty")]
	EmptyTemplate,

	#[error("route template `{0}` has a brace outside of a `{{name}}` placeholder")]
	MalformedTemplate(String),

	#[error("method {0} is not routable")]
	UnsupportedMethod(Method),

	#[error("resource `{resource}` has no `{action}` handler")]
	MissingHandler {
		resource: String,
		action: &'static str,
	},

	#[error("route template `{template}` does not compile: {source}")]
	Pattern {
		template: String,
		#[source]
		source: regex::Error,
	},
}
