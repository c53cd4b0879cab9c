use crate::{
	chain::{self, Handler, Next},
	error::InvalidRegistration,
	request::{Request, Response},
	route::{self, parse_query, Route},
};
use anyhow::{Error, Result};
use hyper::{Method, StatusCode};
use serde_json::Value;
use std::{
	collections::HashMap,
	fmt::{self, Debug, Formatter},
	sync::Arc,
};
use tracing::{debug, trace, warn};

/// Methods routes can be registered for.
pub const METHODS: [Method; 7] = [
	Method::GET,
	Method::POST,
	Method::PUT,
	Method::DELETE,
	Method::PATCH,
	Method::HEAD,
	Method::OPTIONS,
];

const CRUD: [(&str, Method, &str); 5] = [
	("index", Method::GET, ""),
	("create", Method::POST, ""),
	("read", Method::GET, "/{id}"),
	("update", Method::PUT, "/{id}"),
	("delete", Method::DELETE, "/{id}"),
];

/// A route bound to one method, with its middleware and final handler.
pub struct Endpoint {
	route: Route,
	chain: Vec<Handler>,
}

impl Endpoint {
	pub fn route(&self) -> &Route {
		&self.route
	}

	pub fn middleware(&self) -> &[Handler] {
		&self.chain[..self.chain.len() - 1]
	}

	pub fn handler(&self) -> &Handler {
		&self.chain[self.chain.len() - 1]
	}

	/// Middleware followed by the handler.
	pub fn chain(&self) -> &[Handler] {
		&self.chain
	}
}

impl Debug for Endpoint {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Endpoint")
			.field("route", &self.route.template())
			.field("middleware", &self.middleware().len())
			.finish()
	}
}

type Routes = HashMap<Method, Vec<Endpoint>>;

pub type InternalErrorHandler = fn(e: Error) -> Response;
fn default_error_handler(e: Error) -> Response {
	Response::text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

pub type NotFoundHandler = fn(req: &Request) -> Response;
fn default_not_found_handler(req: &Request) -> Response {
	Response::text(
		StatusCode::NOT_FOUND,
		format!("cannot {} {}", req.method(), req.url()),
	)
}

/// Turns a raw request body into the value handed to handlers as `req.body`.
pub type BodyParser = fn(body: &[u8]) -> Result<Option<Value>>;

/// Parses the body as JSON. A blank body yields `None`.
pub fn json_body(body: &[u8]) -> Result<Option<Value>> {
	if body.iter().all(u8::is_ascii_whitespace) {
		return Ok(None);
	}

	Ok(Some(serde_json::from_slice(body)?))
}

fn recognize(method: &str) -> Option<Method> {
	let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes()).ok()?;
	if METHODS.contains(&method) {
		Some(method)
	} else {
		None
	}
}

macro_rules! verbs {
	($($name:ident => $method:ident),* $(,)?) => {
		$(
			#[doc = concat!("Registers a `", stringify!($method), "` route.")]
			fn $name<F>(
				&mut self,
				template: &str,
				middleware: Vec<Handler>,
				handler: F,
			) -> Result<&mut Self, InvalidRegistration>
			where
				F: Fn(&mut Request, &mut Response, Next<'_>) -> Result<()> + Send + Sync + 'static,
			{
				self.add(Method::$method, template, middleware, chain::handler(handler))
			}
		)*
	};
}

/// The registration API, shared by [`RouterBuilder`] and prefixed [`Scope`]s.
///
/// Routes are tried in registration order, so register specific templates before the ones that
/// could shadow them.
pub trait Register {
	/// Registers `handler`, preceded by `middleware`, for `method` and `template`.
	fn add(
		&mut self,
		method: Method,
		template: &str,
		middleware: Vec<Handler>,
		handler: Handler,
	) -> Result<&mut Self, InvalidRegistration>;

	/// A registration context that prefixes every template with `prefix`.
	fn scope(&mut self, prefix: &str) -> Scope<'_>;

	verbs! {
		get => GET,
		post => POST,
		put => PUT,
		delete => DELETE,
		patch => PATCH,
		head => HEAD,
		options => OPTIONS,
	}

	/// Registers the same route for every listed method. Unknown methods are skipped.
	fn match_methods<F>(
		&mut self,
		methods: &[&str],
		template: &str,
		middleware: Vec<Handler>,
		handler: F,
	) -> Result<&mut Self, InvalidRegistration>
	where
		F: Fn(&mut Request, &mut Response, Next<'_>) -> Result<()> + Send + Sync + 'static,
	{
		let handler = chain::handler(handler);
		for method in methods.iter().filter_map(|method| recognize(method)) {
			self.add(method, template, middleware.clone(), Arc::clone(&handler))?;
		}

		Ok(self)
	}

	/// Registers the same route for every method in [`METHODS`].
	fn any<F>(
		&mut self,
		template: &str,
		middleware: Vec<Handler>,
		handler: F,
	) -> Result<&mut Self, InvalidRegistration>
	where
		F: Fn(&mut Request, &mut Response, Next<'_>) -> Result<()> + Send + Sync + 'static,
	{
		let handler = chain::handler(handler);
		for method in METHODS.iter() {
			self.add(method.clone(), template, middleware.clone(), Arc::clone(&handler))?;
		}

		Ok(self)
	}

	/// Runs `body` against a scope whose templates are prefixed with `prefix`.
	fn prefix<B>(&mut self, prefix: &str, body: B) -> Result<&mut Self, InvalidRegistration>
	where
		B: FnOnce(&mut Scope<'_>) -> Result<(), InvalidRegistration>,
	{
		body(&mut self.scope(prefix))?;
		Ok(self)
	}

	/// Registers the index, create, read, update and delete routes of `resource`, minus the
	/// actions named in `except`.
	fn crud(
		&mut self,
		resource: &str,
		except: &[&str],
		middleware: Vec<Handler>,
		handlers: Resource,
	) -> Result<&mut Self, InvalidRegistration> {
		for (action, method, suffix) in CRUD.iter() {
			if except.contains(action) {
				continue;
			}

			let handler = handlers
				.get(action)
				.cloned()
				.ok_or_else(|| InvalidRegistration::MissingHandler {
					resource: resource.to_owned(),
					action: *action,
				})?;

			let template = format!("{}{}", resource, suffix);
			self.add(method.clone(), &template, middleware.clone(), handler)?;
		}

		Ok(self)
	}
}

macro_rules! actions {
	($($action:ident),*) => {
		$(
			pub fn $action<F>(mut self, handler: F) -> Self
			where
				F: Fn(&mut Request, &mut Response, Next<'_>) -> Result<()> + Send + Sync + 'static,
			{
				self.$action = Some(chain::handler(handler));
				self
			}
		)*

		fn get(&self, action: &str) -> Option<&Handler> {
			match action {
				$(stringify!($action) => self.$action.as_ref(),)*
				_ => None,
			}
		}
	};
}

/// Handlers for the standard actions of a resource, see [`Register::crud`].
#[derive(Clone, Default)]
pub struct Resource {
	index: Option<Handler>,
	create: Option<Handler>,
	read: Option<Handler>,
	update: Option<Handler>,
	delete: Option<Handler>,
}

impl Resource {
	actions!(index, create, read, update, delete);
}

/// Registration context of a prefix group.
pub struct Scope<'a> {
	builder: &'a mut RouterBuilder,
	prefix: String,
}

impl<'a> Scope<'a> {
	pub fn path_prefix(&self) -> &str {
		&self.prefix
	}
}

impl<'a> Register for Scope<'a> {
	fn add(
		&mut self,
		method: Method,
		template: &str,
		middleware: Vec<Handler>,
		handler: Handler,
	) -> Result<&mut Self, InvalidRegistration> {
		self.builder
			.insert(method, &self.prefix, template, middleware, handler)?;
		Ok(self)
	}

	fn scope(&mut self, prefix: &str) -> Scope<'_> {
		Scope {
			builder: &mut *self.builder,
			prefix: format!("{}{}", self.prefix, prefix),
		}
	}
}

#[derive(Debug, Default)]
pub struct RouterBuilder {
	routes: Routes,
	pub internal_error_handler: Option<InternalErrorHandler>,
	pub not_found_handler: Option<NotFoundHandler>,
	pub body_parser: Option<BodyParser>,
	/// Answer `400 Bad Request` when the body cannot be parsed instead of dispatching with no body.
	pub reject_malformed_body: bool,
	/// Largest request body, in bytes, the hyper integration reads; unlimited when `None`.
	pub body_limit: Option<usize>,
}

impl RouterBuilder {
	fn insert(
		&mut self,
		method: Method,
		prefix: &str,
		template: &str,
		middleware: Vec<Handler>,
		handler: Handler,
	) -> Result<(), InvalidRegistration> {
		if !METHODS.contains(&method) {
			return Err(InvalidRegistration::UnsupportedMethod(method));
		}

		if template.is_empty() {
			return Err(InvalidRegistration::EmptyTemplate);
		}

		let template = format!("{}{}", prefix, template);
		if !route::is_well_formed(&template) {
			return Err(InvalidRegistration::MalformedTemplate(template));
		}

		let route = Route::new(&template)
			.map_err(|source| InvalidRegistration::Pattern { template, source })?;

		debug!(
			%method,
			template = route.template(),
			middleware = middleware.len(),
			"registered route"
		);

		let mut chain = middleware;
		chain.push(handler);
		self.routes
			.entry(method)
			.or_default()
			.push(Endpoint { route, chain });

		Ok(())
	}

	pub fn build(self) -> Router {
		Router {
			routes: self.routes,
			internal_error: self.internal_error_handler.unwrap_or(default_error_handler),
			not_found: self.not_found_handler.unwrap_or(default_not_found_handler),
			body_parser: self.body_parser.unwrap_or(json_body),
			reject_malformed_body: self.reject_malformed_body,
			body_limit: self.body_limit,
		}
	}
}

impl Register for RouterBuilder {
	fn add(
		&mut self,
		method: Method,
		template: &str,
		middleware: Vec<Handler>,
		handler: Handler,
	) -> Result<&mut Self, InvalidRegistration> {
		self.insert(method, "", template, middleware, handler)?;
		Ok(self)
	}

	fn scope(&mut self, prefix: &str) -> Scope<'_> {
		Scope {
			builder: self,
			prefix: prefix.to_owned(),
		}
	}
}

/// The immutable route table plus the dispatch algorithm.
#[derive(Debug)]
pub struct Router {
	routes: Routes,
	internal_error: InternalErrorHandler,
	not_found: NotFoundHandler,
	body_parser: BodyParser,
	reject_malformed_body: bool,
	body_limit: Option<usize>,
}

impl Router {
	pub fn builder() -> RouterBuilder {
		RouterBuilder::default()
	}

	/// Endpoints registered for `method`, in match order.
	pub fn endpoints(&self, method: &Method) -> &[Endpoint] {
		self.routes.get(method).map(Vec::as_slice).unwrap_or(&[])
	}

	/// The first endpoint of `method` whose route accepts `url`, else that method's wildcard.
	pub fn find(&self, method: &Method, url: &str) -> Option<&Endpoint> {
		let endpoints = self
			.routes
			.get(method)
			.or_else(|| recognize(method.as_str()).and_then(|method| self.routes.get(&method)))?;

		endpoints
			.iter()
			.find(|endpoint| endpoint.route.matches(url))
			.or_else(|| endpoints.iter().find(|endpoint| endpoint.route.is_wildcard()))
	}

	pub fn body_limit(&self) -> Option<usize> {
		self.body_limit
	}

	pub fn parse_body(&self, body: &[u8]) -> Result<Option<Value>> {
		(self.body_parser)(body)
	}

	/// Applies the malformed-body policy, then dispatches into a fresh response.
	pub fn handle(&self, mut req: Request, parsed: Result<Option<Value>>) -> Response {
		let body = match parsed {
			Ok(body) => body,
			Err(e) => {
				warn!(method = %req.method(), url = req.url(), error = %e, "could not parse request body");
				if self.reject_malformed_body {
					return Response::text(StatusCode::BAD_REQUEST, e.to_string());
				}
				None
			}
		};

		let mut res = Response::default();
		self.dispatch(&mut req, body, &mut res);
		res
	}

	/// Selects the endpoint for `req`, fills in its parameters and runs its chain.
	pub fn dispatch(&self, req: &mut Request, body: Option<Value>, res: &mut Response) {
		req.body = body;
		req.query = parse_query(req.url());

		let endpoint = match self.find(req.method(), req.url()) {
			Some(endpoint) => endpoint,
			None => {
				trace!(method = %req.method(), url = req.url(), "no route matched");
				*res = (self.not_found)(req);
				return;
			}
		};

		trace!(
			method = %req.method(),
			url = req.url(),
			template = endpoint.route.template(),
			"matched route"
		);

		req.params = if endpoint.route.is_wildcard() {
			HashMap::new()
		} else {
			endpoint.route.extract_parameters(req.url())
		};

		if let Err(e) = chain::run(endpoint.chain(), req, res) {
			warn!(method = %req.method(), url = req.url(), error = %e, "route handler failed");
			*res = (self.internal_error)(e);
		}
	}
}
