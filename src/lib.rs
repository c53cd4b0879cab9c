//! A template-based HTTP router with middleware chains, built on hyper.
//!
//! ```
//! use trellis::{Method, Register, Request, Router};
//!
//! fn main() -> Result<(), trellis::InvalidRegistration> {
//! 	let mut builder = Router::builder();
//! 	builder
//! 		.get("users/{id}", vec![], |req, res, _next| {
//! 			res.end(format!("user {}", req.param("id").unwrap_or_default()));
//! 			Ok(())
//! 		})?
//! 		.any("*", vec![], |_req, res, _next| {
//! 			res.end("fallback");
//! 			Ok(())
//! 		})?;
//!
//! 	let router = builder.build();
//! 	let res = router.handle(Request::new(Method::GET, "/users/42"), Ok(None));
//! 	assert_eq!(res.body(), b"user 42");
//!
//! 	let res = router.handle(Request::new(Method::GET, "/elsewhere"), Ok(None));
//! 	assert_eq!(res.body(), b"fallback");
//! 	Ok(())
//! }
//! ```
//!
//! Templates are matched against the request path in registration order, per method; the first
//! match wins and a `*` route registered for the method acts as its fallback. `{name}`
//! placeholders match one path segment of letters, digits and underscores, and are exposed to
//! handlers through [`Request::param`].
//!
//! Every route runs its middleware, then its handler. Each element receives a [`Next`]
//! continuation; not running it ends the chain there.
//!
//! Unmatched requests get `404 cannot {METHOD} {URL}`. The builder exposes
//! `internal_error_handler` and `not_found_handler` to customize the error responses.

#[cfg(feature = "server")]
mod http;
#[cfg(feature = "server")]
pub use http::*;

/// Middleware/handler chains and the cursor that walks them.
pub mod chain;
pub mod error;
pub mod parameter;
pub mod request;
/// Template compilation, matching and query parsing.
pub mod route;

/// Contains the core structs of the router.
///
/// Use the RouterBuilder to create a Router: wrap the router in an HttpRouter and pass it to hyper
/// as the service.
pub mod router;

pub use chain::{handler, Handler, Next};
pub use error::InvalidRegistration;
pub use hyper::{header, Method, StatusCode};
pub use request::{Request, Response};
pub use route::{parse_query, Route};
pub use router::*;
