use hyper::{
	header::{self, HeaderMap, HeaderValue},
	Method, StatusCode,
};
use serde_json::Value;
use std::collections::HashMap;

/// An incoming request as seen by middleware and handlers.
///
/// `params`, `query` and `body` are filled in by the router before the chain runs.
#[derive(Debug, Clone)]
pub struct Request {
	method: Method,
	url: String,
	headers: HeaderMap,
	pub params: HashMap<String, String>,
	pub query: HashMap<String, Option<String>>,
	pub body: Option<Value>,
}

impl Request {
	/// `url` is the request target: path plus optional query string.
	pub fn new(method: Method, url: impl Into<String>) -> Self {
		Self {
			method,
			url: url.into(),
			headers: HeaderMap::new(),
			params: HashMap::new(),
			query: HashMap::new(),
			body: None,
		}
	}

	pub fn with_headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;
		self
	}

	pub fn method(&self) -> &Method {
		&self.method
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	pub fn param(&self, name: &str) -> Option<&str> {
		self.params.get(name).map(String::as_str)
	}

	/// The first value of `name` in the query string; `None` when absent or valueless.
	pub fn query(&self, name: &str) -> Option<&str> {
		self.query.get(name).and_then(|value| value.as_deref())
	}
}

/// The response being built by a chain.
#[derive(Debug, Clone)]
pub struct Response {
	status: StatusCode,
	headers: HeaderMap,
	body: Vec<u8>,
	finished: bool,
}

impl Default for Response {
	fn default() -> Self {
		Self {
			status: StatusCode::OK,
			headers: HeaderMap::new(),
			body: vec![],
			finished: false,
		}
	}
}

impl Response {
	/// A finished `text/plain` response.
	pub fn text(status: StatusCode, body: impl AsRef<[u8]>) -> Self {
		let mut res = Self::default();
		res.write_head(status, "text/plain");
		res.end(body);
		res
	}

	pub fn status(&self) -> StatusCode {
		self.status
	}

	pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
		self.status = status;
		self
	}

	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	pub fn headers_mut(&mut self) -> &mut HeaderMap {
		&mut self.headers
	}

	/// Sets the status together with the `Content-Type` header.
	///
	/// A content type that is not a valid header value is ignored.
	pub fn write_head(&mut self, status: StatusCode, content_type: &str) -> &mut Self {
		self.status = status;
		if let Ok(value) = HeaderValue::from_str(content_type) {
			self.headers.insert(header::CONTENT_TYPE, value);
		}
		self
	}

	/// Appends to the body. Writes after [`Response::end`] are dropped.
	pub fn write(&mut self, chunk: impl AsRef<[u8]>) -> &mut Self {
		if !self.finished {
			self.body.extend_from_slice(chunk.as_ref());
		}
		self
	}

	/// Writes a final chunk and closes the body.
	pub fn end(&mut self, chunk: impl AsRef<[u8]>) -> &mut Self {
		self.write(chunk);
		self.finished = true;
		self
	}

	pub fn is_finished(&self) -> bool {
		self.finished
	}

	pub fn body(&self) -> &[u8] {
		&self.body
	}

	pub fn into_parts(self) -> (StatusCode, HeaderMap, Vec<u8>) {
		(self.status, self.headers, self.body)
	}
}
