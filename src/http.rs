use crate::{
	request::{Request, Response},
	router::Router,
};
use anyhow::Error;
use hyper::{
	body::{Body, HttpBody},
	service::Service,
	StatusCode,
};
use std::{
	convert::Infallible,
	future::{ready, Future, Ready},
	pin::Pin,
	sync::Arc,
	task::{Context, Poll},
};
use tracing::warn;

pub use hyper;

/// Makes a [`RouteHandler`] per connection; pass it to hyper's `Server::serve`.
pub struct HttpRouter {
	router: Arc<Router>,
}

impl From<Router> for HttpRouter {
	fn from(router: Router) -> Self {
		Self {
			router: Arc::new(router),
		}
	}
}

impl<T> Service<T> for HttpRouter {
	type Response = RouteHandler;
	type Error = Infallible;
	type Future = Ready<Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, _: &mut Context) -> Poll<Result<(), Self::Error>> {
		Poll::Ready(Ok(()))
	}

	fn call(&mut self, _: T) -> Self::Future {
		ready(Ok(RouteHandler {
			router: Arc::clone(&self.router),
		}))
	}
}

/// Responsible for handling the actual HTTP requests from hyper.
///
/// The body is read in full and handed to the router's body parser before dispatch.
pub struct RouteHandler {
	router: Arc<Router>,
}

impl Service<hyper::Request<Body>> for RouteHandler {
	type Response = hyper::Response<Body>;
	type Error = Infallible;
	type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

	fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		Poll::Ready(Ok(()))
	}

	fn call(&mut self, req: hyper::Request<Body>) -> Self::Future {
		let router = Arc::clone(&self.router);

		Box::pin(async move {
			let (parts, body) = req.into_parts();
			let url = match parts.uri.path_and_query() {
				Some(target) => target.as_str().to_owned(),
				None => parts.uri.path().to_owned(),
			};
			let request = Request::new(parts.method, url).with_headers(parts.headers);

			let parsed = match read_body(body, router.body_limit()).await {
				Ok(bytes) => router.parse_body(&bytes),
				Err(ReadError::Transport(e)) => Err(Error::from(e)),
				Err(ReadError::TooLarge(limit)) => {
					warn!(method = %request.method(), url = request.url(), limit, "request body too large");
					let response: hyper::Response<Body> = Response::text(
						StatusCode::PAYLOAD_TOO_LARGE,
						format!("request body exceeds {} bytes", limit),
					)
					.into();
					return Ok(response);
				}
			};

			let response: hyper::Response<Body> = router.handle(request, parsed).into();
			Ok::<_, Infallible>(response)
		})
	}
}

enum ReadError {
	TooLarge(usize),
	Transport(hyper::Error),
}

/// Collects `body`, giving up as soon as it grows past `limit` bytes.
async fn read_body(mut body: Body, limit: Option<usize>) -> Result<Vec<u8>, ReadError> {
	let mut bytes = Vec::new();

	while let Some(chunk) = body.data().await {
		let chunk = chunk.map_err(ReadError::Transport)?;
		if let Some(limit) = limit {
			if bytes.len() + chunk.len() > limit {
				return Err(ReadError::TooLarge(limit));
			}
		}
		bytes.extend_from_slice(&chunk);
	}

	Ok(bytes)
}

impl From<Response> for hyper::Response<Body> {
	fn from(res: Response) -> Self {
		let (status, headers, body) = res.into_parts();

		let mut response = hyper::Response::new(Body::from(body));
		*response.status_mut() = status;
		*response.headers_mut() = headers;
		response
	}
}

#[cfg(test)]
mod test {
	use super::HttpRouter;
	use crate::router::{Register, Router};
	use hyper::{body, header, service::Service, Body, Request, StatusCode};

	fn router() -> HttpRouter {
		limited_router(None)
	}

	fn limited_router(body_limit: Option<usize>) -> HttpRouter {
		let mut builder = Router::builder();
		builder.body_limit = body_limit;
		builder
			.post("articles/{id}/comments", vec![], |req, res, _next| {
				let author = req
					.body
					.as_ref()
					.and_then(|body| body.get("author"))
					.and_then(|author| author.as_str())
					.unwrap_or("anonymous")
					.to_owned();
				res.write_head(StatusCode::CREATED, "text/plain").end(format!(
					"{} on {} (notify={})",
					author,
					req.param("id").unwrap_or_default(),
					req.query("notify").unwrap_or("no")
				));
				Ok(())
			})
			.unwrap();

		HttpRouter::from(builder.build())
	}

	#[tokio::test]
	async fn serves_matched_routes() {
		let mut make = router();
		let mut handler = make.call(()).await.unwrap();

		let req = Request::builder()
			.method("POST")
			.uri("/articles/12/comments?notify=yes")
			.body(Body::from(r#"{"author":"ferris"}"#))
			.unwrap();

		let res = handler.call(req).await.unwrap();
		assert_eq!(res.status(), StatusCode::CREATED);
		assert_eq!(res.headers()[header::CONTENT_TYPE], "text/plain");

		let bytes = body::to_bytes(res.into_body()).await.unwrap();
		assert_eq!(&bytes[..], b"ferris on 12 (notify=yes)");
	}

	#[tokio::test]
	async fn malformed_body_still_dispatches() {
		let mut make = router();
		let mut handler = make.call(()).await.unwrap();

		let req = Request::builder()
			.method("POST")
			.uri("/articles/3/comments")
			.body(Body::from("not json"))
			.unwrap();

		let res = handler.call(req).await.unwrap();
		assert_eq!(res.status(), StatusCode::CREATED);

		let bytes = body::to_bytes(res.into_body()).await.unwrap();
		assert_eq!(&bytes[..], b"anonymous on 3 (notify=no)");
	}

	#[tokio::test]
	async fn answers_404() {
		let mut make = router();
		let mut handler = make.call(()).await.unwrap();

		let req = Request::builder().uri("/nope").body(Body::empty()).unwrap();
		let res = handler.call(req).await.unwrap();
		assert_eq!(res.status(), StatusCode::NOT_FOUND);
		assert_eq!(res.headers()[header::CONTENT_TYPE], "text/plain");

		let bytes = body::to_bytes(res.into_body()).await.unwrap();
		assert_eq!(&bytes[..], b"cannot GET /nope");
	}

	#[tokio::test]
	async fn rejects_bodies_over_the_limit() {
		let mut make = limited_router(Some(16));
		let mut handler = make.call(()).await.unwrap();

		let req = Request::builder()
			.method("POST")
			.uri("/articles/1/comments")
			.body(Body::from(r#"{"author":"a very long name indeed"}"#))
			.unwrap();

		let res = handler.call(req).await.unwrap();
		assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);

		let bytes = body::to_bytes(res.into_body()).await.unwrap();
		assert_eq!(&bytes[..], b"request body exceeds 16 bytes");
	}

	#[tokio::test]
	async fn accepts_bodies_within_the_limit() {
		let mut make = limited_router(Some(16));
		let mut handler = make.call(()).await.unwrap();

		let req = Request::builder()
			.method("POST")
			.uri("/articles/1/comments")
			.body(Body::from(r#"{"author":"bo"}"#))
			.unwrap();

		let res = handler.call(req).await.unwrap();
		assert_eq!(res.status(), StatusCode::CREATED);

		let bytes = body::to_bytes(res.into_body()).await.unwrap();
		assert_eq!(&bytes[..], b"bo on 1 (notify=no)");
	}
}
