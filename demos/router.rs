use std::net::SocketAddr;
use trellis::{
	handler, hyper::Server, HttpRouter, Next, Register, Request, Resource, Response, Router,
	StatusCode,
};
use tracing_subscriber::EnvFilter;

fn show_user(req: &mut Request, res: &mut Response, _next: Next<'_>) -> anyhow::Result<()> {
	tracing::info!(query = ?req.query, params = ?req.params, "showing user");
	res.end("ok");
	Ok(())
}

fn list_users(_req: &mut Request, res: &mut Response, _next: Next<'_>) -> anyhow::Result<()> {
	res.end("ok any methods for /users/");
	Ok(())
}

fn log_body(req: &mut Request, res: &mut Response, next: Next<'_>) -> anyhow::Result<()> {
	tracing::info!(body = ?req.body, "comment posted");
	next.run(req, res)
}

fn respond(text: &'static str) -> impl Fn(&mut Request, &mut Response, Next<'_>) -> anyhow::Result<()> {
	move |_req, res, _next| {
		res.end(text);
		Ok(())
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.init();

	let mut builder = Router::builder();
	builder
		.get("users/{id}", vec![], show_user)?
		.match_methods(&["get", "post"], "users", vec![], list_users)?
		.prefix("articles", |articles| {
			articles.get("/{id}", vec![], |req, res, _next| {
				res.end(format!("article {}", req.param("id").unwrap_or_default()));
				Ok(())
			})?;
			articles.post("/{id}/comments", vec![handler(log_body)], respond("thanks"))?;
			Ok(())
		})?
		.crud(
			"admin",
			&["delete"],
			vec![],
			Resource::default()
				.index(respond("index"))
				.create(respond("create"))
				.read(respond("read"))
				.update(respond("update")),
		)?
		.any("*", vec![], |_req, res, _next| {
			res.write_head(StatusCode::NOT_FOUND, "text/plain")
				.end("404 not found");
			Ok(())
		})?;

	let addr: SocketAddr = ([127, 0, 0, 1], 8080).into();
	let server = Server::bind(&addr).serve(HttpRouter::from(builder.build()));
	tracing::info!(%addr, "server listening");

	server.await?;
	Ok(())
}
