use crate::request::{Request, Response};
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

/// A middleware or a final route handler.
///
/// Both receive the request, the response under construction and the continuation that runs
/// the rest of the chain. Returning without calling [`Next::run`] short-circuits the chain.
pub type Handler = Arc<dyn Fn(&mut Request, &mut Response, Next<'_>) -> Result<()> + Send + Sync>;

/// Wraps a closure or function into a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
	F: Fn(&mut Request, &mut Response, Next<'_>) -> Result<()> + Send + Sync + 'static,
{
	Arc::new(f)
}

/// A cursor over a non-empty sequence that wraps around at both ends.
#[derive(Debug)]
pub struct Cycle<'a, T> {
	items: &'a [T],
	position: usize,
}

impl<'a, T> Clone for Cycle<'a, T> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<'a, T> Copy for Cycle<'a, T> {}

impl<'a, T> Cycle<'a, T> {
	/// Starts at the first item; `None` for an empty slice.
	pub fn new(items: &'a [T]) -> Option<Self> {
		if items.is_empty() {
			None
		} else {
			Some(Self { items, position: 0 })
		}
	}

	pub fn position(&self) -> usize {
		self.position
	}

	pub fn current(&self) -> &'a T {
		&self.items[self.position]
	}

	pub fn advance(self) -> Self {
		Self {
			items: self.items,
			position: (self.position + 1) % self.items.len(),
		}
	}

	pub fn retreat(self) -> Self {
		let position = match self.position {
			0 => self.items.len() - 1,
			p => p - 1,
		};

		Self {
			items: self.items,
			position,
		}
	}
}

/// The continuation handed to every element of a chain.
///
/// Running it invokes the following element. Once the last element (the route handler) has been
/// reached the continuation is exhausted and running it does nothing, instead of wrapping back to
/// the first middleware.
pub struct Next<'a> {
	cursor: Option<Cycle<'a, Handler>>,
}

impl<'a> Next<'a> {
	fn exhausted() -> Self {
		Self { cursor: None }
	}

	pub fn is_exhausted(&self) -> bool {
		self.cursor.is_none()
	}

	pub fn run(self, req: &mut Request, res: &mut Response) -> Result<()> {
		match self.cursor {
			Some(cursor) => invoke(cursor, req, res),
			None => {
				debug!(method = %req.method(), url = req.url(), "next() called after the route handler");
				Ok(())
			}
		}
	}
}

/// Runs `chain` from its first element. An empty chain does nothing.
pub fn run(chain: &[Handler], req: &mut Request, res: &mut Response) -> Result<()> {
	match Cycle::new(chain) {
		Some(cursor) => invoke(cursor, req, res),
		None => Ok(()),
	}
}

fn invoke(cursor: Cycle<'_, Handler>, req: &mut Request, res: &mut Response) -> Result<()> {
	let following = cursor.advance();
	let next = if following.position() == 0 {
		Next::exhausted()
	} else {
		Next {
			cursor: Some(following),
		}
	};

	(cursor.current())(req, res, next)
}

#[cfg(test)]
mod test {
	use super::{handler, run, Cycle, Handler};
	use crate::request::{Request, Response};
	use anyhow::anyhow;
	use hyper::Method;
	use std::sync::{Arc, Mutex};

	#[test]
	fn cycle_wraps_both_ways() {
		let items = ['a', 'b', 'c'];
		let start = Cycle::new(&items).unwrap();
		assert_eq!(*start.current(), 'a');

		let last = start.retreat();
		assert_eq!(last.position(), 2);
		assert_eq!(*last.current(), 'c');
		assert_eq!(*last.advance().current(), 'a');
		assert_eq!(*start.advance().advance().current(), 'c');
	}

	#[test]
	fn cycle_of_one_stays_put() {
		let items = [1];
		let only = Cycle::new(&items).unwrap();
		assert_eq!(only.advance().position(), 0);
		assert_eq!(only.retreat().position(), 0);
	}

	#[test]
	fn empty_cycle() {
		let items: [u8; 0] = [];
		assert!(Cycle::new(&items).is_none());
	}

	fn recording(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str, forward: bool) -> Handler {
		let log = Arc::clone(log);
		handler(move |req, res, next| {
			log.lock().unwrap().push(name);
			if forward {
				next.run(req, res)
			} else {
				Ok(())
			}
		})
	}

	#[test]
	fn runs_in_order_without_wrapping() {
		let log = Arc::new(Mutex::new(vec![]));
		let chain = vec![
			recording(&log, "a", true),
			recording(&log, "b", true),
			recording(&log, "handler", true),
		];

		let mut req = Request::new(Method::GET, "/");
		let mut res = Response::default();
		run(&chain, &mut req, &mut res).unwrap();

		assert_eq!(*log.lock().unwrap(), ["a", "b", "handler"]);
	}

	#[test]
	fn middleware_can_short_circuit() {
		let log = Arc::new(Mutex::new(vec![]));
		let chain = vec![
			recording(&log, "a", true),
			recording(&log, "guard", false),
			recording(&log, "handler", true),
		];

		let mut req = Request::new(Method::GET, "/");
		let mut res = Response::default();
		run(&chain, &mut req, &mut res).unwrap();

		assert_eq!(*log.lock().unwrap(), ["a", "guard"]);
	}

	#[test]
	fn lone_handler_gets_exhausted_next() {
		let chain = vec![handler(|req, res, next| {
			assert!(next.is_exhausted());
			res.end("done");
			next.run(req, res)
		})];

		let mut req = Request::new(Method::GET, "/");
		let mut res = Response::default();
		run(&chain, &mut req, &mut res).unwrap();
		assert_eq!(res.body(), b"done");
	}

	#[test]
	fn errors_propagate_to_caller() {
		let chain = vec![
			handler(|req, res, next| next.run(req, res)),
			handler(|_, _, _| Err(anyhow!("boom"))),
		];

		let mut req = Request::new(Method::GET, "/");
		let mut res = Response::default();
		let err = run(&chain, &mut req, &mut res).unwrap_err();
		assert_eq!(err.to_string(), "boom");
	}
}
