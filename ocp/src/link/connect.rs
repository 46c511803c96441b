//! Off-thread TCP dial, per spec.md §4.3's `UNCONNECTED` state ("opens a new TCP socket, binds
//! the configured local endpoint, configures non-blocking I/O and initiates a connect").
//!
//! `stakker`'s event loop only knows how to poll an already-connected, already-registered
//! socket (`runtime::Io`) — there is no readiness primitive here for "connect in progress" the
//! way there is for an established socket's write-readiness. Rather than teach `runtime::Io`
//! a second readiness mode, a connect attempt runs on a plain background thread and hands the
//! finished (or failed) socket back over a channel that the link polls on a short timer; see
//! `Link::poll_connect`.

use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

pub struct ConnectAttempt {
	rx: Receiver<io::Result<TcpStream>>,
}

impl ConnectAttempt {
	pub fn start(remote_addr: String, remote_port: u16, local_addr: String, local_port: u16, timeout: Duration) -> Self {
		let (tx, rx) = mpsc::channel();

		thread::spawn(move || {
			let result = Self::dial(&remote_addr, remote_port, &local_addr, local_port, timeout);
			let _ = tx.send(result);
		});

		Self { rx }
	}

	fn dial(remote_addr: &str, remote_port: u16, local_addr: &str, local_port: u16, timeout: Duration) -> io::Result<TcpStream> {
		let remote = (remote_addr, remote_port)
			.to_socket_addrs()?
			.next()
			.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{remote_addr}:{remote_port} did not resolve")))?;

		let local = (local_addr, local_port)
			.to_socket_addrs()?
			.next()
			.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{local_addr}:{local_port} did not resolve")))?;

		let socket = Socket::new(Domain::for_address(remote), Type::STREAM, Some(Protocol::TCP))?;
		socket.bind(&local.into())?;
		socket.connect_timeout(&remote.into(), timeout)?;
		socket.set_nonblocking(true)?;

		Ok(socket.into())
	}

	/// Non-blocking poll for the attempt's outcome. `Ok(None)` means still in flight.
	pub fn poll(&self) -> Result<Option<TcpStream>, ()> {
		match self.rx.try_recv() {
			Ok(Ok(stream)) => Ok(Some(stream)),
			Ok(Err(err)) => {
				log::warn!("connect attempt failed: {err}");
				Err(())
			}
			Err(TryRecvError::Empty) => Ok(None),
			Err(TryRecvError::Disconnected) => Err(()),
		}
	}
}
