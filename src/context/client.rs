//! Blocking Unix-socket client for the context daemon.

use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use socket2::{Domain, SockAddr, Socket, Type};

use crate::config::ContextConfig;
use crate::instance::InstanceName;

use super::protocol::{self, Request, Response, FRAME_DELIMITER};
use super::{Absence, Context, ContextError, ContextSource, FetchOutcome};

const READ_CHUNK: usize = 512;

/// Client making one request per fetch against the daemon socket.
#[derive(Debug, Clone)]
pub struct DaemonClient {
    socket_path: PathBuf,
    timeout: Duration,
    max_context_bytes: usize,
}

impl DaemonClient {
    /// Create a client with explicit limits.
    pub fn new(
        socket_path: impl Into<PathBuf>,
        timeout: Duration,
        max_context_bytes: usize,
    ) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout,
            max_context_bytes,
        }
    }

    /// Create a client from loaded configuration.
    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(
            config.socket_path.clone(),
            config.timeout(),
            config.max_context_bytes,
        )
    }

    /// Socket path this client dials.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Overall deadline for one fetch.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Largest context accepted from the daemon.
    pub fn max_context_bytes(&self) -> usize {
        self.max_context_bytes
    }

    fn exchange(&self, instance: &InstanceName) -> FetchOutcome {
        let deadline = Instant::now()
            .checked_add(self.timeout)
            .unwrap_or_else(Instant::now);

        let mut stream = match self.connect(deadline) {
            Ok(stream) => stream,
            Err(ConnectFailure::Io(err)) => {
                return classify_connect_error(&self.socket_path, self.timeout, err);
            }
            Err(ConnectFailure::Context(err)) => return FetchOutcome::Error(err),
        };

        let request = Request::GetContext {
            instance: instance.as_str().to_owned(),
        };
        let result = protocol::encode_request(&request)
            .and_then(|frame| self.send(&mut stream, &frame, deadline))
            .and_then(|()| self.receive(&mut stream, deadline))
            .and_then(|frame| protocol::decode_response(&frame));

        match result {
            Ok(response) => self.interpret(response),
            Err(err) => FetchOutcome::Error(err),
        }
    }

    /// Connect within the deadline.
    ///
    /// `AF_UNIX` connect blocks while the listener's backlog is full; on Linux
    /// that wait is bounded by `SO_SNDTIMEO`, so the send timeout is set
    /// before connecting.
    fn connect(&self, deadline: Instant) -> Result<UnixStream, ConnectFailure> {
        let remaining = self.remaining(deadline).map_err(ConnectFailure::Context)?;
        let address = SockAddr::unix(&self.socket_path).map_err(|source| {
            ConnectFailure::Context(ContextError::Connect {
                path: self.socket_path.clone(),
                source,
            })
        })?;

        let socket = Socket::new(Domain::UNIX, Type::STREAM, None)
            .map_err(|e| ConnectFailure::Context(ContextError::Transport(e)))?;
        socket
            .set_write_timeout(Some(remaining))
            .map_err(|e| ConnectFailure::Context(ContextError::Transport(e)))?;
        socket.connect(&address).map_err(ConnectFailure::Io)?;

        Ok(UnixStream::from(std::os::fd::OwnedFd::from(socket)))
    }

    fn send(
        &self,
        stream: &mut UnixStream,
        frame: &[u8],
        deadline: Instant,
    ) -> Result<(), ContextError> {
        let remaining = self.remaining(deadline)?;
        stream.set_write_timeout(Some(remaining))?;
        stream.write_all(frame).map_err(|e| self.io_error(e))?;
        stream.flush().map_err(|e| self.io_error(e))
    }

    /// Read up to the frame delimiter, never past the frame limit or deadline.
    fn receive(
        &self,
        stream: &mut UnixStream,
        deadline: Instant,
    ) -> Result<Vec<u8>, ContextError> {
        let limit = protocol::max_frame_bytes(self.max_context_bytes);
        let mut frame = Vec::new();
        let mut chunk = [0_u8; READ_CHUNK];

        loop {
            let remaining = self.remaining(deadline)?;
            stream.set_read_timeout(Some(remaining))?;

            let read = match stream.read(&mut chunk) {
                Ok(read) => read,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(self.io_error(err)),
            };
            if read == 0 {
                return Err(ContextError::Truncated {
                    received: frame.len(),
                });
            }

            let received = &chunk[..read];
            match received.iter().position(|b| *b == FRAME_DELIMITER) {
                Some(end) => {
                    frame.extend_from_slice(&received[..end]);
                    if frame.len() > limit {
                        return Err(ContextError::Oversized { limit });
                    }
                    return Ok(frame);
                }
                None => {
                    frame.extend_from_slice(received);
                    if frame.len() > limit {
                        return Err(ContextError::Oversized { limit });
                    }
                }
            }
        }
    }

    fn interpret(&self, response: Response) -> FetchOutcome {
        match response {
            Response::Ok { context } if context.len() > self.max_context_bytes => {
                FetchOutcome::Error(ContextError::Oversized {
                    limit: self.max_context_bytes,
                })
            }
            Response::Ok { context } => FetchOutcome::Context(Context::new(context)),
            Response::NotFound => FetchOutcome::NotAvailable(Absence::NoRecord),
            Response::Error { message } => FetchOutcome::Error(ContextError::Daemon(message)),
        }
    }

    fn remaining(&self, deadline: Instant) -> Result<Duration, ContextError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ContextError::Timeout {
                timeout: self.timeout,
            });
        }
        Ok(remaining)
    }

    fn io_error(&self, err: std::io::Error) -> ContextError {
        match err.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut => ContextError::Timeout {
                timeout: self.timeout,
            },
            _ => ContextError::Transport(err),
        }
    }
}

impl ContextSource for DaemonClient {
    fn fetch(&self, instance: &InstanceName) -> FetchOutcome {
        self.exchange(instance)
    }
}

/// Why [`DaemonClient::connect`] produced no stream.
enum ConnectFailure {
    /// The `connect` call itself failed; classified by [`classify_connect_error`].
    Io(std::io::Error),
    /// Setting up the socket failed before dialling.
    Context(ContextError),
}

/// Absence of the daemon is soft; a full backlog is a timeout; anything else is hard.
fn classify_connect_error(path: &Path, timeout: Duration, err: std::io::Error) -> FetchOutcome {
    match err.kind() {
        ErrorKind::NotFound | ErrorKind::NotADirectory => {
            FetchOutcome::NotAvailable(Absence::SocketMissing)
        }
        ErrorKind::ConnectionRefused => FetchOutcome::NotAvailable(Absence::ConnectionRefused),
        ErrorKind::WouldBlock | ErrorKind::TimedOut => {
            FetchOutcome::Error(ContextError::Timeout { timeout })
        }
        _ => FetchOutcome::Error(ContextError::Connect {
            path: path.to_path_buf(),
            source: err,
        }),
    }
}
