//! Low-level JSON-RPC client for LSP communication.
//!
//! Spawns a language server, writes framed messages to its stdin, and runs a
//! background reader that routes responses from stdout back to the waiting
//! caller. Each request owns a one-slot channel registered under its id
//! before the frame is written, so an early response can never be missed.

use crate::config::ClientOptions;
use crate::error::{CodeintelError, Result};
use crate::lsp::protocol::{read_frame, write_message, JsonRpcError, JsonRpcMessage};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

type Reply = std::result::Result<Value, JsonRpcError>;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// State shared between callers and the reader thread.
struct Shared {
    server: String,
    pending: Mutex<HashMap<u64, SyncSender<Reply>>>,
    writer: Mutex<Option<Box<dyn Write + Send>>>,
    reader_alive: AtomicBool,
}

impl Shared {
    fn send(&self, message: &JsonRpcMessage) -> Result<()> {
        let mut writer = lock(&self.writer);
        let Some(stream) = writer.as_mut() else {
            return Err(CodeintelError::LspCancelled {
                method: message.method.clone().unwrap_or_default(),
            });
        };
        write_message(stream, message).map_err(|e| match e {
            CodeintelError::Io(io) if io.kind() == ErrorKind::BrokenPipe => {
                CodeintelError::LspCancelled {
                    method: message.method.clone().unwrap_or_default(),
                }
            }
            other => other,
        })
    }

    /// Route one decoded frame.
    fn dispatch(&self, body: &[u8]) {
        let message = match JsonRpcMessage::from_slice(body) {
            Ok(message) => message,
            Err(e) => {
                warn!(server = %self.server, error = %e, "Skipping undecodable LSP frame");
                return;
            }
        };

        if message.is_response() {
            let Some(id) = message.get_id_u64().filter(|id| *id != 0) else {
                debug!(server = %self.server, id = ?message.id, "Ignoring response with unusable id");
                return;
            };
            let slot = lock(&self.pending).remove(&id);
            match slot {
                Some(slot) => {
                    let reply = match message.error {
                        Some(error) => Err(error),
                        None => Ok(message.result.unwrap_or(Value::Null)),
                    };
                    // A full or disconnected slot means the caller already gave up
                    let _ = slot.try_send(reply);
                }
                None => {
                    debug!(server = %self.server, id, "Dropping response with no waiting request");
                }
            }
        } else if message.is_request() {
            self.answer_server_request(&message);
        } else if let Some(method) = &message.method {
            trace!(server = %self.server, method = %method, "Ignoring server notification");
        }
    }

    /// Servers block on some of their own requests; answer them with empty results.
    fn answer_server_request(&self, request: &JsonRpcMessage) {
        let method = request.method.as_deref().unwrap_or_default();
        let result = if method == "workspace/configuration" {
            let count = request
                .params
                .as_ref()
                .and_then(|p| p.get("items"))
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            Value::Array(vec![Value::Null; count])
        } else {
            Value::Null
        };

        debug!(server = %self.server, method = %method, "Answering server request");
        let id = request.id.clone().unwrap_or(Value::Null);
        if let Err(e) = self.send(&JsonRpcMessage::response(id, result)) {
            debug!(server = %self.server, method = %method, error = %e, "Failed to answer server request");
        }
    }

    /// Drop every pending slot so waiters observe a disconnect.
    fn release_pending(&self) {
        let drained: Vec<_> = lock(&self.pending).drain().collect();
        if !drained.is_empty() {
            debug!(server = %self.server, count = drained.len(), "Releasing pending requests");
        }
    }
}

fn reader_loop<R: Read>(shared: Arc<Shared>, stream: R) {
    let mut reader = BufReader::new(stream);
    loop {
        match read_frame(&mut reader) {
            Ok(Some(body)) => shared.dispatch(&body),
            Ok(None) => {
                debug!(server = %shared.server, "Language server closed its output");
                break;
            }
            Err(CodeintelError::LspProtocolError(reason)) => {
                warn!(server = %shared.server, reason = %reason, "Skipping malformed LSP frame");
            }
            Err(e) => {
                debug!(server = %shared.server, error = %e, "LSP reader stopped");
                break;
            }
        }
    }
    shared.reader_alive.store(false, Ordering::SeqCst);
    shared.release_pending();
}

/// JSON-RPC connection to a language server.
///
/// Safe to share between threads: any number of callers may have requests
/// in flight at once.
pub struct LspClient {
    shared: Arc<Shared>,
    next_id: AtomicU64,
    child: Mutex<Option<Child>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    closing: AtomicBool,
    closed: AtomicBool,
    options: ClientOptions,
}

impl LspClient {
    /// Spawn a language server rooted at `root_path`.
    ///
    /// # Errors
    ///
    /// Returns `ServerNotFound` if the executable does not exist and
    /// `ServerStartFailed` for any other launch failure.
    pub fn connect(
        command: &str,
        args: &[String],
        root_path: &Path,
        options: ClientOptions,
    ) -> Result<Self> {
        if !root_path.is_dir() {
            return Err(CodeintelError::ServerStartFailed(format!(
                "root path {} is not a directory",
                root_path.display()
            )));
        }

        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .current_dir(root_path)
            .spawn()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    CodeintelError::ServerNotFound(command.to_string())
                } else {
                    CodeintelError::ServerStartFailed(format!("{}: {}", command, e))
                }
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CodeintelError::ServerStartFailed("stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CodeintelError::ServerStartFailed("stdout not captured".into()))?;

        // Drain stderr so the server never blocks on a full pipe
        if let Some(mut stderr) = child.stderr.take() {
            let spawned = thread::Builder::new()
                .name(format!("lsp-stderr-{}", command))
                .spawn(move || {
                    let _ = std::io::copy(&mut stderr, &mut std::io::sink());
                });
            if let Err(e) = spawned {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CodeintelError::ServerStartFailed(e.to_string()));
            }
        }

        debug!(command, ?args, root = %root_path.display(), pid = child.id(), "Spawned language server");

        let client = Self::from_io(command, stdout, stdin, options);
        match client {
            Ok(client) => {
                *lock(&client.child) = Some(child);
                Ok(client)
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(e)
            }
        }
    }

    /// Build a client over arbitrary streams (no child process).
    pub fn from_io<R, W>(name: &str, reader: R, writer: W, options: ClientOptions) -> Result<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let shared = Arc::new(Shared {
            server: name.to_string(),
            pending: Mutex::new(HashMap::new()),
            writer: Mutex::new(Some(Box::new(writer))),
            reader_alive: AtomicBool::new(true),
        });

        let reader_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(format!("lsp-reader-{}", name))
            .spawn(move || reader_loop(reader_shared, reader))
            .map_err(|e| CodeintelError::ServerStartFailed(e.to_string()))?;

        Ok(Self {
            shared,
            next_id: AtomicU64::new(1),
            child: Mutex::new(None),
            reader: Mutex::new(Some(handle)),
            closing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            options,
        })
    }

    /// Server name (the command used to launch it).
    pub fn server(&self) -> &str {
        &self.shared.server
    }

    /// Timeouts this client was built with.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Number of requests still waiting for a response.
    pub fn pending_count(&self) -> usize {
        lock(&self.shared.pending).len()
    }

    /// Whether `close()` has completed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send a request and block until its response or `deadline`.
    ///
    /// # Errors
    ///
    /// - `LspTimeout` if the deadline passes first (including a deadline
    ///   that has already expired); the registration is removed.
    /// - `LspCancelled` if the connection closes while waiting.
    /// - `LspError` if the server answers with an error object.
    pub fn request(&self, method: &str, params: Value, deadline: Instant) -> Result<Value> {
        if self.is_closed() {
            return Err(CodeintelError::LspCancelled {
                method: method.to_string(),
            });
        }

        let start = Instant::now();
        if deadline <= start {
            return Err(CodeintelError::LspTimeout {
                method: method.to_string(),
                timeout_ms: 0,
            });
        }
        let timeout_ms = deadline.duration_since(start).as_millis() as u64;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (slot, receiver) = sync_channel::<Reply>(1);
        lock(&self.shared.pending).insert(id, slot);

        // Registered after the reader drained the table: nobody will answer
        if !self.shared.reader_alive.load(Ordering::SeqCst) {
            lock(&self.shared.pending).remove(&id);
            return Err(CodeintelError::LspCancelled {
                method: method.to_string(),
            });
        }

        trace!(server = %self.shared.server, method, id, "Sending LSP request");
        if let Err(e) = self.shared.send(&JsonRpcMessage::request(id, method, params)) {
            lock(&self.shared.pending).remove(&id);
            return Err(e);
        }

        let wait = deadline.saturating_duration_since(Instant::now());
        match receiver.recv_timeout(wait) {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(error)) => {
                debug!(server = %self.shared.server, method, id, code = error.code, "LSP error response");
                Err(error.into())
            }
            Err(RecvTimeoutError::Timeout) => {
                lock(&self.shared.pending).remove(&id);
                debug!(server = %self.shared.server, method, id, timeout_ms, "LSP request timed out");
                Err(CodeintelError::LspTimeout {
                    method: method.to_string(),
                    timeout_ms,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(CodeintelError::LspCancelled {
                method: method.to_string(),
            }),
        }
    }

    /// Typed request with a relative timeout.
    pub fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: &P,
        timeout: Duration,
    ) -> Result<R> {
        let params =
            serde_json::to_value(params).map_err(|e| CodeintelError::Serialization(e.to_string()))?;
        let result = self.request(method, params, Instant::now() + timeout)?;
        serde_json::from_value(result).map_err(|e| CodeintelError::Deserialization(e.to_string()))
    }

    /// Send a notification (no response expected).
    pub fn notify<P: Serialize>(&self, method: &str, params: &P) -> Result<()> {
        if self.is_closed() {
            return Err(CodeintelError::LspCancelled {
                method: method.to_string(),
            });
        }
        let params =
            serde_json::to_value(params).map_err(|e| CodeintelError::Serialization(e.to_string()))?;
        trace!(server = %self.shared.server, method, "Sending LSP notification");
        self.shared
            .send(&JsonRpcMessage::notification(method, params))
    }

    /// Shut the server down. Best effort, bounded, idempotent.
    ///
    /// Sends `shutdown` then `exit`, closes the pipes, waits up to the
    /// configured grace period for the process to exit, then kills it.
    pub fn close(&self) {
        if self.closing.swap(true, Ordering::SeqCst) {
            return;
        }

        let deadline = Instant::now() + self.options.request_timeout;
        if let Err(e) = self.request("shutdown", Value::Null, deadline) {
            debug!(server = %self.shared.server, error = %e, "shutdown request failed");
        }
        if let Err(e) = self.notify("exit", &Value::Null) {
            debug!(server = %self.shared.server, error = %e, "exit notification failed");
        }

        self.closed.store(true, Ordering::SeqCst);
        // Dropping the writer closes the server's stdin
        lock(&self.shared.writer).take();

        if let Some(mut child) = lock(&self.child).take() {
            let grace_deadline = Instant::now() + self.options.shutdown_grace;
            loop {
                match child.try_wait() {
                    Ok(Some(status)) => {
                        debug!(server = %self.shared.server, %status, "Language server exited");
                        break;
                    }
                    Ok(None) if Instant::now() < grace_deadline => {
                        thread::sleep(EXIT_POLL_INTERVAL);
                    }
                    Ok(None) | Err(_) => {
                        warn!(server = %self.shared.server, "Language server did not exit in time; killing");
                        let _ = child.kill();
                        let _ = child.wait();
                        break;
                    }
                }
            }
        }

        // Join only if the reader already finished; never block on it
        if let Some(handle) = lock(&self.reader).take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
        self.shared.release_pending();
    }
}

impl Drop for LspClient {
    fn drop(&mut self) {
        lock(&self.shared.writer).take();
        if let Some(mut child) = lock(&self.child).take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
