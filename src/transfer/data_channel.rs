//! Module `data_channel`
//!
//! Opens the data connection for a transfer: PASV or PORT, REST for resumed
//! downloads, the transfer verb, and the recovery paths for a target that
//! already exists (delete and resubmit) or a server that could not open the
//! connection (425, retried).

use log::{debug, info, warn};
use std::io::{self, ErrorKind};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use crate::client::ControlSession;
use crate::client::stream::NetStream;
use crate::client::tls;
use crate::error::{FtpClientError, FtpResult, IoPhase};
use crate::protocol::classify::{TransferOpen, classify_transfer};
use crate::protocol::responses::{ENTERING_PASSIVE, OK, PENDING_FURTHER_INFO};
use crate::protocol::{AddressTuple, Command};
use crate::transfer::modes::{DataMode, Direction};
use crate::transfer::request::TransferRequest;
use crate::transfer::results::DataChannel;
use crate::utils::network::{self, BufferHint};

/// Upper bound for 425 retries and active-mode overwrite retries.
pub const MAX_DATA_CONNECT_RETRIES: u32 = 3;

/// Upper bound for rebinding the active-mode listener after EADDRINUSE/EACCES.
pub const MAX_BIND_ATTEMPTS: u32 = 100;

const DATA_RETRY_DELAY: Duration = Duration::from_millis(10);
const ACCEPT_POLL_INITIAL: Duration = Duration::from_millis(5);
const ACCEPT_POLL_MAX: Duration = Duration::from_millis(100);

impl ControlSession {
    /// A request for `path` filled in from the session configuration.
    pub fn request_for(&self, direction: Direction, path: &str) -> TransferRequest {
        let request = match direction {
            Direction::Upload => TransferRequest::upload(path),
            Direction::Download => TransferRequest::download(path),
            Direction::List(kind) => TransferRequest::listing(kind, path),
        };
        request
            .with_mode(self.config.data_mode)
            .with_type(self.config.transfer_type)
            .with_sockbuf(self.config.sockbuf_hint())
            .with_encryption(self.config.tls.protects_data() && self.is_encrypted())
    }

    /// Opens the data connection described by `request`.
    ///
    /// On success the session holds the open channel until `close_data`.
    pub fn open_data(&mut self, request: &TransferRequest) -> FtpResult<()> {
        self.ensure_usable()?;
        if self.data.is_some() {
            return Err(FtpClientError::DataChannelBusy);
        }
        if request.encrypt && self.tls_config.is_none() {
            return Err(FtpClientError::TlsSetup(
                "data encryption requested without AUTH TLS".into(),
            ));
        }

        let tcp = match request.mode {
            DataMode::Passive => self.open_passive(request)?,
            DataMode::Active => self.open_active(request)?,
        };

        network::set_type_of_service(&tcp, network::IPTOS_THROUGHPUT);
        let timeout = self.state.transfer_timeout();
        tcp.set_read_timeout(Some(timeout))
            .and_then(|_| tcp.set_write_timeout(Some(timeout)))
            .map_err(|e| FtpClientError::Socket("set data timeout", e))?;

        let stream = if request.encrypt {
            self.encrypt_data(tcp)?
        } else {
            NetStream::Plain(tcp)
        };

        info!(
            "Data connection open for {} ({}, {:?})",
            request.verb(),
            request.mode,
            request.transfer_type
        );
        self.data = Some(DataChannel::new(
            stream,
            request.mode,
            request.direction,
            request.transfer_type,
        ));
        Ok(())
    }

    fn open_passive(&mut self, request: &TransferRequest) -> FtpResult<TcpStream> {
        let verb = request.verb();
        let mut retries = 0;

        loop {
            let reply = self.expect(&Command::Pasv, &[ENTERING_PASSIVE])?;
            let target = AddressTuple::parse_pasv(reply.final_line())?.socket_addr();
            debug!("Passive data address {target}");

            let connected = network::connect_with_timeout(
                target,
                self.state.transfer_timeout(),
                true,
                buffer_hint(request),
            )
            .map_err(|e| FtpClientError::from_io(e, IoPhase::Connect));
            let tcp = self.track(connected)?;

            self.send_rest(request)?;
            let reply = self.command(&verb)?;
            match classify_transfer(&reply, DataMode::Passive, &*self.overwrite) {
                TransferOpen::Opened => return Ok(tcp),
                TransferOpen::OverwriteConflict => {
                    self.delete_existing(&request.path)?;
                    let reply = self.command(&verb)?;
                    return match classify_transfer(&reply, DataMode::Passive, &*self.overwrite)
                    {
                        TransferOpen::Opened => Ok(tcp),
                        _ => Err(FtpClientError::UnexpectedReply(reply)),
                    };
                }
                TransferOpen::CannotOpenData if retries < MAX_DATA_CONNECT_RETRIES => {
                    retries += 1;
                    warn!(
                        "Server failed to open data connection, retry {retries}/{MAX_DATA_CONNECT_RETRIES}"
                    );
                    drop(tcp);
                    thread::sleep(DATA_RETRY_DELAY);
                }
                _ => return Err(FtpClientError::UnexpectedReply(reply)),
            }
        }
    }

    fn open_active(&mut self, request: &TransferRequest) -> FtpResult<TcpStream> {
        let verb = request.verb();
        let mut retries = 0;

        loop {
            let listener = self.bind_active_listener(request)?;
            let local = listener
                .local_addr()
                .map_err(|e| FtpClientError::Socket("getsockname", e))?;
            self.expect(&Command::Port(AddressTuple::from_socket_addr(local)?), &[OK])?;

            self.send_rest(request)?;
            let reply = self.command(&verb)?;
            match classify_transfer(&reply, DataMode::Active, &*self.overwrite) {
                TransferOpen::Opened => return self.accept_data(listener),
                TransferOpen::OverwriteConflict if retries < MAX_DATA_CONNECT_RETRIES => {
                    retries += 1;
                    self.delete_existing(&request.path)?;
                }
                TransferOpen::CannotOpenData if retries < MAX_DATA_CONNECT_RETRIES => {
                    retries += 1;
                    warn!(
                        "Server failed to open data connection, retry {retries}/{MAX_DATA_CONNECT_RETRIES}"
                    );
                    thread::sleep(DATA_RETRY_DELAY);
                }
                _ => return Err(FtpClientError::UnexpectedReply(reply)),
            }
        }
    }

    /// Binds the PORT listener on the control connection's local address.
    ///
    /// With port reuse enabled, uploads try the previous listener's port
    /// first and fall back to a kernel-chosen one when it is taken.
    fn bind_active_listener(&mut self, request: &TransferRequest) -> FtpResult<TcpListener> {
        let local = self
            .stream
            .tcp()
            .local_addr()
            .map_err(|e| FtpClientError::Socket("getsockname", e))?;
        let ip = AddressTuple::from_socket_addr(local)?.ip();
        let reuse = self.config.reuse_data_port && request.direction == Direction::Upload;

        for attempt in 1..=MAX_BIND_ATTEMPTS {
            let port = if reuse {
                self.state.data_port().unwrap_or(0)
            } else {
                0
            };
            match network::bind_listener(ip, port, buffer_hint(request)) {
                Ok(listener) => {
                    if reuse {
                        let bound = listener.local_addr().map(|a| a.port()).ok();
                        self.state.set_data_port(bound);
                    }
                    return Ok(listener);
                }
                Err(e) if matches!(e.kind(), ErrorKind::AddrInUse | ErrorKind::PermissionDenied) => {
                    debug!("bind() to {ip}:{port} failed ({e}), attempt {attempt}/{MAX_BIND_ATTEMPTS}");
                    self.state.set_data_port(None);
                }
                Err(e) => return Err(FtpClientError::Socket("bind", e)),
            }
        }

        Err(FtpClientError::Socket(
            "bind",
            io::Error::new(
                ErrorKind::AddrInUse,
                format!("no data port on {ip} after {MAX_BIND_ATTEMPTS} attempts"),
            ),
        ))
    }

    /// The server has `2 * transfer_timeout` to connect back.
    fn accept_data(&mut self, listener: TcpListener) -> FtpResult<TcpStream> {
        let result = accept_within(&listener, self.state.transfer_timeout() * 2);
        self.track(result)
    }

    fn send_rest(&mut self, request: &TransferRequest) -> FtpResult<()> {
        if request.resumes_download() {
            self.expect(&Command::Rest(request.offset), &[PENDING_FURTHER_INFO])?;
        }
        Ok(())
    }

    fn delete_existing(&mut self, path: &str) -> FtpResult<()> {
        info!("Remote {path} exists and may not be overwritten, deleting it first");
        self.delete(path)
    }

    /// TLS on the data connection, bound to the control connection's certificate.
    fn encrypt_data(&mut self, tcp: TcpStream) -> FtpResult<NetStream> {
        let (config, name) = match (&self.tls_config, &self.server_name) {
            (Some(config), Some(name)) => (config.clone(), name.clone()),
            _ => {
                return Err(FtpClientError::TlsSetup(
                    "data encryption requested without AUTH TLS".into(),
                ));
            }
        };

        let result = tls::connect(&config, name, tcp, IoPhase::Connect);
        let tls_stream = self.track(result)?;
        let data_certificate = tls::end_entity_certificate(&tls_stream.conn);
        tls::verify_data_certificate(
            self.state.control_certificate(),
            data_certificate.as_deref(),
        )?;

        debug!("Data connection encrypted {}", tls::describe(&tls_stream.conn));
        Ok(NetStream::Tls(Box::new(tls_stream)))
    }
}

/// Polls a non-blocking listener until a connection arrives or `limit` passes.
fn accept_within(listener: &TcpListener, limit: Duration) -> FtpResult<TcpStream> {
    listener
        .set_nonblocking(true)
        .map_err(|e| FtpClientError::Socket("set non-blocking", e))?;

    let deadline = Instant::now() + limit;
    let mut delay = ACCEPT_POLL_INITIAL;

    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!("Data connection accepted from {peer}");
                stream
                    .set_nonblocking(false)
                    .map_err(|e| FtpClientError::Socket("set blocking", e))?;
                return Ok(stream);
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(FtpClientError::Timeout(IoPhase::Accept));
                }
                thread::sleep(delay.min(deadline - now));
                delay = (delay * 2).min(ACCEPT_POLL_MAX);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FtpClientError::Socket("accept", e)),
        }
    }
}

fn buffer_hint(request: &TransferRequest) -> Option<BufferHint> {
    request.sockbuf_size.map(|size| {
        if request.direction.receives() {
            BufferHint::Receive(size)
        } else {
            BufferHint::Send(size)
        }
    })
}
