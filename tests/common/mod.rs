//! Scripted FTP peer for integration tests.
//!
//! Each test hands a closure to `spawn`; the closure plays the server side
//! of one control connection and the peer records every command it saw.

#![allow(dead_code)]

use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::{ServerConfig, ServerConnection, StreamOwned};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rax_ftp_client::SessionConfig;

type TlsServerStream = StreamOwned<ServerConnection, TcpStream>;

enum Control {
    Plain(BufReader<TcpStream>),
    Tls(BufReader<TlsServerStream>),
    Closed,
}

pub struct Peer {
    control: Control,
    commands: Vec<String>,
}

impl Peer {
    /// Sends one reply line (CRLF appended).
    pub fn send(&mut self, line: &str) {
        let wire = format!("{line}\r\n");
        let result = match &mut self.control {
            Control::Plain(reader) => reader.get_mut().write_all(wire.as_bytes()),
            Control::Tls(reader) => reader
                .get_mut()
                .write_all(wire.as_bytes())
                .and_then(|_| reader.get_mut().flush()),
            Control::Closed => panic!("control connection closed"),
        };
        result.expect("peer write");
    }

    /// Next command line, with Telnet control bytes in front stripped.
    /// `None` once the client closed the connection.
    pub fn next_command(&mut self) -> Option<String> {
        let mut raw = Vec::new();
        let n = match &mut self.control {
            Control::Plain(reader) => reader.read_until(b'\n', &mut raw),
            Control::Tls(reader) => reader.read_until(b'\n', &mut raw),
            Control::Closed => return None,
        }
        .unwrap_or(0);
        if n == 0 {
            return None;
        }

        let start = raw
            .iter()
            .position(|b| b.is_ascii_alphabetic())
            .unwrap_or(raw.len());
        let line = String::from_utf8_lossy(&raw[start..])
            .trim_end_matches(&['\r', '\n'][..])
            .to_string();
        self.commands.push(line.clone());
        Some(line)
    }

    /// Reads one command, asserts its prefix and returns the full line.
    pub fn expect(&mut self, prefix: &str) -> String {
        let line = self
            .next_command()
            .unwrap_or_else(|| panic!("connection closed while waiting for {prefix}"));
        assert!(
            line.starts_with(prefix),
            "expected {prefix:?}, client sent {line:?}"
        );
        line
    }

    /// Reads one command with the given prefix and answers it.
    pub fn reply(&mut self, prefix: &str, reply: &str) -> String {
        let line = self.expect(prefix);
        self.send(reply);
        line
    }

    /// Answers PASV with a fresh loopback listener.
    pub fn passive(&mut self) -> TcpListener {
        self.expect("PASV");
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind passive listener");
        let port = listener.local_addr().expect("local addr").port();
        self.send(&format!(
            "227 Entering Passive Mode (127,0,0,1,{},{})",
            port >> 8,
            port & 0xff
        ));
        listener
    }

    /// Answers PORT with 200 and returns the announced address.
    pub fn port(&mut self) -> SocketAddr {
        let line = self.expect("PORT ");
        self.send("200 PORT command successful");
        let fields: Vec<u16> = line[5..]
            .split(',')
            .map(|f| f.trim().parse().expect("PORT field"))
            .collect();
        assert_eq!(fields.len(), 6, "PORT needs six fields: {line}");
        format!(
            "{}.{}.{}.{}:{}",
            fields[0],
            fields[1],
            fields[2],
            fields[3],
            fields[4] * 256 + fields[5]
        )
        .parse()
        .expect("PORT address")
    }

    /// Logs in with USER/PASS.
    pub fn login(&mut self) {
        self.reply("USER ", "331 Password required");
        self.reply("PASS ", "230 Logged in");
    }

    /// Answers AUTH TLS with 234 and continues over TLS.
    pub fn start_tls(&mut self, config: Arc<ServerConfig>) {
        self.reply("AUTH TLS", "234 Proceed with negotiation");
        let tcp = match std::mem::replace(&mut self.control, Control::Closed) {
            Control::Plain(reader) => {
                assert!(reader.buffer().is_empty(), "data after AUTH TLS");
                reader.into_inner()
            }
            _ => panic!("AUTH TLS on a TLS or closed connection"),
        };
        let connection = ServerConnection::new(config).expect("server connection");
        self.control = Control::Tls(BufReader::new(StreamOwned::new(connection, tcp)));
    }

    /// Aborts the plain control connection with a TCP reset.
    pub fn reset(&mut self) {
        match std::mem::replace(&mut self.control, Control::Closed) {
            Control::Plain(reader) => {
                let tcp = reader.into_inner();
                socket2::SockRef::from(&tcp)
                    .set_linger(Some(Duration::ZERO))
                    .expect("zero linger");
            }
            _ => panic!("reset needs an open plain connection"),
        }
    }

    /// Consumes commands until the client goes away.
    pub fn drain(&mut self) {
        while self.next_command().is_some() {}
    }
}

/// Starts a peer on a loopback port. The handle yields the command transcript.
pub fn spawn<F>(script: F) -> (u16, JoinHandle<Vec<String>>)
where
    F: FnOnce(&mut Peer) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind control listener");
    let port = listener.local_addr().expect("local addr").port();

    let handle = thread::spawn(move || {
        let (tcp, _) = listener.accept().expect("accept control connection");
        tcp.set_read_timeout(Some(Duration::from_secs(10)))
            .expect("peer read timeout");
        let mut peer = Peer {
            control: Control::Plain(BufReader::new(tcp)),
            commands: Vec::new(),
        };
        script(&mut peer);
        peer.commands
    });
    (port, handle)
}

/// Accepts the client's data connection and reads it to EOF.
pub fn receive_data(listener: &TcpListener) -> Vec<u8> {
    let (mut data, _) = listener.accept().expect("accept data connection");
    let mut received = Vec::new();
    data.read_to_end(&mut received).expect("read data");
    received
}

/// Sends `bytes` on an accepted or connected data stream and closes it.
pub fn send_data(mut data: TcpStream, bytes: &[u8]) {
    data.write_all(bytes).expect("write data");
}

/// Wraps an accepted data connection in TLS and reads it to EOF. Failures
/// come back as an empty buffer.
pub fn receive_data_tls(listener: &TcpListener, config: Arc<ServerConfig>) -> Vec<u8> {
    let (tcp, _) = listener.accept().expect("accept data connection");
    tcp.set_read_timeout(Some(Duration::from_secs(10)))
        .expect("data read timeout");
    let connection = ServerConnection::new(config).expect("server connection");
    let mut stream = StreamOwned::new(connection, tcp);
    let mut received = Vec::new();
    match stream.read_to_end(&mut received) {
        Ok(_) => received,
        Err(_) => Vec::new(),
    }
}

/// Self-signed server config for `localhost` and 127.0.0.1.
pub fn tls_server_config() -> Arc<ServerConfig> {
    let cert = rcgen::generate_simple_self_signed(vec![
        "localhost".to_string(),
        "127.0.0.1".to_string(),
    ])
    .expect("generate certificate");
    let cert_der = CertificateDer::from(cert.serialize_der().expect("certificate DER"));
    let key_der = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(cert.serialize_private_key_der()));

    let config = ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .expect("protocol versions")
    .with_no_client_auth()
    .with_single_cert(vec![cert_der], key_der)
    .expect("server certificate");
    Arc::new(config)
}

/// Session settings with a short deadline for tests.
pub fn session_config() -> SessionConfig {
    let _ = env_logger::builder().is_test(true).try_init();
    SessionConfig {
        transfer_timeout_secs: 5,
        ..SessionConfig::default()
    }
}
