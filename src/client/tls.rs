//! TLS helpers for explicit FTPS (AUTH TLS, RFC 4217)
//!
//! Builds the shared rustls client configuration, runs blocking handshakes and
//! checks that a data connection talks to the same server as the control
//! connection.

use log::{debug, warn};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, ClientConnection, DigitallySignedStruct, RootCertStore, SignatureScheme};
use serde::Deserialize;
use std::net::TcpStream;
use std::sync::Arc;

use crate::client::stream::TlsStream;
use crate::error::{FtpClientError, FtpResult, IoPhase};

/// Which connections get encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    #[default]
    None,
    Control,
    Both,
}

impl TlsMode {
    pub fn protects_data(&self) -> bool {
        matches!(self, TlsMode::Both)
    }
}

/// Data channel protection level set with PROT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionLevel {
    Clear,
    Private,
}

impl ProtectionLevel {
    pub fn code(&self) -> char {
        match self {
            ProtectionLevel::Clear => 'C',
            ProtectionLevel::Private => 'P',
        }
    }
}

/// Accepts any server certificate while still checking handshake signatures.
#[derive(Debug)]
struct AcceptAnyServerCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Build the client configuration shared by control and data connections.
///
/// With `verify` the platform trust store is used. Without it any certificate
/// is accepted, which is what most FTPS deployments with self-signed
/// certificates need.
pub fn build_client_config(verify: bool) -> FtpResult<Arc<ClientConfig>> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?;

    let config = if verify {
        let mut roots = RootCertStore::empty();
        let native = rustls_native_certs::load_native_certs();
        for e in &native.errors {
            warn!("Problem loading platform certificates: {e}");
        }
        let (added, ignored) = roots.add_parsable_certificates(native.certs);
        debug!("Loaded {added} platform root certificates ({ignored} ignored)");
        if roots.is_empty() {
            return Err(FtpClientError::TlsSetup(
                "no usable root certificates found".into(),
            ));
        }
        builder.with_root_certificates(roots).with_no_client_auth()
    } else {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCertificate { provider }))
            .with_no_client_auth()
    };

    Ok(Arc::new(config))
}

pub fn server_name(host: &str) -> FtpResult<ServerName<'static>> {
    ServerName::try_from(host.to_string())
        .map_err(|e| FtpClientError::TlsSetup(format!("invalid server name {host}: {e}")))
}

/// Run a blocking client handshake over `tcp`.
///
/// Reusing the same `config` and `name` for data connections lets rustls
/// offer the control session for resumption.
pub fn connect(
    config: &Arc<ClientConfig>,
    name: ServerName<'static>,
    mut tcp: TcpStream,
    phase: IoPhase,
) -> FtpResult<TlsStream> {
    let mut conn = ClientConnection::new(config.clone(), name)?;
    while conn.is_handshaking() {
        conn.complete_io(&mut tcp)
            .map_err(|e| FtpClientError::from_io(e, phase))?;
    }
    debug!("TLS established: {}", describe(&conn));
    Ok(TlsStream::new(conn, tcp))
}

/// Protocol version and cipher suite, e.g. `<TLSv1_3, TLS13_AES_256_GCM_SHA384>`.
pub fn describe(conn: &ClientConnection) -> String {
    let version = conn
        .protocol_version()
        .map(|v| format!("{v:?}"))
        .unwrap_or_else(|| "unknown".into());
    let suite = conn
        .negotiated_cipher_suite()
        .map(|s| format!("{:?}", s.suite()))
        .unwrap_or_else(|| "unknown".into());
    format!("<{version}, {suite}>")
}

/// DER of the peer's end-entity certificate.
pub fn end_entity_certificate(conn: &ClientConnection) -> Option<Vec<u8>> {
    conn.peer_certificates()
        .and_then(|chain| chain.first())
        .map(|cert| cert.as_ref().to_vec())
}

/// Both channels must present the same end-entity certificate.
pub fn verify_data_certificate(control: Option<&[u8]>, data: Option<&[u8]>) -> FtpResult<()> {
    match (control, data) {
        (None, _) => Err(FtpClientError::UncomparableCertificates),
        (Some(_), None) => Err(FtpClientError::MissingDataCertificate),
        (Some(control), Some(data)) if control == data => Ok(()),
        (Some(_), Some(_)) => Err(FtpClientError::CertificateMismatch),
    }
}
