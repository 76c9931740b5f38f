// TLS certificate inspection probe.
//
// Certificate verification is disabled on purpose: the tool audits
// arbitrary and self-signed certificates, so the handshake must succeed
// regardless of what the peer presents. The insecurity is confined to
// this probe; nothing else in the service uses this client config.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, ProtocolVersion, SignatureScheme};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use x509_parser::prelude::FromDer;
use x509_parser::certificate::X509Certificate;

use crate::error::DiagnosticError;
use crate::models::DiagnosticOutcome;
use crate::validate::ValidDomain;

const TLS_PORT: u16 = 443;

/// Accepts any server certificate. Signature checks still run through the
/// provider so the handshake itself stays honest about what was negotiated.
#[derive(Debug)]
struct InsecureInspectionVerifier {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for InsecureInspectionVerifier {
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
        rustls::crypto::verify_tls12_signature(
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
        rustls::crypto::verify_tls13_signature(
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

static INSPECTION_CONFIG: LazyLock<Arc<ClientConfig>> = LazyLock::new(|| {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .expect("ring provider supports the default protocol versions")
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(InsecureInspectionVerifier { provider }))
        .with_no_client_auth();
    Arc::new(config)
});

/// Letter grade from the negotiated protocol version name.
pub fn grade_for_protocol(protocol: &str) -> &'static str {
    match protocol {
        "TLSv1.3" => "A+",
        "TLSv1.2" => "A",
        "TLSv1.1" => "B",
        "TLSv1" => "C",
        _ => "F",
    }
}

fn protocol_name(version: Option<ProtocolVersion>) -> String {
    match version {
        Some(ProtocolVersion::TLSv1_3) => "TLSv1.3".into(),
        Some(ProtocolVersion::TLSv1_2) => "TLSv1.2".into(),
        Some(ProtocolVersion::TLSv1_1) => "TLSv1.1".into(),
        Some(ProtocolVersion::TLSv1_0) => "TLSv1".into(),
        Some(other) => format!("{:?}", other),
        None => "unknown".into(),
    }
}

fn rfc3339(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|d| d.to_rfc3339())
        .unwrap_or_default()
}

/// Opens a TLS session to `domain:443` under a hard connect timeout and
/// extracts the certificate validity window, issuer, subject, serial and
/// the negotiated protocol/cipher, with a derived grade.
pub async fn inspect(
    domain: &ValidDomain,
    timeout: Duration,
) -> Result<DiagnosticOutcome, DiagnosticError> {
    let tcp = tokio::time::timeout(timeout, TcpStream::connect((domain.as_str(), TLS_PORT)))
        .await
        .map_err(|_| DiagnosticError::Timeout(timeout))?
        .map_err(|e| {
            DiagnosticError::ConnectError(format!("{}:{}: {}", domain.as_str(), TLS_PORT, e))
        })?;

    let server_name = ServerName::try_from(domain.as_str().to_owned()).map_err(|e| {
        DiagnosticError::ConnectError(format!("invalid server name {}: {}", domain.as_str(), e))
    })?;

    let connector = TlsConnector::from(INSPECTION_CONFIG.clone());
    let stream = tokio::time::timeout(timeout, connector.connect(server_name, tcp))
        .await
        .map_err(|_| DiagnosticError::Timeout(timeout))?
        .map_err(|e| {
            DiagnosticError::ConnectError(format!("TLS handshake with {}: {}", domain.as_str(), e))
        })?;

    let (_, session) = stream.get_ref();
    let protocol = protocol_name(session.protocol_version());
    let cipher = session
        .negotiated_cipher_suite()
        .map(|s| format!("{:?}", s.suite()))
        .unwrap_or_else(|| "unknown".into());
    let grade = grade_for_protocol(&protocol).to_string();

    let peer_cert = session
        .peer_certificates()
        .and_then(|certs| certs.first())
        .ok_or_else(|| {
            DiagnosticError::ConnectError(format!("{} presented no certificate", domain.as_str()))
        })?;
    let (_, cert) = X509Certificate::from_der(peer_cert.as_ref()).map_err(|e| {
        DiagnosticError::ConnectError(format!("certificate parse failed: {}", e))
    })?;

    let issuer = cert
        .issuer()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| cert.issuer().to_string());
    let subject = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| cert.subject().to_string());

    Ok(DiagnosticOutcome::TlsInspect {
        domain: domain.as_str().to_string(),
        valid_from: rfc3339(cert.validity().not_before.timestamp()),
        valid_to: rfc3339(cert.validity().not_after.timestamp()),
        issuer,
        subject,
        serial_number: cert.raw_serial_as_string(),
        protocol,
        cipher,
        grade,
    })
}
