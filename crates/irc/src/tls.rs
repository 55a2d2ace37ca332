use std::sync::Arc;

use {
    rustls::pki_types::ServerName,
    tokio::net::TcpStream,
    tokio_rustls::{TlsConnector, client::TlsStream},
    tracing::{debug, warn},
};

use crate::error::{Error, Result};

/// Build a TLS connector that trusts the platform's native root store.
///
/// The ring provider is selected explicitly so the process never depends on
/// a globally installed default.
fn build_tls_connector() -> Result<TlsConnector> {
    let mut root_store = rustls::RootCertStore::empty();

    let native = rustls_native_certs::load_native_certs();
    for e in &native.errors {
        warn!(error = %e, "failed to load some native root certificates");
    }
    let (added, ignored) = root_store.add_parsable_certificates(native.certs);
    debug!(added, ignored, "loaded native root certificates");

    let config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .with_root_certificates(root_store)
    .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

/// Run the TLS handshake over an established TCP stream, verifying the
/// certificate against `server`.
pub(crate) async fn wrap(server: &str, tcp: TcpStream) -> Result<TlsStream<TcpStream>> {
    let name = ServerName::try_from(server)
        .map_err(|_| Error::InvalidServerName {
            server: server.to_string(),
        })?
        .to_owned();
    let stream = build_tls_connector()?.connect(name, tcp).await?;
    debug!(server, "tls handshake complete");
    Ok(stream)
}
