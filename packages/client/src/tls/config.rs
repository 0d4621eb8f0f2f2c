//! Client TLS settings

use std::fmt;
use std::sync::Arc;

use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::CertificateDer;
use rustls::{ClientConfig, RootCertStore};

use super::errors::TlsError;
use super::verifier::{SkipHostnameVerifier, TrustAllVerifier};

/// Trust settings for connections to `https` origins.
///
/// Defaults to full verification against the bundled Mozilla roots.
///
/// ```
/// use viaduct_client::tls::TlsConfig;
///
/// let tls = TlsConfig::new().with_native_roots(true);
/// assert!(!tls.is_trust_all());
/// ```
#[derive(Clone)]
pub struct TlsConfig {
    trust_all: bool,
    verify_hostname: bool,
    native_roots: bool,
    webpki_roots: bool,
    extra_roots: Vec<CertificateDer<'static>>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        TlsConfig {
            trust_all: false,
            verify_hostname: true,
            native_roots: false,
            webpki_roots: true,
            extra_roots: Vec::new(),
        }
    }
}

impl TlsConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept any server certificate. Only meant for tests and local tooling.
    #[must_use]
    pub fn with_trust_all(mut self, trust_all: bool) -> Self {
        self.trust_all = trust_all;
        self
    }

    /// Check that the certificate is valid for the origin host.
    #[must_use]
    pub fn with_endpoint_identification(mut self, enabled: bool) -> Self {
        self.verify_hostname = enabled;
        self
    }

    /// Trust the operating system's root store.
    #[must_use]
    pub fn with_native_roots(mut self, enabled: bool) -> Self {
        self.native_roots = enabled;
        self
    }

    /// Trust the bundled Mozilla root store.
    #[must_use]
    pub fn with_webpki_roots(mut self, enabled: bool) -> Self {
        self.webpki_roots = enabled;
        self
    }

    /// Trust an additional DER encoded root certificate.
    #[must_use]
    pub fn with_root_certificate(mut self, der: impl Into<CertificateDer<'static>>) -> Self {
        self.extra_roots.push(der.into());
        self
    }

    #[must_use]
    pub fn is_trust_all(&self) -> bool {
        self.trust_all
    }

    /// Build a rustls config advertising `alpn`.
    ///
    /// # Errors
    ///
    /// Fails if an extra root is not a usable certificate, if no trust
    /// anchors remain, or if rustls rejects the verifier setup.
    pub fn client_config(&self, alpn: &[&[u8]]) -> Result<Arc<ClientConfig>, TlsError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(TlsError::Protocol)?;

        let mut config = if self.trust_all {
            tracing::warn!(target: "viaduct::tls", "certificate verification disabled");
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(TrustAllVerifier::new(
                    provider.signature_verification_algorithms,
                )))
                .with_no_client_auth()
        } else {
            let roots = Arc::new(self.root_store()?);
            if self.verify_hostname {
                builder.with_root_certificates(roots).with_no_client_auth()
            } else {
                let inner = webpki_verifier(roots, provider)?;
                builder
                    .dangerous()
                    .with_custom_certificate_verifier(Arc::new(SkipHostnameVerifier::new(inner)))
                    .with_no_client_auth()
            }
        };

        config.alpn_protocols = alpn.iter().map(|p| p.to_vec()).collect();
        Ok(Arc::new(config))
    }

    fn root_store(&self) -> Result<RootCertStore, TlsError> {
        let mut store = RootCertStore::empty();

        if self.native_roots {
            let loaded = rustls_native_certs::load_native_certs();
            for err in &loaded.errors {
                tracing::warn!(target: "viaduct::tls", error = %err, "native certificate load error");
            }
            let (added, ignored) = store.add_parsable_certificates(loaded.certs);
            tracing::debug!(target: "viaduct::tls", added, ignored, "loaded native roots");
        }

        if self.webpki_roots {
            store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        }

        for cert in &self.extra_roots {
            store.add(cert.clone()).map_err(TlsError::InvalidRoot)?;
        }

        if store.is_empty() {
            return Err(TlsError::NoRoots);
        }
        Ok(store)
    }
}

fn webpki_verifier(
    roots: Arc<RootCertStore>,
    provider: Arc<CryptoProvider>,
) -> Result<Arc<WebPkiServerVerifier>, TlsError> {
    Ok(WebPkiServerVerifier::builder_with_provider(roots, provider).build()?)
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConfig")
            .field("trust_all", &self.trust_all)
            .field("verify_hostname", &self.verify_hostname)
            .field("native_roots", &self.native_roots)
            .field("webpki_roots", &self.webpki_roots)
            .field("extra_roots", &self.extra_roots.len())
            .finish()
    }
}
