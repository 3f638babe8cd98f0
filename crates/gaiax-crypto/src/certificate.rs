//! X.509 trust-anchor certificates: PEM chains, trust roots, chain
//! validation and certificate/CSR generation.

use std::fmt;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use gaiax_core::KeyType;
use rcgen::{BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa};
use x509_parser::extensions::{GeneralName, ParsedExtension};
use x509_parser::pem::Pem;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::error::CertificateError;
use crate::keys::{PrivateKey, PublicKey};

/// CA/Browser Forum Extended Validation policy OID.
pub const EV_POLICY_OID: &str = "2.23.140.1.1";

const PEM_LABEL: &str = "CERTIFICATE";

/// An owned DER-encoded X.509 certificate.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
}

impl Certificate {
    /// Wrap DER bytes, checking that they parse as a certificate.
    pub fn from_der(der: Vec<u8>) -> Result<Self, CertificateError> {
        X509Certificate::from_der(&der).map_err(|e| CertificateError::Parse(e.to_string()))?;
        Ok(Self { der })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    fn parsed(&self) -> Result<X509Certificate<'_>, CertificateError> {
        X509Certificate::from_der(&self.der)
            .map(|(_, cert)| cert)
            .map_err(|e| CertificateError::Parse(e.to_string()))
    }

    /// Subject distinguished name in RFC 4514 form.
    pub fn subject(&self) -> String {
        self.parsed()
            .map(|c| c.subject().to_string())
            .unwrap_or_default()
    }

    pub fn issuer(&self) -> String {
        self.parsed()
            .map(|c| c.issuer().to_string())
            .unwrap_or_default()
    }

    /// DNS names from the subjectAltName extension, falling back to the
    /// subject common name.
    pub fn dns_names(&self) -> Vec<String> {
        let Ok(cert) = self.parsed() else {
            return Vec::new();
        };
        let mut names: Vec<String> = cert
            .tbs_certificate
            .extensions()
            .iter()
            .filter_map(|ext| match ext.parsed_extension() {
                ParsedExtension::SubjectAlternativeName(san) => Some(san),
                _ => None,
            })
            .flat_map(|san| san.general_names.iter())
            .filter_map(|name| match name {
                GeneralName::DNSName(dns) => Some(dns.to_string()),
                _ => None,
            })
            .collect();
        if names.is_empty() {
            if let Some(cn) = cert
                .subject()
                .iter_common_name()
                .next()
                .and_then(|cn| cn.as_str().ok())
            {
                names.push(cn.to_string());
            }
        }
        names
    }

    /// Public key of the certificate subject.
    pub fn public_key(&self) -> Result<PublicKey, CertificateError> {
        let cert = self.parsed()?;
        Ok(PublicKey::from_spki_der(cert.public_key().raw)?)
    }

    pub fn key_type(&self) -> Result<KeyType, CertificateError> {
        Ok(self.public_key()?.key_type())
    }

    pub fn is_self_signed(&self) -> bool {
        self.parsed()
            .map(|c| c.subject().as_raw() == c.issuer().as_raw())
            .unwrap_or(false)
    }

    pub fn is_ca(&self) -> bool {
        self.parsed()
            .map(|c| {
                c.tbs_certificate.extensions().iter().any(|ext| {
                    matches!(ext.parsed_extension(), ParsedExtension::BasicConstraints(bc) if bc.ca)
                })
            })
            .unwrap_or(false)
    }

    /// Whether the certificate may sign other certificates: basicConstraints
    /// `cA=true`, and `keyCertSign` when a keyUsage extension is present.
    pub fn can_issue_certificates(&self) -> bool {
        let Ok(cert) = self.parsed() else {
            return false;
        };
        let key_usage_allows = cert
            .tbs_certificate
            .extensions()
            .iter()
            .filter_map(|ext| match ext.parsed_extension() {
                ParsedExtension::KeyUsage(usage) => Some(usage.key_cert_sign()),
                _ => None,
            })
            .all(|allowed| allowed);
        self.is_ca() && key_usage_allows
    }

    /// Whether the certificate carries the Extended Validation policy.
    pub fn is_extended_validation(&self) -> bool {
        self.parsed()
            .map(|c| {
                c.tbs_certificate
                    .extensions()
                    .iter()
                    .filter_map(|ext| match ext.parsed_extension() {
                        ParsedExtension::CertificatePolicies(policies) => Some(policies),
                        _ => None,
                    })
                    .flat_map(|policies| policies.iter())
                    .any(|policy| policy.policy_id.to_id_string() == EV_POLICY_OID)
            })
            .unwrap_or(false)
    }

    /// Whether `at` falls within the validity period.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        let ts = at.timestamp();
        self.parsed()
            .map(|c| {
                let validity = c.validity();
                validity.not_before.timestamp() <= ts && ts <= validity.not_after.timestamp()
            })
            .unwrap_or(false)
    }

    /// Whether this certificate's signature verifies under `issuer`'s key.
    pub fn is_issued_by(&self, issuer: &Certificate) -> bool {
        match (self.parsed(), issuer.parsed()) {
            (Ok(cert), Ok(issuer)) => cert.verify_signature(Some(issuer.public_key())).is_ok(),
            _ => false,
        }
    }

    /// Encode as a PEM `CERTIFICATE` block.
    pub fn to_pem(&self) -> String {
        let encoded = STANDARD.encode(&self.der);
        let mut pem = format!("-----BEGIN {}-----\n", PEM_LABEL);
        for line in encoded.as_bytes().chunks(64) {
            pem.push_str(&String::from_utf8_lossy(line));
            pem.push('\n');
        }
        pem.push_str(&format!("-----END {}-----\n", PEM_LABEL));
        pem
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject())
            .field("issuer", &self.issuer())
            .finish()
    }
}

/// Certificate chain, leaf first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateChain {
    certs: Vec<Certificate>,
}

impl CertificateChain {
    pub fn new(certs: Vec<Certificate>) -> Result<Self, CertificateError> {
        if certs.is_empty() {
            return Err(CertificateError::EmptyChain);
        }
        Ok(Self { certs })
    }

    /// Parse every `CERTIFICATE` block of a PEM bundle, in order.
    pub fn from_pem(pem: &str) -> Result<Self, CertificateError> {
        Self::new(parse_pem_bundle(pem.as_bytes())?)
    }

    pub fn load(path: &Path) -> Result<Self, CertificateError> {
        let pem = std::fs::read_to_string(path).map_err(|source| CertificateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_pem(&pem).map_err(|e| match e {
            CertificateError::EmptyChain => {
                CertificateError::Pem(format!("no certificate found in {}", path.display()))
            }
            other => other,
        })
    }

    /// Concatenated PEM blocks, leaf first.
    pub fn to_pem(&self) -> String {
        self.certs.iter().map(Certificate::to_pem).collect()
    }

    pub fn leaf(&self) -> &Certificate {
        &self.certs[0]
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.certs
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }
}

fn parse_pem_bundle(bytes: &[u8]) -> Result<Vec<Certificate>, CertificateError> {
    let mut certs = Vec::new();
    for pem in Pem::iter_from_buffer(bytes) {
        let pem = pem.map_err(|e| CertificateError::Pem(e.to_string()))?;
        if pem.label != PEM_LABEL {
            continue;
        }
        certs.push(Certificate::from_der(pem.contents)?);
    }
    Ok(certs)
}

/// The set of recognized trust-root certificates.
#[derive(Debug, Clone, Default)]
pub struct TrustRoots {
    roots: Vec<Certificate>,
}

impl TrustRoots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load roots from PEM files; each file may hold several certificates.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self, CertificateError> {
        let mut roots = Self::new();
        for path in paths {
            let path = path.as_ref();
            let pem = std::fs::read(path).map_err(|source| CertificateError::Io {
                path: path.display().to_string(),
                source,
            })?;
            for cert in parse_pem_bundle(&pem)? {
                roots.add(cert);
            }
        }
        tracing::debug!(count = roots.len(), "loaded trust roots");
        Ok(roots)
    }

    pub fn add(&mut self, cert: Certificate) {
        if !self.contains(&cert) {
            self.roots.push(cert);
        }
    }

    pub fn contains(&self, cert: &Certificate) -> bool {
        self.roots.iter().any(|root| root == cert)
    }

    /// A CA root whose key signed `cert`.
    pub fn find_issuer(&self, cert: &Certificate) -> Option<&Certificate> {
        self.roots
            .iter()
            .find(|root| root.can_issue_certificates() && cert.is_issued_by(root))
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// A non-fatal observation made while validating a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainWarning {
    SelfSigned { subject: String },
    NotExtendedValidation { subject: String },
}

impl fmt::Display for ChainWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfSigned { subject } => write!(f, "certificate '{}' is self-signed", subject),
            Self::NotExtendedValidation { subject } => write!(
                f,
                "certificate '{}' has no Extended Validation policy",
                subject
            ),
        }
    }
}

/// Outcome of a successful chain validation.
#[derive(Debug, Clone)]
pub struct ChainReport {
    /// Subject of the trust root the chain resolved to.
    pub trusted_root: String,
    pub warnings: Vec<ChainWarning>,
}

/// Validate a chain against the trust roots at time `at`.
///
/// Every certificate must be within its validity period and signed by the
/// next one, which must be a CA; the last certificate must be a trust root or
/// be signed by a CA root.
pub fn validate_chain(
    chain: &CertificateChain,
    roots: &TrustRoots,
    at: DateTime<Utc>,
) -> Result<ChainReport, CertificateError> {
    let certs = chain.certificates();
    for cert in certs {
        if !cert.is_valid_at(at) {
            return Err(CertificateError::OutsideValidity {
                subject: cert.subject(),
                at: at.to_rfc3339(),
            });
        }
    }
    for pair in certs.windows(2) {
        if !pair[0].is_issued_by(&pair[1]) {
            return Err(CertificateError::BrokenChain {
                subject: pair[0].subject(),
                issuer: pair[1].subject(),
            });
        }
        if !pair[1].can_issue_certificates() {
            return Err(CertificateError::NotCertificateAuthority {
                subject: pair[1].subject(),
            });
        }
    }

    let top = &certs[certs.len() - 1];
    let trusted_root = if roots.contains(top) {
        top.subject()
    } else {
        match roots.find_issuer(top) {
            Some(root) if root.is_valid_at(at) => root.subject(),
            _ => {
                return Err(CertificateError::UntrustedRoot {
                    subject: top.subject(),
                })
            }
        }
    };

    let leaf = chain.leaf();
    let mut warnings = Vec::new();
    if leaf.is_self_signed() {
        warnings.push(ChainWarning::SelfSigned {
            subject: leaf.subject(),
        });
    }
    if !leaf.is_extended_validation() {
        warnings.push(ChainWarning::NotExtendedValidation {
            subject: leaf.subject(),
        });
    }
    for warning in &warnings {
        tracing::warn!(%warning, "certificate chain warning");
    }

    Ok(ChainReport {
        trusted_root,
        warnings,
    })
}

/// Subject attributes of a certificate to generate.
#[derive(Debug, Clone, Default)]
pub struct CertificateProfile {
    pub common_name: String,
    pub dns_names: Vec<String>,
    pub organization: Option<String>,
    pub is_ca: bool,
}

impl CertificateProfile {
    /// Leaf profile for a domain: CN and single DNS SAN.
    pub fn for_domain(domain: &str) -> Self {
        Self {
            common_name: domain.to_string(),
            dns_names: vec![domain.to_string()],
            organization: None,
            is_ca: false,
        }
    }

    fn to_params(&self) -> Result<CertificateParams, CertificateError> {
        let mut params = CertificateParams::new(self.dns_names.clone()).map_err(generation)?;
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, self.common_name.clone());
        if let Some(org) = &self.organization {
            dn.push(DnType::OrganizationName, org.clone());
        }
        params.distinguished_name = dn;
        if self.is_ca {
            params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        }
        Ok(params)
    }
}

fn generation(e: rcgen::Error) -> CertificateError {
    CertificateError::Generation(e.to_string())
}

fn rcgen_key_pair(key: &PrivateKey) -> Result<rcgen::KeyPair, CertificateError> {
    let pem = key.to_pkcs8_pem()?;
    let alg = match key.key_type() {
        KeyType::Ed25519 => &rcgen::PKCS_ED25519,
        KeyType::Rsa => &rcgen::PKCS_RSA_SHA256,
    };
    rcgen::KeyPair::from_pem_and_sign_algo(&pem, alg).map_err(generation)
}

/// Generate a certificate for `key`: self-signed when `issuer` is `None`,
/// otherwise signed by the issuer certificate and key.
pub fn generate_certificate(
    profile: &CertificateProfile,
    key: &PrivateKey,
    issuer: Option<(&Certificate, &PrivateKey)>,
) -> Result<Certificate, CertificateError> {
    let params = profile.to_params()?;
    let subject_key = rcgen_key_pair(key)?;
    let cert = match issuer {
        None => params.self_signed(&subject_key).map_err(generation)?,
        Some((issuer_cert, issuer_key)) => {
            let issuer_key = rcgen_key_pair(issuer_key)?;
            let issuer = CertificateParams::from_ca_cert_pem(&issuer_cert.to_pem())
                .map_err(generation)?
                .self_signed(&issuer_key)
                .map_err(generation)?;
            params
                .signed_by(&subject_key, &issuer, &issuer_key)
                .map_err(generation)?
        }
    };
    tracing::info!(
        cn = %profile.common_name,
        key_type = %key.key_type(),
        self_signed = issuer.is_none(),
        "generated certificate"
    );
    Certificate::from_der(cert.der().to_vec())
}

/// Build a PEM PKCS#10 certificate signing request for `key`.
pub fn certificate_request(
    profile: &CertificateProfile,
    key: &PrivateKey,
) -> Result<String, CertificateError> {
    let key_pair = rcgen_key_pair(key)?;
    profile
        .to_params()?
        .serialize_request(&key_pair)
        .and_then(|csr| csr.pem())
        .map_err(generation)
}
