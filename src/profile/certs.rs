// src/profile/certs.rs
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use x509_parser::prelude::{FromDer, ParsedExtension, X509Certificate};

use super::ProfileError;

/// Human-readable view of a certificate carried in a descriptor, typically the
/// CA a TLS cluster is verified against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CertificateSummary {
    pub subject: String,
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub serial: String,
    pub fingerprint: String,
    pub is_ca: bool,
}

impl CertificateSummary {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.not_after || now < self.not_before
    }
}

/// Accepts PEM or DER bytes.
pub fn summarize_certificate(data: &[u8]) -> Result<CertificateSummary, ProfileError> {
    let der = if data.starts_with(b"-----BEGIN") {
        openssl::x509::X509::from_pem(data)
            .and_then(|cert| cert.to_der())
            .map_err(|e| ProfileError::Certificate(e.to_string()))?
    } else {
        data.to_vec()
    };

    let (_remainder, cert) =
        X509Certificate::from_der(&der).map_err(|e| ProfileError::Certificate(e.to_string()))?;

    let not_before = timestamp(cert.validity().not_before.timestamp(), "not_before")?;
    let not_after = timestamp(cert.validity().not_after.timestamp(), "not_after")?;

    let is_ca = cert
        .extensions()
        .iter()
        .find_map(|ext| match ext.parsed_extension() {
            ParsedExtension::BasicConstraints(bc) => Some(bc.ca),
            _ => None,
        })
        .unwrap_or(false);

    let fingerprint = openssl::hash::hash(openssl::hash::MessageDigest::sha256(), &der)
        .map_err(|e| ProfileError::Certificate(e.to_string()))?;

    Ok(CertificateSummary {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        not_before,
        not_after,
        serial: hex::encode(cert.raw_serial()),
        fingerprint: hex::encode(fingerprint),
        is_ca,
    })
}

fn timestamp(seconds: i64, field: &str) -> Result<DateTime<Utc>, ProfileError> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| ProfileError::Certificate(format!("invalid {} timestamp", field)))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Self-signed material for tests that need real certificates.
    use openssl::asn1::Asn1Time;
    use openssl::bn::BigNum;
    use openssl::hash::MessageDigest;
    use openssl::pkey::PKey;
    use openssl::rsa::Rsa;
    use openssl::x509::extension::BasicConstraints;
    use openssl::x509::{X509NameBuilder, X509};

    pub struct TestCertificate {
        pub cert_pem: Vec<u8>,
        pub key_pem: Vec<u8>,
        pub cert: X509,
    }

    pub fn self_signed(common_name: &str, ca: bool) -> TestCertificate {
        let rsa = Rsa::generate(2048).unwrap();
        let key = PKey::from_rsa(rsa).unwrap();

        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", common_name).unwrap();
        let name = name.build();

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        let serial = BigNum::from_u32(42).unwrap().to_asn1_integer().unwrap();
        builder.set_serial_number(&serial).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&key).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(30).unwrap())
            .unwrap();
        if ca {
            builder
                .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
                .unwrap();
        }
        builder.sign(&key, MessageDigest::sha256()).unwrap();
        let cert = builder.build();

        TestCertificate {
            cert_pem: cert.to_pem().unwrap(),
            key_pem: key.rsa().unwrap().private_key_to_pem().unwrap(),
            cert,
        }
    }
}
