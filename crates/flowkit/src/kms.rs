//! Signing with keys held in Google Cloud KMS.
//!
//! Credentials come from application default credentials. When
//! `GOOGLE_APPLICATION_CREDENTIALS` is unset the `gcloud` login helper is run
//! once and the credential file it reports is exported into the process
//! environment. Requests go to the KMS REST API with a bearer token from
//! `gcloud auth application-default print-access-token`.

use std::fmt;
use std::process::Command;
use std::str::FromStr;
use std::time::Duration;

use base64::Engine;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::{json, Value as Json};
use tracing::{debug, info};

use flow_transport::remote::HTTP_TIMEOUT_ENV;
use flow_types::crypto::{der_to_raw_signature, HashAlgorithm, PublicKey, SignatureAlgorithm, Signer};
use flow_types::env_utils::{env_string, env_var_or};
use flow_types::{Error, Result};

pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

const KMS_ENDPOINT: &str = "https://cloudkms.googleapis.com/v1";
const GCLOUD: &str = "gcloud";

// =============================================================================
// Resource id
// =============================================================================

/// `projects/<p>/locations/<l>/keyRings/<r>/cryptoKeys/<k>/cryptoKeyVersions/<v>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmsResource {
    pub project: String,
    pub location: String,
    pub key_ring: String,
    pub key: String,
    pub version: String,
}

impl FromStr for KmsResource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        let labels = ["projects", "locations", "keyRings", "cryptoKeys", "cryptoKeyVersions"];
        let well_formed = parts.len() == 10
            && labels.iter().enumerate().all(|(i, label)| parts[i * 2] == *label)
            && parts.iter().skip(1).step_by(2).all(|v| !v.is_empty());
        if !well_formed {
            return Err(Error::BadKeyConfig(format!("invalid KMS resource id {:?}", s)));
        }
        Ok(Self {
            project: parts[1].to_string(),
            location: parts[3].to_string(),
            key_ring: parts[5].to_string(),
            key: parts[7].to_string(),
            version: parts[9].to_string(),
        })
    }
}

impl fmt::Display for KmsResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "projects/{}/locations/{}/keyRings/{}/cryptoKeys/{}/cryptoKeyVersions/{}",
            self.project, self.location, self.key_ring, self.key, self.version
        )
    }
}

// =============================================================================
// Credentials
// =============================================================================

fn run_gcloud(args: &[&str]) -> Result<String> {
    let output = Command::new(GCLOUD).args(args).output().map_err(|e| {
        Error::MissingCredentials(format!(
            "could not run {} ({}); install the Google Cloud SDK or set {}",
            GCLOUD, e, CREDENTIALS_ENV
        ))
    })?;
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    if !output.status.success() {
        return Err(Error::MissingCredentials(format!(
            "{} {} failed: {}",
            GCLOUD,
            args.join(" "),
            combined.trim()
        )));
    }
    Ok(combined)
}

/// Last `[...]` segment of the login helper output: the credential file path.
pub fn credentials_path_from_output(output: &str) -> Option<String> {
    let pattern = Regex::new(r"\[([^\[\]]+)\]").ok()?;
    pattern
        .captures_iter(output)
        .last()
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Make sure application default credentials are available to this process.
pub fn ensure_credentials(project: &str) -> Result<()> {
    if env_string(CREDENTIALS_ENV).is_some() {
        return Ok(());
    }
    info!(project, "no application default credentials, running gcloud login");
    let output = run_gcloud(&[
        "auth",
        "application-default",
        "login",
        &format!("--project={}", project),
    ])?;
    let path = credentials_path_from_output(&output).ok_or_else(|| {
        Error::MissingCredentials("gcloud login did not report a credentials file".to_string())
    })?;
    std::env::set_var(CREDENTIALS_ENV, &path);
    debug!(%path, "exported application default credentials");
    Ok(())
}

// =============================================================================
// Signer
// =============================================================================

/// [`Signer`] that asks KMS to sign digests.
pub struct KmsSigner {
    resource: KmsResource,
    sig_algo: SignatureAlgorithm,
    hash_algo: HashAlgorithm,
    agent: ureq::Agent,
    public_key: Mutex<Option<PublicKey>>,
}

impl KmsSigner {
    const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn new(resource: KmsResource, sig_algo: SignatureAlgorithm, hash_algo: HashAlgorithm) -> Result<Self> {
        let timeout = Duration::from_secs(env_var_or(HTTP_TIMEOUT_ENV, Self::DEFAULT_TIMEOUT_SECS));
        Ok(Self {
            resource,
            sig_algo,
            hash_algo,
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            public_key: Mutex::new(None),
        })
    }

    pub fn resource(&self) -> &KmsResource {
        &self.resource
    }

    fn access_token(&self) -> Result<String> {
        ensure_credentials(&self.resource.project)?;
        let token = run_gcloud(&["auth", "application-default", "print-access-token"])?;
        Ok(token.lines().next().unwrap_or_default().trim().to_string())
    }

    fn call(&self, operation: &str, request: ureq::Request, body: Option<Json>) -> Result<Json> {
        let request = request.set("Authorization", &format!("Bearer {}", self.access_token()?));
        let response = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };
        let response = response.map_err(|e| match e {
            ureq::Error::Status(code, resp) => {
                let text = resp.into_string().unwrap_or_default();
                Error::gateway(operation, format!("KMS returned {}: {}", code, text))
            }
            other => Error::gateway(operation, other),
        })?;
        response.into_json().map_err(|e| Error::gateway(operation, e))
    }
}

impl Signer for KmsSigner {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let digest = self.hash_algo.digest(message);
        let url = format!("{}/{}:asymmetricSign", KMS_ENDPOINT, self.resource);
        let body = json!({
            "digest": { "sha256": base64::engine::general_purpose::STANDARD.encode(digest) }
        });
        let response = self.call("sign with KMS", self.agent.post(&url), Some(body))?;
        let der = response
            .get("signature")
            .and_then(Json::as_str)
            .ok_or_else(|| Error::gateway("sign with KMS", "response has no signature"))?;
        let der = base64::engine::general_purpose::STANDARD
            .decode(der)
            .map_err(|e| Error::parse("KMS signature", e))?;
        der_to_raw_signature(self.sig_algo, &der)
    }

    fn public_key(&self) -> Result<PublicKey> {
        if let Some(key) = *self.public_key.lock() {
            return Ok(key);
        }
        let url = format!("{}/{}/publicKey", KMS_ENDPOINT, self.resource);
        let response = self.call("fetch KMS public key", self.agent.get(&url), None)?;
        let pem = response
            .get("pem")
            .and_then(Json::as_str)
            .ok_or_else(|| Error::gateway("fetch KMS public key", "response has no pem"))?;
        let key = PublicKey::from_pem(self.sig_algo, pem)?;
        *self.public_key.lock() = Some(key);
        Ok(key)
    }

    fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_roundtrip() {
        let id = "projects/p1/locations/us-east1/keyRings/ring/cryptoKeys/key/cryptoKeyVersions/3";
        let resource: KmsResource = id.parse().unwrap();
        assert_eq!(resource.project, "p1");
        assert_eq!(resource.location, "us-east1");
        assert_eq!(resource.version, "3");
        assert_eq!(resource.to_string(), id);
    }

    #[test]
    fn test_malformed_resources() {
        for id in [
            "",
            "projects/p1",
            "projects//locations/l/keyRings/r/cryptoKeys/k/cryptoKeyVersions/1",
            "project/p1/locations/l/keyRings/r/cryptoKeys/k/cryptoKeyVersions/1",
            "projects/p1/locations/l/keyRings/r/cryptoKeys/k/cryptoKeyVersions/1/extra",
        ] {
            assert!(matches!(id.parse::<KmsResource>(), Err(Error::BadKeyConfig(_))), "{}", id);
        }
    }

    #[test]
    fn test_credentials_path_from_output() {
        let output = "Your browser has been opened to visit:\n\n    https://accounts.google.com/o/oauth2/auth?x=[y]\n\nCredentials saved to file: [/home/dev/.config/gcloud/application_default_credentials.json]\n\nThese credentials will be used by any library that requests Application Default Credentials (ADC).\n";
        assert_eq!(
            credentials_path_from_output(output).as_deref(),
            Some("/home/dev/.config/gcloud/application_default_credentials.json")
        );
        assert_eq!(credentials_path_from_output("nothing here"), None);
    }
}
