//! Key storage for the push pipeline.
//!
//! The device keeps an RSA key pair registered with the push proxy; the
//! server's public key is stored alongside it when push is set up. Both are
//! re-read per push event so a re-registration takes effect without a
//! restart.

use std::fs;
use std::path::PathBuf;

use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};

use super::PushError;

/// Access to the locally stored push keys.
pub trait KeyStore: Send + Sync {
    /// Device private key used to decrypt push subjects.
    fn load_private_key(&self) -> Result<RsaPrivateKey, PushError>;

    /// Server public key used to verify push signatures.
    fn load_server_public_key(&self) -> Result<RsaPublicKey, PushError>;
}

/// File-backed key store: PKCS#8 PEM private key, SPKI PEM public key.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    private_key_path: PathBuf,
    server_public_key_path: PathBuf,
}

impl FileKeyStore {
    pub fn new(private_key_path: PathBuf, server_public_key_path: PathBuf) -> Self {
        Self {
            private_key_path,
            server_public_key_path,
        }
    }
}

impl KeyStore for FileKeyStore {
    fn load_private_key(&self) -> Result<RsaPrivateKey, PushError> {
        let pem = fs::read_to_string(&self.private_key_path).map_err(|e| {
            PushError::KeyUnavailable(format!(
                "cannot read {}: {}",
                self.private_key_path.display(),
                e
            ))
        })?;
        RsaPrivateKey::from_pkcs8_pem(&pem)
            .map_err(|e| PushError::KeyUnavailable(format!("invalid device private key: {}", e)))
    }

    fn load_server_public_key(&self) -> Result<RsaPublicKey, PushError> {
        let pem = fs::read_to_string(&self.server_public_key_path).map_err(|e| {
            PushError::KeyUnavailable(format!(
                "cannot read {}: {}",
                self.server_public_key_path.display(),
                e
            ))
        })?;
        RsaPublicKey::from_public_key_pem(&pem)
            .map_err(|e| PushError::KeyUnavailable(format!("invalid server public key: {}", e)))
    }
}

/// In-memory key store holding already parsed keys.
#[derive(Debug, Clone)]
pub struct StaticKeyStore {
    private_key: RsaPrivateKey,
    server_public_key: RsaPublicKey,
}

impl StaticKeyStore {
    pub fn new(private_key: RsaPrivateKey, server_public_key: RsaPublicKey) -> Self {
        Self {
            private_key,
            server_public_key,
        }
    }
}

impl KeyStore for StaticKeyStore {
    fn load_private_key(&self) -> Result<RsaPrivateKey, PushError> {
        Ok(self.private_key.clone())
    }

    fn load_server_public_key(&self) -> Result<RsaPublicKey, PushError> {
        Ok(self.server_public_key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey};
    use std::io::Write;

    #[test]
    fn missing_files_map_to_key_unavailable() {
        let store = FileKeyStore::new(
            PathBuf::from("/nonexistent/push_key.pem"),
            PathBuf::from("/nonexistent/server_key.pem"),
        );
        assert!(matches!(
            store.load_private_key(),
            Err(PushError::KeyUnavailable(_))
        ));
        assert!(matches!(
            store.load_server_public_key(),
            Err(PushError::KeyUnavailable(_))
        ));
    }

    #[test]
    fn garbage_pem_maps_to_key_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("push_key.pem");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "not a key").unwrap();

        let store = FileKeyStore::new(path.clone(), path);
        assert!(matches!(
            store.load_private_key(),
            Err(PushError::KeyUnavailable(_))
        ));
    }

    #[test]
    fn round_trips_pem_key_pair() {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = private_key.to_public_key();

        let dir = tempfile::tempdir().unwrap();
        let priv_path = dir.path().join("push_key.pem");
        let pub_path = dir.path().join("server_key.pem");
        std::fs::write(
            &priv_path,
            private_key
                .to_pkcs8_pem(rsa::pkcs8::LineEnding::LF)
                .unwrap(),
        )
        .unwrap();
        std::fs::write(
            &pub_path,
            public_key
                .to_public_key_pem(rsa::pkcs8::LineEnding::LF)
                .unwrap(),
        )
        .unwrap();

        let store = FileKeyStore::new(priv_path, pub_path);
        assert_eq!(store.load_private_key().unwrap(), private_key);
        assert_eq!(store.load_server_public_key().unwrap(), public_key);
    }
}
