//! Self-signed PEM material written to a temp directory

use std::path::PathBuf;

use tempfile::TempDir;

use crate::TlsMaterial;

pub(crate) struct Pems {
    pub dir: TempDir,
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl Pems {
    pub fn generate() -> Self {
        let rcgen::CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let cert_path = dir.path().join("cert.pem");
        let key_path = dir.path().join("key.pem");
        std::fs::write(&cert_path, cert.pem()).unwrap();
        std::fs::write(&key_path, key_pair.serialize_pem()).unwrap();

        Self {
            dir,
            cert: cert_path,
            key: key_path,
        }
    }

    /// Write arbitrary content next to the generated files
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Identity plus the self-signed cert as its own trust anchor
    pub fn mutual(&self) -> TlsMaterial {
        TlsMaterial::new(&self.cert, &self.key, &self.cert)
    }
}
