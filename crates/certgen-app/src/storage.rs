// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filesystem storage for the command-line runner.

use std::path::{Component, Path, PathBuf};

use certgen_core::CertgenError;
use certgen_core::error::Result;
use certgen_document::Storage;

/// Files under `root`, published at `base_url` when one is configured.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    base_url: Option<String>,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: Option<String>) -> Self {
        Self {
            root: root.into(),
            base_url,
        }
    }

    /// Resolve `path` below the root, refusing to escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
        {
            return Err(CertgenError::Configuration(format!(
                "storage path must stay inside {}: {path}",
                self.root.display()
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl Storage for LocalStorage {
    fn get_buffer(&self, path: &str) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.resolve(path)?)?)
    }

    fn get_url(&self, path: &str) -> Result<String> {
        self.resolve(path)?;
        let base = self.base_url.as_deref().ok_or_else(|| {
            CertgenError::Configuration("no storage base URL configured for QR links".into())
        })?;
        Ok(format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/')))
    }

    fn get_signed_url(&self, path: &str, _ttl_seconds: u64) -> Result<String> {
        Err(CertgenError::Configuration(format!(
            "local storage cannot issue signed URLs (requested for {path})"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_files_below_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("template.pdf"), b"%PDF").unwrap();
        let storage = LocalStorage::new(dir.path(), None);
        assert_eq!(storage.get_buffer("template.pdf").unwrap(), b"%PDF");
        assert!(storage.get_buffer("../etc/passwd").is_err());
    }

    #[test]
    fn links_need_a_base_url() {
        let storage = LocalStorage::new("/srv/certs", Some("https://files.example/certs/".into()));
        assert_eq!(
            storage.get_url("2024/ana.pdf").unwrap(),
            "https://files.example/certs/2024/ana.pdf"
        );
        assert!(storage.get_signed_url("2024/ana.pdf", 60).is_err());
        assert!(LocalStorage::new("/srv", None).get_url("a.pdf").is_err());
    }
}
