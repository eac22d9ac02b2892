//! Playbook catalog
//!
//! Maps playbook identifiers to files on disk. Built explicitly and handed to
//! the runner, so nothing about playbook locations is process-wide.

use cairn_core::domain::playbook;
use cairn_core::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct PlaybookCatalog {
    entries: BTreeMap<String, PathBuf>,
}

impl PlaybookCatalog {
    /// Creates an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog of every bundled playbook id under `root`
    pub fn bundled(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let mut catalog = Self::new();
        for id in playbook::ALL {
            catalog.register(*id, root.join(id));
        }
        catalog
    }

    /// Registers or replaces the path for an identifier
    pub fn register(&mut self, id: impl Into<String>, path: impl Into<PathBuf>) {
        self.entries.insert(id.into(), path.into());
    }

    /// Resolves an identifier to an existing playbook file
    ///
    /// # Errors
    /// Returns `Error::UnknownPlaybook` if the id is not registered or its
    /// file does not exist.
    pub fn resolve(&self, id: &str) -> Result<&Path> {
        let path = self
            .entries
            .get(id)
            .ok_or_else(|| Error::UnknownPlaybook(id.to_string()))?;

        if !path.is_file() {
            return Err(Error::UnknownPlaybook(format!(
                "{} (no file at {})",
                id,
                path.display()
            )));
        }

        Ok(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(id, path)| (id.as_str(), path.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_registers_all_ids() {
        let catalog = PlaybookCatalog::bundled("/opt/cairn/playbooks");
        assert_eq!(catalog.len(), playbook::ALL.len());

        let (_, path) = catalog
            .iter()
            .find(|(id, _)| *id == playbook::INGRESS_CONTROLLER)
            .unwrap();
        assert_eq!(
            path,
            Path::new("/opt/cairn/playbooks/14-ingress-controller.yml")
        );
    }

    #[test]
    fn test_resolve_unknown_id() {
        let catalog = PlaybookCatalog::new();
        let err = catalog.resolve("99-nope.yml").unwrap_err();
        assert!(matches!(err, Error::UnknownPlaybook(id) if id == "99-nope.yml"));
    }

    #[test]
    fn test_resolve_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = PlaybookCatalog::bundled(dir.path());
        assert!(matches!(
            catalog.resolve(playbook::BASE),
            Err(Error::UnknownPlaybook(_))
        ));

        std::fs::write(dir.path().join(playbook::BASE), "- hosts: all\n").unwrap();
        assert_eq!(
            catalog.resolve(playbook::BASE).unwrap(),
            dir.path().join(playbook::BASE)
        );
    }
}
