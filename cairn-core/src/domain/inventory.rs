//! Inventory domain types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Target hosts for an engine invocation
///
/// The core never looks inside an inventory; it only renders it as the
/// engine's `-i` argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inventory {
    /// An inventory file or directory on disk
    File(PathBuf),
    /// An inline list of host names or addresses
    Hosts(Vec<String>),
}

impl Inventory {
    /// Renders the inventory as the engine's `-i` argument
    ///
    /// Inline host lists are comma-joined with a trailing comma, which the
    /// engine treats as a literal host list rather than a path.
    pub fn to_engine_arg(&self) -> String {
        match self {
            Inventory::File(path) => path.to_string_lossy().to_string(),
            Inventory::Hosts(hosts) => {
                let mut arg = hosts.join(",");
                arg.push(',');
                arg
            }
        }
    }
}

impl std::fmt::Display for Inventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Inventory::File(path) => write!(f, "{}", path.display()),
            Inventory::Hosts(hosts) => write!(f, "[{}]", hosts.join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosts_engine_arg() {
        let inventory = Inventory::Hosts(vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()]);
        assert_eq!(inventory.to_engine_arg(), "10.0.0.1,10.0.0.2,");
    }

    #[test]
    fn test_file_engine_arg() {
        let inventory = Inventory::File(PathBuf::from("/etc/cairn/hosts.ini"));
        assert_eq!(inventory.to_engine_arg(), "/etc/cairn/hosts.ini");
    }

    #[test]
    fn test_deserialize() {
        let inventory: Inventory = serde_json::from_str(r#"{"hosts": ["master-1"]}"#).unwrap();
        assert_eq!(inventory, Inventory::Hosts(vec!["master-1".to_string()]));
    }
}
