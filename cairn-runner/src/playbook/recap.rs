//! Engine recap parsing
//!
//! The engine ends every run with a per-host summary block:
//!
//! ```text
//! PLAY RECAP *********************************************************
//! master-1    : ok=12   changed=3    unreachable=0    failed=0    skipped=2
//! worker-1    : ok=4    changed=0    unreachable=1    failed=0    skipped=0
//! ```
//!
//! The parser is fed output line by line while it streams to the artifact.

use cairn_core::domain::result::TargetStatus;
use std::collections::BTreeMap;

const RECAP_HEADER: &str = "PLAY RECAP";

/// Incremental parser for recap blocks
#[derive(Debug, Default)]
pub struct RecapParser {
    in_recap: bool,
    targets: BTreeMap<String, TargetStatus>,
}

impl RecapParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, line: &str) {
        let line = line.trim();

        if line.starts_with(RECAP_HEADER) {
            self.in_recap = true;
            return;
        }

        if !self.in_recap {
            return;
        }

        match parse_recap_line(line) {
            Some((target, status)) => {
                self.targets.insert(target, status);
            }
            None => self.in_recap = false,
        }
    }

    /// Returns the per-target statuses seen so far
    ///
    /// Empty when the output contained no interpretable recap.
    pub fn finish(self) -> BTreeMap<String, TargetStatus> {
        self.targets
    }
}

/// Parses a single `host : key=value ...` recap line
fn parse_recap_line(line: &str) -> Option<(String, TargetStatus)> {
    let (host, counters) = line.split_once(" : ")?;
    let host = host.trim();
    if host.is_empty() {
        return None;
    }

    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for pair in counters.split_whitespace() {
        let (key, value) = pair.split_once('=')?;
        counts.insert(key, value.parse().ok()?);
    }

    let count = |key: &str| counts.get(key).copied();
    let (ok, failed) = (count("ok")?, count("failed")?);
    let unreachable = count("unreachable").unwrap_or(0);
    let changed = count("changed").unwrap_or(0);
    let skipped = count("skipped").unwrap_or(0);

    let status = if failed > 0 || unreachable > 0 {
        TargetStatus::Failed
    } else if ok == 0 && changed == 0 && skipped > 0 {
        TargetStatus::Skipped
    } else {
        TargetStatus::Succeeded
    };

    Some((host.to_string(), status))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(output: &str) -> BTreeMap<String, TargetStatus> {
        let mut parser = RecapParser::new();
        for line in output.lines() {
            parser.feed(line);
        }
        parser.finish()
    }

    #[test]
    fn test_parse_recap_block() {
        let output = "\
TASK [base : install packages] *****
ok: [master-1]

PLAY RECAP *********************************************************************
master-1                   : ok=12   changed=3    unreachable=0    failed=0    skipped=2    rescued=0    ignored=0
worker-1                   : ok=4    changed=0    unreachable=1    failed=0    skipped=0    rescued=0    ignored=0
worker-2                   : ok=0    changed=0    unreachable=0    failed=0    skipped=5    rescued=0    ignored=0
10.0.0.9                   : ok=3    changed=1    unreachable=0    failed=2    skipped=0    rescued=0    ignored=0

Playbook run took 0 days, 0 hours, 3 minutes, 12 seconds
";
        let targets = parse(output);
        assert_eq!(targets.len(), 4);
        assert_eq!(targets["master-1"], TargetStatus::Succeeded);
        assert_eq!(targets["worker-1"], TargetStatus::Failed);
        assert_eq!(targets["worker-2"], TargetStatus::Skipped);
        assert_eq!(targets["10.0.0.9"], TargetStatus::Failed);
    }

    #[test]
    fn test_no_recap() {
        let targets = parse("ERROR! the playbook: 01-base.yml could not be found\n");
        assert!(targets.is_empty());
    }

    #[test]
    fn test_lines_before_header_are_ignored() {
        let targets = parse("fake : ok=1 failed=0\n");
        assert!(targets.is_empty());
    }

    #[test]
    fn test_malformed_counters_end_block() {
        let output = "PLAY RECAP\nmaster-1 : ok=1 failed=0\nnode : ok=x failed=0\nworker : ok=1 failed=1\n";
        let targets = parse(output);
        assert_eq!(targets.len(), 1);
        assert!(targets.contains_key("master-1"));
    }
}
