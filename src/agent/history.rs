//! JSONL round log.
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::DroidClawResult;

/// One record per round: the exact prompt, the image shown to the model and
/// the raw response, for post-hoc inspection of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub step: u32,
    pub prompt: String,
    pub image: String,
    pub response: String,
}

pub struct RoundLog {
    path: PathBuf,
}

impl RoundLog {
    pub fn new(task_dir: &Path) -> Self {
        Self {
            path: task_dir.join("log.jsonl"),
        }
    }

    pub fn append(&self, record: &RoundRecord) -> DroidClawResult<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_line_per_round() {
        let dir = tempfile::tempdir().unwrap();
        let log = RoundLog::new(dir.path());
        for step in 1..=3 {
            log.append(&RoundRecord {
                step,
                prompt: "p".into(),
                image: format!("{step}.png"),
                response: "r".into(),
            })
            .unwrap();
        }
        let content = std::fs::read_to_string(dir.path().join("log.jsonl")).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        let rec: RoundRecord = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(rec.step, 3);
        assert_eq!(rec.image, "3.png");
    }
}
