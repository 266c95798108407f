use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

use crate::models::Job;

/// Job name → job, in name order.
pub type Jobs = BTreeMap<String, Job>;

/// Job name → model answer.
pub type Responses = BTreeMap<String, String>;

pub fn load_jobs(path: &Path) -> Result<Jobs> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job file {}", path.display()))?;
    let jobs: Jobs = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse job file {}", path.display()))?;
    tracing::info!("Loaded {} jobs from {}", jobs.len(), path.display());
    Ok(jobs)
}

/// Pretty-print the responses, replacing any previous file.
pub fn write_responses(path: &Path, responses: &Responses) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let data = serde_json::to_string_pretty(responses)?;
    std::fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Wrote {} responses to {}", responses.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_jobs_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        std::fs::write(
            &path,
            r#"{
                "lab9": {"url": "https://github.com/alexsun2/cs3500lab9", "folder": "src"},
                "app": {"url": "https://github.com/org/app", "branch": "dev"}
            }"#,
        )
        .unwrap();

        let jobs = load_jobs(&path).unwrap();
        let names: Vec<&str> = jobs.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["app", "lab9"]);
        assert_eq!(jobs["lab9"].branch, "main");
        assert_eq!(jobs["lab9"].folder, "src");
        assert_eq!(jobs["app"].branch, "dev");
        assert_eq!(jobs["app"].folder, "");
    }

    #[test]
    fn test_load_jobs_rejects_missing_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        std::fs::write(&path, r#"{"x": {"branch": "main"}}"#).unwrap();
        assert!(load_jobs(&path).is_err());
    }

    #[test]
    fn test_write_responses_pretty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("responses.json");
        let responses = Responses::from([("app".to_string(), "Builder".to_string())]);

        write_responses(&path, &responses).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\n  \"app\": \"Builder\"\n}");
    }
}
