//! Artifact storage collaborator.
//!
//! Submitted artifacts live on disk keyed by job identifier and category:
//! `<root>/<job_id>/files/` and `<root>/<job_id>/base_files/`. Only
//! non-empty regular files count; empty files are silently ignored. A
//! missing category directory just means nothing was submitted for it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::job::{JobId, SubmissionKind};

/// The artifact paths for one job, one named field per category.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet {
    /// The artifacts being compared. Required — a job with none of these
    /// fails before any network interaction.
    pub files: Vec<PathBuf>,
    /// Shared template code excluded from matching. Optional.
    pub base_files: Vec<PathBuf>,
}

impl ArtifactSet {
    pub fn collect(root: &Path, job_id: JobId) -> io::Result<Self> {
        let base = root.join(job_id.to_string());
        Ok(Self {
            files: collect_dir(&base.join(SubmissionKind::Files.dir_name()))?,
            base_files: collect_dir(&base.join(SubmissionKind::BaseFiles.dir_name()))?,
        })
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Mean size of the required-category artifacts, for diagnostics.
    /// Files that disappeared since collection count as zero.
    pub fn average_file_size(&self) -> u64 {
        if self.files.is_empty() {
            return 0;
        }
        let total: u64 = self
            .files
            .iter()
            .filter_map(|p| fs::metadata(p).ok())
            .map(|m| m.len())
            .sum();
        total / self.files.len() as u64
    }
}

fn collect_dir(dir: &Path) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if meta.is_file() && meta.len() > 0 {
            out.push(entry.path());
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn job_dir(tmp: &TempDir, job_id: JobId, category: &str) -> PathBuf {
        let dir = tmp.path().join(job_id.to_string()).join(category);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn collects_only_non_empty_files() {
        let tmp = TempDir::new().unwrap();
        let job_id = JobId::new();
        let dir = job_dir(&tmp, job_id, "files");
        fs::write(dir.join("alice.py"), "print('hi')").unwrap();
        fs::write(dir.join("empty.py"), "").unwrap();

        let set = ArtifactSet::collect(tmp.path(), job_id).unwrap();
        assert_eq!(set.file_count(), 1);
        assert!(set.files[0].ends_with("alice.py"));
        assert!(set.base_files.is_empty());
    }

    #[test]
    fn missing_category_directory_is_empty_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let set = ArtifactSet::collect(tmp.path(), JobId::new()).unwrap();
        assert!(set.files.is_empty());
        assert!(set.base_files.is_empty());
    }

    #[test]
    fn base_files_are_collected_separately() {
        let tmp = TempDir::new().unwrap();
        let job_id = JobId::new();
        fs::write(
            job_dir(&tmp, job_id, "files").join("a.py"),
            "x = 1",
        )
        .unwrap();
        fs::write(
            job_dir(&tmp, job_id, "base_files").join("skeleton.py"),
            "def main(): ...",
        )
        .unwrap();

        let set = ArtifactSet::collect(tmp.path(), job_id).unwrap();
        assert_eq!(set.files.len(), 1);
        assert_eq!(set.base_files.len(), 1);
    }

    #[test]
    fn collection_order_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        let job_id = JobId::new();
        let dir = job_dir(&tmp, job_id, "files");
        fs::write(dir.join("b.py"), "b").unwrap();
        fs::write(dir.join("a.py"), "a").unwrap();
        fs::write(dir.join("c.py"), "c").unwrap();

        let set = ArtifactSet::collect(tmp.path(), job_id).unwrap();
        let names: Vec<_> = set
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.py", "b.py", "c.py"]);
    }

    #[test]
    fn average_file_size() {
        let tmp = TempDir::new().unwrap();
        let job_id = JobId::new();
        let dir = job_dir(&tmp, job_id, "files");
        fs::write(dir.join("a.py"), "1234").unwrap();
        fs::write(dir.join("b.py"), "12345678").unwrap();

        let set = ArtifactSet::collect(tmp.path(), job_id).unwrap();
        assert_eq!(set.average_file_size(), 6);
    }
}
