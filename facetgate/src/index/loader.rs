use crate::index::IndexSpec;
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Loads `*.yaml` index specs from a directory.
pub struct IndexSpecLoader {
    dir: PathBuf,
}

impl IndexSpecLoader {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load every spec in the directory, sorted by file name.
    pub fn load_all(&self) -> Result<Vec<IndexSpec>> {
        if !self.dir.exists() {
            return Err(Error::Config(format!(
                "Index spec directory does not exist: {}",
                self.dir.display()
            )));
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            ) {
                paths.push(path);
            }
        }
        paths.sort();

        paths.iter().map(|p| self.load_spec(p)).collect()
    }

    pub fn load_spec(&self, path: &Path) -> Result<IndexSpec> {
        let content = fs::read_to_string(path)?;
        let spec: IndexSpec = serde_yaml::from_str(&content)?;

        for issue in spec.lint() {
            tracing::warn!(index = %spec.name, file = %path.display(), "{}", issue);
        }

        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_specs_from_directory() -> Result<()> {
        let temp = TempDir::new()?;

        fs::write(
            temp.path().join("b.yaml"),
            "name: letters\nfields:\n  - name: sender\n",
        )?;
        fs::write(
            temp.path().join("a.yml"),
            "name: resolutions\nfields:\n  - name: text\n    type: text\n",
        )?;
        fs::write(temp.path().join("notes.txt"), "ignored")?;

        let specs = IndexSpecLoader::new(temp.path()).load_all()?;

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "resolutions");
        assert_eq!(specs[1].name, "letters");
        Ok(())
    }

    #[test]
    fn test_missing_directory_is_config_error() {
        let result = IndexSpecLoader::new("/definitely/not/here").load_all();
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
