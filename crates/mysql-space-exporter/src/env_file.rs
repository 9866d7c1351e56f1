//! Dotenv-style environment file loading.

use std::path::{Path, PathBuf};

/// File picked up from the working directory when `--dotenv` is not given.
pub(crate) const DEFAULT_ENV_FILE: &str = ".env";

/// Loads environment variables from `explicit`, or from `default` if it exists.
///
/// Variables already set in the process environment are left alone, so real
/// environment variables take precedence over the file. Returns the path that
/// was loaded, or `None` when no file was requested and the default is absent.
pub(crate) fn load_env_file(
    explicit: Option<&Path>,
    default: &Path,
) -> Result<Option<PathBuf>, dotenvy::Error> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None if default.is_file() => default.to_path_buf(),
        None => return Ok(None),
    };
    dotenvy::from_path(&path)?;
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_explicit_file_and_strips_quotes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "MSE_TEST_EXPLICIT_HOST=\"db.internal\"").unwrap();
        writeln!(file, "MSE_TEST_EXPLICIT_LIMIT='50'").unwrap();

        let loaded = load_env_file(Some(file.path()), Path::new("/nonexistent/.env")).unwrap();
        assert_eq!(loaded.as_deref(), Some(file.path()));
        assert_eq!(std::env::var("MSE_TEST_EXPLICIT_HOST").unwrap(), "db.internal");
        assert_eq!(std::env::var("MSE_TEST_EXPLICIT_LIMIT").unwrap(), "50");
    }

    #[test]
    fn falls_back_to_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let default = dir.path().join(".env");
        std::fs::write(&default, "MSE_TEST_DEFAULT_USER=exporter\n").unwrap();

        let loaded = load_env_file(None, &default).unwrap();
        assert_eq!(loaded, Some(default));
        assert_eq!(std::env::var("MSE_TEST_DEFAULT_USER").unwrap(), "exporter");
    }

    #[test]
    fn missing_default_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_env_file(None, &dir.path().join(".env")).unwrap();
        assert_eq!(loaded, None);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.env");
        assert!(load_env_file(Some(&missing), Path::new(DEFAULT_ENV_FILE)).is_err());
    }

    #[test]
    fn existing_environment_wins_over_file() {
        // PATH is always set for the test process.
        let before = std::env::var("PATH").unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "PATH=/from/file").unwrap();

        load_env_file(Some(file.path()), Path::new(DEFAULT_ENV_FILE)).unwrap();
        assert_eq!(std::env::var("PATH").unwrap(), before);
    }
}
