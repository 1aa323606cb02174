use anyhow::bail;
use std::env;
use std::path::PathBuf;

use render_tunnel_runner::prelude::RenderTunnelResult;

/// Environment variable to override the path to the Chrome binary used for captures.
pub const RT_CHROME_PATH_ENV: &str = "RT_CHROME_PATH";

/// Binary names to look for in the user's `PATH`, in order of preference.
const CHROME_BINARY_NAMES: [&str; 4] = ["google-chrome", "chromium", "chromium-browser", "chrome"];

/// Get the path to the Chrome binary.
///
/// If the [`RT_CHROME_PATH_ENV`] environment variable is set, its value is used as the path to the
/// binary. Otherwise the user's `PATH` is searched for a Chrome or Chromium binary. Returns
/// `Ok(None)` if nothing is found, in which case the browser library falls back to its own
/// detection.
pub fn chrome_path() -> RenderTunnelResult<Option<PathBuf>> {
    match env::var(RT_CHROME_PATH_ENV).ok().as_deref() {
        Some("") => {
            bail!("'{RT_CHROME_PATH_ENV}' set to empty string");
        }
        Some(path) => {
            let chrome_path = PathBuf::from(path);
            if !chrome_path.exists() {
                bail!(
                    "Path to Chrome binary overwritten with '{RT_CHROME_PATH_ENV}={path}' but that path doesn't exist",
                    path = chrome_path.display()
                );
            }
            Ok(Some(chrome_path))
        }
        None => {
            let found = CHROME_BINARY_NAMES
                .iter()
                .find_map(|name| which::which(name).ok());
            match &found {
                Some(path) => log::debug!("Found Chrome binary at {}", path.display()),
                None => log::warn!(
                    "No Chrome binary found in PATH, set '{RT_CHROME_PATH_ENV}' if launching fails"
                ),
            }
            Ok(found)
        }
    }
}

#[cfg(test)]
mod tests {
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt as _;

    use serial_test::serial;
    use tempfile::{NamedTempFile, TempDir};

    use super::*;

    #[test]
    #[serial]
    fn empty_override_is_an_error() {
        env::set_var(RT_CHROME_PATH_ENV, "");
        assert!(chrome_path().is_err());
    }

    #[test]
    #[serial]
    fn missing_override_is_an_error() {
        env::set_var(RT_CHROME_PATH_ENV, "/non/existent/path/to/chrome");
        assert!(chrome_path().is_err());
    }

    #[test]
    #[serial]
    fn override_from_env() {
        let temp = NamedTempFile::new().unwrap();
        let test_path = temp.path().to_str().unwrap();
        env::set_var(RT_CHROME_PATH_ENV, test_path);

        let result = chrome_path().unwrap();
        assert_eq!(Some(PathBuf::from(test_path)), result);
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn found_in_path() {
        let temp = TempDir::new().unwrap();
        let chromium = temp.path().join("chromium");
        std::fs::write(&chromium, "hello").unwrap();
        let mut perms = std::fs::metadata(&chromium).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&chromium, perms).unwrap();

        let original_path = env::var_os("PATH");
        env::set_var("PATH", temp.path());
        env::remove_var(RT_CHROME_PATH_ENV);

        let result = chrome_path();
        if let Some(original_path) = original_path {
            env::set_var("PATH", original_path);
        }

        assert_eq!(Some(chromium), result.unwrap());
    }

    #[test]
    #[serial]
    fn nothing_in_path() {
        let temp = TempDir::new().unwrap();
        let original_path = env::var_os("PATH");
        env::set_var("PATH", temp.path());
        env::remove_var(RT_CHROME_PATH_ENV);

        let result = chrome_path();
        if let Some(original_path) = original_path {
            env::set_var("PATH", original_path);
        }

        assert_eq!(None, result.unwrap());
    }
}
