use crate::config::SnapshotConfig;
use std::fmt;
use std::path::PathBuf;

/// Stable key for one snapshot test. The same identity always maps to the
/// same artifact paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotIdentity {
    prefix: String,
}

impl SnapshotIdentity {
    pub fn new(package: &str, class: &str, method: &str) -> Self {
        Self {
            prefix: format!("{package}_{class}_{method}"),
        }
    }

    pub fn from_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// `app::ui::welcome` + `renders_title` becomes
    /// `app.ui_welcome_renders_title`: the last module segment stands in for
    /// the test class, the rest for the package.
    pub fn from_module_path(module_path: &str, method: &str) -> Self {
        match module_path.rsplit_once("::") {
            Some((package, class)) => Self::new(&package.replace("::", "."), class, method),
            None => Self::from_prefix(format!("{module_path}_{method}")),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl fmt::Display for SnapshotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix)
    }
}

/// Identity for the calling test function's module.
#[macro_export]
macro_rules! snapshot_identity {
    ($method:expr) => {
        $crate::SnapshotIdentity::from_module_path(module_path!(), $method)
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotArtifacts {
    /// Committed baseline, only written in record mode.
    pub reference: PathBuf,
    /// Failed capture, only present after a `Different` verdict.
    pub actual: PathBuf,
    /// Highlight overlay, only present after a `Different` verdict.
    pub diff: PathBuf,
}

impl ScreenshotArtifacts {
    pub fn new(config: &SnapshotConfig, identity: &SnapshotIdentity) -> Self {
        let prefix = identity.prefix();
        Self {
            reference: config.reference_dir.join(format!("{prefix}.png")),
            actual: config.output_dir.join(format!("{prefix}.png")),
            diff: config.diff_dir.join(format!("{prefix}_diff.png")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn layout_follows_prefix() {
        let identity = SnapshotIdentity::new("com.example", "WelcomeScreen", "shows_logo");
        let files = ScreenshotArtifacts::new(&SnapshotConfig::default(), &identity);
        assert_eq!(
            files.reference,
            Path::new("tests/screenshots/com.example_WelcomeScreen_shows_logo.png")
        );
        assert_eq!(
            files.actual,
            Path::new("target/screenshots/output/com.example_WelcomeScreen_shows_logo.png")
        );
        assert_eq!(
            files.diff,
            Path::new("target/screenshots/diff/com.example_WelcomeScreen_shows_logo_diff.png")
        );
    }

    #[test]
    fn module_path_splits_off_the_last_segment() {
        let identity = SnapshotIdentity::from_module_path("app::ui::welcome", "renders_title");
        assert_eq!(identity.prefix(), "app.ui_welcome_renders_title");
        let flat = SnapshotIdentity::from_module_path("app", "renders_title");
        assert_eq!(flat.prefix(), "app_renders_title");
    }

    #[test]
    fn macro_uses_the_calling_module() {
        let identity = snapshot_identity!("case");
        assert_eq!(identity.prefix(), "plutonium_snapshot.identity_tests_case");
    }
}
