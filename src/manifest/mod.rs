//! Argument values derived from project manifests in a build context
//!
//! Derived values only fill gaps: explicit overrides always win.

pub mod gradle;
pub mod maven;

use crate::fs::FileSystem;
use crate::plan::BuildOverrides;
use crate::templates::BuildType;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub use gradle::GradleManifest;
pub use maven::MavenManifest;

pub(crate) const DEFAULT_JAVA_VERSION: &str = "8";

const GRADLE_BUILD_FILES: &[&str] = &["build.gradle", "build.gradle.kts"];
const GRADLE_SETTINGS_FILES: &[&str] = &["settings.gradle", "settings.gradle.kts"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("Build context {0:?} is not a directory")]
    ContextNotFound(PathBuf),

    #[error("Failed to read {path:?}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Invalid {manifest}: {message}")]
    InvalidManifest {
        manifest: &'static str,
        message: String,
    },
}

/// Manifest files that identify each build type, most specific first
const MARKERS: &[(&str, BuildType)] = &[
    ("pom.xml", BuildType::Java),
    ("build.gradle", BuildType::JavaGradle),
    ("build.gradle.kts", BuildType::JavaGradle),
    ("go.mod", BuildType::Go),
    ("composer.json", BuildType::Php),
    ("requirements.txt", BuildType::Python),
    ("pyproject.toml", BuildType::Python),
    ("package.json", BuildType::NodeService),
];

/// Guess the build type of the project in `dir` from its manifest files.
pub fn detect_build_type(fs: &dyn FileSystem, dir: &Path) -> Option<BuildType> {
    let detected = MARKERS
        .iter()
        .find(|(marker, _)| fs.is_file(&dir.join(marker)))
        .map(|(_, build_type)| *build_type);
    debug!(dir = ?dir, build_type = ?detected, "Detected build type");
    detected
}

/// Derive argument values for `build_type` from the manifests in `dir`.
///
/// Build types without a supported manifest, or a context missing the
/// manifest, yield no overrides.
pub fn derive_overrides(
    fs: &dyn FileSystem,
    dir: &Path,
    build_type: BuildType,
) -> Result<BuildOverrides, ManifestError> {
    if !fs.is_dir(dir) {
        return Err(ManifestError::ContextNotFound(dir.to_path_buf()));
    }

    let overrides = match build_type {
        BuildType::Java => match read(fs, &dir.join("pom.xml"))? {
            Some(content) => MavenManifest::parse(&content)?.to_overrides(),
            None => BuildOverrides::new(),
        },
        BuildType::JavaGradle => {
            let build = read_first(fs, dir, GRADLE_BUILD_FILES)?;
            let settings = read_first(fs, dir, GRADLE_SETTINGS_FILES)?;
            match build {
                Some(build) => GradleManifest::parse(&build, settings.as_deref()).to_overrides(),
                None => BuildOverrides::new(),
            }
        }
        BuildType::Go
        | BuildType::NodePage
        | BuildType::NodeService
        | BuildType::Php
        | BuildType::Python => BuildOverrides::new(),
    };

    debug!(
        build_type = %build_type,
        derived = overrides.len(),
        "Derived arguments from manifest"
    );
    Ok(overrides)
}

fn read(fs: &dyn FileSystem, path: &Path) -> Result<Option<String>, ManifestError> {
    fs.read_optional(path).map_err(|e| ManifestError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn read_first(
    fs: &dyn FileSystem,
    dir: &Path,
    names: &[&str],
) -> Result<Option<String>, ManifestError> {
    for name in names {
        if let Some(content) = read(fs, &dir.join(name))? {
            return Ok(Some(content));
        }
    }
    Ok(None)
}

/// `1.8` and `JavaVersion.VERSION_1_8` become `8`; `VERSION_17` becomes `17`.
pub(crate) fn normalize_java_version(raw: &str) -> String {
    let raw = raw.trim();
    let raw = raw.strip_prefix("JavaVersion.").unwrap_or(raw);
    let raw = raw.strip_prefix("VERSION_").unwrap_or(raw);
    let dotted = raw.replace('_', ".");
    match dotted.strip_prefix("1.") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => dotted,
    }
}
