//! `build.gradle` / `build.gradle.kts` inspection

use super::{normalize_java_version, DEFAULT_JAVA_VERSION};
use crate::plan::BuildOverrides;
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradleManifest {
    pub java_version: String,
    pub target_name: Option<String>,
}

impl GradleManifest {
    /// `settings` is the settings script, where `rootProject.name` usually lives.
    pub fn parse(build: &str, settings: Option<&str>) -> Self {
        let java_version = gradle_value(build, "sourceCompatibility")
            .or_else(|| gradle_value(build, "targetCompatibility"))
            .or_else(|| toolchain_version(build))
            .map(|v| normalize_java_version(&v))
            .unwrap_or_else(|| DEFAULT_JAVA_VERSION.to_string());

        let target_name = settings
            .and_then(root_project_name)
            .or_else(|| root_project_name(build))
            .map(|name| format!("{}.jar", name));

        Self {
            java_version,
            target_name,
        }
    }

    pub fn to_overrides(&self) -> BuildOverrides {
        let mut overrides = BuildOverrides::new().with("JAVA_VERSION", &self.java_version);
        if let Some(target) = &self.target_name {
            overrides.insert("TARGET_NAME", target);
        }
        overrides
    }
}

fn gradle_value(content: &str, key: &str) -> Option<String> {
    let pattern = format!(r#"{}\s*=?\s*['"]?([\w.]+)['"]?"#, regex::escape(key));
    let re = Regex::new(&pattern).expect("valid regex");
    re.captures(content).map(|caps| caps[1].to_string())
}

fn toolchain_version(content: &str) -> Option<String> {
    let re = Regex::new(
        r"languageVersion(?:\s*=\s*|\.set\(\s*)JavaLanguageVersion\.of\(\s*(\d+)\s*\)",
    )
    .expect("valid regex");
    re.captures(content).map(|caps| caps[1].to_string())
}

fn root_project_name(content: &str) -> Option<String> {
    let re = Regex::new(r#"rootProject\.name\s*=\s*['"]([^'"]+)['"]"#).expect("valid regex");
    re.captures(content).map(|caps| caps[1].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_compatibility() {
        let manifest = GradleManifest::parse("java {\n  sourceCompatibility = '17'\n}\n", None);
        assert_eq!(manifest.java_version, "17");
        assert_eq!(manifest.target_name, None);
    }

    #[test]
    fn test_java_version_enum_constant() {
        let manifest =
            GradleManifest::parse("sourceCompatibility = JavaVersion.VERSION_1_8\n", None);
        assert_eq!(manifest.java_version, "8");

        let manifest =
            GradleManifest::parse("targetCompatibility = JavaVersion.VERSION_21\n", None);
        assert_eq!(manifest.java_version, "21");
    }

    #[test]
    fn test_toolchain_groovy_and_kotlin() {
        let groovy = "java {\n  toolchain {\n    languageVersion = JavaLanguageVersion.of(21)\n  }\n}\n";
        assert_eq!(GradleManifest::parse(groovy, None).java_version, "21");

        let kotlin = "java {\n  toolchain {\n    languageVersion.set(JavaLanguageVersion.of(17))\n  }\n}\n";
        assert_eq!(GradleManifest::parse(kotlin, None).java_version, "17");
    }

    #[test]
    fn test_defaults_to_java_8() {
        assert_eq!(GradleManifest::parse("plugins { id 'java' }", None).java_version, "8");
    }

    #[test]
    fn test_root_project_name_prefers_settings() {
        let manifest = GradleManifest::parse(
            "rootProject.name = 'ignored'\n",
            Some("rootProject.name = \"order-service\"\n"),
        );
        assert_eq!(manifest.target_name.as_deref(), Some("order-service.jar"));

        let overrides = manifest.to_overrides();
        assert_eq!(overrides.get("TARGET_NAME"), Some("order-service.jar"));
        assert_eq!(overrides.get("JAVA_VERSION"), Some("8"));
    }
}
