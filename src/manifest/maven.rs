//! `pom.xml` inspection

use super::{normalize_java_version, ManifestError, DEFAULT_JAVA_VERSION};
use crate::plan::BuildOverrides;
use roxmltree::{Document, Node};

const DEFAULT_MAVEN_VERSION: &str = "3.9.9";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MavenManifest {
    pub java_version: String,
    pub maven_version: String,
    pub target_name: String,
}

impl MavenManifest {
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let doc = Document::parse(content).map_err(|e| ManifestError::InvalidManifest {
            manifest: "pom.xml",
            message: e.to_string(),
        })?;
        let project = doc.root_element();
        if !project.has_tag_name("project") {
            return Err(ManifestError::InvalidManifest {
                manifest: "pom.xml",
                message: format!(
                    "expected <project> root element, found <{}>",
                    project.tag_name().name()
                ),
            });
        }

        let properties = child(project, "properties");
        let property = |name: &str| properties.and_then(|p| child_text(p, name));

        let java_version = property("java.version")
            .or_else(|| property("maven.compiler.target"))
            .or_else(|| property("maven.compiler.source"))
            .map(|v| normalize_java_version(&v))
            .unwrap_or_else(|| DEFAULT_JAVA_VERSION.to_string());

        let maven_version =
            property("maven.version").unwrap_or_else(|| DEFAULT_MAVEN_VERSION.to_string());

        let final_name = child(project, "build").and_then(|build| child_text(build, "finalName"));
        let base_name = match final_name {
            Some(name) => name,
            None => {
                let artifact_id = child_text(project, "artifactId").unwrap_or_default();
                match child_text(project, "version") {
                    Some(version) => format!("{}-{}", artifact_id, version),
                    None => artifact_id,
                }
            }
        };
        let packaging = child_text(project, "packaging").unwrap_or_else(|| "jar".to_string());

        Ok(Self {
            java_version,
            maven_version,
            target_name: format!("{}.{}", base_name, packaging),
        })
    }

    pub fn to_overrides(&self) -> BuildOverrides {
        BuildOverrides::new()
            .with("JAVA_VERSION", &self.java_version)
            .with("MAVEN_VERSION", &self.maven_version)
            .with("TARGET_NAME", &self.target_name)
    }
}

/// Direct child element; nested `<parent><version>` must not count as the
/// project's own version.
fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.is_element() && c.has_tag_name(name))
}

fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    child(node, name)
        .and_then(|c| c.text())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
