//! Project request types and builder.
//!
//! A [`ProjectRequest`] carries the metadata every prompt is built from. It is
//! immutable once validated.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpecForgeError};

/// Metadata describing the project to generate documents for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRequest {
    /// Human readable project name (required, non-empty).
    pub project_name: String,

    /// Free-form description of the project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Key features, in the order the caller listed them.
    #[serde(default)]
    pub features: Vec<String>,

    /// Technologies the project is expected to use.
    #[serde(default)]
    pub tech_stack: Vec<String>,

    /// Relative directory under the output root to write into. Defaults to a
    /// slug of the project name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
}

impl ProjectRequest {
    /// Create a new [`ProjectRequestBuilder`].
    pub fn builder() -> ProjectRequestBuilder {
        ProjectRequestBuilder::new()
    }

    /// Validate the request.
    pub fn validate(&self) -> Result<()> {
        if self.project_name.trim().is_empty() {
            return Err(SpecForgeError::invalid_request(
                "projectName is required for generate_spec action",
            ));
        }

        if let Some(dir) = &self.output_dir {
            validate_relative_dir(dir)?;
        }

        Ok(())
    }

    /// The description, if one was given and it is not blank.
    pub fn description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    /// Directory (relative to the output root) this project's files go to.
    pub fn project_dir(&self) -> Result<PathBuf> {
        match &self.output_dir {
            Some(dir) => {
                validate_relative_dir(dir)?;
                Ok(PathBuf::from(dir))
            }
            None => Ok(PathBuf::from(slugify(&self.project_name))),
        }
    }
}

/// Lower-cased, dash-separated form of a project name suitable for a path.
pub fn slugify(name: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;

    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "project".to_string()
    } else {
        slug
    }
}

fn validate_relative_dir(dir: &str) -> Result<()> {
    let path = Path::new(dir);
    let mut named = false;

    for component in path.components() {
        match component {
            Component::Normal(_) => named = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(SpecForgeError::invalid_request(format!(
                    "outputDir must be a relative path without '..': {dir}"
                )));
            }
        }
    }

    if !named {
        return Err(SpecForgeError::invalid_request(
            "outputDir must name a directory",
        ));
    }

    Ok(())
}

/// Builder for creating [`ProjectRequest`]s with a fluent API.
#[derive(Debug, Default)]
pub struct ProjectRequestBuilder {
    project_name: Option<String>,
    description: Option<String>,
    features: Vec<String>,
    tech_stack: Vec<String>,
    output_dir: Option<String>,
}

impl ProjectRequestBuilder {
    /// Create a new ProjectRequestBuilder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the project name.
    pub fn project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a feature.
    pub fn feature(mut self, feature: impl Into<String>) -> Self {
        self.features.push(feature.into());
        self
    }

    /// Add several features.
    pub fn features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features.extend(features.into_iter().map(Into::into));
        self
    }

    /// Add a technology to the stack.
    pub fn tech(mut self, tech: impl Into<String>) -> Self {
        self.tech_stack.push(tech.into());
        self
    }

    /// Add several technologies.
    pub fn tech_stack<I, S>(mut self, stack: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tech_stack.extend(stack.into_iter().map(Into::into));
        self
    }

    /// Override the output directory.
    pub fn output_dir(mut self, dir: impl Into<String>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Build and validate the request.
    pub fn build(self) -> Result<ProjectRequest> {
        let project_name = self.project_name.ok_or_else(|| {
            SpecForgeError::invalid_request("projectName is required for generate_spec action")
        })?;

        let request = ProjectRequest {
            project_name,
            description: self.description,
            features: self.features,
            tech_stack: self.tech_stack,
            output_dir: self.output_dir,
        };
        request.validate()?;

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let request = ProjectRequest::builder()
            .project_name("Task Tracker")
            .description("Tracks tasks")
            .feature("Login")
            .features(["Boards", "Comments"])
            .tech("Rust")
            .build()
            .unwrap();

        assert_eq!(request.project_name, "Task Tracker");
        assert_eq!(request.features, vec!["Login", "Boards", "Comments"]);
        assert_eq!(request.tech_stack, vec!["Rust"]);
    }

    #[test]
    fn test_builder_missing_name() {
        let err = ProjectRequest::builder().build().unwrap_err();
        assert!(err.is_user_error());
    }

    #[test]
    fn test_blank_name_rejected() {
        let err = ProjectRequest::builder()
            .project_name("   ")
            .build()
            .unwrap_err();
        assert!(matches!(err, SpecForgeError::InvalidRequest { .. }));
    }

    #[test]
    fn test_deserialize_payload_defaults() {
        let request: ProjectRequest =
            serde_json::from_str(r#"{"projectName": "Test"}"#).unwrap();
        assert!(request.features.is_empty());
        assert!(request.tech_stack.is_empty());
        assert!(request.description().is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Cool  Project!"), "my-cool-project");
        assert_eq!(slugify("  --  "), "project");
        assert_eq!(slugify("쇼핑몰 App"), "쇼핑몰-app");
    }

    #[test]
    fn test_project_dir() {
        let request = ProjectRequest::builder()
            .project_name("Test")
            .build()
            .unwrap();
        assert_eq!(request.project_dir().unwrap(), PathBuf::from("test"));

        let request = ProjectRequest::builder()
            .project_name("Test")
            .output_dir("./custom/specs")
            .build()
            .unwrap();
        assert_eq!(request.project_dir().unwrap(), PathBuf::from("./custom/specs"));
    }

    #[test]
    fn test_output_dir_escape_rejected() {
        for dir in ["../outside", "/etc", "a/../../b", "."] {
            let result = ProjectRequest::builder()
                .project_name("Test")
                .output_dir(dir)
                .build();
            assert!(result.is_err(), "{dir} should be rejected");
        }
    }
}
