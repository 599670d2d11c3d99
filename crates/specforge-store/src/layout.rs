//! Where a project's artifacts live.

use std::path::{Path, PathBuf};

use specforge_core::{ArtifactKind, ProjectRequest, Result};

/// Maps a request to `<output root>/<project dir>/<file name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    project_dir: PathBuf,
}

impl ArtifactLayout {
    pub fn new(output_root: &Path, request: &ProjectRequest) -> Result<Self> {
        Ok(Self {
            project_dir: output_root.join(request.project_dir()?),
        })
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn path(&self, kind: ArtifactKind) -> PathBuf {
        self.project_dir.join(kind.file_name())
    }

    /// Paths of all four artifacts, in generation order.
    pub fn paths(&self) -> impl Iterator<Item = (ArtifactKind, PathBuf)> + '_ {
        ArtifactKind::ALL.into_iter().map(|kind| (kind, self.path(kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_layout() {
        let request = ProjectRequest::builder()
            .project_name("Task Tracker!")
            .build()
            .unwrap();
        let layout = ArtifactLayout::new(Path::new("specs"), &request).unwrap();

        assert_eq!(
            layout.path(ArtifactKind::Backlog),
            PathBuf::from("specs/task-tracker/30-backlog.yaml")
        );
        let names: Vec<_> = layout
            .paths()
            .map(|(_, p)| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            ["10-requirements.md", "20-architecture.md", "30-backlog.yaml", "trace.yaml"]
        );
    }

    #[test]
    fn test_output_dir_override() {
        let request = ProjectRequest::builder()
            .project_name("Task Tracker")
            .output_dir("clients/acme")
            .build()
            .unwrap();
        let layout = ArtifactLayout::new(Path::new("/srv/specs"), &request).unwrap();
        assert_eq!(layout.project_dir(), Path::new("/srv/specs/clients/acme"));
    }
}
