//! Traceability matrix derivation.
//!
//! The matrix is computed from the three generated artifacts without a model
//! call. Its universe is exactly the set of requirement identifiers found in
//! the requirements document.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

use crate::artifact::{Artifact, ArtifactKind, ArtifactPayload, Coverage, TraceEntry, TraceMatrix};
use crate::error::{Result, SpecForgeError};
use crate::ids::{self, IdKind, Identifier};

/// Derives the trace artifact for a project.
#[derive(Debug, Clone)]
pub struct TraceLinker {
    project_name: String,
}

impl TraceLinker {
    /// Create a linker for the named project.
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
        }
    }

    /// Link requirements to architecture components and backlog items.
    pub fn link(&self, requirements: &Artifact, architecture: &Artifact, backlog: &Artifact) -> Result<Artifact> {
        expect_kind(requirements, ArtifactKind::Requirements)?;
        expect_kind(architecture, ArtifactKind::Architecture)?;
        expect_kind(backlog, ArtifactKind::Backlog)?;

        let items = backlog.backlog().ok_or_else(|| {
            SpecForgeError::malformed(ArtifactKind::Backlog, "backlog items were never parsed")
        })?;

        let mut entries: BTreeMap<Identifier, TraceEntry> = declared_requirements(&requirements.content)
            .into_iter()
            .map(|(id, title)| {
                let mut entry = TraceEntry::new(id.clone());
                entry.requirement_title = title;
                (id, entry)
            })
            .collect();
        let mut unknown = BTreeSet::new();

        for (requirement, components) in architecture_relations(&architecture.content) {
            match entries.get_mut(&requirement) {
                Some(entry) => entry.related_architecture_ids.extend(components),
                None => {
                    unknown.insert(requirement);
                }
            }
        }

        for item in items.items() {
            for requirement in &item.requirements {
                match entries.get_mut(requirement) {
                    Some(entry) => {
                        entry.related_backlog_ids.insert(item.id.clone());
                    }
                    None => {
                        unknown.insert(requirement.clone());
                    }
                }
            }
        }

        if !unknown.is_empty() {
            let ids: Vec<&str> = unknown.iter().map(Identifier::as_str).collect();
            warn!(
                project = %self.project_name,
                references = ?ids,
                "downstream artifacts reference undeclared requirements"
            );
        }

        let traces: Vec<TraceEntry> = entries.into_values().collect();
        let coverage = Coverage::from_entries(&traces);
        info!(
            project = %self.project_name,
            requirements = coverage.requirements,
            uncovered = coverage.uncovered.len(),
            "trace matrix linked"
        );

        let matrix = TraceMatrix {
            project_name: self.project_name.clone(),
            traces,
            coverage,
            unknown_references: unknown,
        };
        let content = serde_yaml::to_string(&matrix)?;

        Ok(Artifact::new(
            ArtifactKind::Trace,
            content,
            Some(ArtifactPayload::Trace(matrix)),
        ))
    }
}

fn expect_kind(artifact: &Artifact, kind: ArtifactKind) -> Result<()> {
    if artifact.kind != kind {
        return Err(SpecForgeError::Internal(format!(
            "expected a {kind} artifact, got {}",
            artifact.kind
        )));
    }
    Ok(())
}

/// Requirement identifiers with the title found after their first occurrence.
fn declared_requirements(content: &str) -> BTreeMap<Identifier, Option<String>> {
    let mut declared = BTreeMap::new();

    for line in content.lines() {
        for occurrence in ids::occurrences(IdKind::Requirement, line) {
            let rest = &line[occurrence.end..];
            declared
                .entry(occurrence.id)
                .or_insert_with(|| title_after(rest));
        }
    }

    declared
}

fn title_after(rest: &str) -> Option<String> {
    const LEADING: &[char] = &[' ', '\t', ':', '-', '*', '_', '`', ')', ']', '|', '.'];
    const TRAILING: &[char] = &[' ', '\t', '*', '_', '`', '|'];

    let title = rest.trim_start_matches(LEADING).trim_end_matches(TRAILING);
    (!title.is_empty()).then(|| title.to_string())
}

/// Pairs each requirement reference in the architecture document with the
/// components in scope where it appears.
///
/// A line naming `ARCH-` identifiers opens a component scope that lasts until
/// the next such line or the next heading at the same or a higher level.
/// Scopes opened outside a heading end at the next heading of any level.
fn architecture_relations(content: &str) -> Vec<(Identifier, BTreeSet<Identifier>)> {
    let mut relations = Vec::new();
    let mut scope: BTreeSet<Identifier> = BTreeSet::new();
    let mut anchor_level = usize::MAX;

    for line in content.lines() {
        let components = ids::scan(IdKind::Architecture, line);
        let level = heading_level(line);

        if !components.is_empty() {
            scope = components;
            anchor_level = level.unwrap_or(usize::MAX);
        } else if level.is_some_and(|level| level <= anchor_level) {
            scope.clear();
            anchor_level = usize::MAX;
        }

        for requirement in ids::scan(IdKind::Requirement, line) {
            relations.push((requirement, scope.clone()));
        }
    }

    relations
}

/// ATX heading depth, or `None` for a non-heading line.
fn heading_level(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    let rest = &trimmed[level..];
    (level > 0 && (rest.is_empty() || rest.starts_with([' ', '\t']))).then_some(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ArtifactExtractor;

    fn requirements(text: &str) -> Artifact {
        ArtifactExtractor::new()
            .extract(ArtifactKind::Requirements, text)
            .unwrap()
    }

    fn architecture(text: &str) -> Artifact {
        ArtifactExtractor::new()
            .extract(ArtifactKind::Architecture, text)
            .unwrap()
    }

    fn backlog(yaml: &str) -> Artifact {
        ArtifactExtractor::new()
            .extract(ArtifactKind::Backlog, &format!("```yaml\n{yaml}\n```\n"))
            .unwrap()
    }

    fn ids(set: &BTreeSet<Identifier>) -> Vec<&str> {
        set.iter().map(Identifier::as_str).collect()
    }

    #[test]
    fn test_disjoint_coverage() {
        let req = requirements("# Requirements\n- REQ-001: Login\n- REQ-002: Logout\n");
        let arch = architecture("# Architecture\n## Components\n- ARCH-001: Auth service (REQ-001)\n");
        let bl = backlog(
            "sprints:\n  - name: S1\n    items:\n      - id: BL-001\n        title: Logout button\n        requirements: [REQ-002]",
        );

        let trace = TraceLinker::new("Test").link(&req, &arch, &bl).unwrap();
        let matrix = trace.trace().unwrap();
        assert_eq!(matrix.traces.len(), 2);

        let first = matrix.entry("REQ-001").unwrap();
        assert_eq!(ids(&first.related_architecture_ids), vec!["ARCH-001"]);
        assert!(first.related_backlog_ids.is_empty());

        let second = matrix.entry("REQ-002").unwrap();
        assert!(second.related_architecture_ids.is_empty());
        assert_eq!(ids(&second.related_backlog_ids), vec!["BL-001"]);

        assert_eq!(matrix.coverage.with_architecture, 1);
        assert_eq!(matrix.coverage.with_backlog, 1);
        assert!(matrix.coverage.uncovered.is_empty());
    }

    #[test]
    fn test_universe_is_exactly_declared_requirements() {
        let req = requirements("# R\n- REQ-F-002: B\n- REQ-F-010: C\n- REQ-F-001: A\n- REQ-NF-001: Fast\n");
        let arch = architecture("# A\n- ARCH-001 handles REQ-F-001 and REQ-F-999\n");
        let bl = backlog(
            "sprints:\n  - name: S1\n    items:\n      - id: BL-001\n        title: t\n        requirements: [REQ-F-002, REQ-X-1]",
        );

        let trace = TraceLinker::new("Test").link(&req, &arch, &bl).unwrap();
        let matrix = trace.trace().unwrap();

        let order: Vec<&str> = matrix.traces.iter().map(|e| e.requirement_id.as_str()).collect();
        assert_eq!(order, vec!["REQ-F-001", "REQ-F-002", "REQ-F-010", "REQ-NF-001"]);
        assert_eq!(ids(&matrix.unknown_references), vec!["REQ-F-999", "REQ-X-1"]);
        let uncovered: Vec<&str> = matrix.coverage.uncovered.iter().map(Identifier::as_str).collect();
        assert_eq!(uncovered, vec!["REQ-F-010", "REQ-NF-001"]);
    }

    #[test]
    fn test_architecture_scope_rules() {
        let req = requirements("# R\n- REQ-001\n- REQ-002\n- REQ-003\n- REQ-004\n");
        let arch = architecture(
            "# Architecture\n\
             ### ARCH-001: Gateway\n\
             Routes traffic. Addresses REQ-001.\n\
             \n\
             - Also REQ-002\n\
             ### ARCH-002: Store\n\
             Satisfies REQ-003.\n\
             ## Deployment\n\
             Mentions REQ-004 without a component.\n",
        );
        let bl = backlog(
            "sprints:\n  - name: S1\n    items:\n      - id: BL-001\n        title: t\n        requirements: [REQ-001]",
        );

        let matrix = TraceLinker::new("Test")
            .link(&req, &arch, &bl)
            .unwrap()
            .trace()
            .cloned()
            .unwrap();

        assert_eq!(ids(&matrix.entry("REQ-001").unwrap().related_architecture_ids), vec!["ARCH-001"]);
        assert_eq!(ids(&matrix.entry("REQ-002").unwrap().related_architecture_ids), vec!["ARCH-001"]);
        assert_eq!(ids(&matrix.entry("REQ-003").unwrap().related_architecture_ids), vec!["ARCH-002"]);
        assert!(matrix.entry("REQ-004").unwrap().related_architecture_ids.is_empty());
    }

    #[test]
    fn test_sub_headings_keep_component_scope() {
        let req = requirements("# R\n- REQ-F-001\n- REQ-F-002\n- REQ-F-003\n");
        let arch = architecture(
            "# Architecture\n\
             ## Components\n\
             ### ARCH-001: Auth Service\n\
             #### Addressed requirements\n\
             - REQ-F-001\n\
             #### Interfaces\n\
             - Token endpoint for REQ-F-002\n\
             ### ARCH-002: Store\n\
             #### Addressed requirements\n\
             - REQ-F-003\n\
             ## Risks\n\
             - REQ-F-001 depends on an external IdP\n",
        );
        let bl = backlog(
            "sprints:\n  - name: S1\n    items:\n      - id: BL-001\n        title: t\n        requirements: [REQ-F-001]",
        );

        let matrix = TraceLinker::new("Test")
            .link(&req, &arch, &bl)
            .unwrap()
            .trace()
            .cloned()
            .unwrap();

        assert_eq!(ids(&matrix.entry("REQ-F-001").unwrap().related_architecture_ids), vec!["ARCH-001"]);
        assert_eq!(ids(&matrix.entry("REQ-F-002").unwrap().related_architecture_ids), vec!["ARCH-001"]);
        assert_eq!(ids(&matrix.entry("REQ-F-003").unwrap().related_architecture_ids), vec!["ARCH-002"]);
        assert_eq!(matrix.coverage.with_architecture, 3);
    }

    #[test]
    fn test_heading_level() {
        assert_eq!(heading_level("### ARCH-001"), Some(3));
        assert_eq!(heading_level("  ## Risks"), Some(2));
        assert_eq!(heading_level("#"), Some(1));
        assert_eq!(heading_level("#hashtag"), None);
        assert_eq!(heading_level("- item"), None);
    }

    #[test]
    fn test_backlog_prose_is_not_scanned() {
        let req = requirements("# R\n- REQ-001: A\n- REQ-002: B\n");
        let arch = architecture("# A\n- ARCH-001: X\n");
        let raw = "# Backlog\nBL-002 will also cover REQ-002 later.\n\n```yaml\nsprints:\n  - name: S1\n    items:\n      - id: BL-001\n        title: t\n        requirements: [REQ-001]\n```\n";
        let bl = ArtifactExtractor::new().extract(ArtifactKind::Backlog, raw).unwrap();

        let trace = TraceLinker::new("Test").link(&req, &arch, &bl).unwrap();
        let matrix = trace.trace().unwrap();
        assert!(matrix.entry("REQ-002").unwrap().related_backlog_ids.is_empty());
    }

    #[test]
    fn test_requirement_titles() {
        let req = requirements(
            "# R\n- **REQ-F-001**: User login (High)\n| REQ-F-002 | Password reset |\nREQ-F-003\n",
        );
        let arch = architecture("# A\n- ARCH-001\n");
        let bl = backlog(
            "sprints:\n  - name: S1\n    items:\n      - id: BL-001\n        title: t\n        requirements: [REQ-F-001]",
        );

        let trace = TraceLinker::new("Test").link(&req, &arch, &bl).unwrap();
        let matrix = trace.trace().unwrap();
        assert_eq!(
            matrix.entry("REQ-F-001").unwrap().requirement_title.as_deref(),
            Some("User login (High)")
        );
        assert_eq!(
            matrix.entry("REQ-F-002").unwrap().requirement_title.as_deref(),
            Some("Password reset")
        );
        assert_eq!(matrix.entry("REQ-F-003").unwrap().requirement_title, None);
    }

    #[test]
    fn test_trace_content_is_yaml() {
        let req = requirements("# R\n- REQ-001: A\n");
        let arch = architecture("# A\n- ARCH-001 (REQ-001)\n");
        let bl = backlog(
            "sprints:\n  - name: S1\n    items:\n      - id: BL-001\n        title: t\n        requirements: [REQ-001]",
        );

        let trace = TraceLinker::new("Test").link(&req, &arch, &bl).unwrap();
        assert_eq!(trace.path, "trace.yaml");

        let parsed: TraceMatrix = serde_yaml::from_str(&trace.content).unwrap();
        assert_eq!(Some(&parsed), trace.trace());
        assert!(trace.content.contains("requirementId: REQ-001"));
        assert!(trace.content.contains("architectureComponents:"));
    }

    #[test]
    fn test_missing_backlog_payload() {
        let req = requirements("# R\n- REQ-001: A\n");
        let arch = architecture("# A\n- ARCH-001\n");
        let bl = Artifact::new(ArtifactKind::Backlog, "sprints: []", None);

        let err = TraceLinker::new("Test").link(&req, &arch, &bl).unwrap_err();
        assert_eq!(err.stage(), Some(ArtifactKind::Backlog));
    }

    #[test]
    fn test_wrong_kinds_rejected() {
        let req = requirements("# R\n- REQ-001: A\n");
        let arch = architecture("# A\n- ARCH-001\n");
        let bl = backlog(
            "sprints:\n  - name: S1\n    items:\n      - id: BL-001\n        title: t\n        requirements: [REQ-001]",
        );

        let err = TraceLinker::new("Test").link(&arch, &req, &bl).unwrap_err();
        assert!(matches!(err, SpecForgeError::Internal(_)));
    }
}
