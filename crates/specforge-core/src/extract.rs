//! Turning raw model output into artifacts.
//!
//! Requirements and architecture documents are markdown; they are cleaned up
//! and checked for identifiers. The backlog must carry exactly one fenced
//! `yaml` block, which is parsed and validated eagerly. Nothing is repaired:
//! any deviation is a [`SpecForgeError::MalformedArtifact`].

use std::collections::BTreeSet;

use serde::Deserialize;
use tracing::debug;

use crate::artifact::{Artifact, ArtifactKind, ArtifactPayload, Backlog, BacklogItem, Sprint};
use crate::error::{Result, SpecForgeError};
use crate::ids::{self, IdKind, Identifier};

/// Parses model output for one artifact kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactExtractor;

impl ArtifactExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract an artifact of `kind` from raw model output.
    pub fn extract(&self, kind: ArtifactKind, raw: &str) -> Result<Artifact> {
        match kind {
            ArtifactKind::Requirements => self.extract_document(kind, IdKind::Requirement, raw),
            ArtifactKind::Architecture => self.extract_document(kind, IdKind::Architecture, raw),
            ArtifactKind::Backlog => self.extract_backlog(raw),
            ArtifactKind::Trace => Err(SpecForgeError::Internal(
                "trace artifacts are derived, not extracted".to_string(),
            )),
        }
    }

    fn extract_document(&self, kind: ArtifactKind, id_kind: IdKind, raw: &str) -> Result<Artifact> {
        let content = normalize_markdown(raw);
        if content.is_empty() {
            return Err(SpecForgeError::malformed(kind, "document is empty"));
        }

        let declared = ids::scan(id_kind, &content);
        if declared.is_empty() {
            return Err(SpecForgeError::malformed(
                kind,
                format!("no {}- identifiers found", id_kind.prefix()),
            ));
        }
        debug!(%kind, identifiers = declared.len(), "extracted document");

        Ok(Artifact::new(kind, content, None))
    }

    fn extract_backlog(&self, raw: &str) -> Result<Artifact> {
        let kind = ArtifactKind::Backlog;
        let blocks = fenced_blocks(raw).map_err(|message| SpecForgeError::malformed(kind, message))?;

        let mut yaml_blocks = blocks
            .into_iter()
            .filter(|b| matches!(b.info.as_str(), "yaml" | "yml"));
        let block = match (yaml_blocks.next(), yaml_blocks.next()) {
            (Some(block), None) => block,
            (None, _) => {
                return Err(SpecForgeError::malformed(kind, "no fenced ```yaml block found"));
            }
            (Some(_), Some(_)) => {
                return Err(SpecForgeError::malformed(
                    kind,
                    "expected exactly one fenced ```yaml block, found several",
                ));
            }
        };

        if block.body.trim().is_empty() {
            return Err(SpecForgeError::malformed(kind, "the ```yaml block is empty"));
        }

        let backlog = parse_backlog(&block.body)?;
        debug!(
            sprints = backlog.sprints.len(),
            items = backlog.len(),
            "extracted backlog"
        );

        Ok(Artifact::new(
            kind,
            block.body,
            Some(ArtifactPayload::Backlog(backlog)),
        ))
    }
}

/// Trim, unwrap an explicit markdown fence around the document and drop
/// chatter before the first heading.
fn normalize_markdown(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(inner) = unwrap_markdown_fence(text) {
        text = inner.trim();
    }

    if let Some(offset) = first_heading_offset(text) {
        text = &text[offset..];
    }

    text.trim_end().to_string()
}

/// Body of the first complete ```` ```markdown ```` block, provided it opens
/// before any heading or other fence. Fences nested inside it are skipped.
fn unwrap_markdown_fence(text: &str) -> Option<&str> {
    let mut lines = text.split_inclusive('\n');
    let mut offset = 0;

    for line in lines.by_ref() {
        offset += line.len();
        let trimmed = line.trim();
        if let Some(info) = trimmed.strip_prefix("```") {
            let info = info.trim().to_ascii_lowercase();
            if info != "markdown" && info != "md" {
                return None;
            }
            break;
        }
        if is_heading(trimmed) {
            return None;
        }
    }

    let start = offset;
    let mut nested = false;
    for line in lines {
        let trimmed = line.trim();
        if let Some(info) = trimmed.strip_prefix("```") {
            if !info.trim().is_empty() {
                nested = true;
            } else if nested {
                nested = false;
            } else {
                return Some(&text[start..offset]);
            }
        }
        offset += line.len();
    }

    None
}

fn first_heading_offset(text: &str) -> Option<usize> {
    let mut offset = 0;
    let mut in_fence = false;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
        } else if !in_fence && is_heading(trimmed) {
            return Some(offset);
        }
        offset += line.len();
    }

    None
}

fn is_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    (1..=6).contains(&hashes) && line[hashes..].starts_with([' ', '\t'])
}

struct FencedBlock {
    info: String,
    body: String,
}

fn fenced_blocks(text: &str) -> std::result::Result<Vec<FencedBlock>, String> {
    let mut blocks = Vec::new();
    let mut open: Option<FencedBlock> = None;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        if open.is_some() && trimmed == "```" {
            blocks.extend(open.take());
            continue;
        }

        match open.as_mut() {
            Some(block) => block.body.push_str(line),
            None => {
                if let Some(info) = trimmed.strip_prefix("```") {
                    open = Some(FencedBlock {
                        info: info.trim().to_ascii_lowercase(),
                        body: String::new(),
                    });
                }
            }
        }
    }

    if let Some(block) = open {
        return Err(format!("unterminated fenced block (```{})", block.info));
    }

    Ok(blocks)
}

#[derive(Debug, Deserialize)]
struct RawBacklog {
    #[serde(default)]
    sprints: Vec<RawSprint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSprint {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    goal: Option<String>,
    #[serde(default)]
    duration_weeks: Option<u32>,
    #[serde(default)]
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "type", default)]
    item_type: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    estimate_hours: Option<f64>,
    #[serde(default)]
    requirements: Vec<String>,
    #[serde(default)]
    components: Vec<String>,
    #[serde(default)]
    depends_on: Vec<String>,
}

fn parse_backlog(yaml: &str) -> Result<Backlog> {
    let malformed = |message: String| SpecForgeError::malformed(ArtifactKind::Backlog, message);

    let raw: RawBacklog = serde_yaml::from_str(yaml)
        .map_err(|e| malformed(format!("backlog YAML does not parse: {e}")))?;

    if raw.sprints.is_empty() {
        return Err(malformed("backlog declares no sprints".to_string()));
    }

    let mut seen = BTreeSet::new();
    let mut sprints = Vec::with_capacity(raw.sprints.len());

    for (index, raw_sprint) in raw.sprints.into_iter().enumerate() {
        let name = raw_sprint
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| malformed(format!("sprint {} has no name", index + 1)))?;

        let mut items = Vec::with_capacity(raw_sprint.items.len());
        for raw_item in raw_sprint.items {
            let item = parse_item(raw_item, &name).map_err(malformed)?;
            if !seen.insert(item.id.clone()) {
                return Err(malformed(format!("duplicate backlog item {}", item.id)));
            }
            items.push(item);
        }

        sprints.push(Sprint {
            name,
            goal: raw_sprint.goal,
            duration_weeks: raw_sprint.duration_weeks,
            items,
        });
    }

    let backlog = Backlog { sprints };
    if backlog.is_empty() {
        return Err(malformed("backlog contains no items".to_string()));
    }

    for item in backlog.items() {
        for dependency in &item.depends_on {
            if dependency == &item.id {
                return Err(malformed(format!("{} depends on itself", item.id)));
            }
            if !seen.contains(dependency) {
                return Err(malformed(format!(
                    "{} depends on unknown item {}",
                    item.id, dependency
                )));
            }
        }
    }

    Ok(backlog)
}

fn parse_item(raw: RawItem, sprint: &str) -> std::result::Result<BacklogItem, String> {
    let raw_id = raw
        .id
        .ok_or_else(|| format!("an item in sprint '{sprint}' has no id"))?;
    let id = Identifier::parse(IdKind::Backlog, &raw_id)
        .ok_or_else(|| format!("item '{raw_id}' in sprint '{sprint}' is not a BL- identifier"))?;

    let title = raw
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| format!("{id} has no title"))?;

    if raw.requirements.is_empty() {
        return Err(format!("{id} references no requirements"));
    }

    Ok(BacklogItem {
        requirements: parse_refs(&id, "requirement", IdKind::Requirement, raw.requirements)?,
        components: parse_refs(&id, "component", IdKind::Architecture, raw.components)?,
        depends_on: parse_refs(&id, "dependency", IdKind::Backlog, raw.depends_on)?,
        id,
        title,
        item_type: raw.item_type,
        priority: raw.priority,
        estimate_hours: raw.estimate_hours,
    })
}

fn parse_refs(
    owner: &Identifier,
    what: &str,
    kind: IdKind,
    raw: Vec<String>,
) -> std::result::Result<Vec<Identifier>, String> {
    raw.into_iter()
        .map(|token| {
            Identifier::parse(kind, &token).ok_or_else(|| {
                format!(
                    "{owner} has {what} reference '{token}' that is not a {}- identifier",
                    kind.prefix()
                )
            })
        })
        .collect()
}
