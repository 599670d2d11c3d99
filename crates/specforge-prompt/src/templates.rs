//! Template-based prompt builder.

use std::fmt::Write;

use specforge_core::{ArtifactKind, ProjectRequest, Result, SpecForgeError};
use tracing::debug;

use crate::builder::{PromptBuilder, PromptConfig};
use crate::context::GenerationContext;

const REQUIREMENTS_STRUCTURE: &str = r#"Respond with a Markdown document that follows this structure:

# Requirements Document

## 1. Overview
The purpose and background of the project.

## 2. Goals
Concrete, measurable goals the project must reach.

## 3. Functional Requirements
Give every functional requirement a stable identifier of the form REQ-F-001,
REQ-F-002, ... at the start of its line. Each requirement must be clear,
testable and carry a priority (High/Medium/Low), for example:
- REQ-F-001: Users can sign in with email and password (Priority: High)

## 4. Non-Functional Requirements
Use identifiers of the form REQ-NF-001, REQ-NF-002, ... for performance,
security, scalability, availability and similar qualities.

## 5. Constraints
Limits the project has to work within.

## 6. Assumptions
What is taken for granted to move forward.

Rules:
- Every requirement identifier is unique and never reused for something else.
- Use the REQ- prefix only for requirement identifiers."#;

const ARCHITECTURE_STRUCTURE: &str = r#"Respond with a Markdown document that follows this structure:

# Architecture Document

## 1. System Overview
The overall structure and key concepts.

## 2. System Context
How the system interacts with users and external systems.

## 3. Components
Give every component a stable identifier of the form ARCH-001, ARCH-002, ...
Start each component with a heading or bullet that names its identifier, for example:
### ARCH-001: API Gateway
Describe its responsibility, technology and dependencies, and cite the
requirement identifiers (REQ-...) it addresses on the component's line or in the
lines directly below it, before the next component starts.

## 4. Data Flow
The main data flows and how they are processed.

## 5. Technology Stack
Frontend, backend, data storage and infrastructure choices.

## 6. Deployment
Environments, deployment approach and CI/CD.

## 7. Security
Authentication, authorization and data protection.

Rules:
- Justify each architectural decision by referencing the requirement identifiers
  it serves. Only use identifiers that appear in the requirements document.
- Use the ARCH- prefix only for component identifiers."#;

const BACKLOG_SCHEMA: &str = r#"```yaml
sprints:
  - name: "Sprint 1: Foundation"
    goal: "What the sprint delivers"
    durationWeeks: {weeks}
    items:
      - id: BL-001
        title: "Short title"
        type: story
        priority: High
        estimateHours: 16
        requirements: [REQ-F-001]
        components: [ARCH-001]
        dependsOn: []
```"#;

/// Builds prompts from fixed templates.
#[derive(Debug, Clone, Default)]
pub struct TemplatePromptBuilder {
    config: PromptConfig,
}

impl TemplatePromptBuilder {
    /// Create a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with custom configuration.
    pub fn with_config(config: PromptConfig) -> Self {
        Self { config }
    }

    fn requirements(&self, request: &ProjectRequest) -> String {
        let mut prompt = String::new();
        prompt.push_str("Write the requirements document for the following project.\n\n");
        push_project(&mut prompt, request);
        prompt.push('\n');
        prompt.push_str(REQUIREMENTS_STRUCTURE);
        self.push_language(&mut prompt);
        prompt
    }

    fn architecture(&self, request: &ProjectRequest, context: &GenerationContext) -> Result<String> {
        let requirements = context.require(ArtifactKind::Requirements, ArtifactKind::Architecture)?;

        let mut prompt = String::new();
        prompt.push_str("Write the architecture document for the following project.\n\n");
        push_project(&mut prompt, request);
        prompt.push('\n');
        push_document(&mut prompt, "REQUIREMENTS DOCUMENT", requirements);
        prompt.push_str(ARCHITECTURE_STRUCTURE);
        self.push_language(&mut prompt);
        Ok(prompt)
    }

    fn backlog(&self, request: &ProjectRequest, context: &GenerationContext) -> Result<String> {
        let requirements = context.require(ArtifactKind::Requirements, ArtifactKind::Backlog)?;
        let architecture = context.require(ArtifactKind::Architecture, ArtifactKind::Backlog)?;
        let weeks = self.config.sprint_length_weeks;

        let mut prompt = String::new();
        prompt.push_str("Plan the sprint backlog for the following project.\n\n");
        push_project(&mut prompt, request);
        prompt.push('\n');
        push_document(&mut prompt, "REQUIREMENTS DOCUMENT", requirements);
        push_document(&mut prompt, "ARCHITECTURE DOCUMENT", architecture);

        let _ = writeln!(
            prompt,
            "Decompose the work into sprints of {weeks} weeks each. Structure it as epics,"
        );
        prompt.push_str("user stories and tasks, and state dependencies between items.\n\n");
        prompt.push_str(
            "You may open with a short Markdown overview, but the backlog itself must be\n\
             exactly one fenced ```yaml block using this schema and nothing else:\n\n",
        );
        prompt.push_str(&BACKLOG_SCHEMA.replace("{weeks}", &weeks.to_string()));
        prompt.push_str("\n\nRules:\n");
        prompt.push_str("- Every item has a unique id of the form BL-001, BL-002, ...\n");
        prompt.push_str(
            "- Every item lists at least one requirement identifier from the requirements\n  \
             document in `requirements`; never invent new requirement identifiers.\n",
        );
        prompt.push_str("- `components` lists ARCH- identifiers from the architecture document.\n");
        prompt.push_str("- `dependsOn` only names ids of other items in this backlog.\n");
        prompt.push_str("- Do not emit any other fenced yaml block.");
        self.push_language(&mut prompt);
        Ok(prompt)
    }

    fn push_language(&self, prompt: &mut String) {
        if let Some(language) = self.config.language.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            let _ = write!(
                prompt,
                "\n\nWrite the document in {language}. Keep identifiers, section numbers and YAML keys in English."
            );
        }
    }
}

impl PromptBuilder for TemplatePromptBuilder {
    fn build(
        &self,
        kind: ArtifactKind,
        request: &ProjectRequest,
        context: &GenerationContext,
    ) -> Result<String> {
        let prompt = match kind {
            ArtifactKind::Requirements => self.requirements(request),
            ArtifactKind::Architecture => self.architecture(request, context)?,
            ArtifactKind::Backlog => self.backlog(request, context)?,
            ArtifactKind::Trace => {
                return Err(SpecForgeError::Internal(
                    "the trace artifact is derived locally and has no prompt".to_string(),
                ));
            }
        };

        debug!(%kind, chars = prompt.len(), "built prompt");
        Ok(prompt)
    }

    fn config(&self) -> &PromptConfig {
        &self.config
    }
}

fn push_project(prompt: &mut String, request: &ProjectRequest) {
    let _ = writeln!(prompt, "Project name: {}", request.project_name);

    prompt.push_str("\nDescription:\n");
    prompt.push_str(request.description().unwrap_or("(none provided)"));
    prompt.push('\n');

    push_list(prompt, "Key features", &request.features);
    push_list(prompt, "Tech stack", &request.tech_stack);
}

fn push_list(prompt: &mut String, title: &str, items: &[String]) {
    let _ = write!(prompt, "\n{title}:\n");
    if items.is_empty() {
        prompt.push_str("(none specified)\n");
    }
    for item in items {
        let _ = writeln!(prompt, "- {item}");
    }
}

fn push_document(prompt: &mut String, title: &str, content: &str) {
    let _ = write!(
        prompt,
        "--- BEGIN {title} ---\n{content}\n--- END {title} ---\n\n"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use specforge_core::Artifact;

    const REQUIREMENTS: &str = "# Requirements\n- REQ-F-001: Login";
    const ARCHITECTURE: &str = "# Architecture\n### ARCH-001: Auth (REQ-F-001)";

    fn request() -> ProjectRequest {
        ProjectRequest::builder()
            .project_name("Task Tracker")
            .description("Tracks team tasks")
            .features(["Kanban boards", "Due-date reminders"])
            .tech_stack(["Rust", "PostgreSQL"])
            .build()
            .unwrap()
    }

    fn context_with(kinds: &[(ArtifactKind, &str)]) -> GenerationContext {
        let mut ctx = GenerationContext::new(request());
        for (kind, content) in kinds {
            ctx.record(Artifact::new(*kind, *content, None)).unwrap();
        }
        ctx
    }

    #[test]
    fn test_requirements_prompt_embeds_metadata() {
        let builder = TemplatePromptBuilder::new();
        let prompt = builder
            .build(ArtifactKind::Requirements, &request(), &context_with(&[]))
            .unwrap();

        assert!(prompt.contains("Project name: Task Tracker"));
        assert!(prompt.contains("Tracks team tasks"));
        assert!(prompt.contains("- Kanban boards\n- Due-date reminders\n"));
        assert!(prompt.contains("- Rust\n- PostgreSQL\n"));
        assert!(prompt.contains("REQ-F-001"));
        assert!(prompt.contains("REQ-NF-001"));
    }

    #[test]
    fn test_empty_lists_are_valid() {
        let request = ProjectRequest::builder().project_name("Test").build().unwrap();
        let ctx = GenerationContext::new(request.clone());
        let prompt = TemplatePromptBuilder::new()
            .build(ArtifactKind::Requirements, &request, &ctx)
            .unwrap();

        assert!(prompt.contains("Key features:\n(none specified)"));
        assert!(prompt.contains("Tech stack:\n(none specified)"));
        assert!(prompt.contains("(none provided)"));
    }

    #[test]
    fn test_architecture_prompt_contains_requirements() {
        let ctx = context_with(&[(ArtifactKind::Requirements, REQUIREMENTS)]);
        let prompt = TemplatePromptBuilder::new()
            .build(ArtifactKind::Architecture, &request(), &ctx)
            .unwrap();

        assert!(prompt.contains(REQUIREMENTS));
        assert!(prompt.contains("ARCH-001"));
    }

    #[test]
    fn test_backlog_prompt_contains_both_documents() {
        let ctx = context_with(&[
            (ArtifactKind::Requirements, REQUIREMENTS),
            (ArtifactKind::Architecture, ARCHITECTURE),
        ]);
        let prompt = TemplatePromptBuilder::new()
            .build(ArtifactKind::Backlog, &request(), &ctx)
            .unwrap();

        assert!(prompt.contains(REQUIREMENTS));
        assert!(prompt.contains(ARCHITECTURE));
        assert!(prompt.contains("```yaml"));
        assert!(prompt.contains("durationWeeks: 2"));
        assert!(prompt.contains("sprints of 2 weeks"));
    }

    #[test]
    fn test_missing_prerequisites() {
        let builder = TemplatePromptBuilder::new();
        let empty = context_with(&[]);
        assert!(builder.build(ArtifactKind::Architecture, &request(), &empty).is_err());

        let partial = context_with(&[(ArtifactKind::Requirements, REQUIREMENTS)]);
        let err = builder
            .build(ArtifactKind::Backlog, &request(), &partial)
            .unwrap_err();
        assert!(err.to_string().contains("architecture"));
    }

    #[test]
    fn test_trace_has_no_prompt() {
        let ctx = context_with(&[]);
        assert!(TemplatePromptBuilder::new()
            .build(ArtifactKind::Trace, &request(), &ctx)
            .is_err());
    }

    #[test]
    fn test_language_and_sprint_length() {
        let builder = TemplatePromptBuilder::with_config(PromptConfig {
            language: Some("Korean".to_string()),
            sprint_length_weeks: 3,
        });
        let ctx = context_with(&[
            (ArtifactKind::Requirements, REQUIREMENTS),
            (ArtifactKind::Architecture, ARCHITECTURE),
        ]);
        let prompt = builder.build(ArtifactKind::Backlog, &request(), &ctx).unwrap();

        assert!(prompt.contains("Write the document in Korean."));
        assert!(prompt.contains("durationWeeks: 3"));
    }

    proptest! {
        #[test]
        fn prompts_are_deterministic(
            name in "[A-Za-z][A-Za-z0-9 ]{0,20}",
            features in proptest::collection::vec("[a-z ]{1,12}", 0..4),
            requirement in "[A-Za-z ]{1,30}",
            component in "[A-Za-z ]{1,30}",
        ) {
            let request = ProjectRequest::builder()
                .project_name(name)
                .features(features.clone())
                .build()
                .unwrap();
            let requirements = format!("# Requirements\n- REQ-F-001: {requirement}");
            let architecture = format!("# Architecture\n### ARCH-001: {component} (REQ-F-001)");

            let context = || {
                let mut ctx = GenerationContext::new(request.clone());
                ctx.record(Artifact::new(ArtifactKind::Requirements, requirements.clone(), None)).unwrap();
                ctx.record(Artifact::new(ArtifactKind::Architecture, architecture.clone(), None)).unwrap();
                ctx
            };
            let (first_ctx, second_ctx) = (context(), context());

            let builder = TemplatePromptBuilder::new();
            for kind in ArtifactKind::GENERATED {
                let first = builder.build(kind, &request, &first_ctx).unwrap();
                let second = builder.build(kind, &request, &second_ctx).unwrap();
                prop_assert_eq!(&first, &second);
                for feature in &features {
                    prop_assert!(first.contains(feature.as_str()));
                }
                if kind == ArtifactKind::Backlog {
                    prop_assert!(first.contains(requirements.as_str()));
                    prop_assert!(first.contains(architecture.as_str()));
                }
            }
        }
    }
}
