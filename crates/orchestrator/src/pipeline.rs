//! Static pipelines: which orchestrator calls a task method runs, in order.

use press_core::{PostAction, TaskMethod};
use std::fmt;

/// What a pipeline commit is for; rendered with a timestamp at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitKind {
    Deploy,
    Publish,
    Posts(PostAction),
}

impl CommitKind {
    pub fn message(&self, timestamp: &str) -> String {
        let prefix = match self {
            CommitKind::Deploy => "Deploy site",
            CommitKind::Publish => "Publish site",
            CommitKind::Posts(action) => action.commit_prefix(),
        };
        format!("{} {}", prefix, timestamp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CreateRepository,
    FetchRepository,
    PrepareWorkspace,
    SymlinkWorkspace,
    ApplyPosts(PostAction),
    Commit { kind: CommitKind, allow_empty: bool },
    Push { force: bool },
    BuildStaticFiles,
    WriteMarkerFiles,
    PublishToPages,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::CreateRepository => "create_repository",
            Step::FetchRepository => "fetch_repository",
            Step::PrepareWorkspace => "prepare_workspace",
            Step::SymlinkWorkspace => "symlink_workspace",
            Step::ApplyPosts(_) => "apply_posts",
            Step::Commit { .. } => "commit",
            Step::Push { .. } => "push",
            Step::BuildStaticFiles => "build_static_files",
            Step::WriteMarkerFiles => "write_marker_files",
            Step::PublishToPages => "publish_to_pages",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::ApplyPosts(action) => write!(f, "{}:{}", self.name(), action),
            _ => f.write_str(self.name()),
        }
    }
}

/// Ordered steps for `method`.
pub fn plan(method: TaskMethod) -> Vec<Step> {
    match method {
        TaskMethod::Deploy => vec![
            Step::CreateRepository,
            Step::PrepareWorkspace,
            Step::Commit {
                kind: CommitKind::Deploy,
                allow_empty: true,
            },
            Step::Push { force: false },
        ],
        TaskMethod::Publish => vec![
            Step::FetchRepository,
            Step::Commit {
                kind: CommitKind::Publish,
                allow_empty: true,
            },
            Step::Push { force: false },
            Step::SymlinkWorkspace,
            Step::BuildStaticFiles,
            Step::WriteMarkerFiles,
            Step::PublishToPages,
        ],
        TaskMethod::CreatePosts
        | TaskMethod::UpdatePosts
        | TaskMethod::DeletePosts
        | TaskMethod::PublishPosts
        | TaskMethod::ConcealPosts => {
            let Some(action) = method.post_action() else {
                return Vec::new();
            };
            vec![
                Step::FetchRepository,
                Step::SymlinkWorkspace,
                Step::ApplyPosts(action),
                Step::Commit {
                    kind: CommitKind::Posts(action),
                    allow_empty: false,
                },
                Step::Push { force: false },
            ]
        }
    }
}
