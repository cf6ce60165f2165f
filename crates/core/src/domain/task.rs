use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::HashSet;
use std::fmt;

use super::post::{OneOrMany, Post};
use super::repo::GitInfo;
use super::site::{SiteMeta, ThemeRef, UserInfo};
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskMethod {
    Deploy,
    Publish,
    CreatePosts,
    UpdatePosts,
    DeletePosts,
    PublishPosts,
    ConcealPosts,
}

impl TaskMethod {
    pub const ALL: [TaskMethod; 7] = [
        Self::Deploy,
        Self::Publish,
        Self::CreatePosts,
        Self::UpdatePosts,
        Self::DeletePosts,
        Self::PublishPosts,
        Self::ConcealPosts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deploy => "deploy",
            Self::Publish => "publish",
            Self::CreatePosts => "create_posts",
            Self::UpdatePosts => "update_posts",
            Self::DeletePosts => "delete_posts",
            Self::PublishPosts => "publish_posts",
            Self::ConcealPosts => "conceal_posts",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.as_str() == s)
    }

    pub fn is_site_task(&self) -> bool {
        matches!(self, Self::Deploy | Self::Publish)
    }

    /// The per-post generator action, for post methods.
    pub fn post_action(&self) -> Option<PostAction> {
        match self {
            Self::CreatePosts => Some(PostAction::Create),
            Self::UpdatePosts => Some(PostAction::Update),
            Self::DeletePosts => Some(PostAction::Delete),
            Self::PublishPosts => Some(PostAction::Publish),
            Self::ConcealPosts => Some(PostAction::Conceal),
            Self::Deploy | Self::Publish => None,
        }
    }
}

impl fmt::Display for TaskMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generator operation applied to each post of a batch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PostAction {
    Create,
    Update,
    Delete,
    Publish,
    Conceal,
}

impl PostAction {
    /// Prefix of the commit message recorded after the batch.
    pub fn commit_prefix(&self) -> &'static str {
        match self {
            Self::Create => "Create post",
            Self::Update => "Update post",
            Self::Delete => "Delete post",
            Self::Publish => "Publish post",
            Self::Conceal => "Conceal post",
        }
    }
}

impl fmt::Display for PostAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Publish => "publish",
            Self::Conceal => "conceal",
        };
        f.write_str(name)
    }
}

/// Fields shared by site-level tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteTask {
    #[serde(default)]
    pub user: UserInfo,
    #[serde(default)]
    pub site: SiteMeta,
    #[serde(default)]
    pub theme: ThemeRef,
    #[serde(alias = "git")]
    pub storage: GitInfo,
    #[serde(default)]
    pub gateway: Option<Value>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishTask {
    #[serde(flatten)]
    pub site: SiteTask,
    pub publisher: GitInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostTask {
    #[serde(alias = "git")]
    pub storage: GitInfo,
    #[serde(alias = "post")]
    pub posts: OneOrMany<Post>,
}

/// Task payload, discriminated by `method`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum TaskKind {
    Deploy(SiteTask),
    Publish(PublishTask),
    CreatePosts(PostTask),
    UpdatePosts(PostTask),
    DeletePosts(PostTask),
    PublishPosts(PostTask),
    ConcealPosts(PostTask),
}

/// A unit of work handed to the worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskDescriptor {
    pub id: String,
    #[serde(flatten)]
    pub kind: TaskKind,
}

impl TaskDescriptor {
    pub fn new(id: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        serde_json::from_str(raw).map_err(|e| CoreError::InvalidDescriptor(e.to_string()))
    }

    pub fn method(&self) -> TaskMethod {
        match &self.kind {
            TaskKind::Deploy(_) => TaskMethod::Deploy,
            TaskKind::Publish(_) => TaskMethod::Publish,
            TaskKind::CreatePosts(_) => TaskMethod::CreatePosts,
            TaskKind::UpdatePosts(_) => TaskMethod::UpdatePosts,
            TaskKind::DeletePosts(_) => TaskMethod::DeletePosts,
            TaskKind::PublishPosts(_) => TaskMethod::PublishPosts,
            TaskKind::ConcealPosts(_) => TaskMethod::ConcealPosts,
        }
    }

    /// The content repository the task operates on.
    pub fn storage(&self) -> &GitInfo {
        match &self.kind {
            TaskKind::Deploy(site) => &site.storage,
            TaskKind::Publish(publish) => &publish.site.storage,
            TaskKind::CreatePosts(task)
            | TaskKind::UpdatePosts(task)
            | TaskKind::DeletePosts(task)
            | TaskKind::PublishPosts(task)
            | TaskKind::ConcealPosts(task) => &task.storage,
        }
    }

    pub fn site(&self) -> Option<&SiteTask> {
        match &self.kind {
            TaskKind::Deploy(site) => Some(site),
            TaskKind::Publish(publish) => Some(&publish.site),
            _ => None,
        }
    }

    /// Pages repository receiving the generated site; publish tasks only.
    pub fn publisher(&self) -> Option<&GitInfo> {
        match &self.kind {
            TaskKind::Publish(publish) => Some(&publish.publisher),
            _ => None,
        }
    }

    pub fn posts(&self) -> &[Post] {
        match &self.kind {
            TaskKind::CreatePosts(task)
            | TaskKind::UpdatePosts(task)
            | TaskKind::DeletePosts(task)
            | TaskKind::PublishPosts(task)
            | TaskKind::ConcealPosts(task) => task.posts.as_slice(),
            TaskKind::Deploy(_) | TaskKind::Publish(_) => &[],
        }
    }

    /// Checks the fields every pipeline relies on before anything is mutated.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.id.trim().is_empty() {
            return Err(CoreError::MissingField("id"));
        }
        self.storage().validate()?;

        match &self.kind {
            TaskKind::Deploy(site) => {
                if site.theme.name.trim().is_empty() {
                    return Err(CoreError::MissingField("theme.name"));
                }
            }
            TaskKind::Publish(publish) => {
                if publish.site.theme.name.trim().is_empty() {
                    return Err(CoreError::MissingField("theme.name"));
                }
                publish.publisher.validate()?;
            }
            TaskKind::CreatePosts(task)
            | TaskKind::UpdatePosts(task)
            | TaskKind::DeletePosts(task)
            | TaskKind::PublishPosts(task)
            | TaskKind::ConcealPosts(task) => {
                if task.posts.is_empty() {
                    return Err(CoreError::MissingField("post"));
                }
                if task.posts.as_slice().iter().any(|p| p.title.trim().is_empty()) {
                    return Err(CoreError::MissingField("post.title"));
                }
                let mut titles = HashSet::new();
                let duplicate = task
                    .posts
                    .as_slice()
                    .iter()
                    .find(|p| !titles.insert(p.title.trim()));
                if let Some(dup) = duplicate {
                    return Err(CoreError::Validation(format!(
                        "duplicate post title '{}'",
                        dup.title
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repo::GitServiceType;

    const DEPLOY: &str = r#"{
        "id": "t-1",
        "method": "deploy",
        "user": {"id": "u1", "name": "alice"},
        "site": {"title": "My Blog", "author": "alice", "domain": "blog.example.com"},
        "theme": {"name": "landscape"},
        "storage": {"type": "github", "owner": "alice", "repo": "blog", "branch": "main", "token": "x"}
    }"#;

    #[test]
    fn test_method_round_trip_names() {
        for method in TaskMethod::ALL {
            assert_eq!(TaskMethod::parse(method.as_str()), Some(method));
        }
        assert_eq!(TaskMethod::parse("rebuild"), None);
    }

    #[test]
    fn test_deploy_descriptor() {
        let task = TaskDescriptor::from_json(DEPLOY).unwrap();

        assert_eq!(task.method(), TaskMethod::Deploy);
        assert_eq!(task.storage().service, GitServiceType::GitHub);
        assert_eq!(task.site().unwrap().site.title, "My Blog");
        assert!(task.posts().is_empty());
        task.validate().unwrap();
    }

    #[test]
    fn test_publish_descriptor_requires_publisher() {
        let raw = DEPLOY.replace("\"deploy\"", "\"publish\"");
        assert!(TaskDescriptor::from_json(&raw).is_err());

        let raw = raw.replace(
            "\"theme\"",
            "\"publisher\": {\"type\":\"github\",\"owner\":\"alice\",\"repo\":\"alice.github.io\",\"branch\":\"gh-pages\"}, \"theme\"",
        );
        let task = TaskDescriptor::from_json(&raw).unwrap();
        assert_eq!(task.method(), TaskMethod::Publish);
        match &task.kind {
            TaskKind::Publish(publish) => assert_eq!(publish.publisher.branch, "gh-pages"),
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_post_descriptor_singleton() {
        let raw = r#"{
            "id": "t-2",
            "method": "create_posts",
            "storage": {"type": "gitee", "owner": "bob", "repo": "notes"},
            "post": {"title": "A", "source": "hello"}
        }"#;
        let task = TaskDescriptor::from_json(raw).unwrap();

        assert_eq!(task.method(), TaskMethod::CreatePosts);
        assert_eq!(task.posts().len(), 1);
        assert_eq!(task.method().post_action(), Some(PostAction::Create));
        task.validate().unwrap();
    }

    #[test]
    fn test_unknown_method_rejected() {
        let raw = DEPLOY.replace("\"deploy\"", "\"destroy\"");
        assert!(matches!(
            TaskDescriptor::from_json(&raw),
            Err(CoreError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_validate_empty_posts() {
        let raw = r#"{
            "id": "t-3",
            "method": "delete_posts",
            "storage": {"type": "github", "owner": "bob", "repo": "notes"},
            "posts": []
        }"#;
        let task = TaskDescriptor::from_json(raw).unwrap();
        assert!(matches!(task.validate(), Err(CoreError::MissingField("post"))));
    }

    #[test]
    fn test_post_task_ignores_theme() {
        let raw = r#"{
            "id": "t-5",
            "method": "update_posts",
            "storage": {"type": "github", "owner": "bob", "repo": "notes"},
            "theme": {"name": "next"},
            "post": {"title": "A"}
        }"#;
        let task = TaskDescriptor::from_json(raw).unwrap();
        assert_eq!(task.posts().len(), 1);
        assert!(task.site().is_none());
    }

    #[test]
    fn test_validate_duplicate_titles() {
        let raw = r#"{
            "id": "t-4",
            "method": "create_posts",
            "storage": {"type": "github", "owner": "bob", "repo": "notes"},
            "posts": [{"title": "Same"}, {"title": "Other"}, {"title": " Same "}]
        }"#;
        let task = TaskDescriptor::from_json(raw).unwrap();
        assert!(matches!(task.validate(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_commit_prefixes() {
        assert_eq!(PostAction::Create.commit_prefix(), "Create post");
        assert_eq!(PostAction::Update.commit_prefix(), "Update post");
        assert_eq!(PostAction::Delete.commit_prefix(), "Delete post");
    }
}
