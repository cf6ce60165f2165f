//! Pipeline behaviour of the task dispatcher against recording fakes.

use async_trait::async_trait;
use backend::{BackendClient, ErrorRecord, HealthStatus};
use events::{Event, EventBus};
use orchestrator::{
    GitOps, OrchestratorError, ServiceFactory, SiteOps, TaskContext, TaskDispatcher, TaskServices,
};
use press_core::{
    EntryMode, GitInfo, GitServiceType, OneOrMany, Post, PostAction, PostTask, PublishTask,
    SiteMeta, SiteTask, TaskDescriptor, TaskKind, ThemeRef, UserInfo, WorkerConfig,
};
use site::{
    Generator, GeneratorPost, HexoGenerator, Layout, PostOutcome, SiteError, SitePaths,
    SiteService,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

type CallLog = Arc<Mutex<Vec<String>>>;

fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[derive(Default)]
struct FakeGit {
    log: CallLog,
    fail_fetch: bool,
    fail_push: bool,
}

#[async_trait]
impl GitOps for FakeGit {
    async fn create_repository(&self) -> vcs::Result<()> {
        self.log.lock().unwrap().push("git.create_repository".into());
        Ok(())
    }

    async fn fetch_repository(&self) -> vcs::Result<()> {
        self.log.lock().unwrap().push("git.fetch_repository".into());
        if self.fail_fetch {
            return Err(vcs::VcsError::CommandFailed("fetch failed".into()));
        }
        Ok(())
    }

    async fn commit_all_changes(&self, message: &str, allow_empty: bool) -> vcs::Result<bool> {
        self.log
            .lock()
            .unwrap()
            .push(format!("git.commit:{}:{}", message, allow_empty));
        Ok(true)
    }

    async fn push_to_remote(&self, force: bool) -> vcs::Result<()> {
        self.log.lock().unwrap().push(format!("git.push:{}", force));
        if self.fail_push {
            return Err(vcs::VcsError::CommandFailed("push rejected".into()));
        }
        Ok(())
    }

    async fn publish_to_pages(&self, output_dir: &Path, publisher: &GitInfo) -> vcs::Result<()> {
        self.log.lock().unwrap().push(format!(
            "git.publish_to_pages:{}:{}",
            output_dir.display(),
            publisher.repo
        ));
        Ok(())
    }
}

#[derive(Default)]
struct FakeSite {
    log: CallLog,
    failing_titles: Vec<String>,
}

#[async_trait]
impl SiteOps for FakeSite {
    async fn prepare_workspace(&self, task: &SiteTask) -> site::Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("site.prepare_workspace:{}", task.theme.name));
        Ok(())
    }

    async fn symlink_workspace_and_files(&self) -> site::Result<()> {
        self.log.lock().unwrap().push("site.symlink".into());
        Ok(())
    }

    async fn apply_posts(&self, action: PostAction, posts: &[Post]) -> Vec<PostOutcome> {
        posts
            .iter()
            .map(|post| {
                self.log
                    .lock()
                    .unwrap()
                    .push(format!("site.{}:{}", action, post.title));
                if self.failing_titles.contains(&post.title) {
                    PostOutcome::failed(&post.title, format!("{} exploded", post.title))
                } else {
                    PostOutcome::succeeded(&post.title, PathBuf::from(&post.title))
                }
            })
            .collect()
    }

    async fn build_static_files(&self) -> site::Result<()> {
        self.log.lock().unwrap().push("site.build".into());
        Ok(())
    }

    async fn write_marker_files(&self, domain: Option<&str>) -> site::Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("site.markers:{}", domain.unwrap_or("-")));
        Ok(())
    }

    fn public_dir(&self) -> PathBuf {
        PathBuf::from("/generator/public")
    }
}

#[derive(Default)]
struct RecordingBackend {
    started: Mutex<Vec<String>>,
    finished: Mutex<Vec<String>>,
    errors: Mutex<Vec<ErrorRecord>>,
}

impl RecordingBackend {
    fn errors(&self) -> Vec<ErrorRecord> {
        self.errors.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendClient for RecordingBackend {
    async fn get_task(&self) -> backend::Result<Option<TaskDescriptor>> {
        Ok(None)
    }

    async fn report_started(&self, task_id: &str) -> backend::Result<()> {
        self.started.lock().unwrap().push(task_id.to_string());
        Ok(())
    }

    async fn report_health_status(&self, _status: &HealthStatus) -> backend::Result<()> {
        Ok(())
    }

    async fn report_finished(&self, task_id: &str) -> backend::Result<()> {
        self.finished.lock().unwrap().push(task_id.to_string());
        Ok(())
    }

    async fn report_errored(&self, record: &ErrorRecord) -> backend::Result<()> {
        self.errors.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct FakeFactory {
    git: Arc<dyn GitOps>,
    site: Arc<dyn SiteOps>,
    builds: AtomicUsize,
}

impl FakeFactory {
    fn new(git: Arc<dyn GitOps>, site: Arc<dyn SiteOps>) -> Self {
        Self {
            git,
            site,
            builds: AtomicUsize::new(0),
        }
    }
}

impl ServiceFactory for FakeFactory {
    fn build(&self, _ctx: &TaskContext) -> TaskServices {
        self.builds.fetch_add(1, Ordering::SeqCst);
        TaskServices {
            git: self.git.clone(),
            site: self.site.clone(),
        }
    }
}

struct Harness {
    log: CallLog,
    factory: Arc<FakeFactory>,
    backend: Arc<RecordingBackend>,
    dispatcher: TaskDispatcher,
}

fn harness_with(mode: EntryMode, git: FakeGit, site: FakeSite) -> Harness {
    let log = git.log.clone();
    let factory = Arc::new(FakeFactory::new(Arc::new(git), Arc::new(site)));
    let backend = Arc::new(RecordingBackend::default());
    let config = WorkerConfig::new("/tmp/workspaces", "/tmp/generator").with_entry_mode(mode);
    let dispatcher = TaskDispatcher::new(config, factory.clone(), backend.clone());
    Harness {
        log,
        factory,
        backend,
        dispatcher,
    }
}

fn harness(mode: EntryMode) -> Harness {
    let log = CallLog::default();
    harness_with(
        mode,
        FakeGit {
            log: log.clone(),
            ..Default::default()
        },
        FakeSite {
            log,
            ..Default::default()
        },
    )
}

fn storage() -> GitInfo {
    GitInfo::new(GitServiceType::GitHub, "alice", "blog", "master").with_token("tok")
}

fn site_task() -> SiteTask {
    SiteTask {
        user: UserInfo::default(),
        site: SiteMeta {
            title: "Blog".into(),
            domain: Some("blog.example.com".into()),
            ..Default::default()
        },
        theme: ThemeRef {
            name: "next".into(),
            version: None,
        },
        storage: storage(),
        gateway: None,
        metadata: None,
    }
}

fn deploy_task() -> TaskDescriptor {
    TaskDescriptor::new("deploy-1", TaskKind::Deploy(site_task()))
}

fn publish_task() -> TaskDescriptor {
    TaskDescriptor::new(
        "publish-1",
        TaskKind::Publish(PublishTask {
            site: site_task(),
            publisher: GitInfo::new(GitServiceType::GitHub, "alice", "alice.github.io", "gh-pages"),
        }),
    )
}

fn post_task(id: &str, kind: fn(PostTask) -> TaskKind, posts: Vec<Post>) -> TaskDescriptor {
    TaskDescriptor::new(
        id,
        kind(PostTask {
            storage: storage(),
            posts: OneOrMany(posts),
        }),
    )
}

fn without_timestamp(call: &str) -> String {
    match call.strip_prefix("git.commit:") {
        Some(rest) => {
            let (message, allow_empty) = rest.rsplit_once(':').unwrap_or((rest, ""));
            let prefix: Vec<&str> = message.split_whitespace().take(2).collect();
            format!("git.commit:{}:{}", prefix.join(" "), allow_empty)
        }
        None => call.to_string(),
    }
}

fn normalized(log: &CallLog) -> Vec<String> {
    calls(log).iter().map(|c| without_timestamp(c)).collect()
}

#[tokio::test]
async fn disallowed_method_touches_nothing() {
    let h = harness(EntryMode::Post);

    let err = h.dispatcher.run(&deploy_task()).await.unwrap_err();

    assert!(matches!(err, OrchestratorError::MethodNotAllowed { .. }));
    assert!(calls(&h.log).is_empty());
    assert_eq!(h.factory.builds.load(Ordering::SeqCst), 0);
    assert!(h.backend.started.lock().unwrap().is_empty());

    let errors = h.backend.errors();
    assert_eq!(errors.len(), 1);
    assert!(!errors[0].retryable);
    assert_eq!(errors[0].code, 405);
}

#[tokio::test]
async fn invalid_descriptor_touches_nothing() {
    let h = harness(EntryMode::All);
    let task = post_task("bad", TaskKind::CreatePosts, vec![]);

    let err = h.dispatcher.run(&task).await.unwrap_err();

    assert!(matches!(err, OrchestratorError::InvalidTask(_)));
    assert!(calls(&h.log).is_empty());
    assert_eq!(h.backend.errors()[0].service, "task");
}

#[tokio::test]
async fn deploy_pipeline_order() {
    let h = harness(EntryMode::Site);

    let report = h.dispatcher.run(&deploy_task()).await.unwrap();

    assert_eq!(
        normalized(&h.log),
        vec![
            "git.create_repository",
            "site.prepare_workspace:next",
            "git.commit:Deploy site:true",
            "git.push:false",
        ]
    );
    assert_eq!(report.steps.len(), 4);
    assert_eq!(*h.backend.started.lock().unwrap(), vec!["deploy-1"]);
    assert_eq!(*h.backend.finished.lock().unwrap(), vec!["deploy-1"]);
    assert!(h.backend.errors().is_empty());
}

#[tokio::test]
async fn publish_pipeline_order() {
    let h = harness(EntryMode::Site);

    h.dispatcher.run(&publish_task()).await.unwrap();

    assert_eq!(
        normalized(&h.log),
        vec![
            "git.fetch_repository",
            "git.commit:Publish site:true",
            "git.push:false",
            "site.symlink",
            "site.build",
            "site.markers:blog.example.com",
            "git.publish_to_pages:/generator/public:alice.github.io",
        ]
    );
}

#[tokio::test]
async fn post_batch_failures_reported_individually() {
    let log = CallLog::default();
    let h = harness_with(
        EntryMode::Post,
        FakeGit {
            log: log.clone(),
            ..Default::default()
        },
        FakeSite {
            log,
            failing_titles: vec!["B".into(), "D".into()],
        },
    );
    let posts = ["A", "B", "C", "D"].into_iter().map(Post::new).collect();
    let task = post_task("posts-1", TaskKind::CreatePosts, posts);

    let report = h.dispatcher.run(&task).await.unwrap();

    let log = normalized(&h.log);
    assert_eq!(log.iter().filter(|c| c.starts_with("site.create:")).count(), 4);
    assert!(log.contains(&"git.commit:Create post:false".to_string()));
    assert_eq!(log.last().map(String::as_str), Some("git.push:false"));

    let errors = h.backend.errors();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| !e.retryable && e.service == "site"));
    let titles: Vec<_> = errors.iter().filter_map(|e| e.post_title.clone()).collect();
    assert_eq!(titles, vec!["B", "D"]);

    assert_eq!(report.failed_posts, vec!["B", "D"]);
    assert!(report.is_partial());
    assert_eq!(*h.backend.finished.lock().unwrap(), vec!["posts-1"]);
}

#[tokio::test]
async fn post_methods_use_their_commit_prefix() {
    let cases: [(fn(PostTask) -> TaskKind, &str, &str); 4] = [
        (TaskKind::UpdatePosts, "site.update:P", "git.commit:Update post:false"),
        (TaskKind::DeletePosts, "site.delete:P", "git.commit:Delete post:false"),
        (TaskKind::PublishPosts, "site.publish:P", "git.commit:Publish post:false"),
        (TaskKind::ConcealPosts, "site.conceal:P", "git.commit:Conceal post:false"),
    ];

    for (kind, site_call, commit_call) in cases {
        let h = harness(EntryMode::Post);
        h.dispatcher
            .run(&post_task("p", kind, vec![Post::new("P")]))
            .await
            .unwrap();

        assert_eq!(
            normalized(&h.log),
            vec![
                "git.fetch_repository".to_string(),
                "site.symlink".to_string(),
                site_call.to_string(),
                commit_call.to_string(),
                "git.push:false".to_string(),
            ]
        );
    }
}

#[tokio::test]
async fn fetch_failure_aborts_pipeline() {
    let log = CallLog::default();
    let h = harness_with(
        EntryMode::All,
        FakeGit {
            log: log.clone(),
            fail_fetch: true,
            ..Default::default()
        },
        FakeSite {
            log,
            ..Default::default()
        },
    );

    let task = post_task("p", TaskKind::CreatePosts, vec![Post::new("A")]);
    let err = h.dispatcher.run(&task).await.unwrap_err();

    assert!(matches!(err, OrchestratorError::Vcs(_)));
    assert_eq!(calls(&h.log), vec!["git.fetch_repository"]);

    let errors = h.backend.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].retryable);
    assert_eq!(errors[0].service, "git");
    assert!(h.backend.finished.lock().unwrap().is_empty());
}

#[tokio::test]
async fn events_bracket_every_step() {
    let h = harness(EntryMode::All);
    let bus = EventBus::new();
    let mut rx = bus.subscribe();
    let dispatcher = h.dispatcher.with_event_bus(bus);

    dispatcher.run(&deploy_task()).await.unwrap();

    let mut kinds = Vec::new();
    while let Ok(envelope) = rx.try_recv() {
        kinds.push(match envelope.event {
            Event::TaskStarted { .. } => "task.started".to_string(),
            Event::StepStarted { step, .. } => format!("start:{}", step),
            Event::StepFinished { step, success, .. } => format!("finish:{}:{}", step, success),
            Event::TaskFinished { success, .. } => format!("task.finished:{}", success),
            other => format!("{:?}", other),
        });
    }

    assert_eq!(kinds.first().map(String::as_str), Some("task.started"));
    assert_eq!(kinds.last().map(String::as_str), Some("task.finished:true"));
    assert!(kinds.contains(&"start:create_repository".to_string()));
    assert!(kinds.contains(&"finish:push:true".to_string()));
    assert_eq!(kinds.len(), 2 + 4 * 2);
}

/// Real generator that refuses to write selected slugs.
struct FlakyGenerator {
    inner: HexoGenerator,
    fail_slug: String,
}

#[async_trait]
impl Generator for FlakyGenerator {
    async fn create(
        &self,
        post: &GeneratorPost,
        layout: Layout,
        replace: bool,
    ) -> site::Result<PathBuf> {
        if post.slug == self.fail_slug {
            return Err(SiteError::InvalidPost(format!("cannot write {}", post.slug)));
        }
        self.inner.create(post, layout, replace).await
    }

    async fn publish(&self, post: &GeneratorPost, replace: bool) -> site::Result<PathBuf> {
        self.inner.publish(post, replace).await
    }

    async fn conceal(&self, post: &GeneratorPost) -> site::Result<PathBuf> {
        self.inner.conceal(post).await
    }

    async fn remove(&self, post: &GeneratorPost, layout: Layout) -> site::Result<PathBuf> {
        self.inner.remove(post, layout).await
    }

    async fn generate(&self) -> site::Result<()> {
        self.inner.generate().await
    }

    async fn exit(&self, error: Option<&str>) -> site::Result<()> {
        self.inner.exit(error).await
    }
}

struct SiteOnDiskFactory {
    git: Arc<FakeGit>,
}

impl ServiceFactory for SiteOnDiskFactory {
    fn build(&self, ctx: &TaskContext) -> TaskServices {
        let generator = FlakyGenerator {
            inner: HexoGenerator::new(&ctx.generator_dir, vec!["true".into()]),
            fail_slug: "B".into(),
        };
        let site = SiteService::new(
            SitePaths::new(&ctx.workspace, &ctx.generator_dir, &ctx.template_dir),
            Arc::new(generator),
        );
        TaskServices {
            git: self.git.clone(),
            site: Arc::new(site),
        }
    }
}

#[cfg(unix)]
#[tokio::test]
async fn create_posts_end_to_end_with_one_failure() {
    let root = TempDir::new().unwrap();
    let config = WorkerConfig::new(root.path().join("workspaces"), root.path().join("generator"))
        .with_template_dir(root.path().join("template"))
        .with_entry_mode(EntryMode::Post);
    let workspace = config.workspace_for("blog");
    std::fs::create_dir_all(&workspace).unwrap();

    let git = Arc::new(FakeGit::default());
    let backend = Arc::new(RecordingBackend::default());
    let dispatcher = TaskDispatcher::new(
        config,
        Arc::new(SiteOnDiskFactory { git: git.clone() }),
        backend.clone(),
    );

    let task = TaskDescriptor::from_json(
        r#"{
            "id": "e2e",
            "method": "create_posts",
            "storage": {"type": "github", "owner": "alice", "repo": "blog", "access_token": "tok"},
            "post": [{"title": "A", "content": "hello"}, {"title": "B"}]
        }"#,
    )
    .unwrap();

    let report = dispatcher.run(&task).await.unwrap();

    assert!(workspace.join("source/_posts/A.md").exists());
    assert!(!workspace.join("source/_posts/B.md").exists());

    let errors = backend.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].post_title.as_deref(), Some("B"));

    let log = calls(&git.log);
    assert_eq!(log.iter().filter(|c| c.starts_with("git.commit:")).count(), 1);
    assert_eq!(log.iter().filter(|c| c.starts_with("git.push:")).count(), 1);
    assert_eq!(report.failed_posts, vec!["B"]);
}
