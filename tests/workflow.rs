//! End-to-end workflow tests.
//!
//! Every request goes through `Engine::dispatch`, the same path the CLI
//! takes: lookup, gate, validate, execute, deliver notices.

use std::collections::BTreeMap;
use std::sync::Arc;

use tempfile::TempDir;

use editflow::cli::build_engine;
use editflow::collab::{MemoryNotices, NoticeSink};
use editflow::core::config::Config;
use editflow::core::identity::ResourceIdentity;
use editflow::core::types::{EditorId, FsId};
use editflow::engine::form::Form;
use editflow::engine::{Engine, ErrorKind, Outcome, Request, Status};
use editflow::mount::memory::MemFile;
use editflow::mount::{MemFs, MountPoint, MountTable, ReadFs, WriteFs};

// =============================================================================
// Test Fixtures
// =============================================================================

const POST: &str = "en/blog/post.md";

fn fsid(id: &str) -> FsId {
    FsId::new(id).expect("fsid")
}

fn editor(id: &str) -> EditorId {
    EditorId::new(id).expect("editor")
}

fn post() -> ResourceIdentity {
    ResourceIdentity::parse("content", "en", "blog/post.md").expect("identity")
}

/// A writable `content` filesystem and a read-only `archive`.
struct Site {
    content: Arc<MemFs>,
    archive: Arc<MemFs>,
    notices: Arc<MemoryNotices>,
    engine: Engine,
}

impl Site {
    fn new() -> Self {
        let content = Arc::new(MemFs::new().with_file(POST, b"---\ntitle: Post\n---\nHello\n"));
        let archive = Arc::new(MemFs::new().with_file("en/old.md", b"---\ntitle: Old\n---\nOld\n"));
        let notices = Arc::new(MemoryNotices::new());
        let table = MountTable::new()
            .with(MountPoint::read_write(
                fsid("content"),
                "",
                content.clone(),
                content.clone(),
            ))
            .with(MountPoint::read_only(fsid("archive"), "", archive.clone()));
        let engine = Engine::builder(table).notices(notices.clone()).build();
        Self {
            content,
            archive,
            notices,
            engine,
        }
    }

    fn submit(&self, who: &str, id: &ResourceIdentity, form: Form) -> Outcome {
        self.engine
            .dispatch(&Request::new(editor(who), id.clone(), form))
            .expect("dispatch")
    }

    fn op(&self, who: &str, op: &str) -> Outcome {
        self.submit(who, &post(), Form::new().with("submit", op))
    }

    fn commit(&self, who: &str, content: &str) -> Outcome {
        self.submit(
            who,
            &post(),
            Form::new().with("submit", "commit").with("content", content),
        )
    }
}

// =============================================================================
// Locks
// =============================================================================

#[test]
fn only_one_editor_holds_the_lock() {
    let site = Site::new();

    assert!(site.op("alice", "edit").is_done());
    assert!(site.op("bob", "edit").fails_with(ErrorKind::LockConflict));
    assert!(site.commit("bob", "bob's words").fails_with(ErrorKind::LockConflict));
    assert!(!site.content.exists("en/blog/post.md.~draft"));

    assert!(site.op("alice", "unlock").is_done());
    assert!(site.op("bob", "edit").is_done());
    assert_eq!(
        site.content.read("en/blog/post.md.~lock").expect("lock"),
        b"bob"
    );
}

#[test]
fn retake_needs_confirmation_then_moves_the_lock() {
    let site = Site::new();
    assert!(site.op("alice", "edit").is_done());

    let unconfirmed = site.op("bob", "retake");
    assert_eq!(unconfirmed.status, Status::NeedsConfirmation);

    let confirmed = site.op("bob", "retake-confirmed");
    assert!(confirmed.is_done(), "{confirmed:?}");
    assert_eq!(
        site.content.read("en/blog/post.md.~lock").expect("lock"),
        b"bob"
    );
}

// =============================================================================
// Drafts and publish
// =============================================================================

#[test]
fn committing_the_same_draft_twice_changes_nothing_more() {
    let site = Site::new();
    assert!(site.commit("alice", "v2").is_done());
    let first = site.content.snapshot();

    assert!(site.commit("alice", "v2").is_done());
    let second = site.content.snapshot();

    assert_eq!(first.len(), second.len());
    assert_eq!(
        first["en/blog/post.md.~draft"].bytes,
        second["en/blog/post.md.~draft"].bytes
    );
    assert_eq!(
        site.content.read(POST).expect("published"),
        b"---\ntitle: Post\n---\nHello\n"
    );
}

#[test]
fn publish_promotes_the_draft_and_clears_sidecars() {
    let site = Site::new();
    assert!(site.commit("alice", "---\ntitle: Post\n---\nNew\n").is_done());

    let outcome = site.op("alice", "publish");
    assert!(outcome.is_done(), "{outcome:?}");
    assert_eq!(
        site.content.read(POST).expect("published"),
        b"---\ntitle: Post\n---\nNew\n"
    );
    let files: Vec<String> = site.content.snapshot().into_keys().collect();
    assert_eq!(files, vec![POST.to_string()]);

    let delivered = site.notices.drain(&editor("alice")).expect("notices");
    assert!(delivered.iter().any(|n| n.message == "published"));
}

#[test]
fn publish_without_a_draft_is_rejected() {
    let site = Site::new();
    let outcome = site.op("alice", "publish");
    assert!(outcome.fails_with(ErrorKind::NotFound));
    assert_eq!(site.content.mutations(), 0);
}

// =============================================================================
// Gating
// =============================================================================

#[test]
fn unconfirmed_delete_writes_nothing() {
    let site = Site::new();
    let before = site.content.snapshot();

    let outcome = site.op("alice", "delete");
    assert_eq!(outcome.status, Status::NeedsConfirmation);
    assert_eq!(site.content.mutations(), 0);
    assert_eq!(site.content.snapshot(), before);
}

#[test]
fn confirmed_delete_removes_resource_and_sidecars() {
    let site = Site::new();
    assert!(site.commit("alice", "draft").is_done());
    assert!(site.op("alice", "unlock").is_done());

    let outcome = site.op("alice", "delete-confirmed");
    assert!(outcome.is_done(), "{outcome:?}");
    assert!(site.content.snapshot().is_empty());
}

#[test]
fn unknown_operation_is_reported() {
    let site = Site::new();
    let outcome = site.op("alice", "frobnicate");
    assert_eq!(outcome.status, Status::UnknownOperation);
    assert!(outcome.op.is_none());
}

// =============================================================================
// Read-only mounts
// =============================================================================

#[test]
fn read_only_mount_is_never_written() {
    let site = Site::new();
    let old = ResourceIdentity::parse("archive", "en", "old.md").expect("identity");
    let before = site.archive.snapshot();

    let edit = site.submit("alice", &old, Form::new().with("submit", "edit"));
    assert!(edit.fails_with(ErrorKind::ReadOnly));
    let commit = site.submit(
        "alice",
        &old,
        Form::new().with("submit", "commit").with("content", "x"),
    );
    assert!(commit.fails_with(ErrorKind::ReadOnly));
    let moved = site.submit(
        "alice",
        &old,
        Form::new().with("submit", "move").with("move~dst-name", "new.md"),
    );
    assert!(moved.fails_with(ErrorKind::ReadOnly));
    let deleted = site.submit(
        "alice",
        &old,
        Form::new().with("submit", "delete-confirmed"),
    );
    assert!(deleted.fails_with(ErrorKind::ReadOnly));

    assert_eq!(site.archive.mutations(), 0);
    assert_eq!(site.archive.snapshot(), before);
}

#[test]
fn read_only_draft_is_never_published() {
    let site = Site::new();
    let old = ResourceIdentity::parse("archive", "en", "old.md").expect("identity");
    site.archive
        .write("en/old.md.~draft", b"---\ntitle: Old\n---\nNewer\n")
        .expect("plant draft");
    let before = site.archive.snapshot();
    let mutations = site.archive.mutations();

    let publish = site.submit("alice", &old, Form::new().with("submit", "publish"));
    assert!(publish.fails_with(ErrorKind::ReadOnly));

    assert_eq!(site.archive.mutations(), mutations);
    assert_eq!(site.archive.snapshot(), before);
}

#[test]
fn move_into_a_read_only_mount_is_refused() {
    let site = Site::new();
    let content_before = site.content.snapshot();
    let archive_before = site.archive.snapshot();

    let moved = site.submit(
        "alice",
        &post(),
        Form::new()
            .with("submit", "move")
            .with("move~dst-fsid", "archive")
            .with("move~dst-name", "post.md"),
    );
    assert!(moved.fails_with(ErrorKind::ReadOnly));

    assert_eq!(site.content.mutations(), 0);
    assert_eq!(site.content.snapshot(), content_before);
    assert_eq!(site.archive.mutations(), 0);
    assert_eq!(site.archive.snapshot(), archive_before);
}

// =============================================================================
// Layered mounts
// =============================================================================

/// A `content` mount whose read layer and write layer are separate stores.
struct Layered {
    base: Arc<MemFs>,
    overlay: Arc<MemFs>,
    engine: Engine,
}

impl Layered {
    fn new(base: MemFs, overlay: MemFs) -> Self {
        let base = Arc::new(base);
        let overlay = Arc::new(overlay);
        let table = MountTable::new().with(MountPoint::read_write(
            fsid("content"),
            "",
            base.clone(),
            overlay.clone(),
        ));
        let engine = Engine::builder(table)
            .notices(Arc::new(MemoryNotices::new()))
            .build();
        Self {
            base,
            overlay,
            engine,
        }
    }

    fn submit(&self, form: Form) -> Outcome {
        let id = ResourceIdentity::parse("content", "en", "a.md").expect("identity");
        self.engine
            .dispatch(&Request::new(editor("alice"), id, form))
            .expect("dispatch")
    }

    fn snapshot(&self) -> (BTreeMap<String, MemFile>, BTreeMap<String, MemFile>) {
        (self.base.snapshot(), self.overlay.snapshot())
    }

    fn mutations(&self) -> usize {
        self.base.mutations() + self.overlay.mutations()
    }
}

#[test]
fn base_layer_file_cannot_be_moved_or_deleted() {
    let site = Layered::new(MemFs::new().with_file("en/a.md", b"base"), MemFs::new());
    let before = site.snapshot();

    let moved = site.submit(
        Form::new()
            .with("submit", "move")
            .with("move~dst-name", "b.md"),
    );
    assert!(moved.fails_with(ErrorKind::ReadOnly));
    assert!(!site.overlay.exists("en/b.md"));

    let deleted = site.submit(Form::new().with("submit", "delete-confirmed"));
    assert!(deleted.fails_with(ErrorKind::ReadOnly));
    assert_eq!(site.base.read("en/a.md").expect("source kept"), b"base");

    assert_eq!(site.mutations(), 0);
    assert_eq!(site.snapshot(), before);
}

#[test]
fn shadowed_file_cannot_be_deleted() {
    let site = Layered::new(
        MemFs::new().with_file("en/a.md", b"base"),
        MemFs::new().with_file("en/a.md", b"overlay"),
    );
    let before = site.snapshot();

    let deleted = site.submit(Form::new().with("submit", "delete-confirmed"));
    assert!(deleted.fails_with(ErrorKind::ReadOnly));
    assert_eq!(site.overlay.read("en/a.md").expect("kept"), b"overlay");
    assert_eq!(site.mutations(), 0);
    assert_eq!(site.snapshot(), before);
}

#[test]
fn overlay_only_file_moves_normally() {
    let site = Layered::new(MemFs::new(), MemFs::new().with_file("en/a.md", b"mine"));

    let moved = site.submit(
        Form::new()
            .with("submit", "move")
            .with("move~dst-name", "b.md"),
    );
    assert!(moved.is_done(), "{:?}", moved.status);
    assert!(!site.overlay.exists("en/a.md"));
    assert_eq!(site.overlay.read("en/b.md").expect("moved"), b"mine");
    assert!(site.base.snapshot().is_empty());
}

#[test]
fn copy_out_of_a_read_only_mount() {
    let site = Site::new();
    let old = ResourceIdentity::parse("archive", "en", "old.md").expect("identity");
    let outcome = site.submit(
        "alice",
        &old,
        Form::new()
            .with("submit", "copy")
            .with("copy~dst-fsid", "content")
            .with("copy~dst-name", "restored.md"),
    );
    assert!(outcome.is_done(), "{outcome:?}");
    assert_eq!(
        site.content.read("en/restored.md").expect("copy"),
        site.archive.read("en/old.md").expect("source")
    );
    assert_eq!(site.archive.mutations(), 0);
}

// =============================================================================
// Transfers
// =============================================================================

#[test]
fn corrupted_copy_leaves_no_destination() {
    let site = Site::new();
    site.content.corrupt_writes(true);

    let outcome = site.submit(
        "alice",
        &post(),
        Form::new()
            .with("submit", "copy")
            .with("copy~dst-name", "copy.md"),
    );
    assert!(outcome.fails_with(ErrorKind::Integrity), "{outcome:?}");
    assert!(!site.content.exists("en/blog/copy.md"));
    assert!(site.content.exists(POST));
}

#[test]
fn move_keeps_source_when_the_lock_cannot_be_released() {
    let site = Site::new();
    assert!(site.op("alice", "edit").is_done());
    site.content.fail_remove("en/blog/post.md.~lock");

    let outcome = site.submit(
        "alice",
        &post(),
        Form::new()
            .with("submit", "move")
            .with("move~dst-name", "moved.md"),
    );
    assert!(!outcome.is_done());
    assert!(site.content.exists(POST));
    assert!(!site.content.exists("en/blog/moved.md"));
}

#[test]
fn move_with_a_pending_draft_is_rejected() {
    let site = Site::new();
    assert!(site.commit("alice", "draft").is_done());
    let outcome = site.submit(
        "alice",
        &post(),
        Form::new()
            .with("submit", "move")
            .with("move~dst-name", "moved.md"),
    );
    assert!(outcome.fails_with(ErrorKind::Validation));
    assert!(site.content.exists(POST));
}

#[test]
fn translate_creates_a_tagged_copy() {
    let site = Site::new();
    let outcome = site.submit(
        "alice",
        &post(),
        Form::new()
            .with("submit", "translate")
            .with("translate~dst-lang", "fr"),
    );
    assert!(outcome.is_done(), "{outcome:?}");

    let body = site.content.read("fr/blog/post.md").expect("translation");
    let text = String::from_utf8(body).expect("utf8");
    assert!(text.contains("translates: content/en/blog/post.md"));
    assert!(text.contains("Hello"));
}

// =============================================================================
// Local directories
// =============================================================================

#[test]
fn local_directory_round_trip() {
    let temp = TempDir::new().expect("tempdir");
    let site = temp.path().join("site");
    std::fs::create_dir_all(site.join("en")).expect("mkdir");
    std::fs::write(site.join("en/about.md"), "---\ntitle: About\n---\nOld\n").expect("write");

    let config = Config::from_toml(&format!(
        r#"
        [[mounts]]
        fsid = "content"
        kind = "page"
        read_write = "{}"

        [notices]
        path = "{}"
        "#,
        site.display(),
        temp.path().join("notices.jsonl").display()
    ))
    .expect("config");
    let engine = build_engine(&config).expect("engine");
    let about = ResourceIdentity::parse("content", "en", "about.md").expect("identity");
    let alice = editor("alice");

    let commit = engine
        .dispatch(&Request::new(
            alice.clone(),
            about.clone(),
            Form::new()
                .with("submit", "commit")
                .with("content", "---\ntitle: About\n---\nNew\n"),
        ))
        .expect("commit");
    assert!(commit.is_done(), "{commit:?}");
    assert!(site.join("en/about.md.~draft").exists());
    assert_eq!(
        std::fs::read_to_string(site.join("en/about.md.~lock")).expect("lock"),
        "alice"
    );

    let publish = engine
        .dispatch(&Request::new(
            alice.clone(),
            about,
            Form::new().with("submit", "publish"),
        ))
        .expect("publish");
    assert!(publish.is_done(), "{publish:?}");
    assert_eq!(
        std::fs::read_to_string(site.join("en/about.md")).expect("read"),
        "---\ntitle: About\n---\nNew\n"
    );
    assert!(!site.join("en/about.md.~draft").exists());
    assert!(!site.join("en/about.md.~lock").exists());

    let pending = engine.notices().pending(&alice).expect("notices");
    assert!(pending.iter().any(|n| n.message == "published"));
}
