//! CLI integration tests.
//!
//! These run the `ef` binary against a site in a temporary directory,
//! configured through `EDITFLOW_CONFIG`.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A temporary site with one writable `content` filesystem.
struct TestSite {
    dir: TempDir,
}

impl TestSite {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let root = dir.path().join("site");
        std::fs::create_dir_all(root.join("en/blog")).expect("mkdir");
        std::fs::write(root.join("en/blog/post.md"), "---\ntitle: Post\n---\nHello\n")
            .expect("write");
        std::fs::write(
            dir.path().join("config.toml"),
            format!(
                r#"
                [[mounts]]
                fsid = "content"
                kind = "page"
                read_write = "{}"

                [notices]
                path = "{}"

                [logging]
                filter = "editflow=warn"
                "#,
                root.display(),
                dir.path().join("notices.jsonl").display()
            ),
        )
        .expect("write config");
        Self { dir }
    }

    fn root(&self) -> PathBuf {
        self.dir.path().join("site")
    }

    fn file(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `ef` acting as `editor` against this site.
    fn ef(&self, editor: &str) -> Command {
        let mut cmd = Command::cargo_bin("ef").expect("binary");
        cmd.env("EDITFLOW_CONFIG", self.path().join("config.toml"))
            .env("HOME", self.path())
            .env_remove("XDG_CONFIG_HOME")
            .env_remove("EDITFLOW_EDITOR")
            .args(["--editor", editor]);
        cmd
    }
}

#[test]
fn help_describes_the_tool() {
    Command::cargo_bin("ef")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("publish"));
}

#[test]
fn completion_needs_no_config() {
    Command::cargo_bin("ef")
        .expect("binary")
        .env("EDITFLOW_CONFIG", "/nonexistent/config.toml")
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ef"));
}

#[test]
fn operations_lists_confirmation_keys() {
    let site = TestSite::new();
    site.ef("alice")
        .arg("operations")
        .assert()
        .success()
        .stdout(predicate::str::contains("delete-draft"))
        .stdout(predicate::str::contains("delete-confirmed"));
}

#[test]
fn commit_then_publish_from_a_file() {
    let site = TestSite::new();
    let draft = site.path().join("draft.md");
    std::fs::write(&draft, "---\ntitle: Post\n---\nUpdated\n").expect("write draft");

    site.ef("alice")
        .args(["submit", "commit", "content", "blog/post.md", "-c", "en"])
        .arg("--content-file")
        .arg(&draft)
        .assert()
        .success();
    assert!(site.file("en/blog/post.md.~draft").exists());

    site.ef("alice")
        .args(["submit", "publish", "content", "blog/post.md", "-c", "en"])
        .assert()
        .success()
        .stdout(predicate::str::contains("published"));

    assert_eq!(
        std::fs::read_to_string(site.file("en/blog/post.md")).expect("read"),
        "---\ntitle: Post\n---\nUpdated\n"
    );
    assert!(!site.file("en/blog/post.md.~draft").exists());
    assert!(!site.file("en/blog/post.md.~lock").exists());
}

#[test]
fn second_editor_is_locked_out() {
    let site = TestSite::new();
    site.ef("alice")
        .args(["submit", "edit", "content", "blog/post.md", "-c", "en"])
        .assert()
        .success();

    site.ef("bob")
        .args(["submit", "edit", "content", "blog/post.md", "-c", "en"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("locked by another user"));
}

#[test]
fn delete_without_confirm_changes_nothing() {
    let site = TestSite::new();
    site.ef("alice")
        .args(["submit", "delete", "content", "blog/post.md", "-c", "en"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("needs confirmation"));
    assert!(site.file("en/blog/post.md").exists());

    site.ef("alice")
        .args(["submit", "delete", "content", "blog/post.md", "-c", "en", "--confirm"])
        .assert()
        .success();
    assert!(!site.file("en/blog/post.md").exists());
}

#[test]
fn copy_with_scoped_fields() {
    let site = TestSite::new();
    site.ef("alice")
        .args(["submit", "copy", "content", "blog/post.md", "-c", "en"])
        .args(["-f", "dst-name=Second Post.md"])
        .assert()
        .success();
    assert_eq!(
        std::fs::read(site.file("en/blog/second-post.md")).expect("copy"),
        std::fs::read(site.file("en/blog/post.md")).expect("source")
    );
}

#[test]
fn status_reports_lock_holder_as_json() {
    let site = TestSite::new();
    site.ef("alice")
        .args(["submit", "edit", "content", "blog/post.md", "-c", "en"])
        .assert()
        .success();

    site.ef("alice")
        .args(["--json", "status", "content", "blog/post.md", "-c", "en"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""lock_holder": "alice""#));
}

#[test]
fn actions_for_a_locked_resource() {
    let site = TestSite::new();
    site.ef("alice")
        .args(["submit", "edit", "content", "blog/post.md", "-c", "en"])
        .assert()
        .success();

    site.ef("bob")
        .args(["actions", "content", "blog/post.md", "-c", "en"])
        .assert()
        .success()
        .stdout(predicate::str::contains("retake"))
        .stdout(predicate::str::contains("commit").not());
}

#[test]
fn notices_are_drained_once() {
    let site = TestSite::new();
    site.ef("alice")
        .args(["submit", "commit", "content", "blog/post.md", "-c", "en"])
        .args(["--raw-field", "content=new body"])
        .assert()
        .success();

    site.ef("alice")
        .arg("notices")
        .assert()
        .success()
        .stdout(predicate::str::contains("draft saved"));
    site.ef("alice")
        .arg("notices")
        .assert()
        .success()
        .stdout(predicate::str::contains("no notices"));
}

#[test]
fn missing_editor_is_an_error() {
    let site = TestSite::new();
    Command::cargo_bin("ef")
        .expect("binary")
        .env("EDITFLOW_CONFIG", site.path().join("config.toml"))
        .env("HOME", site.path())
        .env_remove("EDITFLOW_EDITOR")
        .env_remove("USER")
        .args(["operations"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no editor given"));
}
