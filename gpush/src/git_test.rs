use std::path::Path;

use git2::{Repository, Signature};

use crate::git::{GitRepo, find_repo_root, is_git_repository, pick_status_lines};

fn commit_file(repo: &Repository, name: &str, contents: &str) -> git2::Oid {
    let workdir = repo.workdir().expect("workdir");
    std::fs::write(workdir.join(name), contents).expect("write");
    let mut index = repo.index().expect("index");
    index.add_path(Path::new(name)).expect("add");
    index.write().expect("write index");
    let tree = repo.find_tree(index.write_tree().expect("tree")).expect("find tree");
    let sig = Signature::now("gpush", "gpush@example.com").expect("sig");
    let parents = repo
        .head()
        .ok()
        .and_then(|h| h.peel_to_commit().ok())
        .into_iter()
        .collect::<Vec<_>>();
    let parent_refs = parents.iter().collect::<Vec<_>>();
    repo.commit(Some("HEAD"), &sig, &sig, name, &tree, &parent_refs)
        .expect("commit")
}

#[test]
fn branch_without_upstream_has_no_upstream_name() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let repo = Repository::init(tmp.path()).expect("init");
    commit_file(&repo, "a.txt", "a");

    assert!(is_git_repository(tmp.path()));
    let git = GitRepo::discover(tmp.path()).expect("discover");
    assert!(!git.is_detached_head().expect("head"));
    assert_eq!(git.upstream_branch_name(), None);
    assert_eq!(git.ahead_behind().expect("ahead/behind"), None);
    assert!(!git.up_to_date_or_ahead());
    assert!(!git.at_same_commit_as_upstream());
}

#[test]
fn detached_head_is_detected() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let repo = Repository::init(tmp.path()).expect("init");
    let first = commit_file(&repo, "a.txt", "a");
    commit_file(&repo, "b.txt", "b");
    repo.set_head_detached(first).expect("detach");

    let git = GitRepo::discover(tmp.path()).expect("discover");
    assert!(git.is_detached_head().expect("head"));
    assert_eq!(git.upstream_branch_name(), None);
}

#[test]
fn ahead_and_behind_are_counted_against_the_upstream() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let repo = Repository::init(tmp.path()).expect("init");
    let base = commit_file(&repo, "a.txt", "a");
    let branch_name = repo
        .head()
        .ok()
        .and_then(|h| h.shorthand().map(str::to_string))
        .expect("branch");
    repo.reference(
        &format!("refs/remotes/origin/{branch_name}"),
        base,
        true,
        "fake remote",
    )
    .expect("remote ref");
    repo.remote("origin", "https://example.invalid/repo.git")
        .expect("remote");
    repo.find_branch(&branch_name, git2::BranchType::Local)
        .expect("local")
        .set_upstream(Some(&format!("origin/{branch_name}")))
        .expect("upstream");

    let git = GitRepo::discover(tmp.path()).expect("discover");
    assert_eq!(
        git.upstream_branch_name(),
        Some(format!("origin/{branch_name}"))
    );
    assert!(git.at_same_commit_as_upstream());
    assert!(git.up_to_date_or_ahead());

    commit_file(&repo, "b.txt", "b");
    let git = GitRepo::discover(tmp.path()).expect("discover");
    assert_eq!(git.ahead_behind().expect("ahead/behind"), Some((1, 0)));
    assert!(git.up_to_date_or_ahead());
    assert!(!git.at_same_commit_as_upstream());
}

#[test]
fn plain_directory_is_not_a_repository() {
    let tmp = tempfile::tempdir().expect("tempdir");
    if find_repo_root(tmp.path()).is_none() {
        assert!(!is_git_repository(tmp.path()));
    }
}

#[test]
fn status_summary_prefers_branch_lines() {
    let status = "On branch main\nYour branch is behind 'origin/main' by 2 commits.\n\nnothing to commit\n";
    assert_eq!(
        pick_status_lines(status),
        "On branch main\nYour branch is behind 'origin/main' by 2 commits."
    );
    assert_eq!(
        pick_status_lines("HEAD detached at 1a2b3c\nnothing to commit\n"),
        "HEAD detached at 1a2b3c"
    );
    assert_eq!(pick_status_lines("odd output\n"), "odd output");
}
