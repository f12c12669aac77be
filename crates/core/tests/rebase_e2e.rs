//! End-to-end tests for the rebase driver over real git repositories.
//!
//! Each test builds a local repository with `git2`: a `main` branch and a
//! `feature` branch that both touch the same dependency declarations, then
//! rebases `feature` onto `main` through [`GitClient`].

use std::path::Path;

use git2::build::CheckoutBuilder;
use git2::{Commit, Oid, Repository, RepositoryInitOptions, Signature};
use tempfile::TempDir;

use rebaser_core::config::RebaserConfig;
use rebaser_core::errors::RebaseError;
use rebaser_core::git::GitClient;
use rebaser_core::rebase::{RebaseDriver, SessionState};

// ===========================================================================
// Helpers
// ===========================================================================

const BASE_CSPROJ: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <ItemGroup>
    <PackageReference Include="Alpha" Version="1.0.0" />
    <PackageReference Include="Beta" Version="1.0.0" />
  </ItemGroup>
</Project>
"#;

const MAIN_CSPROJ: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <ItemGroup>
    <PackageReference Include="Alpha" Version="2.0.0" />
    <PackageReference Include="Beta" Version="1.0.0" />
  </ItemGroup>
</Project>
"#;

fn init_repo(dir: &Path) -> Repository {
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    Repository::init_opts(dir, &opts).unwrap()
}

fn commit_files(repo: &Repository, files: &[(&str, &str)], message: &str) -> Oid {
    let workdir = repo.workdir().unwrap().to_path_buf();
    let mut index = repo.index().unwrap();
    for (name, content) in files {
        std::fs::write(workdir.join(name), content).unwrap();
        index.add_path(Path::new(name)).unwrap();
    }
    index.write().unwrap();

    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("Dev", "dev@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

fn switch_to(repo: &Repository, branch: &str) {
    repo.set_head(&format!("refs/heads/{}", branch)).unwrap();
    repo.checkout_head(Some(CheckoutBuilder::new().force()))
        .unwrap();
}

fn package_json(version: &str) -> String {
    format!(
        "{{\n  \"dependencies\": {{\n    \"pkg\": \"{}\"\n  }}\n}}\n",
        version
    )
}

/// `main` bumps Alpha; `feature` is checked out and carries `feature_csproj`
/// plus an unrelated second commit.
fn diverged_repo(feature_csproj: &str) -> (TempDir, Repository) {
    let dir = TempDir::new().unwrap();
    let repo = init_repo(dir.path());

    let base = commit_files(&repo, &[("App.csproj", BASE_CSPROJ)], "initial");
    repo.branch("feature", &repo.find_commit(base).unwrap(), false)
        .unwrap();
    commit_files(&repo, &[("App.csproj", MAIN_CSPROJ)], "bump Alpha");

    switch_to(&repo, "feature");
    commit_files(&repo, &[("App.csproj", feature_csproj)], "update packages");
    commit_files(&repo, &[("notes.txt", "release notes\n")], "add notes");

    (dir, repo)
}

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn test_rebase_keeps_highest_versions() {
    let feature_csproj = BASE_CSPROJ
        .replace(r#""Alpha" Version="1.0.0""#, r#""Alpha" Version="1.5.0""#)
        .replace(r#""Beta" Version="1.0.0""#, r#""Beta" Version="3.0.0""#);
    let (dir, _repo) = diverged_repo(&feature_csproj);

    let client = GitClient::new(dir.path()).unwrap();
    let mut driver = RebaseDriver::new(client, &RebaserConfig::default(), false).unwrap();
    let summary = driver.run(None).await.unwrap();

    assert_eq!(summary.source, "feature");
    assert_eq!(summary.target, "refs/heads/main");
    assert_eq!(summary.commits_applied, 2);
    assert_eq!(summary.pauses, 1);
    assert_eq!(
        summary.resolved,
        vec![("App.csproj".to_string(), "hunk-merge".to_string())]
    );
    assert_eq!(driver.session().unwrap().state(), SessionState::Complete);

    let client = driver.into_inner();
    assert!(!client.rebase_in_progress());

    let merged = std::fs::read_to_string(dir.path().join("App.csproj")).unwrap();
    assert!(merged.contains(r#"Include="Alpha" Version="2.0.0""#));
    assert!(merged.contains(r#"Include="Beta" Version="3.0.0""#));
    assert!(!merged.contains("<<<<<<<"));
    assert!(dir.path().join("notes.txt").exists());

    // The rebased branch now sits on top of main.
    let repo = client.repo();
    let head = repo.head().unwrap();
    assert_eq!(head.shorthand(), Some("feature"));
    let tip = head.peel_to_commit().unwrap();
    assert_eq!(tip.message(), Some("add notes"));
    let main = repo
        .find_branch("main", git2::BranchType::Local)
        .unwrap()
        .get()
        .peel_to_commit()
        .unwrap();
    assert!(repo.graph_descendant_of(tip.id(), main.id()).unwrap());
}

#[tokio::test]
async fn test_rebase_without_conflicts() {
    let dir = TempDir::new().unwrap();
    let repo = init_repo(dir.path());

    let base = commit_files(&repo, &[("App.csproj", BASE_CSPROJ)], "initial");
    repo.branch("feature", &repo.find_commit(base).unwrap(), false)
        .unwrap();
    commit_files(&repo, &[("App.csproj", MAIN_CSPROJ)], "bump Alpha");
    switch_to(&repo, "feature");
    commit_files(&repo, &[("notes.txt", "notes\n")], "add notes");

    let client = GitClient::new(dir.path()).unwrap();
    let mut driver = RebaseDriver::new(client, &RebaserConfig::default(), false).unwrap();
    let summary = driver.run(Some("main")).await.unwrap();

    assert_eq!(summary.commits_applied, 1);
    assert_eq!(summary.pauses, 0);
    assert!(summary.resolved.is_empty());

    let content = std::fs::read_to_string(dir.path().join("App.csproj")).unwrap();
    assert_eq!(content, MAIN_CSPROJ);
}

#[tokio::test]
async fn test_unresolvable_conflict_leaves_rebase_in_progress() {
    // Feature replaces one declaration with two: the hunk sides differ in
    // length and cannot be merged line by line.
    let feature_csproj = BASE_CSPROJ.replace(
        r#"    <PackageReference Include="Alpha" Version="1.0.0" />"#,
        "    <PackageReference Include=\"Alpha\" Version=\"1.5.0\" />\n    <PackageReference Include=\"Gamma\" Version=\"1.0.0\" />",
    );
    let (dir, _repo) = diverged_repo(&feature_csproj);

    let client = GitClient::new(dir.path()).unwrap();
    let mut driver = RebaseDriver::new(client, &RebaserConfig::default(), false).unwrap();
    let err = driver.run(None).await.unwrap_err();

    assert!(matches!(&err, RebaseError::Unresolved { path } if path == "App.csproj"));
    assert_eq!(err.to_string(), "unable to resolve merge conflict in App.csproj");
    assert_eq!(driver.session().unwrap().state(), SessionState::Aborted);

    let client = driver.into_inner();
    assert!(client.rebase_in_progress());
    let content = std::fs::read_to_string(dir.path().join("App.csproj")).unwrap();
    assert!(content.contains("<<<<<<<"));
    assert!(client.repo().index().unwrap().has_conflicts());
}

#[tokio::test]
async fn test_rebase_pauses_on_each_conflicting_commit() {
    let dir = TempDir::new().unwrap();
    let repo = init_repo(dir.path());

    let [v1, v2, v5, v6] = ["1.0.0", "2.0.0", "5.0.0", "6.0.0"].map(package_json);

    let base = commit_files(&repo, &[("package.json", v1.as_str())], "initial");
    repo.branch("feature", &repo.find_commit(base).unwrap(), false)
        .unwrap();
    let main_tip = commit_files(&repo, &[("package.json", v5.as_str())], "bump pkg to 5");

    switch_to(&repo, "feature");
    commit_files(&repo, &[("package.json", v2.as_str())], "bump pkg to 2");
    commit_files(&repo, &[("package.json", v6.as_str())], "bump pkg to 6");

    let client = GitClient::new(dir.path()).unwrap();
    let mut driver = RebaseDriver::new(client, &RebaserConfig::default(), false).unwrap();
    let summary = driver.run(None).await.unwrap();

    // The first commit resolves to main's content and is skipped as applied.
    assert_eq!(summary.pauses, 2);
    assert_eq!(summary.commits_applied, 1);
    assert_eq!(summary.resolved.len(), 2);
    assert!(summary.resolved.iter().all(|(path, _)| path == "package.json"));

    let content = std::fs::read_to_string(dir.path().join("package.json")).unwrap();
    assert_eq!(content, v6);

    let client = driver.into_inner();
    assert!(!client.rebase_in_progress());
    let tip = client.repo().head().unwrap().peel_to_commit().unwrap();
    assert_eq!(tip.message(), Some("bump pkg to 6"));
    assert_eq!(tip.parent_id(0).unwrap(), main_tip);
}
