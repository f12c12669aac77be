//! Local rebase operations via `git2`.

use std::path::{Path, PathBuf};

use git2::{BranchType, ErrorCode, Rebase, RebaseOptions, Repository, Signature};
use tracing::{debug, info, instrument, warn};

use super::{ConflictEntry, Identity, RebaseStatus, VersionControl};
use crate::config::TargetConfig;
use crate::errors::GitError;

/// High-level Git client wrapping a `git2::Repository`.
///
/// The repository handle is owned here and released when the client drops.
pub struct GitClient {
    repo: Repository,
    workdir: PathBuf,
}

impl GitClient {
    /// Open an existing, non-bare Git repository at `repo_path`.
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Result<Self, GitError> {
        let path = repo_path.as_ref();
        info!(path = %path.display(), "opening git repository");
        let repo = Repository::open(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| GitError::BareRepository(path.display().to_string()))?
            .to_path_buf();
        Ok(Self { repo, workdir })
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// `true` while a rebase is stopped in this repository.
    pub fn rebase_in_progress(&self) -> bool {
        matches!(
            self.repo.state(),
            git2::RepositoryState::Rebase
                | git2::RepositoryState::RebaseInteractive
                | git2::RepositoryState::RebaseMerge
        )
    }

    /// Apply operations until one conflicts or none are left.
    fn advance(&self, rebase: &mut Rebase<'_>, identity: &Identity) -> Result<RebaseStatus, GitError> {
        let mut applied = 0;

        while let Some(operation) = rebase.next() {
            let operation = operation?;
            debug!(commit = %operation.id(), "applying rebase operation");

            if self.repo.index()?.has_conflicts() {
                info!(commit = %operation.id(), applied, "rebase stopped on conflicts");
                return Ok(RebaseStatus::Conflicts { applied });
            }
            applied += self.commit_current(rebase, identity)?;
        }

        let committer = signature(identity)?;
        rebase.finish(Some(&committer))?;
        info!(applied, "rebase complete");
        Ok(RebaseStatus::Complete { applied })
    }

    /// Commit the current operation; returns how many commits were created.
    fn commit_current(&self, rebase: &mut Rebase<'_>, identity: &Identity) -> Result<usize, GitError> {
        let committer = signature(identity)?;
        match rebase.commit(None, &committer, None) {
            Ok(oid) => {
                debug!(sha = %oid, "committed rebased commit");
                Ok(1)
            }
            Err(e) if e.code() == ErrorCode::Applied => {
                info!("commit already applied upstream, skipping");
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn signature(identity: &Identity) -> Result<Signature<'static>, GitError> {
    Ok(Signature::now(&identity.name, &identity.email)?)
}

fn entry_path(entry: &git2::IndexEntry) -> Result<String, GitError> {
    String::from_utf8(entry.path.clone()).map_err(|_| GitError::InvalidPath)
}

impl VersionControl for GitClient {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn head_branch(&self) -> Result<String, GitError> {
        let head = self.repo.head()?;
        if self.repo.head_detached()? {
            return Ok("HEAD".to_string());
        }
        Ok(head.shorthand().unwrap_or("HEAD").to_string())
    }

    fn head_author(&self) -> Result<Identity, GitError> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                return Err(GitError::EmptyHead)
            }
            Err(e) => return Err(e.into()),
        };
        let commit = head.peel_to_commit()?;
        let author = commit.author();
        Ok(Identity::new(
            author.name().unwrap_or_default(),
            author.email().unwrap_or_default(),
        ))
    }

    #[instrument(skip(self, defaults))]
    fn resolve_target(
        &self,
        explicit: Option<&str>,
        defaults: &TargetConfig,
    ) -> Result<String, GitError> {
        let name = explicit.unwrap_or(defaults.default_branch.as_str());
        let remote_name = format!("{}/{}", defaults.remote, name);

        let branch = self
            .repo
            .find_branch(name, BranchType::Local)
            .or_else(|_| self.repo.find_branch(name, BranchType::Remote))
            .or_else(|_| self.repo.find_branch(&remote_name, BranchType::Remote))
            .map_err(|_| GitError::TargetNotFound(format!("{}, {}", name, remote_name)))?;

        let reference = branch
            .get()
            .name()
            .ok_or_else(|| GitError::TargetNotFound(name.to_string()))?
            .to_string();
        info!(target = %reference, "resolved rebase target");
        Ok(reference)
    }

    #[instrument(skip(self, identity), fields(identity = %identity))]
    fn start_rebase(&mut self, target: &str, identity: &Identity) -> Result<RebaseStatus, GitError> {
        let head = self.repo.head()?;
        let branch = self.repo.reference_to_annotated_commit(&head)?;
        let upstream_ref = self.repo.find_reference(target)?;
        let upstream = self.repo.reference_to_annotated_commit(&upstream_ref)?;

        let mut options = RebaseOptions::new();
        let mut rebase = self
            .repo
            .rebase(Some(&branch), Some(&upstream), None, Some(&mut options))?;
        info!(operations = rebase.len(), "started rebase");

        self.advance(&mut rebase, identity)
    }

    #[instrument(skip(self, identity), fields(identity = %identity))]
    fn continue_rebase(&mut self, identity: &Identity) -> Result<RebaseStatus, GitError> {
        let mut rebase = match self.repo.open_rebase(None) {
            Ok(rebase) => rebase,
            Err(e) if e.code() == ErrorCode::NotFound => return Err(GitError::NoRebaseInProgress),
            Err(e) => return Err(e.into()),
        };

        let committed = self.commit_current(&mut rebase, identity)?;
        let status = self.advance(&mut rebase, identity)?;
        Ok(match status {
            RebaseStatus::Complete { applied } => RebaseStatus::Complete {
                applied: applied + committed,
            },
            RebaseStatus::Conflicts { applied } => RebaseStatus::Conflicts {
                applied: applied + committed,
            },
        })
    }

    fn conflicts(&self) -> Result<Vec<ConflictEntry>, GitError> {
        let index = self.repo.index()?;
        let mut entries = Vec::new();

        for conflict in index.conflicts()? {
            let conflict = conflict?;
            let Some(entry) = conflict
                .our
                .as_ref()
                .or(conflict.their.as_ref())
                .or(conflict.ancestor.as_ref())
            else {
                warn!("skipping conflict with no index entries");
                continue;
            };
            entries.push(ConflictEntry {
                path: entry_path(entry)?,
                ours: conflict.our.as_ref().map(|e| e.id.to_string()),
                theirs: conflict.their.as_ref().map(|e| e.id.to_string()),
            });
        }

        debug!(count = entries.len(), "listed conflicted paths");
        Ok(entries)
    }

    #[instrument(skip(self))]
    fn stage(&mut self, path: &str) -> Result<(), GitError> {
        let mut index = self.repo.index()?;
        if self.workdir.join(path).exists() {
            index.add_path(Path::new(path))?;
        } else {
            index.remove_path(Path::new(path))?;
        }
        index.write()?;
        debug!("staged resolved path");
        Ok(())
    }
}
