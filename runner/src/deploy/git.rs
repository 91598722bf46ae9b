//! Fixture branch publishing

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::deploy::shell;
use crate::deploy::teardown::Teardown;
use crate::errors::RunnerError;

/// Identity used for fixture commits
#[derive(Debug, Clone)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

/// Branch name for one run of a fixture
pub fn branch_name(prefix: &str, fixture_name: &str, run_id: &str) -> String {
    let slug: String = fixture_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let short_id: String = run_id.chars().filter(|c| *c != '-').take(8).collect();
    format!("{}-{}-{}", prefix, slug.trim_matches('-'), short_id)
}

/// Commit `site_dir` as the only commit of an orphan branch and push it.
///
/// The repository metadata lives outside `site_dir`. Deleting the remote
/// branch and the local metadata are registered as teardown actions.
pub async fn publish_branch(
    site_dir: &Path,
    repo_url: &str,
    branch: &str,
    author: &CommitAuthor,
    timestamp: DateTime<Utc>,
    teardown: &Teardown,
) -> Result<(), RunnerError> {
    info!("Publishing {} to {} (branch: {})", site_dir.display(), repo_url, branch);

    let git_dir = std::env::temp_dir().join(format!("edgeship-{}.git", branch));
    let git = GitRepo::new(git_dir.clone(), site_dir.to_path_buf());

    {
        let git_dir = git_dir.clone();
        teardown
            .register(format!("remove {}", git_dir.display()), move || async move {
                if tokio::fs::metadata(&git_dir).await.is_ok() {
                    tokio::fs::remove_dir_all(&git_dir).await?;
                }
                Ok::<(), RunnerError>(())
            })
            .await;
    }

    git.run(&["init", "--quiet"], &[]).await?;
    git.run(&["checkout", "--quiet", "--orphan", branch], &[]).await?;
    git.run(&["add", "--all"], &[]).await?;

    let date = timestamp.to_rfc3339();
    let identity = [
        ("GIT_AUTHOR_NAME", author.name.clone()),
        ("GIT_AUTHOR_EMAIL", author.email.clone()),
        ("GIT_AUTHOR_DATE", date.clone()),
        ("GIT_COMMITTER_NAME", author.name.clone()),
        ("GIT_COMMITTER_EMAIL", author.email.clone()),
        ("GIT_COMMITTER_DATE", date),
    ];
    let message = format!("Deploy {}", branch);
    git.run(&["commit", "--quiet", "--allow-empty", "-m", &message], &identity)
        .await?;

    let refspec = format!("HEAD:refs/heads/{}", branch);
    git.run(&["push", "--force", repo_url, &refspec], &[]).await?;

    {
        let git = git.clone();
        let repo_url = repo_url.to_string();
        let branch = branch.to_string();
        teardown
            .register(format!("delete branch {}", branch), move || async move {
                git.run(&["push", &repo_url, "--delete", &branch], &[])
                    .await
                    .map(|_| ())
            })
            .await;
    }

    info!("Published branch {}", branch);
    Ok(())
}

/// Git invocation with a detached repository directory
#[derive(Debug, Clone)]
struct GitRepo {
    git_dir: PathBuf,
    work_tree: PathBuf,
}

impl GitRepo {
    fn new(git_dir: PathBuf, work_tree: PathBuf) -> Self {
        Self { git_dir, work_tree }
    }

    async fn run(&self, args: &[&str], envs: &[(&str, String)]) -> Result<String, RunnerError> {
        let mut envs = envs.to_vec();
        envs.push(("GIT_DIR", self.git_dir.display().to_string()));
        envs.push(("GIT_WORK_TREE", self.work_tree.display().to_string()));
        shell::run("git", args, &self.work_tree, &envs).await
    }
}
