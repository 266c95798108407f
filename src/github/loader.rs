use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;

use super::filters::{combine, FileFilter, FilterGroup};
use crate::error::ConfigError;
use crate::models::{Document, Metadata};

/// Concurrent file downloads per repository.
const FETCH_CONCURRENCY: usize = 8;

/// A validated `owner/name` GitHub repository reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubRepo {
    pub owner: String,
    pub name: String,
}

impl GithubRepo {
    /// Parse `https://github.com/<owner>/<name>[/...]`. Deeper path segments
    /// (e.g. `/tree/main/src`) are ignored.
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(url).map_err(|_| ConfigError::NotGithub(url.to_string()))?;
        if parsed.host_str() != Some("github.com") {
            return Err(ConfigError::NotGithub(url.to_string()));
        }

        let parts: Vec<&str> = parsed
            .path()
            .trim_matches('/')
            .split('/')
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() < 2 {
            return Err(ConfigError::InvalidRepoUrl(url.to_string()));
        }

        Ok(Self {
            owner: parts[0].to_string(),
            name: parts[1].trim_end_matches(".git").to_string(),
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl std::fmt::Display for GithubRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Source of repository files. The production implementation talks to the
/// GitHub REST API; tests plug in fixed file sets.
#[async_trait]
pub trait RepoSource: Send + Sync {
    /// Load every file on `branch` whose path passes `filter`. Each document
    /// carries `path`, `sha` and `source` metadata.
    async fn load_files(
        &self,
        repo: &GithubRepo,
        branch: &str,
        filter: &FileFilter,
    ) -> Result<Vec<Document>>;
}

/// A repository pinned to a branch, with its loaded documents.
pub struct RepoLoader {
    pub repo: GithubRepo,
    pub branch: String,
    documents: Vec<Document>,
}

impl RepoLoader {
    pub fn new(url: &str, branch: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            repo: GithubRepo::parse(url)?,
            branch: branch.to_string(),
            documents: Vec::new(),
        })
    }

    /// Fetch files passing all of `filters`; defaults to Python files when
    /// no filter is given.
    pub async fn load<I>(&mut self, source: &dyn RepoSource, filters: I) -> Result<&[Document]>
    where
        I: IntoIterator,
        I::Item: Into<FilterGroup>,
    {
        let mut groups: Vec<FilterGroup> = filters.into_iter().map(Into::into).collect();
        if groups.is_empty() {
            groups.push(super::filters::python_files().into());
        }
        let filter = combine(groups);

        self.documents = source.load_files(&self.repo, &self.branch, &filter).await?;
        self.log_contents();
        Ok(&self.documents)
    }

    pub fn switch_branch(&mut self, branch: &str) {
        self.branch = branch.to_string();
        self.documents.clear();
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    fn log_contents(&self) {
        tracing::info!(
            "Loaded {} files from {}@{}",
            self.documents.len(),
            self.repo,
            self.branch
        );
        for (i, doc) in self.documents.iter().enumerate() {
            tracing::debug!(
                "  {:3}. {} ({} chars)",
                i + 1,
                doc.meta_str("path").unwrap_or("<unknown>"),
                doc.content.len()
            );
        }
    }
}

// ─── GitHub REST API ─────────────────────────────────────

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
}

pub struct GithubClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl GithubClient {
    pub fn new(client: reqwest::Client, api_url: &str, token: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// `{api_url}/{segments...}`, each segment percent-encoded.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = Url::parse(&self.api_url)
            .with_context(|| format!("Invalid GitHub API URL {}", self.api_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("GitHub API URL {} cannot take a path", self.api_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn contents_url(&self, repo: &GithubRepo, branch: &str, path: &str) -> Result<Url> {
        let mut url = self.endpoint(
            ["repos", repo.owner.as_str(), repo.name.as_str(), "contents"]
                .into_iter()
                .chain(path.split('/')),
        )?;
        url.query_pairs_mut().append_pair("ref", branch);
        Ok(url)
    }

    fn get(&self, url: Url, accept: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", accept)
            .header("User-Agent", concat!("tcm/", env!("CARGO_PKG_VERSION")))
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    async fn list_tree(&self, repo: &GithubRepo, branch: &str) -> Result<Vec<TreeEntry>> {
        let mut url = self.endpoint(
            ["repos", repo.owner.as_str(), repo.name.as_str(), "git", "trees"]
                .into_iter()
                .chain(branch.split('/')),
        )?;
        url.query_pairs_mut().append_pair("recursive", "1");
        let resp = self
            .get(url, "application/vnd.github+json")
            .send()
            .await
            .with_context(|| format!("Failed to list tree for {repo}@{branch}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("GitHub tree API returned {status}: {body}");
        }

        let body: TreeResponse = resp
            .json()
            .await
            .context("Failed to parse GitHub tree response")?;
        if body.truncated {
            tracing::warn!("GitHub tree listing for {repo}@{branch} was truncated");
        }
        Ok(body.tree)
    }

    async fn fetch_file(
        &self,
        repo: &GithubRepo,
        branch: &str,
        entry: TreeEntry,
    ) -> Result<Document> {
        let url = self.contents_url(repo, branch, &entry.path)?;
        let resp = self
            .get(url, "application/vnd.github.raw+json")
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", entry.path))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("GitHub contents API returned {status} for {}: {body}", entry.path);
        }

        let content = resp.text().await?;
        let mut metadata = Metadata::new();
        metadata.insert(
            "source".into(),
            json!(format!(
                "https://github.com/{}/blob/{}/{}",
                repo.full_name(),
                branch,
                entry.path
            )),
        );
        metadata.insert("path".into(), json!(entry.path));
        metadata.insert("sha".into(), json!(entry.sha));
        Ok(Document::with_metadata(content, metadata))
    }
}

#[async_trait]
impl RepoSource for GithubClient {
    async fn load_files(
        &self,
        repo: &GithubRepo,
        branch: &str,
        filter: &FileFilter,
    ) -> Result<Vec<Document>> {
        let entries: Vec<TreeEntry> = self
            .list_tree(repo, branch)
            .await?
            .into_iter()
            .filter(|e| e.kind == "blob" && filter.matches(&e.path))
            .collect();

        tracing::debug!("{} files in {repo}@{branch} match the filter", entries.len());

        stream::iter(entries)
            .map(|entry| self.fetch_file(repo, branch, entry))
            .buffered(FETCH_CONCURRENCY)
            .try_collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::filters::{folder_only, java_files, not_tests};
    use parking_lot::Mutex;

    /// Serves a fixed file set, applying the filter like the real API client.
    struct FixedSource {
        files: Vec<(&'static str, &'static str)>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RepoSource for FixedSource {
        async fn load_files(
            &self,
            repo: &GithubRepo,
            branch: &str,
            filter: &FileFilter,
        ) -> Result<Vec<Document>> {
            self.calls.lock().push(format!("{repo}@{branch}"));
            Ok(self
                .files
                .iter()
                .filter(|(path, _)| filter.matches(path))
                .map(|(path, content)| {
                    let mut metadata = Metadata::new();
                    metadata.insert("path".into(), json!(path));
                    Document::with_metadata(*content, metadata)
                })
                .collect())
        }
    }

    #[test]
    fn test_parse_repo_url() {
        let repo = GithubRepo::parse("https://github.com/alexsun2/TC-Examples").unwrap();
        assert_eq!(repo.owner, "alexsun2");
        assert_eq!(repo.name, "TC-Examples");
        assert_eq!(repo.full_name(), "alexsun2/TC-Examples");
    }

    #[test]
    fn test_parse_ignores_deeper_paths() {
        let repo = GithubRepo::parse("https://github.com/org/project/tree/main/src/").unwrap();
        assert_eq!(repo.full_name(), "org/project");
        let repo = GithubRepo::parse("https://github.com/org/project.git").unwrap();
        assert_eq!(repo.name, "project");
    }

    #[test]
    fn test_parse_rejects_other_hosts() {
        assert!(matches!(
            GithubRepo::parse("https://gitlab.com/org/project"),
            Err(ConfigError::NotGithub(_))
        ));
        assert!(matches!(
            GithubRepo::parse("not a url"),
            Err(ConfigError::NotGithub(_))
        ));
    }

    #[test]
    fn test_parse_rejects_short_paths() {
        assert!(matches!(
            GithubRepo::parse("https://github.com/org"),
            Err(ConfigError::InvalidRepoUrl(_))
        ));
    }

    #[test]
    fn test_contents_url_escapes_path() {
        let client = GithubClient::new(reqwest::Client::new(), "https://api.github.com/", "token");
        let repo = GithubRepo::parse("https://github.com/org/project").unwrap();

        let url = client.contents_url(&repo, "main", "src/Odd #1?.java").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/org/project/contents/src/Odd%20%231%3F.java?ref=main"
        );
        assert_eq!(url.query(), Some("ref=main"));
        assert_eq!(url.fragment(), None);
    }

    #[tokio::test]
    async fn test_loader_applies_combined_filters() {
        let source = FixedSource {
            files: vec![
                ("src/App.java", "class App {}"),
                ("src/app.py", "print()"),
                ("tests/AppTest.java", "class AppTest {}"),
                ("other/Lib.java", "class Lib {}"),
            ],
            calls: Mutex::new(Vec::new()),
        };
        let mut loader = RepoLoader::new("https://github.com/org/project", "dev").unwrap();
        let docs = loader
            .load(&source, vec![folder_only("src"), java_files(), not_tests()])
            .await
            .unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].meta_str("path"), Some("src/App.java"));
        assert_eq!(source.calls.lock().as_slice(), ["org/project@dev"]);
    }

    #[tokio::test]
    async fn test_loader_defaults_to_python() {
        let source = FixedSource {
            files: vec![("src/App.java", "class App {}"), ("src/app.py", "print()")],
            calls: Mutex::new(Vec::new()),
        };
        let mut loader = RepoLoader::new("https://github.com/org/project", "main").unwrap();
        let docs = loader.load(&source, Vec::<FileFilter>::new()).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].meta_str("path"), Some("src/app.py"));

        loader.switch_branch("dev");
        assert!(loader.documents().is_empty());
        assert_eq!(loader.branch, "dev");
    }
}
