//! Composable path predicates for selecting repository files.
//!
//! Every predicate is a plain closure over a repo-relative path such as
//! `src/main/java/App.java`. Predicates are combined with [`combine`], which
//! flattens nested groups and ANDs the result.

use std::fmt;
use std::sync::Arc;

/// A cloneable predicate over repo-relative file paths.
#[derive(Clone)]
pub struct FileFilter(Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl FileFilter {
    pub fn new(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn matches(&self, path: &str) -> bool {
        (self.0)(path)
    }
}

impl fmt::Debug for FileFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FileFilter(..)")
    }
}

/// Either a single predicate or a (possibly nested) list of them.
#[derive(Debug, Clone)]
pub enum FilterGroup {
    One(FileFilter),
    Many(Vec<FilterGroup>),
}

impl From<FileFilter> for FilterGroup {
    fn from(f: FileFilter) -> Self {
        FilterGroup::One(f)
    }
}

impl From<Vec<FileFilter>> for FilterGroup {
    fn from(fs: Vec<FileFilter>) -> Self {
        FilterGroup::Many(fs.into_iter().map(FilterGroup::One).collect())
    }
}

impl From<Vec<FilterGroup>> for FilterGroup {
    fn from(groups: Vec<FilterGroup>) -> Self {
        FilterGroup::Many(groups)
    }
}

impl FilterGroup {
    fn flatten_into(self, out: &mut Vec<FileFilter>) {
        match self {
            FilterGroup::One(f) => out.push(f),
            FilterGroup::Many(groups) => {
                for g in groups {
                    g.flatten_into(out);
                }
            }
        }
    }
}

/// AND together every predicate in `groups`, after flattening.
///
/// An empty input accepts every path.
pub fn combine<I>(groups: I) -> FileFilter
where
    I: IntoIterator,
    I::Item: Into<FilterGroup>,
{
    let mut flat = Vec::new();
    for g in groups {
        g.into().flatten_into(&mut flat);
    }
    FileFilter::new(move |path| flat.iter().all(|f| f.matches(path)))
}

fn ends_with_any(exts: &'static [&'static str]) -> FileFilter {
    FileFilter::new(move |path| exts.iter().any(|ext| path.ends_with(ext)))
}

// ─── Extension filters ───────────────────────────────────

pub fn python_files() -> FileFilter {
    ends_with_any(&[".py"])
}

pub fn java_files() -> FileFilter {
    ends_with_any(&[".java"])
}

pub fn javascript_files() -> FileFilter {
    ends_with_any(&[".js", ".jsx"])
}

pub fn typescript_files() -> FileFilter {
    ends_with_any(&[".ts", ".tsx"])
}

pub fn json_files() -> FileFilter {
    ends_with_any(&[".json"])
}

pub fn markdown_files() -> FileFilter {
    ends_with_any(&[".md", ".markdown"])
}

pub fn yaml_files() -> FileFilter {
    ends_with_any(&[".yml", ".yaml"])
}

// ─── Exclusion filters ───────────────────────────────────

pub fn not_tests() -> FileFilter {
    FileFilter::new(|path| !path.starts_with("tests/") && !path.starts_with("test/"))
}

pub fn not_node_modules() -> FileFilter {
    FileFilter::new(|path| !path.contains("node_modules"))
}

pub fn not_dist() -> FileFilter {
    FileFilter::new(|path| !path.starts_with("dist/") && !path.starts_with("build/"))
}

pub fn not_cache() -> FileFilter {
    FileFilter::new(|path| {
        !["__pycache__", ".cache", "cache/"]
            .iter()
            .any(|dir| path.contains(dir))
    })
}

pub fn not_hidden() -> FileFilter {
    FileFilter::new(|path| !path.split('/').any(|part| part.starts_with('.')))
}

pub fn not_venv() -> FileFilter {
    FileFilter::new(|path| {
        !["venv/", "env/", ".env/", "virtualenv/"]
            .iter()
            .any(|dir| path.contains(dir))
    })
}

// ─── Inclusion filters ───────────────────────────────────

fn normalize_folder(folder: &str) -> String {
    format!("{}/", folder.trim_end_matches('/'))
}

/// Files under `folder`. An empty folder name selects the whole repository.
pub fn folder_only(folder: &str) -> FileFilter {
    if folder.trim_matches('/').is_empty() {
        return FileFilter::new(|_| true);
    }
    let prefix = normalize_folder(folder);
    FileFilter::new(move |path| path.starts_with(&prefix))
}

/// Files under any of `folders`.
pub fn folders_only<S: AsRef<str>>(folders: &[S]) -> FileFilter {
    let prefixes: Vec<String> = folders
        .iter()
        .map(|f| normalize_folder(f.as_ref()))
        .collect();
    FileFilter::new(move |path| prefixes.iter().any(|p| path.starts_with(p)))
}

/// A file with exactly this name, in any folder.
pub fn file_only(filename: &str) -> FileFilter {
    let name = filename.to_string();
    let suffix = format!("/{filename}");
    FileFilter::new(move |path| path == name || path.ends_with(&suffix))
}

// ─── Presets ─────────────────────────────────────────────

pub fn python_source_only() -> Vec<FileFilter> {
    vec![python_files(), not_tests(), not_cache(), not_hidden()]
}

pub fn web_source_files() -> Vec<FileFilter> {
    vec![
        ends_with_any(&[".js", ".jsx", ".ts", ".tsx", ".css", ".html"]),
        not_node_modules(),
        not_dist(),
    ]
}
