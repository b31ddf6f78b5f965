// Repository locator resolution: turns an explicit url or the manifest's
// `repository` field into the `git@host:author/repo.git` form the API accepts.
// Nothing here fails loudly; every problem becomes a `Diagnostic`.

use crate::error::Diagnostic;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

static LOCATOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^git@[A-Za-z0-9_.-]+:[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+\.git$").expect("locator pattern is valid")
});

const GIT_SUFFIX: &str = ".git";

/// A validated repository url such as `git@github.com:homer0/wootils.git`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLocator(String);

impl RepositoryLocator {
    /// Accepts `url` only if it already has the canonical form.
    pub fn parse(url: &str) -> Option<Self> {
        LOCATOR_PATTERN.is_match(url).then(|| RepositoryLocator(url.to_string()))
    }

    /// Builds a GitHub locator from an author and a repository name. A
    /// trailing `.git` on the repository is dropped before formatting.
    pub fn from_parts(author: &str, repository: &str) -> Option<Self> {
        let repository = repository.strip_suffix(GIT_SUFFIX).unwrap_or(repository);
        Self::parse(&format!("git@github.com:{author}/{repository}{GIT_SUFFIX}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepositoryLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a resolution: the locator, if any, and the diagnostics to show
/// in the order they were raised.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    pub locator: Option<RepositoryLocator>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    repository: Option<RepositoryField>,
}

/// The manifest's `repository` property, in any of the shapes npm allows.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RepositoryField {
    Shorthand(String),
    Record {
        #[serde(rename = "type")]
        kind: Option<String>,
        url: Option<String>,
    },
    Flag(bool),
    Number(serde_json::Number),
    Other(serde::de::IgnoredAny),
}

/// Resolves the repository locator.
///
/// An `explicit` url is validated as is. Without one, the manifest at
/// `manifest_path` is read; any failure on that path is followed by
/// `InvalidPackageUrl`.
pub fn resolve(explicit: Option<&str>, manifest_path: &Path) -> Resolution {
    if let Some(url) = explicit {
        return match RepositoryLocator::parse(url) {
            Some(locator) => Resolution { locator: Some(locator), diagnostics: Vec::new() },
            None => Resolution { locator: None, diagnostics: vec![Diagnostic::InvalidUrl] },
        };
    }

    match from_manifest(manifest_path) {
        Ok(locator) => {
            debug!(%locator, manifest = %manifest_path.display(), "Resolved repository from manifest");
            Resolution { locator: Some(locator), diagnostics: Vec::new() }
        }
        Err(cause) => Resolution {
            locator: None,
            diagnostics: vec![cause, Diagnostic::InvalidPackageUrl],
        },
    }
}

fn from_manifest(manifest_path: &Path) -> Result<RepositoryLocator, Diagnostic> {
    let manifest = read_manifest(manifest_path).ok_or(Diagnostic::NoPackage)?;
    match manifest.repository {
        None => Err(Diagnostic::NoRepository),
        Some(RepositoryField::Shorthand(value)) if value.is_empty() => Err(Diagnostic::NoRepository),
        Some(RepositoryField::Shorthand(value)) => from_shorthand(&value),
        Some(RepositoryField::Record { kind, url }) => from_record(kind.as_deref(), url.as_deref()),
        Some(RepositoryField::Flag(false)) => Err(Diagnostic::NoRepository),
        Some(RepositoryField::Number(n)) if n.as_f64() == Some(0.0) => Err(Diagnostic::NoRepository),
        Some(RepositoryField::Flag(true) | RepositoryField::Number(_) | RepositoryField::Other(_)) => {
            Err(Diagnostic::OnlyGithub)
        }
    }
}

// Unreadable and unparsable manifests are treated the same way.
fn read_manifest(manifest_path: &Path) -> Option<Manifest> {
    let contents = match std::fs::read_to_string(manifest_path) {
        Ok(contents) => contents,
        Err(e) => {
            debug!(error = %e, manifest = %manifest_path.display(), "Manifest could not be read");
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            debug!(error = %e, manifest = %manifest_path.display(), "Manifest is not valid JSON");
            None
        }
    }
}

fn from_shorthand(value: &str) -> Result<RepositoryLocator, Diagnostic> {
    match value.split('/').collect::<Vec<_>>().as_slice() {
        [author, repository] if !author.is_empty() && !repository.is_empty() => {
            RepositoryLocator::from_parts(author, repository).ok_or(Diagnostic::InvalidFormat)
        }
        _ => Err(Diagnostic::InvalidFormat),
    }
}

fn from_record(kind: Option<&str>, url: Option<&str>) -> Result<RepositoryLocator, Diagnostic> {
    let url = match (kind, url) {
        (Some("git"), Some(url)) if url.contains("github") => url,
        _ => return Err(Diagnostic::OnlyGithub),
    };
    let mut segments = url.rsplit('/');
    match (segments.next(), segments.next()) {
        (Some(repository), Some(author)) if !repository.is_empty() && !author.is_empty() => {
            RepositoryLocator::from_parts(author, repository).ok_or(Diagnostic::InvalidFormat)
        }
        _ => Err(Diagnostic::InvalidFormat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn manifest(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp manifest");
        file.write_all(contents.as_bytes()).expect("write temp manifest");
        file
    }

    fn resolve_manifest(contents: &str) -> Resolution {
        let file = manifest(contents);
        resolve(None, file.path())
    }

    #[test]
    fn accepts_a_canonical_explicit_url() {
        let resolution = resolve(Some("git@github.com:homer0/wootils.git"), Path::new("missing.json"));
        assert_eq!(
            resolution.locator.as_ref().map(RepositoryLocator::as_str),
            Some("git@github.com:homer0/wootils.git")
        );
        assert!(resolution.diagnostics.is_empty());
    }

    #[test]
    fn accepts_hosts_other_than_github() {
        assert!(RepositoryLocator::parse("git@gitlab.example.com:team/docs-site.git").is_some());
    }

    #[test]
    fn rejects_malformed_explicit_urls_with_one_diagnostic() {
        for url in [
            "git:homer0/jimpex.git",
            "https://github.com/homer0/jimpex.git",
            "git@github.com:homer0/jimpex",
            "git@github.com:homer0/jim/pex.git",
            "git@github.com:/jimpex.git",
            "git@github.com:héllo/wörld.git",
            "git@github.com:a/٣٤.git",
            "",
        ] {
            let resolution = resolve(Some(url), Path::new("missing.json"));
            assert_eq!(resolution.locator, None, "{url} should be rejected");
            assert_eq!(resolution.diagnostics, vec![Diagnostic::InvalidUrl], "{url}");
        }
    }

    #[test]
    fn builds_locator_from_shorthand_repository() {
        let resolution = resolve_manifest(r#"{"repository": "a/b"}"#);
        assert_eq!(resolution.locator.map(|l| l.to_string()), Some("git@github.com:a/b.git".into()));
        assert!(resolution.diagnostics.is_empty());
    }

    #[test]
    fn builds_locator_from_git_record() {
        let resolution =
            resolve_manifest(r#"{"repository": {"type": "git", "url": "https://github.com/a/b.git"}}"#);
        assert_eq!(resolution.locator.map(|l| l.to_string()), Some("git@github.com:a/b.git".into()));
    }

    #[test]
    fn record_without_git_suffix_gets_one() {
        let resolution =
            resolve_manifest(r#"{"repository": {"type": "git", "url": "github.com/homer0/parserror"}}"#);
        assert_eq!(
            resolution.locator.map(|l| l.to_string()),
            Some("git@github.com:homer0/parserror.git".into())
        );
    }

    #[test]
    fn missing_manifest_reports_no_package() {
        let dir = tempfile::tempdir().expect("temp dir");
        let resolution = resolve(None, &dir.path().join("package.json"));
        assert_eq!(resolution.locator, None);
        assert_eq!(resolution.diagnostics, vec![Diagnostic::NoPackage, Diagnostic::InvalidPackageUrl]);
    }

    #[test]
    fn unparsable_manifest_reports_no_package() {
        let resolution = resolve_manifest("{ not json");
        assert_eq!(resolution.diagnostics, vec![Diagnostic::NoPackage, Diagnostic::InvalidPackageUrl]);
    }

    #[test]
    fn manifest_without_repository() {
        for contents in [
            r#"{"name": "docs"}"#,
            r#"{"repository": null}"#,
            r#"{"repository": ""}"#,
            r#"{"repository": false}"#,
            r#"{"repository": 0}"#,
        ] {
            let resolution = resolve_manifest(contents);
            assert_eq!(resolution.locator, None);
            assert_eq!(
                resolution.diagnostics,
                vec![Diagnostic::NoRepository, Diagnostic::InvalidPackageUrl],
                "{contents}"
            );
        }
    }

    #[test]
    fn shorthand_needs_exactly_two_parts() {
        for contents in [
            r#"{"repository": "homer0"}"#,
            r#"{"repository": "homer0/projext/extra"}"#,
            r#"{"repository": "homer0/"}"#,
            r#"{"repository": "a b/c"}"#,
        ] {
            let resolution = resolve_manifest(contents);
            assert_eq!(resolution.locator, None);
            assert_eq!(
                resolution.diagnostics,
                vec![Diagnostic::InvalidFormat, Diagnostic::InvalidPackageUrl],
                "{contents}"
            );
        }
    }

    #[test]
    fn non_github_records_are_refused() {
        for contents in [
            r#"{"repository": {"type": "svn"}}"#,
            r#"{"repository": {"type": "git", "url": "https://gitlab.com/a/b.git"}}"#,
            r#"{"repository": {"url": "https://github.com/a/b.git"}}"#,
            r#"{"repository": 42}"#,
            r#"{"repository": true}"#,
            r#"{"repository": ["a/b"]}"#,
        ] {
            let resolution = resolve_manifest(contents);
            assert_eq!(resolution.locator, None);
            assert_eq!(
                resolution.diagnostics,
                vec![Diagnostic::OnlyGithub, Diagnostic::InvalidPackageUrl],
                "{contents}"
            );
        }
    }
}
