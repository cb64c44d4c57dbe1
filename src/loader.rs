//! Template source acquisition.
//! Resolves the TEMPLATE argument to a local directory: either an existing
//! path, or a shallow clone of a git repository into a temporary directory
//! that is removed when the returned [`LoadedTemplate`] is dropped.
use crate::error::{Error, Result};
use log::debug;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use url::Url;

/// Represents the source location of a template.
#[derive(Debug, PartialEq, Eq)]
pub enum TemplateSource {
    /// Local filesystem template path
    FileSystem(PathBuf),
    /// Git repository URL (HTTPS or SSH)
    Git(String),
}

impl std::fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateSource::FileSystem(path) => {
                write!(f, "local path: '{}'", path.display())
            }
            TemplateSource::Git(repo) => write!(f, "git repository: '{repo}'"),
        }
    }
}

impl TemplateSource {
    /// Creates a TemplateSource from a string path or URL.
    ///
    /// `gh://owner/repo` is shorthand for `https://github.com/owner/repo`.
    pub fn from_string(s: &str) -> Self {
        if let Some(rest) = s.strip_prefix("gh://") {
            let repo = rest.split('?').next().unwrap_or(rest).trim_end_matches('/');
            return Self::Git(format!("https://github.com/{repo}"));
        }

        if let Ok(url) = Url::parse(s) {
            if matches!(url.scheme(), "https" | "http" | "git" | "ssh") {
                return Self::Git(s.to_string());
            }
        }

        // SSH shorthand, e.g. git@github.com:user/repo.git
        if s.starts_with("git@") {
            return Self::Git(s.to_string());
        }

        Self::FileSystem(PathBuf::from(s))
    }
}

/// A template materialized on the local filesystem.
///
/// Holds the temporary checkout of a remote template, if any; dropping the
/// value removes it, whether generation succeeded or not.
#[derive(Debug)]
pub struct LoadedTemplate {
    path: PathBuf,
    _checkout: Option<TempDir>,
}

impl LoadedTemplate {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the template lives in a temporary checkout.
    pub fn is_temporary(&self) -> bool {
        self._checkout.is_some()
    }
}

/// Trait for loading templates from different sources.
pub trait TemplateLoader {
    fn load(&self) -> Result<LoadedTemplate>;
}

/// Loader for templates from the local filesystem.
pub struct LocalLoader<P: AsRef<Path>> {
    path: P,
}

impl<P: AsRef<Path>> LocalLoader<P> {
    pub fn new(path: P) -> Self {
        Self { path }
    }
}

impl<P: AsRef<Path>> TemplateLoader for LocalLoader<P> {
    /// # Errors
    /// * `Error::TemplateSourceError` if the path is missing or not a directory
    fn load(&self) -> Result<LoadedTemplate> {
        let path = self.path.as_ref();
        if !path.exists() {
            return Err(Error::TemplateSourceError(format!(
                "template path '{}' does not exist",
                path.display()
            )));
        }
        if !path.is_dir() {
            return Err(Error::TemplateSourceError(format!(
                "template path '{}' must be a directory",
                path.display()
            )));
        }
        Ok(LoadedTemplate { path: path.to_path_buf(), _checkout: None })
    }
}

/// Loader for templates from git repositories.
pub struct GitLoader<S: AsRef<str>> {
    repo: S,
}

impl<S: AsRef<str>> GitLoader<S> {
    pub fn new(repo: S) -> Self {
        Self { repo }
    }
}

impl<S: AsRef<str>> TemplateLoader for GitLoader<S> {
    /// Shallow-clones the repository into a fresh temporary directory.
    fn load(&self) -> Result<LoadedTemplate> {
        let repo_url = self.repo.as_ref();
        let checkout = tempfile::Builder::new().prefix("cutr-").tempdir()?;

        debug!("Cloning '{}' into '{}'.", repo_url, checkout.path().display());

        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.credentials(|_url, username_from_url, allowed_types| {
            let username = username_from_url.unwrap_or("git");
            if allowed_types.contains(git2::CredentialType::SSH_KEY) {
                if let Ok(cred) = git2::Cred::ssh_key_from_agent(username) {
                    return Ok(cred);
                }
                if let Some(home) = std::env::var_os("HOME") {
                    let key = Path::new(&home).join(".ssh").join("id_rsa");
                    return git2::Cred::ssh_key(username, None, &key, None);
                }
            }
            git2::Cred::default()
        });

        let mut fetch_opts = git2::FetchOptions::new();
        fetch_opts.remote_callbacks(callbacks);
        fetch_opts.depth(1);

        let mut builder = git2::build::RepoBuilder::new();
        builder.fetch_options(fetch_opts);
        builder.clone(repo_url, checkout.path())?;

        Ok(LoadedTemplate { path: checkout.path().to_path_buf(), _checkout: Some(checkout) })
    }
}

/// Returns the template directory for the provided template argument.
pub fn load_template(template: &str) -> Result<LoadedTemplate> {
    let source = TemplateSource::from_string(template);
    debug!("Using template from the {source}");

    let loader: Box<dyn TemplateLoader> = match source {
        TemplateSource::Git(repo) => Box::new(GitLoader::new(repo)),
        TemplateSource::FileSystem(path) => Box::new(LocalLoader::new(path)),
    };

    loader.load()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_source_display() {
        let fs_source = TemplateSource::FileSystem(PathBuf::from("/path/to/template"));
        assert_eq!(format!("{fs_source}"), "local path: '/path/to/template'");

        let git_source = TemplateSource::Git("git@github.com:user/repo".to_string());
        assert_eq!(format!("{git_source}"), "git repository: 'git@github.com:user/repo'");
    }

    #[test]
    fn test_template_source_from_string() {
        assert_eq!(
            TemplateSource::from_string("https://github.com/user/repo.git"),
            TemplateSource::Git("https://github.com/user/repo.git".to_string())
        );
        assert_eq!(
            TemplateSource::from_string("git@github.com:user/repo.git"),
            TemplateSource::Git("git@github.com:user/repo.git".to_string())
        );
        assert_eq!(
            TemplateSource::from_string("gh://user/repo/?ref=main"),
            TemplateSource::Git("https://github.com/user/repo".to_string())
        );
        assert_eq!(
            TemplateSource::from_string("./local/path"),
            TemplateSource::FileSystem(PathBuf::from("./local/path"))
        );
    }
}
