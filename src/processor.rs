//! Template tree rendering.
//!
//! Walks the template directory depth-first and writes the rendered tree into
//! the destination: path segments and text file contents are rendered against
//! the collected values, binary files are copied byte for byte.
//!
//! The first error aborts the walk. Files written before it are left in place.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::config::TemplateSettings;
use crate::error::{Error, Result};
use crate::ignore::IgnoreMatcher;
use crate::template::Template;
use crate::value::Values;

/// Bytes inspected by [`is_binary`].
pub const BINARY_SAMPLE_SIZE: usize = 1024;

/// Share of non-printable bytes above which a sample counts as binary.
pub const NON_PRINTABLE_RATIO: f64 = 0.3;

/// Mode given to written files unless source permissions are kept.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Everything one render call needs.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub source_root: &'a Path,
    pub destination_root: &'a Path,
    pub values: &'a Values,
    pub settings: &'a TemplateSettings,
}

/// Counts of what a render did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub directories: usize,
    pub rendered: usize,
    pub copied: usize,
    pub skipped: usize,
}

/// What happened to a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Rendered,
    Copied,
}

/// Renders `source_root` into `destination_root`, creating it if needed.
pub fn render_tree(
    source_root: &Path,
    destination_root: &Path,
    values: &Values,
    settings: &TemplateSettings,
) -> Result<RenderSummary> {
    Processor::new(RenderRequest { source_root, destination_root, values, settings })?.run()
}

/// Classifies content as binary by sampling its first [`BINARY_SAMPLE_SIZE`] bytes.
///
/// A null byte means binary. Otherwise valid UTF-8 means text. Otherwise the
/// sample is binary when more than [`NON_PRINTABLE_RATIO`] of it falls outside
/// printable ASCII, tab, LF and CR.
pub fn is_binary(content: &[u8]) -> bool {
    let sample = &content[..content.len().min(BINARY_SAMPLE_SIZE)];
    if sample.is_empty() {
        return false;
    }
    if sample.contains(&0) {
        return true;
    }
    if std::str::from_utf8(sample).is_ok() {
        return false;
    }
    let non_printable = sample.iter().filter(|b| !is_printable_or_whitespace(**b)).count();
    non_printable as f64 / sample.len() as f64 > NON_PRINTABLE_RATIO
}

fn is_printable_or_whitespace(b: u8) -> bool {
    (0x20..=0x7E).contains(&b) || b == b'\t' || b == b'\n' || b == b'\r'
}

/// Depth-first renderer for one template tree.
pub struct Processor<'a> {
    request: RenderRequest<'a>,
    ignore: IgnoreMatcher,
    /// Ancestor segments recur in every descendant path; parse them once.
    segments: HashMap<String, Template>,
}

impl<'a> Processor<'a> {
    pub fn new(request: RenderRequest<'a>) -> Result<Self> {
        let ignore = IgnoreMatcher::new(request.settings)?;
        Ok(Self { request, ignore, segments: HashMap::new() })
    }

    pub fn run(mut self) -> Result<RenderSummary> {
        let destination_root = self.request.destination_root;
        fs::create_dir_all(destination_root).map_err(|e| Error::file(destination_root, e))?;

        debug!(
            "Rendering '{}' into '{}'",
            self.request.source_root.display(),
            destination_root.display()
        );

        let mut summary = RenderSummary::default();
        let mut walker =
            WalkDir::new(self.request.source_root).min_depth(1).sort_by_file_name().into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry.map_err(|e| {
                let path = e.path().map_or_else(|| self.request.source_root.to_path_buf(), Path::to_path_buf);
                Error::file(path, io::Error::from(e))
            })?;
            let path = entry.path();
            let relative = self.relative_path(path)?;

            let file_type = entry.file_type();
            if file_type.is_symlink() && path.is_dir() {
                warn!("Skipping symlink to directory '{relative}'");
                summary.skipped += 1;
                continue;
            }
            let is_dir = file_type.is_dir();

            if let Some(reason) = self.ignore.check(&relative, is_dir) {
                debug!("Skipping '{relative}' ({reason:?})");
                summary.skipped += 1;
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }

            let Some(target_relative) = self.render_path(&relative, is_dir)? else {
                debug!("Skipping '{relative}': rendered name is empty");
                summary.skipped += 1;
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            };
            let target = destination_root.join(&target_relative);

            if is_dir {
                fs::create_dir_all(&target).map_err(|e| Error::file(&target, e))?;
                summary.directories += 1;
                continue;
            }

            match self.process_file(path, &relative, &target)? {
                FileAction::Rendered => summary.rendered += 1,
                FileAction::Copied => summary.copied += 1,
            }
        }

        debug!("Render finished: {summary:?}");
        Ok(summary)
    }

    /// `/`-separated path of `path` below the source root.
    fn relative_path(&self, path: &Path) -> Result<String> {
        let relative = path
            .strip_prefix(self.request.source_root)
            .map_err(|e| Error::file(path, io::Error::new(io::ErrorKind::InvalidInput, e)))?;

        let mut parts = Vec::new();
        for component in relative.components() {
            let part = component.as_os_str().to_str().ok_or_else(|| {
                Error::file(
                    path,
                    io::Error::new(io::ErrorKind::InvalidData, "path is not valid UTF-8"),
                )
            })?;
            parts.push(part);
        }
        Ok(parts.join("/"))
    }

    /// Renders every segment of `relative`, dropping those that render empty.
    ///
    /// Returns `None` when nothing is left, or when `relative` names a file
    /// whose own name renders empty.
    pub fn render_path(&mut self, relative: &str, is_dir: bool) -> Result<Option<PathBuf>> {
        let mut target = PathBuf::new();
        let mut base_name_empty = false;
        for segment in relative.split('/') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            if !self.segments.contains_key(segment) {
                let template = Template::parse(segment)
                    .map_err(|e| e.with_context(format!("path '{relative}'")))?;
                self.segments.insert(segment.to_string(), template);
            }
            let rendered = self.segments[segment]
                .render(self.request.values)
                .map_err(|e| e.with_context(format!("path '{relative}'")))?;

            base_name_empty = true;
            for part in rendered.split(['/', '\\']).map(str::trim).filter(|p| !p.is_empty()) {
                match Path::new(part).components().next() {
                    Some(Component::CurDir) => continue,
                    Some(Component::Normal(_)) => {
                        target.push(part);
                        base_name_empty = false;
                    }
                    _ => {
                        return Err(Error::TemplateExecutionError {
                            context: format!("path '{relative}'"),
                            message: format!("rendered segment '{rendered}' escapes the destination"),
                        });
                    }
                }
            }
        }
        if target.as_os_str().is_empty() || (!is_dir && base_name_empty) {
            return Ok(None);
        }
        Ok(Some(target))
    }

    fn process_file(&self, source: &Path, relative: &str, target: &Path) -> Result<FileAction> {
        let metadata = fs::metadata(source).map_err(|e| Error::file(source, e))?;
        let content = fs::read(source).map_err(|e| Error::file(source, e))?;

        let (output, action) = if is_binary(&content) {
            debug!("Copying binary file: {}", target.display());
            (content, FileAction::Copied)
        } else {
            match String::from_utf8(content) {
                Ok(text) => {
                    let template = Template::parse(&text)
                        .map_err(|e| e.with_context(format!("file '{relative}'")))?;
                    let rendered = template
                        .render(self.request.values)
                        .map_err(|e| e.with_context(format!("file '{relative}'")))?;
                    debug!("Writing file: {}", target.display());
                    (rendered.into_bytes(), FileAction::Rendered)
                }
                Err(e) => {
                    debug!("Copying non UTF-8 text file verbatim: {}", target.display());
                    (e.into_bytes(), FileAction::Copied)
                }
            }
        };

        write_file(target, &output)?;
        apply_permissions(target, &metadata, self.request.settings.keep_permissions)?;
        Ok(action)
    }
}

fn write_file(target: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::file(parent, e))?;
    }
    fs::write(target, content).map_err(|e| Error::file(target, e))
}

#[cfg(unix)]
fn apply_permissions(target: &Path, source: &fs::Metadata, keep: bool) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = if keep { source.permissions().mode() & 0o777 } else { DEFAULT_FILE_MODE };
    fs::set_permissions(target, fs::Permissions::from_mode(mode))
        .map_err(|e| Error::file(target, e))
}

#[cfg(not(unix))]
fn apply_permissions(target: &Path, source: &fs::Metadata, keep: bool) -> Result<()> {
    let mut permissions = fs::metadata(target).map_err(|e| Error::file(target, e))?.permissions();
    permissions.set_readonly(keep && source.permissions().readonly());
    fs::set_permissions(target, permissions).map_err(|e| Error::file(target, e))
}
