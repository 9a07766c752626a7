use std::{
    fs,
    path::{Path, PathBuf},
};

use sqlsync_core::{Schema, SchemaObject, SourceId};
use tracing::debug;

use crate::error_presentation::{CliError, CliResult};

/// Where the schema files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    SingleFile(PathBuf),
    Directory(PathBuf),
}

/// Decides which source receives an object that only exists in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Placement {
    SingleFile(SourceId),
    PerObject { dir: PathBuf },
}

impl Placement {
    pub(crate) fn source_for(&self, object: &SchemaObject) -> SourceId {
        match self {
            Self::SingleFile(source) => source.clone(),
            Self::PerObject { dir } => {
                source_id(&dir.join(format!("{}.sql", file_stem(&object.name))))
            }
        }
    }
}

/// Keeps an object name inside its directory: separators and drive markers
/// become `_`.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '\0' => '_',
            other => other,
        })
        .collect()
}

/// Resolves `dest` to a target, creating it when missing: an empty file when
/// it ends in `.sql`, a directory otherwise.
pub(crate) fn make_target(dest: &Path) -> CliResult<Target> {
    if dest.as_os_str().is_empty() {
        return Err(CliError::EmptyTarget);
    }

    if !dest.exists() {
        if is_sql_file(dest) {
            if let Some(parent) = dest.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent).map_err(|source| io_error("creating", parent, source))?;
            }
            fs::write(dest, "").map_err(|source| io_error("creating", dest, source))?;
        } else {
            fs::create_dir_all(dest).map_err(|source| io_error("creating", dest, source))?;
        }
        debug!(target = %dest.display(), "created missing target");
    }

    let metadata = fs::metadata(dest).map_err(|source| io_error("inspecting", dest, source))?;
    if metadata.is_dir() {
        Ok(Target::Directory(dest.to_path_buf()))
    } else if metadata.is_file() {
        Ok(Target::SingleFile(dest.to_path_buf()))
    } else {
        Err(CliError::UnsupportedTarget {
            path: dest.to_path_buf(),
        })
    }
}

impl Target {
    pub(crate) fn placement(&self) -> Placement {
        match self {
            Self::SingleFile(path) => Placement::SingleFile(source_id(path)),
            Self::Directory(dir) => Placement::PerObject { dir: dir.clone() },
        }
    }

    /// Loads every source of the target into one schema. A directory
    /// contributes its `*.sql` files in file-name order.
    pub(crate) fn read_schema(&self) -> CliResult<Schema> {
        let mut schema = Schema::new();
        for path in self.source_paths()? {
            let text =
                fs::read_to_string(&path).map_err(|source| io_error("reading", &path, source))?;
            let count = schema
                .load_source(source_id(&path), &text)
                .map_err(|source| CliError::Source {
                    path: path.clone(),
                    source,
                })?;
            debug!(path = %path.display(), objects = count, "loaded schema file");
        }
        Ok(schema)
    }

    fn source_paths(&self) -> CliResult<Vec<PathBuf>> {
        match self {
            Self::SingleFile(path) => Ok(vec![path.clone()]),
            Self::Directory(dir) => {
                let entries =
                    fs::read_dir(dir).map_err(|source| io_error("listing", dir, source))?;
                let mut paths = Vec::new();
                for entry in entries {
                    let path = entry
                        .map_err(|source| io_error("listing", dir, source))?
                        .path();
                    if path.is_file() && is_sql_file(&path) {
                        paths.push(path);
                    }
                }
                paths.sort();
                Ok(paths)
            }
        }
    }
}

/// Serializes each changed source back to its file. Returns the paths in
/// the order given; with `dry_run` nothing is written.
pub(crate) fn write_sources(
    schema: &Schema,
    sources: &[SourceId],
    dry_run: bool,
) -> CliResult<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(sources.len());
    for source in sources {
        let path = PathBuf::from(source.as_str());
        let Some(text) = schema.render_source(source) else {
            continue;
        };
        if !dry_run {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent).map_err(|source| io_error("creating", parent, source))?;
            }
            fs::write(&path, text).map_err(|source| io_error("writing", &path, source))?;
        }
        written.push(path);
    }
    Ok(written)
}

fn source_id(path: &Path) -> SourceId {
    SourceId::new(path.to_string_lossy())
}

fn is_sql_file(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension == "sql")
}

fn io_error(action: &'static str, path: &Path, source: std::io::Error) -> CliError {
    CliError::Io {
        action,
        path: path.to_path_buf(),
        source,
    }
}
