use std::{io, path::PathBuf};

use miette::Report;

const RECONCILE_CONTEXT: &str = "while reconciling schema files with the database";
const CATALOG_CONTEXT: &str = "while reading the database catalog";

pub(crate) type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug)]
pub(crate) enum CliError {
    EmptyTarget,
    UnsupportedTarget {
        path: PathBuf,
    },
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    /// A schema file that could not be loaded.
    Source {
        path: PathBuf,
        source: sqlsync_core::Error,
    },
    Catalog(sqlsync_core::Error),
    Core(sqlsync_core::Error),
}

impl From<sqlsync_core::Error> for CliError {
    fn from(value: sqlsync_core::Error) -> Self {
        Self::Core(value)
    }
}

impl From<sqlsync_core::ContractViolation> for CliError {
    fn from(value: sqlsync_core::ContractViolation) -> Self {
        Self::Core(value.into())
    }
}

impl CliError {
    /// `2` for usage problems, matching clap; `1` for everything else.
    pub(crate) fn exit_code(&self) -> u8 {
        match self {
            Self::EmptyTarget | Self::UnsupportedTarget { .. } => 2,
            _ => 1,
        }
    }
}

pub(crate) fn render_runtime_error(error: CliError) -> String {
    match error {
        CliError::EmptyTarget => {
            "[usage] the name of the target file/directory cannot be empty".to_string()
        }
        CliError::UnsupportedTarget { path } => format!(
            "[usage] target `{}` is neither a file nor a directory",
            path.display()
        ),
        CliError::Io {
            action,
            path,
            source,
        } => {
            let context = format!("while {action} `{}`", path.display());
            format!("[io] {}", report_with_context(source, context))
        }
        CliError::Source { path, source } => {
            let category = core_category(&source);
            let context = format!("while loading schema file `{}`", path.display());
            format!("[{category}] {}", report_with_context(source, context))
        }
        CliError::Catalog(source) => {
            let category = core_category(&source);
            format!("[{category}] {}", report_with_context(source, CATALOG_CONTEXT))
        }
        CliError::Core(source) => {
            let category = core_category(&source);
            format!("[{category}] {}", report_with_context(source, RECONCILE_CONTEXT))
        }
    }
}

fn report_with_context<E, C>(source: E, context: C) -> Report
where
    E: std::error::Error + Send + Sync + 'static,
    C: Into<String>,
{
    let error = anyhow::Error::new(source).context(context.into());
    miette::miette!("{error:#}")
}

fn core_category(error: &sqlsync_core::Error) -> &'static str {
    match error {
        sqlsync_core::Error::Parse(_) => "parse",
        sqlsync_core::Error::Contract(_) => "contract",
        sqlsync_core::Error::Execute(_) => "execute",
    }
}
