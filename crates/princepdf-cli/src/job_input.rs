//! Assembly of a job from command-line arguments.

use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use princepdf::Job;

use crate::cli::RenderArgs;
use crate::errors::CliError;

/// Builds the job described by `args`.
///
/// Each `--file` is keyed by its file name, so a job can refer to
/// `--file assets/invoice.css` as `invoice.css`.
pub(crate) fn build_job(args: &RenderArgs) -> Result<Job, CliError> {
    let mut job = args
        .job
        .as_deref()
        .map_or_else(|| Ok(Job::default()), read_job)?;
    if let Some(src) = &args.src {
        job.input.src = Some(src.clone());
    }
    for path in &args.files {
        let name = path
            .file_name()
            .and_then(OsStr::to_str)
            .ok_or_else(|| CliError::UnnamedFile {
                path: path.clone(),
            })?;
        let content = fs::read(path).map_err(|source| CliError::read_input(path, source))?;
        job.files.insert(name.to_owned(), content);
    }
    if job.input.src.is_none() {
        return Err(CliError::MissingInput);
    }
    Ok(job)
}

fn read_job(path: &Path) -> Result<Job, CliError> {
    let raw = fs::read(path).map_err(|source| CliError::read_input(path, source))?;
    serde_json::from_slice(&raw).map_err(|source| CliError::ParseJob {
        path: path.to_path_buf(),
        source: Arc::new(source),
    })
}

/// Writes the rendered document to `path`, or to `stdout` for `-`.
pub(crate) fn write_output<W: Write>(
    path: &Path,
    pdf: &[u8],
    stdout: &mut W,
) -> Result<(), CliError> {
    let written = if path == Path::new("-") {
        stdout.write_all(pdf).and_then(|()| stdout.flush())
    } else {
        fs::write(path, pdf)
    };
    written.map_err(|source| CliError::WriteOutput {
        path: path.to_path_buf(),
        source: Arc::new(source),
    })
}
