//! Translation of caller-facing jobs into engine wire requests.
//!
//! The engine knows nothing about logical file names. Every file supplied
//! with a [`Job`] is transmitted as a positional resource after the `job`
//! header frame, and references to those files are rewritten to the
//! placeholder form `job-resource:<index>`:
//!
//! ```text
//! job  {"input":{"src":"job-resource:0","styles":["job-resource:1"]},"job-resource-count":2}
//! dat  <bytes of resource 0>
//! dat  <bytes of resource 1>
//! ```
//!
//! Indices follow the iteration order of [`Job::files`]. Callers must not
//! assume a file keeps the same index across requests.

use serde::Serialize;

use crate::error::JobError;
use crate::job::{Input, Job, Metadata, PdfOptions};

/// Prefix of a positional resource reference.
pub const RESOURCE_SCHEME: &str = "job-resource:";

/// Formats the placeholder referencing resource `index`.
///
/// ```
/// assert_eq!(princepdf::request::resource_placeholder(3), "job-resource:3");
/// ```
#[must_use]
pub fn resource_placeholder(index: usize) -> String {
    format!("{RESOURCE_SCHEME}{index}")
}

/// Engine-facing projection of a [`Job`].
///
/// The header fields serialise to the `job` frame payload; the resources
/// borrow the job's file contents and are sent as `dat` frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireRequest<'job> {
    input: Input,
    #[serde(skip_serializing_if = "Option::is_none")]
    pdf: Option<PdfOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Metadata>,
    #[serde(rename = "job-resource-count")]
    resource_count: usize,
    #[serde(skip)]
    resources: Vec<&'job [u8]>,
}

impl<'job> WireRequest<'job> {
    /// Builds the wire request for `job` without modifying it.
    ///
    /// References that match a key of [`Job::files`] are replaced with the
    /// placeholder of that file's resource index; all other references are
    /// left for the engine to resolve.
    #[must_use]
    pub fn build(job: &'job Job) -> Self {
        let names: Vec<&str> = job.files.keys().map(String::as_str).collect();
        let resources: Vec<&'job [u8]> = job.files.values().map(Vec::as_slice).collect();
        let index_of = |reference: &str| names.iter().position(|name| *name == reference);

        let mut input = job.input.clone();
        if let Some(index) = input.src.as_deref().and_then(index_of) {
            input.src = Some(resource_placeholder(index));
        }
        rewrite_all(&mut input.styles, index_of);
        rewrite_all(&mut input.scripts, index_of);

        let mut pdf = job.pdf.clone();
        for attachment in pdf.iter_mut().flat_map(|options| options.attach.iter_mut()) {
            if let Some(index) = attachment.filename.as_deref().and_then(index_of) {
                attachment.url = Some(resource_placeholder(index));
            }
        }

        Self {
            input,
            pdf,
            metadata: job.metadata.clone(),
            resource_count: resources.len(),
            resources,
        }
    }

    /// The rewritten input descriptor.
    #[must_use]
    pub const fn input(&self) -> &Input {
        &self.input
    }

    /// The PDF options with attachment references rewritten.
    #[must_use]
    pub const fn pdf(&self) -> Option<&PdfOptions> {
        self.pdf.as_ref()
    }

    /// The metadata, unchanged.
    #[must_use]
    pub const fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// Declared number of `dat` frames following the header.
    #[must_use]
    pub const fn resource_count(&self) -> usize {
        self.resource_count
    }

    /// Resource payloads in transmission order.
    #[must_use]
    pub fn resources(&self) -> &[&'job [u8]] {
        &self.resources
    }

    /// Serialises the `job` frame payload.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Build`] if serialisation fails.
    pub fn to_json(&self) -> Result<Vec<u8>, JobError> {
        serde_json::to_vec(self).map_err(JobError::build)
    }
}

fn rewrite_all(references: &mut [String], index_of: impl Fn(&str) -> Option<usize>) {
    for reference in references {
        if let Some(index) = index_of(reference.as_str()) {
            *reference = resource_placeholder(index);
        }
    }
}

#[cfg(test)]
mod tests;
