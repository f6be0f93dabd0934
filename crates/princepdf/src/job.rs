//! Caller-facing job description.
//!
//! A [`Job`] names its auxiliary files by logical name: the input source,
//! style sheets, scripts, and attachments may all refer to keys of
//! [`Job::files`]. The pool translates those names into positional resource
//! references before anything reaches the engine (see
//! [`WireRequest`](crate::request::WireRequest)).
//!
//! The JSON shape mirrors the engine's `job` frame: kebab-case keys, with
//! empty strings, empty lists, and `false` flags omitted. File contents are
//! never part of the JSON form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A rendering job submitted to the pool.
///
/// # Example
///
/// ```
/// use princepdf::job::{Input, Job};
///
/// let job = Job::new(Input::from_src("invoice.html"))
///     .with_file("invoice.html", b"<h1>Invoice</h1>".to_vec());
/// assert_eq!(job.files.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Document source and processing flags.
    pub input: Input,
    /// PDF production options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf: Option<PdfOptions>,
    /// Descriptive document metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Auxiliary files keyed by logical name.
    #[serde(skip)]
    pub files: BTreeMap<String, Vec<u8>>,
}

impl Job {
    /// Creates a job rendering `input` with no options or files.
    #[must_use]
    pub fn new(input: Input) -> Self {
        Self {
            input,
            ..Self::default()
        }
    }

    /// Adds (or replaces) a file under its logical name.
    #[must_use]
    pub fn with_file(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.files.insert(name.into(), content.into());
        self
    }

    /// Sets the PDF production options.
    #[must_use]
    pub fn with_pdf(mut self, pdf: PdfOptions) -> Self {
        self.pdf = Some(pdf);
        self
    }

    /// Sets the document metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Input document and processing flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Input {
    /// File name, embedded identifier, or URL of the source document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Input type hint (`html`, `xml`, ...).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Base URL used to resolve relative references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// CSS media type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    /// Style sheets, applied in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub styles: Vec<String>,
    /// Scripts, executed in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scripts: Vec<String>,
    /// Apply the engine's default style sheet.
    #[serde(default, skip_serializing_if = "is_false")]
    pub default_style: bool,
    /// Apply author style sheets.
    #[serde(default, skip_serializing_if = "is_false")]
    pub author_style: bool,
    /// Run document scripts.
    #[serde(default, skip_serializing_if = "is_false")]
    pub javascript: bool,
    /// Upper bound on layout passes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_passes: Option<u32>,
    /// Render iframes.
    #[serde(default, skip_serializing_if = "is_false")]
    pub iframes: bool,
    /// Process XInclude directives.
    #[serde(default, skip_serializing_if = "is_false")]
    pub xinclude: bool,
    /// Resolve XML external entities.
    #[serde(default, skip_serializing_if = "is_false")]
    pub xml_external_entities: bool,
}

impl Input {
    /// Creates an input pointing at `src`.
    #[must_use]
    pub fn from_src(src: impl Into<String>) -> Self {
        Self {
            src: Some(src.into()),
            ..Self::default()
        }
    }

    /// Appends a style sheet reference.
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.styles.push(style.into());
        self
    }

    /// Appends a script reference.
    #[must_use]
    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.scripts.push(script.into());
        self
    }
}

/// PDF production options, passed to the engine as-is apart from
/// attachment reference rewriting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PdfOptions {
    /// Colour handling mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_options: Option<String>,
    /// Embed fonts in the output.
    #[serde(default, skip_serializing_if = "is_false")]
    pub embed_fonts: bool,
    /// Subset embedded fonts.
    #[serde(default, skip_serializing_if = "is_false")]
    pub subset_fonts: bool,
    /// Synthesise bold/italic faces when missing.
    #[serde(default, skip_serializing_if = "is_false")]
    pub artificial_fonts: bool,
    /// Force identity encoding for fonts.
    #[serde(default, skip_serializing_if = "is_false")]
    pub force_identity_encoding: bool,
    /// Compress content streams.
    #[serde(default, skip_serializing_if = "is_false")]
    pub compress: bool,
    /// Use PDF object streams.
    #[serde(default, skip_serializing_if = "is_false")]
    pub object_streams: bool,
    /// Encryption settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypt: Option<Encrypt>,
    /// PDF profile (`PDF/A-3b`, `PDF/UA-1`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_profile: Option<String>,
    /// Output intent ICC profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_output_intent: Option<String>,
    /// Fallback CMYK ICC profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_cmyk_profile: Option<String>,
    /// Colour conversion mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_conversion: Option<String>,
    /// Script run when the PDF is opened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_script: Option<String>,
    /// Document identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_id: Option<String>,
    /// Document language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_lang: Option<String>,
    /// XMP metadata file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_xmp: Option<String>,
    /// Embed XML metadata.
    #[serde(default, skip_serializing_if = "is_false")]
    pub pdf_xml_metadata: bool,
    /// Tagged PDF mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagged_pdf: Option<String>,
    /// Embedded file attachments, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attach: Vec<Attachment>,
}

/// PDF encryption settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Encrypt {
    /// Key size in bits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_bits: Option<u32>,
    /// Password required to open the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_password: Option<String>,
    /// Password granting full permissions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_password: Option<String>,
    /// Disallow printing.
    #[serde(default, skip_serializing_if = "is_false")]
    pub disallow_print: bool,
    /// Disallow modification.
    #[serde(default, skip_serializing_if = "is_false")]
    pub disallow_modify: bool,
    /// Disallow copying.
    #[serde(default, skip_serializing_if = "is_false")]
    pub disallow_copy: bool,
    /// Disallow annotation.
    #[serde(default, skip_serializing_if = "is_false")]
    pub disallow_annotate: bool,
    /// Allow copying for accessibility tools.
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_copy_for_accessibility: bool,
    /// Allow document assembly.
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_assembly: bool,
}

/// A file embedded in the output PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Where the engine reads the attachment from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// File name shown in the PDF; also the logical file name looked up in
    /// [`Job::files`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Human readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Relationship label (`Source`, `Data`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

impl Attachment {
    /// Creates an attachment backed by the job file `filename`.
    #[must_use]
    pub fn from_file(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Self::default()
        }
    }
}

/// Descriptive document metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Document subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Document author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Keywords.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    /// Producing application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
}

#[expect(
    clippy::trivially_copy_pass_by_ref,
    reason = "serde's skip_serializing_if passes fields by reference"
)]
const fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    fn input_serialises_kebab_case_and_omits_defaults() {
        let input = Input {
            src: Some("doc.html".into()),
            kind: Some("html".into()),
            default_style: true,
            max_passes: Some(2),
            xml_external_entities: true,
            ..Input::default()
        };

        let value = serde_json::to_value(&input).expect("serialise");

        assert_eq!(
            value,
            json!({
                "src": "doc.html",
                "type": "html",
                "default-style": true,
                "max-passes": 2,
                "xml-external-entities": true,
            })
        );
    }

    #[rstest]
    fn job_json_never_carries_files() {
        let job = Job::new(Input::from_src("a.html")).with_file("a.html", b"<p/>".to_vec());

        let value = serde_json::to_value(&job).expect("serialise");

        assert!(value.get("files").is_none());
        assert!(value.get("pdf").is_none());
    }

    #[rstest]
    fn job_deserialises_from_http_style_json() {
        let job: Job = serde_json::from_value(json!({
            "input": { "src": "https://example.com/invoice.html", "styles": ["a.css", "b.css"] },
            "pdf": { "embed-fonts": true, "attach": [{ "filename": "data.xml" }] },
            "metadata": { "title": "Invoice" }
        }))
        .expect("deserialise");

        assert_eq!(job.input.styles, vec!["a.css", "b.css"]);
        let pdf = job.pdf.expect("pdf options");
        assert!(pdf.embed_fonts);
        assert_eq!(pdf.attach, vec![Attachment::from_file("data.xml")]);
        assert_eq!(
            job.metadata.and_then(|metadata| metadata.title),
            Some("Invoice".to_owned())
        );
        assert!(job.files.is_empty());
    }

    #[rstest]
    fn encrypt_uses_engine_key_names() {
        let encrypt = Encrypt {
            key_bits: Some(128),
            allow_copy_for_accessibility: true,
            ..Encrypt::default()
        };

        let value = serde_json::to_value(&encrypt).expect("serialise");

        assert_eq!(
            value,
            json!({ "key-bits": 128, "allow-copy-for-accessibility": true })
        );
    }
}
