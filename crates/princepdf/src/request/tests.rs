//! Tests for wire request construction.

use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::job::{Attachment, Input, Job, Metadata, PdfOptions};

#[fixture]
fn styled_job() -> Job {
    Job::new(
        Input::from_src("report.html")
            .with_style("print.css")
            .with_style("https://cdn.example.com/base.css")
            .with_script("charts.js"),
    )
    .with_file("charts.js", b"draw();".to_vec())
    .with_file("print.css", b"body { margin: 0 }".to_vec())
    .with_file("report.html", b"<h1>Report</h1>".to_vec())
}

#[rstest]
fn job_without_files_is_passed_through() {
    let job = Job::new(Input::from_src("https://example.com/a.html").with_style("a.css"));

    let request = WireRequest::build(&job);

    assert_eq!(request.input(), &job.input);
    assert_eq!(request.resource_count(), 0);
    assert!(request.resources().is_empty());
}

#[rstest]
fn single_file_source_becomes_first_resource() {
    let job = Job::new(Input::from_src("data.html")).with_file("data.html", b"<p/>".to_vec());

    let request = WireRequest::build(&job);

    assert_eq!(request.input().src.as_deref(), Some("job-resource:0"));
    assert_eq!(request.resource_count(), 1);
    assert_eq!(request.resources(), &[b"<p/>".as_slice()]);
}

#[rstest]
fn unreferenced_files_still_count_as_resources() {
    let job = Job::new(Input::from_src("https://example.com/a.html"))
        .with_file("logo.png", vec![0x89, 0x50])
        .with_file("unused.css", b"p {}".to_vec());

    let request = WireRequest::build(&job);

    assert_eq!(request.resource_count(), 2);
    assert_eq!(request.resources().len(), 2);
    assert_eq!(
        request.input().src.as_deref(),
        Some("https://example.com/a.html")
    );
}

#[rstest]
fn styles_and_scripts_are_rewritten_in_place(styled_job: Job) {
    let request = WireRequest::build(&styled_job);

    // Name order: charts.js, print.css, report.html.
    assert_eq!(request.input().src.as_deref(), Some("job-resource:2"));
    assert_eq!(
        request.input().styles,
        vec!["job-resource:1", "https://cdn.example.com/base.css"]
    );
    assert_eq!(request.input().scripts, vec!["job-resource:0"]);
    assert_eq!(
        request.resources(),
        &[
            b"draw();".as_slice(),
            b"body { margin: 0 }".as_slice(),
            b"<h1>Report</h1>".as_slice(),
        ]
    );
}

#[rstest]
fn building_leaves_the_job_untouched(styled_job: Job) {
    let before = styled_job.clone();

    let request = WireRequest::build(&styled_job);

    assert_ne!(request.input(), &styled_job.input);
    assert_eq!(styled_job, before);
}

#[rstest]
fn attachments_point_at_resources_and_keep_their_names() {
    let job = Job::new(Input::from_src("invoice.html"))
        .with_pdf(PdfOptions {
            attach: vec![
                Attachment::from_file("invoice.xml"),
                Attachment {
                    url: Some("https://example.com/terms.pdf".into()),
                    filename: Some("terms.pdf".into()),
                    ..Attachment::default()
                },
            ],
            ..PdfOptions::default()
        })
        .with_file("invoice.xml", b"<invoice/>".to_vec());

    let request = WireRequest::build(&job);
    let attach = &request.pdf().expect("pdf options").attach;

    assert_eq!(attach.len(), 2);
    assert_eq!(
        attach.first().and_then(|a| a.url.as_deref()),
        Some("job-resource:0")
    );
    assert_eq!(
        attach.first().and_then(|a| a.filename.as_deref()),
        Some("invoice.xml")
    );
    assert_eq!(
        attach.get(1).and_then(|a| a.url.as_deref()),
        Some("https://example.com/terms.pdf")
    );
}

#[rstest]
fn header_json_carries_resource_count_and_omits_payloads() {
    let job = Job::new(Input::from_src("a.html"))
        .with_metadata(Metadata {
            title: Some("Quarterly".into()),
            ..Metadata::default()
        })
        .with_file("a.html", b"<p>secret</p>".to_vec());

    let header = WireRequest::build(&job).to_json().expect("serialise header");
    let value: serde_json::Value = serde_json::from_slice(&header).expect("valid JSON");

    assert_eq!(
        value,
        json!({
            "input": { "src": "job-resource:0" },
            "metadata": { "title": "Quarterly" },
            "job-resource-count": 1,
        })
    );
}

#[rstest]
#[case(0, "job-resource:0")]
#[case(12, "job-resource:12")]
fn placeholder_uses_resource_scheme(#[case] index: usize, #[case] expected: &str) {
    assert_eq!(resource_placeholder(index), expected);
    assert!(expected.starts_with(RESOURCE_SCHEME));
}
