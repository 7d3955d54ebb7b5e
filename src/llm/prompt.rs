//! Classification prompt.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::config::Taxonomy;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(request_types|fields_to_extract|content)\}").unwrap());

/// Instruction template.
const CLASSIFY_PROMPT: &str = r#"You are an AI assistant. The following is an email/document content. Based on the provided configuration, classify the content into request types and sub-request types, and extract relevant information.

Configuration:
Request Types and Sub Request Types:
{request_types}

Fields to Extract:
{fields_to_extract}

Content: {content}

Please provide the classification and extracted information in the following format without using comments or explanation or double slashes:
{
    "request_type": "Request Type",
    "sub_request_type": "Sub Request Type",
    "confidence_score": "Confidence Score",
    "reasoning": "Reasoning",
    "extracted_information": {
        "field1": "value1",
        "field2": "value2",
        ...
    }
}"#;

/// Render the request types block, one `- name: sub1, sub2` line per type.
pub fn render_request_types(taxonomy: &Taxonomy) -> String {
    taxonomy
        .request_types
        .iter()
        .map(|rt| format!("- {}: {}", rt.name, rt.sub_types.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the fields block, one `- field` line per field.
pub fn render_fields(taxonomy: &Taxonomy) -> String {
    taxonomy
        .fields
        .iter()
        .map(|field| format!("- {}", field))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the classification prompt for `content`.
///
/// Placeholders are filled in one pass over the template, so text coming
/// from the taxonomy or the document is never expanded again.
pub fn build_prompt(content: &str, taxonomy: &Taxonomy) -> String {
    let request_types = render_request_types(taxonomy);
    let fields = render_fields(taxonomy);

    PLACEHOLDER
        .replace_all(CLASSIFY_PROMPT, |caps: &Captures<'_>| match &caps[1] {
            "request_types" => request_types.as_str(),
            "fields_to_extract" => fields.as_str(),
            _ => content,
        })
        .into_owned()
}
