//! MIME (.eml) message parsing.

use std::sync::LazyLock;

use mail_parser::{MessageParser, MimeHeaders};
use regex::Regex;

use super::{ContainerError, ParsedContainer, RawAttachment};
use crate::models::{ContainerFormat, TextFormat};

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Extract MIME type from a content type.
///
/// A part without a `Content-Type` header is `text/plain` (RFC 2045 5.2).
fn mime_type_from_content_type(ct: Option<&mail_parser::ContentType>) -> String {
    ct.map(|ct| {
        if let Some(subtype) = ct.subtype() {
            format!("{}/{}", ct.ctype(), subtype)
        } else {
            ct.ctype().to_string()
        }
    })
    .unwrap_or_else(|| "text/plain".to_string())
}

/// Simple HTML to text conversion - just strip tags.
fn strip_html(html: &str) -> String {
    let stripped = html
        .replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("<br />", "\n")
        .replace("</p>", "\n\n")
        .replace("</div>", "\n");
    TAG_REGEX.replace_all(&stripped, "").into_owned()
}

/// Parse a MIME message into its preferred body and its attachments.
///
/// The body is the first plain-text body, falling back to the first HTML
/// body. Attachments are tagged by exact media type.
pub fn parse_mime(bytes: &[u8]) -> Result<ParsedContainer, ContainerError> {
    let message = MessageParser::default()
        .parse(bytes)
        .ok_or_else(|| ContainerError::parse(ContainerFormat::MimeEmail, "no message structure"))?;

    let body = message
        .body_text(0)
        .map(|text| text.into_owned())
        .or_else(|| message.body_html(0).map(|html| strip_html(&html)))
        .unwrap_or_default();

    let attachments = message
        .attachments()
        .map(|part| {
            let mime_type = mime_type_from_content_type(part.content_type());
            RawAttachment {
                filename: part.attachment_name().map(|name| name.to_string()),
                format: TextFormat::from_mime_type(&mime_type),
                data: part.contents().to_vec(),
            }
        })
        .collect();

    Ok(ParsedContainer { body, attachments })
}

#[cfg(test)]
pub(crate) mod testing {
    /// A message with a PDF, an unsupported zip and a text attachment.
    pub const MIXED_EML: &str = "From: Agent Bank <agent@bank.example>\r\n\
To: servicing@lender.example\r\n\
Subject: Principal repayment\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"SEP\"\r\n\
\r\n\
--SEP\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Please see the attached repayment notice.\r\n\
--SEP\r\n\
Content-Type: application/pdf\r\n\
Content-Disposition: attachment; filename=\"notice.pdf\"\r\n\
\r\n\
%PDF-1.4 fake\r\n\
--SEP\r\n\
Content-Type: application/zip\r\n\
Content-Disposition: attachment; filename=\"bundle.zip\"\r\n\
\r\n\
PK fake\r\n\
--SEP\r\n\
Content-Type: text/plain\r\n\
Content-Disposition: attachment; filename=\"note.txt\"\r\n\
\r\n\
Value date 2025-03-01\r\n\
--SEP--\r\n";
}

#[cfg(test)]
mod tests {
    use super::testing::MIXED_EML;
    use super::*;

    #[test]
    fn test_parse_mixed_message() {
        let parsed = parse_mime(MIXED_EML.as_bytes()).unwrap();

        assert!(parsed
            .body
            .starts_with("Please see the attached repayment notice."));

        let formats: Vec<_> = parsed.attachments.iter().map(|a| a.format).collect();
        assert_eq!(
            formats,
            vec![Some(TextFormat::Pdf), None, Some(TextFormat::PlainText)]
        );
        let names: Vec<_> = parsed
            .attachments
            .iter()
            .map(|a| a.filename.as_deref().unwrap_or(""))
            .collect();
        assert_eq!(names, vec!["notice.pdf", "bundle.zip", "note.txt"]);
    }

    #[test]
    fn test_attachment_without_content_type_is_plain_text() {
        let eml = "From: a@example.com\r\n\
Subject: untyped\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"SEP\"\r\n\
\r\n\
--SEP\r\n\
Content-Type: text/plain\r\n\
\r\n\
Body\r\n\
--SEP\r\n\
Content-Disposition: attachment; filename=\"note.txt\"\r\n\
\r\n\
Settlement on Friday\r\n\
--SEP--\r\n";
        let parsed = parse_mime(eml.as_bytes()).unwrap();

        assert_eq!(parsed.attachments.len(), 1);
        let attachment = &parsed.attachments[0];
        assert_eq!(attachment.filename.as_deref(), Some("note.txt"));
        assert_eq!(attachment.format, Some(TextFormat::PlainText));
        assert!(String::from_utf8_lossy(&attachment.data).starts_with("Settlement on Friday"));
    }

    #[test]
    fn test_html_only_body() {
        let eml = "From: a@example.com\r\n\
Subject: html\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>Hello <b>team</b></p>\r\n";
        let parsed = parse_mime(eml.as_bytes()).unwrap();
        assert!(parsed.body.contains("Hello"));
        assert!(!parsed.body.contains("<b>"));
        assert!(parsed.attachments.is_empty());
    }

    #[test]
    fn test_empty_input_is_parse_error() {
        let err = parse_mime(b"").unwrap_err();
        assert!(matches!(err, ContainerError::Parse { format: "eml", .. }));
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>One</p><div>Two<br/>Three</div>"), "One\n\nTwo\nThree\n");
    }

    #[test]
    fn test_mime_type_defaults_to_text_plain() {
        assert_eq!(mime_type_from_content_type(None), "text/plain");
    }
}
