/// Join container body and attachment texts into one classification input.
///
/// The body comes first, followed by a newline and the attachment texts in
/// enumeration order with no separator between them.
pub fn aggregate(body: &str, attachments: &[String]) -> String {
    let mut content = String::with_capacity(
        body.len() + 1 + attachments.iter().map(String::len).sum::<usize>(),
    );
    content.push_str(body);
    content.push('\n');
    for text in attachments {
        content.push_str(text);
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_then_attachments() {
        let attachments = vec!["A1".to_string(), "A2".to_string()];
        assert_eq!(aggregate("B", &attachments), "B\nA1A2");
    }

    #[test]
    fn test_no_attachments() {
        assert_eq!(aggregate("Body only", &[]), "Body only\n");
        assert_eq!(aggregate("", &[]), "\n");
    }

    #[test]
    fn test_duplicates_kept() {
        let attachments = vec!["same".to_string(), "same".to_string()];
        assert_eq!(aggregate("", &attachments), "\nsamesame");
    }
}
