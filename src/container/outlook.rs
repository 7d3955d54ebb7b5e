//! Outlook (.msg) message parsing.
//!
//! A .msg file is an OLE compound file. Message properties live in
//! `__substg1.0_<tag><type>` streams; each attachment is a
//! `__attach_version1.0_#NNNNNNNN` storage holding its own property streams.

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use cfb::CompoundFile;
use tracing::debug;

use super::{ContainerError, ParsedContainer, RawAttachment};
use crate::models::{ContainerFormat, TextFormat};

const BODY_UNICODE: &str = "__substg1.0_1000001F";
const BODY_ANSI: &str = "__substg1.0_1000001E";
const ATTACH_LONG_FILENAME: [&str; 2] = ["__substg1.0_3707001F", "__substg1.0_3707001E"];
const ATTACH_FILENAME: [&str; 2] = ["__substg1.0_3704001F", "__substg1.0_3704001E"];
const ATTACH_DATA: &str = "__substg1.0_37010102";
const ATTACHMENT_PREFIX: &str = "__attach_version1.0_#";

/// Parse an Outlook message into its body and attachments.
///
/// Attachment formats come from the attachment filename's extension.
/// Attachments without a data stream (embedded messages, OLE objects) are
/// left out.
pub fn parse_outlook(bytes: &[u8]) -> Result<ParsedContainer, ContainerError> {
    let mut msg = CompoundFile::open(Cursor::new(bytes))
        .map_err(|e| ContainerError::parse(ContainerFormat::OutlookMessage, e.to_string()))?;

    let body = read_string_property(&mut msg, "/", &[BODY_UNICODE, BODY_ANSI])?
        .unwrap_or_default();

    let mut storages: Vec<String> = msg
        .read_root_storage()
        .filter(|entry| entry.is_storage() && entry.name().starts_with(ATTACHMENT_PREFIX))
        .map(|entry| entry.name().to_string())
        .collect();
    storages.sort();

    let mut attachments = Vec::with_capacity(storages.len());
    for storage in storages {
        let dir = format!("/{}", storage);
        let Some(data) = read_stream(&mut msg, &dir, ATTACH_DATA)? else {
            debug!("Attachment {} has no binary data, skipping", storage);
            continue;
        };

        let filename = match read_string_property(&mut msg, &dir, &ATTACH_LONG_FILENAME)? {
            Some(name) => Some(name),
            None => read_string_property(&mut msg, &dir, &ATTACH_FILENAME)?,
        };
        let format = filename.as_deref().and_then(TextFormat::from_filename);

        attachments.push(RawAttachment {
            filename,
            format,
            data,
        });
    }

    Ok(ParsedContainer { body, attachments })
}

fn read_stream<F: Read + Seek>(
    msg: &mut CompoundFile<F>,
    dir: &str,
    name: &str,
) -> Result<Option<Vec<u8>>, ContainerError> {
    let path = Path::new(dir).join(name);
    if !msg.is_stream(&path) {
        return Ok(None);
    }

    let mut stream = msg.open_stream(&path)?;
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;
    Ok(Some(buf))
}

/// Read the first present string property among `names`.
///
/// `...001F` streams are UTF-16LE, `...001E` streams are 8-bit.
fn read_string_property<F: Read + Seek>(
    msg: &mut CompoundFile<F>,
    dir: &str,
    names: &[&str],
) -> Result<Option<String>, ContainerError> {
    for name in names {
        if let Some(raw) = read_stream(msg, dir, name)? {
            let text = if name.ends_with("001F") {
                decode_utf16le(&raw)
            } else {
                String::from_utf8_lossy(&raw).into_owned()
            };
            return Ok(Some(text.trim_end_matches('\0').to_string()));
        }
    }
    Ok(None)
}

fn decode_utf16le(raw: &[u8]) -> String {
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::{Cursor, Write};

    use cfb::CompoundFile;

    pub fn utf16le(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect()
    }

    /// Build a .msg compound file from (stream path, content) pairs.
    ///
    /// Storages named by the paths are created as needed.
    pub fn build_msg(streams: &[(&str, Vec<u8>)]) -> Vec<u8> {
        let mut comp = CompoundFile::create(Cursor::new(Vec::new())).unwrap();
        for (path, content) in streams {
            if let Some((storage, _)) = path.rsplit_once('/') {
                if !storage.is_empty() && !comp.is_storage(storage) {
                    comp.create_storage(storage).unwrap();
                }
            }
            let mut stream = comp.create_stream(path).unwrap();
            stream.write_all(content).unwrap();
        }
        comp.flush().unwrap();
        comp.into_inner().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{build_msg, utf16le};
    use super::*;

    #[test]
    fn test_parse_message_with_attachments() {
        let msg = build_msg(&[
            ("/__substg1.0_1000001F", utf16le("Please action the drawdown.\0")),
            ("/__attach_version1.0_#00000001/__substg1.0_3707001F", utf16le("terms.txt")),
            ("/__attach_version1.0_#00000001/__substg1.0_37010102", b"Tenor 12M".to_vec()),
            ("/__attach_version1.0_#00000000/__substg1.0_3704001E", b"SCAN.PNG".to_vec()),
            ("/__attach_version1.0_#00000000/__substg1.0_37010102", b"png bytes".to_vec()),
            ("/__attach_version1.0_#00000002/__substg1.0_3707001F", utf16le("data.bin")),
            ("/__attach_version1.0_#00000002/__substg1.0_37010102", vec![0, 1, 2]),
        ]);

        let parsed = parse_outlook(&msg).unwrap();
        assert_eq!(parsed.body, "Please action the drawdown.");

        let summary: Vec<_> = parsed
            .attachments
            .iter()
            .map(|a| (a.filename.clone().unwrap_or_default(), a.format))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("SCAN.PNG".to_string(), Some(TextFormat::Image)),
                ("terms.txt".to_string(), Some(TextFormat::PlainText)),
                ("data.bin".to_string(), None),
            ]
        );
        assert_eq!(parsed.attachments[1].data, b"Tenor 12M");
    }

    #[test]
    fn test_ansi_body_and_attachment_without_data() {
        let msg = build_msg(&[
            ("/__substg1.0_1000001E", b"Plain body".to_vec()),
            ("/__attach_version1.0_#00000000/__substg1.0_3707001F", utf16le("embedded.msg")),
        ]);

        let parsed = parse_outlook(&msg).unwrap();
        assert_eq!(parsed.body, "Plain body");
        assert!(parsed.attachments.is_empty());
    }

    #[test]
    fn test_missing_body_is_empty() {
        let msg = build_msg(&[("/__substg1.0_0037001F", utf16le("Subject only"))]);
        let parsed = parse_outlook(&msg).unwrap();
        assert_eq!(parsed.body, "");
    }

    #[test]
    fn test_not_a_compound_file() {
        let err = parse_outlook(b"definitely not OLE").unwrap_err();
        assert!(matches!(err, ContainerError::Parse { format: "msg", .. }));
    }
}
