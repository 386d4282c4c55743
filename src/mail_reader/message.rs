use log::{debug, warn};
use mailparse::{parse_mail, MailHeaderMap, ParsedMail};

use crate::error::MessageError;
use crate::mail_reader::charset;
use crate::mail_reader::header::{first_header, first_header_verbatim};
use crate::mail_reader::html::extract_text;

/// Which representation a body was taken from. Decided once, from the
/// part's content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    PlainText,
    Html,
}

impl BodyKind {
    fn from_mime_type(mime_type: &str) -> Option<Self> {
        if mime_type.eq_ignore_ascii_case("text/plain") {
            Some(BodyKind::PlainText)
        } else if mime_type.eq_ignore_ascii_case("text/html") {
            Some(BodyKind::Html)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBody {
    pub kind: BodyKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub to: Option<String>,
    pub from: Option<String>,
    pub kind: BodyKind,
    pub body: String,
}

impl Message {
    pub fn is_html(&self) -> bool {
        self.kind == BodyKind::Html
    }
}

fn declared_charset<'a>(part: &'a ParsedMail<'_>) -> Option<&'a str> {
    part.ctype.params.get("charset").map(String::as_str)
}

fn is_multipart(part: &ParsedMail) -> bool {
    part.ctype.mimetype.to_ascii_lowercase().starts_with("multipart/")
}

/// Decode one text-bearing part. Anything that is not `text/plain` or
/// `text/html` yields nothing.
fn decode_part(part: &ParsedMail) -> Option<ResolvedBody> {
    let kind = BodyKind::from_mime_type(&part.ctype.mimetype)?;

    let payload = match part.get_body_raw() {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Cannot decode {} payload: {}", part.ctype.mimetype, e);
            return None;
        }
    };

    let text = match charset::normalize_with_source(&payload, declared_charset(part)) {
        Ok(normalized) => {
            debug!("{} payload decoded via {:?}", part.ctype.mimetype, normalized.source);
            normalized.text
        }
        Err(e) => {
            debug!("Dropping {} payload: {}", part.ctype.mimetype, e);
            return None;
        }
    };

    let text = match kind {
        BodyKind::PlainText => text.trim().to_string(),
        BodyKind::Html => {
            let extracted = extract_text(text.trim());
            charset::normalize(extracted.as_bytes(), None).ok()?
        }
    };

    Some(ResolvedBody { kind, text })
}

fn resolve_multipart(mail: &ParsedMail) -> Option<ResolvedBody> {
    let mut html_candidate: Option<ResolvedBody> = None;

    for part in &mail.subparts {
        let resolved = if is_multipart(part) {
            resolve_multipart(part)
        } else {
            let has_content_type = part.headers.get_first_header("Content-Type").is_some();
            if !has_content_type || declared_charset(part).is_none() {
                continue;
            }
            decode_part(part)
        };

        match resolved {
            Some(body) if body.kind == BodyKind::PlainText && !body.text.is_empty() => {
                return Some(body);
            }
            Some(body) if body.kind == BodyKind::Html && html_candidate.is_none() => {
                html_candidate = Some(body);
            }
            _ => {}
        }
    }

    html_candidate
}

/// Pick and decode the best textual body of a message: plain text when any
/// plain-text part decodes, HTML otherwise.
pub fn resolve_body(mail: &ParsedMail) -> Option<ResolvedBody> {
    if is_multipart(mail) {
        resolve_multipart(mail)
    } else {
        decode_part(mail)
    }
}

/// Parse a raw RFC 822 message.
///
/// `Ok(None)` means the message parsed but has no usable text and cannot
/// contribute a document.
pub fn process_message(raw: &[u8]) -> Result<Option<Message>, MessageError> {
    let parsed_mail = parse_mail(raw)?;

    let subject = first_header(&parsed_mail, "Subject").unwrap_or_default();
    let to = first_header_verbatim(&parsed_mail, "To");
    let from = first_header_verbatim(&parsed_mail, "From");

    let Some(body) = resolve_body(&parsed_mail) else {
        return Ok(None);
    };
    if body.text.is_empty() {
        return Ok(None);
    }

    Ok(Some(Message {
        subject,
        to,
        from,
        kind: body.kind,
        body: body.text,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(raw: &str) -> Option<ResolvedBody> {
        let mail = parse_mail(raw.as_bytes()).unwrap();
        resolve_body(&mail)
    }

    const ALTERNATIVE_HTML_FIRST: &str = "From: a@example.com\r\n\
        Subject: both\r\n\
        Content-Type: multipart/alternative; boundary=\"XX\"\r\n\
        \r\n\
        --XX\r\n\
        Content-Type: text/html; charset=utf-8\r\n\
        \r\n\
        <p>Rich body</p>\r\n\
        --XX\r\n\
        Content-Type: text/plain; charset=utf-8\r\n\
        \r\n\
        Plain body\r\n\
        --XX--\r\n";

    #[test]
    fn test_plain_text_wins_regardless_of_order() {
        let body = resolve(ALTERNATIVE_HTML_FIRST).unwrap();
        assert_eq!(body.kind, BodyKind::PlainText);
        assert_eq!(body.text, "Plain body");
    }

    #[test]
    fn test_html_is_used_when_no_plain_text() {
        let raw = "Subject: html only\r\n\
            Content-Type: multipart/alternative; boundary=\"XX\"\r\n\
            \r\n\
            --XX\r\n\
            Content-Type: text/html; charset=iso-8859-1\r\n\
            \r\n\
            <html><body><script>x()</script><p>Bonjour</p></body></html>\r\n\
            --XX--\r\n";
        let body = resolve(raw).unwrap();
        assert_eq!(body.kind, BodyKind::Html);
        assert_eq!(body.text, "Bonjour");
    }

    #[test]
    fn test_blank_plain_part_falls_back_to_html() {
        let raw = "Subject: blank plain\r\n\
            Content-Type: multipart/alternative; boundary=\"XX\"\r\n\
            \r\n\
            --XX\r\n\
            Content-Type: text/plain; charset=utf-8\r\n\
            \r\n\
            \x20\x20\x20\r\n\
            \t\r\n\
            --XX\r\n\
            Content-Type: text/html; charset=utf-8\r\n\
            \r\n\
            <html><body><p>Only the rich part</p></body></html>\r\n\
            --XX--\r\n";
        let body = resolve(raw).unwrap();
        assert_eq!(body.kind, BodyKind::Html);
        assert_eq!(body.text, "Only the rich part");
    }

    #[test]
    fn test_undecodable_plain_part_falls_back_to_html() {
        let raw = "Subject: broken plain\r\n\
            Content-Type: multipart/alternative; boundary=\"XX\"\r\n\
            \r\n\
            --XX\r\n\
            Content-Type: text/plain; charset=utf-8\r\n\
            Content-Transfer-Encoding: base64\r\n\
            \r\n\
            !!!!%%%%****\r\n\
            --XX\r\n\
            Content-Type: text/html; charset=utf-8\r\n\
            \r\n\
            <p>Readable</p>\r\n\
            --XX--\r\n";
        let body = resolve(raw).unwrap();
        assert_eq!(body.kind, BodyKind::Html);
        assert_eq!(body.text, "Readable");
    }

    #[test]
    fn test_sub_parts_without_charset_are_skipped() {
        let raw = "Subject: skip\r\n\
            Content-Type: multipart/mixed; boundary=\"XX\"\r\n\
            \r\n\
            --XX\r\n\
            Content-Type: text/plain\r\n\
            \r\n\
            No charset here\r\n\
            --XX--\r\n";
        assert_eq!(resolve(raw), None);
    }

    #[test]
    fn test_nested_multipart_is_resolved() {
        let raw = "Subject: nested\r\n\
            Content-Type: multipart/mixed; boundary=\"OUTER\"\r\n\
            \r\n\
            --OUTER\r\n\
            Content-Type: multipart/alternative; boundary=\"INNER\"\r\n\
            \r\n\
            --INNER\r\n\
            Content-Type: text/plain; charset=us-ascii\r\n\
            \r\n\
            Inner plain\r\n\
            --INNER--\r\n\
            --OUTER\r\n\
            Content-Type: application/pdf; charset=binary\r\n\
            \r\n\
            %PDF\r\n\
            --OUTER--\r\n";
        let body = resolve(raw).unwrap();
        assert_eq!(body.kind, BodyKind::PlainText);
        assert_eq!(body.text, "Inner plain");
    }

    #[test]
    fn test_single_part_non_text_yields_nothing() {
        let raw = "Subject: pic\r\nContent-Type: image/png\r\n\r\nabc\r\n";
        assert_eq!(resolve(raw), None);
    }

    #[test]
    fn test_single_part_plain_is_trimmed() {
        let raw = "Subject: hi\r\nContent-Type: text/plain; charset=us-ascii\r\n\r\n\r\n  Hello  \r\n\r\n";
        let body = resolve(raw).unwrap();
        assert_eq!(body.text, "Hello");
    }

    #[test]
    fn test_process_message_fields() {
        let raw = "To: =?utf-8?Q?Jos=C3=A9?= <j@example.com>\r\n\
            From: boss@example.com\r\n\
            Subject: =?utf-8?Q?R=C3=A9union?=\r\n\
            Content-Type: text/plain; charset=utf-8\r\n\
            \r\n\
            Agenda attached.\r\n";
        let message = process_message(raw.as_bytes()).unwrap().unwrap();
        assert_eq!(message.subject, "Réunion");
        assert_eq!(message.to.as_deref(), Some("=?utf-8?Q?Jos=C3=A9?= <j@example.com>"));
        assert_eq!(message.from.as_deref(), Some("boss@example.com"));
        assert!(!message.is_html());
        assert_eq!(message.body, "Agenda attached.");
    }

    #[test]
    fn test_process_message_without_text_is_none() {
        let raw = "Subject: empty\r\nContent-Type: text/plain; charset=us-ascii\r\n\r\n   \r\n";
        assert_eq!(process_message(raw.as_bytes()).unwrap(), None);
    }
}
