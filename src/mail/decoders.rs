use anyhow::{Context, Result};
use mailparse::{DispositionType, MailHeaderMap, ParsedMail};

use crate::domain::email::{Attachment, BodyExcerpt, EXCERPT_CHARS, MessageSeq, MessageSummary};

const HTML_WRAP_WIDTH: usize = 100;

/// Normalise a raw header value to text: RFC 2047 encoded-words are decoded
/// and folded lines joined. Undecodable input falls back to lossy UTF-8.
pub fn decode_mime_words(raw: &[u8]) -> String {
    let line = [b"X: ".as_slice(), raw, b"\r\n"].concat();
    mailparse::parse_header(&line)
        .map(|(header, _)| header.get_value())
        .unwrap_or_else(|_| String::from_utf8_lossy(raw).into_owned())
}

fn decoded_header(parsed: &ParsedMail, name: &str) -> String {
    parsed
        .headers
        .get_first_header(name)
        .map(|h| decode_mime_words(h.get_value_raw()))
        .unwrap_or_default()
}

/// Header value without encoded-word decoding.
fn verbatim_header(parsed: &ParsedMail, name: &str) -> String {
    parsed
        .headers
        .get_first_header(name)
        .map(|h| String::from_utf8_lossy(h.get_value_raw()).trim().to_string())
        .unwrap_or_default()
}

/// Parse a raw RFC 822 message into the fields we print.
pub fn parse_summary(seq: MessageSeq, raw_rfc822: &[u8]) -> Result<MessageSummary> {
    let parsed = mailparse::parse_mail(raw_rfc822)
        .with_context(|| format!("message {seq}: malformed RFC 822 payload"))?;

    let body = if is_multipart(&parsed) {
        extract_multipart_body(&parsed)?.map(|t| BodyExcerpt::truncate(&t, EXCERPT_CHARS))
    } else {
        let text = parsed
            .get_body()
            .with_context(|| format!("message {seq}: undecodable body"))?;
        Some(BodyExcerpt::full(text))
    };

    let mut attachments = Vec::new();
    collect_attachments(&parsed, &mut attachments);

    Ok(MessageSummary {
        seq,
        subject: decoded_header(&parsed, "Subject"),
        from: decoded_header(&parsed, "From"),
        to: decoded_header(&parsed, "To"),
        cc: decoded_header(&parsed, "Cc"),
        date: verbatim_header(&parsed, "Date"),
        body,
        attachments,
    })
}

/// Leaf parts marked `attachment` or carrying a file name.
fn collect_attachments(p: &ParsedMail, out: &mut Vec<Attachment>) {
    if p.subparts.is_empty() {
        let disposition = p.get_content_disposition();
        let filename = disposition
            .params
            .get("filename")
            .or_else(|| p.ctype.params.get("name"));
        if matches!(disposition.disposition, DispositionType::Attachment) || filename.is_some() {
            out.push(Attachment {
                filename: filename.cloned().unwrap_or_else(|| "attachment".to_string()),
                content_type: p.ctype.mimetype.to_ascii_lowercase(),
            });
        }
    }
    for sp in &p.subparts {
        collect_attachments(sp, out);
    }
}

fn is_multipart(p: &ParsedMail) -> bool {
    p.ctype.mimetype.to_ascii_lowercase().starts_with("multipart/")
}

/// First text/plain part in walk order, else the first text/html part as text.
fn extract_multipart_body(p: &ParsedMail) -> Result<Option<String>> {
    if let Some(plain) = find_part(p, "text/plain") {
        return Ok(Some(plain.get_body()?));
    }
    match find_part(p, "text/html") {
        Some(html) => Ok(Some(html_to_text(&html.get_body()?))),
        None => Ok(None),
    }
}

fn find_part<'a, 'b>(p: &'b ParsedMail<'a>, mimetype: &str) -> Option<&'b ParsedMail<'a>> {
    if p.ctype.mimetype.eq_ignore_ascii_case(mimetype) {
        return Some(p);
    }
    p.subparts.iter().find_map(|sp| find_part(sp, mimetype))
}

fn html_to_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), HTML_WRAP_WIDTH).unwrap_or_else(|_| html.to_string())
}
