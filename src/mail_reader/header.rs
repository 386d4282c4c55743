use std::sync::LazyLock;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use log::warn;
use mailparse::{MailHeaderMap, ParsedMail};
use regex::bytes::Regex;

use crate::mail_reader::charset;

// Senders routinely drop the trailing padding of encoded words.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

static ENCODED_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"=\?(?P<charset>[^?\s]+)\?(?P<encoding>[BbQq])\?(?P<text>[^?\s]*)\?=")
        .expect("encoded word pattern is valid")
});

fn decode_q(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
        match text[i] {
            b'_' => out.push(b' '),
            b'=' if i + 2 < text.len() => {
                let hex = std::str::from_utf8(&text[i + 1..i + 3])
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                match hex {
                    Some(byte) => {
                        out.push(byte);
                        i += 2;
                    }
                    None => out.push(b'='),
                }
            }
            byte => out.push(byte),
        }
        i += 1;
    }
    out
}

fn decode_word_payload(encoding: &[u8], text: &[u8]) -> Option<Vec<u8>> {
    if encoding.eq_ignore_ascii_case(b"b") {
        LENIENT_BASE64.decode(text).ok()
    } else {
        Some(decode_q(text))
    }
}

fn decode_plain(bytes: &[u8]) -> String {
    charset::normalize(bytes, None).unwrap_or_else(|e| {
        warn!("{}, keeping header text lossy", e);
        String::from_utf8_lossy(bytes).into_owned()
    })
}

/// Decode a raw header value to UTF-8, unfolding it and decoding any
/// RFC 2047 encoded words with their declared charset.
pub fn decode_header_value(raw: &[u8]) -> String {
    let unfolded: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| *b != b'\r' && *b != b'\n')
        .collect();

    let mut decoded = String::new();
    let mut last_end = 0;
    let mut previous_was_word = false;

    for captures in ENCODED_WORD.captures_iter(&unfolded) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let gap = &unfolded[last_end..whole.start()];
        let gap_is_blank = gap.iter().all(u8::is_ascii_whitespace);
        if !(previous_was_word && gap_is_blank) {
            decoded.push_str(&decode_plain(gap));
        }

        let label = &captures["charset"];
        let label = String::from_utf8_lossy(label);
        // RFC 2231 language suffix, e.g. utf-8*en
        let label = label.split('*').next().unwrap_or_default();

        match decode_word_payload(&captures["encoding"], &captures["text"]) {
            Some(bytes) => match charset::normalize(&bytes, Some(label)) {
                Ok(text) => decoded.push_str(&text),
                Err(e) => {
                    warn!("{}, keeping encoded word lossy", e);
                    decoded.push_str(&String::from_utf8_lossy(&bytes));
                }
            },
            None => decoded.push_str(&String::from_utf8_lossy(whole.as_bytes())),
        }

        last_end = whole.end();
        previous_was_word = true;
    }

    decoded.push_str(&decode_plain(&unfolded[last_end..]));
    decoded.trim().to_string()
}

/// First header named `name`, decoded.
pub fn first_header(mail: &ParsedMail, name: &str) -> Option<String> {
    mail.headers
        .get_first_header(name)
        .map(|header| decode_header_value(header.get_value_raw()))
}

/// First header named `name` as sent: folding and encoded words are kept,
/// only the bytes are brought to UTF-8.
pub fn first_header_verbatim(mail: &ParsedMail, name: &str) -> Option<String> {
    mail.headers
        .get_first_header(name)
        .map(|header| decode_plain(header.get_value_raw()))
}
