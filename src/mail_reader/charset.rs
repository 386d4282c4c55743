use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use log::debug;

use crate::error::DecodeFailure;

/// How a payload ended up as UTF-8 text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeSource {
    /// Declared 7-bit, read directly as UTF-8.
    SevenBit,
    /// Decoded with the declared charset.
    Declared(&'static Encoding),
    /// Decoded with a statistically detected charset.
    Detected(&'static Encoding),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    pub source: DecodeSource,
}

fn is_seven_bit(charset: &str) -> bool {
    charset.eq_ignore_ascii_case("us-ascii") || charset.eq_ignore_ascii_case("ascii")
}

fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}

fn detect(bytes: &[u8]) -> Option<(&'static Encoding, String)> {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    decode_strict(encoding, bytes).map(|text| (encoding, text))
}

/// Decode `bytes` into UTF-8, reporting which path produced the text.
///
/// A declared charset is tried first; unknown labels and invalid byte
/// sequences fall back to detection.
pub fn normalize_with_source(
    bytes: &[u8],
    declared: Option<&str>,
) -> Result<Normalized, DecodeFailure> {
    let declared = declared.map(str::trim).filter(|c| !c.is_empty());

    if let Some(charset) = declared {
        if is_seven_bit(charset) {
            if let Ok(text) = std::str::from_utf8(bytes) {
                return Ok(Normalized {
                    text: text.to_string(),
                    source: DecodeSource::SevenBit,
                });
            }
            debug!("Payload declared {} is not 7-bit clean", charset);
        } else {
            match Encoding::for_label(charset.as_bytes()) {
                Some(encoding) => {
                    if let Some(text) = decode_strict(encoding, bytes) {
                        return Ok(Normalized {
                            text,
                            source: DecodeSource::Declared(encoding),
                        });
                    }
                    debug!("Payload is not valid {}, detecting", encoding.name());
                }
                None => debug!("Unknown charset {}, detecting", charset),
            }
        }
    }

    if bytes.is_empty() {
        return Ok(Normalized {
            text: String::new(),
            source: DecodeSource::Detected(encoding_rs::UTF_8),
        });
    }

    match detect(bytes) {
        Some((encoding, text)) => Ok(Normalized {
            text,
            source: DecodeSource::Detected(encoding),
        }),
        None => Err(DecodeFailure {
            declared: declared.map(str::to_string),
        }),
    }
}

pub fn normalize(bytes: &[u8], declared: Option<&str>) -> Result<String, DecodeFailure> {
    normalize_with_source(bytes, declared).map(|normalized| normalized.text)
}
