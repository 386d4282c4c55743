use itertools::Itertools;
use scraper::Html;

const SKIPPED_ELEMENTS: [&str; 2] = ["script", "style"];

/// Flatten an HTML document to its visible text.
///
/// Lines are trimmed, split on runs of two or more spaces, and the non-empty
/// chunks are joined with single newlines.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut raw = String::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| SKIPPED_ELEMENTS.contains(&element.name()))
        });
        if !skipped {
            raw.push_str(text);
        }
    }

    collapse_whitespace(&raw)
}

fn collapse_whitespace(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_only_document_is_empty() {
        assert_eq!(extract_text("<script>var x = 1;</script>"), "");
        assert_eq!(extract_text("<style>body { color: red; }</style>"), "");
    }

    #[test]
    fn test_scripts_and_styles_are_dropped() {
        let html = "<html><head><style>p { margin: 0 }</style></head>\
                    <body><p>Hello</p><script>alert('x')</script><p>World</p></body></html>";
        assert_eq!(extract_text(html), "HelloWorld");
    }

    #[test]
    fn test_lines_and_chunks_are_collapsed() {
        let html = "<html><body>\n   <p>First line</p>\n\n   <div>left    right</div>\n</body></html>";
        assert_eq!(extract_text(html), "First line\nleft\nright");
    }

    #[test]
    fn test_entities_are_decoded() {
        assert_eq!(extract_text("<p>Fish &amp; chips</p>"), "Fish & chips");
    }

    #[test]
    fn test_extraction_is_idempotent_on_flat_text() {
        let flat = "Monthly report\nRevenue is up\nSee you soon";
        assert_eq!(extract_text(flat), flat);
        let html = "<h1>Monthly report</h1>\n<p>Revenue is up</p>  <p>See you soon</p>";
        let once = extract_text(html);
        assert_eq!(extract_text(&once), once);
    }
}
