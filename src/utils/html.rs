use std::collections::HashSet;

use ammonia::Builder;

/// Reduces provider-generated markup to the plain text it displays.
///
/// Every tag is dropped, <script>/<style> together with their content, and
/// the result is stored as typed: `<`, `>` and `&` stay literal characters,
/// escaping is left to whoever renders the text.
pub fn clean_html(input: &str) -> String {
    let cleaned = Builder::default().tags(HashSet::<&str>::new()).clean(input).to_string();
    decode_text_entities(&cleaned)
}

// The serializer only escapes these in text nodes; `&amp;` goes last so an
// escaped entity such as `&amp;lt;` comes back as the literal `&lt;`.
fn decode_text_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_comparison_and_ampersand_characters() {
        assert_eq!(clean_html("Is 2 < 3 & 4 > 1?"), "Is 2 < 3 & 4 > 1?");
        assert_eq!(clean_html("Tom & Jerry"), "Tom & Jerry");
    }

    #[test]
    fn drops_tags_and_script_content() {
        assert_eq!(clean_html("Pick <script>alert(1)</script><b>one</b>"), "Pick one");
        assert_eq!(clean_html("<img src=x onerror=alert(1)>x"), "x");
    }

    #[test]
    fn escaped_entities_stay_literal() {
        assert_eq!(clean_html("write &amp;lt; for <"), "write &lt; for <");
    }
}
