use once_cell::sync::Lazy;
use regex::Regex;

/// Sudo prompt banner plus any trailing noise, up to the next opening
/// bracket. Spans newlines: the banner and the payload usually arrive on the
/// same captured stream. Without this pass the `[sudo]` literal itself would
/// be picked up as a balanced `[...]` region by the scanner.
static PROMPT_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[sudo\] password for [^:\n]*:[^\[{]*").expect("noise pattern"));

/// Locate the first balanced top-level JSON object or array embedded in a
/// possibly noisy text stream.
///
/// Returns the exact substring of the cleaned text, or `None` when no
/// balanced region exists. Stray closers are ignored as noise; mismatched
/// opener/closer pairs do not abort the scan.
pub fn extract_first_json(text: &str) -> Option<String> {
    let cleaned = PROMPT_NOISE.replace_all(text, "");
    let cleaned: &str = cleaned.as_ref();

    let mut stack: Vec<u8> = Vec::new();
    let mut start = 0usize;

    for (idx, byte) in cleaned.bytes().enumerate() {
        match byte {
            b'{' | b'[' => {
                if stack.is_empty() {
                    start = idx;
                }
                stack.push(byte);
            }
            b'}' | b']' => {
                // A closer with nothing open is log noise, not JSON.
                if stack.is_empty() {
                    continue;
                }
                stack.pop();
                if stack.is_empty() {
                    return Some(cleaned[start..=idx].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_then_object() {
        let input = "[sudo] password for u: \n{\"a\":1}";
        assert_eq!(extract_first_json(input).as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn banner_then_array() {
        let input = "[sudo] password for steamdeck: [{\"id\":\"abc\"}]";
        assert_eq!(
            extract_first_json(input).as_deref(),
            Some("[{\"id\":\"abc\"}]")
        );
    }

    #[test]
    fn no_brackets_is_none() {
        assert_eq!(extract_first_json("200 info ok"), None);
        assert_eq!(extract_first_json(""), None);
    }

    #[test]
    fn unbalanced_never_returns_partial() {
        // Opener count never returns to zero: nothing to extract.
        assert_eq!(extract_first_json("{\"a\": [1,2}"), None);
    }

    #[test]
    fn stray_closers_are_ignored() {
        let input = "error) }] done\n[1,2,3]";
        assert_eq!(extract_first_json(input).as_deref(), Some("[1,2,3]"));
    }

    #[test]
    fn first_structure_wins() {
        let input = "{\"first\":true} trailing {\"second\":true}";
        assert_eq!(
            extract_first_json(input).as_deref(),
            Some("{\"first\":true}")
        );
    }

    #[test]
    fn nested_structures_survive() {
        let input = "noise {\"peers\":[{\"paths\":[{\"active\":true}]}]} tail";
        assert_eq!(
            extract_first_json(input).as_deref(),
            Some("{\"peers\":[{\"paths\":[{\"active\":true}]}]}")
        );
    }

    #[test]
    fn multiple_banners_spanning_lines() {
        let input = "[sudo] password for u: \nSorry, try again.\n[sudo] password for u: \n[\"ok\"]";
        assert_eq!(extract_first_json(input).as_deref(), Some("[\"ok\"]"));
    }
}
