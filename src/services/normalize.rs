//! # 텍스트 정규화(Text Normalizer)
//!
//! 비교 방식이 `text`이고 내용에 마크업 태그가 있으면 태그를 제거하고
//! HTML 엔티티를 디코딩하여 "보이는 텍스트"만 남깁니다.
//! `html` / `markdown` 비교에서는 내용을 그대로 통과시킵니다 (마크업도 문자 그대로 diff).
//!
//! 순수 함수이며 실패하지 않습니다. 토큰화할 수 없는 마크업(닫히지 않은 `<` 등)은
//! 그대로 남습니다.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

use crate::models::ComparisonType;

/// `<p>`, `</div>`, `<!DOCTYPE ...>`처럼 `<` 뒤에 글자가 오는 태그만 인식합니다.
/// `a < b > c` 같은 일반 텍스트의 부등호는 태그로 보지 않습니다.
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z!?][^<>]*>").expect("valid tag pattern"));

/// 화면에 보이지 않는 블록: 주석, script, style
static HIDDEN_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<!--.*?-->|<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
        .expect("valid hidden block pattern")
});

/// 비교 방식에 따라 원시 내용을 정규화합니다.
pub fn normalize(raw: &str, comparison_type: ComparisonType) -> Cow<'_, str> {
    match comparison_type {
        ComparisonType::Text if contains_markup(raw) => Cow::Owned(strip_markup(raw)),
        _ => Cow::Borrowed(raw),
    }
}

pub fn contains_markup(content: &str) -> bool {
    TAG.is_match(content)
}

/// 태그를 모두 제거하고 엔티티를 디코딩합니다. 그 외 공백과 구조는 유지합니다.
pub fn strip_markup(content: &str) -> String {
    let visible = HIDDEN_BLOCK.replace_all(content, "");
    let text = TAG.replace_all(&visible, "");
    decode_entities(&text)
}

/// `&amp;`, `&#39;`, `&#x27;` 같은 엔티티를 문자로 바꿉니다.
/// 알 수 없는 엔티티는 원문 그대로 둡니다.
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];

        // 엔티티 이름은 짧으므로 세미콜론을 가까운 범위에서만 찾습니다.
        let decoded = tail
            .char_indices()
            .take(12)
            .find(|&(_, c)| c == ';')
            .and_then(|(semi, _)| decode_entity(&tail[1..semi]).map(|c| (c, semi)));

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }

    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "sect" => '§',
        "para" => '¶',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "hellip" => '…',
        "ndash" => '–',
        "mdash" => '—',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_comparison_strips_tags_and_decodes_entities() {
        let raw = "<p>Terms &amp; Conditions</p>\n<p>Fee: &lt;100&gt;</p>";
        assert_eq!(
            normalize(raw, ComparisonType::Text),
            "Terms & Conditions\nFee: <100>"
        );
    }

    #[test]
    fn html_and_markdown_pass_through() {
        let raw = "<b>bold</b> &amp; **strong**";
        assert_eq!(normalize(raw, ComparisonType::Html), raw);
        assert_eq!(normalize(raw, ComparisonType::Markdown), raw);
    }

    #[test]
    fn plain_text_without_tags_is_borrowed() {
        let raw = "if a < b and b > c then a < c";
        assert!(matches!(normalize(raw, ComparisonType::Text), Cow::Borrowed(_)));
    }

    #[test]
    fn script_and_style_contents_are_not_visible_text() {
        let raw = "<style>p{color:red}</style><p>Clause 1</p><script>alert(1)</script>";
        assert_eq!(strip_markup(raw), "Clause 1");
    }

    #[test]
    fn unterminated_markup_degrades_to_passthrough() {
        let raw = "<p>Section 2 <unclosed";
        assert_eq!(strip_markup(raw), "Section 2 <unclosed");
    }

    #[test]
    fn numeric_and_unknown_entities() {
        assert_eq!(decode_entities("it&#39;s &#x41; &bogus; & done"), "it's A &bogus; & done");
    }
}
