//! Main-article extraction from raw HTML.

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

pub const EXTRACTION_FAILED: &str = "Could not extract article content...";

/// Readability output shorter than this goes to the fallback heuristic.
const MIN_WORDS: usize = 50;

const BLOCKED_TAGS: &str = "footer, nav, aside, script, style, noscript, header";

const BLOCKED_KEYWORDS: &[&str] = &[
    "footnote",
    "sidebar",
    "sponsor",
    "advert",
    "cookie",
    "popup",
    "related",
    "comments",
    "newsletter",
];

const CANDIDATE_TAGS: &str = "article, main, section, div";

/// Remove blocklisted tags, and any element whose class or id mentions a
/// blocklisted keyword.
pub fn strip_boilerplate(html: &str) -> String {
    let mut doc = Html::parse_document(html);

    let (Ok(tags), Ok(all)) = (Selector::parse(BLOCKED_TAGS), Selector::parse("*")) else {
        return html.to_string();
    };

    let mut doomed: Vec<_> = doc.select(&tags).map(|el| el.id()).collect();
    doomed.extend(doc.select(&all).filter(is_blocked).map(|el| el.id()));

    for id in doomed {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }

    doc.html()
}

fn is_blocked(el: &ElementRef) -> bool {
    let value = el.value();
    [value.attr("class"), value.attr("id")]
        .into_iter()
        .flatten()
        .map(str::to_lowercase)
        .any(|attr| BLOCKED_KEYWORDS.iter().any(|kw| attr.contains(kw)))
}

/// Extract the article text from already-cleaned HTML.
pub fn extract_article(html: &str, url: &Url) -> String {
    match readability::extractor::extract(&mut html.as_bytes(), url) {
        Ok(product) => {
            let text = normalize_whitespace(&product.text);
            let words = text.split(' ').filter(|w| !w.is_empty()).count();
            if words >= MIN_WORDS {
                return text;
            }
            tracing::debug!("Readability returned {words} words for {url}, using fallback");
        }
        Err(e) => {
            tracing::warn!("Readability failed for {url}: {e}, using fallback");
        }
    }
    fallback_extract(html)
}

/// Text of the `article`/`main`/`section`/`div` element with the most text.
pub fn fallback_extract(html: &str) -> String {
    let doc = Html::parse_document(html);
    let Ok(candidates) = Selector::parse(CANDIDATE_TAGS) else {
        return EXTRACTION_FAILED.to_string();
    };

    doc.select(&candidates)
        .map(|el| normalize_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
        .filter(|text| !text.is_empty())
        .fold(None::<String>, |best, text| match best {
            Some(b) if b.len() >= text.len() => Some(b),
            _ => Some(text),
        })
        .unwrap_or_else(|| EXTRACTION_FAILED.to_string())
}

/// Collapse every whitespace run to a single space and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\n b\t c  "), "a b c");
        assert_eq!(normalize_whitespace(" \n "), "");
    }

    #[test]
    fn test_strip_removes_blocked_tags() {
        let html = r#"<html><head><style>p{}</style></head><body>
            <header>Site</header><nav>Menu</nav>
            <p>Keep me</p>
            <footer>Copyright</footer><script>alert(1)</script>
        </body></html>"#;
        let cleaned = strip_boilerplate(html);
        assert!(cleaned.contains("Keep me"));
        for gone in ["Site", "Menu", "Copyright", "alert(1)", "p{}"] {
            assert!(!cleaned.contains(gone), "{gone} survived");
        }
    }

    #[test]
    fn test_strip_removes_blocked_classes_and_ids() {
        let html = r#"<body>
            <div class="Post-Body">Body text</div>
            <div class="SIDEBAR-left">Side</div>
            <div id="cookie-banner">Accept</div>
            <section class="related-posts">More</section>
        </body>"#;
        let cleaned = strip_boilerplate(html);
        assert!(cleaned.contains("Body text"));
        assert!(!cleaned.contains("Side"));
        assert!(!cleaned.contains("Accept"));
        assert!(!cleaned.contains("More"));
    }

    #[test]
    fn test_fallback_returns_longest_div() {
        let html = r#"<body>
            <div>short one</div>
            <div>  this is   the
                 longest   div in the page  </div>
            <p>paragraphs are not candidates even if they are much much longer than any div</p>
        </body>"#;
        assert_eq!(fallback_extract(html), "this is the longest div in the page");
    }

    #[test]
    fn test_fallback_without_candidates() {
        assert_eq!(fallback_extract("<body><p>only a paragraph</p></body>"), EXTRACTION_FAILED);
    }

    #[test]
    fn test_readability_picks_article_over_longer_div() {
        let url = Url::parse("https://example.com/technical-credit").unwrap();
        let html = r#"<html><head><title>Technical credit</title></head><body>
            <nav>Home About Archive</nav>
            <article class="post-content">
                <p>Technical credit is the mirror image of technical debt, a design
                   investment made early that keeps paying back,  sometimes for years,
                   as the system grows and requirements shift in ways nobody predicted. </p>
                <p>Typical sources are clean abstractions, well chosen patterns, and
                   thorough automated tests, which let later changes land quickly,
                   safely, and without heroic debugging sessions late at night. </p>
                <p>Measuring it is hard, but teams notice it when a feature that should
                   take a month ships in a week, because the groundwork was already
                   laid by someone who thought ahead about extension points. </p>
            </article>
            <div>unrelated filler words repeated to make this block longer than the article itself
                 unrelated filler words repeated to make this block longer than the article itself
                 unrelated filler words repeated to make this block longer than the article itself
                 unrelated filler words repeated to make this block longer than the article itself
                 unrelated filler words repeated to make this block longer than the article itself
                 unrelated filler words repeated to make this block longer than the article itself
                 unrelated filler words repeated to make this block longer than the article itself
                 unrelated filler words repeated to make this block longer than the article itself
                 unrelated filler words repeated to make this block longer than the article itself</div>
            <div class="newsletter-signup">Subscribe to our newsletter for weekly tips</div>
        </body></html>"#;

        let cleaned = strip_boilerplate(html);
        let text = extract_article(&cleaned, &url);

        assert!(text.starts_with("Technical credit is the mirror image"), "{text}");
        assert!(text.contains("sometimes for years"));
        assert!(text.contains("extension points."));
        assert!(!text.contains("unrelated filler"));
        assert!(!text.contains("Subscribe"));
        assert!(!text.contains("Archive"));
        assert_eq!(text, normalize_whitespace(&text));

        // The longest-candidate heuristic alone would have picked the filler.
        assert!(fallback_extract(&cleaned).starts_with("unrelated filler"));
    }

    #[test]
    fn test_short_article_uses_fallback() {
        let url = Url::parse("https://example.com/post").unwrap();
        let html = r#"<html><body>
            <div>tiny</div>
            <div>a slightly longer block of text</div>
        </body></html>"#;
        assert_eq!(extract_article(html, &url), "a slightly longer block of text");
    }
}
