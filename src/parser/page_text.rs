use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("title selector"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("body selector"));
static DESCRIPTION: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[name="description"], meta[property="og:description"]"#)
        .expect("meta selector")
});
static JSON_LD: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("json-ld selector")
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg", "head"];

/// Plain-text rendering of an event page for the extraction model: title,
/// meta description, visible body text and any JSON-LD blocks, capped at
/// `max_chars` characters.
pub fn page_text(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);
    let mut sections = Vec::new();

    if let Some(title) = document.select(&TITLE).next() {
        let title = collapse(&title.text().collect::<String>());
        if !title.is_empty() {
            sections.push(format!("# {title}"));
        }
    }

    if let Some(description) = document
        .select(&DESCRIPTION)
        .filter_map(|meta| meta.value().attr("content"))
        .map(collapse)
        .find(|d| !d.is_empty())
    {
        sections.push(description);
    }

    if let Some(body) = document.select(&BODY).next() {
        let lines: Vec<String> = body
            .descendants()
            .filter_map(|node| {
                let text = node.value().as_text()?;
                let hidden = node.ancestors().any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .map(|el| HIDDEN_ELEMENTS.contains(&el.name()))
                        .unwrap_or(false)
                });
                if hidden {
                    return None;
                }
                let line = collapse(text);
                (!line.is_empty()).then_some(line)
            })
            .collect();
        if !lines.is_empty() {
            sections.push(lines.join("\n"));
        }
    }

    let structured: Vec<String> = document
        .select(&JSON_LD)
        .map(|script| script.text().collect::<String>().trim().to_string())
        .filter(|block| !block.is_empty())
        .collect();
    if !structured.is_empty() {
        sections.push(format!("Structured data:\n{}", structured.join("\n")));
    }

    truncate_chars(&sections.join("\n\n"), max_chars)
}

fn collapse(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
          <head>
            <title>Late Show | Eventbrite</title>
            <meta name="description" content="A night of   stand-up">
            <script type="application/ld+json">{"@type":"Event","name":"Late Show"}</script>
          </head>
          <body>
            <h1>Late   Show</h1>
            <script>var tracking = true;</script>
            <style>.x { color: red }</style>
            <p>Comedy Bar, 945 Bloor St W</p>
          </body>
        </html>
    "#;

    #[test]
    fn keeps_visible_text_and_metadata() {
        let text = page_text(PAGE, 10_000);
        assert!(text.starts_with("# Late Show | Eventbrite"));
        assert!(text.contains("A night of stand-up"));
        assert!(text.contains("Late Show\nComedy Bar, 945 Bloor St W"));
        assert!(text.contains(r#"{"@type":"Event","name":"Late Show"}"#));
        assert!(!text.contains("tracking"));
        assert!(!text.contains("color: red"));
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert!(page_text(PAGE, 5).chars().count() <= 5);
    }
}
