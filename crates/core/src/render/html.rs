//! Minimal HTML fragment handling for news summaries.
//!
//! Summaries come from RSS feeds and contain at most a handful of inline
//! elements, so a forward scanner is enough. It never builds a tree; callers
//! work on the flat token stream.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    Open {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    Close {
        name: String,
    },
}

impl Token<'_> {
    fn attr(&self, key: &str) -> Option<&str> {
        match self {
            Token::Open { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    fn is_open(&self, tag: &str) -> bool {
        matches!(self, Token::Open { name, self_closing: false, .. } if name == tag)
    }

    fn is_close(&self, tag: &str) -> bool {
        matches!(self, Token::Close { name } if name == tag)
    }
}

/// Elements whose content is never rendered as text.
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

/// Elements that visually separate text.
const BREAKING_TAGS: &[&str] = &["br", "p", "div", "li", "ul", "ol", "tr", "td", "h1", "h2", "h3", "h4"];

pub fn tokenize(html: &str) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    let mut text_start = 0usize;

    while let Some(rel) = html[pos..].find('<') {
        let lt = pos + rel;
        let rest = &html[lt + 1..];

        let Some(next) = rest.chars().next() else {
            break;
        };

        if rest.starts_with("!--") {
            push_text(&mut out, &html[text_start..lt]);
            let end = match rest.find("-->") {
                Some(x) => lt + 1 + x + "-->".len(),
                None => html.len(),
            };
            pos = end;
            text_start = end;
            continue;
        }

        if !(next.is_ascii_alphabetic() || next == '/' || next == '!') {
            // A bare '<' in prose, e.g. "P/E < 20".
            pos = lt + 1;
            continue;
        }

        let Some(close) = find_tag_end(rest) else {
            break;
        };
        push_text(&mut out, &html[text_start..lt]);
        let inner = &rest[..close];
        pos = lt + 1 + close + 1;
        text_start = pos;

        if next == '!' {
            // Doctype or other declaration.
            continue;
        }
        out.push(parse_tag(inner));

        if let Some(Token::Open { name, self_closing: false, .. }) = out.last() {
            if RAW_TEXT_TAGS.contains(&name.as_str()) {
                let closing = format!("</{name}");
                let body_end = match find_ascii_ci(&html[pos..], &closing) {
                    Some(x) => pos + x,
                    None => html.len(),
                };
                // Raw text is dropped, not surfaced as Text.
                pos = body_end;
                text_start = body_end;
            }
        }
    }

    push_text(&mut out, &html[text_start..]);
    out
}

fn push_text<'a>(out: &mut Vec<Token<'a>>, text: &'a str) {
    if !text.is_empty() {
        out.push(Token::Text(text));
    }
}

fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}

/// Finds the '>' that closes a tag, skipping over quoted attribute values.
fn find_tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return Some(i),
            (None, _) => {}
        }
    }
    None
}

fn parse_tag(inner: &str) -> Token<'static> {
    let inner = inner.trim();
    if let Some(rest) = inner.strip_prefix('/') {
        let name: String = rest
            .chars()
            .take_while(|c| !c.is_whitespace())
            .collect();
        return Token::Close {
            name: name.to_ascii_lowercase(),
        };
    }

    // `<a href=x/>` keeps the slash as part of the value.
    let (inner, self_closing) = match inner.strip_suffix('/') {
        Some(head)
            if !head.contains(char::is_whitespace)
                || head.ends_with(|c: char| c.is_whitespace() || c == '"' || c == '\'') =>
        {
            (head, true)
        }
        _ => (inner, false),
    };
    let name_end = inner
        .find(|c: char| c.is_whitespace())
        .unwrap_or(inner.len());
    let name = inner[..name_end].to_ascii_lowercase();
    let attrs = parse_attrs(&inner[name_end..]);

    let self_closing = self_closing || matches!(name.as_str(), "br" | "img" | "hr" | "meta");
    Token::Open {
        name,
        attrs,
        self_closing,
    }
}

fn parse_attrs(s: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut chars = s.char_indices().peekable();

    loop {
        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
        let Some(&(key_start, _)) = chars.peek() else {
            break;
        };

        let mut key_end = s.len();
        while let Some(&(i, c)) = chars.peek() {
            if c.is_whitespace() || c == '=' {
                key_end = i;
                break;
            }
            chars.next();
        }
        let key = s[key_start..key_end].to_ascii_lowercase();

        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
        if chars.next_if(|(_, c)| *c == '=').is_none() {
            if !key.is_empty() {
                out.push((key, String::new()));
            }
            continue;
        }
        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}

        let value = match chars.peek().copied() {
            Some((i, q @ ('"' | '\''))) => {
                chars.next();
                let start = i + 1;
                let mut end = s.len();
                for (j, c) in chars.by_ref() {
                    if c == q {
                        end = j;
                        break;
                    }
                }
                &s[start..end]
            }
            Some((start, _)) => {
                let mut end = s.len();
                while let Some(&(j, c)) = chars.peek() {
                    if c.is_whitespace() {
                        end = j;
                        break;
                    }
                    chars.next();
                }
                &s[start..end]
            }
            None => "",
        };

        if !key.is_empty() {
            out.push((key, decode_entities(value)));
        }
    }

    out
}

pub fn contains_markup(s: &str) -> bool {
    tokenize(s).iter().any(|t| !matches!(t, Token::Text(_)))
}

/// Rendered text of a fragment with the content of `skip` elements left out.
pub fn text_content(html: &str, skip: &[&str]) -> String {
    let mut raw = String::new();
    let mut skipping: Option<(&str, usize)> = None;

    for token in tokenize(html) {
        if let Some((tag, depth)) = skipping {
            if token.is_open(tag) {
                skipping = Some((tag, depth + 1));
            } else if token.is_close(tag) {
                skipping = (depth > 1).then_some((tag, depth - 1));
            }
            continue;
        }

        match &token {
            Token::Text(text) => raw.push_str(&decode_entities(text)),
            Token::Open { name, .. } | Token::Close { name } => {
                if let Some(tag) = skip.iter().copied().find(|t| *t == name.as_str()) {
                    if token.is_open(tag) {
                        skipping = Some((tag, 1));
                    }
                    continue;
                }
                if BREAKING_TAGS.contains(&name.as_str()) {
                    raw.push(' ');
                }
            }
        }
    }

    collapse_whitespace(&raw)
}

/// Value of `attr` on the first `tag` element that carries it.
pub fn first_attr(html: &str, tag: &str, attr: &str) -> Option<String> {
    tokenize(html)
        .iter()
        .filter(|t| matches!(t, Token::Open { name, .. } if name == tag))
        .find_map(|t| t.attr(attr).map(str::to_string))
}

/// Text inside the first `tag` element, or `None` if there is none or it is blank.
pub fn first_element_text(html: &str, tag: &str) -> Option<String> {
    let tokens = tokenize(html);
    let start = tokens.iter().position(|t| t.is_open(tag))?;

    let mut depth = 0usize;
    let mut raw = String::new();
    for token in &tokens[start..] {
        if token.is_open(tag) {
            depth += 1;
        } else if token.is_close(tag) {
            depth -= 1;
            if depth == 0 {
                break;
            }
        } else if let Token::Text(text) = token {
            raw.push_str(&decode_entities(text));
        }
    }

    Some(collapse_whitespace(&raw)).filter(|s| !s.is_empty())
}

/// Elements kept by [`sanitize_fragment`], with the attributes each may keep.
const ALLOWED_TAGS: &[(&str, &[&str])] = &[
    ("a", &["href"]),
    ("b", &[]),
    ("strong", &[]),
    ("i", &[]),
    ("em", &[]),
    ("font", &["color"]),
    ("br", &[]),
];

/// Re-serialises a fragment keeping only inline formatting and links.
pub fn sanitize_fragment(html: &str) -> String {
    let mut out = String::new();

    for token in tokenize(html) {
        match &token {
            Token::Text(text) => out.push_str(&escape_text(&decode_entities(text))),
            Token::Open { name, self_closing, .. } => {
                let Some((_, keep)) = ALLOWED_TAGS.iter().find(|(t, _)| t == name) else {
                    continue;
                };
                out.push('<');
                out.push_str(name);
                for key in keep.iter() {
                    let Some(value) = token.attr(key) else {
                        continue;
                    };
                    if *key == "href" && !is_web_link(value) {
                        continue;
                    }
                    out.push_str(&format!(" {key}=\"{}\"", escape_text(value)));
                }
                if name == "a" {
                    out.push_str(" target=\"_blank\" rel=\"noopener noreferrer\"");
                }
                if *self_closing {
                    out.push_str(" /");
                }
                out.push('>');
            }
            Token::Close { name } => {
                if ALLOWED_TAGS.iter().any(|(t, _)| t == name) && name != "br" {
                    out.push_str(&format!("</{name}>"));
                }
            }
        }
    }

    out
}

pub fn is_web_link(href: &str) -> bool {
    url::Url::parse(href.trim())
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "euro" => '€',
        "pound" => '£',
        "rupee" => '₹',
        _ => return None,
    })
}

/// Decodes named and numeric character references. Unknown ones are left as-is.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];

        let decoded = after.find(';').filter(|end| *end <= 10).and_then(|end| {
            let name = &after[..end];
            let c = if let Some(num) = name.strip_prefix('#') {
                let code = match num.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => num.parse::<u32>().ok(),
                };
                code.and_then(char::from_u32)
            } else {
                named_entity(name)
            };
            c.map(|c| (c, end))
        });

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Cuts `s` to at most `max` characters, marking the cut with "...".
pub fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOGLE_NEWS: &str = "<a href=\"https://news.test/articles/abc?oc=5&amp;hl=en\" target=\"_blank\">TCS Q3 results: revenue beats estimates</a>&nbsp;&nbsp;<font color=\"#6f6f6f\">Economic Times</font>";

    #[test]
    fn tokenizes_tags_and_text() {
        let tokens = tokenize("<p class='x'>Hi <b>there</b></p>");
        assert_eq!(tokens.len(), 6);
        assert_eq!(
            tokens[0],
            Token::Open {
                name: "p".to_string(),
                attrs: vec![("class".to_string(), "x".to_string())],
                self_closing: false
            }
        );
        assert_eq!(tokens[1], Token::Text("Hi "));
        assert_eq!(tokens[5], Token::Close { name: "p".to_string() });
    }

    #[test]
    fn quoted_gt_does_not_end_tag() {
        let tokens = tokenize("<a title=\"a > b\" href=x>t</a>");
        assert_eq!(tokens[0].attr("title"), Some("a > b"));
        assert_eq!(tokens[0].attr("href"), Some("x"));
        assert_eq!(tokens[1], Token::Text("t"));
    }

    #[test]
    fn trailing_slash_in_unquoted_value_is_kept() {
        let html = "<a href=https://x.test/a/>t</a>";
        assert_eq!(first_attr(html, "a", "href").as_deref(), Some("https://x.test/a/"));
        assert_eq!(text_content(html, &[]), "t");

        for tag in ["<br/>", "<br />", "<img src=\"p.png\"/>"] {
            match &tokenize(tag)[0] {
                Token::Open { self_closing, .. } => assert!(self_closing, "{tag}"),
                other => panic!("unexpected token: {other:?}"),
            }
        }
        let tokens = tokenize("<a href=https://x.test/a/>");
        assert!(matches!(&tokens[0], Token::Open { self_closing: false, .. }));
    }

    #[test]
    fn bare_less_than_is_text() {
        assert!(!contains_markup("P/E < 20 and margin > 10%"));
        assert_eq!(text_content("P/E < 20", &[]), "P/E < 20");
    }

    #[test]
    fn comments_and_scripts_are_dropped() {
        let html = "a<!-- hidden -->b<script>alert('x<y')</script>c<STYLE>p{}</STYLE>d";
        assert_eq!(text_content(html, &[]), "abcd");
    }

    #[test]
    fn extracts_anchor_and_text() {
        let html = "<a href=\"https://x.test/a\">text</a> more text";
        assert!(contains_markup(html));
        assert_eq!(first_attr(html, "a", "href").as_deref(), Some("https://x.test/a"));
        assert_eq!(text_content(html, &[]), "text more text");
    }

    #[test]
    fn google_news_fragment() {
        assert_eq!(
            first_attr(GOOGLE_NEWS, "a", "href").as_deref(),
            Some("https://news.test/articles/abc?oc=5&hl=en")
        );
        assert_eq!(
            first_element_text(GOOGLE_NEWS, "font").as_deref(),
            Some("Economic Times")
        );
        assert_eq!(
            text_content(GOOGLE_NEWS, &["font"]),
            "TCS Q3 results: revenue beats estimates"
        );
        assert_eq!(
            text_content(GOOGLE_NEWS, &[]),
            "TCS Q3 results: revenue beats estimates Economic Times"
        );
    }

    #[test]
    fn missing_element_is_none() {
        assert_eq!(first_attr("<b>x</b>", "a", "href"), None);
        assert_eq!(first_element_text("<b>x</b>", "font"), None);
        assert_eq!(first_element_text("<font> </font>", "font"), None);
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(decode_entities("R&amp;D &#8377;5 &#x41; &rsquo;"), "R&D ₹5 A \u{2019}");
        assert_eq!(decode_entities("AT&T & co"), "AT&T & co");
        assert_eq!(decode_entities("&bogus;"), "&bogus;");
    }

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        assert_eq!(truncate_with_ellipsis("₹₹₹₹₹", 3), "₹₹₹...");
        assert_eq!(truncate_with_ellipsis("ab cd ef", 3), "ab...");
    }

    #[test]
    fn sanitizer_keeps_links_and_drops_the_rest() {
        let html = "<div onclick=\"x()\"><a href=\"javascript:alert(1)\">bad</a> <a href=\"https://ok.test\" onclick=\"y\">ok</a><script>z()</script><img src=x></div>";
        let clean = sanitize_fragment(html);
        assert_eq!(
            clean,
            "<a target=\"_blank\" rel=\"noopener noreferrer\">bad</a> <a href=\"https://ok.test\" target=\"_blank\" rel=\"noopener noreferrer\">ok</a>"
        );
    }

    #[test]
    fn web_links_only() {
        assert!(is_web_link("https://x.test/a"));
        assert!(is_web_link("http://x.test"));
        assert!(!is_web_link("#"));
        assert!(!is_web_link("javascript:void(0)"));
        assert!(!is_web_link("mailto:a@b.test"));
    }
}
