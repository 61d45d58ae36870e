// Minimal HTML reading tailored to the student portal markup.
// Tag and attribute names match case-insensitively; nesting of the same tag
// inside itself is not supported, which the portal never does.

use std::sync::LazyLock;

use regex::Regex;

use super::text::normalize_ws;

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .unwrap()
});

const ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&aacute;", "á"),
    ("&eacute;", "é"),
    ("&iacute;", "í"),
    ("&oacute;", "ó"),
    ("&uacute;", "ú"),
    ("&ntilde;", "ñ"),
    ("&Ntilde;", "Ñ"),
    ("&amp;", "&"),
];

/// One element: its opening tag and the markup between open and close tags.
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    pub open: &'a str,
    pub inner: &'a str,
}

impl<'a> Element<'a> {
    pub fn attr(&self, name: &str) -> Option<String> {
        attrs(self.open)
            .into_iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    pub fn text(&self) -> String {
        text(self.inner)
    }

    /// Text before the first child element.
    pub fn leading_text(&self) -> String {
        let end = self.inner.find('<').unwrap_or(self.inner.len());
        normalize_ws(&decode_entities(&self.inner[..end]))
    }

    pub fn children(&self, tag: &str) -> Vec<Element<'a>> {
        elements(self.inner, tag)
    }

    pub fn first(&self, tag: &str) -> Option<Element<'a>> {
        self.children(tag).into_iter().next()
    }
}

/// All `<tag …>…</tag>` blocks in document order. A block without a closing
/// tag runs to the next opening of the same tag, as HTML allows for rows,
/// cells and options.
pub fn elements<'a>(html: &'a str, tag: &str) -> Vec<Element<'a>> {
    let lc = to_lowercase_fast(html);
    let tag = to_lowercase_fast(tag);
    let close_pat = format!("</{tag}");
    let mut out = Vec::new();
    let mut from = 0;

    while let Some(start) = find_open(&lc, &tag, from) {
        let Some(gt) = html[start..].find('>') else { break };
        let open_end = start + gt + 1;
        let open = &html[start..open_end];

        let next_open = find_open(&lc, &tag, open_end).unwrap_or(html.len());
        let (inner_end, end) = match lc[open_end..].find(&close_pat) {
            Some(rel) if open_end + rel <= next_open => {
                let close_start = open_end + rel;
                let close_end = html[close_start..]
                    .find('>')
                    .map(|p| close_start + p + 1)
                    .unwrap_or(html.len());
                (close_start, close_end)
            }
            _ => (next_open, next_open),
        };

        out.push(Element {
            open,
            inner: &html[open_end..inner_end],
        });
        from = end.max(open_end);
    }
    out
}

/// Opening tags of void elements such as `<input …>`.
pub fn void_elements<'a>(html: &'a str, tag: &str) -> Vec<Element<'a>> {
    let lc = to_lowercase_fast(html);
    let tag = to_lowercase_fast(tag);
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(start) = find_open(&lc, &tag, from) {
        let Some(gt) = html[start..].find('>') else { break };
        let end = start + gt + 1;
        out.push(Element {
            open: &html[start..end],
            inner: "",
        });
        from = end;
    }
    out
}

pub fn find_by_attr<'a>(html: &'a str, tag: &str, attr: &str, value: &str) -> Option<Element<'a>> {
    elements(html, tag)
        .into_iter()
        .find(|e| e.attr(attr).as_deref() == Some(value))
}

/// Visible text of a fragment: tags removed, entities decoded, whitespace collapsed.
pub fn text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                out.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    normalize_ws(&decode_entities(&out))
}

pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    ENTITIES
        .iter()
        .fold(s.to_string(), |acc, (entity, ch)| acc.replace(entity, ch))
}

fn attrs(open: &str) -> Vec<(String, String)> {
    let body = open
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim_end_matches('/');
    let after_name = body
        .find(|c: char| c.is_whitespace())
        .map(|p| &body[p..])
        .unwrap_or("");

    ATTR_RE
        .captures_iter(after_name)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| decode_entities(m.as_str()))
                .unwrap_or_default();
            (caps[1].to_string(), value)
        })
        .collect()
}

fn find_open(lc: &str, tag: &str, from: usize) -> Option<usize> {
    let pat = format!("<{tag}");
    let mut at = from;
    loop {
        let start = at + lc.get(at..)?.find(&pat)?;
        let after = start + pat.len();
        match lc[after..].chars().next() {
            Some(c) if c.is_whitespace() || c == '>' || c == '/' => return Some(start),
            _ => at = after,
        }
    }
}

/// ASCII-only lowercasing keeps byte offsets aligned with the original.
fn to_lowercase_fast(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}
