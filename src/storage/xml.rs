//! Minimal XML scanning for S3 listings and sitemap indexes.
//!
//! Both documents are flat and machine-generated, so a tag scanner is
//! enough. Namespaced tags (`<sm:sitemap>`) are not matched, the same as a
//! DOM `getElementsByTagName` lookup on the unqualified name.

/// Byte offsets of every opening `<tag ...>` for `tag`.
fn open_tags(xml: &str, tag: &str) -> Vec<(usize, usize)> {
    let needle = format!("<{}", tag);
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(rel) = xml[pos..].find(&needle) {
        let start = pos + rel;
        let after = start + needle.len();
        pos = after;

        // Reject longer names sharing the prefix, e.g. <sitemapindex>
        match xml[after..].chars().next() {
            Some(c) if c == '>' || c == '/' || c.is_whitespace() => {}
            _ => continue,
        }

        let Some(close) = xml[after..].find('>') else {
            break;
        };
        found.push((start, after + close + 1));
    }

    found
}

/// Count elements named `tag`.
pub fn count_elements(xml: &str, tag: &str) -> usize {
    open_tags(xml, tag).len()
}

/// Text content of every `<tag>` element, entity-decoded.
pub fn element_texts(xml: &str, tag: &str) -> Vec<String> {
    let close = format!("</{}>", tag);
    let mut texts = Vec::new();

    for (start, content_start) in open_tags(xml, tag) {
        // Self-closing element has no text
        if xml[start..content_start].ends_with("/>") {
            texts.push(String::new());
            continue;
        }
        if let Some(end) = xml[content_start..].find(&close) {
            texts.push(unescape(&xml[content_start..content_start + end]));
        }
    }

    texts
}

/// Raw inner XML of every `<tag>` element, for nested lookups.
pub fn element_blocks<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let close = format!("</{}>", tag);
    open_tags(xml, tag)
        .into_iter()
        .filter(|(start, content_start)| !xml[*start..*content_start].ends_with("/>"))
        .filter_map(|(_, content_start)| {
            xml[content_start..]
                .find(&close)
                .map(|end| &xml[content_start..content_start + end])
        })
        .collect()
}

/// First `<tag>` text, if any.
pub fn first_element_text(xml: &str, tag: &str) -> Option<String> {
    element_texts(xml, tag).into_iter().next()
}

/// Decode the predefined XML entities.
pub fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
