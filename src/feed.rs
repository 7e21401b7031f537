//! Atom feed extraction for the preprint repository.
//!
//! Two extractors implement [`FeedExtractor`]:
//!
//! - [`TreeExtractor`] builds an element tree from the quick-xml event stream
//!   and queries it (compiled in with the default `xml-tree` feature)
//! - [`PatternExtractor`] pulls the same fields out with regular expressions
//!
//! Both must yield identical entries for well-formed input; the conformance
//! test at the bottom of this file runs one fixture through each.

use crate::error::{Result, SearchError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Venue label for every feed entry.
pub const FEED_VENUE: &str = "arXiv";

/// One feed entry, flattened to the fields the mappers need.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedEntry {
    /// Canonical abstract-page URL (the Atom `<id>`)
    pub id: String,
    pub title: String,
    pub summary: String,
    /// First four digits of `<published>`
    pub year: Option<i64>,
    pub link: String,
    pub doi: String,
    /// First link whose `title` is `pdf`
    pub pdf: String,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub primary_category: String,
    pub venue: String,
}

/// Entries plus the feed-level `totalResults`, when present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFeed {
    pub total_results: Option<u64>,
    pub entries: Vec<FeedEntry>,
}

/// Something that can turn an Atom document into entries.
pub trait FeedExtractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, xml: &str) -> Result<ParsedFeed>;
}

/// The preferred extractor for this build.
pub fn default_extractor() -> Result<Box<dyn FeedExtractor>> {
    #[cfg(feature = "xml-tree")]
    {
        Ok(Box::new(TreeExtractor))
    }
    #[cfg(not(feature = "xml-tree"))]
    {
        Ok(Box::new(PatternExtractor::new()?))
    }
}

/// Run `primary`; if it rejects the document, degrade to `fallback`.
///
/// The fallback only recovers complete `<entry>` blocks, so a truncated feed
/// yields fewer entries rather than invented ones.
pub fn extract_with_fallback(
    primary: &dyn FeedExtractor,
    fallback: &dyn FeedExtractor,
    xml: &str,
) -> Result<ParsedFeed> {
    match primary.extract(xml) {
        Ok(feed) => Ok(feed),
        Err(e) => {
            warn!(
                extractor = primary.name(),
                fallback = fallback.name(),
                error = %e,
                "Feed parse failed, using fallback extractor"
            );
            fallback.extract(xml)
        }
    }
}

/// Collapse runs of whitespace (titles wrap across lines in the feed).
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn year_from_date(date: &str) -> Option<i64> {
    let head = date.trim().get(0..4)?;
    if head.chars().all(|c| c.is_ascii_digit()) {
        head.parse().ok()
    } else {
        None
    }
}

/// Entry assembled from raw extracted parts; shared by both strategies so
/// that normalization is identical.
#[derive(Default)]
struct EntryParts {
    id: String,
    title: String,
    summary: String,
    published: String,
    doi: String,
    pdf: Option<String>,
    authors: Vec<String>,
    categories: Vec<String>,
    primary_category: String,
}

impl EntryParts {
    fn finish(self) -> FeedEntry {
        let id = self.id.trim().to_string();
        FeedEntry {
            link: id.clone(),
            id,
            title: collapse_whitespace(&self.title),
            summary: collapse_whitespace(&self.summary),
            year: year_from_date(&self.published),
            doi: self.doi.trim().to_string(),
            pdf: self.pdf.unwrap_or_default(),
            authors: self
                .authors
                .iter()
                .map(|a| collapse_whitespace(a))
                .filter(|a| !a.is_empty())
                .collect(),
            categories: self.categories.into_iter().filter(|c| !c.is_empty()).collect(),
            primary_category: self.primary_category,
            venue: FEED_VENUE.to_string(),
        }
    }
}

// ============================================================================
// Pattern (regex) extractor
// ============================================================================

/// Regex-based extractor; works without an XML parser.
pub struct PatternExtractor {
    entry: Regex,
    total: Regex,
    title: Regex,
    summary: Regex,
    id: Regex,
    published: Regex,
    doi: Regex,
    author: Regex,
    name: Regex,
    link_tag: Regex,
    category_tag: Regex,
    primary_category_tag: Regex,
    attribute: Regex,
    entity: Regex,
}

impl PatternExtractor {
    pub fn new() -> Result<Self> {
        let re = |pattern: &str| Regex::new(pattern).map_err(|e| SearchError::Parse(e.to_string()));
        Ok(Self {
            entry: re(r"(?s)<entry\b[^>]*>(.*?)</entry>")?,
            total: re(r"<(?:[\w.-]+:)?totalResults\b[^>]*>\s*(\d+)\s*<")?,
            title: re(r"(?s)<title\b[^>]*>(.*?)</title>")?,
            summary: re(r"(?s)<summary\b[^>]*>(.*?)</summary>")?,
            id: re(r"(?s)<id\b[^>]*>(.*?)</id>")?,
            published: re(r"(?s)<published\b[^>]*>(.*?)</published>")?,
            doi: re(r"(?s)<arxiv:doi\b[^>]*>(.*?)</arxiv:doi>")?,
            author: re(r"(?s)<author\b[^>]*>(.*?)</author>")?,
            name: re(r"(?s)<name\b[^>]*>(.*?)</name>")?,
            link_tag: re(r"<link\b[^>]*>")?,
            category_tag: re(r"<category\b[^>]*>")?,
            primary_category_tag: re(r"<arxiv:primary_category\b[^>]*>")?,
            attribute: re(r#"([\w:.-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)?,
            entity: re(r"&(#x[0-9a-fA-F]+|#[0-9]+|amp|lt|gt|quot|apos);")?,
        })
    }

    fn unescape(&self, raw: &str) -> String {
        self.entity
            .replace_all(raw, |caps: &regex::Captures| {
                let body = &caps[1];
                let decoded = match body {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    _ => {
                        let code = if let Some(hex) = body.strip_prefix("#x") {
                            u32::from_str_radix(hex, 16).ok()
                        } else {
                            body.trim_start_matches('#').parse::<u32>().ok()
                        };
                        code.and_then(char::from_u32)
                    }
                };
                decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Text content of the first `re` match, CDATA unwrapped or entities decoded.
    fn text(&self, re: &Regex, block: &str) -> String {
        re.captures(block)
            .and_then(|c| c.get(1))
            .map(|m| self.decode_text(m.as_str()))
            .unwrap_or_default()
    }

    fn decode_text(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        match trimmed
            .strip_prefix("<![CDATA[")
            .and_then(|rest| rest.strip_suffix("]]>"))
        {
            Some(cdata) => cdata.to_string(),
            None => self.unescape(trimmed),
        }
    }

    fn attr(&self, tag: &str, wanted: &str) -> Option<String> {
        self.attribute
            .captures_iter(tag)
            .find(|c| &c[1] == wanted)
            .and_then(|c| c.get(2).or_else(|| c.get(3)))
            .map(|m| self.unescape(m.as_str()))
    }

    fn entry(&self, block: &str) -> FeedEntry {
        let pdf = self
            .link_tag
            .find_iter(block)
            .map(|m| m.as_str())
            .find(|tag| self.attr(tag, "title").as_deref() == Some("pdf"))
            .and_then(|tag| self.attr(tag, "href"));

        let authors = self
            .author
            .captures_iter(block)
            .filter_map(|c| c.get(1))
            .map(|m| self.text(&self.name, m.as_str()))
            .collect();

        let categories = self
            .category_tag
            .find_iter(block)
            .filter_map(|m| self.attr(m.as_str(), "term"))
            .collect();

        let primary_category = self
            .primary_category_tag
            .find(block)
            .and_then(|m| self.attr(m.as_str(), "term"))
            .unwrap_or_default();

        EntryParts {
            id: self.text(&self.id, block),
            title: self.text(&self.title, block),
            summary: self.text(&self.summary, block),
            published: self.text(&self.published, block),
            doi: self.text(&self.doi, block),
            pdf,
            authors,
            categories,
            primary_category,
        }
        .finish()
    }
}

impl FeedExtractor for PatternExtractor {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn extract(&self, xml: &str) -> Result<ParsedFeed> {
        let total_results = self
            .total
            .captures(xml)
            .and_then(|c| c[1].parse::<u64>().ok());
        let entries = self
            .entry
            .captures_iter(xml)
            .filter_map(|c| c.get(1))
            .map(|m| self.entry(m.as_str()))
            .collect();
        Ok(ParsedFeed {
            total_results,
            entries,
        })
    }
}

// ============================================================================
// Tree extractor
// ============================================================================

#[cfg(feature = "xml-tree")]
pub use tree::TreeExtractor;

#[cfg(feature = "xml-tree")]
mod tree {
    use super::{EntryParts, FeedExtractor, ParsedFeed};
    use crate::error::{Result, SearchError};
    use quick_xml::events::{BytesStart, Event};
    use quick_xml::Reader;

    #[derive(Debug, Default)]
    struct Element {
        /// Qualified name, e.g. `arxiv:doi`
        name: String,
        attrs: Vec<(String, String)>,
        children: Vec<Node>,
    }

    #[derive(Debug)]
    enum Node {
        Element(Element),
        Text(String),
    }

    fn local_name(name: &str) -> &str {
        name.rsplit(':').next().unwrap_or(name)
    }

    impl Element {
        fn open(start: &BytesStart<'_>) -> Result<Self> {
            let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
            let mut attrs = Vec::new();
            for attr in start.attributes() {
                let attr = attr.map_err(|e| SearchError::Parse(format!("Bad attribute in <{}>: {}", name, e)))?;
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                let value = attr
                    .unescape_value()
                    .map_err(|e| SearchError::Parse(format!("Bad attribute value in <{}>: {}", name, e)))?
                    .into_owned();
                attrs.push((key, value));
            }
            Ok(Self {
                name,
                attrs,
                children: Vec::new(),
            })
        }

        fn attr(&self, key: &str) -> Option<&str> {
            self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
        }

        fn elements(&self) -> impl Iterator<Item = &Element> {
            self.children.iter().filter_map(|n| match n {
                Node::Element(e) => Some(e),
                Node::Text(_) => None,
            })
        }

        /// Direct children with this qualified name.
        fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
            self.elements().filter(move |e| e.name == name)
        }

        fn child(&self, name: &str) -> Option<&Element> {
            self.elements().find(|e| e.name == name)
        }

        /// First descendant (depth-first) whose local name matches.
        fn descendant_local(&self, local: &str) -> Option<&Element> {
            for e in self.elements() {
                if local_name(&e.name) == local {
                    return Some(e);
                }
                if let Some(found) = e.descendant_local(local) {
                    return Some(found);
                }
            }
            None
        }

        fn text(&self) -> String {
            let mut out = String::new();
            self.collect_text(&mut out);
            out
        }

        fn collect_text(&self, out: &mut String) {
            for child in &self.children {
                match child {
                    Node::Text(t) => out.push_str(t),
                    Node::Element(e) => e.collect_text(out),
                }
            }
        }

        fn child_text(&self, name: &str) -> String {
            self.child(name).map(|e| e.text().trim().to_string()).unwrap_or_default()
        }
    }

    fn attach(stack: &mut [Element], node: Node) -> Result<()> {
        stack
            .last_mut()
            .map(|parent| parent.children.push(node))
            .ok_or_else(|| SearchError::Parse("Unbalanced feed document".to_string()))
    }

    /// Parse the whole document into a synthetic root element.
    fn parse_document(xml: &str) -> Result<Element> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);
        let mut buf = Vec::new();
        let mut stack: Vec<Element> = vec![Element::default()];

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| {
                SearchError::Parse(format!(
                    "Malformed feed at byte {}: {}",
                    reader.error_position(),
                    e
                ))
            })?;
            match event {
                Event::Start(start) => stack.push(Element::open(&start)?),
                Event::Empty(start) => {
                    let element = Element::open(&start)?;
                    attach(&mut stack, Node::Element(element))?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| SearchError::Parse("Unexpected closing tag".to_string()))?;
                    attach(&mut stack, Node::Element(element))?;
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| SearchError::Parse(format!("Bad text node: {}", e)))?
                        .into_owned();
                    attach(&mut stack, Node::Text(text))?;
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    attach(&mut stack, Node::Text(text))?;
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if stack.len() != 1 {
            return Err(SearchError::Parse(format!(
                "Feed ended with {} unclosed element(s)",
                stack.len() - 1
            )));
        }
        stack
            .pop()
            .ok_or_else(|| SearchError::Parse("Empty feed document".to_string()))
    }

    fn entry(element: &Element) -> super::FeedEntry {
        let pdf = element
            .children_named("link")
            .find(|l| l.attr("title") == Some("pdf"))
            .and_then(|l| l.attr("href"))
            .map(str::to_string);

        let authors = element
            .children_named("author")
            .map(|a| a.child_text("name"))
            .collect();

        let categories = element
            .children_named("category")
            .filter_map(|c| c.attr("term"))
            .map(str::to_string)
            .collect();

        let primary_category = element
            .child("arxiv:primary_category")
            .and_then(|c| c.attr("term"))
            .unwrap_or_default()
            .to_string();

        EntryParts {
            id: element.child_text("id"),
            title: element.child_text("title"),
            summary: element.child_text("summary"),
            published: element.child_text("published"),
            doi: element.child_text("arxiv:doi"),
            pdf,
            authors,
            categories,
            primary_category,
        }
        .finish()
    }

    /// Element-tree extractor over quick-xml.
    pub struct TreeExtractor;

    impl FeedExtractor for TreeExtractor {
        fn name(&self) -> &'static str {
            "tree"
        }

        fn extract(&self, xml: &str) -> Result<ParsedFeed> {
            let root = parse_document(xml)?;
            let feed = root
                .elements()
                .find(|e| local_name(&e.name) == "feed")
                .ok_or_else(|| SearchError::Parse("Document has no <feed> element".to_string()))?;

            let total_results = feed
                .descendant_local("totalResults")
                .and_then(|e| e.text().trim().parse::<u64>().ok());
            let entries = feed.children_named("entry").map(entry).collect();

            Ok(ParsedFeed {
                total_results,
                entries,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <link href="http://arxiv.org/api/query?search_query%3Dall%3Aautonomous" rel="self" type="application/atom+xml"/>
  <title type="html">ArXiv Query: search_query=all:autonomous ships</title>
  <id>http://arxiv.org/api/cHxbiOdZaP56ODnBPIenZhzg5f8</id>
  <updated>2024-05-01T00:00:00-04:00</updated>
  <opensearch:totalResults xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">1342</opensearch:totalResults>
  <opensearch:startIndex xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">0</opensearch:startIndex>
  <opensearch:itemsPerPage xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">2</opensearch:itemsPerPage>
  <entry>
    <id>http://arxiv.org/abs/2301.01234v2</id>
    <updated>2023-02-01T10:00:00Z</updated>
    <published>2023-01-04T18:22:01Z</published>
    <title>Remote Operation Centres for Autonomous
      Ships: Skills &amp; Competencies</title>
    <summary>  We study the operator role.
    </summary>
    <author>
      <name>Jane Doe</name>
      <arxiv:affiliation xmlns:arxiv="http://arxiv.org/schemas/atom">NTNU</arxiv:affiliation>
    </author>
    <author>
      <name>Ole Nordmann</name>
    </author>
    <arxiv:doi xmlns:arxiv="http://arxiv.org/schemas/atom">10.1016/j.oceaneng.2023.001</arxiv:doi>
    <link title="doi" href="http://dx.doi.org/10.1016/j.oceaneng.2023.001" rel="related"/>
    <link href="http://arxiv.org/abs/2301.01234v2" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2301.01234v2" rel="related" type="application/pdf"/>
    <arxiv:primary_category xmlns:arxiv="http://arxiv.org/schemas/atom" term="cs.RO" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.RO" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.HC" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2402.00077v1</id>
    <published>2024-02-10T08:00:00Z</published>
    <title>Trust in autonomy at sea</title>
    <summary>No DOI, no pdf link.</summary>
    <author><name>A. Seafarer</name></author>
    <link href="http://arxiv.org/abs/2402.00077v1" rel="alternate" type="text/html"/>
    <category term="cs.AI" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>
"#;

    fn expected() -> ParsedFeed {
        ParsedFeed {
            total_results: Some(1342),
            entries: vec![
                FeedEntry {
                    id: "http://arxiv.org/abs/2301.01234v2".into(),
                    title: "Remote Operation Centres for Autonomous Ships: Skills & Competencies".into(),
                    summary: "We study the operator role.".into(),
                    year: Some(2023),
                    link: "http://arxiv.org/abs/2301.01234v2".into(),
                    doi: "10.1016/j.oceaneng.2023.001".into(),
                    pdf: "http://arxiv.org/pdf/2301.01234v2".into(),
                    authors: vec!["Jane Doe".into(), "Ole Nordmann".into()],
                    categories: vec!["cs.RO".into(), "cs.HC".into()],
                    primary_category: "cs.RO".into(),
                    venue: FEED_VENUE.into(),
                },
                FeedEntry {
                    id: "http://arxiv.org/abs/2402.00077v1".into(),
                    title: "Trust in autonomy at sea".into(),
                    summary: "No DOI, no pdf link.".into(),
                    year: Some(2024),
                    link: "http://arxiv.org/abs/2402.00077v1".into(),
                    doi: String::new(),
                    pdf: String::new(),
                    authors: vec!["A. Seafarer".into()],
                    categories: vec!["cs.AI".into()],
                    primary_category: String::new(),
                    venue: FEED_VENUE.into(),
                },
            ],
        }
    }

    fn extractors() -> Vec<Box<dyn FeedExtractor>> {
        let mut all: Vec<Box<dyn FeedExtractor>> =
            vec![Box::new(PatternExtractor::new().expect("regexes compile"))];
        #[cfg(feature = "xml-tree")]
        all.push(Box::new(TreeExtractor));
        all
    }

    #[test]
    fn test_extractors_agree_on_fixture() {
        for extractor in extractors() {
            let parsed = extractor.extract(FIXTURE).expect("well-formed fixture");
            assert_eq!(parsed, expected(), "extractor '{}' diverged", extractor.name());
        }
    }

    #[test]
    fn test_feed_without_entries() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>empty</title></feed>"#;
        for extractor in extractors() {
            let parsed = extractor.extract(xml).expect("parse");
            assert!(parsed.entries.is_empty());
            assert_eq!(parsed.total_results, None);
        }
    }

    #[test]
    fn test_pattern_extractor_decodes_numeric_entities() {
        let extractor = PatternExtractor::new().expect("regexes compile");
        assert_eq!(extractor.unescape("caf&#233; &#x26; &lt;b&gt;"), "café & <b>");
        assert_eq!(extractor.unescape("&unknown;"), "&unknown;");
    }

    #[test]
    fn test_year_from_date() {
        assert_eq!(year_from_date("2019-07-01T00:00:00Z"), Some(2019));
        assert_eq!(year_from_date("20"), None);
        assert_eq!(year_from_date("abcd-01"), None);
    }

    #[cfg(feature = "xml-tree")]
    #[test]
    fn test_truncated_feed_degrades_to_complete_entries() {
        let cut = FIXTURE
            .find("<entry>\n    <id>http://arxiv.org/abs/2402")
            .expect("second entry present");
        let truncated = &FIXTURE[..cut + 40];

        let tree = TreeExtractor;
        assert!(tree.extract(truncated).is_err());

        let pattern = PatternExtractor::new().expect("regexes compile");
        let parsed = extract_with_fallback(&tree, &pattern, truncated).expect("fallback");
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0], expected().entries[0]);
    }

    #[cfg(feature = "xml-tree")]
    #[test]
    fn test_mismatched_tags_are_parse_errors() {
        let err = TreeExtractor
            .extract("<feed><entry><title>x</entry></feed>")
            .expect_err("mismatch");
        assert!(matches!(err, SearchError::Parse(_)));
    }
}
