//! Export encoder: JSON and CSV renderings of a loaded result set.
//!
//! CSV cells are quoted only when they contain a comma, a quote or a line
//! break, with embedded quotes doubled. Rows keep result order.

use crate::error::{Result, SearchError};
use crate::models::{Entity, Provider, RawItem};
use crate::openalex::{GraphAuthor, GraphWork};
use crate::view::{
    first_present, rank_concepts, to_view_work, GRAPH_EXPORT_VENUE_CHAIN, GRAPH_LINK_CHAIN, GRAPH_PUBLISHER_CHAIN,
    MAX_SKILLS,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

pub const AUTHOR_COLUMNS: [&str; 4] = ["id", "display_name", "works_count", "cited_by_count"];

pub const WORK_COLUMNS: [&str; 8] = [
    "query",
    "title",
    "skills",
    "source_engine",
    "doi",
    "publication_year",
    "publisher_or_author",
    "link",
];

/// Separator between skills inside one CSV cell.
const SKILL_SEPARATOR: &str = "; ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(SearchError::MalformedInput(format!("Unknown export format '{}'", other))),
        }
    }
}

/// One row of the works CSV, in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportRow {
    pub query: String,
    pub title: String,
    pub skills: String,
    pub source_engine: String,
    pub doi: String,
    pub publication_year: Option<i64>,
    pub publisher_or_author: String,
    pub link: String,
}

impl ExportRow {
    /// Export mapping for a graph work; venue prefers the structured source name.
    fn from_graph(w: &GraphWork, query: &str) -> Self {
        let skills = rank_concepts(w.concepts.as_deref().unwrap_or_default(), MAX_SKILLS);
        Self {
            query: query.to_string(),
            title: w.display_name.clone().unwrap_or_default(),
            skills: skills.join(SKILL_SEPARATOR),
            source_engine: first_present(w, GRAPH_EXPORT_VENUE_CHAIN).unwrap_or_default().to_string(),
            doi: w.doi.clone().unwrap_or_default(),
            publication_year: w.publication_year.filter(|y| *y != 0),
            publisher_or_author: first_present(w, GRAPH_PUBLISHER_CHAIN).unwrap_or_default().to_string(),
            link: first_present(w, GRAPH_LINK_CHAIN).unwrap_or_default().to_string(),
        }
    }

    /// Export mapping for one wire item from `provider`.
    pub fn derive(provider: Provider, item: &Value, query: &str) -> Result<Self> {
        let raw = RawItem::decode(provider, item)?;
        if let RawItem::Graph(w) = &raw {
            return Ok(Self::from_graph(w, query));
        }
        let view = to_view_work(&raw);
        Ok(Self {
            query: query.to_string(),
            title: view.title,
            skills: view.skills.join(SKILL_SEPARATOR),
            source_engine: view.venue.unwrap_or_default(),
            doi: view.doi.unwrap_or_default(),
            publication_year: view.year,
            publisher_or_author: view.publisher_or_author,
            link: view.link,
        })
    }
}

/// Pretty-printed JSON of exactly the loaded items.
pub fn to_json(items: &[Value]) -> Result<String> {
    Ok(serde_json::to_string_pretty(items)?)
}

fn csv_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = wtr.into_inner().map_err(|e| SearchError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| SearchError::Parse(format!("CSV output is not UTF-8: {}", e)))
}

/// Authors CSV with the fixed author columns.
pub fn authors_csv(items: &[Value]) -> Result<String> {
    let mut wtr = csv_writer();
    wtr.write_record(AUTHOR_COLUMNS)?;
    for item in items {
        let author = GraphAuthor::deserialize(item)?;
        wtr.serialize(&author)?;
    }
    finish(wtr)
}

/// Works CSV with the fixed work columns.
pub fn works_csv(items: &[Value], provider: Provider, query: &str) -> Result<String> {
    let mut wtr = csv_writer();
    wtr.write_record(WORK_COLUMNS)?;
    for item in items {
        wtr.serialize(ExportRow::derive(provider, item, query)?)?;
    }
    finish(wtr)
}

/// Stringify any JSON value for a CSV cell; null becomes empty.
fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// CSV over arbitrary objects: columns are the union of keys in first-seen
/// order, every value stringified. Used for engine items, which carry
/// whatever fields the engine chose to send.
pub fn generic_csv(items: &[Value]) -> Result<String> {
    let mut columns: Vec<&str> = Vec::new();
    for item in items {
        if let Some(object) = item.as_object() {
            for key in object.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key.as_str());
                }
            }
        }
    }

    let mut wtr = csv_writer();
    if columns.is_empty() {
        return finish(wtr);
    }
    wtr.write_record(&columns)?;
    for item in items {
        let row: Vec<String> = columns
            .iter()
            .map(|key| item.get(*key).map(cell).unwrap_or_default())
            .collect();
        wtr.write_record(&row)?;
    }
    finish(wtr)
}

/// Render `items` in `format`, picking the CSV layout by entity and provider.
pub fn render(
    format: ExportFormat,
    provider: Provider,
    entity: Entity,
    query: &str,
    items: &[Value],
) -> Result<String> {
    match (format, entity) {
        (ExportFormat::Json, _) => to_json(items),
        (ExportFormat::Csv, Entity::Authors) => authors_csv(items),
        (ExportFormat::Csv, Entity::Works) if provider == Provider::Serper => generic_csv(items),
        (ExportFormat::Csv, Entity::Works) => works_csv(items, provider, query),
    }
}

/// `<provider>-<entity>-<query>-<timestamp>.<ext>`, safe for the filesystem.
pub fn export_filename(
    provider: Provider,
    entity: Entity,
    query: &str,
    format: ExportFormat,
    timestamp: &DateTime<Utc>,
) -> String {
    let query = filename_query(query);
    let ts = timestamp
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace(':', "-");
    format!("{}-{}-{}-{}.{}", provider.id(), entity, query, ts, format.extension())
}

/// Longest query fragment kept in an export filename, in bytes.
pub const MAX_FILENAME_QUERY_BYTES: usize = 80;

fn filename_query(query: &str) -> String {
    let query = query.trim();
    if query.is_empty() {
        return "query".to_string();
    }
    let mut end = query.len().min(MAX_FILENAME_QUERY_BYTES);
    while !query.is_char_boundary(end) {
        end -= 1;
    }
    query[..end]
        .trim_end()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Write an export into `dir` (created if needed) and return the file path.
pub fn write_export(
    dir: &Path,
    format: ExportFormat,
    provider: Provider,
    entity: Entity,
    query: &str,
    items: &[Value],
) -> Result<PathBuf> {
    let content = render(format, provider, entity, query, items)?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_filename(provider, entity, query, format, &Utc::now()));
    std::fs::write(&path, content)?;
    info!(path = %path.display(), rows = items.len(), format = %format, "Export written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_quoted_cell_round_trips() {
        let title = r#"Ships, "smart" crews"#;
        let items = vec![json!({"display_name": title, "publication_year": 2020})];
        let csv_text = works_csv(&items, Provider::OpenAlex, "q").expect("csv");

        assert!(csv_text.contains(r#""Ships, ""smart"" crews""#));

        let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
        let headers = reader.headers().expect("headers").clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), WORK_COLUMNS.to_vec());
        let record = reader.records().next().expect("one row").expect("valid row");
        assert_eq!(&record[1], title);
        assert_eq!(&record[5], "2020");
    }

    #[test]
    fn test_graph_export_row_uses_structured_venue() {
        let item = json!({
            "id": "https://openalex.org/W1",
            "display_name": "T",
            "primary_location": {"display_name": "Location Name", "source": {"display_name": "Source Name"}},
            "concepts": [{"display_name": "a", "score": 0.2}, {"display_name": "b", "score": 0.8}],
        });
        let row = ExportRow::derive(Provider::OpenAlex, &item, "ship*").expect("row");
        assert_eq!(row.source_engine, "Source Name");
        assert_eq!(row.skills, "b; a");
        assert_eq!(row.link, "https://openalex.org/W1");
        assert_eq!(row.query, "ship*");
        assert_eq!(row.publication_year, None);
    }

    #[test]
    fn test_registry_export_row_uses_view() {
        let item = json!({"title": ["Reg"], "container-title": ["Journal"], "publisher": "Pub", "DOI": "10.1/r"});
        let row = ExportRow::derive(Provider::Crossref, &item, "").expect("row");
        assert_eq!(row.source_engine, "Journal");
        assert_eq!(row.doi, "10.1/r");
        assert_eq!(row.publisher_or_author, "Pub");
    }

    #[test]
    fn test_authors_csv_columns() {
        let items = vec![
            json!({"id": "A1", "display_name": "Ada", "works_count": 12, "cited_by_count": 300, "extra": true}),
            json!({"id": "A2"}),
        ];
        let text = authors_csv(&items).expect("csv");
        assert_eq!(text, "id,display_name,works_count,cited_by_count\nA1,Ada,12,300\nA2,,,\n");
    }

    #[test]
    fn test_empty_works_csv_is_header_only() {
        let text = works_csv(&[], Provider::Crossref, "x").expect("csv");
        assert_eq!(text, format!("{}\n", WORK_COLUMNS.join(",")));
    }

    #[test]
    fn test_generic_csv_unions_keys_and_stringifies() {
        let items = vec![
            json!({"title": "One", "year": 2001}),
            json!({"title": "Two, too", "link": "https://x", "inline": {"a": 1}, "year": null}),
        ];
        let text = generic_csv(&items).expect("csv");
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("title,year,link,inline"));
        assert_eq!(lines.next(), Some("One,2001,,"));
        assert_eq!(lines.next(), Some(r#""Two, too",,https://x,"{""a"":1}""#));
    }

    #[test]
    fn test_json_export_is_pretty_and_unmapped() {
        let items = vec![json!({"id": "W1", "weird": [1, 2]})];
        let text = to_json(&items).expect("json");
        assert!(text.contains("\n  {\n"));
        let back: Vec<Value> = serde_json::from_str(&text).expect("parse");
        assert_eq!(back, items);
    }

    #[test]
    fn test_export_filename() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 10, 20, 30).single().expect("valid time");
        let name = export_filename(Provider::Crossref, Entity::Works, "a/b OR c", ExportFormat::Csv, &ts);
        assert_eq!(name, "crossref-works-a_b OR c-2024-05-01T10-20-30.000Z.csv");
        assert!(!name.contains(':'));

        let name = export_filename(Provider::OpenAlex, Entity::Authors, "  ", ExportFormat::Json, &ts);
        assert!(name.starts_with("openalex-authors-query-"));
    }

    #[test]
    fn test_long_query_is_truncated_on_char_boundary() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 10, 20, 30).single().expect("valid time");
        let query = format!("a{}", "é".repeat(50));
        let name = export_filename(Provider::OpenAlex, Entity::Works, &query, ExportFormat::Csv, &ts);
        assert_eq!(name, format!("openalex-works-a{}-2024-05-01T10-20-30.000Z.csv", "é".repeat(39)));

        let name = export_filename(Provider::Arxiv, Entity::Works, r#"("Ship*" OR "a:b")"#, ExportFormat::Json, &ts);
        assert_eq!(name, "arxiv-works-(_Ship__ OR _a_b_)-2024-05-01T10-20-30.000Z.json");
    }

    #[test]
    fn test_write_export_to_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let items = vec![json!({"title": "hit", "link": "https://x"})];
        let path = write_export(dir.path(), ExportFormat::Csv, Provider::Serper, Entity::Works, "q", &items)
            .expect("write");

        assert!(path.starts_with(dir.path()));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("csv"));
        let written = std::fs::read_to_string(&path).expect("read back");
        assert_eq!(written, "title,link\nhit,https://x\n");
    }

    #[test]
    fn test_write_export_with_long_taxonomy_query() {
        use crate::taxonomy::{build_query, category, CategoryId, Selections};

        let mut selections = Selections::default();
        for id in [CategoryId::Technology, CategoryId::Human] {
            for term in category(id).terms.iter().take(10) {
                selections.select(id, term.to_string());
            }
        }
        let query = build_query(&selections, None);
        assert!(query.len() > 300);

        let dir = tempfile::tempdir().expect("tempdir");
        let items = vec![json!({"display_name": "hit", "publication_year": 2021})];
        let path = write_export(dir.path(), ExportFormat::Csv, Provider::OpenAlex, Entity::Works, &query, &items)
            .expect("write");

        let name = path.file_name().and_then(|n| n.to_str()).expect("file name");
        assert!(name.len() < 255);
        assert!(std::fs::read_to_string(&path).expect("read back").contains("hit"));
    }
}
