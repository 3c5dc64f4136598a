use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for a collection source
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub extract: ExtractConfig,
    pub identity: IdentityConfig,
    pub output: OutputConfig,
}

/// Source endpoint and pagination behavior
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Short name used in logs and messages
    pub name: String,

    /// Endpoint template; `{page}`, `{offset}` and `{limit}` are substituted
    /// per request
    pub endpoint: String,

    /// HTTP method for page requests
    #[serde(default)]
    pub method: HttpMethod,

    /// Form body template for POST sources, same placeholders as `endpoint`
    #[serde(default)]
    pub body: Option<String>,

    /// Number of records one full page carries
    #[serde(rename = "page-size")]
    pub page_size: u32,

    /// Maximum number of page fetches in flight at once
    pub concurrency: u32,

    /// How the end of the listing is discovered
    pub discovery: DiscoveryMode,

    /// Hard ceiling on the highest page index ever requested
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Per-request timeout in seconds
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Extra request headers sent with every page fetch
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl SourceConfig {
    /// Renders the endpoint template for one page request
    pub fn page_url(&self, index: u32, offset: u64) -> String {
        fill_template(&self.endpoint, index, offset, self.page_size)
    }

    /// Renders the form body template for one page request, if any
    pub fn page_body(&self, index: u32, offset: u64) -> Option<String> {
        self.body
            .as_deref()
            .map(|body| fill_template(body, index, offset, self.page_size))
    }

    /// True when either template mentions a per-page placeholder
    pub fn has_page_placeholder(&self) -> bool {
        let templates = [Some(self.endpoint.as_str()), self.body.as_deref()];
        templates.into_iter().flatten().any(|template| {
            template.contains("{page}") || template.contains("{offset}")
        })
    }
}

fn fill_template(template: &str, index: u32, offset: u64, limit: u32) -> String {
    template
        .replace("{page}", &index.to_string())
        .replace("{offset}", &offset.to_string())
        .replace("{limit}", &limit.to_string())
}

/// How the total extent of the listing becomes known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoveryMode {
    /// Page 1 reveals the total; remaining pages are fetched in one batch
    KnownTotal,
    /// No total is advertised; pages are probed in batches until one
    /// signals the end
    Sentinel,
}

/// HTTP method for page requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

/// Payload format and extraction rules
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    /// Shape of the page payload
    pub format: PayloadFormat,

    /// CSS selector matching one record element (html and json-html)
    #[serde(rename = "record-selector", default)]
    pub record_selector: Option<String>,

    /// Dot path to the record array inside a JSON payload
    #[serde(rename = "records-path", default)]
    pub records_path: Option<String>,

    /// Dot path to the HTML fragment inside a JSON envelope
    #[serde(rename = "fragment-path", default)]
    pub fragment_path: Option<String>,

    /// Field extraction rules, applied per record element
    #[serde(rename = "field", default)]
    pub fields: Vec<FieldRule>,

    /// How a page reports whether and how much more follows
    pub pagination: PaginationRule,
}

/// Shape of a page payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadFormat {
    /// Server-rendered HTML document or fragment
    Html,
    /// JSON document carrying record objects
    Json,
    /// JSON envelope carrying a rendered HTML fragment
    JsonHtml,
}

/// One named field with an ordered list of extraction attempts
#[derive(Debug, Clone, Deserialize)]
pub struct FieldRule {
    /// Field name as it appears in records and output columns
    pub name: String,

    /// Attempts tried in order; the first that yields a value wins
    pub steps: Vec<ExtractStep>,
}

/// A single extraction attempt within a field rule
///
/// HTML steps address an element inside the record element via `selector`
/// (or the record element itself when absent) and read `attr` or the text
/// content. JSON steps address a value via `path`. Either way an optional
/// `pattern` refines the raw value to its first capture group.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractStep {
    #[serde(default)]
    pub selector: Option<String>,

    #[serde(default)]
    pub attr: Option<String>,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub pattern: Option<String>,
}

/// Continuation rule: how a page signals what follows it
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationRule {
    pub rule: PaginationKind,

    /// Element carrying the signal (html payloads)
    #[serde(default)]
    pub selector: Option<String>,

    /// Attribute to read from that element; text content when absent,
    /// except page-links which falls back to `href`
    #[serde(default)]
    pub attr: Option<String>,

    /// Dot path carrying the signal (json payloads)
    #[serde(default)]
    pub path: Option<String>,

    /// Pattern extracting or testing the signal value
    #[serde(default)]
    pub pattern: Option<String>,
}

/// Supported continuation signal shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaginationKind {
    /// Highest page number found among pager links
    PageLinks,
    /// Total record count advertised by the page
    TotalField,
    /// A "more follows" marker that disappears on the last page
    MoreMarker,
    /// More follows as long as the page yields any records
    NonEmpty,
}

/// De-duplication identity
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Candidate key fields, highest priority first
    #[serde(rename = "key-fields")]
    pub key_fields: Vec<String>,
}

/// Output destination
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the CSV file to write
    pub path: String,

    /// Column order; records missing a column produce an empty cell
    pub columns: Vec<String>,
}

fn default_max_pages() -> u32 {
    200
}

fn default_request_timeout() -> u64 {
    60
}
