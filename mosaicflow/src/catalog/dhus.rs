//! DHuS (Data Hub Service) catalog client.
//!
//! Searches go through the OpenSearch endpoint (`/search`), product metadata
//! and content through OData (`/odata/v1/Products('<id>')`). All requests use
//! HTTP basic authentication.

use super::verify::SNIFF_LEN;
use super::{CatalogClient, ContentVerifier, FetchVerifier, FetchedProduct, ProductRecord, SearchCriteria};
use crate::config::CatalogConfig;
use crate::errors::{CatalogUnavailableError, ConfigurationError, FetchError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use futures::StreamExt;
use md5::{Digest, Md5};
use regex::Regex;
use reqwest::{Client, RequestBuilder, Response};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Client for a DHuS hub.
pub struct DhusClient {
    client: Client,
    config: CatalogConfig,
    verifier: Arc<dyn FetchVerifier>,
}

impl std::fmt::Debug for DhusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DhusClient")
            .field("url", &self.config.url)
            .field("user", &self.config.user)
            .finish_non_exhaustive()
    }
}

/// Product metadata from the OData endpoint.
#[derive(Debug, Clone, PartialEq)]
struct ProductInfo {
    title: String,
    md5: Option<String>,
    size: Option<u64>,
    ingestion_date: Option<DateTime<Utc>>,
}

impl ProductInfo {
    fn into_record(self, id: &str) -> ProductRecord {
        let mut record = ProductRecord::new(id, self.title, self.ingestion_date.unwrap_or_default());
        if let Some(md5) = self.md5 {
            record = record.with_extra("md5", serde_json::json!(md5));
        }
        if let Some(size) = self.size {
            record = record.with_extra("size", serde_json::json!(size));
        }
        record
    }
}

impl DhusClient {
    /// Creates a client with the default content verifier.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the configuration is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: CatalogConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let client = Client::builder()
            .connect_timeout(config.timeout())
            .build()
            .map_err(|e| ConfigurationError::parse(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            verifier: Arc::new(ContentVerifier),
        })
    }

    /// Replaces the fetch verifier.
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn FetchVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.config.user, Some(self.config.password.expose()))
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.config.base_url())
    }

    fn product_url(&self, product_id: &str) -> String {
        format!("{}/odata/v1/Products({})", self.config.base_url(), odata_key(product_id))
    }

    fn unavailable(&self, err: &reqwest::Error) -> CatalogUnavailableError {
        if err.is_timeout() || err.is_connect() {
            CatalogUnavailableError::connect(self.endpoint(), err.to_string())
        } else {
            CatalogUnavailableError::protocol(self.endpoint(), err.to_string())
        }
    }

    async fn check_status(&self, response: Response) -> Result<Response, CatalogUnavailableError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            Err(CatalogUnavailableError::auth(self.endpoint(), format!("HTTP {status}")))
        } else {
            Err(CatalogUnavailableError::protocol(
                self.endpoint(),
                format!("HTTP {status}: {snippet}"),
            ))
        }
    }

    async fn search_page(&self, query: &str, start: usize) -> Result<serde_json::Value, CatalogUnavailableError> {
        let params = [
            ("q", query.to_string()),
            ("format", "json".to_string()),
            ("rows", self.config.page_size.to_string()),
            ("start", start.to_string()),
        ];
        let request = self
            .authed(self.client.get(self.search_url()))
            .timeout(self.config.timeout())
            .query(&params);

        let response = request.send().await.map_err(|e| self.unavailable(&e))?;
        let response = self.check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| CatalogUnavailableError::protocol(self.endpoint(), format!("invalid search response: {e}")))
    }

    async fn product_info(&self, product_id: &str) -> Result<ProductInfo, FetchError> {
        let request = self
            .authed(self.client.get(self.product_url(product_id)))
            .timeout(self.config.timeout())
            .query(&[("$format", "json")]);

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::new(product_id, format!("metadata request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(FetchError::new(
                product_id,
                format!("metadata request returned HTTP {}", response.status()),
            ));
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FetchError::new(product_id, format!("invalid metadata response: {e}")))?;

        parse_product_info(&body).map_err(|reason| FetchError::new(product_id, reason))
    }

    /// Streams the product content into `partial`, returning the leading
    /// bytes and the MD5 digest of everything written.
    async fn download_to(&self, product_id: &str, partial: &Path) -> Result<(Vec<u8>, String), FetchError> {
        let request = self.authed(self.client.get(format!("{}/$value", self.product_url(product_id))));
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::new(product_id, format!("download request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(FetchError::new(
                product_id,
                format!("download returned HTTP {}", response.status()),
            ));
        }

        let io_err = |e: std::io::Error| FetchError::new(product_id, format!("cannot write {}: {e}", partial.display()));
        let mut file = tokio::fs::File::create(partial).await.map_err(io_err)?;
        let mut hasher = Md5::new();
        let mut head = Vec::with_capacity(SNIFF_LEN);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::new(product_id, format!("download interrupted: {e}")))?;
            if head.len() < SNIFF_LEN {
                let take = (SNIFF_LEN - head.len()).min(chunk.len());
                head.extend_from_slice(&chunk[..take]);
            }
            hasher.update(&chunk);
            file.write_all(&chunk).await.map_err(io_err)?;
        }
        file.flush().await.map_err(io_err)?;

        Ok((head, format!("{:x}", hasher.finalize())))
    }
}

#[async_trait]
impl CatalogClient for DhusClient {
    fn endpoint(&self) -> String {
        self.config.base_url().to_string()
    }

    async fn connect(&self) -> Result<(), CatalogUnavailableError> {
        let request = self
            .authed(self.client.get(self.search_url()))
            .timeout(self.config.timeout())
            .query(&[("q", "*"), ("format", "json"), ("rows", "1")]);

        let response = request.send().await.map_err(|e| self.unavailable(&e))?;
        self.check_status(response).await?;
        debug!(endpoint = %self.endpoint(), user = %self.config.user, "Connected to catalog");
        Ok(())
    }

    async fn query(&self, criteria: &SearchCriteria) -> Result<Vec<ProductRecord>, CatalogUnavailableError> {
        let query = build_query(criteria);
        debug!(query = %query, "Querying catalog");

        let rows = self.config.page_size as usize;
        let mut records = Vec::new();
        let mut start = 0usize;
        loop {
            let body = self.search_page(&query, start).await?;
            let (page, total) = parse_search_response(&body)
                .map_err(|reason| CatalogUnavailableError::protocol(self.endpoint(), reason))?;
            let page_len = page.len();
            records.extend(page);
            start += page_len;
            if page_len < rows || total.is_some_and(|t| start >= t) {
                break;
            }
        }
        Ok(records)
    }

    async fn fetch(&self, product_id: &str, dest_dir: &Path) -> Result<FetchedProduct, FetchError> {
        let info = self.product_info(product_id).await?;
        let path = artifact_path(dest_dir, &info.title).map_err(|reason| FetchError::new(product_id, reason))?;
        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| FetchError::new(product_id, format!("cannot create {}: {e}", dest_dir.display())))?;

        if let Some(expected) = &info.md5 {
            if let Ok(existing) = file_md5(&path).await {
                if existing.eq_ignore_ascii_case(expected) {
                    debug!(product_id, path = %path.display(), "Product already downloaded");
                    return Ok(FetchedProduct {
                        path,
                        record: info.into_record(product_id),
                    });
                }
            }
        }

        let partial = partial_path(&path);
        let (head, digest) = match self.download_to(product_id, &partial).await {
            Ok(result) => result,
            Err(err) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(err);
            }
        };

        if let Err(reason) = self.verifier.verify(&head, &digest, info.md5.clone()) {
            warn!(product_id, reason = %reason, "Downloaded content failed verification");
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(FetchError::new(product_id, reason));
        }

        tokio::fs::rename(&partial, &path)
            .await
            .map_err(|e| FetchError::new(product_id, format!("cannot finalize {}: {e}", path.display())))?;
        info!(product_id, path = %path.display(), "Product downloaded");

        Ok(FetchedProduct {
            path,
            record: info.into_record(product_id),
        })
    }
}

/// OData key literal for a product id: quotes doubled, then percent-encoded.
fn odata_key(product_id: &str) -> String {
    let literal = format!("'{}'", product_id.replace('\'', "''"));
    urlencoding::encode(&literal).into_owned()
}

/// Where a product titled `title` is stored inside `dest_dir`.
///
/// The title comes from the hub, so it must name a plain file: no
/// separators, no parent or current directory components, no root.
fn artifact_path(dest_dir: &Path, title: &str) -> Result<PathBuf, String> {
    let plain = !title.is_empty()
        && !title.contains(['/', '\\', '\0'])
        && title != "."
        && title != ".."
        && Path::new(title).file_name() == Some(std::ffi::OsStr::new(title));
    if !plain {
        return Err(format!("product title {title:?} is not a plain file name"));
    }
    Ok(dest_dir.join(format!("{title}.zip")))
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(".incomplete");
    path.with_file_name(name)
}

async fn file_md5(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Normalises a date for the `beginPosition` range.
///
/// `NOW` expressions pass through, calendar dates become midnight UTC.
fn format_date(date: &str) -> String {
    let date = date.trim();
    if date.starts_with("NOW") {
        return date.to_string();
    }
    for fmt in ["%Y-%m-%d", "%Y%m%d"] {
        if let Ok(day) = NaiveDate::parse_from_str(date, fmt) {
            return format!("{}T00:00:00Z", day.format("%Y-%m-%d"));
        }
    }
    parse_timestamp(date).map_or_else(|| date.to_string(), |ts| ts.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

/// Builds the OpenSearch query string for the criteria.
fn build_query(criteria: &SearchCriteria) -> String {
    let mut query = format!(
        "beginPosition:[{} TO {}] AND footprint:\"Intersects({})\"",
        format_date(&criteria.start_date),
        format_date(&criteria.end_date),
        criteria.footprint.to_wkt()
    );
    if let Some(platform) = &criteria.platform_name {
        query.push_str(&format!(" AND platformname:{platform}"));
    }
    if let Some(identifier) = &criteria.identifier {
        query.push_str(&format!(" AND identifier:{identifier}"));
    }
    query
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn odata_date_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^/Date\((-?\d+)\)/$").ok()).as_ref()
}

/// Parses `/Date(<millis>)/` or an ISO timestamp.
fn parse_odata_date(value: &str) -> Option<DateTime<Utc>> {
    odata_date_pattern()
        .and_then(|p| p.captures(value))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
        .or_else(|| parse_timestamp(value))
}

fn as_list(value: Option<&serde_json::Value>) -> Vec<&serde_json::Value> {
    match value {
        Some(serde_json::Value::Array(items)) => items.iter().collect(),
        Some(item @ serde_json::Value::Object(_)) => vec![item],
        _ => Vec::new(),
    }
}

fn parse_entry(entry: &serde_json::Value) -> Result<ProductRecord, String> {
    let field = |name: &str| entry.get(name).and_then(serde_json::Value::as_str);
    let id = field("id").ok_or("search entry without id")?;
    let title = field("title").ok_or_else(|| format!("product {id} has no title"))?;

    let mut ingestion_date = None;
    let mut extra = BTreeMap::new();
    for group in ["date", "str", "int", "double", "bool"] {
        for item in as_list(entry.get(group)) {
            let Some(name) = item.get("name").and_then(serde_json::Value::as_str) else {
                continue;
            };
            let content = item.get("content").cloned().unwrap_or(serde_json::Value::Null);
            if name == "ingestiondate" {
                ingestion_date = content.as_str().and_then(parse_timestamp);
            } else {
                extra.insert(name.to_string(), content);
            }
        }
    }

    let ingestion_date = ingestion_date.ok_or_else(|| format!("product {id} has no ingestiondate"))?;
    let mut record = ProductRecord::new(id, title, ingestion_date).with_summary(field("summary").unwrap_or_default());
    record.extra = extra;
    Ok(record)
}

/// Parses one OpenSearch JSON page into records and the advertised total.
fn parse_search_response(body: &serde_json::Value) -> Result<(Vec<ProductRecord>, Option<usize>), String> {
    let feed = body.get("feed").ok_or("search response has no feed")?;
    let total = feed.get("opensearch:totalResults").and_then(|t| match t {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        _ => None,
    });
    let records = as_list(feed.get("entry"))
        .into_iter()
        .map(parse_entry)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((records, total))
}

fn parse_product_info(body: &serde_json::Value) -> Result<ProductInfo, String> {
    let d = body.get("d").ok_or("metadata response has no 'd' object")?;
    let title = d
        .get("Name")
        .and_then(serde_json::Value::as_str)
        .ok_or("metadata response has no product name")?
        .to_string();
    let md5 = d
        .get("Checksum")
        .filter(|c| {
            c.get("Algorithm")
                .and_then(serde_json::Value::as_str)
                .map_or(true, |a| a.eq_ignore_ascii_case("md5"))
        })
        .and_then(|c| c.get("Value"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);
    let size = d.get("ContentLength").and_then(|v| match v {
        serde_json::Value::String(s) => s.parse().ok(),
        other => other.as_u64(),
    });
    let ingestion_date = d
        .get("IngestionDate")
        .and_then(serde_json::Value::as_str)
        .and_then(parse_odata_date);

    Ok(ProductInfo {
        title,
        md5,
        size,
        ingestion_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Footprint, MockFetchVerifier};
    use crate::errors::UnavailableKind;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    struct Reply {
        status: u16,
        content_type: &'static str,
        body: Vec<u8>,
    }

    fn json_reply(status: u16, body: serde_json::Value) -> Reply {
        Reply {
            status,
            content_type: "application/json",
            body: body.to_string().into_bytes(),
        }
    }

    fn bytes_reply(body: &[u8]) -> Reply {
        Reply {
            status: 200,
            content_type: "application/octet-stream",
            body: body.to_vec(),
        }
    }

    /// Serves the replies in order, one connection each, and returns the
    /// request lines it saw.
    async fn serve(replies: Vec<Reply>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/dhus", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            for reply in replies {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                let text = String::from_utf8_lossy(&request).to_string();
                seen.push(text.lines().next().unwrap_or_default().to_string());

                let head = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    reply.status,
                    reply.content_type,
                    reply.body.len()
                );
                socket.write_all(head.as_bytes()).await.unwrap();
                socket.write_all(&reply.body).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            seen
        });

        (url, handle)
    }

    fn client(url: &str) -> DhusClient {
        DhusClient::new(CatalogConfig::new(url, "alice", "pw").with_timeout(5.0)).unwrap()
    }

    fn entry(id: &str, title: &str, ingestion: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "title": title,
            "summary": format!("Date: {ingestion}"),
            "date": [
                {"name": "ingestiondate", "content": ingestion},
                {"name": "beginposition", "content": ingestion}
            ],
            "str": {"name": "platformname", "content": "Sentinel-1"}
        })
    }

    fn criteria() -> SearchCriteria {
        SearchCriteria::new(Footprint::from_bbox(10.0, 40.0, 11.0, 41.0).unwrap(), "2017-03-01", "NOW")
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("NOW-1DAY"), "NOW-1DAY");
        assert_eq!(format_date("2017-03-01"), "2017-03-01T00:00:00Z");
        assert_eq!(format_date("20170301"), "2017-03-01T00:00:00Z");
        assert_eq!(format_date("2017-03-01T10:30:00+02:00"), "2017-03-01T08:30:00Z");
    }

    #[test]
    fn test_build_query() {
        let query = build_query(&criteria().with_platform_name("Sentinel-1").with_identifier("S1A_X"));
        assert_eq!(
            query,
            "beginPosition:[2017-03-01T00:00:00Z TO NOW] AND \
             footprint:\"Intersects(POLYGON((10 40,11 40,11 41,10 41,10 40)))\" \
             AND platformname:Sentinel-1 AND identifier:S1A_X"
        );
    }

    #[test]
    fn test_parse_single_entry_object() {
        let body = serde_json::json!({
            "feed": {
                "opensearch:totalResults": "1",
                "entry": entry("uuid-1", "S1A_1", "2017-03-01T10:00:00.123Z")
            }
        });

        let (records, total) = parse_search_response(&body).unwrap();
        assert_eq!(total, Some(1));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "uuid-1");
        assert_eq!(records[0].extra.get("platformname"), Some(&serde_json::json!("Sentinel-1")));
        assert!(records[0].extra.contains_key("beginposition"));
    }

    #[test]
    fn test_parse_empty_feed() {
        let body = serde_json::json!({"feed": {"opensearch:totalResults": "0"}});
        let (records, total) = parse_search_response(&body).unwrap();
        assert!(records.is_empty());
        assert_eq!(total, Some(0));
    }

    #[test]
    fn test_parse_entry_without_ingestion() {
        let body = serde_json::json!({"feed": {"entry": [{"id": "x", "title": "X"}]}});
        let err = parse_search_response(&body).unwrap_err();
        assert!(err.contains("ingestiondate"));
    }

    #[test]
    fn test_parse_product_info() {
        let body = serde_json::json!({
            "d": {
                "Id": "uuid-1",
                "Name": "S1A_1",
                "ContentLength": "1024",
                "IngestionDate": "/Date(1488362400000)/",
                "Checksum": {"Algorithm": "MD5", "Value": "ABCDEF"}
            }
        });

        let info = parse_product_info(&body).unwrap();
        assert_eq!(info.title, "S1A_1");
        assert_eq!(info.md5.as_deref(), Some("ABCDEF"));
        assert_eq!(info.size, Some(1024));
        assert_eq!(info.ingestion_date, Utc.timestamp_millis_opt(1_488_362_400_000).single());
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/data/S1A_1.zip")),
            PathBuf::from("/data/S1A_1.zip.incomplete")
        );
    }

    #[test]
    fn test_artifact_path_stays_in_dest_dir() {
        let dest = Path::new("/data/s1");
        assert_eq!(artifact_path(dest, "S1A_1").unwrap(), PathBuf::from("/data/s1/S1A_1.zip"));
        for title in ["", ".", "..", "../x", "/etc/x", "a/b", "a\\b"] {
            assert!(artifact_path(dest, title).is_err(), "{title:?} accepted");
        }
    }

    #[test]
    fn test_product_url_escapes_id() {
        let client = client("http://hub.example.org/dhus");
        assert_eq!(
            client.product_url("uuid-1"),
            "http://hub.example.org/dhus/odata/v1/Products(%27uuid-1%27)"
        );
        assert_eq!(
            client.product_url("it's a/b"),
            "http://hub.example.org/dhus/odata/v1/Products(%27it%27%27s%20a%2Fb%27)"
        );
    }

    #[tokio::test]
    async fn test_query_follows_pages() {
        let (url, server) = serve(vec![
            json_reply(200, serde_json::json!({"feed": {
                "opensearch:totalResults": "3",
                "entry": [entry("a", "A", "2017-03-01T10:00:00Z"), entry("b", "B", "2017-03-01T11:00:00Z")]
            }})),
            json_reply(200, serde_json::json!({"feed": {
                "opensearch:totalResults": "3",
                "entry": entry("c", "C", "2017-03-01T12:00:00Z")
            }})),
        ])
        .await;

        let mut config = CatalogConfig::new(&url, "alice", "pw").with_timeout(5.0);
        config.page_size = 2;
        let client = DhusClient::new(config).unwrap();

        let records = client.query(&criteria()).await.unwrap();
        assert_eq!(records.len(), 3);

        let requests = server.await.unwrap();
        assert!(requests[0].contains("start=0"));
        assert!(requests[1].contains("start=2"));
    }

    #[tokio::test]
    async fn test_connect_rejected_credentials() {
        let (url, _server) = serve(vec![json_reply(401, serde_json::json!({}))]).await;

        let err = client(&url).connect().await.unwrap_err();
        assert_eq!(err.kind, UnavailableKind::Auth);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/dhus", listener.local_addr().unwrap());
        drop(listener);

        let err = client(&url).connect().await.unwrap_err();
        assert_eq!(err.kind, UnavailableKind::Connect);
    }

    #[tokio::test]
    async fn test_fetch_writes_verified_product() {
        let content = b"PK\x03\x04product-bytes".to_vec();
        let digest = format!("{:x}", Md5::digest(&content));
        let (url, _server) = serve(vec![
            json_reply(200, serde_json::json!({"d": {"Name": "S1A_1", "Checksum": {"Algorithm": "MD5", "Value": digest}}})),
            bytes_reply(&content),
        ])
        .await;
        let dir = tempfile::tempdir().unwrap();

        let fetched = client(&url).fetch("uuid-1", dir.path()).await.unwrap();

        assert_eq!(fetched.path, dir.path().join("S1A_1.zip"));
        assert_eq!(std::fs::read(&fetched.path).unwrap(), content);
        assert!(!dir.path().join("S1A_1.zip.incomplete").exists());
        assert_eq!(fetched.record.id, "uuid-1");
    }

    #[tokio::test]
    async fn test_fetch_rejects_error_document() {
        let (url, _server) = serve(vec![
            json_reply(200, serde_json::json!({"d": {"Name": "S1A_2"}})),
            bytes_reply(br#"<?xml version="1.0"?><error><message>Maximum number of 2 concurrent flows achieved</message></error>"#),
        ])
        .await;
        let dir = tempfile::tempdir().unwrap();

        let err = client(&url).fetch("uuid-2", dir.path()).await.unwrap_err();

        assert_eq!(err.product_id, "uuid-2");
        assert!(err.reason.contains("concurrent flows"));
        assert!(!dir.path().join("S1A_2.zip").exists());
        assert!(!dir.path().join("S1A_2.zip.incomplete").exists());
    }

    #[tokio::test]
    async fn test_fetch_uses_injected_verifier() {
        let (url, _server) = serve(vec![
            json_reply(200, serde_json::json!({"d": {"Name": "S1A_3"}})),
            bytes_reply(b"PK\x03\x04"),
        ])
        .await;
        let dir = tempfile::tempdir().unwrap();

        let mut verifier = MockFetchVerifier::new();
        verifier
            .expect_verify()
            .times(1)
            .returning(|_, _, _| Err("rejected by policy".to_string()));

        let err = client(&url)
            .with_verifier(Arc::new(verifier))
            .fetch("uuid-3", dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.reason, "rejected by policy");
    }

    #[tokio::test]
    async fn test_fetch_rejects_title_outside_dest_dir() {
        for title in ["../escaped", "/tmp/absolute"] {
            let (url, server) = serve(vec![json_reply(200, serde_json::json!({"d": {"Name": title}}))]).await;
            let root = tempfile::tempdir().unwrap();
            let dest = root.path().join("downloads");

            let err = client(&url).fetch("uuid-x", &dest).await.unwrap_err();

            assert_eq!(err.product_id, "uuid-x");
            assert!(err.reason.contains("not a plain file name"));
            assert!(!root.path().join("escaped.zip").exists());
            assert!(!dest.exists());
            assert_eq!(server.await.unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_fetch_missing_product() {
        let (url, _server) = serve(vec![json_reply(404, serde_json::json!({}))]).await;
        let dir = tempfile::tempdir().unwrap();

        let err = client(&url).fetch("nope", dir.path()).await.unwrap_err();
        assert!(err.reason.contains("404"));
    }
}
