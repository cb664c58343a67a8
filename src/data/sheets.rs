//! Google Sheets CSV export integration.
//!
//! A tab of a spreadsheet that is shared "anyone with the link" can be read as CSV
//! through the visualization (gviz) endpoint without an API key.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;

use crate::domain::{DataSource, RawTable, SheetRef};
use crate::error::PipelineError;

const BASE_URL: &str = "https://docs.google.com/spreadsheets/d/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can hand back the raw CSV text of the dashboard table.
pub trait SheetSource {
    /// Short human-readable description used in status lines and logs.
    fn describe(&self) -> String;

    fn fetch_csv(&self) -> Result<String, PipelineError>;
}

/// Reads a published tab over HTTPS.
pub struct SheetsClient {
    client: Client,
    sheet: SheetRef,
    base_url: String,
}

impl SheetsClient {
    pub fn new(sheet: SheetRef) -> Result<Self, PipelineError> {
        if sheet.sheet_id.trim().is_empty() || sheet.sheet_name.is_empty() {
            return Err(PipelineError::Fetch(
                "spreadsheet ID and sheet name are both required".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PipelineError::Fetch(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            sheet,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Point the client at another host (local test servers), bypassing any proxy.
    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .no_proxy()
            .build()
            .unwrap();
        self.base_url = base_url.into();
        self
    }
}

impl SheetSource for SheetsClient {
    fn describe(&self) -> String {
        format!("sheet {}", self.sheet)
    }

    fn fetch_csv(&self) -> Result<String, PipelineError> {
        let url = export_url_from(&self.base_url, &self.sheet)?;
        tracing::debug!(%url, "fetching sheet export");

        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| PipelineError::Fetch(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(PipelineError::Fetch(format!(
                "request failed with status {}",
                resp.status()
            )));
        }

        // A private sheet answers 200 with a sign-in page instead of CSV.
        let is_html = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/html"));
        if is_html {
            return Err(PipelineError::Fetch(
                "received an HTML page instead of CSV; is the sheet shared publicly?".to_string(),
            ));
        }

        resp.text()
            .map_err(|e| PipelineError::Fetch(format!("failed to read response body: {e}")))
    }
}

/// Reads a CSV file previously downloaded from the export endpoint.
pub struct LocalCsv {
    path: PathBuf,
}

impl LocalCsv {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SheetSource for LocalCsv {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    fn fetch_csv(&self) -> Result<String, PipelineError> {
        tracing::debug!(path = %self.path.display(), "reading local CSV");
        std::fs::read_to_string(&self.path).map_err(|e| {
            PipelineError::Fetch(format!("failed to read '{}': {e}", self.path.display()))
        })
    }
}

/// Build the boxed source for a configured data source.
pub fn open_source(source: &DataSource) -> Result<Box<dyn SheetSource>, PipelineError> {
    Ok(match source {
        DataSource::Sheet(sheet) => Box::new(SheetsClient::new(sheet.clone())?),
        DataSource::File(path) => Box::new(LocalCsv::new(path.clone())),
    })
}

/// Fetch a published tab and parse it into a raw table.
pub fn fetch(sheet: &SheetRef) -> Result<RawTable, PipelineError> {
    read_table(&SheetsClient::new(sheet.clone())?)
}

/// Pull CSV text from any source and parse it.
pub fn read_table(source: &dyn SheetSource) -> Result<RawTable, PipelineError> {
    let text = source.fetch_csv()?;
    crate::io::ingest::parse_csv(&text)
}

/// Export URL for a sheet tab.
///
/// `https://docs.google.com/spreadsheets/d/{id}/gviz/tq?tqx=out:csv&sheet={name}`
pub fn export_url(sheet: &SheetRef) -> Result<Url, PipelineError> {
    export_url_from(BASE_URL, sheet)
}

fn export_url_from(base_url: &str, sheet: &SheetRef) -> Result<Url, PipelineError> {
    let bad_url = |detail: &str| PipelineError::Fetch(format!("invalid export URL: {detail}"));

    let mut url = Url::parse(base_url).map_err(|e| bad_url(&e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| bad_url("base URL cannot have path segments"))?
        .pop_if_empty()
        .extend([sheet.sheet_id.trim(), "gviz", "tq"]);

    // `set_query` percent-encodes spaces and non-ASCII text but leaves the
    // query delimiters alone, so those are escaped first.
    let name = escape_query_delimiters(&sheet.sheet_name);
    url.set_query(Some(&format!("tqx=out:csv&sheet={name}")));
    Ok(url)
}

fn escape_query_delimiters(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '%' => out.push_str("%25"),
            '&' => out.push_str("%26"),
            '#' => out.push_str("%23"),
            '+' => out.push_str("%2B"),
            '=' => out.push_str("%3D"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    use super::*;

    /// Serve one canned HTTP response on localhost; the handle yields the request line.
    fn serve_once(status: &str, content_type: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}/spreadsheets/d/", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            // Drain headers up to the blank line.
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 2 {
                line.clear();
            }
            stream.write_all(response.as_bytes()).unwrap();
            request_line
        });
        (base, handle)
    }

    fn client_for(base: String) -> SheetsClient {
        SheetsClient::new(sheet("abc", "Dados 2024")).unwrap().with_base_url(base)
    }

    fn sheet(id: &str, name: &str) -> SheetRef {
        SheetRef {
            sheet_id: id.to_string(),
            sheet_name: name.to_string(),
        }
    }

    #[test]
    fn export_url_encodes_spaces_in_sheet_name() {
        let url = export_url(&sheet("abc123", "Dados 2024")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://docs.google.com/spreadsheets/d/abc123/gviz/tq?tqx=out:csv&sheet=Dados%202024"
        );
    }

    #[test]
    fn export_url_escapes_delimiters_and_non_ascii() {
        let url = export_url(&sheet("abc", "Março & Abril")).unwrap();
        assert_eq!(url.query(), Some("tqx=out:csv&sheet=Mar%C3%A7o%20%26%20Abril"));
    }

    #[test]
    fn export_url_trims_the_sheet_id() {
        let url = export_url(&sheet("  abc  ", "Aba")).unwrap();
        assert_eq!(url.path(), "/spreadsheets/d/abc/gviz/tq");
    }

    #[test]
    fn client_requires_id_and_name() {
        assert!(matches!(SheetsClient::new(sheet("", "Aba")), Err(PipelineError::Fetch(_))));
        assert!(matches!(SheetsClient::new(sheet("abc", "")), Err(PipelineError::Fetch(_))));
    }

    #[test]
    fn client_returns_csv_body() {
        let (base, server) = serve_once("200 OK", "text/csv", "Plataforma,Mês/Ano\nMeta,01/2024\n");
        let body = client_for(base).fetch_csv().unwrap();
        assert_eq!(body, "Plataforma,Mês/Ano\nMeta,01/2024\n");

        let request_line = server.join().unwrap();
        assert!(request_line.starts_with(
            "GET /spreadsheets/d/abc/gviz/tq?tqx=out:csv&sheet=Dados%202024 "
        ));
    }

    #[test]
    fn client_reports_http_errors() {
        let (base, server) = serve_once("404 Not Found", "text/plain", "missing");
        let err = client_for(base).fetch_csv().unwrap_err();
        server.join().unwrap();
        match err {
            PipelineError::Fetch(msg) => assert!(msg.contains("404"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn client_rejects_sign_in_page() {
        let (base, server) = serve_once("200 OK", "text/html; charset=utf-8", "<html>login</html>");
        let err = client_for(base).fetch_csv().unwrap_err();
        server.join().unwrap();
        match err {
            PipelineError::Fetch(msg) => assert!(msg.contains("HTML"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn fetch_rejects_blank_sheet_before_any_request() {
        assert!(matches!(fetch(&sheet("  ", "Aba")), Err(PipelineError::Fetch(_))));
    }

    #[test]
    fn local_csv_reports_missing_file_as_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = LocalCsv::new(dir.path().join("missing.csv"));
        assert!(matches!(source.fetch_csv(), Err(PipelineError::Fetch(_))));
    }

    #[test]
    fn local_csv_is_parsed_into_a_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dados.csv");
        std::fs::write(&path, "Plataforma,Mês/Ano\nMeta,01/2024\n").unwrap();

        let table = read_table(&LocalCsv::new(&path)).unwrap();
        assert_eq!(table.headers, vec!["Plataforma", "Mês/Ano"]);
        assert_eq!(table.rows, vec![vec!["Meta".to_string(), "01/2024".to_string()]]);
    }
}
