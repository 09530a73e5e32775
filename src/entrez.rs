use std::{
    fmt::Display,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use log::{debug, error, info, warn};
use serde::Deserialize;

use crate::error::{Error, Result};

pub const EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const PLACEHOLDER_EMAIL: &str = "A.N.Other@example.com";
const DATABASE: &str = "nucleotide";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub term: String,
    pub ids: Vec<String>,
    pub web_env: String,
    pub query_key: String,
}

pub trait RecordSource {
    fn search(&self, term: &str, max_records: usize) -> Result<SearchResult>;

    /// Returns up to `size` records of `search` starting at `start`, as FASTA text.
    fn fetch_batch(&self, search: &SearchResult, start: usize, size: usize) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct EntrezSettings {
    pub email: String,
    pub tool: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub retries: usize,
    /// The wait before the first retry, growing linearly with each further retry.
    pub retry_delay: Duration,
}

pub struct EntrezClient {
    base_url: String,
    settings: EntrezSettings,
    client: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct SearchResponse {
    esearchresult: SearchBody,
}

#[derive(Deserialize)]
struct SearchBody {
    #[serde(default)]
    idlist: Vec<String>,
    webenv: Option<String>,
    querykey: Option<String>,
    #[serde(rename = "ERROR")]
    error: Option<String>,
}

fn parse_search_response(term: &str, text: &str) -> Result<SearchResult> {
    let response: SearchResponse = serde_json::from_str(text)?;
    let body = response.esearchresult;
    if let Some(message) = body.error {
        return Err(Error::Entrez {
            term: term.to_string(),
            message,
        });
    }

    match (body.webenv, body.querykey) {
        (Some(web_env), Some(query_key)) => Ok(SearchResult {
            term: term.to_string(),
            ids: body.idlist,
            web_env,
            query_key,
        }),
        _ => Err(Error::Entrez {
            term: term.to_string(),
            message: "the search result has no history session".to_string(),
        }),
    }
}

impl EntrezClient {
    pub fn new(settings: EntrezSettings) -> Result<Self> {
        Self::with_base_url(EUTILS_URL, settings)
    }

    pub fn with_base_url(base_url: &str, settings: EntrezSettings) -> Result<Self> {
        if settings.email == PLACEHOLDER_EMAIL {
            warn!(
                "Using the placeholder email {PLACEHOLDER_EMAIL}, \
                 please configure your own so that NCBI can contact you in case of problems"
            );
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .user_agent(format!("{}/{}", settings.tool, env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            settings,
            client,
        })
    }

    fn get(&self, utility: &str, mut parameters: Vec<(&'static str, String)>) -> Result<String> {
        parameters.push(("db", DATABASE.to_string()));
        parameters.push(("email", self.settings.email.clone()));
        parameters.push(("tool", self.settings.tool.clone()));
        if let Some(api_key) = &self.settings.api_key {
            parameters.push(("api_key", api_key.clone()));
        }
        let url = format!("{}/{utility}.fcgi", self.base_url);

        let text = with_retries(
            utility,
            self.settings.retries,
            self.settings.retry_delay,
            || {
                self.client
                    .get(&url)
                    .query(&parameters)
                    .send()
                    .and_then(|response| response.error_for_status())
                    .and_then(|response| response.text())
            },
        )?;
        Ok(text)
    }
}

/// Calls `request` until it succeeds, at most `retries` additional times.
fn with_retries<T, E: Display>(
    what: &str,
    retries: usize,
    delay: Duration,
    mut request: impl FnMut() -> std::result::Result<T, E>,
) -> std::result::Result<T, E> {
    let mut attempt = 0;
    loop {
        match request() {
            Ok(value) => return Ok(value),
            Err(error) if attempt < retries => {
                attempt += 1;
                warn!("Request to {what} failed ({error}), retry {attempt} of {retries}");
                thread::sleep(delay * attempt as u32);
            }
            Err(error) => return Err(error),
        }
    }
}

impl RecordSource for EntrezClient {
    fn search(&self, term: &str, max_records: usize) -> Result<SearchResult> {
        let text = self.get(
            "esearch",
            vec![
                ("term", term.to_string()),
                ("retmax", max_records.to_string()),
                ("usehistory", "y".to_string()),
                ("retmode", "json".to_string()),
            ],
        )?;
        parse_search_response(term, &text)
    }

    fn fetch_batch(&self, search: &SearchResult, start: usize, size: usize) -> Result<String> {
        self.get(
            "efetch",
            vec![
                ("rettype", "fasta".to_string()),
                ("retmode", "text".to_string()),
                ("retstart", start.to_string()),
                ("retmax", size.to_string()),
                ("WebEnv", search.web_env.clone()),
                ("query_key", search.query_key.clone()),
            ],
        )
    }
}

pub fn entry_file_name(term: &str) -> String {
    format!("{}.fasta", term.replace(['/', '\\'], "_"))
}

/// Downloads the records of each term into `<output_directory>/<term>.fasta`.
///
/// A term that fails is logged and skipped.
/// Returns the written files, and fails only if no term could be fetched.
pub fn fetch_terms(
    source: &impl RecordSource,
    terms: &[String],
    max_records: usize,
    batch_size: usize,
    output_directory: impl AsRef<Path>,
) -> Result<Vec<PathBuf>> {
    if terms.is_empty() {
        return Err(Error::EmptyTermList);
    }
    if batch_size == 0 {
        return Err(Error::InvalidParameter {
            name: "batch_size",
            value: batch_size.to_string(),
            reason: "at least one record must be fetched per request",
        });
    }
    let output_directory = output_directory.as_ref();
    fs::create_dir_all(output_directory)?;

    let mut written = Vec::new();
    for term in terms {
        info!("Searching for {term:?}");
        match fetch_term(source, term, max_records, batch_size, output_directory) {
            Ok(path) => written.push(path),
            Err(error) => error!("Skipping term {term:?}: {error}"),
        }
    }

    if written.is_empty() {
        Err(Error::NoTermsFetched(terms.len()))
    } else {
        Ok(written)
    }
}

fn fetch_term(
    source: &impl RecordSource,
    term: &str,
    max_records: usize,
    batch_size: usize,
    output_directory: &Path,
) -> Result<PathBuf> {
    let search = source.search(term, max_records)?;
    let path = output_directory.join(entry_file_name(term));
    let partial_path = output_directory.join(format!("{}.part", entry_file_name(term)));

    let result = write_batches(source, &search, batch_size, &partial_path);
    if let Err(error) = result {
        fs::remove_file(&partial_path).ok();
        return Err(error);
    }
    fs::rename(&partial_path, &path)?;
    debug!("Wrote {} records to {path:?}", search.ids.len());
    Ok(path)
}

fn write_batches(
    source: &impl RecordSource,
    search: &SearchResult,
    batch_size: usize,
    path: &Path,
) -> Result<()> {
    let count = search.ids.len();
    let mut output = BufWriter::new(File::create(path)?);
    for start in (0..count).step_by(batch_size) {
        let end = count.min(start + batch_size);
        info!("Downloading record {} to {end}", start + 1);
        let batch = source.fetch_batch(search, start, batch_size)?;
        for line in batch.lines().filter(|line| !line.trim().is_empty()) {
            writeln!(output, "{line}")?;
        }
    }
    output.flush()?;
    Ok(())
}
