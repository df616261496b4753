/// Background mesh fetching for the terminal backend
use std::fs;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

use stlview_core::{parse_stl, TriangleMesh};
use stlview_viewer::ImportError;

/// Result of one fetch-and-parse, tagged with its request sequence number
#[derive(Debug)]
pub struct FetchedMesh {
    pub seq: u64,
    pub file_name: String,
    pub result: Result<TriangleMesh, ImportError>,
}

/// Fetches STL assets on background threads and hands the parsed meshes
/// back through a channel drained by `poll` on the main thread.
///
/// `http(s)` sources go through a blocking HTTP client; anything else is
/// read from the filesystem.
pub struct UrlImporter {
    tx: Sender<FetchedMesh>,
    rx: Receiver<FetchedMesh>,
}

impl UrlImporter {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self { tx, rx }
    }

    /// Issue a request; returns immediately.
    pub fn request(&self, url: &str, file_name: &str, seq: u64) {
        let source = resolve_source(url, file_name);
        let file_name = file_name.to_string();
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = fetch_bytes(&source).and_then(|bytes| {
                parse_stl(&bytes).map_err(|e| ImportError::Parse {
                    file_name: file_name.clone(),
                    reason: e.to_string(),
                })
            });
            // The receiver is gone when the app has shut down; the result
            // is unwanted then.
            let _ = tx.send(FetchedMesh {
                seq,
                file_name,
                result,
            });
        });
    }

    /// Next finished request, if any. Never blocks.
    pub fn poll(&mut self) -> Option<FetchedMesh> {
        self.rx.try_recv().ok()
    }
}

impl Default for UrlImporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve `file_name` against the base `url`, matching the importer
/// contract: the base may be a URL prefix or a local directory.
fn resolve_source(url: &str, file_name: &str) -> String {
    if url.is_empty() {
        file_name.to_string()
    } else if url.ends_with('/') {
        format!("{url}{file_name}")
    } else {
        format!("{url}/{file_name}")
    }
}

fn fetch_bytes(source: &str) -> Result<Vec<u8>, ImportError> {
    let fetch_err = |reason: String| ImportError::Fetch {
        url: source.to_string(),
        reason,
    };

    if source.starts_with("http://") || source.starts_with("https://") {
        let response = reqwest::blocking::get(source)
            .and_then(|r| r.error_for_status())
            .map_err(|e| fetch_err(e.to_string()))?;
        let bytes = response.bytes().map_err(|e| fetch_err(e.to_string()))?;
        Ok(bytes.to_vec())
    } else {
        fs::read(source).map_err(|e| fetch_err(e.to_string()))
    }
}
