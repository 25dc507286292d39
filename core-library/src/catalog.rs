//! Remote library listing and metadata access
//!
//! Thin request/response wrappers around the book server. Listing falls back
//! to the locally cached books when the server is unreachable; metadata falls
//! back to the last copy fetched during this session.

use crate::error::{LibraryError, Result};
use crate::models::Metadata;
use crate::repositories::BookRepository;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use core_runtime::config::ApiEndpoints;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub struct LibraryService {
    http: Arc<dyn HttpClient>,
    books: Arc<dyn BookRepository>,
    endpoints: ApiEndpoints,
    metadata: Mutex<HashMap<String, Arc<Metadata>>>,
}

impl LibraryService {
    pub fn new(
        http: Arc<dyn HttpClient>,
        books: Arc<dyn BookRepository>,
        endpoints: ApiEndpoints,
    ) -> Self {
        Self {
            http,
            books,
            endpoints,
            metadata: Mutex::new(HashMap::new()),
        }
    }

    /// Book identifiers available on the server, or the cached ones when the
    /// server cannot be reached.
    ///
    /// # Errors
    ///
    /// Only a local store failure during the fallback is reported.
    #[instrument(skip(self))]
    pub async fn list_books(&self) -> Result<Vec<String>> {
        match self.get_json::<Vec<String>>(self.endpoints.books()).await {
            Ok(books) => {
                debug!(count = books.len(), "Fetched library listing");
                Ok(books)
            }
            Err(e) => {
                warn!(error = %e, "Library listing unavailable, using cached books");
                self.books.keys().await
            }
        }
    }

    /// Chapter and format metadata for a book.
    ///
    /// # Errors
    ///
    /// Fails when the server cannot be reached and the book's metadata was
    /// not fetched earlier in this session.
    #[instrument(skip(self))]
    pub async fn fetch_metadata(&self, book: &str) -> Result<Arc<Metadata>> {
        match self.get_json::<Metadata>(self.endpoints.metadata(book)).await {
            Ok(metadata) => {
                let metadata = Arc::new(metadata);
                self.metadata
                    .lock()
                    .insert(book.to_string(), Arc::clone(&metadata));
                Ok(metadata)
            }
            Err(e) => match self.metadata.lock().get(book) {
                Some(previous) => {
                    warn!(error = %e, "Metadata unavailable, serving previous copy");
                    Ok(Arc::clone(previous))
                }
                None => Err(e),
            },
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let response = self.http.execute(HttpRequest::get(url.clone())).await?;
        decode(&url, &response)
    }
}

fn decode<T: DeserializeOwned>(url: &str, response: &HttpResponse) -> Result<T> {
    if !response.is_success() {
        return Err(LibraryError::Http {
            status: response.status,
            url: url.to_string(),
        });
    }
    serde_json::from_slice(&response.body).map_err(|e| LibraryError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}
