use anyhow::{Result, bail};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;

/// Characters `encodeURIComponent` leaves untouched: `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
  .remove(b'-')
  .remove(b'_')
  .remove(b'.')
  .remove(b'!')
  .remove(b'~')
  .remove(b'*')
  .remove(b'\'')
  .remove(b'(')
  .remove(b')');

/// A third-party video-parsing service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Endpoint {
  pub id: String,
  pub name: String,
  /// Prefix the encoded video URL is appended to.
  pub url: String,
}

/// The ordered, read-only list of configured endpoints.
#[derive(Debug, Clone)]
pub struct EndpointTable {
  endpoints: Vec<Endpoint>,
}

impl EndpointTable {
  pub fn new(endpoints: Vec<Endpoint>) -> Result<Self> {
    if endpoints.is_empty() {
      bail!("No parsing endpoints configured");
    }
    Ok(Self { endpoints })
  }

  /// First entry whose id matches. `None` is not an error for callers.
  pub fn resolve(&self, id: &str) -> Option<&Endpoint> {
    self.endpoints.iter().find(|e| e.id == id)
  }

  /// The default selection.
  pub fn first(&self) -> &Endpoint {
    // Safety: `new` rejects an empty list.
    &self.endpoints[0]
  }

  pub fn len(&self) -> usize {
    self.endpoints.len()
  }

  pub fn position(&self, id: &str) -> Option<usize> {
    self.endpoints.iter().position(|e| e.id == id)
  }

  /// The id after `id`, wrapping around. Unknown ids restart at the first endpoint.
  pub fn next_id(&self, id: &str) -> &str {
    let next = self.position(id).map_or(0, |i| (i + 1) % self.endpoints.len());
    &self.endpoints[next].id
  }

  /// The id before `id`, wrapping around.
  pub fn prev_id(&self, id: &str) -> &str {
    let len = self.endpoints.len();
    let prev = self.position(id).map_or(0, |i| if i == 0 { len - 1 } else { i - 1 });
    &self.endpoints[prev].id
  }
}

/// Append the percent-encoded video URL to the endpoint base, verbatim.
///
/// Encoding matches `encodeURIComponent`; no separator is inserted.
pub fn compose(base_url: &str, video_url: &str) -> String {
  format!("{}{}", base_url, utf8_percent_encode(video_url, URI_COMPONENT))
}
