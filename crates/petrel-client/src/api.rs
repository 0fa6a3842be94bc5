use petrel_core::error::HarvestError;
use petrel_core::models::{PagedKind, PetitionSnapshot};
use petrel_core::traits::{Fetcher, PetitionApi};
use serde::Deserialize;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://api.change.org/v1";
const PAGE_SIZE: u32 = 100;

/// The closed field set requested for a petition snapshot.
pub const SNAPSHOT_FIELDS: [&str; 14] = [
    "title",
    "status",
    "targets",
    "overview",
    "letter_body",
    "signature_count",
    "category",
    "goal",
    "created_at",
    "end_at",
    "creator_name",
    "creator_url",
    "organization_name",
    "organization_url",
];

#[derive(Deserialize)]
struct IdResponse {
    petition_id: u64,
}

/// change.org API client: id resolution, paged collection, snapshot fetch.
///
/// Generic over the fetcher so the page-traversal protocol can be tested
/// against scripted responses. The API key rides along as a query
/// parameter on every request.
#[derive(Clone)]
pub struct PetitionClient<F> {
    fetcher: F,
    base_url: String,
    api_key: String,
}

impl<F: Fetcher> PetitionClient<F> {
    pub fn new(fetcher: F, api_key: impl Into<String>) -> Self {
        Self::with_base_url(fetcher, api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        fetcher: F,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<String, HarvestError> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, path))
            .map_err(|e| HarvestError::MalformedResponse(format!("bad endpoint URL: {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("api_key", &self.api_key);
        }
        Ok(url.into())
    }

    fn listing_url(
        &self,
        petition_id: u64,
        kind: PagedKind,
        page: Option<u64>,
    ) -> Result<String, HarvestError> {
        let path = format!("petitions/{petition_id}/{kind}");
        let page_size = PAGE_SIZE.to_string();
        let mut params: Vec<(&str, &str)> =
            vec![("page_size", page_size.as_str()), ("sort", "time_asc")];
        let page_str;
        if let Some(page) = page {
            page_str = page.to_string();
            params.push(("page", page_str.as_str()));
        }
        self.endpoint(&path, &params)
    }

    /// Fetch one listing page and pull out its item array and, for the
    /// first page, the declared total-page count.
    fn parse_page(body: &str, kind: PagedKind) -> Result<(Vec<serde_json::Value>, u64), HarvestError> {
        let page: serde_json::Value = serde_json::from_str(body)?;
        let items = page
            .get(kind.as_str())
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                HarvestError::MalformedResponse(format!("listing page has no '{kind}' array"))
            })?
            .clone();
        let total_pages = page
            .get("total_pages")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| {
                HarvestError::MalformedResponse("listing page has no 'total_pages'".into())
            })?;
        Ok((items, total_pages))
    }
}

impl<F: Fetcher> PetitionApi for PetitionClient<F> {
    async fn resolve_id(&self, petition_url: &str) -> Result<u64, HarvestError> {
        let url = self.endpoint(
            "petitions/get_id",
            &[("petition_url", petition_url.trim())],
        )?;
        let body = self.fetcher.fetch(&url).await?;
        let parsed: IdResponse = serde_json::from_str(&body)?;
        Ok(parsed.petition_id)
    }

    async fn collect(&self, petition_id: u64, kind: PagedKind) -> Result<String, HarvestError> {
        // First page carries no page parameter; its failure is fatal for
        // the call, there is nothing to return without it.
        let first_url = self.listing_url(petition_id, kind, None)?;
        let body = self.fetcher.fetch(&first_url).await?;
        let (mut items, total_pages) = Self::parse_page(&body, kind)?;

        // Remaining pages are requested explicitly by page number derived
        // from the same base request, rather than following the server's
        // next-page link, which intermittently drops query parameters.
        // A failed page is skipped; the rest of the listing still counts.
        let mut dropped_pages = 0u64;
        for page in 2..=total_pages {
            let page_url = self.listing_url(petition_id, kind, Some(page))?;
            let page_items = match self.fetcher.fetch(&page_url).await {
                Ok(body) => match Self::parse_page(&body, kind) {
                    Ok((items, _)) => items,
                    Err(e) => {
                        dropped_pages += 1;
                        tracing::warn!(petition_id, %kind, page, error = %e, "Skipping unparseable page");
                        continue;
                    }
                },
                Err(e) => {
                    dropped_pages += 1;
                    tracing::warn!(petition_id, %kind, page, error = %e, "Skipping failed page");
                    continue;
                }
            };
            items.extend(page_items);
        }

        if dropped_pages > 0 {
            tracing::warn!(
                petition_id,
                %kind,
                dropped_pages,
                total_pages,
                "Collected partial listing"
            );
        }

        Ok(serde_json::to_string(&items)?)
    }

    async fn snapshot(&self, petition_id: u64) -> Result<PetitionSnapshot, HarvestError> {
        let fields = SNAPSHOT_FIELDS.join(",");
        let url = self.endpoint(&format!("petitions/{petition_id}"), &[("fields", &fields)])?;
        let body = self.fetcher.fetch(&url).await?;
        let snapshot: PetitionSnapshot = serde_json::from_str(&body)?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petrel_core::testutil::MockFetcher;

    fn client(fetcher: MockFetcher) -> PetitionClient<MockFetcher> {
        PetitionClient::with_base_url(fetcher, "KEY", "https://api.test/v1")
    }

    fn page_body(kind: PagedKind, items: &[&str], total_pages: u64) -> String {
        let items: Vec<serde_json::Value> = items
            .iter()
            .map(|text| serde_json::json!({ "text": text }))
            .collect();
        let mut page = serde_json::Map::new();
        page.insert(kind.as_str().to_string(), serde_json::Value::Array(items));
        page.insert("total_pages".to_string(), total_pages.into());
        serde_json::Value::Object(page).to_string()
    }

    #[tokio::test]
    async fn resolve_id_extracts_petition_id() {
        let fetcher = MockFetcher::new(r#"{"petition_id": 1048510}"#);
        let id = client(fetcher.clone())
            .resolve_id("https://www.change.org/p/save-the-bees\n")
            .await
            .unwrap();

        assert_eq!(id, 1048510);
        let url = &fetcher.requested_urls()[0];
        assert!(url.starts_with("https://api.test/v1/petitions/get_id?"));
        assert!(url.contains("petition_url="));
        assert!(url.contains("api_key=KEY"));
        // Trailing newline is trimmed before the URL is embedded.
        assert!(!url.contains('\n'));
    }

    #[tokio::test]
    async fn resolve_id_missing_field_is_malformed() {
        let fetcher = MockFetcher::new(r#"{"status": "ok"}"#);
        let err = client(fetcher)
            .resolve_id("https://www.change.org/p/x")
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn resolve_id_propagates_fetch_errors() {
        let fetcher = MockFetcher::with_error(HarvestError::HttpStatus(403));
        let err = client(fetcher)
            .resolve_id("https://www.change.org/p/x")
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::HttpStatus(403)));
    }

    #[tokio::test]
    async fn collect_single_page() {
        let fetcher =
            MockFetcher::with_responses(vec![Ok(page_body(PagedKind::Reasons, &["a", "b"], 1))]);
        let blob = client(fetcher.clone())
            .collect(7, PagedKind::Reasons)
            .await
            .unwrap();

        assert_eq!(fetcher.call_count(), 1);
        let url = &fetcher.requested_urls()[0];
        assert!(url.starts_with("https://api.test/v1/petitions/7/reasons?"));
        assert!(url.contains("page_size=100"));
        assert!(url.contains("sort=time_asc"));
        assert!(!url.contains("page="), "first page must be implicit: {url}");

        let items: Vec<serde_json::Value> = serde_json::from_str(&blob).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn collect_walks_every_page_in_order() {
        let fetcher = MockFetcher::with_responses(vec![
            Ok(page_body(PagedKind::Updates, &["p1a", "p1b"], 3)),
            Ok(page_body(PagedKind::Updates, &["p2a"], 3)),
            Ok(page_body(PagedKind::Updates, &["p3a"], 3)),
        ]);
        let blob = client(fetcher.clone())
            .collect(7, PagedKind::Updates)
            .await
            .unwrap();

        // total_pages = 3: page 1 implicit, pages 2 and 3 explicit.
        let urls = fetcher.requested_urls();
        assert_eq!(urls.len(), 3);
        assert!(urls[1].contains("page=2"));
        assert!(urls[2].contains("page=3"));

        let items: Vec<serde_json::Value> = serde_json::from_str(&blob).unwrap();
        let texts: Vec<&str> = items.iter().map(|i| i["text"].as_str().unwrap()).collect();
        assert_eq!(texts, vec!["p1a", "p1b", "p2a", "p3a"]);
    }

    #[tokio::test]
    async fn collect_skips_failed_middle_page() {
        let fetcher = MockFetcher::with_responses(vec![
            Ok(page_body(PagedKind::Reasons, &["p1"], 3)),
            Err(HarvestError::HttpStatus(500)),
            Ok(page_body(PagedKind::Reasons, &["p3"], 3)),
        ]);
        let blob = client(fetcher.clone())
            .collect(7, PagedKind::Reasons)
            .await
            .unwrap();

        // All three pages were still requested.
        assert_eq!(fetcher.call_count(), 3);
        let items: Vec<serde_json::Value> = serde_json::from_str(&blob).unwrap();
        let texts: Vec<&str> = items.iter().map(|i| i["text"].as_str().unwrap()).collect();
        assert_eq!(texts, vec!["p1", "p3"]);
    }

    #[tokio::test]
    async fn collect_skips_unparseable_later_page() {
        let fetcher = MockFetcher::with_responses(vec![
            Ok(page_body(PagedKind::Reasons, &["p1"], 2)),
            Ok("<html>gateway error</html>".to_string()),
        ]);
        let blob = client(fetcher)
            .collect(7, PagedKind::Reasons)
            .await
            .unwrap();

        let items: Vec<serde_json::Value> = serde_json::from_str(&blob).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn collect_first_page_failure_is_fatal() {
        let fetcher =
            MockFetcher::with_responses(vec![Err(HarvestError::Transport("refused".into()))]);
        let err = client(fetcher.clone())
            .collect(7, PagedKind::Reasons)
            .await
            .unwrap_err();

        assert!(matches!(err, HarvestError::Transport(_)));
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn collect_first_page_without_listing_key_is_malformed() {
        let fetcher = MockFetcher::new(r#"{"total_pages": 2}"#);
        let err = client(fetcher)
            .collect(7, PagedKind::Updates)
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn snapshot_requests_all_fourteen_fields() {
        let fetcher = MockFetcher::new(r#"{"title":"Save the bees","goal":50000}"#);
        let snapshot = client(fetcher.clone()).snapshot(7).await.unwrap();

        assert_eq!(snapshot.title.as_deref(), Some("Save the bees"));
        assert_eq!(snapshot.goal, Some(50000));

        let url = &fetcher.requested_urls()[0];
        assert!(url.starts_with("https://api.test/v1/petitions/7?"));
        for field in SNAPSHOT_FIELDS {
            assert!(url.contains(field), "missing field {field} in {url}");
        }
    }

    #[tokio::test]
    async fn snapshot_propagates_fetch_errors() {
        let fetcher = MockFetcher::with_error(HarvestError::HttpStatus(404));
        let err = client(fetcher).snapshot(7).await.unwrap_err();
        assert!(matches!(err, HarvestError::HttpStatus(404)));
    }
}
