use crate::cache::{self, Blob, ResponseCache};
use crate::config::Config;
use crate::errors::{InitError, ProxyError};
use crate::metrics_defs::{CACHE_HIT, CACHE_MISS};
use crate::providers::{self, Endpoint};
use crate::query::ProxyQuery;
use crate::upstream::UpstreamClient;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use shared::counter;
use shared::http::{ResponseBody, full_body, make_json_response};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const API_PREFIX: &str = "/api/";

static CACHE_STATUS: HeaderName = HeaderName::from_static("x-cache");

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Serves the `/api/*` data-proxy endpoints.
#[derive(Clone)]
pub struct DataProxy {
    endpoints: Arc<HashMap<&'static str, Arc<dyn Endpoint>>>,
    cache: Arc<dyn ResponseCache>,
    client: UpstreamClient,
}

impl DataProxy {
    pub fn new(
        endpoints: Vec<Arc<dyn Endpoint>>,
        cache: Arc<dyn ResponseCache>,
        client: UpstreamClient,
    ) -> Self {
        let endpoints = endpoints.into_iter().map(|e| (e.path(), e)).collect();
        DataProxy {
            endpoints: Arc::new(endpoints),
            cache,
            client,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, InitError> {
        let client = UpstreamClient::new(Duration::from_secs(config.timeout_secs))
            .map_err(InitError::Client)?;
        let cache = cache::from_config(&config.cache);
        Ok(Self::new(providers::endpoints(config)?, cache, client))
    }

    /// Whether `path` belongs to the data proxy rather than the page renderer.
    pub fn handles(path: &str) -> bool {
        path == API_PREFIX.trim_end_matches('/') || path.starts_with(API_PREFIX)
    }

    /// Routes one request. Every failure is rendered as a JSON error body.
    pub async fn route<B>(&self, req: Request<B>) -> Response<ResponseBody> {
        let path = req.uri().path().trim_end_matches('/');
        let Some(endpoint) = self.endpoints.get(path).cloned() else {
            tracing::debug!(path = %req.uri().path(), "no data-proxy endpoint");
            return error_response(StatusCode::NOT_FOUND, "Not found".to_string());
        };

        if req.method() != Method::GET {
            return error_response(
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed".to_string(),
            );
        }

        let query = ProxyQuery::from_query(req.uri().query().unwrap_or_default());
        match self.fetch(endpoint.as_ref(), &query).await {
            Ok((blob, cache_hit)) => blob_response(blob, cache_hit),
            Err(e) => {
                if e.status().is_server_error() {
                    tracing::error!(endpoint = endpoint.path(), error = %e, "data-proxy request failed");
                } else {
                    tracing::info!(endpoint = endpoint.path(), error = %e, "data-proxy request rejected");
                }
                error_response(e.status(), e.public_message())
            }
        }
    }

    /// Returns the cached response when present, otherwise fetches and caches
    /// it. Failures are never cached. The flag reports a cache hit.
    pub async fn fetch(
        &self,
        endpoint: &dyn Endpoint,
        query: &ProxyQuery,
    ) -> Result<(Blob, bool), ProxyError> {
        let request = endpoint.upstream_request(query)?;
        let key = endpoint.cache_key(query)?;
        let provider = endpoint.provider();

        if let Some(blob) = self.cache.get(&key) {
            counter!(CACHE_HIT, "provider" => provider.tag()).increment(1);
            return Ok((blob, true));
        }
        counter!(CACHE_MISS, "provider" => provider.tag()).increment(1);

        let blob = self.client.send(provider, request).await?;
        self.cache.put(key, blob.clone(), endpoint.ttl());
        Ok((blob, false))
    }
}

fn blob_response(blob: Blob, cache_hit: bool) -> Response<ResponseBody> {
    let mut response = Response::new(full_body(blob.body));
    if let Ok(content_type) = HeaderValue::from_str(&blob.content_type) {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    let cache_status = if cache_hit { "HIT" } else { "MISS" };
    response
        .headers_mut()
        .insert(CACHE_STATUS.clone(), HeaderValue::from_static(cache_status));
    response
}

fn error_response(status: StatusCode, error: String) -> Response<ResponseBody> {
    make_json_response(status, &ErrorBody { error })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::providers::{AddressLookup, MarketStats, Provider, ProviderSettings, StreetView};
    use http_body_util::{BodyExt, Empty, Full};
    use hyper::body::{Bytes, Incoming};
    use hyper::service::service_fn;
    use hyper_util::rt::{TokioExecutor, TokioIo};
    use serde_json::Value;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use url::Url;

    // Fake provider: answers by path, counting every request it receives.
    async fn start_provider(hits: Arc<AtomicUsize>) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let hits = hits.clone();
                tokio::spawn(async move {
                    let svc = service_fn(move |req: Request<Incoming>| {
                        hits.fetch_add(1, Ordering::SeqCst);
                        async move {
                            let json = "application/json";
                            let (status, content_type, body) = match req.uri().path() {
                                "/v1/avm/value" => (
                                    200,
                                    json,
                                    Bytes::from_static(br#"{"price":685000,"priceRangeLow":650000}"#),
                                ),
                                "/v1/markets" => {
                                    let query = req.uri().query().unwrap_or_default();
                                    if query.contains("zipCode=00000") {
                                        (404, json, Bytes::from_static(br#"{"message":"none"}"#))
                                    } else if query.contains("zipCode=99999") {
                                        (429, json, Bytes::from_static(br#"{"message":"slow"}"#))
                                    } else {
                                        (401, json, Bytes::from_static(br#"{"message":"auth"}"#))
                                    }
                                }
                                "/maps/api/streetview" => {
                                    (200, "image/jpeg", Bytes::from_static(b"\xff\xd8\xff"))
                                }
                                _ => (502, "text/plain", Bytes::from_static(b"bad gateway")),
                            };
                            let mut res = Response::new(Full::new(body));
                            *res.status_mut() = StatusCode::from_u16(status).unwrap();
                            res.headers_mut()
                                .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
                            Ok::<_, Infallible>(res)
                        }
                    });
                    let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), svc)
                        .await;
                });
            }
        });

        Url::parse(&format!("http://127.0.0.1:{port}")).unwrap()
    }

    fn proxy(base_url: Url, api_key: Option<&str>) -> DataProxy {
        let rentcast = Arc::new(ProviderSettings::new(
            Provider::Rentcast,
            api_key.map(String::from),
            base_url.clone(),
        ));
        let google = ProviderSettings::new(Provider::GoogleMaps, api_key.map(String::from), base_url);

        DataProxy::new(
            vec![
                Arc::new(AddressLookup::valuation(rentcast.clone())),
                Arc::new(MarketStats::new(rentcast)),
                Arc::new(StreetView::new(google)),
            ],
            Arc::new(MemoryCache::new()),
            UpstreamClient::new(Duration::from_secs(5)).unwrap(),
        )
    }

    fn get(uri: &str) -> Request<Empty<Bytes>> {
        Request::builder().uri(uri).body(Empty::new()).unwrap()
    }

    async fn body_json(response: Response<ResponseBody>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_pass_through_and_cache() {
        let hits = Arc::new(AtomicUsize::new(0));
        let proxy = proxy(start_provider(hits.clone()).await, Some("key"));
        let uri = "/api/property-valuation?address=1247%20Oak%20Valley%20Dr%2C%20Austin%2C%20TX%2078704";

        let first = proxy.route(get(uri)).await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers().get("x-cache").unwrap(), "MISS");
        let body = body_json(first).await;
        assert_eq!(body["price"], 685000);

        // Same address with different spacing and case hits the cache.
        let second = proxy
            .route(get(
                "/api/property-valuation/?address=1247%20oak%20valley%20dr,%20%20Austin,%20TX%2078704",
            ))
            .await;
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(second.headers().get("x-cache").unwrap(), "HIT");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_binary_blob_keeps_content_type() {
        let hits = Arc::new(AtomicUsize::new(0));
        let proxy = proxy(start_provider(hits).await, Some("key"));

        let response = proxy
            .route(get("/api/street-view?address=1500%20Lakeshore%20Dr"))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "image/jpeg");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.as_ref(), b"\xff\xd8\xff");
    }

    #[tokio::test]
    async fn test_upstream_failures_are_classified_and_not_cached() {
        let hits = Arc::new(AtomicUsize::new(0));
        let proxy = proxy(start_provider(hits.clone()).await, Some("key"));

        let not_found = proxy.route(get("/api/market-stats?zipcode=00000")).await;
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(not_found).await["error"],
            "No data found for this location"
        );

        let limited = proxy.route(get("/api/market-stats?zipcode=99999")).await;
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);

        let unauthorized = proxy.route(get("/api/market-stats?zipcode=78704")).await;
        assert_eq!(unauthorized.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(unauthorized).await["error"],
            "Rentcast API configuration error"
        );

        proxy.route(get("/api/market-stats?zipcode=00000")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_missing_credential_and_input() {
        let hits = Arc::new(AtomicUsize::new(0));
        let proxy = proxy(start_provider(hits.clone()).await, None);

        let response = proxy
            .route(get("/api/property-valuation?address=1%20Main%20St"))
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await["error"],
            "Rentcast API key is not configured"
        );

        let response = proxy.route(get("/api/property-valuation")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unreachable_upstream() {
        let proxy = proxy(Url::parse("http://127.0.0.1:1").unwrap(), Some("key"));
        let response = proxy.route(get("/api/market-stats?zipcode=78704")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await["error"],
            "Failed to fetch data from Rentcast"
        );
    }

    #[tokio::test]
    async fn test_failed_request_error_omits_credentials() {
        let proxy = proxy(Url::parse("http://127.0.0.1:1").unwrap(), Some("maps-secret-key"));
        let endpoint = StreetView::new(ProviderSettings::new(
            Provider::GoogleMaps,
            Some("maps-secret-key".into()),
            Url::parse("http://127.0.0.1:1").unwrap(),
        ));

        let err = proxy
            .fetch(&endpoint, &ProxyQuery::from_query("address=1%20Main"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::UpstreamRequestFailed(Provider::GoogleMaps, _)));
        assert!(!err.to_string().contains("maps-secret-key"));
        assert!(!format!("{err:?}").contains("maps-secret-key"));
    }

    #[test]
    fn test_handles() {
        assert!(DataProxy::handles("/api"));
        assert!(DataProxy::handles("/api/market-stats"));
        assert!(!DataProxy::handles("/apartments"));
        assert!(!DataProxy::handles("/"));
    }

    #[tokio::test]
    async fn test_from_default_config() {
        let proxy = DataProxy::from_config(&Config::default()).unwrap();
        let response = proxy
            .route(get("/api/listings?zipcode=78704"))
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await["error"],
            "Repliers API key is not configured"
        );
    }

    #[tokio::test]
    async fn test_unknown_path_and_method() {
        let proxy = proxy(Url::parse("http://127.0.0.1:1").unwrap(), Some("key"));

        let response = proxy.route(get("/api/unknown")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let post = Request::builder()
            .method(Method::POST)
            .uri("/api/market-stats")
            .body(Empty::<Bytes>::new())
            .unwrap();
        let response = proxy.route(post).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
