use crate::config::Config;
use crate::errors::SiteError;
use crate::http::send_to_renderer;
use crate::metrics_defs::{RENDERER_FAILURES, REQUEST_DURATION, REQUESTS_INFLIGHT};
use attribution::Interceptor;
use chrono::Utc;
use data_proxy::DataProxy;
use http::header::SET_COOKIE;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use metrics::Gauge;
use shared::http::{ResponseBody, full_body, make_error_response};
use shared::{counter, gauge, histogram};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// The public listener: `/api/*` goes to the data proxy, everything else is
/// rendered upstream with the attribution cookie applied on the way out.
#[derive(Clone)]
pub struct SiteService {
    data_proxy: DataProxy,
    interceptor: Arc<Interceptor>,
    client: Client<HttpConnector, Full<Bytes>>,
    renderer_url: Arc<Url>,
    renderer_timeout: Duration,
}

impl SiteService {
    pub fn new(
        data_proxy: DataProxy,
        interceptor: Interceptor,
        renderer_url: Url,
        renderer_timeout: Duration,
    ) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        SiteService {
            data_proxy,
            interceptor: Arc::new(interceptor),
            client,
            renderer_url: Arc::new(renderer_url),
            renderer_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, SiteError> {
        let data_proxy = DataProxy::from_config(&config.data_proxy)?;
        let interceptor = Interceptor::new(config.attribution.cookie_policy(config.environment));

        Ok(Self::new(
            data_proxy,
            interceptor,
            config.renderer.url.clone(),
            Duration::from_secs(config.renderer.timeout_secs),
        ))
    }

    pub async fn handle<B>(&self, req: Request<B>) -> Response<ResponseBody>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        let start = Instant::now();
        let inflight = InflightGuard::new(gauge!(REQUESTS_INFLIGHT));

        let (route, response) = if DataProxy::handles(req.uri().path()) {
            ("api", self.data_proxy.route(req).await)
        } else {
            ("page", self.page(req).await)
        };

        drop(inflight);
        histogram!(
            REQUEST_DURATION,
            "route" => route,
            "status" => response.status().as_u16().to_string()
        )
        .record(start.elapsed().as_secs_f64());

        response
    }

    async fn page<B>(&self, req: Request<B>) -> Response<ResponseBody>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        // Computed up front so a renderer failure cannot lose the capture.
        let set_cookie = self
            .interceptor
            .intercept(req.uri(), req.headers(), Utc::now());

        let mut response = match self.render(req).await {
            Ok(response) => response.map(full_body),
            Err(SiteError::RequestBodyError(e)) => {
                tracing::debug!(error = %e, "failed to read page request body");
                make_error_response(StatusCode::BAD_REQUEST)
            }
            Err(e) => {
                let reason = match e {
                    SiteError::UpstreamTimeout(_) => "timeout",
                    _ => "request_failed",
                };
                tracing::warn!(error = %e, "renderer request failed");
                counter!(RENDERER_FAILURES, "reason" => reason).increment(1);
                make_error_response(StatusCode::BAD_GATEWAY)
            }
        };

        if let Some(value) = set_cookie {
            response.headers_mut().append(SET_COOKIE, value);
        }
        response
    }

    async fn render<B>(&self, req: Request<B>) -> Result<Response<Bytes>, SiteError>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        let (parts, body) = req.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| SiteError::RequestBodyError(e.to_string()))?
            .to_bytes();

        let request = Request::from_parts(parts, Full::new(body));
        send_to_renderer(
            &self.client,
            &self.renderer_url,
            request,
            self.renderer_timeout,
        )
        .await
    }
}

/// Holds one unit of the inflight gauge until dropped, including when the
/// request future is cancelled by a client disconnect.
struct InflightGuard {
    gauge: Gauge,
}

impl InflightGuard {
    fn new(gauge: Gauge) -> Self {
        gauge.increment(1.0);
        InflightGuard { gauge }
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.gauge.decrement(1.0);
    }
}

impl Service<Request<Incoming>> for SiteService {
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attribution::{AttributionRecord, CookiePolicy};
    use attribution::cookie::decode_record;
    use data_proxy::cache::NoCache;
    use data_proxy::upstream::UpstreamClient;
    use http::header::{COOKIE, HeaderValue};
    use http_body_util::Empty;
    use hyper::service::service_fn;
    use hyper_util::rt::TokioIo;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::net::TcpListener;

    // Fake renderer: answers every page with its path and sets a session cookie
    // of its own.
    async fn start_renderer() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                tokio::spawn(async move {
                    let svc = service_fn(|req: Request<Incoming>| async move {
                        let body = format!("rendered {}", req.uri().path());
                        let mut res = Response::new(Full::new(Bytes::from(body)));
                        res.headers_mut()
                            .insert(SET_COOKIE, HeaderValue::from_static("sid=abc; Path=/"));
                        Ok::<_, Infallible>(res)
                    });
                    let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), svc)
                        .await;
                });
            }
        });

        Url::parse(&format!("http://127.0.0.1:{port}")).unwrap()
    }

    fn site(renderer_url: Url) -> SiteService {
        let data_proxy = DataProxy::new(
            vec![],
            Arc::new(NoCache),
            UpstreamClient::new(Duration::from_secs(1)).unwrap(),
        );
        SiteService::new(
            data_proxy,
            Interceptor::new(CookiePolicy::default()),
            renderer_url,
            Duration::from_secs(5),
        )
    }

    fn get(uri: &str) -> Request<Empty<Bytes>> {
        Request::builder().uri(uri).body(Empty::new()).unwrap()
    }

    fn attribution_cookie(response: &Response<ResponseBody>) -> Option<AttributionRecord> {
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| v.strip_prefix("masterkey_utms="))
            .map(|v| v.split(';').next().unwrap_or_default())
            .map(|raw| decode_record(raw, Utc::now()).unwrap())
    }

    async fn body_string(response: Response<ResponseBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_landing_page_sets_attribution_cookie() {
        let site = site(start_renderer().await);

        let response = site
            .handle(get("/landing/promo?utm_source=newsletter&utm_medium=email"))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let record = attribution_cookie(&response).expect("attribution cookie");
        assert_eq!(record.utm_source.as_deref(), Some("newsletter"));
        assert_eq!(record.utm_medium.as_deref(), Some("email"));
        assert_eq!(record.first_seen, record.last_updated);

        // The renderer's own cookie is kept alongside ours.
        assert_eq!(response.headers().get_all(SET_COOKIE).iter().count(), 2);
        assert_eq!(body_string(response).await, "rendered /landing/promo");
    }

    #[tokio::test]
    async fn test_page_without_tracking_params_is_untouched() {
        let site = site(start_renderer().await);

        let response = site.handle(get("/listings/austin?page=2")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(attribution_cookie(&response).is_none());
        assert_eq!(response.headers().get_all(SET_COOKIE).iter().count(), 1);
    }

    #[tokio::test]
    async fn test_returning_visitor_keeps_first_seen() {
        let site = site(start_renderer().await);

        let first = site.handle(get("/?utm_source=google&gclid=abc")).await;
        let prior = attribution_cookie(&first).unwrap();
        let cookie = first
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("masterkey_utms="))
            .and_then(|v| v.split(';').next())
            .unwrap()
            .to_string();

        let request = Request::builder()
            .uri("/sell?utm_campaign=spring")
            .header(COOKIE, format!("theme=dark; {cookie}"))
            .body(Empty::<Bytes>::new())
            .unwrap();
        let record = attribution_cookie(&site.handle(request).await).unwrap();

        assert_eq!(record.first_seen, prior.first_seen);
        assert_eq!(record.utm_source.as_deref(), Some("google"));
        assert_eq!(record.gclid.as_deref(), Some("abc"));
        assert_eq!(record.utm_campaign.as_deref(), Some("spring"));
    }

    #[tokio::test]
    async fn test_api_requests_never_touch_the_cookie() {
        let site = site(start_renderer().await);

        let response = site.handle(get("/api/anything?utm_source=spam")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_renderer_down_returns_bad_gateway() {
        let site = site(Url::parse("http://127.0.0.1:1").unwrap());

        let response = site.handle(get("/?utm_source=newsletter")).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(attribution_cookie(&response).is_some());
    }

    fn gauge_value(cell: &AtomicU64) -> f64 {
        f64::from_bits(cell.load(Ordering::SeqCst))
    }

    #[test]
    fn test_inflight_guard_balances() {
        let cell = Arc::new(AtomicU64::new(0));
        let gauge = Gauge::from_arc(cell.clone());

        let first = InflightGuard::new(gauge.clone());
        let second = InflightGuard::new(gauge);
        assert_eq!(gauge_value(&cell), 2.0);

        drop(first);
        drop(second);
        assert_eq!(gauge_value(&cell), 0.0);
    }

    #[tokio::test]
    async fn test_cancelled_request_releases_inflight() {
        let cell = Arc::new(AtomicU64::new(0));
        let gauge = Gauge::from_arc(cell.clone());

        let stalled = async move {
            let _inflight = InflightGuard::new(gauge);
            std::future::pending::<()>().await;
        };
        let result = tokio::time::timeout(Duration::from_millis(50), stalled).await;

        assert!(result.is_err());
        assert_eq!(gauge_value(&cell), 0.0);
    }
}
