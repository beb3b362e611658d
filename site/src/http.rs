use crate::errors::SiteError;
use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper::{Request, Response};
use hyper_util::client::legacy::Client;
use shared::http::{add_via_header, filter_hop_by_hop};
use std::time::Duration;
use tokio::time::timeout;

/// Forwards a page request to the renderer and collects its response.
///
/// The request keeps its method, path, query and end-to-end headers; only the
/// scheme and authority are replaced by `renderer_url`. Hop-by-hop headers are
/// dropped in both directions and a `Via` header is added.
///
/// `request_timeout` covers the whole exchange, including collecting the
/// response body, so this is not suitable for streamed responses.
pub async fn send_to_renderer<C, B>(
    client: &Client<C, B>,
    renderer_url: &url::Url,
    request: Request<B>,
    request_timeout: Duration,
) -> Result<Response<Bytes>, SiteError>
where
    C: hyper_util::client::legacy::connect::Connect + Clone + Send + Sync + 'static,
    B: hyper::body::Body + Send + Unpin + 'static,
    B::Data: Send,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let renderer = renderer_url.host_str().unwrap_or(renderer_url.as_str());

    let Some(path_and_query) = request.uri().path_and_query() else {
        return Err(SiteError::InternalError(
            "Request URI missing path and query".to_string(),
        ));
    };

    let mut url = renderer_url.clone();
    url.set_path(path_and_query.path());
    url.set_query(path_and_query.query());

    let (mut parts, body) = request.into_parts();
    let request_version = parts.version;
    filter_hop_by_hop(&mut parts.headers, request_version);
    add_via_header(&mut parts.headers, request_version);

    let mut builder = Request::builder()
        .method(parts.method)
        .uri(url.as_str())
        .version(parts.version);
    for (name, value) in parts.headers.iter() {
        builder = builder.header(name, value);
    }

    let renderer_request = builder
        .body(body)
        .map_err(|e| SiteError::InternalError(format!("Failed to build request: {e}")))?;

    let response = timeout(request_timeout, client.request(renderer_request))
        .await
        .map_err(|_| SiteError::UpstreamTimeout(renderer.to_string()))?
        .map_err(|e| SiteError::UpstreamRequestFailed(renderer.to_string(), e.to_string()))?;

    let (mut parts, body) = response.into_parts();
    let response_version = parts.version;
    filter_hop_by_hop(&mut parts.headers, response_version);
    add_via_header(&mut parts.headers, response_version);

    // The timeout above only bounds the headers; bound the body separately.
    let body_bytes = timeout(request_timeout, body.collect())
        .await
        .map_err(|_| SiteError::UpstreamTimeout(renderer.to_string()))?
        .map(|collected| collected.to_bytes())
        .map_err(|e| SiteError::ResponseBodyError(e.to_string()))?;

    Ok(Response::from_parts(parts, body_bytes))
}
