use hyper::body::Incoming;
use hyper::{Request, Response};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use http_body_util::BodyExt;

use crate::error::{GateError, Result};
use crate::proxy::synthetic_response::RespBody;

pub(crate) type HttpClient = Client<HttpConnector, Incoming>;

pub(crate) fn new_client() -> HttpClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

/// Forward an admitted request to the upstream, rewriting only the URI.
pub(crate) async fn forward(
    req: Request<Incoming>,
    client: HttpClient,
    backend: &str,
) -> Result<Response<RespBody>> {
    let uri = format!(
        "http://{}{}",
        backend,
        req.uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("")
    )
    .parse()
    .map_err(|e| GateError::Http(format!("invalid upstream uri: {e}")))?;

    let (mut parts, body) = req.into_parts();
    parts.uri = uri;
    let out_req = Request::from_parts(parts, body);

    let resp = client
        .request(out_req)
        .await
        .map_err(|e| GateError::Http(format!("upstream request failed: {e}")))?;
    Ok(resp.map(|b| b.boxed()))
}
