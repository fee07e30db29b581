use http::StatusCode;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;

pub(crate) type RespBody = BoxBody<Bytes, hyper::Error>;

pub(crate) fn empty_body() -> RespBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

/// Build an empty-bodied response with the given status code
pub(crate) fn synthetic_error_response(status_code: StatusCode) -> Response<RespBody> {
    let mut resp = Response::new(empty_body());
    *resp.status_mut() = status_code;
    resp
}
