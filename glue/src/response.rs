use bytes::Bytes;
use http::header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderValue, Response, StatusCode};
use http_body_util::Full;

pub const REJECTION_BODY: &str = "invalid signature\n";

/// The one response every rejected request gets, whatever the reason was.
pub fn forbidden() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(REJECTION_BODY.as_bytes())));

    *response.status_mut() = StatusCode::FORBIDDEN;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
        .headers_mut()
        .insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));

    response
}
