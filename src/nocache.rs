//! Cache-busting response decorator
//!
//! Wraps any hyper service so that every response it produces carries the
//! three headers telling browsers and proxies never to reuse it.

use hyper::header::{HeaderMap, HeaderValue, CACHE_CONTROL, EXPIRES, PRAGMA};
use hyper::service::Service;
use hyper::Response;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

pub const CACHE_CONTROL_VALUE: &str = "no-store, no-cache, must-revalidate, max-age=0";
pub const PRAGMA_VALUE: &str = "no-cache";
pub const EXPIRES_VALUE: &str = "0";

/// Insert the cache-busting headers, replacing any existing value.
pub fn apply_no_cache_headers(headers: &mut HeaderMap) {
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE));
    headers.insert(PRAGMA, HeaderValue::from_static(PRAGMA_VALUE));
    headers.insert(EXPIRES, HeaderValue::from_static(EXPIRES_VALUE));
}

/// Service decorator that runs after the inner service has settled status,
/// body and base headers, and before hyper writes the header block.
#[derive(Debug, Clone, Copy)]
pub struct NoCache<S> {
    inner: S,
}

impl<S> NoCache<S> {
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S, Req, B> Service<Req> for NoCache<S>
where
    S: Service<Req, Response = Response<B>>,
{
    type Response = Response<B>;
    type Error = S::Error;
    type Future = NoCacheFuture<S::Future>;

    fn call(&self, req: Req) -> Self::Future {
        NoCacheFuture {
            inner: Box::pin(self.inner.call(req)),
        }
    }
}

/// Future returned by [`NoCache`].
pub struct NoCacheFuture<F> {
    inner: Pin<Box<F>>,
}

impl<F, B, E> Future for NoCacheFuture<F>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Output = Result<Response<B>, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match ready!(self.inner.as_mut().poll(cx)) {
            Ok(mut response) => {
                apply_no_cache_headers(response.headers_mut());
                Poll::Ready(Ok(response))
            }
            Err(e) => Poll::Ready(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{Empty, Full};
    use hyper::body::Bytes;
    use hyper::service::service_fn;
    use hyper::{Request, StatusCode};
    use std::convert::Infallible;

    fn assert_no_cache(headers: &HeaderMap) {
        assert_eq!(headers.get_all(CACHE_CONTROL).iter().count(), 1);
        assert_eq!(headers[CACHE_CONTROL], CACHE_CONTROL_VALUE);
        assert_eq!(headers[PRAGMA], "no-cache");
        assert_eq!(headers[EXPIRES], "0");
    }

    #[test]
    fn test_apply_replaces_existing_cache_control() {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("public, max-age=3600"));
        headers.append(CACHE_CONTROL, HeaderValue::from_static("immutable"));
        apply_no_cache_headers(&mut headers);
        assert_no_cache(&headers);
    }

    #[tokio::test]
    async fn test_decorator_adds_headers_to_success() {
        let svc = NoCache::new(service_fn(|_req: Request<Empty<Bytes>>| async {
            Ok::<_, Infallible>(
                Response::builder()
                    .header("Content-Type", "text/plain")
                    .body(Full::new(Bytes::from_static(b"hi")))
                    .unwrap(),
            )
        }));

        let resp = svc.call(Request::new(Empty::new())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "text/plain");
        assert_no_cache(resp.headers());
    }

    #[tokio::test]
    async fn test_decorator_adds_headers_to_errors_and_redirects() {
        for status in [301u16, 304, 403, 404, 501] {
            let svc = NoCache::new(service_fn(move |_req: Request<Empty<Bytes>>| async move {
                Ok::<_, Infallible>(
                    Response::builder()
                        .status(status)
                        .body(Full::new(Bytes::new()))
                        .unwrap(),
                )
            }));

            let resp = svc.call(Request::new(Empty::new())).await.unwrap();
            assert_eq!(resp.status().as_u16(), status);
            assert_no_cache(resp.headers());
        }
    }

    #[tokio::test]
    async fn test_decorator_passes_errors_through() {
        let svc = NoCache::new(service_fn(|_req: Request<Empty<Bytes>>| async {
            Err::<Response<Full<Bytes>>, _>("boom")
        }));

        let err = svc.call(Request::new(Empty::new())).await.unwrap_err();
        assert_eq!(err, "boom");
    }
}
