//! Per-IP HTTP rate limiting for the plain REST surface (health, metrics).
//! The WebSocket transport has its own per-connection limiter
//! (`crate::transport`); this one guards the handful of HTTP endpoints the
//! teacher's Redis sliding-window limiter used to cover, now backed by an
//! in-memory keyed `governor` limiter instead of Redis (spec's baseline is
//! single-process, so there is no cross-instance state to share).

use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{Request, Response, StatusCode};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};

type KeyedLimiter = GovernorRateLimiter<IpAddr, governor::state::keyed::DefaultKeyedStateStore<IpAddr>, governor::clock::DefaultClock>;

#[derive(Clone)]
pub struct IpRateLimitLayer {
    limiter: Arc<KeyedLimiter>,
}

impl IpRateLimitLayer {
    pub fn new(per_sec: u32, burst: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(per_sec.max(1)).unwrap())
            .allow_burst(NonZeroU32::new(burst.max(1)).unwrap());
        Self { limiter: Arc::new(GovernorRateLimiter::keyed(quota)) }
    }
}

impl<S> Layer<S> for IpRateLimitLayer {
    type Service = IpRateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        IpRateLimitService { inner, limiter: self.limiter.clone() }
    }
}

#[derive(Clone)]
pub struct IpRateLimitService<S> {
    inner: S,
    limiter: Arc<KeyedLimiter>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for IpRateLimitService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    ResBody: Default,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = RateLimitFuture<S::Future, ResBody>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .unwrap_or(IpAddr::from([0, 0, 0, 0]));

        if self.limiter.check_key(&ip).is_err() {
            return RateLimitFuture::Limited { __marker: std::marker::PhantomData };
        }

        RateLimitFuture::Inner { inner: self.inner.call(req) }
    }
}

pin_project! {
    #[project = RateLimitFutureProj]
    pub enum RateLimitFuture<F, ResBody> {
        Inner { #[pin] inner: F },
        Limited { __marker: std::marker::PhantomData<ResBody> },
    }
}

impl<F, ResBody, E> Future for RateLimitFuture<F, ResBody>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
    ResBody: Default,
{
    type Output = Result<Response<ResBody>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            RateLimitFutureProj::Inner { inner } => inner.poll(cx),
            RateLimitFutureProj::Limited { .. } => {
                let mut response = Response::new(ResBody::default());
                *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
                Poll::Ready(Ok(response))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use tower::ServiceExt;

    #[derive(Clone)]
    struct Echo;

    impl Service<Request<Body>> for Echo {
        type Response = Response<Body>;
        type Error = std::convert::Infallible;
        type Future = std::future::Ready<Result<Self::Response, Self::Error>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: Request<Body>) -> Self::Future {
            std::future::ready(Ok(Response::new(Body::empty())))
        }
    }

    #[tokio::test]
    async fn allows_requests_within_quota() {
        let layer = IpRateLimitLayer::new(5, 5);
        let svc = layer.layer(Echo);
        let req = Request::builder().body(Body::empty()).unwrap();
        let resp = svc.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_once_burst_is_exhausted() {
        let layer = IpRateLimitLayer::new(1, 1);
        let mut svc = layer.layer(Echo);
        let first = svc
            .clone()
            .oneshot(Request::builder().body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = svc
            .ready()
            .await
            .unwrap()
            .call(Request::builder().body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
