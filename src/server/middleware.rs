use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::time::Instant;

pub const PROCESS_TIME_HEADER: &str = "x-process-time";

/// Adds `X-Process-Time` (seconds) to every response and logs the request.
pub struct ProcessTime;

impl<S, B> Transform<S, ServiceRequest> for ProcessTime
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ProcessTimeMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ProcessTimeMiddleware { service }))
    }
}

pub struct ProcessTimeMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for ProcessTimeMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.path().to_string();
        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;
            let elapsed = start.elapsed();

            if let Ok(value) = HeaderValue::from_str(&format!("{:.6}", elapsed.as_secs_f64())) {
                res.headers_mut()
                    .insert(HeaderName::from_static(PROCESS_TIME_HEADER), value);
            }

            log::info!(
                "{} {} -> {} in {}ms",
                method,
                path,
                res.status().as_u16(),
                elapsed.as_millis()
            );
            Ok(res)
        })
    }
}
