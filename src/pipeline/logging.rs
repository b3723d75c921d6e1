//! Request logging interceptor.

use async_trait::async_trait;
use axum::{body::Body, http::Request};
use std::sync::Arc;

use crate::pipeline::{Interceptor, LogHook, Outcome, PipelineError, RequestHead};

/// Invokes the log hook, then always defers.
pub struct LoggingInterceptor {
    hook: Option<Arc<dyn LogHook>>,
}

impl LoggingInterceptor {
    pub fn new(hook: Option<Arc<dyn LogHook>>) -> Self {
        Self { hook }
    }
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn intercept(&self, req: Request<Body>) -> Result<Outcome, PipelineError> {
        if let Some(hook) = &self.hook {
            hook.log(&RequestHead::from_request(&req), None);
        }
        Ok(Outcome::Defer(req))
    }
}
