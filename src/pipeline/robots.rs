//! `/robots.txt` interceptor.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
};

use crate::config::RobotsPolicy;
use crate::pipeline::{Interceptor, Outcome, PipelineError};

/// Body served when robots is simply enabled.
pub const DEFAULT_ROBOTS: &str = "User-agent: *\nDisallow: /";

pub struct RobotsInterceptor {
    body: String,
}

impl RobotsInterceptor {
    pub fn new(policy: &RobotsPolicy) -> Self {
        let body = match policy {
            RobotsPolicy::Default => DEFAULT_ROBOTS.to_string(),
            // Operators pass newlines as a literal backslash-n on the command line.
            RobotsPolicy::Custom(text) => text.replace("\\n", "\n"),
        };
        Self { body }
    }

    fn response(&self) -> Response {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain")],
            self.body.clone(),
        )
            .into_response()
    }
}

#[async_trait]
impl Interceptor for RobotsInterceptor {
    fn name(&self) -> &'static str {
        "robots"
    }

    async fn intercept(&self, req: Request<Body>) -> Result<Outcome, PipelineError> {
        if req.uri().path() == "/robots.txt" {
            tracing::debug!(method = %req.method(), "Serving robots.txt");
            return Ok(Outcome::Handled(self.response()));
        }
        Ok(Outcome::Defer(req))
    }
}
