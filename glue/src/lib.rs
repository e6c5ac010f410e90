use std::sync::Arc;

use bytes::Bytes;
use derivative::Derivative;
use http::{Request, Response};
use http_body_util::Full;
use shared::body::WebhookBody;
use shared::{Middleware, MiddlewareResult};
use tracing::trace;
use uuid::Uuid;

pub mod response;

/// One configured middleware inside a route pipeline.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct PipelineStep {
    pub id: Uuid,
    pub name: Option<String>,
    #[derivative(Debug = "ignore")]
    pub middleware: Arc<dyn Middleware>,
}

impl PipelineStep {
    pub fn new(name: Option<String>, middleware: Arc<dyn Middleware>) -> Self {
        PipelineStep {
            id: Uuid::new_v4(),
            name,
            middleware,
        }
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.middleware.id())
    }
}

/// Middlewares a request has to pass, in order, before it reaches the route handler.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
}

impl Pipeline {
    pub fn new(steps: Vec<PipelineStep>) -> Self {
        Pipeline { steps }
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    /// Runs `request` through every step.
    ///
    /// Returns the request as the last step left it, or the rejection response as soon as one step
    /// refuses it. Later steps never see a rejected request.
    pub async fn run(
        &self,
        mut request: Request<WebhookBody>,
    ) -> Result<Request<WebhookBody>, Response<Full<Bytes>>> {
        for step in &self.steps {
            trace!(step = %step.id, name = step.label(), "running pipeline step");

            request = match step.middleware.handle(request).await {
                MiddlewareResult::Continue(request) => request,
                MiddlewareResult::Reject => return Err(response::forbidden()),
            };
        }

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use github_accept_webhook::{sign, GithubAcceptWebhook, Secret, SIGNATURE_HEADER};
    use http::StatusCode;
    use http_body_util::{BodyExt, Limited};
    use shared::body::full;

    use super::*;

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Middleware for Counting {
        fn id(&self) -> &'static str {
            "counting"
        }

        async fn handle(&self, request: Request<WebhookBody>) -> MiddlewareResult {
            self.calls.fetch_add(1, Ordering::SeqCst);

            MiddlewareResult::Continue(request)
        }
    }

    fn github(secret: &str) -> PipelineStep {
        PipelineStep::new(
            None,
            Arc::new(GithubAcceptWebhook::new(Secret::new(secret).unwrap())),
        )
    }

    fn request(header: Option<String>, body: &'static [u8]) -> Request<WebhookBody> {
        let mut builder = Request::post("/github");
        if let Some(header) = header {
            builder = builder.header(SIGNATURE_HEADER, header);
        }

        builder.body(full(body)).unwrap()
    }

    async fn rejection_of(
        pipeline: &Pipeline,
        request: Request<WebhookBody>,
    ) -> (StatusCode, Bytes) {
        let response = match pipeline.run(request).await {
            Ok(_) => panic!("expected the request to be rejected"),
            Err(response) => response,
        };
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();

        (status, body)
    }

    #[tokio::test]
    async fn accepted_request_reaches_the_next_stage() {
        let next = Arc::new(Counting::default());
        let pipeline = Pipeline::new(vec![
            github("blah"),
            PipelineStep::new(Some("next".to_string()), next.clone()),
        ]);
        let body = b"bdf3d7cdb794dd1cac43069ab8b4447327dc927c";
        let header = sign(body, &Secret::new("blah").unwrap());

        let request = pipeline.run(request(Some(header), body)).await.unwrap();

        assert_eq!(next.calls.load(Ordering::SeqCst), 1);
        let downstream = request.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(downstream, &body[..]);
    }

    #[tokio::test]
    async fn rejected_request_never_reaches_the_next_stage() {
        let next = Arc::new(Counting::default());
        let pipeline = Pipeline::new(vec![github("bar"), PipelineStep::new(None, next.clone())]);
        let body = b"f0a1a256f39a17d10dd0559161eba47d687f42cb";
        let header = sign(body, &Secret::new("foo").unwrap());

        let (status, _) = rejection_of(&pipeline, request(Some(header), body)).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(next.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejections_look_the_same_for_every_cause() {
        let pipeline = Pipeline::new(vec![github("blah")]);
        let secret = Secret::new("blah").unwrap();
        let foreign = Secret::new("foo").unwrap();

        let requests = vec![
            request(Some(sign(b"", &secret)), b""),
            request(None, b"payload"),
            request(Some("sha256=".to_string()), b"payload"),
            request(Some("sha256=xyz".to_string()), b"payload"),
            request(Some(sign(b"payload", &secret).replace("sha256=", "")), b"payload"),
            request(Some(sign(b"payload", &foreign)), b"payload"),
            request(Some(sign(b"payload", &secret)), b"payload")
                .map(|body| Limited::new(body, 4).boxed_unsync()),
        ];

        let mut responses = Vec::new();
        for request in requests {
            responses.push(rejection_of(&pipeline, request).await);
        }

        for response in &responses {
            assert_eq!(
                response,
                &(StatusCode::FORBIDDEN, Bytes::from_static(b"invalid signature\n"))
            );
        }
    }

    #[test]
    fn forbidden_response_headers() {
        let response = response::forbidden();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers()[http::header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(
            response.headers()[http::header::X_CONTENT_TYPE_OPTIONS],
            "nosniff"
        );
    }

    #[tokio::test]
    async fn empty_pipeline_passes_everything() {
        let pipeline = Pipeline::default();

        assert!(pipeline.steps().is_empty());
        assert!(pipeline.run(request(None, b"")).await.is_ok());
    }
}
