use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use config_parser::internal::ConfigFileInternal;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use shared::body::{BoxError, WebhookBody};
use shared::http::{HttpMethod, HttpVersion, RemoteAddr};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

async fn not_found<B>(request: &Request<B>) -> Result<Response<Full<Bytes>>> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Full::new(Bytes::from(format!(
            "Couldn't find handler for the route {:?} '{:?}'\n",
            request.method(),
            request.uri()
        ))))?)
}

fn payload_too_large(max_body_size: u64, declared: u64) -> Result<Response<Full<Bytes>>> {
    Ok(Response::builder()
        .status(StatusCode::PAYLOAD_TOO_LARGE)
        .body(Full::new(Bytes::from(format!(
            "Body is too big, max allowed body size is {} bytes, \
             but received a size hint of {} bytes\n",
            max_body_size, declared
        ))))?)
}

/// Last stage of the route, only reached by requests the whole pipeline accepted.
async fn accepted(request: Request<WebhookBody>) -> Result<Response<Full<Bytes>>> {
    let body = request
        .into_body()
        .collect()
        .await
        .map_err(|err| anyhow::anyhow!(err))?
        .to_bytes();

    info!(bytes = body.len(), "webhook accepted");

    Ok(Response::builder()
        .status(StatusCode::ACCEPTED)
        .body(Full::new(Bytes::new()))?)
}

async fn validator_request(
    request: Request<WebhookBody>,
    config: Arc<ConfigFileInternal>,
) -> Result<Response<Full<Bytes>>> {
    debug!(
        method = ?HttpMethod::try_from(request.method()).ok(),
        version = ?HttpVersion::try_from(request.version()).ok(),
        "validating request"
    );

    match config.route.pipeline.run(request).await {
        Ok(request) => accepted(request).await,
        Err(rejection) => Ok(rejection),
    }
}

pub async fn handle_request<B>(
    config: Arc<ConfigFileInternal>,
    request: Request<B>,
) -> Result<Response<Full<Bytes>>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    if request.uri().path() != config.route.path {
        return not_found(&request).await;
    }

    let max_body_size = config.config.max_body_size;
    let declared = request.body().size_hint().lower();
    if declared > max_body_size {
        return payload_too_large(max_body_size, declared);
    }

    // bodies without a declared length are cut off while reading, which the pipeline treats like
    // any other read error
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let request = request.map(|body| Limited::new(body, limit).boxed_unsync());

    validator_request(request, config).await
}

pub async fn start(config: Arc<ConfigFileInternal>) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.config.expose));

    let listener = TcpListener::bind(addr).await?;
    info!(address = %addr, path = %config.route.path, "listening for webhooks");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(connection) => connection,
                Err(err) => {
                    warn!("Error accepting connection: {:?}", err);
                    continue;
                }
            },
            _ = &mut shutdown => {
                info!("shutting down");
                return Ok(());
            }
        };

        debug!(peer = %peer, "Got a new connection");

        let io = TokioIo::new(stream);
        let config = config.clone();

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(
                    io,
                    service_fn(|mut request: Request<Incoming>| {
                        request.extensions_mut().insert(RemoteAddr(peer));

                        handle_request(config.clone(), request)
                    }),
                )
                .await
            {
                warn!(peer = %peer, "Error serving connection: {:?}", err);
            }
        });
    }
}
