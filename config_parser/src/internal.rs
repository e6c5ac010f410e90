use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use github_accept_webhook::GithubAcceptWebhook;
use glue::{Pipeline, PipelineStep};
use shared::Middleware;
use tracing::debug;

use crate::raw::{Config, ConfigFile, ConfigVersion, Route, Step};

/// Creates the middleware a step refers to with `uses`.
///
/// This is where setup validation happens, a step with a bad configuration (e.g. an empty secret)
/// never becomes part of a pipeline.
fn build_middleware(step: &Step) -> Result<Arc<dyn Middleware>> {
    match step.uses.as_str() {
        GithubAcceptWebhook::ID => {
            let arguments = step.named_arguments(&["secret"])?;

            Ok(Arc::new(GithubAcceptWebhook::setup(&arguments)?))
        }
        other => bail!("Unknown pipeline module: '{}'", other),
    }
}

fn step_internal(step: Step) -> Result<PipelineStep> {
    let middleware = build_middleware(&step).with_context(|| match &step.name {
        Some(name) => format!("Could not set up pipeline step '{}' ({})", name, step.uses),
        None => format!("Could not set up pipeline step '{}'", step.uses),
    })?;

    let step = PipelineStep::new(step.name, middleware);
    debug!(id = %step.id, name = ?step.name, "pipeline step ready");

    Ok(step)
}

#[derive(Debug, Clone)]
pub struct RouteInternal {
    pub path: String,
    pub pipeline: Pipeline,
}

impl RouteInternal {
    fn from_route(value: Route) -> Result<RouteInternal> {
        if !value.path.starts_with('/') {
            bail!("Route path has to start with a '/': '{}'", value.path);
        }

        let pipeline = value
            .pipeline
            .into_iter()
            .map(step_internal)
            .collect::<Result<Vec<_>>>()?;

        if pipeline.is_empty() {
            bail!("The pipeline of route '{}' is empty", value.path);
        }

        Ok(RouteInternal {
            path: value.path,
            pipeline: Pipeline::new(pipeline),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ConfigFileInternal {
    pub version: ConfigVersion,
    pub config: Config,
    pub route: RouteInternal,
}

impl ConfigFileInternal {
    /// Resolves variables and sets up every pipeline step. Fails if any step can't be set up.
    pub fn from_config(mut value: ConfigFile) -> Result<ConfigFileInternal> {
        value.populate_env_variables()?;

        Ok(ConfigFileInternal {
            version: value.version,
            config: value.config,
            route: RouteInternal::from_route(value.route)?,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<ConfigFileInternal> {
        Self::from_config(ConfigFile::parse(path)?)
    }
}
