//! The reference `FetchMetaNet` domain worker.
//!
//! Models a network metadata/art round-trip against a remote provider: a
//! GET, a status-code check, then a typed JSON body.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::domain_worker::{DomainWorker, Outcome, Reporter, WorkerInput, WorkerProduct};
use crate::error::{FetchMetaNetError, WorkerError};
use crate::item::ItemHandle;

#[derive(Debug, Deserialize)]
struct MetadataResponse {
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    art_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// An HTTP-backed metadata/art fetch against a configured provider
/// endpoint. With no endpoint configured, this worker succeeds trivially
/// (there is nothing to fetch), which keeps `WorkerRegistry::reference`
/// usable without a live provider in tests.
#[derive(Clone)]
pub struct FetchMetaNetWorker {
    http: reqwest::Client,
    endpoint: Option<Url>,
}

impl FetchMetaNetWorker {
    /// Builds a worker that queries `endpoint` (if any) using `http`.
    pub fn new(http: reqwest::Client, endpoint: Option<Url>) -> Self {
        Self { http, endpoint }
    }
}

#[async_trait]
impl DomainWorker for FetchMetaNetWorker {
    async fn run(
        &self,
        item: Arc<dyn ItemHandle>,
        input: WorkerInput,
        _deadline: Option<Instant>,
        reporter: Arc<dyn Reporter>,
        cancel: CancellationToken,
    ) -> Outcome {
        if !matches!(input, WorkerInput::FetchMetaNet) {
            return Outcome::error(WorkerError::FetchMetaNet(FetchMetaNetError::Provider {
                status: 0,
                detail: Some("fetch_meta_net worker received unexpected input".into()),
            }));
        }

        let Some(endpoint) = &self.endpoint else {
            return Outcome::Ok(WorkerProduct::None);
        };

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Outcome::Interrupted,
            res = self.http.get(endpoint.clone()).send() => res,
        };

        let response = match response {
            Ok(response) => response,
            Err(err) => return Outcome::error(WorkerError::from(FetchMetaNetError::Transport(err))),
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ProviderErrorBody>(&body).ok().map(|b| b.message);
            return Outcome::error(WorkerError::from(FetchMetaNetError::Provider { status, detail }));
        }

        let body: MetadataResponse = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Outcome::Interrupted,
            body = response.json() => match body {
                Ok(body) => body,
                Err(err) => return Outcome::error(WorkerError::from(FetchMetaNetError::Transport(err))),
            },
        };

        if let Some(title) = &body.title {
            item.set_metadata_field("title", title);
        }
        if let Some(artist) = &body.artist {
            item.set_metadata_field("artist", artist);
        }
        if let Some(album) = &body.album {
            item.set_metadata_field("album", album);
        }
        if let Some(art_url) = &body.art_url {
            item.set_art_url(art_url);
            reporter.attachments_added();
        }

        Outcome::Ok(WorkerProduct::None)
    }
}
