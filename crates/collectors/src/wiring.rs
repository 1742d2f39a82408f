//! 설정으로 오케스트레이터 조립
//!
//! 활성화된 협력자만 stage로 등록합니다. 비활성 stage는 실행 시
//! `not configured`로 degraded 처리됩니다.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use vigil_core::config::VigilConfig;
use vigil_pipeline::stages::{ConverseStage, EnrichStage, PersistStage};
use vigil_pipeline::{Orchestrator, RunRegistry};

use crate::conversation::HttpConversationService;
use crate::error::CollectorError;
use crate::generation::ChatCompletionClient;
use crate::notify::EmailNotifier;
use crate::scan::HttpScanBackend;
use crate::storage::{FileSnapshotStore, HttpSnapshotStore};

/// 스냅샷 디렉토리 이름 (`general.data_dir` 아래)
pub const SNAPSHOT_DIR: &str = "snapshots";

/// 설정으로 오케스트레이터를 만듭니다.
///
/// 설정은 이미 검증되었다고 가정합니다. URL 형식 오류는 여기서도 거부됩니다.
pub fn orchestrator_from_config(
    config: &VigilConfig,
    registry: Arc<RunRegistry>,
) -> Result<Orchestrator, CollectorError> {
    let mut builder = Orchestrator::builder()
        .registry(registry)
        .timeout(Duration::from_secs(config.pipeline.timeout_secs))
        .notify_on_timeout(config.pipeline.notify_on_timeout);

    let scan_timeout = Duration::from_secs(config.scanners.request_timeout_secs);
    for endpoint in &config.scanners.endpoints {
        let backend = HttpScanBackend::new(
            endpoint.kind,
            &endpoint.url,
            &config.scanners.api_key,
            scan_timeout,
        )?;
        info!(kind = %endpoint.kind, url = %backend.url(), "scan back-end configured");
        builder = builder.scan_backend(endpoint.kind, Arc::new(backend));
    }

    let enrichment = &config.enrichment;
    if enrichment.enabled {
        let client = ChatCompletionClient::new(
            &enrichment.api_url,
            &enrichment.api_key,
            enrichment.model.clone(),
            Duration::from_secs(enrichment.timeout_secs),
        )?;
        info!(model = %client.model(), "enrichment configured");
        builder = builder.stage(Arc::new(
            EnrichStage::new(client).max_findings(enrichment.max_prompt_findings),
        ));
    }

    let conversation = &config.conversation;
    if conversation.enabled {
        let service = HttpConversationService::new(
            &conversation.url,
            &conversation.api_key,
            Duration::from_secs(conversation.timeout_secs),
        )?;
        info!("conversation service configured");
        builder = builder.stage(Arc::new(ConverseStage::new(service)));
    }

    let storage = &config.storage;
    if storage.enabled {
        if storage.backend == "http" {
            let store = HttpSnapshotStore::new(
                &storage.url,
                &storage.api_key,
                Duration::from_secs(storage.timeout_secs),
            )?;
            info!(url = %storage.url, "http snapshot storage configured");
            builder = builder.stage(Arc::new(PersistStage::new(store)));
        } else {
            let store =
                FileSnapshotStore::new(Path::new(&config.general.data_dir).join(SNAPSHOT_DIR));
            info!(dir = %store.dir().display(), "file snapshot storage configured");
            builder = builder.stage(Arc::new(PersistStage::new(store)));
        }
    }

    let notifier = &config.notifier;
    if notifier.enabled {
        let email = EmailNotifier::new(
            &notifier.url,
            &notifier.api_key,
            notifier.from.clone(),
            Duration::from_secs(notifier.timeout_secs),
        )?;
        info!(from = %notifier.from, "timeout notifier configured");
        builder = builder.notifier(Arc::new(email));
    }

    Ok(builder.build()?)
}
