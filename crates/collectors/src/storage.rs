//! 스냅샷 저장소: 원격 HTTP API 또는 로컬 JSON 파일

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use vigil_core::error::CollaboratorError;
use vigil_core::pipeline::SnapshotStore;

use crate::error::CollectorError;
use crate::http::{JsonEndpoint, reject_unsuccessful};

// ─── HttpSnapshotStore ───────────────────────────────────────────────

/// 원격 저장 API
///
/// 요청: `POST {url}` 스냅샷 그대로, 응답: `{"storageId"}` (또는 `{"id"}`)
#[derive(Debug, Clone)]
pub struct HttpSnapshotStore {
    endpoint: JsonEndpoint,
}

impl HttpSnapshotStore {
    /// 저장소를 생성합니다.
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self, CollectorError> {
        Ok(Self {
            endpoint: JsonEndpoint::new("storage.url", url, api_key, timeout)?,
        })
    }
}

impl SnapshotStore for HttpSnapshotStore {
    async fn store(&self, snapshot: &Value) -> Result<String, CollaboratorError> {
        let reply = reject_unsuccessful(self.endpoint.post(snapshot).await?)?;
        ["storageId", "id"]
            .iter()
            .find_map(|key| reply.get(*key).and_then(Value::as_str))
            .map(str::to_owned)
            .ok_or_else(|| CollaboratorError::InvalidResponse("missing storageId".to_owned()))
    }
}

// ─── FileSnapshotStore ───────────────────────────────────────────────

/// 로컬 디렉토리에 `{storageId}.json`으로 저장하는 저장소
///
/// storageId는 UUID v4입니다. 디렉토리는 첫 저장 시 생성됩니다.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// 저장 디렉토리를 지정해 생성합니다.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 저장 디렉토리
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 저장된 스냅샷을 읽습니다.
    pub async fn load(&self, storage_id: &str) -> Result<Value, CollaboratorError> {
        let id = uuid::Uuid::parse_str(storage_id)
            .map_err(|_| CollaboratorError::Io(format!("invalid storage id '{storage_id}'")))?;
        let path = self.path_for(&id.to_string());
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| CollaboratorError::Io(format!("{}: {e}", path.display())))?;
        serde_json::from_slice(&bytes).map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

impl SnapshotStore for FileSnapshotStore {
    async fn store(&self, snapshot: &Value) -> Result<String, CollaboratorError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CollaboratorError::Io(format!("{}: {e}", self.dir.display())))?;

        let id = uuid::Uuid::new_v4().to_string();
        let path = self.path_for(&id);
        let bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| CollaboratorError::Io(e.to_string()))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| CollaboratorError::Io(format!("{}: {e}", path.display())))?;

        debug!(path = %path.display(), "snapshot written");
        Ok(id)
    }
}
