//! 설정 관리: vigil.toml 파싱 및 런타임 설정
//!
//! [`VigilConfig`]는 데몬, CLI, 협력자 클라이언트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`VIGIL_PIPELINE_TIMEOUT_SECS=300` 형식)
//! 3. 설정 파일 (`vigil.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), vigil_core::error::VigilError> {
//! use vigil_core::config::VigilConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = VigilConfig::load("vigil.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = VigilConfig::parse("[pipeline]\ntimeout_secs = 300")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, VigilError};
use crate::types::ScanKind;

/// Vigil 통합 설정
///
/// `vigil.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VigilConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 파이프라인 실행 정책
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// scan back-end 설정
    #[serde(default)]
    pub scanners: ScannersConfig,
    /// 텍스트 생성(enrich) 설정
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    /// 대화 세션(converse) 설정
    #[serde(default)]
    pub conversation: ConversationConfig,
    /// 스냅샷 저장(persist) 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// timeout 알림 설정
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// HTTP API 설정
    #[serde(default)]
    pub api: ApiConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl VigilConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, VigilError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, VigilError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VigilError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                VigilError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, VigilError> {
        toml::from_str(toml_str).map_err(|e| {
            VigilError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `VIGIL_{SECTION}_{FIELD}`
    /// 예: `VIGIL_ENRICHMENT_API_KEY=gsk_...`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "VIGIL_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "VIGIL_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.data_dir, "VIGIL_GENERAL_DATA_DIR");
        override_string(&mut self.general.pid_file, "VIGIL_GENERAL_PID_FILE");

        // Pipeline
        override_parsed(
            &mut self.pipeline.timeout_secs,
            "VIGIL_PIPELINE_TIMEOUT_SECS",
        );
        override_parsed(
            &mut self.pipeline.history_capacity,
            "VIGIL_PIPELINE_HISTORY_CAPACITY",
        );
        override_parsed(
            &mut self.pipeline.notify_on_timeout,
            "VIGIL_PIPELINE_NOTIFY_ON_TIMEOUT",
        );

        // Scanners
        override_parsed(
            &mut self.scanners.request_timeout_secs,
            "VIGIL_SCANNERS_REQUEST_TIMEOUT_SECS",
        );
        override_string(&mut self.scanners.api_key, "VIGIL_SCANNERS_API_KEY");
        override_endpoints(&mut self.scanners.endpoints, "VIGIL_SCANNERS_ENDPOINTS");

        // Enrichment
        override_parsed(&mut self.enrichment.enabled, "VIGIL_ENRICHMENT_ENABLED");
        override_string(&mut self.enrichment.api_url, "VIGIL_ENRICHMENT_API_URL");
        override_string(&mut self.enrichment.api_key, "VIGIL_ENRICHMENT_API_KEY");
        override_string(&mut self.enrichment.model, "VIGIL_ENRICHMENT_MODEL");
        override_parsed(
            &mut self.enrichment.timeout_secs,
            "VIGIL_ENRICHMENT_TIMEOUT_SECS",
        );
        override_parsed(
            &mut self.enrichment.max_prompt_findings,
            "VIGIL_ENRICHMENT_MAX_PROMPT_FINDINGS",
        );

        // Conversation
        override_parsed(&mut self.conversation.enabled, "VIGIL_CONVERSATION_ENABLED");
        override_string(&mut self.conversation.url, "VIGIL_CONVERSATION_URL");
        override_string(&mut self.conversation.api_key, "VIGIL_CONVERSATION_API_KEY");
        override_parsed(
            &mut self.conversation.timeout_secs,
            "VIGIL_CONVERSATION_TIMEOUT_SECS",
        );

        // Storage
        override_parsed(&mut self.storage.enabled, "VIGIL_STORAGE_ENABLED");
        override_string(&mut self.storage.backend, "VIGIL_STORAGE_BACKEND");
        override_string(&mut self.storage.url, "VIGIL_STORAGE_URL");
        override_string(&mut self.storage.api_key, "VIGIL_STORAGE_API_KEY");
        override_parsed(&mut self.storage.timeout_secs, "VIGIL_STORAGE_TIMEOUT_SECS");

        // Notifier
        override_parsed(&mut self.notifier.enabled, "VIGIL_NOTIFIER_ENABLED");
        override_string(&mut self.notifier.url, "VIGIL_NOTIFIER_URL");
        override_string(&mut self.notifier.api_key, "VIGIL_NOTIFIER_API_KEY");
        override_string(&mut self.notifier.from, "VIGIL_NOTIFIER_FROM");
        override_parsed(&mut self.notifier.timeout_secs, "VIGIL_NOTIFIER_TIMEOUT_SECS");

        // API
        override_string(&mut self.api.bind, "VIGIL_API_BIND");
        override_parsed(&mut self.api.max_body_bytes, "VIGIL_API_MAX_BODY_BYTES");

        // Metrics
        override_parsed(&mut self.metrics.enabled, "VIGIL_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "VIGIL_METRICS_LISTEN_ADDR");
        override_parsed(&mut self.metrics.port, "VIGIL_METRICS_PORT");
        override_string(&mut self.metrics.endpoint, "VIGIL_METRICS_ENDPOINT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), VigilError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        // pipeline 검증
        if self.pipeline.timeout_secs == 0 {
            return Err(invalid("pipeline.timeout_secs", "must be greater than 0"));
        }
        if self.pipeline.history_capacity == 0 {
            return Err(invalid(
                "pipeline.history_capacity",
                "must be greater than 0",
            ));
        }

        // scanners 검증
        if self.scanners.request_timeout_secs == 0 {
            return Err(invalid(
                "scanners.request_timeout_secs",
                "must be greater than 0",
            ));
        }
        for (idx, endpoint) in self.scanners.endpoints.iter().enumerate() {
            if endpoint.url.is_empty() {
                return Err(invalid(
                    &format!("scanners.endpoints[{idx}].url"),
                    format!("url must not be empty for kind '{}'", endpoint.kind),
                ));
            }
            let duplicate = self.scanners.endpoints[..idx]
                .iter()
                .any(|other| other.kind == endpoint.kind);
            if duplicate {
                return Err(invalid(
                    &format!("scanners.endpoints[{idx}].kind"),
                    format!("kind '{}' is configured more than once", endpoint.kind),
                ));
            }
        }

        // 협력자 검증 (활성화된 경우에만)
        if self.enrichment.enabled {
            require_non_empty("enrichment.api_url", &self.enrichment.api_url)?;
            require_non_empty("enrichment.model", &self.enrichment.model)?;
            require_positive("enrichment.timeout_secs", self.enrichment.timeout_secs)?;
        }
        if self.conversation.enabled {
            require_non_empty("conversation.url", &self.conversation.url)?;
            require_positive("conversation.timeout_secs", self.conversation.timeout_secs)?;
        }
        if self.storage.enabled {
            let valid_backends = ["file", "http"];
            if !valid_backends.contains(&self.storage.backend.as_str()) {
                return Err(invalid(
                    "storage.backend",
                    format!("must be one of: {}", valid_backends.join(", ")),
                ));
            }
            if self.storage.backend == "http" {
                require_non_empty("storage.url", &self.storage.url)?;
                require_positive("storage.timeout_secs", self.storage.timeout_secs)?;
            }
        }
        if self.notifier.enabled {
            require_non_empty("notifier.url", &self.notifier.url)?;
            require_non_empty("notifier.from", &self.notifier.from)?;
            require_positive("notifier.timeout_secs", self.notifier.timeout_secs)?;
        }

        // api 검증
        if self.api.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(invalid(
                "api.bind",
                format!("'{}' is not a valid socket address", self.api.bind),
            ));
        }
        if self.api.max_body_bytes == 0 {
            return Err(invalid("api.max_body_bytes", "must be greater than 0"));
        }

        // metrics 검증
        if self.metrics.enabled {
            if self.metrics.port == 0 || self.metrics.port > u32::from(u16::MAX) {
                return Err(invalid("metrics.port", "must be between 1 and 65535"));
            }
            if !self.metrics.endpoint.starts_with('/') {
                return Err(invalid("metrics.endpoint", "must start with '/'"));
            }
        }

        Ok(())
    }

    /// 지정한 kind의 scan back-end URL을 조회합니다.
    pub fn scanner_url(&self, kind: ScanKind) -> Option<&str> {
        self.scanners
            .endpoints
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.url.as_str())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> VigilError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

fn require_non_empty(field: &str, value: &str) -> Result<(), VigilError> {
    if value.trim().is_empty() {
        return Err(invalid(field, "must not be empty when enabled"));
    }
    Ok(())
}

fn require_positive(field: &str, value: u64) -> Result<(), VigilError> {
    if value == 0 {
        return Err(invalid(field, "must be greater than 0"));
    }
    Ok(())
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 데이터 디렉토리 (파일 스냅샷 저장 위치의 상위)
    pub data_dir: String,
    /// PID 파일 경로
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            data_dir: "/var/lib/vigil".to_owned(),
            pid_file: "/var/run/vigil.pid".to_owned(),
        }
    }
}

/// 파이프라인 실행 정책
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// timeout 알림까지의 시간 (초). 실행을 중단하지는 않습니다.
    pub timeout_secs: u64,
    /// 완료된 실행 이력 최대 보관 수
    pub history_capacity: usize,
    /// timeout 시 연락처로 알림을 보낼지 여부
    pub notify_on_timeout: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            history_capacity: 50,
            notify_on_timeout: true,
        }
    }
}

/// kind별 scan back-end 엔드포인트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerEndpoint {
    /// 담당 요청 유형
    pub kind: ScanKind,
    /// back-end URL
    pub url: String,
}

/// scan back-end 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannersConfig {
    /// 요청 timeout (초)
    pub request_timeout_secs: u64,
    /// 공통 bearer 토큰 (비어 있으면 인증 헤더 생략)
    pub api_key: String,
    /// kind별 엔드포인트
    pub endpoints: Vec<ScannerEndpoint>,
}

impl Default for ScannersConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 60,
            api_key: String::new(),
            endpoints: Vec::new(),
        }
    }
}

/// 텍스트 생성(enrich) 설정
///
/// OpenAI 호환 `chat/completions` API를 사용합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// API 기본 URL (`/chat/completions`가 뒤에 붙습니다)
    pub api_url: String,
    /// API 키
    pub api_key: String,
    /// 모델 이름
    pub model: String,
    /// 요청 timeout (초)
    pub timeout_secs: u64,
    /// 프롬프트에 포함할 최대 발견 항목 수
    pub max_prompt_findings: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: "https://api.groq.com/openai/v1".to_owned(),
            api_key: String::new(),
            model: "llama-3.1-8b-instant".to_owned(),
            timeout_secs: 30,
            max_prompt_findings: 25,
        }
    }
}

/// 대화 세션(converse) 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 세션 생성 URL
    pub url: String,
    /// API 키
    pub api_key: String,
    /// 요청 timeout (초)
    pub timeout_secs: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            api_key: String::new(),
            timeout_secs: 15,
        }
    }
}

/// 스냅샷 저장(persist) 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 저장소 종류 (file, http)
    pub backend: String,
    /// HTTP 저장소 URL
    pub url: String,
    /// API 키
    pub api_key: String,
    /// 요청 timeout (초)
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: "file".to_owned(),
            url: String::new(),
            api_key: String::new(),
            timeout_secs: 15,
        }
    }
}

/// timeout 알림 설정
///
/// 이메일 발송 API에 `{from, to, subject, text}`를 POST합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 발송 API URL
    pub url: String,
    /// API 키
    pub api_key: String,
    /// 발신 주소
    pub from: String,
    /// 요청 timeout (초)
    pub timeout_secs: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            api_key: String::new(),
            from: "vigil@localhost".to_owned(),
            timeout_secs: 10,
        }
    }
}

/// HTTP API 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// 바인드 주소
    pub bind: String,
    /// 요청 본문 최대 크기 (바이트)
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_owned(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 리슨 주소
    pub listen_addr: String,
    /// 포트
    pub port: u32,
    /// 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

/// `FromStr`로 해석되는 값을 덮어씁니다. 해석에 실패하면 경고만 남깁니다.
fn override_parsed<T: FromStr>(target: &mut T, env_key: &str) {
    let Ok(val) = std::env::var(env_key) else {
        return;
    };
    match val.parse::<T>() {
        Ok(parsed) => *target = parsed,
        Err(_) => warn!(
            env_key,
            value = val.as_str(),
            expected = std::any::type_name::<T>(),
            "ignoring unparsable env override"
        ),
    }
}

/// `kind=url` 쌍의 쉼표 목록으로 엔드포인트를 교체합니다.
///
/// 하나라도 해석에 실패하면 전체를 무시하고 기존 값을 유지합니다.
fn override_endpoints(target: &mut Vec<ScannerEndpoint>, env_key: &str) {
    let Ok(val) = std::env::var(env_key) else {
        return;
    };

    let mut parsed = Vec::new();
    for pair in val.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let Some((kind, url)) = pair.split_once('=') else {
            warn!(env_key, pair, "expected kind=url pair in env var, ignoring");
            return;
        };
        match kind.parse::<ScanKind>() {
            Ok(kind) => parsed.push(ScannerEndpoint {
                kind,
                url: url.trim().to_owned(),
            }),
            Err(reason) => {
                warn!(
                    env_key,
                    pair,
                    reason = reason.as_str(),
                    "invalid scan kind in env var, ignoring"
                );
                return;
            }
        }
    }
    *target = parsed;
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = VigilConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.pipeline.timeout_secs, 120);
        assert_eq!(config.pipeline.history_capacity, 50);
        assert!(!config.enrichment.enabled);
        assert!(config.storage.enabled);
        assert_eq!(config.storage.backend, "file");
        assert!(config.scanners.endpoints.is_empty());
    }

    #[test]
    fn default_config_passes_validation() {
        let config = VigilConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = VigilConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.api.bind, "127.0.0.1:8080");
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[pipeline]
timeout_secs = 300

[[scanners.endpoints]]
kind = "code-analysis"
url = "http://scanner:7000/analyze"
"#;
        let config = VigilConfig::parse(toml).unwrap();
        assert_eq!(config.pipeline.timeout_secs, 300);
        // history_capacity는 기본값 유지
        assert_eq!(config.pipeline.history_capacity, 50);
        assert_eq!(
            config.scanner_url(ScanKind::CodeAnalysis),
            Some("http://scanner:7000/analyze")
        );
        assert_eq!(config.scanner_url(ScanKind::BucketScan), None);
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let result = VigilConfig::parse("invalid = [[[toml");
        assert!(matches!(
            result.unwrap_err(),
            VigilError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn from_str_unknown_scan_kind_returns_error() {
        let toml = r#"
[[scanners.endpoints]]
kind = "port-scan"
url = "http://x"
"#;
        assert!(VigilConfig::parse(toml).is_err());
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = VigilConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = VigilConfig::default();
        config.pipeline.timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pipeline.timeout_secs"));
    }

    #[test]
    fn validate_rejects_zero_history_capacity() {
        let mut config = VigilConfig::default();
        config.pipeline.history_capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("history_capacity"));
    }

    #[test]
    fn validate_rejects_duplicate_scanner_kind() {
        let mut config = VigilConfig::default();
        config.scanners.endpoints = vec![
            ScannerEndpoint {
                kind: ScanKind::SecretScan,
                url: "http://a".to_owned(),
            },
            ScannerEndpoint {
                kind: ScanKind::SecretScan,
                url: "http://b".to_owned(),
            },
        ];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn validate_rejects_enabled_enrichment_without_url() {
        let mut config = VigilConfig::default();
        config.enrichment.enabled = true;
        config.enrichment.api_url = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("enrichment.api_url"));
    }

    #[test]
    fn validate_ignores_disabled_notifier_without_url() {
        let mut config = VigilConfig::default();
        config.notifier.enabled = false;
        config.notifier.url = String::new();
        // 비활성화 상태면 url 검증을 건너뜀
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_http_storage_without_url() {
        let mut config = VigilConfig::default();
        config.storage.backend = "http".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("storage.url"));
    }

    #[test]
    fn validate_rejects_unknown_storage_backend() {
        let mut config = VigilConfig::default();
        config.storage.backend = "s3".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("storage.backend"));
    }

    #[test]
    fn validate_rejects_bad_bind_address() {
        let mut config = VigilConfig::default();
        config.api.bind = "localhost".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("api.bind"));
    }

    #[test]
    fn validate_rejects_metrics_port_out_of_range() {
        let mut config = VigilConfig::default();
        config.metrics.port = 70000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("metrics.port"));
    }

    #[test]
    #[serial]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: #[serial]로 환경변수를 조작하는 테스트끼리 동시에 실행되지 않습니다.
        unsafe { std::env::set_var("TEST_VIGIL_STR", "overridden") };
        override_string(&mut val, "TEST_VIGIL_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_VIGIL_STR") };
    }

    #[test]
    #[serial]
    fn env_override_bool_invalid_keeps_original() {
        let mut val = false;
        // SAFETY: #[serial]로 환경변수를 조작하는 테스트끼리 동시에 실행되지 않습니다.
        unsafe { std::env::set_var("TEST_VIGIL_BOOL_BAD", "not-a-bool") };
        override_parsed(&mut val, "TEST_VIGIL_BOOL_BAD");
        assert!(!val);
        unsafe { std::env::remove_var("TEST_VIGIL_BOOL_BAD") };
    }

    #[test]
    #[serial]
    fn env_override_endpoints_parses_pairs() {
        let mut val = Vec::new();
        // SAFETY: #[serial]로 환경변수를 조작하는 테스트끼리 동시에 실행되지 않습니다.
        unsafe {
            std::env::set_var(
                "TEST_VIGIL_ENDPOINTS",
                "code-analysis=http://a/scan, secret-scan=http://b/scan",
            )
        };
        override_endpoints(&mut val, "TEST_VIGIL_ENDPOINTS");
        assert_eq!(val.len(), 2);
        assert_eq!(val[1].kind, ScanKind::SecretScan);
        assert_eq!(val[1].url, "http://b/scan");
        unsafe { std::env::remove_var("TEST_VIGIL_ENDPOINTS") };
    }

    #[test]
    #[serial]
    fn env_override_endpoints_invalid_keeps_original() {
        let mut val = vec![ScannerEndpoint {
            kind: ScanKind::BucketScan,
            url: "http://keep".to_owned(),
        }];
        // SAFETY: #[serial]로 환경변수를 조작하는 테스트끼리 동시에 실행되지 않습니다.
        unsafe { std::env::set_var("TEST_VIGIL_ENDPOINTS_BAD", "port-scan=http://x") };
        override_endpoints(&mut val, "TEST_VIGIL_ENDPOINTS_BAD");
        assert_eq!(val.len(), 1);
        assert_eq!(val[0].url, "http://keep");
        unsafe { std::env::remove_var("TEST_VIGIL_ENDPOINTS_BAD") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = 7u64;
        override_parsed(&mut val, "TEST_VIGIL_NONEXISTENT_12345");
        assert_eq!(val, 7);
    }

    #[test]
    fn config_serialize_roundtrip() {
        let mut config = VigilConfig::default();
        config.scanners.endpoints.push(ScannerEndpoint {
            kind: ScanKind::DependencyScan,
            url: "http://deps".to_owned(),
        });
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = VigilConfig::parse(&toml_str).unwrap();
        assert_eq!(parsed.pipeline.timeout_secs, config.pipeline.timeout_secs);
        assert_eq!(parsed.scanners.endpoints, config.scanners.endpoints);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = VigilConfig::from_file("/nonexistent/path/vigil.toml").await;
        assert!(matches!(
            result.unwrap_err(),
            VigilError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
