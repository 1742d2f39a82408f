//! 도메인 타입: 시스템 전역에서 사용되는 공통 타입
//!
//! 스캔 요청 유형([`ScanKind`]), 심각도([`Severity`]), 스캔 back-end가
//! 돌려주는 결과([`Finding`], [`ScanReport`])를 정의합니다.
//!
//! 오케스트레이터는 scan 결과를 불투명한 JSON으로 취급합니다.
//! [`ScanReport`]는 report/enrich stage가 결과를 느슨하게 해석할 때만 사용합니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 스캔 요청 유형
///
/// stage 1에서 어떤 scan back-end를 호출할지 결정합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanKind {
    /// 정적 코드 분석 (패턴 매칭, lint)
    CodeAnalysis,
    /// 저장소 전체 스캔
    RepositoryScan,
    /// 클라우드 버킷 노출 스캔
    BucketScan,
    /// 의존성 취약점 스캔
    DependencyScan,
    /// 시크릿 유출 스캔
    SecretScan,
}

impl ScanKind {
    /// 모든 스캔 유형 (선언 순서)
    pub const ALL: [ScanKind; 5] = [
        Self::CodeAnalysis,
        Self::RepositoryScan,
        Self::BucketScan,
        Self::DependencyScan,
        Self::SecretScan,
    ];

    /// kebab-case 이름을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CodeAnalysis => "code-analysis",
            Self::RepositoryScan => "repository-scan",
            Self::BucketScan => "bucket-scan",
            Self::DependencyScan => "dependency-scan",
            Self::SecretScan => "secret-scan",
        }
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown scan kind '{s}', expected one of: {}",
                    Self::ALL.map(|k| k.as_str()).join(", ")
                )
            })
    }
}

/// 심각도 레벨
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Info < Low < Medium < High < Critical`).
/// 직렬화는 소문자(`"critical"`), 역직렬화는 [`Severity::from_str_loose`]를 따릅니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 정보성
    #[default]
    Info,
    /// 낮은 심각도
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적: 즉시 대응 필요
    Critical,
}

impl Severity {
    /// 모든 심각도 (낮은 순)
    pub const ALL: [Severity; 5] = [
        Self::Info,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::Critical,
    ];

    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다. lint 도구가 쓰는 `error`/`warning`도 받습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "info" | "informational" | "note" => Some(Self::Info),
            "low" | "minor" => Some(Self::Low),
            "medium" | "med" | "moderate" | "warning" | "warn" => Some(Self::Medium),
            "high" | "error" | "major" => Some(Self::High),
            "critical" | "crit" | "blocker" => Some(Self::Critical),
            _ => None,
        }
    }

    /// 위험 점수 계산용 가중치
    pub fn weight(&self) -> u32 {
        match self {
            Self::Info => 0,
            Self::Low => 1,
            Self::Medium => 4,
            Self::High => 7,
            Self::Critical => 10,
        }
    }

    /// 소문자 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Severity::from_str_loose(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown severity '{raw}'")))
    }
}

const DEFAULT_CATEGORY: &str = "general";

/// 스칼라 값을 문자열로 읽습니다. `null`, 배열, 객체는 `None`입니다.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `keys` 중 처음으로 스칼라 값을 가진 키를 꺼냅니다.
///
/// 사용하지 않은 대체 키는 `map`에 남습니다.
fn take_first_text(map: &mut serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    let key = keys
        .iter()
        .find(|key| map.get(**key).and_then(scalar_text).is_some())?;
    map.remove(*key).as_ref().and_then(scalar_text)
}

/// scan back-end가 보고한 개별 발견 항목
///
/// 알려진 필드만 해석하고 나머지는 `extra`에 그대로 보존합니다.
/// 해석은 실패하지 않습니다. 모양이 맞지 않는 값은 기본값이 됩니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    /// 발견 항목 ID (문자열이나 숫자로 제공될 때만)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 제목 (`title`, 없으면 `message`)
    pub title: String,
    /// 심각도 (알 수 없으면 `Info`)
    pub severity: Severity,
    /// 분류 (`category`, 없으면 `type`)
    pub category: String,
    /// 상세 설명
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// 위치 (파일:라인, 버킷 경로 등)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// 해석하지 않은 나머지 필드
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Finding {
    /// JSON 항목 하나를 발견 항목으로 읽습니다.
    ///
    /// 객체가 아닌 항목은 그 값을 제목으로 하는 `Info` 항목이 됩니다.
    pub fn from_value(item: &Value) -> Self {
        match item {
            Value::Object(map) => Self::from_map(map.clone()),
            other => Self {
                id: None,
                title: scalar_text(other).unwrap_or_else(|| other.to_string()),
                severity: Severity::Info,
                category: DEFAULT_CATEGORY.to_owned(),
                description: None,
                location: None,
                extra: serde_json::Map::new(),
            },
        }
    }

    fn from_map(mut map: serde_json::Map<String, Value>) -> Self {
        let id = take_first_text(&mut map, &["id"]);
        let title = take_first_text(&mut map, &["title", "message"]).unwrap_or_default();
        let severity = take_first_text(&mut map, &["severity"])
            .as_deref()
            .and_then(Severity::from_str_loose)
            .unwrap_or_default();
        let category = take_first_text(&mut map, &["category", "type"])
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_owned());
        let description = take_first_text(&mut map, &["description"]);
        let location = take_first_text(&mut map, &["location"]);

        // 직렬화 시 키가 겹치지 않도록 해석하지 못한 기본 필드도 비웁니다.
        for key in ["id", "title", "severity", "category", "description", "location"] {
            map.remove(key);
        }

        Self {
            id,
            title,
            severity,
            category,
            description,
            location,
            extra: map,
        }
    }
}

impl<'de> Deserialize<'de> for Finding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.severity, self.title, self.category)?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

/// scan 결과의 느슨한 해석
///
/// back-end마다 결과 모양이 다르므로 다음 형태를 모두 받습니다.
/// - `{"findings": [...]}` 또는 `{"issues": [...]}`
/// - 최상위 배열 `[...]`
/// - 분류별 묶음 `{"findingsByCategory": {"secrets": [...], ...}}`
///
/// `null`이 아닌 항목은 모양이 어떻든 하나의 발견 항목으로 셉니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanReport {
    /// 해석된 발견 항목
    pub findings: Vec<Finding>,
}

impl ScanReport {
    /// scan stage 결과 JSON에서 발견 항목을 추출합니다.
    pub fn from_value(value: &Value) -> Self {
        let mut findings = Vec::new();

        match value {
            Value::Array(items) => collect_findings(items, None, &mut findings),
            Value::Object(map) => {
                for key in ["findings", "issues", "vulnerabilities"] {
                    if let Some(Value::Array(items)) = map.get(key) {
                        collect_findings(items, None, &mut findings);
                    }
                }
                if let Some(Value::Object(groups)) = map.get("findingsByCategory") {
                    for (category, items) in groups {
                        if let Value::Array(items) = items {
                            collect_findings(items, Some(category), &mut findings);
                        }
                    }
                }
            }
            _ => {}
        }

        Self { findings }
    }

    /// 발견 항목 수
    pub fn len(&self) -> usize {
        self.findings.len()
    }

    /// 발견 항목이 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// 가장 높은 심각도 (항목이 없으면 `None`)
    pub fn max_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }

    /// 지정한 심각도의 항목 수
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }
}

fn collect_findings(items: &[Value], category: Option<&String>, out: &mut Vec<Finding>) {
    for item in items.iter().filter(|item| !item.is_null()) {
        let mut finding = Finding::from_value(item);
        let has_own_category = item.as_object().is_some_and(|o| {
            ["category", "type"]
                .iter()
                .any(|key| o.get(*key).and_then(scalar_text).is_some())
        });
        if let Some(category) = category.filter(|_| !has_own_category) {
            finding.category = category.clone();
        }
        out.push(finding);
    }
}

/// scan 결과의 총 발견 항목 수
///
/// 로그와 메트릭에 쓰이는 유일한 추출 지점입니다.
/// back-end가 `totalFindings`를 직접 보고하면 그 값을 우선합니다.
pub fn count_findings(value: &Value) -> usize {
    if let Some(total) = value
        .get("totalFindings")
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
    {
        return total;
    }
    ScanReport::from_value(value).len()
}
