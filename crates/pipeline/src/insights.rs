//! enrich stage용 프롬프트 생성과 응답 해석
//!
//! 텍스트 생성 서비스의 응답은 자유 형식이므로 위험 수준과 조치 계획은
//! 휴리스틱으로 추출합니다. 추출에 실패해도 에러가 아니며 중립 값
//! (`medium`, 빈 계획)으로 대체합니다.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use vigil_core::types::{ScanKind, ScanReport, Severity};

/// 조치 계획 최대 항목 수
const MAX_PLAN_ITEMS: usize = 10;

/// 제목 없이 모은 목록 항목의 최대 수
const MAX_LOOSE_ITEMS: usize = 5;

/// 분석 본문 최대 길이 (문자)
const MAX_ANALYSIS_CHARS: usize = 2000;

/// 추출 실패 시 사용하는 위험 수준
pub const FALLBACK_RISK: Severity = Severity::Medium;

/// 생성된 텍스트에서 뽑아낸 인사이트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    /// 위험 수준
    pub risk_level: Severity,
    /// 조치 계획
    pub remediation_plan: Vec<String>,
    /// 분석 본문 (잘린 원문)
    pub analysis: String,
    /// 위험 수준을 텍스트에서 실제로 찾았는지 여부
    pub extracted: bool,
}

/// scan 결과로 enrich 프롬프트를 만듭니다.
///
/// 심각도가 높은 순으로 최대 `max_findings`개의 항목만 포함합니다.
pub fn build_prompt(kind: ScanKind, report: &ScanReport, max_findings: usize) -> String {
    let mut findings: Vec<_> = report.findings.iter().collect();
    findings.sort_by(|a, b| b.severity.cmp(&a.severity));

    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are a security analyst. Review the results of a {kind} and assess the risk."
    );
    let _ = writeln!(prompt, "Total findings: {}", report.len());
    for severity in Severity::ALL.iter().rev() {
        let count = report.count_by_severity(*severity);
        if count > 0 {
            let _ = writeln!(prompt, "- {severity}: {count}");
        }
    }

    if findings.is_empty() {
        let _ = writeln!(prompt, "\nNo findings were reported.");
    } else {
        let _ = writeln!(prompt, "\nFindings:");
        for (i, finding) in findings.iter().take(max_findings).enumerate() {
            let _ = writeln!(prompt, "{}. {finding}", i + 1);
            if let Some(description) = &finding.description {
                let _ = writeln!(prompt, "   {description}");
            }
        }
        if findings.len() > max_findings {
            let _ = writeln!(
                prompt,
                "... and {} more findings omitted",
                findings.len() - max_findings
            );
        }
    }

    let _ = writeln!(
        prompt,
        "\nRespond with:\nRisk Level: <critical|high|medium|low|info>\n\
         Remediation Plan:\n- <step>\nAnalysis: <short explanation>"
    );
    prompt
}

/// 생성된 텍스트에서 인사이트를 추출합니다.
pub fn extract(text: &str) -> Insights {
    let risk = find_risk_level(text);
    Insights {
        risk_level: risk.unwrap_or(FALLBACK_RISK),
        remediation_plan: find_plan(text),
        analysis: truncate_chars(text.trim(), MAX_ANALYSIS_CHARS),
        extracted: risk.is_some(),
    }
}

/// `risk level: high` 같은 줄에서 심각도를 찾습니다.
fn find_risk_level(text: &str) -> Option<Severity> {
    text.lines().find_map(|line| {
        let lower = line.to_lowercase();
        let idx = lower.find("risk level").or_else(|| lower.find("risk:"))?;
        lower[idx..]
            .split(|c: char| !c.is_ascii_alphabetic())
            .filter(|word| !word.is_empty() && *word != "risk" && *word != "level")
            .find_map(Severity::from_str_loose)
    })
}

fn find_plan(text: &str) -> Vec<String> {
    let mut in_section = false;
    let mut section_items = Vec::new();
    let mut loose_items = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        let lower = trimmed.to_lowercase();

        if let Some(item) = list_item(trimmed) {
            if in_section {
                section_items.push(item.to_owned());
            } else {
                loose_items.push(item.to_owned());
            }
            continue;
        }

        if lower.contains("remediation") || lower.contains("recommend") {
            in_section = true;
        } else if in_section && !trimmed.is_empty() && trimmed.ends_with(':') {
            // 다른 제목이 나오면 구간 종료
            in_section = false;
        }
    }

    if section_items.is_empty() {
        loose_items.truncate(MAX_LOOSE_ITEMS);
        loose_items
    } else {
        section_items.truncate(MAX_PLAN_ITEMS);
        section_items
    }
}

/// `- x`, `* x`, `1. x`, `2) x` 형태의 목록 항목 본문을 반환합니다.
fn list_item(line: &str) -> Option<&str> {
    let body = if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        rest
    } else {
        let digits = line.find(|c: char| !c.is_ascii_digit())?;
        if digits == 0 {
            return None;
        }
        line[digits..]
            .strip_prefix(". ")
            .or_else(|| line[digits..].strip_prefix(") "))?
    };
    let body = body.trim();
    (!body.is_empty()).then_some(body)
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_owned(),
    }
}
