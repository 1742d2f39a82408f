//! 내장 stage 실행기
//!
//! - [`ScanStage`]: 요청 유형별 scan back-end로 분기
//! - [`EnrichStage`]: 텍스트 생성 서비스로 위험 평가
//! - [`ConverseStage`]: 대화 세션 생성
//! - [`PersistStage`]: 결과 스냅샷 저장
//! - [`ReportStage`]: 로컬 집계 (외부 호출 없음)
//!
//! 외부 서비스가 필요한 stage는 `vigil_core::pipeline`의 협력자 trait에 대해
//! 제네릭이므로, 실제 HTTP 클라이언트 대신 테스트용 구현을 넣을 수 있습니다.

mod converse;
mod enrich;
mod persist;
mod report;
mod scan;

pub use converse::ConverseStage;
pub use enrich::{DEFAULT_MAX_FINDINGS, EnrichStage};
pub use persist::PersistStage;
pub use report::{ReportStage, aggregate};
pub use scan::ScanStage;
