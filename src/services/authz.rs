//! # 권한 확인
//!
//! 인증(누구인가)은 `middleware::auth`가, 인가(무엇을 할 수 있는가)는 이 트레이트가 담당합니다.
//! 비교 관리자와 문서 서비스는 `Arc<dyn Authorizer>`만 알고 있어 정책을 교체할 수 있습니다.

use crate::models::{ComparisonResult, Document};

pub trait Authorizer: Send + Sync {
    fn can_view_document(&self, user_id: &str, document: &Document) -> bool;
    fn can_edit_document(&self, user_id: &str, document: &Document) -> bool;
    fn can_view_comparison(&self, user_id: &str, result: &ComparisonResult) -> bool;
}

/// 기본 정책: 소유자와 협업자 목록 기반
///
/// - 조회: 소유자, 모든 역할의 협업자, 또는 공개 문서
/// - 편집: 소유자, editor/owner 역할의 협업자
/// - 비교 결과 조회: 생성자 또는 공개 결과
#[derive(Debug, Clone, Copy, Default)]
pub struct CollaboratorPolicy;

impl Authorizer for CollaboratorPolicy {
    fn can_view_document(&self, user_id: &str, document: &Document) -> bool {
        document.is_public
            || document.owner_id == user_id
            || document.collaborator_role(user_id).is_some()
    }

    fn can_edit_document(&self, user_id: &str, document: &Document) -> bool {
        document.owner_id == user_id
            || document
                .collaborator_role(user_id)
                .is_some_and(|role| role.can_edit())
    }

    fn can_view_comparison(&self, user_id: &str, result: &ComparisonResult) -> bool {
        result.is_public || result.user_id == user_id
    }
}
