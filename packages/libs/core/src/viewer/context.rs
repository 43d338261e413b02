//! 요청 컨텍스트
//!
//! 하나의 논리적 요청 동안 viewer, 취소 신호, request id를 전달합니다.
//! `with_*` 메서드는 부모를 변경하지 않고 새 자식 컨텍스트를 반환합니다.

use std::sync::Arc;

use tokio::sync::watch;

use super::identity::Viewer;

/// 요청 컨텍스트
///
/// 복제 비용이 낮으며(Arc), 생성 후 변경되지 않습니다.
#[derive(Debug, Clone, Default)]
pub struct Context {
    viewer: Option<Arc<Viewer>>,
    cancel: Option<watch::Receiver<bool>>,
    request_id: Option<Arc<str>>,
}

/// 취소 핸들
///
/// `Context::with_cancellation`이 반환하며, `cancel()` 호출 시
/// 해당 컨텍스트(및 그 자식)를 사용하는 이후 평가가 중단됩니다.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// 취소 요청
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Context {
    /// 빈 컨텍스트 (요청 경계에서 생성)
    pub fn background() -> Self {
        Self::default()
    }

    /// Viewer 부착 (AttachViewer)
    pub fn with_viewer(&self, viewer: Viewer) -> Self {
        Self {
            viewer: Some(Arc::new(viewer)),
            ..self.clone()
        }
    }

    /// Viewer 조회 (ExtractViewer)
    ///
    /// 한 번도 부착되지 않았다면 `None`입니다.
    pub fn viewer(&self) -> Option<&Viewer> {
        self.viewer.as_deref()
    }

    /// 취소 가능한 자식 컨텍스트 생성
    pub fn with_cancellation(&self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            cancel: Some(rx),
            ..self.clone()
        };
        (ctx, CancelHandle { tx })
    }

    /// 취소 여부
    ///
    /// 핸들이 drop된 경우에도 마지막으로 보낸 값을 유지합니다.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// 로그 상관관계용 request id 설정
    pub fn with_request_id(&self, request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(Arc::from(request_id.into())),
            ..self.clone()
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::Role;

    #[test]
    fn test_attach_does_not_mutate_parent() {
        let parent = Context::background();
        let child = parent.with_viewer(Viewer::admin());

        assert!(parent.viewer().is_none());
        assert_eq!(child.viewer().and_then(Viewer::role), Some(Role::Admin));

        let grandchild = child.with_viewer(Viewer::view());
        assert!(child.viewer().unwrap().is_admin());
        assert!(!grandchild.viewer().unwrap().is_admin());
    }

    #[test]
    fn test_cancellation_propagates_to_children() {
        let (ctx, handle) = Context::background().with_cancellation();
        let child = ctx.with_viewer(Viewer::admin());

        assert!(!child.is_cancelled());
        handle.cancel();
        assert!(ctx.is_cancelled());
        assert!(child.is_cancelled());

        // 취소 채널이 없는 컨텍스트는 영향 없음
        assert!(!Context::background().is_cancelled());
    }

    #[test]
    fn test_request_id() {
        let ctx = Context::background().with_request_id("req_1");
        assert_eq!(ctx.request_id(), Some("req_1"));
        assert_eq!(ctx.with_viewer(Viewer::view()).request_id(), Some("req_1"));
    }
}
