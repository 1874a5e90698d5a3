//! 방별 미디어 준비 상태

use super::room::ConnectionId;
use std::collections::HashMap;

/// connection_id -> 미디어 확인 여부.
/// 방 세션 락 안에서 멤버 목록과 함께 갱신된다.
#[derive(Debug, Default)]
pub struct MediaReadiness {
    entries: HashMap<ConnectionId, bool>,
}

impl MediaReadiness {
    /// 주어진 연결들을 미준비 상태로 초기화
    pub fn reset<I>(&mut self, connection_ids: I)
    where
        I: IntoIterator<Item = ConnectionId>,
    {
        for id in connection_ids {
            self.entries.insert(id, false);
        }
    }

    /// 추적 중인 연결만 준비 완료로 표시. 추적 중이었으면 true.
    pub fn mark_ready(&mut self, connection_id: &str) -> bool {
        match self.entries.get_mut(connection_id) {
            Some(ready) => {
                *ready = true;
                true
            }
            None => false,
        }
    }

    pub fn is_all_ready(&self) -> bool {
        !self.entries.is_empty() && self.entries.values().all(|ready| *ready)
    }

    pub fn drop_connection(&mut self, connection_id: &str) {
        self.entries.remove(connection_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tracker_is_never_ready() {
        let tracker = MediaReadiness::default();
        assert!(!tracker.is_all_ready());
    }

    #[test]
    fn all_ready_requires_every_entry() {
        let mut tracker = MediaReadiness::default();
        tracker.reset(["c1".to_string(), "c2".to_string()]);
        assert!(!tracker.is_all_ready());

        assert!(tracker.mark_ready("c1"));
        assert!(!tracker.is_all_ready());

        assert!(tracker.mark_ready("c2"));
        assert!(tracker.mark_ready("c2"));
        assert!(tracker.is_all_ready());
    }

    #[test]
    fn untracked_connection_cannot_be_marked() {
        let mut tracker = MediaReadiness::default();
        assert!(!tracker.mark_ready("ghost"));
        assert!(!tracker.is_all_ready());
    }

    #[test]
    fn dropping_last_entry_clears_readiness() {
        let mut tracker = MediaReadiness::default();
        tracker.reset(["c1".to_string()]);
        tracker.mark_ready("c1");
        assert!(tracker.is_all_ready());

        tracker.drop_connection("c1");
        assert!(!tracker.is_all_ready());
        // 제거된 연결은 다시 표시할 수 없음
        assert!(!tracker.mark_ready("c1"));
    }

    #[test]
    fn reset_clears_previous_readiness() {
        let mut tracker = MediaReadiness::default();
        tracker.reset(["c1".to_string()]);
        tracker.mark_ready("c1");

        tracker.reset(["c1".to_string()]);
        assert!(!tracker.is_all_ready());
    }
}
