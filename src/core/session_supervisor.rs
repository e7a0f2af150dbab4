//! 会话监管：中止管理
//!
//! 会话级 CancellationToken（操作员结束会话）与每轮子 token（候选人中止本轮）；
//! 子 token 取消只影响当前轮，会话 token 取消时所有子 token 一并取消。

use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct SessionSupervisor {
    /// 操作员结束会话时触发
    session_token: CancellationToken,
    /// 当前轮的 token
    turn_token: Mutex<Option<CancellationToken>>,
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self {
            session_token: CancellationToken::new(),
            turn_token: Mutex::new(None),
        }
    }

    /// 开始新一轮：派生子 token 并记为当前轮
    pub fn begin_turn(&self) -> CancellationToken {
        let token = self.session_token.child_token();
        if let Ok(mut slot) = self.turn_token.lock() {
            *slot = Some(token.clone());
        }
        token
    }

    /// 中止当前轮（若有）；会话继续
    pub fn cancel_turn(&self) -> bool {
        match self.turn_token.lock().ok().and_then(|mut slot| slot.take()) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// 本轮结束
    pub fn end_turn(&self) {
        if let Ok(mut slot) = self.turn_token.lock() {
            *slot = None;
        }
    }

    /// 结束整个会话
    pub fn cancel(&self) {
        self.session_token.cancel();
    }
}

impl Default for SessionSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_turn_leaves_session_alive() {
        let sup = SessionSupervisor::new();
        let turn = sup.begin_turn();
        assert!(sup.cancel_turn());
        assert!(turn.is_cancelled());
        assert!(!sup.session_token.is_cancelled());
        assert!(!sup.cancel_turn());
        assert!(!sup.begin_turn().is_cancelled());
    }

    #[test]
    fn test_session_cancel_propagates_to_turn() {
        let sup = SessionSupervisor::new();
        let turn = sup.begin_turn();
        sup.cancel();
        assert!(turn.is_cancelled());
        assert!(sup.begin_turn().is_cancelled());
    }
}
