use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 画面の世代カウンタ。画面遷移のたびに進め、古い応答の反映を防ぐ。
///
/// リクエスト前に `ticket()` を取り、結果を状態に反映する直前に `is_current()` を確認する。
/// 実行中のリクエスト自体は中断しない。
#[derive(Debug, Clone, Default)]
pub struct ViewGeneration(Arc<AtomicU64>);

/// リクエスト発行時点の世代。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl ViewGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新しい画面に入る。以前のticketはすべて無効になる。
    pub fn advance(&self) -> Ticket {
        Ticket(self.0.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn ticket(&self) -> Ticket {
        Ticket(self.0.load(Ordering::Acquire))
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.ticket() == ticket
    }
}
