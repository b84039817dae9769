use crate::domain::error::DomainError;

/// 1ページあたりの表示件数（固定）
pub const PAGE_SIZE: usize = 10;

/// 件数から総ページ数を求める。0件でも1ページ。
pub fn total_pages(count: usize) -> usize {
    count.div_ceil(PAGE_SIZE).max(1)
}

/// 表示中のページ切り出し結果。
#[derive(Debug, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub visible: &'a [T],
    pub total_pages: usize,
}

/// `[(page-1)*PAGE_SIZE, page*PAGE_SIZE)` を範囲内に丸めて切り出す。
/// 範囲外のページ（0を含む）は空スライスを返し、ページ番号の補正はしない。
pub fn paginate<T>(filtered: &[T], page: usize) -> Page<'_, T> {
    let total_pages = total_pages(filtered.len());
    let visible = match page.checked_sub(1) {
        Some(index) => {
            let start = index.saturating_mul(PAGE_SIZE).min(filtered.len());
            let end = start.saturating_add(PAGE_SIZE).min(filtered.len());
            &filtered[start..end]
        }
        None => &filtered[..0],
    };
    Page {
        visible,
        total_pages,
    }
}

/// 現在ページ（1始まり）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    current: usize,
}

impl Default for PageState {
    fn default() -> Self {
        Self { current: 1 }
    }
}

impl PageState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// 絞り込み条件が変わったら無条件で1ページ目に戻す。
    pub fn reset(&mut self) {
        self.current = 1;
    }

    /// 次ページへ。末尾なら何もしない。移動したかを返す。
    pub fn next(&mut self, total_pages: usize) -> bool {
        if self.current >= total_pages {
            return false;
        }
        self.current += 1;
        true
    }

    /// 前ページへ。先頭なら何もしない。移動したかを返す。
    pub fn previous(&mut self) -> bool {
        if self.current <= 1 {
            return false;
        }
        self.current -= 1;
        true
    }

    /// 指定ページへ移動する。範囲外はエラーで状態は変えない。
    pub fn go_to(&mut self, page: usize, total_pages: usize) -> Result<(), DomainError> {
        if page == 0 || page > total_pages {
            return Err(DomainError::PageOutOfRange {
                requested: page,
                total: total_pages,
            });
        }
        self.current = page;
        Ok(())
    }

    /// 件数が減って現在ページが末尾を越えた場合に丸める。
    pub fn clamp(&mut self, total_pages: usize) {
        self.current = self.current.clamp(1, total_pages.max(1));
    }
}
