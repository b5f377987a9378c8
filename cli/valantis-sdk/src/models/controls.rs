//! The pagination control strip shown under a page.

use serde::Serialize;

use super::pagination::NavigationEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageControl {
    Previous,
    Page { number: u32, current: bool },
    /// Collapsed pages following `after_page`.
    Ellipsis { after_page: u32 },
    Next,
}

impl PageControl {
    /// The navigation event activating this control produces.
    pub fn event(&self) -> NavigationEvent {
        match self {
            PageControl::Previous => NavigationEvent::PrevPage,
            PageControl::Page { number, .. } => NavigationEvent::JumpToPage(*number),
            PageControl::Ellipsis { after_page } => NavigationEvent::ExpandEllipsis {
                after_page: *after_page,
            },
            PageControl::Next => NavigationEvent::NextPage,
        }
    }
}

/// Lay out the controls for `current` out of `total` pages.
///
/// Pages 1 and 2 and the last page are always listed, plus a window of
/// `current - 1 ..= current + 1` clipped to `3 ..= total - 1`.
/// Gaps around the window are shown as ellipses.
pub fn pagination_controls(current: u32, total: u32) -> Vec<PageControl> {
    if total <= 1 {
        return Vec::new();
    }

    let page = |number: u32| PageControl::Page {
        number,
        current: number == current,
    };

    let mut controls = Vec::new();
    if current > 1 {
        controls.push(PageControl::Previous);
    }
    controls.push(page(1));
    controls.push(page(2));

    if current > 2 {
        controls.push(PageControl::Ellipsis { after_page: 2 });
    }

    let window_start = current.saturating_sub(1).max(3);
    let window_end = current.saturating_add(1).min(total - 1);
    controls.extend((window_start..=window_end).map(page));

    if current < total - 1 {
        let after_page = if window_start <= window_end {
            window_end
        } else {
            2
        };
        controls.push(PageControl::Ellipsis { after_page });
    }

    if total > 2 {
        controls.push(page(total));
    }
    if current < total {
        controls.push(PageControl::Next);
    }
    controls
}
