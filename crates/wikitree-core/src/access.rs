use crate::tree::PageRecord;
use tracing::warn;

/// The user asking for the page tree. `login` is `None` for anonymous viewers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    pub login: Option<String>,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self { login: None }
    }

    pub fn user(login: impl Into<String>) -> Self {
        Self {
            login: Some(login.into()),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.login.is_none()
    }
}

/// Page-level access control capability.
///
/// Backends without per-page permissions use [`AllowAll`]; an ACL-aware
/// implementation is selected explicitly at startup.
pub trait PageAccess {
    fn visible_to(&self, page: &PageRecord, viewer: &Viewer) -> anyhow::Result<bool>;
}

/// Every page is visible to every viewer.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PageAccess for AllowAll {
    fn visible_to(&self, _page: &PageRecord, _viewer: &Viewer) -> anyhow::Result<bool> {
        Ok(true)
    }
}

/// Keep the pages `viewer` may see.
///
/// A failing check counts as visible so that one broken permission lookup
/// never empties the whole tree. Failures are reported once per call.
pub fn filter_visible(
    pages: Vec<PageRecord>,
    access: &dyn PageAccess,
    viewer: &Viewer,
) -> Vec<PageRecord> {
    let mut failures = 0usize;
    let mut first_error: Option<String> = None;

    let visible: Vec<PageRecord> = pages
        .into_iter()
        .filter(|page| match access.visible_to(page, viewer) {
            Ok(visible) => visible,
            Err(err) => {
                failures += 1;
                first_error.get_or_insert_with(|| format!("{err:#}"));
                true
            }
        })
        .collect();

    if failures > 0 {
        warn!(
            failures,
            error = first_error.as_deref().unwrap_or_default(),
            "Page access check failed; treating affected pages as visible"
        );
    }

    visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    fn page(id: i64, title: &str) -> PageRecord {
        PageRecord {
            id,
            parent_id: None,
            title: title.to_string(),
            slug: title.to_lowercase(),
        }
    }

    /// Hides even ids, errors on ids divisible by three.
    struct Picky;

    impl PageAccess for Picky {
        fn visible_to(&self, page: &PageRecord, _viewer: &Viewer) -> anyhow::Result<bool> {
            if page.id % 3 == 0 {
                bail!("acl lookup failed for page {}", page.id);
            }
            Ok(page.id % 2 != 0)
        }
    }

    #[test]
    fn test_allow_all_keeps_everything() {
        let pages = vec![page(1, "A"), page(2, "B")];
        let visible = filter_visible(pages.clone(), &AllowAll, &Viewer::anonymous());
        assert_eq!(visible, pages);
    }

    #[test]
    fn test_failing_check_counts_as_visible() {
        let pages = (1..=6).map(|id| page(id, &format!("P{id}"))).collect();
        let visible = filter_visible(pages, &Picky, &Viewer::user("alice"));

        let ids: Vec<i64> = visible.iter().map(|p| p.id).collect();
        // 1 and 5 pass, 3 and 6 error (kept), 2 and 4 are hidden.
        assert_eq!(ids, vec![1, 3, 5, 6]);
    }

    #[test]
    fn test_viewer_constructors() {
        assert!(Viewer::anonymous().is_anonymous());
        assert_eq!(Viewer::user("bob").login.as_deref(), Some("bob"));
    }
}
