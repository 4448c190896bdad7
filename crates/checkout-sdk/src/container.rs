//! Action Container
//!
//! Where customer actions (3DS pages, e-wallet authorization) are shown.
//! A browser embedding mounts an iframe; the headless container records what
//! it was asked to show, for tests and the demo.

use std::cell::RefCell;

/// What to show inside the container
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionView {
    Iframe { url: String },
}

/// Host surface for customer actions
pub trait ActionContainer {
    /// Show `view`, replacing whatever is shown
    fn mount(&self, view: ActionView) -> anyhow::Result<()>;

    /// Navigate the customer away to `url`
    fn redirect(&self, url: &str) -> anyhow::Result<()>;

    /// Remove the current view
    fn clear(&self);
}

#[derive(Default)]
struct Recorded {
    current: Option<ActionView>,
    mounted: Vec<ActionView>,
    redirects: Vec<String>,
}

/// Container without a UI; records calls
#[derive(Default)]
pub struct HeadlessActionContainer {
    recorded: RefCell<Recorded>,
}

impl HeadlessActionContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently mounted view
    pub fn current(&self) -> Option<ActionView> {
        self.recorded.borrow().current.clone()
    }

    /// Every view mounted so far
    pub fn mounted(&self) -> Vec<ActionView> {
        self.recorded.borrow().mounted.clone()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.recorded.borrow().redirects.clone()
    }
}

impl ActionContainer for HeadlessActionContainer {
    fn mount(&self, view: ActionView) -> anyhow::Result<()> {
        tracing::info!(?view, "Mounting action view");
        let mut recorded = self.recorded.borrow_mut();
        recorded.mounted.push(view.clone());
        recorded.current = Some(view);
        Ok(())
    }

    fn redirect(&self, url: &str) -> anyhow::Result<()> {
        if url.is_empty() {
            anyhow::bail!("refusing to redirect to an empty url");
        }
        tracing::info!(%url, "Redirecting customer");
        self.recorded.borrow_mut().redirects.push(url.to_string());
        Ok(())
    }

    fn clear(&self) {
        self.recorded.borrow_mut().current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_views() {
        let container = HeadlessActionContainer::new();
        container
            .mount(ActionView::Iframe { url: "https://3ds.example/a".into() })
            .unwrap();
        assert!(container.current().is_some());

        container.clear();
        assert!(container.current().is_none());
        assert_eq!(container.mounted().len(), 1);

        assert!(container.redirect("").is_err());
    }
}
