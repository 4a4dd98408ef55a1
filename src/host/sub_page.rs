//! Sub-page areas
//!
//! A sub-page area is a named group of sub-pages of which at most one is active.
//! The active index is kept in a state cell; the sub-pages only carry the
//! activate/deactivate callback slots.

use std::sync::Arc;
use tracing::{debug, warn};

use super::CallbackSlot;
use crate::context::Context;
use crate::state::ContextStateVariable;

#[derive(Debug)]
struct SubPageInner {
    name: String,
    index: usize,
    on_activate: CallbackSlot<()>,
    on_deactivate: CallbackSlot<()>,
}

/// One exclusively activated state of a sub-page area
#[derive(Debug, Clone)]
pub struct SubPage {
    inner: Arc<SubPageInner>,
}

impl SubPage {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Position inside the owning area
    pub fn index(&self) -> usize {
        self.inner.index
    }

    pub fn on_activate(&self) -> &CallbackSlot<()> {
        &self.inner.on_activate
    }

    pub fn on_deactivate(&self) -> &CallbackSlot<()> {
        &self.inner.on_deactivate
    }
}

#[derive(Debug)]
struct AreaInner {
    name: String,
    sub_pages: Vec<SubPage>,
    active: ContextStateVariable<Option<usize>>,
}

/// Group of mutually exclusive sub-pages
#[derive(Debug, Clone)]
pub struct SubPageArea {
    inner: Arc<AreaInner>,
}

impl SubPageArea {
    pub fn new<I, S>(name: &str, sub_page_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sub_pages = sub_page_names
            .into_iter()
            .enumerate()
            .map(|(index, sub_page_name)| SubPage {
                inner: Arc::new(SubPageInner {
                    name: sub_page_name.into(),
                    index,
                    on_activate: CallbackSlot::new(),
                    on_deactivate: CallbackSlot::new(),
                }),
            })
            .collect();

        Self {
            inner: Arc::new(AreaInner {
                name: name.to_string(),
                sub_pages,
                active: ContextStateVariable::named("subpage-area", None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn sub_pages(&self) -> &[SubPage] {
        &self.inner.sub_pages
    }

    pub fn sub_page(&self, index: usize) -> Option<&SubPage> {
        self.inner.sub_pages.get(index)
    }

    pub fn len(&self) -> usize {
        self.inner.sub_pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.sub_pages.is_empty()
    }

    /// Index of the active sub-page, if any
    pub fn active(&self, ctx: &Context<'_>) -> Option<usize> {
        self.inner.active.get(ctx)
    }

    /// Activate a sub-page, deactivating the previously active one
    ///
    /// Activating the already active sub-page fires its activation callback
    /// again without a deactivation.
    pub fn activate(&self, ctx: &mut Context<'_>, index: usize) {
        let Some(sub_page) = self.inner.sub_pages.get(index) else {
            warn!("Sub-page {} does not exist in area '{}'", index, self.inner.name);
            return;
        };

        let previous = self.inner.active.get(ctx);
        if let Some(previous) = previous.filter(|&p| p != index) {
            if let Some(previous_page) = self.inner.sub_pages.get(previous) {
                previous_page.on_deactivate().fire(ctx, ());
            }
        }

        self.inner.active.set(ctx, &Some(index));
        debug!("Sub-page area '{}' → '{}'", self.inner.name, sub_page.name());
        sub_page.on_activate().fire(ctx, ());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{MemoryStore, Outbox};
    use parking_lot::Mutex;

    #[test]
    fn test_exclusive_activation() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new(&mut store, &mut outbox);

        let area = SubPageArea::new("Test", ["A", "B"]);
        let log = Arc::new(Mutex::new(Vec::new()));
        for page in area.sub_pages() {
            let name = page.name().to_string();
            let on = Arc::clone(&log);
            page.on_activate()
                .set(move |_, ()| on.lock().push(format!("+{}", name)));
            let name = page.name().to_string();
            let off = Arc::clone(&log);
            page.on_deactivate()
                .set(move |_, ()| off.lock().push(format!("-{}", name)));
        }

        assert_eq!(area.active(&ctx), None);
        area.activate(&mut ctx, 0);
        area.activate(&mut ctx, 1);
        area.activate(&mut ctx, 1);
        assert_eq!(area.active(&ctx), Some(1));
        assert_eq!(*log.lock(), vec!["+A", "-A", "+B", "+B"]);
    }

    #[test]
    fn test_unknown_index_is_ignored() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new(&mut store, &mut outbox);

        let area = SubPageArea::new("Test", ["Only"]);
        area.activate(&mut ctx, 0);
        area.activate(&mut ctx, 5);
        assert_eq!(area.active(&ctx), Some(0));
    }
}
