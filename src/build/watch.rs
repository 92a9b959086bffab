// ABOUTME: Build lifecycle subscriptions scoped to one application.
// ABOUTME: A subscription owns one server-side watch; a registry keeps one live watcher per app.

use std::collections::HashMap;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::task::AbortHandle;

use crate::platform::model::BuildRecord;
use crate::platform::{BuildEventStream, BuildOps};
use crate::types::{AppId, Selector};

use super::error::BuildError;

/// One delivery from a build watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchItem {
    Event(BuildRecord),
    /// The connection ended before the subscription was closed.
    Dropped(String),
}

/// An open watch on the builds of one application.
///
/// Closing consumes the subscription; dropping it closes the watch as well.
pub struct WatchSubscription {
    selector: Selector,
    events: Option<BuildEventStream>,
}

impl WatchSubscription {
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Next lifecycle event. After a `Dropped` item the subscription yields nothing more.
    pub async fn next(&mut self) -> Option<WatchItem> {
        let events = self.events.as_mut()?;
        let item = match events.next().await {
            Some(Ok(record)) => WatchItem::Event(record),
            Some(Err(e)) => WatchItem::Dropped(e.to_string()),
            None => WatchItem::Dropped("watch closed by the server".to_string()),
        };
        if matches!(item, WatchItem::Dropped(_)) {
            self.events = None;
        }
        Some(item)
    }

    pub fn close(self) {
        tracing::debug!(selector = %self.selector, "closing build watch");
    }
}

/// Opens build watches.
pub struct BuildWatcher;

impl BuildWatcher {
    /// Open exactly one watch on builds labelled with `app_id`.
    pub async fn subscribe<B: BuildOps + ?Sized>(
        builds: &B,
        app_id: &AppId,
    ) -> Result<WatchSubscription, BuildError> {
        let selector = Selector::app(app_id);
        let events = builds
            .watch_builds(&selector)
            .await
            .map_err(|source| BuildError::Watch {
                selector: selector.to_string(),
                source,
            })?;
        tracing::debug!(%selector, "build watch opened");
        Ok(WatchSubscription {
            selector,
            events: Some(events),
        })
    }
}

/// Tracks the task watching builds for each key: an app id or a task id.
#[derive(Default)]
pub struct WatchRegistry {
    active: Mutex<HashMap<String, AbortHandle>>,
}

impl WatchRegistry {
    /// Record `task` as the watcher for `key`, aborting any earlier one.
    /// Watchers that already finished are forgotten.
    pub fn register(&self, key: &str, task: AbortHandle) {
        let previous = {
            let mut active = self.active.lock();
            active.retain(|_, running| !running.is_finished());
            active.insert(key.to_string(), task)
        };
        if let Some(previous) = previous {
            tracing::debug!(key, "replacing stale build watcher");
            previous.abort();
        }
    }

    /// Abort the watcher for `key`. Returns whether one was still running.
    pub fn cancel(&self, key: &str) -> bool {
        match self.active.lock().remove(key) {
            Some(task) => {
                let running = !task.is_finished();
                task.abort();
                running
            }
            None => false,
        }
    }

    pub fn is_watching(&self, key: &str) -> bool {
        self.active
            .lock()
            .get(key)
            .is_some_and(|task| !task.is_finished())
    }

    /// Number of watchers currently held.
    pub fn len(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.lock().is_empty()
    }

    pub fn cancel_all(&self) {
        for (_, task) in self.active.lock().drain() {
            task.abort();
        }
    }
}
