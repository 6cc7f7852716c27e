//! Navigation capability and deferred navigation.
//!
//! The flow decides where the user should go but never moves them itself.
//! The host supplies a [`Navigator`] that knows how to switch pages inside
//! the application and how to open an external URL.

use gatehouse_core::PageId;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;
use url::Url;

/// Moves the user between pages.
pub trait Navigator: Send + Sync {
    /// Switches to an application page.
    fn navigate(&self, page: &PageId);

    /// Leaves for an absolute URL (login page URL, identity provider).
    fn open_url(&self, url: &Url);
}

/// Navigation to the home page after a successful callback.
///
/// Only created once the callback's credentials have been persisted. It is a
/// follow-up, not part of the outcome's decision: dropping it skips the
/// navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeRedirect {
    page: PageId,
    delay: Duration,
}

impl HomeRedirect {
    pub(crate) fn new(page: PageId, delay: Duration) -> Self {
        Self { page, delay }
    }

    /// Returns the page navigated to.
    #[must_use]
    pub fn page(&self) -> &PageId {
        &self.page
    }

    /// Returns the configured delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Navigates now, ignoring the delay.
    pub fn run(self, navigator: &dyn Navigator) {
        debug!(page = %self.page, "navigating home");
        navigator.navigate(&self.page);
    }

    /// Navigates after the configured delay on the tokio runtime.
    ///
    /// The returned handle cancels the navigation if it has not run yet.
    #[must_use = "dropping the handle does not cancel; call cancel() to skip the navigation"]
    pub fn schedule(self, navigator: Arc<dyn Navigator>) -> ScheduledNavigation {
        let handle = tokio::spawn(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.run(navigator.as_ref());
        });
        ScheduledNavigation { handle }
    }
}

/// A scheduled home navigation.
#[derive(Debug)]
pub struct ScheduledNavigation {
    handle: JoinHandle<()>,
}

impl ScheduledNavigation {
    /// Cancels the navigation if it has not run yet.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Returns true once the navigation ran or was cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the navigation to run. Returns false if it was cancelled.
    pub async fn wait(self) -> bool {
        self.handle.await.is_ok()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// A navigation issued through [`RecordingNavigator`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Visit {
        Page(String),
        Url(String),
    }

    /// Navigator that records every request.
    #[derive(Debug, Default)]
    pub struct RecordingNavigator {
        visits: Mutex<Vec<Visit>>,
    }

    impl RecordingNavigator {
        pub fn visits(&self) -> Vec<Visit> {
            self.visits.lock().expect("lock").clone()
        }
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, page: &PageId) {
            self.visits
                .lock()
                .expect("lock")
                .push(Visit::Page(page.to_string()));
        }

        fn open_url(&self, url: &Url) {
            self.visits
                .lock()
                .expect("lock")
                .push(Visit::Url(url.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{RecordingNavigator, Visit};
    use super::*;

    #[test]
    fn run_navigates_immediately() {
        let navigator = RecordingNavigator::default();
        HomeRedirect::new(PageId::new("Home"), Duration::from_secs(60)).run(&navigator);
        assert_eq!(navigator.visits(), vec![Visit::Page("Home".to_string())]);
    }

    #[tokio::test]
    async fn schedule_navigates_after_delay() {
        let navigator = Arc::new(RecordingNavigator::default());
        let scheduled = HomeRedirect::new(PageId::new("Home"), Duration::from_millis(5))
            .schedule(navigator.clone());

        assert!(scheduled.wait().await);
        assert_eq!(navigator.visits(), vec![Visit::Page("Home".to_string())]);
    }

    #[tokio::test]
    async fn cancelled_navigation_never_runs() {
        let navigator = Arc::new(RecordingNavigator::default());
        let scheduled = HomeRedirect::new(PageId::new("Home"), Duration::from_secs(60))
            .schedule(navigator.clone());

        assert!(!scheduled.is_finished());
        scheduled.cancel();

        assert!(!scheduled.wait().await);
        assert!(navigator.visits().is_empty());
    }
}
