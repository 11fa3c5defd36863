//! Process-wide unread badge
//!
//! There is one badge per process. It is installed once at startup with the
//! unread count the backend reported at boot, and afterwards changes only
//! through [`Badge::update_count`].

use log::{debug, info};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

/// Navigation target of the badge
pub const BADGE_HREF: &str = "/app/sms-conversations";

static GLOBAL_BADGE: OnceLock<Arc<Badge>> = OnceLock::new();

/// Install the process-wide badge with its initial count
///
/// Later calls keep the first badge and return it unchanged.
pub fn install(initial_count: u32) -> Arc<Badge> {
    let mut installed = false;
    let badge = GLOBAL_BADGE.get_or_init(|| {
        installed = true;
        Arc::new(Badge::new(initial_count))
    });
    if installed {
        info!("Unread badge installed with count {}", initial_count);
    } else {
        debug!("Unread badge already installed; ignoring initial count {}", initial_count);
    }
    Arc::clone(badge)
}

/// The process-wide badge, if [`install`] has run
pub fn global() -> Option<Arc<Badge>> {
    GLOBAL_BADGE.get().cloned()
}

/// What the host should draw for the badge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeView {
    pub text: String,
    pub visible: bool,
    pub href: &'static str,
}

/// Unread counter surfaced in the host navigation bar
#[derive(Debug, Default)]
pub struct Badge {
    count: AtomicU32,
    mounted: AtomicBool,
}

impl Badge {
    pub fn new(initial_count: u32) -> Self {
        Self {
            count: AtomicU32::new(initial_count),
            mounted: AtomicBool::new(false),
        }
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    /// The only mutation entry point; sets the absolute count
    pub fn update_count(&self, count: u32) {
        let previous = self.count.swap(count, Ordering::SeqCst);
        if previous != count {
            debug!("Unread badge {} -> {}", previous, count);
        }
    }

    /// Text and visibility derived from the current count
    pub fn view(&self) -> BadgeView {
        let count = self.count();
        BadgeView {
            text: count.to_string(),
            visible: count > 0,
            href: BADGE_HREF,
        }
    }

    /// Claim the single badge slot in the host navigation
    ///
    /// Returns true the first time only.
    pub fn mount(&self) -> bool {
        !self.mounted.swap(true, Ordering::SeqCst)
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }
}
