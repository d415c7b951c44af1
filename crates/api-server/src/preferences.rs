use analysis_core::TimeFrame;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

pub const DEFAULT_DISPLAY_NAME: &str = "Placeholder name";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferencesView {
    pub time_frame: TimeFrame,
    pub display_name: String,
}

/// Session-wide settings shared by every view: the selected time frame and the display name.
///
/// The time frame is published on a watch channel; a value set here is what every
/// receiver's next `borrow()` returns.
#[derive(Clone)]
pub struct Preferences {
    time_frame: Arc<watch::Sender<TimeFrame>>,
    display_name: Arc<RwLock<String>>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self::new(TimeFrame::default(), DEFAULT_DISPLAY_NAME)
    }
}

impl Preferences {
    pub fn new(time_frame: TimeFrame, display_name: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(time_frame);
        Self {
            time_frame: Arc::new(tx),
            display_name: Arc::new(RwLock::new(display_name.into())),
        }
    }

    pub fn time_frame(&self) -> TimeFrame {
        *self.time_frame.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<TimeFrame> {
        self.time_frame.subscribe()
    }

    pub fn set_time_frame(&self, time_frame: TimeFrame) {
        let changed = self.time_frame.send_if_modified(|current| {
            if *current == time_frame {
                false
            } else {
                *current = time_frame;
                true
            }
        });
        if changed {
            tracing::info!("Time frame set to {}", time_frame);
        }
    }

    pub fn display_name(&self) -> String {
        match self.display_name.read() {
            Ok(name) => name.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_display_name(&self, name: impl Into<String>) {
        let name = name.into();
        match self.display_name.write() {
            Ok(mut guard) => *guard = name,
            Err(poisoned) => *poisoned.into_inner() = name,
        }
    }

    pub fn view(&self) -> PreferencesView {
        PreferencesView {
            time_frame: self.time_frame(),
            display_name: self.display_name(),
        }
    }
}
