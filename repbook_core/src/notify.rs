//! Notification collaborator for session events.
//!
//! Notifiers only display; they never feed back into engine state.

/// Something the user should be told about
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// The rest countdown reached zero
    RestComplete,
    /// Advance was requested on the last set of the last exercise
    WorkoutComplete,
    /// An input was rejected
    ValidationFailed(String),
}

impl SessionEvent {
    pub fn message(&self) -> String {
        match self {
            SessionEvent::RestComplete => "Rest complete! Continue with your workout.".into(),
            SessionEvent::WorkoutComplete => "All exercises completed!".into(),
            SessionEvent::ValidationFailed(msg) => format!("Invalid input: {}", msg),
        }
    }
}

pub trait Notifier {
    fn notify(&mut self, event: &SessionEvent);
}

/// Routes events to the tracing subscriber
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::ValidationFailed(_) => tracing::warn!("{}", event.message()),
            _ => tracing::info!("{}", event.message()),
        }
    }
}

/// Keeps every event it receives
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub events: Vec<SessionEvent>,
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, event: &SessionEvent) {
        self.events.push(event.clone());
    }
}
