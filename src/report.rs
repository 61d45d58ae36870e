use tracing::{error, warn};

use crate::error::ScrapeError;

/// Receiver of adapter failures.
pub trait ErrorSink: Send + Sync {
    fn log(&self, operation: &str, is_error: bool, detail: &str);
}

/// Sends failures to the process's `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn log(&self, operation: &str, is_error: bool, detail: &str) {
        if is_error {
            error!(operation, detail, "extraction failed");
        } else {
            warn!(operation, detail, "extraction problem");
        }
    }
}

/// Forward a failure to the sink unless it is an expected session expiry.
/// Layout breakage is an error; transport failures are only a warning.
/// Returns whether the sink was called.
pub fn report(sink: &dyn ErrorSink, operation: &str, err: &ScrapeError) -> bool {
    if err.is_session_expired() {
        warn!(operation, "session expired");
        return false;
    }
    let detail = serde_json::to_string(err).unwrap_or_else(|_| err.to_string());
    sink.log(operation, err.is_malformed(), &detail);
    true
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Keeps every call for assertions.
    #[derive(Default)]
    pub struct RecordingSink {
        pub calls: Mutex<Vec<(String, bool, String)>>,
    }

    impl ErrorSink for RecordingSink {
        fn log(&self, operation: &str, is_error: bool, detail: &str) {
            self.calls
                .lock()
                .unwrap()
                .push((operation.to_string(), is_error, detail.to_string()));
        }
    }

    #[test]
    fn malformed_content_is_reported_with_detail() {
        let sink = RecordingSink::default();
        let err = ScrapeError::malformed("course code", "95070");
        assert!(report(&sink, "getClassSchedules", &err));

        let calls = sink.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (op, is_error, detail) = &calls[0];
        assert_eq!(op, "getClassSchedules");
        assert!(*is_error);
        let json: serde_json::Value = serde_json::from_str(detail).unwrap();
        assert_eq!(json["kind"], "Malformed");
        assert_eq!(json["fragment"], "95070");
    }

    #[test]
    fn transport_failure_is_a_warning() {
        let sink = RecordingSink::default();
        let err = ScrapeError::fetch("/alumno/perfil", "connection reset");
        assert!(report(&sink, "getStudentId", &err));

        let calls = sink.calls.lock().unwrap();
        let (_, is_error, detail) = &calls[0];
        assert!(!*is_error);
        assert!(detail.contains("\"Fetch\""));
    }

    #[test]
    fn session_expiry_is_not_reported() {
        let sink = RecordingSink::default();
        assert!(!report(&sink, "getStudentId", &ScrapeError::SessionExpired));
        assert!(sink.calls.lock().unwrap().is_empty());
    }
}
