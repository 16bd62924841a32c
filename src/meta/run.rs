use chrono::{DateTime, FixedOffset, SecondsFormat};

/// Metadata describing the acquisition run as a whole
#[derive(Debug, Default, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunInfo {
    /// Retention time of the first scan, in seconds
    pub start_time: f64,
    /// Retention time of the last scan, in seconds
    pub end_time: f64,
    /// The wall clock time the acquisition began
    pub start_timestamp: Option<DateTime<FixedOffset>>,
    /// The host the source files were read on, used in file URIs
    pub host: Option<String>,
}

impl RunInfo {
    pub fn new(start_time: f64, end_time: f64) -> Self {
        Self {
            start_time,
            end_time,
            ..Default::default()
        }
    }

    pub fn with_start_timestamp(mut self, timestamp: DateTime<FixedOffset>) -> Self {
        self.start_timestamp = Some(timestamp);
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn start_timestamp_str(&self) -> Option<String> {
        self.start_timestamp
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}
