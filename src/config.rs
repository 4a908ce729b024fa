use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::loaders::Policies;
use crate::poller::PollPolicy;

/// Terminal dashboard for a pcap timeline server.
///
/// Polls the server's JSON API for capture progress, the IPs and protocols
/// seen in the capture, per-IP timeline aggregates and the raw event rows.
#[derive(Parser, Debug, Clone)]
#[command(name = "vtimeline")]
#[command(version)]
pub struct Config {
    /// Base URL of the timeline server
    #[arg(long, env = "VTIMELINE_URL", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// Delay between progress polls while a capture is being processed
    #[arg(long, default_value_t = 1000)]
    pub progress_interval_ms: u64,

    /// Delay between IP list, timeline and event polls
    #[arg(long, default_value_t = 5000)]
    pub poll_interval_ms: u64,

    /// How long the completion message stays visible
    #[arg(long, default_value_t = 3000)]
    pub completed_display_ms: u64,

    /// Give up after this many consecutive empty or failed polls
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Per-request timeout; requests never time out when unset
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Log file; stderr shares the terminal with the dashboard
    #[arg(long, default_value = "vtimeline.log")]
    pub log_file: PathBuf,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "warn")]
    pub log_level: log::LevelFilter,
}

impl Config {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn policies(&self) -> Policies {
        let poll = Duration::from_millis(self.poll_interval_ms);
        Policies {
            progress: PollPolicy::every(Duration::from_millis(self.progress_interval_ms)),
            ips: PollPolicy::every(poll)
                .retry_on_empty()
                .max_retries(self.max_retries),
            timeline: PollPolicy::every(poll)
                .retry_on_error()
                .max_retries(self.max_retries),
            events: PollPolicy::every(poll)
                .retry_on_error()
                .max_retries(self.max_retries),
            completed_display: Duration::from_millis(self.completed_display_ms),
        }
    }
}
