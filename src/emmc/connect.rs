use serde_json::json;
use std::thread;
use std::time::Duration;

use crate::device::{DeviceError, DeviceProbe};
use crate::emmc::error::EmmcError;
use crate::ui::prelude::*;

/// How often and how fast handshakes are retried after a wrong response.
///
/// The default retries forever without pausing; only a successful handshake or
/// an external interrupt ends the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
    pub delay: Option<Duration>,
}

impl RetryPolicy {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionEstablisher {
    policy: RetryPolicy,
}

impl ConnectionEstablisher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Discover a device and handshake until it answers as expected.
    ///
    /// A wrong handshake response (typically the preloader answering instead of
    /// the boot ROM) is retried with a freshly discovered handle. Every other
    /// failure is returned immediately.
    pub fn establish<P: DeviceProbe>(&self, probe: &mut P) -> Result<P::Session, EmmcError> {
        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            let handle = probe.discover()?;
            match probe.handshake(handle) {
                Ok(session) => {
                    emit(
                        Level::Success,
                        "connect.handshake",
                        &format!("{} Handshake success!", char::from(NerdFont::Link)),
                        Some(json!({ "attempts": attempts })),
                    );
                    return Ok(session);
                }
                Err(err @ DeviceError::HandshakeMismatch { .. }) => {
                    emit(
                        Level::Info,
                        "connect.retry",
                        &format!(
                            "{} Wrong handshake response, probably in preloader ({err})",
                            char::from(NerdFont::Refresh)
                        ),
                        Some(json!({ "attempt": attempts })),
                    );
                    if self.policy.exhausted(attempts) {
                        return Err(EmmcError::HandshakeExhausted { attempts });
                    }
                    if let Some(delay) = self.policy.delay {
                        thread::sleep(delay);
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
