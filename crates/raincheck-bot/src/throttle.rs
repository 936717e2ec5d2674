//! Anti-spam admission for incoming requests.
//!
//! Public requests must clear two cooldowns: a global one shared by everybody
//! and a per-sender one. Private requests are always admitted and never touch
//! the global cooldown.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use raincheck_core::ThrottleConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottlePolicy {
    /// Minimum gap between any two admitted public requests
    pub global_cooldown: Duration,
    /// Minimum gap between two admitted public requests from one sender
    pub sender_cooldown: Duration,
    /// Sender that skips the per-sender cooldown (case-insensitive)
    pub exempt_sender: Option<String>,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            global_cooldown: Duration::from_secs(10),
            sender_cooldown: Duration::from_secs(60),
            exempt_sender: None,
        }
    }
}

impl From<&ThrottleConfig> for ThrottlePolicy {
    fn from(config: &ThrottleConfig) -> Self {
        Self {
            global_cooldown: Duration::from_secs(config.global_cooldown_secs),
            sender_cooldown: Duration::from_secs(config.sender_cooldown_secs),
            exempt_sender: config
                .exempt_sender
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Another public request was admitted `elapsed` ago
    GlobalCooldown { elapsed: Duration },
    /// This sender's last admitted request was `elapsed` ago
    SenderCooldown { elapsed: Duration },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Throttle state. Lives for the whole process and is never persisted.
#[derive(Debug, Default)]
pub struct Throttle {
    policy: ThrottlePolicy,
    last_global: Option<Instant>,
    per_sender: HashMap<String, Instant>,
}

impl Throttle {
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self {
            policy,
            last_global: None,
            per_sender: HashMap::new(),
        }
    }

    pub fn policy(&self) -> &ThrottlePolicy {
        &self.policy
    }

    pub fn is_exempt(&self, sender: &str) -> bool {
        self.policy
            .exempt_sender
            .as_deref()
            .is_some_and(|exempt| exempt.eq_ignore_ascii_case(sender))
    }

    /// Decide whether a request from `sender` at `now` may proceed.
    ///
    /// A denial leaves the state untouched. On admission the sender's
    /// timestamp is set to `now`; public admissions also restart the global
    /// cooldown.
    pub fn admit(&mut self, now: Instant, sender: &str, private: bool) -> Admission {
        if !private {
            if let Some(last) = self.last_global {
                let elapsed = now.saturating_duration_since(last);
                if elapsed < self.policy.global_cooldown {
                    return Admission::GlobalCooldown { elapsed };
                }
            }

            if let Some(&last) = self.per_sender.get(sender) {
                let elapsed = now.saturating_duration_since(last);
                if elapsed < self.policy.sender_cooldown && !self.is_exempt(sender) {
                    return Admission::SenderCooldown { elapsed };
                }
            }

            self.last_global = Some(now);
        }

        self.per_sender.insert(sender.to_string(), now);
        Admission::Admitted
    }
}
