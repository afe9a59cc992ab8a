// ABOUTME: Run events reported by the state machine and their message templates
// ABOUTME: Each event maps to a fixed level set consumed by the logging entry point

use crate::logging::LogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Before,
    After,
}

impl HookPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::Before => "Before",
            HookPhase::After => "After",
        }
    }
}

#[derive(Debug, Clone)]
pub enum RunEvent<'a> {
    TaskStatus {
        job: &'a str,
        attempt: u32,
        limits: String,
    },
    JobResult {
        job: &'a str,
        success: bool,
    },
    NextJob {
        next: &'a str,
        current: &'a str,
    },
    MaxAttemptsForExit {
        job: &'a str,
        attempts: u32,
    },
    MaxAttemptsForSwitch {
        job: &'a str,
        attempts: u32,
        exit: &'a str,
    },
    Warn {
        job: &'a str,
        error: String,
    },
    Error {
        job: &'a str,
        error: String,
    },
    Crash {
        job: &'a str,
        error: String,
    },
    JobsCompletion {
        chain: &'a [String],
    },
    HookTip {
        phase: HookPhase,
        job: &'a str,
        hook: &'a str,
    },
    HookResult {
        phase: HookPhase,
        hook: &'a str,
        success: bool,
    },
}

fn outcome(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

fn outcome_levels(success: bool) -> &'static [LogLevel] {
    if success {
        &[LogLevel::Info, LogLevel::Debug]
    } else {
        &[LogLevel::Warning, LogLevel::Debug]
    }
}

impl RunEvent<'_> {
    pub fn message(&self) -> String {
        match self {
            RunEvent::TaskStatus {
                job,
                attempt,
                limits,
            } => format!("Current try: {} for job '{}' ({})", attempt, job, limits),
            RunEvent::JobResult { job, success } => {
                format!("Job '{}' Execute {}", job, outcome(*success))
            }
            RunEvent::NextJob { next, current } => {
                format!("Directing to next job: '{}' after job '{}'", next, current)
            }
            RunEvent::MaxAttemptsForExit { job, attempts } => format!(
                "Max attempts reached for job '{}': {}. Exiting workflow.",
                job, attempts
            ),
            RunEvent::MaxAttemptsForSwitch {
                job,
                attempts,
                exit,
            } => format!(
                "Max attempts reached for job '{}': {}. Switching to job '{}'.",
                job, attempts, exit
            ),
            RunEvent::Warn { job, error } => format!("Warning in job '{}': {}.", job, error),
            RunEvent::Error { job, error } => format!("Error in job '{}': {}.", job, error),
            RunEvent::Crash { job, error } => {
                format!("Crash occurred in job '{}': {}", job, error)
            }
            RunEvent::JobsCompletion { chain } => {
                format!("All jobs completed. Jobs Chain: {}", chain.join(" -> "))
            }
            RunEvent::HookTip { phase, job, hook } => {
                format!("{} '{}' job run: '{}'", phase.as_str(), job, hook)
            }
            RunEvent::HookResult {
                phase,
                hook,
                success,
            } => format!(
                "{} job '{}' Execute {}",
                phase.as_str(),
                hook,
                outcome(*success)
            ),
        }
    }

    pub fn levels(&self) -> &'static [LogLevel] {
        match self {
            RunEvent::TaskStatus { .. }
            | RunEvent::NextJob { .. }
            | RunEvent::JobsCompletion { .. }
            | RunEvent::HookTip { .. } => &[LogLevel::Info, LogLevel::Debug],
            RunEvent::JobResult { success, .. } | RunEvent::HookResult { success, .. } => {
                outcome_levels(*success)
            }
            RunEvent::MaxAttemptsForSwitch { .. } => &[LogLevel::Warning, LogLevel::Debug],
            RunEvent::MaxAttemptsForExit { .. } | RunEvent::Error { .. } => &[LogLevel::Error],
            RunEvent::Warn { .. } => &[LogLevel::Warning],
            RunEvent::Crash { .. } => &[LogLevel::Critical],
        }
    }
}
