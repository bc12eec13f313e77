// src/session/script.rs

//! SteamCMD conversations as explicit state machines
//!
//! Each script is a value whose [`Script::transition`] takes the output
//! printed since the previous prompt and returns the next state together
//! with the command to send. Scripts never touch the process, so whole
//! conversations can be replayed in tests from canned output.

use std::collections::VecDeque;
use tracing::{info, warn};

/// Command that ends a session
pub const QUIT: &str = "quit";

/// Printed once an anonymous login completes
pub const LOGIN_OK: &str = "Waiting for user info...OK";

/// `login anonymous` attempts before a script gives up
pub const MAX_LOGIN_ATTEMPTS: u32 = 3;

/// One step of a SteamCMD conversation
pub trait Script: Sized {
    /// Consume the output since the previous prompt and decide what to send
    fn transition(&self, output: &str) -> (Self, String);
}

/// Drop the first `n` lines of `output`
fn skip_lines(output: &str, n: usize) -> &str {
    let mut rest = output;
    for _ in 0..n {
        match rest.find('\n') {
            Some(idx) => rest = &rest[idx + 1..],
            None => return "",
        }
    }
    rest
}

// =============================================================================
// app_info_print
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppInfoPhase {
    Start,
    Refreshed,
    Printed,
    Done,
}

/// Fetch the remote app info manifest of `app_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfoScript {
    pub app_id: u32,
    pub phase: AppInfoPhase,
    /// Manifest text once printed
    pub info: Option<String>,
}

impl AppInfoScript {
    pub fn new(app_id: u32) -> Self {
        Self {
            app_id,
            phase: AppInfoPhase::Start,
            info: None,
        }
    }
}

impl Script for AppInfoScript {
    fn transition(&self, output: &str) -> (Self, String) {
        let mut next = self.clone();
        let command = match self.phase {
            AppInfoPhase::Start => {
                next.phase = AppInfoPhase::Refreshed;
                "app_info_update 1".to_string()
            }
            AppInfoPhase::Refreshed => {
                next.phase = AppInfoPhase::Printed;
                format!("app_info_print {}", self.app_id)
            }
            AppInfoPhase::Printed => {
                // Echoed command, then the "AppID : ..., change number : ..." banner
                next.info = Some(skip_lines(output, 2).to_string());
                next.phase = AppInfoPhase::Done;
                QUIT.to_string()
            }
            AppInfoPhase::Done => QUIT.to_string(),
        };
        (next, command)
    }
}

// =============================================================================
// Login
// =============================================================================

/// Shared `force_install_dir` + anonymous login progression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    pub install_dir: String,
    pub install_dir_set: bool,
    pub logged_in: bool,
    pub attempts: u32,
}

/// What a script should do after feeding output to [`Login`]
enum LoginStep {
    Send(String),
    Ready,
    GaveUp,
}

impl Login {
    fn new(install_dir: &str) -> Self {
        Self {
            install_dir: install_dir.to_string(),
            install_dir_set: false,
            logged_in: false,
            attempts: 0,
        }
    }

    fn advance(&mut self, output: &str) -> LoginStep {
        if output.contains(LOGIN_OK) {
            self.logged_in = true;
        }

        if !self.install_dir_set {
            self.install_dir_set = true;
            return LoginStep::Send(format!("force_install_dir {}", self.install_dir));
        }
        if self.logged_in {
            return LoginStep::Ready;
        }
        if self.attempts >= MAX_LOGIN_ATTEMPTS {
            return LoginStep::GaveUp;
        }
        self.attempts += 1;
        LoginStep::Send("login anonymous".to_string())
    }
}

// =============================================================================
// app_update
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPhase {
    LoggingIn,
    Updating,
    Done,
}

/// Install or update the dedicated server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerUpdateScript {
    pub app_id: u32,
    pub login: Login,
    pub phase: ServerPhase,
    /// Set once SteamCMD reports `Success! App '<id>' ...`
    pub succeeded: bool,
}

impl ServerUpdateScript {
    pub fn new(app_id: u32, install_dir: &str) -> Self {
        Self {
            app_id,
            login: Login::new(install_dir),
            phase: ServerPhase::LoggingIn,
            succeeded: false,
        }
    }
}

impl Script for ServerUpdateScript {
    fn transition(&self, output: &str) -> (Self, String) {
        let mut next = self.clone();
        if output.contains(&format!("Success! App '{}'", self.app_id)) {
            next.succeeded = true;
        }

        let command = match self.phase {
            ServerPhase::LoggingIn => match next.login.advance(output) {
                LoginStep::Send(command) => command,
                LoginStep::Ready => {
                    next.phase = ServerPhase::Updating;
                    format!("app_update {} validate", self.app_id)
                }
                LoginStep::GaveUp => {
                    warn!("Anonymous login did not complete, giving up");
                    next.phase = ServerPhase::Done;
                    QUIT.to_string()
                }
            },
            ServerPhase::Updating | ServerPhase::Done => {
                next.phase = ServerPhase::Done;
                QUIT.to_string()
            }
        };
        (next, command)
    }
}

// =============================================================================
// workshop_download_item
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkshopPhase {
    LoggingIn,
    Downloading,
    Done,
}

/// Download workshop items one at a time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkshopScript {
    pub app_id: u32,
    pub login: Login,
    pub phase: WorkshopPhase,
    pub pending: VecDeque<u64>,
    /// Item whose download command was sent last
    pub in_flight: Option<u64>,
    pub downloaded: Vec<u64>,
    pub failed: Vec<u64>,
}

impl WorkshopScript {
    pub fn new(app_id: u32, install_dir: &str, items: &[u64]) -> Self {
        Self {
            app_id,
            login: Login::new(install_dir),
            phase: WorkshopPhase::LoggingIn,
            pending: items.iter().copied().collect(),
            in_flight: None,
            downloaded: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Queue the next download, or quit when nothing is left
    fn next_download(&mut self) -> String {
        match self.pending.pop_front() {
            Some(item) => {
                self.in_flight = Some(item);
                self.phase = WorkshopPhase::Downloading;
                info!("MOD[{}] download...", item);
                format!("workshop_download_item {} {}", self.app_id, item)
            }
            None => {
                self.phase = WorkshopPhase::Done;
                QUIT.to_string()
            }
        }
    }
}

impl Script for WorkshopScript {
    fn transition(&self, output: &str) -> (Self, String) {
        let mut next = self.clone();

        if let Some(item) = next.in_flight.take() {
            if output.contains(&format!("Success. Downloaded item {}", item)) {
                next.downloaded.push(item);
            } else {
                warn!("MOD[{}] download did not report success", item);
                next.failed.push(item);
            }
        }

        let command = match self.phase {
            WorkshopPhase::LoggingIn => match next.login.advance(output) {
                LoginStep::Send(command) => command,
                LoginStep::Ready => next.next_download(),
                LoginStep::GaveUp => {
                    warn!("Anonymous login did not complete, giving up");
                    next.failed.extend(next.pending.drain(..));
                    next.phase = WorkshopPhase::Done;
                    QUIT.to_string()
                }
            },
            WorkshopPhase::Downloading => next.next_download(),
            WorkshopPhase::Done => QUIT.to_string(),
        };
        (next, command)
    }
}
