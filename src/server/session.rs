// Live debate session registry
//
// One DebateRunner per debate id. Runners are ephemeral: the transcript
// store is the durable record, and a runner lost to restart is rebuilt
// from the stored turn count on next access.

use anyhow::{bail, Result};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::debate::DebateRunner;

struct SessionEntry {
    runner: Arc<Mutex<DebateRunner>>,
    last_active: Instant,
}

pub struct SessionRegistry {
    sessions: DashMap<String, SessionEntry>,
    max_sessions: usize,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize, idle_timeout_minutes: u64) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions,
            idle_timeout: Duration::from_secs(idle_timeout_minutes * 60),
        }
    }

    /// Runner for a known debate id, rebuilding it from the persisted turn
    /// count when absent. Touches the activity clock.
    pub fn get_or_restore(
        &self,
        debate_id: &str,
        max_turns: usize,
        generated_turns: usize,
    ) -> Result<Arc<Mutex<DebateRunner>>> {
        if let Some(mut entry) = self.sessions.get_mut(debate_id) {
            entry.last_active = Instant::now();
            return Ok(Arc::clone(&entry.runner));
        }

        self.ensure_capacity()?;
        let runner = Arc::new(Mutex::new(DebateRunner::restore(max_turns, generated_turns)));
        self.sessions.insert(
            debate_id.to_string(),
            SessionEntry {
                runner: Arc::clone(&runner),
                last_active: Instant::now(),
            },
        );
        Ok(runner)
    }

    /// Register the runner of a freshly created debate under its new id.
    pub fn insert(&self, debate_id: &str, runner: Arc<Mutex<DebateRunner>>) -> Result<()> {
        self.ensure_capacity()?;
        self.sessions.insert(
            debate_id.to_string(),
            SessionEntry {
                runner,
                last_active: Instant::now(),
            },
        );
        Ok(())
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drop sessions idle past the timeout. Their transcripts stay in the
    /// store.
    pub fn purge_idle(&self) -> usize {
        let before = self.sessions.len();
        let cutoff = self.idle_timeout;
        let now = Instant::now();
        self.sessions
            .retain(|_, entry| now.duration_since(entry.last_active) < cutoff);
        before - self.sessions.len()
    }

    fn ensure_capacity(&self) -> Result<()> {
        if self.sessions.len() >= self.max_sessions {
            self.purge_idle();
        }
        if self.sessions.len() >= self.max_sessions {
            bail!("session registry full ({} sessions)", self.max_sessions);
        }
        Ok(())
    }
}
