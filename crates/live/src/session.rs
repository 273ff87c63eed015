//! Per-session buffers and the triggers that feed them.
//!
//! `SessionView` owns the bounded event rings and the optimistic set for the
//! active session. Confirmed turns are derived from the rings on demand, so
//! the order in which triggers arrive does not change what is rendered. Every trigger captures a
//! [`SessionTicket`] when it starts; applying with an outdated ticket is
//! rejected so late callbacks from a previous session cannot write into the
//! current one. Rendering is a pure recomputation over the current buffers.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use turnweave_core::{CanonicalEvent, ConversationTurn, EventKind, RingBuffer, TimelineItem};
use turnweave_parsers::normalize_all;
use turnweave_runtime_config::EngineConfig;

use crate::assemble::{assemble_live_turns, assemble_turns, turns_from_messages_snapshot};
use crate::merge::merge_adjacent_turns;
use crate::reconcile::{prune_confirmed, reconcile};
use crate::state::fold_state;
use crate::timeline::fold_timeline;
use crate::{HistorySource, LiveUpdate};

/// Captured identity of the session a trigger was started for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionTicket {
    session_id: String,
    generation: u64,
}

impl SessionTicket {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SyncError {
    #[error("no active session")]
    NoActiveSession,

    #[error(
        "stale update for session {session_id} (generation {generation}); active generation is {active_generation}"
    )]
    Stale {
        session_id: String,
        generation: u64,
        active_generation: u64,
    },

    #[error("transient fetch failure: {message}")]
    Transient { message: String },
}

impl SyncError {
    /// Upstream failures can be retried; buffers were left untouched.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Run lifecycle signal from the live transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunSignal {
    Started { run_id: Option<String> },
    Finished { run_id: Option<String> },
    Errored { run_id: Option<String>, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RunStatus {
    #[default]
    Idle,
    Running {
        #[serde(skip_serializing_if = "Option::is_none")]
        run_id: Option<String>,
    },
    Finished {
        #[serde(skip_serializing_if = "Option::is_none")]
        run_id: Option<String>,
    },
    Errored {
        #[serde(skip_serializing_if = "Option::is_none")]
        run_id: Option<String>,
        message: String,
    },
}

/// Everything the presentation layer renders for one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub turns: Vec<ConversationTurn>,
    pub timeline: Vec<TimelineItem>,
    pub state: Option<Map<String, Value>>,
    pub run: RunStatus,
    pub pending_optimistic: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

pub struct SessionView {
    config: EngineConfig,
    active: Option<SessionTicket>,
    generation: u64,
    history: RingBuffer<CanonicalEvent>,
    live: RingBuffer<CanonicalEvent>,
    optimistic: Vec<ConversationTurn>,
    run: RunStatus,
    last_error: Option<SyncError>,
}

impl SessionView {
    pub fn new(config: EngineConfig) -> Self {
        let mut config = config;
        config.clamp();
        Self {
            history: RingBuffer::new(config.buffers.history_event_cap),
            live: RingBuffer::new(config.buffers.raw_event_cap),
            config,
            active: None,
            generation: 0,
            optimistic: Vec::new(),
            run: RunStatus::Idle,
            last_error: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ticket of the active session, if any
    pub fn ticket(&self) -> Option<&SessionTicket> {
        self.active.as_ref()
    }

    /// Hard reset: every buffer is recreated before the new session's
    /// history load begins, and all earlier tickets become stale.
    pub fn switch_session(&mut self, session_id: impl Into<String>) -> SessionTicket {
        self.generation += 1;
        let ticket = SessionTicket {
            session_id: session_id.into(),
            generation: self.generation,
        };
        tracing::info!(
            "switching to session {} (generation {})",
            ticket.session_id,
            ticket.generation
        );

        self.history = RingBuffer::new(self.config.buffers.history_event_cap);
        self.live = RingBuffer::new(self.config.buffers.raw_event_cap);
        self.optimistic = Vec::new();
        self.run = RunStatus::Idle;
        self.last_error = None;
        self.active = Some(ticket.clone());
        ticket
    }

    fn check(&self, ticket: &SessionTicket) -> Result<(), SyncError> {
        let active = self.active.as_ref().ok_or(SyncError::NoActiveSession)?;
        if active != ticket {
            tracing::debug!(
                "rejecting stale update for {} (generation {}, active {})",
                ticket.session_id,
                ticket.generation,
                active.generation
            );
            return Err(SyncError::Stale {
                session_id: ticket.session_id.clone(),
                generation: ticket.generation,
                active_generation: active.generation,
            });
        }
        Ok(())
    }

    /// Dispatch one collaborator delivery.
    pub fn apply(&mut self, ticket: &SessionTicket, update: LiveUpdate) -> Result<(), SyncError> {
        match update {
            LiveUpdate::HistoryLoaded(records) => self.apply_history(ticket, &records).map(drop),
            LiveUpdate::RecordsAppended(records) => self.apply_live(ticket, &records).map(drop),
            LiveUpdate::LocalTurn(turn) => self.add_optimistic(ticket, turn),
            LiveUpdate::Run(signal) => self.apply_signal(ticket, signal),
            LiveUpdate::FetchFailed(message) => Err(self.fail_fetch(ticket, message)),
        }
    }

    /// Replace confirmed history with a full replay. Returns the number of
    /// canonical events produced.
    pub fn apply_history(
        &mut self,
        ticket: &SessionTicket,
        records: &[Value],
    ) -> Result<usize, SyncError> {
        self.check(ticket)?;
        let events = normalize_all(records);
        let count = events.len();

        self.history.clear();
        self.history.extend(events);
        self.last_error = None;
        self.prune_optimistic();
        Ok(count)
    }

    /// Append live origin records.
    pub fn apply_live(
        &mut self,
        ticket: &SessionTicket,
        records: &[Value],
    ) -> Result<usize, SyncError> {
        self.apply_live_events(ticket, normalize_all(records))
    }

    /// Append already-normalized live events.
    pub fn apply_live_events(
        &mut self,
        ticket: &SessionTicket,
        events: Vec<CanonicalEvent>,
    ) -> Result<usize, SyncError> {
        self.check(ticket)?;
        let count = events.len();
        self.live.extend(events);
        self.prune_optimistic();
        Ok(count)
    }

    /// Record a locally created turn. An id that is already confirmed is
    /// ignored; a repeated pending id replaces the earlier entry.
    pub fn add_optimistic(
        &mut self,
        ticket: &SessionTicket,
        turn: ConversationTurn,
    ) -> Result<(), SyncError> {
        self.check(ticket)?;
        let fresh = self.fresh_live_events();
        if self
            .confirmed_turns(&fresh)
            .iter()
            .any(|confirmed| confirmed.id == turn.id)
        {
            return Ok(());
        }
        match self.optimistic.iter_mut().find(|entry| entry.id == turn.id) {
            Some(entry) => *entry = turn,
            None => self.optimistic.push(turn),
        }
        Ok(())
    }

    pub fn apply_signal(
        &mut self,
        ticket: &SessionTicket,
        signal: RunSignal,
    ) -> Result<(), SyncError> {
        self.check(ticket)?;
        self.run = match signal {
            RunSignal::Started { run_id } => RunStatus::Running { run_id },
            RunSignal::Finished { run_id } => RunStatus::Finished { run_id },
            RunSignal::Errored { run_id, message } => RunStatus::Errored { run_id, message },
        };
        Ok(())
    }

    /// Report an upstream fetch failure. Buffers are left as they are so a
    /// retry loses nothing; the returned error is retryable unless the ticket
    /// was already stale.
    pub fn fail_fetch(&mut self, ticket: &SessionTicket, message: impl Into<String>) -> SyncError {
        if let Err(stale) = self.check(ticket) {
            return stale;
        }
        let error = SyncError::Transient {
            message: message.into(),
        };
        tracing::warn!("session {}: {error}", ticket.session_id);
        self.last_error = Some(error.clone());
        error
    }

    /// Load history from a collaborator, converting its failure into a
    /// transient error.
    pub fn refresh_history(
        &mut self,
        ticket: &SessionTicket,
        source: &dyn HistorySource,
    ) -> Result<usize, SyncError> {
        self.check(ticket)?;
        match source.load_history(&ticket.session_id) {
            Ok(records) => self.apply_history(ticket, &records),
            Err(e) => Err(self.fail_fetch(ticket, format!("{e:#}"))),
        }
    }

    pub fn pending_optimistic(&self) -> &[ConversationTurn] {
        &self.optimistic
    }

    pub fn last_error(&self) -> Option<&SyncError> {
        self.last_error.as_ref()
    }

    fn prune_optimistic(&mut self) {
        let confirmed = {
            let fresh = self.fresh_live_events();
            self.confirmed_turns(&fresh)
        };
        let removed = prune_confirmed(&mut self.optimistic, &confirmed);
        if removed > 0 {
            tracing::debug!("{removed} optimistic turn(s) confirmed");
        }
    }

    /// Live events not already replayed by history, matched by origin record id.
    fn fresh_live_events(&self) -> Vec<&CanonicalEvent> {
        let replayed: HashSet<&str> = self
            .history
            .iter()
            .filter_map(|e| e.correlation.source_id.as_deref())
            .collect();
        self.live
            .iter()
            .filter(|e| {
                e.correlation
                    .source_id
                    .as_deref()
                    .is_none_or(|id| !replayed.contains(id))
            })
            .collect()
    }

    /// Confirmed turns, unmerged. The newest live `messages-snapshot` is the
    /// authoritative session object; without one, history is replayed.
    fn confirmed_turns(&self, fresh: &[&CanonicalEvent]) -> Vec<ConversationTurn> {
        let snapshot = fresh.iter().rev().find_map(|event| match &event.kind {
            EventKind::MessagesSnapshot { messages } => Some(messages),
            _ => None,
        });
        match snapshot {
            Some(messages) => turns_from_messages_snapshot(messages),
            None => assemble_turns(self.history.iter()),
        }
    }

    fn reconciled_turns(&self, fresh: &[&CanonicalEvent]) -> Vec<ConversationTurn> {
        let suppressed: HashSet<String> =
            self.optimistic.iter().map(|entry| entry.id.clone()).collect();
        let base = self.confirmed_turns(fresh);
        let live = assemble_live_turns(fresh.iter().copied(), &suppressed);

        if self.config.merge.merge_adjacent {
            let base = merge_adjacent_turns(base);
            let live = merge_adjacent_turns(live);
            reconcile(&base, &live, &self.optimistic)
        } else {
            reconcile(&base, &live, &self.optimistic)
        }
    }

    fn folded_timeline(&self, fresh: &[&CanonicalEvent]) -> Vec<TimelineItem> {
        fold_timeline(
            self.history.iter().chain(fresh.iter().copied()),
            self.config.buffers.timeline_display_cap,
        )
    }

    fn folded_state(&self, fresh: &[&CanonicalEvent]) -> Option<Map<String, Value>> {
        fold_state(self.history.iter().chain(fresh.iter().copied()))
    }

    /// Reconciled turns for rendering.
    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.reconciled_turns(&self.fresh_live_events())
    }

    pub fn timeline(&self) -> Vec<TimelineItem> {
        self.folded_timeline(&self.fresh_live_events())
    }

    pub fn state(&self) -> Option<Map<String, Value>> {
        self.folded_state(&self.fresh_live_events())
    }

    pub fn render(&self) -> SessionSnapshot {
        let fresh = self.fresh_live_events();
        SessionSnapshot {
            session_id: self.active.as_ref().map(|t| t.session_id.clone()),
            turns: self.reconciled_turns(&fresh),
            timeline: self.folded_timeline(&fresh),
            state: self.folded_state(&fresh),
            run: self.run.clone(),
            pending_optimistic: self.optimistic.len(),
            last_error: self.last_error.as_ref().map(ToString::to_string),
        }
    }
}

impl Default for SessionView {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
