//! Undo/redo log
//!
//! Reversible handlers record an inverse command next to their mutation.
//! Where an entry lands depends on who ran the command:
//!
//! | origin | recorded entry goes to | redo stack |
//! |---|---|---|
//! | user | undo | cleared |
//! | undo | redo | kept |
//! | redo | undo | kept |
//!
//! Both stacks are bounded; the oldest entries fall off first.
//!
//! Entries whose inverse works on tab content remember the tab that was
//! active when they were recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use crate::command::CommandPayload;
use crate::error::{CommandError, CommandResult};

/// Who issued a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandOrigin {
    User,
    Undo,
    Redo,
}

/// How far an undo reaches back
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UndoPoint {
    /// The most recent entry
    #[default]
    Last,
    /// The `count` most recent entries
    Count { count: usize },
    /// Every entry on top of the stack whose correlation id starts with `prefix`
    CorrelationPrefix { prefix: String },
}

/// One reversible command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoEntry {
    /// Correlation id of the command that was applied
    pub correlation_id: String,
    /// Type of the command that was applied
    pub command: String,
    pub inverse: CommandPayload,
    pub description: String,
    /// Tab whose content the inverse applies to; `None` for dashboard-level
    /// inverses and for the implicit tab
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Bounded undo and redo stacks
#[derive(Debug)]
pub struct UndoLog {
    undo: VecDeque<UndoEntry>,
    redo: VecDeque<UndoEntry>,
    limit: usize,
}

impl UndoLog {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            limit,
        }
    }

    pub fn record(&mut self, entry: UndoEntry, origin: CommandOrigin) {
        debug!(
            "Recording inverse of {} ({}) from {:?}",
            entry.command, entry.correlation_id, origin
        );
        match origin {
            CommandOrigin::User => {
                self.redo.clear();
                push_bounded(&mut self.undo, entry, self.limit);
            }
            CommandOrigin::Undo => push_bounded(&mut self.redo, entry, self.limit),
            CommandOrigin::Redo => push_bounded(&mut self.undo, entry, self.limit),
        }
    }

    /// Pop the entries selected by `point`, most recent first
    pub fn take_undo(&mut self, point: &UndoPoint) -> CommandResult<Vec<UndoEntry>> {
        if self.undo.is_empty() {
            return Err(CommandError::not_found("nothing to undo"));
        }
        let count = match point {
            UndoPoint::Last => 1,
            UndoPoint::Count { count: 0 } => {
                return Err(CommandError::user("undo count must be positive"))
            }
            UndoPoint::Count { count } if *count > self.undo.len() => {
                return Err(CommandError::user(format!(
                    "cannot undo {} commands, only {} recorded",
                    count,
                    self.undo.len()
                )))
            }
            UndoPoint::Count { count } => *count,
            UndoPoint::CorrelationPrefix { prefix } => {
                let matching = self
                    .undo
                    .iter()
                    .rev()
                    .take_while(|e| e.correlation_id.starts_with(prefix.as_str()))
                    .count();
                if matching == 0 {
                    return Err(CommandError::not_found(format!(
                        "no recent command with correlation prefix '{}'",
                        prefix
                    )));
                }
                matching
            }
        };
        Ok(take_top(&mut self.undo, count))
    }

    /// Pop the most recent redo entry
    pub fn take_redo(&mut self) -> CommandResult<UndoEntry> {
        self.redo
            .pop_back()
            .ok_or_else(|| CommandError::not_found("nothing to redo"))
    }

    /// Put back entries that could not be reverted, most recent first
    pub fn restore_undo(&mut self, entries: Vec<UndoEntry>) {
        for entry in entries.into_iter().rev() {
            push_bounded(&mut self.undo, entry, self.limit);
        }
    }

    pub fn restore_redo(&mut self, entry: UndoEntry) {
        push_bounded(&mut self.redo, entry, self.limit);
    }

    /// The implicit tab's content now lives in `tab`; move its entries along
    pub fn adopt_implicit_tab(&mut self, tab: &str) {
        for entry in self.undo.iter_mut().chain(self.redo.iter_mut()) {
            if entry.tab.is_none() && entry.inverse.is_tab_scoped() {
                entry.tab = Some(tab.to_string());
            }
        }
    }

    /// Undo entries, oldest first
    pub fn undo_entries(&self) -> Vec<UndoEntry> {
        self.undo.iter().cloned().collect()
    }

    /// Redo entries, oldest first
    pub fn redo_entries(&self) -> Vec<UndoEntry> {
        self.redo.iter().cloned().collect()
    }
}

fn push_bounded(stack: &mut VecDeque<UndoEntry>, entry: UndoEntry, limit: usize) {
    stack.push_back(entry);
    while stack.len() > limit {
        stack.pop_front();
    }
}

fn take_top(stack: &mut VecDeque<UndoEntry>, count: usize) -> Vec<UndoEntry> {
    (0..count).filter_map(|_| stack.pop_back()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> UndoEntry {
        UndoEntry {
            correlation_id: id.to_string(),
            command: "renameDashboard".into(),
            inverse: CommandPayload::RenameDashboard {
                title: format!("before {}", id),
            },
            description: "rename".into(),
            tab: None,
            recorded_at: Utc::now(),
        }
    }

    fn ids(entries: &[UndoEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.correlation_id.as_str()).collect()
    }

    #[test]
    fn test_user_command_clears_redo() {
        let mut log = UndoLog::new(10);
        log.record(entry("a"), CommandOrigin::Undo);
        assert_eq!(log.redo_entries().len(), 1);
        log.record(entry("b"), CommandOrigin::User);
        assert!(log.redo_entries().is_empty());
        assert_eq!(ids(&log.undo_entries()), vec!["b"]);
    }

    #[test]
    fn test_bounded() {
        let mut log = UndoLog::new(2);
        for id in ["a", "b", "c"] {
            log.record(entry(id), CommandOrigin::User);
        }
        assert_eq!(ids(&log.undo_entries()), vec!["b", "c"]);
    }

    #[test]
    fn test_take_by_count_and_prefix() {
        let mut log = UndoLog::new(10);
        for id in ["x", "dnd-1-drag", "dnd-1-drop"] {
            log.record(entry(id), CommandOrigin::User);
        }
        let taken = log
            .take_undo(&UndoPoint::CorrelationPrefix {
                prefix: "dnd-1".into(),
            })
            .unwrap();
        assert_eq!(ids(&taken), vec!["dnd-1-drop", "dnd-1-drag"]);

        let err = log.take_undo(&UndoPoint::Count { count: 3 }).unwrap_err();
        assert_eq!(err.reason(), dash_core::FailureReason::UserError);

        let taken = log.take_undo(&UndoPoint::Count { count: 1 }).unwrap();
        assert_eq!(ids(&taken), vec!["x"]);

        let err = log.take_undo(&UndoPoint::Last).unwrap_err();
        assert_eq!(err.reason(), dash_core::FailureReason::NotFound);
    }

    #[test]
    fn test_adopting_implicit_tab_scopes_content_entries() {
        let mut log = UndoLog::new(10);
        log.record(entry("rename"), CommandOrigin::User);
        log.record(
            UndoEntry {
                inverse: CommandPayload::ChangeWidgetHeader {
                    widget: dash_core::ObjRef::id("a"),
                    title: "A".into(),
                },
                ..entry("header")
            },
            CommandOrigin::User,
        );

        log.adopt_implicit_tab("t1");
        let tabs: Vec<Option<&str>> = log
            .undo
            .iter()
            .map(|e| e.tab.as_deref())
            .collect();
        assert_eq!(tabs, vec![None, Some("t1")]);
    }

    #[test]
    fn test_restore_preserves_order() {
        let mut log = UndoLog::new(10);
        for id in ["a", "b", "c"] {
            log.record(entry(id), CommandOrigin::User);
        }
        let taken = log.take_undo(&UndoPoint::Count { count: 2 }).unwrap();
        log.restore_undo(taken);
        assert_eq!(ids(&log.undo_entries()), vec!["a", "b", "c"]);
    }
}
