use std::collections::{hash_map::Entry, HashMap};

use crate::app_api::{Pid, RunningApp};

use super::timers::TimerKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// In the foreground.
    Active,
    /// In the background and visible. The only state in which a timer may be pending.
    VisibleInactive,
    Hidden,
}

/// Everything known about one watched process.
#[derive(Debug)]
pub struct WatchRecord {
    pub app: RunningApp,
    pub is_active: bool,
    pub is_hidden: bool,
    pub(super) timer: Option<TimerKey>,
}

impl WatchRecord {
    fn new(app: RunningApp) -> Self {
        Self {
            is_active: app.is_active,
            is_hidden: app.is_hidden,
            app,
            timer: None,
        }
    }

    pub fn state(&self) -> WatchState {
        if self.is_hidden {
            WatchState::Hidden
        } else if self.is_active {
            WatchState::Active
        } else {
            WatchState::VisibleInactive
        }
    }

    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// Whether a settings change for the given application concerns this record. Identifiers are
    /// compared first. Display names are only used for legacy settings, whose identifier is
    /// missing or equal to the name, the same way settings are resolved.
    pub fn matches(&self, bundle_identifier: Option<&str>, app_name: Option<&str>) -> bool {
        if bundle_identifier.is_some() && self.app.bundle_identifier.as_deref() == bundle_identifier
        {
            return true;
        }

        let Some(app_name) = app_name else {
            return false;
        };
        let legacy = bundle_identifier.map_or(true, |v| v == app_name);
        legacy && self.app.localized_name.as_deref() == Some(app_name)
    }
}

/// Watched processes keyed by process id, so that two instances of the same application are
/// tracked independently.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    records: HashMap<Pid, WatchRecord>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts watching a process. Returns [None] when the process is already watched.
    pub fn insert(&mut self, app: RunningApp) -> Option<&mut WatchRecord> {
        match self.records.entry(app.pid) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => Some(entry.insert(WatchRecord::new(app))),
        }
    }

    pub fn get(&self, pid: Pid) -> Option<&WatchRecord> {
        self.records.get(&pid)
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut WatchRecord> {
        self.records.get_mut(&pid)
    }

    pub fn remove(&mut self, pid: Pid) -> Option<WatchRecord> {
        self.records.remove(&pid)
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.records.contains_key(&pid)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn pids_in_state(&self, state: WatchState) -> Vec<Pid> {
        self.records
            .iter()
            .filter(|(_, v)| v.state() == state)
            .map(|(pid, _)| *pid)
            .collect()
    }

    pub fn pids_matching(&self, bundle_identifier: Option<&str>, app_name: Option<&str>) -> Vec<Pid> {
        self.records
            .iter()
            .filter(|(_, v)| v.matches(bundle_identifier, app_name))
            .map(|(pid, _)| *pid)
            .collect()
    }
}
