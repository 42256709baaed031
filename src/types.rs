use std::fmt;
use std::str::FromStr;

/// Level used for watch bookkeeping messages ("watching entry", "unwatching
/// dependencies", ...).
///
/// Only `debug` and `info` are accepted; anything else is rejected while the
/// configuration is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchLogLevel {
    #[default]
    Debug,
    Info,
}

impl FromStr for WatchLogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(WatchLogLevel::Debug),
            "info" => Ok(WatchLogLevel::Info),
            other => Err(format!(
                "invalid log_watch: {other}, should be \"debug\" or \"info\""
            )),
        }
    }
}

impl fmt::Display for WatchLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchLogLevel::Debug => f.write_str("debug"),
            WatchLogLevel::Info => f.write_str("info"),
        }
    }
}

/// Whether the watch subsystem runs at all.
///
/// Watching only makes sense when a second build can happen, i.e. when
/// `auto_watch` is on and the session is not a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    SingleRun,
    Watch,
}

impl RunMode {
    pub fn from_flags(single_run: bool, auto_watch: bool) -> Self {
        if !single_run && auto_watch {
            RunMode::Watch
        } else {
            RunMode::SingleRun
        }
    }

    pub fn is_watch(self) -> bool {
        self == RunMode::Watch
    }
}
