use chrono::{DateTime, Utc};
use tally_core::{Direction, SourceKind};

/// Filter describing which main-account entries to load from storage.
#[derive(Clone, Debug, Default)]
pub struct MainAccountQuery {
    pub direction: Option<Direction>,
    pub source: Option<SourceKind>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub ascending: bool,
}

impl MainAccountQuery {
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_source(mut self, source: SourceKind) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_time_range(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn ascending(mut self) -> Self {
        self.ascending = true;
        self
    }
}
