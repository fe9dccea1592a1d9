//! Frecency ranking: visit frequency weighted by how recent the last visit was

use super::Repository;

pub const HOUR: u64 = 60 * 60;
pub const DAY: u64 = 24 * HOUR;
pub const WEEK: u64 = 7 * DAY;

/// Score a repository from its visit count and the seconds since its last visit
pub fn score(visit_count: u64, since_last_visit: u64) -> u64 {
    let weight = if since_last_visit < HOUR {
        16
    } else if since_last_visit < DAY {
        8
    } else if since_last_visit < WEEK {
        2
    } else {
        1
    };
    visit_count.saturating_mul(weight)
}

/// Current unix time in seconds
pub fn now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

impl Repository {
    /// First visit of a newly created repository
    pub fn init_score(&mut self, now: u64) {
        self.visit_count = 1;
        self.visit_time = now;
        self.score = score(1, 0);
    }

    /// Record a visit; recency is measured against the previous visit
    pub fn update_on_visit(&mut self, now: u64) {
        let delta = now.saturating_sub(self.visit_time);
        self.visit_count += 1;
        self.visit_time = now;
        self.score = score(self.visit_count, delta);
    }
}
