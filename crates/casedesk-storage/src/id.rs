use chrono::{Datelike, Local, NaiveDate};

/// Taiwan (Minguo) calendar year: 2024 is 113.
pub fn roc_year(date: NaiveDate) -> i32 {
    date.year() - 1911
}

/// Hands out `<ROC year><sequence>` case ids (`113001`, `113002`, ...).
///
/// The sequence starts after the highest id of the same year already in use and only moves
/// forward, so ids from one batch are sequential and never collide with existing ones.
#[derive(Debug, Clone)]
pub struct CaseIdGenerator {
    prefix: String,
    next: u32,
}

impl CaseIdGenerator {
    pub fn for_year<'a>(roc_year: i32, existing: impl IntoIterator<Item = &'a str>) -> Self {
        let prefix = roc_year.to_string();
        let highest = existing
            .into_iter()
            .filter_map(|id| sequence_of(&prefix, id))
            .max()
            .unwrap_or(0);
        Self {
            prefix,
            next: highest + 1,
        }
    }

    pub fn for_today<'a>(existing: impl IntoIterator<Item = &'a str>) -> Self {
        Self::for_year(roc_year(Local::now().date_naive()), existing)
    }

    /// Mark an externally supplied id as used.
    pub fn observe(&mut self, case_id: &str) {
        if let Some(seq) = sequence_of(&self.prefix, case_id) {
            self.next = self.next.max(seq + 1);
        }
    }

    pub fn next_id(&mut self) -> String {
        let id = format!("{}{:03}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

/// Sequence part of `id` if it is `<prefix>` followed by at least three digits.
fn sequence_of(prefix: &str, id: &str) -> Option<u32> {
    let seq = id.trim().strip_prefix(prefix)?;
    if seq.len() < 3 || !seq.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    seq.parse().ok()
}
