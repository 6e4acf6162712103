//! Search criteria and their IMAP rendering.

use chrono::NaiveDate;
use maillink_types::SubjectFilter;

/// Which messages a run considers.
///
/// `on` is the local calendar date at run time. The server evaluates the
/// `ON` key against its own internal dates, so the "today" bound is
/// effectively the server's day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionCriteria {
    /// Substring the server should look for in the subject.
    pub subject: String,
    pub on: NaiveDate,
    pub unread_only: bool,
}

impl SelectionCriteria {
    /// Forward-cycle criteria: unread messages from `on`.
    pub fn scheduled(filter: &SubjectFilter, on: NaiveDate) -> Self {
        Self {
            subject: filter.keyword.clone(),
            on,
            unread_only: true,
        }
    }

    /// On-demand criteria: any message from `on`, read or not.
    pub fn on_demand(filter: &SubjectFilter, on: NaiveDate) -> Self {
        Self {
            subject: filter.keyword.clone(),
            on,
            unread_only: false,
        }
    }

    /// Render as an IMAP `SEARCH` key list, e.g.
    /// `UNSEEN SUBJECT "Secure link" ON 05-Mar-2025`.
    pub fn to_imap_query(&self) -> String {
        let mut query = String::new();
        if self.unread_only {
            query.push_str("UNSEEN ");
        }
        query.push_str("SUBJECT ");
        query.push_str(&quote(&self.subject));
        query.push_str(" ON ");
        // chrono's %b is always the English abbreviation.
        query.push_str(&self.on.format("%d-%b-%Y").to_string());
        query
    }
}

/// IMAP quoted string.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn scheduled_query() {
        let c = SelectionCriteria::scheduled(&SubjectFilter::default(), day(2025, 3, 5));
        assert_eq!(c.to_imap_query(), r#"UNSEEN SUBJECT "Secure link" ON 05-Mar-2025"#);
    }

    #[test]
    fn on_demand_query_has_no_unseen() {
        let c = SelectionCriteria::on_demand(&SubjectFilter::default(), day(2024, 12, 31));
        assert_eq!(c.to_imap_query(), r#"SUBJECT "Secure link" ON 31-Dec-2024"#);
    }

    #[test]
    fn quotes_are_escaped() {
        let filter = SubjectFilter {
            keyword: r#"say "hi" \o/"#.into(),
            confirm: "x".into(),
        };
        let c = SelectionCriteria::on_demand(&filter, day(2025, 1, 9));
        assert_eq!(
            c.to_imap_query(),
            r#"SUBJECT "say \"hi\" \\o/" ON 09-Jan-2025"#
        );
    }
}
