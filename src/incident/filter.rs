//! Pure filtering of incident snapshots by search term, severity and status.

use std::str::FromStr;

use serde::Deserialize;

use super::{Incident, IncidentError, Severity, Status};

/// Either every value (`"all"`) or exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selector<T> {
    #[default]
    All,
    Only(T),
}

impl<T: PartialEq> Selector<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == value,
        }
    }
}

impl<T> FromStr for Selector<T>
where
    T: FromStr<Err = IncidentError>,
{
    type Err = IncidentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

/// Conjunctive filter criteria. The default matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub search: Option<String>,
    pub severity: Selector<Severity>,
    pub status: Selector<Status>,
}

/// Raw query-string form of [`FilterCriteria`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl FilterCriteria {
    /// Parse raw filter values. Missing or empty selectors mean `"all"`.
    pub fn parse(
        search: Option<&str>,
        severity: Option<&str>,
        status: Option<&str>,
    ) -> Result<Self, IncidentError> {
        fn selector<T: FromStr<Err = IncidentError>>(
            raw: Option<&str>,
        ) -> Result<Selector<T>, IncidentError> {
            match raw {
                Some(s) if !s.trim().is_empty() => s.parse(),
                _ => Ok(Selector::All),
            }
        }

        Ok(Self {
            search: search.filter(|s| !s.is_empty()).map(str::to_string),
            severity: selector(severity)?,
            status: selector(status)?,
        })
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Selector::Only(severity);
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Selector::Only(status);
        self
    }

    fn matcher(&self) -> impl Fn(&Incident) -> bool + '_ {
        let needle = self
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        move |incident: &Incident| {
            let text_ok = match &needle {
                None => true,
                Some(n) => [&incident.description, &incident.location, &incident.kind]
                    .iter()
                    .any(|field| field.to_lowercase().contains(n.as_str())),
            };
            text_ok
                && self.severity.matches(&incident.severity)
                && self.status.matches(&incident.status)
        }
    }
}

impl TryFrom<FilterQuery> for FilterCriteria {
    type Error = IncidentError;

    fn try_from(q: FilterQuery) -> Result<Self, Self::Error> {
        Self::parse(q.search.as_deref(), q.severity.as_deref(), q.status.as_deref())
    }
}

/// Incidents matching `criteria`, in input order.
pub fn filter(incidents: &[Incident], criteria: &FilterCriteria) -> Vec<Incident> {
    let keep = criteria.matcher();
    incidents.iter().filter(|&i| keep(i)).cloned().collect()
}
