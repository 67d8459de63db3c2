use std::collections::BTreeMap;
use std::fmt;

use footfall_table::{ColumnSchema, ColumnType};
use serde::Serialize;

/// A semantic meaning a column can play, inferred from its name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Date,
    Location,
    TimeBucket,
    Weather,
    Footfall,
    ForeignPct,
    MealsServed,
    SocialMentions,
    Medical,
    Security,
    Waste,
    Accommodation,
    AgeBracket,
    Day,
}

impl Role {
    pub const ALL: [Role; 14] = [
        Role::Date,
        Role::Location,
        Role::TimeBucket,
        Role::Weather,
        Role::Footfall,
        Role::ForeignPct,
        Role::MealsServed,
        Role::SocialMentions,
        Role::Medical,
        Role::Security,
        Role::Waste,
        Role::Accommodation,
        Role::AgeBracket,
        Role::Day,
    ];

    /// Roles offered as categorical filters.
    pub const FILTERS: [Role; 3] = [Role::Location, Role::TimeBucket, Role::Weather];

    /// Lowercase fragments searched for in lowercased column names.
    pub fn patterns(self) -> &'static [&'static str] {
        match self {
            Role::Date => &["date"],
            Role::Location => &["ghat", "location"],
            Role::TimeBucket => &["peak", "time_of_day"],
            Role::Weather => &["weather"],
            Role::Footfall => &["footfall"],
            Role::ForeignPct => &["foreign"],
            Role::MealsServed => &["meal", "served"],
            Role::SocialMentions => &["social", "mentions"],
            Role::Medical => &["medical"],
            Role::Security => &["security", "incident"],
            Role::Waste => &["waste", "trash", "tons"],
            Role::Accommodation => &["accom", "tent"],
            Role::AgeBracket => &["0-18", "19-35", "36-60", "60", "age"],
            Role::Day => &["day"],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Date => "date",
            Role::Location => "location",
            Role::TimeBucket => "time_bucket",
            Role::Weather => "weather",
            Role::Footfall => "footfall",
            Role::ForeignPct => "foreign_pct",
            Role::MealsServed => "meals_served",
            Role::SocialMentions => "social_mentions",
            Role::Medical => "medical",
            Role::Security => "security",
            Role::Waste => "waste",
            Role::Accommodation => "accommodation",
            Role::AgeBracket => "age_bracket",
            Role::Day => "day",
        }
    }

    /// Roles whose values feed sums and means.
    pub fn is_numeric(self) -> bool {
        !matches!(
            self,
            Role::Date | Role::Location | Role::TimeBucket | Role::Weather | Role::Day
        )
    }

    /// Name fragments that mark a column as numeric at load time: every numeric role's
    /// patterns, except the loose `age`/`60` fragments of [`Role::AgeBracket`].
    pub fn number_hints() -> Vec<String> {
        Role::ALL
            .into_iter()
            .filter(|r| r.is_numeric())
            .flat_map(|r| match r {
                Role::AgeBracket => &r.patterns()[..3],
                _ => r.patterns(),
            })
            .map(|p| (*p).to_owned())
            .collect()
    }

    fn matches_name(self, lowered: &str) -> bool {
        match self {
            // Only a column called exactly `day` (any case).
            Role::Day => lowered == "day",
            _ => self.patterns().iter().any(|p| lowered.contains(p)),
        }
    }

    fn accepts(self, column_type: ColumnType) -> bool {
        match self {
            Role::Date => column_type == ColumnType::DateTime,
            r if r.is_numeric() => column_type.is_numeric(),
            _ => true,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Columns found for each role, in declared column order.
///
/// A role with no entry is unresolved; that is an expected state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoleMap {
    entries: BTreeMap<Role, Vec<String>>,
}

impl RoleMap {
    /// The column assigned to `role`: the first match.
    pub fn column(&self, role: Role) -> Option<&str> {
        self.columns(role).first().map(String::as_str)
    }

    /// Every matching column, for charts that plot several series of one role.
    pub fn columns(&self, role: Role) -> &[String] {
        self.entries.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_resolved(&self, role: Role) -> bool {
        self.entries.contains_key(&role)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &str)> + '_ {
        self.entries
            .iter()
            .filter_map(|(role, cols)| cols.first().map(|c| (*role, c.as_str())))
    }
}

/// Assign columns to roles by case-insensitive substring match on their names.
///
/// Each role is matched independently, so one column may serve several roles. Numeric roles
/// skip columns that are not numeric.
pub fn classify(columns: &[ColumnSchema]) -> RoleMap {
    let lowered: Vec<String> = columns.iter().map(|c| c.name.to_lowercase()).collect();
    let mut entries = BTreeMap::new();

    for role in Role::ALL {
        let matched: Vec<String> = columns
            .iter()
            .zip(&lowered)
            .filter(|(c, name)| role.matches_name(name) && role.accepts(c.column_type))
            .map(|(c, _)| c.name.clone())
            .collect();
        if let Some(first) = matched.first() {
            log::debug!("role {role} -> column {first:?}");
            entries.insert(role, matched);
        }
    }

    RoleMap { entries }
}

/// How a column-backed concept was obtained.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    /// An existing column.
    Resolved { column: String },
    /// A column synthesized once when the session was built.
    Derived { kind: DerivedKind, column: String },
    Unresolved,
}

impl Resolution {
    pub fn column(&self) -> Option<&str> {
        match self {
            Resolution::Resolved { column } | Resolution::Derived { column, .. } => Some(column),
            Resolution::Unresolved => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedKind {
    /// Weekday name (`Monday`) of the date column.
    DayName,
    /// Zero-based position of the row in the loaded dataset.
    RowIndex,
}

impl DerivedKind {
    pub fn base_name(self) -> &'static str {
        match self {
            DerivedKind::DayName => "DayName",
            DerivedKind::RowIndex => "RowIndex",
        }
    }
}
