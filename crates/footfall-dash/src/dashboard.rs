use footfall_format::{format_metric_with_options, FormatOptions, MetricKind, MetricValue};
use footfall_table::{Table, Value};
use serde::Serialize;

use crate::aggregate::{AggregationResult, Operation};
use crate::error::DashResult;
use crate::filter::FilterSpec;
use crate::roles::Role;
use crate::session::{ColumnRef, Session};

#[derive(Clone, Debug, PartialEq)]
pub struct DashboardOptions {
    /// Rows shown by the quick data table.
    pub preview_rows: usize,
    pub format: FormatOptions,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            preview_rows: 10,
            format: FormatOptions::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Kpi {
    pub label: &'static str,
    pub role: Role,
    pub text: String,
    #[serde(skip)]
    pub value: MetricValue,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Treemap,
    Table,
}

/// How the renderer should map a panel's table onto a chart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PanelDescriptor {
    pub kind: ChartKind,
    pub group_keys: Vec<String>,
    pub series: Vec<String>,
    /// Display name for each entry of `series`.
    pub labels: Vec<String>,
    /// Key column used to colour or split series, if any.
    pub color: Option<String>,
}

/// A plain rows-and-columns payload for the renderer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl From<&Table> for TableData {
    fn from(table: &Table) -> Self {
        Self {
            columns: table.column_names().map(str::to_owned).collect(),
            rows: table.rows().collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PanelContent {
    Chart {
        descriptor: PanelDescriptor,
        data: TableData,
    },
    /// The panel's source columns do not exist in this dataset.
    Placeholder { note: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Panel {
    pub title: &'static str,
    #[serde(flatten)]
    pub content: PanelContent,
}

impl Panel {
    pub fn is_placeholder(&self) -> bool {
        matches!(self.content, PanelContent::Placeholder { .. })
    }

    pub fn data(&self) -> Option<&TableData> {
        match &self.content {
            PanelContent::Chart { data, .. } => Some(data),
            PanelContent::Placeholder { .. } => None,
        }
    }
}

/// Every KPI and panel for one filter state.
#[derive(Clone, Debug, Serialize)]
pub struct Dashboard {
    pub row_count: usize,
    pub kpis: Vec<Kpi>,
    pub panels: Vec<Panel>,
}

const KPIS: [(&str, Role, Operation, MetricKind); 5] = [
    ("Peak hour footfall", Role::Footfall, Operation::Max, MetricKind::Count),
    ("Total footfall", Role::Footfall, Operation::Sum, MetricKind::Count),
    ("Foreign visitors %", Role::ForeignPct, Operation::Mean, MetricKind::Percent),
    (
        "Meals served daily (approx)",
        Role::MealsServed,
        Operation::Mean,
        MetricKind::Approx,
    ),
    (
        "Social media mentions (approx)",
        Role::SocialMentions,
        Operation::Sum,
        MetricKind::Count,
    ),
];

const MAX_AGE_SERIES: usize = 4;

impl Dashboard {
    pub fn build(
        session: &Session,
        spec: &FilterSpec,
        options: &DashboardOptions,
    ) -> DashResult<Self> {
        let filtered = session.filter(spec)?;
        let preview = session.source_view(&filtered)?.head(options.preview_rows);
        let builder = PanelBuilder {
            session,
            filtered: &filtered,
        };

        let kpis = KPIS
            .iter()
            .map(|&(label, role, op, kind)| {
                let value = session.metric(&filtered, role, op)?;
                Ok(Kpi {
                    label,
                    role,
                    text: format_metric_with_options(value, kind, &options.format),
                    value,
                })
            })
            .collect::<DashResult<Vec<_>>>()?;

        let panels = vec![
            builder.incidents_by_day()?,
            builder.waste_by_day_and_ghat()?,
            builder.accommodation_by_ghat()?,
            builder.footfall_by_date()?,
            builder.age_and_foreign_share()?,
            builder.footfall_by_ghat()?,
            Panel {
                title: "Quick Data Table",
                content: PanelContent::Chart {
                    descriptor: PanelDescriptor {
                        kind: ChartKind::Table,
                        group_keys: Vec::new(),
                        series: Vec::new(),
                        labels: Vec::new(),
                        color: None,
                    },
                    data: TableData::from(&preview),
                },
            },
        ];

        log::info!(
            "dashboard built over {} of {} rows",
            filtered.row_count(),
            session.table().row_count()
        );
        Ok(Self {
            row_count: filtered.row_count(),
            kpis,
            panels,
        })
    }
}

struct PanelBuilder<'a> {
    session: &'a Session,
    filtered: &'a Table,
}

impl PanelBuilder<'_> {
    fn chart(
        &self,
        title: &'static str,
        kind: ChartKind,
        keys: &[ColumnRef],
        values: &[(ColumnRef, &str)],
        op: Operation,
        note: &str,
    ) -> DashResult<Panel> {
        let refs: Vec<ColumnRef> = values.iter().map(|(r, _)| r.clone()).collect();
        let result = match self.session.aggregate(self.filtered, keys, &refs, op) {
            Ok(result) => result,
            Err(err) if err.is_unavailable() => {
                log::debug!("{title}: {err}");
                return Ok(placeholder(title, note));
            }
            Err(err) => return Err(err),
        };

        let labels = values
            .iter()
            .zip(&result.request().value_columns)
            .map(|((_, label), column)| match *label {
                "" => column.clone(),
                label => label.to_owned(),
            })
            .collect();
        let color = (keys.len() > 1)
            .then(|| result.request().group_keys.last().cloned())
            .flatten();
        Ok(chart_panel(title, kind, &result, labels, color))
    }

    fn incidents_by_day(&self) -> DashResult<Panel> {
        const TITLE: &str = "Medical Emergencies and Security Incidents by Day";
        let roles = self.session.roles();
        let mut values = Vec::new();
        if roles.is_resolved(Role::Medical) {
            values.push((ColumnRef::Role(Role::Medical), "Medical Emergencies"));
        }
        if roles.is_resolved(Role::Security) {
            values.push((ColumnRef::Role(Role::Security), "Security Incidents"));
        }
        if values.is_empty() {
            return Ok(placeholder(TITLE, "No medical or security columns detected."));
        }
        self.chart(
            TITLE,
            ChartKind::Bar,
            &[ColumnRef::DayAxis],
            &values,
            Operation::Sum,
            "No day column available.",
        )
    }

    fn waste_by_day_and_ghat(&self) -> DashResult<Panel> {
        const TITLE: &str = "Waste in Tons by Day and Ghat";
        let roles = self.session.roles();
        let keys = if roles.is_resolved(Role::Date) && roles.is_resolved(Role::Location) {
            vec![ColumnRef::Role(Role::Date), ColumnRef::Role(Role::Location)]
        } else {
            vec![ColumnRef::DayAxis]
        };
        self.chart(
            TITLE,
            ChartKind::Bar,
            &keys,
            &[(ColumnRef::Role(Role::Waste), "")],
            Operation::Sum,
            "No waste column detected.",
        )
    }

    fn accommodation_by_ghat(&self) -> DashResult<Panel> {
        const TITLE: &str = "Accommodation by Ghat";
        let value = if self.session.roles().is_resolved(Role::Accommodation) {
            Role::Accommodation
        } else {
            Role::Footfall
        };
        self.chart(
            TITLE,
            ChartKind::Pie,
            &[ColumnRef::Role(Role::Location)],
            &[(ColumnRef::Role(value), "")],
            Operation::Sum,
            "No accommodation or Ghat columns to show.",
        )
    }

    fn footfall_by_date(&self) -> DashResult<Panel> {
        self.chart(
            "Total Footfall by Date",
            ChartKind::Line,
            &[ColumnRef::Role(Role::Date)],
            &[(ColumnRef::Role(Role::Footfall), "")],
            Operation::Sum,
            "Date or footfall column missing.",
        )
    }

    fn age_and_foreign_share(&self) -> DashResult<Panel> {
        const TITLE: &str = "Avg % Footfall over different Ages and Foreign Tourists";
        let roles = self.session.roles();
        let mut columns: Vec<&String> = roles
            .columns(Role::AgeBracket)
            .iter()
            .take(MAX_AGE_SERIES)
            .collect();
        if let Some(foreign) = roles.columns(Role::ForeignPct).first() {
            if !columns.contains(&foreign) {
                columns.push(foreign);
            }
        }
        if columns.is_empty() {
            return Ok(placeholder(
                TITLE,
                "No age or foreign tourist percentage columns detected.",
            ));
        }

        let values: Vec<(ColumnRef, &str)> = columns
            .into_iter()
            .map(|c| (ColumnRef::Name(c.clone()), ""))
            .collect();
        self.chart(
            TITLE,
            ChartKind::Line,
            &[ColumnRef::DateOrRowIndex],
            &values,
            Operation::Mean,
            "No suitable age/foreign columns detected.",
        )
    }

    fn footfall_by_ghat(&self) -> DashResult<Panel> {
        self.chart(
            "Total Footfall by Ghat",
            ChartKind::Treemap,
            &[ColumnRef::Role(Role::Location)],
            &[(ColumnRef::Role(Role::Footfall), "")],
            Operation::Sum,
            "No Ghat + Footfall columns to build treemap.",
        )
    }
}

fn placeholder(title: &'static str, note: &str) -> Panel {
    Panel {
        title,
        content: PanelContent::Placeholder {
            note: note.to_owned(),
        },
    }
}

fn chart_panel(
    title: &'static str,
    kind: ChartKind,
    result: &AggregationResult,
    labels: Vec<String>,
    color: Option<String>,
) -> Panel {
    let request = result.request();
    Panel {
        title,
        content: PanelContent::Chart {
            descriptor: PanelDescriptor {
                kind,
                group_keys: request.group_keys.clone(),
                series: request.value_columns.clone(),
                labels,
                color,
            },
            data: TableData::from(result.table()),
        },
    }
}
