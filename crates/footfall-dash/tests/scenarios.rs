use chrono::NaiveDate;
use footfall_dash::{
    ColumnRef, Dashboard, DashboardOptions, DateRange, DerivedKind, FilterSpec, Operation,
    Resolution, Role, Selection, Session,
};
use footfall_format::MetricValue;
use footfall_io::{export_csv_bytes, CsvOptions};
use footfall_table::Value;
use pretty_assertions::assert_eq;

const FOUR_ROWS: &str = "\
Date,Ghat,Total_Footfall,Medical_Emergencies
2025-01-13,A,100,1
2025-01-13,B,200,2
2025-01-14,A,150,0
2025-01-14,B,50,3
";

fn session(csv: &str) -> Session {
    Session::from_csv_bytes(csv.as_bytes(), &CsvOptions::default()).expect("load session")
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
}

#[test]
fn ghat_filter_then_sum_by_date() {
    let session = session(FOUR_ROWS);
    let filtered = session
        .filter(&FilterSpec::all().select(Role::Location, "A"))
        .unwrap();
    assert_eq!(filtered.row_count(), 2);

    let result = session
        .aggregate(
            &filtered,
            &[ColumnRef::Role(Role::Date)],
            &[ColumnRef::Role(Role::Footfall)],
            Operation::Sum,
        )
        .unwrap();
    let groups: Vec<(Vec<Value>, Vec<Value>)> = result.groups().collect();
    assert_eq!(
        groups,
        vec![
            (vec![Value::date(day(13))], vec![Value::Number(100.0)]),
            (vec![Value::date(day(14))], vec![Value::Number(150.0)]),
        ]
    );
    let total: f64 = result.series(0).iter().filter_map(Value::as_f64).sum();
    assert_eq!(total, 250.0);
}

#[test]
fn foreign_percent_mean_skips_missing_values() {
    let session = session("Foreign_Visitors_Pct\n10.5\nNaN\n20.0\n");
    let dashboard = Dashboard::build(&session, &FilterSpec::all(), &DashboardOptions::default())
        .unwrap();

    let kpi = dashboard
        .kpis
        .iter()
        .find(|k| k.role == Role::ForeignPct)
        .unwrap();
    assert_eq!(kpi.text, "15.25%");
    assert_eq!(kpi.value, MetricValue::Number(15.25));
}

#[test]
fn dataset_without_location_degrades_to_placeholders() {
    let session = session("Date,Total_Footfall\n2025-01-13,10\n2025-01-14,20\n");
    assert_eq!(session.filter_options().choices(Role::Location), vec!["All"]);

    // Selecting a ghat that cannot exist is ignored, not an error.
    let spec = FilterSpec::all().select(Role::Location, "A");
    let dashboard = Dashboard::build(&session, &spec, &DashboardOptions::default()).unwrap();
    assert_eq!(dashboard.row_count, 2);

    for title in ["Accommodation by Ghat", "Total Footfall by Ghat"] {
        let panel = dashboard.panels.iter().find(|p| p.title == title).unwrap();
        assert!(panel.is_placeholder(), "{title}");
    }
    let by_date = dashboard
        .panels
        .iter()
        .find(|p| p.title == "Total Footfall by Date")
        .unwrap();
    assert!(!by_date.is_placeholder());
}

#[test]
fn unresolved_and_empty_metrics_render_differently() {
    let session = session(FOUR_ROWS);
    let spec = FilterSpec::all().select(Role::Location, "Z");
    let dashboard = Dashboard::build(&session, &spec, &DashboardOptions::default()).unwrap();

    assert_eq!(dashboard.row_count, 0);
    let texts: Vec<(&str, &str)> = dashboard
        .kpis
        .iter()
        .map(|k| (k.label, k.text.as_str()))
        .collect();
    assert_eq!(
        texts,
        vec![
            ("Peak hour footfall", "No data"),
            ("Total footfall", "No data"),
            ("Foreign visitors %", "\u{2014}"),
            ("Meals served daily (approx)", "\u{2014}"),
            ("Social media mentions (approx)", "\u{2014}"),
        ]
    );

    // Charts over zero rows have zero groups.
    let by_date = dashboard
        .panels
        .iter()
        .find(|p| p.title == "Total Footfall by Date")
        .unwrap();
    assert_eq!(by_date.data().unwrap().rows.len(), 0);
}

fn total_footfall_text(session: &Session) -> String {
    let dashboard = Dashboard::build(session, &FilterSpec::all(), &DashboardOptions::default())
        .unwrap();
    let kpi = dashboard
        .kpis
        .iter()
        .find(|k| k.label == "Total footfall")
        .unwrap();
    kpi.text.clone()
}

#[test]
fn stray_text_in_a_footfall_column_is_skipped() {
    let session = session("Ghat,Total_Footfall\nA,100\nB,unknown\nA,50\n");
    assert_eq!(session.roles().column(Role::Footfall), Some("Total_Footfall"));
    assert_eq!(session.table().get_cell(1, 1), Value::Null);
    assert_eq!(total_footfall_text(&session), "150");
}

#[test]
fn footfall_values_after_a_blank_stretch_still_count() {
    let mut csv = String::from("Ghat,Total_Footfall\n");
    for _ in 0..100 {
        csv.push_str("A,\n");
    }
    csv.push_str("A,10\nB,20\n");
    let session = session(&csv);

    assert_eq!(session.table().row_count(), 102);
    assert!(session.roles().is_resolved(Role::Footfall));
    assert_eq!(total_footfall_text(&session), "30");
}

#[test]
fn kpis_over_the_full_dataset() {
    let session = session(FOUR_ROWS);
    let dashboard = Dashboard::build(&session, &FilterSpec::all(), &DashboardOptions::default())
        .unwrap();
    assert_eq!(dashboard.kpis[0].text, "200");
    assert_eq!(dashboard.kpis[1].text, "500");
}

#[test]
fn date_range_compares_calendar_days() {
    let session = session(
        "Date,Total_Footfall\n2025-01-13,1\n2025-01-14 18:30:00,2\n2025-01-15,4\n,8\n",
    );

    let only_14th = session
        .filter(&FilterSpec::all().with_date_range(DateRange::new(day(14), day(14))))
        .unwrap();
    assert_eq!(only_14th.row_count(), 1);

    let from_14th = session
        .filter(&FilterSpec::all().with_date_range(DateRange {
            start: Some(day(14)),
            end: None,
        }))
        .unwrap();
    assert_eq!(from_14th.row_count(), 2);

    let options = session.filter_options();
    assert_eq!(options.date_bounds, Some(DateRange::new(day(13), day(15))));
    assert_eq!(
        options.complete_range(DateRange {
            start: Some(day(14)),
            end: None
        }),
        DateRange::new(day(14), day(15))
    );
}

#[test]
fn day_names_are_derived_from_dates() {
    let session = session(FOUR_ROWS);
    assert_eq!(
        session.day_axis(),
        &Resolution::Derived {
            kind: DerivedKind::DayName,
            column: "DayName".to_owned()
        }
    );

    let dashboard = Dashboard::build(&session, &FilterSpec::all(), &DashboardOptions::default())
        .unwrap();
    let incidents = dashboard.panels[0].data().unwrap();
    assert_eq!(incidents.columns, vec!["DayName", "Medical_Emergencies"]);
    assert_eq!(
        incidents.rows,
        vec![
            vec![Value::string("Monday"), Value::Number(3.0)],
            vec![Value::string("Tuesday"), Value::Number(3.0)],
        ]
    );

    // Derived columns stay out of the preview.
    let preview = dashboard.panels.last().unwrap().data().unwrap();
    assert_eq!(
        preview.columns,
        vec!["Date", "Ghat", "Total_Footfall", "Medical_Emergencies"]
    );
}

#[test]
fn derived_names_do_not_collide() {
    let session = session("Date,DayName,Footfall\n2025-01-13,x,1\n");
    assert_eq!(session.day_axis().column(), Some("DayName_1"));

    let no_date = self::session("Weather,RowIndex\nClear,7\n");
    assert_eq!(
        no_date.day_axis(),
        &Resolution::Derived {
            kind: DerivedKind::RowIndex,
            column: "RowIndex_1".to_owned()
        }
    );
}

#[test]
fn explicit_day_column_wins() {
    let session = session("Day,Date,Security_Incidents\nMon,2025-01-13,2\nMon,2025-01-14,1\n");
    assert_eq!(
        session.day_axis(),
        &Resolution::Resolved {
            column: "Day".to_owned()
        }
    );
    assert_eq!(session.table().column_count(), 3);
}

#[test]
fn waste_groups_by_date_and_ghat() {
    let session = session(
        "Date,Ghat,Waste_Tons\n2025-01-13,B,1\n2025-01-13,A,2\n2025-01-13,B,3\n2025-01-14,A,4\n",
    );
    let dashboard = Dashboard::build(&session, &FilterSpec::all(), &DashboardOptions::default())
        .unwrap();
    let panel = dashboard
        .panels
        .iter()
        .find(|p| p.title == "Waste in Tons by Day and Ghat")
        .unwrap();
    let footfall_dash::PanelContent::Chart { descriptor, data } = &panel.content else {
        panic!("expected a chart");
    };
    assert_eq!(descriptor.group_keys, vec!["Date", "Ghat"]);
    assert_eq!(descriptor.color.as_deref(), Some("Ghat"));
    assert_eq!(
        data.rows,
        vec![
            vec![Value::date(day(13)), Value::string("A"), Value::Number(2.0)],
            vec![Value::date(day(13)), Value::string("B"), Value::Number(4.0)],
            vec![Value::date(day(14)), Value::string("A"), Value::Number(4.0)],
        ]
    );
}

#[test]
fn accommodation_falls_back_to_footfall() {
    let session = session(FOUR_ROWS);
    let dashboard = Dashboard::build(&session, &FilterSpec::all(), &DashboardOptions::default())
        .unwrap();
    let panel = dashboard
        .panels
        .iter()
        .find(|p| p.title == "Accommodation by Ghat")
        .unwrap();
    assert_eq!(
        panel.data().unwrap().rows,
        vec![
            vec![Value::string("A"), Value::Number(250.0)],
            vec![Value::string("B"), Value::Number(250.0)],
        ]
    );
}

#[test]
fn numeric_filter_choices_keep_their_type() {
    let session = session("Peak_Hour,Total_Footfall\n8,10\n18,20\n8,5\n");
    let options = session.filter_options();
    assert_eq!(options.choices(Role::TimeBucket), vec!["All", "8", "18"]);
    assert_eq!(options.parse_choice(Role::TimeBucket, "all"), Selection::All);

    let Selection::Value(eight) = options.parse_choice(Role::TimeBucket, "8") else {
        panic!("expected a value");
    };
    assert_eq!(eight, Value::Number(8.0));
    let filtered = session
        .filter(&FilterSpec::all().select(Role::TimeBucket, eight))
        .unwrap();
    assert_eq!(filtered.row_count(), 2);
}

#[test]
fn export_of_filtered_view_reloads_identically() {
    let session = session(FOUR_ROWS);
    let filtered = session
        .filter(&FilterSpec::all().select(Role::Location, "B"))
        .unwrap();
    let view = session.source_view(&filtered).unwrap();

    let bytes = export_csv_bytes(&view).unwrap();
    let reloaded = session.reload_export(&bytes).unwrap();
    assert_eq!(reloaded.schema(), view.schema());
    assert_eq!(
        reloaded.rows().collect::<Vec<_>>(),
        view.rows().collect::<Vec<_>>()
    );
}

#[test]
fn dashboard_serializes_for_renderers() {
    let session = session(FOUR_ROWS);
    let dashboard = Dashboard::build(&session, &FilterSpec::all(), &DashboardOptions::default())
        .unwrap();
    let json = serde_json::to_value(&dashboard).unwrap();

    assert_eq!(json["row_count"], 4);
    assert_eq!(json["kpis"][1]["text"], "500");
    assert_eq!(json["panels"][3]["status"], "chart");
    assert_eq!(json["panels"][3]["descriptor"]["kind"], "line");
    assert_eq!(json["panels"][3]["data"]["rows"][0][0], "2025-01-13");
    assert_eq!(json["panels"][1]["status"], "placeholder");
}

#[test]
fn reloaded_export_keeps_column_types_of_the_full_dataset() {
    let session = session("Ghat,Code,Total_Footfall\nA,007,1\nB,x,2\n");
    let filtered = session
        .filter(&FilterSpec::all().select(Role::Location, "A"))
        .unwrap();
    let view = session.source_view(&filtered).unwrap();

    let bytes = export_csv_bytes(&view).unwrap();
    assert_eq!(
        String::from_utf8(bytes.clone()).unwrap(),
        "Ghat,Code,Total_Footfall\nA,007,1\n"
    );
    let reloaded = session.reload_export(&bytes).unwrap();
    assert_eq!(reloaded.schema(), view.schema());
    assert_eq!(
        reloaded.row(0),
        vec![Value::string("A"), Value::string("007"), Value::Number(1.0)]
    );
}
