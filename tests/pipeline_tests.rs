use approx::assert_relative_eq;
use plotframe::pipeline::{Alignment, DerivedColumn};
use plotframe::{summarize, DataSource, ExpressionErrorKind, Plan, PlanError, TableParser, Transform};

const TWO_BLOCKS: &str = "\
# run 1
x\ty
0\t1
1\t2
2\t4

# run 2
x\ty
3\t8
4\t16
5\t32
5.0\t64
";

fn frames() -> Vec<plotframe::Frame> {
    TableParser::default()
        .parse_blocks_str(TWO_BLOCKS, "runs.tsv")
        .expect("parse")
        .into_inner()
}

#[test]
fn alignment_spans_all_blocks_without_touching_rows() {
    let plan = Plan {
        alignment: Alignment {
            enabled: true,
            column: "x".into(),
        },
        ..Plan::default()
    };
    let out = plan.apply(frames()).unwrap();

    assert_eq!(out.x_range, Some((0.0, 5.0)));
    assert_eq!(out.frames[0].row_count(), 3);
    assert_eq!(out.frames[1].row_count(), 4);
}

#[test]
fn alignment_is_skipped_for_a_single_frame() {
    let plan = Plan {
        alignment: Alignment {
            enabled: true,
            column: "x".into(),
        },
        ..Plan::default()
    };
    let single = TableParser::default()
        .parse_blocks_str("x\n1\n", "one.tsv")
        .unwrap()
        .into_inner();
    assert_eq!(plan.apply(single).unwrap().x_range, None);
}

#[test]
fn derive_filter_align_end_to_end() {
    let plan: Plan = serde_json::from_str(
        r#"{
            "derived_columns": [{"name": "log_y", "expression": "log2(y)"}],
            "filters": [{"column": "log_y", "min": 1.0, "max": 5.0}],
            "alignment": {"enabled": true, "column": "x"}
        }"#,
    )
    .unwrap();
    let out = plan.apply(frames()).unwrap();

    assert!(out.skipped.is_empty());
    assert_eq!(out.frames[0].values("x").unwrap(), &[1.0, 2.0]);
    assert_eq!(out.frames[1].values("x").unwrap(), &[3.0, 4.0, 5.0]);
    assert_relative_eq!(out.frames[1].values("log_y").unwrap()[2], 5.0);
    assert_eq!(out.x_range, Some((1.0, 5.0)));
    assert_eq!(summarize(&out.frames), "(2 blocks, 3 columns, 5 rows)");
}

#[test]
fn derivation_failure_is_skipped_per_frame() {
    let plan = Plan {
        derived_columns: vec![DerivedColumn {
            name: "inv".into(),
            expression: "1 / x".into(),
        }],
        ..Plan::default()
    };
    let out = plan.apply(frames()).unwrap();

    assert_eq!(out.skipped.len(), 1);
    let skipped = &out.skipped[0];
    assert_eq!(skipped.source, DataSource::new("runs.tsv", Some(0)));
    assert_eq!(skipped.source.label(), "runs.tsv (block 1)");
    assert_eq!(skipped.error.kind, ExpressionErrorKind::Infinite);

    assert!(!out.frames[0].contains("inv"));
    assert!(out.frames[1].column("inv").unwrap().is_derived());
}

#[test]
fn filter_on_unknown_column_aborts() {
    let plan = Plan {
        filters: vec![plotframe::RowFilter::new("missing", Some(0.0), None)],
        ..Plan::default()
    };
    let err = plan.apply(frames()).unwrap_err();
    assert!(matches!(err, PlanError::Filter(ref e) if e.name == "missing"));
}

#[test]
fn alignment_on_missing_column_aborts() {
    let plan = Plan {
        alignment: Alignment {
            enabled: true,
            column: "z".into(),
        },
        ..Plan::default()
    };
    assert!(matches!(plan.apply(frames()).unwrap_err(), PlanError::Align(_)));
}

#[test]
fn filtering_twice_matches_filtering_once() {
    let plan = Plan {
        filters: vec![plotframe::RowFilter::new("y", Some(2.0), Some(16.0))],
        ..Plan::default()
    };
    let once = plan.apply(frames()).unwrap().frames;
    let twice = plan.apply(once.clone()).unwrap().frames;
    assert_eq!(once, twice);
}

#[test]
fn preset_transforms() {
    let y = frames()[1].values("y").unwrap().to_vec();
    let out = Transform::Log2.apply(&y).unwrap();
    assert_eq!(out, vec![3.0, 4.0, 5.0, 6.0]);

    let err = Transform::Arcsin.apply(&y).unwrap_err();
    assert_eq!(err.field.as_deref(), Some("data"));
    assert_eq!("INVERSE".parse::<Transform>().unwrap(), Transform::Inverse);
}
