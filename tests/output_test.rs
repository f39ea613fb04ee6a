//! Post-processor properties: sort, limit, CSV export.

use looker_audit::output::{
    limit_rows, save_csv, sort_rows, Cell, Row, SortDirection, SortKey,
};

#[derive(Debug, Clone, PartialEq)]
struct TestRow {
    explore: String,
    join_count: u64,
}

impl TestRow {
    fn new(explore: &str, join_count: u64) -> Self {
        Self {
            explore: explore.to_string(),
            join_count,
        }
    }
}

impl Row for TestRow {
    fn headers() -> &'static [&'static str] {
        &["explore", "join count"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![self.explore.as_str().into(), self.join_count.into()]
    }
}

fn sample() -> Vec<TestRow> {
    vec![
        TestRow::new("a", 1),
        TestRow::new("b", 0),
        TestRow::new("c", 2),
        TestRow::new("d", 3),
    ]
}

fn key(field: &str, direction: SortDirection) -> SortKey {
    SortKey {
        field: field.to_string(),
        direction,
    }
}

#[test]
fn sort_is_a_noop_without_a_key() {
    let sorted = sort_rows(sample(), None).unwrap();
    assert_eq!(sorted, sample());
}

#[test]
fn sort_ascending_by_text_field() {
    let sorted = sort_rows(sample(), Some(&key("explore", SortDirection::Asc))).unwrap();
    assert_eq!(sorted, sample());
}

#[test]
fn sort_descending_by_count_field() {
    let sorted = sort_rows(sample(), Some(&key("join count", SortDirection::Desc))).unwrap();
    assert_eq!(
        sorted,
        vec![
            TestRow::new("d", 3),
            TestRow::new("c", 2),
            TestRow::new("a", 1),
            TestRow::new("b", 0),
        ]
    );
}

#[test]
fn asc_and_desc_are_reverses_for_duplicate_free_keys() {
    let asc = sort_rows(sample(), Some(&key("join count", SortDirection::Asc))).unwrap();
    let mut desc = sort_rows(sample(), Some(&key("join count", SortDirection::Desc))).unwrap();
    desc.reverse();
    assert_eq!(asc, desc);
}

#[test]
fn sort_is_stable_for_equal_keys() {
    let rows = vec![
        TestRow::new("first", 1),
        TestRow::new("second", 1),
        TestRow::new("third", 1),
    ];
    let sorted = sort_rows(rows.clone(), Some(&key("join count", SortDirection::Desc))).unwrap();
    assert_eq!(sorted, rows);
}

#[test]
fn unknown_sort_field_is_a_validation_error() {
    let err = sort_rows(sample(), Some(&key("invalid field", SortDirection::Asc))).unwrap_err();
    assert_eq!(err.to_string(), "Sort field invalid field not found");
}

#[test]
fn unknown_sort_direction_is_a_validation_error() {
    let err = "invalid".parse::<SortDirection>().unwrap_err();
    assert_eq!(err.to_string(), "Unrecognized sort type: invalid");
    // Direction tokens are case-insensitive.
    assert_eq!("desc".parse::<SortDirection>().unwrap(), SortDirection::Desc);
    assert_eq!("ASC".parse::<SortDirection>().unwrap(), SortDirection::Asc);
}

#[test]
fn limit_truncates_and_none_is_identity() {
    let five = vec![
        TestRow::new("a", 1),
        TestRow::new("b", 2),
        TestRow::new("c", 3),
        TestRow::new("d", 4),
        TestRow::new("e", 5),
    ];
    let limited = limit_rows(five.clone(), Some(2));
    assert_eq!(limited, five[..2].to_vec());
    assert_eq!(limit_rows(five.clone(), None), five);
}

#[test]
fn csv_export_flattens_multiline_cells() {
    let rows = vec![
        TestRow::new("orders\nrefunds", 2),
        TestRow::new("plain", 0),
    ];
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");
    save_csv(&rows, &path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "explore,join count");
    // Embedded newline became a comma, so the cell is quoted.
    assert_eq!(lines[1], "\"orders,refunds\",2");
    assert_eq!(lines[2], "plain,0");
}
