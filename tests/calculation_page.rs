use lscr::{
    calc::{self, CalcHeaders, CalculationSnapshot, MAX_LIST},
    catalog::LotteryType,
};

const PAGE: &str = include_str!("fixtures/calc_page.txt");

#[test]
fn daily_lists_and_single_digits() {
    let tables = calc::extract_calculation(PAGE, &CalcHeaders::default());
    let daily = &tables.daily_calculation;

    assert_eq!(daily.top3, ["123", "456", "789", "321"]);
    assert_eq!(daily.top3_recommended, ["456"]);
    assert_eq!(daily.bottom2, ["12", "34", "56", "78"]);
    assert_eq!(daily.bottom2_recommended, ["34"]);
    assert_eq!(daily.running_number.as_deref(), Some("7"));
    assert_eq!(daily.full_set_number.as_deref(), Some("3"));
}

#[test]
fn frequency_table_has_ten_ordered_rows() {
    let tables = calc::extract_calculation(PAGE, &CalcHeaders::default());
    let digits = tables.digit_frequency.iter().map(|r| r.digit).collect::<Vec<_>>();
    assert_eq!(digits, [0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);

    let seven = &tables.digit_frequency[7];
    assert_eq!((seven.top3_count, seven.bottom2_count, seven.total), (13, 12, 25));
}

#[test]
fn thirty_draw_tables_keep_only_full_width_rows() {
    let stats = calc::extract_calculation(PAGE, &CalcHeaders::default()).statistics_30_draws;

    let bottom2 = stats.bottom2.iter().map(|r| (r.number.as_str(), r.count)).collect::<Vec<_>>();
    assert_eq!(bottom2, [("45", 5), ("07", 4)]);

    let top3 = stats.top3.iter().map(|r| (r.number.as_str(), r.count)).collect::<Vec<_>>();
    assert_eq!(top3, [("123", 3), ("089", 2)]);
}

#[test]
fn long_repeated_lists_stay_capped() {
    let mut page = String::from("3 ตัวบน\n");
    for n in 100..140 {
        page.push_str(&format!("{n} {n} 000\n"));
    }
    let daily = calc::scan_daily(&page, &CalcHeaders::default());
    assert_eq!(daily.top3.len(), MAX_LIST);
    assert_eq!(daily.top3.first().map(String::as_str), Some("100"));
    assert_eq!(daily.top3.last().map(String::as_str), Some("114"));
}

#[test]
fn snapshot_is_flat_json() {
    let tables = calc::extract_calculation(PAGE, &CalcHeaders::default());
    let snapshot = CalculationSnapshot::new(LotteryType::ThaiGovernment, tables);
    let json = serde_json::to_value(&snapshot).unwrap();

    assert_eq!(json["lottery_type"], "thai_government");
    assert_eq!(json["daily_calculation"]["running_number"], "7");
    assert_eq!(json["digit_frequency"][0]["total"], 20);
    assert_eq!(json["statistics_30_draws"]["top3"][1]["number"], "089");
}
