//! Plan semantics checked against small hand-built datasets with the
//! reference executor.

use bson::{doc, Bson, Document};
use docbench_catalog::plan::date;
use docbench_catalog::*;
use docbench_core::Collection;

fn run(id: i64, data: &Dataset) -> Vec<Document> {
    QueryExecutor::execute(&compile(id).unwrap(), data).unwrap()
}

fn number(doc: &Document, key: &str) -> f64 {
    match doc.get(key) {
        Some(Bson::Double(v)) => *v,
        Some(Bson::Int32(v)) => f64::from(*v),
        Some(Bson::Int64(v)) => *v as f64,
        other => panic!("{} is not numeric: {:?}", key, other),
    }
}

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-9
}

fn line(orderkey: i32, suppkey: i32, shipdate: Bson, price: f64, discount: f64, qty: i32) -> Document {
    doc! {
        "l_orderkey": orderkey,
        "l_partkey": 1,
        "l_suppkey": suppkey,
        "l_shipdate": shipdate,
        "l_extendedprice": price,
        "l_discount": discount,
        "l_quantity": qty,
    }
}

// ── Q1 ───────────────────────────────────────────────────────────────

#[test]
fn test_pricing_summary_reports_every_aggregate() {
    let item = |flag: &str,
                status: &str,
                qty: i32,
                price: f64,
                discount: f64,
                tax: f64,
                ship: Bson| {
        doc! {
            "l_returnflag": flag, "l_linestatus": status, "l_quantity": qty,
            "l_extendedprice": price, "l_discount": discount, "l_tax": tax,
            "l_shipdate": ship,
        }
    };
    let data = Dataset::new().with(
        Collection::LineItem,
        [
            item("N", "O", 5, 50.0, 0.0, 0.0, date(1996, 1, 1)),
            item("A", "F", 10, 100.0, 0.1, 0.0, date(1995, 1, 1)),
            item("A", "F", 30, 300.0, 0.0, 0.5, date(1998, 9, 2)),
            // shipped after the cutoff
            item("N", "O", 1000, 1.0, 0.0, 0.0, date(1998, 9, 3)),
        ],
    );
    let rows = run(1, &data);
    assert_eq!(rows.len(), 2);

    let af = &rows[0];
    assert_eq!(
        af.keys().collect::<Vec<_>>(),
        [
            "l_returnflag", "l_linestatus", "sum_qty", "sum_base_price", "sum_disc_price",
            "sum_charge", "avg_qty", "avg_price", "avg_disc", "count_order",
        ]
    );
    assert_eq!(af.get_str("l_returnflag").unwrap(), "A");
    assert_eq!(af.get_str("l_linestatus").unwrap(), "F");
    assert_eq!(number(af, "sum_qty"), 40.0);
    assert!(close(number(af, "sum_base_price"), 400.0));
    assert!(close(number(af, "sum_disc_price"), 390.0));
    assert!(close(number(af, "sum_charge"), 540.0));
    assert!(close(number(af, "avg_qty"), 20.0));
    assert!(close(number(af, "avg_price"), 200.0));
    assert!(close(number(af, "avg_disc"), 0.05));
    assert_eq!(number(af, "count_order"), 2.0);

    let no = &rows[1];
    assert_eq!(no.get_str("l_returnflag").unwrap(), "N");
    assert_eq!(number(no, "sum_qty"), 5.0);
    assert_eq!(number(no, "count_order"), 1.0);
}

// ── Q2 ───────────────────────────────────────────────────────────────

#[test]
fn test_minimum_cost_supplier_keeps_tied_suppliers() {
    let data = Dataset::new()
        .with(
            Collection::Region,
            [
                doc! { "r_regionkey": 3, "r_name": "EUROPE" },
                doc! { "r_regionkey": 2, "r_name": "ASIA" },
            ],
        )
        .with(
            Collection::Nation,
            [
                doc! { "n_nationkey": 7, "n_name": "GERMANY", "n_regionkey": 3 },
                doc! { "n_nationkey": 6, "n_name": "FRANCE", "n_regionkey": 3 },
                doc! { "n_nationkey": 12, "n_name": "JAPAN", "n_regionkey": 2 },
            ],
        )
        .with(
            Collection::Supplier,
            [
                doc! { "s_suppkey": 1, "s_name": "Supplier#1", "s_nationkey": 7, "s_acctbal": 500.0 },
                doc! { "s_suppkey": 2, "s_name": "Supplier#2", "s_nationkey": 6, "s_acctbal": 900.0 },
                doc! { "s_suppkey": 3, "s_name": "Supplier#3", "s_nationkey": 7, "s_acctbal": 100.0 },
                doc! { "s_suppkey": 4, "s_name": "Supplier#4", "s_nationkey": 12, "s_acctbal": 999.0 },
            ],
        )
        .with(
            Collection::Part,
            [
                doc! { "p_partkey": 7, "p_size": 15, "p_type": "LARGE BRUSHED BRASS", "p_mfgr": "Manufacturer#1" },
                doc! { "p_partkey": 8, "p_size": 15, "p_type": "LARGE BRUSHED STEEL", "p_mfgr": "Manufacturer#2" },
            ],
        )
        .with(
            Collection::PartSupp,
            [
                doc! { "ps_partkey": 7, "ps_suppkey": 1, "ps_supplycost": 10.0 },
                doc! { "ps_partkey": 7, "ps_suppkey": 2, "ps_supplycost": 10.0 },
                doc! { "ps_partkey": 7, "ps_suppkey": 3, "ps_supplycost": 20.0 },
                // cheaper, but outside the region
                doc! { "ps_partkey": 7, "ps_suppkey": 4, "ps_supplycost": 5.0 },
                doc! { "ps_partkey": 8, "ps_suppkey": 1, "ps_supplycost": 1.0 },
            ],
        );
    let rows = run(2, &data);
    let picked: Vec<(&str, &str)> = rows
        .iter()
        .map(|r| (r.get_str("s_name").unwrap(), r.get_str("n_name").unwrap()))
        .collect();
    assert_eq!(picked, [("Supplier#2", "FRANCE"), ("Supplier#1", "GERMANY")]);
    for r in &rows {
        assert_eq!(r.get_i32("p_partkey").unwrap(), 7);
        assert_eq!(r.get_str("p_mfgr").unwrap(), "Manufacturer#1");
    }
}

// ── Q6 ───────────────────────────────────────────────────────────────

#[test]
fn test_forecasting_revenue_sums_qualifying_lines() {
    let data = Dataset::new().with(
        Collection::LineItem,
        [
            line(1, 1, date(1994, 3, 1), 100.0, 0.05, 10),
            line(1, 1, date(1994, 6, 1), 200.0, 0.06, 20),
            line(1, 1, date(1994, 12, 31), 300.0, 0.07, 23),
            // quantity too large
            line(1, 1, date(1994, 5, 5), 1000.0, 0.06, 25),
            // outside the year
            line(1, 1, date(1995, 1, 1), 1000.0, 0.06, 1),
            // discount too high
            line(1, 1, date(1994, 5, 5), 1000.0, 0.08, 1),
        ],
    );
    let rows = run(6, &data);
    assert_eq!(rows.len(), 1);
    assert!((number(&rows[0], "revenue") - 38.0).abs() < 1e-9);
    assert_eq!(rows[0].keys().collect::<Vec<_>>(), ["revenue"]);
}

// ── Q13 ──────────────────────────────────────────────────────────────

#[test]
fn test_customer_distribution_counts_customers_without_orders() {
    let data = Dataset::new()
        .with(
            Collection::Customer,
            [doc! { "c_custkey": 1 }, doc! { "c_custkey": 2 }],
        )
        .with(
            Collection::Orders,
            [doc! { "o_orderkey": 1, "o_custkey": 1, "o_comment": "quick delivery" }],
        );
    let rows = run(13, &data);
    assert_eq!(
        rows,
        vec![
            doc! { "c_count": 1, "custdist": 1 },
            doc! { "c_count": 0, "custdist": 1 },
        ]
    );
}

#[test]
fn test_customer_distribution_ignores_special_requests() {
    let data = Dataset::new()
        .with(
            Collection::Customer,
            [doc! { "c_custkey": 1 }, doc! { "c_custkey": 2 }, doc! { "c_custkey": 3 }],
        )
        .with(
            Collection::Orders,
            [
                doc! { "o_orderkey": 1, "o_custkey": 1, "o_comment": "plain" },
                doc! { "o_orderkey": 2, "o_custkey": 3, "o_comment": "Special handling requests" },
            ],
        );
    let rows = run(13, &data);
    assert_eq!(rows[0], doc! { "c_count": 0, "custdist": 2 });
    assert_eq!(rows[1], doc! { "c_count": 1, "custdist": 1 });
}

// ── Q15 ──────────────────────────────────────────────────────────────

#[test]
fn test_top_supplier_keeps_every_tie() {
    let in_quarter = || date(1996, 2, 1);
    let data = Dataset::new()
        .with(
            Collection::LineItem,
            [
                line(1, 1, in_quarter(), 100.0, 0.0, 1),
                line(2, 2, in_quarter(), 60.0, 0.0, 1),
                line(3, 2, in_quarter(), 40.0, 0.0, 1),
                line(4, 3, in_quarter(), 50.0, 0.0, 1),
                // outside the quarter, would otherwise win
                line(5, 3, date(1996, 4, 1), 5000.0, 0.0, 1),
            ],
        )
        .with(
            Collection::Supplier,
            (1..=3).map(|k| doc! { "s_suppkey": k, "s_name": format!("Supplier#{}", k) }),
        );
    let rows = run(15, &data);
    let keys: Vec<i32> = rows.iter().map(|r| r.get_i32("s_suppkey").unwrap()).collect();
    assert_eq!(keys, [1, 2]);
    for r in &rows {
        assert_eq!(number(r, "total_revenue"), 100.0);
    }
}

// ── Q8 ───────────────────────────────────────────────────────────────

#[test]
fn test_national_market_share_splits_by_year() {
    let sold = |orderkey: i32, partkey: i32, suppkey: i32, price: f64| {
        doc! {
            "l_orderkey": orderkey, "l_partkey": partkey, "l_suppkey": suppkey,
            "l_extendedprice": price, "l_discount": 0.0,
        }
    };
    let data = Dataset::new()
        .with(
            Collection::Region,
            [doc! { "r_regionkey": 1, "r_name": "AMERICA" }],
        )
        .with(
            Collection::Nation,
            [
                doc! { "n_nationkey": 2, "n_name": "BRAZIL", "n_regionkey": 1 },
                doc! { "n_nationkey": 24, "n_name": "UNITED STATES", "n_regionkey": 1 },
                doc! { "n_nationkey": 7, "n_name": "GERMANY", "n_regionkey": 3 },
            ],
        )
        .with(
            Collection::Customer,
            [doc! { "c_custkey": 1, "c_nationkey": 24 }],
        )
        .with(
            Collection::Orders,
            [
                doc! { "o_orderkey": 1, "o_custkey": 1, "o_orderdate": date(1995, 6, 1) },
                doc! { "o_orderkey": 2, "o_custkey": 1, "o_orderdate": date(1996, 3, 1) },
                doc! { "o_orderkey": 3, "o_custkey": 1, "o_orderdate": date(1997, 1, 1) },
            ],
        )
        .with(
            Collection::Part,
            [
                doc! { "p_partkey": 1, "p_type": "ECONOMY ANODIZED STEEL" },
                doc! { "p_partkey": 2, "p_type": "PROMO BRUSHED TIN" },
            ],
        )
        .with(
            Collection::Supplier,
            [
                doc! { "s_suppkey": 1, "s_nationkey": 2 },
                doc! { "s_suppkey": 2, "s_nationkey": 7 },
            ],
        )
        .with(
            Collection::LineItem,
            [
                sold(1, 1, 1, 100.0),
                sold(1, 1, 2, 300.0),
                // other part type
                sold(1, 2, 1, 500.0),
                sold(2, 1, 2, 50.0),
                // order outside the window
                sold(3, 1, 1, 1000.0),
            ],
        );
    let rows = run(8, &data);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get_i32("o_year").unwrap(), 1995);
    assert!(close(number(&rows[0], "mkt_share"), 0.25));
    assert_eq!(rows[1].get_i32("o_year").unwrap(), 1996);
    assert_eq!(number(&rows[1], "mkt_share"), 0.0);
}

// ── Q11 ──────────────────────────────────────────────────────────────

#[test]
fn test_important_stock_applies_the_national_threshold() {
    let stock = |partkey: i32, suppkey: i32, cost: f64, qty: i32| {
        doc! { "ps_partkey": partkey, "ps_suppkey": suppkey, "ps_supplycost": cost, "ps_availqty": qty }
    };
    let data = Dataset::new()
        .with(
            Collection::Nation,
            [
                doc! { "n_nationkey": 7, "n_name": "GERMANY" },
                doc! { "n_nationkey": 6, "n_name": "FRANCE" },
            ],
        )
        .with(
            Collection::Supplier,
            [
                doc! { "s_suppkey": 1, "s_nationkey": 7 },
                doc! { "s_suppkey": 2, "s_nationkey": 7 },
                doc! { "s_suppkey": 3, "s_nationkey": 6 },
            ],
        )
        .with(
            Collection::PartSupp,
            [
                stock(1, 1, 100.0, 10_000),
                stock(2, 1, 5.0, 10),
                stock(3, 1, 2.0, 100),
                stock(3, 2, 1.0, 50),
                // counted towards the threshold only if nations leak
                stock(4, 3, 500.0, 10_000),
            ],
        );
    // GERMANY total 1_000_300 => threshold 100.03
    let rows = run(11, &data);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get_i32("ps_partkey").unwrap(), 1);
    assert!(close(number(&rows[0], "value"), 1_000_000.0));
    assert_eq!(rows[1].get_i32("ps_partkey").unwrap(), 3);
    assert!(close(number(&rows[1], "value"), 250.0));
}

// ── Q12 ──────────────────────────────────────────────────────────────

fn shipped(orderkey: i32, mode: &str, ship: Bson, commit: Bson, receipt: Bson) -> Document {
    doc! {
        "l_orderkey": orderkey,
        "l_shipmode": mode,
        "l_shipdate": ship,
        "l_commitdate": commit,
        "l_receiptdate": receipt,
    }
}

#[test]
fn test_shipping_modes_split_priorities() {
    let on_time = |orderkey, mode| {
        shipped(orderkey, mode, date(1994, 2, 1), date(1994, 3, 1), date(1994, 4, 1))
    };
    let data = Dataset::new()
        .with(
            Collection::LineItem,
            [
                on_time(1, "MAIL"),
                on_time(3, "MAIL"),
                on_time(4, "MAIL"),
                on_time(2, "SHIP"),
                on_time(1, "AIR"),
                // received before commit
                shipped(1, "MAIL", date(1994, 2, 1), date(1994, 5, 1), date(1994, 4, 1)),
            ],
        )
        .with(
            Collection::Orders,
            [
                doc! { "o_orderkey": 1, "o_orderpriority": "1-URGENT" },
                doc! { "o_orderkey": 2, "o_orderpriority": "2-HIGH" },
                doc! { "o_orderkey": 3, "o_orderpriority": "3-MEDIUM" },
                doc! { "o_orderkey": 4, "o_orderpriority": "5-LOW" },
            ],
        );
    let rows = run(12, &data);
    assert_eq!(
        rows,
        vec![
            doc! { "l_shipmode": "MAIL", "high_line_count": 1, "low_line_count": 2 },
            doc! { "l_shipmode": "SHIP", "high_line_count": 1, "low_line_count": 0 },
        ]
    );
}

// ── Q4 ───────────────────────────────────────────────────────────────

#[test]
fn test_order_priority_requires_a_late_line() {
    let data = Dataset::new()
        .with(
            Collection::Orders,
            [
                doc! { "o_orderkey": 1, "o_orderdate": date(1993, 8, 1), "o_orderpriority": "1-URGENT" },
                doc! { "o_orderkey": 2, "o_orderdate": date(1993, 8, 1), "o_orderpriority": "1-URGENT" },
                doc! { "o_orderkey": 3, "o_orderdate": date(1993, 9, 1), "o_orderpriority": "2-HIGH" },
            ],
        )
        .with(
            Collection::LineItem,
            [
                doc! { "l_orderkey": 1, "l_commitdate": date(1993, 9, 1), "l_receiptdate": date(1993, 9, 5) },
                doc! { "l_orderkey": 1, "l_commitdate": date(1993, 9, 1), "l_receiptdate": date(1993, 9, 6) },
                doc! { "l_orderkey": 2, "l_commitdate": date(1993, 9, 5), "l_receiptdate": date(1993, 9, 1) },
                doc! { "l_orderkey": 3, "l_commitdate": date(1993, 9, 1), "l_receiptdate": date(1993, 9, 2) },
            ],
        );
    let rows = run(4, &data);
    assert_eq!(
        rows,
        vec![
            doc! { "o_orderpriority": "1-URGENT", "order_count": 1 },
            doc! { "o_orderpriority": "2-HIGH", "order_count": 1 },
        ]
    );
}

// ── Q17 ──────────────────────────────────────────────────────────────

#[test]
fn test_small_quantity_revenue_uses_each_parts_own_average() {
    let sale = |partkey: i32, qty: i32, price: f64| {
        doc! { "l_partkey": partkey, "l_quantity": qty, "l_extendedprice": price }
    };
    let data = Dataset::new()
        .with(
            Collection::Part,
            [
                doc! { "p_partkey": 1, "p_brand": "Brand#23", "p_container": "MED BOX" },
                doc! { "p_partkey": 2, "p_brand": "Brand#23", "p_container": "MED BOX" },
                doc! { "p_partkey": 3, "p_brand": "Brand#11", "p_container": "MED BOX" },
            ],
        )
        .with(
            Collection::LineItem,
            [
                // part 1 averages 15.25, so only quantities below 3.05 count
                sale(1, 10, 1.0),
                sale(1, 10, 1.0),
                sale(1, 40, 1.0),
                sale(1, 1, 700.0),
                // part 2 averages 1: nothing is small relative to it
                sale(2, 1, 70.0),
                sale(2, 1, 70.0),
                // wrong brand
                sale(3, 1, 7000.0),
            ],
        );
    let rows = run(17, &data);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].keys().collect::<Vec<_>>(), ["avg_yearly"]);
    assert!(close(number(&rows[0], "avg_yearly"), 100.0));
}

// ── Q18 ──────────────────────────────────────────────────────────────

#[test]
fn test_large_volume_customer_reports_order_quantity() {
    let data = Dataset::new()
        .with(
            Collection::LineItem,
            [
                doc! { "l_orderkey": 1, "l_quantity": 200 },
                doc! { "l_orderkey": 1, "l_quantity": 150 },
                doc! { "l_orderkey": 2, "l_quantity": 100 },
            ],
        )
        .with(
            Collection::Orders,
            [
                doc! { "o_orderkey": 1, "o_custkey": 7, "o_totalprice": 999.0, "o_orderdate": date(1995, 1, 1) },
                doc! { "o_orderkey": 2, "o_custkey": 7, "o_totalprice": 5.0, "o_orderdate": date(1995, 1, 1) },
            ],
        )
        .with(
            Collection::Customer,
            [doc! { "c_custkey": 7, "c_name": "Customer#7" }],
        );
    let rows = run(18, &data);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_i32("o_orderkey").unwrap(), 1);
    assert_eq!(rows[0].get_str("c_name").unwrap(), "Customer#7");
    assert_eq!(number(&rows[0], "sum_qty"), 350.0);
}

// ── Q20 ──────────────────────────────────────────────────────────────

#[test]
fn test_potential_part_promotion_lists_each_supplier_once() {
    let data = Dataset::new()
        .with(
            Collection::Part,
            [
                doc! { "p_partkey": 1, "p_name": "forest green" },
                doc! { "p_partkey": 2, "p_name": "Forest blue" },
                doc! { "p_partkey": 3, "p_name": "green forest" },
            ],
        )
        .with(
            Collection::PartSupp,
            (1..=3).map(|p| doc! { "ps_partkey": p, "ps_suppkey": 5, "ps_availqty": 100 }),
        )
        .with(
            Collection::Supplier,
            [doc! { "s_suppkey": 5, "s_nationkey": 3, "s_name": "Supplier#5", "s_address": "x" }],
        )
        .with(
            Collection::Nation,
            [doc! { "n_nationkey": 3, "n_name": "CANADA" }],
        )
        .with(
            Collection::LineItem,
            (1..=3).map(|p| {
                doc! { "l_partkey": p, "l_suppkey": 5, "l_shipdate": date(1994, 6, 1), "l_quantity": 10 }
            }),
        );
    let rows = run(20, &data);
    assert_eq!(rows, vec![doc! { "s_name": "Supplier#5", "s_address": "x" }]);
}

// ── Q21 ──────────────────────────────────────────────────────────────

#[test]
fn test_suppliers_waiting_counts_sole_late_suppliers() {
    let on_time = || (date(1996, 1, 10), date(1996, 1, 5));
    let late = || (date(1996, 1, 10), date(1996, 1, 20));
    let delivered = |orderkey: i32, suppkey: i32, (commit, receipt): (Bson, Bson)| {
        doc! {
            "l_orderkey": orderkey, "l_suppkey": suppkey,
            "l_commitdate": commit, "l_receiptdate": receipt,
        }
    };
    let data = Dataset::new()
        .with(
            Collection::Nation,
            [
                doc! { "n_nationkey": 20, "n_name": "SAUDI ARABIA" },
                doc! { "n_nationkey": 7, "n_name": "GERMANY" },
            ],
        )
        .with(
            Collection::Supplier,
            [
                doc! { "s_suppkey": 1, "s_name": "S1", "s_nationkey": 20 },
                doc! { "s_suppkey": 2, "s_name": "S2", "s_nationkey": 20 },
                doc! { "s_suppkey": 3, "s_name": "S3", "s_nationkey": 7 },
            ],
        )
        .with(
            Collection::Orders,
            (1..=4).map(|k| {
                let status = if k == 4 { "O" } else { "F" };
                doc! { "o_orderkey": k, "o_orderstatus": status }
            }),
        )
        .with(
            Collection::LineItem,
            [
                // both suppliers late: neither waited alone
                delivered(1, 1, late()),
                delivered(1, 2, late()),
                // single-supplier order
                delivered(2, 1, late()),
                // only S1 late
                delivered(3, 1, late()),
                delivered(3, 3, on_time()),
                // open order
                delivered(4, 2, late()),
                delivered(4, 3, on_time()),
            ],
        );
    let rows = run(21, &data);
    assert_eq!(rows, vec![doc! { "s_name": "S1", "numwait": 1 }]);
}

// ── Q22 ──────────────────────────────────────────────────────────────

#[test]
fn test_global_sales_opportunity_selects_idle_customers_above_average() {
    let data = Dataset::new()
        .with(
            Collection::Customer,
            [
                doc! { "c_custkey": 1, "c_phone": "13-100", "c_acctbal": 100.0 },
                doc! { "c_custkey": 2, "c_phone": "13-200", "c_acctbal": 300.0 },
                doc! { "c_custkey": 3, "c_phone": "31-300", "c_acctbal": 500.0 },
                doc! { "c_custkey": 4, "c_phone": "99-400", "c_acctbal": 1000.0 },
                doc! { "c_custkey": 5, "c_phone": "17-500", "c_acctbal": -10.0 },
            ],
        )
        .with(
            Collection::Orders,
            [doc! { "o_orderkey": 1, "o_custkey": 3 }],
        );
    // positive balances with matching codes: 100, 300, 500 => average 300
    // the only customer above it has ordered
    assert!(run(22, &data).is_empty());

    // lower the bar so customer 2 qualifies
    let mut cheaper = data.clone();
    cheaper.insert(
        Collection::Customer,
        [doc! { "c_custkey": 6, "c_phone": "18-600", "c_acctbal": 20.0 }],
    );
    // average of 100, 300, 500, 20 = 230
    let rows = run(22, &cheaper);
    assert_eq!(
        rows,
        vec![doc! { "cntrycode": "13", "numcust": 1, "totacctbal": 300.0 }]
    );
}
