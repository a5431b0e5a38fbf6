use docbench_core::Collection;

use super::disc_price;
use crate::plan::*;

const CUSTOMER_COLUMNS: [&str; 6] = [
    "c_custkey",
    "c_name",
    "c_acctbal",
    "c_phone",
    "c_address",
    "c_comment",
];

/// Q10: top 20 customers by revenue lost to returns in 1993Q4.
pub fn pipeline() -> Pipeline {
    let mut key: Vec<(&str, Expr)> = CUSTOMER_COLUMNS
        .iter()
        .map(|c| (*c, field(format!("customer.{}", c))))
        .collect();
    key.push(("n_name", field("nation.n_name")));

    Pipeline::scan(Collection::LineItem)
        .filter(Predicate::eq("l_returnflag", "R"))
        .join(Collection::Orders, "l_orderkey", "o_orderkey", "orders")
        .filter(Predicate::range(
            "orders.o_orderdate",
            date(1993, 10, 1),
            date(1994, 1, 1),
        ))
        .join(Collection::Customer, "orders.o_custkey", "c_custkey", "customer")
        .join(Collection::Nation, "customer.c_nationkey", "n_nationkey", "nation")
        .group(Group::by_fields(key).with("revenue", Accumulator::Sum(disc_price(""))))
        .reshape(
            Reshape::new()
                .key("c_custkey")
                .key("c_name")
                .keep("revenue")
                .key("c_acctbal")
                .key("n_name")
                .key("c_address")
                .key("c_phone")
                .key("c_comment"),
        )
        .sort([desc("revenue")])
        .limit(20)
}
