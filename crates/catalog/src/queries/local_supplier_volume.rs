use docbench_core::Collection;

use super::disc_price;
use crate::plan::*;

/// Q5: 1994 revenue of ASIA nations from orders placed with suppliers of the
/// customer's own nation.
pub fn pipeline() -> Pipeline {
    Pipeline::scan(Collection::Region)
        .filter(Predicate::eq("r_name", "ASIA"))
        .join(Collection::Nation, "r_regionkey", "n_regionkey", "nation")
        .join(Collection::Customer, "nation.n_nationkey", "c_nationkey", "customer")
        .join(Collection::Orders, "customer.c_custkey", "o_custkey", "orders")
        .filter(Predicate::range(
            "orders.o_orderdate",
            date(1994, 1, 1),
            date(1995, 1, 1),
        ))
        .join(Collection::LineItem, "orders.o_orderkey", "l_orderkey", "lineitem")
        .join(Collection::Supplier, "lineitem.l_suppkey", "s_suppkey", "supplier")
        .filter(Predicate::expr(
            field("supplier.s_nationkey").equals(field("nation.n_nationkey")),
        ))
        .group(
            Group::by(field("nation.n_name"))
                .with("revenue", Accumulator::Sum(disc_price("lineitem"))),
        )
        .reshape(Reshape::new().field("n_name", field("_id")).keep("revenue"))
        .sort([desc("revenue")])
}
