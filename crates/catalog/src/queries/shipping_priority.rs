use docbench_core::Collection;

use super::disc_price;
use crate::plan::*;

/// Q3: the ten highest-revenue unshipped orders of the BUILDING segment.
pub fn pipeline() -> Pipeline {
    let cutoff = date(1995, 3, 15);

    Pipeline::scan(Collection::Customer)
        .filter(Predicate::eq("c_mktsegment", "BUILDING"))
        .join(Collection::Orders, "c_custkey", "o_custkey", "orders")
        .filter(Predicate::lt("orders.o_orderdate", cutoff.clone()))
        .join(Collection::LineItem, "orders.o_orderkey", "l_orderkey", "lineitem")
        .filter(Predicate::gt("lineitem.l_shipdate", cutoff))
        .group(
            Group::by_fields([
                ("l_orderkey", field("orders.o_orderkey")),
                ("o_orderdate", field("orders.o_orderdate")),
                ("o_shippriority", field("orders.o_shippriority")),
            ])
            .with("revenue", Accumulator::Sum(disc_price("lineitem"))),
        )
        .reshape(
            Reshape::new()
                .key("l_orderkey")
                .keep("revenue")
                .key("o_orderdate")
                .key("o_shippriority"),
        )
        .sort([desc("revenue"), asc("o_orderdate")])
        .limit(10)
}
