use docbench_core::Collection;

use crate::plan::*;

/// Q18: the 100 most expensive orders with more than 300 units in total.
pub fn pipeline() -> Pipeline {
    Pipeline::scan(Collection::LineItem)
        .group(
            Group::by(field("l_orderkey"))
                .with("sum_qty", Accumulator::Sum(field("l_quantity"))),
        )
        .filter(Predicate::gt("sum_qty", 300))
        .join(Collection::Orders, "_id", "o_orderkey", "orders")
        .join(Collection::Customer, "orders.o_custkey", "c_custkey", "customer")
        .reshape(
            Reshape::new()
                .field("c_name", field("customer.c_name"))
                .field("c_custkey", field("customer.c_custkey"))
                .field("o_orderkey", field("orders.o_orderkey"))
                .field("o_orderdate", field("orders.o_orderdate"))
                .field("o_totalprice", field("orders.o_totalprice"))
                .keep("sum_qty"),
        )
        .sort([desc("o_totalprice"), asc("o_orderdate")])
        .limit(100)
}
