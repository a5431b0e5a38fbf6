use docbench_core::Collection;

use crate::plan::*;

/// Q9: profit on "green" parts per supplier nation and order year.
pub fn pipeline() -> Pipeline {
    // partsupp is keyed on (partkey, suppkey), so it needs a correlated lookup
    let offer = Pipeline::scan(Collection::PartSupp).filter(Predicate::expr(Expr::and([
        field("ps_suppkey").equals(var("suppkey")),
        field("ps_partkey").equals(var("partkey")),
    ])));

    let profit = super::disc_price("")
        - field("partsupp.ps_supplycost") * field("l_quantity");

    Pipeline::scan(Collection::LineItem)
        .join(Collection::Part, "l_partkey", "p_partkey", "part")
        .filter(Predicate::matches("part.p_name", Pattern::ignore_case("green")))
        .join(Collection::Supplier, "l_suppkey", "s_suppkey", "supplier")
        .correlated(
            CorrelatedJoin::new(offer, "partsupp", Bind::Flatten)
                .let_var("suppkey", field("l_suppkey"))
                .let_var("partkey", field("l_partkey")),
        )
        .join(Collection::Orders, "l_orderkey", "o_orderkey", "orders")
        .join(Collection::Nation, "supplier.s_nationkey", "n_nationkey", "nation")
        .reshape(
            Reshape::new()
                .field("nation", field("nation.n_name"))
                .field("o_year", field("orders.o_orderdate").year())
                .field("amount", profit),
        )
        .group(
            Group::by_fields([("nation", field("nation")), ("o_year", field("o_year"))])
                .with("sum_profit", Accumulator::Sum(field("amount"))),
        )
        .reshape(
            Reshape::new()
                .key("nation")
                .key("o_year")
                .keep("sum_profit"),
        )
        .sort([asc("nation"), desc("o_year")])
}
