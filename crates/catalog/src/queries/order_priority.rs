use docbench_core::Collection;

use crate::plan::*;

/// Q4: orders of 1993Q3 with at least one line received after its commit
/// date, counted per priority.
pub fn pipeline() -> Pipeline {
    let late_lines = Pipeline::scan(Collection::LineItem)
        .filter(Predicate::expr(field("l_commitdate").less_than(field("l_receiptdate"))));

    Pipeline::scan(Collection::Orders)
        .filter(Predicate::range("o_orderdate", date(1993, 7, 1), date(1993, 10, 1)))
        .correlated(
            CorrelatedJoin::new(late_lines, "late_lines", Bind::Exists)
                .on("o_orderkey", "l_orderkey"),
        )
        .group(Group::by(field("o_orderpriority")).with("order_count", Accumulator::Count))
        .reshape(
            Reshape::new()
                .field("o_orderpriority", field("_id"))
                .keep("order_count"),
        )
        .sort([asc("o_orderpriority")])
}
