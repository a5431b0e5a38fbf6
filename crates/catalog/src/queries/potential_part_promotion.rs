use docbench_core::Collection;

use crate::plan::*;

/// Q20: CANADA suppliers holding more than half of a forest part's 1994
/// shipped quantity in stock.
pub fn pipeline() -> Pipeline {
    let shipped = Pipeline::scan(Collection::LineItem)
        .filter(Predicate::all([
            Predicate::range("l_shipdate", date(1994, 1, 1), date(1995, 1, 1)),
            Predicate::expr(Expr::and([
                field("l_partkey").equals(var("partkey")),
                field("l_suppkey").equals(var("suppkey")),
            ])),
        ]))
        .group(Group::all().with("total_qty", Accumulator::Sum(field("l_quantity"))));

    Pipeline::scan(Collection::Part)
        .filter(Predicate::matches("p_name", Pattern::ignore_case("^forest")))
        .join(Collection::PartSupp, "p_partkey", "ps_partkey", "partsupp")
        .join(Collection::Supplier, "partsupp.ps_suppkey", "s_suppkey", "supplier")
        .join(Collection::Nation, "supplier.s_nationkey", "n_nationkey", "nation")
        .filter(Predicate::eq("nation.n_name", "CANADA"))
        .correlated(
            CorrelatedJoin::new(shipped, "shipped", Bind::Flatten)
                .let_var("partkey", field("p_partkey"))
                .let_var("suppkey", field("partsupp.ps_suppkey")),
        )
        .filter(Predicate::expr(
            field("partsupp.ps_availqty").greater_than(lit(0.5) * field("shipped.total_qty")),
        ))
        // one row per supplier, however many parts qualified
        .group(Group::by_fields([
            ("s_suppkey", field("supplier.s_suppkey")),
            ("s_name", field("supplier.s_name")),
            ("s_address", field("supplier.s_address")),
        ]))
        .reshape(Reshape::new().key("s_name").key("s_address"))
        .sort([asc("s_name")])
}
