use docbench_core::Collection;

use crate::plan::*;

fn other_supplier_lines(late_only: bool) -> Pipeline {
    let mut conds = vec![field("l_suppkey").not_equals(var("suppkey"))];
    if late_only {
        conds.push(field("l_receiptdate").greater_than(field("l_commitdate")));
    }
    Pipeline::scan(Collection::LineItem).filter(Predicate::expr(Expr::and(conds)))
}

/// Q21: SAUDI ARABIA suppliers who were the only late supplier on a
/// multi-supplier finished order.
pub fn pipeline() -> Pipeline {
    Pipeline::scan(Collection::LineItem)
        .filter(Predicate::expr(
            field("l_receiptdate").greater_than(field("l_commitdate")),
        ))
        .join(Collection::Supplier, "l_suppkey", "s_suppkey", "supplier")
        .join(Collection::Nation, "supplier.s_nationkey", "n_nationkey", "nation")
        .filter(Predicate::eq("nation.n_name", "SAUDI ARABIA"))
        .join(Collection::Orders, "l_orderkey", "o_orderkey", "orders")
        .filter(Predicate::eq("orders.o_orderstatus", "F"))
        .correlated(
            CorrelatedJoin::new(other_supplier_lines(false), "other_lines", Bind::Exists)
                .on("l_orderkey", "l_orderkey")
                .let_var("suppkey", field("l_suppkey")),
        )
        .correlated(
            CorrelatedJoin::new(other_supplier_lines(true), "late_other_lines", Bind::NotExists)
                .on("l_orderkey", "l_orderkey")
                .let_var("suppkey", field("l_suppkey")),
        )
        .group(Group::by(field("supplier.s_name")).with("numwait", Accumulator::Count))
        .reshape(Reshape::new().field("s_name", field("_id")).keep("numwait"))
        .sort([desc("numwait"), asc("s_name")])
        .limit(100)
}
