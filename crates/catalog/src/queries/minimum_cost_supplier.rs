use docbench_core::Collection;

use crate::plan::*;

const REGION: &str = "EUROPE";

/// Q2: for each size-15 brass part, the suppliers in EUROPE offering it at
/// the regional minimum supply cost.
pub fn pipeline() -> Pipeline {
    let cheapest = Pipeline::scan(Collection::PartSupp)
        .filter(Predicate::expr(Expr::and([
            field("ps_partkey").equals(var("partkey")),
            field("ps_supplycost").equals(var("mincost")),
        ])))
        .join(Collection::Supplier, "ps_suppkey", "s_suppkey", "supplier")
        .join(Collection::Nation, "supplier.s_nationkey", "n_nationkey", "nation")
        .join(Collection::Region, "nation.n_regionkey", "r_regionkey", "region")
        .filter(Predicate::eq("region.r_name", REGION))
        .join(Collection::Part, "ps_partkey", "p_partkey", "part");

    Pipeline::scan(Collection::Region)
        .filter(Predicate::eq("r_name", REGION))
        .join(Collection::Nation, "r_regionkey", "n_regionkey", "nation")
        .join(Collection::Supplier, "nation.n_nationkey", "s_nationkey", "supplier")
        .join(Collection::PartSupp, "supplier.s_suppkey", "ps_suppkey", "partsupp")
        .join(Collection::Part, "partsupp.ps_partkey", "p_partkey", "part")
        .filter(Predicate::all([
            Predicate::eq("part.p_size", 15),
            Predicate::matches("part.p_type", Pattern::new("BRASS$")),
        ]))
        .group(
            Group::by(field("partsupp.ps_partkey"))
                .with("min_supplycost", Accumulator::Min(field("partsupp.ps_supplycost"))),
        )
        .correlated(
            CorrelatedJoin::new(cheapest, "offer", Bind::Flatten)
                .let_var("partkey", field("_id"))
                .let_var("mincost", field("min_supplycost")),
        )
        .reshape(
            Reshape::new()
                .field("s_acctbal", field("offer.supplier.s_acctbal"))
                .field("s_name", field("offer.supplier.s_name"))
                .field("n_name", field("offer.nation.n_name"))
                .field("p_partkey", field("offer.part.p_partkey"))
                .field("p_mfgr", field("offer.part.p_mfgr"))
                .field("s_address", field("offer.supplier.s_address"))
                .field("s_phone", field("offer.supplier.s_phone"))
                .field("s_comment", field("offer.supplier.s_comment")),
        )
        .sort([
            desc("s_acctbal"),
            asc("n_name"),
            asc("s_name"),
            asc("p_partkey"),
        ])
        .limit(100)
}
