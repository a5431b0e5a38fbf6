use docbench_core::Collection;

use crate::plan::*;

const FRACTION: f64 = 0.0001;

/// Q11: GERMANY's parts whose stock value exceeds a fraction of the
/// nation's total stock value.
pub fn pipeline() -> Pipeline {
    let threshold = vec![
        Stage::Group(Group::all().with("total_value", Accumulator::Sum(field("value")))),
        Stage::Reshape(
            Reshape::new().field("threshold", field("total_value") * lit(FRACTION)),
        ),
    ];
    let per_part = vec![Stage::Reshape(
        Reshape::new().field("ps_partkey", field("_id")).keep("value"),
    )];

    Pipeline::scan(Collection::Nation)
        .filter(Predicate::eq("n_name", "GERMANY"))
        .join(Collection::Supplier, "n_nationkey", "s_nationkey", "supplier")
        .join(Collection::PartSupp, "supplier.s_suppkey", "ps_suppkey", "partsupp")
        .group(Group::by(field("partsupp.ps_partkey")).with(
            "value",
            Accumulator::Sum(field("partsupp.ps_supplycost") * field("partsupp.ps_availqty")),
        ))
        .branch(
            Branch::new()
                .facet("threshold", threshold)
                .facet("part", per_part),
        )
        .filter(Predicate::expr(
            field("part.value").greater_than(field("threshold.threshold")),
        ))
        .reshape(
            Reshape::new()
                .field("ps_partkey", field("part.ps_partkey"))
                .field("value", field("part.value")),
        )
        .sort([desc("value")])
}
