use docbench_core::Collection;

use crate::plan::*;

/// Q17: yearly revenue lost if small orders of Brand#23 MED BOX parts were
/// dropped. "Small" is below 20% of the part's average quantity.
pub fn pipeline() -> Pipeline {
    let average = Pipeline::scan(Collection::LineItem)
        .group(Group::all().with("avg_qty", Accumulator::Avg(field("l_quantity"))));

    Pipeline::scan(Collection::Part)
        .filter(Predicate::all([
            Predicate::eq("p_brand", "Brand#23"),
            Predicate::eq("p_container", "MED BOX"),
        ]))
        .correlated(
            CorrelatedJoin::new(average, "part_avg", Bind::Flatten).on("p_partkey", "l_partkey"),
        )
        .join(Collection::LineItem, "p_partkey", "l_partkey", "lineitem")
        .filter(Predicate::expr(
            field("lineitem.l_quantity").less_than(lit(0.2) * field("part_avg.avg_qty")),
        ))
        .group(Group::all().with(
            "avg_yearly",
            Accumulator::Sum(field("lineitem.l_extendedprice") / lit(7.0)),
        ))
        .reshape(Reshape::new().keep("avg_yearly"))
}
