use docbench_core::Collection;

use crate::plan::*;

/// Q13: how many customers placed each number of ordinary orders,
/// customers without any included.
pub fn pipeline() -> Pipeline {
    let ordinary_orders = Pipeline::scan(Collection::Orders).filter(Predicate::not_matches(
        "o_comment",
        Pattern::ignore_case("special.*requests"),
    ));

    Pipeline::scan(Collection::Customer)
        .correlated(
            CorrelatedJoin::new(ordinary_orders, "c_count", Bind::Count)
                .on("c_custkey", "o_custkey"),
        )
        .group(Group::by(field("c_count")).with("custdist", Accumulator::Count))
        .reshape(Reshape::new().field("c_count", field("_id")).keep("custdist"))
        .sort([desc("custdist"), desc("c_count")])
}
