use docbench_core::Collection;

use super::disc_price;
use crate::plan::*;

/// Q14: percentage of September 1995 revenue coming from PROMO parts.
pub fn pipeline() -> Pipeline {
    Pipeline::scan(Collection::LineItem)
        .filter(Predicate::range("l_shipdate", date(1995, 9, 1), date(1995, 10, 1)))
        .join(Collection::Part, "l_partkey", "p_partkey", "part")
        .group(
            Group::all()
                .with(
                    "promo_revenue",
                    Accumulator::SumIf {
                        when: field("part.p_type").regex_match(Pattern::new("^PROMO")),
                        value: disc_price(""),
                    },
                )
                .with("total_revenue", Accumulator::Sum(disc_price(""))),
        )
        .reshape(Reshape::new().field(
            "promo_revenue",
            lit(100.0) * (field("promo_revenue") / field("total_revenue")),
        ))
}
