use docbench_core::Collection;

use crate::plan::*;

/// Q6: revenue gained by removing small 1994 discounts.
pub fn pipeline() -> Pipeline {
    Pipeline::scan(Collection::LineItem)
        .filter(Predicate::all([
            Predicate::range("l_shipdate", date(1994, 1, 1), date(1995, 1, 1)),
            Predicate::between("l_discount", 0.05, 0.07),
            Predicate::lt("l_quantity", 24),
        ]))
        .group(Group::all().with(
            "revenue",
            Accumulator::Sum(field("l_extendedprice") * field("l_discount")),
        ))
        .reshape(Reshape::new().keep("revenue"))
}
