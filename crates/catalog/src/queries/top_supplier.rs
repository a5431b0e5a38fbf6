use docbench_core::Collection;

use super::disc_price;
use crate::plan::*;

/// Q15: every supplier tied for the highest 1996Q1 revenue.
///
/// Revenue per supplier is computed once; a branch pairs each supplier's
/// total with the global maximum so ties survive exactly.
pub fn pipeline() -> Pipeline {
    let maximum = vec![Stage::Group(
        Group::all().with("max_revenue", Accumulator::Max(field("total_revenue"))),
    )];

    Pipeline::scan(Collection::LineItem)
        .filter(Predicate::range("l_shipdate", date(1996, 1, 1), date(1996, 4, 1)))
        .group(
            Group::by(field("l_suppkey"))
                .with("total_revenue", Accumulator::Sum(disc_price(""))),
        )
        .branch(
            Branch::new()
                .facet("top", maximum)
                .facet("revenue", Vec::new()),
        )
        .filter(Predicate::expr(
            field("revenue.total_revenue").equals(field("top.max_revenue")),
        ))
        .join(Collection::Supplier, "revenue._id", "s_suppkey", "supplier")
        .reshape(
            Reshape::new()
                .field("s_suppkey", field("supplier.s_suppkey"))
                .field("s_name", field("supplier.s_name"))
                .field("s_address", field("supplier.s_address"))
                .field("s_phone", field("supplier.s_phone"))
                .field("total_revenue", field("revenue.total_revenue")),
        )
        .sort([asc("s_suppkey")])
}
