use docbench_core::Collection;

use super::disc_price;
use crate::plan::*;

/// Q1: per (returnflag, linestatus) totals for lines shipped by 1998-09-02.
pub fn pipeline() -> Pipeline {
    Pipeline::scan(Collection::LineItem)
        .filter(Predicate::lte("l_shipdate", date(1998, 9, 2)))
        .group(
            Group::by_fields([
                ("l_returnflag", field("l_returnflag")),
                ("l_linestatus", field("l_linestatus")),
            ])
            .with("sum_qty", Accumulator::Sum(field("l_quantity")))
            .with("sum_base_price", Accumulator::Sum(field("l_extendedprice")))
            .with("sum_disc_price", Accumulator::Sum(disc_price("")))
            .with(
                "sum_charge",
                Accumulator::Sum(disc_price("") * (lit(1) + field("l_tax"))),
            )
            .with("avg_qty", Accumulator::Avg(field("l_quantity")))
            .with("avg_price", Accumulator::Avg(field("l_extendedprice")))
            .with("avg_disc", Accumulator::Avg(field("l_discount")))
            .with("count_order", Accumulator::Count),
        )
        .reshape(
            Reshape::new()
                .key("l_returnflag")
                .key("l_linestatus")
                .keep("sum_qty")
                .keep("sum_base_price")
                .keep("sum_disc_price")
                .keep("sum_charge")
                .keep("avg_qty")
                .keep("avg_price")
                .keep("avg_disc")
                .keep("count_order"),
        )
        .sort([asc("l_returnflag"), asc("l_linestatus")])
}
