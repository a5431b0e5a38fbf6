use docbench_core::Collection;

use crate::plan::*;

fn is_priority(urgent: bool) -> Expr {
    let priority = || field("orders.o_orderpriority");
    if urgent {
        Expr::or([
            priority().equals(lit("1-URGENT")),
            priority().equals(lit("2-HIGH")),
        ])
    } else {
        Expr::and([
            priority().not_equals(lit("1-URGENT")),
            priority().not_equals(lit("2-HIGH")),
        ])
    }
}

/// Q12: late MAIL/SHIP lines received in 1994, split into high and low
/// order priority counts per ship mode.
pub fn pipeline() -> Pipeline {
    Pipeline::scan(Collection::LineItem)
        .filter(Predicate::all([
            Predicate::is_in("l_shipmode", ["MAIL", "SHIP"]),
            Predicate::expr(Expr::and([
                field("l_commitdate").less_than(field("l_receiptdate")),
                field("l_shipdate").less_than(field("l_commitdate")),
            ])),
            Predicate::range("l_receiptdate", date(1994, 1, 1), date(1995, 1, 1)),
        ]))
        .join(Collection::Orders, "l_orderkey", "o_orderkey", "orders")
        .group(
            Group::by(field("l_shipmode"))
                .with(
                    "high_line_count",
                    Accumulator::SumIf {
                        when: is_priority(true),
                        value: lit(1),
                    },
                )
                .with(
                    "low_line_count",
                    Accumulator::SumIf {
                        when: is_priority(false),
                        value: lit(1),
                    },
                ),
        )
        .reshape(
            Reshape::new()
                .field("l_shipmode", field("_id"))
                .keep("high_line_count")
                .keep("low_line_count"),
        )
        .sort([asc("l_shipmode")])
}
