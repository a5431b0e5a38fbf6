use docbench_core::Collection;

use super::disc_price;
use crate::plan::*;

/// Q8: BRAZIL's yearly share of AMERICA's ECONOMY ANODIZED STEEL volume.
pub fn pipeline() -> Pipeline {
    Pipeline::scan(Collection::Region)
        .filter(Predicate::eq("r_name", "AMERICA"))
        .join(Collection::Nation, "r_regionkey", "n_regionkey", "nation")
        .join(Collection::Customer, "nation.n_nationkey", "c_nationkey", "customer")
        .join(Collection::Orders, "customer.c_custkey", "o_custkey", "orders")
        .filter(Predicate::between(
            "orders.o_orderdate",
            date(1995, 1, 1),
            date(1996, 12, 31),
        ))
        .join(Collection::LineItem, "orders.o_orderkey", "l_orderkey", "lineitem")
        .join(Collection::Part, "lineitem.l_partkey", "p_partkey", "part")
        .filter(Predicate::eq("part.p_type", "ECONOMY ANODIZED STEEL"))
        .join(Collection::Supplier, "lineitem.l_suppkey", "s_suppkey", "supplier")
        .join(Collection::Nation, "supplier.s_nationkey", "n_nationkey", "supp_nation")
        .reshape(
            Reshape::new()
                .field("o_year", field("orders.o_orderdate").year())
                .field("volume", disc_price("lineitem"))
                .field("nation", field("supp_nation.n_name")),
        )
        .group(
            Group::by(field("o_year"))
                .with("total_volume", Accumulator::Sum(field("volume")))
                .with(
                    "brazil_volume",
                    Accumulator::SumIf {
                        when: field("nation").equals(lit("BRAZIL")),
                        value: field("volume"),
                    },
                ),
        )
        .reshape(
            Reshape::new()
                .field("o_year", field("_id"))
                .field("mkt_share", field("brazil_volume") / field("total_volume")),
        )
        .sort([asc("o_year")])
}
