use docbench_core::Collection;

use super::disc_price;
use crate::plan::*;

fn nation_pair(supp: &str, cust: &str) -> Predicate {
    Predicate::all([
        Predicate::eq("supp_nation.n_name", supp),
        Predicate::eq("cust_nation.n_name", cust),
    ])
}

/// Q7: 1995-1996 shipping volume between FRANCE and GERMANY, both directions.
pub fn pipeline() -> Pipeline {
    Pipeline::scan(Collection::LineItem)
        .filter(Predicate::between(
            "l_shipdate",
            date(1995, 1, 1),
            date(1996, 12, 31),
        ))
        .join(Collection::Supplier, "l_suppkey", "s_suppkey", "supplier")
        .join(Collection::Orders, "l_orderkey", "o_orderkey", "orders")
        .join(Collection::Customer, "orders.o_custkey", "c_custkey", "customer")
        .join(Collection::Nation, "supplier.s_nationkey", "n_nationkey", "supp_nation")
        .join(Collection::Nation, "customer.c_nationkey", "n_nationkey", "cust_nation")
        .filter(Predicate::any([
            nation_pair("FRANCE", "GERMANY"),
            nation_pair("GERMANY", "FRANCE"),
        ]))
        .reshape(
            Reshape::new()
                .field("supp_nation", field("supp_nation.n_name"))
                .field("cust_nation", field("cust_nation.n_name"))
                .field("l_year", field("l_shipdate").year())
                .field("volume", disc_price("")),
        )
        .group(
            Group::by_fields([
                ("supp_nation", field("supp_nation")),
                ("cust_nation", field("cust_nation")),
                ("l_year", field("l_year")),
            ])
            .with("revenue", Accumulator::Sum(field("volume"))),
        )
        .reshape(
            Reshape::new()
                .key("supp_nation")
                .key("cust_nation")
                .key("l_year")
                .keep("revenue"),
        )
        .sort([asc("supp_nation"), asc("cust_nation"), asc("l_year")])
}
