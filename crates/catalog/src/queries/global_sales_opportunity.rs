use docbench_core::Collection;

use crate::plan::*;

const COUNTRY_CODES: &str = "^(13|31|23|29|30|18|17)";

/// Q22: customers in seven country codes with an above-average positive
/// balance who never ordered, counted and summed per country code.
pub fn pipeline() -> Pipeline {
    let no_orders = Pipeline::scan(Collection::Orders);

    let candidates = Pipeline::scan(Collection::Customer)
        .filter(Predicate::all([
            Predicate::matches("c_phone", Pattern::new(COUNTRY_CODES)),
            Predicate::expr(field("c_acctbal").greater_than(var("avg_acctbal"))),
        ]))
        .correlated(
            CorrelatedJoin::new(no_orders, "orders", Bind::NotExists).on("c_custkey", "o_custkey"),
        )
        .reshape(
            Reshape::new()
                .field("cntrycode", field("c_phone").substr(0, 2))
                .keep("c_acctbal"),
        );

    Pipeline::scan(Collection::Customer)
        .filter(Predicate::all([
            Predicate::matches("c_phone", Pattern::new(COUNTRY_CODES)),
            Predicate::gt("c_acctbal", 0.0),
        ]))
        .group(Group::all().with("avg_acctbal", Accumulator::Avg(field("c_acctbal"))))
        .correlated(
            CorrelatedJoin::new(candidates, "customer", Bind::Flatten)
                .let_var("avg_acctbal", field("avg_acctbal")),
        )
        .group(
            Group::by(field("customer.cntrycode"))
                .with("numcust", Accumulator::Count)
                .with("totacctbal", Accumulator::Sum(field("customer.c_acctbal"))),
        )
        .reshape(
            Reshape::new()
                .field("cntrycode", field("_id"))
                .keep("numcust")
                .keep("totacctbal"),
        )
        .sort([asc("cntrycode")])
}
