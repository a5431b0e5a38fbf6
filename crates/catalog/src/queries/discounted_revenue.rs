use docbench_core::Collection;

use super::disc_price;
use crate::plan::*;

fn bracket(brand: &str, containers: [&str; 4], quantity: (i32, i32), max_size: i32) -> Predicate {
    Predicate::all([
        Predicate::eq("part.p_brand", brand),
        Predicate::is_in("part.p_container", containers),
        Predicate::between("l_quantity", quantity.0, quantity.1),
        Predicate::between("part.p_size", 1, max_size),
    ])
}

/// Q19: revenue of air-shipped, hand-delivered lines in three
/// brand/container/quantity brackets.
pub fn pipeline() -> Pipeline {
    Pipeline::scan(Collection::LineItem)
        .filter(Predicate::all([
            Predicate::is_in("l_shipmode", ["AIR", "AIR REG"]),
            Predicate::eq("l_shipinstruct", "DELIVER IN PERSON"),
        ]))
        .join(Collection::Part, "l_partkey", "p_partkey", "part")
        .filter(Predicate::any([
            bracket("Brand#12", ["SM CASE", "SM BOX", "SM PACK", "SM PKG"], (1, 11), 5),
            bracket("Brand#23", ["MED BAG", "MED BOX", "MED PKG", "MED PACK"], (10, 20), 10),
            bracket("Brand#34", ["LG CASE", "LG BOX", "LG PACK", "LG PKG"], (20, 30), 15),
        ]))
        .group(Group::all().with("revenue", Accumulator::Sum(disc_price(""))))
        .reshape(Reshape::new().keep("revenue"))
}
