use docbench_core::Collection;

use crate::plan::*;

const SIZES: [i32; 8] = [49, 14, 23, 45, 19, 3, 36, 9];

/// Q16: distinct complaint-free suppliers per (brand, type, size).
pub fn pipeline() -> Pipeline {
    Pipeline::scan(Collection::Part)
        .filter(Predicate::all([
            Predicate::ne("p_brand", "Brand#45"),
            Predicate::not_matches("p_type", Pattern::new("^MEDIUM POLISHED")),
            Predicate::is_in("p_size", SIZES),
        ]))
        .join(Collection::PartSupp, "p_partkey", "ps_partkey", "partsupp")
        .join(Collection::Supplier, "partsupp.ps_suppkey", "s_suppkey", "supplier")
        .filter(Predicate::not_matches(
            "supplier.s_comment",
            Pattern::ignore_case("Customer.*Complaints"),
        ))
        .group(
            Group::by_fields([
                ("p_brand", field("p_brand")),
                ("p_type", field("p_type")),
                ("p_size", field("p_size")),
            ])
            .with("suppliers", Accumulator::CollectSet(field("partsupp.ps_suppkey"))),
        )
        .reshape(
            Reshape::new()
                .key("p_brand")
                .key("p_type")
                .key("p_size")
                .field("supplier_cnt", field("suppliers").size()),
        )
        .sort([
            desc("supplier_cnt"),
            asc("p_brand"),
            asc("p_type"),
            asc("p_size"),
        ])
}
