//! Plan builders for the 22 catalog queries, one module per query.
//!
//! Each builder is a pure function returning a fresh [`Pipeline`]. Joined
//! rows are nested under singular aliases (`orders`, `customer`, `part`...)
//! so later stages address them as `alias.column`.

use crate::plan::{field, lit, Expr};

pub mod customer_distribution;
pub mod discounted_revenue;
pub mod forecasting_revenue;
pub mod global_sales_opportunity;
pub mod important_stock;
pub mod large_volume_customer;
pub mod local_supplier_volume;
pub mod minimum_cost_supplier;
pub mod national_market_share;
pub mod order_priority;
pub mod parts_supplier;
pub mod potential_part_promotion;
pub mod pricing_summary;
pub mod product_type_profit;
pub mod promotion_effect;
pub mod returned_items;
pub mod shipping_modes;
pub mod shipping_priority;
pub mod small_quantity_revenue;
pub mod suppliers_waiting;
pub mod top_supplier;
pub mod volume_shipping;

fn column(alias: &str, name: &str) -> String {
    if alias.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", alias, name)
    }
}

/// `l_extendedprice * (1 - l_discount)` for the lineitem found under `alias`
/// (empty alias = the row itself).
pub(crate) fn disc_price(alias: &str) -> Expr {
    field(column(alias, "l_extendedprice")) * (lit(1) - field(column(alias, "l_discount")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disc_price_addresses_nested_lineitems() {
        let e = disc_price("lineitem");
        assert_eq!(
            e,
            Expr::Multiply(vec![
                field("lineitem.l_extendedprice"),
                lit(1) - field("lineitem.l_discount"),
            ])
        );
    }
}
