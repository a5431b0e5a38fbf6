use docbench_core::Collection;
use thiserror::Error;

use crate::plan::Pipeline;
use crate::queries;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// No query is defined under this identifier.
    #[error("query {0} is not defined")]
    NotFound(i64),

    /// A plan reads a field that does not belong to the collection it is
    /// submitted against.
    #[error("field '{field}' is not a column of collection '{collection}'")]
    EntryMismatch { collection: Collection, field: String },
}

/// The 22 catalog queries, numbered as in the benchmark definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryId {
    PricingSummary = 1,
    MinimumCostSupplier = 2,
    ShippingPriority = 3,
    OrderPriorityChecking = 4,
    LocalSupplierVolume = 5,
    ForecastingRevenueChange = 6,
    VolumeShipping = 7,
    NationalMarketShare = 8,
    ProductTypeProfit = 9,
    ReturnedItemReporting = 10,
    ImportantStockIdentification = 11,
    ShippingModesAndOrderPriority = 12,
    CustomerDistribution = 13,
    PromotionEffect = 14,
    TopSupplier = 15,
    PartsSupplierRelationship = 16,
    SmallQuantityOrderRevenue = 17,
    LargeVolumeCustomer = 18,
    DiscountedRevenue = 19,
    PotentialPartPromotion = 20,
    SuppliersWhoKeptOrdersWaiting = 21,
    GlobalSalesOpportunity = 22,
}

impl QueryId {
    pub const ALL: [QueryId; 22] = [
        QueryId::PricingSummary,
        QueryId::MinimumCostSupplier,
        QueryId::ShippingPriority,
        QueryId::OrderPriorityChecking,
        QueryId::LocalSupplierVolume,
        QueryId::ForecastingRevenueChange,
        QueryId::VolumeShipping,
        QueryId::NationalMarketShare,
        QueryId::ProductTypeProfit,
        QueryId::ReturnedItemReporting,
        QueryId::ImportantStockIdentification,
        QueryId::ShippingModesAndOrderPriority,
        QueryId::CustomerDistribution,
        QueryId::PromotionEffect,
        QueryId::TopSupplier,
        QueryId::PartsSupplierRelationship,
        QueryId::SmallQuantityOrderRevenue,
        QueryId::LargeVolumeCustomer,
        QueryId::DiscountedRevenue,
        QueryId::PotentialPartPromotion,
        QueryId::SuppliersWhoKeptOrdersWaiting,
        QueryId::GlobalSalesOpportunity,
    ];

    pub fn number(self) -> i64 {
        self as i64
    }

    pub fn name(self) -> &'static str {
        match self {
            QueryId::PricingSummary => "pricing summary report",
            QueryId::MinimumCostSupplier => "minimum cost supplier",
            QueryId::ShippingPriority => "shipping priority",
            QueryId::OrderPriorityChecking => "order priority checking",
            QueryId::LocalSupplierVolume => "local supplier volume",
            QueryId::ForecastingRevenueChange => "forecasting revenue change",
            QueryId::VolumeShipping => "volume shipping",
            QueryId::NationalMarketShare => "national market share",
            QueryId::ProductTypeProfit => "product type profit measure",
            QueryId::ReturnedItemReporting => "returned item reporting",
            QueryId::ImportantStockIdentification => "important stock identification",
            QueryId::ShippingModesAndOrderPriority => "shipping modes and order priority",
            QueryId::CustomerDistribution => "customer distribution",
            QueryId::PromotionEffect => "promotion effect",
            QueryId::TopSupplier => "top supplier",
            QueryId::PartsSupplierRelationship => "parts/supplier relationship",
            QueryId::SmallQuantityOrderRevenue => "small-quantity-order revenue",
            QueryId::LargeVolumeCustomer => "large volume customer",
            QueryId::DiscountedRevenue => "discounted revenue",
            QueryId::PotentialPartPromotion => "potential part promotion",
            QueryId::SuppliersWhoKeptOrdersWaiting => "suppliers who kept orders waiting",
            QueryId::GlobalSalesOpportunity => "global sales opportunity",
        }
    }

    /// Build this query's plan. Every call returns a fresh, independent value.
    pub fn pipeline(self) -> Pipeline {
        match self {
            QueryId::PricingSummary => queries::pricing_summary::pipeline(),
            QueryId::MinimumCostSupplier => queries::minimum_cost_supplier::pipeline(),
            QueryId::ShippingPriority => queries::shipping_priority::pipeline(),
            QueryId::OrderPriorityChecking => queries::order_priority::pipeline(),
            QueryId::LocalSupplierVolume => queries::local_supplier_volume::pipeline(),
            QueryId::ForecastingRevenueChange => queries::forecasting_revenue::pipeline(),
            QueryId::VolumeShipping => queries::volume_shipping::pipeline(),
            QueryId::NationalMarketShare => queries::national_market_share::pipeline(),
            QueryId::ProductTypeProfit => queries::product_type_profit::pipeline(),
            QueryId::ReturnedItemReporting => queries::returned_items::pipeline(),
            QueryId::ImportantStockIdentification => queries::important_stock::pipeline(),
            QueryId::ShippingModesAndOrderPriority => queries::shipping_modes::pipeline(),
            QueryId::CustomerDistribution => queries::customer_distribution::pipeline(),
            QueryId::PromotionEffect => queries::promotion_effect::pipeline(),
            QueryId::TopSupplier => queries::top_supplier::pipeline(),
            QueryId::PartsSupplierRelationship => queries::parts_supplier::pipeline(),
            QueryId::SmallQuantityOrderRevenue => queries::small_quantity_revenue::pipeline(),
            QueryId::LargeVolumeCustomer => queries::large_volume_customer::pipeline(),
            QueryId::DiscountedRevenue => queries::discounted_revenue::pipeline(),
            QueryId::PotentialPartPromotion => queries::potential_part_promotion::pipeline(),
            QueryId::SuppliersWhoKeptOrdersWaiting => queries::suppliers_waiting::pipeline(),
            QueryId::GlobalSalesOpportunity => queries::global_sales_opportunity::pipeline(),
        }
    }
}

impl std::fmt::Display for QueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Q{} ({})", self.number(), self.name())
    }
}

impl TryFrom<i64> for QueryId {
    type Error = CatalogError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        QueryId::ALL
            .into_iter()
            .find(|q| q.number() == raw)
            .ok_or(CatalogError::NotFound(raw))
    }
}

/// Resolve a raw query number to its compiled plan.
///
/// Numbers outside 1..=22 yield [`CatalogError::NotFound`]; callers treat
/// that as "not implemented" rather than as a failure.
pub fn compile(raw_id: i64) -> Result<Pipeline, CatalogError> {
    QueryId::try_from(raw_id).map(QueryId::pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_dense_and_ordered() {
        for (i, q) in QueryId::ALL.iter().enumerate() {
            assert_eq!(q.number(), i as i64 + 1);
            assert_eq!(QueryId::try_from(q.number()).unwrap(), *q);
        }
    }

    #[test]
    fn undefined_ids_are_not_found() {
        for raw in [0, -1, 23, 999, i64::MAX] {
            assert!(matches!(compile(raw), Err(CatalogError::NotFound(n)) if n == raw));
        }
    }

    #[test]
    fn display_includes_number_and_name() {
        assert_eq!(QueryId::TopSupplier.to_string(), "Q15 (top supplier)");
    }

    #[test]
    fn compile_builds_independent_values() {
        let mut a = compile(6).unwrap();
        let b = compile(6).unwrap();
        a.stages.clear();
        assert!(!b.stages.is_empty());
    }
}
