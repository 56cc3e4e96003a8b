//! Cross-document reconciliation: delivered quantities against ordered ones, and
//! invoice/payment amounts rolled up onto invoices and clients.

pub mod delivery;
pub mod financial;

pub use delivery::{check_delivery_quantities, compute_delivery_progress, DeliveryProgress};
pub use financial::{
    client_totals, dashboard_summary, recalculate_client_totals, settle_facture, ClientTotals,
    DashboardSummary, Settlement,
};
