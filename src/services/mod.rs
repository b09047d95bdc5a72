pub mod evidence_service;
pub mod fulfillment_service;
pub mod order_number;
