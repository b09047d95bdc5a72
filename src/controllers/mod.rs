pub mod delivery_controller;
pub mod order_controller;
