pub mod cart_service;
pub mod maintenance_service;
pub mod order_service;
pub mod webhook_service;
