pub mod audit_logs;
pub mod cart_items;
pub mod carts;
pub mod products;
pub mod purchases;

pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use products::Entity as Products;
pub use purchases::Entity as Purchases;
