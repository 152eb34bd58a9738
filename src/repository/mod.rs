//! Data access over SeaORM.
//!
//! Every repository is generic over [`ConnectionTrait`], so the same type serves the
//! plain connection and a [`UnitOfWork`]'s transaction.

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::error::AppResult;

pub mod addresses;
pub mod carts;
pub mod orders;
pub mod products;
pub mod users;

pub use addresses::AddressRepo;
pub use carts::CartRepo;
pub use orders::{NewOrder, NewOrderItem, OrderRepo};
pub use products::ProductRepo;
pub use users::UserRepo;

/// One database transaction plus the repositories bound to it.
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] rolls it back.
pub struct UnitOfWork {
    txn: DatabaseTransaction,
}

impl UnitOfWork {
    pub async fn begin(db: &DatabaseConnection) -> AppResult<Self> {
        let txn = db.begin().await?;
        Ok(Self { txn })
    }

    pub fn products(&self) -> ProductRepo<'_, DatabaseTransaction> {
        ProductRepo::new(&self.txn)
    }

    pub fn carts(&self) -> CartRepo<'_, DatabaseTransaction> {
        CartRepo::new(&self.txn)
    }

    pub fn orders(&self) -> OrderRepo<'_, DatabaseTransaction> {
        OrderRepo::new(&self.txn)
    }

    pub fn addresses(&self) -> AddressRepo<'_, DatabaseTransaction> {
        AddressRepo::new(&self.txn)
    }

    pub async fn commit(self) -> AppResult<()> {
        self.txn.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> AppResult<()> {
        self.txn.rollback().await?;
        Ok(())
    }
}
