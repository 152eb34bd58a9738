use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::{
    entity::addresses::{Column as AddrCol, Entity as Addresses, Model as AddressModel},
    error::AppResult,
};

pub struct AddressRepo<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> AddressRepo<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Only returns the address if it belongs to `user_id`.
    pub async fn find_for_user(&self, user_id: Uuid, id: Uuid) -> AppResult<Option<AddressModel>> {
        let address = Addresses::find()
            .filter(
                Condition::all()
                    .add(AddrCol::Id.eq(id))
                    .add(AddrCol::UserId.eq(user_id)),
            )
            .one(self.conn)
            .await?;
        Ok(address)
    }
}
