use sea_orm::{ConnectionTrait, EntityTrait};
use uuid::Uuid;

use crate::{
    entity::users::{Entity as Users, Model as UserModel},
    error::AppResult,
};

pub struct UserRepo<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> UserRepo<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn find(&self, id: Uuid) -> AppResult<Option<UserModel>> {
        Ok(Users::find_by_id(id).one(self.conn).await?)
    }
}
