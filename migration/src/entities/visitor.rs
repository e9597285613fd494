//! Visitor entity: one row per browser identity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "visitors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Last visit time (epoch millis), overwritten on every visit
    pub timestamp: i64,
    pub visits: i32,
    pub browser: Option<String>,
    pub device: Option<String>,
    pub screen_size: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::page_view::Entity")]
    PageView,
    #[sea_orm(has_many = "super::session_duration::Entity")]
    SessionDuration,
}

impl Related<super::page_view::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PageView.def()
    }
}

impl Related<super::session_duration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SessionDuration.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
