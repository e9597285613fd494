pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20250601_000001_visitor_tables;
mod m20250601_000002_timestamp_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_visitor_tables::Migration),
            Box::new(m20250601_000002_timestamp_indexes::Migration),
        ]
    }
}
