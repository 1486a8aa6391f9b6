pub use sea_orm_migration::prelude::*;

mod iden;
mod m20250801_000001_create_member_table;
mod m20250801_000002_create_cuota_table;
mod m20250815_000001_create_court_tables;
mod m20250815_000002_create_practice_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250801_000001_create_member_table::Migration),
            Box::new(m20250801_000002_create_cuota_table::Migration),
            Box::new(m20250815_000001_create_court_tables::Migration),
            Box::new(m20250815_000002_create_practice_tables::Migration),
        ]
    }
}
