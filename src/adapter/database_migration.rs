use sqlx::{MySql, Pool};
use tracing::info;
use crate::adapter::database_error::DatabaseError;

/// 適用順のマイグレーション（外部キーの参照先から順に並べる）
const MIGRATIONS: [(&str, &str); 4] = [
    (
        "001_create_flights_table",
        include_str!("../../migrations/001_create_flights_table.sql"),
    ),
    (
        "002_create_seats_table",
        include_str!("../../migrations/002_create_seats_table.sql"),
    ),
    (
        "003_create_bookings_table",
        include_str!("../../migrations/003_create_bookings_table.sql"),
    ),
    (
        "004_create_booking_passengers_table",
        include_str!("../../migrations/004_create_booking_passengers_table.sql"),
    ),
];

/// スキーマの作成
/// 各マイグレーションは `CREATE TABLE IF NOT EXISTS` のみで構成し、起動のたびに再実行できる
pub struct DatabaseMigration {
    pool: Pool<MySql>,
}

impl DatabaseMigration {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// すべてのマイグレーションを順に実行
    /// 失敗したマイグレーションの名前をエラーに含める
    pub async fn run(&self) -> Result<(), DatabaseError> {
        for (name, sql) in MIGRATIONS {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::MigrationError(format!("{} failed: {}", name, e)))?;
            info!(migration = name, "マイグレーションを実行しました");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent_and_ordered() {
        let mut names: Vec<&str> = MIGRATIONS.iter().map(|(name, _)| *name).collect();
        let declared = names.clone();
        names.sort_unstable();
        assert_eq!(names, declared);

        for (name, sql) in MIGRATIONS {
            assert!(
                sql.to_ascii_uppercase().contains("CREATE TABLE IF NOT EXISTS"),
                "{} is not idempotent",
                name
            );
        }
    }
}
