use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::sync::diff::{DishPatch, MenuPatch, SubmenuPatch};
use crate::sync::store::{MenuStore, StoreError};
use crate::sync::tree::{DishRecord, MenuRecord, SubmenuRecord};

use super::models::{DishRow, HierarchyRow, MenuRow, SubmenuRow};
use super::DbPool;

pub struct Repository {
    pub pool: DbPool,
}

impl Repository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Ensure the menu hierarchy tables exist.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        let pool = self.pool.get_pool();

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS menus (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS submenus (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                menu_id UUID NOT NULL REFERENCES menus(id) ON DELETE CASCADE,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS dishes (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                price NUMERIC(10, 2) NOT NULL,
                submenu_id UUID NOT NULL REFERENCES submenus(id) ON DELETE CASCADE,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS discounts (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                value NUMERIC(5, 2) NOT NULL,
                dish_id UUID NOT NULL UNIQUE REFERENCES dishes(id) ON DELETE CASCADE,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_submenus_menu_id ON submenus(menu_id)")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_dishes_submenu_id ON dishes(submenu_id)")
            .execute(pool)
            .await?;

        debug!("Menu hierarchy tables ensured");
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1")
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    // ============ menus ============

    pub async fn list_menus(&self) -> Result<Vec<MenuRow>, sqlx::Error> {
        sqlx::query_as::<_, MenuRow>("SELECT id, title, description FROM menus ORDER BY id")
            .fetch_all(self.pool.get_pool())
            .await
    }

    pub async fn get_menu(&self, menu_id: Uuid) -> Result<Option<MenuRow>, sqlx::Error> {
        sqlx::query_as::<_, MenuRow>("SELECT id, title, description FROM menus WHERE id = $1")
            .bind(menu_id)
            .fetch_optional(self.pool.get_pool())
            .await
    }

    /// Submenu and dish counts shown in the menu detail response.
    pub async fn menu_counts(&self, menu_id: Uuid) -> Result<(i64, i64), sqlx::Error> {
        sqlx::query_as::<_, (i64, i64)>(
            r#"SELECT COUNT(DISTINCT s.id), COUNT(d.id)
               FROM submenus s
               LEFT JOIN dishes d ON d.submenu_id = s.id
               WHERE s.menu_id = $1"#,
        )
        .bind(menu_id)
        .fetch_one(self.pool.get_pool())
        .await
    }

    pub async fn create_menu_row(
        &self,
        id: Uuid,
        title: &str,
        description: &str,
    ) -> Result<MenuRow, sqlx::Error> {
        sqlx::query_as::<_, MenuRow>(
            r#"INSERT INTO menus (id, title, description)
               VALUES ($1, $2, $3)
               RETURNING id, title, description"#,
        )
        .bind(id)
        .bind(title)
        .bind(description)
        .fetch_one(self.pool.get_pool())
        .await
    }

    pub async fn update_menu_row(
        &self,
        id: Uuid,
        patch: &MenuPatch,
    ) -> Result<Option<MenuRow>, sqlx::Error> {
        sqlx::query_as::<_, MenuRow>(
            r#"UPDATE menus
               SET title = COALESCE($2, title),
                   description = COALESCE($3, description),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, title, description"#,
        )
        .bind(id)
        .bind(patch.title.as_deref())
        .bind(patch.description.as_deref())
        .fetch_optional(self.pool.get_pool())
        .await
    }

    pub async fn delete_menu_row(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ============ submenus ============

    pub async fn list_submenus(&self, menu_id: Uuid) -> Result<Vec<SubmenuRow>, sqlx::Error> {
        sqlx::query_as::<_, SubmenuRow>(
            "SELECT id, title, description, menu_id FROM submenus WHERE menu_id = $1 ORDER BY id",
        )
        .bind(menu_id)
        .fetch_all(self.pool.get_pool())
        .await
    }

    pub async fn get_submenu(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
    ) -> Result<Option<SubmenuRow>, sqlx::Error> {
        sqlx::query_as::<_, SubmenuRow>(
            "SELECT id, title, description, menu_id FROM submenus WHERE id = $1 AND menu_id = $2",
        )
        .bind(submenu_id)
        .bind(menu_id)
        .fetch_optional(self.pool.get_pool())
        .await
    }

    pub async fn submenu_dish_count(&self, submenu_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(id) FROM dishes WHERE submenu_id = $1")
            .bind(submenu_id)
            .fetch_one(self.pool.get_pool())
            .await
    }

    pub async fn create_submenu_row(
        &self,
        id: Uuid,
        title: &str,
        description: &str,
        menu_id: Uuid,
    ) -> Result<SubmenuRow, sqlx::Error> {
        sqlx::query_as::<_, SubmenuRow>(
            r#"INSERT INTO submenus (id, title, description, menu_id)
               VALUES ($1, $2, $3, $4)
               RETURNING id, title, description, menu_id"#,
        )
        .bind(id)
        .bind(title)
        .bind(description)
        .bind(menu_id)
        .fetch_one(self.pool.get_pool())
        .await
    }

    pub async fn update_submenu_row(
        &self,
        id: Uuid,
        patch: &SubmenuPatch,
    ) -> Result<Option<SubmenuRow>, sqlx::Error> {
        sqlx::query_as::<_, SubmenuRow>(
            r#"UPDATE submenus
               SET title = COALESCE($2, title),
                   description = COALESCE($3, description),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, title, description, menu_id"#,
        )
        .bind(id)
        .bind(patch.title.as_deref())
        .bind(patch.description.as_deref())
        .fetch_optional(self.pool.get_pool())
        .await
    }

    pub async fn delete_submenu_row(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM submenus WHERE id = $1")
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ============ dishes ============

    pub async fn list_dishes(&self, submenu_id: Uuid) -> Result<Vec<DishRow>, sqlx::Error> {
        sqlx::query_as::<_, DishRow>(
            r#"SELECT id, title, description, price, submenu_id
               FROM dishes WHERE submenu_id = $1 ORDER BY id"#,
        )
        .bind(submenu_id)
        .fetch_all(self.pool.get_pool())
        .await
    }

    pub async fn get_dish(
        &self,
        submenu_id: Uuid,
        dish_id: Uuid,
    ) -> Result<Option<DishRow>, sqlx::Error> {
        sqlx::query_as::<_, DishRow>(
            r#"SELECT id, title, description, price, submenu_id
               FROM dishes WHERE id = $1 AND submenu_id = $2"#,
        )
        .bind(dish_id)
        .bind(submenu_id)
        .fetch_optional(self.pool.get_pool())
        .await
    }

    pub async fn create_dish_row(
        &self,
        id: Uuid,
        title: &str,
        description: &str,
        price: Decimal,
        submenu_id: Uuid,
    ) -> Result<DishRow, sqlx::Error> {
        sqlx::query_as::<_, DishRow>(
            r#"INSERT INTO dishes (id, title, description, price, submenu_id)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, title, description, price, submenu_id"#,
        )
        .bind(id)
        .bind(title)
        .bind(description)
        .bind(price)
        .bind(submenu_id)
        .fetch_one(self.pool.get_pool())
        .await
    }

    pub async fn update_dish_row(
        &self,
        id: Uuid,
        patch: &DishPatch,
    ) -> Result<Option<DishRow>, sqlx::Error> {
        sqlx::query_as::<_, DishRow>(
            r#"UPDATE dishes
               SET title = COALESCE($2, title),
                   description = COALESCE($3, description),
                   price = COALESCE($4, price),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, title, description, price, submenu_id"#,
        )
        .bind(id)
        .bind(patch.title.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.price)
        .fetch_optional(self.pool.get_pool())
        .await
    }

    pub async fn delete_dish_row(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM dishes WHERE id = $1")
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ============ hierarchy snapshot ============

    /// The single flattened join feeding both the sync snapshot and the
    /// full-tree endpoint. Left joins keep childless menus and submenus.
    pub async fn hierarchy_rows(&self) -> Result<Vec<HierarchyRow>, sqlx::Error> {
        sqlx::query_as::<_, HierarchyRow>(
            r#"SELECT
                m.id AS menu_id,
                m.title AS menu_title,
                m.description AS menu_description,
                s.id AS submenu_id,
                s.title AS submenu_title,
                s.description AS submenu_description,
                d.id AS dish_id,
                d.title AS dish_title,
                d.description AS dish_description,
                d.price AS dish_price,
                dc.id AS discount_id,
                dc.value AS discount_value
               FROM menus m
               LEFT JOIN submenus s ON s.menu_id = m.id
               LEFT JOIN dishes d ON d.submenu_id = s.id
               LEFT JOIN discounts dc ON dc.dish_id = d.id
               ORDER BY m.id, s.id, d.id"#,
        )
        .fetch_all(self.pool.get_pool())
        .await
    }

    // ============ discounts ============

    pub async fn create_discount_row(
        &self,
        dish_id: Uuid,
        value: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO discounts (id, value, dish_id) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(value)
            .bind(dish_id)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    pub async fn update_discount_row(&self, id: Uuid, value: Decimal) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE discounts SET value = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(value)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    pub async fn delete_discount_row(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM discounts WHERE id = $1")
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MenuStore for Repository {
    async fn hierarchy_snapshot(&self) -> Result<Vec<HierarchyRow>, StoreError> {
        Ok(self.hierarchy_rows().await?)
    }

    async fn insert_menu(&self, record: &MenuRecord) -> Result<(), StoreError> {
        self.create_menu_row(record.id, &record.title, &record.description)
            .await?;
        Ok(())
    }

    async fn update_menu(&self, id: Uuid, patch: &MenuPatch) -> Result<(), StoreError> {
        self.update_menu_row(id, patch).await?;
        Ok(())
    }

    async fn delete_menu(&self, id: Uuid) -> Result<(), StoreError> {
        self.delete_menu_row(id).await?;
        Ok(())
    }

    async fn insert_submenu(&self, record: &SubmenuRecord) -> Result<(), StoreError> {
        self.create_submenu_row(record.id, &record.title, &record.description, record.menu_id)
            .await?;
        Ok(())
    }

    async fn update_submenu(&self, id: Uuid, patch: &SubmenuPatch) -> Result<(), StoreError> {
        self.update_submenu_row(id, patch).await?;
        Ok(())
    }

    async fn delete_submenu(&self, id: Uuid) -> Result<(), StoreError> {
        self.delete_submenu_row(id).await?;
        Ok(())
    }

    async fn insert_dish(&self, record: &DishRecord) -> Result<(), StoreError> {
        self.create_dish_row(
            record.id,
            &record.title,
            &record.description,
            record.price,
            record.submenu_id,
        )
        .await?;
        Ok(())
    }

    async fn update_dish(&self, id: Uuid, patch: &DishPatch) -> Result<(), StoreError> {
        self.update_dish_row(id, patch).await?;
        Ok(())
    }

    async fn delete_dish(&self, id: Uuid) -> Result<(), StoreError> {
        self.delete_dish_row(id).await?;
        Ok(())
    }

    async fn insert_discount(&self, dish_id: Uuid, value: Decimal) -> Result<(), StoreError> {
        self.create_discount_row(dish_id, value).await?;
        Ok(())
    }

    async fn update_discount(&self, id: Uuid, value: Decimal) -> Result<(), StoreError> {
        self.update_discount_row(id, value).await?;
        Ok(())
    }

    async fn delete_discount(&self, id: Uuid) -> Result<(), StoreError> {
        self.delete_discount_row(id).await?;
        Ok(())
    }
}
