//! Persistencia de entregas (viajes) y sus renglones de despacho

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::delivery::{Delivery, DeliveryItem};
use crate::utils::errors::AppError;

pub struct DeliveryRepository {
    pool: PgPool,
}

impl DeliveryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        order_id: Uuid,
        truck_id: Uuid,
        driver_id: Uuid,
        created_by: Uuid,
    ) -> Result<Delivery, AppError> {
        let delivery = sqlx::query_as::<_, Delivery>(
            r#"
            INSERT INTO deliveries (id, order_id, truck_id, driver_id, estado, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'ASIGNADA', $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(truck_id)
        .bind(driver_id)
        .bind(created_by)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
        Ok(delivery)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Delivery>, AppError> {
        let delivery = sqlx::query_as::<_, Delivery>("SELECT * FROM deliveries WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(delivery)
    }

    /// Bloquea la fila de la entrega: serializa transiciones concurrentes
    /// sobre el mismo viaje
    pub async fn find_by_id_locked(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Delivery>, AppError> {
        let delivery =
            sqlx::query_as::<_, Delivery>("SELECT * FROM deliveries WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        Ok(delivery)
    }

    pub async fn list_by_order(&self, order_id: Uuid) -> Result<Vec<Delivery>, AppError> {
        let deliveries = sqlx::query_as::<_, Delivery>(
            "SELECT * FROM deliveries WHERE order_id = $1 ORDER BY created_at",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(deliveries)
    }

    pub async fn items_for_delivery(
        &self,
        delivery_id: Uuid,
    ) -> Result<Vec<DeliveryItem>, AppError> {
        let items = sqlx::query_as::<_, DeliveryItem>(
            "SELECT * FROM delivery_items WHERE delivery_id = $1",
        )
        .bind(delivery_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// ¿El camión ya tiene una entrega sin terminar?
    pub async fn truck_has_active_delivery(&self, truck_id: Uuid) -> Result<bool, AppError> {
        let result: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM deliveries
                WHERE truck_id = $1 AND estado IN ('ASIGNADA', 'EN_CARGA', 'CARGADA')
            )
            "#,
        )
        .bind(truck_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(result.0)
    }

    /// ¿El chofer ya tiene una entrega sin terminar?
    pub async fn driver_has_active_delivery(&self, driver_id: Uuid) -> Result<bool, AppError> {
        let result: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM deliveries
                WHERE driver_id = $1 AND estado IN ('ASIGNADA', 'EN_CARGA', 'CARGADA')
            )
            "#,
        )
        .bind(driver_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(result.0)
    }

    pub async fn mark_en_carga(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        notes: Option<&str>,
    ) -> Result<Delivery, AppError> {
        let delivery = sqlx::query_as::<_, Delivery>(
            r#"
            UPDATE deliveries
            SET estado = 'EN_CARGA',
                notes = NULLIF(concat_ws(E'\n', notes, $2::text), ''),
                updated_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(notes)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
        Ok(delivery)
    }

    pub async fn mark_cargada(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        loaded_quantity: Decimal,
        load_photo_url: Option<&str>,
        loaded_by: Uuid,
        notes: Option<&str>,
    ) -> Result<Delivery, AppError> {
        let delivery = sqlx::query_as::<_, Delivery>(
            r#"
            UPDATE deliveries
            SET estado = 'CARGADA',
                loaded_quantity = $2,
                load_photo_url = $3,
                loaded_by = $4,
                loaded_at = $5,
                notes = NULLIF(concat_ws(E'\n', notes, $6::text), ''),
                updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(loaded_quantity)
        .bind(load_photo_url)
        .bind(loaded_by)
        .bind(Utc::now())
        .bind(notes)
        .fetch_one(&mut *conn)
        .await?;
        Ok(delivery)
    }

    pub async fn mark_salida_ok(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        exit_photo_url: &str,
        exited_by: Uuid,
        notes: Option<&str>,
    ) -> Result<Delivery, AppError> {
        let delivery = sqlx::query_as::<_, Delivery>(
            r#"
            UPDATE deliveries
            SET estado = 'SALIDA_OK',
                exit_photo_url = $2,
                exited_by = $3,
                exited_at = $4,
                notes = NULLIF(concat_ws(E'\n', notes, $5::text), ''),
                updated_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(exit_photo_url)
        .bind(exited_by)
        .bind(Utc::now())
        .bind(notes)
        .fetch_one(&mut *conn)
        .await?;
        Ok(delivery)
    }

    pub async fn mark_rechazada(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        notes: Option<&str>,
    ) -> Result<Delivery, AppError> {
        let delivery = sqlx::query_as::<_, Delivery>(
            r#"
            UPDATE deliveries
            SET estado = 'RECHAZADA',
                notes = NULLIF(concat_ws(E'\n', notes, $2::text), ''),
                updated_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(notes)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
        Ok(delivery)
    }

    /// Rechaza todas las entregas no terminales de un pedido (cancelación)
    pub async fn reject_active_for_order(
        &self,
        conn: &mut PgConnection,
        order_id: Uuid,
        notes: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE deliveries
            SET estado = 'RECHAZADA',
                notes = NULLIF(concat_ws(E'\n', notes, $2::text), ''),
                updated_at = $3
            WHERE order_id = $1 AND estado IN ('ASIGNADA', 'EN_CARGA')
            "#,
        )
        .bind(order_id)
        .bind(notes)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn insert_delivery_items(
        &self,
        conn: &mut PgConnection,
        delivery_id: Uuid,
        allocations: &[(Uuid, Decimal)],
    ) -> Result<Vec<DeliveryItem>, AppError> {
        let mut items = Vec::with_capacity(allocations.len());
        for (order_item_id, quantity) in allocations {
            let item = sqlx::query_as::<_, DeliveryItem>(
                r#"
                INSERT INTO delivery_items (id, delivery_id, order_item_id, dispatched_quantity)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(delivery_id)
            .bind(order_item_id)
            .bind(quantity)
            .fetch_one(&mut *conn)
            .await?;
            items.push(item);
        }
        Ok(items)
    }
}
