//! Persistencia de pedidos y sus renglones

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::delivery::EstadoEntrega;
use crate::models::order::{Order, OrderItemProgress, OrderStatus};
use crate::services::order_number::generate_order_number;
use crate::utils::errors::AppError;

/// Intentos de inserción ante colisión de order_number
const ORDER_NUMBER_RETRIES: u32 = 5;

pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub unit: String,
}

pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insertar el pedido con número generado. El sufijo aleatorio puede
    /// colisionar; ON CONFLICT DO NOTHING deja la transacción sana y se
    /// reintenta con un número fresco.
    pub async fn insert_order(
        &self,
        conn: &mut PgConnection,
        customer_id: Uuid,
        destination_id: Option<Uuid>,
        status: OrderStatus,
        created_by: Uuid,
    ) -> Result<Order, AppError> {
        let now = Utc::now();
        for _ in 0..ORDER_NUMBER_RETRIES {
            let order_number = generate_order_number(now.date_naive());
            let inserted = sqlx::query_as::<_, Order>(
                r#"
                INSERT INTO orders (id, order_number, customer_id, destination_id, status, created_by, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
                ON CONFLICT (order_number) DO NOTHING
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&order_number)
            .bind(customer_id)
            .bind(destination_id)
            .bind(status)
            .bind(created_by)
            .bind(now)
            .fetch_optional(&mut *conn)
            .await?;

            match inserted {
                Some(order) => return Ok(order),
                None => {
                    tracing::warn!("order_number collision on '{}', retrying", order_number);
                }
            }
        }
        Err(AppError::Internal(
            "could not generate a unique order number".to_string(),
        ))
    }

    pub async fn insert_items(
        &self,
        conn: &mut PgConnection,
        order_id: Uuid,
        items: &[NewOrderItem],
    ) -> Result<(), AppError> {
        for (position, item) in items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, position, quantity, unit_price, unit)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(order_id)
            .bind(item.product_id)
            .bind(position as i32)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(&item.unit)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    /// Bloquea la fila del pedido durante la transacción
    pub async fn find_by_id_locked(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(order)
    }

    pub async fn list(&self) -> Result<Vec<Order>, AppError> {
        let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(orders)
    }

    /// Renglones con su cantidad despachada (SUM sobre delivery_items),
    /// en orden de posición — el orden que usa la asignación de carga
    pub async fn items_progress(
        &self,
        conn: &mut PgConnection,
        order_id: Uuid,
    ) -> Result<Vec<OrderItemProgress>, AppError> {
        let items = sqlx::query_as::<_, OrderItemProgress>(
            r#"
            SELECT oi.id, oi.order_id, oi.product_id, oi.position, oi.quantity, oi.unit_price, oi.unit,
                   COALESCE(SUM(di.dispatched_quantity), 0) AS dispatched_quantity
            FROM order_items oi
            LEFT JOIN delivery_items di ON di.order_item_id = oi.id
            WHERE oi.order_id = $1
            GROUP BY oi.id
            ORDER BY oi.position
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(items)
    }

    /// Igual que items_progress pero fuera de transacción, para lecturas
    pub async fn items_progress_pool(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<OrderItemProgress>, AppError> {
        let mut conn = self.pool.acquire().await?;
        self.items_progress(&mut conn, order_id).await
    }

    /// Estados de todas las entregas del pedido
    pub async fn delivery_estados(
        &self,
        conn: &mut PgConnection,
        order_id: Uuid,
    ) -> Result<Vec<EstadoEntrega>, AppError> {
        let rows: Vec<(EstadoEntrega,)> =
            sqlx::query_as("SELECT estado FROM deliveries WHERE order_id = $1")
                .bind(order_id)
                .fetch_all(&mut *conn)
                .await?;
        Ok(rows.into_iter().map(|(e,)| e).collect())
    }

    pub async fn update_status(
        &self,
        conn: &mut PgConnection,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(order_id)
            .bind(status)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
