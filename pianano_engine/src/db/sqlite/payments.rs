use chrono::Utc;
use pnn_common::RawNano;
use sqlx::SqliteConnection;

use crate::{
    db::traits::{DonationTotals, StoreError},
    db_types::{NewPayment, Payment},
};

pub async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<i64, StoreError> {
    let result = sqlx::query("INSERT INTO payments (address, amount, created_at) VALUES ($1, $2, $3)")
        .bind(&payment.address)
        .bind(payment.amount.value().to_string())
        .bind(Utc::now())
        .execute(conn)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn fetch_payments_for_address(
    address: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, StoreError> {
    let payments = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE address = ? ORDER BY id")
        .bind(address)
        .fetch_all(conn)
        .await?;
    Ok(payments)
}

/// Count and sum over every payment row. Amounts are summed in Rust since they are stored as
/// TEXT; the payments table stays small (one row per play).
pub async fn donation_totals(conn: &mut SqliteConnection) -> Result<DonationTotals, StoreError> {
    let amounts = sqlx::query_scalar::<_, String>("SELECT amount FROM payments").fetch_all(conn).await?;
    let count = amounts.len() as i64;
    let mut total = RawNano::default();
    for amount in amounts {
        let amount = amount
            .parse::<RawNano>()
            .map_err(|e| StoreError::CorruptRow(format!("payment amount: {e}")))?;
        total = total
            .checked_add(amount)
            .ok_or_else(|| StoreError::CorruptRow("payment total overflows u128".to_string()))?;
    }
    Ok(DonationTotals { count, total })
}
