//! Business identifier generation.
//!
//! Bill numbers and payment reference numbers are human-facing and must be
//! unique across all time. The generators pre-check candidates against
//! persisted rows as an optimization; the unique constraints on
//! `transactions.bill_number` and `payments.reference_number` remain the
//! authoritative guard.

use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::{payment, transaction};
use crate::errors::ServiceError;

const BILL_PREFIX: &str = "DVP";
const REFERENCE_RETRIES: usize = 10;

/// Generates a bill number for the given sale timestamp: prefix + yymmdd +
/// staff reference + HHMMSS.
///
/// Collisions are only possible when the same staff member processes two
/// sales within the same second. The fallback chain appends the millisecond
/// component, then a 2-character random suffix, re-checking persisted bill
/// numbers at each step.
pub async fn generate_bill_number<C: ConnectionTrait>(
    conn: &C,
    staff_id: Uuid,
    now: DateTime<Utc>,
) -> Result<String, ServiceError> {
    let staff_ref = short_staff_ref(staff_id);

    let base = bill_base(&staff_ref, now);
    if !bill_number_exists(conn, &base).await? {
        return Ok(base);
    }

    let with_millis = format!("{}{}", base, now.format("%3f"));
    if !bill_number_exists(conn, &with_millis).await? {
        return Ok(with_millis);
    }

    let mut candidate = format!("{}{}", with_millis, random_suffix());
    for _ in 0..REFERENCE_RETRIES {
        if !bill_number_exists(conn, &candidate).await? {
            break;
        }
        candidate = format!("{}{}", with_millis, random_suffix());
    }
    Ok(candidate)
}

/// Generates a payment reference: `REF-` + method code + yymmddHHMMSS +
/// 4 random digits.
///
/// Retries against the uniqueness check, refreshes the timestamp once and
/// retries again; the final fallback returns an unchecked candidate
/// (accepted low-probability risk; the DB constraint still rejects a true
/// collision).
pub async fn generate_payment_reference<C: ConnectionTrait>(
    conn: &C,
    payment_method: &str,
) -> Result<String, ServiceError> {
    let code = payment_method_code(payment_method);

    for attempt in 0..2 {
        let ts = Utc::now().format("%y%m%d%H%M%S").to_string();
        for _ in 0..REFERENCE_RETRIES {
            let candidate = format!("REF-{}{}{}", code, ts, random_digits4());
            if !reference_number_exists(conn, &candidate).await? {
                return Ok(candidate);
            }
        }
        if attempt == 1 {
            // Accepted degraded case: return the short format anyway.
            return Ok(format!("REF-{}{}{}", code, ts, random_digits4()));
        }
    }
    unreachable!("reference generation loop always returns")
}

/// Maps a free-form payment method string to a short reference code.
/// Unknown or blank methods map to the default code rather than failing,
/// so novel payment methods stay accepted.
pub fn payment_method_code(payment_method: &str) -> &'static str {
    let pm = payment_method.trim().to_lowercase();
    if pm.is_empty() {
        return "PAY";
    }
    if pm.contains("cash on delivery") || pm == "cod" {
        return "COD";
    }
    if pm.contains("debit") {
        return "DC";
    }
    if pm.contains("credit") {
        return "CC";
    }
    if pm.contains("cash") {
        return "CASH";
    }
    "PAY"
}

fn bill_base(staff_ref: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}{}{}{}",
        BILL_PREFIX,
        now.format("%y%m%d"),
        staff_ref,
        now.format("%H%M%S")
    )
}

/// Stable short reference for embedding a staff id in a bill number.
fn short_staff_ref(staff_id: Uuid) -> String {
    staff_id.simple().to_string()[..6].to_uppercase()
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..2)
        .map(|_| {
            let chars = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
            chars[rng.gen_range(0..chars.len())] as char
        })
        .collect()
}

fn random_digits4() -> String {
    format!("{:04}", rand::thread_rng().gen_range(0..10_000))
}

async fn bill_number_exists<C: ConnectionTrait>(
    conn: &C,
    bill_number: &str,
) -> Result<bool, ServiceError> {
    Ok(transaction::Entity::find()
        .filter(transaction::Column::BillNumber.eq(bill_number))
        .one(conn)
        .await?
        .is_some())
}

async fn reference_number_exists<C: ConnectionTrait>(
    conn: &C,
    reference_number: &str,
) -> Result<bool, ServiceError> {
    Ok(payment::Entity::find()
        .filter(payment::Column::ReferenceNumber.eq(reference_number))
        .one(conn)
        .await?
        .is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn bill_base_concatenates_prefix_date_staff_time() {
        let now = Utc.with_ymd_and_hms(2025, 6, 13, 15, 30, 0).unwrap();
        assert_eq!(bill_base("14AF03", now), "DVP25061314AF03153000");
    }

    #[test]
    fn staff_ref_is_six_uppercase_hex_chars() {
        let id = Uuid::parse_str("a1b2c3d4-0000-0000-0000-000000000000").unwrap();
        assert_eq!(short_staff_ref(id), "A1B2C3");
    }

    #[test]
    fn method_codes_match_by_substring() {
        assert_eq!(payment_method_code("Cash on Delivery"), "COD");
        assert_eq!(payment_method_code("COD"), "COD");
        assert_eq!(payment_method_code("Visa Debit Card"), "DC");
        assert_eq!(payment_method_code("credit card"), "CC");
        assert_eq!(payment_method_code("Cash"), "CASH");
        assert_eq!(payment_method_code("  cash  "), "CASH");
        assert_eq!(payment_method_code("bank transfer"), "PAY");
        assert_eq!(payment_method_code(""), "PAY");
    }

    #[test]
    fn debit_wins_over_cash_substring() {
        // "debit" is checked before "cash"; method strings containing both
        // classify as debit.
        assert_eq!(payment_method_code("cash-linked debit"), "DC");
    }

    #[test]
    fn random_helpers_have_fixed_width() {
        for _ in 0..50 {
            assert_eq!(random_suffix().len(), 2);
            assert_eq!(random_digits4().len(), 4);
        }
    }
}
