//! Generación de números de pedido
//!
//! Formato legible `ORD-YYMMDD-NNNN`. El sufijo es aleatorio, así que
//! la unicidad real la garantiza la constraint UNIQUE de la tabla junto
//! con el reintento del repositorio.

use chrono::NaiveDate;
use rand::Rng;

pub fn generate_order_number(date: NaiveDate) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("ORD-{}-{:04}", date.format("%y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_format() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 27).unwrap();
        let number = generate_order_number(date);

        assert!(number.starts_with("ORD-260827-"));
        assert_eq!(number.len(), "ORD-260827-0000".len());
        let suffix = &number["ORD-260827-".len()..];
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }
}
