use chrono::Datelike;
use rand::Rng;

use super::domain::Timestamp;

/// `APP-<year>-<5 digits>`.
pub fn application_number<R: Rng + ?Sized>(rng: &mut R, now: Timestamp) -> String {
    let sequence: u32 = rng.gen_range(0..100_000);
    format!("APP-{}-{sequence:05}", now.year())
}

/// `TXN-<unix millis>-<4 digits>`.
pub fn transaction_number<R: Rng + ?Sized>(rng: &mut R, now: Timestamp) -> String {
    let suffix: u16 = rng.gen_range(0..10_000);
    format!("TXN-{}-{suffix:04}", now.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn application_numbers_carry_year_and_padded_sequence() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap();
        for _ in 0..50 {
            let number = application_number(&mut rng, now);
            let (prefix, sequence) = number.split_at("APP-2025-".len());
            assert_eq!(prefix, "APP-2025-");
            assert_eq!(sequence.len(), 5);
            assert!(sequence.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn transaction_numbers_embed_millis() {
        let mut rng = StdRng::seed_from_u64(11);
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap();
        let number = transaction_number(&mut rng, now);
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "TXN");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 4);
    }
}
