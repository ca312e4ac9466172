//! Seeded synthetic transaction generator.
//!
//! Produces labeled records with a learnable but noisy fraud signal. Used by
//! the `seed_generator` tool to bootstrap a raw dataset and by tests.

use crate::types::TransactionRecord;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const TRANSACTION_TYPES: [&str; 4] = ["P2P", "P2M", "Bill Payment", "Recharge"];
const MERCHANT_CATEGORIES: [&str; 8] = [
    "Entertainment",
    "Food",
    "Fuel",
    "Grocery",
    "Healthcare",
    "Other",
    "Shopping",
    "Utilities",
];
const STATES: [&str; 6] = [
    "Delhi",
    "Karnataka",
    "Maharashtra",
    "Tamil Nadu",
    "Telangana",
    "Uttar Pradesh",
];
const BANKS: [&str; 6] = ["Axis", "HDFC", "ICICI", "IndusInd", "Kotak", "SBI"];
const DEVICES: [&str; 3] = ["Android", "iOS", "Web"];
const NETWORKS: [&str; 4] = ["3G", "4G", "5G", "WiFi"];
const DAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];
const AGE_GROUPS: [&str; 5] = ["18-25", "26-35", "36-45", "46-55", "56+"];

/// Deterministic generator for labeled transactions.
pub struct TransactionGenerator {
    rng: StdRng,
}

impl TransactionGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate a legitimate transaction.
    pub fn generate_legitimate(&mut self) -> TransactionRecord {
        let amount = self.rng.gen_range(10.0..5000.0);
        let hour = self.rng.gen_range(0..24);
        let device = self.random_choice(&DEVICES);
        let network = self.random_choice(&NETWORKS);
        self.build(amount, hour, device, network, 0)
    }

    /// Generate a fraudulent transaction.
    ///
    /// Fraud skews toward large amounts, night hours and web sessions, but
    /// only part of the time, so no feature separates the classes cleanly.
    pub fn generate_suspicious(&mut self) -> TransactionRecord {
        let amount = if self.rng.gen_bool(0.5) {
            self.rng.gen_range(2000.0..20000.0)
        } else {
            self.rng.gen_range(10.0..5000.0)
        };
        let hour = if self.rng.gen_bool(0.4) {
            self.rng.gen_range(0..6)
        } else {
            self.rng.gen_range(0..24)
        };
        let device = if self.rng.gen_bool(0.3) {
            "Web"
        } else {
            self.random_choice(&DEVICES)
        };
        let network = self.random_choice(&NETWORKS);
        self.build(amount, hour, device, network, 1)
    }

    /// Generate exactly `negatives` legitimate and `positives` fraudulent
    /// records in shuffled order.
    pub fn generate_dataset(&mut self, negatives: usize, positives: usize) -> Vec<TransactionRecord> {
        let mut records = Vec::with_capacity(negatives + positives);
        for _ in 0..negatives {
            records.push(self.generate_legitimate());
        }
        for _ in 0..positives {
            records.push(self.generate_suspicious());
        }
        records.shuffle(&mut self.rng);
        records
    }

    fn build(
        &mut self,
        amount: f64,
        hour: u8,
        device: &str,
        network: &str,
        label: u8,
    ) -> TransactionRecord {
        let day = self.random_choice(&DAYS);
        let is_weekend = u8::from(day == "Saturday" || day == "Sunday");

        TransactionRecord {
            amount_inr: (amount * 100.0_f64).round() / 100.0,
            hour_of_day: hour,
            is_weekend,
            transaction_type: self.random_choice(&TRANSACTION_TYPES).to_string(),
            merchant_category: self.random_choice(&MERCHANT_CATEGORIES).to_string(),
            sender_state: self.random_choice(&STATES).to_string(),
            sender_bank: self.random_choice(&BANKS).to_string(),
            receiver_bank: self.random_choice(&BANKS).to_string(),
            device_type: device.to_string(),
            network_type: network.to_string(),
            day_of_week: day.to_string(),
            sender_age_group: self.random_choice(&AGE_GROUPS).to_string(),
            receiver_age_group: self.random_choice(&AGE_GROUPS).to_string(),
            fraud_flag: Some(label),
        }
    }

    fn random_choice(&mut self, choices: &[&'static str]) -> &'static str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}
