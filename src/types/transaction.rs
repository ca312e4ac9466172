//! Transaction records as they appear in the training data and at scoring time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Continuous and bounded-integer fields, in feature-vector order.
pub const NUMERIC_FIELDS: [&str; 3] = ["amount (INR)", "hour_of_day", "is_weekend"];

/// Categorical fields, in feature-vector order.
pub const CATEGORICAL_FIELDS: [&str; 10] = [
    "transaction type",
    "merchant_category",
    "sender_state",
    "sender_bank",
    "receiver_bank",
    "device_type",
    "network_type",
    "day_of_week",
    "sender_age_group",
    "receiver_age_group",
];

/// Binary fraud label column, present only in training data.
pub const LABEL_FIELD: &str = "fraud_flag";

/// A loose row: column name to cell text.
///
/// Dataset files and ledger pulls both produce records. Nothing about their
/// column set is checked until the feature transformer sees them.
pub type Record = BTreeMap<String, String>;

/// A single transaction with the fixed field set used by the fraud model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction amount in INR
    #[serde(rename = "amount (INR)")]
    pub amount_inr: f64,

    /// Hour of day (0-23)
    pub hour_of_day: u8,

    /// 1 on Saturday/Sunday, 0 otherwise
    pub is_weekend: u8,

    /// P2P, P2M, Bill Payment, Recharge
    #[serde(rename = "transaction type")]
    pub transaction_type: String,

    pub merchant_category: String,
    pub sender_state: String,
    pub sender_bank: String,
    pub receiver_bank: String,

    /// Android, iOS, Web
    pub device_type: String,

    /// 4G, 5G, WiFi, 3G
    pub network_type: String,

    pub day_of_week: String,
    pub sender_age_group: String,
    pub receiver_age_group: String,

    /// Fraud label (training data only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fraud_flag: Option<u8>,
}

impl TransactionRecord {
    /// Render the feature fields as a [`Record`].
    ///
    /// The label is never included: this is the shape the transformer
    /// expects at scoring time.
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert(NUMERIC_FIELDS[0].to_string(), self.amount_inr.to_string());
        record.insert(NUMERIC_FIELDS[1].to_string(), self.hour_of_day.to_string());
        record.insert(NUMERIC_FIELDS[2].to_string(), self.is_weekend.to_string());

        let categorical = [
            &self.transaction_type,
            &self.merchant_category,
            &self.sender_state,
            &self.sender_bank,
            &self.receiver_bank,
            &self.device_type,
            &self.network_type,
            &self.day_of_week,
            &self.sender_age_group,
            &self.receiver_age_group,
        ];
        for (name, value) in CATEGORICAL_FIELDS.iter().zip(categorical) {
            record.insert(name.to_string(), value.clone());
        }
        record
    }

    /// Render the record including the label column, as stored in a
    /// training dataset.
    pub fn to_labeled_record(&self) -> Record {
        let mut record = self.to_record();
        if let Some(flag) = self.fraud_flag {
            record.insert(LABEL_FIELD.to_string(), flag.to_string());
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TransactionRecord {
        TransactionRecord {
            amount_inr: 1250.5,
            hour_of_day: 22,
            is_weekend: 1,
            transaction_type: "P2P".to_string(),
            merchant_category: "Shopping".to_string(),
            sender_state: "Delhi".to_string(),
            sender_bank: "SBI".to_string(),
            receiver_bank: "HDFC".to_string(),
            device_type: "Android".to_string(),
            network_type: "4G".to_string(),
            day_of_week: "Sunday".to_string(),
            sender_age_group: "26-35".to_string(),
            receiver_age_group: "36-45".to_string(),
            fraud_flag: Some(1),
        }
    }

    #[test]
    fn test_record_has_exact_feature_fields() {
        let record = sample().to_record();

        assert_eq!(record.len(), NUMERIC_FIELDS.len() + CATEGORICAL_FIELDS.len());
        assert_eq!(record["amount (INR)"], "1250.5");
        assert_eq!(record["transaction type"], "P2P");
        assert!(!record.contains_key(LABEL_FIELD));
    }

    #[test]
    fn test_labeled_record_includes_flag() {
        let record = sample().to_labeled_record();
        assert_eq!(record[LABEL_FIELD], "1");
    }

    #[test]
    fn test_deserialize_uses_column_names() {
        let json = r#"{
            "amount (INR)": 99.0, "hour_of_day": 3, "is_weekend": 0,
            "transaction type": "P2M", "merchant_category": "Food",
            "sender_state": "Goa", "sender_bank": "ICICI", "receiver_bank": "Axis",
            "device_type": "iOS", "network_type": "WiFi", "day_of_week": "Monday",
            "sender_age_group": "18-25", "receiver_age_group": "46-55"
        }"#;

        let tx: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(tx.amount_inr, 99.0);
        assert_eq!(tx.transaction_type, "P2M");
        assert_eq!(tx.fraud_flag, None);
    }
}
