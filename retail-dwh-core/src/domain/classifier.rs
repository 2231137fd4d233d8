// retail-dwh-core/src/domain/classifier.rs

use rust_decimal::Decimal;

use crate::domain::record::{LoadContext, NormalizedFields, SaleFlags, StagedRecord, WorkingRecord};

/// Derives the business flags of a record that survived the rule engine.
///
/// The flags are independent booleans evaluated in a fixed order; a line can
/// be both a cancellation and a return.
pub struct BusinessClassifier {
    cancellation_marker: String,
}

impl BusinessClassifier {
    pub fn new(cancellation_marker: impl Into<String>) -> Self {
        Self {
            cancellation_marker: cancellation_marker.into(),
        }
    }

    pub fn flags(&self, fields: &NormalizedFields) -> SaleFlags {
        let qty = fields.quantity;
        let price = fields.unit_price;

        let is_cancellation = fields
            .invoice_no
            .as_deref()
            .is_some_and(|inv| inv.starts_with(self.cancellation_marker.as_str()));
        let is_adjustment =
            qty < 0 && !is_cancellation && price == Decimal::ZERO && fields.customer_id.is_none();
        let is_guest_purchase = fields.customer_id.is_none();
        let is_valid_sale = qty > 0 && price > Decimal::ZERO && !is_cancellation;
        let is_return = qty < 0 && !is_adjustment;

        SaleFlags {
            is_cancellation,
            is_adjustment,
            is_guest_purchase,
            is_valid_sale,
            is_return,
        }
    }

    /// Builds the staging row. Returns `None` for records that lack an
    /// identity or a timestamp, which the rule engine never lets through.
    pub fn stage(&self, record: WorkingRecord, ctx: &LoadContext) -> Option<StagedRecord> {
        let flags = self.flags(&record.fields);
        let f = record.fields;
        Some(StagedRecord {
            invoice_no: f.invoice_no?,
            stock_code: f.stock_code?,
            description: f.description,
            quantity: f.quantity,
            invoice_date: f.invoice_date?,
            unit_price: f.unit_price,
            customer_id: f.customer_id,
            country: f.country,
            line_total: f.line_total,
            flags,
            loaded_at: ctx.loaded_at,
            batch_id: ctx.batch_id.clone(),
            source_file: ctx.source_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::normalizer::RecordNormalizer;
    use crate::domain::record::RawRecord;
    use chrono::Utc;

    fn fields(invoice: &str, qty: &str, price: &str, customer: Option<&str>) -> NormalizedFields {
        RecordNormalizer::normalize(RawRecord {
            invoice_no: Some(invoice.into()),
            stock_code: Some("A1".into()),
            description: None,
            quantity: Some(qty.into()),
            invoice_date: Some("2011-01-05 10:00:00".into()),
            unit_price: Some(price.into()),
            customer_id: customer.map(str::to_string),
            country: None,
        })
        .fields
    }

    fn classifier() -> BusinessClassifier {
        BusinessClassifier::new("C")
    }

    #[test]
    fn test_cancelled_guest_return() {
        let flags = classifier().flags(&fields("C100", "-3", "5.00", None));
        assert!(flags.is_cancellation);
        assert!(!flags.is_adjustment);
        assert!(flags.is_guest_purchase);
        assert!(!flags.is_valid_sale);
        assert!(flags.is_return);
    }

    #[test]
    fn test_cancellation_and_return_co_occur() {
        let flags = classifier().flags(&fields("C581490", "-12", "1.25", Some("14397")));
        assert!(flags.is_cancellation);
        assert!(flags.is_return);
        assert!(!flags.is_guest_purchase);
    }

    #[test]
    fn test_adjustment_is_not_a_return() {
        let flags = classifier().flags(&fields("536589", "-10", "0", None));
        assert!(flags.is_adjustment);
        assert!(!flags.is_return);
        assert!(!flags.is_cancellation);
        assert!(!flags.is_valid_sale);
    }

    #[test]
    fn test_known_customer_negative_zero_price_is_a_return() {
        let flags = classifier().flags(&fields("536589", "-10", "0", Some("1")));
        assert!(!flags.is_adjustment);
        assert!(flags.is_return);
    }

    #[test]
    fn test_valid_sale() {
        let flags = classifier().flags(&fields("536365", "6", "2.55", Some("17850")));
        assert!(flags.is_valid_sale);
        assert!(!flags.is_return);
        assert!(!flags.is_cancellation);
        assert!(!flags.is_guest_purchase);
    }

    #[test]
    fn test_free_line_is_not_a_valid_sale() {
        let flags = classifier().flags(&fields("536365", "6", "0", Some("17850")));
        assert!(!flags.is_valid_sale);
    }

    #[test]
    fn test_guest_flag_tracks_customer_presence() {
        for customer in [None, Some("12346")] {
            let f = fields("1", "1", "1", customer);
            let flags = classifier().flags(&f);
            assert_eq!(flags.is_guest_purchase, f.customer_id.is_none());
        }
    }

    #[test]
    fn test_stage_carries_provenance() {
        let record = RecordNormalizer::normalize(RawRecord {
            invoice_no: Some("536365".into()),
            stock_code: Some("85123A".into()),
            description: Some("HOLDER".into()),
            quantity: Some("6".into()),
            invoice_date: Some("12/1/2010 8:26".into()),
            unit_price: Some("2.55".into()),
            customer_id: Some("17850".into()),
            country: Some("United Kingdom".into()),
        });
        let ctx = LoadContext {
            batch_id: "b1".into(),
            loaded_at: Utc::now(),
            source_id: "online_retail.csv".into(),
        };
        let staged = classifier().stage(record, &ctx);
        let staged = staged.as_ref();
        assert_eq!(staged.map(|s| s.batch_id.as_str()), Some("b1"));
        assert_eq!(staged.map(|s| s.source_file.as_str()), Some("online_retail.csv"));
        assert_eq!(staged.map(|s| s.flags.is_valid_sale), Some(true));
    }
}
