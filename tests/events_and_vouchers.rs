use std::thread;

use chrono::NaiveDate;

use erpledger::error::LedgerError;
use erpledger::events::{EventBus, ExchangeRateUpdate, LedgerEvent};
use erpledger::format::{format_amount, format_grouped_int, format_money, js_number};
use erpledger::vouchers::VoucherKind;

fn usd_update(rate: f64) -> LedgerEvent {
    LedgerEvent::ExchangeRateUpdated(ExchangeRateUpdate {
        from_currency: "USD".to_string(),
        to_currency: "ARS".to_string(),
        rate,
        date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
    })
}

#[test]
fn test_every_subscriber_gets_the_event() {
    let bus = EventBus::new();
    let first = bus.subscribe();
    let second = bus.subscribe();

    assert_eq!(bus.publish(usd_update(1000.0)), 2);

    assert_eq!(first.try_recv().unwrap(), usd_update(1000.0));
    assert_eq!(second.try_recv().unwrap(), usd_update(1000.0));
    assert!(first.try_recv().is_err());
}

#[test]
fn test_publish_without_subscribers_is_a_no_op() {
    let bus = EventBus::new();
    assert_eq!(bus.publish(usd_update(1.0)), 0);
}

#[test]
fn test_dropped_subscribers_are_forgotten() {
    let bus = EventBus::new();
    let kept = bus.subscribe();
    drop(bus.subscribe());
    assert_eq!(bus.subscriber_count(), 2);

    assert_eq!(bus.publish(usd_update(2.0)), 1);
    assert_eq!(bus.subscriber_count(), 1);
    assert!(kept.try_recv().is_ok());
}

#[test]
fn test_events_cross_threads() {
    let bus = EventBus::new();
    let rx = bus.subscribe();

    thread::scope(|s| {
        s.spawn(|| bus.publish(usd_update(3.0)));
    });

    assert_eq!(rx.recv().unwrap(), usd_update(3.0));
}

#[test]
fn test_voucher_kinds_from_doctype() {
    assert_eq!(VoucherKind::from_doctype("Sales Invoice"), Some(VoucherKind::SalesInvoice));
    assert_eq!(VoucherKind::from_doctype("journal_entry"), Some(VoucherKind::JournalEntry));
    assert_eq!(
        VoucherKind::from_doctype(" stock-reconciliation "),
        Some(VoucherKind::StockReconciliation)
    );
    assert_eq!(VoucherKind::from_doctype("Timesheet"), None);

    for kind in VoucherKind::ALL {
        assert_eq!(VoucherKind::from_doctype(kind.doctype()), Some(kind));
    }

    assert!(matches!(
        "Timesheet".parse::<VoucherKind>(),
        Err(LedgerError::UnknownVoucherType(t)) if t == "Timesheet"
    ));
}

#[test]
fn test_voucher_detail_paths() {
    assert_eq!(
        VoucherKind::SalesInvoice.detail_path("FC A 0001-00000012"),
        "/api/invoices/FC%20A%200001-00000012"
    );
    assert_eq!(VoucherKind::PaymentEntry.detail_path("PAY-1"), "/api/pagos/PAY-1");
    assert_eq!(VoucherKind::DeliveryNote.detail_path("R-1"), "/api/remitos/R-1");
}

#[test]
fn test_amount_formatting() {
    assert_eq!(format_grouped_int(1234567), "1,234,567");
    assert_eq!(format_grouped_int(-1000), "-1,000");
    assert_eq!(format_amount(1234.5), "1,234.50");
    assert_eq!(format_amount(-0.001), "0.00");
    assert_eq!(format_money(-1.0, "$"), "-$1.00");
    assert_eq!(format_money(20.0, "US$"), "US$20.00");
    assert_eq!(js_number(100.0), "100");
    assert_eq!(js_number(99.5), "99.5");
}

#[test]
fn test_amounts_beyond_integer_range_keep_their_digits() {
    assert_eq!(format_amount(1e20), "100,000,000,000,000,000,000.00");
    assert_eq!(format_money(-1e19, "$"), "-$10,000,000,000,000,000,000.00");
    assert_eq!(format_grouped_int(i64::MIN), "-9,223,372,036,854,775,808");
    assert_eq!(format_amount(999.999), "1,000.00");
}
