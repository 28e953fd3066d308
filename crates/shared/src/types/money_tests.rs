use super::*;
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[rstest]
#[case(dec!(0), "Rp 0")]
#[case(dec!(500), "Rp 500")]
#[case(dec!(1000), "Rp 1.000")]
#[case(dec!(70000), "Rp 70.000")]
#[case(dec!(150000), "Rp 150.000")]
#[case(dec!(1234567), "Rp 1.234.567")]
#[case(dec!(-30000), "-Rp 30.000")]
fn test_format_rupiah(#[case] amount: Decimal, #[case] expected: &str) {
    assert_eq!(format_rupiah(amount), expected);
}

#[test]
fn test_format_rupiah_rounds_fraction() {
    assert_eq!(format_rupiah(dec!(999.5)), "Rp 1.000");
    assert_eq!(format_rupiah(dec!(999.49)), "Rp 999");
}

#[test]
fn test_format_rupiah_negative_fraction_rounds_to_zero() {
    assert_eq!(format_rupiah(dec!(-0.2)), "Rp 0");
}
