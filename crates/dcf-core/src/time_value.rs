use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::{DcfError, OrOverflow};
use crate::types::{Money, Rate};
use crate::DcfResult;

/// `(1 + rate)^periods`, annual compounding.
pub fn compound_factor(rate: Rate, periods: u32) -> DcfResult<Decimal> {
    if rate <= dec!(-1) {
        return Err(DcfError::assumptions(
            "rate",
            "Discount rate must be greater than -100%",
        ));
    }
    let one_plus_r = Decimal::ONE.checked_add(rate).or_overflow("1 + rate")?;
    one_plus_r
        .checked_powu(u64::from(periods))
        .or_overflow(&format!("compounding over {periods} periods"))
}

/// `1 / (1 + rate)^periods`
pub fn discount_factor(rate: Rate, periods: u32) -> DcfResult<Rate> {
    let factor = compound_factor(rate, periods)?;
    Decimal::ONE
        .checked_div(factor)
        .or_overflow(&format!("discount factor at period {periods}"))
}

/// Present value of a single amount received at the end of period `periods`.
pub fn present_value(amount: Money, rate: Rate, periods: u32) -> DcfResult<Money> {
    let factor = compound_factor(rate, periods)?;
    amount
        .checked_div(factor)
        .or_overflow(&format!("present value at period {periods}"))
}

/// Present values of an end-of-year stream whose first entry falls at t = 1.
pub fn present_values(flows: &[Money], rate: Rate) -> DcfResult<Vec<Money>> {
    flows
        .iter()
        .zip(1u32..)
        .map(|(flow, t)| present_value(*flow, rate, t))
        .collect()
}

/// Checked sum, used wherever a stream of present values is totalled.
pub fn checked_sum(values: &[Money], context: &str) -> DcfResult<Money> {
    values.iter().try_fold(Decimal::ZERO, |acc, v| {
        acc.checked_add(*v).or_overflow(context)
    })
}
